//! ReGIS output, for VT241/VT340 terminals and their emulators.
//!
//! The screen is 768x480 pixels with y pointing down. Vectors are written
//! in whichever of relative or absolute form is shorter. Filling uses the
//! `F(...)` wrapper, which only works for shapes entirely on screen;
//! strokes are clipped.

use std::fmt::Write;

use glam::DVec2;

use super::{Backend, Cx, DeviceRange, Polyline};
use crate::caps::{self, Capabilities};
use crate::errors::PlotError;
use crate::geometry::clip::ClipRect;
use crate::log::debug;
use crate::paint;
use crate::params::PlotterParams;
use crate::path::Path;
use crate::state::DrawState;
use crate::state::modes::LineType;
use crate::types::{IPoint, Rgb24, Rgb48, iround};

const X_MAX: i32 = 767;
const Y_MAX: i32 = 479;

/// The square viewport is centered horizontally.
const VIEWPORT_IMIN: i32 = 144;
const VIEWPORT_IMAX: i32 = 623;

const STD_COLORS: [(Rgb24, char); 8] = [
    (Rgb24::new(0xff, 0x00, 0x00), 'r'),
    (Rgb24::new(0x00, 0xff, 0x00), 'g'),
    (Rgb24::new(0x00, 0x00, 0xff), 'b'),
    (Rgb24::new(0x00, 0xff, 0xff), 'c'),
    (Rgb24::new(0xff, 0x00, 0xff), 'm'),
    (Rgb24::new(0xff, 0xff, 0x00), 'y'),
    (Rgb24::new(0x00, 0x00, 0x00), 'd'),
    (Rgb24::new(0xff, 0xff, 0xff), 'w'),
];

fn best_std_color(c: Rgb48) -> char {
    let c = c.to_rgb24();
    let mut best = STD_COLORS[0].1;
    let mut best_distance = i32::MAX;
    for &(k, ch) in &STD_COLORS {
        let d = k.distance_sq(c);
        if d < best_distance {
            best_distance = d;
            best = ch;
        }
    }
    best
}

/// Writing patterns. Fewer than 8 bits repeat to fill a byte.
fn pattern(t: LineType) -> &'static str {
    match t {
        LineType::Solid => "P1",
        LineType::Dotted => "P1000",
        LineType::DotDashed => "P11100100",
        LineType::ShortDashed => "P11110000",
        LineType::LongDashed => "P11111100",
        LineType::DotDotDashed => "P11101010",
        LineType::DotDotDotDashed => "P10",
    }
}

fn on_screen(p: IPoint) -> bool {
    (0..=X_MAX).contains(&p.x) && (0..=Y_MAX).contains(&p.y)
}

/// The bracketed endpoint of the vector `from → to`, each coordinate in
/// relative form unless the absolute one is shorter. A null vector is
/// `[]`, or nothing at all when `skip_null` is set.
fn vector(from: IPoint, to: IPoint, skip_null: bool) -> String {
    let v = IPoint::new(to.x - from.x, to.y - from.y);
    if v.x == 0 && v.y == 0 {
        return if skip_null { String::new() } else { "[]".to_string() };
    }
    let pick = |rel: i32, abs: i32| {
        let rel = format!("{:+}", rel);
        let abs = abs.to_string();
        if rel.len() <= abs.len() { rel } else { abs }
    };
    let x = pick(v.x, to.x);
    let y = pick(v.y, to.y);
    if v.x == 0 {
        format!("[,{y}]")
    } else if v.y == 0 {
        format!("[{x}]")
    } else {
        format!("[{x},{y}]")
    }
}

#[derive(Debug)]
pub struct RegisBackend {
    clip: ClipRect,
    position: Option<IPoint>,
    line_type: Option<LineType>,
    fg: Option<char>,
    bg: Option<char>,
}

impl Default for RegisBackend {
    fn default() -> Self {
        RegisBackend {
            clip: ClipRect::pixels(0, X_MAX, 0, Y_MAX),
            position: None,
            line_type: None,
            fg: None,
            bg: None,
        }
    }
}

impl RegisBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the graphics cursor with a `P` command, if it is not there
    /// already. Off-screen targets are ignored.
    fn move_to(&mut self, p: IPoint, out: &mut String) {
        if !on_screen(p) {
            return;
        }
        match self.position {
            None => {
                let _ = writeln!(out, "P[{},{}]", p.x, p.y);
            }
            Some(old) if old != p => {
                let _ = writeln!(out, "P{}", vector(old, p, false));
            }
            Some(_) => {}
        }
        self.position = Some(p);
    }

    fn set_attributes(&mut self, state: &DrawState, out: &mut String) {
        if self.line_type != Some(state.line_type) {
            let _ = writeln!(out, "W({})", pattern(state.line_type));
            self.line_type = Some(state.line_type);
        }
    }

    fn set_writing_color(&mut self, c: Rgb48, out: &mut String) {
        let ch = best_std_color(c);
        if self.fg != Some(ch) {
            let _ = writeln!(out, "W(I({ch}))");
            self.fg = Some(ch);
        }
    }

    fn set_bg_color(&mut self, state: &DrawState, out: &mut String) {
        let ch = best_std_color(state.bg_color);
        if self.bg != Some(ch) {
            let _ = writeln!(out, "S(I({ch}))");
            self.bg = Some(ch);
        }
    }

    /// Fill the polygon through `points` with `F(V...)`, closing it
    /// explicitly. Polygons reaching off screen are not filled.
    fn fill_polygon(&mut self, state: &DrawState, points: &[IPoint], out: &mut String) {
        if points.len() < 2 || !points.iter().all(|&p| on_screen(p)) {
            debug!(points = points.len(), "regis fill skipped: off screen");
            return;
        }
        self.set_writing_color(state.fill_color, out);
        let first = points[0];
        self.move_to(first, out);
        out.push_str("F(V");
        let mut old = first;
        for (i, &p) in points.iter().enumerate().skip(1) {
            out.push_str(&vector(old, p, i > 1));
            old = p;
        }
        out.push_str(&vector(old, first, true));
        out.push_str(")\n");
        self.position = None;
    }

    /// Stroke the polyline through the device points `points`, clipping
    /// each segment and restarting the `V` command after every gap.
    fn stroke(&mut self, state: &DrawState, points: &[DVec2], out: &mut String) {
        let mut attributes_set = false;
        let mut in_progress = false;
        for w in points.windows(2) {
            let Some(c) = self.clip.clip_line(w[0], w[1]) else {
                if in_progress {
                    out.push('\n');
                }
                in_progress = false;
                continue;
            };
            if c.clipped_first && in_progress {
                out.push('\n');
                in_progress = false;
            }
            let start = IPoint::round(c.p0);
            let end = IPoint::round(c.p1);
            if in_progress && start == end {
                continue;
            }
            if !attributes_set {
                self.set_attributes(state, out);
                self.set_writing_color(state.fg_color, out);
                attributes_set = true;
            }
            if !in_progress {
                self.move_to(start, out);
                out.push('V');
                // make sure the first pixel is lit
                if start != end {
                    out.push_str("[]");
                }
                in_progress = true;
            }
            out.push_str(&vector(start, end, true));
            self.position = Some(end);
        }
        if in_progress {
            out.push('\n');
        }
    }
}

impl Backend for RegisBackend {
    fn caps(&self) -> &'static Capabilities {
        &caps::REGIS
    }

    fn device_range(&self, _params: &PlotterParams) -> DeviceRange {
        DeviceRange::pixels(VIEWPORT_IMIN, VIEWPORT_IMAX, Y_MAX, 0)
    }

    fn begin_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        // clear the screen, enter ReGIS, hide the graphics cursor
        let mut out = String::from("\x1b[2J\x1bP1pS(C0)\n");
        self.set_bg_color(cx.state, &mut out);
        out.push_str("S(E)\n");
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }

    fn end_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        cx.page.write_bytes(b"\x1b\\");
        self.position = None;
        Ok(())
    }

    fn erase_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        let mut out = String::new();
        self.set_bg_color(cx.state, &mut out);
        out.push_str("S(E)\n");
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }

    fn paint_point(&mut self, cx: &mut Cx<'_>, p: DVec2) -> Result<(), PlotError> {
        if cx.state.pen_type == 0 {
            return Ok(());
        }
        let d = cx.to_device(p);
        if !self.clip.contains(d) {
            return Ok(());
        }
        let d = IPoint::round(d);
        let mut out = String::new();
        self.set_writing_color(cx.state.fg_color, &mut out);
        self.move_to(d, &mut out);
        out.push_str("V[]\n");
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }

    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
        let state = cx.state;
        let mut out = String::new();
        if state.fill_type != 0 {
            let points: Vec<IPoint> = poly.device.iter().map(|&d| IPoint::round(d)).collect();
            self.fill_polygon(state, &points, &mut out);
        }
        if state.pen_type != 0 {
            // clip in unquantized device space
            let device: Vec<DVec2> = poly.user.iter().map(|&u| cx.to_device(u)).collect();
            self.stroke(state, &device, &mut out);
        }
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }

    fn draw_circle(&mut self, cx: &mut Cx<'_>, center: DVec2, radius: f64, clockwise: bool) -> Result<(), PlotError> {
        let state = cx.state;
        let c = IPoint::round(cx.to_device(center));
        let r = iround(state.transform.m.apply_vector(DVec2::new(radius, 0.0)).length());
        if c.x - r < 0 || c.x + r > X_MAX || c.y - r < 0 || c.y + r > Y_MAX {
            return paint::paint_flattened(self, cx, &Path::new_circle(center, radius, clockwise));
        }
        let mut out = String::new();
        let shape = if r > 0 { format!("C[+{r}]") } else { "V[]".to_string() };
        if state.fill_type != 0 {
            self.set_writing_color(state.fill_color, &mut out);
            self.move_to(c, &mut out);
            if r > 0 {
                let _ = writeln!(out, "F({shape})");
                self.position = None;
            } else {
                let _ = writeln!(out, "{shape}");
            }
        }
        if state.pen_type != 0 {
            self.set_attributes(state, &mut out);
            self.set_writing_color(state.fg_color, &mut out);
            self.move_to(c, &mut out);
            let _ = writeln!(out, "{shape}");
            if r > 0 {
                self.position = None;
            }
        }
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }
}
