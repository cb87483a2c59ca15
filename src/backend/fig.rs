//! xfig 3.2 output.
//!
//! Device coordinates are Fig units, 1200 to the inch, with y growing down
//! the page. Each object is written with a depth one less than the
//! previous one so that later objects are drawn on top. Colors outside
//! xfig's 32 standard colors are defined as user colors in the file
//! header, which is written when the page ends.

use glam::{DVec2, dvec2};

use super::{Backend, Cx, DeviceRange, NativeArc, Polyline};
use crate::caps::{self, Capabilities};
use crate::errors::{PlotError, Warning};
use crate::log::debug;
use crate::params::PlotterParams;
use crate::state::DrawState;
use crate::state::modes::{CapStyle, JoinStyle, LineType};
use crate::types::{Rgb24, Rgb48, iround};

const FIG_UNITS_PER_INCH: f64 = 1200.0;

/// Line widths and dash spacings are expressed in display units of 1/80
/// inch.
const FIG_DISPLAY_UNITS_PER_INCH: f64 = 80.0;

const INITIAL_DEPTH: i32 = 989;

const USER_COLOR_MIN: usize = 32;
const MAX_USER_COLORS: usize = 512;

/// Smallest dash unit for builtin line types, as a fraction of the
/// display size.
const MIN_DASH_UNIT_FRACTION: f64 = 1.0 / 576.0;

/// Widths above this many display units are drawn one unit thinner by xfig.
const THICKNESS_BUMP_THRESHOLD: f64 = 0.75;

/// Added to widths above the threshold before rounding.
const THICKNESS_BUMP: f64 = 1.0;

/// Display units xfig draws for each dot of a dotted style.
const DOT_LENGTH: f64 = 1.0;

/// Share of a dashed cycle stored as the dash length.
const DASH_SHARE: f64 = 0.5;

/// Dash-double-dotted cycle length, net of dots, per stored unit.
const DASH_DOUBLE_DOTTED_DIVISOR: f64 = 1.9 + 1.0 / 3.0;

/// Dash-triple-dotted cycle length, net of dots, per stored unit.
const DASH_TRIPLE_DOTTED_DIVISOR: f64 = 2.4;

/// xfig's builtin colors, by color index.
const STD_COLORS: [(u8, u8, u8); 32] = [
    (0x00, 0x00, 0x00), // Black
    (0x00, 0x00, 0xff), // Blue
    (0x00, 0xff, 0x00), // Green
    (0x00, 0xff, 0xff), // Cyan
    (0xff, 0x00, 0x00), // Red
    (0xff, 0x00, 0xff), // Magenta
    (0xff, 0xff, 0x00), // Yellow
    (0xff, 0xff, 0xff), // White
    (0x00, 0x00, 0x90), // Blue4
    (0x00, 0x00, 0xb0), // Blue3
    (0x00, 0x00, 0xd0), // Blue2
    (0x87, 0xce, 0xff), // LtBlue
    (0x00, 0x90, 0x00), // Green4
    (0x00, 0xb0, 0x00), // Green3
    (0x00, 0xd0, 0x00), // Green2
    (0x00, 0x90, 0x90), // Cyan4
    (0x00, 0xb0, 0xb0), // Cyan3
    (0x00, 0xd0, 0xd0), // Cyan2
    (0x90, 0x00, 0x00), // Red4
    (0xb0, 0x00, 0x00), // Red3
    (0xd0, 0x00, 0x00), // Red2
    (0x90, 0x00, 0x90), // Magenta4
    (0xb0, 0x00, 0xb0), // Magenta3
    (0xd0, 0x00, 0xd0), // Magenta2
    (0x80, 0x30, 0x00), // Brown4
    (0xa0, 0x40, 0x00), // Brown3
    (0xc0, 0x60, 0x00), // Brown2
    (0xff, 0x80, 0x80), // Pink4
    (0xff, 0xa0, 0xa0), // Pink3
    (0xff, 0xc0, 0xc0), // Pink2
    (0xff, 0xe0, 0xe0), // Pink
    (0xff, 0xd7, 0x00), // Gold
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FigLineStyle {
    Solid = 0,
    Dashed = 1,
    Dotted = 2,
    DashDotted = 3,
    DashDoubleDotted = 4,
    DashTripleDotted = 5,
}

fn fig_line_style(t: LineType) -> FigLineStyle {
    match t {
        LineType::Solid => FigLineStyle::Solid,
        LineType::Dotted => FigLineStyle::Dotted,
        LineType::DotDashed => FigLineStyle::DashDotted,
        LineType::ShortDashed | LineType::LongDashed => FigLineStyle::Dashed,
        LineType::DotDotDashed => FigLineStyle::DashDoubleDotted,
        LineType::DotDotDotDashed => FigLineStyle::DashTripleDotted,
    }
}

fn fig_join(join: JoinStyle) -> u8 {
    match join {
        JoinStyle::Miter => 0,
        JoinStyle::Round | JoinStyle::Triangular => 1,
        JoinStyle::Bevel => 2,
    }
}

fn fig_cap(cap: CapStyle) -> u8 {
    match cap {
        CapStyle::Butt => 0,
        CapStyle::Round | CapStyle::Triangular => 1,
        CapStyle::Projecting => 2,
    }
}

#[inline]
fn to_display_units(fig_units: f64) -> f64 {
    fig_units * FIG_DISPLAY_UNITS_PER_INCH / FIG_UNITS_PER_INCH
}

/// Line thickness as written to the file. xfig draws a width of `n` as
/// `n - 1` display units (and 1 as half a unit), so widths are bumped up
/// before rounding. A positive width never rounds to zero.
fn fig_thickness(state: &DrawState) -> i32 {
    if state.pen_type == 0 {
        return 0;
    }
    let mut w = to_display_units(state.device_line_width);
    if w > THICKNESS_BUMP_THRESHOLD {
        w += THICKNESS_BUMP;
    }
    let q = iround(w);
    if q == 0 && w > 0.0 { 1 } else { q }
}

/// Fig line style and its "style value", which for the dashed styles is
/// a dash length or dot gap in display units.
fn line_style(state: &DrawState, display_size: f64) -> (FigLineStyle, f64) {
    let (min_sv, _) = state.transform.m.singular_values();
    let (style, mut spacing) = match state.dash_array.as_ref().map(|d| d.dashes.as_slice()) {
        Some(&[on, off]) if on == off => (FigLineStyle::Dashed, to_display_units(min_sv * 2.0 * on)),
        Some(&[on, off]) if off > (3.0 - 1e-6) * on && off < (3.0 + 1e-6) * on => {
            (FigLineStyle::Dotted, to_display_units(min_sv * 4.0 * on))
        }
        _ => {
            // other dash arrays fall back to the line type
            let cycle: u32 = state.line_type.dashes().iter().map(|&d| d as u32).sum();
            let min_dash_unit = MIN_DASH_UNIT_FRACTION * to_display_units(display_size);
            let unit = min_dash_unit.max(to_display_units(state.device_line_width));
            (fig_line_style(state.line_type), cycle as f64 * unit)
        }
    };
    // the value stored is not quite the cycle length
    match style {
        FigLineStyle::Solid => {}
        FigLineStyle::Dotted => spacing -= DOT_LENGTH,
        FigLineStyle::DashDotted => spacing = (spacing - DOT_LENGTH) * DASH_SHARE,
        FigLineStyle::Dashed => spacing *= DASH_SHARE,
        FigLineStyle::DashDoubleDotted => spacing = (spacing - 2.0 * DOT_LENGTH) / DASH_DOUBLE_DOTTED_DIVISOR,
        FigLineStyle::DashTripleDotted => spacing = (spacing - 3.0 * DOT_LENGTH) / DASH_TRIPLE_DOTTED_DIVISOR,
    }
    (style, spacing.max(1.0))
}

/// Area fill: -1 for none, otherwise 0..=40 where 20 is the full color,
/// lower values shade toward black and higher toward white.
fn fill_level(state: &DrawState) -> i32 {
    if state.fill_type == 0 {
        return -1;
    }
    let level = ((state.fill_type as f64 - 1.0) / 0xfffe as f64).clamp(0.0, 1.0);
    let base = state.fill_color_base;
    if base.is_white() {
        20
    } else if base.is_black() {
        iround(20.0 - 20.0 * level)
    } else {
        iround(20.0 + 20.0 * level)
    }
}

/// Attributes shared by every object: everything up to the style value.
struct ObjectHeader {
    style: FigLineStyle,
    spacing: f64,
    thickness: i32,
    pen: usize,
    fill: usize,
    depth: i32,
    area_fill: i32,
}

#[derive(Debug)]
pub struct FigBackend {
    depth: i32,
    user_colors: Vec<Rgb24>,
    palette_full: bool,
    display_size: f64,
}

impl Default for FigBackend {
    fn default() -> Self {
        FigBackend {
            depth: INITIAL_DEPTH,
            user_colors: Vec::new(),
            palette_full: false,
            display_size: 0.0,
        }
    }
}

impl FigBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Colors defined in the file header, in index order from 32.
    pub fn user_colors(&self) -> &[Rgb24] {
        &self.user_colors
    }

    /// Color index for `c`: a standard color if one matches exactly, an
    /// existing or new user color otherwise, or the nearest available
    /// color once the user table is full.
    fn color_index(&mut self, cx: &mut Cx<'_>, c: Rgb48) -> usize {
        let c = c.to_rgb24();
        if let Some(i) = STD_COLORS.iter().position(|&(r, g, b)| Rgb24::new(r, g, b) == c) {
            return i;
        }
        if let Some(i) = self.user_colors.iter().position(|&u| u == c) {
            return USER_COLOR_MIN + i;
        }
        if self.user_colors.len() < MAX_USER_COLORS - 1 {
            self.user_colors.push(c);
            return USER_COLOR_MIN + self.user_colors.len() - 1;
        }
        if !self.palette_full {
            self.palette_full = true;
            cx.warn(Warning::PaletteFull);
        }
        self.nearest(c)
    }

    fn nearest(&self, c: Rgb24) -> usize {
        let mut best = 0;
        let mut difference = i32::MAX;
        for (i, &(r, g, b)) in STD_COLORS.iter().enumerate() {
            let std = Rgb24::new(r, g, b);
            // white is only ever an exact match
            if std == Rgb24::WHITE {
                if c == Rgb24::WHITE {
                    return i;
                }
                continue;
            }
            let d = std.distance_sq(c);
            if d < difference {
                difference = d;
                best = i;
            }
        }
        for (i, &u) in self.user_colors.iter().enumerate() {
            let d = u.distance_sq(c);
            if d < difference {
                difference = d;
                best = USER_COLOR_MIN + i;
            }
        }
        best
    }

    fn object_header(&mut self, cx: &mut Cx<'_>) -> ObjectHeader {
        let state = cx.state;
        let pen = self.color_index(cx, state.fg_color);
        let fill = self.color_index(cx, state.fill_color_base);
        let (style, spacing) = line_style(state, self.display_size);
        if self.depth > 0 {
            self.depth -= 1;
        }
        ObjectHeader {
            style,
            spacing,
            thickness: fig_thickness(state),
            pen,
            fill,
            depth: self.depth,
            area_fill: fill_level(state),
        }
    }

    fn header(&self, params: &PlotterParams) -> String {
        let paper = params.page_size.paper;
        let mut h = String::from("#FIG 3.2\nPortrait\nFlush Left\n");
        h.push_str(if paper.metric { "Metric\n" } else { "Inches\n" });
        h.push_str(&format!("{}\n", paper.fig_name));
        h.push_str("100.00\nSingle\n-2\n");
        h.push_str(&format!("{} 2\n", FIG_UNITS_PER_INCH as i32));
        for (i, c) in self.user_colors.iter().enumerate() {
            h.push_str(&format!("#COLOR\n0 {} {}\n", USER_COLOR_MIN + i, c.hex()));
        }
        h
    }

    fn ellipse(&mut self, cx: &mut Cx<'_>, center: DVec2, radii: DVec2, angle_deg: f64, mut circle: bool) {
        let m = &cx.state.transform.m;
        let (s, c) = angle_deg.to_radians().sin_cos();
        // images of the semi-axes: conjugate radii in the device frame
        let u = m.apply_vector(dvec2(radii.x * c, radii.x * s));
        let v = m.apply_vector(dvec2(-radii.y * s, radii.y * c));
        let mixing = 0.5 * (2.0 * u.dot(v)).atan2(u.x * u.x + u.y * u.y - v.x * v.x + v.y * v.y);
        let axis1 = u * mixing.cos() + v * mixing.sin();
        let axis2 = u * (mixing + std::f64::consts::FRAC_PI_2).cos() + v * (mixing + std::f64::consts::FRAC_PI_2).sin();
        let (rx, ry) = (axis1.length(), axis2.length());
        // flipped y: measured clockwise on the page
        let mut theta = -axis1.y.atan2(axis1.x);
        if theta == 0.0 {
            theta = 0.0;
        }
        if circle && iround(rx) != iround(ry) {
            circle = false;
        }

        let oh = self.object_header(cx);
        let dc = cx.to_device(center);
        let (x, y) = (iround(dc.x), iround(dc.y));
        let end = dc + axis1 + axis2;
        let out = format!(
            "{}\n1 {} {} {} {} {} {} 0 {} {:.3} 1 {:.3} {x} {y} {} {} {x} {y} {} {}\n",
            if circle { "#ELLIPSE [CIRCLE]" } else { "#ELLIPSE" },
            if circle { 3 } else { 1 },
            oh.style as i32,
            oh.thickness,
            oh.pen,
            oh.fill,
            oh.depth,
            oh.area_fill,
            oh.spacing,
            theta,
            iround(rx),
            iround(ry),
            iround(end.x),
            iround(end.y),
        );
        cx.page.write_bytes(out.as_bytes());
    }
}

impl Backend for FigBackend {
    fn caps(&self) -> &'static Capabilities {
        &caps::FIG
    }

    fn device_range(&self, params: &PlotterParams) -> DeviceRange {
        let page = &params.page_size;
        let x0 = page.xorigin + page.xoffset;
        let y0 = page.yorigin + page.yoffset;
        // y = 0 is the top of the page
        DeviceRange::real(
            FIG_UNITS_PER_INCH * x0,
            FIG_UNITS_PER_INCH * (x0 + page.xsize),
            FIG_UNITS_PER_INCH * (page.paper.ysize - y0),
            FIG_UNITS_PER_INCH * (page.paper.ysize - (y0 + page.ysize)),
        )
    }

    fn begin_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        let r = self.device_range(cx.params);
        self.display_size = (r.right - r.left).min(r.bottom - r.top);
        self.depth = INITIAL_DEPTH;
        Ok(())
    }

    fn erase_page(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        self.depth = INITIAL_DEPTH;
        Ok(())
    }

    fn end_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        // a Fig file holds a single page
        if cx.page.number != 1 {
            return Ok(());
        }
        debug!(user_colors = self.user_colors.len(), "writing fig header");
        cx.page.header = self.header(cx.params).into_bytes();
        Ok(())
    }

    fn paint_point(&mut self, cx: &mut Cx<'_>, p: DVec2) -> Result<(), PlotError> {
        if cx.state.pen_type == 0 {
            return Ok(());
        }
        let pen = self.color_index(cx, cx.state.fg_color);
        if self.depth > 0 {
            self.depth -= 1;
        }
        let d = cx.to_device(p);
        // a point is a one-vertex polyline with round ends
        let out = format!(
            "#POLYLINE [OPEN]\n2 1 0 1 {pen} {pen} {} 0 20 0.000 1 1 0 0 0 1\n\t{} {}\n",
            self.depth,
            iround(d.x),
            iround(d.y)
        );
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }

    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
        let closed = poly.device.len() >= 3 && poly.device.first() == poly.device.last();
        let oh = self.object_header(cx);
        let state = cx.state;
        let mut out = format!(
            "{}\n2 {} {} {} {} {} {} 0 {} {:.3} {} {} 0 0 0 {}",
            if closed { "#POLYLINE [CLOSED]" } else { "#POLYLINE [OPEN]" },
            if closed { 3 } else { 1 },
            oh.style as i32,
            oh.thickness,
            oh.pen,
            oh.fill,
            oh.depth,
            oh.area_fill,
            oh.spacing,
            fig_join(state.join),
            fig_cap(state.cap),
            poly.device.len()
        );
        for (i, p) in poly.device.iter().enumerate() {
            out.push_str(if i % 5 == 0 { "\n\t" } else { " " });
            out.push_str(&format!("{} {}", iround(p.x), iround(p.y)));
        }
        out.push('\n');
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }

    fn draw_arc(&mut self, cx: &mut Cx<'_>, arc: &NativeArc) -> Result<(), PlotError> {
        let (mut p0, mut p1, pc) = (arc.p0, arc.p1, arc.center);
        let (v0, v1) = (p0 - pc, p1 - pc);
        // collinear endpoints go counterclockwise
        let mut orientation = if v0.perp_dot(v1) >= 0.0 { 1.0 } else { -1.0 };
        let radius = v0.length();
        let chord = p1 - p0;
        let v = if chord.length() > 0.0 { chord * (radius / chord.length()) } else { chord };
        let pb = pc + orientation * dvec2(v.y, -v.x);

        let oh = self.object_header(cx);
        let state = cx.state;
        if !state.transform.nonreflection {
            orientation = -orientation;
        }
        // xfig wants p0, pb, p1 counterclockwise
        if orientation < 0.0 {
            std::mem::swap(&mut p0, &mut p1);
        }
        let dc = cx.to_device(pc);
        let d0 = cx.to_device(p0);
        let db = cx.to_device(pb);
        let d1 = cx.to_device(p1);
        let out = format!(
            "#ARC\n5 1 {} {} {} {} {} 0 {} {:.3} {} 1 0 0 {:.3} {:.3} {} {} {} {} {} {}\n",
            oh.style as i32,
            oh.thickness,
            oh.pen,
            oh.fill,
            oh.depth,
            oh.area_fill,
            oh.spacing,
            fig_cap(state.cap),
            dc.x,
            dc.y,
            iround(d0.x),
            iround(d0.y),
            iround(db.x),
            iround(db.y),
            iround(d1.x),
            iround(d1.y)
        );
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }

    fn draw_box(&mut self, cx: &mut Cx<'_>, p0: DVec2, p1: DVec2, _clockwise: bool) -> Result<(), PlotError> {
        let oh = self.object_header(cx);
        let state = cx.state;
        let d0 = cx.to_device(p0);
        let d1 = cx.to_device(p1);
        let (x0, y0, x1, y1) = (iround(d0.x), iround(d0.y), iround(d1.x), iround(d1.y));
        let out = format!(
            "#POLYLINE [BOX]\n2 2 {} {} {} {} {} 0 {} {:.3} {} {} 0 0 0 5\n\t{x0} {y0} {x0} {y1} {x1} {y1} {x1} {y0} {x0} {y0}\n",
            oh.style as i32,
            oh.thickness,
            oh.pen,
            oh.fill,
            oh.depth,
            oh.area_fill,
            oh.spacing,
            fig_join(state.join),
            fig_cap(state.cap),
        );
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }

    fn draw_circle(&mut self, cx: &mut Cx<'_>, center: DVec2, radius: f64, _clockwise: bool) -> Result<(), PlotError> {
        self.ellipse(cx, center, DVec2::splat(radius), 0.0, true);
        Ok(())
    }

    fn draw_ellipse(
        &mut self,
        cx: &mut Cx<'_>,
        center: DVec2,
        radii: DVec2,
        angle_deg: f64,
        _clockwise: bool,
    ) -> Result<(), PlotError> {
        self.ellipse(cx, center, radii, angle_deg, false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::BuiltinMetrics;
    use crate::errors::Warnings;
    use crate::matrix::Affine;
    use crate::outbuf::PageBuffer;
    use crate::state::{DashArray, Transform};

    struct Fixture {
        state: DrawState,
        page: PageBuffer,
        warnings: Warnings,
        params: PlotterParams,
        ndc: Affine,
        fig: FigBackend,
    }

    impl Fixture {
        /// User units of 1/1200 inch, y flipped, so device = (x, -y).
        fn new() -> Self {
            let mut state = DrawState::default();
            state.transform = Transform::new(Affine::scale(1.0, -1.0), &Affine::IDENTITY, true);
            state.set_line_width(0.0);
            Fixture {
                state,
                page: PageBuffer::new(1),
                warnings: Warnings::default(),
                params: PlotterParams::default(),
                ndc: Affine::IDENTITY,
                fig: FigBackend::new(),
            }
        }

        fn run(&mut self, f: impl FnOnce(&mut FigBackend, &mut Cx<'_>)) -> String {
            let mut cx = Cx {
                state: &self.state,
                page: &mut self.page,
                warnings: &mut self.warnings,
                params: &self.params,
                ndc_to_device: &self.ndc,
                fonts: &BuiltinMetrics,
            };
            self.fig.begin_page(&mut cx).unwrap();
            f(&mut self.fig, &mut cx);
            self.page.body_str().into_owned()
        }
    }

    fn poly(points: &[DVec2]) -> Polyline {
        let device = points.iter().map(|p| dvec2(p.x, -p.y)).collect();
        Polyline {
            user: points.to_vec(),
            device,
            closed: false,
            primitive: false,
        }
    }

    // ==================== Object tests ====================

    #[test]
    fn open_polyline_wraps_every_five_points() {
        let mut f = Fixture::new();
        let pts: Vec<DVec2> = (0..6).map(|i| dvec2(i as f64 * 10.0, 0.0)).collect();
        let out = f.run(|fig, cx| fig.draw_polyline(cx, &poly(&pts)).unwrap());
        assert_eq!(
            out,
            "#POLYLINE [OPEN]\n2 1 0 0 0 0 988 0 -1 1.000 0 0 0 0 0 6\n\t0 0 10 0 20 0 30 0 40 0\n\t50 0\n"
        );
    }

    #[test]
    fn depth_decreases_per_object() {
        let mut f = Fixture::new();
        let pts = [dvec2(0.0, 0.0), dvec2(5.0, 5.0)];
        let out = f.run(|fig, cx| {
            fig.draw_polyline(cx, &poly(&pts)).unwrap();
            fig.draw_polyline(cx, &poly(&pts)).unwrap();
        });
        assert!(out.contains(" 988 0 -1 "));
        assert!(out.contains(" 987 0 -1 "));
    }

    #[test]
    fn closed_polyline_subtype() {
        let mut f = Fixture::new();
        let pts = [dvec2(0.0, 0.0), dvec2(10.0, 0.0), dvec2(10.0, 10.0), dvec2(0.0, 0.0)];
        let out = f.run(|fig, cx| fig.draw_polyline(cx, &poly(&pts)).unwrap());
        assert!(out.starts_with("#POLYLINE [CLOSED]\n2 3 "));
    }

    #[test]
    fn box_lists_five_corners() {
        let mut f = Fixture::new();
        let out = f.run(|fig, cx| fig.draw_box(cx, dvec2(0.0, 0.0), dvec2(20.0, 10.0), false).unwrap());
        assert!(out.starts_with("#POLYLINE [BOX]\n2 2 "));
        assert!(out.ends_with("\t0 0 0 -10 20 -10 20 0 0 0\n"));
    }

    #[test]
    fn circle_header() {
        let mut f = Fixture::new();
        let out = f.run(|fig, cx| fig.draw_circle(cx, dvec2(100.0, 100.0), 50.0, false).unwrap());
        assert!(out.starts_with("#ELLIPSE [CIRCLE]\n1 3 "), "{out}");
        assert!(out.contains(" 100 -100 50 50 100 -100 "), "{out}");
    }

    #[test]
    fn arc_is_counterclockwise_on_the_page() {
        let mut f = Fixture::new();
        let (p0, p1, pc) = (dvec2(110.0, 100.0), dvec2(100.0, 110.0), dvec2(100.0, 100.0));
        let arc = NativeArc {
            elliptic: false,
            p0,
            p1,
            center: pc,
            angles: crate::geometry::arc_angles(pc, p0, p1),
            device_center: dvec2(100.0, -100.0),
            device_radii: DVec2::splat(10.0),
        };
        let out = f.run(|fig, cx| fig.draw_arc(cx, &arc).unwrap());
        assert_eq!(
            out,
            "#ARC\n5 1 0 0 0 0 988 0 -1 1.000 0 1 0 0 100.000 -100.000 110 -100 107 -107 100 -110\n"
        );
    }

    #[test]
    fn pen_off_writes_zero_thickness() {
        let mut f = Fixture::new();
        f.state.set_line_width(30.0);
        assert_eq!(fig_thickness(&f.state), 3);
        f.state.pen_type = 0;
        assert_eq!(fig_thickness(&f.state), 0);
    }

    #[test]
    fn thickness_bump_starts_above_three_quarters() {
        let mut f = Fixture::new();
        // 11.25 fig units is exactly 0.75 display units
        f.state.set_line_width(11.25);
        assert_eq!(fig_thickness(&f.state), 1);
        f.state.set_line_width(11.4);
        assert_eq!(fig_thickness(&f.state), 2);
        f.state.set_line_width(1.0);
        assert_eq!(fig_thickness(&f.state), 1);
    }

    // ==================== Style tests ====================

    #[test]
    fn equal_dashes_become_dashed() {
        let mut s = DrawState::default();
        s.dash_array = Some(DashArray {
            dashes: vec![30.0, 30.0],
            offset: 0.0,
        });
        let (style, spacing) = line_style(&s, 9600.0);
        assert_eq!(style, FigLineStyle::Dashed);
        // cycle of 60 units is 4 display units, halved
        assert!((spacing - 2.0).abs() < 1e-9);
    }

    #[test]
    fn builtin_types_use_a_floor_on_the_dash_unit() {
        let mut s = DrawState::default();
        s.line_type = LineType::ShortDashed;
        s.set_line_width(0.0);
        let (style, spacing) = line_style(&s, 9600.0);
        assert_eq!(style, FigLineStyle::Dashed);
        // 640 display units / 576 per unit, times a cycle of 8, halved
        assert!((spacing - 8.0 * 640.0 / 576.0 * 0.5).abs() < 1e-9);
    }

    /// Style value for a builtin line type on a 9600-unit display with a
    /// zero line width, so the dash unit is 640/576 display units.
    fn builtin_spacing(t: LineType) -> (FigLineStyle, f64) {
        let mut s = DrawState::default();
        s.line_type = t;
        s.set_line_width(0.0);
        line_style(&s, 9600.0)
    }

    const UNIT: f64 = 640.0 / 576.0;

    #[test]
    fn dotted_spacing_drops_one_dot() {
        let (style, spacing) = builtin_spacing(LineType::Dotted);
        assert_eq!(style, FigLineStyle::Dotted);
        assert!((spacing - (4.0 * UNIT - 1.0)).abs() < 1e-9, "{spacing}");
    }

    #[test]
    fn dash_dotted_spacing() {
        let (style, spacing) = builtin_spacing(LineType::DotDashed);
        assert_eq!(style, FigLineStyle::DashDotted);
        assert!((spacing - (11.0 * UNIT - 1.0) * 0.5).abs() < 1e-9, "{spacing}");
    }

    #[test]
    fn dash_double_dotted_spacing() {
        let (style, spacing) = builtin_spacing(LineType::DotDotDashed);
        assert_eq!(style, FigLineStyle::DashDoubleDotted);
        let expected = (15.0 * UNIT - 2.0) / (1.9 + 1.0 / 3.0);
        assert!((spacing - expected).abs() < 1e-9, "{spacing}");
    }

    #[test]
    fn dash_triple_dotted_spacing() {
        let (style, spacing) = builtin_spacing(LineType::DotDotDotDashed);
        assert_eq!(style, FigLineStyle::DashTripleDotted);
        assert!((spacing - (19.0 * UNIT - 3.0) / 2.4).abs() < 1e-9, "{spacing}");
    }

    #[test]
    fn tiny_spacings_are_floored_at_one() {
        let mut s = DrawState::default();
        s.dash_array = Some(DashArray {
            dashes: vec![1.0, 3.0],
            offset: 0.0,
        });
        let (style, spacing) = line_style(&s, 9600.0);
        assert_eq!(style, FigLineStyle::Dotted);
        assert_eq!(spacing, 1.0);
    }

    #[test]
    fn fill_levels() {
        let mut s = DrawState::default();
        assert_eq!(fill_level(&s), -1);
        s.fill_type = 1;
        s.fill_color_base = Rgb48::BLACK;
        assert_eq!(fill_level(&s), 20);
        s.fill_type = 0xffff;
        assert_eq!(fill_level(&s), 0);
        s.fill_color_base = Rgb48::new(0xffff, 0, 0);
        assert_eq!(fill_level(&s), 40);
    }

    // ==================== Color tests ====================

    #[test]
    fn user_colors_go_in_the_header() {
        let mut f = Fixture::new();
        f.state.fg_color = Rgb48::new(0x1212, 0x3434, 0x5656);
        let pts = [dvec2(0.0, 0.0), dvec2(5.0, 5.0)];
        let out = f.run(|fig, cx| fig.draw_polyline(cx, &poly(&pts)).unwrap());
        assert!(out.contains("\n2 1 0 0 32 0 "));
        let header = f.fig.header(&f.params);
        assert!(header.starts_with("#FIG 3.2\nPortrait\nFlush Left\nInches\nLetter\n"));
        assert!(header.ends_with("1200 2\n#COLOR\n0 32 #123456\n"));
    }

    #[test]
    fn full_palette_warns_once_and_falls_back() {
        let mut f = Fixture::new();
        f.run(|fig, cx| {
            for i in 0..(MAX_USER_COLORS as u32 + 3) {
                let c = Rgb24::from_u32(0x010101 + i * 7).to_rgb48();
                fig.color_index(cx, c);
            }
            assert_eq!(fig.user_colors().len(), MAX_USER_COLORS - 1);
            assert_eq!(fig.color_index(cx, Rgb48::WHITE), 7);
        });
        assert_eq!(f.warnings.issued(), &[Warning::PaletteFull]);
    }

    #[test]
    fn viewport_is_flipped_fig_units() {
        let r = FigBackend::new().device_range(&PlotterParams::default());
        // letter: an 8 inch square, 1.5 inches from the top
        assert!((r.left - 300.0).abs() < 1e-9);
        assert!((r.right - 9900.0).abs() < 1e-9);
        assert!((r.bottom - 11400.0).abs() < 1e-9);
        assert!((r.top - 1800.0).abs() < 1e-9);
    }
}
