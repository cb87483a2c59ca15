//! Tektronix 4014 output.
//!
//! A storage-tube terminal cannot erase single objects or fill anything,
//! so paths are drawn while they are being built: every segment is
//! clipped to the 4096x3120 addressable area and sent as a vector the
//! moment it is appended. Painting a finished path does nothing.
//!
//! The terminal's mode, position and line type are mirrored here so that
//! escapes are only sent when something changes.

use glam::DVec2;

use super::{Backend, Cx, DeviceRange, Polyline};
use crate::caps::{self, Capabilities};
use crate::errors::PlotError;
use crate::geometry::clip::ClipRect;
use crate::log::debug;
use crate::params::{PlotterParams, TekTerm};
use crate::path::{Path, Segment};
use crate::state::DrawState;
use crate::state::modes::{CapStyle, LineType};
use crate::types::{IPoint, Rgb24, Rgb48};

const X_MAX: i32 = 4095;
const Y_MAX: i32 = 3119;

/// The square viewport sits in the middle of the screen.
const VIEWPORT_IMIN: i32 = 488;
const VIEWPORT_IMAX: i32 = 3607;

const ENTER_ALPHA: u8 = 0x1f;
const ENTER_PLOT: u8 = 0x1d;
const ENTER_POINT: u8 = 0x1c;

/// VT340 escape switching an emulator into Tek mode.
const ENTER_TEK: &[u8] = b"\x1b[?38h";
const KERMIT_EXIT: &[u8] = b"\x1b[?38l";
const XTERM_EXIT: &[u8] = b"\x1b\x03";
const ERASE: &[u8] = b"\x1b\x0c";

/// ANSI colors understood by the kermit emulator, with their foreground
/// and background escapes.
const KERMIT_COLORS: [(Rgb24, &str, &str); 16] = [
    (Rgb24::new(0x00, 0x00, 0x00), "\x1b[0;30m", "\x1b[0;40m"),
    (Rgb24::new(0x8b, 0x00, 0x00), "\x1b[0;31m", "\x1b[0;41m"),
    (Rgb24::new(0x00, 0x8b, 0x00), "\x1b[0;32m", "\x1b[0;42m"),
    (Rgb24::new(0x8b, 0x8b, 0x00), "\x1b[0;33m", "\x1b[0;43m"),
    (Rgb24::new(0x00, 0x00, 0x8b), "\x1b[0;34m", "\x1b[0;44m"),
    (Rgb24::new(0x8b, 0x00, 0x8b), "\x1b[0;35m", "\x1b[0;45m"),
    (Rgb24::new(0x00, 0x8b, 0x8b), "\x1b[0;36m", "\x1b[0;46m"),
    (Rgb24::new(0x8b, 0x8b, 0x8b), "\x1b[0;37m", "\x1b[0;47m"),
    (Rgb24::new(0x4d, 0x4d, 0x4d), "\x1b[1;30m", "\x1b[1;40m"),
    (Rgb24::new(0xff, 0x00, 0x00), "\x1b[1;31m", "\x1b[1;41m"),
    (Rgb24::new(0x00, 0xff, 0x00), "\x1b[1;32m", "\x1b[1;42m"),
    (Rgb24::new(0xff, 0xff, 0x00), "\x1b[1;33m", "\x1b[1;43m"),
    (Rgb24::new(0x00, 0x00, 0xff), "\x1b[1;34m", "\x1b[1;44m"),
    (Rgb24::new(0xff, 0x00, 0xff), "\x1b[1;35m", "\x1b[1;45m"),
    (Rgb24::new(0x00, 0xff, 0xff), "\x1b[1;36m", "\x1b[1;46m"),
    (Rgb24::new(0xff, 0xff, 0xff), "\x1b[1;37m", "\x1b[1;47m"),
];

/// Nearest kermit color. White is only chosen for white itself.
fn kermit_color(c: Rgb48) -> usize {
    let c = c.to_rgb24();
    if c == Rgb24::WHITE {
        return KERMIT_COLORS.len() - 1;
    }
    let mut best = 0;
    let mut best_distance = i32::MAX;
    for (i, (k, _, _)) in KERMIT_COLORS.iter().enumerate() {
        if *k == Rgb24::WHITE {
            continue;
        }
        let d = k.distance_sq(c);
        if d < best_distance {
            best_distance = d;
            best = i;
        }
    }
    best
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Alpha,
    Plot,
    Point,
}

/// The address of `p` in 12-bit extended (EGM) form: Hi_Y, EGM, Lo_Y,
/// Hi_X, Lo_X.
fn vector(p: IPoint, out: &mut Vec<u8>) {
    let (x, y) = (p.x, p.y);
    let egm = (((y & 3) << 2) | (x & 3)) as u8;
    out.extend_from_slice(&[
        ((y >> 7) & 0x1f) as u8 | 0x20,
        egm | 0x60,
        ((y >> 2) & 0x1f) as u8 | 0x60,
        ((x >> 7) & 0x1f) as u8 | 0x20,
        ((x >> 2) & 0x1f) as u8 | 0x40,
    ]);
}

/// A vector to `p` from `old`, omitting the high bytes the terminal
/// already holds. Nothing is written for a zero-length vector unless
/// `force` is set.
fn vector_compressed(p: IPoint, old: IPoint, force: bool, out: &mut Vec<u8>) {
    if !force && p == old {
        return;
    }
    let (x, y) = (p.x, p.y);
    let x_high = ((x >> 7) & 0x1f) as u8;
    let y_high = ((y >> 7) & 0x1f) as u8;
    if y_high != ((old.y >> 7) & 0x1f) as u8 {
        out.push(y_high | 0x20);
    }
    // EGM and Lo_Y are always sent; emulators mishandle their omission
    out.push((((y & 3) << 2) | (x & 3)) as u8 | 0x60);
    out.push(((y >> 2) & 0x1f) as u8 | 0x60);
    if x_high != ((old.x >> 7) & 0x1f) as u8 {
        out.push(x_high | 0x20);
    }
    out.push(((x >> 2) & 0x1f) as u8 | 0x40);
}

#[derive(Debug)]
pub struct TekBackend {
    term: TekTerm,
    clip: ClipRect,
    /// `None` until the terminal's state is known.
    mode: Option<Mode>,
    position: Option<IPoint>,
    line_type: Option<LineType>,
    kermit_fg: Option<usize>,
    kermit_bg: Option<usize>,
}

impl TekBackend {
    pub fn new(params: &PlotterParams) -> Self {
        TekBackend {
            term: params.term,
            clip: ClipRect::pixels(0, X_MAX, 0, Y_MAX),
            mode: None,
            position: None,
            line_type: None,
            kermit_fg: None,
            kermit_bg: None,
        }
    }

    fn set_mode(&mut self, mode: Mode, out: &mut Vec<u8>) {
        if self.mode == Some(mode) {
            return;
        }
        match mode {
            Mode::Alpha => out.push(ENTER_ALPHA),
            Mode::Plot => {
                // a 4014 only switches downward, so leave point mode via alpha
                if matches!(self.mode, None | Some(Mode::Point)) {
                    out.push(ENTER_ALPHA);
                }
                out.push(ENTER_PLOT);
            }
            Mode::Point => {
                if self.mode.is_none() {
                    out.push(ENTER_ALPHA);
                }
                out.push(ENTER_POINT);
            }
        }
        self.mode = Some(mode);
    }

    /// A dark move to `p`. Entering plot or point mode afresh keeps the
    /// first vector from being drawn.
    fn move_to(&mut self, state: &DrawState, p: IPoint, out: &mut Vec<u8>) {
        let mode = if state.points_are_connected {
            Mode::Plot
        } else {
            Mode::Point
        };
        out.push(if mode == Mode::Plot { ENTER_PLOT } else { ENTER_POINT });
        vector(p, out);
        self.position = Some(p);
        self.mode = Some(mode);
    }

    fn set_line_type(&mut self, state: &DrawState, out: &mut Vec<u8>) {
        if self.line_type == Some(state.line_type) {
            return;
        }
        let kermit = self.term == TekTerm::Kermit;
        // kermit swaps dot-dashed and short-dashed
        let escape: &[u8] = match state.line_type {
            LineType::Solid => b"\x1b`",
            LineType::Dotted => b"\x1ba",
            LineType::DotDashed if kermit => b"\x1bc",
            LineType::DotDashed => b"\x1bb",
            LineType::ShortDashed if kermit => b"\x1bb",
            LineType::ShortDashed => b"\x1bc",
            LineType::LongDashed => b"\x1bd",
            LineType::DotDotDashed if kermit => b"\x1be",
            LineType::DotDotDashed | LineType::DotDotDotDashed => b"\x1bb",
        };
        out.extend_from_slice(escape);
        self.line_type = Some(state.line_type);
    }

    fn set_pen_color(&mut self, state: &DrawState, out: &mut Vec<u8>) {
        if self.term != TekTerm::Kermit {
            return;
        }
        let k = kermit_color(state.fg_color);
        if self.kermit_fg != Some(k) {
            out.extend_from_slice(KERMIT_COLORS[k].1.as_bytes());
            self.kermit_fg = Some(k);
        }
    }

    fn set_bg_color(&mut self, state: &DrawState, out: &mut Vec<u8>) {
        if self.term != TekTerm::Kermit {
            return;
        }
        let k = kermit_color(state.bg_color);
        if self.kermit_bg != Some(k) {
            out.extend_from_slice(KERMIT_COLORS[k].2.as_bytes());
            self.kermit_bg = Some(k);
        }
    }

    /// Draw the vector `d0 → d1`, in device coordinates. `first` marks the
    /// opening segment of a polyline, which is always made visible.
    fn stroke_segment(&mut self, state: &DrawState, d0: DVec2, d1: DVec2, first: bool, out: &mut Vec<u8>) {
        let same_point = d0 == d1;
        let Some(clipped) = self.clip.clip_line(d0, d1) else {
            return;
        };
        let start = IPoint::round(clipped.p0);
        let end = IPoint::round(clipped.p1);
        let mode = if state.points_are_connected {
            Mode::Plot
        } else {
            Mode::Point
        };
        if first || self.position != Some(start) || self.mode != Some(mode) {
            self.move_to(state, start, out);
        }
        self.set_line_type(state, out);
        self.set_pen_color(state, out);
        self.set_bg_color(state, out);
        let force = first && (!same_point || state.cap == CapStyle::Round);
        vector_compressed(end, start, force, out);
        self.position = Some(end);
    }

    /// Without a color emulator, white ink would be invisible.
    fn ink_is_visible(&self, state: &DrawState) -> bool {
        state.pen_type != 0 && (self.term == TekTerm::Kermit || state.fg_color != Rgb48::WHITE)
    }
}

impl Backend for TekBackend {
    fn caps(&self) -> &'static Capabilities {
        &caps::TEK
    }

    fn device_range(&self, _params: &PlotterParams) -> DeviceRange {
        DeviceRange::pixels(VIEWPORT_IMIN, VIEWPORT_IMAX, 0, Y_MAX)
    }

    fn begin_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        if matches!(self.term, TekTerm::Xterm | TekTerm::Kermit) {
            cx.page.write_bytes(ENTER_TEK);
        }
        Ok(())
    }

    fn end_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        let mut out = Vec::new();
        self.move_to(cx.state, IPoint::new(0, 0), &mut out);
        self.set_mode(Mode::Alpha, &mut out);
        match self.term {
            TekTerm::Kermit => out.extend_from_slice(KERMIT_EXIT),
            TekTerm::Xterm => out.extend_from_slice(XTERM_EXIT),
            TekTerm::Generic => {}
        }
        cx.page.write_bytes(&out);
        Ok(())
    }

    fn erase_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        let mut out = ERASE.to_vec();
        self.mode = Some(Mode::Alpha);
        self.set_bg_color(cx.state, &mut out);
        cx.page.write_bytes(&out);
        debug!(term = ?self.term, "tek erase");
        Ok(())
    }

    /// Everything was drawn as it was appended.
    fn paint_path(&mut self, _cx: &mut Cx<'_>, _path: &Path) -> Result<(), PlotError> {
        Ok(())
    }

    fn path_is_flushable(&self, _state: &DrawState) -> bool {
        false
    }

    fn maybe_prepaint_segments(&mut self, cx: &mut Cx<'_>, path: &Path, prev_num_segments: usize) -> Result<(), PlotError> {
        let segs = path.segments();
        if segs.len() < 2 || segs.len() == prev_num_segments || !self.ink_is_visible(cx.state) {
            return Ok(());
        }
        let mut out = Vec::new();
        for i in prev_num_segments.max(1)..segs.len() {
            let d0 = cx.to_device(segs[i - 1].endpoint());
            let d1 = cx.to_device(segs[i].endpoint());
            if matches!(segs[i], Segment::MoveTo(_)) {
                continue;
            }
            self.stroke_segment(cx.state, d0, d1, i == 1, &mut out);
        }
        cx.page.write_bytes(&out);
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
        let mut out = Vec::new();
        self.set_mode(Mode::Point, &mut out);
        self.set_pen_color(cx.state, &mut out);
        vector(d, &mut out);
        self.position = Some(d);
        cx.page.write_bytes(&out);
        Ok(())
    }

    /// Polylines handed over directly, such as the outline of a dot, are
    /// stroked segment by segment.
    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
        if !self.ink_is_visible(cx.state) {
            return Ok(());
        }
        let mut out = Vec::new();
        for (i, w) in poly.device.windows(2).enumerate() {
            self.stroke_segment(cx.state, w[0], w[1], i == 0, &mut out);
        }
        cx.page.write_bytes(&out);
        Ok(())
    }
}
