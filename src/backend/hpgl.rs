//! HP-GL and HP-GL/2 output.
//!
//! Coordinates are scaled device units: the `SC` instruction in the page
//! header maps the viewport's corners (`IP`) to 0..10000 on each axis.
//! The backend mirrors the device's pen, line and fill state and emits an
//! instruction only when the wanted state differs from what it last sent.
//!
//! Colors are matched against a table of up to 32 pens. Pen 0 is white.
//! An HP-GL/2 device that accepts `PC` gets new pens defined on demand;
//! otherwise strokes are screened (`SV`, v2 only) and fills shaded (v2) or
//! cross-hatched (v1, v1.5) in a desaturated version of an existing pen.

use glam::{DVec2, dvec2};

use super::{Backend, Cx, DeviceRange, Dot, NativeArc, Polyline};
use crate::caps::{self, Capabilities};
use crate::color::{BuiltinColors, ColorNameCache};
use crate::errors::PlotError;
use crate::geometry;
use crate::log::debug;
use crate::params::{DEFAULT_HPGL_PENS, HpglVersion, PlotterParams};
use crate::path::{Path, Segment};
use crate::state::modes::{CapStyle, FillRule, JoinStyle, LineType};
use crate::types::{IPoint, Rgb24, iround};

const HPGL_UNITS_PER_INCH: f64 = 1016.0;

/// Scaled device coordinates run from 0 to this on both axes.
const SCALED_DEVICE_SIZE: f64 = 10000.0;

const MAX_PENS: usize = 32;

/// Pen string used by generic HP-GL devices when none is usable.
const HPGL1_DEFAULT_PENS: &str = "1=black";

/// Floor on the dash unit of builtin line types, in scaled device units.
const MIN_DASH_UNIT: f64 = SCALED_DEVICE_SIZE / 576.0;

/// User-defined line type slot used for dash patterns.
const SPECIAL_LINE_TYPE: i32 = 8;

/// Width of a typical plotter pen (0.3mm), in plotter units; used to pick
/// a cross-hatch spacing.
const NOMINAL_PEN_WIDTH: f64 = 12.0;

/// Pen widths are fractions of the P1-P2 diagonal.
const INITIAL_PEN_WIDTH: f64 = 0.001;
const POINT_PEN_WIDTH: f64 = 0.0001;

/// HP-GL/2's default miter limit.
const DEVICE_MITER_LIMIT: f64 = 5.0;

/// Native line type codes.
const LT_SOLID: i32 = -100;
const LT_DOTTED: i32 = 1;
const LT_SHORTDASHED: i32 = 2;
const LT_LONGDASHED: i32 = 3;
const LT_DOTDASHED: i32 = 5;
const LT_DOTDOTDASHED: i32 = 6;
/// Not a device line type; drawn as dot-dot-dashed.
const LT_DOTDOTDOTDASHED: i32 = -10;

fn native_line_type(t: LineType) -> i32 {
    match t {
        LineType::Solid => LT_SOLID,
        LineType::Dotted => LT_DOTTED,
        LineType::DotDashed => LT_DOTDASHED,
        LineType::ShortDashed => LT_SHORTDASHED,
        LineType::LongDashed => LT_LONGDASHED,
        LineType::DotDotDashed => LT_DOTDOTDASHED,
        LineType::DotDotDotDashed => LT_DOTDOTDOTDASHED,
    }
}

fn native_cap(cap: CapStyle) -> i32 {
    match cap {
        CapStyle::Butt => 1,
        CapStyle::Projecting => 2,
        CapStyle::Triangular => 3,
        CapStyle::Round => 4,
    }
}

fn native_join(join: JoinStyle) -> i32 {
    match join {
        // miter, falling back to bevel past the miter limit
        JoinStyle::Miter => 2,
        JoinStyle::Triangular => 3,
        JoinStyle::Round => 4,
        JoinStyle::Bevel => 5,
    }
}

/// Device state after `IN;`.
const DEVICE_CAP: i32 = 1;
const DEVICE_JOIN: i32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PenDefinition {
    Undefined,
    /// Defined with `PC` on this page.
    Soft,
    /// Present in the device's palette.
    Hard,
}

#[derive(Clone, Copy, Debug)]
struct Pen {
    color: Rgb24,
    definition: PenDefinition,
}

impl Pen {
    const UNDEFINED: Pen = Pen {
        color: Rgb24::BLACK,
        definition: PenDefinition::Undefined,
    };

    fn is_defined(&self) -> bool {
        self.definition != PenDefinition::Undefined
    }
}

/// Fill types as numbered by `FT`.
#[derive(Clone, Copy, Debug, PartialEq)]
enum FillType {
    SolidBidirectional,
    SolidUnidirectional,
    /// Crosshatch spacing in plotter units, and angle.
    Crosshatched(i32, i32),
    /// Shading level, percent.
    Shaded(f64),
}

/// Parse an `HPGL_PENS` string of `n=color` pairs separated by colons,
/// with pen numbers in 1..32. Returns None if any pair is malformed.
fn parse_pen_string(s: &str) -> Option<Vec<(usize, Rgb24)>> {
    let mut names = ColorNameCache::default();
    let mut pens = Vec::new();
    for item in s.split(':').filter(|item| !item.is_empty()) {
        let (number, name) = item.split_once('=')?;
        let n: usize = number.trim().parse().ok()?;
        if !(1..MAX_PENS).contains(&n) {
            return None;
        }
        let color = names.resolve(name.trim(), &BuiltinColors)?;
        pens.push((n, color.to_rgb24()));
    }
    Some(pens)
}

#[derive(Debug)]
pub struct HpglBackend {
    version: HpglVersion,
    rotation: i32,
    opaque: bool,
    can_assign_colors: bool,
    pens: [Pen; MAX_PENS],
    /// Next pen to soft-define.
    free_pen: usize,

    // mirrored device state
    pen: usize,
    /// The last color request resolved to pen 0, which is not drawn with.
    bad_pen: bool,
    pen_down: bool,
    /// Screening level of strokes in percent; None is solid.
    screening: Option<f64>,
    /// None until an absolute move has been sent.
    position: Option<IPoint>,
    pen_width: f64,
    line_type: i32,
    cap: i32,
    join: i32,
    miter_limit: f64,
    fill_type: FillType,
}

impl HpglBackend {
    pub fn new(params: &PlotterParams) -> Self {
        let version = params.hpgl_version;
        let rotation = match params.hpgl_rotate {
            90 => 90,
            180 | 270 if version == HpglVersion::V2 => params.hpgl_rotate,
            _ => 0,
        };
        let mut can_assign_colors = version == HpglVersion::V2 && params.hpgl_assign_colors;

        let mut pens = [Pen::UNDEFINED; MAX_PENS];
        pens[0] = Pen {
            color: Rgb24::WHITE,
            definition: PenDefinition::Hard,
        };
        let parsed = parse_pen_string(&params.hpgl_pens)
            .filter(|p| can_assign_colors || p.iter().any(|&(n, _)| n == 1))
            .or_else(|| {
                let default = if version == HpglVersion::V1 {
                    HPGL1_DEFAULT_PENS
                } else {
                    DEFAULT_HPGL_PENS
                };
                debug!(pens = %params.hpgl_pens, "unusable pen string, using the default");
                parse_pen_string(default)
            })
            .unwrap_or_default();
        for (n, color) in parsed {
            pens[n] = Pen {
                color,
                definition: PenDefinition::Hard,
            };
        }
        let free_pen = (2..MAX_PENS).find(|&i| !pens[i].is_defined());
        if free_pen.is_none() {
            can_assign_colors = false;
        }

        HpglBackend {
            version,
            rotation,
            opaque: params.hpgl_opaque_mode,
            can_assign_colors,
            pens,
            free_pen: free_pen.unwrap_or(2),
            pen: 1,
            bad_pen: false,
            pen_down: false,
            screening: None,
            position: None,
            pen_width: INITIAL_PEN_WIDTH,
            line_type: LT_SOLID,
            cap: DEVICE_CAP,
            join: DEVICE_JOIN,
            miter_limit: DEVICE_MITER_LIMIT,
            fill_type: FillType::SolidBidirectional,
        }
    }

    fn v2(&self) -> bool {
        self.version == HpglVersion::V2
    }

    /// Pen 0 may be drawn with only on devices that are opaque or take
    /// color assignments.
    fn use_pen_zero(&self) -> bool {
        self.v2() && (self.opaque || self.can_assign_colors)
    }

    /// Forget soft-defined pens and return the mirror to its power-on
    /// state.
    fn reset_device_state(&mut self) {
        for pen in &mut self.pens {
            if pen.definition == PenDefinition::Soft {
                *pen = Pen::UNDEFINED;
            }
        }
        if self.can_assign_colors {
            match (2..MAX_PENS).find(|&i| !self.pens[i].is_defined()) {
                Some(i) => self.free_pen = i,
                None => self.can_assign_colors = false,
            }
        }
        self.pen = 1;
        self.bad_pen = false;
        self.pen_down = false;
        self.screening = None;
        self.position = None;
        self.pen_width = INITIAL_PEN_WIDTH;
        self.line_type = LT_SOLID;
        self.cap = DEVICE_CAP;
        self.join = DEVICE_JOIN;
        self.miter_limit = DEVICE_MITER_LIMIT;
        self.fill_type = FillType::SolidBidirectional;
    }

    /// Scaling points P1 and P2 in plotter units: the viewport corners,
    /// measured from the device origin by the page offsets only.
    fn scaling_points(params: &PlotterParams) -> (IPoint, IPoint) {
        let page = &params.page_size;
        let p1 = dvec2(page.xoffset, page.yoffset) * HPGL_UNITS_PER_INCH;
        let p2 = dvec2(page.xoffset + page.xsize, page.yoffset + page.ysize) * HPGL_UNITS_PER_INCH;
        (IPoint::round(p1), IPoint::round(p2))
    }

    fn header(&self, params: &PlotterParams) -> String {
        let mut out = String::new();
        if self.v2() {
            out.push_str("BP;IN;");
            let plot_length = params.page_size.paper.hpgl2_plot_length * HPGL_UNITS_PER_INCH;
            out.push_str(&format!("PS{};", iround(plot_length)));
        } else {
            out.push_str("IN;");
        }
        if self.rotation != 0 {
            out.push_str(&format!("RO{};", self.rotation));
        }
        let (p1, p2) = Self::scaling_points(params);
        out.push_str(&format!("IP{p1},{p2};"));
        out.push_str(&format!("SC0,{0},0,{0};", SCALED_DEVICE_SIZE as i32));
        if self.v2() {
            if self.can_assign_colors {
                out.push_str(&format!("NP{MAX_PENS};"));
            }
            out.push_str("WU1;");
        }
        out.push_str("SP1;");
        if self.v2() && self.opaque {
            out.push_str("TR0;");
        }
        out
    }

    // ==================== Pens ====================

    fn find_pen(&self, c: Rgb24) -> Option<usize> {
        self.pens.iter().position(|p| p.is_defined() && p.color == c)
    }

    /// Nearest defined pen. A color other than white never maps to pen 0
    /// when `restrict_white` is set.
    fn pseudocolor(&self, c: Rgb24, restrict_white: bool) -> usize {
        if c == Rgb24::WHITE {
            return 0;
        }
        let start = if restrict_white { 1 } else { 0 };
        let mut best = 0;
        let mut difference = i32::MAX;
        for (i, pen) in self.pens.iter().enumerate().skip(start) {
            if !pen.is_defined() {
                continue;
            }
            let d = pen.color.distance_sq(c);
            if d < difference {
                difference = d;
                best = i;
            }
        }
        best
    }

    /// The pen whose desaturated color (a point on the segment from white
    /// to the pen color) lies nearest `c`, with the shading fraction
    /// along that segment.
    fn shaded_pseudocolor(&self, c: Rgb24) -> (usize, f64) {
        let shifted = |c: Rgb24| [c.r as f64 - 255.0, c.g as f64 - 255.0, c.b as f64 - 255.0];
        let target = shifted(c);
        let mut best = 0;
        let mut best_shading = 0.0;
        let mut difference = f64::MAX;
        for (i, pen) in self.pens.iter().enumerate().skip(1) {
            if !pen.is_defined() || pen.color == Rgb24::WHITE {
                continue;
            }
            let o = shifted(pen.color);
            let norm_sq: f64 = o.iter().map(|v| v * v).sum();
            let dot: f64 = o.iter().zip(&target).map(|(a, b)| a * b).sum();
            let shading = dot / norm_sq;
            let d: f64 = o.iter().zip(&target).map(|(a, b)| (shading * a - b).powi(2)).sum();
            if d < difference {
                difference = d;
                best = i;
                best_shading = shading;
            }
        }
        (best, best_shading.max(0.0))
    }

    fn select_pen(&mut self, cx: &mut Cx<'_>, n: usize) {
        if n == self.pen {
            return;
        }
        let mut out = String::new();
        if self.pen_down {
            out.push_str("PU;");
            self.pen_down = false;
        }
        out.push_str(&format!("SP{n};"));
        cx.page.write_bytes(out.as_bytes());
        self.pen = n;
    }

    /// Soft-define the free pen as `c`, select it and move the free pen
    /// along, skipping pens in the device palette.
    fn assign_pen(&mut self, cx: &mut Cx<'_>, c: Rgb24) {
        let n = self.free_pen;
        cx.page
            .write_bytes(format!("PC{n},{},{},{};", c.r, c.g, c.b).as_bytes());
        self.pens[n] = Pen {
            color: c,
            definition: PenDefinition::Soft,
        };
        self.select_pen(cx, n);
        loop {
            self.free_pen = (self.free_pen + 1) % MAX_PENS;
            if self.pens[self.free_pen].definition != PenDefinition::Hard {
                break;
            }
        }
    }

    /// Select a pen for stroking in the pen color. Sets `bad_pen` if the
    /// best pen is one that is not drawn with.
    fn set_pen_color(&mut self, cx: &mut Cx<'_>) {
        let c = cx.state.fg_color.to_rgb24();
        let (n, screening) = match self.find_pen(c) {
            Some(n) => (n, None),
            None if self.v2() && self.can_assign_colors => {
                self.assign_pen(cx, c);
                self.set_screening(cx, None);
                self.bad_pen = false;
                return;
            }
            None if self.v2() => {
                let (n, shading) = self.shaded_pseudocolor(c);
                (n, Some(100.0 * shading))
            }
            None => (self.pseudocolor(c, true), None),
        };
        if n != 0 || self.use_pen_zero() {
            self.select_pen(cx, n);
            if self.v2() {
                self.set_screening(cx, screening);
            }
            self.bad_pen = false;
        } else {
            self.bad_pen = true;
        }
    }

    /// Screen strokes at a shading level, or draw them solid.
    fn set_screening(&mut self, cx: &mut Cx<'_>, level: Option<f64>) {
        if level == self.screening {
            return;
        }
        let out = match level {
            Some(level) => format!("SV1,{level:.1};"),
            None => "SV;".to_string(),
        };
        cx.page.write_bytes(out.as_bytes());
        self.screening = level;
    }

    /// Select a pen and fill type for filling in the fill color, or in
    /// the pen color if `force_pen_color`.
    fn set_fill_color(&mut self, cx: &mut Cx<'_>, force_pen_color: bool) {
        if !force_pen_color && cx.state.fill_type == 0 {
            return;
        }
        let c = if force_pen_color {
            cx.state.fg_color
        } else {
            cx.state.fill_color
        }
        .to_rgb24();

        if let Some(n) = self.find_pen(c) {
            if n != 0 || self.use_pen_zero() {
                self.select_pen(cx, n);
                self.set_fill_type(cx, FillType::SolidUnidirectional);
                self.bad_pen = false;
            } else {
                self.bad_pen = true;
            }
        } else if self.v2() && self.can_assign_colors {
            self.assign_pen(cx, c);
            self.set_fill_type(cx, FillType::SolidUnidirectional);
            self.bad_pen = false;
        } else if self.v2() {
            let (n, shading) = self.shaded_pseudocolor(c);
            if n != 0 || self.use_pen_zero() {
                self.select_pen(cx, n);
                self.set_fill_type(cx, FillType::Shaded(100.0 * shading));
                self.bad_pen = false;
            } else {
                self.bad_pen = true;
            }
        } else {
            // no shading in firmware: emulate it by crosshatching at 45
            // degrees, the way the HP7550B does
            let (n, shading) = self.shaded_pseudocolor(c);
            if n != 0 && shading > 0.01 {
                self.select_pen(cx, n);
                let spacing = NOMINAL_PEN_WIDTH * (1.0 + (1.0 - shading).sqrt()) / shading;
                self.set_fill_type(cx, FillType::Crosshatched(iround(spacing), 45));
                self.bad_pen = false;
            } else {
                self.bad_pen = true;
            }
        }
    }

    fn set_fill_type(&mut self, cx: &mut Cx<'_>, fill: FillType) {
        if fill == self.fill_type {
            return;
        }
        let out = match fill {
            FillType::SolidBidirectional => "FT1;".to_string(),
            FillType::SolidUnidirectional => "FT2;".to_string(),
            FillType::Shaded(level) => format!("FT10,{level:.1};"),
            FillType::Crosshatched(spacing, angle) => {
                // spacing is in plotter units, so unscale around FT; the
                // hatch lines are drawn with the current line type
                self.line_type = LT_SOLID;
                format!("LT;SC;FT4,{spacing},{angle};SC0,{0},0,{0};", SCALED_DEVICE_SIZE as i32)
            }
        };
        cx.page.write_bytes(out.as_bytes());
        self.fill_type = fill;
    }

    // ==================== Line attributes ====================

    fn set_attributes(&mut self, cx: &mut Cx<'_>) {
        let state = cx.state;
        let diagonal = std::f64::consts::SQRT_2 * SCALED_DEVICE_SIZE;
        let pen_width = state.device_line_width / diagonal;
        let wanted_type = native_line_type(state.line_type);
        let mut out = String::new();

        match self.version {
            HpglVersion::V2 => {
                if state.dash_array.is_some() || self.line_type != wanted_type || self.pen_width != pen_width {
                    let (min_sv, _) = state.transform.m.singular_values();
                    let dashes: Vec<f64> = match &state.dash_array {
                        Some(d) => d.dashes.iter().map(|&v| min_sv * v).collect(),
                        None => {
                            let unit = MIN_DASH_UNIT.max(state.device_line_width);
                            state.line_type.dashes().iter().map(|&d| unit * d as f64).collect()
                        }
                    };
                    let cycle: f64 = dashes.iter().sum();
                    if dashes.is_empty() || cycle == 0.0 {
                        out.push_str("LT;");
                        self.line_type = LT_SOLID;
                    } else {
                        // an odd pattern is doubled: HP-GL/2 does not
                        // alternate on and off across repetitions
                        let odd = dashes.len() % 2 == 1;
                        let repeats = if odd { 2 } else { 1 };
                        let fraction = if odd { 0.5 } else { 1.0 };
                        out.push_str(&format!("UL{SPECIAL_LINE_TYPE}"));
                        for _ in 0..repeats {
                            for d in &dashes {
                                out.push_str(&format!(",{:.3}", 100.0 * fraction * d / cycle));
                            }
                        }
                        out.push(';');
                        let interval = 100.0 * repeats as f64 * cycle / diagonal;
                        out.push_str(&format!("LT{SPECIAL_LINE_TYPE},{interval:.4};"));
                        self.line_type = if state.dash_array.is_some() {
                            SPECIAL_LINE_TYPE
                        } else {
                            wanted_type
                        };
                    }
                }
            }
            HpglVersion::V1 | HpglVersion::V15 => {
                // dash arrays are approximated by the nearest builtin type
                let pair = state
                    .dash_array
                    .as_ref()
                    .and_then(|d| <[f64; 2]>::try_from(d.dashes.as_slice()).ok());
                let equal = pair.filter(|&[on, off]| on == off);
                let one_to_three = pair.filter(|&[on, off]| off > (3.0 - 1e-7) * on && off < (3.0 + 1e-7) * on);
                if self.line_type != wanted_type || equal.is_some() || one_to_three.is_some() {
                    let (min_sv, _) = state.transform.m.singular_values();
                    let (line_type, cycle) = if let Some([on, _]) = equal {
                        (LineType::ShortDashed, min_sv * 2.0 * on)
                    } else if let Some([on, _]) = one_to_three {
                        (LineType::Dotted, min_sv * 2.0 * 4.0 * on)
                    } else {
                        let unit = MIN_DASH_UNIT.max(state.device_line_width).max(1.0);
                        (state.line_type, unit * state.line_type.dash_cycle() as f64)
                    };
                    let interval = 100.0 * cycle / diagonal;
                    match line_type {
                        LineType::Solid => out.push_str("LT;"),
                        // the device's dots are too sparse; use short
                        // dashes at half the period
                        LineType::Dotted => out.push_str(&format!("LT{LT_SHORTDASHED},{:.4};", 0.5 * interval)),
                        LineType::DotDotDotDashed => out.push_str(&format!("LT{LT_DOTDOTDASHED},{interval:.4};")),
                        t => out.push_str(&format!("LT{},{interval:.4};", native_line_type(t))),
                    }
                    self.line_type = wanted_type;
                }
            }
        }

        if self.v2() {
            let (cap, join) = (native_cap(state.cap), native_join(state.join));
            if cap != self.cap || join != self.join {
                out.push_str(&format!("LA1,{cap},2,{join};"));
                self.cap = cap;
                self.join = join;
            }
            if self.miter_limit != state.miter_limit {
                let limit = state.miter_limit.clamp(1.0, 32767.0).floor() as i32;
                out.push_str(&format!("LA3,{limit};"));
                self.miter_limit = state.miter_limit;
            }
            if self.pen_width != pen_width {
                out.push_str(&format!("PW{:.4};", 100.0 * pen_width));
                self.pen_width = pen_width;
            }
        }
        cx.page.write_bytes(out.as_bytes());
    }

    /// Move the pen, lifted, to `p` (device) unless it is known to be
    /// there.
    fn set_position(&mut self, cx: &mut Cx<'_>, p: DVec2) {
        let p = IPoint::round(p);
        if self.position == Some(p) {
            return;
        }
        let mut out = String::new();
        if self.pen_down {
            out.push_str("PU;");
            self.pen_down = false;
        }
        out.push_str(&format!("PA{p};"));
        cx.page.write_bytes(out.as_bytes());
        self.position = Some(p);
    }

    fn pen_down(&mut self, out: &mut String) {
        if !self.pen_down {
            out.push_str("PD;");
            self.pen_down = true;
        }
    }

    // ==================== Painting ====================

    /// Stroke and fill a quantized segment list. `elements[0]` is the
    /// starting point.
    fn paint_elements(&mut self, cx: &mut Cx<'_>, elements: &[Element], closed: bool) -> Result<(), PlotError> {
        let state = cx.state;
        let use_polygon_buffer = match self.version {
            HpglVersion::V2 => true,
            HpglVersion::V15 => elements.len() > 2 || state.fill_type != 0,
            HpglVersion::V1 => false,
        };

        // sync the pen even when only filling, so that a v2 file sent to
        // an older device still draws in the right color
        self.set_pen_color(cx);
        if self.bad_pen && self.version == HpglVersion::V1 {
            return Ok(());
        }
        self.set_attributes(cx);
        self.set_position(cx, elements[0].point().as_dvec2());

        let mut out = String::new();
        if use_polygon_buffer {
            out.push_str("PM0;");
        }
        if use_polygon_buffer || state.pen_type != 0 {
            self.pen_down(&mut out);
            write_runs(&mut out, &elements[1..], self.version);
        }
        cx.page.write_bytes(out.as_bytes());

        if use_polygon_buffer {
            let close_out = if closed { "PM2;PU;" } else { "PU;PM2;" };
            cx.page.write_bytes(close_out.as_bytes());
            self.pen_down = false;

            if state.fill_type != 0 {
                self.set_fill_color(cx, false);
                if !self.bad_pen {
                    let fill = if state.fill_rule == FillRule::NonzeroWinding && self.v2() {
                        "FP1;"
                    } else {
                        "FP;"
                    };
                    cx.page.write_bytes(fill.as_bytes());
                }
                // crosshatching may have reset the line type
                if !self.v2() {
                    self.set_attributes(cx);
                }
            }
            if state.pen_type != 0 {
                self.set_pen_color(cx);
                if !self.bad_pen {
                    cx.page.write_bytes(b"EP;");
                }
            }
        }
        // the pen ends at the start or the end depending on the device
        self.position = None;
        Ok(())
    }
}

/// A quantized piece of a segment list.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Element {
    Line(IPoint),
    /// Center and signed sweep in degrees, counterclockwise in the device
    /// frame; `p` is the endpoint.
    Arc { p: IPoint, center: IPoint, degrees: f64 },
    Cubic { p: IPoint, c1: IPoint, c2: IPoint },
}

impl Element {
    fn point(&self) -> IPoint {
        match *self {
            Element::Line(p) | Element::Arc { p, .. } | Element::Cubic { p, .. } => p,
        }
    }
}

/// Append `PA`, `BZ` and `AA` instructions for `elements`, merging runs of
/// the same kind.
fn write_runs(out: &mut String, elements: &[Element], version: HpglVersion) {
    let mut i = 0;
    while i < elements.len() {
        match elements[i] {
            Element::Line(_) => {
                out.push_str("PA");
                let mut first = true;
                while let Some(Element::Line(p)) = elements.get(i) {
                    if !first {
                        out.push(',');
                    }
                    out.push_str(&p.to_string());
                    first = false;
                    i += 1;
                }
                out.push(';');
            }
            Element::Cubic { .. } => {
                out.push_str("BZ");
                let mut first = true;
                while let Some(&Element::Cubic { p, c1, c2 }) = elements.get(i) {
                    if !first {
                        out.push(',');
                    }
                    out.push_str(&format!("{c1},{c2},{p}"));
                    first = false;
                    i += 1;
                }
                out.push(';');
            }
            Element::Arc { center, degrees, .. } => {
                let whole = iround(degrees);
                // generic HP-GL takes integer sweeps only
                if degrees == whole as f64 || version == HpglVersion::V1 {
                    out.push_str(&format!("AA{center},{whole};"));
                } else {
                    out.push_str(&format!("AA{center},{degrees:.3};"));
                }
                i += 1;
            }
        }
    }
}

impl Backend for HpglBackend {
    fn caps(&self) -> &'static Capabilities {
        match self.version {
            HpglVersion::V2 => &caps::HPGL2,
            HpglVersion::V15 => &caps::HPGL15,
            HpglVersion::V1 => &caps::HPGL1,
        }
    }

    fn device_range(&self, _params: &PlotterParams) -> DeviceRange {
        DeviceRange::real(0.0, SCALED_DEVICE_SIZE, 0.0, SCALED_DEVICE_SIZE)
    }

    fn begin_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        self.reset_device_state();
        debug!(page = cx.page.number, version = ?self.version, "hpgl page header");
        // the header lives outside the body so that erasing keeps it
        cx.page.header = self.header(cx.params).into_bytes();
        Ok(())
    }

    fn erase_page(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        // the erased body held every state change since the header
        self.reset_device_state();
        Ok(())
    }

    fn end_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        let mut out = String::new();
        if self.pen_down {
            out.push_str("PU;");
        }
        out.push_str("PA0,0;");
        if self.pen != 0 {
            out.push_str("SP0;");
        }
        if self.version != HpglVersion::V1 {
            out.push_str("PG0;");
        }
        out.push('\n');
        cx.page.trailer = out.into_bytes();
        self.position = None;
        self.pen_down = false;
        Ok(())
    }

    fn paint_point(&mut self, cx: &mut Cx<'_>, p: DVec2) -> Result<(), PlotError> {
        if cx.state.pen_type == 0 {
            return Ok(());
        }
        self.set_pen_color(cx);
        let mut round = cx.state.clone();
        round.join = JoinStyle::Round;
        round.cap = CapStyle::Round;
        let d = cx.to_device(p);
        {
            let mut inner = cx.with_state(&round);
            self.set_attributes(&mut inner);
            self.set_position(&mut inner, d);
        }
        let mut out = String::new();
        if self.v2() && self.pen_width != POINT_PEN_WIDTH {
            out.push_str(&format!("PW{:.4};", 100.0 * POINT_PEN_WIDTH));
            self.pen_width = POINT_PEN_WIDTH;
        }
        if !self.bad_pen {
            self.pen_down(&mut out);
            out.push_str("PU;");
            self.pen_down = false;
        }
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }

    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
        let closed = poly.device.len() >= 3 && poly.device.first() == poly.device.last();
        let elements: Vec<Element> = poly.device.iter().map(|&d| Element::Line(IPoint::round(d))).collect();
        self.paint_elements(cx, &elements, closed)
    }

    fn draw_segments(&mut self, cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
        let segs = path.segments();
        let Some(first) = segs.first() else {
            return Ok(());
        };
        let t = cx.state.transform;
        let q = |p: DVec2| IPoint::round(t.to_device(p));
        let mut elements = vec![Element::Line(q(first.endpoint()))];
        let mut last_user = first.endpoint();
        for seg in &segs[1..] {
            let p = q(seg.endpoint());
            if elements.last().map(Element::point) == Some(p) {
                continue;
            }
            let element = match *seg {
                Segment::Arc { p: p1, center } => {
                    let a = geometry::arc_angles(center, last_user, p1);
                    let mut degrees = if a.swapped { -a.sweep } else { a.sweep };
                    if !t.nonreflection {
                        degrees = -degrees;
                    }
                    Element::Arc {
                        p,
                        center: q(center),
                        degrees,
                    }
                }
                Segment::Cubic { c1, c2, .. } => Element::Cubic {
                    p,
                    c1: q(c1),
                    c2: q(c2),
                },
                _ => Element::Line(p),
            };
            elements.push(element);
            last_user = seg.endpoint();
        }
        if elements.len() == 1 {
            return self.draw_dot(
                cx,
                Dot {
                    user: first.endpoint(),
                    device: elements[0].point().as_dvec2(),
                },
            );
        }
        self.paint_elements(cx, &elements, path.is_closed())
    }

    fn draw_arc(&mut self, cx: &mut Cx<'_>, arc: &NativeArc) -> Result<(), PlotError> {
        let mut path = Path::new();
        path.add_moveto(arc.p0);
        path.add_arc(arc.center, arc.p1);
        self.draw_segments(cx, &path)
    }

    fn draw_box(&mut self, cx: &mut Cx<'_>, p0: DVec2, p1: DVec2, _clockwise: bool) -> Result<(), PlotError> {
        let state = cx.state;
        let start = cx.to_device(p0);
        self.set_attributes(cx);
        self.set_position(cx, start);
        let corner = IPoint::round(cx.to_device(p1));
        if state.fill_type != 0 {
            self.set_fill_color(cx, false);
            if !self.bad_pen {
                cx.page.write_bytes(format!("RA{corner};").as_bytes());
            }
            if !self.v2() {
                self.set_attributes(cx);
            }
        }
        if state.pen_type != 0 {
            self.set_pen_color(cx);
            if !self.bad_pen {
                cx.page.write_bytes(format!("EA{corner};").as_bytes());
            }
        }
        Ok(())
    }

    fn draw_circle(&mut self, cx: &mut Cx<'_>, center: DVec2, radius: f64, _clockwise: bool) -> Result<(), PlotError> {
        let state = cx.state;
        let r = iround(state.transform.m.apply_vector(dvec2(radius, 0.0)).length());
        let center = cx.to_device(center);
        self.set_attributes(cx);
        self.set_position(cx, center);
        if state.fill_type != 0 {
            self.set_fill_color(cx, false);
            if !self.bad_pen {
                cx.page.write_bytes(format!("WG{r},0,360;").as_bytes());
            }
            if !self.v2() {
                self.set_attributes(cx);
            }
        }
        if state.pen_type != 0 {
            self.set_pen_color(cx);
            if !self.bad_pen {
                cx.page.write_bytes(format!("CI{r};").as_bytes());
            }
        }
        Ok(())
    }

    /// A degenerate path: a wedge of the line width's diameter, filled in
    /// the pen color.
    fn draw_dot(&mut self, cx: &mut Cx<'_>, dot: Dot) -> Result<(), PlotError> {
        let state = cx.state;
        let r = 0.5 * state.line_width;
        let radius = iround(state.transform.m.apply_vector(dvec2(r, 0.0)).length());
        self.set_position(cx, dot.device);
        self.set_fill_color(cx, true);
        self.set_attributes(cx);
        if !self.bad_pen {
            cx.page.write_bytes(format!("WG{radius},0,360;").as_bytes());
        }
        if !self.v2() {
            self.set_attributes(cx);
        }
        Ok(())
    }
}
