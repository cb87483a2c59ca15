//! idraw-compatible PostScript output.
//!
//! Each object is a self-contained `Begin %I ... End` block carrying its
//! own brush, colors, fill pattern and transformation, so idraw can read
//! the file back. Coordinates are written as integers in user space scaled
//! up by a granularity factor, and the emitted matrix scales them back
//! down. Pages are held until the document is finished, since the DSC
//! header needs the page count and bounding box.

use glam::DVec2;

use super::{Backend, Cx, DeviceRange, Polyline};
use crate::caps::{self, Capabilities};
use crate::errors::PlotError;
use crate::matrix::Affine;
use crate::outbuf::{Document, fmt_g};
use crate::params::PlotterParams;
use crate::state::DrawState;
use crate::state::modes::{CapStyle, FillRule, JoinStyle, LineType};
use crate::types::{BBox, Rgb48, iround};

/// User coordinates are scaled so that one output unit is at most this
/// many points.
const MIN_RESOLUTION: f64 = 0.05;

/// Smallest dash unit for builtin line types, as a fraction of the
/// display size.
const MIN_DASH_UNIT_FRACTION: f64 = 1.0 / 576.0;

const PROCSET_NAME: &str = "plotkit";
const PROCSET_VERSION: &str = "1.1";

/// idraw's pen colors. Only these are understood, so pen colors are
/// quantized to the nearest one.
const IDRAW_COLORS: [(&str, Rgb48); 12] = [
    ("Black", Rgb48::new(0x0000, 0x0000, 0x0000)),
    ("Brown", Rgb48::new(0xa500, 0x2a00, 0x2a00)),
    ("Red", Rgb48::new(0xffff, 0x0000, 0x0000)),
    ("Orange", Rgb48::new(0xffff, 0xa5a5, 0x0000)),
    ("Yellow", Rgb48::new(0xffff, 0xffff, 0x0000)),
    ("Green", Rgb48::new(0x0000, 0xffff, 0x0000)),
    ("Blue", Rgb48::new(0x0000, 0x0000, 0xffff)),
    ("Indigo", Rgb48::new(0xbf00, 0x0000, 0xff00)),
    ("Violet", Rgb48::new(0x4f00, 0x2f00, 0x4f00)),
    ("White", Rgb48::new(0xffff, 0xffff, 0xffff)),
    ("LtGray", Rgb48::new(0xc350, 0xc350, 0xc350)),
    ("DkGray", Rgb48::new(0x80e8, 0x80e8, 0x80e8)),
];

/// Interpolations between foreground (0.0) and background (1.0) that
/// idraw recognizes as fill patterns.
const IDRAW_SHADINGS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

fn brush_pattern(t: LineType) -> u16 {
    match t {
        LineType::Solid => 0xffff,
        LineType::Dotted => 0x8888,
        LineType::DotDashed => 0xfc30,
        LineType::ShortDashed => 0xf0f0,
        LineType::LongDashed => 0xffc0,
        LineType::DotDotDashed => 0xfccc,
        LineType::DotDotDotDashed => 0xfdb6,
    }
}

fn ps_cap(cap: CapStyle) -> u8 {
    match cap {
        CapStyle::Butt => 0,
        CapStyle::Round | CapStyle::Triangular => 1,
        CapStyle::Projecting => 2,
    }
}

fn ps_join(join: JoinStyle) -> u8 {
    match join {
        JoinStyle::Miter => 0,
        JoinStyle::Round | JoinStyle::Triangular => 1,
        JoinStyle::Bevel => 2,
    }
}

fn channels(c: Rgb48) -> [f64; 3] {
    [c.red as f64, c.green as f64, c.blue as f64]
}

fn dist_sq(a: [f64; 3], b: [f64; 3]) -> f64 {
    (0..3).map(|i| (a[i] - b[i]) * (a[i] - b[i])).sum()
}

/// The idraw pen color nearest to `c`. Only white itself maps to white.
pub fn idraw_pen_index(c: Rgb48) -> usize {
    let target = channels(c);
    let mut best = 0;
    let mut difference = f64::MAX;
    for (i, &(_, std)) in IDRAW_COLORS.iter().enumerate() {
        if std.is_white() {
            if c.is_white() {
                difference = 0.0;
                best = i;
            }
            continue;
        }
        let d = dist_sq(channels(std), target);
        if d < difference {
            difference = d;
            best = i;
        }
    }
    best
}

/// How idraw will render a fill color: a background color, a shading
/// between pen and background, and the background RGB fractions that make
/// a PostScript interpreter reproduce `fill` exactly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdrawFill {
    pub bg_index: usize,
    pub shading_index: usize,
    pub bg_rgb: [f64; 3],
}

pub fn idraw_fill(fill: Rgb48, fg: Rgb48) -> IdrawFill {
    let true_fill = channels(fill);
    let fg_std = channels(IDRAW_COLORS[idraw_pen_index(fg)].1);
    let mut best = (0, 0);
    let mut difference = f64::MAX;
    for (i, &(_, bg)) in IDRAW_COLORS.iter().enumerate() {
        let bg = channels(bg);
        for (j, &shade) in IDRAW_SHADINGS.iter().enumerate() {
            let approx = [0, 1, 2].map(|k| shade * bg[k] + (1.0 - shade) * fg_std[k]);
            let d = dist_sq(true_fill, approx);
            if d < difference {
                difference = d;
                best = (i, j);
            }
        }
    }
    let shade = IDRAW_SHADINGS[best.1];
    let fill_frac = fill.fractions();
    let fg_frac = fg.fractions();
    // the interpreter fills with shade * bg + (1 - shade) * fg
    let bg_rgb = if shade != 0.0 {
        [0, 1, 2].map(|k| (fill_frac[k] - (1.0 - shade) * fg_frac[k]) / shade)
    } else {
        fill_frac
    };
    IdrawFill {
        bg_index: best.0,
        shading_index: best.1,
        bg_rgb,
    }
}

/// Scale factor for integer user coordinates; zero for a degenerate map.
fn granularity(state: &DrawState) -> f64 {
    let (min_sv, _) = state.transform.m.singular_values();
    min_sv / MIN_RESOLUTION
}

#[derive(Debug, Default)]
pub struct PsBackend {
    /// Display size in points, for scaling builtin dash patterns.
    display_size: f64,
}

impl PsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// CTM, cap, join, fill rule, brush, colors and pattern shared by every
    /// object.
    fn common_attributes(&self, out: &mut String, state: &DrawState) {
        let (norm, _) = state.transform.m.singular_values();
        let mut linewidth_adjust = 1.0;
        if norm != 0.0 {
            let invnorm = 1.0 / norm;
            if state.quantized_device_line_width != 0 {
                linewidth_adjust = state.device_line_width / state.quantized_device_line_width as f64;
            }
            out.push('[');
            for v in &state.transform.m.0[..4] {
                out.push_str(&format!("{} ", fmt_g(linewidth_adjust * invnorm * v, 7)));
            }
            out.push_str("0 0 ] trueoriginalCTM originalCTM\nconcatmatrix pop\n");
        }

        if state.join == JoinStyle::Miter {
            out.push_str(&format!(
                "{} setlinecap {} setlinejoin {} setmiterlimit\n",
                ps_cap(state.cap),
                ps_join(state.join),
                fmt_g(state.miter_limit, 4)
            ));
        } else {
            out.push_str(&format!("{} setlinecap {} setlinejoin\n", ps_cap(state.cap), ps_join(state.join)));
        }
        let eo = state.fill_rule != FillRule::NonzeroWinding;
        out.push_str(&format!("/eoFillRule {eo} def\n"));

        if state.pen_type != 0 {
            let (pattern, dashes, offset) = self.brush(state, norm, linewidth_adjust);
            out.push_str(&format!("%I b {pattern}\n"));
            out.push_str(&format!("{} 0 0 [ ", state.quantized_device_line_width));
            for d in &dashes {
                out.push_str(&format!("{} ", fmt_g(*d, 3)));
            }
            out.push_str(&format!("] {} SetB\n", fmt_g(offset, 3)));
        } else {
            out.push_str("%I b n\nnone SetB\n");
        }

        let fg_index = idraw_pen_index(state.fg_color);
        let [r, g, b] = state.fg_color.fractions();
        out.push_str(&format!(
            "%I cfg {}\n{} {} {} SetCFg\n",
            IDRAW_COLORS[fg_index].0,
            fmt_g(r, 6),
            fmt_g(g, 6),
            fmt_g(b, 6)
        ));

        if state.fill_type != 0 {
            let fill = idraw_fill(state.fill_color, state.fg_color);
            let [r, g, b] = fill.bg_rgb;
            out.push_str(&format!(
                "%I cbg {}\n{} {} {} SetCBg\n",
                IDRAW_COLORS[fill.bg_index].0,
                fmt_g(r, 6),
                fmt_g(g, 6),
                fmt_g(b, 6)
            ));
            out.push_str(&format!("%I p\n{:.6} SetP\n", IDRAW_SHADINGS[fill.shading_index]));
        } else {
            out.push_str("%I cbg White\n1 1 1 SetCBg\n");
            out.push_str("%I p\nnone SetP\n");
        }
    }

    /// idraw brush bits, PostScript dash array and dash offset.
    fn brush(&self, state: &DrawState, norm: f64, linewidth_adjust: f64) -> (u16, Vec<f64>, f64) {
        if let Some(d) = &state.dash_array {
            let scale = norm / linewidth_adjust;
            let cycle: f64 = d.dashes.iter().sum();
            let offset = if cycle > 0.0 {
                let true_cycle = if d.dashes.len() % 2 == 1 { 2.0 * cycle } else { cycle };
                d.offset.rem_euclid(true_cycle) * scale
            } else {
                0.0
            };
            return (0xffff, d.dashes.iter().map(|x| x * scale).collect(), offset);
        }
        let pattern = brush_pattern(state.line_type);
        if state.line_type == LineType::Solid {
            return (pattern, Vec::new(), 0.0);
        }
        let min_dash_unit = MIN_DASH_UNIT_FRACTION * self.display_size;
        let scale = min_dash_unit.max(state.device_line_width) / linewidth_adjust;
        let dashes = state.line_type.dashes().iter().map(|&d| d as f64 * scale).collect();
        (pattern, dashes, 0.0)
    }

    fn write_matrix(out: &mut String, m: &Affine, granularity: f64) {
        out.push_str("%I t\n[");
        for (i, v) in m.0.iter().enumerate() {
            let v = if i < 4 { v / granularity } else { *v };
            out.push_str(&format!("{} ", fmt_g(v, 7)));
        }
        out.push_str("] concat\n");
    }

    fn ellipse(&mut self, cx: &mut Cx<'_>, center: DVec2, radii: DVec2, angle_deg: f64, circle: bool) {
        let state = cx.state;
        let gran = granularity(state);
        if gran == 0.0 {
            return;
        }
        let mut out = String::from(if circle { "Begin %I Circ\n" } else { "Begin %I Elli\n" });
        self.common_attributes(&mut out, state);
        // rotate about the center, then map to the device
        let offcenter =
            Affine::translate(-center.x, -center.y) * Affine::rotate(angle_deg) * Affine::translate(center.x, center.y);
        Self::write_matrix(&mut out, &(offcenter * state.transform.m), gran);
        let (x, y) = (iround(gran * center.x), iround(gran * center.y));
        if circle {
            out.push_str(&format!("%I\n{x} {y} {} Circ\nEnd\n\n", iround(gran * radii.x)));
        } else {
            out.push_str(&format!(
                "%I\n{x} {y} {} {} Elli\nEnd\n\n",
                iround(gran * radii.x),
                iround(gran * radii.y)
            ));
        }
        cx.page.write_bytes(out.as_bytes());
    }

    fn page_header(number: u32, bbox: &BBox) -> String {
        let mut h = format!("%%Page: {number} {number}\n");
        h.push_str("%%PageResources: \n");
        h.push_str(&format!("%%PageBoundingBox: {}\n", dsc_bbox(bbox)));
        h.push_str("%%BeginPageSetup\n");
        h.push_str(
            "%I Idraw 8\n\n\
             Begin\n\
             %I b u\n\
             %I cfg u\n\
             %I cbg u\n\
             %I f u\n\
             %I p u\n\
             %I t\n\
             [ 1 0 0 1 0 0 ] concat\n\
             /originalCTM matrix currentmatrix def\n\
             /trueoriginalCTM matrix currentmatrix def\n",
        );
        h.push_str("%%EndPageSetup\n\n");
        h
    }
}

/// `llx lly urx ury`, rounded outward, or all zeros for an empty box.
fn dsc_bbox(b: &BBox) -> String {
    if b.is_empty() {
        return "0 0 0 0".to_string();
    }
    format!(
        "{} {} {} {}",
        iround(b.min.x - 0.5),
        iround(b.min.y - 0.5),
        iround(b.max.x + 0.5),
        iround(b.max.y + 0.5)
    )
}

/// The procedures the objects call: a reduced idraw prologue.
const PROCSET: &str = "\
/none null def
/numGraphicParameters 17 def
/stringLimit 65535 def
/eoFillRule true def

/Begin { save numGraphicParameters dict begin } def
/End { end restore } def

/SetB {
dup type /nulltype eq {
pop
true /brushNone idef
} {
/brushDashOffset idef
/brushDashArray idef
pop pop
/brushWidth idef
false /brushNone idef
} ifelse
} def

/SetCFg {
/fgblue idef
/fggreen idef
/fgred idef
} def

/SetCBg {
/bgblue idef
/bggreen idef
/bgred idef
} def

/SetP {
dup type /nulltype eq {
pop true /patternNone idef
} {
/patternGrayLevel idef
false /patternNone idef
} ifelse
} def

/Circ {
newpath
0 360 arc
closepath
patternNone not { ifill } if
brushNone not { istroke } if
} def

/Elli {
0 begin
newpath
4 2 roll
translate
scale
0 0 1 0 360 arc
closepath
patternNone not { ifill } if
brushNone not { istroke } if
end
} dup 0 1 dict put def

/MLine {
0 begin
storexyn
newpath
n 1 gt {
x 0 get y 0 get moveto
1 1 n 1 sub {
/i exch def
x i get y i get lineto
} for
patternNone not { ifill } if
brushNone not { istroke } if
} if
end
} dup 0 4 dict put def

/Poly {
3 1 roll
newpath
moveto
-1 add
{ lineto } repeat
closepath
patternNone not { ifill } if
brushNone not { istroke } if
} def

/Rect {
0 begin
/t exch def
/r exch def
/b exch def
/l exch def
newpath
l b moveto
l t lineto
r t lineto
r b lineto
closepath
patternNone not { ifill } if
brushNone not { istroke } if
end
} dup 0 4 dict put def

/idef {
dup where { pop pop pop } { exch def } ifelse
} def

/ifill {
gsave
fgred bgred fgred sub patternGrayLevel mul add
fggreen bggreen fggreen sub patternGrayLevel mul add
fgblue bgblue fgblue sub patternGrayLevel mul add setrgbcolor
eoFillRule { eofill } { fill } ifelse
grestore
} def

/istroke {
gsave
brushDashArray brushDashOffset setdash
fgred fggreen fgblue setrgbcolor
brushWidth setlinewidth
originalCTM setmatrix
stroke
grestore
} def

/storexyn {
/n exch def
/y n array def
/x n array def
n 1 sub -1 0 {
/i exch def
y i 3 2 roll put
x i 3 2 roll put
} for
} def
";

impl Backend for PsBackend {
    fn caps(&self) -> &'static Capabilities {
        &caps::PS
    }

    fn device_range(&self, params: &PlotterParams) -> DeviceRange {
        DeviceRange::physical(&params.page_size, 72.0)
    }

    fn begin_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        let r = self.device_range(cx.params);
        self.display_size = (r.right - r.left).abs().min((r.top - r.bottom).abs());
        Ok(())
    }

    fn end_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        cx.page.header = Self::page_header(cx.page.number, &cx.page.bbox).into_bytes();
        cx.page.trailer = b"%%PageTrailer\nEnd %I eop\nshowpage\n\n".to_vec();
        Ok(())
    }

    fn document_framing(&mut self, doc: &Document, _params: &PlotterParams) -> (Vec<u8>, Vec<u8>) {
        let num_pages = doc.pages.len();
        let mut h = String::new();
        // a single page is written as encapsulated PostScript
        h.push_str(if num_pages == 1 {
            "%!PS-Adobe-3.0 EPSF-3.0\n"
        } else {
            "%!PS-Adobe-3.0\n"
        });
        h.push_str(&format!("%%Creator: plotkit {}\n", env!("CARGO_PKG_VERSION")));
        h.push_str("%%Title: PostScript plot\n");
        h.push_str("%%DocumentData: Clean7Bit\n");
        h.push_str("%%LanguageLevel: 1\n");
        h.push_str(&format!("%%Pages: {num_pages}\n"));
        h.push_str("%%PageOrder: Ascend\n");
        h.push_str("%%Orientation: Portrait\n");
        h.push_str(&format!("%%BoundingBox: {}\n", dsc_bbox(&doc.bbox())));
        h.push_str("%%DocumentNeededResources: \n");
        if num_pages > 0 {
            h.push_str(&format!(
                "%%DocumentSuppliedResources: procset {PROCSET_NAME} {PROCSET_VERSION} 0\n"
            ));
        }
        h.push_str("%%EndComments\n\n");
        h.push_str("%%BeginDefaults\n%%PageResources: \n%%EndDefaults\n\n");

        let resource = format!("%%BeginResource: procset {PROCSET_NAME} {PROCSET_VERSION} 0\n{PROCSET}%%EndResource\n");
        h.push_str("%%BeginProlog\n");
        if num_pages > 1 {
            h.push_str(&resource);
        }
        h.push_str("%%EndProlog\n\n");
        h.push_str("%%BeginSetup\n");
        h.push_str("/DrawDict 50 dict def\nDrawDict begin\n");
        // EPS keeps its procedures in the private dictionary
        if num_pages == 1 {
            h.push_str(&resource);
        }
        h.push_str("%%EndSetup\n\n");

        let t = "%%Trailer\nend\n%%EOF\n";
        (h.into_bytes(), t.as_bytes().to_vec())
    }

    fn paint_point(&mut self, _cx: &mut Cx<'_>, _p: DVec2) -> Result<(), PlotError> {
        // idraw has no point object
        Ok(())
    }

    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
        let state = cx.state;
        let gran = granularity(state);
        if gran == 0.0 {
            return Ok(());
        }
        let closed = poly.user.len() >= 3 && poly.user.first() == poly.user.last();
        let mut pts: Vec<(i32, i32)> = Vec::with_capacity(poly.user.len());
        for p in &poly.user {
            let q = (iround(gran * p.x), iround(gran * p.y));
            if pts.last() != Some(&q) {
                pts.push(q);
            }
        }
        if pts.len() == 1 {
            pts.push(pts[0]);
        }
        let closed = closed && pts.len() > 2;
        let n = pts.len() - usize::from(closed);

        let mut out = String::from(if closed { "Begin %I Poly\n" } else { "Begin %I MLine\n" });
        self.common_attributes(&mut out, state);
        Self::write_matrix(&mut out, &state.transform.m, gran);
        out.push_str(&format!("%I {n}\n"));
        // Poly draws in reverse; reversing here keeps dashes in phase
        let order: Box<dyn Iterator<Item = &(i32, i32)>> = if closed {
            Box::new(pts[..n].iter().rev())
        } else {
            Box::new(pts[..n].iter())
        };
        for (x, y) in order {
            out.push_str(&format!("{x} {y}\n"));
        }
        out.push_str(&format!("{n} {}\nEnd\n\n", if closed { "Poly" } else { "MLine" }));
        cx.page.write_bytes(out.as_bytes());
        Ok(())
    }

    fn draw_box(&mut self, cx: &mut Cx<'_>, p0: DVec2, p1: DVec2, _clockwise: bool) -> Result<(), PlotError> {
        let state = cx.state;
        let gran = granularity(state);
        if gran == 0.0 {
            return Ok(());
        }
        let mut out = String::from("Begin %I Rect\n");
        self.common_attributes(&mut out, state);
        Self::write_matrix(&mut out, &state.transform.m, gran);
        out.push_str(&format!(
            "%I\n{} {} {} {} Rect\nEnd\n\n",
            iround(gran * p0.x),
            iround(gran * p0.y),
            iround(gran * p1.x),
            iround(gran * p1.y)
        ));
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
    use crate::outbuf::PageBuffer;
    use crate::state::Transform;
    use glam::dvec2;

    fn render(state: &DrawState, f: impl FnOnce(&mut PsBackend, &mut Cx<'_>)) -> String {
        let mut page = PageBuffer::new(1);
        let mut warnings = Warnings::default();
        let params = PlotterParams::default();
        let ndc = Affine::IDENTITY;
        let mut cx = Cx {
            state,
            page: &mut page,
            warnings: &mut warnings,
            params: &params,
            ndc_to_device: &ndc,
            fonts: &BuiltinMetrics,
        };
        let mut ps = PsBackend::new();
        ps.begin_page(&mut cx).unwrap();
        f(&mut ps, &mut cx);
        page.body_str().into_owned()
    }

    fn state_with_scale(s: f64) -> DrawState {
        let mut st = DrawState::default();
        st.transform = Transform::new(Affine::scale(s, s), &Affine::IDENTITY, false);
        st.set_line_width(1.0);
        st
    }

    // ==================== Color tests ====================

    #[test]
    fn pen_colors_quantize_to_idraw_palette() {
        assert_eq!(IDRAW_COLORS[idraw_pen_index(Rgb48::new(0xf000, 0x1000, 0x1000))].0, "Red");
        assert_eq!(IDRAW_COLORS[idraw_pen_index(Rgb48::WHITE)].0, "White");
        // near-white is not white
        assert_ne!(IDRAW_COLORS[idraw_pen_index(Rgb48::new(0xfffe, 0xffff, 0xffff))].0, "White");
    }

    #[test]
    fn fill_blend_reproduces_color() {
        let fill = Rgb48::new(0x8000, 0x8000, 0xffff);
        let f = idraw_fill(fill, Rgb48::BLACK);
        let shade = IDRAW_SHADINGS[f.shading_index];
        assert!(shade > 0.0);
        let want = fill.fractions();
        for k in 0..3 {
            // black pen, so the interpreter fills with shade * bg
            assert!((shade * f.bg_rgb[k] - want[k]).abs() < 1e-9);
        }
    }

    // ==================== Object tests ====================

    #[test]
    fn open_polyline_is_an_mline() {
        let st = state_with_scale(1.0);
        let out = render(&st, |ps, cx| {
            let poly = Polyline {
                user: vec![dvec2(0.0, 0.0), dvec2(1.0, 0.0), dvec2(1.0, 1.0)],
                device: vec![dvec2(0.0, 0.0), dvec2(1.0, 0.0), dvec2(1.0, 1.0)],
                closed: false,
                primitive: false,
            };
            ps.draw_polyline(cx, &poly).unwrap();
        });
        assert!(out.starts_with("Begin %I MLine\n"));
        assert!(out.contains("%I t\n[0.05 0 0 0.05 0 0 ] concat\n"));
        assert!(out.contains("%I 3\n0 0\n20 0\n20 20\n3 MLine\nEnd\n\n"));
        assert!(out.contains("%I b 65535\n1 0 0 [ ] 0 SetB\n"));
        assert!(out.contains("%I p\nnone SetP\n"));
    }

    #[test]
    fn closed_polyline_is_a_reversed_poly() {
        let st = state_with_scale(1.0);
        let pts = vec![
            dvec2(0.0, 0.0),
            dvec2(1.0, 0.0),
            dvec2(1.0, 1.0),
            dvec2(0.0, 0.0),
        ];
        let out = render(&st, |ps, cx| {
            let poly = Polyline {
                user: pts.clone(),
                device: pts.clone(),
                closed: true,
                primitive: false,
            };
            ps.draw_polyline(cx, &poly).unwrap();
        });
        assert!(out.contains("%I 3\n20 20\n20 0\n0 0\n3 Poly\n"));
    }

    #[test]
    fn dotted_lines_carry_idraw_brush() {
        let mut st = state_with_scale(1.0);
        st.line_type = LineType::Dotted;
        let out = render(&st, |ps, cx| {
            let poly = Polyline {
                user: vec![dvec2(0.0, 0.0), dvec2(1.0, 0.0)],
                device: vec![dvec2(0.0, 0.0), dvec2(1.0, 0.0)],
                closed: false,
                primitive: false,
            };
            ps.draw_polyline(cx, &poly).unwrap();
        });
        assert!(out.contains(&format!("%I b {}\n", 0x8888)));
    }

    #[test]
    fn filled_box_has_pattern() {
        let mut st = state_with_scale(2.0);
        st.fill_type = 1;
        st.fill_color = Rgb48::new(0xffff, 0, 0);
        let out = render(&st, |ps, cx| {
            ps.draw_box(cx, dvec2(0.0, 0.0), dvec2(3.0, 4.0), false).unwrap();
        });
        assert!(out.starts_with("Begin %I Rect\n"));
        assert!(out.contains("%I\n0 0 120 160 Rect\nEnd\n"));
        assert!(out.contains("%I cbg Red\n"));
        assert!(out.contains("1.000000 SetP\n"));
    }

    #[test]
    fn circles_use_circ() {
        let st = state_with_scale(1.0);
        let out = render(&st, |ps, cx| {
            ps.draw_circle(cx, dvec2(1.0, 1.0), 0.5, false).unwrap();
        });
        assert!(out.starts_with("Begin %I Circ\n"));
        assert!(out.contains("%I\n20 20 10 Circ\nEnd\n"));
    }

    // ==================== Framing tests ====================

    #[test]
    fn single_page_is_eps() {
        let mut page = PageBuffer::new(1);
        page.bbox.expand_point(dvec2(10.2, 20.7));
        page.bbox.expand_point(dvec2(100.0, 200.0));
        let doc = Document { pages: vec![page] };
        let (h, t) = PsBackend::new().document_framing(&doc, &PlotterParams::default());
        let h = String::from_utf8(h).unwrap();
        assert!(h.starts_with("%!PS-Adobe-3.0 EPSF-3.0\n"));
        assert!(h.contains("%%Pages: 1\n"));
        assert!(h.contains("%%BoundingBox: 10 20 101 201\n"));
        assert!(h.contains("/Poly {"));
        assert_eq!(t, b"%%Trailer\nend\n%%EOF\n");
    }

    #[test]
    fn empty_document_bbox_is_zero() {
        let doc = Document { pages: vec![PageBuffer::new(1), PageBuffer::new(2)] };
        let (h, _) = PsBackend::new().document_framing(&doc, &PlotterParams::default());
        let h = String::from_utf8(h).unwrap();
        assert!(h.starts_with("%!PS-Adobe-3.0\n"));
        assert!(h.contains("%%BoundingBox: 0 0 0 0\n"));
    }
}
