//! SVG 1.1 output.
//!
//! Objects are written in user coordinates. The user → NDC map of the
//! first object on a page becomes the page's base matrix, placed (together
//! with NDC → device) on the enclosing `<g>`; each object then carries only
//! the transform that differs from the base, usually none.

use glam::DVec2;

use super::{Backend, Cx, DeviceRange, NativeArc, Polyline};
use crate::caps::{self, Capabilities};
use crate::errors::PlotError;
use crate::matrix::Affine;
use crate::outbuf::fmt_g;
use crate::path::{Path, PathKind, Segment};
use crate::state::modes::{CapStyle, FillRule, JoinStyle, LineType};
use crate::state::{DEFAULT_MITER_LIMIT, DrawState};
use crate::types::Rgb48;

/// Default line width as a fraction of the display size.
const DEFAULT_LINE_WIDTH_FRACTION: f64 = 1.0 / 850.0;

/// Elements of the linear part smaller than this fraction of the largest
/// are treated as zero when writing a transform.
const VERY_SMALL_FACTOR: f64 = 1e-10;

const VERY_SMALL_ANGLE: f64 = 1e-10;

const SVG_NAMED_COLORS: [(&str, u8, u8, u8); 16] = [
    ("aqua", 0x00, 0xff, 0xff),
    ("black", 0x00, 0x00, 0x00),
    ("blue", 0x00, 0x00, 0xff),
    ("fuchsia", 0xff, 0x00, 0xff),
    ("gray", 0x80, 0x80, 0x80),
    ("green", 0x00, 0x80, 0x00),
    ("lime", 0x00, 0xff, 0x00),
    ("maroon", 0x80, 0x00, 0x00),
    ("navy", 0x00, 0x00, 0x80),
    ("olive", 0x80, 0x80, 0x00),
    ("purple", 0x80, 0x00, 0x80),
    ("red", 0xff, 0x00, 0x00),
    ("silver", 0xc0, 0xc0, 0xc0),
    ("teal", 0x00, 0x80, 0x80),
    ("white", 0xff, 0xff, 0xff),
    ("yellow", 0xff, 0xff, 0x00),
];

#[inline]
fn g(x: f64) -> String {
    fmt_g(x, 5)
}

/// One of the sixteen SVG color keywords, or `#rrggbb`.
pub fn svg_color(c: Rgb48) -> String {
    let c = c.to_rgb24();
    SVG_NAMED_COLORS
        .iter()
        .find(|&&(_, red, green, blue)| (red, green, blue) == (c.r, c.g, c.b))
        .map(|&(name, ..)| name.to_string())
        .unwrap_or_else(|| c.hex())
}

fn cap_name(cap: CapStyle) -> &'static str {
    match cap {
        CapStyle::Butt => "butt",
        CapStyle::Round | CapStyle::Triangular => "round",
        CapStyle::Projecting => "square",
    }
}

fn join_name(join: JoinStyle) -> &'static str {
    match join {
        JoinStyle::Miter => "miter",
        JoinStyle::Round | JoinStyle::Triangular => "round",
        JoinStyle::Bevel => "bevel",
    }
}

/// A `transform="..."` attribute in the most compact form SVG offers, or
/// nothing for the identity.
fn write_transform(out: &mut String, m: &Affine) {
    let max = m.0[..4].iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    let mut mm = m.0;
    for v in &mut mm[..4] {
        if v.abs() < VERY_SMALL_FACTOR * max {
            *v = 0.0;
        }
    }
    if mm == Affine::IDENTITY.0 {
        return;
    }
    let linear = [mm[0], mm[1], mm[2], mm[3]];
    let special = match linear {
        [_, 0.0, 0.0, _] => Some(""),
        [0.0, 1.0, -1.0, 0.0] => Some("rotate(90) "),
        [0.0, -1.0, 1.0, 0.0] => Some("rotate(270) "),
        [0.0, 1.0, 1.0, 0.0] => Some("rotate(90) scale(1,-1) "),
        [0.0, -1.0, -1.0, 0.0] => Some("rotate(270) scale(1,-1) "),
        _ => None,
    };
    out.push_str("transform=\"");
    match special {
        Some(rotation) => {
            if mm[4] != 0.0 || mm[5] != 0.0 {
                if mm[5] == 0.0 {
                    out.push_str(&format!("translate({}) ", g(mm[4])));
                } else {
                    out.push_str(&format!("translate({},{}) ", g(mm[4]), g(mm[5])));
                }
            }
            if rotation.is_empty() {
                if mm[0] != 1.0 || mm[3] != 1.0 {
                    if mm[3] == mm[0] {
                        out.push_str(&format!("scale({}) ", g(mm[0])));
                    } else if mm[3] == -mm[0] {
                        if mm[0] != 1.0 {
                            out.push_str(&format!("scale(1,-1) scale({}) ", g(mm[0])));
                        } else {
                            out.push_str("scale(1,-1) ");
                        }
                    } else {
                        out.push_str(&format!("scale({},{}) ", g(mm[0]), g(mm[3])));
                    }
                }
            } else {
                out.push_str(rotation);
            }
        }
        None => {
            out.push_str(&format!(
                "matrix({} {} {} {} {} {}) ",
                g(mm[0]),
                g(mm[1]),
                g(mm[2]),
                g(mm[3]),
                g(mm[4]),
                g(mm[5])
            ));
        }
    }
    out.push_str("\" ");
}

/// Path data for one segment list.
fn write_path_data(out: &mut String, segs: &[Segment]) {
    let Some(first) = segs.first() else {
        return;
    };
    let closed = segs.len() >= 3 && segs.last().map(Segment::endpoint) == Some(first.endpoint());
    let mut old = first.endpoint();
    out.push_str(&format!("M{},{} ", g(old.x), g(old.y)));
    for (i, seg) in segs.iter().enumerate().skip(1) {
        let p = seg.endpoint();
        // a closing line is written as Z
        if closed && i == segs.len() - 1 && matches!(seg, Segment::Line(_)) {
            continue;
        }
        match *seg {
            Segment::MoveTo(_) => {}
            Segment::Line(_) => {
                if p.y == old.y {
                    out.push_str(&format!("H{} ", g(p.x)));
                } else if p.x == old.x {
                    out.push_str(&format!("V{} ", g(p.y)));
                } else {
                    out.push_str(&format!("L{},{} ", g(p.x), g(p.y)));
                }
            }
            Segment::Arc { center, .. } => {
                let ccw = (old - center).perp_dot(p - center) >= 0.0;
                let r = (p - center).length();
                out.push_str(&format!(
                    "A{},{},{},{},{},{},{} ",
                    g(r),
                    g(r),
                    g(0.0),
                    0,
                    u8::from(ccw),
                    g(p.x),
                    g(p.y)
                ));
            }
            Segment::EllArc { center, .. } => {
                let (rx, ry, theta, clockwise) = ellarc_axes(old - center, p - center);
                out.push_str(&format!(
                    "A{},{},{},{},{},{},{} ",
                    g(rx),
                    g(ry),
                    g(theta.to_degrees()),
                    0,
                    u8::from(!clockwise),
                    g(p.x),
                    g(p.y)
                ));
            }
            Segment::Quad { c, .. } => {
                out.push_str(&format!("Q{},{},{},{} ", g(c.x), g(c.y), g(p.x), g(p.y)));
            }
            Segment::Cubic { c1, c2, .. } => {
                out.push_str(&format!(
                    "C{},{},{},{},{},{} ",
                    g(c1.x),
                    g(c1.y),
                    g(c2.x),
                    g(c2.y),
                    g(p.x),
                    g(p.y)
                ));
            }
        }
        old = p;
    }
    if closed {
        out.push_str("Z ");
    }
}

/// Semi-axes of the quarter ellipse with conjugate radii `u` and `v`:
/// `(rx, ry, inclination of the first axis in radians, clockwise)`.
fn ellarc_axes(u: DVec2, v: DVec2) -> (f64, f64, f64, bool) {
    let clockwise = u.perp_dot(v) < 0.0;
    let mixing = 0.5 * (2.0 * u.dot(v)).atan2(u.length_squared() - v.length_squared());
    let (s, c) = mixing.sin_cos();
    let axis1 = u * c + v * s;
    let (s2, c2) = (mixing + std::f64::consts::FRAC_PI_2).sin_cos();
    let axis2 = u * c2 + v * s2;
    let mut theta = axis1.y.atan2(axis1.x);
    if theta.abs() < VERY_SMALL_ANGLE {
        theta = 0.0;
    }
    (axis1.length(), axis2.length(), theta, clockwise)
}

/// Dash pattern in user units, scaled for builtin line types by the line
/// width (or the default width, if that is larger).
fn dash_pattern(state: &DrawState) -> Option<(Vec<f64>, f64)> {
    if let Some(d) = &state.dash_array {
        return (!d.dashes.is_empty()).then(|| (d.dashes.clone(), d.offset));
    }
    if state.line_type == LineType::Solid {
        return None;
    }
    let (_, max_sv) = state.transform.user_to_ndc.singular_values();
    let min_width = if max_sv != 0.0 {
        DEFAULT_LINE_WIDTH_FRACTION / max_sv
    } else {
        0.0
    };
    state.effective_dashes(state.line_width.max(min_width))
}

fn write_style(out: &mut String, state: &DrawState, need_cap: bool, need_join: bool) {
    if state.pen_type != 0 {
        if !state.fg_color.is_black() {
            out.push_str(&format!("stroke=\"{}\" ", svg_color(state.fg_color)));
        }
        out.push_str(&format!("stroke-width=\"{}\" ", g(state.line_width)));
        if need_cap && state.cap != CapStyle::Butt {
            out.push_str(&format!("stroke-linecap=\"{}\" ", cap_name(state.cap)));
        }
        if need_join {
            if state.join != JoinStyle::Miter {
                out.push_str(&format!("stroke-linejoin=\"{}\" ", join_name(state.join)));
            } else if state.miter_limit != DEFAULT_MITER_LIMIT {
                out.push_str(&format!("stroke-miterlimit=\"{}\" ", g(state.miter_limit)));
            }
        }
        if let Some((dashes, offset)) = dash_pattern(state) {
            let list: Vec<String> = dashes.iter().map(|&d| g(d)).collect();
            out.push_str(&format!("stroke-dasharray=\"{}\" ", list.join(", ")));
            if offset != 0.0 {
                out.push_str(&format!("stroke-dashoffset=\"{}\" ", g(offset)));
            }
        }
    } else {
        out.push_str("stroke=\"none\" ");
    }
    if state.fill_type != 0 {
        out.push_str(&format!("fill=\"{}\" ", svg_color(state.fill_color)));
        if state.fill_rule != FillRule::EvenOdd {
            out.push_str("fill-rule=\"nonzero\" ");
        }
    }
}

fn write_points(out: &mut String, points: &[DVec2]) {
    out.push_str("points=\"");
    for p in points {
        out.push_str(&format!("{},{} ", g(p.x), g(p.y)));
    }
    out.push_str("\" ");
}

#[derive(Debug, Default)]
pub struct SvgBackend {
    /// The page's base user → NDC map, fixed by the first object.
    base: Option<Affine>,
    /// The base map is singular and will not be written.
    base_is_bogus: bool,
    bg_color: Rgb48,
    bg_suppressed: bool,
}

impl SvgBackend {
    pub fn new() -> Self {
        SvgBackend {
            bg_color: Rgb48::WHITE,
            ..Default::default()
        }
    }

    fn reset_page(&mut self, state: &DrawState) {
        self.base = None;
        self.base_is_bogus = false;
        self.bg_color = state.bg_color;
        self.bg_suppressed = state.bg_color_suppressed;
    }

    /// Write the object's transform relative to the page base.
    fn set_matrix(&mut self, out: &mut String, state: &DrawState, local: &Affine) {
        let user_to_ndc = state.transform.user_to_ndc;
        let base = match self.base {
            Some(base) => base,
            None => {
                self.base = Some(user_to_ndc);
                self.base_is_bogus = user_to_ndc.determinant() == 0.0;
                user_to_ndc
            }
        };
        let m = local.compose(&user_to_ndc);
        if self.base_is_bogus {
            write_transform(out, &m);
        } else if m != base
            && let Ok(inverse) = base.invert()
        {
            write_transform(out, &m.compose(&inverse));
        }
    }

    fn emit(&mut self, cx: &mut Cx<'_>, out: String) {
        cx.page.write_bytes(out.as_bytes());
    }

    fn header(&self, params: &crate::params::PlotterParams, ndc_to_device: &Affine) -> String {
        let page = &params.page_size;
        let mut h = String::new();
        h.push_str("<?xml version=\"1.0\" encoding=\"ISO-8859-1\" standalone=\"no\"?>\n");
        h.push_str("<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n");
        let (unit, factor) = if page.paper.metric { ("cm", 2.54) } else { ("in", 1.0) };
        h.push_str(&format!(
            "<svg version=\"1.1\" baseProfile=\"full\" id=\"body\" width=\"{}{unit}\" height=\"{}{unit}\" ",
            g(factor * page.xsize.abs()),
            g(factor * page.ysize.abs()),
        ));
        h.push_str(
            "viewBox=\"0 0 1 1\" preserveAspectRatio=\"none\" xmlns=\"http://www.w3.org/2000/svg\" \
             xmlns:xlink=\"http://www.w3.org/1999/xlink\" xmlns:ev=\"http://www.w3.org/2001/xml-events\">\n",
        );
        h.push_str("<title>SVG drawing</title>\n");
        h.push_str(&format!(
            "<desc>This was produced by version {} of plotkit, a library for exporting 2-D vector graphics.</desc>\n",
            env!("CARGO_PKG_VERSION")
        ));
        if !self.bg_suppressed {
            h.push_str(&format!(
                "<rect id=\"background\" x=\"0\" y=\"0\" width=\"1\" height=\"1\" stroke=\"none\" fill=\"{}\"/>\n",
                svg_color(self.bg_color)
            ));
        }
        h.push_str("<g id=\"content\" ");
        if let Some(base) = self.base
            && !self.base_is_bogus
        {
            write_transform(&mut h, &base.compose(ndc_to_device));
        }
        h.push_str("xml:space=\"preserve\" ");
        h.push_str(&format!(
            "stroke=\"black\" stroke-linecap=\"butt\" stroke-linejoin=\"miter\" stroke-miterlimit=\"{}\" \
             stroke-dasharray=\"none\" stroke-dashoffset=\"0\" stroke-opacity=\"1\" \
             fill=\"none\" fill-rule=\"evenodd\" fill-opacity=\"1\" \
             font-style=\"normal\" font-variant=\"normal\" font-weight=\"normal\" font-stretch=\"normal\" \
             font-size-adjust=\"none\" letter-spacing=\"normal\" word-spacing=\"normal\" text-anchor=\"start\">\n",
            g(DEFAULT_MITER_LIMIT)
        ));
        h
    }
}

impl Backend for SvgBackend {
    fn caps(&self) -> &'static Capabilities {
        &caps::SVG
    }

    fn device_range(&self, _params: &crate::params::PlotterParams) -> DeviceRange {
        DeviceRange::real(0.0, 1.0, 1.0, 0.0)
    }

    fn begin_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        self.reset_page(cx.state);
        Ok(())
    }

    fn erase_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        self.reset_page(cx.state);
        Ok(())
    }

    fn end_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        // an SVG file holds a single page
        if cx.page.number != 1 {
            return Ok(());
        }
        cx.page.header = self.header(cx.params, cx.ndc_to_device).into_bytes();
        cx.page.trailer = b"</g>\n</svg>\n".to_vec();
        Ok(())
    }

    fn paint_paths(&mut self, cx: &mut Cx<'_>, paths: &[Path]) -> Result<bool, PlotError> {
        if !cx.state.is_visible() || cx.state.transform.is_singular() {
            return Ok(true);
        }
        let mut out = String::from("<path ");
        self.set_matrix(&mut out, cx.state, &Affine::IDENTITY);
        out.push_str("d=\"");
        for path in paths {
            match path.kind {
                PathKind::Segments(ref segs) => write_path_data(&mut out, segs),
                PathKind::Circle { center, radius } => {
                    let r = DVec2::splat(radius);
                    let quarters = if path.clockwise {
                        [DVec2::NEG_Y, DVec2::NEG_X, DVec2::Y, DVec2::X]
                    } else {
                        [DVec2::Y, DVec2::NEG_X, DVec2::NEG_Y, DVec2::X]
                    };
                    let ends = quarters.map(|q| center + q * radius);
                    write_quarters(&mut out, center + DVec2::X * radius, r, 0.0, !path.clockwise, ends);
                }
                PathKind::Ellipse {
                    center,
                    rx,
                    ry,
                    angle_deg,
                } => {
                    let (s, c) = angle_deg.to_radians().sin_cos();
                    let v1 = DVec2::new(rx * c, rx * s);
                    let v2 = DVec2::new(-ry * s, ry * c);
                    let quarters = if path.clockwise {
                        [center - v2, center - v1, center + v2, center + v1]
                    } else {
                        [center + v2, center - v1, center - v2, center + v1]
                    };
                    write_quarters(&mut out, center + v1, DVec2::new(rx, ry), angle_deg, !path.clockwise, quarters);
                }
                PathKind::Box { p0, p1, x_move_is_first } => {
                    if x_move_is_first {
                        out.push_str(&format!(
                            "M{},{} H{} V{} H{} Z ",
                            g(p0.x),
                            g(p0.y),
                            g(p1.x),
                            g(p1.y),
                            g(p0.x)
                        ));
                    } else {
                        out.push_str(&format!(
                            "M{},{} V{} H{} V{} Z ",
                            g(p0.x),
                            g(p0.y),
                            g(p1.y),
                            g(p1.x),
                            g(p0.y)
                        ));
                    }
                }
            }
        }
        out.push_str("\" ");
        write_style(&mut out, cx.state, true, true);
        out.push_str("/>\n");
        self.emit(cx, out);
        Ok(true)
    }

    fn paint_point(&mut self, cx: &mut Cx<'_>, p: DVec2) -> Result<(), PlotError> {
        let mut out = String::from("<circle ");
        self.set_matrix(&mut out, cx.state, &Affine::IDENTITY);
        out.push_str(&format!("cx=\"{}\" cy=\"{}\" r=\"0.5px\" ", g(p.x), g(p.y)));
        out.push_str(&format!("stroke=\"none\" fill=\"{}\"", svg_color(cx.state.fg_color)));
        out.push_str("/>\n");
        self.emit(cx, out);
        Ok(())
    }

    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
        let mut out = String::new();
        if poly.user.len() == 2 {
            out.push_str("<line ");
            self.set_matrix(&mut out, cx.state, &Affine::IDENTITY);
            let (a, b) = (poly.user[0], poly.user[1]);
            out.push_str(&format!(
                "x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" ",
                g(a.x),
                g(a.y),
                g(b.x),
                g(b.y)
            ));
            write_style(&mut out, cx.state, true, false);
        } else if poly.closed {
            out.push_str("<polygon ");
            self.set_matrix(&mut out, cx.state, &Affine::IDENTITY);
            write_points(&mut out, &poly.user[..poly.user.len() - 1]);
            write_style(&mut out, cx.state, false, true);
        } else {
            out.push_str("<polyline ");
            self.set_matrix(&mut out, cx.state, &Affine::IDENTITY);
            write_points(&mut out, &poly.user);
            write_style(&mut out, cx.state, true, true);
        }
        out.push_str("/>\n");
        self.emit(cx, out);
        Ok(())
    }

    fn draw_segments(&mut self, cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
        let mut out = String::from("<path ");
        self.set_matrix(&mut out, cx.state, &Affine::IDENTITY);
        out.push_str("d=\"");
        write_path_data(&mut out, path.segments());
        out.push_str("\" ");
        write_style(&mut out, cx.state, true, true);
        out.push_str("/>\n");
        self.emit(cx, out);
        Ok(())
    }

    fn draw_arc(&mut self, cx: &mut Cx<'_>, arc: &NativeArc) -> Result<(), PlotError> {
        let segs = [
            Segment::MoveTo(arc.p0),
            if arc.elliptic {
                Segment::EllArc {
                    p: arc.p1,
                    center: arc.center,
                }
            } else {
                Segment::Arc {
                    p: arc.p1,
                    center: arc.center,
                }
            },
        ];
        let mut out = String::from("<path ");
        self.set_matrix(&mut out, cx.state, &Affine::IDENTITY);
        out.push_str("d=\"");
        write_path_data(&mut out, &segs);
        out.push_str("\" ");
        write_style(&mut out, cx.state, true, true);
        out.push_str("/>\n");
        self.emit(cx, out);
        Ok(())
    }

    fn draw_box(&mut self, cx: &mut Cx<'_>, p0: DVec2, p1: DVec2, _clockwise: bool) -> Result<(), PlotError> {
        let (min, max) = (p0.min(p1), p0.max(p1));
        let mut out = String::from("<rect ");
        self.set_matrix(&mut out, cx.state, &Affine::IDENTITY);
        out.push_str(&format!(
            "x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" ",
            g(min.x),
            g(min.y),
            g(max.x - min.x),
            g(max.y - min.y)
        ));
        write_style(&mut out, cx.state, false, true);
        out.push_str("/>\n");
        self.emit(cx, out);
        Ok(())
    }

    fn draw_circle(&mut self, cx: &mut Cx<'_>, center: DVec2, radius: f64, _clockwise: bool) -> Result<(), PlotError> {
        let mut out = String::from("<circle ");
        self.set_matrix(&mut out, cx.state, &Affine::IDENTITY);
        out.push_str(&format!(
            "cx=\"{}\" cy=\"{}\" r=\"{}\" ",
            g(center.x),
            g(center.y),
            g(radius)
        ));
        write_style(&mut out, cx.state, false, false);
        out.push_str("/>\n");
        self.emit(cx, out);
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
        let local = Affine::rotate(angle_deg) * Affine::translate(center.x, center.y);
        let mut out = String::from("<ellipse ");
        self.set_matrix(&mut out, cx.state, &local);
        out.push_str(&format!("rx=\"{}\" ry=\"{}\" ", g(radii.x), g(radii.y)));
        write_style(&mut out, cx.state, false, false);
        out.push_str("/>\n");
        self.emit(cx, out);
        Ok(())
    }
}

/// A closed curve as four elliptic quarter arcs starting at `start`.
fn write_quarters(out: &mut String, start: DVec2, radii: DVec2, rotation: f64, ccw: bool, ends: [DVec2; 4]) {
    out.push_str(&format!("M{},{} ", g(start.x), g(start.y)));
    for end in ends {
        out.push_str(&format!(
            "A{},{},{},{},{},{},{} ",
            g(radii.x),
            g(radii.y),
            g(rotation),
            0,
            u8::from(ccw),
            g(end.x),
            g(end.y)
        ));
    }
    out.push_str("Z ");
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec2;

    // ==================== Transform tests ====================

    fn transform_attr(m: &Affine) -> String {
        let mut s = String::new();
        write_transform(&mut s, m);
        s
    }

    #[test]
    fn identity_writes_nothing() {
        assert_eq!(transform_attr(&Affine::IDENTITY), "");
    }

    #[test]
    fn compact_transform_forms() {
        assert_eq!(transform_attr(&Affine::scale(2.0, 2.0)), "transform=\"scale(2) \" ");
        assert_eq!(
            transform_attr(&Affine::new(0.1, 0.0, 0.0, -0.1, 0.0, 1.0)),
            "transform=\"translate(0,1) scale(1,-1) scale(0.1) \" "
        );
        assert_eq!(transform_attr(&Affine::translate(3.0, 0.0)), "transform=\"translate(3) \" ");
        assert_eq!(transform_attr(&Affine::rotate(90.0)), "transform=\"rotate(90) \" ");
        assert_eq!(
            transform_attr(&Affine::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0)),
            "transform=\"matrix(1 2 3 4 5 6) \" "
        );
    }

    // ==================== Path data tests ====================

    #[test]
    fn closed_polyline_path_data_ends_with_z() {
        let segs = [
            Segment::MoveTo(dvec2(0.0, 0.0)),
            Segment::Line(dvec2(10.0, 0.0)),
            Segment::Cubic {
                p: dvec2(10.0, 10.0),
                c1: dvec2(12.0, 3.0),
                c2: dvec2(12.0, 7.0),
            },
            Segment::Line(dvec2(0.0, 0.0)),
        ];
        let mut out = String::new();
        write_path_data(&mut out, &segs);
        assert_eq!(out, "M0,0 H10 C12,3,12,7,10,10 Z ");
    }

    #[test]
    fn arc_sweep_flag_follows_orientation() {
        let ccw = [
            Segment::MoveTo(dvec2(1.0, 0.0)),
            Segment::Arc {
                p: dvec2(0.0, 1.0),
                center: DVec2::ZERO,
            },
        ];
        let mut out = String::new();
        write_path_data(&mut out, &ccw);
        assert_eq!(out, "M1,0 A1,1,0,0,1,0,1 ");
    }

    #[test]
    fn quarter_ellipse_axes() {
        let (rx, ry, theta, cw) = ellarc_axes(dvec2(3.0, 0.0), dvec2(0.0, 2.0));
        assert!((rx - 3.0).abs() < 1e-12);
        assert!((ry - 2.0).abs() < 1e-12);
        assert_eq!(theta, 0.0);
        assert!(!cw);
    }

    // ==================== Color tests ====================

    #[test]
    fn named_colors_preferred() {
        assert_eq!(svg_color(Rgb48::WHITE), "white");
        assert_eq!(svg_color(Rgb48::new(0xffff, 0, 0)), "red");
        assert_eq!(svg_color(Rgb48::new(0x1212, 0x3434, 0x5656)), "#123456");
    }
}
