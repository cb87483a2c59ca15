//! Binary CGM (ISO 8632-3) output, version 1 profile.
//!
//! A metafile is a sequence of commands. Each command starts with a
//! two-byte header holding its element class, element id and data length;
//! data longer than 30 bytes uses the long form, split into partitions
//! that each begin with a control word. Commands are padded to an even
//! number of bytes.
//!
//! Coordinates are 16-bit integer VDCs. The longer side of the viewport
//! spans a quarter of the integer range, centered on the origin. Colors
//! are direct, 8 bits per component.

use std::fmt::Write;

use glam::{DVec2, dvec2};

use super::{Backend, Cx, DeviceRange, Polyline};
use crate::caps::{self, Capabilities};
use crate::errors::PlotError;
use crate::log::debug;
use crate::outbuf::{Document, PageBuffer};
use crate::params::PlotterParams;
use crate::state::modes::LineType;
use crate::types::{IPoint, Rgb24, Rgb48, iround};

// Element classes.
const DELIMITER: u8 = 0;
const METAFILE_DESCRIPTOR: u8 = 1;
const PICTURE_DESCRIPTOR: u8 = 2;
const CONTROL: u8 = 3;
const GRAPHICAL_PRIMITIVE: u8 = 4;
const ATTRIBUTE: u8 = 5;

/// Data lengths above this use the long-form header.
const SHORT_FORM_MAX: usize = 30;
const PARTITION_SIZE: usize = 3000;

/// Half the larger side of the viewport, in VDCs: 1/8 of the range of a
/// 16-bit integer.
const HALF_SIDE: i32 = (1 << 13) - 1;

const INTEGER_BITS: i32 = 16;
/// Width of one direct-color component: 1 for 24-bit color, 2 for 48-bit.
const BYTES_PER_COLOR_COMPONENT: usize = 2;
const COLOR_BITS: i32 = 8 * BYTES_PER_COLOR_COMPONENT as i32;

// Line types.
const L_SOLID: i16 = 1;
const L_DASHED: i16 = 2;
const L_DOTTED: i16 = 3;
const L_DOTDASHED: i16 = 4;
const L_DOTDOTDASHED: i16 = 5;

// Interior styles.
const INT_HOLLOW: i16 = 0;
const INT_SOLID: i16 = 1;
const INT_EMPTY: i16 = 4;

const MARKER_DOT: i16 = 1;
const MARKER_ASTERISK: i16 = 3;

/// Line and edge width at the start of a picture.
const DEFAULT_WIDTH: i32 = (1 << 13) / 500;

/// One CGM command under construction.
#[derive(Debug)]
struct Command {
    class: u8,
    id: u8,
    data: Vec<u8>,
}

impl Command {
    fn new(class: u8, id: u8) -> Self {
        Command {
            class,
            id,
            data: Vec::new(),
        }
    }

    /// A signed integer at 16-bit precision, clamped to ±32767.
    fn int(mut self, n: i32) -> Self {
        let n = n.clamp(-32767, 32767) as i16;
        self.data.extend_from_slice(&n.to_be_bytes());
        self
    }

    /// Indices and enumeratives are always 16 bits.
    fn index(self, n: i32) -> Self {
        self.int(n)
    }

    fn point(self, p: IPoint) -> Self {
        self.int(p.x).int(p.y)
    }

    fn color(mut self, c: Rgb48) -> Self {
        encode_color(c, BYTES_PER_COLOR_COMPONENT, &mut self.data);
        self
    }

    /// IEEE single precision, big-endian.
    fn real_float(mut self, x: f64) -> Self {
        self.data.extend_from_slice(&(x as f32).to_be_bytes());
        self
    }

    /// A length-prefixed string. Strings of 255 bytes or more use a 255
    /// marker, then 15-bit length words with a continuation bit.
    fn string(mut self, s: &str) -> Self {
        let bytes = s.as_bytes();
        if bytes.len() < 255 {
            self.data.push(bytes.len() as u8);
            self.data.extend_from_slice(bytes);
        } else {
            self.data.push(255);
            let mut chunks = bytes.chunks(0x7fff).peekable();
            while let Some(chunk) = chunks.next() {
                let more = if chunks.peek().is_some() { 0x8000 } else { 0 };
                self.data.extend_from_slice(&((more | chunk.len()) as u16).to_be_bytes());
                self.data.extend_from_slice(chunk);
            }
        }
        self
    }

    fn encode(&self, out: &mut Vec<u8>) {
        let len = self.data.len();
        let short_len = if len > SHORT_FORM_MAX { 31 } else { len as u16 };
        let word = (u16::from(self.class & 0x0f) << 12) | (u16::from(self.id & 0x7f) << 5) | short_len;
        out.extend_from_slice(&word.to_be_bytes());
        if len > SHORT_FORM_MAX {
            let mut chunks = self.data.chunks(PARTITION_SIZE).peekable();
            while let Some(chunk) = chunks.next() {
                let more = if chunks.peek().is_some() { 0x8000 } else { 0 };
                out.extend_from_slice(&((more | chunk.len()) as u16).to_be_bytes());
                out.extend_from_slice(chunk);
            }
        } else {
            out.extend_from_slice(&self.data);
        }
        if len % 2 == 1 {
            out.push(0);
        }
    }

    fn emit(&self, page: &mut PageBuffer) {
        let mut out = Vec::new();
        self.encode(&mut out);
        page.write_bytes(&out);
    }
}

fn cgm_line_type(t: LineType) -> i16 {
    match t {
        LineType::Solid => L_SOLID,
        LineType::Dotted => L_DOTTED,
        LineType::DotDashed => L_DOTDASHED,
        LineType::ShortDashed | LineType::LongDashed => L_DASHED,
        LineType::DotDotDashed | LineType::DotDotDotDashed => L_DOTDOTDASHED,
    }
}

/// A direct color at `bytes_per_component` bytes per component; one-byte
/// components keep the high byte.
fn encode_color(c: Rgb48, bytes_per_component: usize, out: &mut Vec<u8>) {
    for v in [c.red, c.green, c.blue] {
        if bytes_per_component == 1 {
            out.push((v >> 8) as u8);
        } else {
            out.extend_from_slice(&v.to_be_bytes());
        }
    }
}

/// Anything but black and white needs a color device.
fn is_colored(c: Rgb24) -> bool {
    c != Rgb24::BLACK && c != Rgb24::WHITE
}

/// VDC extent for a viewport of `xsize` by `ysize` inches, with the signs
/// of negative sizes carried into the extent.
fn vdc_extent(xsize: f64, ysize: f64) -> (IPoint, IPoint) {
    let xsign = if xsize < 0.0 { -1 } else { 1 };
    let ysign = if ysize < 0.0 { -1 } else { 1 };
    let (half_x, half_y) = if xsize == 0.0 && ysize == 0.0 {
        (0, 0)
    } else if ysize.abs() > xsize.abs() {
        (iround(HALF_SIDE as f64 * xsize.abs() / ysize.abs()), HALF_SIDE)
    } else {
        (HALF_SIDE, iround(HALF_SIDE as f64 * ysize.abs() / xsize.abs()))
    };
    (
        IPoint::new(-xsign * half_x, -ysign * half_y),
        IPoint::new(xsign * half_x, ysign * half_y),
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Object {
    Open,
    Closed,
}

/// Attribute values in effect in the picture being written. Every
/// picture starts from the CGM defaults.
#[derive(Clone, Debug, PartialEq)]
struct AttributeCache {
    line_color: Option<Rgb48>,
    edge_color: Option<Rgb48>,
    fill_color: Option<Rgb48>,
    marker_color: Option<Rgb48>,
    line_type: i16,
    edge_type: i16,
    line_width: i32,
    edge_width: i32,
    interior_style: i16,
    edge_visible: bool,
    marker_type: i16,
}

impl Default for AttributeCache {
    fn default() -> Self {
        AttributeCache {
            line_color: None,
            edge_color: None,
            fill_color: None,
            marker_color: None,
            line_type: L_SOLID,
            edge_type: L_SOLID,
            line_width: DEFAULT_WIDTH,
            edge_width: DEFAULT_WIDTH,
            interior_style: INT_HOLLOW,
            edge_visible: false,
            marker_type: MARKER_ASTERISK,
        }
    }
}

#[derive(Debug, Default)]
pub struct CgmBackend {
    cache: AttributeCache,
}

impl CgmBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn note_color(page: &mut PageBuffer, c: Rgb24) {
        page.colors_used.insert(c);
    }

    fn set_pen_color(&mut self, cx: &mut Cx<'_>, object: Object) {
        if cx.state.pen_type == 0 {
            return;
        }
        let c = cx.state.fg_color;
        Self::note_color(cx.page, c.to_rgb24());
        let (cached, id) = match object {
            Object::Open => (&mut self.cache.line_color, 4),
            Object::Closed => (&mut self.cache.edge_color, 29),
        };
        if *cached != Some(c) {
            Command::new(ATTRIBUTE, id).color(c).emit(cx.page);
            *cached = Some(c);
        }
    }

    fn set_fill_color(&mut self, cx: &mut Cx<'_>) {
        if cx.state.fill_type == 0 {
            return;
        }
        let c = cx.state.fill_color;
        Self::note_color(cx.page, c.to_rgb24());
        if self.cache.fill_color != Some(c) {
            Command::new(ATTRIBUTE, 23).color(c).emit(cx.page);
            self.cache.fill_color = Some(c);
        }
    }

    fn set_attributes(&mut self, cx: &mut Cx<'_>, object: Object) {
        let state = cx.state;
        if state.pen_type == 0 {
            return;
        }
        let width = state.quantized_device_line_width;
        let line_type = cgm_line_type(state.line_type);
        let (cached_width, width_id, cached_type, type_id) = match object {
            Object::Open => (&mut self.cache.line_width, 3, &mut self.cache.line_type, 2),
            Object::Closed => (&mut self.cache.edge_width, 28, &mut self.cache.edge_type, 27),
        };
        if *cached_width != width {
            Command::new(ATTRIBUTE, width_id).int(width).emit(cx.page);
            *cached_width = width;
        }
        if *cached_type != line_type {
            Command::new(ATTRIBUTE, type_id).index(line_type.into()).emit(cx.page);
            *cached_type = line_type;
        }
    }

    fn set_interior_style(&mut self, cx: &mut Cx<'_>, style: i16) {
        if self.cache.interior_style != style {
            Command::new(ATTRIBUTE, 22).index(style.into()).emit(cx.page);
            self.cache.interior_style = style;
        }
    }

    fn set_edge_visibility(&mut self, cx: &mut Cx<'_>, visible: bool) {
        if self.cache.edge_visible != visible {
            Command::new(ATTRIBUTE, 30).index(visible.into()).emit(cx.page);
            self.cache.edge_visible = visible;
        }
    }

    /// Colors and attributes for a box, circle or ellipse, which CGM
    /// fills and edges in one primitive.
    fn prepare_closed_primitive(&mut self, cx: &mut Cx<'_>) {
        self.set_pen_color(cx, Object::Closed);
        self.set_fill_color(cx);
        self.set_attributes(cx, Object::Closed);
        let style = if cx.state.fill_type == 0 { INT_EMPTY } else { INT_SOLID };
        self.set_interior_style(cx, style);
        self.set_edge_visibility(cx, cx.state.pen_type != 0);
    }

    fn picture_header(&self, page: &PageBuffer, params: &PlotterParams, bg: Option<Rgb48>) -> Vec<u8> {
        let mut out = Vec::new();
        let page_size = &params.page_size;
        let (lo, hi) = vdc_extent(page_size.xsize, page_size.ysize);
        let (min, max) = (
            IPoint::new(lo.x.min(hi.x), lo.y.min(hi.y)),
            IPoint::new(lo.x.max(hi.x), lo.y.max(hi.y)),
        );
        Command::new(DELIMITER, 3)
            .string(&format!("picture_{}", page.number))
            .encode(&mut out);
        Command::new(PICTURE_DESCRIPTOR, 6)
            .index(min.x)
            .index(min.y)
            .index(max.x)
            .index(max.y)
            .encode(&mut out);
        // millimeters per VDC, so that the picture has the viewport's
        // physical size
        let irange = hi.x - lo.x;
        let jrange = hi.y - lo.y;
        let scale = if irange != 0 {
            25.4 * page_size.xsize / irange as f64
        } else if jrange != 0 {
            25.4 * page_size.ysize / jrange as f64
        } else {
            0.0
        };
        Command::new(PICTURE_DESCRIPTOR, 1).index(1).real_float(scale).encode(&mut out);
        // line, edge and marker sizes are absolute
        for id in [3, 5, 4] {
            Command::new(PICTURE_DESCRIPTOR, id).index(0).encode(&mut out);
        }
        // direct color
        Command::new(PICTURE_DESCRIPTOR, 2).index(1).encode(&mut out);
        if let Some(bg) = bg {
            Command::new(PICTURE_DESCRIPTOR, 7).color(bg).encode(&mut out);
        }
        Command::new(DELIMITER, 4).encode(&mut out);
        Command::new(CONTROL, 1).int(INTEGER_BITS).encode(&mut out);
        out
    }
}

impl Backend for CgmBackend {
    fn caps(&self) -> &'static Capabilities {
        &caps::CGM
    }

    fn device_range(&self, params: &PlotterParams) -> DeviceRange {
        let (lo, hi) = vdc_extent(params.page_size.xsize, params.page_size.ysize);
        DeviceRange::pixels(lo.x, hi.x, lo.y, hi.y)
    }

    fn begin_page(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        self.cache = AttributeCache::default();
        Ok(())
    }

    fn erase_page(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        self.cache = AttributeCache::default();
        Ok(())
    }

    fn end_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        let bg = (!cx.state.bg_color_suppressed).then_some(cx.state.bg_color);
        cx.page.header = self.picture_header(cx.page, cx.params, bg);
        let mut trailer = Vec::new();
        Command::new(DELIMITER, 5).encode(&mut trailer);
        cx.page.trailer = trailer;
        Ok(())
    }

    fn document_framing(&mut self, doc: &Document, _params: &PlotterParams) -> (Vec<u8>, Vec<u8>) {
        let colored = doc.colors_used().into_iter().any(is_colored);
        // a metafile without pictures conforms to no profile
        let (profile, edition) = if doc.pages.is_empty() {
            ("None", "0.0")
        } else {
            ("WebCGM", "1.0")
        };
        debug!(pages = doc.pages.len(), colored, "writing cgm framing");

        let mut h = Vec::new();
        Command::new(DELIMITER, 1).string("CGM plot").encode(&mut h);
        Command::new(METAFILE_DESCRIPTOR, 1).int(1).encode(&mut h);
        // the version 1 element set: DRAWINGPLUS
        Command::new(METAFILE_DESCRIPTOR, 11).int(1).index(-1).index(1).encode(&mut h);
        let mut description = String::new();
        let _ = write!(
            description,
            "\"ProfileId:{profile}\" \"ProfileEd:{edition}\" \"ColourClass:{}\" \"Source:plotkit {}\"",
            if colored { "colour" } else { "monochrome" },
            env!("CARGO_PKG_VERSION"),
        );
        Command::new(METAFILE_DESCRIPTOR, 2).string(&description).encode(&mut h);
        // integer VDCs
        Command::new(METAFILE_DESCRIPTOR, 3).index(0).encode(&mut h);
        Command::new(METAFILE_DESCRIPTOR, 4).index(INTEGER_BITS).encode(&mut h);
        // fixed-point reals, 16 bits whole and 16 fraction
        Command::new(METAFILE_DESCRIPTOR, 5).index(1).int(16).int(16).encode(&mut h);
        Command::new(METAFILE_DESCRIPTOR, 7).int(COLOR_BITS).encode(&mut h);
        Command::new(METAFILE_DESCRIPTOR, 10)
            .color(Rgb48::BLACK)
            .color(Rgb48::WHITE)
            .encode(&mut h);

        let mut t = Vec::new();
        Command::new(DELIMITER, 2).encode(&mut t);
        (h, t)
    }

    fn paint_point(&mut self, cx: &mut Cx<'_>, p: DVec2) -> Result<(), PlotError> {
        if cx.state.pen_type == 0 {
            return Ok(());
        }
        if self.cache.marker_type != MARKER_DOT {
            Command::new(ATTRIBUTE, 6).index(MARKER_DOT.into()).emit(cx.page);
            self.cache.marker_type = MARKER_DOT;
        }
        let c = cx.state.fg_color;
        Self::note_color(cx.page, c.to_rgb24());
        if self.cache.marker_color != Some(c) {
            Command::new(ATTRIBUTE, 8).color(c).emit(cx.page);
            self.cache.marker_color = Some(c);
        }
        let d = IPoint::round(cx.to_device(p));
        Command::new(GRAPHICAL_PRIMITIVE, 3).point(d).emit(cx.page);
        Ok(())
    }

    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
        let state = cx.state;
        if state.pen_type == 0 && state.fill_type == 0 {
            return Ok(());
        }
        let closed = poly.closed;
        let object = if closed { Object::Closed } else { Object::Open };
        self.set_pen_color(cx, object);
        self.set_fill_color(cx);
        self.set_attributes(cx, object);

        let points: Vec<IPoint> = poly.device.iter().map(|&d| IPoint::round(d)).collect();
        if closed {
            let style = if state.fill_type == 0 { INT_EMPTY } else { INT_SOLID };
            self.set_interior_style(cx, style);
            self.set_edge_visibility(cx, state.pen_type != 0);
            // the closing vertex is implied
            let polygon = points[..points.len() - 1]
                .iter()
                .fold(Command::new(GRAPHICAL_PRIMITIVE, 7), |c, &p| c.point(p));
            polygon.emit(cx.page);
            return Ok(());
        }

        // an open path is filled as an edgeless polygon, then stroked
        if state.fill_type != 0 {
            self.set_interior_style(cx, INT_SOLID);
            self.set_edge_visibility(cx, false);
            let polygon = points
                .iter()
                .fold(Command::new(GRAPHICAL_PRIMITIVE, 7), |c, &p| c.point(p));
            polygon.emit(cx.page);
        }
        if state.pen_type != 0 {
            let polyline = points
                .iter()
                .fold(Command::new(GRAPHICAL_PRIMITIVE, 1), |c, &p| c.point(p));
            polyline.emit(cx.page);
        }
        Ok(())
    }

    fn draw_box(&mut self, cx: &mut Cx<'_>, p0: DVec2, p1: DVec2, _clockwise: bool) -> Result<(), PlotError> {
        let (d0, d1) = (IPoint::round(cx.to_device(p0)), IPoint::round(cx.to_device(p1)));
        self.prepare_closed_primitive(cx);
        Command::new(GRAPHICAL_PRIMITIVE, 11).point(d0).point(d1).emit(cx.page);
        Ok(())
    }

    fn draw_circle(&mut self, cx: &mut Cx<'_>, center: DVec2, radius: f64, _clockwise: bool) -> Result<(), PlotError> {
        let c = IPoint::round(cx.to_device(center));
        let r = iround(cx.state.transform.m.apply_vector(dvec2(radius, 0.0)).length());
        self.prepare_closed_primitive(cx);
        Command::new(GRAPHICAL_PRIMITIVE, 12).point(c).int(r).emit(cx.page);
        Ok(())
    }

    /// Written as a center and the endpoints of a pair of conjugate
    /// diameters, which any affine map preserves.
    fn draw_ellipse(
        &mut self,
        cx: &mut Cx<'_>,
        center: DVec2,
        radii: DVec2,
        angle_deg: f64,
        _clockwise: bool,
    ) -> Result<(), PlotError> {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        let c = IPoint::round(cx.to_device(center));
        let cd1 = IPoint::round(cx.to_device(center + radii.x * dvec2(cos, sin)));
        let cd2 = IPoint::round(cx.to_device(center + radii.y * dvec2(-sin, cos)));
        self.prepare_closed_primitive(cx);
        Command::new(GRAPHICAL_PRIMITIVE, 17)
            .point(c)
            .point(cd1)
            .point(cd2)
            .emit(cx.page);
        Ok(())
    }
}
