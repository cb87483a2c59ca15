//! Narrow interfaces to the services the core depends on, each with a
//! small default implementation.
//!
//! Color names live in [`crate::color`]; the byte sink is any
//! [`std::io::Write`].

use std::sync::{Arc, Mutex};

use crate::state::modes::{CapStyle, FillRule, JoinStyle};
use crate::types::{IPoint, Rgb24};

// ============================================================================
// Font metrics
// ============================================================================

/// Metrics of one glyph, in units where the font size is 1000.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphMetrics {
    pub ascent: f64,
    pub descent: f64,
    pub advance: f64,
}

pub trait FontMetrics: Send + Sync {
    /// Whether `typeface` is known at all.
    fn has_typeface(&self, typeface: &str) -> bool;
    fn glyph(&self, typeface: &str, ch: char) -> Option<GlyphMetrics>;

    /// Width of `text` in units of the font size.
    fn text_width(&self, typeface: &str, text: &str) -> f64 {
        text.chars()
            .filter_map(|c| self.glyph(typeface, c))
            .map(|g| g.advance / 1000.0)
            .sum()
    }
}

/// Helvetica advance widths for printable ASCII, starting at the space.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

/// Metrics for the Helvetica family, monospaced Courier, and the Hershey
/// stroke fonts (approximated as Helvetica).
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinMetrics;

impl BuiltinMetrics {
    const TYPEFACES: &'static [&'static str] = &[
        "Helvetica",
        "Helvetica-Bold",
        "Helvetica-Oblique",
        "Courier",
        "Courier-Bold",
        "HersheySerif",
        "HersheySans",
    ];
}

impl FontMetrics for BuiltinMetrics {
    fn has_typeface(&self, typeface: &str) -> bool {
        Self::TYPEFACES.iter().any(|t| t.eq_ignore_ascii_case(typeface))
    }

    fn glyph(&self, typeface: &str, ch: char) -> Option<GlyphMetrics> {
        if !self.has_typeface(typeface) {
            return None;
        }
        let code = ch as u32;
        if !(0x20..0x7f).contains(&code) {
            return None;
        }
        let advance = if typeface.to_ascii_lowercase().starts_with("courier") {
            600.0
        } else {
            HELVETICA_WIDTHS[(code - 0x20) as usize] as f64
        };
        Some(GlyphMetrics {
            ascent: 718.0,
            descent: 207.0,
            advance,
        })
    }
}

// ============================================================================
// Raster canvas, scan conversion and compression
// ============================================================================

/// An 8-bit indexed image, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, fill: u8) -> Self {
        Canvas {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    /// Set one pixel; points off the canvas are ignored.
    #[inline]
    pub fn put(&mut self, x: i32, y: i32, index: u8) {
        if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = index;
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        (x < self.width && y < self.height).then(|| self.pixels[y as usize * self.width as usize + x as usize])
    }

    pub fn clear(&mut self, index: u8) {
        self.pixels.fill(index);
    }
}

/// How to stroke a polyline on a canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    /// Pixels; 0 draws the thinnest connected line.
    pub width: u32,
    pub cap: CapStyle,
    pub join: JoinStyle,
    /// On/off lengths in pixels, entered `dash_offset` pixels into the
    /// pattern. Empty for a solid line.
    pub dashes: Vec<u32>,
    pub dash_offset: u32,
}

pub trait ScanConverter: Send {
    fn draw_point(&mut self, canvas: &mut Canvas, p: IPoint, index: u8);
    fn draw_lines(&mut self, canvas: &mut Canvas, points: &[IPoint], style: &StrokeStyle, index: u8);
    fn fill_polygon(&mut self, canvas: &mut Canvas, points: &[IPoint], rule: FillRule, index: u8);
}

/// Compresses palette indices into a GIF image data stream: the minimum
/// code size byte followed by length-prefixed sub-blocks and a
/// terminator.
pub trait RasterEncoder: Send {
    fn encode(&mut self, indices: &mut dyn Iterator<Item = u8>, bits_per_pixel: u8, out: &mut Vec<u8>);
}

// ============================================================================
// X11 request sink
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XLineStyle {
    Solid,
    OnOffDash,
}

/// GC fields that changed; `None` means unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcChange {
    pub foreground: Option<Rgb24>,
    pub line_width: Option<u32>,
    pub line_style: Option<XLineStyle>,
    pub cap: Option<CapStyle>,
    pub join: Option<JoinStyle>,
    pub dashes: Option<(u32, Vec<u8>)>,
    pub fill_rule: Option<FillRule>,
}

impl GcChange {
    pub fn is_empty(&self) -> bool {
        *self == GcChange::default()
    }
}

/// Which GC a drawing request uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gc {
    Stroke,
    Fill,
    Background,
}

/// Drawing requests in X11 protocol terms. Angles are in 64ths of a
/// degree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XRequest {
    ChangeGc(Gc, GcChange),
    DrawLines(Vec<(i16, i16)>),
    FillPolygon { points: Vec<(i16, i16)>, convex: bool },
    DrawArc { x: i16, y: i16, width: u16, height: u16, angle1: i32, angle2: i32 },
    FillArc { x: i16, y: i16, width: u16, height: u16, angle1: i32, angle2: i32 },
    FillRectangle { gc: Gc, x: i16, y: i16, width: u16, height: u16 },
    DrawPoint(i16, i16),
    Flush,
}

pub trait XRequestSink: Send {
    fn send(&mut self, req: XRequest);
}

/// Keeps every request; clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct RecordingXSink {
    log: Arc<Mutex<Vec<XRequest>>>,
}

impl RecordingXSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<XRequest> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl XRequestSink for RecordingXSink {
    fn send(&mut self, req: XRequest) {
        if let Ok(mut log) = self.log.lock() {
            log.push(req);
        }
    }
}
