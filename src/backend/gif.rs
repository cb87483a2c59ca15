//! GIF output.
//!
//! Each frame is scan-converted into an indexed [`Canvas`] with a color
//! table of at most 256 entries, allocated as colors are first used.
//! Only the first page of a document is written. With animation on,
//! every erase emits the finished frame, so a page becomes an animated
//! GIF; otherwise the one image is written when the page closes.

use std::fmt;

use glam::DVec2;

use super::raster::{Rasterizer, stroke_style};
use super::rle::MiGif;
use super::{Backend, Cx, DeviceRange, Polyline};
use crate::caps::{self, Capabilities};
use crate::collab::{Canvas, RasterEncoder, ScanConverter};
use crate::color::{BuiltinColors, ColorNameCache, nearest_index};
use crate::errors::{PlotError, Warning, Warnings};
use crate::log::debug;
use crate::params::{MAX_BITMAP_SIDE, PlotterParams};
use crate::types::{IPoint, Rgb24, Rgb48};

const MAX_COLORS: usize = 256;

/// Disposal method asking the viewer to restore the background.
const DISPOSE_TO_BACKGROUND: u8 = 2;

/// Bits needed to index `colors` table entries.
fn bit_depth(colors: usize) -> u8 {
    let mut v = colors.saturating_sub(1);
    let mut depth = 0;
    while v > 0 {
        v >>= 1;
        depth += 1;
    }
    depth
}

fn write_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Rows in the order an interlaced image stores them.
/// Raster size, limited to what the 16-bit screen descriptor can hold.
fn screen_size(params: &PlotterParams) -> (u32, u32) {
    let (w, h) = params.bitmap_size;
    (w.min(MAX_BITMAP_SIDE), h.min(MAX_BITMAP_SIDE))
}

fn scan_rows(height: u32, interlace: bool) -> Vec<u32> {
    if !interlace {
        return (0..height).collect();
    }
    [(0, 8), (4, 8), (2, 4), (1, 2)]
        .into_iter()
        .flat_map(|(start, step)| (start..height).step_by(step))
        .collect()
}

pub struct GifBackend {
    scan: Box<dyn ScanConverter>,
    encoder: Box<dyn RasterEncoder>,
    width: u32,
    height: u32,
    canvas: Canvas,
    palette: Vec<Rgb24>,
    /// The first frame's table, written as the global color table.
    global_palette: Vec<Rgb24>,
    bg_index: u8,

    transparent_name: Option<String>,
    transparent: Option<Rgb24>,
    /// Resolved when the header is written.
    transparent_index: Option<u8>,
    animation: bool,
    iterations: u16,
    delay: u16,
    interlace: bool,

    header_written: bool,
    frame_nonempty: bool,
    frame_number: u32,
}

impl fmt::Debug for GifBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GifBackend")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("colors", &self.palette.len())
            .field("animation", &self.animation)
            .field("frame_number", &self.frame_number)
            .finish_non_exhaustive()
    }
}

impl GifBackend {
    pub fn new(params: &PlotterParams) -> Self {
        Self::with_collaborators(params, Box::new(Rasterizer::new()), Box::new(MiGif::new()))
    }

    /// A GIF backend drawing with `scan` and compressing with `encoder`.
    pub fn with_collaborators(
        params: &PlotterParams,
        scan: Box<dyn ScanConverter>,
        encoder: Box<dyn RasterEncoder>,
    ) -> Self {
        let (width, height) = screen_size(params);
        GifBackend {
            scan,
            encoder,
            width,
            height,
            canvas: Canvas::new(width, height, 0),
            palette: Vec::new(),
            global_palette: Vec::new(),
            bg_index: 0,
            transparent_name: params.gif_transparent.clone(),
            transparent: None,
            transparent_index: None,
            animation: params.gif_animation,
            iterations: params.gif_iterations,
            delay: params.gif_delay,
            interlace: params.interlace,
            header_written: false,
            frame_nonempty: false,
            frame_number: 0,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn palette(&self) -> &[Rgb24] {
        &self.palette
    }

    fn bit_depth(&self) -> u8 {
        bit_depth(self.palette.len())
    }

    /// The table index for `color`, allocating one if there is room and
    /// falling back to the nearest entry if there is not.
    fn color_index(&mut self, color: Rgb48, warnings: &mut Warnings) -> u8 {
        let c = color.to_rgb24();
        if let Some(i) = self.palette.iter().position(|&p| p == c) {
            return i as u8;
        }
        if self.palette.len() < MAX_COLORS {
            self.palette.push(c);
            return (self.palette.len() - 1) as u8;
        }
        warnings.emit(Warning::PaletteFull);
        nearest_index(c, &self.palette).unwrap_or(0) as u8
    }

    /// Start a frame: an empty table holding the transparent color (when
    /// animating, so that it keeps index 0 in every frame) and the
    /// background, and a canvas filled with the background.
    fn new_image(&mut self, bg: Rgb48, warnings: &mut Warnings) {
        self.palette.clear();
        if self.animation
            && let Some(t) = self.transparent
        {
            self.color_index(t.to_rgb48(), warnings);
        }
        self.bg_index = self.color_index(bg, warnings);
        self.canvas = Canvas::new(self.width, self.height, self.bg_index);
    }

    fn needs_gif89(&self) -> bool {
        self.transparent_index.is_some() || (self.animation && (self.iterations > 0 || self.delay > 0))
    }

    fn write_color_table(&self, out: &mut Vec<u8>) {
        let entries = 1usize << self.bit_depth().max(1);
        for i in 0..entries {
            let c = self.palette.get(i).copied().unwrap_or(Rgb24::BLACK);
            out.extend_from_slice(&[c.r, c.g, c.b]);
        }
    }

    fn write_header(&mut self, out: &mut Vec<u8>) {
        self.transparent_index = match self.transparent {
            Some(_) if self.animation => Some(0),
            Some(t) => self.palette.iter().position(|&p| p == t).map(|i| i as u8),
            None => None,
        };
        out.extend_from_slice(if self.needs_gif89() { b"GIF89a" } else { b"GIF87a" });
        write_u16(out, self.width as u16);
        write_u16(out, self.height as u16);
        let depth = self.bit_depth().saturating_sub(1);
        out.push(0x80 | (depth << 4) | depth);
        out.push(self.bg_index);
        out.push(0);
        self.write_color_table(out);
        self.global_palette = self.palette.clone();

        if self.animation && self.iterations > 0 {
            out.extend_from_slice(&[b'!', 0xff, 11]);
            out.extend_from_slice(b"NETSCAPE2.0");
            out.extend_from_slice(&[3, 1]);
            write_u16(out, self.iterations);
            out.push(0);
        }
        self.header_written = true;
    }

    fn write_image(&mut self, out: &mut Vec<u8>) {
        if self.transparent_index.is_some() || (self.animation && self.delay > 0) {
            let mut packed = 0;
            if self.transparent_index.is_some() {
                packed |= 1;
                if self.animation {
                    packed |= DISPOSE_TO_BACKGROUND << 2;
                }
            }
            out.extend_from_slice(&[b'!', 0xf9, 4, packed]);
            write_u16(out, self.delay);
            out.push(self.transparent_index.unwrap_or(0));
            out.push(0);
        }

        out.push(b',');
        write_u16(out, 0);
        write_u16(out, 0);
        write_u16(out, self.width as u16);
        write_u16(out, self.height as u16);
        let local_table = self.palette != self.global_palette;
        let mut packed = 0;
        if local_table {
            packed |= 0x80 | self.bit_depth().saturating_sub(1);
        }
        if self.interlace {
            packed |= 0x40;
        }
        out.push(packed);
        if local_table {
            self.write_color_table(out);
        }

        let width = self.width as usize;
        let canvas = &self.canvas;
        let mut pixels = scan_rows(self.height, self.interlace)
            .into_iter()
            .flat_map(|y| canvas.pixels[y as usize * width..(y as usize + 1) * width].iter().copied());
        self.encoder.encode(&mut pixels, self.bit_depth(), out);
        debug!(colors = self.palette.len(), frame = self.frame_number, "wrote GIF image");
    }

    fn device_point(cx: &Cx<'_>, p: DVec2) -> IPoint {
        IPoint::round(cx.to_device(p))
    }
}

impl Backend for GifBackend {
    fn caps(&self) -> &'static Capabilities {
        &caps::GIF
    }

    fn device_range(&self, params: &PlotterParams) -> DeviceRange {
        let (w, h) = screen_size(params);
        DeviceRange::pixels(0, w as i32 - 1, h as i32 - 1, 0)
    }

    fn begin_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        self.transparent = None;
        if let Some(name) = &self.transparent_name {
            match ColorNameCache::default().resolve(name, &BuiltinColors) {
                Some(c) => self.transparent = Some(c.to_rgb24()),
                None => {
                    cx.warn(Warning::UnknownColor { name: name.clone() });
                }
            }
        }
        self.transparent_index = None;
        self.global_palette.clear();
        self.header_written = false;
        self.frame_number = 0;
        self.new_image(cx.state.bg_color, cx.warnings);
        self.frame_nonempty = false;
        Ok(())
    }

    fn end_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        if cx.page.number == 1 {
            let mut out = Vec::new();
            if !self.header_written {
                self.write_header(&mut out);
            }
            self.write_image(&mut out);
            out.push(b';');
            cx.page.write_bytes(&out);
        }
        Ok(())
    }

    fn erase_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        if self.animation && cx.page.number == 1 && (self.frame_number > 0 || self.frame_nonempty) {
            let mut out = Vec::new();
            if !self.header_written {
                self.write_header(&mut out);
            }
            self.write_image(&mut out);
            cx.page.write_bytes(&out);
        }
        self.frame_number += 1;
        self.new_image(cx.state.bg_color, cx.warnings);
        self.frame_nonempty = false;
        Ok(())
    }

    fn paint_point(&mut self, cx: &mut Cx<'_>, p: DVec2) -> Result<(), PlotError> {
        if cx.state.pen_type == 0 {
            return Ok(());
        }
        let index = self.color_index(cx.state.fg_color, cx.warnings);
        let at = Self::device_point(cx, p);
        self.scan.draw_point(&mut self.canvas, at, index);
        self.frame_nonempty = true;
        Ok(())
    }

    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
        let state = cx.state;
        let points: Vec<IPoint> = poly.device.iter().map(|&d| IPoint::round(d)).collect();
        if state.fill_type != 0 {
            let index = self.color_index(state.fill_color, cx.warnings);
            self.scan.fill_polygon(&mut self.canvas, &points, state.fill_rule, index);
        }
        if state.pen_type != 0 {
            let index = self.color_index(state.fg_color, cx.warnings);
            self.scan.draw_lines(&mut self.canvas, &points, &stroke_style(state), index);
        }
        self.frame_nonempty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::BuiltinMetrics;
    use crate::matrix::Affine;
    use crate::outbuf::PageBuffer;
    use crate::path::Path;
    use crate::state::{DrawState, Transform};
    use glam::dvec2;

    /// Records pixel indices instead of compressing them.
    struct RawEncoder;

    impl RasterEncoder for RawEncoder {
        fn encode(&mut self, indices: &mut dyn Iterator<Item = u8>, bits_per_pixel: u8, out: &mut Vec<u8>) {
            out.push(bits_per_pixel.max(2));
            out.extend(indices);
            out.push(0);
        }
    }

    struct Fixture {
        state: DrawState,
        page: PageBuffer,
        warnings: Warnings,
        params: PlotterParams,
        ndc: Affine,
        gif: GifBackend,
    }

    impl Fixture {
        /// A `w`x`h` image where user coordinates are pixel coordinates.
        fn new(w: u32, h: u32, settings: &[(&str, &str)]) -> Self {
            let mut params = PlotterParams::default();
            params.set("BITMAPSIZE", &format!("{w}x{h}")).unwrap();
            for (k, v) in settings {
                params.set(k, v).unwrap();
            }
            let mut state = DrawState::default();
            state.transform = Transform::new(Affine::IDENTITY, &Affine::IDENTITY, false);
            state.set_line_width(0.0);
            Fixture {
                state,
                page: PageBuffer::new(1),
                warnings: Warnings::default(),
                gif: GifBackend::with_collaborators(&params, Box::new(Rasterizer), Box::new(RawEncoder)),
                params,
                ndc: Affine::IDENTITY,
            }
        }

        fn run(&mut self, f: impl FnOnce(&mut GifBackend, &mut Cx<'_>)) -> Vec<u8> {
            let mut cx = Cx {
                state: &self.state,
                page: &mut self.page,
                warnings: &mut self.warnings,
                params: &self.params,
                ndc_to_device: &self.ndc,
                fonts: &BuiltinMetrics,
            };
            f(&mut self.gif, &mut cx);
            self.page.body.clone()
        }
    }

    fn line(points: &[(f64, f64)]) -> Path {
        let pts: Vec<DVec2> = points.iter().map(|&(x, y)| dvec2(x, y)).collect();
        Path::from_points(&pts)
    }

    // ==================== Palette tests ====================

    #[test]
    fn depth_of_tables() {
        assert_eq!(bit_depth(1), 0);
        assert_eq!(bit_depth(2), 1);
        assert_eq!(bit_depth(3), 2);
        assert_eq!(bit_depth(129), 8);
        assert_eq!(bit_depth(256), 8);
    }

    #[test]
    fn colors_are_allocated_on_first_use() {
        let mut f = Fixture::new(4, 4, &[]);
        f.run(|g, cx| g.begin_page(cx).unwrap());
        assert_eq!(f.gif.palette(), &[Rgb24::WHITE]);
        f.state.fg_color = Rgb48::new(0xffff, 0, 0);
        f.run(|g, cx| {
            g.paint_point(cx, dvec2(1.0, 1.0)).unwrap();
            g.paint_point(cx, dvec2(2.0, 2.0)).unwrap();
        });
        assert_eq!(f.gif.palette(), &[Rgb24::WHITE, Rgb24::new(0xff, 0, 0)]);
        assert_eq!(f.gif.canvas().get(1, 1), Some(1));
    }

    #[test]
    fn full_table_maps_to_nearest() {
        let mut f = Fixture::new(2, 2, &[]);
        f.run(|g, cx| g.begin_page(cx).unwrap());
        for i in 1..256u16 {
            let v = i * 0x100;
            f.gif.color_index(Rgb48::new(v, 0, 0), &mut f.warnings);
        }
        assert_eq!(f.gif.palette().len(), 256);
        let idx = f.gif.color_index(Rgb48::new(0xfe00, 0x0200, 0), &mut f.warnings);
        assert_eq!(f.gif.palette()[idx as usize], Rgb24::new(0xfe, 0, 0));
        assert_eq!(f.warnings.issued(), &[Warning::PaletteFull]);
    }

    #[test]
    fn animated_transparency_takes_index_zero() {
        let mut f = Fixture::new(2, 2, &[("GIF_TRANSPARENT", "red")]);
        f.run(|g, cx| g.begin_page(cx).unwrap());
        assert_eq!(f.gif.palette(), &[Rgb24::new(0xff, 0, 0), Rgb24::WHITE]);
        assert_eq!(f.gif.canvas().get(0, 0), Some(1));
    }

    #[test]
    fn unknown_transparent_color_warns() {
        let mut f = Fixture::new(2, 2, &[("GIF_TRANSPARENT", "no such color")]);
        f.run(|g, cx| g.begin_page(cx).unwrap());
        assert_eq!(f.gif.palette(), &[Rgb24::WHITE]);
        assert!(matches!(f.warnings.issued(), [Warning::UnknownColor { .. }]));
    }

    // ==================== Drawing tests ====================

    #[test]
    fn filled_and_stroked_square() {
        let mut f = Fixture::new(8, 8, &[]);
        f.state.fill_type = 1;
        f.state.fill_color = Rgb48::new(0, 0, 0xffff);
        f.run(|g, cx| {
            g.begin_page(cx).unwrap();
            g.paint_path(cx, &line(&[(1.0, 1.0), (6.0, 1.0), (6.0, 6.0), (1.0, 6.0), (1.0, 1.0)]))
                .unwrap();
        });
        let c = f.gif.canvas();
        // fill first, then the black outline over it
        assert_eq!(c.get(3, 3), Some(1));
        assert_eq!(c.get(1, 1), Some(2));
        assert_eq!(c.get(6, 4), Some(2));
        assert_eq!(c.get(7, 7), Some(0));
    }

    #[test]
    fn invisible_pen_paints_no_point() {
        let mut f = Fixture::new(4, 4, &[]);
        f.state.pen_type = 0;
        f.run(|g, cx| {
            g.begin_page(cx).unwrap();
            g.paint_point(cx, dvec2(1.0, 1.0)).unwrap();
        });
        assert!(f.gif.canvas().pixels.iter().all(|&p| p == 0));
        assert!(!f.gif.frame_nonempty);
    }

    #[test]
    fn stroke_uses_pixel_width() {
        let mut f = Fixture::new(10, 10, &[]);
        f.state.set_line_width(3.0);
        f.run(|g, cx| {
            g.begin_page(cx).unwrap();
            g.paint_path(cx, &line(&[(1.0, 5.0), (8.0, 5.0)])).unwrap();
        });
        let c = f.gif.canvas();
        assert_eq!((c.get(4, 4), c.get(4, 5), c.get(4, 6)), (Some(1), Some(1), Some(1)));
        assert_eq!(c.get(4, 2), Some(0));
    }

    // ==================== Stream tests ====================

    #[test]
    fn screen_size_never_wraps() {
        let mut params = PlotterParams::default();
        params.bitmap_size = (70_000, 1);
        let mut g = GifBackend::with_collaborators(&params, Box::new(Rasterizer), Box::new(RawEncoder));
        assert_eq!((g.width, g.height), (65_535, 1));
        let mut out = Vec::new();
        g.write_header(&mut out);
        assert_eq!(&out[6..10], &[0xff, 0xff, 1, 0]);
        let range = g.device_range(&params);
        assert_eq!(range, DeviceRange::pixels(0, 65_534, 0, 0));
    }

    #[test]
    fn single_image_stream() {
        let mut f = Fixture::new(2, 1, &[("GIF_ANIMATION", "no")]);
        let out = f.run(|g, cx| {
            g.begin_page(cx).unwrap();
            g.paint_point(cx, dvec2(1.0, 0.0)).unwrap();
            g.end_page(cx).unwrap();
        });
        let mut want = b"GIF87a".to_vec();
        want.extend_from_slice(&[2, 0, 1, 0, 0x80, 0, 0]);
        want.extend_from_slice(&[0xff, 0xff, 0xff, 0, 0, 0]);
        want.extend_from_slice(&[b',', 0, 0, 0, 0, 2, 0, 1, 0, 0]);
        want.extend_from_slice(&[2, 0, 1, 0]);
        want.push(b';');
        assert_eq!(out, want);
    }

    #[test]
    fn transparency_found_in_a_still_image() {
        let mut f = Fixture::new(1, 1, &[("GIF_ANIMATION", "no"), ("GIF_TRANSPARENT", "white")]);
        let out = f.run(|g, cx| {
            g.begin_page(cx).unwrap();
            g.end_page(cx).unwrap();
        });
        assert!(out.starts_with(b"GIF89a"));
        let gce = [b'!', 0xf9, 4, 1, 0, 0, 0, 0];
        assert!(out.windows(gce.len()).any(|w| w == gce));
    }

    #[test]
    fn transparency_absent_from_table_is_dropped() {
        let mut f = Fixture::new(1, 1, &[("GIF_ANIMATION", "no"), ("GIF_TRANSPARENT", "red")]);
        let out = f.run(|g, cx| {
            g.begin_page(cx).unwrap();
            g.end_page(cx).unwrap();
        });
        assert!(out.starts_with(b"GIF87a"));
    }

    #[test]
    fn animation_writes_a_frame_per_erase() {
        let mut f = Fixture::new(1, 1, &[("GIF_ITERATIONS", "3"), ("GIF_DELAY", "10")]);
        let out = f.run(|g, cx| {
            g.begin_page(cx).unwrap();
            // an empty zeroth frame is skipped
            g.erase_page(cx).unwrap();
            g.paint_point(cx, dvec2(0.0, 0.0)).unwrap();
            g.erase_page(cx).unwrap();
            g.end_page(cx).unwrap();
        });
        assert!(out.starts_with(b"GIF89a"));
        let netscape = b"NETSCAPE2.0\x03\x01\x03\x00\x00";
        assert!(out.windows(netscape.len()).any(|w| w == netscape));
        let frames = out.windows(4).filter(|w| *w == [b'!', 0xf9, 4, 0]).count();
        assert_eq!(frames, 2);
        assert_eq!(out.last(), Some(&b';'));
    }

    #[test]
    fn frames_with_new_colors_get_local_tables() {
        let mut f = Fixture::new(1, 1, &[]);
        f.state.fg_color = Rgb48::new(0, 0xffff, 0);
        let out = f.run(|g, cx| {
            g.begin_page(cx).unwrap();
            g.erase_page(cx).unwrap();
            g.end_page(cx).unwrap();
        });
        // the empty zeroth frame is skipped, so the page is one image
        let first_frame = out.iter().position(|&b| b == b',').unwrap();
        assert_eq!(out[first_frame + 9], 0);
        assert_eq!(f.gif.frame_number, 1);

        let mut g = Fixture::new(1, 1, &[]);
        g.state.fg_color = Rgb48::new(0, 0xffff, 0);
        let out = g.run(|b, cx| {
            b.begin_page(cx).unwrap();
            b.paint_point(cx, dvec2(0.0, 0.0)).unwrap();
            b.erase_page(cx).unwrap();
            b.end_page(cx).unwrap();
        });
        // the global table holds green; the blank second frame does not
        let last_frame = out.iter().rposition(|&b| b == b',').unwrap();
        assert_eq!(out[last_frame + 9], 0x80);
    }

    #[test]
    fn later_pages_write_nothing() {
        let mut f = Fixture::new(1, 1, &[]);
        f.page = PageBuffer::new(2);
        let out = f.run(|g, cx| {
            g.begin_page(cx).unwrap();
            g.end_page(cx).unwrap();
        });
        assert!(out.is_empty());
    }

    #[test]
    fn interlaced_row_order() {
        assert_eq!(scan_rows(10, true), vec![0, 8, 4, 2, 6, 1, 3, 5, 7, 9]);
        assert_eq!(scan_rows(3, false), vec![0, 1, 2]);
    }

    #[test]
    fn default_collaborators_size_the_screen() {
        let params = PlotterParams::default();
        let mut gif = GifBackend::new(&params);
        let mut out = Vec::new();
        gif.write_header(&mut out);
        assert_eq!(&out[6..10], &[0x3a, 0x02, 0x3a, 0x02]);
        assert!(gif.header_written);
    }
}
