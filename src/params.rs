//! Plotter parameters: typed fields with string setters.
//!
//! Every field has a documented default. [`PlotterParams::set`] accepts the
//! classic `NAME`/`value` pairs; a value that fails to parse leaves the
//! default in place and queues a [`Warning`] that the plotter reports once
//! it exists.

use std::fmt;

use crate::errors::{PlotError, Warning, WarningHandler};

/// A paper type from the builtin table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaperType {
    pub name: &'static str,
    pub alt_name: Option<&'static str>,
    pub fig_name: &'static str,
    pub metric: bool,
    /// Paper size, inches.
    pub xsize: f64,
    pub ysize: f64,
    pub default_viewport_size: f64,
    /// PCL margins, inches.
    pub pcl_xorigin: f64,
    pub pcl_yorigin: f64,
    pub hpgl2_plot_length: f64,
}

const fn paper(
    name: &'static str,
    alt_name: Option<&'static str>,
    fig_name: &'static str,
    metric: bool,
    size: (f64, f64),
    viewport: f64,
    pcl: (f64, f64),
    plot_length: f64,
) -> PaperType {
    PaperType {
        name,
        alt_name,
        fig_name,
        metric,
        xsize: size.0,
        ysize: size.1,
        default_viewport_size: viewport,
        pcl_xorigin: pcl.0,
        pcl_yorigin: pcl.1,
        hpgl2_plot_length: plot_length,
    }
}

pub const PAPER_TYPES: [PaperType; 13] = [
    paper("a", Some("letter"), "Letter", false, (8.5, 11.0), 8.0, (0.25, 0.5), 10.5),
    paper("b", Some("tabloid"), "B", false, (11.0, 17.0), 10.0, (0.25, 0.5), 16.0),
    paper("c", None, "C", false, (17.0, 22.0), 16.0, (0.25, 0.5), 21.0),
    paper("d", None, "D", false, (22.0, 34.0), 20.0, (0.25, 0.5), 33.0),
    paper("e", None, "E", false, (34.0, 44.0), 32.0, (0.25, 0.5), 43.0),
    paper("legal", None, "Legal", false, (8.5, 14.0), 8.0, (0.25, 0.5), 16.0),
    paper("ledger", None, "Ledger", false, (17.0, 11.0), 10.0, (0.5, 0.25), 10.0),
    paper("a4", None, "A4", true, (8.27, 11.69), 7.8, (71.0 / 300.0, 0.5), 11.2),
    paper("a3", None, "A3", true, (11.69, 16.54), 10.7, (71.0 / 300.0, 0.5), 15.6),
    paper("a2", None, "A2", true, (16.54, 23.39), 15.6, (71.0 / 300.0, 0.5), 22.4),
    paper("a1", None, "A1", true, (23.39, 33.11), 22.4, (71.0 / 300.0, 0.5), 32.2),
    paper("a0", None, "A0", true, (33.11, 46.81), 32.2, (71.0 / 300.0, 0.5), 45.9),
    paper("b5", None, "B5", true, (7.17, 10.12), 6.67, (71.0 / 300.0, 0.5), 9.62),
];

/// A paper type plus the viewport placed on it, all in inches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub paper: PaperType,
    pub xsize: f64,
    pub ysize: f64,
    pub xorigin: f64,
    pub yorigin: f64,
    pub xoffset: f64,
    pub yoffset: f64,
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::for_paper(PAPER_TYPES[0])
    }
}

/// `8.5in`, `21.6cm` or `216mm`, in inches. A unit is required.
fn string_to_inches(s: &str) -> Option<f64> {
    let s = s.trim();
    let split = s.find(|c: char| c.is_ascii_alphabetic())?;
    let (num, unit) = s.split_at(split);
    let val: f64 = num.trim().parse().ok()?;
    match unit.trim() {
        "in" => Some(val),
        "cm" => Some(val / 2.54),
        "mm" => Some(val / 25.4),
        _ => None,
    }
}

impl PageSize {
    /// The default viewport for a paper type: a square centered on the
    /// page.
    pub fn for_paper(paper: PaperType) -> Self {
        let size = paper.default_viewport_size;
        PageSize {
            paper,
            xsize: size,
            ysize: size,
            xorigin: 0.5 * (paper.xsize - size),
            yorigin: 0.5 * (paper.ysize - size),
            xoffset: 0.0,
            yoffset: 0.0,
        }
    }

    /// Parse `name[,field=value...]` where the fields are `xsize`, `ysize`,
    /// `xorigin`, `yorigin`, `xoffset` and `yoffset`. Unparseable fields
    /// keep their defaults; an unknown paper name is an error.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut fields = spec.split(',');
        let name = fields.next()?.trim();
        let paper = PAPER_TYPES
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name) || p.alt_name.is_some_and(|a| a.eq_ignore_ascii_case(name)))?;
        let get = |key: &str, fields: &[&str]| {
            fields.iter().find_map(|f| {
                let (k, v) = f.split_once('=')?;
                (k.trim() == key).then(|| string_to_inches(v)).flatten()
            })
        };
        let fields: Vec<&str> = fields.collect();
        let xsize = get("xsize", &fields).unwrap_or(paper.default_viewport_size);
        let ysize = get("ysize", &fields).unwrap_or(paper.default_viewport_size);
        Some(PageSize {
            paper: *paper,
            xsize,
            ysize,
            xorigin: get("xorigin", &fields).unwrap_or(0.5 * (paper.xsize - xsize)),
            yorigin: get("yorigin", &fields).unwrap_or(0.5 * (paper.ysize - ysize)),
            xoffset: get("xoffset", &fields).unwrap_or(0.0),
            yoffset: get("yoffset", &fields).unwrap_or(0.0),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HpglVersion {
    V1,
    V15,
    #[default]
    V2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TekTerm {
    #[default]
    Generic,
    Xterm,
    Kermit,
}

/// Configuration for one plotter instance.
#[derive(Clone)]
pub struct PlotterParams {
    /// `PAGESIZE`: paper and viewport. Default `letter`.
    pub page_size: PageSize,
    /// `BG_COLOR`: initial background color name. Default `white`.
    pub bg_color: String,
    /// `EMULATE_COLOR`: map every color to gray. Default off.
    pub emulate_color: bool,
    /// `MAX_LINE_LENGTH`: segments after which an unfilled path is flushed.
    /// Default 500.
    pub max_line_length: usize,
    /// `ROTATION`: 0, 90, 180 or 270 degrees. Default 0.
    pub rotation: f64,
    /// `HPGL_VERSION`. Default 2.
    pub hpgl_version: HpglVersion,
    /// `HPGL_ASSIGN_COLORS`: soft-define pens with `PC`. Default off.
    pub hpgl_assign_colors: bool,
    /// `HPGL_PENS`: initial pen palette.
    pub hpgl_pens: String,
    /// `HPGL_OPAQUE_MODE`. Default on.
    pub hpgl_opaque_mode: bool,
    /// `HPGL_ROTATE`: 0, 90, 180 or 270. Default 0.
    pub hpgl_rotate: i32,
    /// `BITMAPSIZE`: raster width and height. Default 570x570.
    pub bitmap_size: (u32, u32),
    /// `GIF_TRANSPARENT`: color name rendered transparent. Default none.
    pub gif_transparent: Option<String>,
    /// `GIF_ANIMATION`: write one frame per erased page. Default on.
    pub gif_animation: bool,
    /// `GIF_ITERATIONS`: loop count. Default 0 (forever).
    pub gif_iterations: u16,
    /// `GIF_DELAY`: hundredths of a second between frames. Default 0.
    pub gif_delay: u16,
    /// `INTERLACE`: interlaced GIF rows. Default off.
    pub interlace: bool,
    /// `META_PORTABLE`: text metafile encoding. Default on.
    pub meta_portable: bool,
    /// `TERM`: Tektronix emulator. Default generic.
    pub term: TekTerm,
    /// `X_MAX_REQUEST`: points per X11 polyline request. Default 16384.
    pub x_max_request: usize,
    /// Receives every warning the plotter issues.
    pub warning_handler: Option<WarningHandler>,
    pending: Vec<Warning>,
}

/// Largest raster side: GIF screens and X11 drawables store sizes in 16 bits.
pub const MAX_BITMAP_SIDE: u32 = u16::MAX as u32;

pub const DEFAULT_HPGL_PENS: &str = "1=black:2=red:3=green:4=yellow:5=blue:6=magenta:7=cyan";

impl Default for PlotterParams {
    fn default() -> Self {
        PlotterParams {
            page_size: PageSize::default(),
            bg_color: "white".to_string(),
            emulate_color: false,
            max_line_length: 500,
            rotation: 0.0,
            hpgl_version: HpglVersion::V2,
            hpgl_assign_colors: false,
            hpgl_pens: DEFAULT_HPGL_PENS.to_string(),
            hpgl_opaque_mode: true,
            hpgl_rotate: 0,
            bitmap_size: (570, 570),
            gif_transparent: None,
            gif_animation: true,
            gif_iterations: 0,
            gif_delay: 0,
            interlace: false,
            meta_portable: true,
            term: TekTerm::Generic,
            x_max_request: 16384,
            warning_handler: None,
            pending: Vec::new(),
        }
    }
}

impl fmt::Debug for PlotterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotterParams")
            .field("page_size", &self.page_size)
            .field("bg_color", &self.bg_color)
            .field("max_line_length", &self.max_line_length)
            .field("rotation", &self.rotation)
            .field("hpgl_version", &self.hpgl_version)
            .field("bitmap_size", &self.bitmap_size)
            .finish_non_exhaustive()
    }
}

fn assign<T>(slot: &mut T, pending: &mut Vec<Warning>, value: &str, name: &'static str, parsed: Option<T>) {
    match parsed {
        Some(v) => *slot = v,
        None => pending.push(Warning::BadParameterValue {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" | "on" => Some(true),
        "no" | "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn parse_rotation(v: &str) -> Option<f64> {
    match v {
        "no" => Some(0.0),
        "yes" => Some(90.0),
        _ => v.trim().parse().ok(),
    }
}

impl PlotterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warning_handler(mut self, handler: WarningHandler) -> Self {
        self.warning_handler = Some(handler);
        self
    }

    /// Set a parameter by its classic name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), PlotError> {
        match name {
            "PAGESIZE" => assign(&mut self.page_size, &mut self.pending, value, "PAGESIZE", PageSize::parse(value)),
            "BG_COLOR" => self.bg_color = value.to_string(),
            "EMULATE_COLOR" => assign(&mut self.emulate_color, &mut self.pending, value, "EMULATE_COLOR", parse_bool(value)),
            "MAX_LINE_LENGTH" => assign(&mut self.max_line_length, &mut self.pending, value, "MAX_LINE_LENGTH",
                value.trim().parse::<usize>().ok().filter(|&n| n > 0)
            ),
            "ROTATION" => assign(&mut self.rotation, &mut self.pending, value, "ROTATION",
                parse_rotation(value).filter(|r| [0.0, 90.0, 180.0, 270.0].contains(r))
            ),
            "HPGL_VERSION" => assign(&mut self.hpgl_version, &mut self.pending, value, "HPGL_VERSION",
                match value {
                    "1" => Some(HpglVersion::V1),
                    "1.5" => Some(HpglVersion::V15),
                    "2" => Some(HpglVersion::V2),
                    _ => None,
                }
            ),
            "HPGL_ASSIGN_COLORS" => assign(&mut self.hpgl_assign_colors, &mut self.pending, value, "HPGL_ASSIGN_COLORS", parse_bool(value)),
            "HPGL_PENS" => self.hpgl_pens = value.to_string(),
            "HPGL_OPAQUE_MODE" => assign(&mut self.hpgl_opaque_mode, &mut self.pending, value, "HPGL_OPAQUE_MODE", parse_bool(value)),
            "HPGL_ROTATE" => assign(&mut self.hpgl_rotate, &mut self.pending, value, "HPGL_ROTATE",
                match value {
                    "no" => Some(0),
                    "yes" => Some(90),
                    _ => value.trim().parse::<i32>().ok().filter(|r| [0, 90, 180, 270].contains(r)),
                }
            ),
            "BITMAPSIZE" => {
                let parsed = value.split_once(['x', 'X']).and_then(|(w, h)| {
                    let w: u32 = w.trim().parse().ok()?;
                    let h: u32 = h.trim().parse().ok()?;
                    (w > 0 && h > 0).then_some((w, h))
                });
                let clamped = parsed.map(|(w, h)| (w.min(MAX_BITMAP_SIDE), h.min(MAX_BITMAP_SIDE)));
                if clamped != parsed {
                    self.pending.push(Warning::Truncated { what: "bitmap size" });
                }
                assign(&mut self.bitmap_size, &mut self.pending, value, "BITMAPSIZE", clamped)
            }
            "GIF_TRANSPARENT" => self.gif_transparent = Some(value.to_string()),
            "GIF_ANIMATION" => assign(&mut self.gif_animation, &mut self.pending, value, "GIF_ANIMATION", parse_bool(value)),
            "GIF_ITERATIONS" => assign(&mut self.gif_iterations, &mut self.pending, value, "GIF_ITERATIONS", value.trim().parse().ok()),
            "GIF_DELAY" => assign(&mut self.gif_delay, &mut self.pending, value, "GIF_DELAY", value.trim().parse().ok()),
            "INTERLACE" => assign(&mut self.interlace, &mut self.pending, value, "INTERLACE", parse_bool(value)),
            "META_PORTABLE" => assign(&mut self.meta_portable, &mut self.pending, value, "META_PORTABLE", parse_bool(value)),
            "TERM" => {
                self.term = match value {
                    v if v.starts_with("xterm") => TekTerm::Xterm,
                    v if v.starts_with("kermit") || v.starts_with("ansi.sys") => TekTerm::Kermit,
                    _ => TekTerm::Generic,
                }
            }
            "X_MAX_REQUEST" => assign(&mut self.x_max_request, &mut self.pending, value, "X_MAX_REQUEST",
                value.trim().parse::<usize>().ok().filter(|&n| n >= 2)
            ),
            _ => {
                return Err(PlotError::BadParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Warnings from bad values, handed to the plotter at creation.
    pub(crate) fn take_pending(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Page size tests ====================

    #[test]
    fn letter_viewport_is_centered() {
        let p = PageSize::parse("letter").unwrap();
        assert_eq!(p.paper.name, "a");
        assert_eq!(p.xsize, 8.0);
        assert!((p.xorigin - 0.25).abs() < 1e-12);
        assert!((p.yorigin - 1.5).abs() < 1e-12);
    }

    #[test]
    fn page_size_fields() {
        let p = PageSize::parse("A4,xsize=10cm, yoffset = 1in").unwrap();
        assert!(p.paper.metric);
        assert!((p.xsize - 10.0 / 2.54).abs() < 1e-12);
        assert_eq!(p.ysize, 7.8);
        assert_eq!(p.yoffset, 1.0);
        assert!(PageSize::parse("folio").is_none());
    }

    #[test]
    fn lengths_need_units() {
        assert_eq!(string_to_inches("2in"), Some(2.0));
        assert_eq!(string_to_inches("25.4 mm"), Some(1.0));
        assert_eq!(string_to_inches("3"), None);
        assert_eq!(string_to_inches("3ft"), None);
    }

    // ==================== Setter tests ====================

    #[test]
    fn unknown_names_are_errors() {
        let mut p = PlotterParams::new();
        assert!(matches!(p.set("NO_SUCH", "1"), Err(PlotError::BadParameter { .. })));
    }

    #[test]
    fn bad_values_keep_default_and_warn() {
        let mut p = PlotterParams::new();
        p.set("BITMAPSIZE", "huge").unwrap();
        p.set("ROTATION", "45").unwrap();
        assert_eq!(p.bitmap_size, (570, 570));
        assert_eq!(p.rotation, 0.0);
        assert_eq!(p.take_pending().len(), 2);
        assert!(p.take_pending().is_empty());
    }

    #[test]
    fn oversized_bitmaps_are_clamped() {
        let mut p = PlotterParams::new();
        p.set("BITMAPSIZE", "70000x300").unwrap();
        assert_eq!(p.bitmap_size, (MAX_BITMAP_SIDE, 300));
        assert!(matches!(p.take_pending()[..], [Warning::Truncated { what: "bitmap size" }]));
        p.set("BITMAPSIZE", "65535x65535").unwrap();
        assert!(p.take_pending().is_empty());
    }

    #[test]
    fn good_values_apply() {
        let mut p = PlotterParams::new();
        p.set("BITMAPSIZE", "300x200").unwrap();
        p.set("HPGL_VERSION", "1.5").unwrap();
        p.set("ROTATION", "yes").unwrap();
        p.set("TERM", "xterm-256color").unwrap();
        assert_eq!(p.bitmap_size, (300, 200));
        assert_eq!(p.hpgl_version, HpglVersion::V15);
        assert_eq!(p.rotation, 90.0);
        assert_eq!(p.term, TekTerm::Xterm);
    }
}
