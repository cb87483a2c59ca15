//! Output backends.
//!
//! Every backend implements [`Backend`]. The painting template in
//! [`crate::paint`] decides, per path, whether a native primitive can be
//! emitted or the path must be flattened, and calls the `draw_*` hooks
//! accordingly. Backends only write what they are handed.

pub mod cgm;
pub mod fig;
pub mod gif;
pub mod hpgl;
pub mod meta;
pub mod ps;
pub mod raster;
pub mod regis;
pub mod rle;
pub mod svg;
pub mod tek;
pub mod x11;

use enum_dispatch::enum_dispatch;
use glam::{DVec2, dvec2};

use crate::caps::Capabilities;
use crate::collab::FontMetrics;
use crate::errors::{PlotError, Warning, Warnings};
use crate::geometry::ArcAngles;
use crate::matrix::Affine;
use crate::outbuf::{Document, PageBuffer};
use crate::params::{PageSize, PlotterParams};
use crate::paint;
use crate::path::Path;
use crate::state::DrawState;

pub use cgm::CgmBackend;
pub use fig::FigBackend;
pub use gif::GifBackend;
pub use hpgl::HpglBackend;
pub use meta::MetaBackend;
pub use ps::PsBackend;
pub use regis::RegisBackend;
pub use svg::SvgBackend;
pub use tek::TekBackend;
pub use x11::X11Backend;

/// Absolute rounding slack used to widen integer device ranges by just
/// under half a pixel.
const ROUNDING_FUZZ: f64 = 0.0000001;

/// The device-space rectangle that NDC's unit square maps onto.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceRange {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl DeviceRange {
    pub fn real(left: f64, right: f64, bottom: f64, top: f64) -> Self {
        DeviceRange {
            left,
            right,
            bottom,
            top,
        }
    }

    /// Integer pixel ranges, widened so that every pixel center in
    /// `imin..=imax` is reachable.
    pub fn pixels(imin: i32, imax: i32, jmin: i32, jmax: i32) -> Self {
        let xs = if imin < imax { 1.0 } else { -1.0 };
        let ys = if jmin < jmax { 1.0 } else { -1.0 };
        DeviceRange {
            left: imin as f64 + xs * (-0.5 + ROUNDING_FUZZ),
            right: imax as f64 + xs * (0.5 - ROUNDING_FUZZ),
            bottom: jmin as f64 + ys * (-0.5 + ROUNDING_FUZZ),
            top: jmax as f64 + ys * (0.5 - ROUNDING_FUZZ),
        }
    }

    /// A physical viewport on the page, `units_per_inch` device units to
    /// the inch.
    pub fn physical(page: &PageSize, units_per_inch: f64) -> Self {
        let x0 = page.xorigin + page.xoffset;
        let y0 = page.yorigin + page.yoffset;
        DeviceRange {
            left: units_per_inch * x0,
            right: units_per_inch * (x0 + page.xsize),
            bottom: units_per_inch * y0,
            top: units_per_inch * (y0 + page.ysize),
        }
    }

    /// NDC → device, after rotating NDC by `rotation_deg` about its
    /// center.
    pub fn ndc_to_device(&self, rotation_deg: f64) -> Affine {
        let rotate = Affine::translate(-0.5, -0.5) * Affine::rotate(rotation_deg) * Affine::translate(0.5, 0.5);
        let to_device = Affine::new(
            self.right - self.left,
            0.0,
            0.0,
            self.top - self.bottom,
            self.left,
            self.bottom,
        );
        rotate * to_device
    }
}

/// What a backend may touch while painting.
pub struct Cx<'a> {
    pub state: &'a DrawState,
    pub page: &'a mut PageBuffer,
    pub warnings: &'a mut Warnings,
    pub params: &'a PlotterParams,
    pub ndc_to_device: &'a Affine,
    pub fonts: &'a dyn FontMetrics,
}

impl<'a> Cx<'a> {
    /// The same context with a different drawing state, for painting
    /// derived objects such as dots.
    pub fn with_state<'b>(&'b mut self, state: &'b DrawState) -> Cx<'b> {
        Cx {
            state,
            page: &mut *self.page,
            warnings: &mut *self.warnings,
            params: self.params,
            ndc_to_device: self.ndc_to_device,
            fonts: self.fonts,
        }
    }

    #[inline]
    pub fn to_device(&self, p: DVec2) -> DVec2 {
        self.state.transform.to_device(p)
    }

    pub fn warn(&mut self, w: Warning) -> bool {
        self.warnings.emit(w)
    }
}

/// A polyline after quantization, with its original user-space vertices
/// alongside. Runs of identical device points have been collapsed.
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    pub user: Vec<DVec2>,
    pub device: Vec<DVec2>,
    /// Last point repeats the first and there are at least three
    /// distinct points.
    pub closed: bool,
    /// Polygonalized box, circle or ellipse: convex.
    pub primitive: bool,
}

/// A path that collapsed to one device point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dot {
    pub user: DVec2,
    pub device: DVec2,
}

/// A circular or elliptic arc to be emitted natively.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NativeArc {
    pub elliptic: bool,
    pub p0: DVec2,
    pub p1: DVec2,
    pub center: DVec2,
    /// Angles in a y-up device frame.
    pub angles: ArcAngles,
    pub device_center: DVec2,
    /// Device radii along x and y; equal for a circular arc.
    pub device_radii: DVec2,
}

impl NativeArc {
    pub fn device_radius(&self) -> f64 {
        self.device_radii.x
    }
}

#[enum_dispatch]
pub trait Backend {
    fn caps(&self) -> &'static Capabilities;

    /// Where NDC lands on the device.
    fn device_range(&self, params: &PlotterParams) -> DeviceRange;

    fn begin_page(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        Ok(())
    }

    fn end_page(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        Ok(())
    }

    fn erase_page(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        Ok(())
    }

    /// Header and trailer around all pages of a multi-page document.
    fn document_framing(&mut self, _doc: &Document, _params: &PlotterParams) -> (Vec<u8>, Vec<u8>) {
        (Vec::new(), Vec::new())
    }

    fn push_state(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        Ok(())
    }

    fn pop_state(&mut self, _cx: &mut Cx<'_>) -> Result<(), PlotError> {
        Ok(())
    }

    /// Paint one simple path.
    fn paint_path(&mut self, cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
        paint::paint_path(self, cx, path)
    }

    /// Paint a compound path as one object. Returns false if the backend
    /// cannot, and the caller falls back to painting member by member.
    fn paint_paths(&mut self, _cx: &mut Cx<'_>, _paths: &[Path]) -> Result<bool, PlotError> {
        Ok(false)
    }

    /// A single point at `p` (user space), drawn in the pen color.
    fn paint_point(&mut self, cx: &mut Cx<'_>, p: DVec2) -> Result<(), PlotError>;

    /// Stroke the segments appended since `prev_num_segments` right away.
    fn maybe_prepaint_segments(
        &mut self,
        _cx: &mut Cx<'_>,
        _path: &Path,
        _prev_num_segments: usize,
    ) -> Result<(), PlotError> {
        Ok(())
    }

    /// Whether an over-long unfilled path may be ended early.
    fn path_is_flushable(&self, _state: &DrawState) -> bool {
        true
    }

    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError>;

    /// A segment list with curves the backend draws natively.
    fn draw_segments(&mut self, cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
        paint::paint_flattened(self, cx, path)
    }

    fn draw_arc(&mut self, cx: &mut Cx<'_>, arc: &NativeArc) -> Result<(), PlotError> {
        let mut path = Path::new();
        path.add_moveto(arc.p0);
        if arc.elliptic {
            path.add_ellarc(arc.center, arc.p1);
        } else {
            path.add_arc(arc.center, arc.p1);
        }
        paint::paint_flattened(self, cx, &path)
    }

    fn draw_box(&mut self, cx: &mut Cx<'_>, p0: DVec2, p1: DVec2, clockwise: bool) -> Result<(), PlotError> {
        paint::paint_flattened(self, cx, &Path::new_box(p0, p1, clockwise))
    }

    fn draw_circle(&mut self, cx: &mut Cx<'_>, center: DVec2, radius: f64, clockwise: bool) -> Result<(), PlotError> {
        paint::paint_flattened(self, cx, &Path::new_circle(center, radius, clockwise))
    }

    fn draw_ellipse(
        &mut self,
        cx: &mut Cx<'_>,
        center: DVec2,
        radii: DVec2,
        angle_deg: f64,
        clockwise: bool,
    ) -> Result<(), PlotError> {
        paint::paint_flattened(self, cx, &Path::new_ellipse(center, radii.x, radii.y, angle_deg, clockwise))
    }

    /// A path that collapsed to one device point.
    fn draw_dot(&mut self, cx: &mut Cx<'_>, dot: Dot) -> Result<(), PlotError> {
        paint::dot_as_disk(self, cx, dot)
    }
}

/// The backend of a plotter.
#[enum_dispatch(Backend)]
pub enum Backends {
    Svg(SvgBackend),
    Ps(PsBackend),
    Fig(FigBackend),
    Hpgl(HpglBackend),
    Cgm(CgmBackend),
    Tek(TekBackend),
    Regis(RegisBackend),
    Meta(MetaBackend),
    Gif(GifBackend),
    X11(X11Backend),
}

/// Output formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlotterKind {
    Svg,
    Ps,
    Fig,
    Hpgl,
    Cgm,
    Tek,
    Regis,
    Meta,
    Gif,
    X11,
}

impl std::str::FromStr for PlotterKind {
    type Err = crate::errors::UnrecognizedMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "svg" => PlotterKind::Svg,
            "ps" => PlotterKind::Ps,
            "fig" => PlotterKind::Fig,
            "hpgl" => PlotterKind::Hpgl,
            "cgm" => PlotterKind::Cgm,
            "tek" => PlotterKind::Tek,
            "regis" => PlotterKind::Regis,
            "meta" => PlotterKind::Meta,
            "gif" => PlotterKind::Gif,
            "x" | "x11" => PlotterKind::X11,
            _ => {
                return Err(crate::errors::UnrecognizedMode {
                    kind: "plotter type",
                    value: s.to_string(),
                });
            }
        })
    }
}

impl Backends {
    /// A backend of `kind` configured from `params`. X11 output goes to a
    /// recording request sink; use [`X11Backend::new`] to supply another.
    pub fn new(kind: PlotterKind, params: &PlotterParams) -> Self {
        match kind {
            PlotterKind::Svg => SvgBackend::new().into(),
            PlotterKind::Ps => PsBackend::new().into(),
            PlotterKind::Fig => FigBackend::new().into(),
            PlotterKind::Hpgl => HpglBackend::new(params).into(),
            PlotterKind::Cgm => CgmBackend::new().into(),
            PlotterKind::Tek => TekBackend::new(params).into(),
            PlotterKind::Regis => RegisBackend::new().into(),
            PlotterKind::Meta => MetaBackend::new().into(),
            PlotterKind::Gif => GifBackend::new(params).into(),
            PlotterKind::X11 => X11Backend::new(Box::new(crate::collab::RecordingXSink::new())).into(),
        }
    }
}

/// Device point `p` for a flipped-y frame, returned in a y-up frame.
pub(crate) fn y_up(p: DVec2, flipped_y: bool) -> DVec2 {
    if flipped_y { dvec2(p.x, -p.y) } else { p }
}
