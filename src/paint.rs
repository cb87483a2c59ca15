//! The painting template shared by all backends.
//!
//! [`paint_path`] accumulates the device bounding box, then decides per
//! path whether the backend can draw it natively (according to its
//! capability table and the current transform) or whether it must be
//! flattened into a polyline first. Polylines are quantized for integer
//! devices and runs of coincident points collapsed; a polyline that
//! collapses to one point becomes a dot.

use glam::{DVec2, dvec2};

use crate::backend::{Backend, Cx, Dot, NativeArc, Polyline, y_up};
use crate::caps::{Capabilities, Scaling};
use crate::errors::PlotError;
use crate::geometry::{self, range};
use crate::log::debug;
use crate::matrix::Affine;
use crate::path::{Path, PathKind, Segment, Shape};
use crate::state::DrawState;
use crate::state::modes::CapStyle;
use crate::types::iround;

/// Paint one simple path through `backend`.
pub fn paint_path<B: Backend + ?Sized>(backend: &mut B, cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
    if !cx.state.is_visible() || cx.state.transform.is_singular() {
        return Ok(());
    }
    accumulate_bbox(cx, path);
    dispatch(backend, cx, path)
}

fn dispatch<B: Backend + ?Sized>(backend: &mut B, cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
    let caps = backend.caps();
    let t = cx.state.transform;
    match path.kind {
        PathKind::Box { p0, p1, .. } => {
            if caps.allowed_box_scaling.permits(&t) {
                backend.draw_box(cx, p0, p1, path.clockwise)
            } else {
                paint_flattened(backend, cx, path)
            }
        }
        PathKind::Circle { center, radius } => {
            if caps.allowed_circle_scaling.permits(&t) {
                backend.draw_circle(cx, center, radius, path.clockwise)
            } else if caps.allowed_ellipse_scaling.permits(&t) {
                backend.draw_ellipse(cx, center, DVec2::splat(radius), 0.0, path.clockwise)
            } else {
                paint_flattened(backend, cx, path)
            }
        }
        PathKind::Ellipse {
            center,
            rx,
            ry,
            angle_deg,
        } => {
            let aligned = angle_deg.rem_euclid(90.0) == 0.0;
            let permitted = match caps.allowed_ellipse_scaling {
                // an axes-preserving map keeps only an aligned ellipse aligned
                Scaling::AxesPreserved => t.axes_preserved && aligned,
                s => s.permits(&t),
            };
            if permitted {
                backend.draw_ellipse(cx, center, dvec2(rx, ry), angle_deg, path.clockwise)
            } else {
                paint_flattened(backend, cx, path)
            }
        }
        PathKind::Segments(ref segs) => match path.classify().shape {
            Shape::Empty | Shape::SinglePoint => Ok(()),
            Shape::SingleArc => {
                let from = segs[0].endpoint();
                match segs[1] {
                    Segment::Arc { p, center } if caps.allowed_arc_scaling.permits(&t) => {
                        let arc = native_arc(cx, backend.caps(), from, center, p, false);
                        backend.draw_arc(cx, &arc)
                    }
                    Segment::EllArc { p, center } if ellarc_permitted(caps, cx.state, from, center, p) => {
                        let arc = native_arc(cx, backend.caps(), from, center, p, true);
                        backend.draw_arc(cx, &arc)
                    }
                    _ => paint_flattened(backend, cx, path),
                }
            }
            Shape::Mixed => {
                if segments_permitted(caps, cx.state, segs) {
                    backend.draw_segments(cx, path)
                } else {
                    paint_flattened(backend, cx, path)
                }
            }
            Shape::Polyline => paint_polyline(backend, cx, path),
        },
    }
}

/// Flatten `path` into a polyline and paint that. The bounding box is not
/// touched.
pub fn paint_flattened<B: Backend + ?Sized>(backend: &mut B, cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
    let flat = path.flatten();
    paint_polyline(backend, cx, &flat)
}

fn paint_polyline<B: Backend + ?Sized>(backend: &mut B, cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
    let user: Vec<DVec2> = path.segments().iter().map(Segment::endpoint).collect();
    if user.len() < 2 {
        return Ok(());
    }
    let integer = backend.caps().coords.is_integer();
    let (kept, device) = quantize_and_collapse(&user, &cx.state.transform.m, integer);
    if device.len() == 1 {
        let all_same = user.iter().all(|&p| p == user[0]);
        if all_same && cx.state.cap == CapStyle::Butt {
            return Ok(());
        }
        return backend.draw_dot(
            cx,
            Dot {
                user: user[0],
                device: device[0],
            },
        );
    }
    let poly = Polyline {
        closed: path.is_closed() && device.len() > 3,
        primitive: path.primitive,
        user: kept,
        device,
    };
    backend.draw_polyline(cx, &poly)
}

/// Map `points` to device space, rounding to integers if asked, and drop
/// each point that lands on its predecessor. Returns the surviving user
/// points alongside their device images.
pub fn quantize_and_collapse(points: &[DVec2], m: &Affine, integer: bool) -> (Vec<DVec2>, Vec<DVec2>) {
    let mut user = Vec::with_capacity(points.len());
    let mut device: Vec<DVec2> = Vec::with_capacity(points.len());
    for &p in points {
        let mut d = m.apply(p);
        if integer {
            d = d.round();
        }
        if device.last() == Some(&d) {
            continue;
        }
        user.push(p);
        device.push(d);
    }
    (user, device)
}

/// A dot as a filled disk of the current line width in the pen color, or
/// a single point if the line has zero width or, on an integer device,
/// is at most one unit wide.
pub fn dot_as_disk<B: Backend + ?Sized>(backend: &mut B, cx: &mut Cx<'_>, dot: Dot) -> Result<(), PlotError> {
    let integer = backend.caps().coords.is_integer();
    if cx.state.device_line_width == 0.0 || (integer && cx.state.quantized_device_line_width <= 1) {
        return backend.paint_point(cx, dot.user);
    }
    let mut disk_state = cx.state.clone();
    disk_state.pen_type = 0;
    disk_state.fill_type = 1;
    disk_state.fill_color = disk_state.fg_color;
    // a disk that still collapses must not recurse
    disk_state.device_line_width = 0.0;
    disk_state.quantized_device_line_width = 0;
    let disk = Path::new_circle(dot.user, 0.5 * cx.state.line_width, false);
    let mut inner = cx.with_state(&disk_state);
    paint_path(backend, &mut inner, &disk)
}

/// Paint a compound path: fill the merged outline with the pen off, then
/// stroke each member with the fill off.
pub fn paint_compound<B: Backend + ?Sized>(backend: &mut B, cx: &mut Cx<'_>, paths: &[Path]) -> Result<(), PlotError> {
    if backend.paint_paths(cx, paths)? {
        for p in paths {
            accumulate_bbox(cx, p);
        }
        return Ok(());
    }
    debug!(members = paths.len(), "painting compound path member by member");
    if cx.state.fill_type != 0 && backend.caps().have_solid_fill.any() {
        let mut fill_state = cx.state.clone();
        fill_state.pen_type = 0;
        let merged = Path::merge_for_fill(paths);
        let mut inner = cx.with_state(&fill_state);
        paint_path(backend, &mut inner, &merged)?;
    }
    if cx.state.pen_type != 0 {
        let mut stroke_state = cx.state.clone();
        stroke_state.fill_type = 0;
        let mut inner = cx.with_state(&stroke_state);
        for p in paths {
            paint_path(backend, &mut inner, p)?;
        }
    }
    Ok(())
}

/// Whether the segments appended since `prev` may be stroked right away:
/// a thin solid connected line that is not part of a closed shape.
pub fn prepaint_eligible(state: &DrawState, path: &Path) -> bool {
    state.pen_type != 0
        && state.is_plain_line()
        && state.quantized_device_line_width == 0
        && !path.primitive
        && path.is_segment_list()
}

fn ellarc_permitted(caps: &Capabilities, state: &DrawState, p0: DVec2, pc: DVec2, p1: DVec2) -> bool {
    match caps.allowed_ellarc_scaling {
        Scaling::AxesPreserved => {
            let (u, v) = (p0 - pc, p1 - pc);
            let aligned = (u.x == 0.0 && v.y == 0.0) || (u.y == 0.0 && v.x == 0.0);
            state.transform.axes_preserved && aligned
        }
        s => s.permits(&state.transform),
    }
}

fn segments_permitted(caps: &Capabilities, state: &DrawState, segs: &[Segment]) -> bool {
    if !caps.have_mixed_paths {
        return false;
    }
    let t = &state.transform;
    let mut from = DVec2::ZERO;
    for seg in segs {
        let ok = match *seg {
            Segment::MoveTo(_) | Segment::Line(_) => true,
            Segment::Arc { .. } => caps.allowed_arc_scaling.permits(t),
            Segment::EllArc { p, center } => ellarc_permitted(caps, state, from, center, p),
            Segment::Quad { .. } => caps.allowed_quad_scaling.permits(t),
            Segment::Cubic { .. } => caps.allowed_cubic_scaling.permits(t),
        };
        if !ok {
            return false;
        }
        from = seg.endpoint();
    }
    true
}

/// Device-space description of the arc `p0 → p1` about `center`.
pub fn native_arc(
    cx: &Cx<'_>,
    caps: &Capabilities,
    p0: DVec2,
    center: DVec2,
    p1: DVec2,
    elliptic: bool,
) -> NativeArc {
    let flipped = caps.flipped_y;
    let integer = caps.coords.is_integer();
    let q = |p: DVec2| {
        let d = cx.to_device(p);
        if integer { d.round() } else { d }
    };
    let (d0, dc, d1) = (q(p0), q(center), q(p1));
    let (u, v) = (d0 - dc, d1 - dc);
    let (radii, angles) = if elliptic {
        // u and v are conjugate semi-axes; for the aligned case one is
        // horizontal and the other vertical
        let radii = dvec2(u.x.abs() + v.x.abs(), u.y.abs() + v.y.abs());
        let scale = |w: DVec2| {
            dvec2(
                if radii.x != 0.0 { w.x / radii.x } else { 0.0 },
                if radii.y != 0.0 { w.y / radii.y } else { 0.0 },
            )
        };
        let a = geometry::arc_angles(DVec2::ZERO, y_up(scale(u), flipped), y_up(scale(v), flipped));
        (radii, a)
    } else {
        let r = u.length();
        (DVec2::splat(r), geometry::arc_angles(y_up(dc, flipped), y_up(d0, flipped), y_up(d1, flipped)))
    };
    NativeArc {
        elliptic,
        p0,
        p1,
        center,
        angles,
        device_center: dc,
        device_radii: radii,
    }
}

/// Extend the page bounding box by everything `path` will ink.
pub fn accumulate_bbox(cx: &mut Cx<'_>, path: &Path) {
    let state = cx.state;
    let m = &state.transform.m;
    let (lw, dev_lw) = if state.pen_type == 0 {
        (0.0, 0.0)
    } else {
        (state.line_width, state.device_line_width)
    };
    let bbox = &mut cx.page.bbox;
    match path.kind {
        PathKind::Circle { center, radius } => {
            range::ellipse_bbox(bbox, center, radius, radius, 0.0, lw, m);
        }
        PathKind::Ellipse {
            center,
            rx,
            ry,
            angle_deg,
        } => range::ellipse_bbox(bbox, center, rx, ry, angle_deg, lw, m),
        PathKind::Box { p0, p1, .. } => {
            let v = geometry::box_vertices(p0, p1, path.clockwise);
            stroke_bbox(bbox, &v, true, lw, state, m);
        }
        PathKind::Segments(ref segs) => {
            if segs.len() < 2 {
                return;
            }
            let flat = path.flatten();
            let pts: Vec<DVec2> = flat.segments().iter().map(Segment::endpoint).collect();
            stroke_bbox(bbox, &pts, path.is_closed(), lw, state, m);
            let mut from = segs[0].endpoint();
            for seg in &segs[1..] {
                match *seg {
                    Segment::Quad { p, c } => range::quad_bbox(bbox, from, c, p, dev_lw, m),
                    Segment::Cubic { p, c1, c2 } => range::cubic_bbox(bbox, from, c1, c2, p, dev_lw, m),
                    _ => {}
                }
                from = seg.endpoint();
            }
        }
    }
}

fn stroke_bbox(
    bbox: &mut crate::types::BBox,
    pts: &[DVec2],
    closed: bool,
    lw: f64,
    state: &DrawState,
    m: &Affine,
) {
    // drop coincident neighbors so every vertex has a direction
    let mut v: Vec<DVec2> = Vec::with_capacity(pts.len());
    for &p in pts {
        if v.last() != Some(&p) {
            v.push(p);
        }
    }
    if closed && v.len() > 1 && v.first() == v.last() {
        v.pop();
    }
    match v.len() {
        0 => return,
        1 => {
            let half = 0.5 * lw;
            if state.cap != CapStyle::Butt || lw == 0.0 {
                range::ellipse_bbox(bbox, v[0], half, half, 0.0, 0.0, m);
            }
            return;
        }
        _ => {}
    }
    let n = v.len();
    if closed && n >= 3 {
        for i in 0..n {
            let prev = v[(i + n - 1) % n];
            let next = v[(i + 1) % n];
            range::line_join_bbox(bbox, prev, v[i], next, lw, state.join, state.miter_limit, m);
        }
    } else {
        range::line_end_bbox(bbox, v[0], v[1], lw, state.cap, m);
        range::line_end_bbox(bbox, v[n - 1], v[n - 2], lw, state.cap, m);
        for i in 1..n - 1 {
            range::line_join_bbox(bbox, v[i - 1], v[i], v[i + 1], lw, state.join, state.miter_limit, m);
        }
    }
}

/// Device line width for an integer device, where a zero width means the
/// thinnest line the device can draw.
pub fn integer_line_width(state: &DrawState) -> i32 {
    iround(state.device_line_width).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DeviceRange;
    use crate::caps;
    use crate::collab::BuiltinMetrics;
    use crate::errors::Warnings;
    use crate::outbuf::PageBuffer;
    use crate::params::PlotterParams;
    use crate::state::Transform;

    #[derive(Debug, PartialEq)]
    enum Call {
        Polyline(Vec<DVec2>, bool),
        Arc(f64, f64),
        Circle(DVec2, f64),
        Ellipse(DVec2, DVec2),
        Box,
        Segments(usize),
        Point(DVec2),
    }

    struct Mock {
        caps: &'static Capabilities,
        calls: Vec<Call>,
    }

    impl Backend for Mock {
        fn caps(&self) -> &'static Capabilities {
            self.caps
        }

        fn device_range(&self, _params: &PlotterParams) -> DeviceRange {
            DeviceRange::real(0.0, 1.0, 0.0, 1.0)
        }

        fn paint_point(&mut self, _cx: &mut Cx<'_>, p: DVec2) -> Result<(), PlotError> {
            self.calls.push(Call::Point(p));
            Ok(())
        }

        fn draw_polyline(&mut self, _cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
            self.calls.push(Call::Polyline(poly.device.clone(), poly.closed));
            Ok(())
        }

        fn draw_arc(&mut self, _cx: &mut Cx<'_>, arc: &NativeArc) -> Result<(), PlotError> {
            self.calls.push(Call::Arc(arc.angles.start, arc.angles.sweep));
            Ok(())
        }

        fn draw_circle(&mut self, _cx: &mut Cx<'_>, c: DVec2, r: f64, _cw: bool) -> Result<(), PlotError> {
            self.calls.push(Call::Circle(c, r));
            Ok(())
        }

        fn draw_ellipse(&mut self, _cx: &mut Cx<'_>, c: DVec2, radii: DVec2, _angle: f64, _cw: bool) -> Result<(), PlotError> {
            self.calls.push(Call::Ellipse(c, radii));
            Ok(())
        }

        fn draw_box(&mut self, _cx: &mut Cx<'_>, _p0: DVec2, _p1: DVec2, _cw: bool) -> Result<(), PlotError> {
            self.calls.push(Call::Box);
            Ok(())
        }

        fn draw_segments(&mut self, _cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
            self.calls.push(Call::Segments(path.len()));
            Ok(())
        }
    }

    struct Fixture {
        state: DrawState,
        page: PageBuffer,
        warnings: Warnings,
        params: PlotterParams,
        ndc: Affine,
    }

    impl Fixture {
        fn new(user_to_device: Affine) -> Self {
            let mut state = DrawState::default();
            state.transform = Transform::new(user_to_device, &Affine::IDENTITY, false);
            state.set_line_width(0.0);
            Fixture {
                state,
                page: PageBuffer::new(1),
                warnings: Warnings::default(),
                params: PlotterParams::default(),
                ndc: Affine::IDENTITY,
            }
        }

        fn paint(&mut self, caps: &'static Capabilities, path: &Path) -> Vec<Call> {
            let mut mock = Mock { caps, calls: Vec::new() };
            let mut cx = Cx {
                state: &self.state,
                page: &mut self.page,
                warnings: &mut self.warnings,
                params: &self.params,
                ndc_to_device: &self.ndc,
                fonts: &BuiltinMetrics,
            };
            paint_path(&mut mock, &mut cx, path).unwrap();
            mock.calls
        }

        fn paint_compound(&mut self, caps: &'static Capabilities, paths: &[Path]) -> Vec<Call> {
            let mut mock = Mock { caps, calls: Vec::new() };
            let mut cx = Cx {
                state: &self.state,
                page: &mut self.page,
                warnings: &mut self.warnings,
                params: &self.params,
                ndc_to_device: &self.ndc,
                fonts: &BuiltinMetrics,
            };
            paint_compound(&mut mock, &mut cx, paths).unwrap();
            mock.calls
        }
    }

    fn square() -> Path {
        Path::from_points(&[
            dvec2(0.0, 0.0),
            dvec2(10.0, 0.0),
            dvec2(10.0, 10.0),
            dvec2(0.0, 10.0),
            dvec2(0.0, 0.0),
        ])
    }

    // ==================== Dispatch tests ====================

    #[test]
    fn closed_square_is_one_closed_polyline() {
        let mut f = Fixture::new(Affine::IDENTITY);
        let calls = f.paint(&caps::META, &square());
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], Call::Polyline(pts, true) if pts.len() == 5));
    }

    #[test]
    fn invisible_or_singular_paints_nothing() {
        let mut f = Fixture::new(Affine::IDENTITY);
        f.state.pen_type = 0;
        assert!(f.paint(&caps::META, &square()).is_empty());
        assert!(f.page.bbox.is_empty());

        let mut g = Fixture::new(Affine::scale(0.0, 1.0));
        assert!(g.paint(&caps::META, &square()).is_empty());
    }

    #[test]
    fn circle_is_native_only_when_scaling_allows() {
        let circle = Path::new_circle(dvec2(0.0, 0.0), 1.0, false);
        let mut f = Fixture::new(Affine::scale(2000.0, 2000.0).compose(&Affine::rotate(30.0)));
        let calls = f.paint(&caps::X11, &circle);
        assert!(matches!(&calls[..], [Call::Polyline(pts, true)] if pts.len() > 100));

        let mut g = Fixture::new(Affine::scale(2000.0, 2000.0));
        assert_eq!(g.paint(&caps::FIG, &circle), vec![Call::Circle(dvec2(0.0, 0.0), 1.0)]);
    }

    #[test]
    fn unscalable_circle_becomes_an_ellipse() {
        let circle = Path::new_circle(dvec2(0.0, 0.0), 1.0, false);
        let mut f = Fixture::new(Affine::scale(2000.0, 1000.0));
        assert_eq!(f.paint(&caps::FIG, &circle), vec![Call::Ellipse(dvec2(0.0, 0.0), dvec2(1.0, 1.0))]);
        let mut g = Fixture::new(Affine::scale(200.0, 100.0));
        assert_eq!(g.paint(&caps::X11, &circle), vec![Call::Ellipse(dvec2(0.0, 0.0), dvec2(1.0, 1.0))]);
    }

    #[test]
    fn box_falls_back_under_rotation() {
        let b = Path::new_box(dvec2(0.0, 0.0), dvec2(2.0, 1.0), false);
        let mut f = Fixture::new(Affine::IDENTITY);
        assert_eq!(f.paint(&caps::PS, &b), vec![Call::Box]);
        let mut g = Fixture::new(Affine::rotate(30.0));
        assert!(matches!(&g.paint(&caps::CGM, &b)[..], [Call::Polyline(_, true)]));
    }

    #[test]
    fn single_arc_goes_native() {
        let mut p = Path::new();
        p.add_moveto(dvec2(1.0, 0.0));
        p.add_arc(dvec2(0.0, 0.0), dvec2(0.0, 1.0));
        let mut f = Fixture::new(Affine::scale(100.0, 100.0));
        let calls = f.paint(&caps::META, &p);
        match &calls[..] {
            [Call::Arc(start, sweep)] => {
                assert!(start.abs() < 1e-9);
                assert!((sweep - 90.0).abs() < 1e-9);
            }
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[test]
    fn mixed_path_needs_mixed_support() {
        let mut p = Path::new();
        p.add_moveto(dvec2(0.0, 0.0));
        p.add_line(dvec2(1.0, 0.0));
        p.add_cubic(dvec2(2.0, 0.0), dvec2(2.0, 1.0), dvec2(1.0, 1.0));
        let mut f = Fixture::new(Affine::IDENTITY);
        assert_eq!(f.paint(&caps::SVG, &p), vec![Call::Segments(3)]);
        let mut g = Fixture::new(Affine::IDENTITY);
        assert!(matches!(&g.paint(&caps::PS, &p)[..], [Call::Polyline(_, false)]));
    }

    #[test]
    fn compound_fill_needs_solid_fill_support() {
        let inner = Path::from_points(&[
            dvec2(3.0, 3.0),
            dvec2(6.0, 3.0),
            dvec2(6.0, 6.0),
            dvec2(3.0, 6.0),
            dvec2(3.0, 3.0),
        ]);
        let paths = [square(), inner];

        let mut f = Fixture::new(Affine::IDENTITY);
        f.state.fill_type = 1;
        let calls = f.paint_compound(&caps::PS, &paths);
        assert_eq!(calls.len(), 3, "{calls:?}");

        let mut g = Fixture::new(Affine::IDENTITY);
        g.state.fill_type = 1;
        let calls = g.paint_compound(&caps::HPGL1, &paths);
        assert_eq!(calls.len(), 2, "{calls:?}");
        assert!(calls.iter().all(|c| matches!(c, Call::Polyline(pts, true) if pts.len() == 5)));
    }

    // ==================== Quantization tests ====================

    #[test]
    fn integer_devices_collapse_repeats() {
        let pts = [dvec2(0.0, 0.0), dvec2(0.2, 0.1), dvec2(1.0, 0.0), dvec2(1.4, 0.3)];
        let (user, device) = quantize_and_collapse(&pts, &Affine::IDENTITY, true);
        assert_eq!(device, vec![dvec2(0.0, 0.0), dvec2(1.0, 0.0)]);
        assert_eq!(user, vec![dvec2(0.0, 0.0), dvec2(1.0, 0.0)]);
        let (_, real) = quantize_and_collapse(&pts, &Affine::IDENTITY, false);
        assert_eq!(real.len(), 4);
    }

    #[test]
    fn quantizing_twice_changes_nothing() {
        let pts = [
            dvec2(0.0, 0.0),
            dvec2(0.21, 0.1),
            dvec2(0.26, 0.1),
            dvec2(1.7, 2.2),
            dvec2(1.72, 2.24),
            dvec2(-3.4, 0.5),
        ];
        let m = Affine::scale(3.0, -2.0).compose(&Affine::rotate(20.0));
        for integer in [true, false] {
            let (_, device) = quantize_and_collapse(&pts, &m, integer);
            let (user, again) = quantize_and_collapse(&device, &Affine::IDENTITY, integer);
            assert_eq!(again, device, "integer = {integer}");
            assert_eq!(user, device, "integer = {integer}");
        }
    }

    #[test]
    fn closed_path_with_two_distinct_points_is_painted_open() {
        let p = Path::from_points(&[
            dvec2(0.0, 0.0),
            dvec2(10.0, 0.0),
            dvec2(10.2, 0.3),
            dvec2(0.1, 0.2),
            dvec2(0.0, 0.0),
        ]);
        assert!(p.is_closed());
        let mut f = Fixture::new(Affine::IDENTITY);
        let calls = f.paint(&caps::TEK, &p);
        assert_eq!(
            calls,
            vec![Call::Polyline(vec![dvec2(0.0, 0.0), dvec2(10.0, 0.0), dvec2(0.0, 0.0)], false)]
        );
    }

    #[test]
    fn collapsed_path_becomes_a_dot() {
        let p = Path::from_points(&[dvec2(0.0, 0.0), dvec2(0.1, 0.1)]);
        let mut f = Fixture::new(Affine::IDENTITY);
        assert_eq!(f.paint(&caps::TEK, &p), vec![Call::Point(dvec2(0.0, 0.0))]);
    }

    #[test]
    fn zero_length_butt_segment_is_invisible() {
        let p = Path::from_points(&[dvec2(3.0, 3.0), dvec2(3.0, 3.0)]);
        let mut f = Fixture::new(Affine::IDENTITY);
        assert!(f.paint(&caps::META, &p).is_empty());
        let mut g = Fixture::new(Affine::IDENTITY);
        g.state.cap = CapStyle::Round;
        assert_eq!(g.paint(&caps::META, &p), vec![Call::Point(dvec2(3.0, 3.0))]);
    }

    #[test]
    fn wide_dot_is_a_filled_disk() {
        let p = Path::from_points(&[dvec2(3.0, 3.0), dvec2(3.0, 3.0)]);
        let mut f = Fixture::new(Affine::IDENTITY);
        f.state.cap = CapStyle::Round;
        f.state.set_line_width(4.0);
        assert_eq!(f.paint(&caps::PS, &p), vec![Call::Circle(dvec2(3.0, 3.0), 2.0)]);
    }

    #[test]
    fn thin_dot_on_integer_device_is_a_point() {
        let p = Path::from_points(&[dvec2(3.0, 3.0), dvec2(3.0, 3.0)]);
        let mut f = Fixture::new(Affine::IDENTITY);
        f.state.cap = CapStyle::Round;
        f.state.set_line_width(0.8);
        assert_eq!(f.paint(&caps::TEK, &p), vec![Call::Point(dvec2(3.0, 3.0))]);
    }

    // ==================== Bounding box tests ====================

    #[test]
    fn mitered_square_bbox() {
        let mut f = Fixture::new(Affine::IDENTITY);
        f.state.set_line_width(2.0);
        f.paint(&caps::META, &square());
        let b = f.page.bbox;
        assert!((b.min - dvec2(-1.0, -1.0)).length() < 1e-9);
        assert!((b.max - dvec2(11.0, 11.0)).length() < 1e-9);
    }

    #[test]
    fn open_butt_line_bbox_is_its_rectangle() {
        let p = Path::from_points(&[dvec2(0.0, 0.0), dvec2(10.0, 0.0)]);
        let mut f = Fixture::new(Affine::IDENTITY);
        f.state.set_line_width(2.0);
        f.paint(&caps::META, &p);
        let b = f.page.bbox;
        assert!((b.min - dvec2(0.0, -1.0)).length() < 1e-9);
        assert!((b.max - dvec2(10.0, 1.0)).length() < 1e-9);
    }

    #[test]
    fn circle_bbox_includes_half_width() {
        let mut f = Fixture::new(Affine::IDENTITY);
        f.state.set_line_width(1.0);
        f.paint(&caps::PS, &Path::new_circle(dvec2(5.0, 5.0), 2.0, false));
        assert!((f.page.bbox.min - dvec2(2.5, 2.5)).length() < 1e-9);
        assert!((f.page.bbox.max - dvec2(7.5, 7.5)).length() < 1e-9);
    }

    #[test]
    fn prepaint_rules() {
        let mut s = DrawState::default();
        s.set_line_width(0.0);
        let p = Path::from_points(&[dvec2(0.0, 0.0), dvec2(1.0, 0.0)]);
        assert!(prepaint_eligible(&s, &p));
        s.points_are_connected = false;
        assert!(!prepaint_eligible(&s, &p));
        s.points_are_connected = true;
        s.set_line_width(3.0);
        assert!(!prepaint_eligible(&s, &p));
        s.set_line_width(0.0);
        let polygonalized = Path::new_circle(dvec2(0.0, 0.0), 1.0, false).flatten();
        assert!(!prepaint_eligible(&s, &polygonalized));
    }
}
