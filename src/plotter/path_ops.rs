//! Path construction, painting and the save/restore stack.
//!
//! Segments accumulate in the simple path of the top drawing state.
//! `endsubpath` moves it into the compound path, and `endpath` paints the
//! compound path and clears it. Closed primitives (box, circle, ellipse)
//! always form a simple path of their own.

use glam::{DVec2, dvec2};

use super::Plotter;
use crate::backend::Backend;
use crate::caps::Scaling;
use crate::errors::PlotError;
use crate::geometry;
use crate::log::debug;
use crate::paint;
use crate::path::Path;
use crate::state::modes::LineType;

/// Relative tolerance for treating three points as collinear.
const COLLINEAR_FUZZ: f64 = 1e-12;

fn collinear(p0: DVec2, p1: DVec2, pc: DVec2) -> bool {
    let a = p1 - p0;
    let b = pc - p0;
    a.perp_dot(b).abs() <= COLLINEAR_FUZZ * a.length() * b.length()
}

impl Plotter {
    // ------------------------------------------------------------------
    // Segment plumbing
    // ------------------------------------------------------------------

    /// End the compound path if its open simple path is a closed
    /// primitive; nothing may be appended to one.
    fn end_primitive(&mut self) -> Result<(), PlotError> {
        let primitive = self
            .stack
            .top()
            .path
            .as_ref()
            .is_some_and(|p| p.primitive || !p.is_segment_list());
        if primitive {
            self.endpath()?;
        }
        Ok(())
    }

    /// Make sure a simple path is open and ends at `p0`, moving there
    /// (and ending the compound path) if the new segment is not
    /// contiguous. Returns the segment count before the new segment.
    fn begin_segment(&mut self, op: &'static str, p0: DVec2) -> Result<usize, PlotError> {
        self.check_open(op)?;
        self.end_primitive()?;
        if p0 != self.stack.top().pos {
            if self.stack.top().path.is_some() {
                self.endpath()?;
            }
            self.stack.top_mut().pos = p0;
        }
        let state = self.stack.top_mut();
        if let Some(path) = &state.path {
            return Ok(path.len());
        }
        let mut path = Path::new();
        path.add_moveto(p0);
        state.path = Some(path);
        state.start_point = p0;
        Ok(0)
    }

    fn current_path(&mut self) -> &mut Path {
        self.stack.top_mut().path.get_or_insert_with(Path::new)
    }

    /// On backends that cannot mix curves with lines, a path holding a
    /// single curve is polygonalized before anything joins it.
    fn maybe_replace_arc(&mut self, prev: usize) -> usize {
        if self.caps.have_mixed_paths {
            return prev;
        }
        let path = self.current_path();
        if path.len() != 2 {
            return prev;
        }
        path.replace_arc_with_polyline();
        if path.len() > 2 { 0 } else { prev }
    }

    /// Whether a curve may enter the path natively under `scaling`.
    fn curve_allowed(&self, scaling: Scaling) -> bool {
        let state = self.stack.top();
        let lone = state.path.as_ref().is_none_or(|p| p.len() == 1);
        (self.caps.have_mixed_paths || lone) && scaling.permits(&state.transform)
    }

    /// Move to `p1`, prepaint the new segments, and end an unfilled path
    /// that has grown too long.
    fn finish_segment(&mut self, p1: DVec2, prev: usize) -> Result<(), PlotError> {
        self.stack.top_mut().pos = p1;
        self.prepaint(prev)?;
        let limit = self.caps.max_unfilled_path_length.unwrap_or(self.params.max_line_length);
        let state = self.stack.top();
        let len = state.path.as_ref().map_or(0, Path::len);
        if len >= limit && state.fill_type == 0 && self.backend.path_is_flushable(state) {
            debug!(len, limit, "flushing long unfilled path");
            self.endpath()?;
        }
        self.stream_live()
    }

    fn prepaint(&mut self, prev: usize) -> Result<(), PlotError> {
        self.run(|b, cx| {
            let state = cx.state;
            match &state.path {
                Some(path) => b.maybe_prepaint_segments(cx, path, prev),
                None => Ok(()),
            }
        })
    }

    /// Start a closed primitive as a simple path of its own.
    fn place_primitive(&mut self, path: Path, pos: DVec2) -> Result<(), PlotError> {
        let segment_list = path.is_segment_list();
        let state = self.stack.top_mut();
        state.path = Some(path);
        state.pos = pos;
        if segment_list {
            self.prepaint(0)?;
        }
        self.stream_live()
    }

    // ------------------------------------------------------------------
    // Path construction
    // ------------------------------------------------------------------

    /// Move the graphics cursor, ending the path under construction.
    pub fn fmove(&mut self, x: f64, y: f64) -> Result<(), PlotError> {
        self.check_open("fmove")?;
        if self.stack.top().path.is_some() {
            self.endpath()?;
        }
        self.stack.top_mut().pos = dvec2(x, y);
        Ok(())
    }

    /// Continue the path with a line from the cursor to `(x, y)`.
    pub fn fcont(&mut self, x: f64, y: f64) -> Result<(), PlotError> {
        self.check_open("fcont")?;
        let p0 = self.stack.top().pos;
        let prev = self.begin_segment("fcont", p0)?;
        let prev = self.maybe_replace_arc(prev);
        let p1 = dvec2(x, y);
        self.current_path().add_line(p1);
        self.finish_segment(p1, prev)
    }

    pub fn fline(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) -> Result<(), PlotError> {
        let prev = self.begin_segment("fline", dvec2(x0, y0))?;
        let prev = self.maybe_replace_arc(prev);
        let p1 = dvec2(x1, y1);
        self.current_path().add_line(p1);
        self.finish_segment(p1, prev)
    }

    /// Counterclockwise circular arc about `(xc, yc)` from `(x0, y0)` to
    /// `(x1, y1)`. The center is moved onto the bisector of the chord if
    /// it is not equidistant from the endpoints.
    pub fn farc(&mut self, xc: f64, yc: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> Result<(), PlotError> {
        let (p0, p1, pc) = (dvec2(x0, y0), dvec2(x1, y1), dvec2(xc, yc));
        let mut prev = self.begin_segment("farc", p0)?;
        if !self.stack.top().points_are_connected || p0 == p1 {
            self.current_path().add_line(p1);
        } else {
            prev = self.maybe_replace_arc(prev);
            let pc = geometry::true_center(p0, p1, pc);
            let native = self.curve_allowed(self.caps.allowed_arc_scaling);
            let path = self.current_path();
            if native {
                path.add_arc(pc, p1);
            } else {
                path.add_arc_as_lines(pc, p1);
            }
        }
        self.finish_segment(p1, prev)
    }

    /// Quarter ellipse about `(xc, yc)` from `(x0, y0)` to `(x1, y1)`, the
    /// endpoint vectors being conjugate radii.
    pub fn fellarc(&mut self, xc: f64, yc: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> Result<(), PlotError> {
        let (p0, p1, pc) = (dvec2(x0, y0), dvec2(x1, y1), dvec2(xc, yc));
        let mut prev = self.begin_segment("fellarc", p0)?;
        if !self.stack.top().points_are_connected || p0 == p1 || collinear(p0, p1, pc) {
            self.current_path().add_line(p1);
        } else {
            prev = self.maybe_replace_arc(prev);
            let scaling = self.caps.allowed_ellarc_scaling;
            // axis-aligned maps only help when the endpoints sit on the axes
            let aligned = (y0 == yc && x1 == xc) || (x0 == xc && y1 == yc);
            let native = self.curve_allowed(scaling) && (scaling != Scaling::AxesPreserved || aligned);
            let path = self.current_path();
            if native {
                path.add_ellarc(pc, p1);
            } else {
                path.add_ellarc_as_lines(pc, p1);
            }
        }
        self.finish_segment(p1, prev)
    }

    /// Quadratic Bezier from `p0` through control point `p1` to `p2`.
    pub fn fbezier2(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<(), PlotError> {
        let (p0, p1, p2) = (dvec2(x0, y0), dvec2(x1, y1), dvec2(x2, y2));
        let mut prev = self.begin_segment("fbezier2", p0)?;
        if !self.stack.top().points_are_connected || p0 == p2 {
            self.current_path().add_line(p2);
        } else {
            prev = self.maybe_replace_arc(prev);
            let quad = self.curve_allowed(self.caps.allowed_quad_scaling);
            let cubic = self.curve_allowed(self.caps.allowed_cubic_scaling);
            let path = self.current_path();
            if quad {
                path.add_quad(p1, p2);
            } else if cubic {
                // degree elevation
                path.add_cubic((2.0 * p1 + p0) / 3.0, (2.0 * p1 + p2) / 3.0, p2);
            } else {
                path.add_quad_as_lines(p1, p2);
            }
        }
        self.finish_segment(p2, prev)
    }

    /// Cubic Bezier from `p0` to `p3` with control points `p1` and `p2`.
    #[allow(clippy::too_many_arguments)]
    pub fn fbezier3(
        &mut self,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        x3: f64,
        y3: f64,
    ) -> Result<(), PlotError> {
        let (p0, p1, p2, p3) = (dvec2(x0, y0), dvec2(x1, y1), dvec2(x2, y2), dvec2(x3, y3));
        let mut prev = self.begin_segment("fbezier3", p0)?;
        if !self.stack.top().points_are_connected || (p0 == p3 && p1 == p0 && p2 == p0) {
            self.current_path().add_line(p3);
        } else {
            prev = self.maybe_replace_arc(prev);
            let native = self.curve_allowed(self.caps.allowed_cubic_scaling);
            let path = self.current_path();
            if native {
                path.add_cubic(p1, p2, p3);
            } else {
                path.add_cubic_as_lines(p1, p2, p3);
            }
        }
        self.finish_segment(p3, prev)
    }

    /// Axis-aligned box with opposite corners `(x0, y0)` and `(x1, y1)`.
    /// The cursor ends at its center.
    pub fn fbox(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) -> Result<(), PlotError> {
        self.check_open("fbox")?;
        if self.stack.top().path.is_some() {
            self.endpath()?;
        }
        let (p0, p1) = (dvec2(x0, y0), dvec2(x1, y1));
        let state = self.stack.top();
        let clockwise = state.orientation < 0;
        // a dashed edge needs a definite starting point, which only the
        // segment list has
        let plain_edge = state.pen_type == 0 || (state.dash_array.is_none() && state.line_type == LineType::Solid);
        let native =
            state.points_are_connected && plain_edge && self.caps.allowed_box_scaling.permits(&state.transform);
        let path = if native {
            Path::new_box(p0, p1, clockwise)
        } else {
            Path::new_box(p0, p1, clockwise).flatten()
        };
        self.place_primitive(path, 0.5 * (p0 + p1))
    }

    pub fn fcircle(&mut self, xc: f64, yc: f64, r: f64) -> Result<(), PlotError> {
        self.check_open("fcircle")?;
        if self.stack.top().path.is_some() {
            self.endpath()?;
        }
        let center = dvec2(xc, yc);
        let state = self.stack.top();
        if !state.points_are_connected {
            self.stack.top_mut().pos = center;
            return Ok(());
        }
        let clockwise = state.orientation < 0;
        let path = if self.caps.allowed_circle_scaling.permits(&state.transform) {
            Path::new_circle(center, r, clockwise)
        } else if self.caps.allowed_ellipse_scaling.permits(&state.transform) {
            Path::new_ellipse(center, r, r, 0.0, clockwise)
        } else {
            Path::new_circle(center, r, clockwise).flatten()
        };
        self.place_primitive(path, center)
    }

    /// Ellipse with semi-axes `rx`, `ry`, the first rotated `angle`
    /// degrees counterclockwise from the x axis.
    pub fn fellipse(&mut self, xc: f64, yc: f64, rx: f64, ry: f64, angle: f64) -> Result<(), PlotError> {
        self.check_open("fellipse")?;
        if self.stack.top().path.is_some() {
            self.endpath()?;
        }
        let center = dvec2(xc, yc);
        let state = self.stack.top();
        if !state.points_are_connected {
            self.stack.top_mut().pos = center;
            return Ok(());
        }
        let clockwise = state.orientation < 0;
        let shape = Path::new_ellipse(center, rx, ry, angle, clockwise);
        let path = if self.caps.allowed_ellipse_scaling.permits(&state.transform) {
            shape
        } else {
            shape.flatten()
        };
        self.place_primitive(path, center)
    }

    /// A single point in the pen color.
    pub fn fpoint(&mut self, x: f64, y: f64) -> Result<(), PlotError> {
        self.check_open("fpoint")?;
        self.endpath()?;
        let p = dvec2(x, y);
        self.stack.top_mut().pos = p;
        if self.stack.top().pen_type != 0 {
            self.run(|b, cx| b.paint_point(cx, p))?;
        }
        self.stream_live()
    }

    /// Join the end of the open simple path to its first point. The path
    /// stays open for further segments.
    pub fn closepath(&mut self) -> Result<(), PlotError> {
        self.check_open("closepath")?;
        let state = self.stack.top();
        let Some(path) = &state.path else {
            return Ok(());
        };
        if !path.is_segment_list() || path.primitive || path.len() < 2 {
            return Ok(());
        }
        let (Some(first), Some(last)) = (path.first_point(), path.last_point()) else {
            return Ok(());
        };
        if first == last {
            return Ok(());
        }
        let prev = path.len();
        let prev = self.maybe_replace_arc(prev);
        self.current_path().add_line(first);
        self.finish_segment(first, prev)
    }

    /// Finish the simple path under construction; the compound path stays
    /// open.
    pub fn endsubpath(&mut self) -> Result<(), PlotError> {
        self.check_open("endsubpath")?;
        self.move_path_to_compound();
        Ok(())
    }

    fn move_path_to_compound(&mut self) {
        let state = self.stack.top_mut();
        if let Some(path) = state.path.take() {
            state.paths.push(path);
        }
    }

    /// Paint the compound path under construction and clear it.
    pub fn endpath(&mut self) -> Result<(), PlotError> {
        self.check_open("endpath")?;
        self.move_path_to_compound();
        let state = self.stack.top_mut();
        if state.paths.is_empty() {
            return Ok(());
        }
        let paths = std::mem::take(&mut state.paths);
        if !state.points_are_connected {
            if state.pen_type != 0 {
                self.paint_junctures(&paths)?;
            }
        } else if let [path] = paths.as_slice() {
            self.run(|b, cx| b.paint_path(cx, path))?;
        } else {
            self.run(|b, cx| paint::paint_compound(b, cx, &paths))?;
        }
        self.stream_live()
    }

    /// Disconnected line mode: every juncture point becomes a filled disk
    /// of line-width diameter in the pen color. The paths are not filled.
    fn paint_junctures(&mut self, paths: &[Path]) -> Result<(), PlotError> {
        let state = self.stack.top();
        let radius = 0.5 * state.line_width;
        let mut dot = state.child();
        dot.pen_type = 0;
        dot.fill_type = 1;
        dot.fill_color_base = state.fg_color;
        dot.fill_color = state.fg_color;
        dot.line_type = LineType::Solid;
        dot.points_are_connected = true;
        dot.dash_array = None;

        let mut resume = None;
        self.run(|b, cx| {
            let mut cx = cx.with_state(&dot);
            for path in paths.iter().filter(|p| p.is_segment_list() && p.len() >= 2) {
                let segs = path.segments();
                let closed = path.is_closed();
                let count = segs.len() - usize::from(closed);
                for seg in &segs[..count] {
                    b.paint_path(&mut cx, &Path::new_circle(seg.endpoint(), radius, false))?;
                }
                if closed {
                    resume = Some(segs[0].endpoint());
                }
            }
            Ok(())
        })?;
        if let Some(p) = resume {
            self.stack.top_mut().pos = p;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // State stack
    // ------------------------------------------------------------------

    /// Push a copy of the drawing state. The path under construction stays
    /// with the saved frame.
    pub fn savestate(&mut self) -> Result<(), PlotError> {
        self.check_open("savestate")?;
        self.stack.push();
        self.run(|b, cx| b.push_state(cx))
    }

    /// Paint any path of the top frame, then drop the frame.
    pub fn restorestate(&mut self) -> Result<(), PlotError> {
        self.check_open("restorestate")?;
        // a refused pop leaves the path under construction alone
        if self.stack.depth() <= 1 {
            return Err(PlotError::StateUnderflow);
        }
        self.endpath()?;
        self.run(|b, cx| b.pop_state(cx))?;
        self.stack.pop()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::dvec2;

    use super::collinear;
    use crate::backend::PlotterKind;
    use crate::errors::PlotError;
    use crate::path::{PathKind, Segment};
    use crate::plotter::tests::plotter;

    // ==================== Segment tests ====================

    #[test]
    fn contiguous_lines_share_a_path() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fline(0.0, 0.0, 0.5, 0.0).unwrap();
        pl.fcont(0.5, 0.5).unwrap();
        pl.fline(0.5, 0.5, 0.0, 0.5).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(pl.state().pos, dvec2(0.0, 0.5));
    }

    #[test]
    fn a_jump_ends_the_path() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fline(0.0, 0.0, 0.5, 0.0).unwrap();
        pl.fline(0.7, 0.7, 0.9, 0.9).unwrap();
        assert_eq!(pl.state().path.as_ref().unwrap().len(), 2);
        assert!(pl.page().body_str().contains("<line"));
    }

    #[test]
    fn native_arc_where_the_map_allows() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.farc(0.5, 0.5, 0.7, 0.5, 0.5, 0.7).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        assert!(matches!(path.segments()[1], Segment::Arc { .. }));
    }

    #[test]
    fn arc_is_flattened_without_native_support() {
        let (mut pl, _) = plotter(PlotterKind::Ps);
        pl.open().unwrap();
        pl.farc(0.5, 0.5, 0.7, 0.5, 0.5, 0.7).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        assert!(path.len() > 4);
        assert!(path.segments()[1..].iter().all(|s| matches!(s, Segment::Line(_))));
    }

    #[test]
    fn lone_arc_is_polygonalized_when_a_line_follows() {
        let (mut pl, _) = plotter(PlotterKind::Fig);
        pl.open().unwrap();
        pl.farc(0.5, 0.5, 0.7, 0.5, 0.5, 0.7).unwrap();
        assert_eq!(pl.state().path.as_ref().unwrap().len(), 2);
        pl.fcont(0.2, 0.7).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        assert!(path.len() > 3);
        assert!(!path.segments().iter().any(|s| s.is_curve()));
    }

    #[test]
    fn off_center_arc_is_corrected() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.farc(0.6, 0.1, 0.0, 0.0, 1.0, 0.0).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        let Segment::Arc { center, .. } = path.segments()[1] else {
            panic!("expected an arc");
        };
        assert!((center.x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn collinear_elliptic_arc_is_a_line() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fellarc(0.5, 0.5, 0.0, 0.0, 1.0, 1.0).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        assert!(matches!(path.segments()[1], Segment::Line(_)));
        assert!(collinear(dvec2(0.0, 0.0), dvec2(2.0, 2.0), dvec2(1.0, 1.0)));
        assert!(!collinear(dvec2(0.0, 0.0), dvec2(2.0, 0.0), dvec2(1.0, 1.0)));
    }

    #[test]
    fn quadratic_becomes_cubic_where_only_cubics_are_native() {
        let (mut pl, _) = plotter(PlotterKind::Hpgl);
        pl.open().unwrap();
        pl.fbezier2(0.0, 0.0, 0.5, 1.0, 1.0, 0.0).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        let Segment::Cubic { c1, c2, .. } = path.segments()[1] else {
            panic!("expected a cubic");
        };
        assert!((c1 - dvec2(1.0 / 3.0, 2.0 / 3.0)).length() < 1e-12);
        assert!((c2 - dvec2(2.0 / 3.0, 2.0 / 3.0)).length() < 1e-12);
    }

    #[test]
    fn disconnected_mode_draws_straight_segments() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.linemod("disconnected").unwrap();
        pl.fbezier3(0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        assert_eq!(path.segments()[1], Segment::Line(dvec2(1.0, 0.0)));
    }

    // ==================== Primitive tests ====================

    #[test]
    fn box_is_its_own_path_and_centers_the_cursor() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fline(0.0, 0.0, 0.1, 0.1).unwrap();
        pl.fbox(0.2, 0.2, 0.4, 0.6).unwrap();
        assert!(matches!(pl.state().path.as_ref().unwrap().kind, PathKind::Box { .. }));
        assert_eq!(pl.state().pos, dvec2(0.3, 0.4));
        assert!(pl.page().body_str().contains("<line"));
    }

    #[test]
    fn dashed_box_is_a_segment_list() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.linemod("dotted").unwrap();
        pl.fbox(0.2, 0.2, 0.4, 0.6).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        assert!(path.is_segment_list());
        assert!(path.primitive);
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn segments_after_a_primitive_start_a_new_path() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fcircle(0.5, 0.5, 0.1).unwrap();
        pl.fcont(0.9, 0.9).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        assert_eq!(path.first_point(), Some(dvec2(0.5, 0.5)));
        assert!(pl.page().body_str().contains("<circle"));
    }

    #[test]
    fn circle_without_native_support_is_flattened() {
        let (mut pl, _) = plotter(PlotterKind::Tek);
        pl.open().unwrap();
        pl.fcircle(0.5, 0.5, 0.1).unwrap();
        let path = pl.state().path.as_ref().unwrap();
        assert!(path.is_segment_list());
        assert!(path.primitive);
    }

    #[test]
    fn disconnected_circle_draws_nothing() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.linemod("disconnected").unwrap();
        pl.fcircle(0.5, 0.5, 0.1).unwrap();
        assert!(pl.state().path.is_none());
        assert_eq!(pl.state().pos, dvec2(0.5, 0.5));
    }

    // ==================== Endpath tests ====================

    #[test]
    fn closepath_returns_to_the_start() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fline(0.1, 0.1, 0.9, 0.1).unwrap();
        pl.fcont(0.9, 0.9).unwrap();
        pl.closepath().unwrap();
        let path = pl.state().path.as_ref().unwrap();
        assert!(path.is_closed());
        pl.closepath().unwrap();
        assert_eq!(pl.state().path.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn compound_path_is_painted_once() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.filltype(1).unwrap();
        pl.fline(0.1, 0.1, 0.9, 0.1).unwrap();
        pl.fcont(0.9, 0.9).unwrap();
        pl.fcont(0.1, 0.1).unwrap();
        pl.endsubpath().unwrap();
        pl.fmove(0.4, 0.3).unwrap();
        assert_eq!(pl.state().paths.len(), 1);
        pl.fline(0.4, 0.3, 0.6, 0.3).unwrap();
        pl.fcont(0.6, 0.5).unwrap();
        pl.fcont(0.4, 0.3).unwrap();
        pl.endpath().unwrap();
        assert!(pl.state().paths.is_empty());
        assert!(pl.state().path.is_none());
        assert!(!pl.page().body.is_empty());
    }

    #[test]
    fn disconnected_path_becomes_dots() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.flinewidth(0.02).unwrap();
        pl.linemod("disconnected").unwrap();
        pl.fline(0.1, 0.1, 0.5, 0.1).unwrap();
        pl.fcont(0.5, 0.5).unwrap();
        pl.endpath().unwrap();
        let body = pl.page().body_str().into_owned();
        assert_eq!(body.matches("<circle").count(), 3);
        assert!(!body.contains("<polyline"));
    }

    #[test]
    fn fpoint_paints_immediately() {
        let (mut pl, _) = plotter(PlotterKind::Hpgl);
        pl.open().unwrap();
        pl.fpoint(0.5, 0.5).unwrap();
        assert!(!pl.page().body.is_empty());
    }

    // ==================== Stack tests ====================

    #[test]
    fn restore_without_save_underflows_and_drawing_continues() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        assert!(matches!(pl.restorestate(), Err(PlotError::StateUnderflow)));
        pl.fline(0.0, 0.0, 1.0, 1.0).unwrap();
        pl.close().unwrap();
    }

    #[test]
    fn refused_restore_keeps_the_pending_path() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fline(0.1, 0.1, 0.9, 0.9).unwrap();
        assert!(matches!(pl.restorestate(), Err(PlotError::StateUnderflow)));
        let path = pl.state().path.as_ref().expect("path still under construction");
        assert_eq!(path.len(), 2);
        assert!(!pl.page().body_str().contains("<line"));
    }

    #[test]
    fn restore_paints_the_saved_frames_path() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.savestate().unwrap();
        pl.pencolorname("red").unwrap();
        pl.fline(0.0, 0.0, 1.0, 1.0).unwrap();
        pl.restorestate().unwrap();
        assert!(pl.page().body_str().contains("<line"));
        assert_eq!(pl.state().fg_color, crate::types::Rgb48::BLACK);
    }
}
