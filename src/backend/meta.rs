//! Metafile output: a replayable record of everything painted.
//!
//! Objects are written in user coordinates, untouched by the device
//! pipeline, so every segment kind and primitive goes out natively. Each
//! record is an op letter followed by its arguments on one line. The
//! attributes a replayer needs are mirrored here and only written when
//! the drawing state has moved away from what was last recorded.

use std::fmt::Write;

use glam::DVec2;

use super::{Backend, Cx, DeviceRange, Polyline};
use crate::caps::{self, Capabilities};
use crate::errors::{PlotError, Warning};
use crate::log::debug;
use crate::outbuf::{PageBuffer, fmt_g};
use crate::params::PlotterParams;
use crate::path::{Path, PathKind, Segment};
use crate::state::modes::{CapStyle, FillRule, JoinStyle, LineType};
use crate::state::{DEFAULT_MITER_LIMIT, DashArray, DrawState};
use crate::types::Rgb48;

const MAGIC: &str = "#PLOT 2\n";

/// Op letters of the metafile format.
mod op {
    pub const BGCOLOR: u8 = b'~';
    pub const CAPMOD: u8 = b'K';
    pub const CLOSEPL: u8 = b'x';
    pub const ENDPATH: u8 = b'E';
    pub const ENDSUBPATH: u8 = b']';
    pub const ERASE: u8 = b'e';
    pub const FILLCOLOR: u8 = b'D';
    pub const FILLMOD: u8 = b'g';
    pub const FILLTYPE: u8 = b'L';
    pub const JOINMOD: u8 = b'J';
    pub const LINEMOD: u8 = b'f';
    pub const OPENPL: u8 = b'o';
    pub const ORIENTATION: u8 = b'b';
    pub const PENCOLOR: u8 = b'-';
    pub const PENTYPE: u8 = b'h';
    pub const FARC: u8 = b'1';
    pub const FBEZIER2: u8 = b'`';
    pub const FBEZIER3: u8 = b',';
    pub const FBOX: u8 = b'3';
    pub const FCIRCLE: u8 = b'5';
    pub const FCONT: u8 = b')';
    pub const FELLARC: u8 = b'}';
    pub const FELLIPSE: u8 = b'{';
    pub const FLINEDASH: u8 = b'w';
    pub const FLINEWIDTH: u8 = b'0';
    pub const FMITERLIMIT: u8 = b'i';
    pub const FMOVE: u8 = b'$';
    pub const FPOINT: u8 = b'^';
    pub const FSETMATRIX: u8 = b'j';
}

/// One record under construction.
struct Record {
    line: String,
}

impl Record {
    fn new(op: u8) -> Self {
        Record {
            line: char::from(op).to_string(),
        }
    }

    fn int(mut self, i: i32) -> Self {
        let _ = write!(self.line, " {i}");
        self
    }

    fn float(mut self, x: f64) -> Self {
        self.line.push(' ');
        self.line.push_str(&fmt_g(x, 6));
        self
    }

    fn point(self, p: DVec2) -> Self {
        self.float(p.x).float(p.y)
    }

    fn color(self, c: Rgb48) -> Self {
        self.int(c.red as i32).int(c.green as i32).int(c.blue as i32)
    }

    /// A string argument runs to the end of the line, so anything after
    /// an embedded newline is dropped.
    fn string(mut self, s: &str) -> Self {
        let s = s.split('\n').next().unwrap_or("");
        self.line.push_str(s);
        self
    }

    fn emit(mut self, page: &mut PageBuffer) {
        self.line.push('\n');
        page.write_bytes(self.line.as_bytes());
    }
}

fn cap_name(cap: CapStyle) -> &'static str {
    match cap {
        CapStyle::Butt => "butt",
        CapStyle::Round => "round",
        CapStyle::Projecting => "projecting",
        CapStyle::Triangular => "triangular",
    }
}

fn join_name(join: JoinStyle) -> &'static str {
    match join {
        JoinStyle::Miter => "miter",
        JoinStyle::Round => "round",
        JoinStyle::Bevel => "bevel",
        JoinStyle::Triangular => "triangular",
    }
}

/// What a replayer's drawing state holds, as far as has been written.
#[derive(Clone, Debug, PartialEq)]
struct Recorded {
    pos: DVec2,
    matrix: [f64; 6],
    fill_rule: FillRule,
    line_type: LineType,
    points_are_connected: bool,
    cap: CapStyle,
    join: JoinStyle,
    miter_limit: f64,
    line_width: f64,
    line_width_is_default: bool,
    dash_array: Option<DashArray>,
    pen_type: i32,
    fill_type: i32,
    orientation: i32,
    fg_color: Rgb48,
    fill_color_base: Rgb48,
    bg_color: Rgb48,
}

impl Default for Recorded {
    fn default() -> Self {
        Recorded {
            pos: DVec2::ZERO,
            matrix: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            fill_rule: FillRule::EvenOdd,
            line_type: LineType::Solid,
            points_are_connected: true,
            cap: CapStyle::Butt,
            join: JoinStyle::Miter,
            miter_limit: DEFAULT_MITER_LIMIT,
            line_width: 0.0,
            line_width_is_default: true,
            dash_array: None,
            pen_type: 1,
            fill_type: 0,
            orientation: 1,
            fg_color: Rgb48::BLACK,
            fill_color_base: Rgb48::BLACK,
            bg_color: Rgb48::WHITE,
        }
    }
}

#[derive(Debug, Default)]
pub struct MetaBackend {
    recorded: Recorded,
}

impl MetaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn sync_matrix(&mut self, state: &DrawState, page: &mut PageBuffer) {
        let m = state.transform.user_to_ndc.0;
        if self.recorded.matrix != m {
            m.iter()
                .fold(Record::new(op::FSETMATRIX), |r, &x| r.float(x))
                .emit(page);
            self.recorded.matrix = m;
        }
    }

    fn sync_pen(&mut self, state: &DrawState, page: &mut PageBuffer) {
        if self.recorded.fg_color != state.fg_color {
            Record::new(op::PENCOLOR).color(state.fg_color).emit(page);
            self.recorded.fg_color = state.fg_color;
        }
        if self.recorded.pen_type != state.pen_type {
            Record::new(op::PENTYPE).int(state.pen_type).emit(page);
            self.recorded.pen_type = state.pen_type;
        }
    }

    fn sync_line_style(&mut self, state: &DrawState, page: &mut PageBuffer) {
        let r = &mut self.recorded;
        if let Some(dashes) = &state.dash_array {
            if r.dash_array.as_ref() != Some(dashes) {
                let record = Record::new(op::FLINEDASH).int(dashes.dashes.len() as i32);
                dashes
                    .dashes
                    .iter()
                    .fold(record, |rec, &d| rec.float(d))
                    .float(dashes.offset)
                    .emit(page);
                r.dash_array = Some(dashes.clone());
            }
            return;
        }
        if !state.points_are_connected {
            if r.dash_array.is_some() || r.points_are_connected {
                Record::new(op::LINEMOD).string("disconnected").emit(page);
                r.points_are_connected = false;
                r.line_type = LineType::Solid;
            }
        } else if r.dash_array.is_some() || !r.points_are_connected || r.line_type != state.line_type {
            Record::new(op::LINEMOD).string(state.line_type.name()).emit(page);
            r.points_are_connected = true;
            r.line_type = state.line_type;
        }
        // a builtin mode replaces any dash array
        r.dash_array = None;
    }

    fn sync_line_width(&mut self, state: &DrawState, page: &mut PageBuffer) {
        let r = &mut self.recorded;
        let changed = if r.line_width_is_default || state.line_width_is_default {
            r.line_width_is_default != state.line_width_is_default
        } else {
            r.line_width != state.line_width
        };
        if changed {
            // a negative width selects the default
            let w = if state.line_width_is_default { -1.0 } else { state.line_width };
            Record::new(op::FLINEWIDTH).float(w).emit(page);
            r.line_width = state.line_width;
            r.line_width_is_default = state.line_width_is_default;
        }
    }

    fn sync_fill(&mut self, state: &DrawState, page: &mut PageBuffer) {
        let r = &mut self.recorded;
        if r.fill_color_base != state.fill_color_base {
            Record::new(op::FILLCOLOR).color(state.fill_color_base).emit(page);
            r.fill_color_base = state.fill_color_base;
        }
        if r.fill_type != state.fill_type {
            Record::new(op::FILLTYPE).int(state.fill_type).emit(page);
            r.fill_type = state.fill_type;
        }
        if r.fill_rule != state.fill_rule {
            Record::new(op::FILLMOD).string(state.fill_rule.name()).emit(page);
            r.fill_rule = state.fill_rule;
        }
    }

    /// Everything a path's appearance depends on, except the miter limit
    /// and orientation, which only some paths need.
    fn sync_path_attributes(&mut self, state: &DrawState, page: &mut PageBuffer) {
        self.sync_matrix(state, page);
        self.sync_pen(state, page);
        self.sync_line_style(state, page);
        self.sync_line_width(state, page);
        if self.recorded.join != state.join {
            Record::new(op::JOINMOD).string(join_name(state.join)).emit(page);
            self.recorded.join = state.join;
        }
        if self.recorded.cap != state.cap {
            Record::new(op::CAPMOD).string(cap_name(state.cap)).emit(page);
            self.recorded.cap = state.cap;
        }
        self.sync_fill(state, page);
    }

    fn sync_miter_limit(&mut self, state: &DrawState, page: &mut PageBuffer) {
        if self.recorded.miter_limit != state.miter_limit {
            Record::new(op::FMITERLIMIT).float(state.miter_limit).emit(page);
            self.recorded.miter_limit = state.miter_limit;
        }
    }

    fn sync_bg(&mut self, state: &DrawState, page: &mut PageBuffer) {
        if self.recorded.bg_color != state.bg_color {
            Record::new(op::BGCOLOR).color(state.bg_color).emit(page);
            self.recorded.bg_color = state.bg_color;
        }
    }

    /// The records drawing one simple path, preceded by an orientation
    /// change for primitives that need one.
    fn write_path(&mut self, path: &Path, page: &mut PageBuffer) {
        if !matches!(path.kind, PathKind::Segments(_)) {
            let orientation = if path.clockwise { -1 } else { 1 };
            if self.recorded.orientation != orientation {
                Record::new(op::ORIENTATION).int(orientation).emit(page);
                self.recorded.orientation = orientation;
            }
        }
        match &path.kind {
            PathKind::Segments(segs) => {
                if segs.len() < 2 {
                    return;
                }
                let mut prev = segs[0].endpoint();
                if self.recorded.pos != prev {
                    Record::new(op::FMOVE).point(prev).emit(page);
                }
                for seg in &segs[1..] {
                    let record = match *seg {
                        Segment::MoveTo(p) | Segment::Line(p) => Record::new(op::FCONT).point(p),
                        Segment::Arc { p, center } => Record::new(op::FARC).point(center).point(prev).point(p),
                        Segment::EllArc { p, center } => {
                            Record::new(op::FELLARC).point(center).point(prev).point(p)
                        }
                        Segment::Quad { p, c } => Record::new(op::FBEZIER2).point(prev).point(c).point(p),
                        Segment::Cubic { p, c1, c2 } => Record::new(op::FBEZIER3)
                            .point(prev)
                            .point(c1)
                            .point(c2)
                            .point(p),
                    };
                    record.emit(page);
                    prev = seg.endpoint();
                }
                self.recorded.pos = prev;
            }
            PathKind::Box { p0, p1, .. } => {
                Record::new(op::FBOX).point(*p0).point(*p1).emit(page);
                self.recorded.pos = (*p0 + *p1) * 0.5;
            }
            PathKind::Circle { center, radius } => {
                Record::new(op::FCIRCLE).point(*center).float(*radius).emit(page);
                self.recorded.pos = *center;
            }
            PathKind::Ellipse {
                center,
                rx,
                ry,
                angle_deg,
            } => {
                Record::new(op::FELLIPSE)
                    .point(*center)
                    .float(*rx)
                    .float(*ry)
                    .float(*angle_deg)
                    .emit(page);
                self.recorded.pos = *center;
            }
        }
    }
}

/// Whether a path can have mitered corners.
fn has_corners(path: &Path) -> bool {
    matches!(path.kind, PathKind::Segments(_) | PathKind::Box { .. })
}

impl Backend for MetaBackend {
    fn caps(&self) -> &'static Capabilities {
        &caps::META
    }

    /// Nothing is mapped: the records carry user coordinates and the
    /// user → NDC matrix.
    fn device_range(&self, _params: &PlotterParams) -> DeviceRange {
        DeviceRange::real(0.0, 1.0, 0.0, 1.0)
    }

    fn begin_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        if cx.page.number == 1 {
            if !cx.params.meta_portable {
                cx.warn(Warning::Other {
                    what: "binary metafile encoding not supported, writing portable encoding".into(),
                });
            }
            cx.page.write_bytes(MAGIC.as_bytes());
        }
        Record::new(op::OPENPL).emit(cx.page);
        self.recorded = Recorded::default();
        Ok(())
    }

    fn end_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        Record::new(op::CLOSEPL).emit(cx.page);
        Ok(())
    }

    fn erase_page(&mut self, cx: &mut Cx<'_>) -> Result<(), PlotError> {
        self.sync_bg(cx.state, cx.page);
        Record::new(op::ERASE).emit(cx.page);
        Ok(())
    }

    fn paint_path(&mut self, cx: &mut Cx<'_>, path: &Path) -> Result<(), PlotError> {
        self.sync_path_attributes(cx.state, cx.page);
        if cx.state.join == JoinStyle::Miter && has_corners(path) {
            self.sync_miter_limit(cx.state, cx.page);
        }
        self.write_path(path, cx.page);
        if matches!(path.kind, PathKind::Segments(_)) {
            Record::new(op::ENDPATH).emit(cx.page);
        }
        Ok(())
    }

    fn paint_paths(&mut self, cx: &mut Cx<'_>, paths: &[Path]) -> Result<bool, PlotError> {
        let Some(last) = paths.last() else {
            return Ok(true);
        };
        debug!(members = paths.len(), "recording compound path");
        self.sync_path_attributes(cx.state, cx.page);
        if cx.state.join == JoinStyle::Miter && paths.iter().any(has_corners) {
            self.sync_miter_limit(cx.state, cx.page);
        }
        for (i, path) in paths.iter().enumerate() {
            self.write_path(path, cx.page);
            if i + 1 < paths.len() {
                Record::new(op::ENDSUBPATH).emit(cx.page);
            }
        }
        // primitives end themselves
        if matches!(last.kind, PathKind::Segments(_)) {
            Record::new(op::ENDPATH).emit(cx.page);
        }
        Ok(true)
    }

    fn paint_point(&mut self, cx: &mut Cx<'_>, p: DVec2) -> Result<(), PlotError> {
        self.sync_matrix(cx.state, cx.page);
        self.sync_pen(cx.state, cx.page);
        Record::new(op::FPOINT).point(p).emit(cx.page);
        self.recorded.pos = p;
        Ok(())
    }

    /// Never reached: `paint_path` writes segments as they are.
    fn draw_polyline(&mut self, cx: &mut Cx<'_>, poly: &Polyline) -> Result<(), PlotError> {
        let path = Path::from_points(&poly.user);
        self.write_path(&path, cx.page);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::dvec2;

    use super::*;
    use crate::collab::BuiltinMetrics;
    use crate::errors::Warnings;
    use crate::matrix::Affine;
    use crate::state::Transform;

    struct Fixture {
        state: DrawState,
        page: PageBuffer,
        warnings: Warnings,
        params: PlotterParams,
        ndc: Affine,
        meta: MetaBackend,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                state: DrawState::default(),
                page: PageBuffer::new(1),
                warnings: Warnings::default(),
                params: PlotterParams::default(),
                ndc: Affine::IDENTITY,
                meta: MetaBackend::new(),
            }
        }

        fn run(&mut self, f: impl FnOnce(&mut MetaBackend, &mut Cx<'_>)) -> String {
            let start = self.page.body.len();
            let mut cx = Cx {
                state: &self.state,
                page: &mut self.page,
                warnings: &mut self.warnings,
                params: &self.params,
                ndc_to_device: &self.ndc,
                fonts: &BuiltinMetrics,
            };
            f(&mut self.meta, &mut cx);
            String::from_utf8_lossy(&self.page.body[start..]).into_owned()
        }
    }

    fn line(points: &[(f64, f64)]) -> Path {
        let pts: Vec<DVec2> = points.iter().map(|&(x, y)| dvec2(x, y)).collect();
        Path::from_points(&pts)
    }

    // ==================== Framing tests ====================

    #[test]
    fn first_page_carries_magic() {
        let mut f = Fixture::new();
        let out = f.run(|m, cx| {
            m.begin_page(cx).unwrap();
            m.end_page(cx).unwrap();
        });
        assert_eq!(out, "#PLOT 2\no\nx\n");
    }

    #[test]
    fn later_pages_do_not() {
        let mut f = Fixture::new();
        f.page = PageBuffer::new(2);
        let out = f.run(|m, cx| m.begin_page(cx).unwrap());
        assert_eq!(out, "o\n");
    }

    #[test]
    fn binary_request_warns_and_writes_text() {
        let mut f = Fixture::new();
        f.params.set("META_PORTABLE", "no").unwrap();
        let out = f.run(|m, cx| m.begin_page(cx).unwrap());
        assert!(out.starts_with("#PLOT 2\n"));
        assert_eq!(f.warnings.issued().len(), 1);
    }

    #[test]
    fn erase_records_background_change() {
        let mut f = Fixture::new();
        f.state.bg_color = Rgb48::new(0, 0, 65535);
        let out = f.run(|m, cx| {
            m.erase_page(cx).unwrap();
            m.erase_page(cx).unwrap();
        });
        assert_eq!(out, "~ 0 0 65535\ne\ne\n");
    }

    // ==================== Path tests ====================

    #[test]
    fn default_state_writes_only_geometry() {
        let mut f = Fixture::new();
        let path = line(&[(1.0, 2.0), (3.5, 2.0), (3.5, 0.0)]);
        let out = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        assert_eq!(out, "$ 1 2\n) 3.5 2\n) 3.5 0\nE\n");
    }

    #[test]
    fn move_is_skipped_when_already_there() {
        let mut f = Fixture::new();
        let path = line(&[(0.0, 0.0), (1.0, 0.0)]);
        let out = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        assert_eq!(out, ") 1 0\nE\n");
    }

    #[test]
    fn curves_carry_their_start_point() {
        let mut f = Fixture::new();
        let mut path = Path::new();
        path.add_moveto(dvec2(1.0, 0.0));
        path.add_arc(dvec2(0.0, 0.0), dvec2(0.0, 1.0));
        path.add_quad(dvec2(0.0, 2.0), dvec2(1.0, 2.0));
        path.add_cubic(dvec2(2.0, 2.0), dvec2(2.0, 3.0), dvec2(3.0, 3.0));
        let out = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "$ 1 0",
                "1 0 0 1 0 0 1",
                "` 0 1 0 2 1 2",
                ", 1 2 2 2 2 3 3 3",
                "E"
            ]
        );
    }

    #[test]
    fn attributes_are_written_once() {
        let mut f = Fixture::new();
        f.state.fg_color = Rgb48::new(65535, 0, 0);
        f.state.line_width = 2.5;
        f.state.line_width_is_default = false;
        f.state.cap = CapStyle::Round;
        let path = line(&[(0.0, 0.0), (1.0, 1.0)]);
        let first = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        assert_eq!(first, "- 65535 0 0\n0 2.5\nKround\n) 1 1\nE\n");
        let second = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        assert_eq!(second, "$ 0 0\n) 1 1\nE\n");
    }

    #[test]
    fn returning_to_default_width_writes_negative() {
        let mut f = Fixture::new();
        f.state.line_width_is_default = false;
        f.state.line_width = 3.0;
        let path = line(&[(0.0, 0.0), (1.0, 1.0)]);
        f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        f.state.line_width_is_default = true;
        let out = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        assert!(out.starts_with("0 -1\n"), "{out}");
    }

    #[test]
    fn dashes_then_builtin_mode() {
        let mut f = Fixture::new();
        f.state.dash_array = Some(DashArray {
            dashes: vec![4.0, 2.0],
            offset: 1.0,
        });
        let path = line(&[(0.0, 0.0), (1.0, 1.0)]);
        let out = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        assert!(out.starts_with("w 2 4 2 1\n"), "{out}");
        f.state.dash_array = None;
        let out = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        // back to solid needs an explicit line mode
        assert!(out.starts_with("fsolid\n"), "{out}");
    }

    #[test]
    fn disconnected_mode() {
        let mut f = Fixture::new();
        f.state.points_are_connected = false;
        let path = line(&[(0.0, 0.0), (1.0, 1.0)]);
        let out = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        assert!(out.starts_with("fdisconnected\n"), "{out}");
    }

    #[test]
    fn matrix_change_is_recorded() {
        let mut f = Fixture::new();
        f.state.transform = Transform::new(Affine::scale(0.5, 0.5), &Affine::IDENTITY, false);
        let out = f.run(|m, cx| m.paint_point(cx, dvec2(1.0, 1.0)).unwrap());
        assert_eq!(out, "j 0.5 0 0 0.5 0 0\n^ 1 1\n");
    }

    #[test]
    fn fill_attributes() {
        let mut f = Fixture::new();
        f.state.fill_type = 1;
        f.state.fill_color_base = Rgb48::new(0, 65535, 0);
        f.state.fill_rule = FillRule::NonzeroWinding;
        let path = line(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        let out = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        assert!(out.starts_with("D 0 65535 0\nL 1\ngnonzero-winding\n"), "{out}");
    }

    // ==================== Primitive tests ====================

    #[test]
    fn clockwise_box_syncs_orientation_and_miter_limit() {
        let mut f = Fixture::new();
        f.state.miter_limit = 4.0;
        let path = Path::new_box(dvec2(0.0, 0.0), dvec2(2.0, 4.0), true);
        let out = f.run(|m, cx| m.paint_path(cx, &path).unwrap());
        assert_eq!(out, "i 4\nb -1\n3 0 0 2 4\n");
        assert_eq!(f.meta.recorded.pos, dvec2(1.0, 2.0));
    }

    #[test]
    fn circle_and_ellipse_need_no_endpath() {
        let mut f = Fixture::new();
        f.state.miter_limit = 4.0;
        let circle = Path::new_circle(dvec2(1.0, 1.0), 0.5, false);
        let ellipse = Path::new_ellipse(dvec2(0.0, 0.0), 2.0, 1.0, 30.0, false);
        let out = f.run(|m, cx| {
            m.paint_path(cx, &circle).unwrap();
            m.paint_path(cx, &ellipse).unwrap();
        });
        // round shapes have no corners, so no miter limit
        assert_eq!(out, "5 1 1 0.5\n{ 0 0 2 1 30\n");
    }

    #[test]
    fn compound_members_are_separated() {
        let mut f = Fixture::new();
        let paths = [
            Path::new_box(dvec2(0.0, 0.0), dvec2(4.0, 4.0), false),
            line(&[(1.0, 1.0), (2.0, 1.0), (1.0, 2.0), (1.0, 1.0)]),
        ];
        let mut handled = false;
        let out = f.run(|m, cx| handled = m.paint_paths(cx, &paths).unwrap());
        assert!(handled);
        assert_eq!(out, "3 0 0 4 4\n]\n$ 1 1\n) 2 1\n) 1 2\n) 1 1\nE\n");
    }

    #[test]
    fn compound_ending_in_primitive_has_no_endpath() {
        let mut f = Fixture::new();
        let paths = [
            line(&[(1.0, 1.0), (2.0, 1.0)]),
            Path::new_circle(dvec2(0.0, 0.0), 1.0, true),
        ];
        let out = f.run(|m, cx| {
            m.paint_paths(cx, &paths).unwrap();
        });
        assert_eq!(out, "$ 1 1\n) 2 1\n]\nb -1\n5 0 0 1\n");
    }

    #[test]
    fn page_start_resets_recorded_state() {
        let mut f = Fixture::new();
        f.state.pen_type = 0;
        f.run(|m, cx| m.paint_point(cx, dvec2(0.0, 0.0)).unwrap());
        f.page = PageBuffer::new(2);
        let out = f.run(|m, cx| {
            m.begin_page(cx).unwrap();
            m.paint_point(cx, dvec2(0.0, 0.0)).unwrap();
        });
        assert_eq!(out, "o\nh 0\n^ 0 0\n");
    }

    #[test]
    fn newline_in_string_argument_is_cut() {
        let r = Record::new(op::LINEMOD).string("solid\nrest");
        assert_eq!(r.line, "fsolid");
    }
}
