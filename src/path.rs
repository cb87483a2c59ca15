//! Path buffer: segment lists and closed primitives.

use glam::DVec2;

use crate::geometry;
use crate::types::BBox;

/// One segment of a segment-list path. Every segment carries its endpoint;
/// curved kinds add their center or control points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    MoveTo(DVec2),
    Line(DVec2),
    /// Circular arc about `center`, at most a half circle.
    Arc { p: DVec2, center: DVec2 },
    /// Quarter ellipse about `center`.
    EllArc { p: DVec2, center: DVec2 },
    Quad { p: DVec2, c: DVec2 },
    Cubic { p: DVec2, c1: DVec2, c2: DVec2 },
}

impl Segment {
    #[inline]
    pub fn endpoint(&self) -> DVec2 {
        match *self {
            Segment::MoveTo(p) | Segment::Line(p) => p,
            Segment::Arc { p, .. }
            | Segment::EllArc { p, .. }
            | Segment::Quad { p, .. }
            | Segment::Cubic { p, .. } => p,
        }
    }

    pub fn is_curve(&self) -> bool {
        !matches!(self, Segment::MoveTo(_) | Segment::Line(_))
    }

    pub fn is_arc(&self) -> bool {
        matches!(self, Segment::Arc { .. } | Segment::EllArc { .. })
    }

    /// Append the line endpoints approximating this segment, drawn from
    /// `from`.
    pub fn flatten_into(&self, from: DVec2, out: &mut Vec<DVec2>) {
        match *self {
            Segment::MoveTo(p) | Segment::Line(p) => out.push(p),
            Segment::Arc { p, center } => geometry::arc_as_lines(from, center, p, out),
            Segment::EllArc { p, center } => geometry::ellarc_as_lines(from, center, p, out),
            Segment::Quad { p, c } => geometry::quad_as_lines(from, c, p, out),
            Segment::Cubic { p, c1, c2 } => geometry::cubic_as_lines(from, c1, c2, p, out),
        }
    }
}

/// What a simple path holds.
#[derive(Clone, Debug, PartialEq)]
pub enum PathKind {
    Segments(Vec<Segment>),
    Box {
        p0: DVec2,
        p1: DVec2,
        x_move_is_first: bool,
    },
    Circle {
        center: DVec2,
        radius: f64,
    },
    Ellipse {
        center: DVec2,
        rx: f64,
        ry: f64,
        angle_deg: f64,
    },
}

/// Shape of a path as far as painting is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Empty,
    SinglePoint,
    Polyline,
    SingleArc,
    Mixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub shape: Shape,
    pub is_closed: bool,
    pub is_convex_primitive: bool,
}

/// A simple path.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub kind: PathKind,
    /// Came from a builtin closed shape, possibly flattened since.
    pub primitive: bool,
    pub clockwise: bool,
    /// User-space extent of the defining points.
    pub bbox: BBox,
}

impl Default for Path {
    fn default() -> Self {
        Self::new()
    }
}

impl Path {
    /// An empty segment list.
    pub fn new() -> Self {
        Path {
            kind: PathKind::Segments(Vec::new()),
            primitive: false,
            clockwise: false,
            bbox: BBox::new(),
        }
    }

    pub fn new_box(p0: DVec2, p1: DVec2, clockwise: bool) -> Self {
        let mut bbox = BBox::new();
        bbox.expand_point(p0);
        bbox.expand_point(p1);
        Path {
            kind: PathKind::Box {
                p0,
                p1,
                x_move_is_first: geometry::box_x_move_is_first(p0, p1, clockwise),
            },
            primitive: true,
            clockwise,
            bbox,
        }
    }

    pub fn new_circle(center: DVec2, radius: f64, clockwise: bool) -> Self {
        let mut bbox = BBox::new();
        bbox.expand_point(center - DVec2::splat(radius));
        bbox.expand_point(center + DVec2::splat(radius));
        Path {
            kind: PathKind::Circle { center, radius },
            primitive: true,
            clockwise,
            bbox,
        }
    }

    pub fn new_ellipse(center: DVec2, rx: f64, ry: f64, angle_deg: f64, clockwise: bool) -> Self {
        let r = rx.max(ry);
        let mut bbox = BBox::new();
        bbox.expand_point(center - DVec2::splat(r));
        bbox.expand_point(center + DVec2::splat(r));
        Path {
            kind: PathKind::Ellipse {
                center,
                rx,
                ry,
                angle_deg,
            },
            primitive: true,
            clockwise,
            bbox,
        }
    }

    /// A polygonal segment list through `points`, the first being the
    /// moveto.
    pub fn from_points(points: &[DVec2]) -> Self {
        let mut path = Path::new();
        if let Some((&first, rest)) = points.split_first() {
            path.add_moveto(first);
            for &p in rest {
                path.add_line(p);
            }
        }
        path
    }

    pub fn segments(&self) -> &[Segment] {
        match &self.kind {
            PathKind::Segments(s) => s,
            _ => &[],
        }
    }

    /// Number of segments; closed primitives count as zero.
    pub fn len(&self) -> usize {
        self.segments().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.kind, PathKind::Segments(s) if s.is_empty())
    }

    pub fn is_segment_list(&self) -> bool {
        matches!(self.kind, PathKind::Segments(_))
    }

    pub fn first_point(&self) -> Option<DVec2> {
        self.segments().first().map(Segment::endpoint)
    }

    pub fn last_point(&self) -> Option<DVec2> {
        self.segments().last().map(Segment::endpoint)
    }

    fn push(&mut self, seg: Segment) {
        if let PathKind::Segments(segs) = &mut self.kind {
            // a segment list always opens with a moveto
            if segs.is_empty() != matches!(seg, Segment::MoveTo(_)) {
                return;
            }
            self.bbox.expand_point(seg.endpoint());
            segs.push(seg);
        }
    }

    /// Start the path. Ignored unless the path is an empty segment list.
    pub fn add_moveto(&mut self, p: DVec2) {
        self.push(Segment::MoveTo(p));
    }

    pub fn add_line(&mut self, p: DVec2) {
        self.push(Segment::Line(p));
    }

    pub fn add_arc(&mut self, center: DVec2, p: DVec2) {
        self.push(Segment::Arc { p, center });
    }

    pub fn add_ellarc(&mut self, center: DVec2, p: DVec2) {
        self.push(Segment::EllArc { p, center });
    }

    pub fn add_quad(&mut self, c: DVec2, p: DVec2) {
        self.push(Segment::Quad { p, c });
    }

    pub fn add_cubic(&mut self, c1: DVec2, c2: DVec2, p: DVec2) {
        self.push(Segment::Cubic { p, c1, c2 });
    }

    /// Append the polygonal approximation of an arc from the current point.
    pub fn add_arc_as_lines(&mut self, center: DVec2, p: DVec2) {
        self.add_flattened(Segment::Arc { p, center });
    }

    pub fn add_ellarc_as_lines(&mut self, center: DVec2, p: DVec2) {
        self.add_flattened(Segment::EllArc { p, center });
    }

    pub fn add_quad_as_lines(&mut self, c: DVec2, p: DVec2) {
        self.add_flattened(Segment::Quad { p, c });
    }

    pub fn add_cubic_as_lines(&mut self, c1: DVec2, c2: DVec2, p: DVec2) {
        self.add_flattened(Segment::Cubic { p, c1, c2 });
    }

    fn add_flattened(&mut self, seg: Segment) {
        let Some(from) = self.last_point() else {
            return;
        };
        let mut pts = Vec::new();
        seg.flatten_into(from, &mut pts);
        for p in pts {
            self.add_line(p);
        }
    }

    /// Replace the curve of a two-segment `moveto, curve` path by its
    /// polygonal approximation, so that another segment can follow it on a
    /// backend that cannot mix curves with lines.
    pub fn replace_arc_with_polyline(&mut self) {
        let PathKind::Segments(segs) = &mut self.kind else {
            return;
        };
        if segs.len() != 2 || !segs[1].is_curve() {
            return;
        }
        let curve = segs[1];
        segs.truncate(1);
        self.add_flattened(curve);
    }

    pub fn classify(&self) -> Classification {
        let is_convex_primitive = self.primitive && !self.is_segment_list();
        let segs = self.segments();
        let shape = match &self.kind {
            PathKind::Segments(_) => match segs.len() {
                0 => Shape::Empty,
                1 => Shape::SinglePoint,
                2 if segs[1].is_arc() => Shape::SingleArc,
                _ if segs[1..].iter().all(|s| !s.is_curve()) => Shape::Polyline,
                _ => Shape::Mixed,
            },
            _ => Shape::Mixed,
        };
        Classification {
            shape,
            is_closed: self.is_closed(),
            is_convex_primitive,
        }
    }

    /// At least three segments, and the last point equals the first.
    pub fn is_closed(&self) -> bool {
        match &self.kind {
            PathKind::Segments(segs) => {
                segs.len() >= 3 && segs.first().map(Segment::endpoint) == segs.last().map(Segment::endpoint)
            }
            _ => true,
        }
    }

    /// A segment list of lines only. Closed primitives are polygonalized
    /// and keep their `primitive` flag.
    pub fn flatten(&self) -> Path {
        let points = match &self.kind {
            PathKind::Segments(segs) => {
                if segs.iter().all(|s| !s.is_curve()) {
                    return self.clone();
                }
                let mut pts = Vec::with_capacity(segs.len());
                let mut from = DVec2::ZERO;
                for seg in segs {
                    seg.flatten_into(from, &mut pts);
                    from = seg.endpoint();
                }
                pts
            }
            PathKind::Box { p0, p1, .. } => geometry::box_vertices(*p0, *p1, self.clockwise).to_vec(),
            PathKind::Circle { center, radius } => {
                geometry::ellipse_as_lines(*center, *radius, *radius, 0.0, self.clockwise)
            }
            PathKind::Ellipse {
                center,
                rx,
                ry,
                angle_deg,
            } => geometry::ellipse_as_lines(*center, *rx, *ry, *angle_deg, self.clockwise),
        };
        let mut flat = Path::from_points(&points);
        flat.primitive = self.primitive;
        flat.clockwise = self.clockwise;
        flat
    }

    /// Merge the simple paths of a compound path into one polygon for
    /// filling.
    ///
    /// Each later path is spliced into the first one at the vertex of the
    /// first path nearest to it, with a bridge out and back. The bridge
    /// edges are traversed in both directions, so they add nothing to the
    /// filled area under either fill rule.
    pub fn merge_for_fill(paths: &[Path]) -> Path {
        let mut flat = paths.iter().map(Path::flatten).filter(|p| p.len() >= 2);
        let Some(first) = flat.next() else {
            return Path::new();
        };
        let mut ring: Vec<DVec2> = first.segments().iter().map(Segment::endpoint).collect();
        if ring.first() != ring.last()
            && let Some(&start) = ring.first()
        {
            ring.push(start);
        }
        for child in flat {
            let mut pts: Vec<DVec2> = child.segments().iter().map(Segment::endpoint).collect();
            if pts.first() != pts.last()
                && let Some(&start) = pts.first()
            {
                pts.push(start);
            }
            let Some(&anchor_target) = pts.first() else {
                continue;
            };
            let anchor = ring
                .iter()
                .enumerate()
                .min_by(|a, b| {
                    a.1.distance_squared(anchor_target)
                        .total_cmp(&b.1.distance_squared(anchor_target))
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            let back = ring[anchor];
            let mut splice = pts;
            splice.push(back);
            ring.splice(anchor + 1..anchor + 1, splice);
        }
        let mut merged = Path::from_points(&ring);
        merged.primitive = false;
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::dvec2;

    fn square() -> Path {
        Path::from_points(&[
            dvec2(0.0, 0.0),
            dvec2(10.0, 0.0),
            dvec2(10.0, 10.0),
            dvec2(0.0, 10.0),
            dvec2(0.0, 0.0),
        ])
    }

    // ==================== Construction tests ====================

    #[test]
    fn first_segment_must_be_moveto() {
        let mut p = Path::new();
        p.add_line(dvec2(1.0, 1.0));
        assert!(p.is_empty());
        p.add_moveto(dvec2(0.0, 0.0));
        p.add_moveto(dvec2(5.0, 5.0));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn bbox_tracks_points() {
        let p = square();
        assert_eq!(p.bbox.max, dvec2(10.0, 10.0));
    }

    // ==================== Classification tests ====================

    #[test]
    fn classifies_shapes() {
        assert_eq!(Path::new().classify().shape, Shape::Empty);
        let mut single = Path::new();
        single.add_moveto(DVec2::ZERO);
        assert_eq!(single.classify().shape, Shape::SinglePoint);

        let c = square().classify();
        assert_eq!(c.shape, Shape::Polyline);
        assert!(c.is_closed);
        assert!(!c.is_convex_primitive);

        let mut arc = Path::new();
        arc.add_moveto(dvec2(1.0, 0.0));
        arc.add_arc(DVec2::ZERO, dvec2(0.0, 1.0));
        assert_eq!(arc.classify().shape, Shape::SingleArc);
        arc.add_line(dvec2(0.0, 0.0));
        assert_eq!(arc.classify().shape, Shape::Mixed);

        assert!(Path::new_circle(DVec2::ZERO, 1.0, false).classify().is_convex_primitive);
    }

    #[test]
    fn two_point_path_is_open() {
        let p = Path::from_points(&[DVec2::ZERO, DVec2::ZERO]);
        assert!(!p.is_closed());
    }

    // ==================== Flattening tests ====================

    #[test]
    fn replace_arc_with_polyline_keeps_endpoints() {
        let mut p = Path::new();
        p.add_moveto(dvec2(1.0, 0.0));
        p.add_arc(DVec2::ZERO, dvec2(0.0, 1.0));
        p.replace_arc_with_polyline();
        assert_eq!(p.len(), 33);
        assert_eq!(p.last_point(), Some(dvec2(0.0, 1.0)));
        assert_eq!(p.classify().shape, Shape::Polyline);
    }

    #[test]
    fn replace_arc_ignores_longer_paths() {
        let mut p = square();
        let before = p.clone();
        p.replace_arc_with_polyline();
        assert_eq!(p, before);
    }

    #[test]
    fn flattened_box_is_primitive_polyline() {
        let flat = Path::new_box(DVec2::ZERO, dvec2(4.0, 2.0), false).flatten();
        assert!(flat.primitive);
        assert_eq!(flat.len(), 5);
        assert!(flat.is_closed());
        assert!(!flat.classify().is_convex_primitive);
    }

    #[test]
    fn flattened_circle_is_closed() {
        let flat = Path::new_circle(dvec2(1.0, 1.0), 2.0, true).flatten();
        assert_eq!(flat.len(), 129);
        assert!(flat.is_closed());
    }

    // ==================== Merge tests ====================

    #[test]
    fn merge_splices_hole_into_outer_ring() {
        let outer = square();
        let hole = Path::from_points(&[
            dvec2(4.0, 4.0),
            dvec2(6.0, 4.0),
            dvec2(6.0, 6.0),
            dvec2(4.0, 6.0),
            dvec2(4.0, 4.0),
        ]);
        let merged = Path::merge_for_fill(&[outer, hole]);
        assert_eq!(merged.len(), 5 + 5 + 1);
        assert!(merged.is_closed());
    }
}
