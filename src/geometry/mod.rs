//! Geometry kernel: polygonal approximation of curves and closed shapes,
//! and native arc angle computation.
//!
//! Every `*_as_lines` function appends the endpoints of the generated line
//! segments to `out`; the starting point is never repeated.

pub mod clip;
pub mod contour;
pub mod range;

use glam::{DVec2, dvec2};

/// Subdivision depth for arcs; every arc becomes `2^5 = 32` chords.
pub const NUM_ARC_SUBDIVISIONS: usize = 5;

/// Quadratic Beziers are bisected at most this many times.
const MAX_BEZIER2_SUBDIVISIONS: u32 = 6;

/// Cubic Beziers are bisected at most this many times.
const MAX_BEZIER3_SUBDIVISIONS: u32 = 7;

/// A Bezier is flat once its second differences are shorter than this
/// fraction of its chord.
const REL_QUAD_FLATNESS: f64 = 5e-4;
const REL_CUBIC_FLATNESS: f64 = 5e-4;

/// Relative cross product below which an elliptic arc is drawn as a chord.
const COLLINEAR_FUZZ: f64 = 1e-10;

/// Control point distance for a cubic approximating a quarter circle,
/// `(4/3)(√2 − 1)`.
pub const KAPPA_FOR_QUARTER_CIRCLE: f64 = 0.552284749825;

type ChordTable = [f64; NUM_ARC_SUBDIVISIONS];

/// Relative chordal deviation factors for the successive bisections of an
/// arc whose (sagitta / radius) is `sagitta`.
///
/// Bisecting an arc with relative sagitta `s` yields halves with relative
/// sagitta `1 − √(1 − s/2)`, and the half chord is always `√(s(2 − s))`.
fn prepare_chord_table(mut sagitta: f64) -> ChordTable {
    let mut table = [0.0; NUM_ARC_SUBDIVISIONS];
    let mut half_chord = (sagitta * (2.0 - sagitta)).sqrt();
    for entry in &mut table {
        *entry = 0.5 * sagitta / half_chord;
        sagitta = 1.0 - (1.0 - 0.5 * sagitta).sqrt();
        half_chord = 0.5 * half_chord / (1.0 - sagitta);
    }
    table
}

#[inline]
fn mid(a: DVec2, b: DVec2) -> DVec2 {
    0.5 * (a + b)
}

/// Chord table of a quarter circle, shared by all quarter ellipses.
fn quarter_arc_table() -> ChordTable {
    prepare_chord_table(1.0 - 0.5f64.sqrt())
}

/// Recursive chordal subdivision of the arc `p0 → p1`, unrolled into an
/// explicit stack.
///
/// The bisection point of a chord `v` with midpoint `pm` at a given level is
/// `pm + table[level]·(M·v)`, where `M` maps the chord onto the outward
/// normal (a 90° rotation for circles, a conjugate-diameter map for
/// ellipses).
fn fakearc(p0: DVec2, p1: DVec2, table: &ChordTable, m: [f64; 4], out: &mut Vec<DVec2>) {
    let mut stack: Vec<(DVec2, DVec2, usize)> = Vec::with_capacity(NUM_ARC_SUBDIVISIONS + 1);
    stack.push((p0, p1, 0));
    while let Some((p, q, level)) = stack.pop() {
        if level >= NUM_ARC_SUBDIVISIONS {
            out.push(q);
            continue;
        }
        let v = q - p;
        let pm = p + 0.5 * v;
        let pb = pm + table[level] * dvec2(m[0] * v.x + m[1] * v.y, m[2] * v.x + m[3] * v.y);
        // second half is handled after the first
        stack.push((pb, q, level + 1));
        stack.push((p, pb, level + 1));
    }
}

/// Polygonal approximation of the circular arc from `p0` (the current
/// point) to `p1` about `pc`.
///
/// The arc goes counterclockwise if `p0`, `p1`, `pc` are collinear;
/// otherwise it is the shorter of the two arcs.
pub fn arc_as_lines(p0: DVec2, pc: DVec2, p1: DVec2, out: &mut Vec<DVec2>) {
    if p0 == p1 {
        out.push(p0);
        return;
    }
    let v0 = p0 - pc;
    let v1 = p1 - pc;
    let orientation = if v0.perp_dot(v1) >= 0.0 { 1.0 } else { -1.0 };
    let radius = v0.length();
    let pm = 0.5 * (p0 + p1);
    let v = (p1 - p0).normalize_or_zero() * radius;
    let pb = pc + orientation * dvec2(v.y, -v.x);
    let sagitta = pb.distance(pm) / radius;
    let table = prepare_chord_table(sagitta);
    fakearc(p0, p1, &table, [0.0, orientation, -orientation, 0.0], out);
}

/// Polygonal approximation of the quarter ellipse from `p0` to `p1` about
/// `pc`, tangent at `p0` to `p1 − pc` and at `p1` to `p0 − pc`.
pub fn ellarc_as_lines(p0: DVec2, pc: DVec2, p1: DVec2, out: &mut Vec<DVec2>) {
    let v0 = p0 - pc;
    let v1 = p1 - pc;
    let cross = v0.perp_dot(v1);
    if cross.abs() <= COLLINEAR_FUZZ * v0.length() * v1.length() {
        out.push(p1);
        return;
    }
    // maps v0 to -v1 and v1 to v0
    let m = [
        -(v0.x * v0.y + v1.x * v1.y) / cross,
        (v0.x * v0.x + v1.x * v1.x) / cross,
        -(v0.y * v0.y + v1.y * v1.y) / cross,
        (v0.x * v0.y + v1.x * v1.y) / cross,
    ];
    fakearc(p0, p1, &quarter_arc_table(), m, out);
}

/// De Casteljau bisection of a quadratic Bezier until flat.
pub fn quad_as_lines(p0: DVec2, pc: DVec2, p: DVec2, out: &mut Vec<DVec2>) {
    let max_sq = REL_QUAD_FLATNESS * REL_QUAD_FLATNESS * p0.distance_squared(p);
    let mut stack = vec![(p0, pc, p, 0u32)];
    while let Some((q0, q1, q2, level)) = stack.pop() {
        let flat = (q0 - 2.0 * q1 + q2).length_squared() < max_sq;
        if level >= MAX_BEZIER2_SUBDIVISIONS || flat {
            out.push(q2);
            continue;
        }
        let qq0 = mid(q0, q1);
        let qq1 = mid(q1, q2);
        let split = mid(qq0, qq1);
        stack.push((split, qq1, q2, level + 1));
        stack.push((q0, qq0, split, level + 1));
    }
}

/// De Casteljau bisection of a cubic Bezier until flat.
pub fn cubic_as_lines(p0: DVec2, pc: DVec2, pd: DVec2, p: DVec2, out: &mut Vec<DVec2>) {
    let max_sq = REL_CUBIC_FLATNESS * REL_CUBIC_FLATNESS * p0.distance_squared(p);
    let mut stack = vec![(p0, pc, pd, p, 0u32)];
    while let Some((q0, q1, q2, q3, level)) = stack.pop() {
        let flat = (q0 - 2.0 * q1 + q2).length_squared() < max_sq
            && (q1 - 2.0 * q2 + q3).length_squared() < max_sq;
        if level >= MAX_BEZIER3_SUBDIVISIONS || flat {
            out.push(q3);
            continue;
        }
        let qq0 = mid(q0, q1);
        let qq1 = mid(q1, q2);
        let qq2 = mid(q2, q3);
        let qqq0 = mid(qq0, qq1);
        let qqq1 = mid(qq1, qq2);
        let split = mid(qqq0, qqq1);
        stack.push((split, qqq1, qq2, q3, level + 1));
        stack.push((q0, qq0, qqq0, split, level + 1));
    }
}

/// Whether a box drawn counterclockwise (complemented if `clockwise`)
/// moves horizontally first.
pub fn box_x_move_is_first(p0: DVec2, p1: DVec2, clockwise: bool) -> bool {
    let ccw = (p1.x >= p0.x && p1.y >= p0.y) || (p1.x < p0.x && p1.y < p0.y);
    ccw != clockwise
}

/// The five vertices of a box outline, starting and ending at `p0`.
pub fn box_vertices(p0: DVec2, p1: DVec2, clockwise: bool) -> [DVec2; 5] {
    let (a, b) = if box_x_move_is_first(p0, p1, clockwise) {
        (dvec2(p1.x, p0.y), dvec2(p0.x, p1.y))
    } else {
        (dvec2(p0.x, p1.y), dvec2(p1.x, p0.y))
    };
    [p0, a, p1, b, p0]
}

/// The four quarter-arc endpoints of an ellipse, plus its starting point,
/// in drawing order. `angle` is in degrees.
pub fn ellipse_quadrants(pc: DVec2, rx: f64, ry: f64, angle: f64, clockwise: bool) -> [DVec2; 5] {
    let (s, c) = angle.to_radians().sin_cos();
    let start = pc + rx * dvec2(c, s);
    let up = pc + ry * dvec2(-s, c);
    let down = pc + ry * dvec2(s, -c);
    let opposite = pc - rx * dvec2(c, s);
    if clockwise {
        [start, down, opposite, up, start]
    } else {
        [start, up, opposite, down, start]
    }
}

/// Polygonal approximation of a full ellipse: a moveto point followed by
/// the line endpoints of four quarter ellipses.
pub fn ellipse_as_lines(pc: DVec2, rx: f64, ry: f64, angle: f64, clockwise: bool) -> Vec<DVec2> {
    let q = ellipse_quadrants(pc, rx, ry, angle, clockwise);
    let mut out = Vec::with_capacity(1 + 4 * (1 << NUM_ARC_SUBDIVISIONS));
    out.push(q[0]);
    for pair in q.windows(2) {
        ellarc_as_lines(pair[0], pc, pair[1], &mut out);
    }
    out
}

/// Move `pc` onto the perpendicular bisector of `p0 → p1`, so that it can
/// center a circle through both. `p0` and `p1` must differ.
pub fn true_center(p0: DVec2, p1: DVec2, pc: DVec2) -> DVec2 {
    let pm = mid(p0, p1);
    let a = (p1 - p0).perp();
    let b = pc - pm;
    pm + (a.dot(b) / a.length_squared()) * a
}

/// Start and sweep of a native arc in device space, in degrees.
///
/// Native arc primitives run counterclockwise with a sweep of at most
/// 180°. When the arc runs clockwise in the device frame its endpoints are
/// swapped, and `swapped` is set so the caller can tell which endpoint
/// `start + sweep` reaches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcAngles {
    pub start: f64,
    pub sweep: f64,
    pub swapped: bool,
}

/// Compute native arc angles for the arc `p0 → p1` about `pc`, all given
/// in a y-up device frame.
pub fn arc_angles(pc: DVec2, p0: DVec2, p1: DVec2) -> ArcAngles {
    let v0 = p0 - pc;
    let v1 = p1 - pc;
    let mut theta0 = v0.y.atan2(v0.x).to_degrees();
    let mut theta1 = v1.y.atan2(v1.x).to_degrees();
    let swapped = v0.perp_dot(v1) < 0.0;
    if swapped {
        std::mem::swap(&mut theta0, &mut theta1);
    }
    let start = theta0.rem_euclid(360.0);
    let sweep = (theta1 - theta0).rem_euclid(360.0);
    ArcAngles {
        start,
        sweep,
        swapped,
    }
}
