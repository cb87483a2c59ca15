//! Device-space bounding boxes of stroked geometry.
//!
//! Points are given in user space together with the user → device map, so
//! that caps and joins are sized in user units (the line width lives
//! there) and then projected.

use glam::{DVec2, dvec2};

use crate::matrix::Affine;
use crate::state::modes::{CapStyle, JoinStyle};
use crate::types::BBox;

/// Extend `bbox` by a (possibly rotated) ellipse, widened by half the line
/// width on each radius.
pub fn ellipse_bbox(
    bbox: &mut BBox,
    center: DVec2,
    rx: f64,
    ry: f64,
    angle_deg: f64,
    line_width: f64,
    m: &Affine,
) {
    let rx = rx + 0.5 * line_width;
    let ry = ry + 0.5 * line_width;
    let (s, c) = angle_deg.to_radians().sin_cos();
    // conjugate radii in device space; the ellipse is c + u·cos t + v·sin t
    let u = m.apply_vector(dvec2(rx * c, rx * s));
    let v = m.apply_vector(dvec2(-ry * s, ry * c));
    let dev = dvec2((u.x * u.x + v.x * v.x).sqrt(), (u.y * u.y + v.y * v.y).sqrt());
    let dc = m.apply(center);
    bbox.expand_point(dc + dev);
    bbox.expand_point(dc - dev);
}

/// Extend `bbox` by the cap at `p`, the end of a segment coming from
/// `other`.
pub fn line_end_bbox(
    bbox: &mut BBox,
    p: DVec2,
    other: DVec2,
    line_width: f64,
    cap: CapStyle,
    m: &Affine,
) {
    let half = 0.5 * line_width;
    let along = (other - p).normalize_or_zero() * half;
    let across = dvec2(other.y - p.y, p.x - other.x).normalize_or_zero() * half;
    match cap {
        CapStyle::Butt => {
            bbox.expand_point(m.apply(p + across));
            bbox.expand_point(m.apply(p - across));
        }
        CapStyle::Projecting => {
            bbox.expand_point(m.apply(p - along + across));
            bbox.expand_point(m.apply(p - along - across));
        }
        CapStyle::Round => ellipse_bbox(bbox, p, half, half, 0.0, 0.0, m),
        CapStyle::Triangular => {
            bbox.expand_point(m.apply(p - along));
            bbox.expand_point(m.apply(p + across));
            bbox.expand_point(m.apply(p - across));
        }
    }
}

/// Extend `bbox` by the join at `p` between segments from `left` and to
/// `right`.
///
/// A miter is replaced by a bevel when the angle between the segments is
/// too sharp for `miter_limit`, i.e. when `cos φ > 1 − 2/M²`.
#[allow(clippy::too_many_arguments)]
pub fn line_join_bbox(
    bbox: &mut BBox,
    left: DVec2,
    p: DVec2,
    right: DVec2,
    line_width: f64,
    join: JoinStyle,
    miter_limit: f64,
    m: &Affine,
) {
    let v1 = left - p;
    let v2 = right - p;
    let bevel = |bbox: &mut BBox| {
        line_end_bbox(bbox, p, left, line_width, CapStyle::Butt, m);
        line_end_bbox(bbox, p, right, line_width, CapStyle::Butt, m);
    };
    match join {
        JoinStyle::Miter => {
            let (l1, l2) = (v1.length(), v2.length());
            if l1 == 0.0 || l2 == 0.0 {
                bbox.expand_point(m.apply(p));
                return;
            }
            let cosphi = v1.dot(v2) / l1 / l2;
            if miter_limit <= 1.0 || cosphi > 1.0 - 2.0 / (miter_limit * miter_limit) {
                bevel(bbox);
            } else {
                let miter_len = (1.0 / (2.0 - 2.0 * cosphi)).sqrt() * line_width;
                let tip = p - (v1 + v2).normalize_or_zero() * miter_len;
                bbox.expand_point(m.apply(tip));
            }
        }
        JoinStyle::Triangular => {
            let tip = p - (v1 + v2).normalize_or_zero() * (0.5 * line_width);
            bbox.expand_point(m.apply(tip));
            bevel(bbox);
        }
        JoinStyle::Bevel => bevel(bbox),
        JoinStyle::Round => {
            let half = 0.5 * line_width;
            ellipse_bbox(bbox, p, half, half, 0.0, 0.0, m);
        }
    }
}

/// Extend `bbox` by the interior extrema of a quadratic Bezier. Endpoints
/// are not included.
pub fn quad_bbox(bbox: &mut BBox, p0: DVec2, p1: DVec2, p2: DVec2, device_width: f64, m: &Affine) {
    let half = 0.5 * device_width;
    let at = |t: f64| {
        let s = 1.0 - t;
        s * s * p0 + 2.0 * s * t * p1 + t * t * p2
    };
    let a = p0 - 2.0 * p1 + p2;
    let b = p1 - p0;
    if a.x != 0.0 {
        let t = -b.x / a.x;
        if t > 0.0 && t < 1.0 {
            let d = m.apply(at(t));
            bbox.expand_point(d + dvec2(half, 0.0));
            bbox.expand_point(d - dvec2(half, 0.0));
        }
    }
    if a.y != 0.0 {
        let t = -b.y / a.y;
        if t > 0.0 && t < 1.0 {
            let d = m.apply(at(t));
            bbox.expand_point(d + dvec2(0.0, half));
            bbox.expand_point(d - dvec2(0.0, half));
        }
    }
}

/// Extend `bbox` by the interior extrema of a cubic Bezier. Endpoints are
/// not included.
pub fn cubic_bbox(
    bbox: &mut BBox,
    p0: DVec2,
    p1: DVec2,
    p2: DVec2,
    p3: DVec2,
    device_width: f64,
    m: &Affine,
) {
    let half = 0.5 * device_width;
    let at = |t: f64| {
        let s = 1.0 - t;
        s * s * s * p0 + 3.0 * s * s * t * p1 + 3.0 * s * t * t * p2 + t * t * t * p3
    };
    // derivative / 3 = a t² + b t + c
    let a = -p0 + 3.0 * p1 - 3.0 * p2 + p3;
    let b = 2.0 * (p0 - 2.0 * p1 + p2);
    let c = p1 - p0;
    let roots = |a: f64, b: f64, c: f64| -> Vec<f64> {
        if a == 0.0 {
            return if b != 0.0 { vec![-c / b] } else { vec![] };
        }
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return vec![];
        }
        let sq = disc.sqrt();
        vec![(-b + sq) / (2.0 * a), (-b - sq) / (2.0 * a)]
    };
    for t in roots(a.x, b.x, c.x) {
        if t > 0.0 && t < 1.0 {
            let d = m.apply(at(t));
            bbox.expand_point(d + dvec2(half, 0.0));
            bbox.expand_point(d - dvec2(half, 0.0));
        }
    }
    for t in roots(a.y, b.y, c.y) {
        if t > 0.0 && t < 1.0 {
            let d = m.apply(at(t));
            bbox.expand_point(d + dvec2(0.0, half));
            bbox.expand_point(d - dvec2(0.0, half));
        }
    }
}
