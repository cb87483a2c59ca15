//! The built-in scan converter.
//!
//! Lines of width 0 or 1 are Bresenham lines. Wider lines are built from
//! one filled quadrilateral per segment, with disks or wedges filling the
//! joins and caps. Polygons are filled by sampling pixel centers on each
//! row, under either fill rule.

use std::mem;

use glam::DVec2;

use crate::collab::{Canvas, ScanConverter, StrokeStyle};
use crate::state::{DEFAULT_MITER_LIMIT, DrawState};
use crate::state::modes::{CapStyle, FillRule, JoinStyle};
use crate::types::{IPoint, iround};

#[derive(Clone, Copy, Debug, Default)]
pub struct Rasterizer;

impl Rasterizer {
    pub fn new() -> Self {
        Rasterizer
    }
}

impl ScanConverter for Rasterizer {
    fn draw_point(&mut self, canvas: &mut Canvas, p: IPoint, index: u8) {
        canvas.put(p.x, p.y, index);
    }

    fn draw_lines(&mut self, canvas: &mut Canvas, points: &[IPoint], style: &StrokeStyle, index: u8) {
        match points {
            [] => return,
            [p] => return self.draw_point(canvas, *p, index),
            _ => {}
        }
        let pts: Vec<DVec2> = points.iter().map(|p| p.as_dvec2()).collect();
        let pieces = if style.dashes.iter().all(|&d| d == 0) {
            vec![pts]
        } else {
            dash_pieces(&pts, &style.dashes, style.dash_offset)
        };
        for piece in pieces {
            if style.width <= 1 {
                for w in piece.windows(2) {
                    bresenham(canvas, IPoint::round(w[0]), IPoint::round(w[1]), index);
                }
            } else {
                wide_polyline(canvas, &piece, style, index);
            }
        }
    }

    fn fill_polygon(&mut self, canvas: &mut Canvas, points: &[IPoint], rule: FillRule, index: u8) {
        let pts: Vec<DVec2> = points.iter().map(|p| p.as_dvec2()).collect();
        fill(canvas, &pts, rule, index);
    }
}

/// Stroke parameters for `state` in whole pixels. Line-type dashes scale
/// with the line width; a dash array scales with the transform, an odd
/// array is doubled, and the offset is reduced into one cycle.
pub fn stroke_style(state: &DrawState) -> StrokeStyle {
    let width = state.quantized_device_line_width.max(0) as u32;
    let (dashes, dash_offset) = match &state.dash_array {
        Some(d) if !d.dashes.is_empty() => {
            let (min_sv, _) = state.transform.m.singular_values();
            let mut dashes: Vec<u32> = d.dashes.iter().map(|&len| iround(min_sv * len).max(1) as u32).collect();
            if dashes.len() % 2 == 1 {
                dashes.extend_from_within(..);
            }
            let cycle: i64 = dashes.iter().map(|&d| d as i64).sum();
            let offset = (iround(min_sv * d.offset) as i64).rem_euclid(cycle.max(1));
            (dashes, offset as u32)
        }
        Some(_) => (Vec::new(), 0),
        None => {
            let scale = width.max(1);
            (state.line_type.dashes().iter().map(|&d| (scale * d as u32).max(1)).collect(), 0)
        }
    };
    StrokeStyle {
        width,
        cap: state.cap,
        join: state.join,
        dashes,
        dash_offset,
    }
}

fn bresenham(canvas: &mut Canvas, a: IPoint, b: IPoint, index: u8) {
    let dx = (b.x - a.x).abs();
    let dy = -(b.y - a.y).abs();
    let sx = if a.x < b.x { 1 } else { -1 };
    let sy = if a.y < b.y { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (a.x, a.y);
    loop {
        canvas.put(x, y, index);
        if x == b.x && y == b.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Split a polyline into its dashes. Each returned piece is one "on"
/// stretch.
fn dash_pieces(points: &[DVec2], dashes: &[u32], offset: u32) -> Vec<Vec<DVec2>> {
    let cycle: u32 = dashes.iter().sum();
    let n = dashes.len();
    let mut i = 0;
    let mut remaining = dashes[0] as f64;
    let mut skip = (offset % cycle) as f64;
    while skip > 0.0 {
        if skip >= remaining {
            skip -= remaining;
            i = (i + 1) % n;
            remaining = dashes[i] as f64;
        } else {
            remaining -= skip;
            skip = 0.0;
        }
    }

    let mut pieces = Vec::new();
    let mut current = if i % 2 == 0 { vec![points[0]] } else { Vec::new() };
    for w in points.windows(2) {
        let (mut a, b) = (w[0], w[1]);
        let mut len = a.distance(b);
        while len > 0.0 {
            let on = i % 2 == 0;
            if remaining >= len {
                if on {
                    current.push(b);
                }
                remaining -= len;
                len = 0.0;
            } else {
                let m = a.lerp(b, remaining / len);
                if on {
                    current.push(m);
                    pieces.push(mem::take(&mut current));
                } else {
                    current = vec![m];
                }
                len -= a.distance(m);
                a = m;
                i = (i + 1) % n;
                remaining = dashes[i] as f64;
            }
        }
    }
    if current.len() >= 2 {
        pieces.push(current);
    }
    pieces
}

fn wide_polyline(canvas: &mut Canvas, points: &[DVec2], style: &StrokeStyle, index: u8) {
    let half = style.width as f64 / 2.0;
    let mut pts = points.to_vec();
    pts.dedup();
    if pts.len() < 2 {
        disk(canvas, pts[0], half, index);
        return;
    }
    let closed = pts.len() > 3 && pts.first() == pts.last();
    let last = pts.len() - 2;

    for (k, w) in pts.windows(2).enumerate() {
        let (mut a, mut b) = (w[0], w[1]);
        let dir = (b - a).normalize();
        if !closed && style.cap == CapStyle::Projecting {
            if k == 0 {
                a -= dir * half;
            }
            if k == last {
                b += dir * half;
            }
        }
        let n = dir.perp() * half;
        fill(canvas, &[a + n, b + n, b - n, a - n], FillRule::NonzeroWinding, index);
    }

    let interior = if closed { 0..pts.len() - 1 } else { 1..pts.len() - 1 };
    for k in interior {
        let prev = if k == 0 { pts[pts.len() - 2] } else { pts[k - 1] };
        join(canvas, prev, pts[k], pts[k + 1], half, style.join, index);
    }
    if !closed {
        cap(canvas, pts[0], pts[1], half, style.cap, index);
        cap(canvas, pts[pts.len() - 1], pts[pts.len() - 2], half, style.cap, index);
    }
}

/// Fill the gap on the outside of the corner at `v`.
fn join(canvas: &mut Canvas, prev: DVec2, v: DVec2, next: DVec2, half: f64, style: JoinStyle, index: u8) {
    if style == JoinStyle::Round {
        disk(canvas, v, half, index);
        return;
    }
    let d0 = (v - prev).normalize();
    let d1 = (next - v).normalize();
    let turn = d0.perp_dot(d1);
    if turn == 0.0 {
        return;
    }
    // the outer side is opposite the turn
    let side = if turn > 0.0 { -1.0 } else { 1.0 };
    let e0 = v + d0.perp() * half * side;
    let e1 = v + d1.perp() * half * side;
    let mut wedge = vec![v, e0];
    match style {
        JoinStyle::Miter => {
            let bisector = (d0.perp() + d1.perp()) * side;
            let cos_half = (d0.perp() * side).dot(bisector.normalize());
            if cos_half > 0.0 && 1.0 / cos_half <= DEFAULT_MITER_LIMIT {
                wedge.push(v + bisector.normalize() * (half / cos_half));
            }
        }
        JoinStyle::Triangular => wedge.push(v + (d0 - d1).normalize_or_zero() * half),
        _ => {}
    }
    wedge.push(e1);
    fill(canvas, &wedge, FillRule::NonzeroWinding, index);
}

/// Cap the end `end` of a line arriving from `from`.
fn cap(canvas: &mut Canvas, end: DVec2, from: DVec2, half: f64, style: CapStyle, index: u8) {
    let dir = (end - from).normalize();
    let n = dir.perp() * half;
    match style {
        CapStyle::Round => disk(canvas, end, half, index),
        CapStyle::Triangular => fill(canvas, &[end + n, end + dir * half, end - n], FillRule::NonzeroWinding, index),
        CapStyle::Butt | CapStyle::Projecting => {}
    }
}

fn disk(canvas: &mut Canvas, center: DVec2, radius: f64, index: u8) {
    let c = IPoint::round(center);
    let r = radius.ceil() as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            if ((dx * dx + dy * dy) as f64) <= radius * radius {
                canvas.put(c.x + dx, c.y + dy, index);
            }
        }
    }
}

/// Scanline polygon fill: a pixel is painted when its center lies inside.
/// Edges are half-open in y, so shared edges are painted once.
fn fill(canvas: &mut Canvas, points: &[DVec2], rule: FillRule, index: u8) {
    if points.len() < 3 {
        return;
    }
    let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points {
        ymin = ymin.min(p.y);
        ymax = ymax.max(p.y);
    }
    let y0 = (ymin.ceil() as i32).max(0);
    let y1 = (ymax.floor() as i32).min(canvas.height as i32 - 1);
    let mut crossings: Vec<(f64, i32)> = Vec::new();
    for y in y0..=y1 {
        let yf = y as f64;
        crossings.clear();
        for k in 0..points.len() {
            let p = points[k];
            let q = points[(k + 1) % points.len()];
            let dir = if p.y <= yf && yf < q.y {
                1
            } else if q.y <= yf && yf < p.y {
                -1
            } else {
                continue;
            };
            let x = p.x + (yf - p.y) * (q.x - p.x) / (q.y - p.y);
            crossings.push((x, dir));
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        for k in 0..crossings.len().saturating_sub(1) {
            winding += crossings[k].1;
            let inside = match rule {
                FillRule::EvenOdd => k % 2 == 0,
                FillRule::NonzeroWinding => winding != 0,
            };
            if inside {
                span(canvas, y, crossings[k].0, crossings[k + 1].0, index);
            }
        }
    }
}

/// Pixels whose centers lie in `[xa, xb)` on row `y`.
fn span(canvas: &mut Canvas, y: i32, xa: f64, xb: f64, index: u8) {
    let start = (xa.ceil() as i32).max(0);
    let end = (xb.ceil() as i32).min(canvas.width as i32);
    for x in start..end {
        canvas.put(x, y, index);
    }
}
