//! Level sets of gridded scalar fields.

use glam::{DVec2, dvec2};

/// A vertex of the triangulated grid with its height above the level.
#[derive(Clone, Copy)]
struct Vertex {
    p: DVec2,
    d: f64,
}

/// Segments of the curve `z = level` through a rectangular grid.
///
/// `z[i][j]` is the value at `(x[i], y[j])`. Each grid cell is split into
/// four triangles sharing the cell centroid, whose value is the mean of the
/// four corners. A triangle crossing the level contributes one segment,
/// with endpoints found by linear interpolation along its edges, so a cell
/// yields at most four segments. A vertex lying exactly on the level is
/// itself the crossing point.
///
/// Rows of `z` shorter than `y` are treated as truncating the grid.
pub fn iso_contour_segments(x: &[f64], y: &[f64], z: &[Vec<f64>], level: f64) -> Vec<(DVec2, DVec2)> {
    let mut segments = Vec::new();
    let nx = x.len().min(z.len());
    if nx < 2 || y.len() < 2 {
        return segments;
    }
    let ny = z[..nx].iter().map(Vec::len).min().unwrap_or(0).min(y.len());
    for i in 0..nx - 1 {
        for j in 0..ny.saturating_sub(1) {
            let corner = |ii: usize, jj: usize| Vertex {
                p: dvec2(x[ii], y[jj]),
                d: z[ii][jj] - level,
            };
            let corners = [corner(i, j), corner(i + 1, j), corner(i + 1, j + 1), corner(i, j + 1)];
            let centroid = Vertex {
                p: corners.iter().map(|v| v.p).sum::<DVec2>() * 0.25,
                d: corners.iter().map(|v| v.d).sum::<f64>() * 0.25,
            };
            for k in 0..4 {
                let tri = [corners[k], corners[(k + 1) % 4], centroid];
                if let Some(seg) = triangle_crossing(&tri) {
                    segments.push(seg);
                }
            }
        }
    }
    segments
}

fn triangle_crossing(tri: &[Vertex; 3]) -> Option<(DVec2, DVec2)> {
    let mut hits: Vec<DVec2> = Vec::with_capacity(3);
    let mut push = |p: DVec2| {
        if !hits.contains(&p) {
            hits.push(p);
        }
    };
    for k in 0..3 {
        let a = tri[k];
        let b = tri[(k + 1) % 3];
        if a.d == 0.0 {
            push(a.p);
        } else if b.d != 0.0 && (a.d < 0.0) != (b.d < 0.0) {
            let t = a.d / (a.d - b.d);
            push(a.p + t * (b.p - a.p));
        }
    }
    match hits.as_slice() {
        [p, q] => Some((*p, *q)),
        _ => None,
    }
}
