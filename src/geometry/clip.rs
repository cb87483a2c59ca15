//! Cohen–Sutherland line clipping against an axis-aligned rectangle.

use glam::{DVec2, dvec2};

/// An axis-aligned clipping rectangle in device space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipRect {
    pub min: DVec2,
    pub max: DVec2,
}

/// A segment that survived clipping, and which of its ends moved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clipped {
    pub p0: DVec2,
    pub p1: DVec2,
    pub clipped_first: bool,
    pub clipped_second: bool,
}

const TOP: u8 = 0x1;
const BOTTOM: u8 = 0x2;
const RIGHT: u8 = 0x4;
const LEFT: u8 = 0x8;

/// Slack keeping points that round onto the edge pixel inside.
const CLIP_FUZZ: f64 = 0.0000001;

impl ClipRect {
    /// The rectangle covering integer pixels `imin..=imax` by
    /// `jmin..=jmax`, extended to just under half a pixel on each side.
    pub fn pixels(imin: i32, imax: i32, jmin: i32, jmax: i32) -> Self {
        ClipRect {
            min: dvec2(imin as f64 - 0.5 + CLIP_FUZZ, jmin as f64 - 0.5 + CLIP_FUZZ),
            max: dvec2(imax as f64 + 0.5 - CLIP_FUZZ, jmax as f64 + 0.5 - CLIP_FUZZ),
        }
    }

    pub fn contains(&self, p: DVec2) -> bool {
        self.outcode(p) == 0
    }

    fn outcode(&self, p: DVec2) -> u8 {
        let mut code = 0;
        if p.x > self.max.x {
            code |= RIGHT;
        } else if p.x < self.min.x {
            code |= LEFT;
        }
        if p.y > self.max.y {
            code |= TOP;
        } else if p.y < self.min.y {
            code |= BOTTOM;
        }
        code
    }

    /// Clip the segment `p0 → p1`. Returns `None` if no part of it lies
    /// inside.
    pub fn clip_line(&self, p0: DVec2, p1: DVec2) -> Option<Clipped> {
        let (mut a, mut b) = (p0, p1);
        let mut code_a = self.outcode(a);
        let mut code_b = self.outcode(b);
        loop {
            if code_a | code_b == 0 {
                break;
            }
            if code_a & code_b != 0 {
                return None;
            }
            let out = if code_a != 0 { code_a } else { code_b };
            let x = if out & RIGHT != 0 {
                dvec2(self.max.x, a.y + (b.y - a.y) * (self.max.x - a.x) / (b.x - a.x))
            } else if out & LEFT != 0 {
                dvec2(self.min.x, a.y + (b.y - a.y) * (self.min.x - a.x) / (b.x - a.x))
            } else if out & TOP != 0 {
                dvec2(a.x + (b.x - a.x) * (self.max.y - a.y) / (b.y - a.y), self.max.y)
            } else {
                dvec2(a.x + (b.x - a.x) * (self.min.y - a.y) / (b.y - a.y), self.min.y)
            };
            if out == code_a {
                a = x;
                code_a = self.outcode(a);
            } else {
                b = x;
                code_b = self.outcode(b);
            }
        }
        Some(Clipped {
            p0: a,
            p1: b,
            clipped_first: a != p0,
            clipped_second: b != p1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> ClipRect {
        ClipRect {
            min: dvec2(0.0, 0.0),
            max: dvec2(10.0, 10.0),
        }
    }

    #[test]
    fn inside_segment_is_untouched() {
        let c = unit().clip_line(dvec2(1.0, 1.0), dvec2(9.0, 5.0)).unwrap();
        assert_eq!((c.p0, c.p1), (dvec2(1.0, 1.0), dvec2(9.0, 5.0)));
        assert!(!c.clipped_first && !c.clipped_second);
    }

    #[test]
    fn crossing_segment_is_cut_at_both_edges() {
        let c = unit().clip_line(dvec2(-5.0, 5.0), dvec2(15.0, 5.0)).unwrap();
        assert_eq!((c.p0, c.p1), (dvec2(0.0, 5.0), dvec2(10.0, 5.0)));
        assert!(c.clipped_first && c.clipped_second);
    }

    #[test]
    fn diagonal_through_corner_region() {
        let c = unit().clip_line(dvec2(5.0, 5.0), dvec2(15.0, 20.0)).unwrap();
        assert_eq!(c.p0, dvec2(5.0, 5.0));
        assert!((c.p1 - dvec2(5.0 + 10.0 / 3.0, 10.0)).length() < 1e-12);
        assert!(c.clipped_second);
    }

    #[test]
    fn outside_segments_are_rejected() {
        assert!(unit().clip_line(dvec2(11.0, 0.0), dvec2(12.0, 10.0)).is_none());
        // both ends outside on different sides, missing the corner
        assert!(unit().clip_line(dvec2(-1.0, 8.0), dvec2(3.0, 12.0)).is_none());
    }

    #[test]
    fn pixel_rect_reaches_half_a_pixel_out() {
        let r = ClipRect::pixels(0, 4095, 0, 3119);
        assert!(r.contains(dvec2(-0.49, 3119.49)));
        assert!(!r.contains(dvec2(-0.5, 0.0)));
    }
}
