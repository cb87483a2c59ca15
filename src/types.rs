//! Value types shared by every layer: points, integer device points,
//! bounding boxes and 48-bit colors.

use std::fmt;

pub use glam::{DVec2, dvec2};

/// A user-space (or device-space, depending on context) coordinate.
pub type Point = DVec2;

/// Round to the nearest integer, halves away from zero, saturating at the
/// `i32` range.
#[inline]
pub fn iround(x: f64) -> i32 {
    if x >= i32::MAX as f64 {
        i32::MAX
    } else if x <= -(i32::MAX as f64) {
        -i32::MAX
    } else if x > 0.0 {
        (x + 0.5) as i32
    } else {
        (x - 0.5) as i32
    }
}

/// A quantized device coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct IPoint {
    pub x: i32,
    pub y: i32,
}

impl IPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        IPoint { x, y }
    }

    /// Quantize a real device point.
    #[inline]
    pub fn round(p: DVec2) -> Self {
        IPoint { x: iround(p.x), y: iround(p.y) }
    }

    #[inline]
    pub fn as_dvec2(self) -> DVec2 {
        dvec2(self.x as f64, self.y as f64)
    }
}

impl fmt::Display for IPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Axis-aligned bounding box in device space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min: DVec2,
    pub max: DVec2,
}

impl Default for BBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BBox {
    /// Create an empty bounding box (will expand on first point)
    pub const fn new() -> Self {
        BBox {
            min: DVec2::new(f64::MAX, f64::MAX),
            max: DVec2::new(-f64::MAX, -f64::MAX),
        }
    }

    /// Check if the bbox is empty (never expanded)
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Expand to include a point
    pub fn expand_point(&mut self, p: DVec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand to include another box
    pub fn expand_bbox(&mut self, other: &BBox) {
        if other.is_empty() {
            return;
        }
        self.expand_point(other.min);
        self.expand_point(other.max);
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// A color with 16 bits per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rgb48 {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl Rgb48 {
    pub const BLACK: Rgb48 = Rgb48::new(0, 0, 0);
    pub const WHITE: Rgb48 = Rgb48::new(0xffff, 0xffff, 0xffff);

    pub const fn new(red: u16, green: u16, blue: u16) -> Self {
        Rgb48 { red, green, blue }
    }

    /// Build from caller-supplied components, rejecting anything outside
    /// `0..=0xffff`.
    pub fn checked(red: i32, green: i32, blue: i32) -> Option<Self> {
        let ok = |c: i32| (0..=0xffff).contains(&c);
        if ok(red) && ok(green) && ok(blue) {
            Some(Rgb48::new(red as u16, green as u16, blue as u16))
        } else {
            None
        }
    }

    /// Truncate to 24-bit color.
    pub const fn to_rgb24(self) -> Rgb24 {
        Rgb24::new((self.red >> 8) as u8, (self.green >> 8) as u8, (self.blue >> 8) as u8)
    }

    pub fn is_black(self) -> bool {
        self == Rgb48::BLACK
    }

    pub fn is_white(self) -> bool {
        self == Rgb48::WHITE
    }

    /// Channels as fractions of full intensity.
    pub fn fractions(self) -> [f64; 3] {
        [
            self.red as f64 / 0xffff as f64,
            self.green as f64 / 0xffff as f64,
            self.blue as f64 / 0xffff as f64,
        ]
    }
}

const fn widen(c: u8) -> u16 {
    ((c as u16) << 8) | c as u16
}

/// A color with 8 bits per channel, the precision most formats accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Rgb24 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb24 {
    pub const BLACK: Rgb24 = Rgb24::new(0, 0, 0);
    pub const WHITE: Rgb24 = Rgb24::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb24 { r, g, b }
    }

    pub const fn from_u32(rgb: u32) -> Self {
        Rgb24::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Widen to 48 bits by byte replication, so that 0xff maps to 0xffff.
    pub const fn to_rgb48(self) -> Rgb48 {
        Rgb48::new(widen(self.r), widen(self.g), widen(self.b))
    }

    pub fn distance_sq(self, other: Rgb24) -> i32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        dr * dr + dg * dg + db * db
    }

    /// `#rrggbb`
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
