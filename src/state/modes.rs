//! String-keyed drawing modes.
//!
//! Each parser returns [`UnrecognizedMode`] for unknown names; callers fall
//! back to the `Default` value.

use std::fmt;
use std::str::FromStr;

use crate::errors::UnrecognizedMode;

/// Builtin line styles. Non-solid styles are dash patterns whose lengths
/// are multiples of the line width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LineType {
    #[default]
    Solid,
    Dotted,
    DotDashed,
    ShortDashed,
    LongDashed,
    DotDotDashed,
    DotDotDotDashed,
}

impl LineType {
    pub const ALL: [LineType; 7] = [
        LineType::Solid,
        LineType::Dotted,
        LineType::DotDashed,
        LineType::ShortDashed,
        LineType::LongDashed,
        LineType::DotDotDashed,
        LineType::DotDotDotDashed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LineType::Solid => "solid",
            LineType::Dotted => "dotted",
            LineType::DotDashed => "dotdashed",
            LineType::ShortDashed => "shortdashed",
            LineType::LongDashed => "longdashed",
            LineType::DotDotDashed => "dotdotdashed",
            LineType::DotDotDotDashed => "dotdotdotdashed",
        }
    }

    /// On/off dash lengths in units of the line width.
    pub fn dashes(self) -> &'static [u8] {
        match self {
            LineType::Solid => &[],
            LineType::Dotted => &[1, 3],
            LineType::DotDashed => &[4, 3, 1, 3],
            LineType::ShortDashed => &[4, 4],
            LineType::LongDashed => &[7, 4],
            LineType::DotDotDashed => &[4, 3, 1, 3, 1, 3],
            LineType::DotDotDotDashed => &[4, 3, 1, 3, 1, 3, 1, 3],
        }
    }

    /// Period of the dash pattern, in units of the line width.
    pub fn dash_cycle(self) -> u32 {
        self.dashes().iter().map(|&d| d as u32).sum()
    }
}

/// Result of `linemod`: a line type, plus whether the path's points are
/// joined at all ("disconnected" draws a dot at each vertex instead).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineMode {
    pub line_type: LineType,
    pub connected: bool,
}

impl Default for LineMode {
    fn default() -> Self {
        LineMode {
            line_type: LineType::Solid,
            connected: true,
        }
    }
}

impl FromStr for LineMode {
    type Err = UnrecognizedMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "disconnected" {
            return Ok(LineMode {
                line_type: LineType::Solid,
                connected: false,
            });
        }
        LineType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .map(|line_type| LineMode {
                line_type,
                connected: true,
            })
            .ok_or_else(|| UnrecognizedMode {
                kind: "line mode",
                value: s.to_string(),
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CapStyle {
    #[default]
    Butt,
    Round,
    Projecting,
    Triangular,
}

impl FromStr for CapStyle {
    type Err = UnrecognizedMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "butt" => Ok(CapStyle::Butt),
            "round" => Ok(CapStyle::Round),
            "projecting" => Ok(CapStyle::Projecting),
            "triangular" => Ok(CapStyle::Triangular),
            _ => Err(UnrecognizedMode {
                kind: "cap mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum JoinStyle {
    #[default]
    Miter,
    Round,
    Bevel,
    Triangular,
}

impl FromStr for JoinStyle {
    type Err = UnrecognizedMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "miter" | "mitre" => Ok(JoinStyle::Miter),
            "round" => Ok(JoinStyle::Round),
            "bevel" => Ok(JoinStyle::Bevel),
            "triangular" => Ok(JoinStyle::Triangular),
            _ => Err(UnrecognizedMode {
                kind: "join mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FillRule {
    #[default]
    EvenOdd,
    NonzeroWinding,
}

impl FillRule {
    pub fn name(self) -> &'static str {
        match self {
            FillRule::EvenOdd => "even-odd",
            FillRule::NonzeroWinding => "nonzero-winding",
        }
    }

    pub fn other(self) -> FillRule {
        match self {
            FillRule::EvenOdd => FillRule::NonzeroWinding,
            FillRule::NonzeroWinding => FillRule::EvenOdd,
        }
    }
}

impl FromStr for FillRule {
    type Err = UnrecognizedMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "even-odd" | "alternate" => Ok(FillRule::EvenOdd),
            "nonzero-winding" | "winding" => Ok(FillRule::NonzeroWinding),
            _ => Err(UnrecognizedMode {
                kind: "fill rule",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for FillRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
