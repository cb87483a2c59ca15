//! The drawing state and its save/restore stack.

pub mod modes;

use glam::DVec2;

use crate::errors::PlotError;
use crate::matrix::Affine;
use crate::path::Path;
use crate::types::{Rgb48, iround};
use modes::{CapStyle, FillRule, JoinStyle, LineType};

/// Miter limit matching PostScript's default: miters are cut off below an
/// angle of about 11 degrees.
pub const DEFAULT_MITER_LIMIT: f64 = 10.4334305246;

/// The user → device map and its precomputed properties.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub user_to_ndc: Affine,
    /// User → device.
    pub m: Affine,
    pub uniform: bool,
    pub axes_preserved: bool,
    pub nonreflection: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::new(Affine::IDENTITY, &Affine::IDENTITY, false)
    }
}

impl Transform {
    pub fn new(user_to_ndc: Affine, ndc_to_device: &Affine, flipped_y: bool) -> Self {
        let m = user_to_ndc.compose(ndc_to_device);
        Transform {
            user_to_ndc,
            m,
            uniform: m.is_uniform(),
            axes_preserved: m.axes_preserved(),
            nonreflection: m.is_nonreflecting(flipped_y),
        }
    }

    /// Painting through a singular map draws nothing.
    pub fn is_singular(&self) -> bool {
        self.m.determinant() == 0.0
    }

    #[inline]
    pub fn to_device(&self, p: DVec2) -> DVec2 {
        self.m.apply(p)
    }
}

/// A user-specified dash pattern, in user units.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DashArray {
    pub dashes: Vec<f64>,
    pub offset: f64,
}

/// One frame of the drawing-state stack.
#[derive(Clone, Debug)]
pub struct DrawState {
    pub pos: DVec2,
    pub transform: Transform,

    /// Simple path under construction.
    pub path: Option<Path>,
    /// Finished simple paths of the compound path under construction.
    pub paths: Vec<Path>,
    /// First point of the current subpath, the target of `closepath`.
    pub start_point: DVec2,

    pub fill_rule: FillRule,
    pub line_type: LineType,
    pub points_are_connected: bool,
    pub cap: CapStyle,
    pub join: JoinStyle,
    pub miter_limit: f64,
    pub line_width: f64,
    pub line_width_is_default: bool,
    pub device_line_width: f64,
    pub quantized_device_line_width: i32,
    pub dash_array: Option<DashArray>,
    pub pen_type: i32,
    pub fill_type: i32,
    pub orientation: i32,

    pub font_name: String,
    pub font_size: f64,
    pub font_size_is_default: bool,
    pub text_rotation: f64,

    pub fg_color: Rgb48,
    pub fill_color_base: Rgb48,
    pub fill_color: Rgb48,
    pub bg_color: Rgb48,
    pub bg_color_suppressed: bool,

    pub default_line_width: f64,
    pub default_font_size: f64,
}

impl Default for DrawState {
    fn default() -> Self {
        DrawState {
            pos: DVec2::ZERO,
            transform: Transform::default(),
            path: None,
            paths: Vec::new(),
            start_point: DVec2::ZERO,
            fill_rule: FillRule::EvenOdd,
            line_type: LineType::Solid,
            points_are_connected: true,
            cap: CapStyle::Butt,
            join: JoinStyle::Miter,
            miter_limit: DEFAULT_MITER_LIMIT,
            line_width: 0.0,
            line_width_is_default: true,
            device_line_width: 1.0,
            quantized_device_line_width: 1,
            dash_array: None,
            pen_type: 1,
            fill_type: 0,
            orientation: 1,
            font_name: "HersheySerif".to_string(),
            font_size: 0.0,
            font_size_is_default: true,
            text_rotation: 0.0,
            fg_color: Rgb48::BLACK,
            fill_color_base: Rgb48::BLACK,
            fill_color: Rgb48::BLACK,
            bg_color: Rgb48::WHITE,
            bg_color_suppressed: false,
            default_line_width: 0.0,
            default_font_size: 0.0,
        }
    }
}

impl DrawState {
    /// A fresh frame for a backend with the given default font.
    pub fn with_font(default_font: &str) -> Self {
        DrawState {
            font_name: default_font.to_string(),
            ..Default::default()
        }
    }

    /// Copy for a `savestate`: everything but the path under construction.
    pub fn child(&self) -> Self {
        DrawState {
            path: None,
            paths: Vec::new(),
            ..self.clone()
        }
    }

    /// True if there is anything to paint: a pen or a fill.
    pub fn is_visible(&self) -> bool {
        self.pen_type != 0 || self.fill_type != 0
    }

    /// Store a user-space line width and derive its device width.
    pub fn set_line_width(&mut self, width: f64) {
        let norm = self.transform.m.norm();
        self.line_width = width;
        self.device_line_width = norm * width;
        let q = iround(self.device_line_width);
        self.quantized_device_line_width = if q == 0 && self.device_line_width > 0.0 { 1 } else { q };
    }

    /// Dash on/off lengths in user units: the dash array if one is set,
    /// otherwise the line type's pattern scaled by `unit`.
    pub fn effective_dashes(&self, unit: f64) -> Option<(Vec<f64>, f64)> {
        if let Some(d) = &self.dash_array {
            return Some((d.dashes.clone(), d.offset));
        }
        match self.line_type {
            LineType::Solid => None,
            t => Some((t.dashes().iter().map(|&d| d as f64 * unit).collect(), 0.0)),
        }
    }

    /// Solid and connected with no dash array.
    pub fn is_plain_line(&self) -> bool {
        self.line_type == LineType::Solid && self.dash_array.is_none() && self.points_are_connected
    }
}

/// The save/restore stack. Never empty.
#[derive(Clone, Debug)]
pub struct StateStack {
    frames: Vec<DrawState>,
}

impl StateStack {
    pub fn new(base: DrawState) -> Self {
        StateStack { frames: vec![base] }
    }

    pub fn top(&self) -> &DrawState {
        &self.frames[self.frames.len() - 1]
    }

    pub fn top_mut(&mut self) -> &mut DrawState {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self) {
        let child = self.top().child();
        self.frames.push(child);
    }

    /// Drop the top frame. The caller ends any pending path first.
    pub fn pop(&mut self) -> Result<DrawState, PlotError> {
        if self.frames.len() <= 1 {
            return Err(PlotError::StateUnderflow);
        }
        self.frames.pop().ok_or(PlotError::StateUnderflow)
    }
}
