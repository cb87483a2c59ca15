//! Static capability tables, one per backend.
//!
//! The painting template reads these to decide what a backend can draw
//! natively and what must be flattened first.

use crate::state::Transform;

/// Tri-state capability. `Maybe` means the backend records the request
/// and lets a later consumer decide (the metafile does this).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Support {
    No,
    Yes,
    Maybe,
}

impl Support {
    pub fn any(self) -> bool {
        self != Support::No
    }
}

/// Which user → device maps leave a native primitive drawable as such.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scaling {
    None,
    AxesPreserved,
    Uniform,
    Any,
}

impl Scaling {
    pub fn permits(self, t: &Transform) -> bool {
        match self {
            Scaling::None => false,
            Scaling::AxesPreserved => t.axes_preserved,
            Scaling::Uniform => t.uniform,
            Scaling::Any => true,
        }
    }
}

/// How device coordinates are represented in the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordKind {
    Real,
    /// Integer pixels drawn by the scan converter, where a zero-width line
    /// is one pixel wide.
    IntegerPixels,
    Integer,
}

impl CoordKind {
    pub fn is_integer(self) -> bool {
        self != CoordKind::Real
    }
}

/// When and how page output reaches the byte sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputModel {
    None,
    OnePage,
    OnePageAtATime,
    PagesAllAtOnce,
    RealTime,
    Custom,
    NonStream,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub name: &'static str,
    pub have_wide_lines: Support,
    pub have_dash_array: Support,
    pub have_solid_fill: Support,
    pub have_odd_winding_fill: Support,
    pub have_nonzero_winding_fill: Support,
    pub have_settable_bg: Support,
    pub have_mixed_paths: bool,
    pub allowed_arc_scaling: Scaling,
    pub allowed_ellarc_scaling: Scaling,
    pub allowed_quad_scaling: Scaling,
    pub allowed_cubic_scaling: Scaling,
    pub allowed_box_scaling: Scaling,
    pub allowed_circle_scaling: Scaling,
    pub allowed_ellipse_scaling: Scaling,
    pub default_font: &'static str,
    /// Fixed limit, overriding `MAX_LINE_LENGTH`.
    pub max_unfilled_path_length: Option<usize>,
    pub output_model: OutputModel,
    pub coords: CoordKind,
    pub flipped_y: bool,
}

const BASE: Capabilities = Capabilities {
    name: "generic",
    have_wide_lines: Support::Yes,
    have_dash_array: Support::Yes,
    have_solid_fill: Support::Yes,
    have_odd_winding_fill: Support::Yes,
    have_nonzero_winding_fill: Support::Yes,
    have_settable_bg: Support::No,
    have_mixed_paths: false,
    allowed_arc_scaling: Scaling::None,
    allowed_ellarc_scaling: Scaling::None,
    allowed_quad_scaling: Scaling::None,
    allowed_cubic_scaling: Scaling::None,
    allowed_box_scaling: Scaling::None,
    allowed_circle_scaling: Scaling::None,
    allowed_ellipse_scaling: Scaling::None,
    default_font: "HersheySerif",
    max_unfilled_path_length: None,
    output_model: OutputModel::None,
    coords: CoordKind::Real,
    flipped_y: false,
};

pub const SVG: Capabilities = Capabilities {
    name: "svg",
    have_settable_bg: Support::Yes,
    have_mixed_paths: true,
    allowed_arc_scaling: Scaling::Any,
    allowed_ellarc_scaling: Scaling::Any,
    allowed_quad_scaling: Scaling::Any,
    allowed_cubic_scaling: Scaling::Any,
    allowed_box_scaling: Scaling::Any,
    allowed_circle_scaling: Scaling::Any,
    allowed_ellipse_scaling: Scaling::Any,
    default_font: "Helvetica",
    output_model: OutputModel::OnePage,
    flipped_y: true,
    ..BASE
};

pub const PS: Capabilities = Capabilities {
    name: "ps",
    allowed_box_scaling: Scaling::Any,
    allowed_circle_scaling: Scaling::Any,
    allowed_ellipse_scaling: Scaling::Any,
    default_font: "Helvetica",
    output_model: OutputModel::PagesAllAtOnce,
    ..BASE
};

pub const FIG: Capabilities = Capabilities {
    name: "fig",
    have_dash_array: Support::No,
    have_nonzero_winding_fill: Support::No,
    allowed_arc_scaling: Scaling::Uniform,
    allowed_box_scaling: Scaling::AxesPreserved,
    allowed_circle_scaling: Scaling::Uniform,
    allowed_ellipse_scaling: Scaling::Any,
    default_font: "Helvetica",
    output_model: OutputModel::OnePage,
    coords: CoordKind::Integer,
    flipped_y: true,
    ..BASE
};

pub const HPGL2: Capabilities = Capabilities {
    name: "hpgl",
    have_mixed_paths: true,
    allowed_arc_scaling: Scaling::Uniform,
    // BZ takes device control points, so any affine map keeps a cubic
    allowed_cubic_scaling: Scaling::Any,
    allowed_box_scaling: Scaling::AxesPreserved,
    allowed_circle_scaling: Scaling::Uniform,
    default_font: "HersheySerif",
    output_model: OutputModel::OnePageAtATime,
    coords: CoordKind::Integer,
    ..BASE
};

/// HP-GL/1.5: no wide lines, dashing or Beziers, and only even-odd solid
/// fill.
pub const HPGL15: Capabilities = Capabilities {
    have_wide_lines: Support::No,
    allowed_cubic_scaling: Scaling::None,
    have_dash_array: Support::No,
    have_nonzero_winding_fill: Support::No,
    ..HPGL2
};

/// HP-GL/1: as 1.5, without solid fill.
pub const HPGL1: Capabilities = Capabilities {
    have_solid_fill: Support::No,
    ..HPGL15
};

pub const CGM: Capabilities = Capabilities {
    name: "cgm",
    have_dash_array: Support::No,
    have_nonzero_winding_fill: Support::No,
    have_settable_bg: Support::Yes,
    allowed_box_scaling: Scaling::AxesPreserved,
    allowed_circle_scaling: Scaling::Uniform,
    allowed_ellipse_scaling: Scaling::Any,
    default_font: "Helvetica",
    output_model: OutputModel::PagesAllAtOnce,
    coords: CoordKind::Integer,
    ..BASE
};

pub const TEK: Capabilities = Capabilities {
    name: "tek",
    have_wide_lines: Support::No,
    have_dash_array: Support::No,
    have_solid_fill: Support::No,
    max_unfilled_path_length: Some(usize::MAX),
    output_model: OutputModel::RealTime,
    coords: CoordKind::Integer,
    ..BASE
};

pub const REGIS: Capabilities = Capabilities {
    name: "regis",
    have_wide_lines: Support::No,
    have_dash_array: Support::No,
    have_nonzero_winding_fill: Support::No,
    have_settable_bg: Support::Yes,
    allowed_circle_scaling: Scaling::Uniform,
    output_model: OutputModel::RealTime,
    coords: CoordKind::Integer,
    flipped_y: true,
    ..BASE
};

pub const META: Capabilities = Capabilities {
    name: "meta",
    have_wide_lines: Support::Maybe,
    have_dash_array: Support::Maybe,
    have_solid_fill: Support::Maybe,
    have_odd_winding_fill: Support::Maybe,
    have_nonzero_winding_fill: Support::Maybe,
    have_settable_bg: Support::Maybe,
    have_mixed_paths: true,
    allowed_arc_scaling: Scaling::Any,
    allowed_ellarc_scaling: Scaling::Any,
    allowed_quad_scaling: Scaling::Any,
    allowed_cubic_scaling: Scaling::Any,
    allowed_box_scaling: Scaling::Any,
    allowed_circle_scaling: Scaling::Any,
    allowed_ellipse_scaling: Scaling::Any,
    output_model: OutputModel::RealTime,
    ..BASE
};

pub const GIF: Capabilities = Capabilities {
    name: "gif",
    have_settable_bg: Support::Yes,
    allowed_arc_scaling: Scaling::AxesPreserved,
    allowed_ellarc_scaling: Scaling::AxesPreserved,
    allowed_ellipse_scaling: Scaling::AxesPreserved,
    default_font: "HersheySerif",
    output_model: OutputModel::Custom,
    coords: CoordKind::IntegerPixels,
    flipped_y: true,
    ..BASE
};

pub const X11: Capabilities = Capabilities {
    name: "x11",
    have_settable_bg: Support::Yes,
    allowed_arc_scaling: Scaling::AxesPreserved,
    allowed_ellarc_scaling: Scaling::AxesPreserved,
    allowed_ellipse_scaling: Scaling::AxesPreserved,
    default_font: "Helvetica",
    output_model: OutputModel::NonStream,
    coords: CoordKind::IntegerPixels,
    flipped_y: true,
    ..BASE
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Affine;

    #[test]
    fn scaling_classes_follow_transform() {
        let t = Transform::new(Affine::scale(2.0, 1.0), &Affine::IDENTITY, false);
        assert!(Scaling::AxesPreserved.permits(&t));
        assert!(!Scaling::Uniform.permits(&t));
        assert!(Scaling::Any.permits(&t));
        assert!(!Scaling::None.permits(&t));

        let r = Transform::new(Affine::rotate(30.0), &Affine::IDENTITY, false);
        assert!(!Scaling::AxesPreserved.permits(&r));
        assert!(Scaling::Uniform.permits(&r));
    }

    #[test]
    fn hpgl_versions_degrade() {
        assert_eq!(HPGL2.have_solid_fill, Support::Yes);
        assert_eq!(HPGL15.have_solid_fill, Support::Yes);
        assert_eq!(HPGL1.have_solid_fill, Support::No);
        assert_eq!(HPGL1.have_wide_lines, Support::No);
        assert!(HPGL1.have_mixed_paths);
    }

    #[test]
    fn metafile_defers_everything() {
        assert_eq!(META.have_wide_lines, Support::Maybe);
        assert!(META.have_dash_array.any());
        assert_eq!(META.allowed_cubic_scaling, Scaling::Any);
    }
}
