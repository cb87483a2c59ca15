//! User coordinate frames.

use glam::dvec2;

use super::Plotter;
use crate::caps::CoordKind;
use crate::errors::PlotError;
use crate::matrix::Affine;
use crate::state::Transform;

/// Default line width as a fraction of the NDC square.
const DEFAULT_LINE_WIDTH_FRACTION: f64 = 1.0 / 850.0;
/// Default font size as a fraction of the NDC square.
const DEFAULT_FONT_SIZE_FRACTION: f64 = 1.0 / 50.0;

impl Plotter {
    /// Map the user rectangle `(x0, y0)`–`(x1, y1)` onto the NDC square.
    pub fn fspace(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) -> Result<(), PlotError> {
        self.check_open("fspace")?;
        self.fspace2(x0, y0, x1, y0, x0, y1)
    }

    /// Map the user parallelogram with corners `p0`, `p1`, `p2` onto the
    /// NDC square, `p0` going to the lower left.
    pub fn fspace2(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<(), PlotError> {
        self.check_open("fspace2")?;
        let m = Affine::from_parallelogram(dvec2(x0, y0), dvec2(x1, y1), dvec2(x2, y2))?;
        let [a, b, c, d, e, f] = m.0;
        self.fsetmatrix(a, b, c, d, e, f)
    }

    /// Set the user → NDC map outright.
    ///
    /// The default line width and font size track the new map until the
    /// caller sets them explicitly on this page.
    pub fn fsetmatrix(&mut self, m0: f64, m1: f64, m2: f64, m3: f64, m4: f64, m5: f64) -> Result<(), PlotError> {
        self.check_open("fsetmatrix")?;
        self.endpath()?;
        let user_to_ndc = Affine::new(m0, m1, m2, m3, m4, m5);
        let norm = user_to_ndc.norm();
        let integer_pixels = self.caps.coords == CoordKind::IntegerPixels;
        let state = self.stack.top_mut();
        state.transform = Transform::new(user_to_ndc, &self.ndc_to_device, self.caps.flipped_y);
        state.default_line_width = if integer_pixels || norm == 0.0 {
            0.0
        } else {
            DEFAULT_LINE_WIDTH_FRACTION / norm
        };
        state.default_font_size = if norm == 0.0 { 0.0 } else { DEFAULT_FONT_SIZE_FRACTION / norm };

        if self.linewidth_invoked {
            let w = state.line_width;
            state.set_line_width(w);
        } else {
            let w = state.default_line_width;
            state.set_line_width(w);
            state.line_width_is_default = true;
        }
        if !self.fontsize_invoked {
            state.font_size = state.default_font_size;
            state.font_size_is_default = true;
        }
        self.stream_live()
    }

    /// Apply `m` before the current map.
    pub fn fconcat(&mut self, m0: f64, m1: f64, m2: f64, m3: f64, m4: f64, m5: f64) -> Result<(), PlotError> {
        self.check_open("fconcat")?;
        let s = Affine::new(m0, m1, m2, m3, m4, m5) * self.stack.top().transform.user_to_ndc;
        let [a, b, c, d, e, f] = s.0;
        self.fsetmatrix(a, b, c, d, e, f)
    }
}
