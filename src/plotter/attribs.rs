//! Drawing attributes of the top state.
//!
//! Every setter except `orientation` and the font calls first paints the
//! path under construction, so that a path is drawn with the attributes it
//! was built under. Bad values fall back to the documented defaults.

use super::{Plotter, supported_fill_rule};
use crate::color::{desaturate, emulate_gray};
use crate::errors::{PlotError, Warning};
use crate::state::DEFAULT_MITER_LIMIT;
use crate::state::DashArray;
use crate::state::modes::{CapStyle, FillRule, JoinStyle, LineMode, LineType};
use crate::types::Rgb48;

impl Plotter {
    // ------------------------------------------------------------------
    // Line and fill modes
    // ------------------------------------------------------------------

    /// Line style by name; `"disconnected"` draws only the vertices.
    /// Clears any dash array.
    pub fn linemod(&mut self, mode: &str) -> Result<(), PlotError> {
        self.check_open("linemod")?;
        self.endpath()?;
        let mode = mode.parse::<LineMode>().unwrap_or_default();
        let state = self.stack.top_mut();
        state.line_type = mode.line_type;
        state.points_are_connected = mode.connected;
        state.dash_array = None;
        Ok(())
    }

    pub fn capmod(&mut self, mode: &str) -> Result<(), PlotError> {
        self.check_open("capmod")?;
        self.endpath()?;
        self.stack.top_mut().cap = mode.parse::<CapStyle>().unwrap_or_default();
        Ok(())
    }

    pub fn joinmod(&mut self, mode: &str) -> Result<(), PlotError> {
        self.check_open("joinmod")?;
        self.endpath()?;
        self.stack.top_mut().join = mode.parse::<JoinStyle>().unwrap_or_default();
        Ok(())
    }

    /// Miter limit; values below 1 restore the default.
    pub fn fmiterlimit(&mut self, limit: f64) -> Result<(), PlotError> {
        self.check_open("fmiterlimit")?;
        self.endpath()?;
        self.stack.top_mut().miter_limit = if limit < 1.0 { DEFAULT_MITER_LIMIT } else { limit };
        Ok(())
    }

    /// Fill rule by name, substituted if the backend lacks it.
    pub fn fillmod(&mut self, rule: &str) -> Result<(), PlotError> {
        self.check_open("fillmod")?;
        self.endpath()?;
        let rule = rule.parse::<FillRule>().unwrap_or_default();
        let (rule, substituted) = supported_fill_rule(self.caps, rule);
        if let Some(w) = substituted {
            self.warnings.emit(w);
        }
        self.stack.top_mut().fill_rule = rule;
        Ok(())
    }

    /// Direction of boxes, circles and ellipses: 1 counterclockwise, -1
    /// clockwise. Anything else means 1.
    pub fn orientation(&mut self, direction: i32) -> Result<(), PlotError> {
        self.check_open("orientation")?;
        self.stack.top_mut().orientation = if direction == -1 { -1 } else { 1 };
        Ok(())
    }

    /// Line width in user units; negative restores the default.
    pub fn flinewidth(&mut self, width: f64) -> Result<(), PlotError> {
        self.check_open("flinewidth")?;
        self.endpath()?;
        let state = self.stack.top_mut();
        if width < 0.0 {
            let w = state.default_line_width;
            state.set_line_width(w);
            state.line_width_is_default = true;
        } else {
            state.set_line_width(width);
            state.line_width_is_default = false;
        }
        self.linewidth_invoked = true;
        Ok(())
    }

    /// Dash pattern in user units, overriding the line type. An empty
    /// pattern draws solid lines.
    pub fn flinedash(&mut self, dashes: &[f64], offset: f64) -> Result<(), PlotError> {
        self.check_open("flinedash")?;
        if dashes.iter().any(|&d| d < 0.0) {
            return Err(PlotError::InvalidDash);
        }
        self.endpath()?;
        let state = self.stack.top_mut();
        state.points_are_connected = true;
        if dashes.is_empty() {
            state.line_type = LineType::Solid;
            state.dash_array = None;
        } else {
            state.dash_array = Some(DashArray {
                dashes: dashes.to_vec(),
                offset,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pen and fill
    // ------------------------------------------------------------------

    /// Fill level: 0 unfilled, 1 the fill color itself, up to 0xffff for
    /// white. Out-of-range levels mean 0.
    pub fn filltype(&mut self, level: i32) -> Result<(), PlotError> {
        self.check_open("filltype")?;
        self.endpath()?;
        let level = if (0..=0xffff).contains(&level) { level } else { 0 };
        let state = self.stack.top_mut();
        state.fill_type = level;
        if level != 0 {
            state.fill_color = desaturate(state.fill_color_base, level);
        }
        Ok(())
    }

    /// 0 for no pen; out-of-range values mean 1.
    pub fn pentype(&mut self, level: i32) -> Result<(), PlotError> {
        self.check_open("pentype")?;
        self.endpath()?;
        self.stack.top_mut().pen_type = if (0..=0xffff).contains(&level) { level } else { 1 };
        Ok(())
    }

    // ------------------------------------------------------------------
    // Colors
    // ------------------------------------------------------------------

    fn color_value(&self, red: i32, green: i32, blue: i32, default: Rgb48) -> Rgb48 {
        let c = Rgb48::checked(red, green, blue).unwrap_or(default);
        if self.params.emulate_color { emulate_gray(c) } else { c }
    }

    fn named_color(&mut self, name: &str, default: Rgb48) -> Rgb48 {
        match self.color_cache.resolve(name, self.color_names.as_ref()) {
            Some(c) => c,
            None => {
                self.warnings.emit(Warning::UnknownColor { name: name.to_string() });
                default
            }
        }
    }

    /// Pen color, 16 bits per component.
    pub fn pencolor(&mut self, red: i32, green: i32, blue: i32) -> Result<(), PlotError> {
        self.check_open("pencolor")?;
        self.endpath()?;
        let c = self.color_value(red, green, blue, Rgb48::BLACK);
        self.stack.top_mut().fg_color = c;
        Ok(())
    }

    /// Fill color before desaturation by the fill level.
    pub fn fillcolor(&mut self, red: i32, green: i32, blue: i32) -> Result<(), PlotError> {
        self.check_open("fillcolor")?;
        self.endpath()?;
        let c = self.color_value(red, green, blue, Rgb48::BLACK);
        let state = self.stack.top_mut();
        state.fill_color_base = c;
        if state.fill_type != 0 {
            state.fill_color = desaturate(c, state.fill_type);
        }
        Ok(())
    }

    pub fn bgcolor(&mut self, red: i32, green: i32, blue: i32) -> Result<(), PlotError> {
        self.check_open("bgcolor")?;
        self.endpath()?;
        let c = self.color_value(red, green, blue, Rgb48::WHITE);
        let state = self.stack.top_mut();
        state.bg_color = c;
        state.bg_color_suppressed = false;
        Ok(())
    }

    /// Pen and fill color together.
    pub fn color(&mut self, red: i32, green: i32, blue: i32) -> Result<(), PlotError> {
        self.check_open("color")?;
        self.pencolor(red, green, blue)?;
        self.fillcolor(red, green, blue)
    }

    pub fn pencolorname(&mut self, name: &str) -> Result<(), PlotError> {
        self.check_open("pencolorname")?;
        let c = self.named_color(name, Rgb48::BLACK);
        self.pencolor(c.red.into(), c.green.into(), c.blue.into())
    }

    pub fn fillcolorname(&mut self, name: &str) -> Result<(), PlotError> {
        self.check_open("fillcolorname")?;
        let c = self.named_color(name, Rgb48::BLACK);
        self.fillcolor(c.red.into(), c.green.into(), c.blue.into())
    }

    /// Background color by name; `"none"` leaves the background
    /// unpainted where the format allows.
    pub fn bgcolorname(&mut self, name: &str) -> Result<(), PlotError> {
        self.check_open("bgcolorname")?;
        if name.eq_ignore_ascii_case("none") {
            self.bgcolor(0xffff, 0xffff, 0xffff)?;
            self.stack.top_mut().bg_color_suppressed = true;
            return Ok(());
        }
        let c = self.named_color(name, Rgb48::WHITE);
        self.bgcolor(c.red.into(), c.green.into(), c.blue.into())
    }

    pub fn colorname(&mut self, name: &str) -> Result<(), PlotError> {
        self.check_open("colorname")?;
        self.pencolorname(name)?;
        self.fillcolorname(name)
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    // Font state never reaches a painted path, so none of these end it.

    /// Select a typeface. Unknown names fall back to the backend's
    /// default font. Returns the font size.
    pub fn fontname(&mut self, name: &str) -> Result<f64, PlotError> {
        self.check_open("fontname")?;
        let default = self.caps.default_font;
        let chosen = if self.fonts.has_typeface(name) {
            name.to_string()
        } else {
            self.warnings.emit(Warning::UnknownFont {
                name: name.to_string(),
                substitute: default.to_string(),
            });
            default.to_string()
        };
        let state = self.stack.top_mut();
        state.font_name = chosen;
        Ok(state.font_size)
    }

    /// Font size in user units; negative restores the default. Returns the
    /// size in effect.
    pub fn ffontsize(&mut self, size: f64) -> Result<f64, PlotError> {
        self.check_open("ffontsize")?;
        let state = self.stack.top_mut();
        if size < 0.0 {
            state.font_size = state.default_font_size;
            state.font_size_is_default = true;
        } else {
            state.font_size = size;
            state.font_size_is_default = false;
        }
        let size = state.font_size;
        self.fontsize_invoked = true;
        Ok(size)
    }

    /// Text rotation in degrees counterclockwise. Returns the font size.
    pub fn ftextangle(&mut self, angle: f64) -> Result<f64, PlotError> {
        self.check_open("ftextangle")?;
        let state = self.stack.top_mut();
        state.text_rotation = angle;
        Ok(state.font_size)
    }

    /// Width of `text` in user units, in the current font and size.
    pub fn flabelwidth(&self, text: &str) -> Result<f64, PlotError> {
        self.check_open("flabelwidth")?;
        let state = self.stack.top();
        Ok(self.fonts.text_width(&state.font_name, text) * state.font_size)
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::PlotterKind;
    use crate::errors::{PlotError, Warning};
    use crate::params::PlotterParams;
    use crate::plotter::Plotter;
    use crate::plotter::tests::plotter;
    use crate::state::DEFAULT_MITER_LIMIT;
    use crate::state::modes::{CapStyle, FillRule, JoinStyle, LineType};
    use crate::types::Rgb48;

    // ==================== Mode tests ====================

    #[test]
    fn defaults_after_open() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        let s = pl.state();
        assert_eq!(s.fill_rule, FillRule::EvenOdd);
        assert_eq!(s.line_type, LineType::Solid);
        assert_eq!(s.cap, CapStyle::Butt);
        assert_eq!(s.join, JoinStyle::Miter);
        assert_eq!(s.miter_limit, DEFAULT_MITER_LIMIT);
        assert_eq!((s.pen_type, s.fill_type), (1, 0));
        assert_eq!(s.fg_color, Rgb48::BLACK);
        assert_eq!(s.bg_color, Rgb48::WHITE);
    }

    #[test]
    fn unknown_modes_fall_back() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.linemod("dotted").unwrap();
        pl.linemod("wiggly").unwrap();
        assert_eq!(pl.state().line_type, LineType::Solid);
        pl.capmod("round").unwrap();
        pl.capmod("pointy").unwrap();
        assert_eq!(pl.state().cap, CapStyle::Butt);
        pl.joinmod("mitre").unwrap();
        assert_eq!(pl.state().join, JoinStyle::Miter);
        pl.fmiterlimit(0.5).unwrap();
        assert_eq!(pl.state().miter_limit, DEFAULT_MITER_LIMIT);
    }

    #[test]
    fn linemod_clears_the_dash_array() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.flinedash(&[0.1, 0.05], 0.0).unwrap();
        assert!(pl.state().dash_array.is_some());
        pl.linemod("solid").unwrap();
        assert!(pl.state().dash_array.is_none());
    }

    #[test]
    fn negative_dash_is_refused_and_changes_nothing() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.flinedash(&[0.1, 0.05], 0.0).unwrap();
        let before = pl.state().dash_array.clone();
        assert!(matches!(pl.flinedash(&[0.1, -1.0], 0.0), Err(PlotError::InvalidDash)));
        assert_eq!(pl.state().dash_array, before);
    }

    #[test]
    fn fill_rule_is_adjusted_to_the_backend() {
        let (mut pl, _) = plotter(PlotterKind::Cgm);
        pl.open().unwrap();
        pl.fillmod("winding").unwrap();
        assert_eq!(pl.state().fill_rule, FillRule::EvenOdd);
        pl.fillmod("winding").unwrap();
        let fill_warnings = pl
            .warnings()
            .iter()
            .filter(|w| matches!(w, Warning::FillRuleUnsupported { .. }))
            .count();
        assert_eq!(fill_warnings, 1);
    }

    #[test]
    fn orientation_keeps_the_path() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fline(0.0, 0.0, 1.0, 1.0).unwrap();
        pl.orientation(-1).unwrap();
        assert!(pl.state().path.is_some());
        assert_eq!(pl.state().orientation, -1);
        pl.orientation(7).unwrap();
        assert_eq!(pl.state().orientation, 1);
    }

    // ==================== Line width tests ====================

    #[test]
    fn line_width_is_quantized_with_a_floor() {
        let (mut pl, _) = plotter(PlotterKind::Gif);
        pl.open().unwrap();
        pl.fspace(0.0, 0.0, 570.0, 570.0).unwrap();
        pl.flinewidth(0.2).unwrap();
        assert_eq!(pl.state().quantized_device_line_width, 1);
        pl.flinewidth(2.6).unwrap();
        assert_eq!(pl.state().quantized_device_line_width, 3);
        pl.flinewidth(-1.0).unwrap();
        assert_eq!(pl.state().line_width, 0.0);
        assert!(pl.state().line_width_is_default);
    }

    // ==================== Color tests ====================

    #[test]
    fn half_fill_of_black_is_mid_gray() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fillcolor(0, 0, 0).unwrap();
        pl.filltype(0x8000).unwrap();
        let c = pl.state().fill_color;
        for v in [c.red, c.green, c.blue] {
            assert!((v as i32 - 32767).abs() <= 1, "{v}");
        }
    }

    #[test]
    fn fill_color_tracks_later_fill_levels() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fillcolorname("red").unwrap();
        pl.filltype(1).unwrap();
        assert_eq!(pl.state().fill_color, Rgb48::new(0xffff, 0, 0));
        pl.filltype(0xffff).unwrap();
        assert_eq!(pl.state().fill_color, Rgb48::WHITE);
        pl.filltype(-3).unwrap();
        assert_eq!(pl.state().fill_type, 0);
    }

    #[test]
    fn out_of_range_components_reset_to_default() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.pencolor(0x10000, 0, 0).unwrap();
        assert_eq!(pl.state().fg_color, Rgb48::BLACK);
        pl.bgcolor(0, 0x10000, 0).unwrap();
        assert_eq!(pl.state().bg_color, Rgb48::WHITE);
        pl.pentype(-2).unwrap();
        assert_eq!(pl.state().pen_type, 1);
    }

    #[test]
    fn emulated_color_is_gray() {
        let mut params = PlotterParams::new();
        params.set("EMULATE_COLOR", "yes").unwrap();
        let mut pl = Plotter::new(PlotterKind::Svg, params, Vec::new());
        pl.open().unwrap();
        pl.pencolor(0xffff, 0, 0).unwrap();
        let c = pl.state().fg_color;
        assert_eq!(c.red, c.green);
        assert_eq!(c.red, (0.212671f64 * 65535.0).round() as u16);
    }

    #[test]
    fn unknown_color_names_warn_once() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.pencolorname("Yellow Green").unwrap();
        assert_ne!(pl.state().fg_color, Rgb48::BLACK);
        pl.pencolorname("chartreuse-ish").unwrap();
        pl.pencolorname("chartreuse-ish").unwrap();
        assert_eq!(pl.state().fg_color, Rgb48::BLACK);
        assert_eq!(
            pl.warnings(),
            [Warning::UnknownColor {
                name: "chartreuse-ish".into()
            }]
        );
    }

    #[test]
    fn hex_color_names_widen_by_replication() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.colorname("#ff8001").unwrap();
        assert_eq!(pl.state().fg_color, Rgb48::new(0xffff, 0x8080, 0x0101));
        assert_eq!(pl.state().fill_color_base, pl.state().fg_color);
    }

    #[test]
    fn background_none_is_suppressed() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.bgcolorname("none").unwrap();
        assert!(pl.state().bg_color_suppressed);
        pl.bgcolorname("blue").unwrap();
        assert!(!pl.state().bg_color_suppressed);
        assert_eq!(pl.state().bg_color, Rgb48::new(0, 0, 0xffff));
    }

    // ==================== Font tests ====================

    #[test]
    fn unknown_font_falls_back_to_the_default() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fontname("Courier").unwrap();
        assert_eq!(pl.state().font_name, "Courier");
        pl.fontname("Comic Sans").unwrap();
        assert_eq!(pl.state().font_name, "Helvetica");
        assert!(matches!(pl.warnings(), [Warning::UnknownFont { .. }]));
    }

    #[test]
    fn font_calls_leave_the_path_open() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fline(0.1, 0.1, 0.5, 0.5).unwrap();
        pl.fontname("Courier").unwrap();
        pl.ffontsize(0.05).unwrap();
        pl.ftextangle(30.0).unwrap();
        pl.fcont(0.9, 0.1).unwrap();
        assert_eq!(pl.state().path.as_ref().map(|p| p.len()), Some(3));
        assert!(!pl.page().body_str().contains("<polyline"));
    }

    #[test]
    fn label_width_scales_with_font_size() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fontname("Courier").unwrap();
        assert_eq!(pl.ffontsize(10.0).unwrap(), 10.0);
        let w = pl.flabelwidth("abcd").unwrap();
        assert!((w - 24.0).abs() < 1e-9);
        let default = pl.ffontsize(-1.0).unwrap();
        assert!((default - 0.02).abs() < 1e-12);
    }
}
