//! Error and warning types with diagnostics using miette
//!
//! Only caller misuse and I/O failure are surfaced as [`PlotError`]. Every
//! other problem is recovered locally and reported as a [`Warning`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::log::warn;

// ============================================================================
// Caller-visible errors
// ============================================================================

/// Errors returned from [`crate::Plotter`] operations
#[derive(Error, Diagnostic, Debug)]
pub enum PlotError {
    #[error("{op}: plotter is not open")]
    #[diagnostic(
        code(plotkit::not_open),
        help("call `open()` before drawing, and after every `close()`")
    )]
    NotOpen { op: &'static str },

    #[error("openpl: plotter is already open")]
    #[diagnostic(code(plotkit::already_open))]
    AlreadyOpen,

    #[error("restorestate: cannot pop the last drawing state")]
    #[diagnostic(
        code(plotkit::state_underflow),
        help("every `restorestate` must match an earlier `savestate`")
    )]
    StateUnderflow,

    #[error("linedash: dash lengths must be non-negative")]
    #[diagnostic(code(plotkit::invalid_dash))]
    InvalidDash,

    #[error("unknown parameter {name} = {value:?}")]
    #[diagnostic(code(plotkit::bad_parameter))]
    BadParameter { name: String, value: String },

    #[error("the requested singular affine transformation cannot be performed")]
    #[diagnostic(code(plotkit::singular_transform))]
    SingularTransform(#[from] Singular),

    #[error("output stream failed")]
    #[diagnostic(
        code(plotkit::io),
        help("the document is incomplete; the plotter must be reopened")
    )]
    Io(#[from] std::io::Error),
}

/// A string-keyed mode that did not match any known value.
///
/// Returned by the `FromStr` impls in [`crate::state::modes`]; the caller
/// substitutes the documented default.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized {kind}: {value:?}")]
#[diagnostic(code(plotkit::unrecognized_mode))]
pub struct UnrecognizedMode {
    pub kind: &'static str,
    pub value: String,
}

/// The matrix has a zero determinant.
#[derive(Error, Diagnostic, Debug, Clone, Copy, PartialEq, Eq)]
#[error("matrix is singular")]
#[diagnostic(code(plotkit::singular))]
pub struct Singular;

// ============================================================================
// Warnings
// ============================================================================

/// Non-fatal conditions, recovered inside the plotter.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
#[diagnostic(severity(Warning))]
pub enum Warning {
    #[error("{what} truncated to fit the device")]
    #[diagnostic(code(plotkit::warn::truncated))]
    Truncated { what: &'static str },

    #[error("color table exhausted, using nearest colors")]
    #[diagnostic(code(plotkit::warn::palette_full))]
    PaletteFull,

    #[error("color name \"{name}\" not recognized, substituting default")]
    #[diagnostic(code(plotkit::warn::unknown_color))]
    UnknownColor { name: String },

    #[error("{rule} fill rule not supported, substituting {substitute}")]
    #[diagnostic(code(plotkit::warn::fill_rule))]
    FillRuleUnsupported {
        rule: &'static str,
        substitute: &'static str,
    },

    #[error("font \"{name}\" not available, substituting {substitute}")]
    #[diagnostic(code(plotkit::warn::unknown_font))]
    UnknownFont { name: String, substitute: String },

    #[error("parameter {name} has bad value {value:?}, using default")]
    #[diagnostic(code(plotkit::warn::bad_parameter_value))]
    BadParameterValue { name: &'static str, value: String },

    #[error("{what}")]
    #[diagnostic(code(plotkit::warn::other))]
    Other { what: String },
}

impl Warning {
    /// Key under which a one-time warning is deduplicated, if it is one.
    fn once_key(&self) -> Option<String> {
        match self {
            Warning::PaletteFull => Some("palette".into()),
            Warning::UnknownColor { name } => Some(format!("color:{name}")),
            Warning::FillRuleUnsupported { rule, .. } => Some(format!("fill:{rule}")),
            Warning::UnknownFont { name, .. } => Some(format!("font:{name}")),
            _ => None,
        }
    }
}

/// Callback receiving every warning that is not suppressed.
pub type WarningHandler = Arc<dyn Fn(&Warning) + Send + Sync>;

/// Per-instance warning log with warn-once deduplication.
#[derive(Default, Clone)]
pub struct Warnings {
    issued: Vec<Warning>,
    seen: HashSet<String>,
    handler: Option<WarningHandler>,
}

impl fmt::Debug for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Warnings")
            .field("issued", &self.issued)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl Warnings {
    pub fn new(handler: Option<WarningHandler>) -> Self {
        Warnings {
            handler,
            ..Default::default()
        }
    }

    /// Record a warning. Returns false if it was suppressed as a repeat.
    pub fn emit(&mut self, w: Warning) -> bool {
        if let Some(key) = w.once_key()
            && !self.seen.insert(key)
        {
            return false;
        }
        warn!(warning = %w, "plotter warning");
        if let Some(handler) = &self.handler {
            handler(&w);
        }
        self.issued.push(w);
        true
    }

    pub fn issued(&self) -> &[Warning] {
        &self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn one_time_warnings_are_deduplicated() {
        let mut w = Warnings::default();
        assert!(w.emit(Warning::PaletteFull));
        assert!(!w.emit(Warning::PaletteFull));
        assert!(w.emit(Warning::UnknownColor { name: "foo".into() }));
        assert!(w.emit(Warning::UnknownColor { name: "bar".into() }));
        assert!(!w.emit(Warning::UnknownColor { name: "foo".into() }));
        assert_eq!(w.issued().len(), 3);
    }

    #[test]
    fn truncation_warnings_repeat() {
        let mut w = Warnings::default();
        w.emit(Warning::Truncated { what: "polyline" });
        w.emit(Warning::Truncated { what: "polyline" });
        assert_eq!(w.issued().len(), 2);
    }

    #[test]
    fn handler_sees_each_warning() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut w = Warnings::new(Some(Arc::new(move |w: &Warning| {
            sink.lock().unwrap().push(w.to_string());
        })));
        w.emit(Warning::PaletteFull);
        w.emit(Warning::PaletteFull);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("exhausted"));
    }

    #[test]
    fn errors_carry_operation_names() {
        let e = PlotError::NotOpen { op: "fline" };
        assert_eq!(e.to_string(), "fline: plotter is not open");
        let m = UnrecognizedMode { kind: "cap mode", value: "pointy".into() };
        assert_eq!(m.to_string(), "unrecognized cap mode: \"pointy\"");
    }
}
