//! The plotter: one drawing model in front of any backend.
//!
//! A [`Plotter`] owns a backend, the drawing-state stack, the page buffer
//! and the byte sink. The operations follow the classic libplot calling
//! surface: lifecycle calls bracket pages, coordinate calls set the user
//! frame, path calls build a compound path that is painted when it ends,
//! and attribute calls modify the top drawing state.
//!
//! When and how bytes reach the sink depends on the backend's
//! [`OutputModel`].

mod attribs;
mod path_ops;
mod space;

use std::io::Write;

use crate::backend::{Backend, Backends, Cx, PlotterKind};
use crate::caps::{Capabilities, OutputModel, Support};
use crate::collab::{BuiltinMetrics, FontMetrics};
use crate::color::{BuiltinColors, ColorNameCache, ColorNames};
use crate::errors::{PlotError, Warning, Warnings};
use crate::log::debug;
use crate::matrix::Affine;
use crate::outbuf::{Document, PageBuffer};
use crate::params::PlotterParams;
use crate::registry::{self, SharedSink};
use crate::state::modes::FillRule;
use crate::state::{DrawState, StateStack};

/// A plotter instance writing one output format to one byte sink.
pub struct Plotter {
    id: usize,
    backend: Backends,
    caps: &'static Capabilities,
    params: PlotterParams,
    sink: SharedSink,
    fonts: Box<dyn FontMetrics>,
    color_names: Box<dyn ColorNames>,
    color_cache: ColorNameCache,
    warnings: Warnings,

    stack: StateStack,
    page: PageBuffer,
    document: Document,
    document_pending: bool,
    ndc_to_device: Affine,

    open: bool,
    page_number: u32,
    linewidth_invoked: bool,
    fontsize_invoked: bool,
}

impl std::fmt::Debug for Plotter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plotter")
            .field("id", &self.id)
            .field("backend", &self.caps.name)
            .field("open", &self.open)
            .field("page_number", &self.page_number)
            .field("depth", &self.stack.depth())
            .finish()
    }
}

impl Plotter {
    /// A plotter of `kind` writing to `sink`.
    pub fn new(kind: PlotterKind, params: PlotterParams, sink: impl Write + Send + 'static) -> Self {
        let backend = Backends::new(kind, &params);
        Self::with_backend(backend, params, registry::shared_sink(sink))
    }

    /// A plotter around an already configured backend, such as an
    /// [`crate::backend::X11Backend`] with its own request sink.
    pub fn with_backend(backend: Backends, mut params: PlotterParams, sink: SharedSink) -> Self {
        let caps = backend.caps();
        let ndc_to_device = backend.device_range(&params).ndc_to_device(params.rotation);
        let mut warnings = Warnings::new(params.warning_handler.clone());
        for w in params.take_pending() {
            warnings.emit(w);
        }
        let id = registry::register(Some(&sink));
        debug!(id, backend = caps.name, "plotter created");
        Plotter {
            id,
            backend,
            caps,
            params,
            sink,
            fonts: Box::new(BuiltinMetrics),
            color_names: Box::new(BuiltinColors),
            color_cache: ColorNameCache::default(),
            warnings,
            stack: StateStack::new(DrawState::with_font(caps.default_font)),
            page: PageBuffer::new(0),
            document: Document::default(),
            document_pending: caps.output_model == OutputModel::PagesAllAtOnce,
            ndc_to_device,
            open: false,
            page_number: 0,
            linewidth_invoked: false,
            fontsize_invoked: false,
        }
    }

    /// Replace the font-metrics collaborator.
    pub fn with_fonts(mut self, fonts: Box<dyn FontMetrics>) -> Self {
        self.fonts = fonts;
        self
    }

    /// Replace the color-name collaborator.
    pub fn with_color_names(mut self, names: Box<dyn ColorNames>) -> Self {
        self.color_names = names;
        self.color_cache = ColorNameCache::default();
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Instance id in the process-wide registry.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn caps(&self) -> &'static Capabilities {
        self.caps
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Pages opened so far, counting from 1.
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// The current drawing state.
    pub fn state(&self) -> &DrawState {
        self.stack.top()
    }

    /// Depth of the save/restore stack; 1 when nothing is saved.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Every warning issued so far, in order.
    pub fn warnings(&self) -> &[Warning] {
        self.warnings.issued()
    }

    pub fn backend(&self) -> &Backends {
        &self.backend
    }

    /// The page being drawn, or the last one closed.
    pub fn page(&self) -> &PageBuffer {
        &self.page
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Begin a page (openpl).
    pub fn open(&mut self) -> Result<(), PlotError> {
        if self.open {
            return Err(PlotError::AlreadyOpen);
        }
        self.page_number += 1;
        self.page = PageBuffer::new(self.page_number);
        self.open = true;
        if self.caps.output_model == OutputModel::PagesAllAtOnce {
            self.document_pending = true;
        }
        self.linewidth_invoked = false;
        self.fontsize_invoked = false;

        let mut state = DrawState::with_font(self.caps.default_font);
        let (rule, substituted) = supported_fill_rule(self.caps, state.fill_rule);
        state.fill_rule = rule;
        if let Some(w) = substituted {
            self.warnings.emit(w);
        }
        self.stack = StateStack::new(state);

        let bg = self.params.bg_color.clone();
        self.bgcolorname(&bg)?;

        debug!(id = self.id, page = self.page_number, "begin page");
        self.run(|b, cx| b.begin_page(cx))?;
        self.fsetmatrix(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
        self.stream_live()
    }

    /// End the page (closepl) and write it out as the output model says.
    pub fn close(&mut self) -> Result<(), PlotError> {
        self.check_open("closepl")?;
        self.endpath()?;
        while self.stack.depth() > 1 {
            self.restorestate()?;
        }
        self.run(|b, cx| b.end_page(cx))?;
        self.open = false;
        debug!(id = self.id, page = self.page_number, "end page");

        match self.caps.output_model {
            OutputModel::None | OutputModel::NonStream => {}
            OutputModel::OnePage => {
                if self.page_number == 1 {
                    let bytes = self.page.assemble();
                    self.write_out(&bytes)?;
                }
                self.flush_sink()?;
            }
            OutputModel::OnePageAtATime => {
                let bytes = self.page.assemble();
                self.write_out(&bytes)?;
                self.flush_sink()?;
            }
            OutputModel::PagesAllAtOnce => {
                let page = std::mem::replace(&mut self.page, PageBuffer::new(self.page_number));
                self.document.pages.push(page);
            }
            OutputModel::RealTime | OutputModel::Custom => {
                let bytes = self.page.take_unstreamed().to_vec();
                self.write_out(&bytes)?;
                self.flush_sink()?;
            }
        }
        Ok(())
    }

    /// Clear the page (erase). Buffered output for the page so far is
    /// discarded; streaming backends emit their clear-screen command.
    pub fn erase(&mut self) -> Result<(), PlotError> {
        self.check_open("erase")?;
        self.endpath()?;
        match self.caps.output_model {
            OutputModel::OnePage | OutputModel::OnePageAtATime | OutputModel::PagesAllAtOnce => {
                self.page.reset();
            }
            _ => {}
        }
        self.run(|b, cx| b.erase_page(cx))?;
        match self.caps.output_model {
            OutputModel::RealTime | OutputModel::Custom => {
                let bytes = self.page.take_unstreamed().to_vec();
                self.write_out(&bytes)?;
                self.flush_sink()
            }
            _ => Ok(()),
        }
    }

    /// Push whatever the backend has produced so far to the sink.
    pub fn flush(&mut self) -> Result<(), PlotError> {
        self.check_open("flushpl")?;
        match self.caps.output_model {
            OutputModel::RealTime | OutputModel::Custom => {
                let bytes = self.page.take_unstreamed().to_vec();
                self.write_out(&bytes)?;
            }
            _ => {}
        }
        self.flush_sink()
    }

    /// Close any open page and write a multi-page document. Called from
    /// `Drop` as well; calling it first lets the caller see I/O errors.
    pub fn finish(&mut self) -> Result<(), PlotError> {
        if self.open {
            self.close()?;
        }
        if self.document_pending {
            self.document_pending = false;
            let (header, trailer) = self.backend.document_framing(&self.document, &self.params);
            let bytes = self.document.assemble(&header, &trailer);
            self.document = Document::default();
            debug!(id = self.id, bytes = bytes.len(), "document written");
            self.write_out(&bytes)?;
        }
        self.flush_sink()
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn check_open(&self, op: &'static str) -> Result<(), PlotError> {
        if self.open { Ok(()) } else { Err(PlotError::NotOpen { op }) }
    }

    /// Run `f` against the backend with a context over the top state.
    fn run<R>(&mut self, f: impl FnOnce(&mut Backends, &mut Cx<'_>) -> Result<R, PlotError>) -> Result<R, PlotError> {
        let Plotter {
            backend,
            stack,
            page,
            warnings,
            params,
            ndc_to_device,
            fonts,
            ..
        } = self;
        let mut cx = Cx {
            state: stack.top(),
            page,
            warnings,
            params,
            ndc_to_device,
            fonts: fonts.as_ref(),
        };
        f(backend, &mut cx)
    }

    /// Real-time backends see their output leave after every operation.
    fn stream_live(&mut self) -> Result<(), PlotError> {
        if self.caps.output_model != OutputModel::RealTime {
            return Ok(());
        }
        let bytes = self.page.take_unstreamed().to_vec();
        if bytes.is_empty() {
            return Ok(());
        }
        self.write_out(&bytes)?;
        self.flush_sink()
    }

    fn write_out(&self, bytes: &[u8]) -> Result<(), PlotError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let mut sink = self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sink.write_all(bytes)?;
        Ok(())
    }

    fn flush_sink(&self) -> Result<(), PlotError> {
        let mut sink = self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sink.flush()?;
        Ok(())
    }
}

impl Drop for Plotter {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            crate::log::warn!(id = self.id, error = %e, "plotter teardown failed");
        }
        registry::unregister(self.id);
    }
}

/// `rule` if the backend can fill with it, else the other rule and the
/// warning to issue.
fn supported_fill_rule(caps: &Capabilities, rule: FillRule) -> (FillRule, Option<Warning>) {
    let support = |r: FillRule| match r {
        FillRule::EvenOdd => caps.have_odd_winding_fill,
        FillRule::NonzeroWinding => caps.have_nonzero_winding_fill,
    };
    if support(rule) != Support::No || support(rule.other()) == Support::No {
        return (rule, None);
    }
    let substitute = rule.other();
    let w = Warning::FillRuleUnsupported {
        rule: rule.name(),
        substitute: substitute.name(),
    };
    (substitute, Some(w))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// A byte sink the test can read back after the plotter wrote to it.
    #[derive(Clone, Default)]
    pub(crate) struct Capture(pub Arc<Mutex<Vec<u8>>>);

    impl Capture {
        pub(crate) fn bytes(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }

        pub(crate) fn text(&self) -> String {
            String::from_utf8_lossy(&self.bytes()).into_owned()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn plotter(kind: PlotterKind) -> (Plotter, Capture) {
        let out = Capture::default();
        (Plotter::new(kind, PlotterParams::new(), out.clone()), out)
    }

    // ==================== Lifecycle tests ====================

    #[test]
    fn drawing_before_open_is_refused() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        assert!(matches!(pl.fline(0.0, 0.0, 1.0, 1.0), Err(PlotError::NotOpen { op: "fline" })));
        assert!(matches!(pl.close(), Err(PlotError::NotOpen { .. })));
    }

    #[test]
    fn open_twice_is_refused() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        assert!(matches!(pl.open(), Err(PlotError::AlreadyOpen)));
        assert!(pl.is_open());
    }

    #[test]
    fn svg_writes_only_the_first_page() {
        let (mut pl, out) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fline(0.1, 0.1, 0.9, 0.9).unwrap();
        pl.close().unwrap();
        let first = out.text();
        assert!(first.contains("<svg"));
        pl.open().unwrap();
        pl.fline(0.1, 0.9, 0.9, 0.1).unwrap();
        pl.close().unwrap();
        assert_eq!(out.text(), first);
        assert_eq!(pl.page_number(), 2);
    }

    #[test]
    fn hpgl_writes_every_page() {
        let (mut pl, out) = plotter(PlotterKind::Hpgl);
        pl.open().unwrap();
        pl.close().unwrap();
        let one = out.bytes().len();
        assert!(one > 0);
        pl.open().unwrap();
        pl.close().unwrap();
        assert_eq!(out.bytes().len(), 2 * one);
    }

    #[test]
    fn postscript_waits_for_finish() {
        let (mut pl, out) = plotter(PlotterKind::Ps);
        pl.open().unwrap();
        pl.fbox(0.2, 0.2, 0.8, 0.8).unwrap();
        pl.close().unwrap();
        pl.open().unwrap();
        pl.close().unwrap();
        assert!(out.bytes().is_empty());
        pl.finish().unwrap();
        let text = out.text();
        assert!(text.starts_with("%!PS-Adobe"));
        assert!(text.contains("%%Pages: 2"));
        pl.finish().unwrap();
        assert_eq!(out.text(), text);
    }

    #[test]
    fn drop_writes_the_document() {
        let out = Capture::default();
        {
            let mut pl = Plotter::new(PlotterKind::Ps, PlotterParams::new(), out.clone());
            pl.open().unwrap();
            pl.fcircle(0.5, 0.5, 0.25).unwrap();
        }
        assert!(out.text().contains("%%EOF"));
    }

    #[test]
    fn tek_streams_as_it_draws() {
        let (mut pl, out) = plotter(PlotterKind::Tek);
        pl.open().unwrap();
        let after_open = out.bytes().len();
        pl.fline(0.0, 0.0, 0.5, 0.5).unwrap();
        assert!(out.bytes().len() > after_open);
    }

    #[test]
    fn erase_discards_buffered_drawing() {
        let (mut pl, out) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.fline(0.1, 0.1, 0.9, 0.9).unwrap();
        pl.endpath().unwrap();
        assert!(!pl.page().body.is_empty());
        pl.erase().unwrap();
        pl.close().unwrap();
        assert!(!out.text().contains("<line"));
    }

    #[test]
    fn close_pops_every_saved_state() {
        let (mut pl, _) = plotter(PlotterKind::Svg);
        pl.open().unwrap();
        pl.savestate().unwrap();
        pl.savestate().unwrap();
        assert_eq!(pl.depth(), 3);
        pl.close().unwrap();
        assert_eq!(pl.depth(), 1);
    }

    #[test]
    fn live_plotters_are_registered() {
        let (a, _) = plotter(PlotterKind::Svg);
        let (b, _) = plotter(PlotterKind::Svg);
        assert_ne!(a.id(), b.id());
        assert!(registry::live_count() >= 2);
        registry::flush_all().unwrap();
    }

    #[test]
    fn bad_parameter_values_warn_at_creation() {
        let mut params = PlotterParams::new();
        params.set("BITMAPSIZE", "huge").unwrap();
        let pl = Plotter::new(PlotterKind::Gif, params, Vec::new());
        assert!(matches!(
            pl.warnings(),
            [Warning::BadParameterValue { name: "BITMAPSIZE", .. }]
        ));
    }

    // ==================== Fill rule tests ====================

    #[test]
    fn unsupported_fill_rule_is_substituted() {
        let (rule, w) = supported_fill_rule(&crate::caps::HPGL1, FillRule::NonzeroWinding);
        assert_eq!(rule, FillRule::EvenOdd);
        assert!(w.is_some());
        let (rule, w) = supported_fill_rule(&crate::caps::SVG, FillRule::NonzeroWinding);
        assert_eq!(rule, FillRule::NonzeroWinding);
        assert!(w.is_none());
    }
}
