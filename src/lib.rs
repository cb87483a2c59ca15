//! Device-independent 2D vector plotting.
//!
//! A [`Plotter`] accepts drawing commands in user coordinates (lines,
//! arcs, Beziers, boxes, circles, ellipses and points, grouped into
//! compound paths) together with attribute changes, and renders them to
//! one of several output formats: SVG, PostScript, Fig, HP-GL/2, CGM,
//! Tektronix, ReGIS, a portable metafile, GIF, or X11 protocol requests.
//!
//! ```
//! use plotkit::{Plotter, PlotterKind, PlotterParams};
//!
//! let mut pl = Plotter::new(PlotterKind::Svg, PlotterParams::new(), std::io::stdout());
//! pl.open()?;
//! pl.fspace(0.0, 0.0, 100.0, 100.0)?;
//! pl.filltype(1)?;
//! pl.fbox(10.0, 10.0, 90.0, 90.0)?;
//! pl.close()?;
//! # Ok::<(), plotkit::PlotError>(())
//! ```

pub mod backend;
pub mod caps;
pub mod collab;
pub mod color;
pub mod errors;
pub mod geometry;
pub mod log;
pub mod matrix;
pub mod outbuf;
pub mod paint;
pub mod params;
pub mod path;
pub mod plotter;
pub mod registry;
pub mod state;
pub mod types;

pub use backend::{Backend, Backends, PlotterKind};
pub use caps::{Capabilities, OutputModel};
pub use errors::{PlotError, Warning, WarningHandler};
pub use geometry::contour::iso_contour_segments;
pub use matrix::Affine;
pub use params::PlotterParams;
pub use plotter::Plotter;
pub use registry::flush_all;
pub use types::{Rgb24, Rgb48};
