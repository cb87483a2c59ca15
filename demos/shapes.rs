//! Draw a few shapes in the format named on the command line.
//!
//! `cargo run --example shapes --features tracing -- ps > shapes.ps`

use plotkit::{Plotter, PlotterKind, PlotterParams};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    let kind: PlotterKind = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "svg".to_string())
        .parse()?;

    let mut params = PlotterParams::new();
    params.set("BG_COLOR", "lightyellow")?;
    let mut pl = Plotter::new(kind, params, std::io::stdout());
    pl.open()?;
    pl.fspace(0.0, 0.0, 100.0, 100.0)?;
    pl.flinewidth(0.8)?;

    pl.pencolorname("blue")?;
    pl.fillcolorname("light blue")?;
    pl.filltype(1)?;
    pl.fbox(10.0, 10.0, 45.0, 45.0)?;

    pl.pencolorname("red")?;
    pl.filltype(0x8000)?;
    pl.fcircle(72.0, 28.0, 16.0)?;

    pl.filltype(0)?;
    pl.pencolorname("dark green")?;
    pl.linemod("dotdashed")?;
    pl.fbezier3(10.0, 60.0, 25.0, 95.0, 75.0, 55.0, 90.0, 90.0)?;
    pl.endpath()?;

    pl.linemod("solid")?;
    pl.pencolorname("black")?;
    pl.farc(50.0, 50.0, 60.0, 50.0, 50.0, 60.0)?;
    pl.close()?;
    pl.finish()?;
    Ok(())
}
