//! Figures
//!
//! Every figure implements [Figure] and is rendered with [save],
//! into a SVG file if the path extension is `svg` or into a bitmap otherwise.

use plotters::{coord::Shift, prelude::*};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum PlotError {
    #[error("failed to draw the figure: {0}")]
    Drawing(String),
    #[error("nothing to plot")]
    Empty,
}
pub type Result<T> = std::result::Result<T, PlotError>;

pub(crate) trait OrPlotError<T> {
    fn or_plot_error(self) -> Result<T>;
}
impl<T, E: std::fmt::Display> OrPlotError<T> for std::result::Result<T, E> {
    fn or_plot_error(self) -> Result<T> {
        self.map_err(|e| PlotError::Drawing(e.to_string()))
    }
}

pub trait Figure {
    /// Figure size in pixels
    fn size(&self) -> (u32, u32) {
        (768, 512)
    }
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>;
}

/// Renders a figure into a file
pub fn save<F: Figure, P: AsRef<Path>>(figure: &F, path: P) -> Result<()> {
    let path = path.as_ref();
    log::info!("Plotting {:?}...", path);
    let size = figure.size();
    if path.extension().and_then(|e| e.to_str()) == Some("svg") {
        let root = SVGBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).or_plot_error()?;
        figure.draw(&root)?;
        root.present().or_plot_error()
    } else {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).or_plot_error()?;
        figure.draw(&root)?;
        root.present().or_plot_error()
    }
}

/// Color `k` of the Tableau 10 palette
pub(crate) fn tableau(k: usize) -> RGBColor {
    let color = colorous::TABLEAU10[k % colorous::TABLEAU10.len()];
    RGBColor(color.r, color.g, color.b)
}

/// Blue to red color map
pub(crate) fn cool_warm(t: f64) -> RGBColor {
    let color = colorous::RED_BLUE.eval_continuous(1. - t.clamp(0., 1.));
    RGBColor(color.r, color.g, color.b)
}

/// Range padded by a fraction of its width
pub(crate) fn padded((min, max): (f64, f64), padding: f64) -> std::ops::Range<f64> {
    let width = if max > min { max - min } else { 1. };
    min - padding * width..max + padding * width
}
