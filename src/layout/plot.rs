use super::Layout;
use crate::plot::{padded, save, tableau, Figure, OrPlotError, PlotError, Result};
use plotters::{coord::Shift, prelude::*};
use std::path::Path;

/// Turbine locations, optionally with the wake lines between turbines
pub struct LayoutFigure<'a> {
    layout: &'a Layout,
    d: f64,
    show_wake_lines: bool,
    limit_dist: Option<f64>,
}
impl<'a> LayoutFigure<'a> {
    pub fn new(layout: &'a Layout, d: f64) -> Self {
        Self {
            layout,
            d,
            show_wake_lines: false,
            limit_dist: None,
        }
    }
    pub fn wake_lines(self, limit_dist: Option<f64>) -> Self {
        Self {
            show_wake_lines: true,
            limit_dist,
            ..self
        }
    }
}
impl<'a> Figure for LayoutFigure<'a> {
    fn size(&self) -> (u32, u32) {
        (768, 768)
    }
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        if self.layout.is_empty() {
            return Err(PlotError::Empty);
        }
        // square axes around the farm
        let bounds = |v: Vec<f64>| {
            v.into_iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), x| (a.min(x), b.max(x)))
        };
        let rx = bounds(self.layout.iter().map(|t| t.x).collect());
        let ry = bounds(self.layout.iter().map(|t| t.y).collect());
        let half = 0.5 * (rx.1 - rx.0).max(ry.1 - ry.0) + self.d;
        let (cx, cy) = (0.5 * (rx.0 + rx.1), 0.5 * (ry.0 + ry.1));
        let mut chart = ChartBuilder::on(root)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .build_cartesian_2d(
                padded((cx - half, cx + half), 0.),
                padded((cy - half, cy + half), 0.),
            )
            .or_plot_error()?;
        chart
            .configure_mesh()
            .x_desc("x [m]")
            .y_desc("y [m]")
            .draw()
            .or_plot_error()?;

        if self.show_wake_lines {
            for (k, line) in self
                .layout
                .wake_lines(self.d, self.limit_dist)
                .iter()
                .enumerate()
            {
                let color = tableau(k);
                let [(x0, y0), (x1, y1)] = line.xy;
                chart
                    .draw_series(LineSeries::new(line.xy, &color))
                    .or_plot_error()?;
                chart
                    .draw_series(std::iter::once(Text::new(
                        line.to_string(),
                        (0.5 * (x0 + x1), 0.5 * (y0 + y1)),
                        ("sans-serif", 11).into_font().color(&color),
                    )))
                    .or_plot_error()?;
            }
        }

        let r = 0.25 * self.d;
        chart
            .draw_series(self.layout.iter().map(|t| {
                PathElement::new(vec![(t.x, t.y - r), (t.x, t.y + r)], BLACK.stroke_width(2))
            }))
            .or_plot_error()?;
        chart
            .draw_series(self.layout.iter().map(|t| {
                Text::new(
                    t.id.clone(),
                    (t.x + 0.5 * self.d, t.y),
                    ("sans-serif", 14).into_font().color(&RED),
                )
            }))
            .or_plot_error()?;
        Ok(())
    }
}

/// Plots the turbine locations with the rotors as vertical lines of half a diameter
pub fn visualize_layout<P: AsRef<Path>>(
    layout: &Layout,
    d: f64,
    show_wake_lines: bool,
    limit_dist: Option<f64>,
    path: P,
) -> Result<()> {
    let figure = LayoutFigure::new(layout, d);
    if show_wake_lines {
        save(&figure.wake_lines(limit_dist), path)
    } else {
        save(&figure, path)
    }
}
