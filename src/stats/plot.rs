use super::{binned_stats, BinStat, Result as StatsResult};
use crate::plot::{padded, tableau, Figure, OrPlotError, PlotError, Result};
use plotters::{coord::Shift, prelude::*};

/// Samples and their binned statistics
pub struct Trend {
    label: Option<String>,
    x: Vec<f64>,
    y: Vec<f64>,
    stats: Vec<BinStat>,
}
impl Trend {
    pub fn new(x: &[f64], y: &[f64], bins: Option<&[f64]>) -> StatsResult<Self> {
        Ok(Self {
            label: None,
            x: x.to_vec(),
            y: y.to_vec(),
            stats: binned_stats(x, y, bins)?,
        })
    }
    pub fn label<S: Into<String>>(self, label: S) -> Self {
        Self {
            label: Some(label.into()),
            ..self
        }
    }
    pub fn stats(&self) -> &[BinStat] {
        &self.stats
    }
}

/// Trends figure: faint samples, binned mean and a band of one standard deviation
#[derive(Default)]
pub struct DataPlot {
    x_label: String,
    y_label: String,
    trends: Vec<Trend>,
}
impl DataPlot {
    pub fn new<S: Into<String>>(x_label: S, y_label: S) -> Self {
        Self {
            x_label: x_label.into(),
            y_label: y_label.into(),
            trends: vec![],
        }
    }
    pub fn push(&mut self, trend: Trend) -> &mut Self {
        self.trends.push(trend);
        self
    }
}
impl Figure for DataPlot {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let finite = |t: &Trend| {
            t.x.iter()
                .zip(&t.y)
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|(x, y)| (*x, *y))
                .collect::<Vec<_>>()
        };
        let points: Vec<_> = self.trends.iter().flat_map(|t| finite(t)).collect();
        if points.is_empty() {
            return Err(PlotError::Empty);
        }
        let range = |v: &mut dyn Iterator<Item = f64>| {
            v.fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), x| (a.min(x), b.max(x)))
        };
        let rx = range(&mut points.iter().map(|p| p.0));
        let ry = range(&mut points.iter().map(|p| p.1));

        let mut chart = ChartBuilder::on(root)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .build_cartesian_2d(padded(rx, 0.02), padded(ry, 0.05))
            .or_plot_error()?;
        chart
            .configure_mesh()
            .x_desc(self.x_label.as_str())
            .y_desc(self.y_label.as_str())
            .draw()
            .or_plot_error()?;

        for (k, trend) in self.trends.iter().enumerate() {
            let color = tableau(k);
            chart
                .draw_series(
                    finite(trend)
                        .into_iter()
                        .map(|p| Circle::new(p, 1, color.mix(0.1).filled())),
                )
                .or_plot_error()?;
            let band: Vec<_> = trend
                .stats
                .iter()
                .filter(|s| s.std.is_finite())
                .map(|s| (s.bin, s.mean + s.std))
                .chain(
                    trend
                        .stats
                        .iter()
                        .rev()
                        .filter(|s| s.std.is_finite())
                        .map(|s| (s.bin, s.mean - s.std)),
                )
                .collect();
            if band.len() > 2 {
                chart
                    .draw_series(std::iter::once(Polygon::new(band, color.mix(0.2).filled())))
                    .or_plot_error()?;
            }
            let series = chart
                .draw_series(LineSeries::new(
                    trend.stats.iter().map(|s| (s.bin, s.mean)),
                    color.stroke_width(2),
                ))
                .or_plot_error()?;
            if let Some(label) = &trend.label {
                series
                    .label(label)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
            }
        }
        if self.trends.iter().any(|t| t.label.is_some()) {
            chart
                .configure_series_labels()
                .border_style(&BLACK)
                .background_style(&WHITE.mix(0.8))
                .position(SeriesLabelPosition::UpperRight)
                .draw()
                .or_plot_error()?;
        }
        Ok(())
    }
}
