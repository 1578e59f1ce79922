use super::{PowerComparison, Result as SowfaResult, SowfaFrame};
use crate::plot::{padded, tableau, Figure, OrPlotError, PlotError, Result};
use plotters::{coord::Shift, prelude::*};

/// Grouped bar chart of the mean power per turbine and case
pub struct PowerBars<'a> {
    comparison: &'a PowerComparison,
}
impl<'a> PowerBars<'a> {
    pub fn new(comparison: &'a PowerComparison) -> Self {
        Self { comparison }
    }
}
impl<'a> Figure for PowerBars<'a> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let summary = self.comparison.summary();
        if summary.is_empty() {
            return Err(PlotError::Empty);
        }
        let cases = self.comparison.cases();
        let turbines = self.comparison.turbines();
        let (lo, hi) = summary
            .iter()
            .map(|s| s.mean)
            .filter(|x| x.is_finite())
            .fold((0f64, 0f64), |(a, b), x| (a.min(x), b.max(x)));

        let mut chart = ChartBuilder::on(root)
            .set_label_area_size(LabelAreaPosition::Left, 70)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .build_cartesian_2d(-0.5f64..turbines.len() as f64 - 0.5, padded((lo, hi), 0.05))
            .or_plot_error()?;
        let y_desc = if self.comparison.relative {
            format!("{} [%]", self.comparison.channel)
        } else {
            self.comparison.channel.clone()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(turbines.len())
            .x_label_formatter(&|x| {
                let k = x.round();
                if (x - k).abs() < 1e-6 && k >= 0. {
                    turbines
                        .get(k as usize)
                        .map(|t| t.to_string())
                        .unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .x_desc("turbine")
            .y_desc(y_desc)
            .draw()
            .or_plot_error()?;

        let width = 0.8 / cases.len() as f64;
        for (c, case) in cases.iter().enumerate() {
            let color = tableau(c);
            chart
                .draw_series(
                    summary
                        .iter()
                        .filter(|s| &s.case == case && s.mean.is_finite())
                        .filter_map(|s| {
                            let k = turbines.iter().position(|t| *t == s.turbine)?;
                            let x0 = k as f64 - 0.4 + c as f64 * width;
                            Some(Rectangle::new([(x0, 0.), (x0 + width, s.mean)], color.filled()))
                        }),
                )
                .or_plot_error()?
                .label(case)
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
        }
        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .or_plot_error()?;
        Ok(())
    }
}

/// Time series of a few channels, one row per channel and one column per turbine
pub struct SpotCheck<'a> {
    frame: &'a SowfaFrame,
    channels: Vec<String>,
}
impl<'a> SpotCheck<'a> {
    pub fn new<S: AsRef<str>>(frame: &'a SowfaFrame, channels: &[S]) -> SowfaResult<Self> {
        for channel in channels {
            frame.channel_index(channel.as_ref())?;
        }
        Ok(Self {
            frame,
            channels: channels.iter().map(|c| c.as_ref().to_string()).collect(),
        })
    }
}
impl<'a> Figure for SpotCheck<'a> {
    fn size(&self) -> (u32, u32) {
        let n_turbine = self.frame.turbines().len().max(1) as u32;
        (400 * n_turbine, 250 * self.channels.len().max(1) as u32)
    }
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let turbines = self.frame.turbines();
        if turbines.is_empty() || self.channels.is_empty() {
            return Err(PlotError::Empty);
        }
        let cases = self.frame.cases();
        let areas = root.split_evenly((self.channels.len(), turbines.len()));
        for (area, (channel, turbine)) in areas.iter().zip(
            self.channels
                .iter()
                .flat_map(|c| turbines.iter().map(move |t| (c, *t))),
        ) {
            let k = self.frame.channel_index(channel).or_plot_error()?;
            let series = |case: Option<&String>| -> Vec<(f64, f64)> {
                self.frame
                    .records()
                    .iter()
                    .filter(|r| r.turbine == turbine && r.case.as_ref() == case)
                    .map(|r| (r.time, r.values[k]))
                    .filter(|(_, v)| v.is_finite())
                    .collect()
            };
            let all: Vec<_> = if cases.is_empty() {
                vec![(None, series(None))]
            } else {
                cases.iter().map(|c| (Some(c), series(Some(c)))).collect()
            };
            let bounds = |f: fn(&(f64, f64)) -> f64| {
                all.iter()
                    .flat_map(|(_, s)| s.iter().map(f))
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), x| (a.min(x), b.max(x)))
            };
            let (rt, rv) = (bounds(|p| p.0), bounds(|p| p.1));
            if !rt.0.is_finite() || !rv.0.is_finite() {
                continue;
            }
            let mut chart = ChartBuilder::on(area)
                .caption(
                    if channel == &self.channels[0] {
                        format!("Turbine {}", turbine)
                    } else {
                        String::new()
                    },
                    ("sans-serif", 16),
                )
                .set_label_area_size(LabelAreaPosition::Left, 60)
                .set_label_area_size(LabelAreaPosition::Bottom, 35)
                .margin(5)
                .build_cartesian_2d(padded(rt, 0.), padded(rv, 0.05))
                .or_plot_error()?;
            chart
                .configure_mesh()
                .x_desc("time [s]")
                .y_desc(channel.as_str())
                .draw()
                .or_plot_error()?;
            for (c, (_, s)) in all.into_iter().enumerate() {
                chart
                    .draw_series(LineSeries::new(s, &tableau(c)))
                    .or_plot_error()?;
            }
        }
        Ok(())
    }
}

impl PowerComparison {
    /// Bar chart of the mean power per turbine and case
    pub fn plot<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        crate::plot::save(&PowerBars::new(self), path)
    }
}
