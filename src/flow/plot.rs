//! Cut plane figures

use super::{
    contour::{contours, default_levels},
    minmax, CutPlane,
};
use crate::{
    layout::rotor_segment,
    plot::{cool_warm, padded, save, Figure, OrPlotError, PlotError, Result},
};
use plotters::{
    coord::{types::RangedCoordf64, Shift},
    prelude::*,
};
use std::path::Path;

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Levels of the paper plot contours
pub const PAPER_LEVELS: [f64; 5] = [-5., -4., -3., -2., -1.];

/// Cell edges around mesh nodes
fn edges(p: &[f64]) -> Vec<f64> {
    match p.len() {
        0 => vec![],
        1 => vec![p[0] - 0.5, p[0] + 0.5],
        n => {
            let mut e = Vec::with_capacity(n + 1);
            e.push(p[0] - 0.5 * (p[1] - p[0]));
            e.extend(p.windows(2).map(|w| 0.5 * (w[0] + w[1])));
            e.push(p[n - 1] + 0.5 * (p[n - 1] - p[n - 2]));
            e
        }
    }
}

/// Cut plane figure builder
///
/// The figure is made of optional layers: a heat map of `u`, contour lines,
/// a reference rotor, `(v,w)` arrows and turbines.
pub struct CutPlaneFigure<'a> {
    plane: &'a CutPlane,
    heat_map: bool,
    speed_range: Option<(f64, f64)>,
    levels: Option<Vec<f64>>,
    contour_color: RGBColor,
    reference_rotor: bool,
    quiver: Option<usize>,
    turbines: Vec<[f64; 4]>,
}
impl<'a> CutPlaneFigure<'a> {
    pub fn new(plane: &'a CutPlane) -> Self {
        Self {
            plane,
            heat_map: true,
            speed_range: None,
            levels: None,
            contour_color: BLACK,
            reference_rotor: false,
            quiver: None,
            turbines: vec![],
        }
    }
    /// Removes the heat map
    pub fn without_heat_map(self) -> Self {
        Self {
            heat_map: false,
            ..self
        }
    }
    /// Sets the color map range, defaults to the data range
    pub fn speed_range(self, min: Option<f64>, max: Option<f64>) -> Self {
        let data = minmax(self.plane.u_mesh().iter().cloned().filter(|u| u.is_finite()));
        let speed_range = match (data, min, max) {
            (Some((lo, hi)), min, max) => Some((min.unwrap_or(lo), max.unwrap_or(hi))),
            (None, Some(min), Some(max)) => Some((min, max)),
            _ => None,
        };
        Self {
            speed_range,
            ..self
        }
    }
    /// Adds `u` contours, 8 levels within the data range if none are given
    pub fn contours(self, levels: Option<Vec<f64>>, color: RGBColor) -> Self {
        let levels = levels.unwrap_or_else(|| default_levels(self.plane.u_mesh(), 8));
        Self {
            levels: Some(levels),
            contour_color: color,
            ..self
        }
    }
    /// Adds a circle of diameter 1 at the origin
    pub fn reference_rotor(self) -> Self {
        Self {
            reference_rotor: true,
            ..self
        }
    }
    /// Adds `(v,w)` arrows every `down_sampling` mesh points
    pub fn quiver(self, down_sampling: usize) -> Self {
        Self {
            quiver: Some(down_sampling.max(1)),
            ..self
        }
    }
    /// Adds a turbine rotor at `(x,y)` with the yaw angle in degrees and diameter `d`
    pub fn turbine(mut self, x: f64, y: f64, yaw: f64, d: f64) -> Self {
        self.turbines.push([x, y, yaw, d]);
        self
    }

    fn data_range(&self) -> Option<(f64, f64)> {
        self.speed_range.or_else(|| {
            minmax(self.plane.u_mesh().iter().cloned().filter(|u| u.is_finite()))
        })
    }

    fn draw_heat_map<DB: DrawingBackend>(
        &self,
        chart: &mut Chart<'_, DB>,
        x1: &[f64],
        x2: &[f64],
        (min, max): (f64, f64),
    ) -> Result<()> {
        let (e1, e2) = (edges(x1), edges(x2));
        let n1 = x1.len();
        let width = if max > min { max - min } else { 1. };
        let u = self.plane.u_mesh();
        chart
            .draw_series(
                (0..x2.len())
                    .flat_map(|j| (0..n1).map(move |i| (i, j)))
                    .filter(|&(i, j)| u[j * n1 + i].is_finite())
                    .map(|(i, j)| {
                        let color = cool_warm((u[j * n1 + i] - min) / width);
                        Rectangle::new([(e1[i], e2[j]), (e1[i + 1], e2[j + 1])], color.filled())
                    }),
            )
            .or_plot_error()?;
        Ok(())
    }

    fn draw_contours<DB: DrawingBackend>(
        &self,
        chart: &mut Chart<'_, DB>,
        x1: &[f64],
        x2: &[f64],
        levels: &[f64],
    ) -> Result<()> {
        let style = self.contour_color.stroke_width(1);
        for contour in contours(x1, x2, self.plane.u_mesh(), levels) {
            chart
                .draw_series(
                    contour
                        .segments
                        .into_iter()
                        .map(|[p, q]| PathElement::new(vec![p, q], style)),
                )
                .or_plot_error()?;
        }
        Ok(())
    }

    fn draw_quiver<DB: DrawingBackend>(
        &self,
        chart: &mut Chart<'_, DB>,
        x1: &[f64],
        x2: &[f64],
        down_sampling: usize,
    ) -> Result<()> {
        let n1 = x1.len();
        let (v, w) = (self.plane.v_mesh(), self.plane.w_mesh());
        let arrows: Vec<_> = (0..x2.len())
            .step_by(down_sampling)
            .flat_map(|j| (0..n1).step_by(down_sampling).map(move |i| (i, j)))
            .map(|(i, j)| (x1[i], x2[j], v[j * n1 + i], w[j * n1 + i]))
            .filter(|(_, _, v, w)| v.is_finite() && w.is_finite())
            .collect();
        let max_speed = arrows
            .iter()
            .map(|(_, _, v, w)| v.hypot(*w))
            .fold(0f64, f64::max);
        if max_speed == 0. || n1 < 2 {
            return Ok(());
        }
        // the longest arrow spans 1.5 sampling steps
        let step = (x1[1] - x1[0]).abs() * down_sampling as f64;
        let scale = 1.5 * step / max_speed;
        let arrow = |x: f64, y: f64, v: f64, w: f64| {
            let (dx, dy) = (v * scale, w * scale);
            let head = 0.25 * dx.hypot(dy);
            let angle = dy.atan2(dx);
            let tip = (x + dx, y + dy);
            [
                vec![(x, y), tip],
                vec![
                    (
                        tip.0 - head * (angle - 0.4).cos(),
                        tip.1 - head * (angle - 0.4).sin(),
                    ),
                    tip,
                    (
                        tip.0 - head * (angle + 0.4).cos(),
                        tip.1 - head * (angle + 0.4).sin(),
                    ),
                ],
            ]
        };
        chart
            .draw_series(
                arrows
                    .iter()
                    .flat_map(|&(x, y, v, w)| arrow(x, y, v, w))
                    .map(|path| PathElement::new(path, BLACK.stroke_width(1))),
            )
            .or_plot_error()?;
        // 1 m/s key
        if let (Some((x_min, _)), Some((_, y_max))) = (
            minmax(x1.iter().cloned()),
            minmax(x2.iter().cloned()),
        ) {
            let (x, y) = (x_min + step, y_max - step);
            chart
                .draw_series(
                    arrow(x, y, 1., 0.)
                        .into_iter()
                        .map(|path| PathElement::new(path, BLACK.stroke_width(2))),
                )
                .or_plot_error()?;
            chart
                .draw_series(std::iter::once(Text::new(
                    "1 m/s",
                    (x, y - 0.5 * step),
                    ("sans-serif", 14),
                )))
                .or_plot_error()?;
        }
        Ok(())
    }
}
impl<'a> Figure for CutPlaneFigure<'a> {
    fn size(&self) -> (u32, u32) {
        let (x1, x2) = self.plane.plot_coordinates();
        match (minmax(x1.into_iter()), minmax(x2.into_iter())) {
            (Some((a, b)), Some((c, d))) if b > a => {
                let height = (700. * (d - c) / (b - a)).clamp(250., 900.);
                (880, height as u32 + 60)
            }
            _ => (880, 600),
        }
    }
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let (x1, x2) = self.plane.plot_coordinates();
        let (r1, r2) = match (minmax(x1.iter().cloned()), minmax(x2.iter().cloned())) {
            (Some(r1), Some(r2)) => (r1, r2),
            _ => return Err(PlotError::Empty),
        };
        let (width, _) = root.dim_in_pixel();
        let (plot, bar) = root.split_horizontally(width.saturating_sub(100));

        let unit = if self.plane.plot_in_d() { "D" } else { "m" };
        let (a1, a2) = self.plane.axes();
        let mut chart = ChartBuilder::on(&plot)
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .build_cartesian_2d(padded(r1, 0.), padded(r2, 0.))
            .or_plot_error()?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(format!("{a1} [{unit}]"))
            .y_desc(format!("{a2} [{unit}]"))
            .draw()
            .or_plot_error()?;

        let range = self.data_range();
        if let (true, Some(range)) = (self.heat_map, range) {
            self.draw_heat_map(&mut chart, &x1, &x2, range)?;
        }
        if let Some(levels) = &self.levels {
            self.draw_contours(&mut chart, &x1, &x2, levels)?;
        }
        if self.reference_rotor {
            let circle: Vec<_> = (0..=64)
                .map(|k| {
                    let a = k as f64 * std::f64::consts::TAU / 64.;
                    (0.5 * a.cos(), 0.5 * a.sin())
                })
                .collect();
            chart
                .draw_series(std::iter::once(PathElement::new(circle, RED.stroke_width(2))))
                .or_plot_error()?;
        }
        if let Some(down_sampling) = self.quiver {
            self.draw_quiver(&mut chart, &x1, &x2, down_sampling)?;
        }
        chart
            .draw_series(self.turbines.iter().map(|&[x, y, yaw, d]| {
                let [p, q] = rotor_segment(x, y, yaw, d);
                PathElement::new(vec![p, q], BLACK.stroke_width(3))
            }))
            .or_plot_error()?;

        if let (true, Some(range)) = (self.heat_map, range) {
            color_bar(&bar, range)?;
        }
        Ok(())
    }
}

fn color_bar<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, (min, max): (f64, f64)) -> Result<()> {
    let mut chart = ChartBuilder::on(area)
        .set_label_area_size(LabelAreaPosition::Right, 50)
        .margin_top(10)
        .margin_bottom(50)
        .margin_right(10)
        .build_cartesian_2d(0f64..1f64, padded((min, max), 0.))
        .or_plot_error()?;
    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc("u [m/s]")
        .draw()
        .or_plot_error()?;
    let n = 64;
    let step = (max - min) / n as f64;
    chart
        .draw_series((0..n).map(|k| {
            let u = min + k as f64 * step;
            Rectangle::new(
                [(0., u), (1., u + step)],
                cool_warm(k as f64 / (n - 1) as f64).filled(),
            )
        }))
        .or_plot_error()?;
    Ok(())
}

/// Wire runs figure: one line of `u` per mesh row (or column)
pub struct WireRunsFigure<'a> {
    plane: &'a CutPlane,
    along_x1: bool,
}
impl<'a> WireRunsFigure<'a> {
    pub fn along_x1(plane: &'a CutPlane) -> Self {
        Self {
            plane,
            along_x1: true,
        }
    }
    pub fn along_x2(plane: &'a CutPlane) -> Self {
        Self {
            plane,
            along_x1: false,
        }
    }
}
impl<'a> Figure for WireRunsFigure<'a> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()> {
        let (runs, axis) = if self.along_x1 {
            (self.plane.wire_runs_x1(), self.plane.axes().0)
        } else {
            (self.plane.wire_runs_x2(), self.plane.axes().1)
        };
        let points = runs.iter().flatten().filter(|(_, u)| u.is_finite());
        let (Some(rx), Some(ru)) = (
            minmax(points.clone().map(|p| p.0)),
            minmax(points.map(|p| p.1)),
        ) else {
            return Err(PlotError::Empty);
        };
        let mut chart = ChartBuilder::on(root)
            .set_label_area_size(LabelAreaPosition::Left, 50)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .margin(10)
            .build_cartesian_2d(padded(rx, 0.), padded(ru, 0.05))
            .or_plot_error()?;
        chart
            .configure_mesh()
            .x_desc(format!("{axis} [m]"))
            .y_desc("u [m/s]")
            .draw()
            .or_plot_error()?;
        for run in &runs {
            chart
                .draw_series(LineSeries::new(
                    run.iter().cloned().filter(|(_, u)| u.is_finite()),
                    &BLACK.mix(0.1),
                ))
                .or_plot_error()?;
        }
        Ok(())
    }
}

impl CutPlane {
    /// Heat map of `u`, the color map range defaults to the data range
    pub fn visualize<P: AsRef<Path>>(
        &self,
        path: P,
        min_speed: Option<f64>,
        max_speed: Option<f64>,
    ) -> Result<()> {
        save(
            &CutPlaneFigure::new(self).speed_range(min_speed, max_speed),
            path,
        )
    }
    /// Contours of `u`
    pub fn line_contour<P: AsRef<Path>>(&self, path: P, levels: Option<Vec<f64>>) -> Result<()> {
        save(
            &CutPlaneFigure::new(self)
                .without_heat_map()
                .contours(levels, BLACK),
            path,
        )
    }
    /// Heat map, white contours at [PAPER_LEVELS] and a unit diameter rotor at the origin
    pub fn paper_plot<P: AsRef<Path>>(
        &self,
        path: P,
        min_speed: Option<f64>,
        max_speed: Option<f64>,
    ) -> Result<()> {
        save(
            &CutPlaneFigure::new(self)
                .speed_range(min_speed, max_speed)
                .contours(Some(PAPER_LEVELS.to_vec()), WHITE)
                .reference_rotor(),
            path,
        )
    }
    /// `(v,w)` arrows over the heat map of `u`
    pub fn quiver<P: AsRef<Path>>(&self, path: P, down_sampling: usize) -> Result<()> {
        save(&CutPlaneFigure::new(self).quiver(down_sampling), path)
    }
    /// `u` profiles along the first in-plane axis, one per mesh row
    pub fn plot_wire_runs_x1<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save(&WireRunsFigure::along_x1(self), path)
    }
    /// `u` profiles along the second in-plane axis, one per mesh column
    pub fn plot_wire_runs_x2<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save(&WireRunsFigure::along_x2(self), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_edges() {
        assert_eq!(edges(&[0., 1., 3.]), vec![-0.5, 0.5, 2., 4.]);
        assert_eq!(edges(&[2.]), vec![1.5, 2.5]);
        assert_eq!(edges(&[0., -2.]), vec![1., -1., -3.]);
    }
}
