//! Cut planes
//!
//! A cut plane is a 2D slice of a [FlowField] at a constant value of one axis,
//! resampled on a regular mesh of the two other axes.

use super::{
    interpolate::{interpolant, Method},
    linspace, minmax, Axis, FlowError, FlowField,
};
use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum CutPlaneError {
    #[error("the in-plane axes must be different, got {0} twice")]
    SameAxes(Axis),
    #[error("no sample to cut through")]
    Empty,
    #[error("invalid {axis} {bound} on cropping: {value} is outside the data range [{min},{max}]")]
    Crop {
        axis: Axis,
        bound: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("the resolution must be at least 1")]
    Resolution,
    #[error("can't subtract because the planes are not meshed the same")]
    MeshMismatch,
    #[error("failed to build the lidar flow field")]
    Flow(#[from] FlowError),
}
type Result<T> = std::result::Result<T, CutPlaneError>;

/// [CutPlane] builder
///
/// The default builder slices a horizontal plane at `z=0`
pub struct CutPlaneBuilder<'a> {
    field: &'a FlowField,
    x1: Axis,
    x2: Axis,
    x3_value: f64,
    resolution: usize,
    x1_center: f64,
    x2_center: f64,
    diameter: Option<f64>,
    invert_x1: bool,
    crop_x1: Option<(f64, f64)>,
    crop_x2: Option<(f64, f64)>,
    method: Method,
}
impl<'a> CutPlaneBuilder<'a> {
    pub fn new(field: &'a FlowField) -> Self {
        Self {
            field,
            x1: Axis::X,
            x2: Axis::Y,
            x3_value: 0f64,
            resolution: 100,
            x1_center: 0f64,
            x2_center: 0f64,
            diameter: None,
            invert_x1: false,
            crop_x1: None,
            crop_x2: None,
            method: Method::default(),
        }
    }
    /// Sets the in-plane axes
    pub fn axes(self, x1: Axis, x2: Axis) -> Self {
        Self { x1, x2, ..self }
    }
    /// Sets the value of the axis normal to the plane
    pub fn at(self, x3_value: f64) -> Self {
        Self { x3_value, ..self }
    }
    /// Sets the number of mesh points along each in-plane axis
    pub fn resolution(self, resolution: usize) -> Self {
        Self { resolution, ..self }
    }
    pub fn center(self, x1_center: f64, x2_center: f64) -> Self {
        Self {
            x1_center,
            x2_center,
            ..self
        }
    }
    /// Sets the rotor diameter, distances are then given in rotor diameters
    pub fn diameter(self, diameter: f64) -> Self {
        Self {
            diameter: Some(diameter),
            ..self
        }
    }
    /// Flips the sign of the first in-plane axis
    pub fn invert_x1(self) -> Self {
        Self {
            invert_x1: true,
            ..self
        }
    }
    pub fn crop_x1(self, min: f64, max: f64) -> Self {
        Self {
            crop_x1: Some((min, max)),
            ..self
        }
    }
    pub fn crop_x2(self, min: f64, max: f64) -> Self {
        Self {
            crop_x2: Some((min, max)),
            ..self
        }
    }
    pub fn method(self, method: Method) -> Self {
        Self { method, ..self }
    }
    pub fn build(self) -> Result<CutPlane> {
        let x3 = Axis::third(self.x1, self.x2).ok_or(CutPlaneError::SameAxes(self.x1))?;
        if self.resolution == 0 {
            return Err(CutPlaneError::Resolution);
        }
        let x3_value = self
            .field
            .nearest(x3, self.x3_value)
            .ok_or(CutPlaneError::Empty)?;
        log::info!(
            "Nearest value to {:.3} in {} is {:.3}",
            self.x3_value,
            x3,
            x3_value
        );

        let (i1, i2) = (self.x1.index(), self.x2.index());
        let mut samples = Samples::default();
        for (xyz, uvw) in self.field.select(x3, x3_value) {
            samples.x1.push(xyz[i1]);
            samples.x2.push(xyz[i2]);
            samples.u.push(uvw[0]);
            samples.v.push(uvw[1]);
            samples.w.push(uvw[2]);
        }

        let x1_lin = mesh_axis(self.x1, &samples.x1, self.crop_x1, self.resolution)?;
        let x2_lin = mesh_axis(self.x2, &samples.x2, self.crop_x2, self.resolution)?;
        let sign = if self.invert_x1 { -1f64 } else { 1f64 };

        let mut plane = CutPlane {
            x1: self.x1,
            x2: self.x2,
            x3_value,
            resolution: self.resolution,
            x1_lin: x1_lin.into_iter().map(|x| sign * x).collect(),
            x2_lin,
            x1_center: sign * self.x1_center,
            x2_center: self.x2_center,
            diameter: self.diameter,
            inverted: self.invert_x1,
            method: self.method,
            samples,
            u_mesh: vec![],
            v_mesh: vec![],
            w_mesh: vec![],
            u_cubed: vec![],
        };
        plane.remesh();
        Ok(plane)
    }
}

fn mesh_axis(
    axis: Axis,
    data: &[f64],
    crop: Option<(f64, f64)>,
    resolution: usize,
) -> Result<Vec<f64>> {
    let (min, max) = minmax(data.iter().cloned()).ok_or(CutPlaneError::Empty)?;
    let (start, end) = match crop {
        Some((lo, hi)) => {
            if lo < min {
                return Err(CutPlaneError::Crop {
                    axis,
                    bound: "minimum",
                    value: lo,
                    min,
                    max,
                });
            }
            if hi > max {
                return Err(CutPlaneError::Crop {
                    axis,
                    bound: "maximum",
                    value: hi,
                    min,
                    max,
                });
            }
            (lo, hi)
        }
        None => (min, max),
    };
    Ok(linspace(start, end, resolution))
}

/// Flow samples of the slice
#[derive(Debug, Clone, Default)]
struct Samples {
    x1: Vec<f64>,
    x2: Vec<f64>,
    u: Vec<f64>,
    v: Vec<f64>,
    w: Vec<f64>,
}

/// 2D slice of a flow field
///
/// Meshes are stored row-major: `resolution` rows along x2 of `resolution` columns along x1.
#[derive(Debug, Clone)]
pub struct CutPlane {
    x1: Axis,
    x2: Axis,
    x3_value: f64,
    resolution: usize,
    x1_lin: Vec<f64>,
    x2_lin: Vec<f64>,
    x1_center: f64,
    x2_center: f64,
    diameter: Option<f64>,
    inverted: bool,
    method: Method,
    samples: Samples,
    u_mesh: Vec<f64>,
    v_mesh: Vec<f64>,
    w_mesh: Vec<f64>,
    u_cubed: Vec<f64>,
}
impl CutPlane {
    /// Horizontal (x,y) plane at height `z`
    pub fn horizontal(field: &FlowField, z: f64) -> CutPlaneBuilder<'_> {
        CutPlaneBuilder::new(field).axes(Axis::X, Axis::Y).at(z)
    }
    /// Cross-stream (y,z) plane at `x`, looking downstream
    pub fn cross(
        field: &FlowField,
        x: f64,
        y_center: f64,
        z_center: f64,
        diameter: f64,
    ) -> CutPlaneBuilder<'_> {
        CutPlaneBuilder::new(field)
            .axes(Axis::Y, Axis::Z)
            .at(x)
            .center(y_center, z_center)
            .diameter(diameter)
            .invert_x1()
    }
    /// Cross-stream plane from lidar scans of the streamwise velocity
    pub fn lidar(
        y: &[f64],
        z: &[f64],
        u: &[f64],
        y_center: f64,
        z_center: f64,
        diameter: f64,
        resolution: usize,
    ) -> Result<CutPlane> {
        let zeros = vec![0f64; u.len()];
        let field = FlowField::from_columns(&zeros, y, z, u, &zeros, &zeros)?;
        Self::cross(&field, 0f64, y_center, z_center, diameter)
            .resolution(resolution)
            .build()
    }

    fn sign(&self) -> f64 {
        if self.inverted {
            -1f64
        } else {
            1f64
        }
    }
    /// Interpolates the slice samples on the mesh
    pub fn remesh(&mut self) {
        let sign = self.sign();
        let x1_data: Vec<f64> = self.x1_lin.iter().map(|x| sign * x).collect();
        let s = &self.samples;
        let mesh = |values: &[f64]| {
            interpolant(&s.x1, &s.x2, values, self.method).evaluate_mesh(&x1_data, &self.x2_lin)
        };
        let u_mesh = mesh(&s.u);
        let v_mesh: Vec<f64> = mesh(&s.v).into_iter().map(|v| sign * v).collect();
        let w_mesh = mesh(&s.w);
        self.u_cubed = u_mesh.iter().map(|u| u.powi(3)).collect();
        self.u_mesh = u_mesh;
        self.v_mesh = v_mesh;
        self.w_mesh = w_mesh;
    }

    pub fn axes(&self) -> (Axis, Axis) {
        (self.x1, self.x2)
    }
    /// Value of the normal axis the plane was cut at
    pub fn x3_value(&self) -> f64 {
        self.x3_value
    }
    pub fn resolution(&self) -> usize {
        self.resolution
    }
    pub fn x1_lin(&self) -> &[f64] {
        &self.x1_lin
    }
    pub fn x2_lin(&self) -> &[f64] {
        &self.x2_lin
    }
    pub fn x1_center(&self) -> f64 {
        self.x1_center
    }
    pub fn x2_center(&self) -> f64 {
        self.x2_center
    }
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }
    pub fn diameter(&self) -> Option<f64> {
        self.diameter
    }
    /// `true` if distances are plotted in rotor diameters
    pub fn plot_in_d(&self) -> bool {
        self.diameter.is_some()
    }
    /// Length unit of the plot coordinates
    pub fn length_unit(&self) -> f64 {
        self.diameter.unwrap_or(1f64)
    }
    pub fn u_mesh(&self) -> &[f64] {
        &self.u_mesh
    }
    pub fn v_mesh(&self) -> &[f64] {
        &self.v_mesh
    }
    pub fn w_mesh(&self) -> &[f64] {
        &self.w_mesh
    }
    pub fn u_cubed(&self) -> &[f64] {
        &self.u_cubed
    }
    /// x1 coordinate of every mesh point
    pub fn x1_flat(&self) -> impl Iterator<Item = f64> + '_ {
        self.x2_lin.iter().flat_map(move |_| self.x1_lin.iter().cloned())
    }
    /// x2 coordinate of every mesh point
    pub fn x2_flat(&self) -> impl Iterator<Item = f64> + '_ {
        self.x2_lin
            .iter()
            .flat_map(move |&y| self.x1_lin.iter().map(move |_| y))
    }
    /// Number of samples the plane is interpolated from
    pub fn n_sample(&self) -> usize {
        self.samples.u.len()
    }

    /// Difference between this plane and `other`
    ///
    /// The planes must share the same mesh, the result keeps the geometry of `other`
    pub fn subtract(&self, other: &CutPlane) -> Result<CutPlane> {
        if self.x1_lin != other.x1_lin || self.x2_lin != other.x2_lin {
            return Err(CutPlaneError::MeshMismatch);
        }
        let diff = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(a, b)| a - b).collect::<Vec<_>>();
        Ok(CutPlane {
            u_mesh: diff(&self.u_mesh, &other.u_mesh),
            v_mesh: diff(&self.v_mesh, &other.v_mesh),
            w_mesh: diff(&self.w_mesh, &other.w_mesh),
            u_cubed: diff(&self.u_cubed, &other.u_cubed),
            ..other.clone()
        })
    }

    /// Rotor equivalent wind speed at `(x1,x2)`
    ///
    /// Cube root of the mean of `u^3` over the mesh points within `radius`,
    /// `None` if there is none.
    pub fn calculate_wind_speed(&self, x1: f64, x2: f64, radius: f64) -> Option<f64> {
        let (sum, n) = self
            .x1_flat()
            .zip(self.x2_flat())
            .zip(&self.u_cubed)
            .filter(|((a, b), _)| ((a - x1).powi(2) + (b - x2).powi(2)).sqrt() < radius)
            .fold((0f64, 0usize), |(s, n), (_, u3)| (s + u3, n + 1));
        (n > 0).then(|| (sum / n as f64).cbrt())
    }

    /// Rotor equivalent wind speed profile along x1 at `x2_center`
    ///
    /// Returns the positions relative to `x1_center` in rotor diameters and the wind speeds.
    pub fn get_profile(&self, resolution: usize) -> (Vec<f64>, Vec<Option<f64>>) {
        let d = self.length_unit();
        let Some((min, max)) = minmax(self.x1_lin.iter().cloned()) else {
            return (vec![], vec![]);
        };
        linspace(min, max, resolution)
            .into_iter()
            .map(|x1| {
                (
                    (x1 - self.x1_center) / d,
                    self.calculate_wind_speed(x1, self.x2_center, d / 2.),
                )
            })
            .unzip()
    }

    /// Mesh rows: u along x1, relative to `x1_center`, for each x2
    pub fn wire_runs_x1(&self) -> Vec<Vec<(f64, f64)>> {
        self.u_mesh
            .chunks(self.resolution)
            .map(|row| {
                self.x1_lin
                    .iter()
                    .zip(row)
                    .map(|(x, u)| (x - self.x1_center, *u))
                    .collect()
            })
            .collect()
    }
    /// Mesh columns: u along x2, relative to `x2_center`, for each x1
    pub fn wire_runs_x2(&self) -> Vec<Vec<(f64, f64)>> {
        let n = self.x1_lin.len();
        (0..n)
            .map(|i| {
                self.x2_lin
                    .iter()
                    .enumerate()
                    .map(|(j, y)| (y - self.x2_center, self.u_mesh[j * n + i]))
                    .collect()
            })
            .collect()
    }

    /// Mesh coordinates relative to the center, in rotor diameters if set
    pub fn plot_coordinates(&self) -> (Vec<f64>, Vec<f64>) {
        let d = self.length_unit();
        (
            self.x1_lin.iter().map(|x| (x - self.x1_center) / d).collect(),
            self.x2_lin.iter().map(|x| (x - self.x2_center) / d).collect(),
        )
    }
}
impl fmt::Display for CutPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x3 = Axis::third(self.x1, self.x2).ok_or(fmt::Error)?;
        writeln!(
            f,
            "{}{} cut plane at {}={:.3} [{}x{}] from {} samples",
            self.x1,
            self.x2,
            x3,
            self.x3_value,
            self.resolution,
            self.resolution,
            self.n_sample()
        )?;
        if let (Some(r1), Some(r2)) = (
            minmax(self.x1_lin.iter().cloned()),
            minmax(self.x2_lin.iter().cloned()),
        ) {
            writeln!(f, " - {} range: {:.3?}", self.x1, r1)?;
            writeln!(f, " - {} range: {:.3?}", self.x2, r2)?;
        }
        if let Some(u) = minmax(self.u_mesh.iter().cloned().filter(|u| u.is_finite())) {
            writeln!(f, " - u minmax: {:.3?}m/s", u)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Grid;
    use approx::assert_relative_eq;

    // u = 8 + 0.01 x, v = 1, w = 0.1 z on a 11x11x3 grid of 10m spacing
    fn field() -> FlowField {
        let grid = Grid::new([11, 11, 3], [10., 10., 10.], [0.; 3]);
        let uvw = grid
            .positions()
            .map(|[x, _, z]| [8. + 0.01 * x, 1., 0.1 * z])
            .collect();
        FlowField::from_grid(grid, uvw).unwrap()
    }

    #[test]
    fn horizontal_plane() {
        let field = field();
        let plane = CutPlane::horizontal(&field, 12.)
            .resolution(21)
            .method(Method::Linear)
            .build()
            .unwrap();
        assert_eq!(plane.x3_value(), 10.);
        assert_eq!(plane.n_sample(), 121);
        assert_eq!(plane.u_mesh().len(), 21 * 21);
        assert_eq!(plane.x1_lin()[0], 0.);
        assert_eq!(plane.x1_lin()[20], 100.);
        assert_relative_eq!(plane.u_mesh()[1], 8.05, epsilon = 1e-12);
        assert_relative_eq!(plane.u_cubed()[20], 9f64.powi(3), epsilon = 1e-9);
        assert!(plane.w_mesh().iter().all(|w| (w - 1.).abs() < 1e-12));
        assert!(!plane.plot_in_d());
    }

    #[test]
    fn inverted_cross_plane() {
        let field = field();
        let plane = CutPlane::cross(&field, 50., 40., 10., 20.)
            .resolution(11)
            .method(Method::Linear)
            .build()
            .unwrap();
        assert_eq!(plane.axes(), (Axis::Y, Axis::Z));
        assert_eq!(plane.x1_lin()[10], -100.);
        assert_eq!(plane.x1_center(), -40.);
        assert!(plane.v_mesh().iter().all(|v| (v + 1.).abs() < 1e-12));
        assert_relative_eq!(plane.u_mesh()[0], 8.5, epsilon = 1e-12);
        assert!(plane.plot_in_d());
        let (x1, x2) = plane.plot_coordinates();
        assert_relative_eq!(x1[0], 2.);
        assert_relative_eq!(x1[10], -3.);
        assert_relative_eq!(x2[0], -0.5);
    }

    #[test]
    fn crop_bounds() {
        let field = field();
        let plane = CutPlane::horizontal(&field, 0.)
            .crop_x1(20., 60.)
            .resolution(5)
            .build()
            .unwrap();
        assert_eq!(plane.x1_lin(), &[20., 30., 40., 50., 60.]);
        assert!(matches!(
            CutPlane::horizontal(&field, 0.).crop_x1(-10., 50.).build(),
            Err(CutPlaneError::Crop {
                axis: Axis::X,
                bound: "minimum",
                ..
            })
        ));
        assert!(matches!(
            CutPlane::horizontal(&field, 0.).crop_x2(0., 150.).build(),
            Err(CutPlaneError::Crop {
                axis: Axis::Y,
                bound: "maximum",
                ..
            })
        ));
    }

    #[test]
    fn same_axes() {
        let field = field();
        assert!(matches!(
            CutPlaneBuilder::new(&field).axes(Axis::Z, Axis::Z).build(),
            Err(CutPlaneError::SameAxes(Axis::Z))
        ));
    }

    #[test]
    fn subtract_planes() {
        let field = field();
        let a = CutPlane::horizontal(&field, 20.).resolution(11).build().unwrap();
        let b = CutPlane::horizontal(&field, 0.).resolution(11).build().unwrap();
        let d = a.subtract(&b).unwrap();
        assert!(d.u_mesh().iter().all(|u| u.abs() < 1e-9));
        assert!(d.w_mesh().iter().all(|w| (w - 2.).abs() < 1e-9));
        assert_eq!(d.x3_value(), 0.);
        let c = CutPlane::horizontal(&field, 0.).resolution(12).build().unwrap();
        assert!(matches!(a.subtract(&c), Err(CutPlaneError::MeshMismatch)));
    }

    #[test]
    fn wind_speed() {
        let field = field();
        let plane = CutPlane::horizontal(&field, 0.)
            .resolution(11)
            .method(Method::Linear)
            .build()
            .unwrap();
        // only the mesh point at (50,50) is within 5m
        assert_relative_eq!(
            plane.calculate_wind_speed(50., 50., 5.).unwrap(),
            8.5,
            epsilon = 1e-9
        );
        // (40,50), (50,50) and (60,50) and (50,40), (50,60)
        let expected = ((3. * 8.5f64.powi(3) + 8.4f64.powi(3) + 8.6f64.powi(3)) / 5.).cbrt();
        assert_relative_eq!(
            plane.calculate_wind_speed(50., 50., 10.5).unwrap(),
            expected,
            epsilon = 1e-9
        );
        assert!(plane.calculate_wind_speed(500., 500., 5.).is_none());
    }

    #[test]
    fn profile() {
        let field = field();
        let plane = CutPlane::horizontal(&field, 0.)
            .resolution(11)
            .center(50., 50.)
            .diameter(20.)
            .method(Method::Linear)
            .build()
            .unwrap();
        let (x, ws) = plane.get_profile(3);
        assert_eq!(x, vec![-2.5, 0., 2.5]);
        assert_eq!(ws.len(), 3);
        assert_relative_eq!(ws[1].unwrap(), 8.5, epsilon = 1e-9);
    }

    #[test]
    fn wire_runs() {
        let field = field();
        let plane = CutPlane::horizontal(&field, 0.)
            .resolution(6)
            .center(50., 0.)
            .method(Method::Linear)
            .build()
            .unwrap();
        let rows = plane.wire_runs_x1();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0][0].0, -50.);
        assert_relative_eq!(rows[3][5].1, 9., epsilon = 1e-12);
        let columns = plane.wire_runs_x2();
        assert_eq!(columns.len(), 6);
        assert!(columns[5].iter().all(|(_, u)| (u - 9.).abs() < 1e-12));
    }

    #[test]
    fn lidar_plane() {
        let mut y = vec![];
        let mut z = vec![];
        let mut u = vec![];
        for j in 0..5 {
            for i in 0..5 {
                y.push(i as f64 * 20.);
                z.push(j as f64 * 20.);
                u.push(7. + 0.1 * j as f64);
            }
        }
        let plane = CutPlane::lidar(&y, &z, &u, 40., 40., 80., 5).unwrap();
        assert_eq!(plane.x3_value(), 0.);
        assert!(plane.is_inverted());
        assert!(plane.v_mesh().iter().all(|v| *v == 0.));
        assert_relative_eq!(plane.u_mesh()[24], 7.4, epsilon = 1e-9);
    }
}
