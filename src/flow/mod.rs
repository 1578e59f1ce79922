//! Flow fields
//!
//! A flow field is a table of velocity samples `(u,v,w)` at positions `(x,y,z)`.
//! Fields read from structured files also carry their [Grid] and are ordered
//! z-major, then y, then x (x varies fastest).

use itertools::{Itertools, MinMaxResult::MinMax, MinMaxResult::OneElement};
use std::{fmt, path::PathBuf};
use strum_macros::EnumIter;

pub mod contour;
pub mod cut_plane;
pub mod interpolate;
#[cfg(feature = "plot")]
pub mod plot;
pub mod sowfa_array;
pub mod vti;

pub use cut_plane::{CutPlane, CutPlaneBuilder, CutPlaneError};
pub use interpolate::{Interpolant, Method};
pub use sowfa_array::{get_flow_file, read_flow_frame_sowfa, write_flow_frame_sowfa};
pub use vti::{create_vti, read_vti, VtiError};

#[derive(thiserror::Error, Debug)]
pub enum FlowError {
    #[error("failed to read the flow file")]
    Io(#[from] std::io::Error),
    #[error("no flow file found in {0:?}")]
    NoFlowFile(PathBuf),
    #[error("missing {0} in the flow file header")]
    MissingHeader(&'static str),
    #[error("expected 3 values for {0}, found {1}")]
    Triplet(&'static str, usize),
    #[error("failed to parse {0:?} as a number")]
    Parse(String),
    #[error("expected {expected} samples, found {found}")]
    SampleCount { expected: usize, found: usize },
    #[error("flow columns have different lengths")]
    ColumnLength,
    #[error("the flow field has no grid")]
    Unstructured,
    #[error("invalid header regex")]
    Regex(#[from] regex::Error),
}
type Result<T> = std::result::Result<T, FlowError>;

/// Cartesian axis
#[derive(EnumIter, Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}
impl Axis {
    /// Column index of the axis in `[x,y,z]` and `[u,v,w]` arrays
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
    /// The axis that is neither `a` nor `b`
    pub fn third(a: Axis, b: Axis) -> Option<Axis> {
        use strum::IntoEnumIterator;
        if a == b {
            return None;
        }
        Axis::iter().find(|x| *x != a && *x != b)
    }
}
impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}
impl TryFrom<&str> for Axis {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value {
            "x" | "X" => Ok(Axis::X),
            "y" | "Y" => Ok(Axis::Y),
            "z" | "Z" => Ok(Axis::Z),
            _ => Err(format!(r#"axis {value:?} is not recognized, expected "x", "y" or "z""#)),
        }
    }
}
impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Axis::try_from(s)
    }
}

/// Structured grid description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    /// number of points along x, y and z
    pub dimensions: [usize; 3],
    /// distance between points along x, y and z
    pub spacing: [f64; 3],
    /// origin of the grid, for reconstructing turbine coordinates
    pub origin: [f64; 3],
}
impl Grid {
    pub fn new(dimensions: [usize; 3], spacing: [f64; 3], origin: [f64; 3]) -> Self {
        Self {
            dimensions,
            spacing,
            origin,
        }
    }
    /// Number of grid points
    pub fn len(&self) -> usize {
        self.dimensions.iter().product()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Grid positions relative to the origin, x varying fastest then y then z
    pub fn positions(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        let [nx, ny, nz] = self.dimensions;
        let [dx, dy, dz] = self.spacing;
        (0..nz).flat_map(move |k| {
            (0..ny).flat_map(move |j| {
                (0..nx).map(move |i| [i as f64 * dx, j as f64 * dy, k as f64 * dz])
            })
        })
    }
}

/// Velocity samples at positions in space
#[derive(Debug, Clone, Default)]
pub struct FlowField {
    xyz: Vec<[f64; 3]>,
    uvw: Vec<[f64; 3]>,
    grid: Option<Grid>,
}
impl FlowField {
    /// Builds a flow field from flattened columns
    ///
    /// This is how a FLORIS flow field (`x`, `y`, `z`, `u`, `v`, `w` arrays) is imported
    pub fn from_columns(
        x: &[f64],
        y: &[f64],
        z: &[f64],
        u: &[f64],
        v: &[f64],
        w: &[f64],
    ) -> Result<Self> {
        let n = x.len();
        if [y.len(), z.len(), u.len(), v.len(), w.len()]
            .iter()
            .any(|&m| m != n)
        {
            return Err(FlowError::ColumnLength);
        }
        let xyz = (0..n).map(|i| [x[i], y[i], z[i]]).collect();
        let uvw = (0..n).map(|i| [u[i], v[i], w[i]]).collect();
        Ok(Self {
            xyz,
            uvw,
            grid: None,
        })
    }
    /// Builds a structured flow field, positions are generated from the grid
    pub fn from_grid(grid: Grid, uvw: Vec<[f64; 3]>) -> Result<Self> {
        if grid.len() != uvw.len() {
            return Err(FlowError::SampleCount {
                expected: grid.len(),
                found: uvw.len(),
            });
        }
        Ok(Self {
            xyz: grid.positions().collect(),
            uvw,
            grid: Some(grid),
        })
    }
    /// Adds a sample
    pub fn push(&mut self, xyz: [f64; 3], uvw: [f64; 3]) {
        self.xyz.push(xyz);
        self.uvw.push(uvw);
        self.grid = None;
    }
    /// Shifts all the positions by `offset`
    pub fn translate(&mut self, offset: [f64; 3]) {
        self.xyz.iter_mut().for_each(|xyz| {
            xyz.iter_mut().zip(offset).for_each(|(x, o)| *x += o);
        });
    }
    pub fn len(&self) -> usize {
        self.xyz.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }
    /// The grid origin, `(0,0,0)` for unstructured fields
    pub fn origin(&self) -> [f64; 3] {
        self.grid.map(|g| g.origin).unwrap_or_default()
    }
    /// Iterator over the (x,y,z) coordinates
    pub fn xyz_iter(&self) -> impl Iterator<Item = &[f64; 3]> {
        self.xyz.iter()
    }
    /// Iterator over the (u,v,w) velocities
    pub fn uvw_iter(&self) -> impl Iterator<Item = &[f64; 3]> {
        self.uvw.iter()
    }
    /// Iterator over pairs of position and velocity
    pub fn iter(&self) -> impl Iterator<Item = (&[f64; 3], &[f64; 3])> {
        self.xyz.iter().zip(self.uvw.iter())
    }
    /// Iterator over one coordinate
    pub fn coordinate_iter(&self, axis: Axis) -> impl Iterator<Item = f64> + '_ {
        let k = axis.index();
        self.xyz.iter().map(move |v| v[k])
    }
    /// Iterator over one velocity component, `Axis::X` is `u`
    pub fn velocity_iter(&self, axis: Axis) -> impl Iterator<Item = f64> + '_ {
        let k = axis.index();
        self.uvw.iter().map(move |v| v[k])
    }
    pub fn x_iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.coordinate_iter(Axis::X)
    }
    pub fn y_iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.coordinate_iter(Axis::Y)
    }
    pub fn z_iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.coordinate_iter(Axis::Z)
    }
    pub fn u_iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.velocity_iter(Axis::X)
    }
    /// Returns the range of a coordinate
    pub fn range(&self, axis: Axis) -> Option<(f64, f64)> {
        minmax(self.coordinate_iter(axis))
    }
    /// Returns the range of a velocity component
    pub fn velocity_range(&self, axis: Axis) -> Option<(f64, f64)> {
        minmax(self.velocity_iter(axis).filter(|x| x.is_finite()))
    }
    /// Sorted unique values of a coordinate
    pub fn unique(&self, axis: Axis) -> Vec<f64> {
        let mut values: Vec<f64> = self.coordinate_iter(axis).filter(|x| !x.is_nan()).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        values
    }
    /// The coordinate value closest to `value`
    pub fn nearest(&self, axis: Axis, value: f64) -> Option<f64> {
        self.unique(axis)
            .into_iter()
            .min_by(|a, b| (a - value).abs().total_cmp(&(b - value).abs()))
    }
    /// Samples which coordinate along `axis` is exactly `value`
    pub fn select(&self, axis: Axis, value: f64) -> impl Iterator<Item = (&[f64; 3], &[f64; 3])> {
        let k = axis.index();
        self.iter().filter(move |(xyz, _)| xyz[k] == value)
    }
    /// Mean of a velocity component over the finite samples
    pub fn mean_velocity(&self, axis: Axis) -> Option<f64> {
        let (s, n) = self
            .velocity_iter(axis)
            .filter(|x| x.is_finite())
            .fold((0f64, 0usize), |(s, n), x| (s + x, n + 1));
        (n > 0).then(|| s / n as f64)
    }
}
impl fmt::Display for FlowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "flow field [{}]:", self.len())?;
        if let Some(grid) = &self.grid {
            writeln!(f, " - dimensions: {:?}", grid.dimensions)?;
            writeln!(f, " - spacing   : {:?}m", grid.spacing)?;
            writeln!(f, " - origin    : {:?}m", grid.origin)?;
        }
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            if let Some(range) = self.range(axis) {
                writeln!(f, " - {} minmax: {:.3?}m", axis, range)?;
            }
        }
        for (axis, name) in [(Axis::X, "u"), (Axis::Y, "v"), (Axis::Z, "w")] {
            if let (Some(mean), Some(range)) = (self.mean_velocity(axis), self.velocity_range(axis))
            {
                writeln!(f, " - {}: mean {:.3}m/s, minmax {:.3?}m/s", name, mean, range)?;
            }
        }
        Ok(())
    }
}

pub(crate) fn minmax(iter: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    match iter.minmax_by(|a, b| a.total_cmp(b)) {
        MinMax(x, y) => Some((x, y)),
        OneElement(x) => Some((x, x)),
        _ => None,
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + i as f64 * step })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_positions_are_x_fastest() {
        let grid = Grid::new([2, 3, 2], [1., 10., 100.], [0.; 3]);
        let positions: Vec<_> = grid.positions().collect();
        assert_eq!(positions.len(), 12);
        assert_eq!(positions[0], [0., 0., 0.]);
        assert_eq!(positions[1], [1., 0., 0.]);
        assert_eq!(positions[2], [0., 10., 0.]);
        assert_eq!(positions[6], [0., 0., 100.]);
        assert_eq!(positions[11], [1., 20., 100.]);
    }

    #[test]
    fn from_columns_checks_lengths() {
        let a = [0., 1.];
        let b = [0.];
        assert!(matches!(
            FlowField::from_columns(&a, &a, &a, &a, &a, &b),
            Err(FlowError::ColumnLength)
        ));
        let field = FlowField::from_columns(&a, &a, &a, &a, &a, &a).unwrap();
        assert_eq!(field.len(), 2);
        assert!(field.grid().is_none());
    }

    #[test]
    fn nearest_value() {
        let grid = Grid::new([4, 1, 1], [2.5, 1., 1.], [0.; 3]);
        let field = FlowField::from_grid(grid, vec![[8., 0., 0.]; 4]).unwrap();
        assert_eq!(field.unique(Axis::X), vec![0., 2.5, 5., 7.5]);
        assert_eq!(field.nearest(Axis::X, 6.), Some(5.));
        assert_eq!(field.nearest(Axis::X, 100.), Some(7.5));
        assert_eq!(field.select(Axis::X, 2.5).count(), 1);
    }

    #[test]
    fn linspace_bounds() {
        let x = linspace(-1., 1., 5);
        assert_eq!(x, vec![-1., -0.5, 0., 0.5, 1.]);
        assert_eq!(linspace(3., 4., 1), vec![3.]);
        assert!(linspace(3., 4., 0).is_empty());
    }

    #[test]
    fn axis_parsing() {
        assert_eq!(Axis::try_from("Y"), Ok(Axis::Y));
        assert!(Axis::try_from("w").is_err());
        assert_eq!(Axis::third(Axis::Y, Axis::Z), Some(Axis::X));
        assert_eq!(Axis::third(Axis::Y, Axis::Y), None);
    }
}
