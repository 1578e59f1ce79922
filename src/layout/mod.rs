//! Wind farm layouts

use nalgebra::{Point2, Rotation2};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Deref, path::Path};

#[cfg(feature = "plot")]
mod plot;
#[cfg(feature = "plot")]
pub use plot::{visualize_layout, LayoutFigure};

#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    #[error("failed to read the layout file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse the layout CSV")]
    Csv(#[from] csv::Error),
    #[error("turbine {0:?} is not in the layout")]
    UnknownTurbine(String),
}
type Result<T> = std::result::Result<T, LayoutError>;

/// Turbine location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turbine {
    #[serde(rename = "turbine")]
    pub id: String,
    pub x: f64,
    pub y: f64,
}
impl Turbine {
    pub fn new<S: Into<String>>(id: S, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
        }
    }
}

/// Ordered pair of turbines and their relative position
#[derive(Debug, Clone, PartialEq)]
pub struct WakeLine {
    pub from: String,
    pub to: String,
    /// distance in meters
    pub distance: f64,
    /// distance in rotor diameters
    pub distance_d: f64,
    /// compass angle from `from` to `to`
    pub angle: f64,
    /// compass angle from `to` to `from`
    pub reverse_angle: f64,
    pub xy: [(f64, f64); 2],
}
impl fmt::Display for WakeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} m --- {:.2} D --- {:.2} Deg --- {:.2} Deg",
            self.distance, self.distance_d, self.angle, self.reverse_angle
        )
    }
}

/// Turbine layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout(Vec<Turbine>);
impl Deref for Layout {
    type Target = Vec<Turbine>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl From<Vec<Turbine>> for Layout {
    fn from(turbines: Vec<Turbine>) -> Self {
        Self(turbines)
    }
}
impl Layout {
    /// Loads a layout from a CSV file with the header `turbine,x,y`
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::info!("Loading {:?}...", path.as_ref());
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        let turbines = rdr.deserialize().collect::<std::result::Result<Vec<Turbine>, _>>()?;
        Ok(Self(turbines))
    }
    /// Turbine by id
    pub fn get(&self, id: &str) -> Result<&Turbine> {
        self.0
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| LayoutError::UnknownTurbine(id.to_string()))
    }
    /// Returns the layout rotated counter-clockwise by `angle` degrees about the origin
    pub fn set_direction(&self, angle: f64) -> Self {
        let rotation = Rotation2::new(angle.to_radians());
        Self(
            self.0
                .iter()
                .map(|t| {
                    let p = rotation * Point2::new(t.x, t.y);
                    Turbine {
                        x: p.x,
                        y: p.y,
                        ..t.clone()
                    }
                })
                .collect(),
        )
    }
    /// Distance between 2 turbines
    pub fn turbine_dist(&self, a: &str, b: &str) -> Result<f64> {
        let (a, b) = (self.get(a)?, self.get(b)?);
        Ok(distance(a, b))
    }
    /// Compass angle from turbine `a` to turbine `b` in degrees
    pub fn wake_angle(&self, a: &str, b: &str) -> Result<f64> {
        let (a, b) = (self.get(a)?, self.get(b)?);
        Ok(wake_angle(a, b))
    }
    /// Turbine to turbine distances
    pub fn distance_matrix(&self) -> Vec<Vec<f64>> {
        self.0
            .iter()
            .map(|a| self.0.iter().map(|b| distance(a, b)).collect())
            .collect()
    }
    /// Pairs of turbines from the farthest to the closest
    ///
    /// Pairs with the downstream turbine at a larger x than the upstream one
    /// and pairs farther than `limit_dist` are excluded.
    pub fn wake_lines(&self, d: f64, limit_dist: Option<f64>) -> Vec<WakeLine> {
        let mut lines: Vec<WakeLine> = self
            .0
            .iter()
            .flat_map(|a| self.0.iter().map(move |b| (a, b)))
            .filter_map(|(a, b)| {
                let distance = distance(a, b);
                (distance != 0.).then(|| WakeLine {
                    from: a.id.clone(),
                    to: b.id.clone(),
                    distance,
                    distance_d: distance / d,
                    angle: wake_angle(a, b),
                    reverse_angle: wake_angle(b, a),
                    xy: [(a.x, a.y), (b.x, b.y)],
                })
            })
            .filter(|line| limit_dist.map_or(true, |limit| line.distance <= limit))
            .filter(|line| line.xy[1].0 <= line.xy[0].0)
            .collect();
        lines.sort_by(|a, b| b.distance.total_cmp(&a.distance));
        lines
    }
}
impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "layout of {} turbines:", self.len())?;
        for t in self.iter() {
            writeln!(f, " - {:>6}: ({:10.2},{:10.2})", t.id, t.x, t.y)?;
        }
        Ok(())
    }
}

fn distance(a: &Turbine, b: &Turbine) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

fn wake_angle(a: &Turbine, b: &Turbine) -> f64 {
    let angle = 270. - (b.y - a.y).atan2(b.x - a.x).to_degrees();
    if angle < 0. {
        angle + 360.
    } else if angle > 360. {
        angle - 360.
    } else {
        angle
    }
}

/// End points of the rotor line of a turbine at `(x,y)` with a yaw angle in degrees
pub fn rotor_segment(x: f64, y: f64, yaw: f64, d: f64) -> [(f64, f64); 2] {
    let r = 0.5 * d;
    let (s, c) = yaw.to_radians().sin_cos();
    [(x + s * r, y - c * r), (x - s * r, y + c * r)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn layout() -> Layout {
        vec![
            Turbine::new("T0", 0., 0.),
            Turbine::new("T1", 500., 0.),
            Turbine::new("T2", 0., 300.),
        ]
        .into()
    }

    #[test]
    fn from_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layout.csv");
        std::fs::write(&path, "turbine, x, y\nT0, 0, 0\nT1, 500.5, -20\n").unwrap();
        let layout = Layout::from_csv(&path).unwrap();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.get("T1").unwrap(), &Turbine::new("T1", 500.5, -20.));
        assert!(matches!(layout.get("T9"), Err(LayoutError::UnknownTurbine(_))));
    }

    #[test]
    fn rotation_is_counter_clockwise() {
        let rotated = layout().set_direction(90.);
        let t1 = rotated.get("T1").unwrap();
        assert_relative_eq!(t1.x, 0., epsilon = 1e-9);
        assert_relative_eq!(t1.y, 500., epsilon = 1e-9);
        let t2 = rotated.get("T2").unwrap();
        assert_relative_eq!(t2.x, -300., epsilon = 1e-9);
    }

    #[test]
    fn distances_and_angles() {
        let layout = layout();
        assert_relative_eq!(layout.turbine_dist("T1", "T2").unwrap(), 583.0951894845301, epsilon = 1e-9);
        assert_relative_eq!(layout.wake_angle("T0", "T1").unwrap(), 270.);
        assert_relative_eq!(layout.wake_angle("T1", "T0").unwrap(), 90.);
        assert_relative_eq!(layout.wake_angle("T0", "T2").unwrap(), 180.);
        assert_relative_eq!(layout.wake_angle("T2", "T0").unwrap(), 360.);
        let d = layout.distance_matrix();
        assert_eq!(d[0][0], 0.);
        assert_eq!(d[0][1], 500.);
    }

    #[test]
    fn wake_lines() {
        let lines = layout().wake_lines(100., None);
        // T0->T1 and T2->T1 go toward a larger x
        assert_eq!(lines.len(), 4);
        assert_eq!((lines[0].from.as_str(), lines[0].to.as_str()), ("T1", "T2"));
        assert_relative_eq!(lines[1].distance_d, 5.);
        assert!(lines.windows(2).all(|w| w[0].distance >= w[1].distance));
        let lines = layout().wake_lines(100., Some(400.));
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].to_string(),
            "300.00 m --- 3.00 D --- 180.00 Deg --- 360.00 Deg"
        );
    }

    #[test]
    fn rotor_line() {
        let [p, q] = rotor_segment(0., 0., 0., 100.);
        assert_relative_eq!(p.1, -50.);
        assert_relative_eq!(q.1, 50.);
        let [p, _] = rotor_segment(0., 0., 90., 100.);
        assert_relative_eq!(p.0, 50.);
        assert_relative_eq!(p.1, 0., epsilon = 1e-12);
    }
}
