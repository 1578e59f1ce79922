//! Turbine power curve
//!
//! Power from a tabulated power coefficient, `Cp` against wind speed,
//! loaded from CSV or built in memory.

use super::{Result, SowfaError};
use serde::Deserialize;
use std::{f64::consts::PI, path::Path};

#[derive(Deserialize)]
struct CpRow {
    wind_speed: f64,
    #[serde(alias = "CP")]
    cp: f64,
}

/// Turbine power from a tabulated power coefficient
#[derive(Debug, Clone, PartialEq)]
pub struct PowerCurve {
    wind_speed: Vec<f64>,
    cp: Vec<f64>,
    /// air density [kg/m^3]
    pub density: f64,
    /// rotor radius [m]
    pub radius: f64,
}
impl PowerCurve {
    /// Creates a power curve, the wind speeds must be increasing
    pub fn new(wind_speed: Vec<f64>, cp: Vec<f64>, density: f64, radius: f64) -> Result<Self> {
        if wind_speed.len() != cp.len() {
            return Err(SowfaError::PowerCurve("wind speed and Cp lengths differ"));
        }
        if wind_speed.len() < 2 {
            return Err(SowfaError::PowerCurve("at least 2 points are required"));
        }
        if wind_speed.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SowfaError::PowerCurve("wind speeds must be increasing"));
        }
        Ok(Self {
            wind_speed,
            cp,
            density,
            radius,
        })
    }
    /// Loads the `wind_speed,CP` table of a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, density: f64, radius: f64) -> Result<Self> {
        log::info!("Loading {:?}...", path.as_ref());
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        let (wind_speed, cp): (Vec<f64>, Vec<f64>) = rdr
            .deserialize()
            .map(|row| row.map(|row: CpRow| (row.wind_speed, row.cp)))
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();
        Self::new(wind_speed, cp, density, radius)
    }
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }
    /// Power coefficient linearly interpolated at `ws`
    ///
    /// Returns `None` outside the tabulated wind speeds.
    pub fn cp(&self, ws: f64) -> Option<f64> {
        let k = self.wind_speed.windows(2).position(|w| ws >= w[0] && ws <= w[1])?;
        let (x0, x1) = (self.wind_speed[k], self.wind_speed[k + 1]);
        let (y0, y1) = (self.cp[k], self.cp[k + 1]);
        Some(y0 + (y1 - y0) * (ws - x0) / (x1 - x0))
    }
    /// Power [W] at wind speed `ws` [m/s]: `0.5 rho pi R^2 Cp ws^3`
    pub fn power(&self, ws: f64) -> Option<f64> {
        let area = PI * self.radius.powi(2);
        self.cp(ws)
            .map(|cp| 0.5 * self.density * area * cp * ws.powi(3))
    }
}
