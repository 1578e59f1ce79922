//! Actuator line outputs sampled along the blades

use super::{Result, SowfaError};
use std::{fs, path::Path, time::Instant};

/// Blade sectional data
///
/// `data[turbine][blade]` holds one row of `n_val` blade elements per time step.
#[derive(Debug, Clone, PartialEq)]
pub struct Sectional {
    pub n_turbine: usize,
    pub n_blade: usize,
    /// time starting at 0
    pub time: Vec<f64>,
    pub dt: Option<f64>,
    pub n_val: usize,
    pub data: Vec<Vec<Vec<Vec<f64>>>>,
}
impl Sectional {
    /// Time series of a blade element
    pub fn element(&self, turbine: usize, blade: usize, element: usize) -> Option<Vec<f64>> {
        let rows = self.data.get(turbine)?.get(blade)?;
        rows.iter().map(|row| row.get(element).copied()).collect()
    }
}

/// Reads the sectional file `var_name` in `folder`
///
/// The rows are `turbine blade time dt v1 ... vn` after one header line.
pub fn read_al_sectional<P: AsRef<Path>>(folder: P, var_name: &str) -> Result<Sectional> {
    let path = folder.as_ref().join(var_name);
    log::info!("Loading {:?}...", path);
    let now = Instant::now();
    let contents = fs::read_to_string(&path)?;

    let mut rows: Vec<(usize, usize, f64, Vec<f64>)> = vec![];
    for (k, line) in contents
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, l)| !l.trim().is_empty())
    {
        let values = line
            .split_whitespace()
            .map(|s| s.parse::<f64>().map_err(|_| SowfaError::Parse(s.to_string())))
            .collect::<Result<Vec<f64>>>()?;
        if values.len() < 5 {
            return Err(SowfaError::Row {
                file: path.clone(),
                line: k + 1,
            });
        }
        rows.push((
            values[0] as usize,
            values[1] as usize,
            values[2],
            values[4..].to_vec(),
        ));
    }
    let Some(n_val) = rows.first().map(|r| r.3.len()) else {
        return Err(SowfaError::Sectional(format!("no data in {:?}", path)));
    };
    if let Some(r) = rows.iter().find(|r| r.3.len() != n_val) {
        return Err(SowfaError::Sectional(format!(
            "turbine #{} blade #{} at {}s has {} values instead of {}",
            r.0,
            r.1,
            r.2,
            r.3.len(),
            n_val
        )));
    }
    let n_turbine = rows.iter().map(|r| r.0).max().map_or(0, |n| n + 1);
    let n_blade = rows.iter().map(|r| r.1).max().map_or(0, |n| n + 1);

    let mut time: Vec<f64> = vec![];
    let mut data = vec![vec![Vec::<Vec<f64>>::new(); n_blade]; n_turbine];
    for (turbine, blade, t, values) in rows {
        if time.last().map_or(true, |last| *last != t) {
            time.push(t);
        }
        data[turbine][blade].push(values);
    }
    for (t, blades) in data.iter().enumerate() {
        for (b, steps) in blades.iter().enumerate() {
            if steps.len() != time.len() {
                return Err(SowfaError::Sectional(format!(
                    "turbine #{} blade #{} has {} time steps instead of {}",
                    t,
                    b,
                    steps.len(),
                    time.len()
                )));
            }
        }
    }
    let t0 = time[0];
    time.iter_mut().for_each(|t| *t -= t0);
    let dt = (time.len() > 1).then(|| time[1] - time[0]);
    log::info!("... loaded in {:}ms", now.elapsed().as_millis());

    Ok(Sectional {
        n_turbine,
        n_blade,
        time,
        dt,
        n_val,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn contents() -> String {
        let mut s = String::from("#Turbine Blade Time(s) dt(s) lift\n");
        for k in 0..3 {
            let time = 20000. + 0.25 * k as f64;
            for t in 0..2 {
                for b in 0..3 {
                    let v = (100 * t + 10 * b + k) as f64;
                    s.push_str(&format!("{t} {b} {time} 0.25 {v} {} {}\n", v + 0.5, v + 0.25));
                }
            }
            s.push('\n');
        }
        s
    }

    #[test]
    fn read() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lift"), contents()).unwrap();
        let s = read_al_sectional(dir.path(), "lift").unwrap();
        assert_eq!((s.n_turbine, s.n_blade, s.n_val), (2, 3, 3));
        assert_eq!(s.time.len(), 3);
        assert_eq!(s.time[0], 0.);
        assert_relative_eq!(s.dt.unwrap(), 0.25);
        assert_eq!(s.data[1][2][2], vec![122., 122.5, 122.25]);
        assert_eq!(s.element(0, 1, 0), Some(vec![10., 11., 12.]));
        assert_eq!(s.element(0, 1, 5), None);
    }

    #[test]
    fn single_step() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("drag"), "header\n0 0 5.0 0.1 1 2\n0 1 5.0 0.1 3 4\n").unwrap();
        let s = read_al_sectional(dir.path(), "drag").unwrap();
        assert_eq!(s.dt, None);
        assert_eq!((s.n_turbine, s.n_blade, s.n_val), (1, 2, 2));
    }

    #[test]
    fn inconsistent_rows() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), "header\n0 0 5.0 0.1 1 2\n0 1 5.0 0.1 3\n").unwrap();
        assert!(matches!(
            read_al_sectional(dir.path(), "a"),
            Err(SowfaError::Sectional(_))
        ));
        fs::write(
            dir.path().join("b"),
            "header\n0 0 5.0 0.1 1\n0 1 5.0 0.1 3\n0 0 6.0 0.1 1\n",
        )
        .unwrap();
        assert!(matches!(
            read_al_sectional(dir.path(), "b"),
            Err(SowfaError::Sectional(_))
        ));
        fs::write(dir.path().join("c"), "header\n").unwrap();
        assert!(read_al_sectional(dir.path(), "c").is_err());
    }
}
