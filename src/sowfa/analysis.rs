//! Turbine outputs reductions

use super::{Result, SowfaError, SowfaFrame};
use crate::stats;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

/// Mean of a channel for a turbine
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAverage {
    pub case: Option<String>,
    pub turbine: usize,
    pub mean: f64,
}

/// Mean of `channel` from `start_time` onward, by case and turbine
///
/// Records without a case are averaged by turbine only.
pub fn get_average_channel(
    frame: &SowfaFrame,
    channel: &str,
    start_time: f64,
) -> Result<Vec<ChannelAverage>> {
    let k = frame.channel_index(channel)?;
    let mut groups: BTreeMap<(Option<String>, usize), Vec<f64>> = BTreeMap::new();
    for r in frame.records().iter().filter(|r| r.time >= start_time) {
        groups
            .entry((r.case.clone(), r.turbine))
            .or_default()
            .push(r.values[k]);
    }
    Ok(groups
        .into_iter()
        .map(|((case, turbine), values)| ChannelAverage {
            case,
            turbine,
            mean: stats::mean(&values).unwrap_or(f64::NAN),
        })
        .collect())
}

/// Channels summed over the turbines
#[derive(Debug, Clone, PartialEq)]
pub struct Total {
    pub case: Option<String>,
    pub time: f64,
    pub values: Vec<f64>,
}

/// Sums all the channels across turbines, by time and case
///
/// `NaN` values are ignored; the totals are sorted by time and case.
pub fn get_total_frame(frame: &SowfaFrame) -> Vec<Total> {
    let n = frame.channels().len();
    let mut index: HashMap<(u64, Option<&str>), usize> = HashMap::new();
    let mut totals: Vec<Total> = vec![];
    for r in frame.records() {
        let k = *index
            .entry((r.time.to_bits(), r.case.as_deref()))
            .or_insert_with(|| {
                totals.push(Total {
                    case: r.case.clone(),
                    time: r.time,
                    values: vec![0.; n],
                });
                totals.len() - 1
            });
        totals[k]
            .values
            .iter_mut()
            .zip(&r.values)
            .filter(|(_, v)| v.is_finite())
            .for_each(|(t, v)| *t += v);
    }
    totals.sort_by(|a, b| a.time.total_cmp(&b.time).then_with(|| a.case.cmp(&b.case)));
    totals
}

/// Turbine or farm average
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TurbineKey {
    Turbine(usize),
    Total,
}
impl fmt::Display for TurbineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurbineKey::Turbine(k) => write!(f, "{}", k),
            TurbineKey::Total => write!(f, "total"),
        }
    }
}

/// Power sample of a case
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSample {
    pub case: String,
    pub turbine: TurbineKey,
    pub time: f64,
    pub value: f64,
}

/// Median and mean power of a case for a turbine
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSummary {
    pub case: String,
    pub turbine: TurbineKey,
    pub median: f64,
    pub mean: f64,
}

/// Power of the turbines across cases
#[derive(Debug, Clone)]
pub struct PowerComparison {
    pub channel: String,
    /// percent change with respect to the baseline if true
    pub relative: bool,
    pub samples: Vec<PowerSample>,
}
impl PowerComparison {
    /// Case names in order of appearance
    pub fn cases(&self) -> Vec<String> {
        let mut cases: Vec<String> = vec![];
        for s in &self.samples {
            if !cases.contains(&s.case) {
                cases.push(s.case.clone());
            }
        }
        cases
    }
    /// Sorted turbines, the farm average last
    pub fn turbines(&self) -> Vec<TurbineKey> {
        let mut turbines: Vec<_> = self.samples.iter().map(|s| s.turbine).collect();
        turbines.sort();
        turbines.dedup();
        turbines
    }
    /// Median and mean by case and turbine
    pub fn summary(&self) -> Vec<PowerSummary> {
        let mut groups: HashMap<(&str, TurbineKey), Vec<f64>> = HashMap::new();
        for s in &self.samples {
            groups
                .entry((s.case.as_str(), s.turbine))
                .or_default()
                .push(s.value);
        }
        let turbines = self.turbines();
        self.cases()
            .iter()
            .flat_map(|case| turbines.iter().map(move |t| (case, *t)))
            .filter_map(|(case, turbine)| {
                groups.get(&(case.as_str(), turbine)).map(|values| PowerSummary {
                    case: case.clone(),
                    turbine,
                    median: stats::median(values).unwrap_or(f64::NAN),
                    mean: stats::mean(values).unwrap_or(f64::NAN),
                })
            })
            .collect()
    }
}
impl fmt::Display for PowerComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = if self.relative { " [%]" } else { "" };
        writeln!(f, "{}{}:", self.channel, unit)?;
        writeln!(f, "{:>20} {:>8} {:>14} {:>14}", "case", "turbine", "median", "mean")?;
        for s in self.summary() {
            writeln!(
                f,
                "{:>20} {:>8} {:14.3} {:14.3}",
                s.case,
                s.turbine.to_string(),
                s.median,
                s.mean
            )?;
        }
        Ok(())
    }
}

/// Compares the power of each turbine and of the farm average across cases
///
/// The farm average is the total power divided by the number of turbines.
/// If `relative` is true, the power is given as the percent change with respect
/// to the first case with `base` or `Base` in its name, matching the samples by
/// time and turbine; the baseline itself is left out.
pub fn compare_power(
    frame: &SowfaFrame,
    power_channel: &str,
    relative: bool,
) -> Result<PowerComparison> {
    let k = frame.channel_index(power_channel)?;
    if frame.records().iter().any(|r| r.case.is_none()) {
        return Err(SowfaError::MissingCase);
    }
    let num_turbines = frame.turbines().len() as f64;

    let mut samples: Vec<PowerSample> = frame
        .records()
        .iter()
        .map(|r| PowerSample {
            case: r.case.clone().unwrap_or_default(),
            turbine: TurbineKey::Turbine(r.turbine),
            time: r.time,
            value: r.values[k],
        })
        .collect();
    samples.extend(get_total_frame(frame).into_iter().map(|t| PowerSample {
        case: t.case.unwrap_or_default(),
        turbine: TurbineKey::Total,
        time: t.time,
        value: t.values[k] / num_turbines,
    }));

    if relative {
        let cases = frame.cases();
        let baseline = cases
            .iter()
            .find(|c| c.contains("base") || c.contains("Base"))
            .cloned()
            .ok_or_else(|| SowfaError::NoBaseline(cases.clone()))?;
        log::info!("{} relative to {:?}", power_channel, baseline);
        let reference: HashMap<(u64, TurbineKey), f64> = samples
            .iter()
            .filter(|s| s.case == baseline)
            .map(|s| ((s.time.to_bits(), s.turbine), s.value))
            .collect();
        samples = samples
            .into_iter()
            .filter(|s| s.case != baseline)
            .filter_map(|s| {
                reference
                    .get(&(s.time.to_bits(), s.turbine))
                    .map(|pb| PowerSample {
                        value: 100. * (s.value - pb) / pb,
                        ..s
                    })
            })
            .collect();
    }

    let comparison = PowerComparison {
        channel: power_channel.to_string(),
        relative,
        samples,
    };
    log::info!("\n{}", comparison);
    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sowfa::{load_cases, tests::write_case, Record, DEFAULT_SUB_FOLDER};
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn frame() -> SowfaFrame {
        let mut frame = SowfaFrame::new(vec!["powerGenerator".into(), "thrust".into()]);
        for (case, scale) in [("baseline", 1.), ("yaw", 1.1)] {
            for k in 0..4 {
                for turbine in 0..2 {
                    frame
                        .push(Record {
                            case: Some(case.into()),
                            time: k as f64,
                            turbine,
                            values: vec![scale * (1000. - 200. * turbine as f64), k as f64],
                        })
                        .unwrap();
                }
            }
        }
        frame
    }

    #[test]
    fn averages() {
        let averages = get_average_channel(&frame(), "thrust", 2.).unwrap();
        assert_eq!(averages.len(), 4);
        assert_eq!(averages[0].case.as_deref(), Some("baseline"));
        assert_relative_eq!(averages[0].mean, 2.5);
        assert!(get_average_channel(&frame(), "pitch", 0.).is_err());
    }

    #[test]
    fn totals() {
        let totals = get_total_frame(&frame());
        assert_eq!(totals.len(), 8);
        assert_eq!(totals[0].case.as_deref(), Some("baseline"));
        assert_eq!(totals[0].time, 0.);
        assert_relative_eq!(totals[0].values[0], 1800.);
        assert_relative_eq!(totals[1].values[0], 1980.);
        assert_relative_eq!(totals[7].values[1], 6.);
    }

    #[test]
    fn absolute_power() {
        let comparison = compare_power(&frame(), "powerGenerator", false).unwrap();
        assert_eq!(comparison.samples.len(), 24);
        assert_eq!(
            comparison.turbines(),
            vec![TurbineKey::Turbine(0), TurbineKey::Turbine(1), TurbineKey::Total]
        );
        let summary = comparison.summary();
        assert_eq!(summary.len(), 6);
        assert_eq!(summary[2].turbine, TurbineKey::Total);
        assert_relative_eq!(summary[2].median, 900.);
        assert_relative_eq!(summary[5].mean, 990.);
    }

    #[test]
    fn relative_power() {
        let comparison = compare_power(&frame(), "powerGenerator", true).unwrap();
        assert_eq!(comparison.cases(), vec!["yaw"]);
        assert_eq!(comparison.samples.len(), 12);
        comparison
            .samples
            .iter()
            .for_each(|s| assert_relative_eq!(s.value, 10., epsilon = 1e-9));
        assert!(comparison.to_string().contains("total"));
    }

    #[test]
    fn no_baseline() {
        let mut frame = frame();
        frame.set_case("yaw");
        assert!(matches!(
            compare_power(&frame, "powerGenerator", true),
            Err(SowfaError::NoBaseline(_))
        ));
        frame.records.iter_mut().for_each(|r| r.case = None);
        assert!(matches!(
            compare_power(&frame, "powerGenerator", false),
            Err(SowfaError::MissingCase)
        ));
    }

    #[test]
    fn loaded_cases() {
        let dir = tempdir().unwrap();
        write_case(&dir.path().join("Base").join(DEFAULT_SUB_FOLDER), 0., [1000., 500.]);
        write_case(&dir.path().join("wake").join(DEFAULT_SUB_FOLDER), 0., [1000., 750.]);
        let frame = load_cases(&["Base", "wake"], dir.path(), &[], DEFAULT_SUB_FOLDER).unwrap();
        let comparison = compare_power(&frame, "powerGenerator", true).unwrap();
        let summary = comparison.summary();
        assert_relative_eq!(summary[0].median, 0.);
        assert_relative_eq!(summary[1].median, 50.);
        assert_relative_eq!(summary[2].median, 100. * 250. / 1500.);
    }
}
