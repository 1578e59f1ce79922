//! SOWFA turbine outputs
//!
//! SOWFA writes one file per channel in `<case>/turbineOutput/<start time>/`.
//! Each file starts with a header line followed by rows of `turbine time dt value`.

use rayon::prelude::*;
use std::{
    collections::HashMap,
    env, fmt, fs,
    path::{Path, PathBuf},
    time::Instant,
};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub mod analysis;
#[cfg(feature = "plot")]
pub mod plot;
pub mod power;
pub mod sectional;

pub use analysis::{compare_power, get_average_channel, get_total_frame, PowerComparison};
pub use power::PowerCurve;
pub use sectional::{read_al_sectional, Sectional};

/// Default turbine output folder below a case folder
pub const DEFAULT_SUB_FOLDER: &str = "turbineOutput/20000";

#[derive(thiserror::Error, Debug)]
pub enum SowfaError {
    #[error("failed to read SOWFA outputs")]
    Io(#[from] std::io::Error),
    #[error("is {0:?} a data folder?")]
    NotDataFolder(PathBuf),
    #[error("invalid row #{line} in {file:?}")]
    Row { file: PathBuf, line: usize },
    #[error("failed to parse {0:?} as a number")]
    Parse(String),
    #[error("name and case lists must be of the same length ({names} names for {cases} cases)")]
    CaseNames { cases: usize, names: usize },
    #[error("channel {0:?} not found")]
    Channel(String),
    #[error("expected {expected} values per record, found {found}")]
    RecordWidth { expected: usize, found: usize },
    #[error("records must be tagged with a case")]
    MissingCase,
    #[error("no case name with base or Base in {0:?}")]
    NoBaseline(Vec<String>),
    #[error("the period length must be positive, found {0}")]
    Period(f64),
    #[error("environment variable not set")]
    Env(#[from] env::VarError),
    #[error("invalid case pattern")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to write the CSV file")]
    Csv(#[from] csv::Error),
    #[error("invalid sectional file: {0}")]
    Sectional(String),
    #[error("invalid power curve: {0}")]
    PowerCurve(&'static str),
}
type Result<T> = std::result::Result<T, SowfaError>;

/// Turbine channels read by default
#[derive(EnumIter, AsRefStr, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "camelCase")]
pub enum Channel {
    NacYaw,
    RotSpeedFiltered,
    RotSpeed,
    Thrust,
    TorqueGen,
    PowerRotor,
    PowerGenerator,
    TorqueRotor,
    Azimuth,
    Pitch,
}

/// Channels values of a turbine at a given time
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub case: Option<String>,
    pub time: f64,
    pub turbine: usize,
    pub values: Vec<f64>,
}

/// Table of turbine outputs
#[derive(Debug, Clone, Default)]
pub struct SowfaFrame {
    channels: Vec<String>,
    records: Vec<Record>,
}
impl SowfaFrame {
    pub fn new(channels: Vec<String>) -> Self {
        Self {
            channels,
            records: vec![],
        }
    }
    /// Adds a record, the number of values must match the number of channels
    pub fn push(&mut self, record: Record) -> Result<()> {
        if record.values.len() != self.channels.len() {
            return Err(SowfaError::RecordWidth {
                expected: self.channels.len(),
                found: record.values.len(),
            });
        }
        self.records.push(record);
        Ok(())
    }
    pub fn channels(&self) -> &[String] {
        &self.channels
    }
    pub fn records(&self) -> &[Record] {
        &self.records
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    /// Index of a channel in the record values
    pub fn channel_index(&self, channel: &str) -> Result<usize> {
        self.channels
            .iter()
            .position(|c| c == channel)
            .ok_or_else(|| SowfaError::Channel(channel.to_string()))
    }
    /// All the values of a channel
    pub fn column(&self, channel: &str) -> Result<Vec<f64>> {
        let k = self.channel_index(channel)?;
        Ok(self.records.iter().map(|r| r.values[k]).collect())
    }
    /// Sorted unique turbine indices
    pub fn turbines(&self) -> Vec<usize> {
        let mut turbines: Vec<usize> = self.records.iter().map(|r| r.turbine).collect();
        turbines.sort_unstable();
        turbines.dedup();
        turbines
    }
    /// Case names in order of appearance
    pub fn cases(&self) -> Vec<String> {
        let mut cases: Vec<String> = vec![];
        for case in self.records.iter().filter_map(|r| r.case.as_ref()) {
            if !cases.contains(case) {
                cases.push(case.clone());
            }
        }
        cases
    }
    /// Sorted unique times
    pub fn times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self.records.iter().map(|r| r.time).collect();
        times.sort_by(|a, b| a.total_cmp(b));
        times.dedup();
        times
    }
    /// Tags every record with the case name
    pub fn set_case<S: Into<String>>(&mut self, case: S) {
        let case = case.into();
        self.records
            .iter_mut()
            .for_each(|r| r.case = Some(case.clone()));
    }
    /// Appends the records of another frame
    ///
    /// Channels missing from either frame are filled with `NaN`
    pub fn append(&mut self, other: SowfaFrame) {
        for channel in &other.channels {
            if !self.channels.contains(channel) {
                self.channels.push(channel.clone());
                self.records.iter_mut().for_each(|r| r.values.push(f64::NAN));
            }
        }
        let mapping: Vec<Option<usize>> = self
            .channels
            .iter()
            .map(|c| other.channels.iter().position(|o| o == c))
            .collect();
        self.records.extend(other.records.into_iter().map(|r| Record {
            values: mapping
                .iter()
                .map(|k| k.map_or(f64::NAN, |k| r.values[k]))
                .collect(),
            ..r
        }));
    }
    /// Shifts the time so that it starts at 0
    pub fn zero_time(&mut self) {
        let t0 = self
            .records
            .iter()
            .map(|r| r.time)
            .fold(f64::INFINITY, f64::min);
        if t0.is_finite() {
            self.records.iter_mut().for_each(|r| r.time -= t0);
        }
    }
    /// Time step between the first two sample times
    pub fn time_step(&self) -> Option<f64> {
        let times = self.times();
        (times.len() > 1).then(|| times[1] - times[0])
    }
    /// Keeps only whole periods of `per_time` seconds
    ///
    /// Returns the number of sample times left. If the record is shorter than
    /// a period, nothing is removed.
    pub fn truncate_to_periods(&mut self, per_time: f64) -> Result<usize> {
        if !(per_time > 0.) {
            return Err(SowfaError::Period(per_time));
        }
        let times = self.times();
        let n = times.len();
        let Some(dt) = self.time_step() else {
            return Ok(n);
        };
        let per_length = per_time / dt;
        let length = ((n as f64 / per_length).floor() * per_length) as usize;
        if length == 0 || length >= n {
            return Ok(n);
        }
        let end = times[length];
        self.records.retain(|r| r.time < end);
        log::info!("{} sample times truncated to {}", n, length);
        Ok(length)
    }
    /// Writes the table into a CSV file
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        let with_case = self.records.iter().any(|r| r.case.is_some());
        let mut header: Vec<&str> = vec![];
        if with_case {
            header.push("case");
        }
        header.extend(["time", "turbine"]);
        header.extend(self.channels.iter().map(|c| c.as_str()));
        wtr.write_record(&header)?;
        for r in &self.records {
            let mut row: Vec<String> = vec![];
            if with_case {
                row.push(r.case.clone().unwrap_or_default());
            }
            row.push(r.time.to_string());
            row.push(r.turbine.to_string());
            row.extend(r.values.iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
impl fmt::Display for SowfaFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SOWFA outputs [{}]:", self.len())?;
        writeln!(f, " - channels: {:?}", self.channels)?;
        writeln!(f, " - turbines: {:?}", self.turbines())?;
        let cases = self.cases();
        if !cases.is_empty() {
            writeln!(f, " - cases   : {:?}", cases)?;
        }
        let times = self.times();
        if let (Some(t0), Some(t1)) = (times.first(), times.last()) {
            writeln!(f, " - time    : [{:.3},{:.3}]s ({} samples)", t0, t1, times.len())?;
        }
        Ok(())
    }
}

/// Period index of a time sample
pub fn period(time: f64, per_time: f64) -> f64 {
    (time / per_time).floor()
}

/// `(time, turbine, value)` rows of a channel file
fn read_channel(path: &Path) -> Result<Vec<(f64, usize, f64)>> {
    let contents = fs::read_to_string(path)?;
    let number = |s: &str| s.parse::<f64>().map_err(|_| SowfaError::Parse(s.to_string()));
    contents
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(k, line)| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(SowfaError::Row {
                    file: path.to_path_buf(),
                    line: k + 1,
                });
            }
            Ok((number(fields[1])?, number(fields[0])? as usize, number(fields[3])?))
        })
        .collect()
}

/// Reads the channels of a turbine output folder
///
/// If `channels` is empty, all the [Channel]s found in the folder are read.
/// The records are given by the first channel, the other channels are matched
/// on time and turbine and set to `NaN` where there is no match.
pub fn read_sowfa_df<P: AsRef<Path>, S: AsRef<str>>(folder: P, channels: &[S]) -> Result<SowfaFrame> {
    let folder = folder.as_ref();
    log::info!("Loading {:?}...", folder);
    let now = Instant::now();
    let channels: Vec<String> = if channels.is_empty() {
        let mut names: Vec<String> = match fs::read_dir(folder) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
                .filter(|name| Channel::iter().any(|c| c.as_ref() == name))
                .collect(),
            Err(_) => vec![],
        };
        names.sort();
        names
    } else {
        channels.iter().map(|c| c.as_ref().to_string()).collect()
    };
    if channels.is_empty() {
        return Err(SowfaError::NotDataFolder(folder.to_path_buf()));
    }

    let mut frame = SowfaFrame::new(channels.clone());
    let mut index: HashMap<(u64, usize), usize> = HashMap::new();
    for (c, channel) in channels.iter().enumerate() {
        let rows = read_channel(&folder.join(channel))?;
        if c == 0 {
            for (time, turbine, value) in rows {
                let mut values = vec![f64::NAN; channels.len()];
                values[0] = value;
                index.insert((time.to_bits(), turbine), frame.records.len());
                frame.records.push(Record {
                    case: None,
                    time,
                    turbine,
                    values,
                });
            }
        } else {
            for (time, turbine, value) in rows {
                if let Some(&k) = index.get(&(time.to_bits(), turbine)) {
                    frame.records[k].values[c] = value;
                }
            }
        }
    }
    log::info!("... loaded in {:}ms", now.elapsed().as_millis());
    Ok(frame)
}

/// Loads the turbine outputs of several cases into a single frame
///
/// The outputs of each case are read from `<case_folder>/<case>/<sub_folder>`,
/// the records are tagged with the case names (defaulting to the case list)
/// and time starts at 0.
pub fn load_cases<P, S>(
    case_list: &[S],
    case_folder: P,
    case_names: &[S],
    sub_folder: &str,
) -> Result<SowfaFrame>
where
    P: AsRef<Path>,
    S: AsRef<str> + Sync,
{
    let names = if case_names.is_empty() {
        case_list
    } else {
        case_names
    };
    if names.len() != case_list.len() {
        return Err(SowfaError::CaseNames {
            cases: case_list.len(),
            names: names.len(),
        });
    }
    let case_folder = case_folder.as_ref();
    let frames = case_list
        .par_iter()
        .zip(names.par_iter())
        .map(|(case, name)| {
            let mut frame = read_sowfa_df::<_, &str>(
                case_folder.join(case.as_ref()).join(sub_folder),
                &[],
            )?;
            frame.set_case(name.as_ref());
            Ok(frame)
        })
        .collect::<Result<Vec<SowfaFrame>>>()?;
    let mut frame = SowfaFrame::default();
    for f in frames {
        frame.append(f);
    }
    frame.zero_time();
    Ok(frame)
}

/// Root folder of the SOWFA cases from the `SOWFA_REPO` environment variable
pub fn cases_root() -> Result<PathBuf> {
    Ok(PathBuf::from(env::var("SOWFA_REPO")?))
}

/// Sorted case folders in `root` matching the glob `pattern`
pub fn find_cases<P: AsRef<Path>>(root: P, pattern: &str) -> Result<Vec<String>> {
    let root = root.as_ref();
    let mut cases: Vec<String> = glob::glob(&root.join(pattern).to_string_lossy())?
        .filter_map(|p| p.ok())
        .filter(|p| p.is_dir())
        .filter_map(|p| {
            p.strip_prefix(root)
                .ok()
                .and_then(|p| p.to_str())
                .map(|p| p.to_string())
        })
        .collect();
    cases.sort();
    Ok(cases)
}

/// Cases listed in the file given by the `SOWFA_CASES` environment variable
///
/// One case per line, empty lines and lines starting with `#` are skipped.
pub fn cases_from_env() -> Result<Vec<String>> {
    cases_from_var("SOWFA_CASES")
}

/// Cases listed in the file given by the environment variable `var`
pub fn cases_from_var(var: &str) -> Result<Vec<String>> {
    let path = env::var(var)?;
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_string())
        .collect())
}
