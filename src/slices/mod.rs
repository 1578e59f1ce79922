//! Time averaged slices
//!
//! OpenFOAM samples the flow on surfaces into `<case>/[postProcessing/]<slice folder>/<time>/<slice>.vtk`.
//! [SliceAverager] averages the cell data of every slice over a time window and
//! writes the means into `<case>/<output folder>/<slice>.avg_pickle`.

use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Instant,
};

pub mod polydata;
pub use polydata::{read_polydata, DataArray, PolyData};

#[derive(thiserror::Error, Debug)]
pub enum SliceError {
    #[error("failed to read or write slices")]
    Io(#[from] std::io::Error),
    #[error("invalid VTK file: {0}")]
    Vtk(String),
    #[error("unsupported VTK file format: {0}")]
    UnsupportedFormat(String),
    #[error("{0:?} has no cell data")]
    NoCellData(PathBuf),
    #[error("{0:?} does not match the cell data of the first slice")]
    Mismatch(PathBuf),
    #[error("no slice to average")]
    NoSlice,
    #[error("the time step must be positive, found {0}")]
    Delta(i64),
    #[error("failed to write the pickle file")]
    Pickle(#[from] serde_pickle::Error),
}
type Result<T> = std::result::Result<T, SliceError>;

/// Time averaged slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceMean {
    /// `scalar`, `vector` or `field`
    #[serde(rename = "dataType")]
    pub data_type: String,
    #[serde(rename = "cellCenters")]
    pub cell_centers: Vec<[f64; 3]>,
    /// mean cell values, one entry per cell
    #[serde(rename = "cellData")]
    pub cell_data: Vec<Vec<f64>>,
}
impl SliceMean {
    /// Writes the mean slice into a pickle file
    pub fn to_pickle<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = fs::File::create(path)?;
        serde_pickle::to_writer(&mut file, self, Default::default())?;
        Ok(())
    }
    pub fn from_pickle<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path)?;
        Ok(serde_pickle::from_reader(file, Default::default())?)
    }
}

/// Averages the first cell data array of VTK slices
pub fn average_vtks<P: AsRef<Path>>(files: &[P]) -> Result<SliceMean> {
    let mut files = files.iter().map(|f| f.as_ref());
    let first = files.next().ok_or(SliceError::NoSlice)?;
    let data = read_polydata(first)?;
    let array = data
        .cell_data
        .first()
        .ok_or_else(|| SliceError::NoCellData(first.to_path_buf()))?;
    let components = array.components;
    let mut sum = array.values.clone();
    let mut n = 1usize;
    for file in files {
        let values = read_polydata(file)?
            .cell_data
            .into_iter()
            .next()
            .ok_or_else(|| SliceError::NoCellData(file.to_path_buf()))?;
        if values.components != components || values.values.len() != sum.len() {
            return Err(SliceError::Mismatch(file.to_path_buf()));
        }
        sum.iter_mut().zip(&values.values).for_each(|(s, v)| *s += v);
        n += 1;
    }
    let data_type = match components {
        1 => "scalar",
        3 => "vector",
        _ => "field",
    };
    Ok(SliceMean {
        data_type: data_type.into(),
        cell_centers: data.cell_centers()?,
        cell_data: sum
            .chunks(components.max(1))
            .map(|c| c.iter().map(|s| s / n as f64).collect())
            .collect(),
    })
}

/// Case with slices
#[derive(Debug, Clone, PartialEq)]
pub struct SliceCase {
    pub name: String,
    /// folder with the time folders
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Averaging of a slice over a time window
#[derive(Debug, Clone, PartialEq)]
pub struct SliceJob {
    pub case: String,
    pub slice: String,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}
impl SliceJob {
    pub fn run(&self) -> Result<()> {
        average_vtks(&self.inputs)?.to_pickle(&self.output)
    }
}

/// Outcome of a batch of slice averages
#[derive(Debug, Default)]
pub struct SliceReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, SliceError)>,
}
impl fmt::Display for SliceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "mean slices: {} written, {} skipped, {} failed",
            self.written.len(),
            self.skipped.len(),
            self.failed.len()
        )?;
        for (path, e) in &self.failed {
            writeln!(f, " - {:?}: {}", path, e)?;
        }
        Ok(())
    }
}

/// Mean slices batch builder
#[derive(Debug, Clone)]
pub struct SliceAverager {
    root: PathBuf,
    start_time: i64,
    stop_time: i64,
    delta: i64,
    slice_folder: String,
    output_folder: String,
}
impl Default for SliceAverager {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            start_time: 600,
            stop_time: 1000,
            delta: 10,
            slice_folder: "sliceDataInstant".into(),
            output_folder: "slicePost".into(),
        }
    }
}
impl SliceAverager {
    /// Averager of the cases in `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Default::default()
        }
    }
    /// Start of the time window in seconds from the first time folder
    pub fn start_time(self, start_time: i64) -> Self {
        Self { start_time, ..self }
    }
    /// End of the time window in seconds from the first time folder
    pub fn stop_time(self, stop_time: i64) -> Self {
        Self { stop_time, ..self }
    }
    /// Time between averaged samples
    pub fn delta(self, delta: i64) -> Self {
        Self { delta, ..self }
    }
    pub fn slice_folder<S: Into<String>>(self, slice_folder: S) -> Self {
        Self {
            slice_folder: slice_folder.into(),
            ..self
        }
    }
    pub fn output_folder<S: Into<String>>(self, output_folder: S) -> Self {
        Self {
            output_folder: output_folder.into(),
            ..self
        }
    }
    /// Cases with a slice folder, sorted by name
    pub fn cases(&self) -> Result<Vec<SliceCase>> {
        let mut cases: Vec<SliceCase> = fs::read_dir(&self.root)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                let path = e.path();
                let name = e.file_name().to_str()?.to_string();
                let input = [
                    path.join(&self.slice_folder),
                    path.join("postProcessing").join(&self.slice_folder),
                ]
                .into_iter()
                .find(|p| p.is_dir())?;
                Some(SliceCase {
                    name,
                    input,
                    output: path.join(&self.output_folder),
                })
            })
            .collect();
        cases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cases)
    }
    /// Time folders selected for averaging
    ///
    /// Returns `None` if the case does not span the time window.
    pub fn time_window(&self, time_folders: &[i64]) -> Option<Vec<i64>> {
        let (first, last) = (*time_folders.first()?, *time_folders.last()?);
        if first + self.start_time >= last - 2 * self.delta {
            return None;
        }
        let step = usize::try_from(self.delta).ok().filter(|d| *d > 0)?;
        Some(
            (first + self.start_time..first + self.stop_time)
                .step_by(step)
                .collect(),
        )
    }
    /// Slice averaging jobs and the existing outputs
    pub fn jobs(&self) -> Result<(Vec<SliceJob>, Vec<PathBuf>)> {
        if self.delta <= 0 {
            return Err(SliceError::Delta(self.delta));
        }
        let mut jobs = vec![];
        let mut skipped = vec![];
        for case in self.cases()? {
            log::info!("Processing case: {}", case.name);
            let folders = time_folders(&case.input)?;
            let Some(window) = self.time_window(&folders) else {
                log::warn!("{}: not enough time folders", case.name);
                continue;
            };
            let Some(first) = window.first() else {
                log::warn!("{}: empty time window", case.name);
                continue;
            };
            log::info!(
                "...{} folders (originally {}), {}, {}, {}, {}",
                window.len(),
                folders.len(),
                folders[0],
                first,
                folders[folders.len() - 1],
                window[window.len() - 1]
            );
            let slices = match slice_names(&case.input.join(first.to_string())) {
                Ok(slices) => slices,
                Err(e) => {
                    log::warn!("{}: {}", case.name, e);
                    continue;
                }
            };
            fs::create_dir_all(&case.output)?;
            for slice in slices {
                let output = case.output.join(format!("{}.avg_pickle", slice));
                if output.exists() {
                    log::info!("{:?} already exists", output);
                    skipped.push(output);
                    continue;
                }
                jobs.push(SliceJob {
                    case: case.name.clone(),
                    inputs: window
                        .iter()
                        .map(|t| case.input.join(t.to_string()).join(format!("{}.vtk", slice)))
                        .collect(),
                    slice,
                    output,
                });
            }
        }
        Ok((jobs, skipped))
    }
    /// Averages all the slices in parallel
    ///
    /// Failed jobs are logged and listed in the report.
    pub fn run(&self) -> Result<SliceReport> {
        let now = Instant::now();
        let (jobs, skipped) = self.jobs()?;
        let pb = ProgressBar::new(jobs.len() as u64);
        let results: Vec<(PathBuf, Result<()>)> = jobs
            .into_par_iter()
            .progress_with(pb)
            .map(|job| {
                let result = job.run();
                (job.output, result)
            })
            .collect();
        let mut report = SliceReport {
            skipped,
            ..Default::default()
        };
        for (output, result) in results {
            match result {
                Ok(()) => report.written.push(output),
                Err(e) => {
                    log::error!("{:?}: {}", output, e);
                    report.failed.push((output, e));
                }
            }
        }
        log::info!("... slices averaged in {:}s", now.elapsed().as_secs());
        Ok(report)
    }
}

/// Sorted integer-named sub-folders
pub fn time_folders<P: AsRef<Path>>(folder: P) -> Result<Vec<i64>> {
    let mut times: Vec<i64> = fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str()?.parse().ok())
        .collect();
    times.sort_unstable();
    Ok(times)
}

/// Sorted file stems of a folder
fn slice_names(folder: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| Some(e.path().file_stem()?.to_str()?.to_string()))
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polydata::tests::square;
    use tempfile::tempdir;

    fn write_case(root: &Path, case: &str, nested: bool, times: std::ops::Range<i64>) {
        let mut input = root.join(case);
        if nested {
            input = input.join("postProcessing");
        }
        input = input.join("sliceDataInstant");
        for t in times {
            let folder = input.join(t.to_string());
            fs::create_dir_all(&folder).unwrap();
            fs::write(folder.join("U_hub.vtk"), square(t as f64)).unwrap();
        }
    }

    #[test]
    fn window() {
        let averager = SliceAverager::default();
        let folders: Vec<i64> = (0..=1200).step_by(10).map(|t| 20000 + t).collect();
        let window = averager.time_window(&folders).unwrap();
        assert_eq!(window.len(), 40);
        assert_eq!(window[0], 20600);
        assert_eq!(window[39], 20990);
        assert_eq!(averager.time_window(&[20000, 20610]), None);
        assert_eq!(averager.time_window(&[]), None);
    }

    #[test]
    fn average() {
        let dir = tempdir().unwrap();
        let files: Vec<PathBuf> = (1..=3)
            .map(|k| {
                let path = dir.path().join(format!("{}.vtk", k));
                fs::write(&path, square(k as f64)).unwrap();
                path
            })
            .collect();
        let mean = average_vtks(&files).unwrap();
        assert_eq!(mean.data_type, "vector");
        assert_eq!(mean.cell_centers.len(), 2);
        assert_relative_eq!(mean.cell_data[0][0], 2.);
        assert_relative_eq!(mean.cell_data[1][0], 4.);
        assert_relative_eq!(mean.cell_data[1][1], 1.);
        assert!(matches!(
            average_vtks::<PathBuf>(&[]),
            Err(SliceError::NoSlice)
        ));
    }

    #[test]
    fn pickle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("U.avg_pickle");
        let mean = SliceMean {
            data_type: "scalar".into(),
            cell_centers: vec![[0., 1., 2.]],
            cell_data: vec![vec![3.]],
        };
        mean.to_pickle(&path).unwrap();
        assert_eq!(SliceMean::from_pickle(&path).unwrap(), mean);
    }

    #[test]
    fn batch() {
        let dir = tempdir().unwrap();
        write_case(dir.path(), "a", false, 100..106);
        write_case(dir.path(), "b", true, 100..106);
        write_case(dir.path(), "short", false, 100..102);
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        let averager = SliceAverager::new(dir.path())
            .start_time(1)
            .stop_time(4)
            .delta(1);
        let cases = averager.cases().unwrap();
        assert_eq!(
            cases.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "short"]
        );
        let (jobs, _) = averager.jobs().unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].inputs.len(), 3);

        let report = averager.run().unwrap();
        assert_eq!(report.written.len(), 2);
        assert!(report.failed.is_empty());
        let mean = SliceMean::from_pickle(dir.path().join("b/slicePost/U_hub.avg_pickle")).unwrap();
        // times 101, 102 and 103
        assert_relative_eq!(mean.cell_data[0][0], 102.);

        let report = averager.run().unwrap();
        assert_eq!((report.written.len(), report.skipped.len()), (0, 2));
    }

    #[test]
    fn failed_jobs_are_reported() {
        let dir = tempdir().unwrap();
        write_case(dir.path(), "a", false, 100..106);
        fs::write(
            dir.path().join("a/sliceDataInstant/102/U_hub.vtk"),
            "# vtk DataFile Version 2.0\nbroken\nBINARY\n",
        )
        .unwrap();
        let report = SliceAverager::new(dir.path())
            .start_time(1)
            .stop_time(4)
            .delta(1)
            .run()
            .unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(report.to_string().contains("1 failed"));
        assert!(matches!(
            SliceAverager::new(dir.path()).delta(0).jobs(),
            Err(SliceError::Delta(0))
        ));
    }
}
