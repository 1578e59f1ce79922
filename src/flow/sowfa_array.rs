//! SOWFA array files
//!
//! SOWFA writes time-averaged flow fields as legacy ASCII VTK `STRUCTURED_POINTS`
//! files under `<case>/array.mean/<time>/`.

use super::{FlowError, FlowField, Grid, Result};
use flate2::read::GzDecoder;
use regex::Regex;
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

/// Returns the flow file of a SOWFA case
///
/// The flow file is the first entry of the first time folder in `<case_folder>/array.mean`
pub fn get_flow_file<P: AsRef<Path>>(case_folder: P) -> Result<PathBuf> {
    let array_folder = case_folder.as_ref().join("array.mean");
    let time_folder = sorted_entries(&array_folder)?
        .into_iter()
        .next()
        .ok_or_else(|| FlowError::NoFlowFile(array_folder.clone()))?;
    sorted_entries(&time_folder)?
        .into_iter()
        .next()
        .ok_or(FlowError::NoFlowFile(time_folder))
}

fn sorted_entries(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(folder)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn read_contents(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let buf = BufReader::new(file);
    let mut contents = String::new();
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        GzDecoder::new(buf).read_to_string(&mut contents)?;
    } else {
        let mut buf = buf;
        buf.read_to_string(&mut contents)?;
    }
    Ok(contents)
}

fn parse_numbers<T: std::str::FromStr>(values: &str) -> Result<Vec<T>> {
    values
        .split_whitespace()
        .map(|x| x.parse::<T>().map_err(|_| FlowError::Parse(x.to_string())))
        .collect()
}

fn triplet<T: Copy>(key: &'static str, values: Vec<T>) -> Result<[T; 3]> {
    match values.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(FlowError::Triplet(key, values.len())),
    }
}

/// Reads a SOWFA array file into a structured [FlowField]
///
/// Files with a `.gz` extension are decompressed on the fly.
pub fn read_flow_frame_sowfa<P: AsRef<Path>>(path: P) -> Result<FlowField> {
    let path = path.as_ref();
    log::info!("Loading {:?}...", path);
    let now = Instant::now();
    let contents = read_contents(path)?;

    let re_header = Regex::new(r"^(DIMENSIONS|SPACING|ASPECT_RATIO|ORIGIN)\s+(.+)$")?;
    let mut dimensions: Option<[usize; 3]> = None;
    let mut spacing: Option<[f64; 3]> = None;
    let mut origin: Option<[f64; 3]> = None;

    let mut lines = contents.lines();
    let mut data_found = false;
    for line in lines.by_ref() {
        let line = line.trim();
        if let Some(capts) = re_header.captures(line) {
            let values = &capts[2];
            match &capts[1] {
                "DIMENSIONS" => dimensions = Some(triplet("DIMENSIONS", parse_numbers(values)?)?),
                "ORIGIN" => origin = Some(triplet("ORIGIN", parse_numbers(values)?)?),
                _ => spacing = Some(triplet("SPACING", parse_numbers(values)?)?),
            }
        } else if line.starts_with("VECTORS") || line.starts_with("LOOKUP_TABLE") {
            data_found = true;
            break;
        }
    }
    let dimensions = dimensions.ok_or(FlowError::MissingHeader("DIMENSIONS"))?;
    let spacing = spacing.ok_or(FlowError::MissingHeader("SPACING"))?;
    if !data_found {
        return Err(FlowError::MissingHeader("VECTORS"));
    }

    let mut uvw: Vec<[f64; 3]> = Vec::with_capacity(dimensions.iter().product());
    for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
        let values: Vec<f64> = parse_numbers(line)?;
        if values.len() % 3 != 0 {
            return Err(FlowError::Triplet("velocity", values.len()));
        }
        uvw.extend(values.chunks(3).map(|v| [v[0], v[1], v[2]]));
    }

    let grid = Grid::new(dimensions, spacing, origin.unwrap_or_default());
    let field = FlowField::from_grid(grid, uvw)?;
    log::info!("... loaded in {:}ms", now.elapsed().as_millis());
    Ok(field)
}

/// Writes a structured [FlowField] to a SOWFA array file
pub fn write_flow_frame_sowfa<P: AsRef<Path>>(field: &FlowField, path: P) -> Result<()> {
    let grid = field.grid().ok_or(FlowError::Unstructured)?;
    let [nx, ny, nz] = grid.dimensions;
    let [dx, dy, dz] = grid.spacing;
    let [ox, oy, oz] = grid.origin;
    let mut buf = BufWriter::new(File::create(path)?);
    writeln!(buf, "# vtk DataFile Version 3.0")?;
    writeln!(buf, "array.mean")?;
    writeln!(buf, "ASCII")?;
    writeln!(buf, "DATASET STRUCTURED_POINTS")?;
    writeln!(buf, "DIMENSIONS {nx} {ny} {nz}")?;
    writeln!(buf, "ORIGIN {ox} {oy} {oz}")?;
    writeln!(buf, "SPACING {dx} {dy} {dz}")?;
    writeln!(buf, "POINT_DATA {}", field.len())?;
    writeln!(buf, "VECTORS vmean float")?;
    for [u, v, w] in field.uvw_iter() {
        writeln!(buf, "{u}\t{v}\t{w}")?;
    }
    buf.flush()?;
    Ok(())
}
