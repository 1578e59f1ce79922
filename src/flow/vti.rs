//! VTK XML image data (`.vti`)

use super::{FlowError, FlowField, Grid};
use itertools::Itertools;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
    time::Instant,
};

#[derive(thiserror::Error, Debug)]
pub enum VtiError {
    #[error("failed to access the vti file")]
    Io(#[from] std::io::Error),
    #[error("failed to read or write the vti XML")]
    Xml(#[from] quick_xml::Error),
    #[error("invalid flow field")]
    Flow(#[from] FlowError),
    #[error("expected {expected} samples, found {found}")]
    SampleCount { expected: usize, found: usize },
    #[error("missing {0} in the vti file")]
    Missing(&'static str),
    #[error("invalid {0} attribute: {1:?}")]
    Attribute(&'static str, String),
    #[error("unsupported DataArray format {0:?}, only ascii is supported")]
    UnsupportedFormat(String),
}
type Result<T> = std::result::Result<T, VtiError>;

fn joined<T: std::fmt::Display>(values: &[T]) -> String {
    values.iter().join(" ")
}

/// Writes the velocity of a flow field into a `.vti` file
///
/// The samples must be ordered z-major, then y, then x.
pub fn create_vti<P: AsRef<Path>>(
    field: &FlowField,
    spacing: [f64; 3],
    dimensions: [usize; 3],
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let n: usize = dimensions.iter().product();
    if field.len() != n {
        return Err(VtiError::SampleCount {
            expected: n,
            found: field.len(),
        });
    }
    log::info!("Writing {:?}...", path);
    let extent = dimensions
        .iter()
        .map(|d| format!("0 {}", d.saturating_sub(1)))
        .join(" ");
    let spacing = joined(&spacing);
    let data = field
        .uvw_iter()
        .map(|[u, v, w]| format!("{u} {v} {w}"))
        .join(" ");

    let mut writer = Writer::new_with_indent(BufWriter::new(File::create(path)?), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    let mut vtk = BytesStart::new("VTKFile");
    vtk.push_attribute(("type", "ImageData"));
    vtk.push_attribute(("version", "0.1"));
    vtk.push_attribute(("byte_order", "LittleEndian"));
    writer.write_event(Event::Start(vtk))?;
    let mut image = BytesStart::new("ImageData");
    image.push_attribute(("WholeExtent", extent.as_str()));
    image.push_attribute(("Origin", "0 0 0"));
    image.push_attribute(("Spacing", spacing.as_str()));
    writer.write_event(Event::Start(image))?;
    let mut piece = BytesStart::new("Piece");
    piece.push_attribute(("Extent", extent.as_str()));
    writer.write_event(Event::Start(piece))?;
    let mut point_data = BytesStart::new("PointData");
    point_data.push_attribute(("Vectors", "velocity"));
    writer.write_event(Event::Start(point_data))?;
    let mut array = BytesStart::new("DataArray");
    array.push_attribute(("type", "Float64"));
    array.push_attribute(("Name", "velocity"));
    array.push_attribute(("NumberOfComponents", "3"));
    array.push_attribute(("format", "ascii"));
    writer.write_event(Event::Start(array))?;
    writer.write_event(Event::Text(BytesText::new(&data)))?;
    for tag in ["DataArray", "PointData", "Piece", "ImageData", "VTKFile"] {
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
    }
    writer.into_inner().flush()?;
    Ok(())
}

fn parse_values<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<Vec<T>> {
    value
        .split_whitespace()
        .map(|x| {
            x.parse::<T>()
                .map_err(|_| VtiError::Attribute(name, value.to_string()))
        })
        .collect()
}

fn as_triplet<T: Copy>(name: &'static str, value: &str) -> Result<[T; 3]>
where
    T: std::str::FromStr,
{
    match parse_values::<T>(name, value)?.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(VtiError::Attribute(name, value.to_string())),
    }
}

/// Reads the first 3-component point data array of a `.vti` file
pub fn read_vti<P: AsRef<Path>>(path: P) -> Result<FlowField> {
    let path = path.as_ref();
    log::info!("Loading {:?}...", path);
    let now = Instant::now();
    let contents = fs::read_to_string(path)?;
    let mut reader = Reader::from_str(&contents);
    reader.trim_text(true);

    let mut extent: Option<[[i64; 2]; 3]> = None;
    let mut origin = [0f64; 3];
    let mut spacing: Option<[f64; 3]> = None;
    let mut in_point_data = false;
    let mut in_velocity = false;
    let mut found = false;
    let mut data = String::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"ImageData" => {
                    for attr in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&attr.value).into_owned();
                        match attr.key.as_ref() {
                            b"WholeExtent" => {
                                extent = match parse_values::<i64>("WholeExtent", &value)?
                                    .as_slice()
                                {
                                    &[i0, i1, j0, j1, k0, k1] if i1 >= i0 && j1 >= j0 && k1 >= k0 => {
                                        Some([[i0, i1], [j0, j1], [k0, k1]])
                                    }
                                    _ => return Err(VtiError::Attribute("WholeExtent", value)),
                                }
                            }
                            b"Origin" => origin = as_triplet("Origin", &value)?,
                            b"Spacing" => spacing = Some(as_triplet("Spacing", &value)?),
                            _ => (),
                        }
                    }
                }
                b"PointData" => in_point_data = true,
                b"DataArray" if in_point_data && !found => {
                    let mut components = 1usize;
                    let mut format = String::from("ascii");
                    for attr in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&attr.value).into_owned();
                        match attr.key.as_ref() {
                            b"NumberOfComponents" => {
                                components = value
                                    .trim()
                                    .parse()
                                    .map_err(|_| VtiError::Attribute("NumberOfComponents", value))?
                            }
                            b"format" => format = value,
                            _ => (),
                        }
                    }
                    if components == 3 {
                        if format != "ascii" {
                            return Err(VtiError::UnsupportedFormat(format));
                        }
                        in_velocity = true;
                        found = true;
                    }
                }
                _ => (),
            },
            Event::Text(t) if in_velocity => {
                data.push(' ');
                data.push_str(&t.unescape()?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"DataArray" => in_velocity = false,
                b"PointData" => in_point_data = false,
                _ => (),
            },
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }

    let extent = extent.ok_or(VtiError::Missing("WholeExtent"))?;
    let spacing = spacing.ok_or(VtiError::Missing("Spacing"))?;
    if !found {
        return Err(VtiError::Missing("3-component point data"));
    }
    let dimensions = extent.map(|[lo, hi]| (hi - lo + 1) as usize);
    // position of the first sample: origin + lower extent * spacing
    let first: [f64; 3] = std::array::from_fn(|k| origin[k] + extent[k][0] as f64 * spacing[k]);
    let values = parse_values::<f64>("DataArray", &data)?;
    if values.len() % 3 != 0 {
        return Err(VtiError::SampleCount {
            expected: dimensions.iter().product(),
            found: values.len() / 3,
        });
    }
    let uvw: Vec<[f64; 3]> = values.chunks(3).map(|v| [v[0], v[1], v[2]]).collect();
    let grid = Grid::new(dimensions, spacing, first);
    let mut field = FlowField::from_grid(grid, uvw)?;
    field.translate(first);
    log::info!("... loaded in {:}ms", now.elapsed().as_millis());
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn field() -> FlowField {
        let grid = Grid::new([3, 2, 2], [10., 5., 2.], [0.; 3]);
        let uvw = (0..12)
            .map(|i| [8. - 0.1 * i as f64, 0.5 * i as f64, -0.25])
            .collect();
        FlowField::from_grid(grid, uvw).unwrap()
    }

    #[test]
    fn round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.vti");
        let field = field();
        create_vti(&field, [10., 5., 2.], [3, 2, 2], &path).unwrap();
        let back = read_vti(&path).unwrap();
        let grid = back.grid().unwrap();
        assert_eq!(grid.dimensions, [3, 2, 2]);
        assert_eq!(grid.spacing, [10., 5., 2.]);
        assert!(back.uvw_iter().eq(field.uvw_iter()));
        assert!(back.xyz_iter().eq(field.xyz_iter()));
    }

    #[test]
    fn sample_count_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.vti");
        assert!(matches!(
            create_vti(&field(), [1.; 3], [2, 2, 2], &path),
            Err(VtiError::SampleCount {
                expected: 8,
                found: 12
            })
        ));
    }

    #[test]
    fn origin_offsets_positions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.vti");
        fs::write(
            &path,
            r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="0.1">
  <ImageData WholeExtent="0 1 0 0 0 0" Origin="100 50 0" Spacing="2 1 1">
    <Piece Extent="0 1 0 0 0 0">
      <PointData Vectors="U">
        <DataArray type="Float64" Name="U" NumberOfComponents="3" format="ascii">
          1 2 3
          4 5 6
        </DataArray>
      </PointData>
    </Piece>
  </ImageData>
</VTKFile>"#,
        )
        .unwrap();
        let field = read_vti(&path).unwrap();
        let xyz: Vec<_> = field.xyz_iter().cloned().collect();
        assert_eq!(xyz, vec![[100., 50., 0.], [102., 50., 0.]]);
        assert_eq!(field.origin(), [100., 50., 0.]);
    }

    fn write_extent(path: &Path, extent: &str) {
        fs::write(
            path,
            format!(
                r#"<VTKFile type="ImageData">
  <ImageData WholeExtent="{extent}" Origin="100 50 0" Spacing="2 1 1">
    <Piece Extent="{extent}">
      <PointData>
        <DataArray type="Float64" Name="U" NumberOfComponents="3" format="ascii">1 2 3 4 5 6</DataArray>
      </PointData>
    </Piece>
  </ImageData>
</VTKFile>"#
            ),
        )
        .unwrap();
    }

    #[test]
    fn negative_extent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.vti");
        write_extent(&path, "-1 0 0 0 0 0");
        let field = read_vti(&path).unwrap();
        assert_eq!(field.grid().unwrap().dimensions, [2, 1, 1]);
        let xyz: Vec<_> = field.xyz_iter().cloned().collect();
        assert_eq!(xyz, vec![[98., 50., 0.], [100., 50., 0.]]);
    }

    #[test]
    fn reversed_extent_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.vti");
        write_extent(&path, "3 0 0 0 0 0");
        assert!(matches!(
            read_vti(&path),
            Err(VtiError::Attribute("WholeExtent", _))
        ));
    }

    #[test]
    fn binary_arrays_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flow.vti");
        fs::write(
            &path,
            r#"<VTKFile type="ImageData">
  <ImageData WholeExtent="0 0 0 0 0 0" Origin="0 0 0" Spacing="1 1 1">
    <Piece Extent="0 0 0 0 0 0">
      <PointData>
        <DataArray type="Float64" Name="U" NumberOfComponents="3" format="binary">AAAA</DataArray>
      </PointData>
    </Piece>
  </ImageData>
</VTKFile>"#,
        )
        .unwrap();
        assert!(matches!(
            read_vti(&path),
            Err(VtiError::UnsupportedFormat(f)) if f == "binary"
        ));
    }
}
