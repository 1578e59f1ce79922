//! Legacy VTK ASCII `POLYDATA` files
//!
//! Only the sections written by OpenFOAM surface sampling are supported:
//! `POINTS`, `POLYGONS` and the `SCALARS`, `VECTORS` and `FIELD` attributes.

use super::{Result, SliceError};
use std::{fs, path::Path, str::SplitWhitespace};

/// Named cell or point attribute
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub name: String,
    pub components: usize,
    /// tuples one after the other
    pub values: Vec<f64>,
}
impl DataArray {
    pub fn n_tuples(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.values.len() / self.components
        }
    }
    pub fn tuples(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.components.max(1))
    }
}

/// Polygonal surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolyData {
    pub points: Vec<[f64; 3]>,
    pub polygons: Vec<Vec<usize>>,
    pub cell_data: Vec<DataArray>,
    pub point_data: Vec<DataArray>,
}
impl PolyData {
    /// Vertex average of each polygon
    pub fn cell_centers(&self) -> Result<Vec<[f64; 3]>> {
        self.polygons
            .iter()
            .map(|polygon| -> Result<[f64; 3]> {
                let mut c = [0f64; 3];
                for &k in polygon {
                    let p = self.points.get(k).ok_or_else(|| {
                        SliceError::Vtk(format!("point #{} out of {}", k, self.points.len()))
                    })?;
                    c.iter_mut().zip(p).for_each(|(c, p)| *c += p);
                }
                let n = polygon.len().max(1) as f64;
                Ok(c.map(|c| c / n))
            })
            .collect()
    }
}

struct Tokens<'a>(SplitWhitespace<'a>);
impl<'a> Tokens<'a> {
    fn word(&mut self, what: &str) -> Result<&'a str> {
        self.0
            .next()
            .ok_or_else(|| SliceError::Vtk(format!("unexpected end of file, expected {}", what)))
    }
    fn count(&mut self, what: &str) -> Result<usize> {
        let w = self.word(what)?;
        w.parse()
            .map_err(|_| SliceError::Vtk(format!("expected {}, found {:?}", what, w)))
    }
    fn floats(&mut self, n: usize, what: &str) -> Result<Vec<f64>> {
        (0..n)
            .map(|_| -> Result<f64> {
                let w = self.word(what)?;
                w.parse()
                    .map_err(|_| SliceError::Vtk(format!("expected {}, found {:?}", what, w)))
            })
            .collect()
    }
}

/// Parses the contents of a legacy VTK file
pub fn parse_polydata(contents: &str) -> Result<PolyData> {
    let mut lines = contents.lines();
    match lines.next() {
        Some(line) if line.starts_with("# vtk") => (),
        _ => return Err(SliceError::Vtk("missing `# vtk` header".into())),
    }
    let _title = lines.next();
    match lines.next().map(str::trim) {
        Some("ASCII") => (),
        Some(format) => return Err(SliceError::UnsupportedFormat(format.to_string())),
        None => return Err(SliceError::Vtk("missing file format".into())),
    }
    let rest: String = lines.collect::<Vec<_>>().join("\n");
    let mut tokens = Tokens(rest.split_whitespace());

    let mut data = PolyData::default();
    // number of tuples of the current attribute section, true for cell data
    let mut section: Option<(usize, bool)> = None;
    while let Some(keyword) = tokens.0.next() {
        match keyword {
            "DATASET" => match tokens.word("dataset type")? {
                "POLYDATA" => (),
                other => return Err(SliceError::UnsupportedFormat(other.to_string())),
            },
            "POINTS" => {
                let n = tokens.count("number of points")?;
                let _type = tokens.word("points type")?;
                data.points = tokens
                    .floats(3 * n, "point coordinate")?
                    .chunks(3)
                    .map(|p| [p[0], p[1], p[2]])
                    .collect();
            }
            "POLYGONS" => {
                let n = tokens.count("number of polygons")?;
                let _size = tokens.count("polygons size")?;
                data.polygons = (0..n)
                    .map(|_| -> Result<Vec<usize>> {
                        let k = tokens.count("polygon size")?;
                        (0..k).map(|_| tokens.count("point index")).collect()
                    })
                    .collect::<Result<Vec<Vec<usize>>>>()?;
            }
            "VERTICES" | "LINES" | "TRIANGLE_STRIPS" => {
                let _n = tokens.count("number of cells")?;
                let size = tokens.count("cells size")?;
                tokens.floats(size, "cell index")?;
            }
            "CELL_DATA" => section = Some((tokens.count("number of cells")?, true)),
            "POINT_DATA" => section = Some((tokens.count("number of points")?, false)),
            "SCALARS" | "VECTORS" | "FIELD" => {
                let (n, on_cells) = section.ok_or_else(|| {
                    SliceError::Vtk(format!("{} outside of CELL_DATA or POINT_DATA", keyword))
                })?;
                let arrays = match keyword {
                    "SCALARS" => {
                        let name = tokens.word("scalars name")?.to_string();
                        let _type = tokens.word("scalars type")?;
                        let mut components = 1;
                        let mut next = tokens.word("LOOKUP_TABLE")?;
                        if next != "LOOKUP_TABLE" {
                            components = next.parse().map_err(|_| {
                                SliceError::Vtk(format!("expected LOOKUP_TABLE, found {:?}", next))
                            })?;
                            next = tokens.word("LOOKUP_TABLE")?;
                        }
                        if next != "LOOKUP_TABLE" {
                            return Err(SliceError::Vtk(format!(
                                "expected LOOKUP_TABLE, found {:?}",
                                next
                            )));
                        }
                        let _table = tokens.word("lookup table name")?;
                        vec![DataArray {
                            name,
                            components,
                            values: tokens.floats(n * components, "scalar")?,
                        }]
                    }
                    "VECTORS" => {
                        let name = tokens.word("vectors name")?.to_string();
                        let _type = tokens.word("vectors type")?;
                        vec![DataArray {
                            name,
                            components: 3,
                            values: tokens.floats(3 * n, "vector component")?,
                        }]
                    }
                    _ => {
                        let _name = tokens.word("field name")?;
                        let n_array = tokens.count("number of arrays")?;
                        (0..n_array)
                            .map(|_| -> Result<DataArray> {
                                let name = tokens.word("array name")?.to_string();
                                let components = tokens.count("number of components")?;
                                let n_tuples = tokens.count("number of tuples")?;
                                let _type = tokens.word("array type")?;
                                Ok(DataArray {
                                    name,
                                    components,
                                    values: tokens.floats(components * n_tuples, "array value")?,
                                })
                            })
                            .collect::<Result<Vec<_>>>()?
                    }
                };
                if on_cells {
                    data.cell_data.extend(arrays);
                } else {
                    data.point_data.extend(arrays);
                }
            }
            other => return Err(SliceError::Vtk(format!("unsupported keyword {:?}", other))),
        }
    }
    Ok(data)
}

/// Reads a legacy VTK `POLYDATA` file
pub fn read_polydata<P: AsRef<Path>>(path: P) -> Result<PolyData> {
    log::debug!("Loading {:?}...", path.as_ref());
    parse_polydata(&fs::read_to_string(path)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 2 cells of a unit square with a `U` vector field scaled by `s`
    pub(crate) fn square(s: f64) -> String {
        format!(
            "# vtk DataFile Version 2.0
sampleSurface
ASCII
DATASET POLYDATA
POINTS 5 float
0 0 0 1 0 0 1 1 0
0 1 0 2 0 0
POLYGONS 2 9
4 0 1 2 3
3 1 4 2
CELL_DATA 2
FIELD attributes 1
U 3 2 float
{} 0 0 {} 1 0
",
            s,
            2. * s
        )
    }

    #[test]
    fn field() {
        let data = parse_polydata(&square(1.)).unwrap();
        assert_eq!(data.points.len(), 5);
        assert_eq!(data.polygons, vec![vec![0, 1, 2, 3], vec![1, 4, 2]]);
        assert_eq!(data.cell_data.len(), 1);
        let u = &data.cell_data[0];
        assert_eq!((u.name.as_str(), u.components, u.n_tuples()), ("U", 3, 2));
        assert_eq!(u.tuples().nth(1), Some(&[2., 1., 0.][..]));
        let centers = data.cell_centers().unwrap();
        assert_eq!(centers[0], [0.5, 0.5, 0.]);
        assert_eq!(centers[1], [4. / 3., 1. / 3., 0.]);
    }

    #[test]
    fn scalars_and_vectors() {
        let contents = "# vtk DataFile Version 3.0
title
ASCII
DATASET POLYDATA
POINTS 3 double
0 0 0 1 0 0 0 1 0
POLYGONS 1 4
3 0 1 2
POINT_DATA 3
SCALARS p float
LOOKUP_TABLE default
1 2 3
CELL_DATA 1
SCALARS k float 2
LOOKUP_TABLE default
4 5
VECTORS U float
6 7 8
";
        let data = parse_polydata(contents).unwrap();
        assert_eq!(data.point_data[0].values, vec![1., 2., 3.]);
        assert_eq!(data.cell_data[0].components, 2);
        assert_eq!(data.cell_data[1].name, "U");
        assert_eq!(data.cell_data[1].values, vec![6., 7., 8.]);
    }

    #[test]
    fn unsupported() {
        let binary = "# vtk DataFile Version 2.0\ntitle\nBINARY\nDATASET POLYDATA\n";
        assert!(matches!(
            parse_polydata(binary),
            Err(SliceError::UnsupportedFormat(_))
        ));
        let grid = "# vtk DataFile Version 2.0\ntitle\nASCII\nDATASET STRUCTURED_POINTS\n";
        assert!(matches!(
            parse_polydata(grid),
            Err(SliceError::UnsupportedFormat(_))
        ));
        assert!(parse_polydata("title\n").is_err());
        let truncated = "# vtk DataFile Version 2.0\ntitle\nASCII\nDATASET POLYDATA\nPOINTS 2 float\n0 0 0\n";
        assert!(matches!(parse_polydata(truncated), Err(SliceError::Vtk(_))));
        let polygon = "# vtk DataFile Version 2.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 1 float\n0 0 0\nPOLYGONS 1 4\n3 0 1 2\n";
        let data = parse_polydata(polygon).unwrap();
        assert!(data.cell_centers().is_err());
    }
}
