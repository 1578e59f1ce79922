//! Iso-lines by marching squares

use super::minmax;

/// A straight piece of iso-line
pub type Segment = [(f64, f64); 2];

/// Iso-line segments at a given level
#[derive(Debug, Clone, Default)]
pub struct Contour {
    pub level: f64,
    pub segments: Vec<Segment>,
}

/// `n` levels evenly spaced strictly inside the range of the finite values of `z`
pub fn default_levels(z: &[f64], n: usize) -> Vec<f64> {
    match minmax(z.iter().cloned().filter(|x| x.is_finite())) {
        Some((min, max)) if max > min => (1..=n)
            .map(|k| min + k as f64 * (max - min) / (n + 1) as f64)
            .collect(),
        _ => vec![],
    }
}

/// Iso-lines of `z` for each level
///
/// `z` holds `y.len()` rows of `x.len()` columns.
pub fn contours(x: &[f64], y: &[f64], z: &[f64], levels: &[f64]) -> Vec<Contour> {
    levels
        .iter()
        .map(|&level| Contour {
            level,
            segments: contour_segments(x, y, z, level),
        })
        .collect()
}

fn crossing(a: (f64, f64, f64), b: (f64, f64, f64), level: f64) -> (f64, f64) {
    let t = (level - a.2) / (b.2 - a.2);
    (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
}

/// Iso-line segments of `z` at `level`
///
/// Cells with a `NaN` corner are skipped, ambiguous cells are resolved
/// with the average of the 4 corners.
pub fn contour_segments(x: &[f64], y: &[f64], z: &[f64], level: f64) -> Vec<Segment> {
    let (nx, ny) = (x.len(), y.len());
    let mut segments = vec![];
    if nx < 2 || ny < 2 || z.len() != nx * ny {
        return segments;
    }
    for j in 0..ny - 1 {
        for i in 0..nx - 1 {
            // corners counter-clockwise from the lower left one
            let c = [
                (x[i], y[j], z[j * nx + i]),
                (x[i + 1], y[j], z[j * nx + i + 1]),
                (x[i + 1], y[j + 1], z[(j + 1) * nx + i + 1]),
                (x[i], y[j + 1], z[(j + 1) * nx + i]),
            ];
            if c.iter().any(|c| c.2.is_nan()) {
                continue;
            }
            let above = c.map(|c| c.2 > level);
            // edge k joins corner k to corner k+1
            let edges: Vec<Option<(f64, f64)>> = (0..4)
                .map(|k| {
                    let (a, b) = (c[k], c[(k + 1) % 4]);
                    (above[k] != above[(k + 1) % 4]).then(|| crossing(a, b, level))
                })
                .collect();
            match edges.iter().flatten().count() {
                2 => {
                    let mut points = edges.iter().flatten();
                    if let (Some(p), Some(q)) = (points.next(), points.next()) {
                        segments.push([*p, *q]);
                    }
                }
                4 => {
                    let (Some(e0), Some(e1), Some(e2), Some(e3)) =
                        (edges[0], edges[1], edges[2], edges[3])
                    else {
                        continue;
                    };
                    let center = c.iter().map(|c| c.2).sum::<f64>() / 4.;
                    // corner 0 connected to corner 2 through the center or not
                    if (center > level) == above[0] {
                        segments.push([e0, e1]);
                        segments.push([e2, e3]);
                    } else {
                        segments.push([e3, e0]);
                        segments.push([e1, e2]);
                    }
                }
                _ => (),
            }
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn vertical_iso_line() {
        let x = [0., 1., 2.];
        let y = [0., 1.];
        let z = [0., 1., 2., 0., 1., 2.];
        let segments = contour_segments(&x, &y, &z, 0.5);
        assert_eq!(segments.len(), 1);
        let [p, q] = segments[0];
        assert_relative_eq!(p.0, 0.5);
        assert_relative_eq!(q.0, 0.5);
        assert_relative_eq!((p.1 - q.1).abs(), 1.);
    }

    #[test]
    fn nan_cells_are_skipped() {
        let x = [0., 1., 2.];
        let y = [0., 1.];
        let z = [0., 1., f64::NAN, 0., 1., 2.];
        assert!(contour_segments(&x, &y, &z, 1.5).is_empty());
        assert_eq!(contour_segments(&x, &y, &z, 0.5).len(), 1);
    }

    #[test]
    fn saddle() {
        let x = [0., 1.];
        let y = [0., 1.];
        // high corners at (0,0) and (1,1)
        let z = [1., 0., 0., 1.];
        let high_center = contour_segments(&x, &y, &z, 0.4);
        assert_eq!(high_center.len(), 2);
        // segments cut off the low corners (1,0) and (0,1)
        assert_relative_eq!(high_center[0][0].0, 0.6);
        assert_relative_eq!(high_center[0][1].1, 0.4);
        let low_center = contour_segments(&x, &y, &z, 0.6);
        assert_eq!(low_center.len(), 2);
        // segments cut off the high corners (0,0) and (1,1)
        assert_relative_eq!(low_center[0][0].1, 0.4);
        assert_relative_eq!(low_center[0][1].0, 0.4);
    }

    #[test]
    fn levels() {
        let z = [0., f64::NAN, 9.];
        assert_eq!(default_levels(&z, 2), vec![3., 6.]);
        assert!(default_levels(&[1., 1.], 8).is_empty());
        let c = contours(&[0., 1.], &[0., 1.], &[0., 9., 0., 9.], &default_levels(&z, 2));
        assert_eq!(c.len(), 2);
        assert_eq!(c[1].level, 6.);
        assert_eq!(c[1].segments.len(), 1);
    }
}
