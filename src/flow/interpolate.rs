//! 2D resampling of scattered or gridded samples
//!
//! Samples on a complete rectilinear lattice are interpolated cell by cell,
//! any other sample set goes through a R-tree of the samples.
//! With the linear and cubic methods, targets outside the extent of a lattice
//! or outside the convex hull of scattered samples evaluate to `NaN`;
//! the nearest method always returns the value of the nearest sample.

use rstar::{primitives::GeomWithData, RTree};
use std::str::FromStr;

/// Interpolation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    Nearest,
    Linear,
    #[default]
    Cubic,
}
impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest" => Ok(Method::Nearest),
            "linear" => Ok(Method::Linear),
            "cubic" => Ok(Method::Cubic),
            _ => Err(format!(
                r#"method {s:?} is not recognized, expected "nearest", "linear" or "cubic""#
            )),
        }
    }
}

pub trait Interpolant {
    /// Interpolated value at `(x1,x2)`
    fn evaluate(&self, x1: f64, x2: f64) -> f64;
    /// Interpolated values on the mesh of `x1` and `x2`, `x2` rows of `x1` columns
    fn evaluate_mesh(&self, x1: &[f64], x2: &[f64]) -> Vec<f64> {
        x2.iter()
            .flat_map(|&y| x1.iter().map(move |&x| self.evaluate(x, y)))
            .collect()
    }
}

/// Builds the interpolant of `values` sampled at (`x1`,`x2`)
///
/// Samples with a non finite coordinate are discarded.
pub fn interpolant(x1: &[f64], x2: &[f64], values: &[f64], method: Method) -> Box<dyn Interpolant> {
    let (x1, (x2, values)): (Vec<f64>, (Vec<f64>, Vec<f64>)) = x1
        .iter()
        .zip(x2.iter().zip(values.iter()))
        .filter(|(x, (y, _))| x.is_finite() && y.is_finite())
        .map(|(x, (y, v))| (*x, (*y, *v)))
        .unzip();
    match Lattice::new(&x1, &x2, &values, method) {
        Some(lattice) => Box::new(lattice),
        None => Box::new(Scattered::new(&x1, &x2, &values, method)),
    }
}

fn unique(x: &[f64]) -> Vec<f64> {
    let mut u = x.to_vec();
    u.sort_by(|a, b| a.total_cmp(b));
    u.dedup();
    u
}

/// Index of the lower node of the cell holding `x` and the normalized position inside
fn locate(nodes: &[f64], x: f64) -> Option<(usize, f64)> {
    let n = nodes.len();
    if n < 2 || x.is_nan() || x < nodes[0] || x > nodes[n - 1] {
        return None;
    }
    let i = nodes.partition_point(|&p| p <= x).saturating_sub(1).min(n - 2);
    Some((i, (x - nodes[i]) / (nodes[i + 1] - nodes[i])))
}

fn clamp(nodes: &[f64], x: f64) -> f64 {
    match (nodes.first(), nodes.last()) {
        (Some(&lo), Some(&hi)) => x.clamp(lo, hi),
        _ => x,
    }
}

/// Catmull-Rom spline through `p[1]` and `p[2]`
fn catmull_rom(p: [f64; 4], t: f64) -> f64 {
    let [p0, p1, p2, p3] = p;
    0.5 * (2. * p1
        + (p2 - p0) * t
        + (2. * p0 - 5. * p1 + 4. * p2 - p3) * t * t
        + (3. * p1 - p0 - 3. * p2 + p3) * t * t * t)
}

/// Samples on a complete rectilinear lattice
pub struct Lattice {
    x1: Vec<f64>,
    x2: Vec<f64>,
    // x2 rows of x1 columns
    values: Vec<f64>,
    method: Method,
}
impl Lattice {
    /// Returns `None` if the samples do not cover every lattice node exactly once
    pub fn new(x1: &[f64], x2: &[f64], values: &[f64], method: Method) -> Option<Self> {
        let u1 = unique(x1);
        let u2 = unique(x2);
        let (n1, n2) = (u1.len(), u2.len());
        if n1 < 2 || n2 < 2 || n1 * n2 != values.len() {
            return None;
        }
        let mut nodes: Vec<Option<f64>> = vec![None; n1 * n2];
        for ((x, y), v) in x1.iter().zip(x2).zip(values) {
            let i = u1.binary_search_by(|p| p.total_cmp(x)).ok()?;
            let j = u2.binary_search_by(|p| p.total_cmp(y)).ok()?;
            let node = &mut nodes[j * n1 + i];
            if node.is_some() {
                return None;
            }
            *node = Some(*v);
        }
        Some(Self {
            x1: u1,
            x2: u2,
            values: nodes.into_iter().collect::<Option<Vec<f64>>>()?,
            method,
        })
    }
    fn node(&self, i: usize, j: usize) -> f64 {
        self.values[j * self.x1.len() + i]
    }
    /// Node value with linear extrapolation one node beyond the edges
    fn ghost_node(&self, i: isize, j: isize) -> f64 {
        let (n1, n2) = (self.x1.len() as isize, self.x2.len() as isize);
        let extrapolate = |k: isize, n: isize| -> (usize, usize, f64) {
            if k < 0 {
                (0, 1, -1.)
            } else if k >= n {
                ((n - 1) as usize, (n - 2) as usize, -1.)
            } else {
                (k as usize, k as usize, 0.)
            }
        };
        let (i0, i1, a) = extrapolate(i, n1);
        let (j0, j1, b) = extrapolate(j, n2);
        let along_x1 = |j: usize| (1. - a) * self.node(i0, j) + a * self.node(i1, j);
        (1. - b) * along_x1(j0) + b * along_x1(j1)
    }
}
impl Interpolant for Lattice {
    fn evaluate(&self, x1: f64, x2: f64) -> f64 {
        let (x1, x2) = match self.method {
            Method::Nearest => (clamp(&self.x1, x1), clamp(&self.x2, x2)),
            _ => (x1, x2),
        };
        let (Some((i, s)), Some((j, t))) = (locate(&self.x1, x1), locate(&self.x2, x2)) else {
            return f64::NAN;
        };
        match self.method {
            Method::Nearest => {
                let i = if s < 0.5 { i } else { i + 1 };
                let j = if t < 0.5 { j } else { j + 1 };
                self.node(i, j)
            }
            Method::Linear => {
                let lower = (1. - s) * self.node(i, j) + s * self.node(i + 1, j);
                let upper = (1. - s) * self.node(i, j + 1) + s * self.node(i + 1, j + 1);
                (1. - t) * lower + t * upper
            }
            Method::Cubic => {
                let (i, j) = (i as isize, j as isize);
                let rows = [-1, 0, 1, 2].map(|dj| {
                    let p = [-1, 0, 1, 2].map(|di| self.ghost_node(i + di, j + dj));
                    catmull_rom(p, s)
                });
                catmull_rom(rows, t)
            }
        }
    }
}

type Sample = GeomWithData<[f64; 2], f64>;

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Counter-clockwise convex hull (monotone chain)
///
/// Collinear samples give the 2 end points of the segment.
fn convex_hull(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut p = points.to_vec();
    p.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    p.dedup();
    if p.len() < 3 {
        return p;
    }
    let half = |points: &mut dyn Iterator<Item = [f64; 2]>| {
        let mut chain: Vec<[f64; 2]> = vec![];
        for q in points {
            while let &[.., o, a] = chain.as_slice() {
                if cross(o, a, q) > 0. {
                    break;
                }
                chain.pop();
            }
            chain.push(q);
        }
        chain.pop();
        chain
    };
    let mut hull = half(&mut p.iter().cloned());
    hull.extend(half(&mut p.iter().rev().cloned()));
    hull
}

/// Scattered samples
pub struct Scattered {
    tree: RTree<Sample>,
    hull: Vec<[f64; 2]>,
    // tolerance on the hull edge cross products
    tol: f64,
    method: Method,
}
impl Scattered {
    pub fn new(x1: &[f64], x2: &[f64], values: &[f64], method: Method) -> Self {
        let samples: Vec<Sample> = x1
            .iter()
            .zip(x2)
            .zip(values)
            .map(|((x, y), v)| Sample::new([*x, *y], *v))
            .collect();
        let points: Vec<[f64; 2]> = samples.iter().map(|s| *s.geom()).collect();
        let hull = convex_hull(&points);
        let scale = points
            .iter()
            .flat_map(|p| hull.first().map(|h| (p[0] - h[0]).abs().max((p[1] - h[1]).abs())))
            .fold(1f64, f64::max);
        Self {
            tree: RTree::bulk_load(samples),
            hull,
            tol: 1e-9 * scale * scale,
            method,
        }
    }
    /// Number of neighbours and distance power of the inverse distance weighting
    fn weighting(&self) -> (usize, i32) {
        match self.method {
            Method::Nearest => (1, 1),
            Method::Linear => (4, 1),
            Method::Cubic => (8, 2),
        }
    }
    /// Returns true if `p` is inside or on the convex hull of the samples
    fn contains(&self, p: [f64; 2]) -> bool {
        let dot = |o: [f64; 2], a: [f64; 2], b: [f64; 2]| {
            (a[0] - o[0]) * (b[0] - o[0]) + (a[1] - o[1]) * (b[1] - o[1])
        };
        match self.hull.as_slice() {
            [] => false,
            [a] => dot(*a, p, p) <= self.tol,
            [a, b] => {
                cross(*a, *b, p).abs() <= self.tol
                    && dot(*a, *b, p) >= -self.tol
                    && dot(*b, *a, p) >= -self.tol
            }
            hull => {
                let n = hull.len();
                (0..n).all(|k| cross(hull[k], hull[(k + 1) % n], p) >= -self.tol)
            }
        }
    }
}
impl Interpolant for Scattered {
    fn evaluate(&self, x1: f64, x2: f64) -> f64 {
        let point = [x1, x2];
        if x1.is_nan() || x2.is_nan() {
            return f64::NAN;
        }
        if self.method == Method::Nearest {
            return self
                .tree
                .nearest_neighbor(&point)
                .map_or(f64::NAN, |s| s.data);
        }
        if !self.contains(point) {
            return f64::NAN;
        }
        let (k, power) = self.weighting();
        let mut weights = 0f64;
        let mut sum = 0f64;
        for (sample, d2) in self.tree.nearest_neighbor_iter_with_distance_2(&point).take(k) {
            if d2 == 0. {
                return sample.data;
            }
            // d2 is the squared distance, so the weight is 1/d^(2 power)
            let w = 1. / d2.powi(power);
            weights += w;
            sum += w * sample.data;
        }
        if weights > 0. {
            sum / weights
        } else {
            f64::NAN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lattice_samples(f: impl Fn(f64, f64) -> f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut x1 = vec![];
        let mut x2 = vec![];
        let mut v = vec![];
        for j in 0..5 {
            for i in 0..6 {
                let (x, y) = (i as f64 * 2., j as f64 * 3.);
                x1.push(x);
                x2.push(y);
                v.push(f(x, y));
            }
        }
        (x1, x2, v)
    }

    #[test]
    fn lattice_detection() {
        let (x1, x2, v) = lattice_samples(|x, y| x + y);
        assert!(Lattice::new(&x1, &x2, &v, Method::Linear).is_some());
        assert!(Lattice::new(&x1[1..], &x2[1..], &v[1..], Method::Linear).is_none());
    }

    #[test]
    fn linear_and_cubic_reproduce_planes() {
        let plane = |x: f64, y: f64| 1. + 0.5 * x - 2. * y;
        let (x1, x2, v) = lattice_samples(plane);
        for method in [Method::Linear, Method::Cubic] {
            let f = interpolant(&x1, &x2, &v, method);
            for (x, y) in [(0.3, 0.7), (5.5, 11.9), (0., 12.), (9.99, 0.01), (3., 4.5)] {
                assert_relative_eq!(f.evaluate(x, y), plane(x, y), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn cubic_passes_through_nodes() {
        let (x1, x2, v) = lattice_samples(|x, y| (x * 0.3).sin() * (y * 0.2).cos());
        let f = interpolant(&x1, &x2, &v, Method::Cubic);
        for ((x, y), v) in x1.iter().zip(&x2).zip(&v) {
            assert_relative_eq!(f.evaluate(*x, *y), *v, epsilon = 1e-12);
        }
    }

    #[test]
    fn nearest_on_lattice() {
        let (x1, x2, v) = lattice_samples(|x, y| x * 10. + y);
        let f = interpolant(&x1, &x2, &v, Method::Nearest);
        assert_eq!(f.evaluate(2.9, 3.1), 23.);
        assert_eq!(f.evaluate(3.1, 4.6), 46.);
    }

    #[test]
    fn outside_is_nan() {
        let (x1, x2, v) = lattice_samples(|x, y| x + y);
        for method in [Method::Linear, Method::Cubic] {
            let f = interpolant(&x1, &x2, &v, method);
            assert!(f.evaluate(-0.1, 1.).is_nan());
            assert!(f.evaluate(1., 12.1).is_nan());
        }
    }

    #[test]
    fn nearest_outside_takes_the_edge() {
        let (x1, x2, v) = lattice_samples(|x, y| x + y);
        let f = interpolant(&x1, &x2, &v, Method::Nearest);
        assert_eq!(f.evaluate(-0.1, 1.), 0.);
        assert_eq!(f.evaluate(1., 12.1), 14.);
        assert_eq!(f.evaluate(100., -100.), 10.);
        assert!(f.evaluate(f64::NAN, 1.).is_nan());
    }

    /// Samples on circles of radius 10 to 50, the value is the radius
    fn circle_samples() -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut x1 = vec![];
        let mut x2 = vec![];
        let mut v = vec![];
        for r in [10., 20., 30., 40., 50.] {
            for k in 0..36 {
                let a = (k as f64 * 10.).to_radians();
                x1.push(r * a.cos());
                x2.push(r * a.sin());
                v.push(r);
            }
        }
        (x1, x2, v)
    }

    #[test]
    fn scattered_outside_hull_is_nan() {
        let (x1, x2, v) = circle_samples();
        for method in [Method::Linear, Method::Cubic] {
            let f = interpolant(&x1, &x2, &v, method);
            // inside the bounding box but outside the disk
            assert!(f.evaluate(48., 48.).is_nan());
            assert!(f.evaluate(-45., 40.).is_nan());
            let u = f.evaluate(20., 20.);
            assert!((10. ..=50.).contains(&u), "{u} out of range");
            assert_eq!(f.evaluate(50., 0.), 50.);
        }
        let f = interpolant(&x1, &x2, &v, Method::Nearest);
        assert_eq!(f.evaluate(48., 48.), 50.);
    }

    #[test]
    fn hull_of_collinear_samples() {
        let hull = convex_hull(&[[2., 2.], [0., 0.], [1., 1.]]);
        assert_eq!(hull, vec![[0., 0.], [2., 2.]]);
        let f = Scattered::new(&[0., 1., 2.], &[0., 1., 2.], &[0., 1., 2.], Method::Linear);
        assert!(f.evaluate(1.5, 1.5).is_finite());
        assert!(f.evaluate(1.5, 0.5).is_nan());
    }

    #[test]
    fn scattered_samples() {
        let x1 = [0., 1., 0., 1., 0.5];
        let x2 = [0., 0., 1., 1., 0.4];
        let v = [1., 2., 3., 4., 10.];
        let f = interpolant(&x1, &x2, &v, Method::Linear);
        assert_eq!(f.evaluate(0.5, 0.4), 10.);
        assert_eq!(f.evaluate(1., 1.), 4.);
        let g = f.evaluate(0.9, 0.1);
        assert!(g > 1. && g < 10.);
        assert!(f.evaluate(1.5, 0.5).is_nan());
        let f = interpolant(&x1, &x2, &v, Method::Nearest);
        assert_eq!(f.evaluate(0.1, 0.95), 3.);
    }

    #[test]
    fn scattered_weighting_is_bounded() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let n = 200;
        let x1: Vec<f64> = (0..n).map(|_| rng.gen_range(-50f64..50f64)).collect();
        let x2: Vec<f64> = (0..n).map(|_| rng.gen_range(0f64..100f64)).collect();
        let v: Vec<f64> = (0..n).map(|_| rng.gen_range(4f64..8f64)).collect();
        for method in [Method::Linear, Method::Cubic] {
            let f = interpolant(&x1, &x2, &v, method);
            for _ in 0..50 {
                let (x, y) = (rng.gen_range(-10f64..10f64), rng.gen_range(40f64..60f64));
                let u = f.evaluate(x, y);
                assert!((4. ..8.).contains(&u), "{u} out of range");
            }
        }
    }

    #[test]
    fn mesh_is_row_major() {
        let (x1, x2, v) = lattice_samples(|x, y| x * 10. + y);
        let f = interpolant(&x1, &x2, &v, Method::Linear);
        let mesh = f.evaluate_mesh(&[0., 2.], &[0., 3., 6.]);
        assert_eq!(mesh, vec![0., 20., 3., 23., 6., 26.]);
    }

    #[test]
    fn method_parsing() {
        assert_eq!("cubic".parse::<Method>(), Ok(Method::Cubic));
        assert!("spline".parse::<Method>().is_err());
    }
}
