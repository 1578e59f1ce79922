//! Binned statistics
//!
//! Trend of `y` with respect to `x`: the samples are grouped into bins of `x`
//! and each bin is reduced to its mean, standard deviation and 95% confidence interval.

#[cfg(feature = "plot")]
mod plot;
#[cfg(feature = "plot")]
pub use plot::{DataPlot, Trend};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum StatsError {
    #[error("x and y have different lengths ({0} and {1})")]
    Length(usize, usize),
    #[error("at least 2 bins are required, found {0}")]
    Bins(usize),
    #[error("the bin width must be positive, found {0}")]
    BinWidth(f64),
    #[error("{bins} bins do not match the {intervals} intervals between the bin edges")]
    Labels { bins: usize, intervals: usize },
}
type Result<T> = std::result::Result<T, StatsError>;

/// Statistics of the samples in a bin
#[derive(Debug, Clone, PartialEq)]
pub struct BinStat {
    /// bin center
    pub bin: f64,
    pub count: usize,
    pub mean: f64,
    /// sample standard deviation
    pub std: f64,
    /// 95% confidence interval half width
    pub ci: f64,
}

/// Sorted unique values of `x` truncated toward zero
pub fn default_bins(x: &[f64]) -> Vec<f64> {
    let mut bins: Vec<f64> = x.iter().filter(|x| x.is_finite()).map(|x| x.trunc()).collect();
    bins.sort_by(|a, b| a.total_cmp(b));
    bins.dedup();
    bins
}

/// Bin edges, half a bin width beyond the first and last bins
pub fn bin_edges(bins: &[f64]) -> Result<Vec<f64>> {
    if bins.len() < 2 {
        return Err(StatsError::Bins(bins.len()));
    }
    let width = bins[1] - bins[0];
    if !(width > 0.) {
        return Err(StatsError::BinWidth(width));
    }
    let start = bins[0] - 0.5 * width;
    let stop = bins[bins.len() - 1] + 1.5 * width;
    let n = ((stop - start) / width - 1e-9).ceil() as usize;
    Ok((0..n).map(|k| start + k as f64 * width).collect())
}

/// Binned statistics of `y` with respect to `x`
///
/// The bins default to [default_bins]; intervals are closed on the right
/// and bins without samples are omitted.
/// The bins must be evenly spaced, otherwise the edges, spaced by the first
/// bin width, do not line up with the bins and an error is returned.
pub fn binned_stats(x: &[f64], y: &[f64], bins: Option<&[f64]>) -> Result<Vec<BinStat>> {
    if x.len() != y.len() {
        return Err(StatsError::Length(x.len(), y.len()));
    }
    let default;
    let bins: &[f64] = match bins {
        Some(bins) => bins,
        None => {
            default = default_bins(x);
            &default
        }
    };
    let edges = bin_edges(bins)?;
    let intervals = edges.len().saturating_sub(1);
    if intervals != bins.len() {
        return Err(StatsError::Labels {
            bins: bins.len(),
            intervals,
        });
    }
    let mut groups: Vec<Vec<f64>> = vec![vec![]; intervals];
    for (x, y) in x.iter().zip(y).filter(|(_, y)| y.is_finite()) {
        if let Some(k) = edges.windows(2).position(|e| *x > e[0] && *x <= e[1]) {
            groups[k].push(*y);
        }
    }
    Ok(bins
        .iter()
        .zip(groups)
        .filter(|(_, g)| !g.is_empty())
        .map(|(&bin, g)| {
            let n = g.len() as f64;
            let mean = g.iter().sum::<f64>() / n;
            let std = (g.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / (n - 1.)).sqrt();
            BinStat {
                bin,
                count: g.len(),
                mean,
                std,
                ci: 1.96 * std / n.sqrt(),
            }
        })
        .collect())
}

/// Median of the finite values
pub fn median(data: &[f64]) -> Option<f64> {
    let mut values: Vec<f64> = data.iter().cloned().filter(|x| x.is_finite()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    Some(if n % 2 == 1 {
        values[n / 2]
    } else {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    })
}

/// Mean of the finite values
pub fn mean(data: &[f64]) -> Option<f64> {
    let (s, n) = data
        .iter()
        .filter(|x| x.is_finite())
        .fold((0f64, 0usize), |(s, n), x| (s + x, n + 1));
    (n > 0).then(|| s / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_bins_truncate() {
        assert_eq!(default_bins(&[2.7, -1.5, 2.1, 0.4, 3.9]), vec![-1., 0., 2., 3.]);
    }

    #[test]
    fn edges() {
        assert_eq!(bin_edges(&[1., 2., 3.]).unwrap(), vec![0.5, 1.5, 2.5, 3.5]);
        assert_eq!(bin_edges(&[5.]), Err(StatsError::Bins(1)));
        assert_eq!(bin_edges(&[5., 5.]), Err(StatsError::BinWidth(0.)));
    }

    #[test]
    fn stats_per_bin() {
        let x = [1.1, 0.9, 1.5, 2.2, 2.4, 3.0, 10.];
        let y = [1., 2., 3., 10., 20., 5., 100.];
        let stats = binned_stats(&x, &y, Some(&[1., 2., 3.])).unwrap();
        assert_eq!(stats.len(), 3);
        // 1.5 falls in the first bin (right closed)
        assert_eq!(stats[0].count, 3);
        assert_relative_eq!(stats[0].mean, 2.);
        assert_relative_eq!(stats[0].std, 1.);
        assert_relative_eq!(stats[0].ci, 1.96 / 3f64.sqrt());
        assert_relative_eq!(stats[1].mean, 15.);
        assert_relative_eq!(stats[1].std, 50f64.sqrt());
        assert_eq!(stats[2].count, 1);
        assert!(stats[2].std.is_nan());
    }

    #[test]
    fn stats_with_default_bins() {
        let x = [0.2, 0.8, 1.5, 1.7, 2.1];
        let y = [1., 3., 5., 7., 9.];
        let stats = binned_stats(&x, &y, None).unwrap();
        let bins: Vec<_> = stats.iter().map(|s| s.bin).collect();
        assert_eq!(bins, vec![0., 1., 2.]);
        // 0.8 belongs to the bin of 1: (0.5, 1.5]
        assert_relative_eq!(stats[0].mean, 1.);
        assert_relative_eq!(stats[1].mean, 4.);
        assert_relative_eq!(stats[2].mean, 8.);
        assert!(matches!(
            binned_stats(&x, &y[1..], None),
            Err(StatsError::Length(5, 4))
        ));
    }

    #[test]
    fn gapped_bins_are_rejected() {
        // truncated x skips 2: bins 0, 1, 3 against 4 intervals of width 1
        assert_eq!(
            binned_stats(&[0.1, 1.2, 3.3], &[1., 2., 3.], None),
            Err(StatsError::Labels {
                bins: 3,
                intervals: 4
            })
        );
        assert!(binned_stats(&[0.1, 1.2, 3.3], &[1., 2., 3.], Some(&[0., 1., 2., 3.])).is_ok());
    }

    #[test]
    fn medians() {
        assert_eq!(median(&[3., 1., f64::NAN, 2.]), Some(2.));
        assert_eq!(median(&[4., 1., 2., 3.]), Some(2.5));
        assert_eq!(median(&[]), None);
        assert_eq!(mean(&[1., 2., f64::NAN]), Some(1.5));
    }
}
