// =============================================================================
// Streaming Moments — compensated sums, mean, variance
// =============================================================================
//
// Long-running feeds accumulate rounding error quickly when sums of squares
// are taken naively. Everything here uses Neumaier-compensated summation and
// the corrected two-pass variance:
//
//   mean  = Σx / n
//   var   = (Σ(x - mean)² - (Σ(x - mean))² / n) / (n - 1)
//
// The second term cancels the residual error left in `mean`. Windows are
// small, so two passes over a bounded window is cheaper than it sounds.
// =============================================================================

/// Neumaier-compensated sum.
pub fn compensated_sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for x in values {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            compensation += (sum - t) + x;
        } else {
            compensation += (x - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: ExactSizeIterator,
{
    let iter = values.into_iter();
    let n = iter.len();
    if n == 0 {
        return None;
    }
    Some(compensated_sum(iter) / n as f64)
}

/// Sum of squared deviations about the mean plus the count, via the
/// corrected two-pass algorithm.
fn squared_deviations<I>(values: I) -> (f64, usize)
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: ExactSizeIterator + Clone,
{
    let iter = values.into_iter();
    let n = iter.len();
    if n == 0 {
        return (0.0, 0);
    }
    let m = compensated_sum(iter.clone()) / n as f64;
    let ss = compensated_sum(iter.clone().map(|x| (x - m) * (x - m)));
    let drift = compensated_sum(iter.map(|x| x - m));
    ((ss - drift * drift / n as f64).max(0.0), n)
}

/// Sample variance (divisor `n - 1`); defined as `0.0` when `n < 2`.
pub fn sample_variance<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: ExactSizeIterator + Clone,
{
    let (ss, n) = squared_deviations(values);
    if n < 2 {
        return 0.0;
    }
    ss / (n - 1) as f64
}

/// Sample standard deviation; `0.0` when `n < 2`.
pub fn sample_stddev<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: ExactSizeIterator + Clone,
{
    sample_variance(values).sqrt()
}

/// Population variance (divisor `n`), as used by Bollinger Bands; `0.0` for
/// an empty input.
pub fn population_variance<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: ExactSizeIterator + Clone,
{
    let (ss, n) = squared_deviations(values);
    if n == 0 {
        return 0.0;
    }
    ss / n as f64
}

/// Unbounded incremental mean/variance (Welford).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Welford {
    count: usize,
    mean: f64,
    m2: f64,
}

impl Welford {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// `None` until at least one sample was pushed.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.mean)
        }
    }

    /// Sample variance; `0.0` when fewer than two samples.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compensated_sum_recovers_small_terms() {
        // Naive summation loses the 1.0 terms entirely.
        let values = [1e16, 1.0, -1e16, 1.0];
        assert_eq!(compensated_sum(values), 2.0);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(mean(vec![1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn sample_variance_known_values() {
        let v = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // Σ(x-5)² = 32, n-1 = 7
        assert!((sample_variance(v.iter().copied()) - 32.0 / 7.0).abs() < 1e-12);
        assert!((population_variance(v.iter().copied()) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn variance_degenerate_inputs() {
        assert_eq!(sample_variance(Vec::<f64>::new()), 0.0);
        assert_eq!(sample_variance(vec![42.0]), 0.0);
        assert_eq!(population_variance(Vec::<f64>::new()), 0.0);
        assert_eq!(sample_stddev(vec![3.0; 10]), 0.0);
    }

    #[test]
    fn variance_is_stable_with_large_offset() {
        // Naive Σx² - n·mean² cancels catastrophically here.
        let offset = 1e9;
        let v: Vec<f64> = [4.0, 7.0, 13.0, 16.0].iter().map(|x| x + offset).collect();
        assert!((sample_variance(v) - 30.0).abs() < 1e-6);
    }

    #[test]
    fn welford_matches_two_pass() {
        let v = [1.5, 2.5, 9.0, -3.0, 4.25, 7.75];
        let mut w = Welford::new();
        for &x in &v {
            w.push(x);
        }
        assert_eq!(w.count(), 6);
        assert!((w.mean().unwrap() - mean(v).unwrap()).abs() < 1e-12);
        assert!((w.variance() - sample_variance(v)).abs() < 1e-12);
        w.reset();
        assert_eq!(w.mean(), None);
        assert_eq!(w.variance(), 0.0);
    }
}
