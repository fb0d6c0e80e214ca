// =============================================================================
// Adaptive Period Selector — volatility → look-back length
// =============================================================================
//
//   period = min + floor((max − min) · min(volatility · sensitivity, 1))
//
// then clamped to [min, max]. Zero volatility maps to `min` (fast, follows
// noise); high volatility saturates at `max`. Raising `sensitivity` makes the
// selector saturate at a lower volatility.
//
// Volatility is the sample standard deviation of the last
// `volatility_period` closes.
// =============================================================================

use crate::error::{IndicatorError, Result};
use crate::indicators::moments::sample_stddev;
use crate::series::BoundedSeries;

#[derive(Debug, Clone)]
pub struct AdaptivePeriodSelector {
    min_period: usize,
    max_period: usize,
    sensitivity: f64,
    closes: BoundedSeries<f64>,
}

fn check_sensitivity(sensitivity: f64) -> Result<()> {
    if !sensitivity.is_finite() || sensitivity <= 0.0 {
        return Err(IndicatorError::InvalidParams(format!(
            "volatility sensitivity must be positive and finite, got {sensitivity}"
        )));
    }
    Ok(())
}

impl AdaptivePeriodSelector {
    pub fn new(
        min_period: usize,
        max_period: usize,
        volatility_period: usize,
        sensitivity: f64,
    ) -> Result<Self> {
        if min_period == 0 || volatility_period == 0 {
            return Err(IndicatorError::InvalidParams(
                "adaptive periods must be >= 1".to_string(),
            ));
        }
        if max_period < min_period {
            return Err(IndicatorError::InvalidParams(format!(
                "max period {max_period} below min period {min_period}"
            )));
        }
        check_sensitivity(sensitivity)?;
        Ok(Self {
            min_period,
            max_period,
            sensitivity,
            closes: BoundedSeries::new(volatility_period),
        })
    }

    /// Map a volatility reading onto `[min_period, max_period]`.
    pub fn select(&self, volatility: f64) -> Result<usize> {
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(IndicatorError::InvalidInput(format!(
                "volatility must be finite and >= 0, got {volatility}"
            )));
        }
        let span = (self.max_period - self.min_period) as f64;
        let fraction = (volatility * self.sensitivity).min(1.0);
        let period = self.min_period + (span * fraction).floor() as usize;
        Ok(period.clamp(self.min_period, self.max_period))
    }

    pub fn update(&mut self, close: f64) {
        self.closes.push(close);
    }

    /// Realised volatility over the full volatility window.
    pub fn volatility(&self) -> Result<f64> {
        if !self.closes.is_full() {
            return Err(IndicatorError::not_ready(
                self.closes.capacity(),
                self.closes.len(),
            ));
        }
        Ok(sample_stddev(self.closes.iter().copied()))
    }

    pub fn current_period(&self) -> Result<usize> {
        self.select(self.volatility()?)
    }

    /// Takes effect on the next query; the mapping itself is stateless.
    pub fn set_volatility_sensitivity(&mut self, sensitivity: f64) -> Result<()> {
        check_sensitivity(sensitivity)?;
        self.sensitivity = sensitivity;
        Ok(())
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn min_period(&self) -> usize {
        self.min_period
    }

    pub fn max_period(&self) -> usize {
        self.max_period
    }

    pub fn volatility_period(&self) -> usize {
        self.closes.capacity()
    }

    pub fn reset(&mut self) {
        self.closes.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_volatility_maps_to_min() {
        let sel = AdaptivePeriodSelector::new(5, 30, 10, 2.0).unwrap();
        assert_eq!(sel.select(0.0).unwrap(), 5);
    }

    #[test]
    fn saturates_at_max() {
        let sel = AdaptivePeriodSelector::new(5, 30, 10, 2.0).unwrap();
        assert_eq!(sel.select(0.5).unwrap(), 30);
        assert_eq!(sel.select(1e9).unwrap(), 30);
    }

    #[test]
    fn linear_in_between() {
        let sel = AdaptivePeriodSelector::new(10, 20, 10, 1.0).unwrap();
        // 10 + floor(10 · 0.25) = 12
        assert_eq!(sel.select(0.25).unwrap(), 12);
    }

    #[test]
    fn higher_sensitivity_saturates_sooner() {
        let mut sel = AdaptivePeriodSelector::new(10, 20, 10, 1.0).unwrap();
        assert_eq!(sel.select(0.5).unwrap(), 15);
        sel.set_volatility_sensitivity(2.0).unwrap();
        assert_eq!(sel.select(0.5).unwrap(), 20);
        assert!(sel.set_volatility_sensitivity(0.0).is_err());
        assert!(sel.set_volatility_sensitivity(f64::NAN).is_err());
        assert_eq!(sel.sensitivity(), 2.0);
    }

    #[test]
    fn invalid_construction() {
        assert!(AdaptivePeriodSelector::new(0, 10, 5, 1.0).is_err());
        assert!(AdaptivePeriodSelector::new(10, 5, 5, 1.0).is_err());
        assert!(AdaptivePeriodSelector::new(5, 10, 0, 1.0).is_err());
        assert!(AdaptivePeriodSelector::new(5, 10, 5, -1.0).is_err());
    }

    #[test]
    fn bad_volatility_rejected() {
        let sel = AdaptivePeriodSelector::new(5, 10, 5, 1.0).unwrap();
        assert!(sel.select(-0.1).is_err());
        assert!(sel.select(f64::NAN).is_err());
    }

    #[test]
    fn volatility_requires_full_window() {
        let mut sel = AdaptivePeriodSelector::new(5, 10, 4, 1.0).unwrap();
        sel.update(1.0);
        sel.update(2.0);
        assert!(sel.current_period().unwrap_err().is_not_ready());
        sel.update(3.0);
        sel.update(4.0);
        let vol = sel.volatility().unwrap();
        // Sample stddev of 1..4.
        assert!((vol - (5.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(sel.current_period().unwrap(), 10);
        sel.reset();
        assert!(sel.volatility().is_err());
    }

    #[test]
    fn flat_closes_select_min() {
        let mut sel = AdaptivePeriodSelector::new(7, 21, 5, 3.0).unwrap();
        for _ in 0..5 {
            sel.update(100.0);
        }
        assert_eq!(sel.current_period().unwrap(), 7);
    }

    proptest! {
        #[test]
        fn selected_period_within_bounds(
            min in 1usize..50,
            extra in 0usize..100,
            sensitivity in 1e-6f64..1e6,
            volatility in 0.0f64..1e9,
        ) {
            let sel = AdaptivePeriodSelector::new(min, min + extra, 10, sensitivity).unwrap();
            let p = sel.select(volatility).unwrap();
            prop_assert!(p >= min && p <= min + extra);
        }
    }
}
