// =============================================================================
// Adaptive Trend Strength Oscillator (ATSO)
// =============================================================================
//
// The look-back `p` comes from the adaptive period selector (volatility of
// closes). For each window of `p` bar-to-bar deltas:
//
//   up   = high[i] − high[i−1]
//   down = low[i−1] − low[i]
//   up   counts toward sum_up   when up > down and up > 0
//   down counts toward sum_down when down > up and down > 0
//   raw  = (sum_up − sum_down) / p
//
// `raw` of the newest window is compared with the average `raw` of the prior,
// non-overlapping windows of the same `p` still in the buffer:
//
//   value = clamp((raw / avg − 1) · 100, −100, 100)
//
// With no prior window the raw value is emitted unscaled (still clamped).
// An average of zero is reported as `DivisionByZero`, never papered over.
// =============================================================================

use tracing::trace;

use crate::config::AtsoParams;
use crate::error::{IndicatorError, Result};
use crate::indicators::adaptive_period::AdaptivePeriodSelector;
use crate::indicators::moments::Welford;
use crate::indicators::moving_average::Ema;
use crate::series::BoundedSeries;
use crate::signals::crossover::{bearish_crossover, bullish_crossover, detect_divergence, latest_zone};
use crate::signals::provider::{SignalProvider, SignalRole};
use crate::types::{Divergence, PriceBar, TrendBias, Zone};

/// Output bound of the oscillator.
pub const ATSO_LIMIT: f64 = 100.0;

/// Historical averages with a magnitude below this are treated as zero.
pub const NORMALIZATION_EPSILON: f64 = 1e-12;

/// Emitted values retained for crossover and divergence checks.
const VALUE_HISTORY: usize = 10;

#[derive(Debug, Clone)]
pub struct Atso {
    params: AtsoParams,
    selector: AdaptivePeriodSelector,
    highs: BoundedSeries<f64>,
    lows: BoundedSeries<f64>,
    closes: BoundedSeries<f64>,
    values: BoundedSeries<f64>,
    smoother: Option<Ema>,
    latest: Result<f64>,
    period: Option<usize>,
}

fn bar_capacity(params: &AtsoParams) -> usize {
    params.max_period * (params.history_windows + 1) + 1
}

impl Atso {
    pub fn new(params: AtsoParams) -> Result<Self> {
        params.validate()?;
        let selector = AdaptivePeriodSelector::new(
            params.min_period,
            params.max_period,
            params.volatility_period,
            params.sensitivity,
        )?;
        let smoother = params.smoothing_period.map(Ema::new).transpose()?;
        let capacity = bar_capacity(&params);
        Ok(Self {
            selector,
            highs: BoundedSeries::new(capacity),
            lows: BoundedSeries::new(capacity),
            closes: BoundedSeries::new(VALUE_HISTORY),
            values: BoundedSeries::new(VALUE_HISTORY),
            smoother,
            latest: Err(IndicatorError::not_ready(params.volatility_period, 0)),
            period: None,
            params,
        })
    }

    pub fn params(&self) -> &AtsoParams {
        &self.params
    }

    /// Value for the newest bar, or the error its computation produced.
    pub fn calculate(&self) -> Result<f64> {
        self.latest.clone()
    }

    pub fn values(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    /// Look-back chosen for the newest bar.
    pub fn current_period(&self) -> Option<usize> {
        self.period
    }

    pub fn is_divergence(&self) -> Result<Divergence> {
        detect_divergence(
            &self.closes,
            &self.values,
            self.params.config.divergence_threshold,
        )
    }

    /// Replace the adaptive period range. All rolling windows are discarded.
    pub fn set_parameters(&mut self, min_period: usize, max_period: usize, volatility_period: usize) -> Result<()> {
        let params = AtsoParams {
            min_period,
            max_period,
            volatility_period,
            ..self.params.clone()
        };
        *self = Self::new(params)?;
        Ok(())
    }

    /// Change how quickly the period saturates. Values emitted under the old
    /// mapping and the display smoother are discarded; raw bars are kept.
    pub fn set_volatility_sensitivity(&mut self, sensitivity: f64) -> Result<()> {
        self.selector.set_volatility_sensitivity(sensitivity)?;
        self.params.sensitivity = sensitivity;
        self.values.reset();
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.reset();
        }
        self.latest = Err(self.rewarm_error());
        Ok(())
    }

    /// Readiness after emitted values were dropped: the first bar that can
    /// produce a value again, plus the smoother's own warm-up.
    fn rewarm_error(&self) -> IndicatorError {
        let period = match self.selector.current_period() {
            Ok(period) => period,
            Err(e) => return e,
        };
        let available = self.highs.len();
        let first_value = (period + 1).max(available + 1);
        let values_needed = self.params.smoothing_period.unwrap_or(1);
        IndicatorError::not_ready(first_value + values_needed - 1, available)
    }

    /// Raw strength of the window of `period` deltas ending `end_offset` bars
    /// before the newest bar.
    fn window_strength(&self, end_offset: usize, period: usize) -> f64 {
        let mut sum_up = 0.0;
        let mut sum_down = 0.0;
        for j in end_offset..end_offset + period {
            let (Some(&h), Some(&h_prev), Some(&l), Some(&l_prev)) = (
                self.highs.get_from_end(j),
                self.highs.get_from_end(j + 1),
                self.lows.get_from_end(j),
                self.lows.get_from_end(j + 1),
            ) else {
                break;
            };
            let up = h - h_prev;
            let down = l_prev - l;
            if up > down && up > 0.0 {
                sum_up += up;
            } else if down > up && down > 0.0 {
                sum_down += down;
            }
        }
        (sum_up - sum_down) / period as f64
    }

    fn compute(&mut self) -> Result<f64> {
        let period = self.selector.current_period()?;
        self.period = Some(period);

        let available = self.highs.len();
        if available < period + 1 {
            return Err(IndicatorError::not_ready(period + 1, available));
        }

        let raw = self.window_strength(0, period);

        let mut history = Welford::new();
        let mut k = 1;
        while k <= self.params.history_windows && available >= (k + 1) * period + 1 {
            history.push(self.window_strength(k * period, period));
            k += 1;
        }

        let value = match history.mean() {
            None => raw.clamp(-ATSO_LIMIT, ATSO_LIMIT),
            Some(avg) if avg.abs() < NORMALIZATION_EPSILON => {
                return Err(IndicatorError::DivisionByZero("trend strength historical average"));
            }
            Some(avg) => ((raw / avg - 1.0) * 100.0).clamp(-ATSO_LIMIT, ATSO_LIMIT),
        };
        trace!(period, raw, windows = history.count(), value, "ATSO computed");

        match self.smoother.as_mut() {
            None => Ok(value),
            Some(ema) => {
                ema.push(value);
                ema.value().map(|v| v.clamp(-ATSO_LIMIT, ATSO_LIMIT))
            }
        }
    }
}

impl SignalProvider for Atso {
    fn name(&self) -> &str {
        "atso"
    }

    fn role(&self) -> SignalRole {
        SignalRole::Trend
    }

    fn add(&mut self, bar: &PriceBar) -> Result<()> {
        bar.validate()?;
        self.selector.update(bar.close);
        self.highs.push(bar.high);
        self.lows.push(bar.low);
        self.closes.push(bar.close);

        self.latest = self.compute();
        if let Ok(v) = self.latest {
            self.values.push(v);
        }
        Ok(())
    }

    fn last_value(&self) -> Option<f64> {
        self.latest.as_ref().ok().copied()
    }

    fn is_bullish_crossover(&self) -> Result<bool> {
        self.latest.clone()?;
        bullish_crossover(&self.values, 0.0)
    }

    fn is_bearish_crossover(&self) -> Result<bool> {
        self.latest.clone()?;
        bearish_crossover(&self.values, 0.0)
    }

    fn zone(&self) -> Zone {
        match self.latest {
            Ok(_) => latest_zone(&self.values, &self.params.config),
            Err(_) => Zone::Neutral,
        }
    }

    fn trend_bias(&self) -> Result<TrendBias> {
        let value = self.latest.clone()?;
        let level = self.params.config.strong_trend;
        Ok(if value >= level {
            TrendBias::Up
        } else if value <= -level {
            TrendBias::Down
        } else {
            TrendBias::Flat
        })
    }

    fn reset(&mut self) {
        self.selector.reset();
        self.highs.reset();
        self.lows.reset();
        self.closes.reset();
        self.values.reset();
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.reset();
        }
        self.latest = Err(IndicatorError::not_ready(self.params.volatility_period, 0));
        self.period = None;
    }
}
