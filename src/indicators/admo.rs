// =============================================================================
// Adaptive DEMA Momentum Oscillator (ADMO) — z-score of a DEMA
// =============================================================================
//
// Per bar:
//   tp    = (high + low + close) / 3
//   DEMA  = 2·EMA1(tp) − EMA2(EMA1(tp))
//
// EMA1 seeds with the SMA of its first `length` inputs; EMA2 starts from
// EMA1's first value, so DEMA output begins on bar `length`.
//
// Once `max(length, stdev_length)` DEMA values are buffered:
//   mean_dema   = mean of the last `length` DEMAs
//   stdev       = sample σ of the last `stdev_length` DEMAs
//   norm_stdev  = (stdev − SMA(stdev)) / σ(stdev)     (0 when σ(stdev) == 0)
//   z           = (DEMA − mean_dema) / stdev           (0 when stdev == 0)
//   score       = z · (1 + norm_stdev · weight)
//
// The score is unclamped: callers must not assume a range.
// =============================================================================

use tracing::trace;

use crate::config::AdmoParams;
use crate::error::{IndicatorError, Result};
use crate::indicators::moments::{mean, sample_stddev};
use crate::indicators::moving_average::Ema;
use crate::series::BoundedSeries;
use crate::signals::crossover::{bearish_crossover, bullish_crossover, detect_divergence, latest_zone};
use crate::signals::provider::{SignalProvider, SignalRole};
use crate::types::{Divergence, PriceBar, Zone};

#[derive(Debug, Clone)]
pub struct Admo {
    params: AdmoParams,
    ema1: Ema,
    ema2: Ema,
    demas: BoundedSeries<f64>,
    stdevs: BoundedSeries<f64>,
    scores: BoundedSeries<f64>,
    closes: BoundedSeries<f64>,
    bars_seen: usize,
}

impl Admo {
    pub fn new(params: AdmoParams) -> Result<Self> {
        params.validate()?;
        let window = params.length.max(params.stdev_length);
        Ok(Self {
            ema1: Ema::new(params.length)?,
            ema2: Ema::new(params.length)?,
            demas: BoundedSeries::new(window),
            stdevs: BoundedSeries::new(params.stdev_length),
            scores: BoundedSeries::new(params.price_lookback),
            closes: BoundedSeries::new(params.price_lookback),
            bars_seen: 0,
            params,
        })
    }

    pub fn params(&self) -> &AdmoParams {
        &self.params
    }

    /// Bars needed before the first score: the EMA1 seed, then a full DEMA
    /// window.
    pub fn warmup_period(&self) -> usize {
        self.params.length + self.demas.capacity() - 1
    }

    /// Latest score.
    pub fn calculate(&self) -> Result<f64> {
        self.scores
            .last()
            .copied()
            .ok_or_else(|| IndicatorError::not_ready(self.warmup_period(), self.bars_seen))
    }

    /// Emitted scores, oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.scores.to_vec()
    }

    pub fn is_divergence(&self) -> Result<Divergence> {
        detect_divergence(
            &self.closes,
            &self.scores,
            self.params.config.divergence_threshold,
        )
    }

    /// Change the periods and weight. Every rolling window is discarded; the
    /// thresholds in `config` stay as constructed.
    pub fn set_parameters(&mut self, length: usize, stdev_length: usize, weight: f64) -> Result<()> {
        let params = AdmoParams {
            length,
            stdev_length,
            weight,
            ..self.params.clone()
        };
        *self = Self::new(params)?;
        Ok(())
    }

    fn update(&mut self, bar: &PriceBar) {
        self.bars_seen += 1;
        self.closes.push(bar.close);

        let Some(e1) = self.ema1.next(bar.typical_price()) else {
            return;
        };
        let e2 = if self.ema2.is_ready() {
            self.ema2.next(e1).unwrap_or(e1)
        } else {
            self.ema2.seed(e1);
            e1
        };
        let dema = 2.0 * e1 - e2;
        self.demas.push(dema);
        if !self.demas.is_full() {
            trace!(buffered = self.demas.len(), "ADMO warming up");
            return;
        }

        let mean_dema = mean(self.demas.last_n(self.params.length).copied()).unwrap_or(dema);
        let stdev = sample_stddev(self.demas.last_n(self.params.stdev_length).copied());
        self.stdevs.push(stdev);

        let sma_stdev = mean(self.stdevs.iter().copied()).unwrap_or(stdev);
        let stdev_stdev = sample_stddev(self.stdevs.iter().copied());
        let normalized_stdev = if stdev_stdev == 0.0 {
            0.0
        } else {
            (stdev - sma_stdev) / stdev_stdev
        };
        let z_score = if stdev == 0.0 {
            0.0
        } else {
            (dema - mean_dema) / stdev
        };

        let score = z_score * (1.0 + normalized_stdev * self.params.weight);
        trace!(dema, z_score, normalized_stdev, score, "ADMO updated");
        self.scores.push(score);
    }
}

impl SignalProvider for Admo {
    fn name(&self) -> &str {
        "admo"
    }

    fn role(&self) -> SignalRole {
        SignalRole::Trend
    }

    fn add(&mut self, bar: &PriceBar) -> Result<()> {
        bar.validate()?;
        self.update(bar);
        Ok(())
    }

    fn last_value(&self) -> Option<f64> {
        self.scores.last().copied()
    }

    fn is_bullish_crossover(&self) -> Result<bool> {
        bullish_crossover(&self.scores, 0.0)
    }

    fn is_bearish_crossover(&self) -> Result<bool> {
        bearish_crossover(&self.scores, 0.0)
    }

    fn zone(&self) -> Zone {
        latest_zone(&self.scores, &self.params.config)
    }

    fn reset(&mut self) {
        self.ema1.reset();
        self.ema2.reset();
        self.demas.reset();
        self.stdevs.reset();
        self.scores.reset();
        self.closes.reset();
        self.bars_seen = 0;
    }
}
