// =============================================================================
// Streaming Moving Averages (SMA / EMA / WMA)
// =============================================================================
//
// SMA_t = Σ window / period                          (full window required)
// WMA_t = Σ w_i·x_i / Σ w_i,  w = 1 (oldest) .. period (newest)
// EMA_t = EMA_{t-1} + α·(x_t − EMA_{t-1}),  α = 2 / (period + 1)
//
// The very first EMA value is the exact SMA of the first `period` inputs.
// Later values recurse from that seed, so it is not an approximation: a
// single-sample seed would bias every value that follows.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{IndicatorError, Result};
use crate::indicators::moments::{compensated_sum, mean};
use crate::series::BoundedSeries;

fn check_period(period: usize) -> Result<()> {
    if period == 0 {
        return Err(IndicatorError::InvalidParams(
            "moving average period must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Simple moving average over a bounded window.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: BoundedSeries<f64>,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self> {
        check_period(period)?;
        Ok(Self {
            period,
            window: BoundedSeries::new(period),
        })
    }

    pub fn push(&mut self, x: f64) {
        self.window.push(x);
    }

    pub fn value(&self) -> Result<f64> {
        if !self.window.is_full() {
            return Err(IndicatorError::not_ready(self.period, self.window.len()));
        }
        mean(self.window.iter().copied())
            .ok_or_else(|| IndicatorError::not_ready(self.period, 0))
    }

    pub fn is_ready(&self) -> bool {
        self.window.is_full()
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn set_period(&mut self, period: usize) -> Result<()> {
        check_period(period)?;
        self.period = period;
        self.window.resize(period);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.window.reset();
    }
}

/// Exponential moving average seeded with the SMA of the first `period`
/// samples.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    warmup: Vec<f64>,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self> {
        check_period(period)?;
        Ok(Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            warmup: Vec::with_capacity(period),
            value: None,
        })
    }

    pub fn push(&mut self, x: f64) {
        match self.value {
            Some(prev) => self.value = Some(prev + self.alpha * (x - prev)),
            None => {
                self.warmup.push(x);
                if self.warmup.len() == self.period {
                    let seed = compensated_sum(self.warmup.iter().copied()) / self.period as f64;
                    self.value = Some(seed);
                    self.warmup.clear();
                }
            }
        }
    }

    /// Start the recursion from `value` instead of an SMA seed. Any partial
    /// warm-up is dropped.
    pub fn seed(&mut self, value: f64) {
        self.warmup.clear();
        self.value = Some(value);
    }

    /// Feed `x` and return the new value if the EMA is seeded.
    pub fn next(&mut self, x: f64) -> Option<f64> {
        self.push(x);
        self.value
    }

    pub fn value(&self) -> Result<f64> {
        self.value
            .ok_or_else(|| IndicatorError::not_ready(self.period, self.warmup.len()))
    }

    pub fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Re-seed with a new period; all history is discarded.
    pub fn set_period(&mut self, period: usize) -> Result<()> {
        *self = Self::new(period)?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.warmup.clear();
        self.value = None;
    }
}

/// Linearly weighted moving average, newest sample weighted `period`.
#[derive(Debug, Clone)]
pub struct Wma {
    period: usize,
    window: BoundedSeries<f64>,
}

impl Wma {
    pub fn new(period: usize) -> Result<Self> {
        check_period(period)?;
        Ok(Self {
            period,
            window: BoundedSeries::new(period),
        })
    }

    pub fn push(&mut self, x: f64) {
        self.window.push(x);
    }

    pub fn value(&self) -> Result<f64> {
        if !self.window.is_full() {
            return Err(IndicatorError::not_ready(self.period, self.window.len()));
        }
        let denom = (self.period * (self.period + 1)) as f64 / 2.0;
        let weighted = compensated_sum(
            self.window
                .iter()
                .enumerate()
                .map(|(i, &x)| (i + 1) as f64 * x),
        );
        Ok(weighted / denom)
    }

    pub fn is_ready(&self) -> bool {
        self.window.is_full()
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn set_period(&mut self, period: usize) -> Result<()> {
        check_period(period)?;
        self.period = period;
        self.window.resize(period);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.window.reset();
    }
}

/// Which kernel a [`MovingAverage`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovingAverageKind {
    Sma,
    Ema,
    Wma,
}

/// Tagged moving-average state.
#[derive(Debug, Clone)]
pub enum MovingAverage {
    Sma(Sma),
    Ema(Ema),
    Wma(Wma),
}

impl MovingAverage {
    pub fn new(kind: MovingAverageKind, period: usize) -> Result<Self> {
        Ok(match kind {
            MovingAverageKind::Sma => Self::Sma(Sma::new(period)?),
            MovingAverageKind::Ema => Self::Ema(Ema::new(period)?),
            MovingAverageKind::Wma => Self::Wma(Wma::new(period)?),
        })
    }

    pub fn kind(&self) -> MovingAverageKind {
        match self {
            Self::Sma(_) => MovingAverageKind::Sma,
            Self::Ema(_) => MovingAverageKind::Ema,
            Self::Wma(_) => MovingAverageKind::Wma,
        }
    }

    pub fn push(&mut self, x: f64) {
        match self {
            Self::Sma(ma) => ma.push(x),
            Self::Ema(ma) => ma.push(x),
            Self::Wma(ma) => ma.push(x),
        }
    }

    pub fn value(&self) -> Result<f64> {
        match self {
            Self::Sma(ma) => ma.value(),
            Self::Ema(ma) => ma.value(),
            Self::Wma(ma) => ma.value(),
        }
    }

    pub fn is_ready(&self) -> bool {
        match self {
            Self::Sma(ma) => ma.is_ready(),
            Self::Ema(ma) => ma.is_ready(),
            Self::Wma(ma) => ma.is_ready(),
        }
    }

    pub fn period(&self) -> usize {
        match self {
            Self::Sma(ma) => ma.period(),
            Self::Ema(ma) => ma.period(),
            Self::Wma(ma) => ma.period(),
        }
    }

    pub fn set_period(&mut self, period: usize) -> Result<()> {
        match self {
            Self::Sma(ma) => ma.set_period(period),
            Self::Ema(ma) => ma.set_period(period),
            Self::Wma(ma) => ma.set_period(period),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Sma(ma) => ma.reset(),
            Self::Ema(ma) => ma.reset(),
            Self::Wma(ma) => ma.reset(),
        }
    }
}
