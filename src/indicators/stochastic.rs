// =============================================================================
// Stochastic Oscillator (%K / %D)
// =============================================================================
//
//   %K = 100 · (close − lowest_low) / (highest_high − lowest_low)
//   %D = SMA_d(%K)
//
// over the last `k_period` bars. A window with no range (highest == lowest)
// reads 50: the close sits in the middle of a zero-width range.
//
// Crossovers are %K crossing %D; zones are taken on %K.
// =============================================================================

use tracing::trace;

use crate::config::StochasticParams;
use crate::error::{IndicatorError, Result};
use crate::indicators::moving_average::Sma;
use crate::series::BoundedSeries;
use crate::signals::crossover::{bearish_crossover, bullish_crossover, classify_zone};
use crate::signals::provider::{SignalProvider, SignalRole};
use crate::types::{PriceBar, Zone};

const VALUE_HISTORY: usize = 10;

/// %K reading when the look-back window has zero range.
pub const FLAT_RANGE_K: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticReading {
    pub k: f64,
    pub d: f64,
}

#[derive(Debug, Clone)]
pub struct Stochastic {
    params: StochasticParams,
    highs: BoundedSeries<f64>,
    lows: BoundedSeries<f64>,
    d_line: Sma,
    latest: Option<StochasticReading>,
    /// %K − %D, for crossover detection.
    spread: BoundedSeries<f64>,
    bars_seen: usize,
}

impl Stochastic {
    pub fn new(params: StochasticParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            highs: BoundedSeries::new(params.k_period),
            lows: BoundedSeries::new(params.k_period),
            d_line: Sma::new(params.d_period)?,
            latest: None,
            spread: BoundedSeries::new(VALUE_HISTORY),
            bars_seen: 0,
            params,
        })
    }

    pub fn warmup_period(&self) -> usize {
        self.params.k_period + self.params.d_period - 1
    }

    pub fn reading(&self) -> Result<StochasticReading> {
        self.latest
            .ok_or_else(|| IndicatorError::not_ready(self.warmup_period(), self.bars_seen))
    }

    fn update(&mut self, bar: &PriceBar) {
        self.bars_seen += 1;
        self.highs.push(bar.high);
        self.lows.push(bar.low);
        if !self.highs.is_full() {
            return;
        }

        let highest = self.highs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lowest = self.lows.iter().copied().fold(f64::INFINITY, f64::min);
        let range = highest - lowest;
        let k = if range > 0.0 {
            (100.0 * (bar.close - lowest) / range).clamp(0.0, 100.0)
        } else {
            FLAT_RANGE_K
        };

        self.d_line.push(k);
        let Ok(d) = self.d_line.value() else {
            return;
        };
        trace!(k, d, "stochastic updated");
        self.spread.push(k - d);
        self.latest = Some(StochasticReading { k, d });
    }
}

impl SignalProvider for Stochastic {
    fn name(&self) -> &str {
        "stochastic"
    }

    fn role(&self) -> SignalRole {
        SignalRole::Oscillator
    }

    fn add(&mut self, bar: &PriceBar) -> Result<()> {
        bar.validate()?;
        self.update(bar);
        Ok(())
    }

    fn last_value(&self) -> Option<f64> {
        self.latest.map(|r| r.k)
    }

    fn is_bullish_crossover(&self) -> Result<bool> {
        bullish_crossover(&self.spread, 0.0)
    }

    fn is_bearish_crossover(&self) -> Result<bool> {
        bearish_crossover(&self.spread, 0.0)
    }

    fn zone(&self) -> Zone {
        self.latest
            .map(|r| classify_zone(r.k, &self.params.config))
            .unwrap_or_default()
    }

    fn reset(&mut self) {
        self.highs.reset();
        self.lows.reset();
        self.d_line.reset();
        self.latest = None;
        self.spread.reset();
        self.bars_seen = 0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn stoch(k: usize, d: usize) -> Stochastic {
        Stochastic::new(StochasticParams {
            k_period: k,
            d_period: d,
            ..StochasticParams::default()
        })
        .unwrap()
    }

    #[test]
    fn close_at_top_of_range_reads_100() {
        let mut s = stoch(3, 1);
        s.add(&PriceBar::new(10.0, 8.0, 9.0, 1.0)).unwrap();
        s.add(&PriceBar::new(11.0, 9.0, 10.0, 1.0)).unwrap();
        s.add(&PriceBar::new(12.0, 10.0, 12.0, 1.0)).unwrap();
        let r = s.reading().unwrap();
        assert!((r.k - 100.0).abs() < 1e-10);
        assert_eq!(s.zone(), Zone::Overbought);
    }

    #[test]
    fn k_formula() {
        let mut s = stoch(3, 1);
        s.add(&PriceBar::new(10.0, 8.0, 9.0, 1.0)).unwrap();
        s.add(&PriceBar::new(11.0, 9.0, 10.0, 1.0)).unwrap();
        s.add(&PriceBar::new(12.0, 10.0, 9.0, 1.0)).unwrap();
        // lowest 8, highest 12, close 9 → 25.
        assert!((s.reading().unwrap().k - 25.0).abs() < 1e-10);
    }

    #[test]
    fn flat_window_reads_midpoint() {
        let mut s = stoch(3, 2);
        for _ in 0..5 {
            s.add(&PriceBar::new(5.0, 5.0, 5.0, 1.0)).unwrap();
        }
        let r = s.reading().unwrap();
        assert_eq!(r.k, FLAT_RANGE_K);
        assert_eq!(r.d, FLAT_RANGE_K);
        assert_eq!(s.zone(), Zone::Neutral);
    }

    #[test]
    fn not_ready_until_d_seeded() {
        let mut s = stoch(3, 3);
        for _ in 0..s.warmup_period() - 1 {
            s.add(&PriceBar::new(5.0, 4.0, 4.5, 1.0)).unwrap();
        }
        assert!(s.reading().unwrap_err().is_not_ready());
        assert!(s.is_bullish_crossover().unwrap_err().is_not_ready());
    }

    #[test]
    fn k_crossing_d_upward() {
        let mut s = stoch(3, 2);
        // Falling closes within a steady range, then a close at the top.
        for c in [9.0, 8.0, 7.0, 6.0] {
            s.add(&PriceBar::new(10.0, 5.0, c, 1.0)).unwrap();
        }
        let r = s.reading().unwrap();
        assert!(r.k < r.d);
        s.add(&PriceBar::new(10.0, 5.0, 10.0, 1.0)).unwrap();
        assert!(s.is_bullish_crossover().unwrap());
        assert!(!s.is_bearish_crossover().unwrap());
    }
}
