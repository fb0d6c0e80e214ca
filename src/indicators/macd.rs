// =============================================================================
// MACD — Moving Average Convergence / Divergence
// =============================================================================
//
//   macd      = EMA_fast(close) − EMA_slow(close)
//   signal    = EMA_signal(macd)
//   histogram = macd − signal
//
// Crossovers are the histogram changing sign (MACD crossing its signal
// line). MACD is unbounded, so it never reports an overbought/oversold zone;
// its directional reading comes through `trend_bias` instead.
// =============================================================================

use tracing::trace;

use crate::config::MacdParams;
use crate::error::{IndicatorError, Result};
use crate::indicators::moving_average::Ema;
use crate::series::BoundedSeries;
use crate::signals::crossover::{bearish_crossover, bullish_crossover};
use crate::signals::provider::{SignalProvider, SignalRole};
use crate::types::{PriceBar, TrendBias, Zone};

const VALUE_HISTORY: usize = 10;

/// One fully-formed MACD reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdReading {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone)]
pub struct Macd {
    params: MacdParams,
    fast: Ema,
    slow: Ema,
    signal: Ema,
    latest: Option<MacdReading>,
    histogram: BoundedSeries<f64>,
    bars_seen: usize,
}

impl Macd {
    pub fn new(params: MacdParams) -> Result<Self> {
        params.validate()?;
        let cfg = params.config;
        Ok(Self {
            fast: Ema::new(cfg.fast_period)?,
            slow: Ema::new(cfg.slow_period)?,
            signal: Ema::new(cfg.signal_period)?,
            latest: None,
            histogram: BoundedSeries::new(VALUE_HISTORY),
            bars_seen: 0,
            params,
        })
    }

    /// Bars before the first full reading: slow EMA seed, then signal seed.
    pub fn warmup_period(&self) -> usize {
        self.params.config.slow_period + self.params.config.signal_period - 1
    }

    pub fn reading(&self) -> Result<MacdReading> {
        self.latest
            .ok_or_else(|| IndicatorError::not_ready(self.warmup_period(), self.bars_seen))
    }

    fn update(&mut self, close: f64) {
        self.bars_seen += 1;
        let fast = self.fast.next(close);
        let Some(slow) = self.slow.next(close) else {
            return;
        };
        let Some(fast) = fast else {
            return;
        };
        let macd = fast - slow;
        let Some(signal) = self.signal.next(macd) else {
            return;
        };
        let reading = MacdReading {
            macd,
            signal,
            histogram: macd - signal,
        };
        trace!(macd, signal, histogram = reading.histogram, "MACD updated");
        self.histogram.push(reading.histogram);
        self.latest = Some(reading);
    }
}

impl SignalProvider for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn role(&self) -> SignalRole {
        SignalRole::Trend
    }

    fn add(&mut self, bar: &PriceBar) -> Result<()> {
        bar.validate()?;
        self.update(bar.close);
        Ok(())
    }

    fn last_value(&self) -> Option<f64> {
        self.latest.map(|r| r.macd)
    }

    fn is_bullish_crossover(&self) -> Result<bool> {
        bullish_crossover(&self.histogram, 0.0)
    }

    fn is_bearish_crossover(&self) -> Result<bool> {
        bearish_crossover(&self.histogram, 0.0)
    }

    fn zone(&self) -> Zone {
        Zone::Neutral
    }

    fn trend_bias(&self) -> Result<TrendBias> {
        let r = self.reading()?;
        Ok(if r.macd > 0.0 && r.signal > 0.0 {
            TrendBias::Up
        } else if r.macd < 0.0 && r.signal < 0.0 {
            TrendBias::Down
        } else {
            TrendBias::Flat
        })
    }

    fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.signal.reset();
        self.latest = None;
        self.histogram.reset();
        self.bars_seen = 0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndicatorConfig;

    fn macd(fast: usize, slow: usize, signal: usize) -> Macd {
        Macd::new(MacdParams {
            config: IndicatorConfig::default().with_ema_periods(fast, slow, signal),
        })
        .unwrap()
    }

    fn feed(m: &mut Macd, closes: impl IntoIterator<Item = f64>) {
        for c in closes {
            m.add(&PriceBar::new(c, c, c, 1.0)).unwrap();
        }
    }

    #[test]
    fn warmup_then_first_reading() {
        let mut m = macd(3, 5, 4);
        let warmup = m.warmup_period();
        assert_eq!(warmup, 8);
        feed(&mut m, (0..warmup - 1).map(|i| 10.0 + i as f64));
        assert!(m.reading().unwrap_err().is_not_ready());
        feed(&mut m, [20.0]);
        assert!(m.reading().is_ok());
    }

    #[test]
    fn flat_prices_read_zero() {
        let mut m = macd(3, 5, 4);
        feed(&mut m, std::iter::repeat(50.0).take(20));
        let r = m.reading().unwrap();
        assert_eq!(r.macd, 0.0);
        assert_eq!(r.histogram, 0.0);
        assert_eq!(m.trend_bias().unwrap(), TrendBias::Flat);
        assert_eq!(m.zone(), Zone::Neutral);
    }

    #[test]
    fn uptrend_is_biased_up() {
        let mut m = macd(3, 6, 3);
        feed(&mut m, (0..40).map(|i| 100.0 + i as f64));
        let r = m.reading().unwrap();
        assert!(r.macd > 0.0 && r.signal > 0.0);
        assert_eq!(m.trend_bias().unwrap(), TrendBias::Up);
    }

    #[test]
    fn reversal_crosses_signal_line() {
        let mut m = macd(3, 6, 3);
        // Accelerating decline keeps the histogram strictly negative.
        feed(&mut m, (0..30).map(|i| 200.0 - 0.05 * (i * i) as f64));
        assert_eq!(m.trend_bias().unwrap(), TrendBias::Down);
        assert!(m.reading().unwrap().histogram < 0.0);

        let mut crossed = false;
        for i in 0..10 {
            feed(&mut m, [157.95 + 4.0 * (i + 1) as f64]);
            if m.is_bullish_crossover().unwrap() {
                crossed = true;
                break;
            }
        }
        assert!(crossed);
    }

    #[test]
    fn invalid_bar_rejected() {
        let mut m = macd(3, 5, 4);
        assert!(m.add(&PriceBar::new(1.0, 2.0, 1.5, 1.0)).is_err());
        assert!(m.reading().unwrap_err().is_not_ready());
    }
}
