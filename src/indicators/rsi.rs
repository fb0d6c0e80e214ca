// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing, streaming
// =============================================================================
//
// Step 1 — Price change (delta) from the previous close.
// Step 2 — Seed average gain / average loss with the SMA of the first
//          `period` gains / losses.
// Step 3 — Wilder's exponential smoothing thereafter:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Signals: bullish when RSI climbs back above oversold, bearish when it
// drops back below overbought. Zones come from the configured thresholds.
// =============================================================================

use tracing::trace;

use crate::config::RsiParams;
use crate::error::{IndicatorError, Result};
use crate::series::BoundedSeries;
use crate::signals::crossover::{bearish_crossover, bullish_crossover, latest_zone};
use crate::signals::provider::{SignalProvider, SignalRole};
use crate::types::{PriceBar, Zone};

const VALUE_HISTORY: usize = 10;

#[derive(Debug, Clone)]
pub struct Rsi {
    params: RsiParams,
    prev_close: Option<f64>,
    seed_gain: f64,
    seed_loss: f64,
    seed_count: usize,
    averages: Option<(f64, f64)>,
    values: BoundedSeries<f64>,
}

impl Rsi {
    pub fn new(params: RsiParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            prev_close: None,
            seed_gain: 0.0,
            seed_loss: 0.0,
            seed_count: 0,
            averages: None,
            values: BoundedSeries::new(VALUE_HISTORY),
        })
    }

    pub fn calculate(&self) -> Result<f64> {
        self.values
            .last()
            .copied()
            .ok_or_else(|| {
                let closes_seen = self.seed_count + usize::from(self.prev_close.is_some());
                IndicatorError::not_ready(self.params.period + 1, closes_seen)
            })
    }

    fn update(&mut self, close: f64) {
        let Some(prev) = self.prev_close.replace(close) else {
            return;
        };
        let delta = close - prev;
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };
        let period_f = self.params.period as f64;

        let (avg_gain, avg_loss) = match self.averages {
            Some((g, l)) => (
                (g * (period_f - 1.0) + gain) / period_f,
                (l * (period_f - 1.0) + loss) / period_f,
            ),
            None => {
                self.seed_gain += gain;
                self.seed_loss += loss;
                self.seed_count += 1;
                if self.seed_count < self.params.period {
                    return;
                }
                (self.seed_gain / period_f, self.seed_loss / period_f)
            }
        };
        self.averages = Some((avg_gain, avg_loss));

        if let Some(rsi) = rsi_from_averages(avg_gain, avg_loss) {
            trace!(rsi, avg_gain, avg_loss, "RSI updated");
            self.values.push(rsi);
        }
    }
}

impl SignalProvider for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn role(&self) -> SignalRole {
        SignalRole::Oscillator
    }

    fn add(&mut self, bar: &PriceBar) -> Result<()> {
        bar.validate()?;
        self.update(bar.close);
        Ok(())
    }

    fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    fn is_bullish_crossover(&self) -> Result<bool> {
        bullish_crossover(&self.values, self.params.config.oversold)
    }

    fn is_bearish_crossover(&self) -> Result<bool> {
        bearish_crossover(&self.values, self.params.config.overbought)
    }

    fn zone(&self) -> Zone {
        latest_zone(&self.values, &self.params.config)
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.seed_gain = 0.0;
        self.seed_loss = 0.0;
        self.seed_count = 0;
        self.averages = None;
        self.values.reset();
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If both averages are zero, RSI is 50.0 (no movement).
/// - If average loss is zero (only gains), RSI is 100.0.
/// - Returns `None` when the result is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    if rsi.is_finite() {
        Some(rsi)
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn rsi(period: usize) -> Rsi {
        Rsi::new(RsiParams {
            period,
            ..RsiParams::default()
        })
        .unwrap()
    }

    fn feed(rsi: &mut Rsi, closes: &[f64]) {
        for &c in closes {
            rsi.add(&PriceBar::new(c, c, c, 1.0)).unwrap();
        }
    }

    #[test]
    fn rsi_period_zero_rejected() {
        assert!(Rsi::new(RsiParams { period: 0, ..RsiParams::default() }).is_err());
    }

    #[test]
    fn rsi_insufficient_data() {
        // Need period+1 closes (period deltas). 14 closes => 13 deltas < 14.
        let mut r = rsi(14);
        feed(&mut r, &(1..=14).map(|x| x as f64).collect::<Vec<_>>());
        assert!(r.calculate().unwrap_err().is_not_ready());
        feed(&mut r, &[15.0]);
        assert!(r.calculate().is_ok());
    }

    #[test]
    fn rsi_all_gains() {
        let mut r = rsi(14);
        feed(&mut r, &(1..=30).map(|x| x as f64).collect::<Vec<_>>());
        assert!((r.calculate().unwrap() - 100.0).abs() < 1e-10);
        assert_eq!(r.zone(), Zone::Overbought);
    }

    #[test]
    fn rsi_all_losses() {
        let mut r = rsi(14);
        feed(&mut r, &(1..=30).rev().map(|x| x as f64).collect::<Vec<_>>());
        assert!(r.calculate().unwrap().abs() < 1e-10);
        assert_eq!(r.zone(), Zone::Oversold);
    }

    #[test]
    fn rsi_flat_market() {
        let mut r = rsi(14);
        feed(&mut r, &[100.0; 30]);
        assert!((r.calculate().unwrap() - 50.0).abs() < 1e-10);
        assert_eq!(r.zone(), Zone::Neutral);
    }

    #[test]
    fn rsi_range_check() {
        let closes = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let mut r = rsi(14);
        for &c in &closes {
            r.add(&PriceBar::new(c, c, c, 1.0)).unwrap();
            if let Some(v) = r.last_value() {
                assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
            }
        }
    }

    #[test]
    fn recovery_from_oversold_is_bullish() {
        let mut r = rsi(3);
        feed(&mut r, &[10.0, 9.0, 8.0, 7.0]);
        assert!(r.calculate().unwrap() < 30.0);
        assert!(!r.is_bullish_crossover().unwrap_or(false));
        feed(&mut r, &[12.0]);
        assert!(r.calculate().unwrap() > 30.0);
        assert!(r.is_bullish_crossover().unwrap());
        assert!(!r.is_bearish_crossover().unwrap());
    }

    #[test]
    fn reset_clears_seed() {
        let mut r = rsi(3);
        feed(&mut r, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        r.reset();
        assert_eq!(r.last_value(), None);
        feed(&mut r, &[5.0, 4.0, 3.0, 2.0]);
        assert!(r.calculate().unwrap().abs() < 1e-10);
    }
}
