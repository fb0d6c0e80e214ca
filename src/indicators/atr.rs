// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method, streaming
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_0   = SMA of first `period` TR values
//   ATR_t   = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// ATR carries no directional signal. It feeds the confluence engine's regime
// detection through `regime_input` and never votes bull or bear.
// =============================================================================

use tracing::trace;

use crate::config::AtrParams;
use crate::error::{IndicatorError, Result};
use crate::indicators::moments::compensated_sum;
use crate::signals::provider::{RegimeInput, SignalProvider, SignalRole};
use crate::types::{PriceBar, Zone};

#[derive(Debug, Clone)]
pub struct Atr {
    params: AtrParams,
    prev_close: Option<f64>,
    seed: Vec<f64>,
    value: Option<f64>,
}

impl Atr {
    pub fn new(params: AtrParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            seed: Vec::with_capacity(params.period),
            params,
            prev_close: None,
            value: None,
        })
    }

    /// Latest ATR. Needs `period + 1` bars: every TR uses the previous close.
    pub fn calculate(&self) -> Result<f64> {
        self.value.ok_or_else(|| {
            let bars = self.seed.len() + usize::from(self.prev_close.is_some());
            IndicatorError::not_ready(self.params.period + 1, bars)
        })
    }

    /// ATR as a percentage of the given close.
    pub fn percent_of(&self, close: f64) -> Result<f64> {
        let atr = self.calculate()?;
        if close == 0.0 {
            return Err(IndicatorError::DivisionByZero("ATR percent of a zero close"));
        }
        Ok(atr / close * 100.0)
    }

    fn update(&mut self, bar: &PriceBar) {
        let Some(prev_close) = self.prev_close.replace(bar.close) else {
            return;
        };
        let hl = bar.high - bar.low;
        let hc = (bar.high - prev_close).abs();
        let lc = (bar.low - prev_close).abs();
        let tr = hl.max(hc).max(lc);

        let period_f = self.params.period as f64;
        let atr = match self.value {
            Some(prev) => (prev * (period_f - 1.0) + tr) / period_f,
            None => {
                self.seed.push(tr);
                if self.seed.len() < self.params.period {
                    return;
                }
                let seed = compensated_sum(self.seed.iter().copied()) / period_f;
                self.seed.clear();
                seed
            }
        };
        trace!(tr, atr, "ATR updated");
        self.value = Some(atr);
    }
}

impl SignalProvider for Atr {
    fn name(&self) -> &str {
        "atr"
    }

    fn role(&self) -> SignalRole {
        SignalRole::Volatility
    }

    fn add(&mut self, bar: &PriceBar) -> Result<()> {
        bar.validate()?;
        self.update(bar);
        Ok(())
    }

    fn last_value(&self) -> Option<f64> {
        self.value
    }

    fn is_bullish_crossover(&self) -> Result<bool> {
        self.calculate().map(|_| false)
    }

    fn is_bearish_crossover(&self) -> Result<bool> {
        self.calculate().map(|_| false)
    }

    fn zone(&self) -> Zone {
        Zone::Neutral
    }

    fn regime_input(&self) -> Option<RegimeInput> {
        self.value.map(RegimeInput::AverageTrueRange)
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.seed.clear();
        self.value = None;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn atr(period: usize) -> Atr {
        Atr::new(AtrParams { period }).unwrap()
    }

    #[test]
    fn atr_period_zero() {
        assert!(Atr::new(AtrParams { period: 0 }).is_err());
    }

    #[test]
    fn atr_insufficient_data() {
        let mut a = atr(14);
        for _ in 0..14 {
            a.add(&PriceBar::new(105.0, 95.0, 102.0, 1.0)).unwrap();
        }
        assert_eq!(
            a.calculate().unwrap_err(),
            IndicatorError::NotReady { needed: 15, available: 14 }
        );
        assert_eq!(a.regime_input(), None);
    }

    #[test]
    fn atr_exact_minimum_data() {
        // period=3, need 4 bars to get 3 TR values.
        let mut a = atr(3);
        a.add(&PriceBar::new(102.0, 98.0, 101.0, 1.0)).unwrap();
        a.add(&PriceBar::new(104.0, 99.0, 103.0, 1.0)).unwrap();
        a.add(&PriceBar::new(106.0, 100.0, 105.0, 1.0)).unwrap();
        a.add(&PriceBar::new(108.0, 102.0, 107.0, 1.0)).unwrap();
        // TRs: 5, 6, 6 → 17 / 3.
        assert!((a.calculate().unwrap() - 17.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn atr_constant_range() {
        let mut a = atr(14);
        for i in 0..30 {
            let base = 100.0 + i as f64 * 0.1;
            a.add(&PriceBar::new(base + 5.0, base - 5.0, base, 1.0)).unwrap();
        }
        let v = a.calculate().unwrap();
        assert!((v - 10.0).abs() < 1.0, "expected ATR near 10.0, got {v}");
        assert_eq!(a.regime_input(), Some(RegimeInput::AverageTrueRange(v)));
        assert!((a.percent_of(100.0).unwrap() - v).abs() < 1e-10);
    }

    #[test]
    fn atr_increasing_volatility() {
        let mut a = atr(14);
        a.add(&PriceBar::new(101.0, 99.0, 100.0, 1.0)).unwrap();
        let mut last = None;
        for i in 1..30 {
            let spread = 1.0 + i as f64 * 0.5;
            a.add(&PriceBar::new(100.0 + spread, 100.0 - spread, 100.0, 1.0)).unwrap();
            if let (Some(prev), Ok(curr)) = (last, a.calculate()) {
                assert!(curr > prev);
            }
            last = a.calculate().ok();
        }
    }

    #[test]
    fn never_votes() {
        let mut a = atr(2);
        assert!(a.is_bullish_crossover().unwrap_err().is_not_ready());
        for _ in 0..5 {
            a.add(&PriceBar::new(11.0, 9.0, 10.0, 1.0)).unwrap();
        }
        assert!(!a.is_bullish_crossover().unwrap());
        assert!(!a.is_bearish_crossover().unwrap());
        assert_eq!(a.zone(), Zone::Neutral);
    }
}
