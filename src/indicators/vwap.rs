// =============================================================================
// Rolling VWAP — volume-weighted average of typical price
// =============================================================================
//
//   vwap      = Σ(tp_i · v_i) / Σ v_i          over the last `period` bars
//   deviation = (close − vwap) / vwap · 100     (percent)
//
// Volumes are divided by `volume_scale` before weighting so very large raw
// volumes stay in a comfortable floating-point range. A window with zero
// total volume has no VWAP and reports `NotReady` for that bar.
// =============================================================================

use tracing::trace;

use crate::config::VwapParams;
use crate::error::{IndicatorError, Result};
use crate::indicators::moments::compensated_sum;
use crate::series::BoundedSeries;
use crate::signals::crossover::{bearish_crossover, bullish_crossover, latest_zone};
use crate::signals::provider::{SignalProvider, SignalRole};
use crate::types::{PriceBar, Zone};

const VALUE_HISTORY: usize = 10;

#[derive(Debug, Clone)]
pub struct Vwap {
    params: VwapParams,
    /// (typical price, scaled volume)
    window: BoundedSeries<(f64, f64)>,
    vwap: Option<f64>,
    deviations: BoundedSeries<f64>,
}

impl Vwap {
    pub fn new(params: VwapParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            window: BoundedSeries::new(params.period),
            vwap: None,
            deviations: BoundedSeries::new(VALUE_HISTORY),
            params,
        })
    }

    pub fn vwap(&self) -> Result<f64> {
        self.vwap
            .ok_or_else(|| IndicatorError::not_ready(self.params.period, self.window.len()))
    }

    fn update(&mut self, bar: &PriceBar) {
        let volume = bar.volume / self.params.config.volume_scale;
        self.window.push((bar.typical_price(), volume));
        self.vwap = None;
        if !self.window.is_full() {
            return;
        }

        let total_volume = compensated_sum(self.window.iter().map(|&(_, v)| v));
        if total_volume <= 0.0 {
            trace!("VWAP window has no volume");
            return;
        }
        let vwap = compensated_sum(self.window.iter().map(|&(tp, v)| tp * v)) / total_volume;
        if vwap <= 0.0 {
            return;
        }
        let deviation = (bar.close - vwap) / vwap * 100.0;
        trace!(vwap, deviation, "VWAP updated");
        self.vwap = Some(vwap);
        self.deviations.push(deviation);
    }
}

impl SignalProvider for Vwap {
    fn name(&self) -> &str {
        "vwap"
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
        self.vwap.and(self.deviations.last().copied())
    }

    fn is_bullish_crossover(&self) -> Result<bool> {
        self.vwap()?;
        bullish_crossover(&self.deviations, 0.0)
    }

    fn is_bearish_crossover(&self) -> Result<bool> {
        self.vwap()?;
        bearish_crossover(&self.deviations, 0.0)
    }

    fn zone(&self) -> Zone {
        if self.vwap.is_none() {
            return Zone::Neutral;
        }
        latest_zone(&self.deviations, &self.params.config)
    }

    fn reset(&mut self) {
        self.window.reset();
        self.vwap = None;
        self.deviations.reset();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn vwap(period: usize) -> Vwap {
        Vwap::new(VwapParams {
            period,
            ..VwapParams::default()
        })
        .unwrap()
    }

    #[test]
    fn volume_weighted_mean() {
        let mut v = vwap(2);
        v.add(&PriceBar::new(10.0, 10.0, 10.0, 1.0)).unwrap();
        v.add(&PriceBar::new(20.0, 20.0, 20.0, 3.0)).unwrap();
        // (10·1 + 20·3) / 4 = 17.5
        assert!((v.vwap().unwrap() - 17.5).abs() < 1e-10);
        let dev = v.last_value().unwrap();
        assert!((dev - (20.0 - 17.5) / 17.5 * 100.0).abs() < 1e-10);
        assert_eq!(v.zone(), Zone::Overbought);
    }

    #[test]
    fn zero_volume_window_is_not_ready() {
        let mut v = vwap(2);
        v.add(&PriceBar::new(10.0, 10.0, 10.0, 0.0)).unwrap();
        v.add(&PriceBar::new(11.0, 11.0, 11.0, 0.0)).unwrap();
        assert!(v.vwap().unwrap_err().is_not_ready());
        assert_eq!(v.last_value(), None);
        assert!(v.is_bullish_crossover().unwrap_err().is_not_ready());
    }

    #[test]
    fn volume_scale_does_not_change_vwap() {
        let mut plain = vwap(3);
        let mut scaled = Vwap::new(VwapParams {
            period: 3,
            config: VwapParams::default().config.with_volume_scale(1000.0),
        })
        .unwrap();
        for (p, vol) in [(10.0, 2000.0), (12.0, 1000.0), (11.0, 4000.0)] {
            let bar = PriceBar::new(p, p, p, vol);
            plain.add(&bar).unwrap();
            scaled.add(&bar).unwrap();
        }
        assert!((plain.vwap().unwrap() - scaled.vwap().unwrap()).abs() < 1e-10);
    }

    #[test]
    fn close_crossing_vwap() {
        let mut v = vwap(3);
        for p in [10.0, 10.0, 9.0] {
            v.add(&PriceBar::new(p, p, p, 1.0)).unwrap();
        }
        assert!(v.last_value().unwrap() < 0.0);
        v.add(&PriceBar::new(12.0, 12.0, 12.0, 1.0)).unwrap();
        assert!(v.is_bullish_crossover().unwrap());
    }
}
