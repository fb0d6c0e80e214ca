// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), with σ the population standard deviation of
// the window. The provider's value is %B:
//
//   %B = (close - lower) / (upper - lower)
//
// 0 sits on the lower band, 1 on the upper. Collapsed bands (σ == 0) read
// %B = 0.5. Crossovers are %B crossing the middle band (0.5); the band edges
// feed the confluence engine's regime detection.

use tracing::trace;

use crate::config::BollingerParams;
use crate::error::{IndicatorError, Result};
use crate::indicators::moments::{mean, population_variance};
use crate::series::BoundedSeries;
use crate::signals::crossover::{bearish_crossover, bullish_crossover, latest_zone};
use crate::signals::provider::{RegimeInput, SignalProvider, SignalRole};
use crate::types::{PriceBar, Zone};

const VALUE_HISTORY: usize = 10;

/// %B of the middle band.
pub const MIDDLE_PERCENT_B: f64 = 0.5;

/// Result of a Bollinger Band calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    /// Band width relative to the middle band, in percent.
    pub fn width_pct(&self) -> Option<f64> {
        if self.middle == 0.0 {
            return None;
        }
        let width = (self.upper - self.lower) / self.middle * 100.0;
        width.is_finite().then_some(width)
    }

    pub fn percent_b(&self, close: f64) -> f64 {
        let span = self.upper - self.lower;
        if span > 0.0 {
            (close - self.lower) / span
        } else {
            MIDDLE_PERCENT_B
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    params: BollingerParams,
    closes: BoundedSeries<f64>,
    bands: Option<BollingerBands>,
    percent_b: BoundedSeries<f64>,
}

impl Bollinger {
    pub fn new(params: BollingerParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            closes: BoundedSeries::new(params.period),
            bands: None,
            percent_b: BoundedSeries::new(VALUE_HISTORY),
            params,
        })
    }

    pub fn bands(&self) -> Result<BollingerBands> {
        self.bands
            .ok_or_else(|| IndicatorError::not_ready(self.params.period, self.closes.len()))
    }

    fn update(&mut self, close: f64) {
        self.closes.push(close);
        if !self.closes.is_full() {
            return;
        }
        let Some(middle) = mean(self.closes.iter().copied()) else {
            return;
        };
        let std_dev = population_variance(self.closes.iter().copied()).sqrt();
        let bands = BollingerBands {
            upper: middle + self.params.num_std * std_dev,
            middle,
            lower: middle - self.params.num_std * std_dev,
        };
        let pb = bands.percent_b(close);
        trace!(upper = bands.upper, middle, lower = bands.lower, percent_b = pb, "bollinger updated");
        self.percent_b.push(pb);
        self.bands = Some(bands);
    }
}

impl SignalProvider for Bollinger {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn role(&self) -> SignalRole {
        SignalRole::Volatility
    }

    fn add(&mut self, bar: &PriceBar) -> Result<()> {
        bar.validate()?;
        self.update(bar.close);
        Ok(())
    }

    fn last_value(&self) -> Option<f64> {
        self.percent_b.last().copied()
    }

    fn is_bullish_crossover(&self) -> Result<bool> {
        bullish_crossover(&self.percent_b, MIDDLE_PERCENT_B)
    }

    fn is_bearish_crossover(&self) -> Result<bool> {
        bearish_crossover(&self.percent_b, MIDDLE_PERCENT_B)
    }

    fn zone(&self) -> Zone {
        latest_zone(&self.percent_b, &self.params.config)
    }

    fn regime_input(&self) -> Option<RegimeInput> {
        self.bands.map(|b| RegimeInput::Bands {
            upper: b.upper,
            middle: b.middle,
            lower: b.lower,
        })
    }

    fn reset(&mut self) {
        self.closes.reset();
        self.bands = None;
        self.percent_b.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bollinger(period: usize) -> Bollinger {
        Bollinger::new(BollingerParams {
            period,
            ..BollingerParams::default()
        })
        .unwrap()
    }

    fn feed(b: &mut Bollinger, closes: impl IntoIterator<Item = f64>) {
        for c in closes {
            b.add(&PriceBar::new(c, c, c, 1.0)).unwrap();
        }
    }

    #[test]
    fn bollinger_basic() {
        let mut b = bollinger(20);
        feed(&mut b, (1..=20).map(|x| x as f64));
        let bands = b.bands().unwrap();
        assert!(bands.upper > bands.middle);
        assert!(bands.lower < bands.middle);
        assert!((bands.middle - 10.5).abs() < 1e-10);
        assert!(bands.width_pct().unwrap() > 0.0);
    }

    #[test]
    fn population_sigma() {
        let mut b = bollinger(4);
        feed(&mut b, [2.0, 4.0, 4.0, 6.0]);
        // mean 4, population variance 2.
        let bands = b.bands().unwrap();
        assert!((bands.upper - (4.0 + 2.0 * 2f64.sqrt())).abs() < 1e-10);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let mut b = bollinger(20);
        feed(&mut b, [1.0, 2.0, 3.0]);
        assert_eq!(
            b.bands().unwrap_err(),
            IndicatorError::NotReady { needed: 20, available: 3 }
        );
        assert_eq!(b.regime_input(), None);
    }

    #[test]
    fn bollinger_flat() {
        let mut b = bollinger(20);
        feed(&mut b, std::iter::repeat(100.0).take(20));
        let bands = b.bands().unwrap();
        assert!(bands.width_pct().unwrap().abs() < 1e-10);
        assert_eq!(b.last_value(), Some(MIDDLE_PERCENT_B));
        assert_eq!(b.zone(), Zone::Neutral);
    }

    #[test]
    fn surge_crosses_middle_band() {
        let mut b = bollinger(5);
        feed(&mut b, [10.0, 10.2, 9.8, 10.1, 9.9, 9.7]);
        assert!(b.last_value().unwrap() < 0.5);
        feed(&mut b, [13.0]);
        assert!(b.last_value().unwrap() > 0.5);
        assert!(b.is_bullish_crossover().unwrap());
        assert!(matches!(b.regime_input(), Some(RegimeInput::Bands { .. })));
    }
}
