// =============================================================================
// Shared types used across the confluence engine
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{IndicatorError, Result};

/// One price/volume bar. The only input the engine ever ingests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl PriceBar {
    pub fn new(high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price `(h + l + c) / 3`.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Check the data-model invariants: every field finite, `high >= low`,
    /// `close >= 0`, `volume >= 0`.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(IndicatorError::InvalidInput(format!(
                    "{name} is not finite ({value})"
                )));
            }
        }
        if self.high < self.low {
            return Err(IndicatorError::InvalidInput(format!(
                "high {} below low {}",
                self.high, self.low
            )));
        }
        if self.close < 0.0 {
            return Err(IndicatorError::InvalidInput(format!(
                "negative close {}",
                self.close
            )));
        }
        if self.volume < 0.0 {
            return Err(IndicatorError::InvalidInput(format!(
                "negative volume {}",
                self.volume
            )));
        }
        Ok(())
    }

    /// Stricter check for consumers that divide by the close.
    pub fn validate_positive_close(&self) -> Result<()> {
        self.validate()?;
        if self.close <= 0.0 {
            return Err(IndicatorError::InvalidInput(format!(
                "close must be positive for ratio indicators, got {}",
                self.close
            )));
        }
        Ok(())
    }
}

/// Overbought / oversold classification of an oscillator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    Overbought,
    Oversold,
    Neutral,
}

impl Default for Zone {
    fn default() -> Self {
        Self::Neutral
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overbought => write!(f, "OVERBOUGHT"),
            Self::Oversold => write!(f, "OVERSOLD"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Price/indicator divergence on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Divergence {
    Bullish,
    Bearish,
    None,
}

/// Directional trend reading a provider may expose besides crossovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendBias {
    Up,
    Down,
    Flat,
}

impl Default for TrendBias {
    fn default() -> Self {
        Self::Flat
    }
}

/// Discrete bias label produced by the confluence engine for the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalLabel {
    StrongBullish,
    Bullish,
    WeakBullish,
    Neutral,
    WeakBearish,
    Bearish,
    StrongBearish,
}

impl SignalLabel {
    pub fn is_bullish(self) -> bool {
        matches!(self, Self::StrongBullish | Self::Bullish | Self::WeakBullish)
    }

    pub fn is_bearish(self) -> bool {
        matches!(self, Self::StrongBearish | Self::Bearish | Self::WeakBearish)
    }
}

impl std::fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongBullish => write!(f, "Strong Bullish"),
            Self::Bullish => write!(f, "Bullish"),
            Self::WeakBullish => write!(f, "Weak Bullish"),
            Self::Neutral => write!(f, "Neutral"),
            Self::WeakBearish => write!(f, "Weak Bearish"),
            Self::Bearish => write!(f, "Bearish"),
            Self::StrongBearish => write!(f, "Strong Bearish"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_bar_passes() {
        assert!(PriceBar::new(10.0, 9.0, 9.5, 100.0).validate().is_ok());
        // Zero close and zero volume are legal for the base check.
        assert!(PriceBar::new(0.0, 0.0, 0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn high_below_low_rejected() {
        let err = PriceBar::new(9.0, 10.0, 9.5, 1.0).validate().unwrap_err();
        assert!(matches!(err, IndicatorError::InvalidInput(_)));
    }

    #[test]
    fn non_finite_fields_rejected() {
        for bar in [
            PriceBar::new(f64::NAN, 9.0, 9.5, 1.0),
            PriceBar::new(10.0, f64::NEG_INFINITY, 9.5, 1.0),
            PriceBar::new(10.0, 9.0, f64::INFINITY, 1.0),
            PriceBar::new(10.0, 9.0, 9.5, f64::NAN),
        ] {
            assert!(matches!(
                bar.validate(),
                Err(IndicatorError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn negative_close_and_volume_rejected() {
        assert!(PriceBar::new(1.0, -1.0, -0.5, 1.0).validate().is_err());
        assert!(PriceBar::new(10.0, 9.0, 9.5, -1.0).validate().is_err());
    }

    #[test]
    fn positive_close_check() {
        assert!(PriceBar::new(1.0, 0.0, 0.0, 1.0)
            .validate_positive_close()
            .is_err());
        assert!(PriceBar::new(1.0, 0.5, 0.7, 1.0)
            .validate_positive_close()
            .is_ok());
    }

    #[test]
    fn typical_price() {
        let bar = PriceBar::new(10.0, 9.0, 9.5, 0.0);
        assert!((bar.typical_price() - 9.5).abs() < 1e-12);
    }

    #[test]
    fn label_display() {
        assert_eq!(SignalLabel::StrongBullish.to_string(), "Strong Bullish");
        assert_eq!(SignalLabel::WeakBearish.to_string(), "Weak Bearish");
        assert_eq!(SignalLabel::Neutral.to_string(), "Neutral");
        assert!(SignalLabel::Bullish.is_bullish());
        assert!(SignalLabel::StrongBearish.is_bearish());
        assert!(!SignalLabel::Neutral.is_bullish());
    }

    #[test]
    fn bar_deserialises_without_volume() {
        let bar: PriceBar = serde_json::from_str(r#"{"high":2,"low":1,"close":1.5}"#).unwrap();
        assert_eq!(bar.volume, 0.0);
    }
}
