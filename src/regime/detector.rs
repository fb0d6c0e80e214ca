// =============================================================================
// Market Regime Detector
// =============================================================================
//
// Classifies the latest bar as CHOP or TRENDING from two volatility readings
// published by the providers:
//
//   vol_ratio     = ATR / close
//   bandwidth_pct = (bollinger_upper − bollinger_lower) / close
//
// CHOP when both sit below their configured thresholds. During chop the
// contributions of trend-following providers are damped by `trend_scale`.
//
// The vol ratio also selects a volatility band that shifts the label
// thresholds (evaluated top-to-bottom; first match wins):
//
//   1. HIGH      — vol_ratio >= high_vol_ratio      → thresholds − high shift
//   2. ELEVATED  — vol_ratio >= elevated_vol_ratio  → thresholds − elevated shift
//   3. LOW       — vol_ratio <  low_vol_ratio       → thresholds + low shift
//   4. NORMAL    — otherwise                        → base thresholds
//
// Looser thresholds in high volatility let signals fire more easily; tighter
// ones in very quiet markets demand more confluence.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfluenceConfig;
use crate::error::{IndicatorError, Result};
use crate::signals::provider::RegimeInput;
use crate::types::SignalLabel;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketRegime {
    /// Directional or at least volatile enough for breakouts to matter.
    Trending,
    /// Quiet, narrow-band sideways action.
    Chop,
}

impl std::fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trending => write!(f, "TRENDING"),
            Self::Chop => write!(f, "CHOP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolatilityBand {
    High,
    Elevated,
    Normal,
    Low,
}

impl std::fmt::Display for VolatilityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Elevated => write!(f, "ELEVATED"),
            Self::Normal => write!(f, "NORMAL"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// Label thresholds after volatility shifting. Negative labels mirror them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelThresholds {
    pub strong: f64,
    pub normal: f64,
    pub weak: f64,
}

impl LabelThresholds {
    pub fn base(config: &ConfluenceConfig) -> Self {
        Self {
            strong: config.strong_threshold,
            normal: config.normal_threshold,
            weak: config.weak_threshold,
        }
    }

    fn shifted(self, delta: f64) -> Self {
        Self {
            strong: self.strong + delta,
            normal: self.normal + delta,
            weak: self.weak + delta,
        }
    }

    /// Map a net score onto a label, strongest bullish first.
    pub fn classify(&self, net: f64) -> SignalLabel {
        if net >= self.strong {
            SignalLabel::StrongBullish
        } else if net >= self.normal {
            SignalLabel::Bullish
        } else if net >= self.weak {
            SignalLabel::WeakBullish
        } else if net <= -self.strong {
            SignalLabel::StrongBearish
        } else if net <= -self.normal {
            SignalLabel::Bearish
        } else if net <= -self.weak {
            SignalLabel::WeakBearish
        } else {
            SignalLabel::Neutral
        }
    }
}

/// Regime classification for one bar plus the metrics behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeSnapshot {
    pub regime: MarketRegime,
    pub vol_ratio: f64,
    pub bandwidth_pct: f64,
    pub volatility_band: VolatilityBand,
    /// Multiplier for trend-following contributions (1.0 outside chop).
    pub trend_scale: f64,
    pub thresholds: LabelThresholds,
}

impl RegimeSnapshot {
    pub fn is_chop(&self) -> bool {
        self.regime == MarketRegime::Chop
    }
}

// =============================================================================
// RegimeDetector
// =============================================================================

/// Regime classifier with a lazily recomputed cache.
///
/// The owner calls [`RegimeDetector::invalidate`] whenever a new bar lands;
/// the next [`RegimeDetector::detect`] recomputes and caches the snapshot.
#[derive(Debug)]
pub struct RegimeDetector {
    config: ConfluenceConfig,
    state: RwLock<Option<RegimeSnapshot>>,
}

impl RegimeDetector {
    pub fn new(config: ConfluenceConfig) -> Self {
        Self {
            config,
            state: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ConfluenceConfig {
        &self.config
    }

    /// Drop the cached snapshot.
    pub fn invalidate(&self) {
        *self.state.write() = None;
    }

    /// Cached snapshot, if one was computed since the last invalidation.
    pub fn current(&self) -> Option<RegimeSnapshot> {
        *self.state.read()
    }

    /// Classify the newest bar from the providers' regime readings.
    ///
    /// Needs one ATR reading and one set of bands; `NotReady` otherwise.
    pub fn detect(&self, close: f64, inputs: &[RegimeInput]) -> Result<RegimeSnapshot> {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }

        let atr = inputs.iter().find_map(|input| match input {
            RegimeInput::AverageTrueRange(v) => Some(*v),
            RegimeInput::Bands { .. } => None,
        });
        let bandwidth = inputs.iter().find_map(|input| match input {
            RegimeInput::Bands { upper, lower, .. } => Some(upper - lower),
            RegimeInput::AverageTrueRange(_) => None,
        });
        let (Some(atr), Some(bandwidth)) = (atr, bandwidth) else {
            let available = usize::from(atr.is_some()) + usize::from(bandwidth.is_some());
            return Err(IndicatorError::not_ready(2, available));
        };
        if !(close.is_finite() && close > 0.0) {
            return Err(IndicatorError::InvalidInput(format!(
                "regime detection needs a positive close, got {close}"
            )));
        }

        let snapshot = classify(&self.config, atr / close, bandwidth / close);

        debug!(
            regime = %snapshot.regime,
            band = %snapshot.volatility_band,
            vol_ratio = format!("{:.5}", snapshot.vol_ratio),
            bandwidth_pct = format!("{:.5}", snapshot.bandwidth_pct),
            strong = format!("{:.2}", snapshot.thresholds.strong),
            "Regime detected"
        );

        *self.state.write() = Some(snapshot);
        Ok(snapshot)
    }
}

impl Clone for RegimeDetector {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: RwLock::new(self.current()),
        }
    }
}

// =============================================================================
// Classification logic
// =============================================================================

fn volatility_band(config: &ConfluenceConfig, vol_ratio: f64) -> VolatilityBand {
    if vol_ratio >= config.high_vol_ratio {
        VolatilityBand::High
    } else if vol_ratio >= config.elevated_vol_ratio {
        VolatilityBand::Elevated
    } else if vol_ratio < config.low_vol_ratio {
        VolatilityBand::Low
    } else {
        VolatilityBand::Normal
    }
}

fn classify(config: &ConfluenceConfig, vol_ratio: f64, bandwidth_pct: f64) -> RegimeSnapshot {
    let chop = vol_ratio < config.chop_vol_ratio && bandwidth_pct < config.chop_bandwidth_pct;
    let (regime, trend_scale) = if chop {
        (MarketRegime::Chop, config.chop_trend_scale)
    } else {
        (MarketRegime::Trending, 1.0)
    };

    let band = volatility_band(config, vol_ratio);
    let delta = match band {
        VolatilityBand::High => -config.high_vol_shift,
        VolatilityBand::Elevated => -config.elevated_vol_shift,
        VolatilityBand::Low => config.low_vol_shift,
        VolatilityBand::Normal => 0.0,
    };

    RegimeSnapshot {
        regime,
        vol_ratio,
        bandwidth_pct,
        volatility_band: band,
        trend_scale,
        thresholds: LabelThresholds::base(config).shifted(delta),
    }
}
