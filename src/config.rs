// =============================================================================
// Configuration — indicator thresholds, provider parameters, engine tuning
// =============================================================================
//
// Every tunable lives in an explicit struct that is passed at construction;
// nothing reads process-wide defaults. Indicators validate their config once
// in `new` and never mutate it afterwards: a different config means a new
// instance.
//
// The JSON file format mirrors the structs. All fields carry serde defaults
// so that `{}` loads a complete default configuration, and `save` uses the
// tmp + rename pattern so a crash never leaves a half-written file.
// =============================================================================

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{IndicatorError, Result};
use crate::signals::weighted_score::WeightTable;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_overbought() -> f64 {
    70.0
}

fn default_oversold() -> f64 {
    30.0
}

fn default_strong_trend() -> f64 {
    25.0
}

fn default_volume_scale() -> f64 {
    1.0
}

fn default_fast_period() -> usize {
    12
}

fn default_slow_period() -> usize {
    26
}

fn default_signal_period() -> usize {
    9
}

fn invalid(msg: impl Into<String>) -> IndicatorError {
    IndicatorError::InvalidParams(msg.into())
}

fn check_positive_period(name: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(invalid(format!("{name} must be >= 1")));
    }
    Ok(())
}

fn check_finite(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(invalid(format!("{name} must be finite, got {value}")));
    }
    Ok(())
}

// =============================================================================
// IndicatorConfig
// =============================================================================

/// Immutable threshold snapshot shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_overbought")]
    pub overbought: f64,

    #[serde(default = "default_oversold")]
    pub oversold: f64,

    /// Level above which a strength reading counts as a strong trend.
    #[serde(default = "default_strong_trend")]
    pub strong_trend: f64,

    /// Minimum indicator move for a divergence to count.
    #[serde(default)]
    pub divergence_threshold: f64,

    /// Divisor applied to raw bar volume before weighting.
    #[serde(default = "default_volume_scale")]
    pub volume_scale: f64,

    #[serde(default = "default_fast_period")]
    pub fast_period: usize,

    #[serde(default = "default_slow_period")]
    pub slow_period: usize,

    #[serde(default = "default_signal_period")]
    pub signal_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            overbought: default_overbought(),
            oversold: default_oversold(),
            strong_trend: default_strong_trend(),
            divergence_threshold: 0.0,
            volume_scale: default_volume_scale(),
            fast_period: default_fast_period(),
            slow_period: default_slow_period(),
            signal_period: default_signal_period(),
        }
    }
}

impl IndicatorConfig {
    /// Copy with a different overbought/oversold pair.
    pub fn with_zones(mut self, overbought: f64, oversold: f64) -> Self {
        self.overbought = overbought;
        self.oversold = oversold;
        self
    }

    pub fn with_strong_trend(mut self, level: f64) -> Self {
        self.strong_trend = level;
        self
    }

    pub fn with_volume_scale(mut self, scale: f64) -> Self {
        self.volume_scale = scale;
        self
    }

    pub fn with_ema_periods(mut self, fast: usize, slow: usize, signal: usize) -> Self {
        self.fast_period = fast;
        self.slow_period = slow;
        self.signal_period = signal;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_finite("overbought", self.overbought)?;
        check_finite("oversold", self.oversold)?;
        check_finite("strong_trend", self.strong_trend)?;
        check_finite("divergence_threshold", self.divergence_threshold)?;
        if self.overbought <= self.oversold {
            return Err(invalid(format!(
                "overbought {} must exceed oversold {}",
                self.overbought, self.oversold
            )));
        }
        if self.divergence_threshold < 0.0 {
            return Err(invalid("divergence_threshold must be >= 0"));
        }
        if !(self.volume_scale.is_finite() && self.volume_scale > 0.0) {
            return Err(invalid(format!(
                "volume_scale must be > 0, got {}",
                self.volume_scale
            )));
        }
        check_positive_period("fast_period", self.fast_period)?;
        check_positive_period("slow_period", self.slow_period)?;
        check_positive_period("signal_period", self.signal_period)?;
        Ok(())
    }
}

// =============================================================================
// Per-provider parameters
// =============================================================================

/// Z-score DEMA oscillator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmoParams {
    /// EMA period of both DEMA stages and the mean window.
    pub length: usize,
    /// Window of the rolling standard deviation and its own statistics.
    pub stdev_length: usize,
    /// How strongly abnormal volatility amplifies the z-score.
    pub weight: f64,
    /// Closes and scores retained for divergence checks.
    pub price_lookback: usize,
    pub config: IndicatorConfig,
}

impl Default for AdmoParams {
    fn default() -> Self {
        Self {
            length: 14,
            stdev_length: 20,
            weight: 0.5,
            price_lookback: 10,
            config: IndicatorConfig::default().with_zones(2.0, -2.0),
        }
    }
}

impl AdmoParams {
    pub fn validate(&self) -> Result<()> {
        check_positive_period("length", self.length)?;
        check_positive_period("stdev_length", self.stdev_length)?;
        check_finite("weight", self.weight)?;
        if self.price_lookback < 3 {
            return Err(invalid("price_lookback must be >= 3"));
        }
        self.config.validate()
    }
}

/// Ratio trend-strength oscillator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtsoParams {
    pub min_period: usize,
    pub max_period: usize,
    pub volatility_period: usize,
    pub sensitivity: f64,
    /// Prior windows retained for the historical-average normalisation.
    pub history_windows: usize,
    /// Optional EMA applied to the clamped output for display.
    pub smoothing_period: Option<usize>,
    pub config: IndicatorConfig,
}

impl Default for AtsoParams {
    fn default() -> Self {
        Self {
            min_period: 10,
            max_period: 30,
            volatility_period: 20,
            sensitivity: 1.0,
            history_windows: 4,
            smoothing_period: None,
            config: IndicatorConfig::default()
                .with_zones(50.0, -50.0)
                .with_strong_trend(25.0),
        }
    }
}

impl AtsoParams {
    pub fn validate(&self) -> Result<()> {
        check_positive_period("min_period", self.min_period)?;
        check_positive_period("volatility_period", self.volatility_period)?;
        check_positive_period("history_windows", self.history_windows)?;
        if self.max_period < self.min_period {
            return Err(invalid("max_period must be >= min_period"));
        }
        if !(self.sensitivity.is_finite() && self.sensitivity > 0.0) {
            return Err(invalid("sensitivity must be > 0"));
        }
        if let Some(p) = self.smoothing_period {
            check_positive_period("smoothing_period", p)?;
        }
        self.config.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiParams {
    pub period: usize,
    pub config: IndicatorConfig,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: 14,
            config: IndicatorConfig::default(),
        }
    }
}

impl RsiParams {
    pub fn validate(&self) -> Result<()> {
        check_positive_period("period", self.period)?;
        self.config.validate()
    }
}

/// MACD reads its fast/slow/signal periods from `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub config: IndicatorConfig,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            config: IndicatorConfig::default(),
        }
    }
}

impl MacdParams {
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if self.config.fast_period >= self.config.slow_period {
            return Err(invalid("MACD fast_period must be below slow_period"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticParams {
    pub k_period: usize,
    pub d_period: usize,
    pub config: IndicatorConfig,
}

impl Default for StochasticParams {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
            config: IndicatorConfig::default().with_zones(80.0, 20.0),
        }
    }
}

impl StochasticParams {
    pub fn validate(&self) -> Result<()> {
        check_positive_period("k_period", self.k_period)?;
        check_positive_period("d_period", self.d_period)?;
        self.config.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrParams {
    pub period: usize,
}

impl Default for AtrParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl AtrParams {
    pub fn validate(&self) -> Result<()> {
        check_positive_period("period", self.period)
    }
}

/// Bollinger zones are expressed in %B (0 = lower band, 1 = upper band).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerParams {
    pub period: usize,
    pub num_std: f64,
    pub config: IndicatorConfig,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: 20,
            num_std: 2.0,
            config: IndicatorConfig::default().with_zones(1.0, 0.0),
        }
    }
}

impl BollingerParams {
    pub fn validate(&self) -> Result<()> {
        check_positive_period("period", self.period)?;
        if !(self.num_std.is_finite() && self.num_std > 0.0) {
            return Err(invalid("num_std must be > 0"));
        }
        self.config.validate()
    }
}

/// VWAP zones are percent deviation of the close from the rolling VWAP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VwapParams {
    pub period: usize,
    pub config: IndicatorConfig,
}

impl Default for VwapParams {
    fn default() -> Self {
        Self {
            period: 20,
            config: IndicatorConfig::default().with_zones(2.0, -2.0),
        }
    }
}

impl VwapParams {
    pub fn validate(&self) -> Result<()> {
        check_positive_period("period", self.period)?;
        self.config.validate()
    }
}

// =============================================================================
// ConfluenceConfig
// =============================================================================

fn default_strong_threshold() -> f64 {
    6.0
}

fn default_normal_threshold() -> f64 {
    3.5
}

fn default_weak_threshold() -> f64 {
    1.5
}

fn default_chop_vol_ratio() -> f64 {
    0.01
}

fn default_chop_bandwidth_pct() -> f64 {
    0.04
}

fn default_chop_trend_scale() -> f64 {
    0.5
}

fn default_momentum_bonus() -> f64 {
    1.0
}

fn default_high_vol_ratio() -> f64 {
    0.03
}

fn default_elevated_vol_ratio() -> f64 {
    0.02
}

fn default_low_vol_ratio() -> f64 {
    0.005
}

fn default_high_vol_shift() -> f64 {
    1.0
}

fn default_elevated_vol_shift() -> f64 {
    0.5
}

fn default_low_vol_shift() -> f64 {
    1.0
}

/// Scoring and regime tuning for the confluence engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceConfig {
    // --- Label thresholds (before volatility shifting) ----------------------
    #[serde(default = "default_strong_threshold")]
    pub strong_threshold: f64,

    #[serde(default = "default_normal_threshold")]
    pub normal_threshold: f64,

    #[serde(default = "default_weak_threshold")]
    pub weak_threshold: f64,

    // --- Chop detection -----------------------------------------------------

    /// ATR / close below which the market may be chopping.
    #[serde(default = "default_chop_vol_ratio")]
    pub chop_vol_ratio: f64,

    /// (upper − lower) / close below which the market may be chopping.
    #[serde(default = "default_chop_bandwidth_pct")]
    pub chop_bandwidth_pct: f64,

    /// Multiplier for trend-confirming contributions during chop.
    #[serde(default = "default_chop_trend_scale")]
    pub chop_trend_scale: f64,

    /// Added when the last three closes agree with the net score.
    #[serde(default = "default_momentum_bonus")]
    pub momentum_bonus: f64,

    // --- Volatility bands for threshold shifting ----------------------------

    #[serde(default = "default_high_vol_ratio")]
    pub high_vol_ratio: f64,

    #[serde(default = "default_elevated_vol_ratio")]
    pub elevated_vol_ratio: f64,

    #[serde(default = "default_low_vol_ratio")]
    pub low_vol_ratio: f64,

    /// Subtracted from every threshold when vol ratio >= `high_vol_ratio`.
    #[serde(default = "default_high_vol_shift")]
    pub high_vol_shift: f64,

    /// Subtracted from every threshold when vol ratio >= `elevated_vol_ratio`.
    #[serde(default = "default_elevated_vol_shift")]
    pub elevated_vol_shift: f64,

    /// Added to every threshold when vol ratio < `low_vol_ratio`.
    #[serde(default = "default_low_vol_shift")]
    pub low_vol_shift: f64,

    /// Per-provider weights, keyed by provider name.
    #[serde(default)]
    pub weights: WeightTable,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            strong_threshold: default_strong_threshold(),
            normal_threshold: default_normal_threshold(),
            weak_threshold: default_weak_threshold(),
            chop_vol_ratio: default_chop_vol_ratio(),
            chop_bandwidth_pct: default_chop_bandwidth_pct(),
            chop_trend_scale: default_chop_trend_scale(),
            momentum_bonus: default_momentum_bonus(),
            high_vol_ratio: default_high_vol_ratio(),
            elevated_vol_ratio: default_elevated_vol_ratio(),
            low_vol_ratio: default_low_vol_ratio(),
            high_vol_shift: default_high_vol_shift(),
            elevated_vol_shift: default_elevated_vol_shift(),
            low_vol_shift: default_low_vol_shift(),
            weights: WeightTable::default(),
        }
    }
}

impl ConfluenceConfig {
    pub fn validate(&self) -> Result<()> {
        let scalars = [
            ("strong_threshold", self.strong_threshold),
            ("normal_threshold", self.normal_threshold),
            ("weak_threshold", self.weak_threshold),
            ("chop_vol_ratio", self.chop_vol_ratio),
            ("chop_bandwidth_pct", self.chop_bandwidth_pct),
            ("chop_trend_scale", self.chop_trend_scale),
            ("momentum_bonus", self.momentum_bonus),
            ("high_vol_ratio", self.high_vol_ratio),
            ("elevated_vol_ratio", self.elevated_vol_ratio),
            ("low_vol_ratio", self.low_vol_ratio),
            ("high_vol_shift", self.high_vol_shift),
            ("elevated_vol_shift", self.elevated_vol_shift),
            ("low_vol_shift", self.low_vol_shift),
        ];
        for (name, value) in scalars {
            check_finite(name, value)?;
            if value < 0.0 {
                return Err(invalid(format!("{name} must be >= 0, got {value}")));
            }
        }
        if !(self.strong_threshold > self.normal_threshold
            && self.normal_threshold > self.weak_threshold
            && self.weak_threshold > 0.0)
        {
            return Err(invalid(
                "label thresholds must satisfy strong > normal > weak > 0",
            ));
        }
        if !(self.high_vol_ratio >= self.elevated_vol_ratio
            && self.elevated_vol_ratio > self.low_vol_ratio)
        {
            return Err(invalid(
                "volatility bands must satisfy high >= elevated > low",
            ));
        }
        if self.high_vol_shift >= self.weak_threshold || self.elevated_vol_shift >= self.weak_threshold {
            return Err(invalid(
                "volatility shifts must leave the weak threshold above 0",
            ));
        }
        if self.chop_trend_scale > 1.0 {
            return Err(invalid("chop_trend_scale must be <= 1"));
        }
        self.weights.validate()
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Everything needed to build the default confluence engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub rsi: RsiParams,
    #[serde(default)]
    pub macd: MacdParams,
    #[serde(default)]
    pub stochastic: StochasticParams,
    #[serde(default)]
    pub atr: AtrParams,
    #[serde(default)]
    pub bollinger: BollingerParams,
    /// VWAP is opt-in; `None` leaves it out of the default provider set.
    #[serde(default)]
    pub vwap: Option<VwapParams>,
    #[serde(default)]
    pub admo: AdmoParams,
    #[serde(default)]
    pub atso: AtsoParams,
    #[serde(default)]
    pub confluence: ConfluenceConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.rsi.validate()?;
        self.macd.validate()?;
        self.stochastic.validate()?;
        self.atr.validate()?;
        self.bollinger.validate()?;
        if let Some(vwap) = &self.vwap {
            vwap.validate()?;
        }
        self.admo.validate()?;
        self.atso.validate()?;
        self.confluence.validate()
    }

    /// Load and validate configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid engine config in {}", path.display()))?;

        info!(
            path = %path.display(),
            providers = config.confluence.weights.len(),
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist to `path` via a temporary sibling file and a rename.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.rsi.period, 14);
        assert_eq!(cfg.macd.config.fast_period, 12);
        assert!((cfg.admo.config.overbought - 2.0).abs() < f64::EPSILON);
        assert!((cfg.confluence.strong_threshold - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overbought_must_exceed_oversold() {
        let cfg = IndicatorConfig::default().with_zones(30.0, 70.0);
        assert!(matches!(cfg.validate(), Err(IndicatorError::InvalidParams(_))));
        let cfg = IndicatorConfig::default().with_zones(50.0, 50.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_periods_and_volume_scale_rejected() {
        let mut cfg = IndicatorConfig::default();
        cfg.signal_period = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = IndicatorConfig::default();
        cfg.volume_scale = 0.0;
        assert!(cfg.validate().is_err());

        assert!(RsiParams { period: 0, ..RsiParams::default() }.validate().is_err());
    }

    #[test]
    fn macd_requires_fast_below_slow() {
        let params = MacdParams {
            config: IndicatorConfig::default().with_ema_periods(26, 12, 9),
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let cfg = ConfluenceConfig {
            weak_threshold: 5.0,
            ..ConfluenceConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ConfluenceConfig {
            high_vol_shift: 1.5,
            ..ConfluenceConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "rsi": { "period": 7 }, "confluence": { "strong_threshold": 8.0 } }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.rsi.period, 7);
        assert!((cfg.rsi.config.overbought - 70.0).abs() < f64::EPSILON);
        assert!((cfg.confluence.strong_threshold - 8.0).abs() < f64::EPSILON);
        assert!((cfg.confluence.normal_threshold - 3.5).abs() < f64::EPSILON);
        cfg.validate().unwrap();
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("aurora-confluence-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.json");

        let mut cfg = EngineConfig::default();
        cfg.atso.smoothing_period = Some(3);
        cfg.vwap = Some(VwapParams::default());
        cfg.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.atso.smoothing_period, Some(3));
        assert_eq!(loaded.vwap.map(|v| v.period), Some(20));
        assert_eq!(loaded.rsi.period, cfg.rsi.period);
        assert_eq!(loaded.confluence.weights.len(), cfg.confluence.weights.len());
        assert!((loaded.confluence.low_vol_ratio - cfg.confluence.low_vol_ratio).abs() < 1e-12);
        assert!(!dir.join("engine.json.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = std::env::temp_dir().join(format!("aurora-confluence-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.json");
        std::fs::write(&path, r#"{ "rsi": { "period": 0 } }"#).unwrap();

        assert!(EngineConfig::load(&path).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
