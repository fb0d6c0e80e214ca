// =============================================================================
// Regime Detection Module
// =============================================================================
//
// Market regime classification from provider volatility readings:
// - ATR relative to price (volatility ratio)
// - Bollinger band width relative to price
// The volatility ratio also shifts the confluence label thresholds.

pub mod detector;

pub use detector::{LabelThresholds, MarketRegime, RegimeDetector, RegimeSnapshot, VolatilityBand};
