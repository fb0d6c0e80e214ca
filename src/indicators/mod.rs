// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Streaming kernels and the signal providers built on them. Every indicator
// owns its bounded windows, ingests one bar at a time and reports warm-up as
// `IndicatorError::NotReady` rather than a placeholder value.
//
// Kernels:   moments (compensated sums, variance, Welford), moving averages,
//            adaptive period selection.
// Providers: ADMO and ATSO adaptive oscillators, plus RSI, MACD, Stochastic,
//            ATR, Bollinger and VWAP.

pub mod adaptive_period;
pub mod admo;
pub mod atr;
pub mod atso;
pub mod bollinger;
pub mod macd;
pub mod moments;
pub mod moving_average;
pub mod rsi;
pub mod stochastic;
pub mod vwap;

pub use adaptive_period::AdaptivePeriodSelector;
pub use admo::Admo;
pub use atr::Atr;
pub use atso::Atso;
pub use bollinger::{Bollinger, BollingerBands};
pub use macd::{Macd, MacdReading};
pub use moments::Welford;
pub use moving_average::{Ema, MovingAverage, MovingAverageKind, Sma, Wma};
pub use rsi::Rsi;
pub use stochastic::{Stochastic, StochasticReading};
pub use vwap::Vwap;
