// =============================================================================
// SignalProvider — the capability contract every indicator exposes
// =============================================================================
//
// The confluence engine holds a homogeneous `Vec<Box<dyn SignalProvider>>`
// and never names concrete indicator types. Adding a provider means
// implementing this trait; the engine does not change. Any `Clone` provider
// gets `snapshot` for free, which the engine uses to roll a bar back.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{PriceBar, TrendBias, Zone};

/// How the engine treats a provider's crossover and trend contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalRole {
    /// Trend-following: contributions are damped while the market chops.
    Trend,
    /// Bounded or mean-reverting oscillator.
    Oscillator,
    /// Measures volatility only; feeds regime detection.
    Volatility,
}

/// Regime inputs a provider can publish for the engine's chop detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RegimeInput {
    AverageTrueRange(f64),
    Bands { upper: f64, middle: f64, lower: f64 },
}

/// Streaming indicator pluggable into the confluence engine.
///
/// `add` needs exclusive access; every other method is a read-only query and
/// may run concurrently with other queries (`Send + Sync` lets the engine be
/// shared behind a read/write lock).
pub trait SignalProvider: ProviderSnapshot + Send + Sync {
    /// Stable identifier, also the key into the engine's weight table.
    fn name(&self) -> &str;

    fn role(&self) -> SignalRole;

    /// Check whether `add(bar)` would be accepted, without mutating anything.
    ///
    /// The engine calls this on every provider before any `add`. An `add`
    /// that still fails afterwards is rolled back from a snapshot.
    fn validate(&self, bar: &PriceBar) -> Result<()> {
        bar.validate()
    }

    /// Ingest one bar. Invalid bars are rejected before any state changes.
    fn add(&mut self, bar: &PriceBar) -> Result<()>;

    /// Latest emitted value, `None` while warming up.
    fn last_value(&self) -> Option<f64>;

    fn is_bullish_crossover(&self) -> Result<bool>;

    fn is_bearish_crossover(&self) -> Result<bool>;

    fn zone(&self) -> Zone;

    /// Optional directional strength reading.
    fn trend_bias(&self) -> Result<TrendBias> {
        Ok(TrendBias::Flat)
    }

    /// Optional volatility reading for regime detection.
    fn regime_input(&self) -> Option<RegimeInput> {
        None
    }

    /// Clear all buffered data; configuration and periods are kept.
    fn reset(&mut self);
}

/// Boxed copy of a provider's full state.
pub trait ProviderSnapshot {
    fn snapshot(&self) -> Box<dyn SignalProvider>;
}

impl<T> ProviderSnapshot for T
where
    T: SignalProvider + Clone + 'static,
{
    fn snapshot(&self) -> Box<dyn SignalProvider> {
        Box::new(self.clone())
    }
}
