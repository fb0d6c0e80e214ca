// =============================================================================
// Aurora Confluence — streaming indicators and multi-signal fusion
// =============================================================================
//
// Bars flow one way:
//
//   PriceBar → every SignalProvider (bounded, incremental state)
//            → ConfluenceEngine pulls crossovers / zones / trend bias
//            → regime-adjusted weighted sum → SignalLabel
//
// Everything is synchronous, in-memory arithmetic. `add` mutates, queries
// read; `Shared` enforces that split across threads.

pub mod config;
pub mod error;
pub mod indicators;
pub mod regime;
pub mod series;
pub mod shared;
pub mod signals;
pub mod types;

pub use config::{EngineConfig, IndicatorConfig};
pub use error::{IndicatorError, Result};
pub use series::BoundedSeries;
pub use shared::Shared;
pub use signals::{ConfluenceEngine, ConfluenceScore, SignalProvider};
pub use types::{Divergence, PriceBar, SignalLabel, TrendBias, Zone};
