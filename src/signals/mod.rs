// =============================================================================
// Signals Module
// =============================================================================
//
// Signal processing pipeline:
// - The SignalProvider capability contract
// - Crossover / zone / divergence classification
// - Per-provider weights and score breakdowns
// - The regime-aware confluence engine

pub mod confluence;
pub mod crossover;
pub mod provider;
pub mod weighted_score;

pub use confluence::{ConfluenceEngine, ConfluenceEngineBuilder};
pub use provider::{ProviderSnapshot, RegimeInput, SignalProvider, SignalRole};
pub use weighted_score::{ConfluenceScore, ProviderWeights, SignalContribution, WeightTable};
