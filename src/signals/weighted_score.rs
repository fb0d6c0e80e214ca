// =============================================================================
// Weighted Scoring — per-provider weights and the score breakdown
// =============================================================================
//
// Every provider has three hand-tuned weights:
//   crossover — added when the provider reports a bullish/bearish crossover
//   zone      — added when it sits oversold (bull) or overbought (bear)
//   strength  — added when its trend bias points up (bull) or down (bear)
//
// The tally keeps every non-zero contribution so a score can be explained
// after the fact.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{IndicatorError, Result};
use crate::regime::detector::RegimeSnapshot;
use crate::types::SignalLabel;

/// Weights for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderWeights {
    pub crossover: f64,
    pub zone: f64,
    pub strength: f64,
}

impl ProviderWeights {
    pub const fn new(crossover: f64, zone: f64, strength: f64) -> Self {
        Self {
            crossover,
            zone,
            strength,
        }
    }

    /// A provider that never votes.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
}

impl Default for ProviderWeights {
    /// Unit weights for providers the table does not list.
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// Provider weights keyed by provider name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable {
    weights: HashMap<String, ProviderWeights>,
}

impl Default for WeightTable {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert("rsi".to_string(), ProviderWeights::new(1.0, 1.5, 0.0));
        weights.insert("macd".to_string(), ProviderWeights::new(2.0, 0.0, 1.0));
        weights.insert("stochastic".to_string(), ProviderWeights::new(1.0, 1.0, 0.0));
        weights.insert("bollinger".to_string(), ProviderWeights::new(0.0, 1.5, 0.0));
        weights.insert("atr".to_string(), ProviderWeights::ZERO);
        weights.insert("admo".to_string(), ProviderWeights::new(2.0, 1.0, 0.0));
        weights.insert("atso".to_string(), ProviderWeights::new(1.0, 0.0, 1.5));
        weights.insert("vwap".to_string(), ProviderWeights::new(1.0, 1.0, 0.0));
        Self { weights }
    }
}

impl WeightTable {
    pub fn empty() -> Self {
        Self {
            weights: HashMap::new(),
        }
    }

    /// Weights for `name`, unit weights when it is not listed.
    pub fn get(&self, name: &str) -> ProviderWeights {
        self.weights.get(name).copied().unwrap_or_default()
    }

    pub fn set(&mut self, name: impl Into<String>, weights: ProviderWeights) {
        self.weights.insert(name.into(), weights);
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        for (name, w) in &self.weights {
            for (field, value) in [("crossover", w.crossover), ("zone", w.zone), ("strength", w.strength)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(IndicatorError::InvalidParams(format!(
                        "weight {name}.{field} must be finite and >= 0, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Contributions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContributionKind {
    Crossover,
    Zone,
    Strength,
    Momentum,
}

impl std::fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Crossover => write!(f, "crossover"),
            Self::Zone => write!(f, "zone"),
            Self::Strength => write!(f, "strength"),
            Self::Momentum => write!(f, "momentum"),
        }
    }
}

/// The contribution of a single signal to the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalContribution {
    pub source: String,
    pub kind: ContributionKind,
    /// +1.0 for bullish, -1.0 for bearish.
    pub direction: f64,
    /// Weight after any regime scaling.
    pub weight: f64,
    pub contribution: f64,
}

/// Running bull/bear accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTally {
    pub bull: f64,
    pub bear: f64,
    pub contributions: Vec<SignalContribution>,
}

impl ScoreTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bullish(&mut self, source: &str, kind: ContributionKind, weight: f64) {
        self.record(source, kind, 1.0, weight);
    }

    pub fn bearish(&mut self, source: &str, kind: ContributionKind, weight: f64) {
        self.record(source, kind, -1.0, weight);
    }

    pub fn net(&self) -> f64 {
        self.bull - self.bear
    }

    fn record(&mut self, source: &str, kind: ContributionKind, direction: f64, weight: f64) {
        if weight == 0.0 {
            return;
        }
        if direction > 0.0 {
            self.bull += weight;
        } else {
            self.bear += weight;
        }
        self.contributions.push(SignalContribution {
            source: source.to_string(),
            kind,
            direction,
            weight,
            contribution: direction * weight,
        });
    }
}

/// Result of one confluence scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceScore {
    pub bull: f64,
    pub bear: f64,
    pub net: f64,
    pub label: SignalLabel,
    pub regime: RegimeSnapshot,
    pub contributions: Vec<SignalContribution>,
}

impl ConfluenceScore {
    pub fn from_tally(tally: ScoreTally, regime: RegimeSnapshot) -> Self {
        let net = tally.net();
        Self {
            bull: tally.bull,
            bear: tally.bear,
            net,
            label: regime.thresholds.classify(net),
            regime,
            contributions: tally.contributions,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        let table = WeightTable::default();
        table.validate().unwrap();
        assert_eq!(table.len(), 8);
        assert_eq!(table.get("atr"), ProviderWeights::ZERO);
        assert!((table.get("macd").crossover - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_provider_gets_unit_weights() {
        assert_eq!(WeightTable::empty().get("custom"), ProviderWeights::default());
    }

    #[test]
    fn negative_weight_rejected() {
        let mut table = WeightTable::default();
        table.set("rsi", ProviderWeights::new(-1.0, 0.0, 0.0));
        assert!(matches!(table.validate(), Err(IndicatorError::InvalidParams(_))));
    }

    #[test]
    fn tally_skips_zero_weights() {
        let mut tally = ScoreTally::new();
        tally.bullish("rsi", ContributionKind::Crossover, 1.0);
        tally.bearish("macd", ContributionKind::Strength, 0.5);
        tally.bullish("atr", ContributionKind::Zone, 0.0);
        assert!((tally.net() - 0.5).abs() < 1e-10);
        assert_eq!(tally.contributions.len(), 2);
        assert!((tally.contributions[1].contribution + 0.5).abs() < 1e-10);
    }

    #[test]
    fn table_serialises_as_plain_map() {
        let mut table = WeightTable::empty();
        table.set("rsi", ProviderWeights::new(1.0, 2.0, 0.0));
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.starts_with("{\"rsi\":"));
        let back: WeightTable = serde_json::from_str(r#"{ "rsi": { "zone": 2.0 } }"#).unwrap();
        assert!((back.get("rsi").zone - 2.0).abs() < f64::EPSILON);
        // Missing fields take the unit default.
        assert!((back.get("rsi").crossover - 1.0).abs() < f64::EPSILON);
    }
}
