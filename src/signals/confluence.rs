// =============================================================================
// Confluence Engine — regime-aware fusion of many signal providers
// =============================================================================
//
// Per bar (`add`, exclusive access):
//   1. Validate the bar; price-ratio maths needs close > 0.
//   2. Ask every provider whether it accepts the bar. Any refusal rejects the
//      bar before a single provider has been touched.
//   3. Forward the bar to every provider, snapshotting each one first. If an
//      `add` fails anyway, every provider touched so far is restored.
//   4. Remember the close for momentum confirmation.
//   5. Invalidate the cached regime snapshot and score.
//
// Per query (`score` / `combined_signal`, shared access, lazy):
//   regime  ← ATR and Bollinger readings published by the providers
//   for each provider, with its weights w and scale s (trend_scale for
//   trend-following providers during chop, 1 otherwise):
//     bullish crossover   → bull += w.crossover · s   (bearish → bear)
//     oversold zone       → bull += w.zone            (overbought → bear)
//     trend bias up       → bull += w.strength · s    (down → bear)
//   momentum bonus when the last three closes move strictly one way and the
//   net score already agrees with that direction
//   label   ← net = bull − bear against the volatility-shifted thresholds
//
// Provider query errors propagate verbatim and are never cached. Weights of
// zero skip the corresponding query entirely.
// =============================================================================

use std::collections::HashSet;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::config::{ConfluenceConfig, EngineConfig};
use crate::error::{IndicatorError, Result};
use crate::indicators::{Admo, Atr, Atso, Bollinger, Macd, Rsi, Stochastic, Vwap};
use crate::regime::detector::{RegimeDetector, RegimeSnapshot};
use crate::series::BoundedSeries;
use crate::signals::provider::{RegimeInput, SignalProvider, SignalRole};
use crate::signals::weighted_score::{ConfluenceScore, ContributionKind, ProviderWeights, ScoreTally};
use crate::types::{PriceBar, SignalLabel, TrendBias, Zone};

/// Closes kept for momentum confirmation.
const MOMENTUM_BARS: usize = 3;

struct RegisteredProvider {
    provider: Box<dyn SignalProvider>,
    weights: ProviderWeights,
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("name", &self.provider.name())
            .field("role", &self.provider.role())
            .field("weights", &self.weights)
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`ConfluenceEngine`] from arbitrary providers.
#[derive(Debug)]
pub struct ConfluenceEngineBuilder {
    config: ConfluenceConfig,
    providers: Vec<RegisteredProvider>,
}

impl ConfluenceEngineBuilder {
    /// Register a provider with the weights listed for its name in the
    /// config's weight table.
    pub fn provider(mut self, provider: impl SignalProvider + 'static) -> Self {
        let weights = self.config.weights.get(provider.name());
        self.providers.push(RegisteredProvider {
            provider: Box::new(provider),
            weights,
        });
        self
    }

    /// Register a provider with explicit weights.
    pub fn provider_with_weights(
        mut self,
        provider: impl SignalProvider + 'static,
        weights: ProviderWeights,
    ) -> Self {
        self.providers.push(RegisteredProvider {
            provider: Box::new(provider),
            weights,
        });
        self
    }

    pub fn build(self) -> Result<ConfluenceEngine> {
        self.config.validate()?;
        if self.providers.is_empty() {
            return Err(IndicatorError::InvalidParams(
                "confluence engine needs at least one provider".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for entry in &self.providers {
            let name = entry.provider.name();
            if !seen.insert(name.to_string()) {
                return Err(IndicatorError::InvalidParams(format!(
                    "provider {name} registered twice"
                )));
            }
            let w = entry.weights;
            if [w.crossover, w.zone, w.strength]
                .iter()
                .any(|v| !v.is_finite() || *v < 0.0)
            {
                return Err(IndicatorError::InvalidParams(format!(
                    "weights for {name} must be finite and >= 0"
                )));
            }
        }

        debug!(
            providers = self.providers.len(),
            names = ?self.providers.iter().map(|p| p.provider.name()).collect::<Vec<_>>(),
            "confluence engine built"
        );

        Ok(ConfluenceEngine {
            detector: RegimeDetector::new(self.config.clone()),
            config: self.config,
            providers: self.providers,
            closes: BoundedSeries::new(MOMENTUM_BARS),
            score_cache: RwLock::new(None),
            bars_seen: 0,
        })
    }
}

// =============================================================================
// ConfluenceEngine
// =============================================================================

/// Fuses the signals of a fixed provider set into one label per bar.
///
/// `add` takes `&mut self`; every query takes `&self` and may run
/// concurrently with other queries. Wrap the engine in
/// [`crate::shared::Shared`] to share it between threads.
#[derive(Debug)]
pub struct ConfluenceEngine {
    config: ConfluenceConfig,
    providers: Vec<RegisteredProvider>,
    detector: RegimeDetector,
    closes: BoundedSeries<f64>,
    score_cache: RwLock<Option<ConfluenceScore>>,
    bars_seen: usize,
}

impl ConfluenceEngine {
    pub fn builder(config: ConfluenceConfig) -> ConfluenceEngineBuilder {
        ConfluenceEngineBuilder {
            config,
            providers: Vec::new(),
        }
    }

    /// RSI, MACD, Stochastic, Bollinger, ATR, ADMO and ATSO, plus VWAP when
    /// configured.
    pub fn with_default_providers(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::builder(config.confluence.clone())
            .provider(Rsi::new(config.rsi.clone())?)
            .provider(Macd::new(config.macd.clone())?)
            .provider(Stochastic::new(config.stochastic.clone())?)
            .provider(Bollinger::new(config.bollinger.clone())?)
            .provider(Atr::new(config.atr.clone())?)
            .provider(Admo::new(config.admo.clone())?)
            .provider(Atso::new(config.atso.clone())?);
        if let Some(vwap) = &config.vwap {
            builder = builder.provider(Vwap::new(vwap.clone())?);
        }
        builder.build()
    }

    pub fn config(&self) -> &ConfluenceConfig {
        &self.config
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider.name()).collect()
    }

    /// Bars accepted since construction or the last reset.
    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    /// Ingest one bar into every provider, or into none of them.
    pub fn add(&mut self, bar: &PriceBar) -> Result<()> {
        if let Err(e) = bar.validate_positive_close() {
            warn!(error = %e, "confluence engine rejected bar");
            return Err(e);
        }
        for entry in &self.providers {
            if let Err(e) = entry.provider.validate(bar) {
                warn!(provider = entry.provider.name(), error = %e, "provider rejected bar");
                return Err(e);
            }
        }

        let mut snapshots = Vec::with_capacity(self.providers.len());
        for idx in 0..self.providers.len() {
            snapshots.push(self.providers[idx].provider.snapshot());
            if let Err(e) = self.providers[idx].provider.add(bar) {
                warn!(
                    provider = self.providers[idx].provider.name(),
                    error = %e,
                    restored = snapshots.len(),
                    "provider failed after accepting bar; rolling back"
                );
                for (entry, snapshot) in self.providers.iter_mut().zip(snapshots) {
                    entry.provider = snapshot;
                }
                return Err(e);
            }
        }

        self.closes.push(bar.close);
        self.bars_seen += 1;
        self.detector.invalidate();
        *self.score_cache.get_mut() = None;
        trace!(bars = self.bars_seen, close = bar.close, "confluence bar ingested");
        Ok(())
    }

    /// Regime classification of the newest bar.
    pub fn regime(&self) -> Result<RegimeSnapshot> {
        let close = *self
            .closes
            .last()
            .ok_or_else(|| IndicatorError::not_ready(1, 0))?;
        let inputs: Vec<RegimeInput> = self
            .providers
            .iter()
            .filter_map(|p| p.provider.regime_input())
            .collect();
        self.detector.detect(close, &inputs)
    }

    /// Full score breakdown for the newest bar.
    pub fn score(&self) -> Result<ConfluenceScore> {
        if let Some(cached) = self.score_cache.read().as_ref() {
            return Ok(cached.clone());
        }

        let regime = self.regime()?;
        let mut tally = ScoreTally::new();
        for entry in &self.providers {
            score_provider(entry, &regime, &mut tally)?;
        }
        self.apply_momentum(&mut tally);

        let score = ConfluenceScore::from_tally(tally, regime);
        debug!(
            bull = format!("{:.2}", score.bull),
            bear = format!("{:.2}", score.bear),
            net = format!("{:.2}", score.net),
            regime = %score.regime.regime,
            label = %score.label,
            "Confluence scored"
        );

        *self.score_cache.write() = Some(score.clone());
        Ok(score)
    }

    /// Discrete bias label for the newest bar.
    pub fn combined_signal(&self) -> Result<SignalLabel> {
        self.score().map(|s| s.label)
    }

    /// Clear every provider and cache; configuration is kept.
    pub fn reset(&mut self) {
        for entry in &mut self.providers {
            entry.provider.reset();
        }
        self.closes.reset();
        self.detector.invalidate();
        *self.score_cache.get_mut() = None;
        self.bars_seen = 0;
    }

    fn apply_momentum(&self, tally: &mut ScoreTally) {
        if self.closes.len() < MOMENTUM_BARS || self.config.momentum_bonus == 0.0 {
            return;
        }
        let c = self.closes.tail(MOMENTUM_BARS);
        let rising = c[0] < c[1] && c[1] < c[2];
        let falling = c[0] > c[1] && c[1] > c[2];
        let net = tally.net();
        if rising && net > 0.0 {
            tally.bullish("momentum", ContributionKind::Momentum, self.config.momentum_bonus);
        } else if falling && net < 0.0 {
            tally.bearish("momentum", ContributionKind::Momentum, self.config.momentum_bonus);
        }
    }
}

fn score_provider(entry: &RegisteredProvider, regime: &RegimeSnapshot, tally: &mut ScoreTally) -> Result<()> {
    let provider = entry.provider.as_ref();
    let w = entry.weights;
    let name = provider.name();
    let scale = match provider.role() {
        SignalRole::Trend => regime.trend_scale,
        SignalRole::Oscillator | SignalRole::Volatility => 1.0,
    };

    if w.crossover > 0.0 {
        if provider.is_bullish_crossover()? {
            tally.bullish(name, ContributionKind::Crossover, w.crossover * scale);
        } else if provider.is_bearish_crossover()? {
            tally.bearish(name, ContributionKind::Crossover, w.crossover * scale);
        }
    }

    if w.zone > 0.0 {
        match provider.zone() {
            Zone::Oversold => tally.bullish(name, ContributionKind::Zone, w.zone),
            Zone::Overbought => tally.bearish(name, ContributionKind::Zone, w.zone),
            Zone::Neutral => {}
        }
    }

    if w.strength > 0.0 {
        match provider.trend_bias()? {
            TrendBias::Up => tally.bullish(name, ContributionKind::Strength, w.strength * scale),
            TrendBias::Down => tally.bearish(name, ContributionKind::Strength, w.strength * scale),
            TrendBias::Flat => {}
        }
    }
    Ok(())
}
