// =============================================================================
// Aurora Confluence — bar replay
// =============================================================================
//
//   aurora-confluence <bars.json> [config.json]
//
// Feeds a JSON array of bars ({"high", "low", "close", "volume"}) through the
// default confluence engine and logs the label for every bar once the engine
// is warm. Rejected bars are logged and skipped; the engine is unchanged by
// them. Log level comes from RUST_LOG (default "info"), optionally via .env.
// =============================================================================

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use aurora_confluence::{ConfluenceEngine, EngineConfig, PriceBar, SignalLabel};

fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(bars_path) = args.next().map(PathBuf::from) else {
        bail!("usage: aurora-confluence <bars.json> [config.json]");
    };

    // ── 2. Config ────────────────────────────────────────────────────────
    let config = match args.next() {
        Some(path) => EngineConfig::load(&path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    };

    // ── 3. Bars ──────────────────────────────────────────────────────────
    let content = std::fs::read_to_string(&bars_path)
        .with_context(|| format!("failed to read bars from {}", bars_path.display()))?;
    let bars: Vec<PriceBar> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse bars from {}", bars_path.display()))?;
    info!(path = %bars_path.display(), bars = bars.len(), "bars loaded");

    // ── 4. Replay ────────────────────────────────────────────────────────
    let mut engine = ConfluenceEngine::with_default_providers(&config)
        .context("failed to build confluence engine")?;
    info!(providers = ?engine.provider_names(), "engine ready");

    let mut rejected = 0usize;
    let mut labelled = 0usize;
    let mut counts: HashMap<SignalLabel, usize> = HashMap::new();
    let mut last_label = None;

    for (idx, bar) in bars.iter().enumerate() {
        if let Err(e) = engine.add(bar) {
            warn!(bar = idx, error = %e, "bar skipped");
            rejected += 1;
            continue;
        }
        match engine.score() {
            Ok(score) => {
                labelled += 1;
                *counts.entry(score.label).or_default() += 1;
                if last_label != Some(score.label) {
                    info!(
                        bar = idx,
                        close = bar.close,
                        net = format!("{:.2}", score.net),
                        regime = %score.regime.regime,
                        label = %score.label,
                        "signal"
                    );
                }
                last_label = Some(score.label);
            }
            Err(e) if e.is_not_ready() => debug!(bar = idx, error = %e, "warming up"),
            Err(e) => warn!(bar = idx, error = %e, "score unavailable"),
        }
    }

    // ── 5. Summary ───────────────────────────────────────────────────────
    info!(
        accepted = engine.bars_seen(),
        rejected,
        labelled,
        breakdown = ?counts,
        "replay finished"
    );
    match last_label {
        Some(label) => println!(
            "{} bars, {} rejected, final signal: {}",
            bars.len(),
            rejected,
            label
        ),
        None => println!(
            "{} bars, {} rejected, engine never warmed up",
            bars.len(),
            rejected
        ),
    }
    Ok(())
}
