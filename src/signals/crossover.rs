// =============================================================================
// Signal Classification — crossovers, zones, divergence
// =============================================================================
//
// Crossover:  previous value at or below the level, current value strictly
//             above it (bullish), or the mirror image (bearish). Needs two
//             emitted values.
// Zone:       value > overbought → Overbought, value < oversold → Oversold.
// Divergence: latest close is the strict minimum of the last three closes
//             while the indicator rose (bullish), or the strict maximum while
//             it fell (bearish).

use crate::config::IndicatorConfig;
use crate::error::{IndicatorError, Result};
use crate::series::BoundedSeries;
use crate::types::{Divergence, Zone};

pub fn crossed_above(prev: f64, curr: f64, level: f64) -> bool {
    prev <= level && curr > level
}

pub fn crossed_below(prev: f64, curr: f64, level: f64) -> bool {
    prev >= level && curr < level
}

fn last_pair(values: &BoundedSeries<f64>) -> Result<(f64, f64)> {
    match (values.get_from_end(1), values.get_from_end(0)) {
        (Some(&prev), Some(&curr)) => Ok((prev, curr)),
        _ => Err(IndicatorError::not_ready(2, values.len())),
    }
}

/// Did the newest value cross above `level`?
pub fn bullish_crossover(values: &BoundedSeries<f64>, level: f64) -> Result<bool> {
    let (prev, curr) = last_pair(values)?;
    Ok(crossed_above(prev, curr, level))
}

/// Did the newest value cross below `level`?
pub fn bearish_crossover(values: &BoundedSeries<f64>, level: f64) -> Result<bool> {
    let (prev, curr) = last_pair(values)?;
    Ok(crossed_below(prev, curr, level))
}

pub fn classify_zone(value: f64, config: &IndicatorConfig) -> Zone {
    if value > config.overbought {
        Zone::Overbought
    } else if value < config.oversold {
        Zone::Oversold
    } else {
        Zone::Neutral
    }
}

/// Zone of the newest value, `Neutral` when nothing was emitted yet.
pub fn latest_zone(values: &BoundedSeries<f64>, config: &IndicatorConfig) -> Zone {
    values
        .last()
        .map(|&v| classify_zone(v, config))
        .unwrap_or_default()
}

/// Price/indicator divergence on the newest bar.
///
/// The indicator move must exceed `threshold` to count.
pub fn detect_divergence(
    closes: &BoundedSeries<f64>,
    values: &BoundedSeries<f64>,
    threshold: f64,
) -> Result<Divergence> {
    if closes.len() < 3 {
        return Err(IndicatorError::InsufficientData {
            needed: 3,
            available: closes.len(),
        });
    }
    if values.len() < 2 {
        return Err(IndicatorError::InsufficientData {
            needed: 2,
            available: values.len(),
        });
    }

    let c = closes.tail(3);
    let (prev, curr) = last_pair(values)?;
    let latest = c[2];

    if latest < c[0] && latest < c[1] && curr - prev > threshold {
        return Ok(Divergence::Bullish);
    }
    if latest > c[0] && latest > c[1] && prev - curr > threshold {
        return Ok(Divergence::Bearish);
    }
    Ok(Divergence::None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> BoundedSeries<f64> {
        let mut s = BoundedSeries::new(values.len().max(1));
        for &v in values {
            s.push(v);
        }
        s
    }

    #[test]
    fn crossover_needs_two_values() {
        let s = series(&[1.0]);
        assert_eq!(
            bullish_crossover(&s, 0.0).unwrap_err(),
            IndicatorError::NotReady { needed: 2, available: 1 }
        );
    }

    #[test]
    fn monotone_series_crosses_once() {
        let ramp: Vec<f64> = (-5..=5).map(|i| i as f64 * 0.5).collect();
        let mut window = BoundedSeries::new(2);
        let (mut bull, mut bear) = (0, 0);
        for v in ramp {
            window.push(v);
            if window.len() < 2 {
                continue;
            }
            if bullish_crossover(&window, 0.0).unwrap() {
                bull += 1;
            }
            if bearish_crossover(&window, 0.0).unwrap() {
                bear += 1;
            }
        }
        assert_eq!(bull, 1);
        assert_eq!(bear, 0);
    }

    #[test]
    fn threshold_crossings() {
        assert!(crossed_above(29.0, 31.0, 30.0));
        assert!(!crossed_above(31.0, 32.0, 30.0));
        assert!(crossed_below(71.0, 69.0, 70.0));
        assert!(!crossed_below(69.0, 68.0, 70.0));
    }

    #[test]
    fn zones() {
        let cfg = IndicatorConfig::default();
        assert_eq!(classify_zone(75.0, &cfg), Zone::Overbought);
        assert_eq!(classify_zone(25.0, &cfg), Zone::Oversold);
        assert_eq!(classify_zone(70.0, &cfg), Zone::Neutral);
        assert_eq!(latest_zone(&BoundedSeries::new(2), &cfg), Zone::Neutral);
    }

    #[test]
    fn bullish_divergence() {
        let closes = series(&[10.0, 9.5, 9.0]);
        let values = series(&[-1.0, -0.5]);
        assert_eq!(detect_divergence(&closes, &values, 0.0).unwrap(), Divergence::Bullish);
        // Move smaller than the threshold does not count.
        assert_eq!(detect_divergence(&closes, &values, 1.0).unwrap(), Divergence::None);
    }

    #[test]
    fn bearish_divergence() {
        let closes = series(&[9.0, 9.5, 10.0]);
        let values = series(&[1.0, 0.5]);
        assert_eq!(detect_divergence(&closes, &values, 0.0).unwrap(), Divergence::Bearish);
    }

    #[test]
    fn equal_close_is_not_strict_extreme() {
        let closes = series(&[9.0, 10.0, 9.0]);
        let values = series(&[-1.0, 0.0]);
        assert_eq!(detect_divergence(&closes, &values, 0.0).unwrap(), Divergence::None);
    }

    #[test]
    fn divergence_needs_history() {
        let closes = series(&[1.0, 2.0]);
        let values = series(&[1.0, 2.0]);
        assert_eq!(
            detect_divergence(&closes, &values, 0.0).unwrap_err(),
            IndicatorError::InsufficientData { needed: 3, available: 2 }
        );
        let closes = series(&[1.0, 2.0, 3.0]);
        let values = series(&[1.0]);
        assert!(matches!(
            detect_divergence(&closes, &values, 0.0),
            Err(IndicatorError::InsufficientData { needed: 2, .. })
        ));
    }
}
