// =============================================================================
// Indicator Errors
// =============================================================================
//
// Every fallible operation in the library returns `Result<T, IndicatorError>`.
// Callers branch on the kind of failure (bad data, not enough data, bad
// parameters, degenerate math) and read the payload only for diagnostics.

use thiserror::Error;

/// Failure kinds surfaced by indicators, providers and the confluence engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    /// A bar (or a derived input) violated the data-model invariants.
    /// Always raised before any state is mutated.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Not enough buffered samples for the requested computation. Feeding
    /// more bars always resolves it.
    #[error("not ready: need {needed} samples, have {available}")]
    NotReady { needed: usize, available: usize },

    /// Divergence checks need a minimum number of closes and indicator values.
    #[error("insufficient data: need {needed}, have {available}")]
    InsufficientData { needed: usize, available: usize },

    /// Bad constructor or setter arguments.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// A normalisation divisor was zero. Never coerced into a placeholder.
    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),
}

impl IndicatorError {
    pub(crate) fn not_ready(needed: usize, available: usize) -> Self {
        Self::NotReady { needed, available }
    }

    /// True for the recoverable warm-up condition.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

pub type Result<T> = std::result::Result<T, IndicatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = IndicatorError::not_ready(14, 3);
        assert_eq!(err.to_string(), "not ready: need 14 samples, have 3");
        assert!(err.is_not_ready());

        let err = IndicatorError::DivisionByZero("trend strength average");
        assert_eq!(err.to_string(), "division by zero in trend strength average");
        assert!(!err.is_not_ready());
    }
}
