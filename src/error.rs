use thiserror::Error;

/// Failure modes of the upstream feature service.
///
/// The batch layer keys its retry policy off this classification: `NotFound`
/// is permanent, everything else is worth another attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Symbol unknown to the provider (typo, delisting). Never retried.
    #[error("symbol not found: {0}")]
    NotFound(String),

    /// Provider is rate limiting us.
    #[error("throttled by feature provider")]
    Throttled,

    /// Network trouble, server errors, timeouts.
    #[error("transient fetch failure: {0}")]
    Transient(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Throttled | FetchError::Transient(_))
    }
}

/// Why a single strategy could not score a snapshot.
///
/// These never abort sibling strategies; the engine records them on the
/// outcome and moves on.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("missing feature `{0}`")]
    MissingFeature(String),

    #[error("feature `{0}` has unusable value {1}")]
    BadValue(String, f64),
}

/// Top-level evaluation failure for one symbol.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Every selected strategy failed, so there is nothing to aggregate.
    /// Terminal for the symbol; retrying would hit the same wall.
    #[error("no strategy produced a usable score for {symbol}")]
    AllStrategiesFailed { symbol: String },

    #[error("unknown strategy id: {0}")]
    UnknownStrategy(String),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Fetch(e) => e.is_retryable(),
            EngineError::AllStrategiesFailed { .. } | EngineError::UnknownStrategy(_) => false,
        }
    }

    /// Operator-friendly one-liner for batch reports and CLI output.
    pub fn friendly(&self) -> String {
        match self {
            EngineError::Fetch(FetchError::NotFound(symbol)) => {
                format!("{symbol}: symbol not found or delisted")
            }
            EngineError::Fetch(FetchError::Throttled) => {
                "rate limited by data provider".to_string()
            }
            EngineError::Fetch(FetchError::Transient(reason)) => {
                format!("network or provider problem: {reason}")
            }
            EngineError::AllStrategiesFailed { .. } => {
                "no strategy could score this symbol".to_string()
            }
            EngineError::UnknownStrategy(id) => format!("unknown strategy `{id}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_classification() {
        assert!(!FetchError::NotFound("FAKE".to_string()).is_retryable());
        assert!(FetchError::Throttled.is_retryable());
        assert!(FetchError::Transient("connection reset".to_string()).is_retryable());
    }

    #[test]
    fn test_engine_error_classification() {
        let err = EngineError::from(FetchError::Throttled);
        assert!(err.is_retryable());

        let err = EngineError::AllStrategiesFailed {
            symbol: "AAPL".to_string(),
        };
        assert!(!err.is_retryable());

        let err = EngineError::UnknownStrategy("momentum".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_friendly_text_mentions_symbol_for_not_found() {
        let err = EngineError::from(FetchError::NotFound("FAKE".to_string()));
        assert!(err.friendly().contains("FAKE"));
        assert!(err.friendly().contains("not found"));
    }
}
