use thiserror::Error;

/// Failures the automaton can surface. A missing element is never an error:
/// strategies report it as "did not act" so callers can compose booleans
/// without null checks.
#[derive(Debug, Error)]
pub enum AutomatonError {
    /// A date or time window whose end precedes its start. Bounds are never
    /// silently swapped.
    #[error("fenetre invalide: {end} precede {start}")]
    InvalidWindow { start: String, end: String },

    /// The harness's page-load/ready wait ran out of budget.
    #[error("navigation expiree: {0}")]
    NavigationTimeout(String),

    /// Anything unexpected while manipulating the page. Caught at the loop
    /// boundary and converted to a `Failed` outcome, never re-raised.
    #[error("erreur d'execution: {0}")]
    Runtime(String),
}

impl From<anyhow::Error> for AutomatonError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(format!("{err:#}"))
    }
}
