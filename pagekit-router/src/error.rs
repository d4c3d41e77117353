use thiserror::Error;

/// Errors raised while building a router.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A route pattern is not a valid regular expression.
    #[error("invalid route pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    /// Router configuration could not be parsed.
    #[error("invalid router configuration: {0}")]
    Config(String),
}
