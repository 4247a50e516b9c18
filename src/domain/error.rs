//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violated preconditions and malformed data.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Must set --apikey first")]
    MissingApiKey,

    #[error("Must set --out first")]
    MissingOutputPath,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
