//! CLI-level errors (wraps infrastructure and application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    fn application(&self) -> Option<&ApplicationError> {
        match self {
            CliError::Application(e) | CliError::Infra(InfraError::Application(e)) => Some(e),
            _ => None,
        }
    }

    /// Missing `--apikey`/`--out`: reported on stdout like regular output.
    pub fn is_precondition(&self) -> bool {
        self.application()
            .is_some_and(ApplicationError::is_precondition)
    }

    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        if let Some(e) = self.application() {
            return match e {
                ApplicationError::Domain(_) => exitcode::FAILURE,
                ApplicationError::Config { .. } => exitcode::CONFIG,
                ApplicationError::Output { .. } => exitcode::IOERR,
                ApplicationError::OperationFailed { .. } => exitcode::SOFTWARE,
            };
        }
        match self {
            CliError::InvalidArgs(_) => exitcode::USAGE,
            CliError::Infra(InfraError::Io { .. }) => exitcode::IOERR,
            _ => exitcode::SOFTWARE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn given_missing_key_then_precondition_with_exit_one() {
        let err = CliError::from(ApplicationError::from(DomainError::MissingApiKey));
        assert!(err.is_precondition());
        assert_eq!(err.exit_code(), exitcode::FAILURE);
        assert_eq!(err.to_string(), "Must set --apikey first");
    }

    #[test]
    fn given_wrapped_missing_out_then_precondition() {
        let err = CliError::from(InfraError::from(ApplicationError::from(
            DomainError::MissingOutputPath,
        )));
        assert!(err.is_precondition());
        assert_eq!(err.exit_code(), exitcode::FAILURE);
    }

    #[test]
    fn given_any_domain_error_then_exit_one() {
        let err = CliError::from(ApplicationError::from(DomainError::InvalidResponse(
            "truncated".into(),
        )));
        assert!(!err.is_precondition());
        assert_eq!(err.exit_code(), exitcode::FAILURE);
    }

    #[test]
    fn given_other_errors_then_sysexits_codes() {
        let config = CliError::from(ApplicationError::Config {
            message: "bad".into(),
        });
        assert!(!config.is_precondition());
        assert_eq!(config.exit_code(), exitcode::CONFIG);

        let output = CliError::from(ApplicationError::output(std::io::Error::other("closed")));
        assert_eq!(output.exit_code(), exitcode::IOERR);

        assert_eq!(
            CliError::InvalidArgs("x".into()).exit_code(),
            exitcode::USAGE
        );
        assert_eq!(
            CliError::from(InfraError::InvalidJson("x".into())).exit_code(),
            exitcode::SOFTWARE
        );
    }
}
