//! Error taxonomy and the binary-facing `AppError`.
//!
//! Library modules return their own `thiserror` enums. Each of them classifies
//! itself with an [`ErrorKind`], which decides the exit code once the error
//! reaches the `fan` binary as an [`AppError`].

use crate::fit::FitError;
use crate::io::IngestError;
use crate::plot::PreviewError;
use crate::registry::RegistryError;
use crate::session::SessionError;
use crate::store::StoreError;

/// Coarse classification shared by all library errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad index, bad degree, unknown model: a caller bug.
    PreconditionViolation,
    /// Duplicate name, empty field, too few samples: shown to the user, nothing done.
    ValidationWarning,
    /// The fit produced no usable coefficients.
    IllConditioned,
    /// Storage, IO or rendering failure.
    Internal,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::PreconditionViolation => 2,
            ErrorKind::ValidationWarning => 3,
            ErrorKind::IllConditioned | ErrorKind::Internal => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind.exit_code(), message)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<PreviewError> for AppError {
    fn from(err: PreviewError) -> Self {
        Self::from_kind(ErrorKind::Internal, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_documented_exit_codes() {
        let err: AppError = FitError::InvalidDegree { degree: 9 }.into();
        assert_eq!(err.exit_code(), 2);

        let err: AppError = FitError::InsufficientSamples {
            distinct: 1,
            required: 2,
        }
        .into();
        assert_eq!(err.exit_code(), 3);

        let err: AppError = FitError::IllConditioned { degree: 7 }.into();
        assert_eq!(err.exit_code(), 4);
    }
}
