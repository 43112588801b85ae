//! Error types for configuration, resource validation and provisioning

use std::fmt;

/// Result type alias for remote provisioning operations
pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

/// Errors raised while assembling the process configuration
///
/// These are fatal at startup, before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set
    Missing(String),

    /// A value is present but cannot be used
    Invalid { key: String, message: String },

    /// A configuration or plan file could not be read or parsed
    File { path: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(var) => {
                write!(f, "environment variable '{var}' is not specified")
            }
            ConfigError::Invalid { key, message } => {
                write!(f, "invalid value for '{key}': {message}")
            }
            ConfigError::File { path, message } => {
                write!(f, "failed to load '{path}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A resource invariant violated at construction time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required string field is empty
    EmptyField(&'static str),

    /// A query target has no reference id
    InvalidTarget(String),

    /// An explicit identifier cannot be used as a path segment or label value
    InvalidUid(String),

    /// A duration is not of the form `<number><s|m|h|d>`
    InvalidDuration(String),

    /// Neither a folder uid nor a folder title was given
    MissingFolder,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "'{field}' must not be empty"),
            ValidationError::InvalidTarget(msg) => write!(f, "invalid query target: {msg}"),
            ValidationError::InvalidUid(uid) => write!(f, "invalid identifier '{uid}'"),
            ValidationError::InvalidDuration(value) => {
                write!(f, "invalid duration '{value}' (expected e.g. '5m')")
            }
            ValidationError::MissingFolder => write!(f, "either a folder uid or title is required"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors from calls against the remote platform
#[derive(Debug)]
pub enum ProvisioningError {
    /// The remote answered with a status the operation does not accept
    Rejected {
        action: String,
        status: u16,
        body: String,
    },

    /// The request could not complete within the retry budget
    Transient {
        action: String,
        attempts: usize,
        message: String,
    },

    /// The remote answered successfully but the body is not what was expected
    Decode { action: String, message: String },

    /// A resource built from remote data or a plan is invalid
    Validation(ValidationError),

    /// Some alert rules of a cascade could not be deleted
    PartialCascade { failed: Vec<(String, String)> },
}

impl ProvisioningError {
    /// Transient failures are the only ones worth retrying unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProvisioningError::Transient { .. })
    }
}

impl fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisioningError::Rejected {
                action,
                status,
                body,
            } => write!(f, "{action} failed with status {status}: {body}"),
            ProvisioningError::Transient {
                action,
                attempts,
                message,
            } => write!(f, "{action} failed after {attempts} attempt(s): {message}"),
            ProvisioningError::Decode { action, message } => {
                write!(f, "{action} returned an unexpected body: {message}")
            }
            ProvisioningError::Validation(err) => write!(f, "validation failed: {err}"),
            ProvisioningError::PartialCascade { failed } => {
                let uids = failed
                    .iter()
                    .map(|(uid, reason)| format!("{uid} ({reason})"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "failed to delete {} alert rule(s): {uids}", failed.len())
            }
        }
    }
}

impl std::error::Error for ProvisioningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProvisioningError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ProvisioningError {
    fn from(err: ValidationError) -> Self {
        ProvisioningError::Validation(err)
    }
}
