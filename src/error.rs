//! Error types for the merge pipeline, delivery and retention sweep.

use crate::domain::request::ValidationError;
use crate::domain::tiers::DeliveryStrategy;
use std::fmt;
use thiserror::Error;

/// Failure to download one source URL.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("failed to write {url} to disk: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Encoder subprocess failure during resize/compress. Never leaves the
/// planner: it degrades to delivering the previous artifact.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("encoder exited with {code:?}: {stderr}")]
    Encoder { code: Option<i32>, stderr: String },
    #[error("encoder could not be started: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("could not determine duration of {0}")]
    UnknownDuration(String),
    #[error("encoder reported success but wrote no output")]
    MissingOutput,
}

/// Closed classification of upload failures produced by storage adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryErrorKind {
    /// The artifact exceeds a limit of the chosen upload operation.
    SizeExceeded,
    /// The operation requires asynchronous processing for this artifact.
    SyncNotSupported,
    AuthFailure,
    Rejected,
    Transport,
    Io,
}

impl DeliveryErrorKind {
    /// Whether a fallback strategy may be attempted after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeliveryErrorKind::SizeExceeded | DeliveryErrorKind::SyncNotSupported
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct DeliveryFailure {
    pub kind: DeliveryErrorKind,
    pub message: String,
}

impl DeliveryFailure {
    pub fn new(kind: DeliveryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for DeliveryFailure {
    fn from(err: std::io::Error) -> Self {
        DeliveryFailure::new(DeliveryErrorKind::Io, err.to_string())
    }
}

/// One failed upload attempt in the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub strategy: DeliveryStrategy,
    pub failure: DeliveryFailure,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.failure)
    }
}

fn join_attempts(attempts: &[AttemptFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// A non-retryable failure stopped the chain.
    #[error("upload failed with {}", join_attempts(.attempts))]
    Fatal { attempts: Vec<AttemptFailure> },
    /// Every strategy in the chain failed.
    #[error("all upload strategies failed: {}", join_attempts(.attempts))]
    Exhausted { attempts: Vec<AttemptFailure> },
}

impl DeliveryError {
    pub fn attempts(&self) -> &[AttemptFailure] {
        match self {
            DeliveryError::Fatal { attempts } | DeliveryError::Exhausted { attempts } => attempts,
        }
    }
}

/// Failure of a whole merge request.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to download source: {0}")]
    Fetch(#[from] FetchError),
    #[error("concatenation failed (exit code {code:?}): {message}")]
    Concatenation { code: Option<i32>, message: String },
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("{0}")]
    Configuration(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Short category used as the `error` field of failure responses.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "Validation error",
            PipelineError::Fetch(_) => "Download failed",
            PipelineError::Concatenation { .. } => "Merge failed",
            PipelineError::Delivery(_) => "Upload failed",
            PipelineError::Configuration(_) => "Configuration error",
            PipelineError::Io(_) => "Internal error",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }
}

/// Failure to delete one expired artifact during a sweep.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to delete {public_id}: {message}")]
pub struct SweepItemError {
    pub public_id: String,
    pub message: String,
}
