use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors detected while building an endpoint. None of these require
/// network activity and none of them are recoverable at call time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("JSONP transport requires GET, found {0}")]
    JsonpRequiresGet(String),
    #[error("{0} requires a payload type")]
    PayloadRequired(String),
    #[error("{transport} does not support headers ({header})")]
    UnsupportedHeaderForTransport { transport: String, header: String },
    #[error("malformed template '{template}': {reason}")]
    MalformedTemplate { template: String, reason: String },
    #[error("malformed header '{line}': {reason}")]
    MalformedHeader { line: String, reason: String },
    #[error("error operation '{0}' has no registered handler")]
    UnknownErrorHandler(String),
    #[error("payload type mismatch: declared {declared:?}, bound {bound:?}")]
    PayloadTypeMismatch {
        declared: Option<String>,
        bound: Option<String>,
    },
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnresolvedPlaceholder,
    InvalidHeaderValue,
    Transport,
    ResponseShapeMismatch,
    TypeCoercion,
    MalformedResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::UnresolvedPlaceholder => "unresolved_placeholder",
            FailureKind::InvalidHeaderValue => "invalid_header_value",
            FailureKind::Transport => "transport",
            FailureKind::ResponseShapeMismatch => "response_shape_mismatch",
            FailureKind::TypeCoercion => "type_coercion",
            FailureKind::MalformedResponse => "malformed_response",
        };
        write!(f, "{}", s)
    }
}

/// Per-call failure descriptor handed to error operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Failure {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(kind: FailureKind, message: impl Into<String>, status: u16) -> Self {
        Failure {
            kind,
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ResponseShapeMismatch, message)
    }

    pub fn is_transport(&self) -> bool {
        self.kind == FailureKind::Transport
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({}): {}", self.kind, status, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for Failure {}
