use async_trait::async_trait;
use restbind_core::{Failure, HttpVerb};
use thiserror::Error;

/// Content type sent with JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("JSONP error: {0}")]
    Jsonp(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        match err.status() {
            Some(status) => Failure::with_status(
                restbind_core::FailureKind::Transport,
                err.to_string(),
                status,
            ),
            None => Failure::transport(err.to_string()),
        }
    }
}

/// A fully rendered HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub verb: HttpVerb,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(verb: HttpVerb, url: impl Into<String>) -> Self {
        HttpRequest {
            verb,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body of a 2xx response; any other status is a transport failure.
    pub fn into_success(self) -> Result<String, TransportError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(TransportError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Capability to perform one HTTP exchange.
#[async_trait]
pub trait HttpExchange: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
