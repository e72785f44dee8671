use crate::config::ClientConfig;
use crate::endpoint::EndpointBuilder;
use crate::router::{DiagnosticSink, TracingSink};
use anyhow::{Context, Result};
use reqwest::header::{HeaderName, HeaderValue};
use restbind_core::{CallIdAllocator, ConfigError, EndpointDescriptor, Model, Payload, Receive};
use restbind_transport::{HttpExchange, JsonpRegistry, ReqwestExchange};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

/// Entry point: owns the network capability, the runtime that invocations
/// are spawned on, and the state shared by every endpoint built from it.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) exchange: Arc<dyn HttpExchange>,
    pub(crate) runtime: Handle,
    pub(crate) sink: Arc<dyn DiagnosticSink>,
    pub(crate) ids: CallIdAllocator,
    pub(crate) jsonp: JsonpRegistry,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("next_call_id", &self.inner.ids.peek_next())
            .field("pending_jsonp", &self.inner.jsonp.pending())
            .finish()
    }
}

impl Client {
    /// Create a client backed by reqwest. Must be called from within a
    /// tokio runtime; invocations are spawned on that runtime.
    pub fn new(config: ClientConfig) -> Result<Self> {
        // Default headers are attached per request; reject bad ones up front.
        for (name, value) in &config.default_headers {
            HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid default header name '{}'", name))?;
            HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for default header '{}'", name))?;
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;
        debug!("Built HTTP client with {:?}", config);

        Ok(Self::with_exchange(
            config,
            Arc::new(ReqwestExchange::new(http_client)),
        )?)
    }

    /// Create a client over a caller-supplied HTTP capability.
    pub fn with_exchange(
        config: ClientConfig,
        exchange: Arc<dyn HttpExchange>,
    ) -> Result<Self, ConfigError> {
        let runtime = Handle::try_current().map_err(|e| ConfigError::NoRuntime(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                exchange,
                runtime,
                sink: Arc::new(TracingSink),
                ids: CallIdAllocator::new(),
                jsonp: JsonpRegistry::new(),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Number of JSONP calls still waiting for their script.
    pub fn pending_jsonp(&self) -> usize {
        self.inner.jsonp.pending()
    }

    /// Start building the operation for `descriptor`, binding responses
    /// onto `R` and sending payloads of type `P`.
    pub fn endpoint<M, R, P>(
        &self,
        descriptor: impl Into<Arc<EndpointDescriptor>>,
    ) -> EndpointBuilder<M, R, P>
    where
        M: Model,
        R: Receive,
        P: Payload,
    {
        EndpointBuilder::new(Arc::clone(&self.inner), descriptor.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_runtime() {
        let err = Client::new(ClientConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NoRuntime(_))
        ));
    }

    #[tokio::test]
    async fn test_new_inside_runtime() {
        let client = Client::new(ClientConfig::default()).unwrap();
        assert_eq!(client.config().timeout_ms, 30000);
        assert_eq!(client.pending_jsonp(), 0);
    }

    #[tokio::test]
    async fn test_invalid_default_header_is_rejected() {
        let mut config = ClientConfig::default();
        config
            .default_headers
            .insert("Bad Header".to_string(), "x".to_string());
        assert!(Client::new(config).is_err());
    }
}
