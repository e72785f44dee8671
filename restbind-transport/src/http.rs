use crate::{HttpExchange, HttpRequest, HttpResponse, TransportError, JSON_CONTENT_TYPE};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Protocol(err.to_string())
        }
    }
}

/// [`HttpExchange`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestExchange {
    client: reqwest::Client,
}

impl ReqwestExchange {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpExchange for ReqwestExchange {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("Sending {} request to {}", request.verb, request.url);

        let mut builder = self
            .client
            .request(request.verb.to_http(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let has_content_type = request.has_header(CONTENT_TYPE.as_str());
        if let Some(body) = request.body {
            if !has_content_type {
                builder = builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE);
            }
            trace!("Request body:\n{}", body);
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!("Received status {} from {}", status, request.url);
        trace!("Response body:\n{}", body);
        Ok(HttpResponse { status, body })
    }
}
