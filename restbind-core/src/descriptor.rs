use crate::model::Payload;
use crate::template::{HeaderTemplate, Template};
use crate::{ConfigError, Method, Transport};
use serde::{Deserialize, Serialize};

/// Immutable declaration of one network operation.
///
/// Built once, validated once, then shared by every invocation. Template
/// syntax and the method/transport rules are checked by [`build`], so an
/// `EndpointDescriptor` that exists is always legal.
///
/// [`build`]: DescriptorBuilder::build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    name: String,
    url: Template,
    headers: Vec<HeaderTemplate>,
    jsonp: Option<String>,
    payload: Option<String>,
    method: Method,
    on_error: Option<String>,
    transport: Transport,
    parameters: Vec<String>,
}

impl EndpointDescriptor {
    pub fn builder(name: impl Into<String>, url: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            name: name.into(),
            url: url.into(),
            headers: Vec::new(),
            jsonp: None,
            payload: None,
            method: Method::Get,
            on_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Template {
        &self.url
    }

    pub fn headers(&self) -> &[HeaderTemplate] {
        &self.headers
    }

    pub fn jsonp(&self) -> Option<&str> {
        self.jsonp.as_deref()
    }

    pub fn payload_type(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn on_error(&self) -> Option<&str> {
        self.on_error.as_deref()
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Caller-supplied parameters in call order: distinct URL placeholders,
    /// then distinct header placeholders. The JSONP parameter is filled in by
    /// the engine and never appears here.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    name: String,
    url: String,
    headers: Vec<String>,
    jsonp: Option<String>,
    payload: Option<String>,
    method: Method,
    on_error: Option<String>,
}

impl DescriptorBuilder {
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(line.into());
        self
    }

    /// Enable JSONP; an empty name leaves it disabled.
    pub fn jsonp(mut self, param: impl Into<String>) -> Self {
        self.jsonp = Some(param.into()).filter(|p| !p.is_empty());
        self
    }

    pub fn payload<P: Payload>(mut self) -> Self {
        self.payload = P::type_name().map(str::to_string);
        self
    }

    pub fn payload_type(mut self, name: impl Into<String>) -> Self {
        self.payload = Some(name.into()).filter(|p| !p.is_empty());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn on_error(mut self, operation: impl Into<String>) -> Self {
        self.on_error = Some(operation.into()).filter(|p| !p.is_empty());
        self
    }

    pub fn build(self) -> Result<EndpointDescriptor, ConfigError> {
        let url = Template::parse(&self.url)?;
        let headers = self
            .headers
            .iter()
            .map(|line| HeaderTemplate::parse(line))
            .collect::<Result<Vec<_>, _>>()?;

        let transport = Transport::select(
            self.method,
            self.jsonp.as_deref(),
            self.payload.is_some(),
            self.headers.first().map(String::as_str),
        )?;

        let mut parameters: Vec<String> = Vec::new();
        let declared = url
            .placeholders()
            .chain(headers.iter().flat_map(|h| h.placeholders()));
        for name in declared {
            if Some(name) == self.jsonp.as_deref() {
                continue;
            }
            if !parameters.iter().any(|p| p == name) {
                parameters.push(name.to_string());
            }
        }

        tracing::debug!(
            endpoint = %self.name,
            %transport,
            parameters = ?parameters,
            "endpoint declared"
        );

        Ok(EndpointDescriptor {
            name: self.name,
            url,
            headers,
            jsonp: self.jsonp,
            payload: self.payload,
            method: self.method,
            on_error: self.on_error,
            transport,
            parameters,
        })
    }
}

/// Serde form of an endpoint declaration, for descriptors kept in
/// configuration files rather than code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    pub headers: Vec<String>,
    pub jsonp: String,
    /// Name of the payload model type.
    pub data: String,
    pub method: Method,
    pub on_error: String,
}

impl TryFrom<EndpointConfig> for EndpointDescriptor {
    type Error = ConfigError;

    fn try_from(config: EndpointConfig) -> Result<Self, Self::Error> {
        config
            .headers
            .into_iter()
            .fold(
                EndpointDescriptor::builder(config.name, config.url),
                |builder, line| builder.header(line),
            )
            .jsonp(config.jsonp)
            .payload_type(config.data)
            .method(config.method)
            .on_error(config.on_error)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpVerb;

    #[test]
    fn test_get_descriptor() {
        let d = EndpointDescriptor::builder("getANewPerson", "{protocol}://h/person/{name}")
            .build()
            .unwrap();
        assert_eq!(d.transport(), Transport::Http(HttpVerb::Get));
        assert_eq!(d.parameters(), &["protocol".to_string(), "name".to_string()]);
        assert_eq!(d.jsonp(), None);
        assert_eq!(d.on_error(), None);
    }

    #[test]
    fn test_parameters_are_distinct_url_then_headers() {
        let d = EndpointDescriptor::builder("op", "http://h/{a}/{b}/{a}")
            .header("X-B: {b}")
            .header("X-C: {c}-{a}")
            .build()
            .unwrap();
        assert_eq!(
            d.parameters(),
            &["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(d.headers().len(), 2);
    }

    #[test]
    fn test_jsonp_parameter_is_not_a_call_parameter() {
        let d = EndpointDescriptor::builder("op", "http://h/{id}?callback={cb}")
            .jsonp("cb")
            .build()
            .unwrap();
        assert_eq!(d.transport(), Transport::Jsonp);
        assert_eq!(d.parameters(), &["id".to_string()]);
    }

    #[test]
    fn test_empty_strings_disable_options() {
        let d = EndpointDescriptor::builder("op", "http://h/")
            .jsonp("")
            .on_error("")
            .build()
            .unwrap();
        assert_eq!(d.transport(), Transport::Http(HttpVerb::Get));
        assert_eq!(d.on_error(), None);
    }

    #[test]
    fn test_post_without_payload_is_rejected() {
        let err = EndpointDescriptor::builder("op", "http://h/")
            .method(Method::Post)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::PayloadRequired(_)));
    }

    #[test]
    fn test_jsonp_with_post_is_rejected() {
        let err = EndpointDescriptor::builder("op", "http://h/")
            .jsonp("cb")
            .payload_type("Person")
            .method(Method::Post)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::JsonpRequiresGet(_)));
    }

    #[test]
    fn test_websocket_with_headers_is_rejected() {
        let err = EndpointDescriptor::builder("op", "ws://h/")
            .header("X-Token: {t}")
            .method(Method::WebSocket)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedHeaderForTransport { .. }
        ));
    }

    #[test]
    fn test_malformed_url_is_rejected() {
        let err = EndpointDescriptor::builder("op", "http://h/{id")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedTemplate { .. }));
    }

    #[test]
    fn test_from_config() {
        let config: EndpointConfig = serde_json::from_value(serde_json::json!({
            "name": "addPerson",
            "url": "http://h/people",
            "headers": ["X-Request: {req}"],
            "data": "Person",
            "method": "PUT",
            "onError": "cannotConnect"
        }))
        .unwrap();
        let d = EndpointDescriptor::try_from(config).unwrap();
        assert_eq!(d.name(), "addPerson");
        assert_eq!(d.transport(), Transport::Http(HttpVerb::Put));
        assert_eq!(d.payload_type(), Some("Person"));
        assert_eq!(d.on_error(), Some("cannotConnect"));
        assert_eq!(d.parameters(), &["req".to_string()]);
    }

    #[test]
    fn test_config_defaults_to_get() {
        let config: EndpointConfig =
            serde_json::from_str(r#"{"url": "http://h/{x}"}"#).unwrap();
        assert_eq!(config.method, Method::Get);
        let d = EndpointDescriptor::try_from(config).unwrap();
        assert_eq!(d.transport(), Transport::Http(HttpVerb::Get));
    }
}
