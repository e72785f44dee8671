use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Head,
    Delete,
    Post,
    Put,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Head => "HEAD",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
        }
    }

    /// POST and PUT carry the payload as the request body.
    pub fn requires_payload(&self) -> bool {
        matches!(self, HttpVerb::Post | HttpVerb::Put)
    }

    pub fn to_http(&self) -> http::Method {
        match self {
            HttpVerb::Get => http::Method::GET,
            HttpVerb::Head => http::Method::HEAD,
            HttpVerb::Delete => http::Method::DELETE,
            HttpVerb::Post => http::Method::POST,
            HttpVerb::Put => http::Method::PUT,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared method of an endpoint: an HTTP verb or the WebSocket sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Delete,
    Post,
    Put,
    WebSocket,
}

impl Method {
    pub fn verb(&self) -> Option<HttpVerb> {
        match self {
            Method::Get => Some(HttpVerb::Get),
            Method::Head => Some(HttpVerb::Head),
            Method::Delete => Some(HttpVerb::Delete),
            Method::Post => Some(HttpVerb::Post),
            Method::Put => Some(HttpVerb::Put),
            Method::WebSocket => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self.verb() {
            Some(verb) => verb.as_str(),
            None => "WEBSOCKET",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "DELETE" => Ok(Method::Delete),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "WEBSOCKET" => Ok(Method::WebSocket),
            _ => Err(ConfigError::UnknownMethod(s.to_string())),
        }
    }
}

impl Serialize for Method {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Wire protocol chosen once per endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Http(HttpVerb),
    Jsonp,
    WebSocket,
}

impl Transport {
    /// Pick and validate the transport for a declaration.
    pub fn select(
        method: Method,
        jsonp: Option<&str>,
        has_payload: bool,
        first_header: Option<&str>,
    ) -> Result<Transport, ConfigError> {
        match (method.verb(), jsonp) {
            (None, jsonp) => {
                if let Some(header) = first_header {
                    return Err(ConfigError::UnsupportedHeaderForTransport {
                        transport: method.to_string(),
                        header: header.to_string(),
                    });
                }
                if jsonp.is_some() {
                    return Err(ConfigError::JsonpRequiresGet(method.to_string()));
                }
                Ok(Transport::WebSocket)
            }
            (Some(HttpVerb::Get), Some(_)) => Ok(Transport::Jsonp),
            (Some(verb), Some(_)) => Err(ConfigError::JsonpRequiresGet(verb.to_string())),
            (Some(verb), None) => {
                if verb.requires_payload() && !has_payload {
                    return Err(ConfigError::PayloadRequired(verb.to_string()));
                }
                Ok(Transport::Http(verb))
            }
        }
    }

    pub fn is_websocket(&self) -> bool {
        matches!(self, Transport::WebSocket)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http(verb) => write!(f, "HTTP {}", verb),
            Transport::Jsonp => write!(f, "JSONP"),
            Transport::WebSocket => write!(f, "WebSocket"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("WebSocket".parse::<Method>().unwrap(), Method::WebSocket);
        assert!(matches!(
            "PATCH".parse::<Method>(),
            Err(ConfigError::UnknownMethod(_))
        ));
    }

    #[test]
    fn test_method_serde() {
        let json = serde_json::to_string(&Method::WebSocket).unwrap();
        assert_eq!(json, "\"WEBSOCKET\"");
        let back: Method = serde_json::from_str("\"delete\"").unwrap();
        assert_eq!(back, Method::Delete);
    }

    #[test]
    fn test_select_plain_http() {
        for method in [Method::Get, Method::Head, Method::Delete] {
            let t = Transport::select(method, None, false, None).unwrap();
            assert_eq!(Some(t), method.verb().map(Transport::Http));
        }
        let t = Transport::select(Method::Put, None, true, Some("X-A")).unwrap();
        assert_eq!(t, Transport::Http(HttpVerb::Put));
    }

    #[test]
    fn test_payload_required_for_post_and_put() {
        for method in [Method::Post, Method::Put] {
            assert!(matches!(
                Transport::select(method, None, false, None),
                Err(ConfigError::PayloadRequired(_))
            ));
        }
    }

    #[test]
    fn test_jsonp_requires_get() {
        assert_eq!(
            Transport::select(Method::Get, Some("callback"), false, None).unwrap(),
            Transport::Jsonp
        );
        assert!(matches!(
            Transport::select(Method::Post, Some("cb"), true, None),
            Err(ConfigError::JsonpRequiresGet(_))
        ));
        assert!(matches!(
            Transport::select(Method::WebSocket, Some("cb"), false, None),
            Err(ConfigError::JsonpRequiresGet(_))
        ));
    }

    #[test]
    fn test_websocket_rejects_headers() {
        assert_eq!(
            Transport::select(Method::WebSocket, None, true, None).unwrap(),
            Transport::WebSocket
        );
        assert!(matches!(
            Transport::select(Method::WebSocket, None, false, Some("X-Token: {t}")),
            Err(ConfigError::UnsupportedHeaderForTransport { .. })
        ));
    }
}
