//! Turns a descriptor, call arguments and an optional payload into a
//! concrete request for the endpoint's transport.

use indexmap::IndexMap;
use restbind_core::{
    CallArguments, CallId, EndpointDescriptor, Failure, TemplateError, Transport,
};
use restbind_transport::{attach_callback, HttpRequest, JsonpRegistry, JSON_CONTENT_TYPE};
use serde_json::Value;

const CONTENT_TYPE: &str = "Content-Type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    Http(HttpRequest),
    /// GET whose URL carries `callback`; the callback stays registered
    /// until the response is captured or the call fails.
    Jsonp {
        request: HttpRequest,
        callback: String,
    },
    /// Rendered connection URL and the text frame to send once open.
    WebSocket { url: String, frame: Option<String> },
}

impl RequestTarget {
    pub fn url(&self) -> &str {
        match self {
            RequestTarget::Http(request) | RequestTarget::Jsonp { request, .. } => &request.url,
            RequestTarget::WebSocket { url, .. } => url,
        }
    }
}

#[derive(Debug)]
pub struct RequestBuilder<'a> {
    descriptor: &'a EndpointDescriptor,
    default_headers: &'a IndexMap<String, String>,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(
        descriptor: &'a EndpointDescriptor,
        default_headers: &'a IndexMap<String, String>,
    ) -> Self {
        Self {
            descriptor,
            default_headers,
        }
    }

    /// Build the request for one call. Nothing is sent; a JSONP callback is
    /// registered with `registry` only when the whole request renders.
    pub fn build(
        &self,
        call: CallId,
        args: &CallArguments,
        body: Option<Value>,
        registry: &JsonpRegistry,
    ) -> Result<RequestTarget, Failure> {
        let body = body.map(|value| value.to_string());
        match self.descriptor.transport() {
            Transport::Http(verb) => {
                let mut request = HttpRequest::new(verb, self.descriptor.url().render_url(args)?);
                request.headers = self.render_headers(args, body.is_some())?;
                request.body = body;
                Ok(RequestTarget::Http(request))
            }
            Transport::Jsonp => self.build_jsonp(call, args, body, registry),
            Transport::WebSocket => Ok(RequestTarget::WebSocket {
                url: self.descriptor.url().render_url(args)?,
                frame: body,
            }),
        }
    }

    fn build_jsonp(
        &self,
        call: CallId,
        args: &CallArguments,
        body: Option<String>,
        registry: &JsonpRegistry,
    ) -> Result<RequestTarget, Failure> {
        let headers = self.render_headers(args, body.is_some())?;
        let param = self.descriptor.jsonp().unwrap_or("callback");
        let template = self.descriptor.url();

        let callback = registry.register(call);
        let url = if template.references(param) {
            let mut args = args.clone();
            args.insert(param, callback.as_str());
            template.render_url(&args)
        } else {
            template
                .render_url(args)
                .map(|url| attach_callback(&url, param, &callback))
        };
        let url = match url {
            Ok(url) => url,
            Err(err) => {
                registry.forget(&callback);
                return Err(err.into());
            }
        };

        let mut request = HttpRequest::new(restbind_core::HttpVerb::Get, url);
        request.headers = headers;
        request.body = body;
        Ok(RequestTarget::Jsonp { request, callback })
    }

    fn render_headers(
        &self,
        args: &CallArguments,
        has_body: bool,
    ) -> Result<Vec<(String, String)>, TemplateError> {
        let mut headers: Vec<(String, String)> = self
            .default_headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for template in self.descriptor.headers() {
            let (name, value) = template.render(args)?;
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }
        if has_body
            && !headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE))
        {
            headers.push((CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string()));
        }
        Ok(headers)
    }
}
