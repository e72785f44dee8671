//! JSONP support.
//!
//! A JSONP response is a script that calls a function named by the client,
//! e.g. `cb123({"a":1});`. Instead of evaluating the script we recognize the
//! call expression and take its argument as the JSON payload.

use crate::TransportError;
use dashmap::DashMap;
use restbind_core::CallId;
use tracing::{debug, warn};

/// Add `param=callback` to the query string of `url`, ahead of any fragment.
pub fn attach_callback(url: &str, param: &str, callback: &str) -> String {
    let (base, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };
    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };
    format!("{}{}{}={}{}", base, separator, param, callback, fragment)
}

/// Split `name(args)` padding into the function name and the JSON text.
pub fn parse_padding(script: &str) -> Result<(&str, &str), TransportError> {
    let mut body = script.trim();
    if let Some(rest) = body.strip_prefix("/**/") {
        body = rest.trim_start();
    }
    // Express-style guard: `typeof cb === 'function' && cb(...)`
    if let Some(rest) = body.strip_prefix("typeof ") {
        body = rest
            .split_once("&&")
            .map(|(_, call)| call.trim_start())
            .ok_or_else(|| TransportError::Jsonp("unrecognized typeof guard".to_string()))?;
    }
    body = body.trim_end().trim_end_matches(';').trim_end();

    let open = body
        .find('(')
        .ok_or_else(|| TransportError::Jsonp("response is not a function call".to_string()))?;
    let name = body[..open].trim();
    if name.is_empty() || !name.chars().all(is_identifier_char) {
        return Err(TransportError::Jsonp(format!(
            "invalid callback name '{}'",
            name
        )));
    }
    let json = body[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| TransportError::Jsonp("unterminated callback invocation".to_string()))?;
    Ok((name, json.trim()))
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
}

/// Callbacks of JSONP calls that are still waiting for their script.
#[derive(Debug, Default)]
pub struct JsonpRegistry {
    pending: DashMap<String, CallId>,
}

impl JsonpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and record a fresh callback name for `call`.
    pub fn register(&self, call: CallId) -> String {
        let callback = call.jsonp_callback();
        self.pending.insert(callback.clone(), call);
        debug!("Registered JSONP callback {} for {}", callback, call);
        callback
    }

    pub fn forget(&self, callback: &str) {
        self.pending.remove(callback);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Capture the script's invocation of a registered callback and return
    /// the JSON it was invoked with. The callback is unregistered on success.
    pub fn capture(&self, call: CallId, script: &str) -> Result<String, TransportError> {
        let (name, json) = parse_padding(script)?;
        match self.pending.remove(name) {
            Some((_, owner)) if owner == call => Ok(json.to_string()),
            Some((name, owner)) => {
                warn!("JSONP response for {} arrived on {}", owner, call);
                self.pending.insert(name, owner);
                Err(TransportError::Jsonp(format!(
                    "callback belongs to {}, not {}",
                    owner, call
                )))
            }
            None => Err(TransportError::Jsonp(format!(
                "response invoked unknown callback '{}'",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_callback() {
        assert_eq!(attach_callback("http://h/p", "cb", "f1"), "http://h/p?cb=f1");
        assert_eq!(
            attach_callback("http://h/p?x=1", "cb", "f1"),
            "http://h/p?x=1&cb=f1"
        );
        assert_eq!(attach_callback("http://h/p?", "cb", "f1"), "http://h/p?cb=f1");
        assert_eq!(
            attach_callback("http://h/p#top", "cb", "f1"),
            "http://h/p?cb=f1#top"
        );
    }

    #[test]
    fn test_parse_plain_padding() {
        let (name, json) = parse_padding(" cb_1({\"a\": [1, 2]}); \n").unwrap();
        assert_eq!(name, "cb_1");
        assert_eq!(json, "{\"a\": [1, 2]}");
    }

    #[test]
    fn test_parse_guarded_padding() {
        let script = "/**/ typeof cb === 'function' && cb([{\"x\":1}]);";
        let (name, json) = parse_padding(script).unwrap();
        assert_eq!(name, "cb");
        assert_eq!(json, "[{\"x\":1}]");
    }

    #[test]
    fn test_parse_rejects_plain_json() {
        assert!(matches!(
            parse_padding("{\"a\":1}"),
            Err(TransportError::Jsonp(_))
        ));
        assert!(matches!(
            parse_padding("cb({\"a\":1}"),
            Err(TransportError::Jsonp(_))
        ));
    }

    #[test]
    fn test_registry_capture() {
        let registry = JsonpRegistry::new();
        let call = CallId::new(1);
        let callback = registry.register(call);
        assert_eq!(registry.pending(), 1);

        let script = format!("{}({{\"ok\":true}});", callback);
        assert_eq!(registry.capture(call, &script).unwrap(), "{\"ok\":true}");
        assert_eq!(registry.pending(), 0);
    }

    #[test]
    fn test_registry_rejects_foreign_callbacks() {
        let registry = JsonpRegistry::new();
        let first = registry.register(CallId::new(1));
        let _second = registry.register(CallId::new(2));

        let script = format!("{}({{}})", first);
        assert!(registry.capture(CallId::new(2), &script).is_err());
        assert_eq!(registry.pending(), 2);

        assert!(registry.capture(CallId::new(1), "other({})").is_err());
        registry.forget(&first);
        assert_eq!(registry.pending(), 1);
    }
}
