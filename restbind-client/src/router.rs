use restbind_core::{CallId, ConfigError, EndpointDescriptor, Failure};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Error operation registered on an endpoint: receives the originating
/// model instance and the failure.
pub type ErrorHandler<M> = Arc<dyn Fn(&M, Failure) + Send + Sync>;

/// Destination for failures of endpoints that declare no error operation.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, endpoint: &str, call: CallId, failure: &Failure);
}

/// Default sink: one `tracing` error event per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, endpoint: &str, call: CallId, failure: &Failure) {
        error!(
            endpoint = endpoint,
            call = call.as_u64(),
            kind = %failure.kind,
            status = ?failure.status,
            "{}",
            failure.message
        );
    }
}

/// Routes per-call failures to the endpoint's error operation, or to the
/// diagnostic sink when none is declared.
pub struct ErrorRouter<M> {
    endpoint: String,
    handler: Option<(String, ErrorHandler<M>)>,
    sink: Arc<dyn DiagnosticSink>,
}

impl<M> fmt::Debug for ErrorRouter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRouter")
            .field("endpoint", &self.endpoint)
            .field("handler", &self.handler.as_ref().map(|(name, _)| name))
            .finish()
    }
}

impl<M> ErrorRouter<M> {
    /// Resolve the descriptor's `on_error` name against the registered
    /// handlers.
    pub fn resolve(
        descriptor: &EndpointDescriptor,
        handlers: &HashMap<String, ErrorHandler<M>>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, ConfigError> {
        let handler = match descriptor.on_error() {
            Some(name) => {
                let handler = handlers
                    .get(name)
                    .ok_or_else(|| ConfigError::UnknownErrorHandler(name.to_string()))?;
                Some((name.to_string(), Arc::clone(handler)))
            }
            None => None,
        };
        Ok(Self {
            endpoint: descriptor.name().to_string(),
            handler,
            sink,
        })
    }

    pub fn route(&self, call: CallId, model: &M, failure: Failure) {
        match &self.handler {
            Some((name, handler)) => {
                debug!("{} failed ({}), routing to {}", call, failure.kind, name);
                handler(model, failure);
            }
            None => self.sink.report(&self.endpoint, call, &failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restbind_core::FailureKind;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<(String, Failure)>>);

    impl DiagnosticSink for RecordingSink {
        fn report(&self, endpoint: &str, _call: CallId, failure: &Failure) {
            self.0
                .lock()
                .unwrap()
                .push((endpoint.to_string(), failure.clone()));
        }
    }

    fn descriptor(on_error: Option<&str>) -> EndpointDescriptor {
        let mut builder = EndpointDescriptor::builder("getPerson", "http://h/person/{name}");
        if let Some(name) = on_error {
            builder = builder.on_error(name);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_named_handler_receives_failure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut handlers: HashMap<String, ErrorHandler<String>> = HashMap::new();
        let captured = Arc::clone(&seen);
        handlers.insert(
            "onFailure".to_string(),
            Arc::new(move |model: &String, failure: Failure| {
                captured.lock().unwrap().push((model.clone(), failure.kind));
            }),
        );
        let sink = Arc::new(RecordingSink::default());

        let router =
            ErrorRouter::resolve(&descriptor(Some("onFailure")), &handlers, sink.clone()).unwrap();
        router.route(
            CallId::new(1),
            &"smith".to_string(),
            Failure::transport("refused"),
        );

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("smith".to_string(), FailureKind::Transport)]
        );
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_handler_is_config_error() {
        let handlers: HashMap<String, ErrorHandler<String>> = HashMap::new();
        let err = ErrorRouter::resolve(
            &descriptor(Some("missing")),
            &handlers,
            Arc::new(TracingSink),
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownErrorHandler("missing".to_string()));
    }

    #[test]
    fn test_undeclared_handler_goes_to_sink() {
        let handlers: HashMap<String, ErrorHandler<String>> = HashMap::new();
        let sink = Arc::new(RecordingSink::default());
        let router = ErrorRouter::resolve(&descriptor(None), &handlers, sink.clone()).unwrap();

        router.route(
            CallId::new(4),
            &String::new(),
            Failure::shape_mismatch("expected object"),
        );

        let reports = sink.0.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "getPerson");
        assert_eq!(reports[0].1.kind, FailureKind::ResponseShapeMismatch);
    }
}
