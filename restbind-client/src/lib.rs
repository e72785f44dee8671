// restbind client: declared endpoints become typed, asynchronous operations
pub mod client;
pub mod config;
pub mod endpoint;
pub mod logging;
pub mod pending;
pub mod request;
pub mod router;

pub use client::Client;
pub use config::ClientConfig;
pub use endpoint::{Endpoint, EndpointBuilder, LifecycleHook, ReceiveHandler};
pub use pending::{CallState, IllegalTransition, PendingCall};
pub use request::{RequestBuilder, RequestTarget};
pub use router::{DiagnosticSink, ErrorHandler, ErrorRouter, TracingSink};

pub use restbind_core::{
    model, CallArguments, CallId, ConfigError, EndpointConfig, EndpointDescriptor, Failure,
    FailureKind, Method,
};
