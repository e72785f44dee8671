// Endpoint declarations, templates and response binding
pub mod arguments;
pub mod bind;
pub mod descriptor;
pub mod error;
pub mod ids;
pub mod macros;
pub mod method;
pub mod model;
pub mod template;

pub use arguments::CallArguments;
pub use bind::{BindError, JsonKind, Receive, Shape};
pub use descriptor::{DescriptorBuilder, EndpointConfig, EndpointDescriptor};
pub use error::{ConfigError, Failure, FailureKind};
pub use ids::{CallId, CallIdAllocator};
pub use method::{HttpVerb, Method, Transport};
pub use model::{Field, FieldValue, Model, Payload};
pub use template::{HeaderTemplate, Template, TemplateError};

#[doc(hidden)]
pub mod __private {
    pub use serde_json::{Map, Value};
}
