//! Tolerant projection of JSON responses onto models.
//!
//! Only the fields a model recognizes are read. Members the model does not
//! know are skipped, and recognized fields missing from the JSON keep their
//! default value. Servers can therefore grow their responses without breaking
//! older clients.

use crate::model::{FieldValue, Model};
use crate::{Failure, FailureKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JsonKind::Null => "null",
            JsonKind::Boolean => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        };
        f.write_str(s)
    }
}

/// Top-level shape a response target expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Object,
    ArrayOfObjects,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Object => f.write_str("object"),
            Shape::ArrayOfObjects => f.write_str("array of objects"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("expected {expected}, received {found}")]
    ShapeMismatch { expected: Shape, found: JsonKind },
    #[error("field '{field}' expects {expected}, received {found}")]
    TypeCoercion {
        field: String,
        expected: String,
        found: JsonKind,
    },
    #[error("malformed JSON: {0}")]
    Malformed(String),
}

impl BindError {
    pub fn coercion<T: FieldValue>(value: &Value) -> Self {
        BindError::TypeCoercion {
            field: String::new(),
            expected: T::expects(),
            found: JsonKind::of(value),
        }
    }

    /// Prefix a coercion path with the enclosing field name.
    pub fn within(self, name: &str) -> Self {
        match self {
            BindError::TypeCoercion {
                field,
                expected,
                found,
            } => {
                let field = if field.is_empty() {
                    name.to_string()
                } else if field.starts_with('[') {
                    format!("{}{}", name, field)
                } else {
                    format!("{}.{}", name, field)
                };
                BindError::TypeCoercion {
                    field,
                    expected,
                    found,
                }
            }
            other => other,
        }
    }

    /// Prefix a coercion path with an array index.
    pub fn at_index(self, index: usize) -> Self {
        match self {
            BindError::TypeCoercion {
                field,
                expected,
                found,
            } => {
                let field = if field.is_empty() || field.starts_with('[') {
                    format!("[{}]{}", index, field)
                } else {
                    format!("[{}].{}", index, field)
                };
                BindError::TypeCoercion {
                    field,
                    expected,
                    found,
                }
            }
            other => other,
        }
    }
}

impl From<BindError> for Failure {
    fn from(err: BindError) -> Self {
        let kind = match err {
            BindError::ShapeMismatch { .. } => FailureKind::ResponseShapeMismatch,
            BindError::TypeCoercion { .. } => FailureKind::TypeCoercion,
            BindError::Malformed(_) => FailureKind::MalformedResponse,
        };
        Failure::new(kind, err.to_string())
    }
}

/// Copy every recognized member of `object` into a fresh `M`.
pub fn bind_object<M: Model>(object: &Map<String, Value>) -> Result<M, BindError> {
    let mut model = M::default();
    let mut matched = 0usize;
    for field in M::fields() {
        if let Some(value) = object.get(field.name) {
            (field.bind)(&mut model, value).map_err(|e| e.within(field.name))?;
            matched += 1;
        }
    }
    if matched < object.len() {
        trace!(
            model = M::type_name(),
            ignored = object.len() - matched,
            "discarded unrecognized JSON members"
        );
    }
    Ok(model)
}

/// Field-level binding of a nested model: `null` keeps the default.
pub fn bind_nested<M: Model>(value: &Value) -> Result<M, BindError> {
    match value {
        Value::Object(object) => bind_object(object),
        Value::Null => Ok(M::default()),
        other => Err(BindError::TypeCoercion {
            field: String::new(),
            expected: M::type_name().to_string(),
            found: JsonKind::of(other),
        }),
    }
}

/// Response target: a model, an array of models, or an ordered collection.
pub trait Receive: Sized + Send + 'static {
    const SHAPE: Shape;

    fn from_json(value: &Value) -> Result<Self, BindError>;

    /// Result for a response without a body (HEAD, 204).
    fn empty() -> Self;

    fn from_text(text: &str) -> Result<Self, BindError> {
        if text.trim().is_empty() {
            return Ok(Self::empty());
        }
        let value: Value =
            serde_json::from_str(text).map_err(|e| BindError::Malformed(e.to_string()))?;
        Self::from_json(&value)
    }
}

/// Singular targets; used by `model!`.
pub fn receive_one<M: Model>(value: &Value) -> Result<M, BindError> {
    match value {
        Value::Object(object) => bind_object(object),
        other => Err(BindError::ShapeMismatch {
            expected: Shape::Object,
            found: JsonKind::of(other),
        }),
    }
}

fn receive_many<M: Model>(value: &Value) -> Result<Vec<M>, BindError> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(BindError::ShapeMismatch {
                expected: Shape::ArrayOfObjects,
                found: JsonKind::of(other),
            })
        }
    };
    items
        .iter()
        .map(|item| match item {
            Value::Object(object) => bind_object(object),
            other => Err(BindError::ShapeMismatch {
                expected: Shape::ArrayOfObjects,
                found: JsonKind::of(other),
            }),
        })
        .collect()
}

impl<M: Model> Receive for Vec<M> {
    const SHAPE: Shape = Shape::ArrayOfObjects;

    fn from_json(value: &Value) -> Result<Self, BindError> {
        receive_many(value)
    }

    fn empty() -> Self {
        Vec::new()
    }
}

impl<M: Model> Receive for Box<[M]> {
    const SHAPE: Shape = Shape::ArrayOfObjects;

    fn from_json(value: &Value) -> Result<Self, BindError> {
        receive_many(value).map(Vec::into_boxed_slice)
    }

    fn empty() -> Self {
        Vec::new().into_boxed_slice()
    }
}
