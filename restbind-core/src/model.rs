//! The binding interface a model type exposes to the engine.
//!
//! A model is a `Default` value plus a fixed table of recognized fields. Each
//! field knows how to coerce a JSON value into itself and how to read itself
//! back out. Tables are normally produced by [`model!`](crate::model!).

use crate::bind::BindError;
use serde_json::{Map, Value};
use std::fmt;

pub trait Model: Default + Send + 'static {
    fn type_name() -> &'static str;

    fn fields() -> &'static [Field<Self>];

    fn field(name: &str) -> Option<&'static Field<Self>> {
        Self::fields().iter().find(|f| f.name == name)
    }

    /// Serialize every recognized field into a JSON object.
    fn to_value(&self) -> Value {
        let mut object = Map::new();
        for field in Self::fields() {
            object.insert(field.name.to_string(), (field.read)(self));
        }
        Value::Object(object)
    }
}

pub struct Field<M: 'static> {
    pub name: &'static str,
    pub expects: fn() -> String,
    pub bind: fn(&mut M, &Value) -> Result<(), BindError>,
    pub read: fn(&M) -> Value,
}

impl<M> fmt::Debug for Field<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("expects", &(self.expects)())
            .finish()
    }
}

/// A value that can sit in a model field.
pub trait FieldValue: Sized {
    fn expects() -> String;

    fn from_json(value: &Value) -> Result<Self, BindError>;

    fn to_json(&self) -> Value;
}

/// Request body of an endpoint. `()` declares no payload.
pub trait Payload: Send + 'static {
    fn type_name() -> Option<&'static str>;

    fn to_body(&self) -> Value;
}

impl Payload for () {
    fn type_name() -> Option<&'static str> {
        None
    }

    fn to_body(&self) -> Value {
        Value::Null
    }
}

impl FieldValue for String {
    fn expects() -> String {
        "string".to_string()
    }

    fn from_json(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok(String::new()),
            _ => Err(BindError::coercion::<Self>(value)),
        }
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

impl FieldValue for bool {
    fn expects() -> String {
        "boolean".to_string()
    }

    fn from_json(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s == "true" => Ok(true),
            Value::String(s) if s == "false" => Ok(false),
            Value::Null => Ok(false),
            _ => Err(BindError::coercion::<Self>(value)),
        }
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! integer_field {
    ($($t:ty),*) => {
        $(
            impl FieldValue for $t {
                fn expects() -> String {
                    stringify!($t).to_string()
                }

                fn from_json(value: &Value) -> Result<Self, BindError> {
                    let coerced = match value {
                        Value::Null => Some(0),
                        Value::Number(n) => n
                            .as_i64()
                            .and_then(|v| <$t>::try_from(v).ok())
                            .or_else(|| n.as_u64().and_then(|v| <$t>::try_from(v).ok()))
                            .or_else(|| {
                                n.as_f64()
                                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                                    // i128 holds every target range, so
                                    // only magnitudes past it saturate.
                                    .and_then(|f| <$t>::try_from(f as i128).ok())
                            }),
                        Value::String(s) => s.trim().parse::<$t>().ok(),
                        _ => None,
                    };
                    coerced.ok_or_else(|| BindError::coercion::<Self>(value))
                }

                fn to_json(&self) -> Value {
                    Value::from(*self)
                }
            }
        )*
    };
}

integer_field!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

macro_rules! float_field {
    ($($t:ty),*) => {
        $(
            impl FieldValue for $t {
                fn expects() -> String {
                    stringify!($t).to_string()
                }

                fn from_json(value: &Value) -> Result<Self, BindError> {
                    let coerced = match value {
                        Value::Null => Some(0.0),
                        Value::Number(n) => n.as_f64().map(|f| f as $t),
                        Value::String(s) => s.trim().parse::<$t>().ok(),
                        _ => None,
                    };
                    coerced.ok_or_else(|| BindError::coercion::<Self>(value))
                }

                fn to_json(&self) -> Value {
                    Value::from(*self)
                }
            }
        )*
    };
}

float_field!(f32, f64);

impl<T: FieldValue> FieldValue for Option<T> {
    fn expects() -> String {
        format!("optional {}", T::expects())
    }

    fn from_json(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_json(other).map(Some),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Some(inner) => inner.to_json(),
            None => Value::Null,
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn expects() -> String {
        format!("array of {}", T::expects())
    }

    fn from_json(value: &Value) -> Result<Self, BindError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::from_json(item).map_err(|e| e.at_index(i)))
                .collect(),
            _ => Err(BindError::coercion::<Self>(value)),
        }
    }

    fn to_json(&self) -> Value {
        Value::Array(self.iter().map(FieldValue::to_json).collect())
    }
}

/// Raw JSON passthrough for fields whose structure is not modelled.
impl FieldValue for Value {
    fn expects() -> String {
        "any JSON value".to_string()
    }

    fn from_json(value: &Value) -> Result<Self, BindError> {
        Ok(value.clone())
    }

    fn to_json(&self) -> Value {
        self.clone()
    }
}
