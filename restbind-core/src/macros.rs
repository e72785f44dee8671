//! Declarative model definitions

/// Declare a model struct together with its recognized-field table.
///
/// Each field maps a Rust field to the JSON member name it binds from. The
/// struct must derive `Default`; the generated impls make it usable as a
/// response target, a nested field and a request payload.
///
/// # Example
///
/// ```rust
/// use restbind_core::model;
///
/// model! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Person {
///         pub first_name: String => "firstName",
///         pub last_name: String => "lastName",
///     }
/// }
/// ```
#[macro_export]
macro_rules! model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty => $json:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::model::Model for $name {
            fn type_name() -> &'static str {
                stringify!($name)
            }

            fn fields() -> &'static [$crate::model::Field<Self>] {
                const FIELDS: &[$crate::model::Field<$name>] = &[
                    $(
                        $crate::model::Field {
                            name: $json,
                            expects: <$ty as $crate::model::FieldValue>::expects,
                            bind: |model: &mut $name, value: &$crate::__private::Value| {
                                model.$field =
                                    <$ty as $crate::model::FieldValue>::from_json(value)?;
                                Ok(())
                            },
                            read: |model: &$name| {
                                $crate::model::FieldValue::to_json(&model.$field)
                            },
                        },
                    )*
                ];
                FIELDS
            }
        }

        impl $crate::model::FieldValue for $name {
            fn expects() -> String {
                stringify!($name).to_string()
            }

            fn from_json(
                value: &$crate::__private::Value,
            ) -> Result<Self, $crate::bind::BindError> {
                $crate::bind::bind_nested::<Self>(value)
            }

            fn to_json(&self) -> $crate::__private::Value {
                $crate::model::Model::to_value(self)
            }
        }

        impl $crate::bind::Receive for $name {
            const SHAPE: $crate::bind::Shape = $crate::bind::Shape::Object;

            fn from_json(
                value: &$crate::__private::Value,
            ) -> Result<Self, $crate::bind::BindError> {
                $crate::bind::receive_one::<Self>(value)
            }

            fn empty() -> Self {
                <Self as Default>::default()
            }
        }

        impl $crate::model::Payload for $name {
            fn type_name() -> Option<&'static str> {
                Some(stringify!($name))
            }

            fn to_body(&self) -> $crate::__private::Value {
                $crate::model::Model::to_value(self)
            }
        }
    };
}
