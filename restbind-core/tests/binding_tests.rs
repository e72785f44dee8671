// Response binding tests
// Tolerant projection of JSON onto models, shapes and coercion failures

use restbind_core::{model, BindError, Failure, FailureKind, JsonKind, Model, Receive, Shape};
use serde_json::json;

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Person {
        pub first_name: String => "firstName",
        pub last_name: String => "lastName",
    }
}

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Address {
        pub street: String => "street",
        pub zip: u32 => "zip",
    }
}

model! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Customer {
        pub name: String => "name",
        pub age: Option<u8> => "age",
        pub vip: bool => "vip",
        pub score: f64 => "score",
        pub tags: Vec<String> => "tags",
        pub home: Address => "home",
        pub previous: Vec<Address> => "previous",
    }
}

#[cfg(test)]
mod tolerant_binding {
    use super::*;

    #[test]
    fn test_unknown_fields_are_ignored() {
        let person = Person::from_text(r#"{"firstName":"John","lastName":"Smith","age":33}"#)
            .unwrap();
        assert_eq!(person.first_name, "John");
        assert_eq!(person.last_name, "Smith");
    }

    #[test]
    fn test_missing_fields_keep_defaults() {
        let person = Person::from_text(r#"{"firstName":"John"}"#).unwrap();
        assert_eq!(person.first_name, "John");
        assert_eq!(person.last_name, "");

        let customer = Customer::from_text("{}").unwrap();
        assert_eq!(customer, Customer::default());
    }

    #[test]
    fn test_binding_is_idempotent() {
        let text = r#"{
            "name": "Ada",
            "age": 36,
            "vip": true,
            "score": 9.5,
            "tags": ["math", "engines"],
            "home": {"street": "St James's Square", "zip": 12345, "floor": 2},
            "previous": [{"street": "Marylebone", "zip": "54321"}],
            "extra": {"nested": [1, 2, 3]}
        }"#;
        let first = Customer::from_text(text).unwrap();
        let second = Customer::from_text(text).unwrap();
        assert_eq!(first, second);

        assert_eq!(first.age, Some(36));
        assert!(first.vip);
        assert_eq!(first.tags, vec!["math".to_string(), "engines".to_string()]);
        assert_eq!(first.home.zip, 12345);
        assert_eq!(first.previous[0].zip, 54321);
    }

    #[test]
    fn test_collection_targets() {
        let text = r#"[{"firstName":"A"},{"lastName":"B","x":1}]"#;
        let people: Vec<Person> = Receive::from_text(text).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].first_name, "A");
        assert_eq!(people[1].last_name, "B");

        let array: Box<[Person]> = Receive::from_text(text).unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(&array[..], &people[..]);
        assert_eq!(<Vec<Person> as Receive>::SHAPE, Shape::ArrayOfObjects);
        assert_eq!(<Person as Receive>::SHAPE, Shape::Object);
    }

    #[test]
    fn test_empty_body_binds_to_defaults() {
        assert_eq!(Person::from_text("  ").unwrap(), Person::default());
        let people: Vec<Person> = Receive::from_text("").unwrap();
        assert!(people.is_empty());
    }

    #[test]
    fn test_payload_round_trips_through_field_table() {
        let person = Person {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
        };
        let value = person.to_value();
        assert_eq!(value, json!({"firstName": "John", "lastName": "Smith"}));
        assert_eq!(<Person as Receive>::from_json(&value).unwrap(), person);
    }
}

#[cfg(test)]
mod binding_failures {
    use super::*;

    #[test]
    fn test_object_expected_array_received() {
        let err = Person::from_text(r#"[{"firstName":"John"}]"#).unwrap_err();
        assert_eq!(
            err,
            BindError::ShapeMismatch {
                expected: Shape::Object,
                found: JsonKind::Array
            }
        );
        assert_eq!(Failure::from(err).kind, FailureKind::ResponseShapeMismatch);
    }

    #[test]
    fn test_array_expected_object_received() {
        let err = <Vec<Person> as Receive>::from_text(r#"{"firstName":"John"}"#).unwrap_err();
        assert!(matches!(
            err,
            BindError::ShapeMismatch {
                expected: Shape::ArrayOfObjects,
                found: JsonKind::Object
            }
        ));
    }

    #[test]
    fn test_array_with_non_object_element() {
        let err = <Vec<Person> as Receive>::from_text(r#"[{"firstName":"A"}, 3]"#).unwrap_err();
        assert!(matches!(err, BindError::ShapeMismatch { found: JsonKind::Number, .. }));
    }

    #[test]
    fn test_coercion_error_names_field() {
        let err = Customer::from_text(r#"{"home": {"zip": "north"}}"#).unwrap_err();
        match &err {
            BindError::TypeCoercion {
                field,
                expected,
                found,
            } => {
                assert_eq!(field, "home.zip");
                assert_eq!(expected, "u32");
                assert_eq!(*found, JsonKind::String);
            }
            other => panic!("unexpected error {:?}", other),
        }
        let failure = Failure::from(err);
        assert_eq!(failure.kind, FailureKind::TypeCoercion);
        assert!(failure.message.contains("home.zip"));
    }

    #[test]
    fn test_coercion_error_inside_collection() {
        let err = Customer::from_text(r#"{"previous": [{"zip": 1}, {"street": []}]}"#).unwrap_err();
        assert!(matches!(
            err,
            BindError::TypeCoercion { ref field, .. } if field == "previous[1].street"
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = Person::from_text("{\"firstName\": ").unwrap_err();
        assert!(matches!(err, BindError::Malformed(_)));
        assert_eq!(Failure::from(err).kind, FailureKind::MalformedResponse);
    }
}
