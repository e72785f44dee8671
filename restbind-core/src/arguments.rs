use indexmap::IndexMap;

/// Ordered placeholder values for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArguments {
    values: IndexMap<String, String>,
}

impl CallArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair declared parameter names with positional values. Surplus values
    /// are dropped; missing ones surface later as unresolved placeholders.
    pub fn positional<S: AsRef<str>>(names: &[String], values: &[S]) -> Self {
        if values.len() > names.len() {
            tracing::warn!(
                expected = names.len(),
                received = values.len(),
                "ignoring surplus call arguments"
            );
        }
        names
            .iter()
            .zip(values)
            .map(|(name, value)| (name.clone(), value.as_ref().to_string()))
            .collect()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallArguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = CallArguments::new();
        for (name, value) in iter {
            args.insert(name, value);
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let args = CallArguments::new()
            .with("protocol", "https")
            .with("name", "Smith")
            .with("id", "7");
        let names: Vec<&str> = args.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["protocol", "name", "id"]);
    }

    #[test]
    fn test_positional_pairs_names_with_values() {
        let names = vec!["protocol".to_string(), "name".to_string()];
        let args = CallArguments::positional(&names, &["http", "Smith"]);
        assert_eq!(args.get("protocol"), Some("http"));
        assert_eq!(args.get("name"), Some("Smith"));
    }

    #[test]
    fn test_positional_with_missing_values() {
        let names = vec!["protocol".to_string(), "name".to_string()];
        let args = CallArguments::positional(&names, &["http"]);
        assert_eq!(args.len(), 1);
        assert!(!args.contains("name"));
    }

    #[test]
    fn test_positional_drops_surplus() {
        let names = vec!["name".to_string()];
        let args = CallArguments::positional(&names, &["Smith", "extra"]);
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_insert_replaces() {
        let mut args = CallArguments::new().with("name", "Smith");
        assert_eq!(args.insert("name", "Jones"), Some("Smith".to_string()));
        assert_eq!(args.get("name"), Some("Jones"));
    }
}
