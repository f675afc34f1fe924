use std::collections::BTreeMap;

use thiserror::Error;

/// Errors from building a filter out of user input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("expected key=value, got '{0}'")]
    Malformed(String),

    #[error("unknown filter '{key}' (available: {available})")]
    UnknownKey { key: String, available: String },

    #[error("filter '{key}' expects true or false, got '{value}'")]
    NotABool { key: String, value: String },
}

/// Declares which fields of a record take part in local filtering
pub trait Filterable {
    /// Keys accepted by equality filters
    const EQUALITY_KEYS: &'static [&'static str] = &[];
    /// Keys accepted by boolean filters
    const FLAG_KEYS: &'static [&'static str] = &[];

    /// Field values matched by the free-text search
    fn search_fields(&self) -> Vec<String>;

    /// Value compared by an equality filter
    fn field_value(&self, _key: &str) -> Option<String> {
        None
    }

    /// Value compared by a boolean filter
    fn flag(&self, _key: &str) -> Option<bool> {
        None
    }
}

/// Conjunction of search text, equality and boolean filters
///
/// Unset entries never exclude anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    search: String,
    equals: BTreeMap<String, String>,
    flags: BTreeMap<String, bool>,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "si" | "sí" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, text: &str) {
        self.search = text.trim().to_lowercase();
    }

    /// Set or clear (`None` / empty) an equality filter
    pub fn set_equals(&mut self, key: &str, value: Option<&str>) {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => {
                self.equals.insert(key.to_string(), v.to_lowercase());
            }
            None => {
                self.equals.remove(key);
            }
        }
    }

    pub fn set_flag(&mut self, key: &str, value: Option<bool>) {
        match value {
            Some(v) => {
                self.flags.insert(key.to_string(), v);
            }
            None => {
                self.flags.remove(key);
            }
        }
    }

    pub fn flag_value(&self, key: &str) -> Option<bool> {
        self.flags.get(key).copied()
    }

    pub fn equals_value(&self, key: &str) -> Option<&str> {
        self.equals.get(key).map(String::as_str)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.equals.is_empty() && self.flags.is_empty()
    }

    /// Apply a `key=value` assignment, routed by the record's declared keys
    pub fn apply_assignment<T: Filterable>(&mut self, assignment: &str) -> Result<(), FilterError> {
        let (key, value) = assignment
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| FilterError::Malformed(assignment.to_string()))?;

        if T::FLAG_KEYS.contains(&key) {
            let flag = parse_bool(value).ok_or_else(|| FilterError::NotABool {
                key: key.to_string(),
                value: value.to_string(),
            })?;
            self.set_flag(key, Some(flag));
            Ok(())
        } else if T::EQUALITY_KEYS.contains(&key) {
            self.set_equals(key, Some(value));
            Ok(())
        } else {
            let available: Vec<&str> = T::EQUALITY_KEYS
                .iter()
                .chain(T::FLAG_KEYS.iter())
                .copied()
                .collect();
            Err(FilterError::UnknownKey {
                key: key.to_string(),
                available: if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                },
            })
        }
    }

    pub fn matches<T: Filterable>(&self, item: &T) -> bool {
        if !self.search.is_empty()
            && !item
                .search_fields()
                .iter()
                .any(|f| f.to_lowercase().contains(&self.search))
        {
            return false;
        }

        let equals_ok = self.equals.iter().all(|(key, expected)| {
            item.field_value(key)
                .is_some_and(|v| v.trim().to_lowercase() == *expected)
        });
        if !equals_ok {
            return false;
        }

        self.flags
            .iter()
            .all(|(key, expected)| item.flag(key) == Some(*expected))
    }

    /// Filtered copy of `items`, in original order
    pub fn apply<T: Filterable + Clone>(&self, items: &[T]) -> Vec<T> {
        if self.is_empty() {
            return items.to_vec();
        }
        items.iter().filter(|i| self.matches(*i)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        name: &'static str,
        kind: &'static str,
        on: bool,
    }

    impl Filterable for Row {
        const EQUALITY_KEYS: &'static [&'static str] = &["kind"];
        const FLAG_KEYS: &'static [&'static str] = &["on"];

        fn search_fields(&self) -> Vec<String> {
            vec![self.name.to_string()]
        }

        fn field_value(&self, key: &str) -> Option<String> {
            (key == "kind").then(|| self.kind.to_string())
        }

        fn flag(&self, key: &str) -> Option<bool> {
            (key == "on").then_some(self.on)
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "Alpha", kind: "a", on: true },
            Row { name: "beta", kind: "b", on: true },
            Row { name: "Alphabet", kind: "b", on: false },
        ]
    }

    #[test]
    fn test_empty_filter_is_noop() {
        assert_eq!(ListFilter::new().apply(&rows()), rows());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let mut filter = ListFilter::new();
        filter.set_search("  ALPHA ");
        let names: Vec<&str> = filter.apply(&rows()).iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Alpha", "Alphabet"]);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let mut filter = ListFilter::new();
        filter.set_search("alpha");
        filter.set_equals("kind", Some("B"));
        filter.set_flag("on", Some(false));
        let result = filter.apply(&rows());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Alphabet");

        filter.set_flag("on", Some(true));
        assert!(filter.apply(&rows()).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut filter = ListFilter::new();
        filter.set_equals("kind", Some("b"));
        let once = filter.apply(&rows());
        let twice = filter.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clearing_entries() {
        let mut filter = ListFilter::new();
        filter.set_equals("kind", Some("a"));
        filter.set_equals("kind", Some("  "));
        filter.set_flag("on", Some(true));
        filter.set_flag("on", None);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_apply_assignment_routes_keys() {
        let mut filter = ListFilter::new();
        filter.apply_assignment::<Row>("on=no").unwrap();
        filter.apply_assignment::<Row>("kind = B").unwrap();
        assert_eq!(filter.flag_value("on"), Some(false));
        assert_eq!(filter.equals_value("kind"), Some("b"));

        assert_eq!(
            filter.apply_assignment::<Row>("color=red"),
            Err(FilterError::UnknownKey {
                key: "color".to_string(),
                available: "kind, on".to_string()
            })
        );
        assert!(matches!(
            filter.apply_assignment::<Row>("on=maybe"),
            Err(FilterError::NotABool { .. })
        ));
        assert!(matches!(
            filter.apply_assignment::<Row>("kind"),
            Err(FilterError::Malformed(_))
        ));
    }
}
