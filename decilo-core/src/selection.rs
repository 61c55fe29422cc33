//! User selections of attribute values
//!
//! A selection maps attribute display names to value display names. Matching
//! is case-insensitive and whitespace-trimmed, so two selections that differ
//! only in case or padding are the same selection.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Normalise a display name for matching: trim, then lowercase.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One chosen value for one attribute, as the user spelled it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectedOption {
    pub attribute: String,
    pub value: String,
}

impl SelectedOption {
    /// Normalised `(attribute, value)` lookup pair.
    pub fn selector(&self) -> (String, String) {
        (normalize_name(&self.attribute), normalize_name(&self.value))
    }
}

/// Attribute-name to value-name selection.
///
/// Entries are kept in the order they were supplied so error messages can
/// report the first offending choice. When two entries normalise to the same
/// attribute the later one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct Selection {
    options: Vec<SelectedOption>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the value chosen for an attribute.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(attribute, value);
        self
    }

    pub fn insert(&mut self, attribute: impl Into<String>, value: impl Into<String>) {
        let option = SelectedOption {
            attribute: attribute.into(),
            value: value.into(),
        };
        let key = normalize_name(&option.attribute);
        self.options
            .retain(|existing| normalize_name(&existing.attribute) != key);
        self.options.push(option);
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedOption> {
        self.options.iter()
    }

    /// Normalised `(attribute, value)` pairs sorted by attribute. Two
    /// selections that differ only in case, padding or order yield equal
    /// pairs.
    pub fn normalized_pairs(&self) -> Vec<(String, String)> {
        let sorted: BTreeMap<String, String> =
            self.options.iter().map(SelectedOption::selector).collect();
        sorted.into_iter().collect()
    }

    /// Normalised pairs rendered as `attr=value` joined with `;`, for logs.
    /// Names may contain either delimiter, so this is not a cache key.
    pub fn canonical(&self) -> String {
        self.normalized_pairs()
            .iter()
            .map(|(attribute, value)| format!("{}={}", attribute, value))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Selection {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for (attribute, value) in iter {
            selection.insert(attribute, value);
        }
        selection
    }
}

impl From<HashMap<String, String>> for Selection {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for Selection {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Selection> for BTreeMap<String, String> {
    fn from(selection: Selection) -> Self {
        selection
            .options
            .into_iter()
            .map(|option| (option.attribute, option.value))
            .collect()
    }
}
