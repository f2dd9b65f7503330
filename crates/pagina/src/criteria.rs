//! Locator criteria and the native/predicate partitioner.
//!
//! A declaration mixes provider-native locator keys (id, class, role) with
//! capability-probed state filters (currently selected, currently checked)
//! without distinguishing them syntactically. The partitioner splits the
//! mix once, at accessor definition time: a key becomes a predicate filter
//! iff the target element type enumerates a predicate of that name on the
//! provider surface, unless the key is on the always-native list.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::accessor::ReadValue;
use crate::provider::Surface;

/// Locator keys the provider always understands natively, even when a
/// same-named element predicate exists on the surface.
pub const ALWAYS_NATIVE_KEYS: &[&str] = &["visible"];

/// Value of a single locator criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionValue {
    /// Literal text, compared for equality
    Text(String),
    /// Boolean, for state keys like `visible`
    Flag(bool),
    /// Integer literal
    Number(i64),
    /// Regular expression, matched against text
    Pattern(String),
}

impl CriterionValue {
    /// The boolean form of this value, if it has one
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// The text form of this value, if it has one
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Pattern(text) => Some(text),
            _ => None,
        }
    }

    /// Whether a value read off an entity satisfies this criterion.
    /// Text and flags compare for equality; patterns match as regular
    /// expressions against text.
    #[must_use]
    pub fn matches(&self, value: &ReadValue) -> bool {
        match (self, value) {
            (Self::Text(expected), ReadValue::Text(actual)) => expected == actual,
            (Self::Flag(expected), ReadValue::Flag(actual)) => expected == actual,
            (Self::Number(expected), ReadValue::Text(actual)) => {
                *actual == expected.to_string()
            }
            (Self::Pattern(pattern), ReadValue::Text(actual)) => Regex::new(pattern)
                .map(|re| re.is_match(actual))
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl fmt::Display for CriterionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Number(number) => write!(f, "{number}"),
            Self::Pattern(pattern) => write!(f, "/{pattern}/"),
        }
    }
}

impl From<&str> for CriterionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CriterionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for CriterionValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for CriterionValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// A mapping of locator keys to values, patterns, or booleans
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criteria {
    entries: BTreeMap<String, CriterionValue>,
}

impl Criteria {
    /// Create an empty criteria mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion, builder style
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<CriterionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a pattern-valued criterion, builder style
    #[must_use]
    pub fn with_pattern(mut self, key: impl Into<String>, pattern: impl Into<String>) -> Self {
        let _ = self
            .entries
            .insert(key.into(), CriterionValue::Pattern(pattern.into()));
        self
    }

    /// Add a criterion
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CriterionValue>) {
        let _ = self.entries.insert(key.into(), value.into());
    }

    /// Look up a criterion by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CriterionValue> {
        self.entries.get(key)
    }

    /// Whether the mapping holds no criteria
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of criteria
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate criteria in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CriterionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.entries {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Result of splitting a raw criteria mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedCriteria {
    /// Criteria forwarded verbatim to the element provider
    pub native: Criteria,
    /// Criteria applied as post-fetch predicate filters
    pub predicate: Criteria,
}

/// Split a raw criteria mapping for the given element type.
///
/// A key routes to the predicate side iff the surface enumerates a
/// predicate of that name for the tag and the key is not on
/// [`ALWAYS_NATIVE_KEYS`]. An empty mapping yields two empty mappings.
#[must_use]
pub fn partition(surface: &Surface, tag: &str, raw: &Criteria) -> PartitionedCriteria {
    let mut split = PartitionedCriteria::default();
    for (key, value) in raw.iter() {
        let probed = surface.predicate_arity(tag, key).is_some();
        if probed && !ALWAYS_NATIVE_KEYS.contains(&key) {
            split.predicate.insert(key, value.clone());
        } else {
            split.native.insert(key, value.clone());
        }
    }
    split
}
