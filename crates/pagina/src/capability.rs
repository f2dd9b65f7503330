//! Capability registry: which element tags are readable, clickable,
//! settable, and selectable.
//!
//! The registry drives accessor synthesis. Capability checks run once, at
//! schema build time, against a snapshot of the process-wide registry;
//! mutating the registry afterwards affects subsequently built schemas
//! only, never accessors that were already compiled.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{OnceLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// How a read accessor extracts a value from an element of a given tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadStrategy {
    /// Current value of an input-like element
    Value,
    /// Label of the currently selected option
    SelectedOption,
    /// Checked-state boolean
    CheckedState,
    /// Visible text
    Text,
}

/// Per-tag capability sets plus read strategies.
///
/// Unknown tags hold no capabilities; every query on them returns false
/// rather than failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityRegistry {
    readable: BTreeSet<String>,
    clickable: BTreeSet<String>,
    settable: BTreeSet<String>,
    selectable: BTreeSet<String>,
    read_strategies: BTreeMap<String, ReadStrategy>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::seeded()
    }
}

impl CapabilityRegistry {
    /// Registry with no capabilities at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            readable: BTreeSet::new(),
            clickable: BTreeSet::new(),
            settable: BTreeSet::new(),
            selectable: BTreeSet::new(),
            read_strategies: BTreeMap::new(),
        }
    }

    /// Registry seeded with the built-in defaults: block-level text tags
    /// are readable, anchor/button tags are clickable, input-like tags are
    /// settable, and selection lists are selectable.
    #[must_use]
    pub fn seeded() -> Self {
        let mut registry = Self::empty();
        for tag in [
            "div",
            "span",
            "p",
            "h1",
            "h2",
            "h3",
            "h4",
            "h5",
            "h6",
            "select_list",
            "text_field",
            "textarea",
            "checkbox",
            "radio",
        ] {
            registry.add_readable(tag);
        }
        for tag in ["a", "link", "button"] {
            registry.add_clickable(tag);
        }
        for tag in ["text_field", "file_field", "textarea", "checkbox"] {
            registry.add_settable(tag);
        }
        registry.add_selectable("select_list");

        registry.set_read_strategy("text_field", ReadStrategy::Value);
        registry.set_read_strategy("textarea", ReadStrategy::Value);
        registry.set_read_strategy("select_list", ReadStrategy::SelectedOption);
        registry.set_read_strategy("checkbox", ReadStrategy::CheckedState);
        registry.set_read_strategy("radio", ReadStrategy::CheckedState);
        registry
    }

    /// Whether the tag gets a read accessor
    #[must_use]
    pub fn is_readable(&self, tag: &str) -> bool {
        self.readable.contains(tag)
    }

    /// Whether the tag gets a click accessor
    #[must_use]
    pub fn is_clickable(&self, tag: &str) -> bool {
        self.clickable.contains(tag)
    }

    /// Whether the tag gets a set accessor
    #[must_use]
    pub fn is_settable(&self, tag: &str) -> bool {
        self.settable.contains(tag)
    }

    /// Whether the tag gets a select accessor
    #[must_use]
    pub fn is_selectable(&self, tag: &str) -> bool {
        self.selectable.contains(tag)
    }

    /// Mark a tag readable
    pub fn add_readable(&mut self, tag: impl Into<String>) {
        let _ = self.readable.insert(tag.into());
    }

    /// Mark a tag clickable
    pub fn add_clickable(&mut self, tag: impl Into<String>) {
        let _ = self.clickable.insert(tag.into());
    }

    /// Mark a tag settable
    pub fn add_settable(&mut self, tag: impl Into<String>) {
        let _ = self.settable.insert(tag.into());
    }

    /// Mark a tag selectable
    pub fn add_selectable(&mut self, tag: impl Into<String>) {
        let _ = self.selectable.insert(tag.into());
    }

    /// Read strategy for a tag; tags without one read visible text
    #[must_use]
    pub fn read_strategy(&self, tag: &str) -> ReadStrategy {
        self.read_strategies
            .get(tag)
            .copied()
            .unwrap_or(ReadStrategy::Text)
    }

    /// Override the read strategy for a tag
    pub fn set_read_strategy(&mut self, tag: impl Into<String>, strategy: ReadStrategy) {
        let _ = self.read_strategies.insert(tag.into(), strategy);
    }
}

fn global() -> &'static RwLock<CapabilityRegistry> {
    static GLOBAL: OnceLock<RwLock<CapabilityRegistry>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(CapabilityRegistry::seeded()))
}

/// Snapshot of the process-wide registry, as taken at schema build time
#[must_use]
pub fn snapshot() -> CapabilityRegistry {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Whether the tag is readable in the process-wide registry
#[must_use]
pub fn is_readable(tag: &str) -> bool {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_readable(tag)
}

/// Whether the tag is clickable in the process-wide registry
#[must_use]
pub fn is_clickable(tag: &str) -> bool {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_clickable(tag)
}

/// Whether the tag is settable in the process-wide registry
#[must_use]
pub fn is_settable(tag: &str) -> bool {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_settable(tag)
}

/// Whether the tag is selectable in the process-wide registry
#[must_use]
pub fn is_selectable(tag: &str) -> bool {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_selectable(tag)
}

/// Mark a tag readable in the process-wide registry
pub fn add_readable(tag: impl Into<String>) {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add_readable(tag);
}

/// Mark a tag clickable in the process-wide registry
pub fn add_clickable(tag: impl Into<String>) {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add_clickable(tag);
}

/// Mark a tag settable in the process-wide registry
pub fn add_settable(tag: impl Into<String>) {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add_settable(tag);
}

/// Mark a tag selectable in the process-wide registry
pub fn add_selectable(tag: impl Into<String>) {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add_selectable(tag);
}

/// Set a tag's read strategy in the process-wide registry
pub fn set_read_strategy(tag: impl Into<String>, strategy: ReadStrategy) {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .set_read_strategy(tag, strategy);
}
