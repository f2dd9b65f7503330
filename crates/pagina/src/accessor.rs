//! Accessor compilation: turning element declarations into typed
//! operations.
//!
//! For each declared `(name, tag, criteria)` triple a schema build
//! synthesizes a [`CompiledElement`]: a locator-resolving operation plus
//! zero or more capability-specific operations (click, read, set or
//! select), decided once against the capability registry snapshot. The
//! raw criteria are partitioned into native and predicate sides at the
//! same time and closed over by the compiled accessor.

use std::fmt;
use std::rc::Rc;

use crate::capability::{CapabilityRegistry, ReadStrategy};
use crate::criteria::{partition, Criteria, PartitionedCriteria};
use crate::plural::{is_plural, pluralize, singular_of};
use crate::provider::{ElementRef, PredicateArity, SetValue, Surface};
use crate::region::Entity;
use crate::result::{PaginaError, PaginaResult};

use serde::{Deserialize, Serialize};

/// Value produced by a read accessor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadValue {
    /// Textual value: input value, option label, or visible text
    Text(String),
    /// Checked-state boolean
    Flag(bool),
}

impl ReadValue {
    /// The text form of this value, if it has one
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Flag(_) => None,
        }
    }

    /// The boolean form of this value, if it has one
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for ReadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

/// Element retriever used in place of criteria-based lookup, re-evaluated
/// on each accessor call with the owning instance.
pub type ElementResolver = Rc<dyn Fn(&Entity) -> PaginaResult<ElementRef>>;

/// How a declaration locates its element
pub(crate) enum DeclaredLookup {
    /// Raw criteria, partitioned at compile time
    Criteria(Criteria),
    /// Caller-supplied retriever function
    Resolver(ElementResolver),
}

enum Lookup {
    Criteria(PartitionedCriteria),
    Resolver(ElementResolver),
}

/// Which write operation a set accessor performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Generic set, with a keystroke-simulation fallback for element
    /// kinds that only accept synthesized input events
    Set,
    /// Option selection on a selection list
    Select,
}

/// Operations synthesized for a declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpSet {
    /// Click accessor present
    pub click: bool,
    /// Read accessor present, with its extraction strategy
    pub read: Option<ReadStrategy>,
    /// Set or select accessor present
    pub write: Option<WriteStrategy>,
}

/// A compiled element declaration: the locator-resolving operation plus
/// the capability operations synthesized for its tag.
pub struct CompiledElement {
    name: String,
    tag: String,
    /// Singular element-type tag, used for predicate and strategy lookups
    /// when the declaration names a plural method directly.
    type_tag: String,
    plural: bool,
    lookup: Lookup,
    ops: OpSet,
}

impl fmt::Debug for CompiledElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledElement")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("plural", &self.plural)
            .field("ops", &self.ops)
            .finish_non_exhaustive()
    }
}

impl CompiledElement {
    pub(crate) fn compile(
        name: &str,
        tag: &str,
        lookup: DeclaredLookup,
        surface: &Surface,
        capabilities: &CapabilityRegistry,
    ) -> Self {
        let plural = is_plural(surface, tag);
        let type_tag = singular_of(surface, tag).unwrap_or_else(|| tag.to_string());
        let ops = OpSet {
            click: capabilities.is_clickable(tag),
            read: capabilities
                .is_readable(tag)
                .then(|| capabilities.read_strategy(tag)),
            write: if capabilities.is_selectable(tag) {
                Some(WriteStrategy::Select)
            } else if capabilities.is_settable(tag) {
                Some(WriteStrategy::Set)
            } else {
                None
            },
        };
        let lookup = match lookup {
            DeclaredLookup::Criteria(raw) => Lookup::Criteria(partition(surface, &type_tag, &raw)),
            DeclaredLookup::Resolver(resolver) => Lookup::Resolver(resolver),
        };
        tracing::debug!(name, tag, "compiled element accessor");
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            type_tag,
            plural,
            lookup,
            ops,
        }
    }

    /// Declared element name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared tag method
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Operations synthesized for this declaration
    #[must_use]
    pub fn operations(&self) -> OpSet {
        self.ops
    }

    /// Resolve to a single element, `None` when predicate filtering left
    /// no survivor. Plural declarations yield their first match.
    pub(crate) fn resolve_one(&self, entity: &Entity) -> PaginaResult<Option<ElementRef>> {
        match &self.lookup {
            Lookup::Resolver(resolver) => Ok(Some(resolver(entity)?)),
            Lookup::Criteria(parts) => {
                if self.plural || !parts.predicate.is_empty() {
                    Ok(self.resolve_many(entity)?.into_iter().next())
                } else {
                    entity.scope().find(&self.tag, &parts.native).map(Some)
                }
            }
        }
    }

    /// Resolve to the full candidate collection, predicate-filtered.
    pub(crate) fn resolve_many(&self, entity: &Entity) -> PaginaResult<Vec<ElementRef>> {
        match &self.lookup {
            Lookup::Resolver(resolver) => Ok(vec![resolver(entity)?]),
            Lookup::Criteria(parts) => {
                let scope = entity.scope();
                let method = if self.plural {
                    self.tag.clone()
                } else {
                    pluralize(scope.surface(), &self.tag)?
                };
                let candidates = scope.find_all(&method, &parts.native)?;
                if parts.predicate.is_empty() {
                    return Ok(candidates);
                }
                let mut survivors = Vec::with_capacity(candidates.len());
                for element in candidates {
                    if self.passes_predicates(scope.surface(), &element)? {
                        survivors.push(element);
                    }
                }
                Ok(survivors)
            }
        }
    }

    fn passes_predicates(&self, surface: &Surface, element: &ElementRef) -> PaginaResult<bool> {
        let parts = match &self.lookup {
            Lookup::Criteria(parts) => parts,
            Lookup::Resolver(_) => return Ok(true),
        };
        for (key, expected) in parts.predicate.iter() {
            let arity = surface
                .predicate_arity(&self.type_tag, key)
                .unwrap_or(PredicateArity::Nullary);
            let satisfied = match arity {
                PredicateArity::Nullary => match expected.as_flag() {
                    Some(flag) => element.eval_predicate(key)? == flag,
                    None => false,
                },
                PredicateArity::Unary => element.eval_predicate_with(key, expected)?,
            };
            if !satisfied {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn require(&self, entity: &Entity) -> PaginaResult<ElementRef> {
        self.resolve_one(entity)?
            .ok_or_else(|| PaginaError::ElementAbsent {
                name: self.name.clone(),
                tag: self.tag.clone(),
            })
    }

    pub(crate) fn click(&self, entity: &Entity) -> PaginaResult<()> {
        if !self.ops.click {
            return Err(PaginaError::UnsupportedAccessor {
                name: self.name.clone(),
                operation: "click",
            });
        }
        self.require(entity)?.click()
    }

    pub(crate) fn read(&self, entity: &Entity) -> PaginaResult<ReadValue> {
        let strategy = self
            .ops
            .read
            .ok_or_else(|| PaginaError::UnsupportedAccessor {
                name: self.name.clone(),
                operation: "read",
            })?;
        let element = self.require(entity)?;
        match strategy {
            ReadStrategy::Value => element.value().map(ReadValue::Text),
            ReadStrategy::SelectedOption => element.selected_option().map(ReadValue::Text),
            ReadStrategy::CheckedState => element.is_on().map(ReadValue::Flag),
            ReadStrategy::Text => element.text().map(ReadValue::Text),
        }
    }

    pub(crate) fn write(&self, entity: &Entity, value: &SetValue) -> PaginaResult<()> {
        let strategy = self
            .ops
            .write
            .ok_or_else(|| PaginaError::UnsupportedAccessor {
                name: self.name.clone(),
                operation: "set",
            })?;
        let element = self.require(entity)?;
        match strategy {
            WriteStrategy::Select => element.select_option(&value.as_keys()),
            WriteStrategy::Set => {
                if element.accepts_set() {
                    element.set(value)
                } else {
                    element.send_keys(&value.as_keys())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(name: &str, tag: &str) -> CompiledElement {
        CompiledElement::compile(
            name,
            tag,
            DeclaredLookup::Criteria(Criteria::new()),
            &Surface::standard(),
            &CapabilityRegistry::seeded(),
        )
    }

    mod op_synthesis_tests {
        use super::*;

        #[test]
        fn test_readable_only_tag() {
            let ops = compile("container", "div").operations();
            assert!(!ops.click);
            assert_eq!(ops.read, Some(ReadStrategy::Text));
            assert_eq!(ops.write, None);
        }

        #[test]
        fn test_clickable_tag() {
            let ops = compile("submit", "button").operations();
            assert!(ops.click);
            assert_eq!(ops.read, None);
            assert_eq!(ops.write, None);
        }

        #[test]
        fn test_settable_and_readable_tag() {
            let ops = compile("name", "text_field").operations();
            assert!(!ops.click);
            assert_eq!(ops.read, Some(ReadStrategy::Value));
            assert_eq!(ops.write, Some(WriteStrategy::Set));
        }

        #[test]
        fn test_selectable_tag_gets_select_not_set() {
            let ops = compile("country", "select_list").operations();
            assert_eq!(ops.read, Some(ReadStrategy::SelectedOption));
            assert_eq!(ops.write, Some(WriteStrategy::Select));
        }

        #[test]
        fn test_checkbox_reads_checked_state() {
            let ops = compile("agree", "checkbox").operations();
            assert_eq!(ops.read, Some(ReadStrategy::CheckedState));
            assert_eq!(ops.write, Some(WriteStrategy::Set));
        }

        #[test]
        fn test_plural_declaration_gets_element_accessor_only() {
            // Capability sets hold singular tags, so a plural declaration
            // synthesizes no click/read/set operations.
            let ops = compile("rows", "divs").operations();
            assert!(!ops.click);
            assert_eq!(ops.read, None);
            assert_eq!(ops.write, None);
        }

        #[test]
        fn test_capability_snapshot_at_compile_time() {
            let mut custom = CapabilityRegistry::seeded();
            custom.add_clickable("tile");
            let element = CompiledElement::compile(
                "first_tile",
                "tile",
                DeclaredLookup::Criteria(Criteria::new()),
                &Surface::standard(),
                &custom,
            );
            assert!(element.operations().click);
        }
    }

    mod read_value_tests {
        use super::*;

        #[test]
        fn test_accessors() {
            assert_eq!(ReadValue::Text("a".to_string()).as_text(), Some("a"));
            assert_eq!(ReadValue::Text("a".to_string()).as_flag(), None);
            assert_eq!(ReadValue::Flag(true).as_flag(), Some(true));
        }

        #[test]
        fn test_display() {
            assert_eq!(ReadValue::Text("hi".to_string()).to_string(), "hi");
            assert_eq!(ReadValue::Flag(false).to_string(), "false");
        }
    }
}
