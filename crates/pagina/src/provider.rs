//! Element-provider contract.
//!
//! The core never talks to a browser directly. It consumes a provider
//! through two traits: [`Scope`], something elements can be looked up
//! within, and [`Element`], a located element that can be read, clicked,
//! or written, and that acts as a further scope for nested lookups.
//!
//! # Design Philosophy
//!
//! - **Lazy handles**: `find` always returns a handle; whether the element
//!   is actually on the page is observable via [`Element::exists`]. Waiting
//!   and polling are entirely the provider's concern.
//! - **Explicit surface**: the provider enumerates its method surface and
//!   the state predicates each element type supports in a [`Surface`]
//!   value. No reflection is involved anywhere.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::criteria::{Criteria, CriterionValue};
use crate::result::PaginaResult;

/// Shared handle to a located element
pub type ElementRef = Rc<dyn Element>;

/// Shared handle to a lookup scope (the provider root or an element)
pub type ScopeRef = Rc<dyn Scope>;

/// Argument count of an element state predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateArity {
    /// Probes current state; compared against the expected flag
    Nullary,
    /// Invoked with the expected value; the result is the verdict
    Unary,
}

/// Value accepted by a set accessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValue {
    /// Text to assign or type
    Text(String),
    /// On/off state for checkbox-like elements
    Flag(bool),
}

impl SetValue {
    /// Render the value as a keystroke sequence for the send-keys fallback
    #[must_use]
    pub fn as_keys(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Flag(flag) => flag.to_string(),
        }
    }
}

impl From<&str> for SetValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SetValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for SetValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// The provider's known method surface.
///
/// Holds every tag method name the provider understands, singular and
/// plural, plus the state predicates each element type supports. The
/// pluralization resolver and the locator partitioner both consult it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Surface {
    methods: BTreeSet<String>,
    predicates: BTreeMap<String, BTreeMap<String, PredicateArity>>,
}

/// Tags on the standard surface, paired with their plural method names.
const STANDARD_TAGS: &[(&str, &str)] = &[
    ("element", "elements"),
    ("div", "divs"),
    ("span", "spans"),
    ("p", "ps"),
    ("a", "as"),
    ("link", "links"),
    ("button", "buttons"),
    ("h1", "h1s"),
    ("h2", "h2s"),
    ("h3", "h3s"),
    ("h4", "h4s"),
    ("h5", "h5s"),
    ("h6", "h6s"),
    ("li", "lis"),
    ("ul", "uls"),
    ("ol", "ols"),
    ("img", "imgs"),
    ("form", "forms"),
    ("text_field", "text_fields"),
    ("textarea", "textareas"),
    ("checkbox", "checkboxes"),
    ("radio", "radios"),
    ("select_list", "select_lists"),
    ("file_field", "file_fields"),
];

impl Surface {
    /// Create an empty surface
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard HTML-ish surface: common tags with their plural forms,
    /// `visible`/`enabled`/`present` predicates everywhere, `selected` and
    /// `multiple` on selection lists, and `checked` on checkbox/radio.
    #[must_use]
    pub fn standard() -> Self {
        let mut surface = Self::new();
        for &(singular, plural) in STANDARD_TAGS {
            surface.add_method(singular);
            surface.add_method(plural);
            surface.add_predicate(singular, "visible", PredicateArity::Nullary);
            surface.add_predicate(singular, "enabled", PredicateArity::Nullary);
            surface.add_predicate(singular, "present", PredicateArity::Nullary);
        }
        surface.add_predicate("select_list", "selected", PredicateArity::Unary);
        surface.add_predicate("select_list", "multiple", PredicateArity::Nullary);
        surface.add_predicate("checkbox", "checked", PredicateArity::Nullary);
        surface.add_predicate("radio", "checked", PredicateArity::Nullary);
        surface
    }

    /// Register a tag method name
    pub fn add_method(&mut self, method: impl Into<String>) {
        let _ = self.methods.insert(method.into());
    }

    /// Register a tag method name, builder style
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.add_method(method);
        self
    }

    /// Register a state predicate supported by a tag's element type
    pub fn add_predicate(
        &mut self,
        tag: impl Into<String>,
        name: impl Into<String>,
        arity: PredicateArity,
    ) {
        let _ = self
            .predicates
            .entry(tag.into())
            .or_default()
            .insert(name.into(), arity);
    }

    /// Register a state predicate, builder style
    #[must_use]
    pub fn with_predicate(
        mut self,
        tag: impl Into<String>,
        name: impl Into<String>,
        arity: PredicateArity,
    ) -> Self {
        self.add_predicate(tag, name, arity);
        self
    }

    /// Whether the provider exposes the given tag method
    #[must_use]
    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    /// Arity of the given predicate on the given tag, if supported
    #[must_use]
    pub fn predicate_arity(&self, tag: &str, name: &str) -> Option<PredicateArity> {
        self.predicates.get(tag)?.get(name).copied()
    }

    /// All known tag method names
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }
}

/// Something elements can be looked up within: the provider root or a
/// located element acting as a sub-scope.
pub trait Scope {
    /// The provider's method surface
    fn surface(&self) -> &Surface;

    /// Whether this scope currently exists on the page
    fn exists(&self) -> bool;

    /// Locate one element by tag and native criteria.
    ///
    /// Always returns a handle; absence is observable via
    /// [`Element::exists`]. The provider owns any waiting or polling.
    ///
    /// # Errors
    ///
    /// Returns the provider's own error for lookup failures.
    fn find(&self, tag: &str, criteria: &Criteria) -> PaginaResult<ElementRef>;

    /// Locate every matching element by plural tag method and native
    /// criteria, in document order. Empty when nothing matches or the
    /// scope itself is absent.
    ///
    /// # Errors
    ///
    /// Returns the provider's own error for lookup failures.
    fn find_all(&self, plural_tag: &str, criteria: &Criteria) -> PaginaResult<Vec<ElementRef>>;
}

/// A located element.
///
/// Interaction errors, including not-found and timeout conditions from
/// the provider's own waiting, are propagated to accessor callers
/// unmodified.
pub trait Element: Scope + std::fmt::Debug {
    /// Tag this element was located as
    fn tag(&self) -> &str;

    /// Perform the element's primary activation action
    fn click(&self) -> PaginaResult<()>;

    /// Visible text content
    fn text(&self) -> PaginaResult<String>;

    /// Current value of an input-like element
    fn value(&self) -> PaginaResult<String>;

    /// Label of the currently selected option of a selection list
    fn selected_option(&self) -> PaginaResult<String>;

    /// Checked state of a checkbox or radio element
    fn is_on(&self) -> PaginaResult<bool>;

    /// Whether the element exposes a generic set operation
    fn accepts_set(&self) -> bool;

    /// Assign a value through the generic set operation
    fn set(&self, value: &SetValue) -> PaginaResult<()>;

    /// Simulate keystrokes into the element
    fn send_keys(&self, keys: &str) -> PaginaResult<()>;

    /// Select the option with the given label
    fn select_option(&self, label: &str) -> PaginaResult<()>;

    /// Evaluate a nullary state predicate
    fn eval_predicate(&self, name: &str) -> PaginaResult<bool>;

    /// Evaluate a unary state predicate against an expected value
    fn eval_predicate_with(&self, name: &str, value: &CriterionValue) -> PaginaResult<bool>;

    /// Treat this element as a scope for nested lookups
    fn into_scope(self: Rc<Self>) -> ScopeRef;
}
