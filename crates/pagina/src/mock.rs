//! In-memory element provider for exercising page objects without a
//! browser.
//!
//! [`MockDom`] holds a tree of [`MockNode`]s and acts as the provider
//! root scope. Every provider call is recorded in a [`CallLog`], so tests
//! can assert exactly which lookups and interactions a compiled accessor
//! performed. Nodes hand out lazy handles the way a real provider does:
//! a miss returns an absent handle whose interactions fail with the
//! provider's timeout error.

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use regex::Regex;

use crate::criteria::{Criteria, CriterionValue};
use crate::plural::singular_of;
use crate::provider::{Element, ElementRef, Scope, ScopeRef, SetValue, Surface};
use crate::result::{PaginaError, PaginaResult};

/// Timeout reported by absent-element interactions
pub const MOCK_TIMEOUT_MS: u64 = 5000;

/// Shared record of provider calls, in invocation order
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl CallLog {
    /// Append an entry
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    /// All entries, in invocation order
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Number of entries starting with the given prefix
    #[must_use]
    pub fn count_matching(&self, prefix: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    /// Discard all entries
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

/// A fake UI element node, buildable into a tree
#[derive(Clone)]
pub struct MockNode {
    inner: Rc<NodeInner>,
}

struct NodeInner {
    tag: String,
    attrs: RefCell<BTreeMap<String, String>>,
    text: RefCell<String>,
    value: RefCell<String>,
    checked: Cell<bool>,
    visible: Cell<bool>,
    present: Cell<bool>,
    enabled: Cell<bool>,
    accepts_set: Cell<bool>,
    options: RefCell<Vec<String>>,
    selected: RefCell<Option<String>>,
    clicks: Cell<u32>,
    keys_sent: RefCell<Vec<String>>,
    children: RefCell<Vec<MockNode>>,
    surface: OnceCell<Rc<Surface>>,
    log: OnceCell<CallLog>,
}

impl fmt::Debug for MockNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockNode")
            .field("tag", &self.inner.tag)
            .field("attrs", &self.inner.attrs.borrow())
            .field("children", &self.inner.children.borrow().len())
            .finish_non_exhaustive()
    }
}

fn criterion_matches_str(value: &CriterionValue, actual: &str) -> bool {
    match value {
        CriterionValue::Text(text) => text == actual,
        CriterionValue::Pattern(pattern) => Regex::new(pattern)
            .map(|re| re.is_match(actual))
            .unwrap_or(false),
        CriterionValue::Number(number) => actual == number.to_string(),
        CriterionValue::Flag(flag) => actual == flag.to_string(),
    }
}

/// Map a plural query method back to the tag it selects
fn query_tag(surface: &Surface, method: &str) -> String {
    if let Some(singular) = singular_of(surface, method) {
        return singular;
    }
    for suffix in ["es", "s"] {
        if let Some(base) = method.strip_suffix(suffix) {
            if surface.has_method(base) {
                return base.to_string();
            }
        }
    }
    method.to_string()
}

impl MockNode {
    /// Create a visible, present node with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                tag: tag.into(),
                attrs: RefCell::new(BTreeMap::new()),
                text: RefCell::new(String::new()),
                value: RefCell::new(String::new()),
                checked: Cell::new(false),
                visible: Cell::new(true),
                present: Cell::new(true),
                enabled: Cell::new(true),
                accepts_set: Cell::new(true),
                options: RefCell::new(Vec::new()),
                selected: RefCell::new(None),
                clicks: Cell::new(0),
                keys_sent: RefCell::new(Vec::new()),
                children: RefCell::new(Vec::new()),
                surface: OnceCell::new(),
                log: OnceCell::new(),
            }),
        }
    }

    /// Set an attribute, builder style
    #[must_use]
    pub fn attr(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.inner.attrs.borrow_mut().insert(key.into(), value.into());
        self
    }

    /// Set the visible text, builder style
    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        *self.inner.text.borrow_mut() = text.into();
        self
    }

    /// Set the current value, builder style
    #[must_use]
    pub fn value(self, value: impl Into<String>) -> Self {
        *self.inner.value.borrow_mut() = value.into();
        self
    }

    /// Set the checked state, builder style
    #[must_use]
    pub fn checked(self, checked: bool) -> Self {
        self.inner.checked.set(checked);
        self
    }

    /// Mark the node invisible, builder style
    #[must_use]
    pub fn hidden(self) -> Self {
        self.inner.visible.set(false);
        self
    }

    /// Mark the node disabled, builder style
    #[must_use]
    pub fn disabled(self) -> Self {
        self.inner.enabled.set(false);
        self
    }

    /// Define the selectable options, builder style
    #[must_use]
    pub fn options(self, options: &[&str]) -> Self {
        *self.inner.options.borrow_mut() =
            options.iter().map(|option| (*option).to_string()).collect();
        self
    }

    /// Pre-select an option, builder style
    #[must_use]
    pub fn selected(self, label: impl Into<String>) -> Self {
        *self.inner.selected.borrow_mut() = Some(label.into());
        self
    }

    /// Remove the generic set operation so set accessors fall back to
    /// keystroke simulation, builder style
    #[must_use]
    pub fn without_set(self) -> Self {
        self.inner.accepts_set.set(false);
        self
    }

    /// Attach a child node, builder style
    #[must_use]
    pub fn child(self, node: MockNode) -> Self {
        self.inner.children.borrow_mut().push(node);
        self
    }

    /// Times the node was clicked
    #[must_use]
    pub fn clicks(&self) -> u32 {
        self.inner.clicks.get()
    }

    /// Keystroke batches sent to the node
    #[must_use]
    pub fn keys_sent(&self) -> Vec<String> {
        self.inner.keys_sent.borrow().clone()
    }

    /// The node's current value
    #[must_use]
    pub fn current_value(&self) -> String {
        self.inner.value.borrow().clone()
    }

    /// The node's checked state
    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.inner.checked.get()
    }

    /// The currently selected option label
    #[must_use]
    pub fn selected_label(&self) -> Option<String> {
        self.inner.selected.borrow().clone()
    }

    fn adopt(&self, surface: &Rc<Surface>, log: &CallLog) {
        let _ = self.inner.surface.set(Rc::clone(surface));
        let _ = self.inner.log.set(log.clone());
        for child in self.inner.children.borrow().iter() {
            child.adopt(surface, log);
        }
    }

    fn log(&self) -> &CallLog {
        self.inner.log.get_or_init(CallLog::default)
    }

    fn surface_rc(&self) -> &Rc<Surface> {
        self.inner
            .surface
            .get_or_init(|| Rc::new(Surface::standard()))
    }

    fn describe(&self) -> String {
        self.inner.attrs.borrow().get("id").map_or_else(
            || self.inner.tag.clone(),
            |id| format!("{}#{}", self.inner.tag, id),
        )
    }

    fn log_call(&self, op: &str, tag: &str, criteria: &Criteria) {
        if criteria.is_empty() {
            self.log().record(format!("{op}({tag})"));
        } else {
            self.log().record(format!("{op}({tag}, {criteria})"));
        }
    }

    fn matches(&self, tag: &str, criteria: &Criteria) -> bool {
        if tag != "element" && self.inner.tag != tag {
            return false;
        }
        criteria.iter().all(|(key, value)| match key {
            "tag_name" => criterion_matches_str(value, &self.inner.tag),
            "visible" => value.as_flag() == Some(self.inner.visible.get()),
            _ => self
                .inner
                .attrs
                .borrow()
                .get(key)
                .map_or(false, |actual| criterion_matches_str(value, actual)),
        })
    }

    fn collect_into(&self, tag: &str, criteria: &Criteria, out: &mut Vec<MockNode>) {
        for child in self.inner.children.borrow().iter() {
            if child.matches(tag, criteria) {
                out.push(child.clone());
            }
            child.collect_into(tag, criteria, out);
        }
    }

    fn ghost(&self, tag: &str) -> MockNode {
        let node = MockNode::new(tag);
        node.inner.present.set(false);
        let _ = node.inner.surface.set(Rc::clone(self.surface_rc()));
        let _ = node.inner.log.set(self.log().clone());
        node
    }

    fn ensure_present(&self) -> PaginaResult<()> {
        if self.inner.present.get() {
            Ok(())
        } else {
            Err(PaginaError::Timeout {
                ms: MOCK_TIMEOUT_MS,
            })
        }
    }
}

impl Scope for MockNode {
    fn surface(&self) -> &Surface {
        self.surface_rc()
    }

    fn exists(&self) -> bool {
        self.inner.present.get()
    }

    fn find(&self, tag: &str, criteria: &Criteria) -> PaginaResult<ElementRef> {
        self.log_call("find", tag, criteria);
        let mut matches = Vec::new();
        self.collect_into(tag, criteria, &mut matches);
        match matches.into_iter().next() {
            Some(node) => Ok(Rc::new(node) as ElementRef),
            None => Ok(Rc::new(self.ghost(tag)) as ElementRef),
        }
    }

    fn find_all(&self, plural_tag: &str, criteria: &Criteria) -> PaginaResult<Vec<ElementRef>> {
        self.log_call("find_all", plural_tag, criteria);
        let tag = query_tag(self.surface(), plural_tag);
        let mut matches = Vec::new();
        self.collect_into(&tag, criteria, &mut matches);
        Ok(matches
            .into_iter()
            .map(|node| Rc::new(node) as ElementRef)
            .collect())
    }
}

impl Element for MockNode {
    fn tag(&self) -> &str {
        &self.inner.tag
    }

    fn click(&self) -> PaginaResult<()> {
        self.log().record(format!("click({})", self.describe()));
        self.ensure_present()?;
        self.inner.clicks.set(self.inner.clicks.get() + 1);
        Ok(())
    }

    fn text(&self) -> PaginaResult<String> {
        self.log().record(format!("text({})", self.describe()));
        self.ensure_present()?;
        Ok(self.inner.text.borrow().clone())
    }

    fn value(&self) -> PaginaResult<String> {
        self.log().record(format!("value({})", self.describe()));
        self.ensure_present()?;
        Ok(self.inner.value.borrow().clone())
    }

    fn selected_option(&self) -> PaginaResult<String> {
        self.log()
            .record(format!("selected_option({})", self.describe()));
        self.ensure_present()?;
        self.inner
            .selected
            .borrow()
            .clone()
            .ok_or_else(|| PaginaError::Provider {
                message: format!("no option selected in {}", self.describe()),
            })
    }

    fn is_on(&self) -> PaginaResult<bool> {
        self.log().record(format!("is_on({})", self.describe()));
        self.ensure_present()?;
        Ok(self.inner.checked.get())
    }

    fn accepts_set(&self) -> bool {
        self.inner.accepts_set.get()
    }

    fn set(&self, value: &SetValue) -> PaginaResult<()> {
        self.log()
            .record(format!("set({}, {})", self.describe(), value.as_keys()));
        self.ensure_present()?;
        match value {
            SetValue::Flag(flag) => self.inner.checked.set(*flag),
            SetValue::Text(text) => *self.inner.value.borrow_mut() = text.clone(),
        }
        Ok(())
    }

    fn send_keys(&self, keys: &str) -> PaginaResult<()> {
        self.log()
            .record(format!("send_keys({}, {keys})", self.describe()));
        self.ensure_present()?;
        self.inner.keys_sent.borrow_mut().push(keys.to_string());
        self.inner.value.borrow_mut().push_str(keys);
        Ok(())
    }

    fn select_option(&self, label: &str) -> PaginaResult<()> {
        self.log()
            .record(format!("select_option({}, {label})", self.describe()));
        self.ensure_present()?;
        if self.inner.options.borrow().iter().any(|option| option == label) {
            *self.inner.selected.borrow_mut() = Some(label.to_string());
            Ok(())
        } else {
            Err(PaginaError::Provider {
                message: format!("no option {label:?} in {}", self.describe()),
            })
        }
    }

    fn eval_predicate(&self, name: &str) -> PaginaResult<bool> {
        match name {
            "visible" => Ok(self.inner.visible.get()),
            "enabled" => Ok(self.inner.enabled.get()),
            "present" => Ok(self.inner.present.get()),
            "checked" => Ok(self.inner.checked.get()),
            "multiple" => Ok(false),
            _ => Err(PaginaError::Provider {
                message: format!("unknown predicate {name:?} on {}", self.describe()),
            }),
        }
    }

    fn eval_predicate_with(&self, name: &str, value: &CriterionValue) -> PaginaResult<bool> {
        match name {
            "selected" => Ok(self.inner.selected.borrow().as_deref() == value.as_text()),
            _ => Err(PaginaError::Provider {
                message: format!("unknown predicate {name:?} on {}", self.describe()),
            }),
        }
    }

    fn into_scope(self: Rc<Self>) -> ScopeRef {
        self
    }
}

/// The provider root: a node tree plus the shared call log
pub struct MockDom {
    root: MockNode,
    log: CallLog,
    surface: Rc<Surface>,
}

impl fmt::Debug for MockDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDom")
            .field("root", &self.root)
            .field("calls", &self.log.entries().len())
            .finish()
    }
}

impl MockDom {
    /// Wire a node tree up as a provider with the standard surface
    #[must_use]
    pub fn new(root: MockNode) -> Self {
        Self::with_surface(root, Surface::standard())
    }

    /// Wire a node tree up as a provider with a custom surface
    #[must_use]
    pub fn with_surface(root: MockNode, surface: Surface) -> Self {
        let surface = Rc::new(surface);
        let log = CallLog::default();
        root.adopt(&surface, &log);
        Self { root, log, surface }
    }

    /// The root scope handle to construct pages against
    #[must_use]
    pub fn scope(&self) -> ScopeRef {
        Rc::new(self.root.clone())
    }

    /// The shared call log
    #[must_use]
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// The root node
    #[must_use]
    pub fn root(&self) -> &MockNode {
        &self.root
    }

    /// The provider surface
    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom() -> MockDom {
        MockDom::new(
            MockNode::new("browser")
                .child(
                    MockNode::new("div")
                        .attr("id", "header")
                        .text("Header")
                        .child(MockNode::new("span").attr("class", "badge").text("3")),
                )
                .child(MockNode::new("div").attr("id", "footer").hidden()),
        )
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn test_find_returns_handle_sharing_state() {
            let dom = dom();
            let found = dom
                .root()
                .find("div", &Criteria::new().with("id", "header"))
                .unwrap();
            assert_eq!(found.tag(), "div");
            assert_eq!(found.text().unwrap(), "Header");
        }

        #[test]
        fn test_find_miss_returns_absent_handle() {
            let dom = dom();
            let ghost = dom
                .root()
                .find("div", &Criteria::new().with("id", "missing"))
                .unwrap();
            assert!(!ghost.exists());
            assert!(matches!(
                ghost.text().unwrap_err(),
                PaginaError::Timeout { ms: MOCK_TIMEOUT_MS }
            ));
        }

        #[test]
        fn test_find_all_maps_plural_method() {
            let dom = dom();
            let divs = dom.root().find_all("divs", &Criteria::new()).unwrap();
            assert_eq!(divs.len(), 2);
        }

        #[test]
        fn test_generic_elements_query_ignores_tag() {
            let dom = dom();
            let all = dom.root().find_all("elements", &Criteria::new()).unwrap();
            assert_eq!(all.len(), 3);
        }

        #[test]
        fn test_visible_criterion_matches_visibility() {
            let dom = dom();
            let visible = dom
                .root()
                .find_all("divs", &Criteria::new().with("visible", true))
                .unwrap();
            assert_eq!(visible.len(), 1);
        }

        #[test]
        fn test_tag_name_criterion() {
            let dom = dom();
            let spans = dom
                .root()
                .find_all("elements", &Criteria::new().with("tag_name", "span"))
                .unwrap();
            assert_eq!(spans.len(), 1);
        }

        #[test]
        fn test_nested_scope_lookup() {
            let dom = dom();
            let header = dom
                .root()
                .find("div", &Criteria::new().with("id", "header"))
                .unwrap();
            let badge = header
                .find("span", &Criteria::new().with("class", "badge"))
                .unwrap();
            assert_eq!(badge.text().unwrap(), "3");
        }
    }

    mod log_tests {
        use super::*;

        #[test]
        fn test_find_entries_include_criteria() {
            let dom = dom();
            let _ = dom
                .root()
                .find("div", &Criteria::new().with("id", "header"))
                .unwrap();
            assert_eq!(dom.log().entries(), vec!["find(div, id=\"header\")"]);
        }

        #[test]
        fn test_count_matching() {
            let dom = dom();
            let _ = dom.root().find_all("divs", &Criteria::new()).unwrap();
            let _ = dom.root().find_all("divs", &Criteria::new()).unwrap();
            assert_eq!(dom.log().count_matching("find_all("), 2);
            dom.log().clear();
            assert!(dom.log().entries().is_empty());
        }
    }

    mod interaction_tests {
        use super::*;

        #[test]
        fn test_click_counts() {
            let node = MockNode::new("button");
            let dom = MockDom::new(MockNode::new("browser").child(node.clone()));
            let found = dom.root().find("button", &Criteria::new()).unwrap();
            found.click().unwrap();
            assert_eq!(node.clicks(), 1);
        }

        #[test]
        fn test_send_keys_appends() {
            let node = MockNode::new("text_field").value("ab");
            let _dom = MockDom::new(MockNode::new("browser").child(node.clone()));
            node.send_keys("cd").unwrap();
            assert_eq!(node.current_value(), "abcd");
            assert_eq!(node.keys_sent(), vec!["cd"]);
        }

        #[test]
        fn test_select_option_requires_known_label() {
            let node = MockNode::new("select_list").options(&["USA", "Russia"]);
            let _dom = MockDom::new(MockNode::new("browser").child(node.clone()));
            node.select_option("Russia").unwrap();
            assert_eq!(node.selected_label().as_deref(), Some("Russia"));
            assert!(node.select_option("Mars").is_err());
        }

        #[test]
        fn test_predicates() {
            let node = MockNode::new("checkbox").checked(true);
            let _dom = MockDom::new(MockNode::new("browser").child(node.clone()));
            assert!(node.eval_predicate("checked").unwrap());
            assert!(node.eval_predicate("visible").unwrap());
            assert!(node.eval_predicate("no_such").is_err());

            let list = MockNode::new("select_list").selected("USA");
            assert!(list
                .eval_predicate_with("selected", &CriterionValue::from("USA"))
                .unwrap());
            assert!(!list
                .eval_predicate_with("selected", &CriterionValue::from("Russia"))
                .unwrap());
        }
    }
}
