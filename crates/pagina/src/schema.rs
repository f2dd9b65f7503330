//! Schemas: the declaration-time description of a page or region class.
//!
//! A [`SchemaBuilder`] is the declaration mini-language. Element and
//! region declarations accumulate on the builder; [`SchemaBuilder::build`]
//! compiles every element accessor against a capability snapshot and
//! produces an immutable [`Schema`] shared by all instances.
//!
//! Region class inference resolves through a [`Namespace`], an explicit
//! registry mapping class names to schemas. Schemas built with a name and
//! a namespace register themselves automatically.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::accessor::{CompiledElement, DeclaredLookup, ElementResolver};
use crate::capability::{self, CapabilityRegistry};
use crate::criteria::Criteria;
use crate::initializer::InitializerHook;
use crate::provider::{ElementRef, Surface};
use crate::region::{Entity, ManyRegions};
use crate::result::PaginaResult;

/// Page-level constructor hook, invoked once at instance construction
pub type ConstructorFn = Rc<dyn Fn(&Entity) -> PaginaResult<()>>;

/// Post-processor for a one-region accessor
pub type OneOverrideFn = Rc<dyn Fn(&Entity, Entity) -> PaginaResult<Entity>>;

/// Post-processor for a many-region accessor
pub type ManyOverrideFn = Rc<dyn Fn(&Entity, ManyRegions) -> PaginaResult<ManyRegions>>;

/// Resolver evaluated in the instance's context to produce a region scope
pub type ScopeResolverFn = Rc<dyn Fn(&Entity) -> PaginaResult<ElementRef>>;

/// How many entities a region declaration produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// A single region instance
    One,
    /// An ordered sequence of region instances
    Many,
}

/// How a region's scope element is resolved
#[derive(Clone)]
pub enum ScopeSpec {
    /// The owning instance's own scope
    Inherit,
    /// One sub-element of the current scope, located by criteria
    Criteria(Criteria),
    /// A function evaluated in the instance's context
    Resolver(ScopeResolverFn),
}

impl fmt::Debug for ScopeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherit => write!(f, "Inherit"),
            Self::Criteria(criteria) => write!(f, "Criteria({criteria})"),
            Self::Resolver(_) => write!(f, "Resolver(..)"),
        }
    }
}

/// How a region's class is chosen
#[derive(Clone)]
pub(crate) enum ClassSpec {
    /// Explicitly supplied (or built from an inline body)
    Explicit(Rc<Schema>),
    /// Inferred from the region name through the namespace
    Inferred,
}

/// A compiled region declaration
pub(crate) struct RegionDecl {
    pub(crate) name: String,
    pub(crate) cardinality: Cardinality,
    pub(crate) scope: ScopeSpec,
    pub(crate) class: ClassSpec,
    pub(crate) collection_class: Option<Rc<Schema>>,
    pub(crate) each: Option<Criteria>,
    pub(crate) finder: Option<String>,
}

/// Options for a region declaration
#[derive(Default)]
pub struct RegionSpec {
    scope: Option<ScopeSpec>,
    class: Option<Rc<Schema>>,
    collection_class: Option<Rc<Schema>>,
    inline: Option<Box<dyn FnOnce(SchemaBuilder) -> SchemaBuilder>>,
    finder: Option<String>,
}

impl fmt::Debug for RegionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionSpec")
            .field("scope", &self.scope)
            .field("explicit_class", &self.class.is_some())
            .field("collection_class", &self.collection_class.is_some())
            .field("inline", &self.inline.is_some())
            .field("finder", &self.finder)
            .finish()
    }
}

impl RegionSpec {
    /// Default options: inherited scope, inferred class
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope the region to a sub-element located by criteria
    #[must_use]
    pub fn within(mut self, criteria: Criteria) -> Self {
        self.scope = Some(ScopeSpec::Criteria(criteria));
        self
    }

    /// Scope the region through a resolver evaluated in the instance's
    /// context
    #[must_use]
    pub fn within_resolver(
        mut self,
        resolver: impl Fn(&Entity) -> PaginaResult<ElementRef> + 'static,
    ) -> Self {
        self.scope = Some(ScopeSpec::Resolver(Rc::new(resolver)));
        self
    }

    /// Use an explicit region class
    #[must_use]
    pub fn region_class(mut self, schema: &Rc<Schema>) -> Self {
        self.class = Some(Rc::clone(schema));
        self
    }

    /// Wrap a many-region in an explicit collection class
    #[must_use]
    pub fn collection_class(mut self, schema: &Rc<Schema>) -> Self {
        self.collection_class = Some(Rc::clone(schema));
        self
    }

    /// Declare the region class inline. The body receives an anonymous
    /// builder sharing the declaring schema's surface and capabilities.
    #[must_use]
    pub fn inline(mut self, body: impl FnOnce(SchemaBuilder) -> SchemaBuilder + 'static) -> Self {
        self.inline = Some(Box::new(body));
        self
    }

    /// Declare a companion finder accessor under the given name
    #[must_use]
    pub fn finder(mut self, name: impl Into<String>) -> Self {
        self.finder = Some(name.into());
        self
    }
}

/// Explicit registry mapping region class names to schemas.
///
/// Replaces lexical namespace lookup: schemas register under their class
/// name, and region class inference resolves inferred names here.
#[derive(Clone, Default)]
pub struct Namespace {
    inner: Rc<RefCell<HashMap<String, Rc<Schema>>>>,
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("classes", &self.inner.borrow().len())
            .finish()
    }
}

impl Namespace {
    /// Create an empty namespace
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under a class name
    pub fn register(&self, name: impl Into<String>, schema: Rc<Schema>) {
        let _ = self.inner.borrow_mut().insert(name.into(), schema);
    }

    /// Resolve a class name to its schema
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Rc<Schema>> {
        self.inner.borrow().get(name).cloned()
    }

    /// Whether a class name is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.borrow().contains_key(name)
    }

    /// Registered class names, sorted
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Class name inferred from a region name: camel-cased on underscores,
/// with one trailing `s` stripped for collection members, plus the
/// `Region` suffix.
pub(crate) fn inferred_class_name(region_name: &str, strip_collection_plural: bool) -> String {
    let mut camel: String = region_name
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect();
    if strip_collection_plural && camel.ends_with('s') {
        let _ = camel.pop();
    }
    camel.push_str("Region");
    camel
}

/// Immutable description of a page or region class
pub struct Schema {
    name: Option<String>,
    namespace: Option<Namespace>,
    surface: Rc<Surface>,
    elements: HashMap<String, Rc<CompiledElement>>,
    regions: HashMap<String, RegionDecl>,
    constructor: Option<ConstructorFn>,
    initializers: Vec<InitializerHook>,
    one_overrides: HashMap<String, OneOverrideFn>,
    many_overrides: HashMap<String, ManyOverrideFn>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("elements", &self.elements.len())
            .field("regions", &self.regions.len())
            .field("initializers", &self.initializers.len())
            .finish_non_exhaustive()
    }
}

impl Schema {
    /// Class name, if the schema was built with one
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The provider surface the schema was compiled against
    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// The namespace the schema resolves region classes in
    #[must_use]
    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// Declared element names, sorted
    #[must_use]
    pub fn element_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.elements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Declared region names, sorted
    #[must_use]
    pub fn region_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.regions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn element(&self, name: &str) -> Option<&Rc<CompiledElement>> {
        self.elements.get(name)
    }

    pub(crate) fn region_decl(&self, name: &str) -> Option<&RegionDecl> {
        self.regions.get(name)
    }

    pub(crate) fn finder_region(&self, finder: &str) -> Option<&RegionDecl> {
        self.regions
            .values()
            .find(|decl| decl.finder.as_deref() == Some(finder))
    }

    pub(crate) fn constructor(&self) -> Option<&ConstructorFn> {
        self.constructor.as_ref()
    }

    pub(crate) fn initializers(&self) -> &[InitializerHook] {
        &self.initializers
    }

    pub(crate) fn one_override(&self, name: &str) -> Option<&OneOverrideFn> {
        self.one_overrides.get(name)
    }

    pub(crate) fn many_override(&self, name: &str) -> Option<&ManyOverrideFn> {
        self.many_overrides.get(name)
    }
}

/// Builder for page and region schemas
pub struct SchemaBuilder {
    name: Option<String>,
    namespace: Option<Namespace>,
    surface: Surface,
    capabilities: Option<CapabilityRegistry>,
    elements: HashMap<String, (String, DeclaredLookup)>,
    regions: HashMap<String, RegionDecl>,
    constructor: Option<ConstructorFn>,
    initializers: Vec<InitializerHook>,
    one_overrides: HashMap<String, OneOverrideFn>,
    many_overrides: HashMap<String, ManyOverrideFn>,
}

impl fmt::Debug for SchemaBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("name", &self.name)
            .field("elements", &self.elements.len())
            .field("regions", &self.regions.len())
            .finish_non_exhaustive()
    }
}

impl SchemaBuilder {
    /// Start a named schema
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            namespace: None,
            surface: Surface::standard(),
            capabilities: None,
            elements: HashMap::new(),
            regions: HashMap::new(),
            constructor: None,
            initializers: Vec::new(),
            one_overrides: HashMap::new(),
            many_overrides: HashMap::new(),
        }
    }

    /// Start an anonymous schema, as inline region bodies do. Anonymous
    /// schemas have no namespace, so nested class inference fails with
    /// an ambiguous-namespace error.
    #[must_use]
    pub fn anonymous() -> Self {
        let mut builder = Self::new("");
        builder.name = None;
        builder
    }

    /// Attach the namespace used for region class inference. Named
    /// schemas register themselves here at build time.
    #[must_use]
    pub fn in_namespace(mut self, namespace: &Namespace) -> Self {
        self.namespace = Some(namespace.clone());
        self
    }

    /// Compile against a non-standard provider surface
    #[must_use]
    pub fn surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }

    /// Compile against an explicit capability registry instead of a
    /// snapshot of the process-wide one
    #[must_use]
    pub fn capabilities(mut self, capabilities: CapabilityRegistry) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Declare an element. Declaring the same name twice overwrites the
    /// prior accessors.
    #[must_use]
    pub fn define(
        mut self,
        name: impl Into<String>,
        tag: impl Into<String>,
        criteria: Criteria,
    ) -> Self {
        let _ = self
            .elements
            .insert(name.into(), (tag.into(), DeclaredLookup::Criteria(criteria)));
        self
    }

    /// Declare an element with a resolver function instead of criteria
    #[must_use]
    pub fn resolver(
        mut self,
        name: impl Into<String>,
        tag: impl Into<String>,
        resolver: impl Fn(&Entity) -> PaginaResult<ElementRef> + 'static,
    ) -> Self {
        let resolver: ElementResolver = Rc::new(resolver);
        let _ = self
            .elements
            .insert(name.into(), (tag.into(), DeclaredLookup::Resolver(resolver)));
        self
    }

    /// Declare a generic element
    #[must_use]
    pub fn element(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "element", criteria)
    }

    /// Declare a div
    #[must_use]
    pub fn div(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "div", criteria)
    }

    /// Declare a span
    #[must_use]
    pub fn span(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "span", criteria)
    }

    /// Declare a paragraph
    #[must_use]
    pub fn p(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "p", criteria)
    }

    /// Declare a link
    #[must_use]
    pub fn link(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "link", criteria)
    }

    /// Declare a button
    #[must_use]
    pub fn button(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "button", criteria)
    }

    /// Declare a text field
    #[must_use]
    pub fn text_field(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "text_field", criteria)
    }

    /// Declare a textarea
    #[must_use]
    pub fn textarea(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "textarea", criteria)
    }

    /// Declare a checkbox
    #[must_use]
    pub fn checkbox(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "checkbox", criteria)
    }

    /// Declare a radio button
    #[must_use]
    pub fn radio(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "radio", criteria)
    }

    /// Declare a selection list
    #[must_use]
    pub fn select_list(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "select_list", criteria)
    }

    /// Declare a file field
    #[must_use]
    pub fn file_field(self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.define(name, "file_field", criteria)
    }

    /// Declare a single nested region
    #[must_use]
    pub fn has_one(mut self, name: impl Into<String>, spec: RegionSpec) -> Self {
        let name = name.into();
        let decl = self.region_decl_from(name.clone(), Cardinality::One, None, spec);
        let _ = self.regions.insert(name, decl);
        self
    }

    /// Declare a region collection. `each` selects the candidate element
    /// list within the region's scope.
    #[must_use]
    pub fn has_many(mut self, name: impl Into<String>, each: Criteria, spec: RegionSpec) -> Self {
        let name = name.into();
        let decl = self.region_decl_from(name.clone(), Cardinality::Many, Some(each), spec);
        let _ = self.regions.insert(name, decl);
        self
    }

    /// Register the page-level constructor hook
    #[must_use]
    pub fn constructor(mut self, hook: impl Fn(&Entity) -> PaginaResult<()> + 'static) -> Self {
        self.constructor = Some(Rc::new(hook));
        self
    }

    /// Register an on-region-ready initializer hook under a stable
    /// identifier. Hooks fire in registration order, once per instance.
    #[must_use]
    pub fn initializer(
        mut self,
        id: impl Into<String>,
        hook: impl Fn(&Entity) -> PaginaResult<()> + 'static,
    ) -> Self {
        self.initializers.push(InitializerHook::new(id, hook));
        self
    }

    /// Post-process a one-region accessor's result. The engine-generated
    /// implementation stays callable through `Entity::region_base`.
    #[must_use]
    pub fn override_one(
        mut self,
        region: impl Into<String>,
        hook: impl Fn(&Entity, Entity) -> PaginaResult<Entity> + 'static,
    ) -> Self {
        let _ = self.one_overrides.insert(region.into(), Rc::new(hook));
        self
    }

    /// Post-process a many-region accessor's result. The engine-generated
    /// implementation stays callable through `Entity::regions_base`.
    #[must_use]
    pub fn override_many(
        mut self,
        region: impl Into<String>,
        hook: impl Fn(&Entity, ManyRegions) -> PaginaResult<ManyRegions> + 'static,
    ) -> Self {
        let _ = self.many_overrides.insert(region.into(), Rc::new(hook));
        self
    }

    fn region_decl_from(
        &self,
        name: String,
        cardinality: Cardinality,
        each: Option<Criteria>,
        spec: RegionSpec,
    ) -> RegionDecl {
        let class = if let Some(schema) = spec.class {
            ClassSpec::Explicit(schema)
        } else if let Some(body) = spec.inline {
            let mut builder = SchemaBuilder::anonymous().surface(self.surface.clone());
            if let Some(capabilities) = &self.capabilities {
                builder = builder.capabilities(capabilities.clone());
            }
            ClassSpec::Explicit(body(builder).build())
        } else {
            ClassSpec::Inferred
        };
        RegionDecl {
            name,
            cardinality,
            scope: spec.scope.unwrap_or(ScopeSpec::Inherit),
            class,
            collection_class: spec.collection_class,
            each,
            finder: spec.finder,
        }
    }

    /// Compile the declarations into an immutable schema.
    ///
    /// Capability checks and criteria partitioning happen here, once,
    /// against the configured registry or a snapshot of the process-wide
    /// one. Named schemas with a namespace register themselves.
    #[must_use]
    pub fn build(self) -> Rc<Schema> {
        let capabilities = self.capabilities.unwrap_or_else(capability::snapshot);
        let surface = Rc::new(self.surface);
        let elements: HashMap<String, Rc<CompiledElement>> = self
            .elements
            .into_iter()
            .map(|(name, (tag, lookup))| {
                let compiled =
                    CompiledElement::compile(&name, &tag, lookup, &surface, &capabilities);
                (name, Rc::new(compiled))
            })
            .collect();
        tracing::debug!(
            schema = self.name.as_deref().unwrap_or("<anonymous>"),
            elements = elements.len(),
            regions = self.regions.len(),
            "built schema"
        );
        let schema = Rc::new(Schema {
            name: self.name,
            namespace: self.namespace,
            surface,
            elements,
            regions: self.regions,
            constructor: self.constructor,
            initializers: self.initializers,
            one_overrides: self.one_overrides,
            many_overrides: self.many_overrides,
        });
        if let (Some(namespace), Some(name)) = (&schema.namespace, &schema.name) {
            namespace.register(name.clone(), Rc::clone(&schema));
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod inference_tests {
        use super::*;

        #[test]
        fn test_single_region_name() {
            assert_eq!(inferred_class_name("todo_list", false), "TodoListRegion");
            assert_eq!(inferred_class_name("header", false), "HeaderRegion");
        }

        #[test]
        fn test_collection_member_name_strips_one_trailing_s() {
            assert_eq!(inferred_class_name("todo_lists", true), "TodoListRegion");
            assert_eq!(inferred_class_name("items", true), "ItemRegion");
        }

        #[test]
        fn test_collection_wrapper_name_keeps_plural() {
            assert_eq!(inferred_class_name("todo_lists", false), "TodoListsRegion");
        }
    }

    mod namespace_tests {
        use super::*;

        #[test]
        fn test_register_and_resolve() {
            let namespace = Namespace::new();
            let schema = SchemaBuilder::new("HeaderRegion").build();
            namespace.register("HeaderRegion", schema);
            assert!(namespace.contains("HeaderRegion"));
            assert!(namespace.resolve("HeaderRegion").is_some());
            assert!(namespace.resolve("FooterRegion").is_none());
        }

        #[test]
        fn test_named_schema_self_registers() {
            let namespace = Namespace::new();
            let _schema = SchemaBuilder::new("SidebarRegion")
                .in_namespace(&namespace)
                .build();
            assert_eq!(namespace.list(), vec!["SidebarRegion".to_string()]);
        }

        #[test]
        fn test_anonymous_schema_does_not_register() {
            let namespace = Namespace::new();
            let _schema = SchemaBuilder::anonymous().in_namespace(&namespace).build();
            assert!(namespace.list().is_empty());
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn test_duplicate_declaration_overwrites() {
            let schema = SchemaBuilder::new("Page")
                .div("target", Criteria::new().with("id", "a"))
                .button("target", Criteria::new().with("id", "b"))
                .build();
            assert_eq!(schema.element_names(), vec!["target"]);
            let element = schema.element("target").unwrap();
            assert_eq!(element.tag(), "button");
            assert!(element.operations().click);
        }

        #[test]
        fn test_declared_names_listed() {
            let schema = SchemaBuilder::new("Page")
                .text_field("name", Criteria::new().with("id", "name"))
                .has_one("header", RegionSpec::new())
                .build();
            assert_eq!(schema.element_names(), vec!["name"]);
            assert_eq!(schema.region_names(), vec!["header"]);
        }

        #[test]
        fn test_finder_lookup() {
            let schema = SchemaBuilder::new("Page")
                .has_many(
                    "rows",
                    Criteria::new().with("role", "row"),
                    RegionSpec::new().finder("row"),
                )
                .build();
            assert!(schema.finder_region("row").is_some());
            assert!(schema.finder_region("column").is_none());
        }
    }
}
