//! Runtime entities and the region composition engine.
//!
//! An [`Entity`] is a constructed page or region: a schema, a provider
//! scope, and an optional parent back-reference. Region accessors are
//! stateless across invocations; every call re-resolves the region's
//! class and scope and constructs fresh instances, so nothing is cached
//! unless the caller keeps the returned value.
//!
//! Collections come in two shapes: a plain ordered sequence of region
//! instances, or a [`RegionCollection`] wrapper when a collection class
//! is declared or inferred. Members of a wrapped collection point their
//! parent at the collection instance instead of the declaring page.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::accessor::{CompiledElement, ReadValue};
use crate::criteria::Criteria;
use crate::initializer::FiredSet;
use crate::provider::{ElementRef, ScopeRef, SetValue};
use crate::result::{PaginaError, PaginaResult};
use crate::schema::{inferred_class_name, Cardinality, ClassSpec, RegionDecl, Schema, ScopeSpec};

/// A constructed page or region instance.
///
/// Cheap to clone; clones share the underlying instance.
#[derive(Clone)]
pub struct Entity {
    inner: Rc<EntityInner>,
}

struct EntityInner {
    schema: Rc<Schema>,
    scope: ScopeRef,
    parent: Option<Parent>,
    fired: FiredSet,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("schema", &self.inner.schema.name())
            .field("has_parent", &self.inner.parent.is_some())
            .finish_non_exhaustive()
    }
}

/// Back-reference from a region to whatever constructed it
#[derive(Clone)]
pub enum Parent {
    /// The declaring page or region
    Entity(Entity),
    /// The collection instance that materialized this member
    Collection(RegionCollection),
}

impl fmt::Debug for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(entity) => write!(f, "Parent::Entity({entity:?})"),
            Self::Collection(_) => write!(f, "Parent::Collection(..)"),
        }
    }
}

impl Parent {
    /// The parent as an entity, if it is one
    #[must_use]
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::Collection(_) => None,
        }
    }

    /// The parent as a collection, if it is one
    #[must_use]
    pub fn as_collection(&self) -> Option<&RegionCollection> {
        match self {
            Self::Collection(collection) => Some(collection),
            Self::Entity(_) => None,
        }
    }
}

impl Entity {
    /// Construct a page instance: bind the provider scope, run the
    /// schema's constructor hook if any, then fire the initializer hooks.
    pub fn new(schema: Rc<Schema>, scope: ScopeRef) -> PaginaResult<Self> {
        Self::with_parent(schema, scope, None)
    }

    pub(crate) fn with_parent(
        schema: Rc<Schema>,
        scope: ScopeRef,
        parent: Option<Parent>,
    ) -> PaginaResult<Self> {
        let entity = Self {
            inner: Rc::new(EntityInner {
                schema,
                scope,
                parent,
                fired: FiredSet::default(),
            }),
        };
        if let Some(hook) = entity.inner.schema.constructor() {
            hook(&entity)?;
        }
        entity.initialize_regions()?;
        Ok(entity)
    }

    /// The schema this instance was constructed from
    #[must_use]
    pub fn schema(&self) -> &Rc<Schema> {
        &self.inner.schema
    }

    /// The provider scope element lookups run against
    #[must_use]
    pub fn scope(&self) -> &ScopeRef {
        &self.inner.scope
    }

    /// The declaring instance or owning collection, absent for pages
    #[must_use]
    pub fn parent(&self) -> Option<&Parent> {
        self.inner.parent.as_ref()
    }

    /// Whether two handles refer to the same instance
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Fire every registered initializer hook that has not fired on this
    /// instance yet. Idempotent: re-invocation is a no-op.
    pub fn initialize_regions(&self) -> PaginaResult<()> {
        for hook in self.inner.schema.initializers() {
            let _ = self.inner.fired.fire_once(hook, self)?;
        }
        Ok(())
    }

    fn compiled(&self, name: &str) -> PaginaResult<&Rc<CompiledElement>> {
        self.inner
            .schema
            .element(name)
            .ok_or_else(|| PaginaError::UnknownElement {
                name: name.to_string(),
            })
    }

    /// Resolve a declared element. `None` when predicate filtering left
    /// no survivor.
    pub fn element(&self, name: &str) -> PaginaResult<Option<ElementRef>> {
        self.compiled(name)?.resolve_one(self)
    }

    /// Resolve a declared element as a collection
    pub fn elements(&self, name: &str) -> PaginaResult<Vec<ElementRef>> {
        self.compiled(name)?.resolve_many(self)
    }

    /// Click accessor: resolve and perform the primary activation action
    pub fn click(&self, name: &str) -> PaginaResult<()> {
        self.compiled(name)?.click(self)
    }

    /// Read accessor: resolve and extract the tag-appropriate value
    pub fn read(&self, name: &str) -> PaginaResult<ReadValue> {
        self.compiled(name)?.read(self)
    }

    /// Set accessor: resolve and assign the value, selecting or typing
    /// as the tag requires
    pub fn set(&self, name: &str, value: impl Into<SetValue>) -> PaginaResult<()> {
        self.compiled(name)?.write(self, &value.into())
    }

    /// Single-region accessor, with any registered override applied
    pub fn region(&self, name: &str) -> PaginaResult<Entity> {
        let base = self.region_base(name)?;
        match self.inner.schema.one_override(name) {
            Some(hook) => hook(self, base),
            None => Ok(base),
        }
    }

    /// The engine-generated single-region implementation, callable as the
    /// base behavior under an override
    pub fn region_base(&self, name: &str) -> PaginaResult<Entity> {
        let decl = self.region_decl(name)?;
        if decl.cardinality != Cardinality::One {
            return Err(PaginaError::CardinalityMismatch {
                region: name.to_string(),
                declared: "a collection; use regions()",
            });
        }
        tracing::trace!(region = name, "resolving region");
        let scope = self.resolve_region_scope(decl)?;
        let class = self.resolve_member_class(decl)?;
        Self::with_parent(class, scope, Some(Parent::Entity(self.clone())))
    }

    /// Many-region accessor, with any registered override applied
    pub fn regions(&self, name: &str) -> PaginaResult<ManyRegions> {
        let base = self.regions_base(name)?;
        match self.inner.schema.many_override(name) {
            Some(hook) => hook(self, base),
            None => Ok(base),
        }
    }

    /// The engine-generated many-region implementation, callable as the
    /// base behavior under an override
    pub fn regions_base(&self, name: &str) -> PaginaResult<ManyRegions> {
        let decl = self.region_decl(name)?;
        if decl.cardinality != Cardinality::Many {
            return Err(PaginaError::CardinalityMismatch {
                region: name.to_string(),
                declared: "a single region; use region()",
            });
        }
        let scope = self.resolve_region_scope(decl)?;
        let each = decl.each.clone().unwrap_or_default();
        let candidates = if scope.exists() {
            scope.find_all("elements", &each)?
        } else {
            Vec::new()
        };
        tracing::trace!(
            region = name,
            candidates = candidates.len(),
            "resolving region collection"
        );
        // Member class resolution is lazy: a collection with no candidates
        // never needs one.
        let member_schema = if candidates.is_empty() {
            None
        } else {
            Some(self.resolve_member_class(decl)?)
        };
        match self.resolve_collection_class(decl) {
            Some(collection_schema) => {
                let collection =
                    RegionCollection::build(collection_schema, scope, self, member_schema, candidates)?;
                Ok(ManyRegions::Wrapped(collection))
            }
            None => {
                let mut members = Vec::with_capacity(candidates.len());
                if let Some(member_schema) = member_schema {
                    for element in candidates {
                        members.push(Self::with_parent(
                            Rc::clone(&member_schema),
                            element.into_scope(),
                            Some(Parent::Entity(self.clone())),
                        )?);
                    }
                }
                Ok(ManyRegions::Plain(members))
            }
        }
    }

    /// Finder accessor: the first member of the declared collection whose
    /// read accessors match every supplied criterion exactly.
    ///
    /// # Errors
    ///
    /// Returns [`PaginaError::NoMatchingRegion`] when nothing matches.
    pub fn find_region(&self, finder: &str, criteria: &Criteria) -> PaginaResult<Entity> {
        let region_name = self
            .inner
            .schema
            .finder_region(finder)
            .map(|decl| decl.name.clone())
            .ok_or_else(|| PaginaError::UnknownFinder {
                name: finder.to_string(),
            })?;
        let members = self.regions(&region_name)?;
        for member in members.iter() {
            let mut matched = true;
            for (key, expected) in criteria.iter() {
                if !expected.matches(&member.read(key)?) {
                    matched = false;
                    break;
                }
            }
            if matched {
                return Ok(member);
            }
        }
        Err(PaginaError::NoMatchingRegion {
            region: region_name,
            criteria: criteria.to_string(),
        })
    }

    fn region_decl(&self, name: &str) -> PaginaResult<&RegionDecl> {
        self.inner
            .schema
            .region_decl(name)
            .ok_or_else(|| PaginaError::UnknownRegion {
                name: name.to_string(),
            })
    }

    fn resolve_region_scope(&self, decl: &RegionDecl) -> PaginaResult<ScopeRef> {
        match &decl.scope {
            ScopeSpec::Inherit => Ok(Rc::clone(self.scope())),
            ScopeSpec::Criteria(criteria) => {
                Ok(self.scope().find("element", criteria)?.into_scope())
            }
            ScopeSpec::Resolver(resolver) => Ok(resolver(self)?.into_scope()),
        }
    }

    fn resolve_member_class(&self, decl: &RegionDecl) -> PaginaResult<Rc<Schema>> {
        match &decl.class {
            ClassSpec::Explicit(schema) => Ok(Rc::clone(schema)),
            ClassSpec::Inferred => {
                let class =
                    inferred_class_name(&decl.name, decl.cardinality == Cardinality::Many);
                let namespace =
                    self.inner
                        .schema
                        .namespace()
                        .ok_or_else(|| PaginaError::AmbiguousNamespace {
                            region: decl.name.clone(),
                        })?;
                namespace
                    .resolve(&class)
                    .ok_or_else(|| PaginaError::RegionClassNotFound {
                        class: class.clone(),
                        region: decl.name.clone(),
                    })
            }
        }
    }

    fn resolve_collection_class(&self, decl: &RegionDecl) -> Option<Rc<Schema>> {
        if let Some(schema) = &decl.collection_class {
            return Some(Rc::clone(schema));
        }
        let namespace = self.inner.schema.namespace()?;
        namespace.resolve(&inferred_class_name(&decl.name, false))
    }
}

/// Result of a many-region accessor: a plain ordered sequence when no
/// collection class applies, else a constructed collection instance.
pub enum ManyRegions {
    /// Ordered sequence of region instances, parents pointing at the
    /// declaring instance
    Plain(Vec<Entity>),
    /// Collection wrapper, members' parents pointing at it
    Wrapped(RegionCollection),
}

impl fmt::Debug for ManyRegions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(members) => write!(f, "ManyRegions::Plain({})", members.len()),
            Self::Wrapped(collection) => {
                write!(f, "ManyRegions::Wrapped({})", collection.count())
            }
        }
    }
}

impl ManyRegions {
    /// Number of member regions
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Plain(members) => members.len(),
            Self::Wrapped(collection) => collection.count(),
        }
    }

    /// Whether there are no member regions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Member at the given index
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Entity> {
        match self {
            Self::Plain(members) => members.get(index).cloned(),
            Self::Wrapped(collection) => collection.get(index),
        }
    }

    /// First member
    #[must_use]
    pub fn first(&self) -> Option<Entity> {
        self.get(0)
    }

    /// Members in provider query order
    #[must_use]
    pub fn to_vec(&self) -> Vec<Entity> {
        match self {
            Self::Plain(members) => members.clone(),
            Self::Wrapped(collection) => collection.members(),
        }
    }

    /// Iterate members in provider query order
    pub fn iter(&self) -> std::vec::IntoIter<Entity> {
        self.to_vec().into_iter()
    }

    /// The collection wrapper, when one was constructed
    #[must_use]
    pub fn collection(&self) -> Option<&RegionCollection> {
        match self {
            Self::Wrapped(collection) => Some(collection),
            Self::Plain(_) => None,
        }
    }

    /// Keep only members the predicate accepts, preserving the shape
    pub fn filter(self, keep: impl Fn(&Entity) -> PaginaResult<bool>) -> PaginaResult<Self> {
        match self {
            Self::Plain(members) => {
                let mut kept = Vec::with_capacity(members.len());
                for member in members {
                    if keep(&member)? {
                        kept.push(member);
                    }
                }
                Ok(Self::Plain(kept))
            }
            Self::Wrapped(collection) => {
                collection.retain_with(&keep)?;
                Ok(Self::Wrapped(collection))
            }
        }
    }
}

/// A constructed region collection: the collection class's own behavior
/// plus the ordered member sequence, fixed at construction from the live
/// query. Re-invoking the region accessor re-queries and rebuilds.
#[derive(Clone)]
pub struct RegionCollection {
    inner: Rc<CollectionInner>,
}

struct CollectionInner {
    entity: Entity,
    members: RefCell<Vec<Entity>>,
}

impl fmt::Debug for RegionCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionCollection")
            .field("schema", &self.inner.entity.schema().name())
            .field("members", &self.count())
            .finish()
    }
}

impl RegionCollection {
    pub(crate) fn build(
        collection_schema: Rc<Schema>,
        scope: ScopeRef,
        declaring: &Entity,
        member_schema: Option<Rc<Schema>>,
        candidates: Vec<ElementRef>,
    ) -> PaginaResult<Self> {
        let entity = Entity::with_parent(
            collection_schema,
            scope,
            Some(Parent::Entity(declaring.clone())),
        )?;
        let collection = Self {
            inner: Rc::new(CollectionInner {
                entity,
                members: RefCell::new(Vec::new()),
            }),
        };
        if let Some(member_schema) = member_schema {
            let mut members = Vec::with_capacity(candidates.len());
            for element in candidates {
                members.push(Entity::with_parent(
                    Rc::clone(&member_schema),
                    element.into_scope(),
                    Some(Parent::Collection(collection.clone())),
                )?);
            }
            *collection.inner.members.borrow_mut() = members;
        }
        Ok(collection)
    }

    /// The collection's own entity, carrying any hand-declared behavior
    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.inner.entity
    }

    /// The collection's containing scope element
    #[must_use]
    pub fn scope(&self) -> &ScopeRef {
        self.inner.entity.scope()
    }

    /// Number of members
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.members.borrow().len()
    }

    /// Whether the collection holds no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Member at the given index
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Entity> {
        self.inner.members.borrow().get(index).cloned()
    }

    /// Members in provider query order
    #[must_use]
    pub fn members(&self) -> Vec<Entity> {
        self.inner.members.borrow().clone()
    }

    /// Iterate members in provider query order
    pub fn iter(&self) -> std::vec::IntoIter<Entity> {
        self.members().into_iter()
    }

    /// Whether two handles refer to the same collection instance
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn retain_with(
        &self,
        keep: &dyn Fn(&Entity) -> PaginaResult<bool>,
    ) -> PaginaResult<()> {
        let current = self.inner.members.borrow().clone();
        let mut kept = Vec::with_capacity(current.len());
        for member in current {
            if keep(&member)? {
                kept.push(member);
            }
        }
        *self.inner.members.borrow_mut() = kept;
        Ok(())
    }
}
