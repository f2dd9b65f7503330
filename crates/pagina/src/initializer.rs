//! Region-readiness initializer hooks.
//!
//! Behavior units mixed into a schema can register an on-region-ready
//! hook. Hooks carry a stable identifier; each instance tracks the
//! identifiers that already fired, so re-running the initialization step
//! is a no-op. Hooks fire in registration order.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::region::Entity;
use crate::result::PaginaResult;

/// Callback invoked once per instance when regions are initialized
pub type InitializerFn = Rc<dyn Fn(&Entity) -> PaginaResult<()>>;

/// An on-region-ready hook tagged with a stable identifier
#[derive(Clone)]
pub struct InitializerHook {
    id: String,
    run: InitializerFn,
}

impl InitializerHook {
    /// Create a hook with a stable identifier
    pub fn new(id: impl Into<String>, run: impl Fn(&Entity) -> PaginaResult<()> + 'static) -> Self {
        Self {
            id: id.into(),
            run: Rc::new(run),
        }
    }

    /// The hook's stable identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn invoke(&self, entity: &Entity) -> PaginaResult<()> {
        (self.run)(entity)
    }
}

impl fmt::Debug for InitializerHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializerHook")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Per-instance record of initializer hooks that already fired
#[derive(Debug, Default)]
pub(crate) struct FiredSet {
    ids: RefCell<HashSet<String>>,
}

impl FiredSet {
    /// Invoke the hook unless its identifier already fired on this
    /// instance. Returns whether the hook ran.
    pub(crate) fn fire_once(&self, hook: &InitializerHook, entity: &Entity) -> PaginaResult<bool> {
        if self.ids.borrow().contains(hook.id()) {
            return Ok(false);
        }
        hook.invoke(entity)?;
        let _ = self.ids.borrow_mut().insert(hook.id().to_string());
        Ok(true)
    }
}
