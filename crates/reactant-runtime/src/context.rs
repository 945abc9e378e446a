//! The per-thread runtime context.
//!
//! All engine state lives here: the identity registry, the dependency
//! tracker, the collection flag, the probe guard and the configuration.
//! Values are `!Send`, so one context per thread is exactly one context per
//! object graph.
//!
//! # Invariants
//!
//! 1. No `RefCell` in the context is borrowed while caller code runs.
//! 2. `collected` is only ever set to `true` by a tracked read and reset by
//!    a probe.

use std::cell::{BorrowMutError, Cell, Ref as CellRef, RefCell, RefMut};
use std::rc::Rc;

use crate::config::RuntimeConfig;
use crate::registry::Registry;
use crate::tracker::Tracker;

#[derive(Default)]
pub(crate) struct Runtime {
    registry: RefCell<Registry>,
    tracker: RefCell<Tracker>,
    collected: Cell<bool>,
    probing: Cell<bool>,
    config: RefCell<Rc<RuntimeConfig>>,
}

thread_local! {
    static RUNTIME: Runtime = Runtime::default();
}

/// Run `f` against this thread's runtime.
pub(crate) fn with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> R {
    RUNTIME.with(f)
}

/// Like [`with_runtime`], but `None` once the thread-local has been torn
/// down. Used from `Drop` impls that may run during thread exit.
pub(crate) fn try_with_runtime<R>(f: impl FnOnce(&Runtime) -> R) -> Option<R> {
    RUNTIME.try_with(f).ok()
}

impl Runtime {
    pub(crate) fn registry(&self) -> CellRef<'_, Registry> {
        self.registry.borrow()
    }

    pub(crate) fn registry_mut(&self) -> RefMut<'_, Registry> {
        self.registry.borrow_mut()
    }

    pub(crate) fn tracker(&self) -> RefMut<'_, Tracker> {
        self.tracker.borrow_mut()
    }

    /// Non-panicking borrow for `Drop` paths.
    pub(crate) fn try_tracker(&self) -> Result<RefMut<'_, Tracker>, BorrowMutError> {
        self.tracker.try_borrow_mut()
    }

    pub(crate) fn collected(&self) -> bool {
        self.collected.get()
    }

    pub(crate) fn set_collected(&self, collected: bool) {
        self.collected.set(collected);
    }

    /// Claim the probe slot. `false` if a probe is already active.
    pub(crate) fn begin_probe(&self) -> bool {
        !self.probing.replace(true)
    }

    pub(crate) fn end_probe(&self) {
        self.probing.set(false);
    }

    pub(crate) fn config(&self) -> Rc<RuntimeConfig> {
        Rc::clone(&self.config.borrow())
    }

    pub(crate) fn set_config(&self, config: RuntimeConfig) {
        *self.config.borrow_mut() = Rc::new(config);
    }
}
