//! Reactions: effects that re-run when the state they read changes.
//!
//! [`autorun`] runs an effect once, immediately, inside a tracking scope.
//! Every tracked read during that run becomes a dependency; a write to any
//! of them runs the effect again and collects a fresh dependency set.
//!
//! [`Reaction`] is an RAII handle, like a subscription guard: dropping it
//! (or calling [`dispose`](Reaction::dispose)) stops the effect.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use reactant_core::NodeId;

use crate::context::{try_with_runtime, with_runtime};
use crate::tracker::{Subscriber, is_running, run_tracked};
#[cfg(feature = "tracing")]
use crate::logging::trace;
#[cfg(not(feature = "tracing"))]
use crate::trace;

struct ReactionInner {
    id: NodeId,
    effect: RefCell<Box<dyn FnMut()>>,
    disposed: Cell<bool>,
    runs: Cell<u64>,
}

impl ReactionInner {
    fn run(&self) {
        if self.disposed.get() || is_running(self.id) {
            return;
        }
        trace!(reaction = %self.id, run = self.runs.get() + 1, "reaction.run");
        run_tracked(self.id, || {
            let Ok(mut effect) = self.effect.try_borrow_mut() else {
                return;
            };
            (*effect)();
        });
        self.runs.set(self.runs.get() + 1);
    }
}

impl Subscriber for ReactionInner {
    fn id(&self) -> NodeId {
        self.id
    }

    fn notify(&self) {
        self.run();
    }
}

impl Drop for ReactionInner {
    fn drop(&mut self) {
        let _ = try_with_runtime(|rt| {
            if let Ok(mut tracker) = rt.try_tracker() {
                tracker.unregister(self.id);
            }
        });
    }
}

/// Handle to a running effect. The effect stops when the handle drops.
#[must_use = "dropping a Reaction stops it immediately"]
pub struct Reaction {
    inner: Rc<ReactionInner>,
}

impl Reaction {
    /// Stop the effect. It will not run again.
    pub fn dispose(&self) {
        if !self.inner.disposed.replace(true) {
            with_runtime(|rt| rt.tracker().unregister(self.inner.id));
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of completed runs, the initial one included.
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.inner.runs.get()
    }

    /// Run the effect now, outside the change-driven schedule.
    pub fn run(&self) {
        self.inner.run();
    }
}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.inner.id)
            .field("runs", &self.inner.runs.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

/// Run `effect` now and again whenever state it read changes.
pub fn autorun(effect: impl FnMut() + 'static) -> Reaction {
    let inner = Rc::new(ReactionInner {
        id: NodeId::next(),
        effect: RefCell::new(Box::new(effect)),
        disposed: Cell::new(false),
        runs: Cell::new(0),
    });
    let subscriber: Rc<dyn Subscriber> = inner.clone();
    let weak: Weak<dyn Subscriber> = Rc::downgrade(&subscriber);
    with_runtime(|rt| rt.tracker().register(inner.id, weak));
    inner.run();
    Reaction { inner }
}
