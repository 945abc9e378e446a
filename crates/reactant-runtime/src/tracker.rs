//! Dependency tracking.
//!
//! A tracked read records `(target, key)` against the innermost active
//! scope. A write looks up every subscriber recorded for the keys it
//! touched and notifies them in two phases: derived subscribers (computed
//! values) are invalidated right away, transitively, and effects are queued
//! until the write, or the enclosing batch, is done.
//!
//! # Design
//!
//! Subscribers are stored as `Weak<dyn Subscriber>` and addressed by
//! [`NodeId`]. The tracker never calls back into a subscriber while it is
//! borrowed: ids are resolved to strong handles first, the borrow is
//! released, then the handles are notified.
//!
//! Every write runs as an implicit batch, so an effect that reads both a
//! source and a value derived from it runs once, after the derived value is
//! already stale.
//!
//! # Invariants
//!
//! 1. A subscriber's dependencies are exactly the keys it read during its
//!    most recent run.
//! 2. A subscriber that is currently running is never notified, so an effect
//!    writing its own dependency does not recurse.
//! 3. Inside a batch each effect is notified at most once, when the
//!    outermost batch ends.
//! 4. No effect runs while a derived subscriber of the same write is still
//!    marked clean.
//!
//! # Failure Modes
//!
//! - **Effect panics**: the scope guard pops the scope and clears the
//!   running flag, so the tracker stays consistent for the next run.
//! - **Batch body panics**: queued notifications are discarded.

use std::rc::{Rc, Weak};

use ahash::{AHashMap, AHashSet, RandomState};
use indexmap::IndexSet;
use reactant_core::{NodeId, Value};

use crate::context::{try_with_runtime, with_runtime};
#[cfg(feature = "tracing")]
use crate::logging::trace;
#[cfg(not(feature = "tracing"))]
use crate::trace;

/// Something that re-runs when a dependency changes.
pub(crate) trait Subscriber {
    fn id(&self) -> NodeId;
    fn notify(&self);

    /// Derived subscribers only mark themselves stale when notified, so they
    /// are notified immediately instead of being queued with effects.
    fn is_derived(&self) -> bool {
        false
    }
}

/// The slot of a target that a read depended on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TrackKey {
    /// Named object property.
    Prop(Rc<str>),
    /// Array element.
    Index(usize),
    /// Map entry or set member keyed by a primitive.
    Entry(Value),
    /// Map entry or set member keyed by a heap node.
    Node(NodeId),
    /// Size, key set, or the whole value.
    Iterate,
}

impl TrackKey {
    pub(crate) fn prop(key: &str) -> Self {
        Self::Prop(Rc::from(key))
    }

    /// Key for a map entry or set member. Heap keys are held by id only so
    /// that the dependency table never keeps a node alive.
    pub(crate) fn entry(key: &Value) -> Self {
        match key.shape() {
            Some(node) => Self::Node(node.id()),
            None => Self::Entry(key.clone()),
        }
    }
}

type Dep = (NodeId, TrackKey);

#[derive(Default)]
pub(crate) struct Tracker {
    subscribers: AHashMap<NodeId, Weak<dyn Subscriber>>,
    deps: AHashMap<Dep, IndexSet<NodeId, RandomState>>,
    /// Keys of `deps` grouped by target.
    by_target: AHashMap<NodeId, IndexSet<TrackKey, RandomState>>,
    owned: AHashMap<NodeId, Vec<Dep>>,
    /// Innermost last. `None` is an untracked scope.
    scopes: Vec<Option<NodeId>>,
    batch_depth: usize,
    pending: IndexSet<NodeId, RandomState>,
    running: AHashSet<NodeId>,
}

impl Tracker {
    pub(crate) fn register(&mut self, id: NodeId, subscriber: Weak<dyn Subscriber>) {
        self.subscribers.insert(id, subscriber);
    }

    pub(crate) fn unregister(&mut self, id: NodeId) {
        self.subscribers.remove(&id);
        self.clear_deps(id);
        self.pending.shift_remove(&id);
    }

    fn clear_deps(&mut self, id: NodeId) {
        for dep in self.owned.remove(&id).unwrap_or_default() {
            if let Some(subs) = self.deps.get_mut(&dep) {
                subs.shift_remove(&id);
                if subs.is_empty() {
                    self.deps.remove(&dep);
                    let (target, key) = dep;
                    if let Some(keys) = self.by_target.get_mut(&target) {
                        keys.shift_remove(&key);
                        if keys.is_empty() {
                            self.by_target.remove(&target);
                        }
                    }
                }
            }
        }
    }

    fn record(&mut self, target: NodeId, key: TrackKey) {
        let Some(Some(subscriber)) = self.scopes.last().copied() else {
            return;
        };
        let dep = (target, key);
        if self
            .deps
            .entry(dep.clone())
            .or_default()
            .insert(subscriber)
        {
            self.by_target
                .entry(dep.0)
                .or_default()
                .insert(dep.1.clone());
            self.owned.entry(subscriber).or_default().push(dep);
        }
    }

    fn subscribers_of(&self, target: NodeId, keys: &[TrackKey]) -> IndexSet<NodeId, RandomState> {
        let mut ids = IndexSet::default();
        for key in keys {
            if let Some(subs) = self.deps.get(&(target, key.clone())) {
                ids.extend(subs.iter().copied());
            }
        }
        ids
    }

    fn subscribers_of_target(&self, target: NodeId) -> IndexSet<NodeId, RandomState> {
        match self.by_target.get(&target) {
            Some(keys) => {
                let keys: Vec<TrackKey> = keys.iter().cloned().collect();
                self.subscribers_of(target, &keys)
            }
            None => IndexSet::default(),
        }
    }

    /// Strong handles for `ids`, skipping dead and running subscribers.
    fn resolve(&self, ids: impl IntoIterator<Item = NodeId>) -> Vec<Rc<dyn Subscriber>> {
        ids.into_iter()
            .filter(|id| !self.running.contains(id))
            .filter_map(|id| self.subscribers.get(&id).and_then(Weak::upgrade))
            .collect()
    }

    /// Queue the effects among `ids` and return the derived subscribers for
    /// immediate delivery.
    fn schedule(&mut self, ids: IndexSet<NodeId, RandomState>) -> Vec<Rc<dyn Subscriber>> {
        let mut derived = Vec::new();
        for subscriber in self.resolve(ids) {
            if subscriber.is_derived() {
                derived.push(subscriber);
            } else {
                self.pending.insert(subscriber.id());
            }
        }
        derived
    }

    /// Number of `(target, key)` slots with at least one subscriber.
    #[cfg(test)]
    pub(crate) fn dependency_count(&self) -> usize {
        self.deps.len()
    }
}

fn deliver(subscribers: Vec<Rc<dyn Subscriber>>) {
    for subscriber in subscribers {
        trace!(subscriber = %subscriber.id(), "tracker.notify");
        subscriber.notify();
    }
}

// ─── Reads and writes ────────────────────────────────────────────────────────

/// Record a tracked read of `key` on `target`.
///
/// Always raises the collection flag, even in an untracked scope.
pub(crate) fn track(target: NodeId, key: TrackKey) {
    with_runtime(|rt| {
        rt.set_collected(true);
        rt.tracker().record(target, key);
    });
}

/// Notify every subscriber that read one of `keys` on `target`.
pub(crate) fn trigger(target: NodeId, keys: &[TrackKey]) {
    propagate(|tracker| tracker.subscribers_of(target, keys));
}

/// Notify every subscriber that read anything on `target`.
pub(crate) fn trigger_target(target: NodeId) {
    propagate(|tracker| tracker.subscribers_of_target(target));
}

/// Invalidate derived subscribers now and run effects once the outermost
/// batch ends.
fn propagate(select: impl FnOnce(&Tracker) -> IndexSet<NodeId, RandomState>) {
    let guard = BatchGuard::enter();
    let derived = with_runtime(|rt| {
        let mut tracker = rt.tracker();
        let ids = select(&*tracker);
        tracker.schedule(ids)
    });
    deliver(derived);
    guard.finish();
}

// ─── Scopes ──────────────────────────────────────────────────────────────────

/// Pops the scope pushed by [`run_tracked`] or [`untracked`], also on unwind.
struct ScopeGuard {
    running: Option<NodeId>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let _ = try_with_runtime(|rt| {
            let Ok(mut tracker) = rt.try_tracker() else {
                return;
            };
            tracker.scopes.pop();
            if let Some(id) = self.running {
                tracker.running.remove(&id);
            }
        });
    }
}

/// Run `f` as subscriber `id`, replacing its previous dependencies with the
/// keys read during this run.
pub(crate) fn run_tracked<R>(id: NodeId, f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| {
        let mut tracker = rt.tracker();
        tracker.clear_deps(id);
        tracker.scopes.push(Some(id));
        tracker.running.insert(id);
    });
    let _guard = ScopeGuard { running: Some(id) };
    f()
}

/// Whether `id` is currently running.
pub(crate) fn is_running(id: NodeId) -> bool {
    with_runtime(|rt| rt.tracker().running.contains(&id))
}

/// Run `f` without recording dependencies for the enclosing reaction.
///
/// Reads inside `f` still raise the collection flag.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    with_runtime(|rt| rt.tracker().scopes.push(None));
    let _guard = ScopeGuard { running: None };
    f()
}

// ─── Batching ────────────────────────────────────────────────────────────────

struct BatchGuard {
    finished: bool,
}

impl BatchGuard {
    fn enter() -> Self {
        with_runtime(|rt| rt.tracker().batch_depth += 1);
        Self { finished: false }
    }

    /// Leave the batch, draining the queue if this was the outermost one.
    fn finish(mut self) {
        self.finished = true;
        let outermost = with_runtime(|rt| {
            let mut tracker = rt.tracker();
            tracker.batch_depth -= 1;
            tracker.batch_depth == 0
        });
        if outermost {
            flush();
        }
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let _ = try_with_runtime(|rt| {
            let Ok(mut tracker) = rt.try_tracker() else {
                return;
            };
            tracker.batch_depth -= 1;
            if tracker.batch_depth == 0 {
                tracker.pending.clear();
            }
        });
    }
}

fn flush() {
    loop {
        let subscribers = with_runtime(|rt| {
            let mut tracker = rt.tracker();
            let pending = std::mem::take(&mut tracker.pending);
            tracker.resolve(pending)
        });
        if subscribers.is_empty() {
            return;
        }
        deliver(subscribers);
    }
}

/// Run `f` with notifications deferred until the outermost batch ends.
///
/// Each affected reaction runs once after the batch, however many of its
/// dependencies were written inside it.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let guard = BatchGuard::enter();
    let out = f();
    guard.finish();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use std::cell::RefCell;

    struct Probe {
        id: NodeId,
        hits: Cell<u32>,
        derived: bool,
        order: Rc<RefCell<Vec<NodeId>>>,
    }

    impl Subscriber for Probe {
        fn id(&self) -> NodeId {
            self.id
        }

        fn notify(&self) {
            self.hits.set(self.hits.get() + 1);
            self.order.borrow_mut().push(self.id);
        }

        fn is_derived(&self) -> bool {
            self.derived
        }
    }

    fn probe() -> Rc<Probe> {
        probe_with(false, &Rc::default())
    }

    fn probe_with(derived: bool, order: &Rc<RefCell<Vec<NodeId>>>) -> Rc<Probe> {
        let probe = Rc::new(Probe {
            id: NodeId::next(),
            hits: Cell::new(0),
            derived,
            order: Rc::clone(order),
        });
        let weak: Weak<dyn Subscriber> = Rc::downgrade(&(Rc::clone(&probe) as Rc<dyn Subscriber>));
        with_runtime(|rt| rt.tracker().register(probe.id, weak));
        probe
    }

    #[test]
    fn trigger_reaches_recorded_reader() {
        let target = NodeId::next();
        let p = probe();
        run_tracked(p.id, || track(target, TrackKey::prop("x")));

        trigger(target, &[TrackKey::prop("y")]);
        assert_eq!(p.hits.get(), 0);
        trigger(target, &[TrackKey::prop("x")]);
        assert_eq!(p.hits.get(), 1);
    }

    #[test]
    fn rerun_replaces_dependencies() {
        let target = NodeId::next();
        let p = probe();
        run_tracked(p.id, || track(target, TrackKey::Index(0)));
        run_tracked(p.id, || track(target, TrackKey::Index(1)));

        trigger(target, &[TrackKey::Index(0)]);
        assert_eq!(p.hits.get(), 0);
        trigger(target, &[TrackKey::Index(1)]);
        assert_eq!(p.hits.get(), 1);
    }

    #[test]
    fn untracked_reads_record_nothing() {
        let target = NodeId::next();
        let p = probe();
        run_tracked(p.id, || untracked(|| track(target, TrackKey::Iterate)));
        trigger(target, &[TrackKey::Iterate]);
        assert_eq!(p.hits.get(), 0);
    }

    #[test]
    fn batch_coalesces_notifications() {
        let target = NodeId::next();
        let p = probe();
        run_tracked(p.id, || {
            track(target, TrackKey::prop("a"));
            track(target, TrackKey::prop("b"));
        });

        batch(|| {
            trigger(target, &[TrackKey::prop("a")]);
            batch(|| trigger(target, &[TrackKey::prop("b")]));
            assert_eq!(p.hits.get(), 0);
        });
        assert_eq!(p.hits.get(), 1);
    }

    #[test]
    fn trigger_target_covers_every_key() {
        let target = NodeId::next();
        let p = probe();
        run_tracked(p.id, || track(target, TrackKey::entry(&Value::from("k"))));
        trigger_target(target);
        assert_eq!(p.hits.get(), 1);
    }

    #[test]
    fn derived_subscribers_are_notified_before_effects() {
        let target = NodeId::next();
        let order = Rc::default();
        let effect = probe_with(false, &order);
        let derived = probe_with(true, &order);
        run_tracked(effect.id, || track(target, TrackKey::prop("a")));
        run_tracked(derived.id, || track(target, TrackKey::prop("a")));

        trigger(target, &[TrackKey::prop("a")]);
        assert_eq!(*order.borrow(), [derived.id, effect.id]);
    }

    #[test]
    fn derived_subscribers_are_not_deferred_by_batch() {
        let target = NodeId::next();
        let effect = probe();
        let derived = probe_with(true, &Rc::default());
        run_tracked(effect.id, || track(target, TrackKey::Iterate));
        run_tracked(derived.id, || track(target, TrackKey::Iterate));

        batch(|| {
            trigger(target, &[TrackKey::Iterate]);
            assert_eq!(derived.hits.get(), 1);
            assert_eq!(effect.hits.get(), 0);
        });
        assert_eq!(effect.hits.get(), 1);
    }

    #[test]
    fn clearing_a_target_only_visits_its_own_keys() {
        let (a, b) = (NodeId::next(), NodeId::next());
        let reader_a = probe();
        let reader_b = probe();
        run_tracked(reader_a.id, || {
            track(a, TrackKey::prop("x"));
            track(a, TrackKey::Index(3));
        });
        run_tracked(reader_b.id, || track(b, TrackKey::prop("x")));

        trigger_target(a);
        assert_eq!(reader_a.hits.get(), 1);
        assert_eq!(reader_b.hits.get(), 0);

        with_runtime(|rt| rt.tracker().unregister(reader_a.id));
        with_runtime(|rt| assert!(!rt.tracker().by_target.contains_key(&a)));
    }

    #[test]
    fn unregister_drops_dependencies() {
        let target = NodeId::next();
        let p = probe();
        run_tracked(p.id, || track(target, TrackKey::Iterate));
        let before = with_runtime(|rt| rt.tracker().dependency_count());
        with_runtime(|rt| rt.tracker().unregister(p.id));
        let after = with_runtime(|rt| rt.tracker().dependency_count());
        assert_eq!(before, after + 1);
    }

    #[test]
    fn panicking_scope_is_popped() {
        let p = probe();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_tracked(p.id, || panic!("effect failed"));
        }));
        assert!(result.is_err());
        assert!(!is_running(p.id));
        with_runtime(|rt| assert!(rt.tracker().scopes.is_empty()));
    }
}
