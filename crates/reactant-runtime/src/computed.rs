//! Lazy computed values derived from observable state.
//!
//! # Design
//!
//! A [`Computed<T>`] is a subscriber like a reaction, but instead of
//! re-running on change it only marks itself dirty. The next read
//! recomputes inside a tracking scope, so its dependencies are whatever the
//! compute function read last time. Reading a computed is itself a tracked
//! read, which lets reactions and other computeds depend on it.
//!
//! # Invariants
//!
//! 1. `get()` returns a value consistent with the current state of every
//!    dependency.
//! 2. The compute function runs at most once per change of its
//!    dependencies.
//! 3. Without a change, `get()` returns the cached value.
//! 4. `version` increments by exactly 1 per recomputation.
//! 5. A computed is invalidated before any effect of the same write runs,
//!    so an effect reading both a source and a computed derived from it
//!    never sees the computed's previous value.
//! 6. No borrow of the cache is held while caller code runs.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the previous cached value is kept and the
//!   dirty flag stays set, so the next read retries.
//! - **Dependency dropped**: nothing can write it any more, so the computed
//!   keeps its cached value and never becomes dirty from that source.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use reactant_core::NodeId;

use crate::context::{try_with_runtime, with_runtime};
use crate::tracker::{Subscriber, TrackKey, run_tracked, track, trigger};

struct ComputedInner<T> {
    id: NodeId,
    compute: Box<dyn Fn() -> T>,
    /// `None` only before the first computation.
    cached: RefCell<Option<Rc<T>>>,
    dirty: Cell<bool>,
    version: Cell<u64>,
}

impl<T> ComputedInner<T> {
    /// Mark dirty and tell readers, once per change.
    fn invalidate(&self) {
        if !self.dirty.replace(true) {
            trigger(self.id, &[TrackKey::Iterate]);
        }
    }
}

impl<T> Subscriber for ComputedInner<T> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn notify(&self) {
        self.invalidate();
    }

    fn is_derived(&self) -> bool {
        true
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        let _ = try_with_runtime(|rt| {
            if let Ok(mut tracker) = rt.try_tracker() {
                tracker.unregister(self.id);
            }
        });
    }
}

/// A lazily evaluated, memoized value derived from observable state.
///
/// Cloning a `Computed` creates a new handle to the **same** state.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Computed");
        match self.inner.cached.try_borrow() {
            Ok(cached) => out.field("cached", &*cached),
            Err(_) => out.field("cached", &"<borrowed>"),
        };
        out.field("dirty", &self.inner.dirty.get())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: 'static> Computed<T> {
    /// Create a computed value. Nothing runs until the first read.
    pub fn new(compute: impl Fn() -> T + 'static) -> Self {
        let inner = Rc::new(ComputedInner {
            id: NodeId::next(),
            compute: Box::new(compute),
            cached: RefCell::new(None),
            dirty: Cell::new(true),
            version: Cell::new(0),
        });
        let subscriber: Rc<dyn Subscriber> = inner.clone();
        let weak: Weak<dyn Subscriber> = Rc::downgrade(&subscriber);
        with_runtime(|rt| rt.tracker().register(inner.id, weak));
        Self { inner }
    }

    /// Access the current value by reference, recomputing first if stale.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let inner = &self.inner;
        track(inner.id, TrackKey::Iterate);
        let cached = if inner.dirty.get() {
            None
        } else {
            inner.cached.borrow().clone()
        };
        if let Some(value) = cached {
            return f(&value);
        }

        let value = Rc::new(run_tracked(inner.id, || (inner.compute)()));
        *inner.cached.borrow_mut() = Some(Rc::clone(&value));
        inner.dirty.set(false);
        inner.version.set(inner.version.get() + 1);
        f(&value)
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Force the next read to recompute.
    pub fn invalidate(&self) {
        self.inner.invalidate();
    }

    /// Current version. Increments by 1 on each recomputation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Get a clone of the current value, recomputing first if stale.
    #[must_use]
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::{ObservableExt, observable};
    use crate::reaction::autorun;
    use reactant_core::{Observable, Value};

    fn cell(initial: f64) -> Observable {
        match observable(Value::object([("v", Value::from(initial))])) {
            Value::Observable(proxy) => proxy,
            other => panic!("expected a wrapper, got {other:?}"),
        }
    }

    fn read(cell: &Observable) -> f64 {
        cell.get("v").and_then(|v| v.as_f64()).unwrap_or(f64::NAN)
    }

    fn write(cell: &Observable, v: f64) {
        cell.set("v", Value::from(v)).expect("object accepts properties");
    }

    #[test]
    fn derives_from_observable_state() {
        let source = cell(10.0);
        let reader = source.clone();
        let doubled = Computed::new(move || read(&reader) * 2.0);

        assert_eq!(doubled.get(), 20.0);
        assert_eq!(doubled.version(), 1);

        write(&source, 5.0);
        assert!(doubled.is_dirty());
        assert_eq!(doubled.get(), 10.0);
        assert_eq!(doubled.version(), 2);
    }

    #[test]
    fn lazy_and_memoized() {
        let count = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&count);
        let source = cell(42.0);
        let reader = source.clone();
        let computed = Computed::new(move || {
            counter.set(counter.get() + 1);
            read(&reader)
        });

        assert_eq!(count.get(), 0);
        assert_eq!(computed.get(), 42.0);
        assert_eq!(computed.get(), 42.0);
        assert_eq!(count.get(), 1);

        write(&source, 1.0);
        assert_eq!(count.get(), 1, "recomputation waits for the next read");
        assert_eq!(computed.get(), 1.0);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn same_value_write_keeps_cache_clean() {
        let source = cell(7.0);
        let reader = source.clone();
        let computed = Computed::new(move || read(&reader));
        let _ = computed.get();
        write(&source, 7.0);
        assert!(!computed.is_dirty());
        assert_eq!(computed.version(), 1);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let source = cell(5.0);
        let reader = source.clone();
        let computed = Computed::new(move || read(&reader));
        let _ = computed.get();
        computed.invalidate();
        assert!(computed.is_dirty());
        let _ = computed.get();
        assert_eq!(computed.version(), 2);
    }

    #[test]
    fn clone_shares_state() {
        let source = cell(10.0);
        let reader = source.clone();
        let c1 = Computed::new(move || read(&reader) + 1.0);
        let c2 = c1.clone();
        assert_eq!(c1.get(), 11.0);
        write(&source, 20.0);
        assert_eq!(c2.get(), 21.0);
        assert_eq!(c1.version(), 2);
    }

    #[test]
    fn chained_computeds_propagate() {
        let source = cell(10.0);
        let reader = source.clone();
        let b = Computed::new(move || read(&reader) + 1.0);
        let b_reader = b.clone();
        let d = Computed::new(move || b_reader.get() * 10.0);

        assert_eq!(d.get(), 110.0);
        write(&source, 0.0);
        assert!(d.is_dirty());
        assert_eq!(d.get(), 10.0);
    }

    #[test]
    fn reactions_rerun_when_a_computed_changes() {
        let source = cell(1.0);
        let reader = source.clone();
        let squared = Computed::new(move || read(&reader).powi(2));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let watched = squared.clone();
        let _reaction = autorun(move || sink.borrow_mut().push(watched.get()));

        write(&source, 3.0);
        assert_eq!(*seen.borrow(), [1.0, 9.0]);
    }

    #[test]
    fn reaction_never_sees_a_stale_computed() {
        let source = cell(1.0);
        let reader = source.clone();
        let doubled = Computed::new(move || read(&reader) * 2.0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (sink, state, watched) = (Rc::clone(&seen), source.clone(), doubled.clone());
        let reaction = autorun(move || sink.borrow_mut().push((read(&state), watched.get())));

        write(&source, 5.0);
        assert_eq!(*seen.borrow(), [(1.0, 2.0), (5.0, 10.0)]);
        assert_eq!(reaction.runs(), 2);
    }

    #[test]
    fn chained_computeds_are_fresh_inside_reactions() {
        let source = cell(2.0);
        let reader = source.clone();
        let plus_one = Computed::new(move || read(&reader) + 1.0);
        let upstream = plus_one.clone();
        let tripled = Computed::new(move || upstream.get() * 3.0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (sink, state, watched) = (Rc::clone(&seen), source.clone(), tripled.clone());
        let _reaction = autorun(move || sink.borrow_mut().push((read(&state), watched.get())));

        write(&source, 4.0);
        assert_eq!(*seen.borrow(), [(2.0, 9.0), (4.0, 15.0)]);
    }

    #[test]
    fn batched_writes_invalidate_before_reads_in_the_batch() {
        let source = cell(1.0);
        let reader = source.clone();
        let negated = Computed::new(move || -read(&reader));
        assert_eq!(negated.get(), -1.0);
        crate::tracker::batch(|| {
            write(&source, 3.0);
            assert_eq!(negated.get(), -3.0);
        });
    }

    #[test]
    fn with_allows_reentrant_recompute() {
        let source = cell(1.0);
        let reader = source.clone();
        let computed = Computed::new(move || read(&reader));
        assert_eq!(computed.get(), 1.0);

        let again = computed.clone();
        let (before, after) = computed.with(|value| {
            let before = *value;
            write(&source, 2.0);
            (before, again.get())
        });
        assert_eq!((before, after), (1.0, 2.0));
        assert_eq!(computed.version(), 2);
    }

    #[test]
    fn with_reads_without_cloning() {
        let source = cell(3.0);
        let reader = source.clone();
        let list = Computed::new(move || vec![read(&reader); 3]);
        assert_eq!(list.with(|v| v.iter().sum::<f64>()), 9.0);
    }

    #[test]
    fn panicking_compute_keeps_previous_value() {
        let source = cell(1.0);
        let reader = source.clone();
        let computed = Computed::new(move || {
            let v = read(&reader);
            assert!(v >= 0.0, "negative input");
            v
        });
        assert_eq!(computed.get(), 1.0);

        write(&source, -1.0);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| computed.get()));
        assert!(result.is_err());
        assert!(computed.is_dirty());
        assert_eq!(computed.version(), 1);
    }

    #[test]
    fn debug_format() {
        let computed = Computed::new(|| 42);
        let _ = computed.get();
        let dbg = format!("{computed:?}");
        assert!(dbg.contains("Computed"));
        assert!(dbg.contains("42"));
    }
}
