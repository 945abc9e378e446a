//! Identity registry: the raw ⇄ wrapper association.
//!
//! Two side tables keyed by [`NodeId`] hold only weak handles, so an entry
//! never extends the life of either side. A wrapper holds its target
//! strongly (it has to forward reads), which means the wrapper → raw entry
//! is live exactly as long as the wrapper is. Dead entries are pruned
//! lazily, amortized over insertions.
//!
//! # Invariants
//!
//! 1. At most one live wrapper exists per raw node.
//! 2. Lookups never wrap.
//! 3. Ids are never reused, so a dead entry can never alias a new node.

use ahash::AHashMap;
use reactant_core::{NodeId, Observable, Ref, Value, WeakObservable, WeakRef};

use crate::context::with_runtime;
#[cfg(feature = "tracing")]
use crate::logging::{debug, trace};
#[cfg(not(feature = "tracing"))]
use crate::{debug, trace};

/// Inserts between two automatic prunes, at minimum.
const PRUNE_INTERVAL: usize = 64;

#[derive(Default)]
pub(crate) struct Registry {
    raw_to_proxy: AHashMap<NodeId, WeakObservable>,
    proxy_to_raw: AHashMap<NodeId, WeakRef>,
    inserts_since_prune: usize,
}

/// Snapshot of registry occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Pairs whose wrapper is still alive.
    pub live: usize,
    /// Entries currently stored, dead ones included.
    pub stored: usize,
}

impl Registry {
    /// The live wrapper for `raw`, if any.
    #[must_use]
    pub(crate) fn lookup(&self, raw: &Ref) -> Option<Observable> {
        self.raw_to_proxy
            .get(&raw.id())
            .and_then(WeakObservable::upgrade)
    }

    /// Whether `proxy` is a registered wrapper.
    #[must_use]
    pub(crate) fn contains(&self, proxy: &Observable) -> bool {
        self.proxy_to_raw
            .get(&proxy.id())
            .is_some_and(WeakRef::is_alive)
    }

    /// The raw node registered for `proxy`.
    #[must_use]
    pub(crate) fn raw_of(&self, proxy: &Observable) -> Option<Ref> {
        self.proxy_to_raw.get(&proxy.id()).and_then(WeakRef::upgrade)
    }

    /// Return the live wrapper for `raw`, creating and registering one if
    /// there is none. An existing wrapper is returned whatever its depth.
    pub(crate) fn wrap(&mut self, raw: &Ref, shallow: bool) -> Observable {
        if let Some(existing) = self.lookup(raw) {
            trace!(raw = %raw.id(), proxy = %existing.id(), "registry.reuse");
            return existing;
        }
        let proxy = Observable::new(raw.clone(), shallow);
        self.raw_to_proxy.insert(raw.id(), proxy.downgrade());
        self.proxy_to_raw.insert(proxy.id(), raw.downgrade());
        debug!(raw = %raw.id(), proxy = %proxy.id(), shallow, "registry.wrap");

        self.inserts_since_prune += 1;
        if self.inserts_since_prune >= PRUNE_INTERVAL.max(self.raw_to_proxy.len() / 2) {
            self.prune();
        }
        proxy
    }

    /// Drop entries whose wrapper is gone. Returns the number of pairs removed.
    pub(crate) fn prune(&mut self) -> usize {
        let before = self.raw_to_proxy.len();
        self.raw_to_proxy.retain(|_, proxy| proxy.is_alive());
        self.proxy_to_raw.retain(|_, raw| raw.is_alive());
        // A raw node can outlive its wrapper; the pair is dead either way.
        let live: ahash::AHashSet<NodeId> =
            self.raw_to_proxy.values().map(WeakObservable::id).collect();
        self.proxy_to_raw.retain(|proxy, _| live.contains(proxy));
        self.inserts_since_prune = 0;
        let removed = before - self.raw_to_proxy.len();
        trace!(removed, "registry.prune");
        removed
    }

    #[must_use]
    pub(crate) fn stats(&self) -> RegistryStats {
        RegistryStats {
            live: self
                .raw_to_proxy
                .values()
                .filter(|proxy| proxy.is_alive())
                .count(),
            stored: self.raw_to_proxy.len(),
        }
    }
}

/// Whether `value` is a registered observable wrapper. No side effects.
#[must_use]
pub fn is_observable(value: &Value) -> bool {
    match value {
        Value::Observable(proxy) => with_runtime(|rt| rt.registry().contains(proxy)),
        _ => false,
    }
}

/// The raw value behind a registered wrapper; `None` for anything else.
///
/// `None` means "not an observable, use as-is".
#[must_use]
pub fn raw(value: &Value) -> Option<Value> {
    match value {
        Value::Observable(proxy) => {
            with_runtime(|rt| rt.registry().raw_of(proxy)).map(Value::Ref)
        }
        _ => None,
    }
}

/// Occupancy of this thread's registry.
#[must_use]
pub fn registry_stats() -> RegistryStats {
    with_runtime(|rt| rt.registry().stats())
}

/// Prune dead entries from this thread's registry now.
pub fn prune_registry() -> usize {
    with_runtime(|rt| rt.registry_mut().prune())
}
