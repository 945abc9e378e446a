//! Observable construction and tracked access.
//!
//! [`observable`] wraps an eligible raw node in a registered
//! [`Observable`]. All access then goes through [`ObservableExt`]: reads
//! record a dependency on the active reaction and raise the collection flag,
//! writes store raw values and notify dependents when something changed.
//!
//! # Invariants
//!
//! 1. `raw(observable(v))` is `v` by identity for every eligible node.
//! 2. Wrapper values are never stored: writes unwrap them first.
//! 3. A write that leaves the slot SameValueZero-equal notifies nobody.
//! 4. Deep wrappers hand out eligible children wrapped; shallow wrappers
//!    hand them out raw.

use reactant_core::{Kind, Observable, Value};

use crate::classify::is_support_observable;
use crate::context::with_runtime;
use crate::error::Result;
use crate::tracker::{TrackKey, track, trigger, trigger_target};

/// Make `value` observable with deep wrapping.
///
/// A wrapper comes back as-is. Ineligible values come back unchanged. A raw
/// node that already has a live wrapper gets that wrapper, whatever its
/// depth.
#[must_use]
pub fn observable(value: Value) -> Value {
    wrap(value, false)
}

/// Make `value` observable without wrapping its children on read.
#[must_use]
pub fn observable_shallow(value: Value) -> Value {
    wrap(value, true)
}

fn wrap(value: Value, shallow: bool) -> Value {
    if !is_support_observable(&value) {
        return value;
    }
    match value {
        Value::Ref(raw) => {
            Value::Observable(with_runtime(|rt| rt.registry_mut().wrap(&raw, shallow)))
        }
        other => other,
    }
}

/// The value to store: wrappers are replaced by their raw target.
fn unwrap(value: Value) -> Value {
    match value {
        Value::Observable(proxy) => Value::Ref(proxy.target().clone()),
        other => other,
    }
}

/// Tracked accessors on an [`Observable`] wrapper.
///
/// Reads on the wrong shape return nothing; writes on the wrong shape fail
/// with [`ReactiveError::Value`](crate::ReactiveError::Value).
pub trait ObservableExt {
    // ── Reads ────────────────────────────────────────────────────────

    /// Property `key`, own or inherited.
    fn get(&self, key: &str) -> Option<Value>;

    /// `key in object`.
    fn has(&self, key: &str) -> bool;

    /// Own keys of an object, or the indices of an array.
    fn keys(&self) -> Vec<String>;

    /// Element, entry, member or own-key count.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Array element `index`.
    fn index(&self, index: usize) -> Option<Value>;

    /// Array elements, object values, map values or set members.
    fn values(&self) -> Vec<Value>;

    /// Key/value pairs: property names, array indices, map keys, or set
    /// members paired with themselves.
    fn entries(&self) -> Vec<(Value, Value)>;

    /// Map or weak-map lookup.
    fn map_get(&self, key: &Value) -> Option<Value>;

    /// Set membership, or key presence for maps.
    fn contains(&self, value: &Value) -> bool;

    // ── Writes ───────────────────────────────────────────────────────

    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Delete an own property. Returns whether it existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Append; returns the new length.
    fn push(&self, value: Value) -> Result<usize>;

    fn pop(&self) -> Result<Option<Value>>;

    /// Replace element `index`, or append when `index == len`.
    fn set_index(&self, index: usize, value: Value) -> Result<()>;

    fn map_set(&self, key: Value, value: Value) -> Result<()>;

    /// Returns whether the key was present.
    fn map_delete(&self, key: &Value) -> Result<bool>;

    /// Add a set member. Returns whether it was new.
    fn add(&self, value: Value) -> Result<bool>;

    /// Returns whether the member was present.
    fn remove(&self, value: &Value) -> Result<bool>;

    fn clear(&self) -> Result<()>;
}

impl ObservableExt for Observable {
    fn get(&self, key: &str) -> Option<Value> {
        let target = self.target();
        track(target.id(), TrackKey::prop(key));
        target.lookup(key).map(|value| child(self, value))
    }

    fn has(&self, key: &str) -> bool {
        let target = self.target();
        track(target.id(), TrackKey::prop(key));
        target.has_property(key)
    }

    fn keys(&self) -> Vec<String> {
        let target = self.target();
        track(target.id(), TrackKey::Iterate);
        match target.kind() {
            Kind::Array => (0..target.len()).map(|i| i.to_string()).collect(),
            _ => target.keys(),
        }
    }

    fn len(&self) -> usize {
        let target = self.target();
        track(target.id(), TrackKey::Iterate);
        target.len()
    }

    fn index(&self, index: usize) -> Option<Value> {
        let target = self.target();
        track(target.id(), TrackKey::Index(index));
        target.get_index(index).map(|value| child(self, value))
    }

    fn values(&self) -> Vec<Value> {
        let target = self.target();
        track(target.id(), TrackKey::Iterate);
        target
            .values()
            .into_iter()
            .map(|value| child(self, value))
            .collect()
    }

    fn entries(&self) -> Vec<(Value, Value)> {
        let target = self.target();
        track(target.id(), TrackKey::Iterate);
        match target.kind() {
            Kind::Object => target
                .entries()
                .into_iter()
                .map(|(key, value)| (Value::from(key), child(self, value)))
                .collect(),
            Kind::Array => target
                .values()
                .into_iter()
                .enumerate()
                .map(|(i, value)| (Value::from(i as f64), child(self, value)))
                .collect(),
            Kind::Map => target
                .map_entries()
                .into_iter()
                .map(|(key, value)| (key, child(self, value)))
                .collect(),
            Kind::Set => target
                .values()
                .into_iter()
                .map(|value| {
                    let member = child(self, value);
                    (member.clone(), member)
                })
                .collect(),
            Kind::WeakMap | Kind::WeakSet | Kind::Function => Vec::new(),
        }
    }

    fn map_get(&self, key: &Value) -> Option<Value> {
        let target = self.target();
        let key = unwrap(key.clone());
        track(target.id(), TrackKey::entry(&key));
        target.map_get(&key).map(|value| child(self, value))
    }

    fn contains(&self, value: &Value) -> bool {
        let target = self.target();
        let value = unwrap(value.clone());
        track(target.id(), TrackKey::entry(&value));
        target.contains(&value)
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let target = self.target();
        let value = unwrap(value);
        let previous = target.insert(key, value.clone())?;
        if previous.as_ref() != Some(&value) {
            trigger(target.id(), &[TrackKey::prop(key), TrackKey::Iterate]);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let target = self.target();
        let removed = target.remove(key)?.is_some();
        if removed {
            trigger(target.id(), &[TrackKey::prop(key), TrackKey::Iterate]);
        }
        Ok(removed)
    }

    fn push(&self, value: Value) -> Result<usize> {
        let target = self.target();
        let len = target.push(unwrap(value))?;
        trigger(target.id(), &[TrackKey::Index(len - 1), TrackKey::Iterate]);
        Ok(len)
    }

    fn pop(&self) -> Result<Option<Value>> {
        let target = self.target();
        let popped = target.pop()?;
        if popped.is_some() {
            trigger(target.id(), &[TrackKey::Index(target.len()), TrackKey::Iterate]);
        }
        Ok(popped)
    }

    fn set_index(&self, index: usize, value: Value) -> Result<()> {
        let target = self.target();
        let value = unwrap(value);
        let previous = target.set_index(index, value.clone())?;
        if previous.as_ref() != Some(&value) {
            trigger(target.id(), &[TrackKey::Index(index), TrackKey::Iterate]);
        }
        Ok(())
    }

    fn map_set(&self, key: Value, value: Value) -> Result<()> {
        let target = self.target();
        let key = unwrap(key);
        let value = unwrap(value);
        let slot = TrackKey::entry(&key);
        let previous = target.map_insert(key, value.clone())?;
        if previous.as_ref() != Some(&value) {
            trigger(target.id(), &[slot, TrackKey::Iterate]);
        }
        Ok(())
    }

    fn map_delete(&self, key: &Value) -> Result<bool> {
        let target = self.target();
        let key = unwrap(key.clone());
        let removed = target.map_remove(&key)?.is_some();
        if removed {
            trigger(target.id(), &[TrackKey::entry(&key), TrackKey::Iterate]);
        }
        Ok(removed)
    }

    fn add(&self, value: Value) -> Result<bool> {
        let target = self.target();
        let value = unwrap(value);
        let slot = TrackKey::entry(&value);
        let added = target.set_insert(value)?;
        if added {
            trigger(target.id(), &[slot, TrackKey::Iterate]);
        }
        Ok(added)
    }

    fn remove(&self, value: &Value) -> Result<bool> {
        let target = self.target();
        let value = unwrap(value.clone());
        let removed = target.set_remove(&value)?;
        if removed {
            trigger(target.id(), &[TrackKey::entry(&value), TrackKey::Iterate]);
        }
        Ok(removed)
    }

    fn clear(&self) -> Result<()> {
        let target = self.target();
        let was_empty = target.is_empty();
        target.clear()?;
        if !was_empty {
            trigger_target(target.id());
        }
        Ok(())
    }
}

fn child(parent: &Observable, value: Value) -> Value {
    if parent.is_shallow() {
        value
    } else {
        observable(value)
    }
}
