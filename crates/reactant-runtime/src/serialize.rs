//! Deep conversion back to raw data.
//!
//! [`to_js`] walks a graph of raw nodes and wrappers and builds a fresh,
//! fully raw copy. The input is never mutated.
//!
//! # Invariants
//!
//! 1. The result contains no wrapper, except inside objects that own their
//!    representation, which are returned as-is.
//! 2. Every node is copied at most once per call. Meeting it again (a cycle)
//!    yields the original raw node instead of a copy, so the walk always
//!    terminates.
//! 3. Copies carry no prototype and no marks.

use ahash::AHashSet;
use reactant_core::{Kind, Mark, NodeId, Ref, Value};

use crate::classify::owns_representation;
use crate::config::{RuntimeConfig, config};
#[cfg(feature = "tracing")]
use crate::logging::trace;
#[cfg(not(feature = "tracing"))]
use crate::trace;

/// A deep raw snapshot of `value`.
///
/// Primitives and functions come back unchanged, weak collections come back
/// unwrapped but uncopied.
#[must_use]
pub fn to_js(value: &Value) -> Value {
    let config = config();
    let mut walk = Walk {
        visited: AHashSet::new(),
        config: &config,
    };
    let out = walk.convert(value);
    trace!(copied = walk.visited.len(), "serialize.to_js");
    out
}

struct Walk<'a> {
    /// Raw ids and wrapper ids of nodes already copied in this call.
    visited: AHashSet<NodeId>,
    config: &'a RuntimeConfig,
}

impl Walk<'_> {
    fn convert(&mut self, value: &Value) -> Value {
        let Some(node) = value.shape() else {
            return value.clone();
        };
        match node.kind() {
            Kind::Function => value.clone(),
            Kind::WeakMap | Kind::WeakSet => Value::Ref(node.clone()),
            _ if self.seen(value, node) => Value::Ref(node.clone()),
            Kind::Array => {
                self.visit(value, node);
                let items: Vec<Value> = node.values().iter().map(|item| self.convert(item)).collect();
                Value::array(items)
            }
            Kind::Object => {
                let tagged = node.annotation_mark() == Some(Mark::Observable);
                if !tagged && owns_representation(node, self.config) {
                    return Value::Ref(node.clone());
                }
                self.visit(value, node);
                let entries: Vec<(String, Value)> = node
                    .entries()
                    .into_iter()
                    .map(|(key, item)| (key, self.convert(&item)))
                    .collect();
                Value::object(entries)
            }
            Kind::Map => {
                self.visit(value, node);
                let entries: Vec<(Value, Value)> = node
                    .map_entries()
                    .into_iter()
                    .map(|(key, item)| (unwrap(key), self.convert(&item)))
                    .collect();
                Value::map(entries)
            }
            Kind::Set => {
                self.visit(value, node);
                let members: Vec<Value> = node.values().iter().map(|item| self.convert(item)).collect();
                Value::set(members)
            }
        }
    }

    fn seen(&self, value: &Value, node: &Ref) -> bool {
        self.visited.contains(&node.id())
            || value.node_id().is_some_and(|id| self.visited.contains(&id))
    }

    fn visit(&mut self, value: &Value, node: &Ref) {
        self.visited.insert(node.id());
        if let Some(id) = value.node_id() {
            self.visited.insert(id);
        }
    }
}

fn unwrap(value: Value) -> Value {
    match value {
        Value::Observable(proxy) => Value::Ref(proxy.target().clone()),
        other => other,
    }
}
