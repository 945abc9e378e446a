#![forbid(unsafe_code)]

//! Property-based invariant tests for `to_js` and the identity registry.
//!
//! Graphs are generated as plain `Shape` trees (values themselves are
//! `!Send` and thread-bound) and built into `Value`s inside each case,
//! optionally wrapping containers in observables along the way.
//!
//! 1. `to_js` preserves structure.
//! 2. `to_js` is idempotent.
//! 3. No wrapper is reachable from a `to_js` result.
//! 4. `raw(observable(v))` is `v` by identity.
//! 5. `to_js` never shares a container with its input.
//! 6. Self-cycles terminate and point back at the original node.
//! 7. Writes through a wrapper are visible in the snapshot.

use ahash::AHashSet;
use proptest::prelude::*;
use reactant_core::{Kind, NodeId, Ref, Value};
use reactant_runtime::{ObservableExt, is_observable, observable, raw, to_js};

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Shape {
    Num(i32),
    Str(String),
    Bool(bool),
    Null,
    Array(Vec<Shape>),
    Object(Vec<(String, Shape)>),
    Map(Vec<(i32, Shape)>),
    Set(Vec<i32>),
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        any::<i32>().prop_map(Shape::Num),
        "[a-z]{0,6}".prop_map(Shape::Str),
        any::<bool>().prop_map(Shape::Bool),
        Just(Shape::Null),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Shape::Array),
            proptest::collection::vec(("[a-z]{1,4}", inner.clone()), 0..6)
                .prop_map(Shape::Object),
            proptest::collection::vec((any::<i32>(), inner), 0..4).prop_map(Shape::Map),
            proptest::collection::vec(any::<i32>(), 0..4).prop_map(Shape::Set),
        ]
    })
}

/// A container shape, for properties that need a heap value at the root.
fn container() -> impl Strategy<Value = Shape> {
    prop_oneof![
        proptest::collection::vec(shape(), 0..6).prop_map(Shape::Array),
        proptest::collection::vec(("[a-z]{1,4}", shape()), 0..6).prop_map(Shape::Object),
        proptest::collection::vec((any::<i32>(), shape()), 0..4).prop_map(Shape::Map),
        proptest::collection::vec(any::<i32>(), 0..4).prop_map(Shape::Set),
    ]
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Build a value; when `wrap` is set, every container is stored as a wrapper.
fn build(shape: &Shape, wrap: bool) -> Value {
    let value = match shape {
        Shape::Num(n) => return Value::from(*n),
        Shape::Str(s) => return Value::from(s.as_str()),
        Shape::Bool(b) => return Value::from(*b),
        Shape::Null => return Value::Null,
        Shape::Array(items) => Value::array(items.iter().map(|s| build(s, wrap)).collect::<Vec<_>>()),
        Shape::Object(entries) => Value::object(
            entries
                .iter()
                .map(|(k, s)| (k.clone(), build(s, wrap)))
                .collect::<Vec<_>>(),
        ),
        Shape::Map(entries) => Value::map(
            entries
                .iter()
                .map(|(k, s)| (Value::from(*k), build(s, wrap)))
                .collect::<Vec<_>>(),
        ),
        Shape::Set(members) => Value::set(members.iter().map(|m| Value::from(*m)).collect::<Vec<_>>()),
    };
    if wrap { observable(value) } else { value }
}

fn reachable_ids(value: &Value, out: &mut AHashSet<NodeId>) {
    let Some(node) = value.shape() else {
        return;
    };
    if !out.insert(node.id()) {
        return;
    }
    for child in children(node) {
        reachable_ids(&child, out);
    }
}

fn children(node: &Ref) -> Vec<Value> {
    match node.kind() {
        Kind::Map => node
            .map_entries()
            .into_iter()
            .flat_map(|(k, v)| [k, v])
            .collect(),
        _ => node.values(),
    }
}

fn contains_wrapper(value: &Value, seen: &mut AHashSet<NodeId>) -> bool {
    if is_observable(value) {
        return true;
    }
    let Some(node) = value.shape() else {
        return false;
    };
    if !seen.insert(node.id()) {
        return false;
    }
    children(node).iter().any(|child| contains_wrapper(child, seen))
}

// ═════════════════════════════════════════════════════════════════════════
// 1–3. Structure, idempotence, no wrappers
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn to_js_preserves_structure(s in shape(), wrap in any::<bool>()) {
        let input = build(&s, wrap);
        let output = to_js(&input);
        prop_assert!(output.deep_eq(&input));
    }

    #[test]
    fn to_js_is_idempotent(s in shape(), wrap in any::<bool>()) {
        let once = to_js(&build(&s, wrap));
        let twice = to_js(&once);
        prop_assert!(once.deep_eq(&twice));
    }

    #[test]
    fn to_js_output_has_no_wrappers(s in shape()) {
        let input = build(&s, true);
        let output = to_js(&input);
        prop_assert!(!contains_wrapper(&output, &mut AHashSet::new()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4–5. Identity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn raw_round_trips_by_identity(s in container()) {
        let input = build(&s, false);
        let proxy = observable(input.clone());
        prop_assert!(is_observable(&proxy));
        prop_assert_eq!(raw(&proxy), Some(input));
    }

    #[test]
    fn to_js_never_shares_containers(s in container(), wrap in any::<bool>()) {
        let input = build(&s, wrap);
        let mut before = AHashSet::new();
        reachable_ids(&input, &mut before);
        if let Some(raw_root) = raw(&input) {
            reachable_ids(&raw_root, &mut before);
        }
        let mut after = AHashSet::new();
        reachable_ids(&to_js(&input), &mut after);
        prop_assert!(before.is_disjoint(&after));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Cycles
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn self_cycles_terminate(entries in proptest::collection::vec(("[a-z]{1,4}", shape()), 0..5)) {
        let node = Ref::object(entries.iter().map(|(k, s)| (k.clone(), build(s, false))).collect::<Vec<_>>());
        node.insert("self", Value::Ref(node.clone())).expect("object accepts properties");
        let output = to_js(&observable(Value::Ref(node.clone())));
        let copy = output.as_heap().expect("copied object");
        prop_assert!(!copy.ptr_eq(&node));
        prop_assert_eq!(copy.get("self"), Some(Value::Ref(node)));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Writes through wrappers
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn pushes_show_up_in_snapshot(items in proptest::collection::vec(any::<i32>(), 0..16)) {
        let state = observable(Value::array([]));
        let proxy = state.as_observable().expect("arrays are wrapped").clone();
        for item in &items {
            proxy.push(Value::from(*item)).expect("array accepts pushes");
        }
        let expected = Value::array(items.iter().map(|i| Value::from(*i)).collect::<Vec<_>>());
        prop_assert!(to_js(&state).deep_eq(&expected));
        prop_assert_eq!(proxy.len(), items.len());
    }
}
