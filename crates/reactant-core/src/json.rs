//! Bridge between [`Value`] and `serde_json::Value`.
//!
//! Conversion to JSON follows `JSON.stringify`: `undefined` and functions
//! are dropped from objects and become `null` in arrays, non-finite numbers
//! become `null`. Maps become arrays of `[key, value]` pairs, sets become
//! arrays, weak collections become `{}`. Wrappers are read through without
//! tracking. A cycle makes the whole conversion fail with `None`.

use ahash::AHashSet;
use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::heap::{Kind, NodeId, Ref};
use crate::value::Value;

impl Value {
    /// Build a fresh raw graph from JSON.
    #[must_use]
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::from(s.as_str()),
            Json::Array(items) => Value::array(items.iter().map(Value::from_json)),
            Json::Object(props) => {
                Value::object(props.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
            }
        }
    }

    /// Serialize to JSON; `None` if the graph is cyclic.
    #[must_use]
    pub fn to_json(&self) -> Option<Json> {
        let mut path = AHashSet::new();
        to_json_inner(self, &mut path).map(|json| json.unwrap_or(Json::Null))
    }
}

/// Outer `None`: a cycle was found. Inner `None`: the value is skipped.
fn to_json_inner(value: &Value, path: &mut AHashSet<NodeId>) -> Option<Option<Json>> {
    let node = match value {
        Value::Undefined => return Some(None),
        Value::Null => return Some(Some(Json::Null)),
        Value::Bool(b) => return Some(Some(Json::Bool(*b))),
        Value::Number(n) => return Some(Some(number_to_json(*n))),
        Value::String(s) => return Some(Some(Json::String(s.to_string()))),
        Value::Ref(_) | Value::Observable(_) => value.shape()?,
    };
    if node.kind() == Kind::Function {
        return Some(None);
    }
    if !path.insert(node.id()) {
        return None;
    }
    let json = node_to_json(node, path)?;
    path.remove(&node.id());
    Some(Some(json))
}

fn number_to_json(n: f64) -> Json {
    // Integral values keep an integer representation so they compare equal
    // to JSON parsed from text.
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(Json::Null, Json::Number)
}

fn array_to_json(values: &[Value], path: &mut AHashSet<NodeId>) -> Option<Json> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.push(to_json_inner(value, path)?.unwrap_or(Json::Null));
    }
    Some(Json::Array(out))
}

fn node_to_json(node: &Ref, path: &mut AHashSet<NodeId>) -> Option<Json> {
    match node.kind() {
        Kind::Array | Kind::Set => array_to_json(&node.values(), path),
        Kind::Object => {
            let mut out = JsonMap::new();
            for (key, value) in node.entries() {
                if let Some(json) = to_json_inner(&value, path)? {
                    out.insert(key, json);
                }
            }
            Some(Json::Object(out))
        }
        Kind::Map => {
            let mut out = Vec::new();
            for (key, value) in node.map_entries() {
                out.push(array_to_json(&[key, value], path)?);
            }
            Some(Json::Array(out))
        }
        Kind::WeakMap | Kind::WeakSet => Some(Json::Object(JsonMap::new())),
        Kind::Function => Some(Json::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip_preserves_structure() {
        let source = json!({"name": "form", "fields": [1, "two", null, {"nested": true}]});
        let value = Value::from_json(&source);
        assert_eq!(value.to_json(), Some(source));
    }

    #[test]
    fn stringify_rules_for_undefined_and_functions() {
        let value = Value::object([
            ("gone", Value::Undefined),
            ("method", Value::function("m", |_| Value::Null)),
            ("list", Value::array([Value::Undefined, Value::from(f64::INFINITY)])),
        ]);
        assert_eq!(value.to_json(), Some(json!({"list": [null, null]})));
    }

    #[test]
    fn collections_serialize_as_arrays() {
        let value = Value::map([(Value::from("k"), Value::set([Value::from(1)]))]);
        assert_eq!(value.to_json(), Some(json!([["k", [1]]])));
    }

    #[test]
    fn cycles_fail_but_shared_nodes_do_not() {
        let shared = Value::array([Value::from(1)]);
        let dag = Value::array([shared.clone(), shared]);
        assert_eq!(dag.to_json(), Some(json!([[1], [1]])));

        let cyclic = Ref::array([]);
        cyclic.push(Value::from(cyclic.clone())).expect("array");
        assert_eq!(Value::from(cyclic).to_json(), None);
    }
}
