//! Wrap-eligibility classifier.
//!
//! Decides whether a value should become observable. Arrays and keyed
//! collections always qualify. Plain objects qualify unless they are tagged
//! raw, or look like a foreign object that owns its representation (a UI
//! element, a date/time object, a schema object, or anything that knows how
//! to serialize itself). An observable tag overrides those shape checks.

use reactant_core::checkers::is_fn;
use reactant_core::{Kind, Mark, Ref, Value};

use crate::config::{RuntimeConfig, config};

/// Whether `value` should be wrapped by `observable`.
///
/// Wrappers are classified by their raw shape. Never panics.
#[must_use]
pub fn is_support_observable(value: &Value) -> bool {
    let Some(node) = value.shape() else {
        return false;
    };
    match node.kind() {
        Kind::Array => true,
        Kind::Object => match node.annotation_mark() {
            Some(Mark::Raw) => false,
            Some(Mark::Observable) => true,
            None => !owns_representation(node, &config()),
        },
        Kind::Map | Kind::WeakMap | Kind::Set | Kind::WeakSet => true,
        Kind::Function => false,
    }
}

/// Whether an object carries one of the foreign-shape markers.
///
/// Properties are looked up along the prototype chain.
pub(crate) fn owns_representation(node: &Ref, config: &RuntimeConfig) -> bool {
    if node.has_property(&config.element_marker) && node.has_property(&config.element_owner) {
        return true;
    }
    let truthy = |key: &str| node.lookup(key).is_some_and(|v| v.is_truthy());
    if truthy(&config.date_marker) || truthy(&config.schema_marker) {
        return true;
    }
    config
        .serializer_methods
        .iter()
        .any(|method| node.lookup(method).is_some_and(|v| is_fn(&v)))
}
