//! Raw/observable marking and annotation factories.
//!
//! Marks are stored out of band, on the node or on a constructor's shared
//! prototype, so tagging never adds a property to the tagged object.

use reactant_core::{AnnotationKind, Mark, Ref, Value};

use crate::observable::{observable, observable_shallow};
#[cfg(feature = "tracing")]
use crate::logging::debug;
#[cfg(not(feature = "tracing"))]
use crate::debug;

/// Tag `value` so it is never made observable.
///
/// A function tags its prototype, so every instance it constructs is raw.
/// A wrapper tags its raw target. Falsy values yield `None`; truthy
/// primitives come back unchanged, as there is nothing to tag.
pub fn mark_raw(value: Value) -> Option<Value> {
    mark(value, Mark::Raw)
}

/// Tag `value` as observable-shaped, overriding the foreign-shape checks.
///
/// Same targeting rules as [`mark_raw`].
pub fn mark_observable(value: Value) -> Option<Value> {
    mark(value, Mark::Observable)
}

fn mark(value: Value, mark: Mark) -> Option<Value> {
    if !value.is_truthy() {
        return None;
    }
    if let Some(node) = value.shape() {
        match node.function_prototype() {
            Some(prototype) => prototype.marks().insert(mark),
            None => node.marks().insert(mark),
        };
        debug!(node = %node.id(), ?mark, "annotate.mark");
    }
    Some(value)
}

/// Whether `value` is an annotation factory.
#[must_use]
pub fn is_annotation(value: &Value) -> bool {
    value
        .as_heap()
        .and_then(Ref::annotation_kind)
        .is_some()
}

/// Build the annotation factory of the given kind.
///
/// Calling the factory applies it to its first argument: `Deep` and
/// `Shallow` make it observable, `Ref` returns it untouched.
#[must_use]
pub fn annotation(kind: AnnotationKind) -> Value {
    let apply = move |args: &[Value]| {
        let target = args.first().cloned().unwrap_or_default();
        match kind {
            AnnotationKind::Deep => observable(target),
            AnnotationKind::Shallow => observable_shallow(target),
            AnnotationKind::Ref => target,
        }
    };
    Value::Ref(Ref::annotation(kind, apply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::is_support_observable;
    use crate::registry::is_observable;

    #[test]
    fn falsy_values_yield_none() {
        assert_eq!(mark_raw(Value::Undefined), None);
        assert_eq!(mark_raw(Value::Null), None);
        assert_eq!(mark_raw(Value::from(false)), None);
        assert_eq!(mark_raw(Value::from(0)), None);
        assert_eq!(mark_raw(Value::from(f64::NAN)), None);
        assert_eq!(mark_observable(Value::from("")), None);
    }

    #[test]
    fn truthy_primitives_pass_through() {
        assert_eq!(mark_raw(Value::from(7)), Some(Value::from(7)));
        assert_eq!(mark_observable(Value::from("x")), Some(Value::from("x")));
    }

    #[test]
    fn marking_returns_the_same_node() {
        let object = Value::object::<String>([]);
        let marked = mark_raw(object.clone());
        assert_eq!(marked, Some(object.clone()));
        assert!(!is_support_observable(&object));
    }

    #[test]
    fn marking_a_constructor_tags_future_instances() {
        let class = Ref::class("Widget");
        mark_raw(Value::Ref(class.clone()));
        assert!(class.marks().is_empty());

        let instance = class.construct().expect("class constructs");
        assert!(instance.marks().is_empty());
        assert!(!is_support_observable(&Value::Ref(instance)));
    }

    #[test]
    fn marking_is_idempotent() {
        let object = Ref::object([("toJSON", Value::function("toJSON", |_| Value::Null))]);
        mark_observable(Value::Ref(object.clone()));
        mark_observable(Value::Ref(object.clone()));
        assert_eq!(object.annotation_mark(), Some(Mark::Observable));
        assert!(is_support_observable(&Value::Ref(object)));
    }

    #[test]
    fn marking_a_wrapper_tags_its_target() {
        let raw = Ref::object::<String>([]);
        let proxy = observable(Value::Ref(raw.clone()));
        mark_raw(proxy);
        assert_eq!(raw.annotation_mark(), Some(Mark::Raw));
    }

    #[test]
    fn factories_are_annotations_and_apply() {
        let deep = annotation(AnnotationKind::Deep);
        let by_ref = annotation(AnnotationKind::Ref);
        assert!(is_annotation(&deep));
        assert!(is_annotation(&by_ref));
        assert!(!is_annotation(&Value::function("plain", |_| Value::Null)));
        assert!(!is_annotation(&Value::object::<String>([])));
        assert!(!is_annotation(&Value::Undefined));

        let data = Value::array([]);
        let applied = deep.as_heap().map(|f| f.call(&[data.clone()]));
        assert!(applied.as_ref().is_some_and(is_observable));

        let kept = by_ref.as_heap().map(|f| f.call(&[data.clone()]));
        assert_eq!(kept, Some(data));
    }
}
