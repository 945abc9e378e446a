//! Shape predicates.
//!
//! All predicates look through observable wrappers: a wrapper around an
//! array is an array. Class instances are plain objects; only arrays, maps,
//! sets and functions are excluded from [`is_plain_object`].

use crate::heap::Kind;
use crate::value::Value;

fn kind_is(value: &Value, kind: Kind) -> bool {
    value.kind() == Some(kind)
}

/// Neither `Undefined` nor `Null`.
#[inline]
#[must_use]
pub fn is_valid(value: &Value) -> bool {
    !value.is_nullish()
}

#[inline]
#[must_use]
pub fn is_array(value: &Value) -> bool {
    kind_is(value, Kind::Array)
}

#[inline]
#[must_use]
pub fn is_plain_object(value: &Value) -> bool {
    kind_is(value, Kind::Object)
}

#[inline]
#[must_use]
pub fn is_map(value: &Value) -> bool {
    kind_is(value, Kind::Map)
}

#[inline]
#[must_use]
pub fn is_weak_map(value: &Value) -> bool {
    kind_is(value, Kind::WeakMap)
}

#[inline]
#[must_use]
pub fn is_set(value: &Value) -> bool {
    kind_is(value, Kind::Set)
}

#[inline]
#[must_use]
pub fn is_weak_set(value: &Value) -> bool {
    kind_is(value, Kind::WeakSet)
}

#[inline]
#[must_use]
pub fn is_fn(value: &Value) -> bool {
    kind_is(value, Kind::Function)
}

/// Map, weak map, set or weak set.
#[must_use]
pub fn is_collection(value: &Value) -> bool {
    matches!(
        value.kind(),
        Some(Kind::Map | Kind::WeakMap | Kind::Set | Kind::WeakSet)
    )
}
