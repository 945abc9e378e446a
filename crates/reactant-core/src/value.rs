//! The dynamic [`Value`] type.
//!
//! Equality is SameValueZero: primitives compare by value (`NaN` equals
//! `NaN`, `0.0` equals `-0.0`), heap nodes and wrappers by identity. `Hash`
//! agrees with it, so any value can key a map or sit in a set.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::heap::{Kind, NodeId, Observable, Ref};

/// A primitive, a raw heap node, or an observable wrapper.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Ref(Ref),
    Observable(Observable),
}

impl Value {
    // ── Constructors ─────────────────────────────────────────────────

    #[must_use]
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Ref(Ref::array(items))
    }

    #[must_use]
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Ref(Ref::object(entries))
    }

    #[must_use]
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::Ref(Ref::map(entries))
    }

    #[must_use]
    pub fn set(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Ref(Ref::set(values))
    }

    #[must_use]
    pub fn function(name: impl Into<String>, call: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self::Ref(Ref::function(name, call))
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// JavaScript truthiness.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Ref(_) | Self::Observable(_) => true,
        }
    }

    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// The raw node behind a `Ref` (not behind a wrapper).
    #[must_use]
    pub fn as_heap(&self) -> Option<&Ref> {
        match self {
            Self::Ref(node) => Some(node),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_observable(&self) -> Option<&Observable> {
        match self {
            Self::Observable(obs) => Some(obs),
            _ => None,
        }
    }

    /// The node whose shape this value presents: the node itself, or the
    /// target of a wrapper.
    #[must_use]
    pub fn shape(&self) -> Option<&Ref> {
        match self {
            Self::Ref(node) => Some(node),
            Self::Observable(obs) => Some(obs.target()),
            _ => None,
        }
    }

    /// Structural kind, looking through wrappers.
    #[must_use]
    pub fn kind(&self) -> Option<Kind> {
        self.shape().map(Ref::kind)
    }

    /// Identity of this exact value: the node id or the wrapper id.
    #[must_use]
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::Ref(node) => Some(node.id()),
            Self::Observable(obs) => Some(obs.id()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Structural equality, looking through wrappers and tolerating cycles.
    ///
    /// Two heap values are equal when they have the same kind, the same
    /// prototype and pairwise deep-equal contents. A pair of nodes already
    /// under comparison is assumed equal, which makes cyclic graphs of the
    /// same shape compare equal.
    #[must_use]
    pub fn deep_eq(&self, other: &Value) -> bool {
        let mut assumed = ahash::AHashSet::new();
        deep_eq_inner(self, other, &mut assumed)
    }
}

fn deep_eq_inner(a: &Value, b: &Value, assumed: &mut ahash::AHashSet<(NodeId, NodeId)>) -> bool {
    let (left, right) = match (a.shape(), b.shape()) {
        (Some(left), Some(right)) => (left, right),
        (None, None) => return a == b,
        _ => return false,
    };
    if left.ptr_eq(right) {
        return true;
    }
    if left.kind() != right.kind() || left.prototype() != right.prototype() {
        return false;
    }
    if !assumed.insert((left.id(), right.id())) {
        return true;
    }
    match left.kind() {
        Kind::Object => {
            let (l, r) = (left.entries(), right.entries());
            l.len() == r.len()
                && l.iter().zip(r.iter()).all(|((lk, lv), (rk, rv))| {
                    lk == rk && deep_eq_inner(lv, rv, assumed)
                })
        }
        Kind::Map => {
            let (l, r) = (left.map_entries(), right.map_entries());
            l.len() == r.len()
                && l.iter().zip(r.iter()).all(|((lk, lv), (rk, rv))| {
                    deep_eq_inner(lk, rk, assumed) && deep_eq_inner(lv, rv, assumed)
                })
        }
        Kind::Array | Kind::Set => {
            let (l, r) = (left.values(), right.values());
            l.len() == r.len()
                && l.iter()
                    .zip(r.iter())
                    .all(|(lv, rv)| deep_eq_inner(lv, rv, assumed))
        }
        Kind::WeakMap | Kind::WeakSet | Kind::Function => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Ref(a), Self::Ref(b)) => a.ptr_eq(b),
            (Self::Observable(a), Self::Observable(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Undefined | Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Number(n) => {
                // Agree with SameValueZero: one bit pattern for every NaN and for ±0.
                let canonical = if n.is_nan() {
                    f64::NAN.to_bits()
                } else if *n == 0.0 {
                    0u64
                } else {
                    n.to_bits()
                };
                canonical.hash(state);
            }
            Self::String(s) => s.hash(state),
            Self::Ref(node) => node.hash(state),
            Self::Observable(obs) => obs.hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Ref(node) => write!(f, "{node:?}"),
            Self::Observable(obs) => write!(f, "{obs:?}"),
        }
    }
}

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<Ref> for Value {
    fn from(node: Ref) -> Self {
        Self::Ref(node)
    }
}

impl From<Observable> for Value {
    fn from(obs: Observable) -> Self {
        Self::Observable(obs)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}
