//! Heap nodes: the identity-carrying half of the value model.
//!
//! Every [`Ref`] points at a reference-counted node with a unique
//! [`NodeId`]. Two handles are the same value iff they point at the same
//! node; contents never take part in equality.
//!
//! # Invariants
//!
//! 1. `NodeId`s are never reused, so an id seen in a side table can only
//!    ever name one node.
//! 2. A node's [`Kind`] is fixed at construction.
//! 3. No method holds a borrow of node contents while running caller code.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use indexmap::{IndexMap, IndexSet};

use crate::annotation::{AnnotationKind, Mark, Marks};
use crate::error::ValueError;
use crate::value::Value;

// ─── Ids ─────────────────────────────────────────────────────────────────────

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a heap node, prototype, wrapper or subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocate a fresh id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Structural shape of a heap node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Array,
    Object,
    Map,
    Set,
    WeakMap,
    WeakSet,
    Function,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Array => "array",
            Self::Object => "object",
            Self::Map => "map",
            Self::Set => "set",
            Self::WeakMap => "weak map",
            Self::WeakSet => "weak set",
            Self::Function => "function",
        };
        f.write_str(name)
    }
}

// ─── Prototype ───────────────────────────────────────────────────────────────

struct PrototypeInner {
    id: NodeId,
    name: String,
    marks: Marks,
    parent: Option<Prototype>,
    props: RefCell<IndexMap<String, Value>>,
}

/// Shared storage behind every instance of a constructor.
///
/// Properties defined here (typically methods such as `toJSON`) and marks
/// set here are visible from every instance through [`Ref::lookup`] and
/// [`Ref::annotation_mark`]. A prototype may extend a parent, forming a
/// chain that is searched nearest first.
#[derive(Clone)]
pub struct Prototype {
    inner: Rc<PrototypeInner>,
}

impl Prototype {
    /// Create a root prototype.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_parent(name, None)
    }

    /// Create a prototype whose lookups fall back to `parent`.
    #[must_use]
    pub fn extend(parent: &Prototype, name: impl Into<String>) -> Self {
        Self::with_parent(name, Some(parent.clone()))
    }

    fn with_parent(name: impl Into<String>, parent: Option<Prototype>) -> Self {
        Self {
            inner: Rc::new(PrototypeInner {
                id: NodeId::next(),
                name: name.into(),
                marks: Marks::default(),
                parent,
                props: RefCell::new(IndexMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Prototype> {
        self.inner.parent.as_ref()
    }

    #[must_use]
    pub fn marks(&self) -> &Marks {
        &self.inner.marks
    }

    /// Define (or replace) a property shared by all instances.
    pub fn define(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.inner
            .props
            .borrow_mut()
            .insert(key.into(), value.into());
        self
    }

    /// Look a property up along the chain.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(proto) = current {
            if let Some(value) = proto.inner.props.borrow().get(key) {
                return Some(value.clone());
            }
            current = proto.parent();
        }
        None
    }

    /// Nearest mark along the chain.
    #[must_use]
    pub fn annotation_mark(&self) -> Option<Mark> {
        let mut current = Some(self);
        while let Some(proto) = current {
            if let Some(mark) = proto.marks().get() {
                return Some(mark);
            }
            current = proto.parent();
        }
        None
    }

    /// Whether `self` is `other` or extends it.
    #[must_use]
    pub fn inherits(&self, other: &Prototype) -> bool {
        let mut current = Some(self);
        while let Some(proto) = current {
            if Rc::ptr_eq(&proto.inner, &other.inner) {
                return true;
            }
            current = proto.parent();
        }
        false
    }
}

impl PartialEq for Prototype {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Prototype {}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prototype")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("marks", &self.inner.marks)
            .finish()
    }
}

// ─── Node bodies ─────────────────────────────────────────────────────────────

/// Callable payload of a function node.
type Callable = Rc<dyn Fn(&[Value]) -> Value>;

struct FunctionBody {
    name: String,
    call: Callable,
    prototype: Prototype,
    annotation: Option<AnnotationKind>,
}

enum Body {
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Map(IndexMap<Value, Value>),
    Set(IndexSet<Value>),
    WeakMap(WeakTable<Value>),
    WeakSet(WeakTable<()>),
    Function(FunctionBody),
}

/// Inserts between two automatic sweeps of a weak table, at minimum.
const SWEEP_INTERVAL: usize = 64;

/// Entries keyed by a weakly held node.
///
/// An entry whose key died is unreachable but still owns its value until
/// the next sweep. Sweeps run on [`Ref::len`], on [`Ref::sweep`] and,
/// amortized, on insert.
struct WeakTable<V> {
    entries: AHashMap<NodeId, (WeakRef, V)>,
    inserts_since_sweep: usize,
}

impl<V> WeakTable<V> {
    fn new() -> Self {
        Self {
            entries: AHashMap::new(),
            inserts_since_sweep: 0,
        }
    }

    fn get(&self, id: NodeId) -> Option<&V> {
        self.entries
            .get(&id)
            .filter(|(key, _)| key.is_alive())
            .map(|(_, value)| value)
    }

    /// Insert, returning the previous value if its key was still alive.
    fn insert(&mut self, key: &Ref, value: V) -> Option<V> {
        self.inserts_since_sweep += 1;
        if self.inserts_since_sweep >= SWEEP_INTERVAL.max(self.entries.len() / 2) {
            self.sweep();
        }
        self.entries
            .insert(key.id(), (key.downgrade(), value))
            .filter(|(key, _)| key.is_alive())
            .map(|(_, value)| value)
    }

    fn remove(&mut self, id: NodeId) -> Option<V> {
        self.entries
            .remove(&id)
            .filter(|(key, _)| key.is_alive())
            .map(|(_, value)| value)
    }

    fn live(&self) -> usize {
        self.entries.values().filter(|(key, _)| key.is_alive()).count()
    }

    /// Drop entries whose key is gone. Returns how many were removed.
    fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (key, _)| key.is_alive());
        self.inserts_since_sweep = 0;
        before - self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.inserts_since_sweep = 0;
    }
}

impl Body {
    fn kind(&self) -> Kind {
        match self {
            Self::Array(_) => Kind::Array,
            Self::Object(_) => Kind::Object,
            Self::Map(_) => Kind::Map,
            Self::Set(_) => Kind::Set,
            Self::WeakMap(_) => Kind::WeakMap,
            Self::WeakSet(_) => Kind::WeakSet,
            Self::Function(_) => Kind::Function,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Array(items) => items.len(),
            Self::Object(props) => props.len(),
            Self::Map(entries) => entries.len(),
            Self::Set(values) => values.len(),
            Self::WeakMap(table) => table.live(),
            Self::WeakSet(table) => table.live(),
            Self::Function(_) => 0,
        }
    }
}

struct Node {
    id: NodeId,
    kind: Kind,
    marks: Marks,
    prototype: Option<Prototype>,
    body: RefCell<Body>,
}

// ─── Ref ─────────────────────────────────────────────────────────────────────

/// Handle to a heap node. Cloning clones the handle, not the node.
#[derive(Clone)]
pub struct Ref {
    node: Rc<Node>,
}

/// Weak counterpart of [`Ref`]; never keeps the node alive.
#[derive(Clone)]
pub struct WeakRef {
    id: NodeId,
    node: Weak<Node>,
}

impl WeakRef {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn upgrade(&self) -> Option<Ref> {
        self.node.upgrade().map(|node| Ref { node })
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.node.strong_count() > 0
    }
}

impl fmt::Debug for WeakRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRef")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl Ref {
    fn alloc(body: Body, prototype: Option<Prototype>) -> Self {
        Self {
            node: Rc::new(Node {
                id: NodeId::next(),
                kind: body.kind(),
                marks: Marks::default(),
                prototype,
                body: RefCell::new(body),
            }),
        }
    }

    // ── Constructors ─────────────────────────────────────────────────

    #[must_use]
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::alloc(Body::Array(items.into_iter().collect()), None)
    }

    /// A plain object with no prototype.
    #[must_use]
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let props = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::alloc(Body::Object(props), None)
    }

    /// An empty object inheriting from `prototype`.
    #[must_use]
    pub fn object_with_prototype(prototype: &Prototype) -> Self {
        Self::alloc(Body::Object(IndexMap::new()), Some(prototype.clone()))
    }

    #[must_use]
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::alloc(Body::Map(entries.into_iter().collect()), None)
    }

    #[must_use]
    pub fn set(values: impl IntoIterator<Item = Value>) -> Self {
        Self::alloc(Body::Set(values.into_iter().collect()), None)
    }

    #[must_use]
    pub fn weak_map() -> Self {
        Self::alloc(Body::WeakMap(WeakTable::new()), None)
    }

    #[must_use]
    pub fn weak_set() -> Self {
        Self::alloc(Body::WeakSet(WeakTable::new()), None)
    }

    /// A function with its own fresh prototype.
    #[must_use]
    pub fn function(name: impl Into<String>, call: impl Fn(&[Value]) -> Value + 'static) -> Self {
        let name = name.into();
        let prototype = Prototype::new(name.clone());
        Self::function_body(name, Rc::new(call), prototype, None)
    }

    /// A constructor whose instances are plain objects inheriting from a
    /// fresh prototype.
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self::function(name, |_| Value::Undefined)
    }

    /// A constructor whose prototype extends the prototype of `parent`.
    ///
    /// Falls back to a root prototype when `parent` is not a function.
    #[must_use]
    pub fn subclass(name: impl Into<String>, parent: &Ref) -> Self {
        let name = name.into();
        let prototype = match parent.function_prototype() {
            Some(parent) => Prototype::extend(&parent, name.clone()),
            None => Prototype::new(name.clone()),
        };
        Self::function_body(name, Rc::new(|_: &[Value]| Value::Undefined), prototype, None)
    }

    /// A function carrying the annotation-factory marker.
    #[must_use]
    pub fn annotation(
        kind: AnnotationKind,
        call: impl Fn(&[Value]) -> Value + 'static,
    ) -> Self {
        let name = kind.name().to_string();
        let prototype = Prototype::new(name.clone());
        Self::function_body(name, Rc::new(call), prototype, Some(kind))
    }

    fn function_body(
        name: String,
        call: Callable,
        prototype: Prototype,
        annotation: Option<AnnotationKind>,
    ) -> Self {
        Self::alloc(
            Body::Function(FunctionBody {
                name,
                call,
                prototype,
                annotation,
            }),
            None,
        )
    }

    // ── Identity ─────────────────────────────────────────────────────

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.node.kind
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakRef {
        WeakRef {
            id: self.node.id,
            node: Rc::downgrade(&self.node),
        }
    }

    #[must_use]
    pub fn marks(&self) -> &Marks {
        &self.node.marks
    }

    /// Prototype this node inherits from, if any.
    #[must_use]
    pub fn prototype(&self) -> Option<&Prototype> {
        self.node.prototype.as_ref()
    }

    /// Nearest mark: the node's own, then along its prototype chain.
    #[must_use]
    pub fn annotation_mark(&self) -> Option<Mark> {
        self.node
            .marks
            .get()
            .or_else(|| self.prototype().and_then(Prototype::annotation_mark))
    }

    fn mismatch(expected: Kind, found: Kind) -> ValueError {
        ValueError::KindMismatch { expected, found }
    }

    /// Number of elements, entries or own keys. Functions have length 0.
    ///
    /// Weak collections are swept first, so only live entries count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sweep();
        self.node.body.borrow().len()
    }

    /// Drop weak-collection entries whose key has died, releasing their
    /// values. Returns how many were removed; 0 for other kinds.
    pub fn sweep(&self) -> usize {
        match &mut *self.node.body.borrow_mut() {
            Body::WeakMap(table) => table.sweep(),
            Body::WeakSet(table) => table.sweep(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Arrays ───────────────────────────────────────────────────────

    /// Snapshot of array elements, set values, map values or object values.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        match &*self.node.body.borrow() {
            Body::Array(items) => items.clone(),
            Body::Object(props) => props.values().cloned().collect(),
            Body::Map(entries) => entries.values().cloned().collect(),
            Body::Set(values) => values.iter().cloned().collect(),
            Body::WeakMap(_) | Body::WeakSet(_) | Body::Function(_) => Vec::new(),
        }
    }

    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<Value> {
        match &*self.node.body.borrow() {
            Body::Array(items) => items.get(index).cloned(),
            _ => None,
        }
    }

    /// Append and return the new length.
    pub fn push(&self, value: Value) -> Result<usize, ValueError> {
        match &mut *self.node.body.borrow_mut() {
            Body::Array(items) => {
                items.push(value);
                Ok(items.len())
            }
            other => Err(Self::mismatch(Kind::Array, other.kind())),
        }
    }

    pub fn pop(&self) -> Result<Option<Value>, ValueError> {
        match &mut *self.node.body.borrow_mut() {
            Body::Array(items) => Ok(items.pop()),
            other => Err(Self::mismatch(Kind::Array, other.kind())),
        }
    }

    /// Replace element `index`, or append when `index == len`.
    ///
    /// Returns the previous element, if any.
    pub fn set_index(&self, index: usize, value: Value) -> Result<Option<Value>, ValueError> {
        match &mut *self.node.body.borrow_mut() {
            Body::Array(items) => {
                let len = items.len();
                if index < len {
                    Ok(Some(std::mem::replace(&mut items[index], value)))
                } else if index == len {
                    items.push(value);
                    Ok(None)
                } else {
                    Err(ValueError::IndexOutOfBounds { index, len })
                }
            }
            other => Err(Self::mismatch(Kind::Array, other.kind())),
        }
    }

    // ── Objects ──────────────────────────────────────────────────────

    /// Own property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match &*self.node.body.borrow() {
            Body::Object(props) => props.get(key).cloned(),
            _ => None,
        }
    }

    /// Own property, then the prototype chain.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<Value> {
        self.get(key)
            .or_else(|| self.prototype().and_then(|proto| proto.lookup(key)))
    }

    /// `key in object`: own or inherited.
    #[must_use]
    pub fn has_property(&self, key: &str) -> bool {
        self.has_own(key) || self.prototype().is_some_and(|proto| proto.lookup(key).is_some())
    }

    #[must_use]
    pub fn has_own(&self, key: &str) -> bool {
        match &*self.node.body.borrow() {
            Body::Object(props) => props.contains_key(key),
            _ => false,
        }
    }

    /// Own keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        match &*self.node.body.borrow() {
            Body::Object(props) => props.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Own entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        match &*self.node.body.borrow() {
            Body::Object(props) => props.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        }
    }

    /// Set an own property, returning the previous own value.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Result<Option<Value>, ValueError> {
        match &mut *self.node.body.borrow_mut() {
            Body::Object(props) => Ok(props.insert(key.into(), value)),
            other => Err(Self::mismatch(Kind::Object, other.kind())),
        }
    }

    /// Remove an own property, keeping the order of the others.
    pub fn remove(&self, key: &str) -> Result<Option<Value>, ValueError> {
        match &mut *self.node.body.borrow_mut() {
            Body::Object(props) => Ok(props.shift_remove(key)),
            other => Err(Self::mismatch(Kind::Object, other.kind())),
        }
    }

    // ── Maps ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn map_get(&self, key: &Value) -> Option<Value> {
        match &*self.node.body.borrow() {
            Body::Map(entries) => entries.get(key).cloned(),
            Body::WeakMap(table) => table.get(key.node_id()?).cloned(),
            _ => None,
        }
    }

    #[must_use]
    pub fn map_entries(&self) -> Vec<(Value, Value)> {
        match &*self.node.body.borrow() {
            Body::Map(entries) => entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        }
    }

    /// Insert into a map or weak map, returning the previous value.
    pub fn map_insert(&self, key: Value, value: Value) -> Result<Option<Value>, ValueError> {
        match &mut *self.node.body.borrow_mut() {
            Body::Map(entries) => Ok(entries.insert(key, value)),
            Body::WeakMap(table) => {
                let key = key.as_heap().ok_or(ValueError::InvalidWeakKey)?;
                Ok(table.insert(key, value))
            }
            other => Err(Self::mismatch(Kind::Map, other.kind())),
        }
    }

    /// Remove from a map or weak map, returning the removed value.
    pub fn map_remove(&self, key: &Value) -> Result<Option<Value>, ValueError> {
        match &mut *self.node.body.borrow_mut() {
            Body::Map(entries) => Ok(entries.shift_remove(key)),
            Body::WeakMap(table) => Ok(key.node_id().and_then(|id| table.remove(id))),
            other => Err(Self::mismatch(Kind::Map, other.kind())),
        }
    }

    // ── Sets ─────────────────────────────────────────────────────────

    /// Membership for sets and weak sets, key presence for maps and weak maps.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        match &*self.node.body.borrow() {
            Body::Set(values) => values.contains(value),
            Body::Map(entries) => entries.contains_key(value),
            Body::WeakSet(table) => value.node_id().is_some_and(|id| table.get(id).is_some()),
            Body::WeakMap(table) => value.node_id().is_some_and(|id| table.get(id).is_some()),
            _ => false,
        }
    }

    /// Add to a set or weak set; returns whether the value was new.
    pub fn set_insert(&self, value: Value) -> Result<bool, ValueError> {
        match &mut *self.node.body.borrow_mut() {
            Body::Set(values) => Ok(values.insert(value)),
            Body::WeakSet(table) => {
                let key = value.as_heap().ok_or(ValueError::InvalidWeakKey)?;
                Ok(table.insert(key, ()).is_none())
            }
            other => Err(Self::mismatch(Kind::Set, other.kind())),
        }
    }

    /// Remove from a set or weak set; returns whether the value was present.
    pub fn set_remove(&self, value: &Value) -> Result<bool, ValueError> {
        match &mut *self.node.body.borrow_mut() {
            Body::Set(values) => Ok(values.shift_remove(value)),
            Body::WeakSet(table) => Ok(value.node_id().and_then(|id| table.remove(id)).is_some()),
            other => Err(Self::mismatch(Kind::Set, other.kind())),
        }
    }

    /// Empty an array, object, map, set, weak map or weak set.
    pub fn clear(&self) -> Result<(), ValueError> {
        match &mut *self.node.body.borrow_mut() {
            Body::Array(items) => items.clear(),
            Body::Object(props) => props.clear(),
            Body::Map(entries) => entries.clear(),
            Body::Set(values) => values.clear(),
            Body::WeakMap(table) => table.clear(),
            Body::WeakSet(table) => table.clear(),
            Body::Function(_) => return Err(Self::mismatch(Kind::Object, Kind::Function)),
        }
        Ok(())
    }

    // ── Functions ────────────────────────────────────────────────────

    /// Call a function node. Non-functions yield `Undefined`.
    pub fn call(&self, args: &[Value]) -> Value {
        let call = match &*self.node.body.borrow() {
            Body::Function(body) => Rc::clone(&body.call),
            _ => return Value::Undefined,
        };
        call(args)
    }

    /// Create an instance of this constructor.
    pub fn construct(&self) -> Result<Ref, ValueError> {
        let prototype = self
            .function_prototype()
            .ok_or_else(|| Self::mismatch(Kind::Function, self.kind()))?;
        Ok(Ref::object_with_prototype(&prototype))
    }

    /// The shared prototype of a function node.
    #[must_use]
    pub fn function_prototype(&self) -> Option<Prototype> {
        match &*self.node.body.borrow() {
            Body::Function(body) => Some(body.prototype.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn function_name(&self) -> Option<String> {
        match &*self.node.body.borrow() {
            Body::Function(body) => Some(body.name.clone()),
            _ => None,
        }
    }

    /// Annotation-factory marker of a function node.
    #[must_use]
    pub fn annotation_kind(&self) -> Option<AnnotationKind> {
        match &*self.node.body.borrow() {
            Body::Function(body) => body.annotation,
            _ => None,
        }
    }

    /// `value instanceof ctor`.
    #[must_use]
    pub fn is_instance_of(&self, ctor: &Ref) -> bool {
        match (self.prototype(), ctor.function_prototype()) {
            (Some(own), Some(target)) => own.inherits(&target),
            _ => false,
        }
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Ref {}

impl std::hash::Hash for Ref {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.node.id.hash(state);
    }
}

/// Shallow on purpose: nodes may be cyclic.
impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prototype() {
            Some(proto) => write!(f, "{}{}<{}>", self.kind(), self.id(), proto.name())?,
            None => write!(f, "{}{}", self.kind(), self.id())?,
        }
        match self.node.body.try_borrow() {
            Ok(body) => match &*body {
                Body::Function(func) => write!(f, " {}()", func.name),
                Body::Object(props) => {
                    f.write_str(" {")?;
                    for (i, key) in props.keys().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        f.write_str(key)?;
                    }
                    f.write_str("}")
                }
                other => write!(f, " (len {})", other.len()),
            },
            Err(_) => f.write_str(" <borrowed>"),
        }
    }
}

// ─── Observable handle ───────────────────────────────────────────────────────

struct ObservableInner {
    id: NodeId,
    target: Ref,
    shallow: bool,
}

/// Handle to an observable wrapper around a raw heap node.
///
/// This is only the handle: the tracked accessors live in
/// `reactant-runtime`, which is also the only place wrappers are created
/// and registered. Equality is wrapper identity.
#[derive(Clone)]
pub struct Observable {
    inner: Rc<ObservableInner>,
}

/// Weak counterpart of [`Observable`].
#[derive(Clone)]
pub struct WeakObservable {
    id: NodeId,
    inner: Weak<ObservableInner>,
}

impl Observable {
    #[doc(hidden)]
    #[must_use]
    pub fn new(target: Ref, shallow: bool) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                id: NodeId::next(),
                target,
                shallow,
            }),
        }
    }

    /// Identity of the wrapper itself (distinct from the target's).
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// The wrapped raw node, read without tracking.
    #[must_use]
    pub fn target(&self) -> &Ref {
        &self.inner.target
    }

    /// Shallow wrappers hand out children unwrapped.
    #[must_use]
    pub fn is_shallow(&self) -> bool {
        self.inner.shallow
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakObservable {
        WeakObservable {
            id: self.inner.id,
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl WeakObservable {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn upgrade(&self) -> Option<Observable> {
        self.inner.upgrade().map(|inner| Observable { inner })
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl PartialEq for Observable {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Observable {}

impl std::hash::Hash for Observable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = if self.inner.shallow { "shallow" } else { "deep" };
        write!(f, "Observable{}({depth}, {:?})", self.inner.id, self.inner.target)
    }
}

impl fmt::Debug for WeakObservable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakObservable")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
