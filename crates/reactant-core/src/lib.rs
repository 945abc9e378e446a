#![forbid(unsafe_code)]

//! Core: the dynamic value model the reactive engine instruments.
//!
//! - [`Value`]: a primitive or a handle to a heap node.
//! - [`Ref`]: identity-compared heap node (array, object, map, set, weak
//!   map, weak set or function).
//! - [`Prototype`]: shared per-constructor storage for methods and marks.
//! - [`Observable`]: the wrapper handle produced by `reactant-runtime`.
//! - [`checkers`]: shape predicates that look through wrappers.
//! - [`annotation`]: raw/observable marks and annotation factories.

pub mod annotation;
pub mod checkers;
pub mod error;
pub mod heap;
#[cfg(feature = "serde")]
pub mod json;
pub mod value;

pub use annotation::{AnnotationKind, Mark, Marks};
pub use error::ValueError;
pub use heap::{Kind, NodeId, Observable, Prototype, Ref, WeakObservable, WeakRef};
pub use value::Value;
