//! Annotation marks and annotation-factory kinds.
//!
//! A [`Marks`] cell lives on every heap node and every [`Prototype`]. It
//! holds two independent, permanent flags: *raw* (never wrap) and
//! *observable* (always wrap, even when structural heuristics say no).
//!
//! Resolution walks from the most specific level outwards: the node's own
//! marks, then its prototype, then the prototype's parents. The first level
//! carrying any flag decides; if it carries both, raw wins.
//!
//! [`Prototype`]: crate::heap::Prototype

use std::cell::Cell;
use std::fmt;

/// Polarity of an annotation mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    /// Never make observable.
    Raw,
    /// Treat as observable-shaped.
    Observable,
}

/// Per-node mark flags. There is no unmark.
#[derive(Default)]
pub struct Marks {
    raw: Cell<bool>,
    observable: Cell<bool>,
}

impl Marks {
    /// Set a flag. Returns `false` if it was already set.
    pub fn insert(&self, mark: Mark) -> bool {
        let cell = match mark {
            Mark::Raw => &self.raw,
            Mark::Observable => &self.observable,
        };
        !cell.replace(true)
    }

    #[must_use]
    pub fn contains(&self, mark: Mark) -> bool {
        match mark {
            Mark::Raw => self.raw.get(),
            Mark::Observable => self.observable.get(),
        }
    }

    /// The mark this level contributes, raw first.
    #[must_use]
    pub fn get(&self) -> Option<Mark> {
        if self.raw.get() {
            Some(Mark::Raw)
        } else if self.observable.get() {
            Some(Mark::Observable)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }
}

impl fmt::Debug for Marks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marks")
            .field("raw", &self.raw.get())
            .field("observable", &self.observable.get())
            .finish()
    }
}

/// Kind of an annotation factory: a function that produces observable
/// configuration rather than being data itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    /// Deep observable: children are wrapped on read.
    Deep,
    /// Shallow observable: only the top level is tracked.
    Shallow,
    /// Reference: the value is stored as-is, never wrapped.
    Ref,
}

impl AnnotationKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deep => "observable.deep",
            Self::Shallow => "observable.shallow",
            Self::Ref => "observable.ref",
        }
    }
}
