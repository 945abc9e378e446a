use thiserror::Error;

use crate::heap::Kind;

/// Errors raised by structural mutation of heap nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    KindMismatch { expected: Kind, found: Kind },

    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("weak collections only accept heap values as keys")]
    InvalidWeakKey,
}
