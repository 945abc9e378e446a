use reactant_core::ValueError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReactiveError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// `has_collected` was called from inside another probe's callback.
    #[error("dependency probe invoked while another probe is active")]
    ReentrantProbe,

    #[error(transparent)]
    Value(#[from] ValueError),
}
