#![forbid(unsafe_code)]

//! Reactant public facade crate.
//!
//! Re-exports the value model and the reactive runtime behind one
//! dependency. Most users want the prelude:
//!
//! ```
//! use reactant::prelude::*;
//!
//! let state = observable(Value::object([("count", Value::from(0))]));
//! assert!(is_observable(&state));
//! let snapshot = to_js(&state);
//! assert!(!is_observable(&snapshot));
//! ```

pub use reactant_core as core;
pub use reactant_runtime as runtime;

pub mod prelude {
    pub use reactant_core::checkers;
    pub use reactant_core::{AnnotationKind, Kind, Observable, Prototype, Ref, Value};
    pub use reactant_runtime::{
        Computed, ObservableExt, Reaction, ReactiveError, RegistryStats, RuntimeConfig, annotation,
        autorun, batch, config, configure, has_collected, is_annotation, is_observable,
        is_support_observable, mark_observable, mark_raw, observable, observable_shallow,
        prune_registry, raw, registry_stats, to_js, untracked,
    };
}
