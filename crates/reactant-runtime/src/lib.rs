#![forbid(unsafe_code)]

//! Runtime: the reactive observability engine.
//!
//! This crate turns plain [`Value`](reactant_core::Value) graphs into
//! observable ones and back:
//!
//! - [`observable`] / [`observable_shallow`]: wrap an eligible node in a
//!   registered [`Observable`](reactant_core::Observable).
//! - [`ObservableExt`]: tracked reads and change-notifying writes.
//! - [`autorun`], [`Computed`], [`batch`], [`untracked`]: reactions built on
//!   dependency tracking.
//! - [`is_observable`], [`raw`]: identity registry lookups.
//! - [`is_support_observable`]: the wrap-eligibility classifier.
//! - [`mark_raw`], [`mark_observable`], [`is_annotation`]: annotations.
//! - [`to_js`]: cycle-safe deep conversion back to raw data.
//! - [`has_collected`]: did a callback perform a tracked read?
//!
//! # Architecture
//!
//! All state lives in a thread-local runtime: the registry's two weak side
//! tables, the tracker, the collection flag and the active
//! [`RuntimeConfig`]. Values are `!Send`, so each thread owns a separate,
//! consistent world.
//!
//! # Invariants
//!
//! 1. At most one live wrapper exists per raw node.
//! 2. The registry never keeps a raw node or a wrapper alive.
//! 3. No runtime borrow is held while user code runs.

pub mod annotate;
pub mod classify;
pub mod computed;
pub mod config;
mod context;
pub mod error;
pub mod logging;
pub mod observable;
pub mod probe;
pub mod reaction;
mod registry;
pub mod serialize;
mod tracker;

pub use annotate::{annotation, is_annotation, mark_observable, mark_raw};
pub use classify::is_support_observable;
pub use computed::Computed;
pub use config::{RuntimeConfig, config, configure};
pub use error::{ReactiveError, Result};
pub use observable::{ObservableExt, observable, observable_shallow};
pub use probe::has_collected;
pub use reaction::{Reaction, autorun};
pub use registry::{RegistryStats, is_observable, prune_registry, raw, registry_stats};
pub use serialize::to_js;
pub use tracker::{batch, untracked};
