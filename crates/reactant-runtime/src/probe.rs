//! Dependency-collection probe.

use crate::context::{try_with_runtime, with_runtime};
use crate::error::{ReactiveError, Result};
#[cfg(feature = "tracing")]
use crate::logging::warn;
#[cfg(not(feature = "tracing"))]
use crate::warn;

/// Releases the probe slot, also on unwind.
struct ProbeGuard;

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        let _ = try_with_runtime(|rt| rt.end_probe());
    }
}

/// Whether `callback` performs at least one tracked read.
///
/// Resets the collection flag, runs `callback`, and returns the flag.
/// Untracked reads count too: the flag records reads, not dependencies.
///
/// # Errors
///
/// [`ReactiveError::ReentrantProbe`] if called from inside another probe's
/// callback. The outer probe's result is left intact.
pub fn has_collected(callback: impl FnOnce()) -> Result<bool> {
    if !with_runtime(|rt| rt.begin_probe()) {
        warn!("has_collected called while another probe is active");
        return Err(ReactiveError::ReentrantProbe);
    }
    let _guard = ProbeGuard;
    with_runtime(|rt| rt.set_collected(false));
    callback();
    Ok(with_runtime(|rt| rt.collected()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::{ObservableExt, observable};
    use reactant_core::Value;

    #[test]
    fn empty_callback_collects_nothing() {
        assert_eq!(has_collected(|| {}), Ok(false));
    }

    #[test]
    fn tracked_read_is_collected() {
        let state = observable(Value::object([("x", Value::from(1))]));
        let Value::Observable(proxy) = state else {
            panic!("object should be wrapped");
        };
        assert_eq!(
            has_collected(|| {
                let _ = proxy.get("x");
            }),
            Ok(true)
        );
    }

    #[test]
    fn raw_reads_are_not_collected() {
        let raw = reactant_core::Ref::object([("x", Value::from(1))]);
        assert_eq!(
            has_collected(|| {
                let _ = raw.get("x");
            }),
            Ok(false)
        );
    }

    #[test]
    fn nested_probe_is_rejected() {
        let mut inner = None;
        let outer = has_collected(|| inner = Some(has_collected(|| {})));
        assert_eq!(inner, Some(Err(ReactiveError::ReentrantProbe)));
        assert_eq!(outer, Ok(false));
        assert_eq!(has_collected(|| {}), Ok(false), "slot released");
    }

    #[test]
    fn panic_releases_the_slot() {
        let result = std::panic::catch_unwind(|| has_collected(|| panic!("callback failed")));
        assert!(result.is_err());
        assert_eq!(has_collected(|| {}), Ok(false));
    }
}
