//! Per-thread runtime configuration.
//!
//! The classifier and the serializer recognise foreign object shapes by
//! marker keys. The defaults match the shapes produced by common UI,
//! date/time and schema libraries; hosts with different conventions can
//! install their own names with [`configure`].

use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::context::with_runtime;

/// Marker keys used to detect objects that own their representation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct RuntimeConfig {
    /// Key carried by UI-tree elements (together with `element_owner`).
    pub element_marker: String,
    /// Owner key carried by UI-tree elements.
    pub element_owner: String,
    /// Truthy on date/time library objects.
    pub date_marker: String,
    /// Truthy on schema objects.
    pub schema_marker: String,
    /// Methods through which an object serializes itself.
    pub serializer_methods: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            element_marker: "$$typeof".to_string(),
            element_owner: "_owner".to_string(),
            date_marker: "_isAMomentObject".to_string(),
            schema_marker: "_isJSONSchemaObject".to_string(),
            serializer_methods: vec!["toJS".to_string(), "toJSON".to_string()],
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_element_keys(mut self, marker: impl Into<String>, owner: impl Into<String>) -> Self {
        self.element_marker = marker.into();
        self.element_owner = owner.into();
        self
    }

    #[must_use]
    pub fn with_date_marker(mut self, marker: impl Into<String>) -> Self {
        self.date_marker = marker.into();
        self
    }

    #[must_use]
    pub fn with_schema_marker(mut self, marker: impl Into<String>) -> Self {
        self.schema_marker = marker.into();
        self
    }

    /// Replace the serializer method names.
    #[must_use]
    pub fn with_serializer_methods<S: Into<String>>(
        mut self,
        methods: impl IntoIterator<Item = S>,
    ) -> Self {
        self.serializer_methods = methods.into_iter().map(Into::into).collect();
        self
    }
}

/// Install `config` for the current thread.
pub fn configure(config: RuntimeConfig) {
    with_runtime(|rt| rt.set_config(config));
}

/// The configuration active on the current thread.
#[must_use]
pub fn config() -> Rc<RuntimeConfig> {
    with_runtime(|rt| rt.config())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_the_common_markers() {
        let config = RuntimeConfig::default();
        assert_eq!(config.element_marker, "$$typeof");
        assert_eq!(config.element_owner, "_owner");
        assert_eq!(config.serializer_methods, ["toJS", "toJSON"]);
    }

    #[test]
    fn configure_is_per_thread() {
        configure(RuntimeConfig::default().with_date_marker("_isDayjs"));
        assert_eq!(config().date_marker, "_isDayjs");

        let other = std::thread::spawn(|| config().date_marker.clone())
            .join()
            .expect("thread");
        assert_eq!(other, "_isAMomentObject");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_config_fills_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"schema_marker": "_isSchema"}"#).expect("valid config");
        assert_eq!(config.schema_marker, "_isSchema");
        assert_eq!(config.date_marker, "_isAMomentObject");
    }
}
