//! Graph Configuration
//!
//! A graph is created with a `GraphConfig`. The only knob today is how
//! default node names (`map-3`, `zip-4`, `output-5`) are numbered.
//!
//! Configurations are plain serde types so they can be embedded in a larger
//! application config or loaded from JSON:
//!
//! ```rust
//! use rivulet_core::{GraphConfig, NamingPolicy};
//!
//! let cfg = GraphConfig::from_json(r#"{ "naming": "per_kind" }"#).unwrap();
//! assert_eq!(cfg.naming, NamingPolicy::PerKind);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How default node names are numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    /// One counter shared by every node kind, bumped on every registration
    /// (including explicitly named nodes and sources).
    ///
    /// `map-3` and `zip-3` can never both be generated under this policy.
    #[default]
    Shared,

    /// One counter per node kind, bumped only when a node of that kind is
    /// registered. The first unnamed map is `map-0`, the first unnamed zip
    /// is `zip-0`, and so on.
    PerKind,
}

/// Configuration for a [`Graph`](crate::Graph).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Numbering scheme for default node names.
    pub naming: NamingPolicy,
}

impl GraphConfig {
    /// Parse a configuration from a JSON document.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Use the given naming policy.
    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlowError;

    #[test]
    fn default_is_shared_counter() {
        assert_eq!(GraphConfig::default().naming, NamingPolicy::Shared);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = GraphConfig::from_json("{}").unwrap();
        assert_eq!(cfg, GraphConfig::default());
    }

    #[test]
    fn parses_per_kind() {
        let cfg = GraphConfig::from_json(r#"{"naming":"per_kind"}"#).unwrap();
        assert_eq!(cfg.naming, NamingPolicy::PerKind);
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = GraphConfig::from_json(r#"{"naming":"random"}"#).unwrap_err();
        assert!(matches!(err, FlowError::Config(_)));
    }
}
