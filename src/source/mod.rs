//! Source configuration boundary
//!
//! Maps a logical source name to its bound set of named inputs and the
//! extractor type that understands them. The catalog is populated during
//! startup composition and treated as immutable afterwards, so concurrent
//! readers need no locking.

use std::collections::{BTreeMap, BTreeSet};

use crate::plugin::ExtractionError;

/// Named text payloads bound to one source (e.g. `connector`, `data`, `xsd`).
#[derive(Debug, Default, Clone)]
pub struct SourceInputs {
    inputs: BTreeMap<String, String>,
}

impl SourceInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, payload: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), payload.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inputs.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    /// Input names actually supplied, for descriptor validation.
    pub fn names(&self) -> BTreeSet<&str> {
        self.inputs.keys().map(String::as_str).collect()
    }

    /// Fetch a required input, as a configuration error when absent.
    pub fn require(&self, name: &str) -> Result<&str, ExtractionError> {
        self.get(name).ok_or_else(|| {
            ExtractionError::Configuration(format!("required input '{}' is missing", name))
        })
    }
}

/// One configured source: which extractor type to use and its inputs.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub source_type: String,
    pub inputs: SourceInputs,
}

impl SourceConfig {
    pub fn new(source_type: impl Into<String>, inputs: SourceInputs) -> Self {
        Self {
            source_type: source_type.into(),
            inputs,
        }
    }
}

/// Read-only registry of configured sources, keyed by logical name.
#[derive(Debug, Default, Clone)]
pub struct SourceCatalog {
    sources: BTreeMap<String, SourceConfig>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Startup-time composition; not intended for use after the catalog is
    /// shared.
    pub fn with_source(mut self, name: impl Into<String>, config: SourceConfig) -> Self {
        self.sources.insert(name.into(), config);
        self
    }

    pub fn get(&self, name: &str) -> Result<&SourceConfig, ExtractionError> {
        self.sources
            .get(name)
            .ok_or_else(|| ExtractionError::NotFound(format!("source '{}' does not exist", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_is_not_found() {
        let catalog = SourceCatalog::new();
        assert!(matches!(
            catalog.get("mondial"),
            Err(ExtractionError::NotFound(_))
        ));
    }

    #[test]
    fn test_require_missing_input() {
        let inputs = SourceInputs::new().with("data", "<a/>");
        assert!(inputs.require("data").is_ok());
        assert!(matches!(
            inputs.require("connector"),
            Err(ExtractionError::Configuration(_))
        ));
    }
}
