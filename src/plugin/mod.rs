//! Plugin/cursor contract
//!
//! Every source-type-specific extractor implements the same capability
//! interface and is described by a [`SourceTypeDescriptor`]. Dispatch is a
//! closed set of tagged variants ([`Extractor`]) rather than open trait
//! objects, so the set of supported source types is known at compile time.

pub mod registry;

use std::collections::BTreeSet;

use crate::extract::document::DocumentCursor;
use crate::extract::relational::RelationalCursor;
use crate::models::{Entity, Relation};

/// Error taxonomy for extraction calls.
///
/// Extractors never swallow structural errors and never return partial
/// results: either the full canonical entity set succeeds or the call fails
/// as a whole.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Source content is present but malformed or invalid relative to its own
    /// declared schema. Recoverable at the caller as a bad-input response.
    #[error("Input data error: {0}")]
    InputData(String),
    /// Named source or named entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Recognized but unimplemented source dialect. Fatal for the call, not
    /// retried; fixed by adding support, not by retrying.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),
    /// Unknown extractor type or invalid input-name set, detected before
    /// extraction is attempted.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Declares a source type: its unique name, the named logical inputs it
/// understands, and a validation predicate over the input names actually
/// supplied for a source.
#[derive(Debug, Clone, Copy)]
pub struct SourceTypeDescriptor {
    pub name: &'static str,
    pub inputs: &'static [&'static str],
    validate: fn(&BTreeSet<&str>) -> Result<(), String>,
}

impl SourceTypeDescriptor {
    pub const fn new(
        name: &'static str,
        inputs: &'static [&'static str],
        validate: fn(&BTreeSet<&str>) -> Result<(), String>,
    ) -> Self {
        Self {
            name,
            inputs,
            validate,
        }
    }

    /// Reject a source configuration before any extraction is attempted:
    /// unknown input names and failed predicates are configuration errors.
    pub fn validate_inputs(&self, provided: &BTreeSet<&str>) -> Result<(), ExtractionError> {
        for name in provided {
            if !self.inputs.contains(name) {
                return Err(ExtractionError::Configuration(format!(
                    "source type '{}' does not accept input '{}'",
                    self.name, name
                )));
            }
        }
        (self.validate)(provided).map_err(|message| {
            ExtractionError::Configuration(format!("source type '{}': {}", self.name, message))
        })
    }
}

/// Capability interface of a cursor bound to one concrete source instance.
///
/// Extraction is synchronous and side-effect-free with respect to shared
/// state; entities are materialized fresh on every call.
pub trait SourceCursor {
    /// Full extraction of the canonical entity set.
    fn get_all_entities(&self) -> Result<Vec<Entity>, ExtractionError>;

    /// Look up one entity by canonical name or alias. Extraction is cheap
    /// relative to source I/O, so the default runs a full extraction and
    /// filters.
    fn get_entity_by_id(&self, entity_id: &str) -> Result<Entity, ExtractionError> {
        self.get_all_entities()?
            .into_iter()
            .find(|entity| entity.names.iter().any(|name| name == entity_id))
            .ok_or_else(|| {
                ExtractionError::NotFound(format!("entity '{}' does not exist", entity_id))
            })
    }

    /// Relations in which the named entity is the subject. Full extraction
    /// already returns relations inline, so the default derives them from
    /// [`SourceCursor::get_entity_by_id`].
    fn get_related_entity_links(&self, entity_id: &str) -> Result<Vec<Relation>, ExtractionError> {
        Ok(self.get_entity_by_id(entity_id)?.outgoing_relations)
    }
}

/// The closed set of extractor implementations shipped with the engine.
#[derive(Debug)]
pub enum Extractor {
    Relational(RelationalCursor),
    Document(DocumentCursor),
}

impl Extractor {
    pub fn descriptor(&self) -> SourceTypeDescriptor {
        match self {
            Extractor::Relational(_) => RelationalCursor::descriptor(),
            Extractor::Document(_) => DocumentCursor::descriptor(),
        }
    }
}

impl SourceCursor for Extractor {
    fn get_all_entities(&self) -> Result<Vec<Entity>, ExtractionError> {
        match self {
            Extractor::Relational(cursor) => cursor.get_all_entities(),
            Extractor::Document(cursor) => cursor.get_all_entities(),
        }
    }

    fn get_entity_by_id(&self, entity_id: &str) -> Result<Entity, ExtractionError> {
        match self {
            Extractor::Relational(cursor) => cursor.get_entity_by_id(entity_id),
            Extractor::Document(cursor) => cursor.get_entity_by_id(entity_id),
        }
    }

    fn get_related_entity_links(&self, entity_id: &str) -> Result<Vec<Relation>, ExtractionError> {
        match self {
            Extractor::Relational(cursor) => cursor.get_related_entity_links(entity_id),
            Extractor::Document(cursor) => cursor.get_related_entity_links(entity_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn require_data(provided: &BTreeSet<&str>) -> Result<(), String> {
        if provided.contains("data") {
            Ok(())
        } else {
            Err("input 'data' is required".to_string())
        }
    }

    #[test]
    fn test_descriptor_rejects_unknown_input() {
        let descriptor = SourceTypeDescriptor::new("document", &["data", "xsd"], require_data);
        let provided = ["data", "connector"].into_iter().collect();
        let err = descriptor.validate_inputs(&provided).unwrap_err();
        assert!(matches!(err, ExtractionError::Configuration(_)));
    }

    #[test]
    fn test_descriptor_runs_predicate() {
        let descriptor = SourceTypeDescriptor::new("document", &["data", "xsd"], require_data);
        let provided = ["xsd"].into_iter().collect();
        assert!(descriptor.validate_inputs(&provided).is_err());
        let provided = ["data", "xsd"].into_iter().collect();
        assert!(descriptor.validate_inputs(&provided).is_ok());
    }
}
