//! ER Modelling Core - schema canonicalization engine
//!
//! Ingests structurally heterogeneous data sources and canonicalizes them into
//! one Entity-Relationship model with uniform cardinality and weak/strong
//! entity semantics, so downstream consumers (diagram builders, exporters,
//! API surfaces) never have to know the source format.
//!
//! Provides:
//! - The ER data model and cardinality algebra
//! - The plugin/cursor contract every extractor implements
//! - Relational reverse engineering (foreign-key graph analysis)
//! - Semi-structured document inference (schema-less and XSD-guided)
//! - An extractor registry and source configuration boundary
//! - JSON/YAML export of canonical entity lists

pub mod export;
pub mod extract;
pub mod models;
pub mod plugin;
pub mod source;

// Re-export commonly used types
pub use export::{
    entities_from_json, entities_from_yaml, entities_to_json, entities_to_yaml, ExportError,
};
pub use extract::document::DocumentCursor;
pub use extract::relational::{CatalogSource, DdlCatalog, RelationalCursor};
pub use models::{
    Attribute, AttributeModifier, Cardinality, Entity, EntityArena, EntityModifier, EntityRef,
    Relation, RelationModifier,
};
pub use plugin::registry::{builtin_registry, ExtractorFactory, ExtractorRegistry};
pub use plugin::{ExtractionError, Extractor, SourceCursor, SourceTypeDescriptor};
pub use source::{SourceCatalog, SourceConfig, SourceInputs};
