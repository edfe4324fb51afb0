//! Canonical ER model types
//!
//! Defines the entity/attribute/relation structures every extractor produces,
//! plus the cardinality algebra used on relation endpoints.

pub mod cardinality;
pub mod entity;

pub use cardinality::Cardinality;
pub use entity::{
    Attribute, AttributeModifier, Entity, EntityArena, EntityModifier, EntityRef, Relation,
    RelationModifier,
};
