//! Export boundary
//!
//! Serializes extraction results to the interchange formats and reads them
//! back. The entity list is the canonical shape; both formats carry the same
//! field names.

use thiserror::Error;

use crate::models::Entity;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub fn entities_to_json(entities: &[Entity]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(entities)?)
}

pub fn entities_from_json(json: &str) -> Result<Vec<Entity>, ExportError> {
    Ok(serde_json::from_str(json)?)
}

pub fn entities_to_yaml(entities: &[Entity]) -> Result<String, ExportError> {
    Ok(serde_yaml::to_string(entities)?)
}

pub fn entities_from_yaml(yaml: &str) -> Result<Vec<Entity>, ExportError> {
    Ok(serde_yaml::from_str(yaml)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{Attribute, Cardinality, Relation};

    fn sample() -> Vec<Entity> {
        let mut author = Entity::new("Author");
        let mut id = Attribute::with_type("id", "int");
        id.mark_key();
        author.attributes.push(id);

        let mut book = Entity::new("Book");
        book.mark_weak();
        let mut relation = Relation::new("Book", "Book", "Author");
        relation.object_cardinality = Cardinality::ExactlyOne;
        relation.mark_identifying();
        book.outgoing_relations.push(relation);

        vec![author, book]
    }

    #[test]
    fn test_json_round_trip() {
        let entities = sample();
        let json = entities_to_json(&entities).unwrap();
        assert_eq!(entities_from_json(&json).unwrap(), entities);
    }

    #[test]
    fn test_yaml_round_trip() {
        let entities = sample();
        let yaml = entities_to_yaml(&entities).unwrap();
        assert_eq!(entities_from_yaml(&yaml).unwrap(), entities);
    }

    #[test]
    fn test_empty_collections_are_elided() {
        let json = entities_to_json(&[Entity::new("Marker")]).unwrap();
        assert!(!json.contains("attributes"));
        assert!(!json.contains("outgoingRelations"));
        assert!(json.contains("Marker"));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(entities_from_json("{not json").is_err());
    }

    #[test]
    fn test_import_rejects_empty_name_list() {
        assert!(entities_from_json(r#"[{"names": []}]"#).is_err());
        assert!(entities_from_yaml("- names: []\n").is_err());
    }
}
