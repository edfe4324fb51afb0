//! End-to-end relational extraction through the registry and source catalog.

use er_modelling_core::{
    builtin_registry, entities_from_json, entities_to_json, Cardinality, Entity, ExtractionError,
    SourceCatalog, SourceConfig, SourceCursor, SourceInputs,
};

const LIBRARY_DDL: &str = "\
    CREATE TABLE Author (id INT PRIMARY KEY, name VARCHAR(100));\
    CREATE TABLE Book (id INT PRIMARY KEY, title VARCHAR(200),\
     author_id INT NOT NULL REFERENCES Author);";

fn library_catalog() -> SourceCatalog {
    SourceCatalog::new().with_source(
        "library-db",
        SourceConfig::new(
            "relational",
            SourceInputs::new().with("connector", LIBRARY_DDL),
        ),
    )
}

fn entity<'a>(entities: &'a [Entity], name: &str) -> &'a Entity {
    entities
        .iter()
        .find(|e| e.canonical_name() == name)
        .unwrap_or_else(|| panic!("entity {} missing", name))
}

#[test]
fn test_extraction_through_registry() {
    let cursor = builtin_registry()
        .open(&library_catalog(), "library-db")
        .unwrap();
    let entities = cursor.get_all_entities().unwrap();
    assert_eq!(entities.len(), 2);

    let author = entity(&entities, "Author");
    assert!(!author.is_weak());
    assert!(author.attribute("id").unwrap().is_key());

    let book = entity(&entities, "Book");
    assert!(book.is_weak());
    let relation = &book.outgoing_relations[0];
    assert_eq!(relation.object_entity, "Author");
    assert!(relation.is_identifying());
    assert_eq!(relation.object_cardinality, Cardinality::ExactlyOne);
    assert_eq!(relation.subject_cardinality, Cardinality::Any);
}

#[test]
fn test_entity_lookup_by_id() {
    let cursor = builtin_registry()
        .open(&library_catalog(), "library-db")
        .unwrap();
    let book = cursor.get_entity_by_id("Book").unwrap();
    assert_eq!(book.canonical_name(), "Book");

    let err = cursor.get_entity_by_id("Magazine").unwrap_err();
    assert!(matches!(err, ExtractionError::NotFound(_)));
}

#[test]
fn test_related_entity_links() {
    let cursor = builtin_registry()
        .open(&library_catalog(), "library-db")
        .unwrap();
    let links = cursor.get_related_entity_links("Book").unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].object_entity, "Author");

    assert!(cursor.get_related_entity_links("Author").unwrap().is_empty());
}

#[test]
fn test_unknown_input_name_is_rejected_before_extraction() {
    let catalog = SourceCatalog::new().with_source(
        "bad",
        SourceConfig::new("relational", SourceInputs::new().with("data", "x")),
    );
    let err = builtin_registry().open(&catalog, "bad").unwrap_err();
    assert!(matches!(err, ExtractionError::Configuration(_)));
}

#[test]
fn test_malformed_ddl_is_input_data_error() {
    let catalog = SourceCatalog::new().with_source(
        "bad",
        SourceConfig::new(
            "relational",
            SourceInputs::new().with("connector", "CREATE ELEPHANT Author;"),
        ),
    );
    let err = builtin_registry().open(&catalog, "bad").unwrap_err();
    assert!(matches!(err, ExtractionError::InputData(_)));
}

#[test]
fn test_extraction_result_survives_export() {
    let cursor = builtin_registry()
        .open(&library_catalog(), "library-db")
        .unwrap();
    let entities = cursor.get_all_entities().unwrap();
    let json = entities_to_json(&entities).unwrap();
    assert_eq!(entities_from_json(&json).unwrap(), entities);
}

#[test]
fn test_foreign_key_cycle_is_broken() {
    // Primary keys chained as foreign keys: A.id -> B.id -> A.id. One
    // constraint is excluded, so exactly one table classifies weak.
    let catalog = SourceCatalog::new().with_source(
        "cyclic",
        SourceConfig::new(
            "relational",
            SourceInputs::new().with(
                "connector",
                "CREATE TABLE A (id INT PRIMARY KEY,\
                  CONSTRAINT a_b_fkey FOREIGN KEY (id) REFERENCES B (id));\
                 CREATE TABLE B (id INT PRIMARY KEY,\
                  CONSTRAINT b_a_fkey FOREIGN KEY (id) REFERENCES A (id));",
            ),
        ),
    );
    let cursor = builtin_registry().open(&catalog, "cyclic").unwrap();
    let entities = cursor.get_all_entities().unwrap();
    assert_eq!(entities.iter().filter(|e| e.is_weak()).count(), 1);
}
