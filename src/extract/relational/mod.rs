//! Relational reverse-engineering extractor
//!
//! Turns a relational catalog into ER entities: one entity per base table,
//! attributes from columns, relations from foreign keys, and weak/strong
//! classification driven by non-nullable foreign keys after breaking
//! foreign-key cycles.

pub mod catalog;
mod cycles;

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Attribute, Cardinality, Entity, EntityArena, Relation};
use crate::plugin::{ExtractionError, SourceCursor, SourceTypeDescriptor};
use crate::source::SourceInputs;

pub use catalog::{CatalogSource, DdlCatalog, ForeignKeyEdge, TableColumn};

fn validate_inputs(provided: &BTreeSet<&str>) -> Result<(), String> {
    if provided.contains("connector") {
        Ok(())
    } else {
        Err("input 'connector' is required".to_string())
    }
}

/// Cursor over one relational catalog.
pub struct RelationalCursor {
    catalog: Box<dyn CatalogSource + Send + Sync>,
}

impl std::fmt::Debug for RelationalCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalCursor").finish_non_exhaustive()
    }
}

impl RelationalCursor {
    pub fn descriptor() -> SourceTypeDescriptor {
        SourceTypeDescriptor::new("relational", &["connector"], validate_inputs)
    }

    pub fn new(catalog: Box<dyn CatalogSource + Send + Sync>) -> Self {
        Self { catalog }
    }

    /// Bind to a source whose `connector` input is a DDL script.
    pub fn from_inputs(inputs: &SourceInputs) -> Result<Self, ExtractionError> {
        let ddl = inputs.require("connector")?;
        Ok(Self::new(Box::new(DdlCatalog::parse(ddl)?)))
    }
}

/// Map a raw column type to the logical attribute type.
fn logical_type(raw: &str) -> &'static str {
    let raw = raw.to_lowercase();
    if ["int", "serial"].iter().any(|k| raw.contains(k)) {
        "int"
    } else if ["real", "double", "numeric", "float", "decimal"]
        .iter()
        .any(|k| raw.contains(k))
    {
        "float"
    } else {
        "string"
    }
}

/// Annotate every edge of a constraint with the constraint's total column
/// count.
fn annotate_column_counts(edges: &mut [ForeignKeyEdge]) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for edge in edges.iter() {
        let count = counts.entry(edge.constraint_name.clone()).or_insert(0);
        *count = (*count).max(edge.ordinal);
    }
    for edge in edges.iter_mut() {
        edge.column_count = counts[&edge.constraint_name];
    }
}

impl SourceCursor for RelationalCursor {
    fn get_all_entities(&self) -> Result<Vec<Entity>, ExtractionError> {
        let table_names = self.catalog.table_names()?;
        let columns = self.catalog.columns()?;
        let mut foreign_keys = self.catalog.foreign_keys()?;
        annotate_column_counts(&mut foreign_keys);

        let excluded = cycles::excluded_constraints(&foreign_keys);
        tracing::debug!(
            tables = table_names.len(),
            foreign_key_edges = foreign_keys.len(),
            excluded_constraints = excluded.len(),
            "relational extraction"
        );

        // An edge determines weakness when it is non-nullable and its
        // constraint was not excluded by cycle breaking.
        let determines_weakness =
            |edge: &ForeignKeyEdge| !edge.nullable && !excluded.contains(&edge.constraint_name);

        let mut attribute_lookup: BTreeMap<&str, Vec<Attribute>> = BTreeMap::new();
        for column in &columns {
            let mut attribute =
                Attribute::with_type(column.name.clone(), logical_type(&column.data_type));
            if column.primary_key {
                attribute.mark_key();
            }
            attribute_lookup
                .entry(column.table.as_str())
                .or_default()
                .push(attribute);
        }

        let mut arena = EntityArena::new();
        for table in &table_names {
            let mut entity = Entity::new(table.clone());
            if let Some(attributes) = attribute_lookup.remove(table.as_str()) {
                entity.attributes = attributes;
            }
            if foreign_keys
                .iter()
                .any(|edge| edge.foreign_table == *table && determines_weakness(edge))
            {
                entity.mark_weak();
            }
            arena.insert(entity);
        }

        // One relation per distinct referenced table, named after the
        // referencing table.
        for table in &table_names {
            let mut seen_targets = BTreeSet::new();
            for edge in foreign_keys.iter().filter(|e| e.foreign_table == *table) {
                if !seen_targets.insert(edge.primary_table.clone()) {
                    continue;
                }
                let group: Vec<&ForeignKeyEdge> = foreign_keys
                    .iter()
                    .filter(|e| e.foreign_table == *table && e.primary_table == edge.primary_table)
                    .collect();
                let identifying = group.iter().any(|e| determines_weakness(e));
                let non_nullable = group.iter().any(|e| !e.nullable);

                let mut relation =
                    Relation::new(table.clone(), table.clone(), edge.primary_table.clone());
                // Parents per child row; children per parent are unbounded.
                relation.object_cardinality = if non_nullable {
                    Cardinality::ExactlyOne
                } else {
                    Cardinality::OneOrNone
                };
                relation.subject_cardinality = Cardinality::Any;
                if identifying {
                    relation.mark_identifying();
                }
                arena.link(relation);
            }
        }

        Ok(arena.into_entities())
    }
}
