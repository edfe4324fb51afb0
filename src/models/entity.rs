//! Entity, attribute and relation models
//!
//! Entities live in one owning collection keyed by canonical name (the
//! [`EntityArena`]); relations reference entities only by that key, never by
//! pointer, since the relation graph is not acyclic.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::cardinality::Cardinality;

/// Lookup key into the owning entity collection: an entity's canonical name.
pub type EntityRef = String;

/// `names` must stay non-empty (the first entry is the canonical name), so
/// imported records are rejected before they can violate that.
fn non_empty_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    if names.is_empty() {
        return Err(serde::de::Error::custom("names must not be empty"));
    }
    Ok(names)
}

/// Modifier on an entity. Currently only weakness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityModifier {
    /// The entity's identity depends on an owning entity via an identifying
    /// relation.
    Weak,
}

/// Modifier on an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeModifier {
    /// Part of the entity's key.
    Key,
}

/// Modifier on a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationModifier {
    /// The subject entity's existence/identity depends on the object entity.
    Identifying,
}

/// Scalar field of an entity or relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Non-empty; the first name is canonical, later names are aliases.
    #[serde(deserialize_with = "non_empty_names")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub modifiers: BTreeSet<AttributeModifier>,
    /// Logical type (`int` | `float` | `string`) where the source declares
    /// one; document-inferred attributes leave it unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
            modifiers: BTreeSet::new(),
            data_type: None,
        }
    }

    pub fn with_type(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
            modifiers: BTreeSet::new(),
            data_type: Some(data_type.into()),
        }
    }

    pub fn canonical_name(&self) -> &str {
        &self.names[0]
    }

    pub fn mark_key(&mut self) {
        self.modifiers.insert(AttributeModifier::Key);
    }

    pub fn is_key(&self) -> bool {
        self.modifiers.contains(&AttributeModifier::Key)
    }
}

/// Directed, cardinality-bearing edge between two entities.
///
/// Endpoints are [`EntityRef`] keys resolved through the arena at traversal
/// time. `subject_cardinality` is how many subjects may exist per object,
/// `object_cardinality` how many objects per subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// Non-empty; the first name is canonical.
    #[serde(deserialize_with = "non_empty_names")]
    pub names: Vec<String>,
    pub subject_entity: EntityRef,
    pub object_entity: EntityRef,
    pub subject_cardinality: Cardinality,
    pub object_cardinality: Cardinality,
    /// Relation-valued attributes (association-class fields).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub modifiers: BTreeSet<RelationModifier>,
}

impl Relation {
    pub fn new(
        name: impl Into<String>,
        subject_entity: impl Into<EntityRef>,
        object_entity: impl Into<EntityRef>,
    ) -> Self {
        Self {
            names: vec![name.into()],
            subject_entity: subject_entity.into(),
            object_entity: object_entity.into(),
            subject_cardinality: Cardinality::Any,
            object_cardinality: Cardinality::Any,
            attributes: Vec::new(),
            modifiers: BTreeSet::new(),
        }
    }

    pub fn canonical_name(&self) -> &str {
        &self.names[0]
    }

    pub fn mark_identifying(&mut self) {
        self.modifiers.insert(RelationModifier::Identifying);
    }

    pub fn is_identifying(&self) -> bool {
        self.modifiers.contains(&RelationModifier::Identifying)
    }
}

/// Named ER node.
///
/// Constructed fresh on every extraction call; there is no persisted identity
/// across calls. A weak entity is established as weak at construction time by
/// its extractor, never repaired later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Non-empty; the first name is canonical, later names are aliases
    /// accumulated when two inference passes identify the same position under
    /// different source labels.
    #[serde(deserialize_with = "non_empty_names")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub modifiers: BTreeSet<EntityModifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outgoing_relations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incoming_relations: Vec<Relation>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
            attributes: Vec::new(),
            modifiers: BTreeSet::new(),
            outgoing_relations: Vec::new(),
            incoming_relations: Vec::new(),
        }
    }

    pub fn canonical_name(&self) -> &str {
        &self.names[0]
    }

    /// Record an alternative source label for the same structural position.
    pub fn add_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        if !self.names.contains(&alias) {
            self.names.push(alias);
        }
    }

    pub fn is_weak(&self) -> bool {
        self.modifiers.contains(&EntityModifier::Weak)
    }

    pub fn mark_weak(&mut self) {
        self.modifiers.insert(EntityModifier::Weak);
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.names.iter().any(|n| n == name))
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.names.iter().any(|n| n == name))
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes
            .iter_mut()
            .find(|a| a.names.iter().any(|n| n == name))
    }

    /// Remove the attribute of that name, returning whether one existed.
    /// Used when a later inference pass discovers the name is structurally a
    /// relation.
    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| !a.names.iter().any(|n| n == name));
        before != self.attributes.len()
    }
}

/// The one owning collection of entities within an extraction call, keyed by
/// canonical name.
///
/// Repeated structural occurrences (the same XML tag at multiple tree
/// positions, a table referenced by multiple foreign keys) merge into one
/// record instead of duplicating. Key order also makes extraction output
/// deterministic.
#[derive(Debug, Default, Clone)]
pub struct EntityArena {
    entities: std::collections::BTreeMap<String, Entity>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.get_mut(name)
    }

    /// Insert a fresh entity under its canonical name. An existing record for
    /// that name is kept untouched; the caller merges explicitly via
    /// [`EntityArena::get_mut`].
    pub fn insert(&mut self, entity: Entity) -> &mut Entity {
        self.entities
            .entry(entity.canonical_name().to_string())
            .or_insert(entity)
    }

    /// Record `relation` on both endpoints: outgoing on the subject, incoming
    /// on the object. Endpoints that are not (yet) in the arena are skipped
    /// on that side.
    pub fn link(&mut self, relation: Relation) {
        if let Some(subject) = self.entities.get_mut(&relation.subject_entity) {
            subject.outgoing_relations.push(relation.clone());
        }
        if let Some(object) = self.entities.get_mut(&relation.object_entity) {
            object.incoming_relations.push(relation);
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entity)> {
        self.entities.iter()
    }

    /// Flatten into the canonical extraction result, ordered by canonical
    /// name.
    pub fn into_entities(self) -> Vec<Entity> {
        self.entities.into_values().collect()
    }
}
