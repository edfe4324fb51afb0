//! Schema-less document inference
//!
//! Depth-first walk over the instance tree. A node with no attributes and no
//! element children is a leaf and becomes an attribute of its parent; any
//! other node becomes an entity, weak unless it is the document root. The
//! hierarchical slash-path is the entity's canonical name, so repeated
//! occurrences of the same tag under the same parent path merge into one
//! record.

use crate::models::{Attribute, Cardinality, Entity, EntityArena, Relation};

use super::tree::XmlNode;

pub(crate) fn infer(root: &XmlNode) -> EntityArena {
    let mut arena = EntityArena::new();
    walk(root, None, &mut arena);
    arena
}

fn is_leaf(node: &XmlNode) -> bool {
    node.attributes.is_empty() && node.children.is_empty()
}

/// `parent` carries the parent's canonical path together with its source
/// node, which is needed to disambiguate an XML attribute from a child tag of
/// the same name.
fn walk(node: &XmlNode, parent: Option<(&str, &XmlNode)>, arena: &mut EntityArena) {
    let path = match parent {
        Some((parent_path, _)) => format!("{}/{}", parent_path, node.tag),
        None => node.tag.clone(),
    };

    if is_leaf(node) {
        match parent {
            Some((parent_path, _)) => {
                // Recorded once; a later complex occurrence upgrades it.
                if !arena.contains(&path) {
                    if let Some(parent_entity) = arena.get_mut(parent_path) {
                        if !parent_entity.has_attribute(&node.tag) {
                            parent_entity.attributes.push(Attribute::new(node.tag.clone()));
                        }
                    }
                }
            }
            None => {
                // A root that is itself a leaf becomes a zero-attribute
                // entity.
                arena.insert(Entity::new(path));
            }
        }
        return;
    }

    if let Some(entity) = arena.get_mut(&path) {
        // Repeated occurrence: attribute sets merge by union.
        for (key, _) in &node.attributes {
            if !entity.has_attribute(key) {
                entity.attributes.push(Attribute::new(key.clone()));
            }
        }
    } else {
        let mut entity = Entity::new(path.clone());
        if parent.is_some() {
            entity.mark_weak();
        }
        for (key, _) in &node.attributes {
            if !entity.has_attribute(key) {
                entity.attributes.push(Attribute::new(key.clone()));
            }
        }
        arena.insert(entity);

        if let Some((parent_path, parent_node)) = parent {
            // The path may have been recorded as a leaf attribute earlier;
            // unless the parent element genuinely carries an XML attribute of
            // that name, the attribute record is replaced by the entity.
            if !parent_node.has_attribute(&node.tag) {
                if let Some(parent_entity) = arena.get_mut(parent_path) {
                    parent_entity.remove_attribute(&node.tag);
                }
            }
            let mut relation = Relation::new("IsChild", parent_path.to_string(), path.clone());
            relation.subject_cardinality = Cardinality::ExactlyOne;
            relation.object_cardinality = Cardinality::OneOrMore;
            relation.mark_identifying();
            arena.link(relation);
        }
    }

    for child in &node.children {
        walk(child, Some((&path, node)), arena);
    }
}
