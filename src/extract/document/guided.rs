//! Schema-guided document inference
//!
//! Starting from the schema element matching the document root, enumerates
//! all complex-typed elements reachable within a bounded depth, promotes tag
//! groups whose occurrences at different paths are selected by the same
//! identity constraints to root-level shared entities, and lowers key/keyref
//! constraints to `Key` attributes and relations with occurrence bounds
//! merged through the cardinality algebra.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{Attribute, Cardinality, Entity, EntityArena, Relation};
use crate::plugin::ExtractionError;

use super::tree::{local_name, XmlNode};
use super::xsd::{XsdComplexType, XsdElement, XsdIdentity, XsdKeyRef, XsdSchema};

/// Traversal cap on hierarchical depth.
const MAX_DEPTH: usize = 10;

/// One entity-producing element, with the schema context needed for the
/// key/keyref passes.
struct Built<'a> {
    canonical: String,
    complex: &'a XsdComplexType,
    keys: &'a [XsdIdentity],
    keyrefs: &'a [XsdKeyRef],
}

/// One reachable complex element position, by hierarchical path.
struct Occurrence {
    tag: String,
    path: String,
}

pub(crate) fn infer(schema: &XsdSchema, doc_root: &XmlNode) -> Result<EntityArena, ExtractionError> {
    let root = schema
        .global_element(local_name(&doc_root.tag))
        .ok_or_else(|| {
            ExtractionError::InputData(format!(
                "document root '{}' is not declared by the schema",
                local_name(&doc_root.tag)
            ))
        })?;
    {
        let resolved = schema.resolve(root)?;
        if (resolved.min_occurs, resolved.max_occurs) != (1, Some(1)) {
            return Err(ExtractionError::UnsupportedFeature(
                "the schema root must occur exactly once".to_string(),
            ));
        }
    }

    validate_instance(schema, root, doc_root, 1)?;

    let promoted = promoted_tags(schema, root)?;

    let mut arena = EntityArena::new();
    let mut built: Vec<Built> = Vec::new();
    build(schema, root, None, &promoted, &mut arena, &mut built, 1)?;

    apply_keys_and_references(schema, &built, &promoted, &mut arena)?;
    Ok(arena)
}

/// Tags representing one shared entity: the tag occurs at more than one
/// parent path, and every occurrence is selected by the same non-empty set of
/// identity constraints. The constraints may be declared on an ancestor whose
/// selector names the occurrences, not on the occurrences themselves.
fn promoted_tags(
    schema: &XsdSchema,
    root: &XsdElement,
) -> Result<BTreeSet<String>, ExtractionError> {
    let mut occurrences = Vec::new();
    let mut declared_keys = Vec::new();
    survey(schema, root, None, 1, &mut occurrences, &mut declared_keys)?;

    // Which constraints select each reachable path.
    let mut selected_by: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (owner_path, key_name, selector) in &declared_keys {
        for path in selector_paths(owner_path, selector) {
            selected_by
                .entry(path)
                .or_default()
                .insert(key_name.clone());
        }
    }

    let mut groups: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> = BTreeMap::new();
    for occurrence in &occurrences {
        let keys = selected_by
            .get(&occurrence.path)
            .cloned()
            .unwrap_or_default();
        groups
            .entry(occurrence.tag.clone())
            .or_default()
            .insert(occurrence.path.clone(), keys);
    }

    Ok(groups
        .into_iter()
        .filter(|(_, paths)| {
            let mut key_sets = paths.values();
            match key_sets.next() {
                Some(first) if paths.len() > 1 && !first.is_empty() => {
                    key_sets.all(|set| set == first)
                }
                _ => false,
            }
        })
        .map(|(tag, _)| tag)
        .collect())
}

/// Collect every reachable complex occurrence and every declared identity
/// constraint, keyed by hierarchical path.
fn survey<'a>(
    schema: &'a XsdSchema,
    element: &'a XsdElement,
    parent_path: Option<&str>,
    depth: usize,
    occurrences: &mut Vec<Occurrence>,
    declared_keys: &mut Vec<(String, String, String)>,
) -> Result<(), ExtractionError> {
    if depth >= MAX_DEPTH {
        return Ok(());
    }
    let resolved = schema.resolve(element)?;
    let complex = match resolved.complex {
        Some(complex) => complex,
        None => return Ok(()),
    };
    let path = match parent_path {
        Some(parent_path) => format!("{}/{}", parent_path, resolved.name),
        None => resolved.name.to_string(),
    };
    for key in resolved.keys {
        declared_keys.push((
            path.clone(),
            local_name(&key.name).to_string(),
            key.selector.clone(),
        ));
    }
    occurrences.push(Occurrence {
        tag: resolved.name.to_string(),
        path: path.clone(),
    });
    for child in &complex.children {
        survey(schema, child, Some(&path), depth + 1, occurrences, declared_keys)?;
    }
    Ok(())
}

/// Hierarchical paths a selector xpath names relative to its owner, one per
/// union branch.
fn selector_paths(owner: &str, selector: &str) -> Vec<String> {
    selector
        .split('|')
        .map(|branch| {
            let mut path = owner.to_string();
            for segment in branch
                .trim()
                .trim_start_matches('.')
                .split('/')
                .filter(|segment| !segment.is_empty() && *segment != ".")
            {
                path.push('/');
                path.push_str(local_name(segment));
            }
            path
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn build<'a>(
    schema: &'a XsdSchema,
    element: &'a XsdElement,
    prefix: Option<&str>,
    promoted: &BTreeSet<String>,
    arena: &mut EntityArena,
    built: &mut Vec<Built<'a>>,
    depth: usize,
) -> Result<(), ExtractionError> {
    if depth >= MAX_DEPTH {
        return Ok(());
    }
    let resolved = schema.resolve(element)?;
    let complex = match resolved.complex {
        Some(complex) => complex,
        None => return Ok(()),
    };
    let canonical = if promoted.contains(resolved.name) {
        resolved.name.to_string()
    } else {
        match prefix {
            Some(prefix) => format!("{}/{}", prefix, resolved.name),
            None => resolved.name.to_string(),
        }
    };
    if arena.contains(&canonical) {
        return Ok(());
    }

    let mut entity = Entity::new(canonical.clone());
    if canonical.contains('/') {
        entity.mark_weak();
    }
    for attribute in &complex.attributes {
        if !entity.has_attribute(&attribute.name) {
            entity.attributes.push(Attribute::new(attribute.name.clone()));
        }
    }
    if complex.simple_content {
        entity.attributes.push(Attribute::new("value"));
    }
    for child in &complex.children {
        let child_resolved = schema.resolve(child)?;
        if child_resolved.complex.is_none() && !entity.has_attribute(child_resolved.name) {
            entity
                .attributes
                .push(Attribute::new(child_resolved.name.to_string()));
        }
    }
    arena.insert(entity);
    built.push(Built {
        canonical: canonical.clone(),
        complex,
        keys: resolved.keys,
        keyrefs: resolved.keyrefs,
    });

    for child in &complex.children {
        let child_resolved = schema.resolve(child)?;
        if child_resolved.complex.is_none() {
            continue;
        }
        let occurs =
            Cardinality::from_range(child_resolved.min_occurs, child_resolved.max_occurs);
        let (child_canonical, child_prefix, child_depth) =
            if promoted.contains(child_resolved.name) {
                // Shared entity: referenced, not duplicated under this path.
                (child_resolved.name.to_string(), None, 1)
            } else {
                (
                    format!("{}/{}", canonical, child_resolved.name),
                    Some(canonical.as_str()),
                    depth + 1,
                )
            };
        build(schema, child, child_prefix, promoted, arena, built, child_depth)?;
        if !arena.contains(&child_canonical) {
            continue;
        }
        let mut relation = Relation::new("IsChild", canonical.clone(), child_canonical);
        relation.subject_cardinality = Cardinality::ExactlyOne;
        relation.object_cardinality = occurs;
        relation.mark_identifying();
        arena.link(relation);
    }
    Ok(())
}

/// Keys first (they mark `Key` attributes and register targets), then
/// keyrefs, so a field that doubles as a primary key survives attribute
/// removal.
fn apply_keys_and_references(
    schema: &XsdSchema,
    built: &[Built<'_>],
    promoted: &BTreeSet<String>,
    arena: &mut EntityArena,
) -> Result<(), ExtractionError> {
    let mut key_targets: BTreeMap<String, String> = BTreeMap::new();
    for owner in built {
        for key in owner.keys {
            let targets = resolve_selector(&owner.canonical, &key.selector, promoted);
            for target in &targets {
                if let Some(entity) = arena.get_mut(target) {
                    for field in &key.fields {
                        let field_name = local_name(field.trim_start_matches('@'));
                        if let Some(attribute) = entity.attribute_mut(field_name) {
                            attribute.mark_key();
                        }
                    }
                }
            }
            if let Some(first) = targets.first() {
                key_targets.insert(local_name(&key.name).to_string(), first.clone());
            }
        }
    }

    for owner in built {
        for keyref in owner.keyrefs {
            let object = key_targets
                .get(local_name(&keyref.refer))
                .ok_or_else(|| {
                    ExtractionError::InputData(format!(
                        "keyref '{}' refers to unknown key '{}'",
                        keyref.name, keyref.refer
                    ))
                })?
                .clone();

            for subject in resolve_selector(&owner.canonical, &keyref.selector, promoted) {
                let subject_complex = built
                    .iter()
                    .find(|candidate| candidate.canonical == subject)
                    .map(|candidate| candidate.complex);
                let object_cardinality =
                    reference_cardinality(schema, subject_complex, &keyref.fields)?;

                // A field used purely as the implementation of the reference
                // is removed from the attribute list; key attributes stay.
                if let Some(entity) = arena.get_mut(&subject) {
                    for field in &keyref.fields {
                        let field_name = local_name(field.trim_start_matches('@'));
                        let keeps = entity
                            .attribute(field_name)
                            .map(|attribute| attribute.is_key())
                            .unwrap_or(true);
                        if !keeps {
                            entity.remove_attribute(field_name);
                        }
                    }
                }

                let mut relation = Relation::new(keyref.name.clone(), subject, object.clone());
                relation.subject_cardinality = Cardinality::Any;
                relation.object_cardinality = object_cardinality;
                arena.link(relation);
            }
        }
    }
    Ok(())
}

/// Canonical entity names a selector xpath resolves to: relative steps under
/// the owner, unless the selected tag was promoted to root level. Union
/// branches over a promoted tag collapse to one target.
fn resolve_selector(owner: &str, selector: &str, promoted: &BTreeSet<String>) -> Vec<String> {
    let mut targets = Vec::new();
    for branch in selector.split('|') {
        let segments: Vec<&str> = branch
            .trim()
            .trim_start_matches('.')
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .map(local_name)
            .collect();
        let target = match segments.last() {
            Some(last) if promoted.contains(*last) => (*last).to_string(),
            _ => {
                let mut canonical = owner.to_string();
                for segment in &segments {
                    canonical.push('/');
                    canonical.push_str(segment);
                }
                canonical
            }
        };
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    targets
}

/// Bounds of a composite reference: the per-field occurrence ranges folded
/// through [`Cardinality::merge`], starting from the unconstrained range.
fn reference_cardinality(
    schema: &XsdSchema,
    complex: Option<&XsdComplexType>,
    fields: &[String],
) -> Result<Cardinality, ExtractionError> {
    let mut cardinality = Cardinality::Any;
    for field in fields {
        let (min, max) = field_occurrence(schema, complex, field)?;
        cardinality = cardinality.merge(&Cardinality::from_range(min, max));
    }
    Ok(cardinality)
}

/// Declared occurrence range of one keyref field within the subject element.
fn field_occurrence(
    schema: &XsdSchema,
    complex: Option<&XsdComplexType>,
    field: &str,
) -> Result<(u64, Option<u64>), ExtractionError> {
    let complex = match complex {
        Some(complex) => complex,
        None => return Ok((1, Some(1))),
    };
    if let Some(attribute_name) = field.strip_prefix('@') {
        let attribute_name = local_name(attribute_name);
        if let Some(attribute) = complex
            .attributes
            .iter()
            .find(|a| local_name(&a.name) == attribute_name)
        {
            let min = if attribute.required { 1 } else { 0 };
            let max = if attribute.idrefs { None } else { Some(1) };
            return Ok((min, max));
        }
        return Ok((0, Some(1)));
    }
    let name = local_name(field.trim_start_matches("./"));
    for child in &complex.children {
        let resolved = schema.resolve(child)?;
        if resolved.name == name {
            return Ok((resolved.min_occurs, resolved.max_occurs));
        }
    }
    Ok((1, Some(1)))
}

/// Shallow structural validation of the instance against the schema:
/// undeclared elements or attributes, missing required attributes and
/// violated occurrence bounds are input-data errors.
fn validate_instance(
    schema: &XsdSchema,
    element: &XsdElement,
    node: &XmlNode,
    depth: usize,
) -> Result<(), ExtractionError> {
    let resolved = schema.resolve(element)?;
    let complex = match resolved.complex {
        Some(complex) => complex,
        None => {
            if !node.children.is_empty() {
                return Err(ExtractionError::InputData(format!(
                    "element '{}' is declared scalar but has element children",
                    local_name(&node.tag)
                )));
            }
            return Ok(());
        }
    };

    for (key, _) in &node.attributes {
        if key.contains(':') || key.starts_with("xmlns") {
            continue;
        }
        if !complex
            .attributes
            .iter()
            .any(|attribute| local_name(&attribute.name) == local_name(key))
        {
            return Err(ExtractionError::InputData(format!(
                "attribute '{}' of element '{}' is not declared",
                key,
                local_name(&node.tag)
            )));
        }
    }
    for attribute in &complex.attributes {
        if attribute.required
            && !node
                .attributes
                .iter()
                .any(|(key, _)| local_name(key) == local_name(&attribute.name))
        {
            return Err(ExtractionError::InputData(format!(
                "required attribute '{}' missing on element '{}'",
                attribute.name,
                local_name(&node.tag)
            )));
        }
    }

    if depth >= MAX_DEPTH {
        return Ok(());
    }

    for child in &complex.children {
        let declared = schema.resolve(child)?;
        let count = node
            .children
            .iter()
            .filter(|candidate| local_name(&candidate.tag) == declared.name)
            .count() as u64;
        if count < declared.min_occurs {
            return Err(ExtractionError::InputData(format!(
                "element '{}' has {} '{}' children, at least {} required",
                local_name(&node.tag),
                count,
                declared.name,
                declared.min_occurs
            )));
        }
        if declared.max_occurs.map(|max| count > max).unwrap_or(false) {
            return Err(ExtractionError::InputData(format!(
                "element '{}' has {} '{}' children, at most {} allowed",
                local_name(&node.tag),
                count,
                declared.name,
                declared.max_occurs.unwrap_or(0)
            )));
        }
    }

    for child_node in &node.children {
        let mut declared = None;
        for child in &complex.children {
            if schema.resolve(child)?.name == local_name(&child_node.tag) {
                declared = Some(child);
                break;
            }
        }
        match declared {
            Some(child) => validate_instance(schema, child, child_node, depth + 1)?,
            None => {
                return Err(ExtractionError::InputData(format!(
                    "element '{}' is not declared under '{}'",
                    local_name(&child_node.tag),
                    local_name(&node.tag)
                )));
            }
        }
    }
    Ok(())
}
