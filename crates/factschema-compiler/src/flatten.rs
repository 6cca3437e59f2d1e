//! allOf flattening.
//!
//! Inheritance chains are merged into concrete schemas so consumers that do
//! not understand `allOf` still see every property. The pass runs to a fixed
//! point per schema: a dependency's own `allOf` entries are pulled in and
//! resolved on the next round, so chains of any depth collapse.

use crate::error::CompileError;
use crate::schema::{Schema, SchemaMap};

/// Flattens every schema in `schemas` in place.
///
/// Entries whose `$ref` is external or names no component are kept as-is.
pub fn flatten(schemas: &mut SchemaMap) -> Result<(), CompileError> {
    let keys: Vec<String> = schemas.keys().cloned().collect();
    let limit = schemas.len() + 1;

    for key in keys {
        let Some(mut schema) = schemas.get(&key).cloned() else {
            continue;
        };
        let mut rounds = 0;
        while has_internal_parent(&schema, schemas) {
            rounds += 1;
            if rounds > limit {
                return Err(CompileError::InheritanceCycle(key));
            }
            merge_parents(&mut schema, schemas, &key)?;
        }
        schemas.insert(key, schema);
    }
    Ok(())
}

fn has_internal_parent(schema: &Schema, schemas: &SchemaMap) -> bool {
    schema.all_of.iter().flatten().any(|entry| {
        entry
            .component_target()
            .is_some_and(|target| schemas.contains_key(target))
    })
}

/// One merge round: every resolvable `allOf` parent is folded into `schema`.
/// The schema's own values win over inherited ones.
fn merge_parents(schema: &mut Schema, schemas: &SchemaMap, key: &str) -> Result<(), CompileError> {
    let Some(all_of) = schema.all_of.take() else {
        return Ok(());
    };
    let mut required = schema.required.take().unwrap_or_default();
    let mut properties = schema.properties.take().unwrap_or_default();
    let mut pending = Vec::new();

    for entry in all_of {
        let parent = entry
            .component_target()
            .and_then(|target| schemas.get(target).map(|p| (target, p)));
        let Some((target, parent)) = parent else {
            pending.push(entry);
            continue;
        };
        if target == key {
            return Err(CompileError::InheritanceCycle(key.to_string()));
        }

        for name in parent.required.iter().flatten() {
            if !required.contains(name) {
                required.push(name.clone());
            }
        }
        for (name, property) in parent.properties.iter().flatten() {
            properties
                .entry(name.clone())
                .or_insert_with(|| property.clone());
        }
        pending.extend(parent.all_of.iter().flatten().cloned());

        if schema.title.is_none() {
            schema.title = parent.title.clone();
        }
        if schema.description.is_none() {
            schema.description = parent.description.clone();
        }
        if schema.schema_type.is_none() {
            schema.schema_type = parent.schema_type.clone();
        }
        if schema.examples.is_none() && parent.examples.as_ref().is_some_and(|e| !e.is_empty()) {
            schema.examples = parent.examples.clone();
        }
    }

    if !properties.is_empty() {
        schema.properties = Some(properties);
    }
    if !required.is_empty() {
        schema.required = Some(required);
    }
    if !pending.is_empty() {
        schema.all_of = Some(pending);
    }
    Ok(())
}
