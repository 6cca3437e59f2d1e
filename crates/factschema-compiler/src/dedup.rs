//! Tier deduplication and reference relabeling.
//!
//! After flattening, a resource's `Update`, `New` and base tiers often carry
//! the same fields. Tiers are compared by required-field and property counts
//! only; a match merges the finer tier into the coarser one and records a
//! rename. Renames are applied afterwards as a relabeling of every `$ref` in
//! the finished document.

use std::collections::BTreeMap;

use crate::error::CompileError;
use crate::openapi::OpenApiDocument;
use crate::schema::{Schema, SchemaMap, COMPONENT_PREFIX};

/// Recorded tier merges: removed key → surviving key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renames(BTreeMap<String, String>);

impl Renames {
    pub fn record(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.0.insert(from.into(), to.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Follows rename chains (`Update<K>` → `New<K>` → `<K>`) to the end.
    pub fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        let mut current = key;
        for _ in 0..=self.0.len() {
            match self.0.get(current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Rewrites every internal `$ref` in the document to its surviving key.
    pub fn apply(&self, document: &mut OpenApiDocument) {
        if self.is_empty() {
            return;
        }
        document.for_each_schema_mut(&mut |root| {
            root.walk_mut(&mut |schema| {
                let Some(target) = schema.component_target() else {
                    return;
                };
                let resolved = self.resolve(target);
                if resolved != target {
                    schema.reference = Some(format!("{COMPONENT_PREFIX}{resolved}"));
                }
            })
        });
    }
}

fn same_shape(a: &Schema, b: &Schema) -> bool {
    a.required_count() == b.required_count() && a.property_count() == b.property_count()
}

/// Overlays `finer` onto `coarser`, keeping every property and required
/// field of both. Metadata of the coarser tier wins.
fn merge_into(coarser: Schema, finer: Schema) -> Schema {
    let mut merged = coarser;
    if let Some(properties) = finer.properties {
        let target = merged.properties_mut();
        for (name, property) in properties {
            target.entry(name).or_insert(property);
        }
    }
    for name in finer.required.iter().flatten() {
        merged.require(name);
    }
    if let Some(all_of) = finer.all_of {
        let target = merged.all_of.get_or_insert_with(Vec::new);
        for entry in all_of {
            if !target.contains(&entry) {
                target.push(entry);
            }
        }
    }
    merged.title = merged.title.or(finer.title);
    merged.description = merged.description.or(finer.description);
    merged.schema_type = merged.schema_type.or(finer.schema_type);
    merged.examples = merged.examples.or(finer.examples);
    merged
}

/// Collapses the tiers of resource `key`.
///
/// `Update<K>` folds into `New<K>` when no update operation uses it or the
/// counts match; `New<K>` then folds into `<K>` under the same rule for
/// create.
pub fn dedup_tiers(
    schemas: &mut SchemaMap,
    key: &str,
    patch_used: bool,
    post_used: bool,
    renames: &mut Renames,
) {
    let update_key = format!("Update{key}");
    let new_key = format!("New{key}");

    let mergeable = match (schemas.get(&update_key), schemas.get(&new_key)) {
        (Some(update), Some(new)) => !patch_used || same_shape(update, new),
        _ => false,
    };
    if mergeable {
        if let (Some(update), Some(new)) = (schemas.remove(&update_key), schemas.remove(&new_key)) {
            schemas.insert(new_key.clone(), merge_into(new, update));
            tracing::debug!(from = %update_key, to = %new_key, "merged tier");
            renames.record(update_key, new_key.clone());
        }
    }

    let mergeable = match (schemas.get(&new_key), schemas.get(key)) {
        (Some(new), Some(base)) => !post_used || same_shape(new, base),
        _ => false,
    };
    if mergeable {
        if let (Some(new), Some(base)) = (schemas.remove(&new_key), schemas.remove(key)) {
            schemas.insert(key.to_string(), merge_into(base, new));
            tracing::debug!(from = %new_key, to = %key, "merged tier");
            renames.record(new_key, key);
        }
    }
}

/// Fails on any internal `$ref` that names no component.
pub fn check_references(document: &OpenApiDocument) -> Result<(), CompileError> {
    let schemas = &document.components.schemas;
    let mut dangling = None;
    document.for_each_schema(&mut |location, root| {
        if dangling.is_some() {
            return;
        }
        root.walk(&mut |schema| {
            if dangling.is_some() {
                return;
            }
            if let Some(target) = schema.component_target() {
                if !schemas.contains_key(target) {
                    dangling = Some(CompileError::DanglingReference {
                        reference: format!("{COMPONENT_PREFIX}{target}"),
                        location: location.to_string(),
                    });
                }
            }
        });
    });
    dangling.map_or(Ok(()), Err)
}
