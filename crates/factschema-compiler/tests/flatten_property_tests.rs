use factschema_compiler::schema::COMPONENT_PREFIX;
use factschema_compiler::{dedup_tiers, flatten, Renames, Schema, SchemaMap};
use proptest::prelude::*;
use std::collections::BTreeSet;

const FIELDS: [&str; 6] = ["id", "name", "age", "label", "owner", "createdAt"];

/// One schema per index; entry `i` may inherit from any `j < i`, so the
/// generated graph is acyclic but arbitrarily deep.
fn acyclic_map() -> impl Strategy<Value = SchemaMap> {
    (1usize..8).prop_flat_map(|n| {
        proptest::collection::vec(
            (
                proptest::collection::btree_set(0usize..FIELDS.len(), 0..4),
                proptest::collection::btree_set(0usize..FIELDS.len(), 0..2),
                proptest::collection::btree_set(0usize..8, 0..3),
                any::<bool>(),
            ),
            n,
        )
        .prop_map(|entries| {
            let mut map = SchemaMap::new();
            for (i, (fields, required, parents, external)) in entries.into_iter().enumerate() {
                let mut schema = Schema::default();
                for f in fields {
                    schema
                        .properties_mut()
                        .insert(FIELDS[f].to_string(), Schema::typed("string"));
                }
                for r in required {
                    schema.require(FIELDS[r]);
                }
                let mut all_of: Vec<Schema> = parents
                    .into_iter()
                    .filter(|p| *p < i)
                    .map(|p| Schema::component(&format!("S{p}")))
                    .collect();
                if external {
                    all_of.push(Schema {
                        reference: Some("https://example.com/base.json".to_string()),
                        ..Schema::default()
                    });
                }
                if !all_of.is_empty() {
                    schema.all_of = Some(all_of);
                }
                map.insert(format!("S{i}"), schema);
            }
            map
        })
    })
}

fn internal_parents(schema: &Schema, map: &SchemaMap) -> usize {
    schema
        .all_of
        .iter()
        .flatten()
        .filter(|e| e.component_target().is_some_and(|t| map.contains_key(t)))
        .count()
}

fn names(schema: &Schema) -> BTreeSet<String> {
    schema.properties.iter().flatten().map(|(k, _)| k.clone()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn flattening_reaches_a_fixed_point(mut map in acyclic_map()) {
        flatten(&mut map).unwrap();
        for schema in map.values() {
            prop_assert_eq!(internal_parents(schema, &map), 0);
        }

        let once = map.clone();
        flatten(&mut map).unwrap();
        prop_assert_eq!(once, map);
    }

    #[test]
    fn flattening_inherits_every_parent_field(original in acyclic_map()) {
        let mut flat = original.clone();
        flatten(&mut flat).unwrap();
        for (key, schema) in &original {
            for parent in schema.all_of.iter().flatten().filter_map(|e| e.component_target()) {
                if let Some(parent) = flat.get(parent) {
                    prop_assert!(names(parent).is_subset(&names(&flat[key])));
                }
            }
        }
    }

    #[test]
    fn external_references_survive(map in acyclic_map()) {
        let mut flat = map.clone();
        flatten(&mut flat).unwrap();
        let external = |m: &SchemaMap| m.values()
            .flat_map(|s| s.all_of.iter().flatten())
            .any(|e| e.reference.as_deref().is_some_and(|r| !r.starts_with(COMPONENT_PREFIX)));
        prop_assert_eq!(external(&map), external(&flat));
    }

    #[test]
    fn tier_merges_never_lose_fields(
        tiers in proptest::collection::vec(
            (
                proptest::collection::btree_set(0usize..FIELDS.len(), 0..5),
                proptest::collection::btree_set(0usize..FIELDS.len(), 0..3),
            ),
            3,
        ),
        patch_used in any::<bool>(),
        post_used in any::<bool>(),
    ) {
        let mut map = SchemaMap::new();
        for ((fields, required), key) in tiers.into_iter().zip(["UpdateThing", "NewThing", "Thing"]) {
            let mut schema = Schema::typed("object");
            for f in fields {
                schema.properties_mut().insert(FIELDS[f].to_string(), Schema::typed("string"));
            }
            for r in required {
                schema.require(FIELDS[r]);
            }
            map.insert(key.to_string(), schema);
        }
        let before = map.clone();

        let mut renames = Renames::default();
        dedup_tiers(&mut map, "Thing", patch_used, post_used, &mut renames);

        prop_assert!(map.contains_key("Thing"));
        for (key, schema) in &before {
            let survivor = &map[renames.resolve(key)];
            prop_assert!(names(schema).is_subset(&names(survivor)));
            for name in schema.required.iter().flatten() {
                prop_assert!(survivor.required.iter().flatten().any(|r| r == name));
            }
        }
    }
}
