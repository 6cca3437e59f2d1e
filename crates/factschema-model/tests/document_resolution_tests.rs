use factschema_model::{
    ConstraintKind, HttpVerb, ModelDocument, ModelError, NounRef, ObjectType, ValueType,
};

fn resolve(json: &str) -> Result<factschema_model::ModelSnapshot, ModelError> {
    ModelDocument::from_json(json).expect("parse").resolve()
}

const PEOPLE: &str = r#"{
    "nouns": [
        {"name": "Person", "referenceScheme": ["PersonName"]},
        {"name": "PersonName", "objectType": "value", "valueType": "string"},
        {"name": "Age", "objectType": "value", "valueType": "integer", "minimum": 0}
    ],
    "factTypes": [
        {"readings": ["Person has PersonName"], "relationship": "many-to-one"},
        {"readings": [{"text": "Person has Age", "httpVerb": "PATCH"}], "relationship": "many-to-one"}
    ],
    "constraints": [
        {"kind": "MR", "roles": [{"factType": "Person has PersonName", "role": "PersonName"}]}
    ],
    "examples": [
        {"factType": "Person has Age", "values": ["Ada", "36"]}
    ]
}"#;

#[test]
fn resolves_nouns_and_derives_roles_from_readings() {
    let snapshot = resolve(PEOPLE).expect("resolve");

    let person = snapshot.noun_by_name("Person").expect("Person");
    assert_eq!(person.object_type, ObjectType::Entity);
    let age = snapshot.noun_by_name("Age").expect("Age");
    assert_eq!(age.value_type, Some(ValueType::Integer));
    assert_eq!(age.facets.minimum, Some(0.into()));

    let has_age = snapshot.fact_type_by_title("Person has Age").expect("fact type");
    let players: Vec<&str> = snapshot
        .players(has_age.id)
        .map(|p| snapshot.name_of(p))
        .collect();
    assert_eq!(players, vec!["Person", "Age"]);
    assert_eq!(has_age.readings[0].http_verb, HttpVerb::Patch);
    assert_eq!(has_age.readings[0].language, "en");
}

#[test]
fn relationship_shorthand_becomes_uniqueness() {
    let snapshot = resolve(PEOPLE).expect("resolve");
    let has_name = snapshot.fact_type_by_title("Person has PersonName").expect("ft");
    let (subject, object) = (has_name.roles[0], has_name.roles[1]);

    assert!(snapshot.role_has(subject, ConstraintKind::UC));
    assert!(!snapshot.role_has(object, ConstraintKind::UC));
    assert!(snapshot.role_has(object, ConstraintKind::MR));
}

#[test]
fn one_to_one_yields_two_single_role_uniqueness_constraints() {
    let snapshot = resolve(
        r#"{
            "nouns": [{"name": "Person"}, {"name": "Passport"}],
            "factTypes": [{"readings": ["Person holds Passport"], "relationship": "one-to-one"}]
        }"#,
    )
    .expect("resolve");
    assert_eq!(snapshot.spans.len(), 2);
    assert!(snapshot.spans.iter().all(|s| s.roles.len() == 1));
}

#[test]
fn explicit_uniqueness_overrides_shorthand() {
    let snapshot = resolve(
        r#"{
            "nouns": [{"name": "Customer"}, {"name": "Product"}],
            "factTypes": [{"readings": ["Customer likes Product"], "relationship": "many-to-one"}],
            "constraints": [{"kind": "UC", "roles": [
                {"factType": "Customer likes Product", "role": 0},
                {"factType": "Customer likes Product", "role": 1}
            ]}]
        }"#,
    )
    .expect("resolve");
    assert_eq!(snapshot.spans.len(), 1);
    assert_eq!(snapshot.spans[0].roles.len(), 2);
}

#[test]
fn fact_type_can_play_a_role() {
    let snapshot = resolve(
        r#"{
            "nouns": [{"name": "Student"}, {"name": "Course"}, {"name": "Grade", "objectType": "value"}],
            "factTypes": [
                {"name": "Enrollment", "readings": ["Student enrolled in Course"], "relationship": "many-to-many"},
                {"readings": ["Enrollment earns Grade"], "relationship": "many-to-one"}
            ]
        }"#,
    )
    .expect("resolve");
    let enrollment = snapshot.fact_type_by_title("Enrollment").expect("ft").id;
    assert!(snapshot.is_objectified(enrollment));
    let earns = snapshot.fact_type_by_title("Enrollment earns Grade").expect("ft");
    assert_eq!(snapshot.role(earns.roles[0]).player, NounRef::FactType(enrollment));
}

#[test]
fn reading_mentioning_foreign_noun_is_rejected() {
    let err = resolve(
        r#"{
            "nouns": [{"name": "Person"}, {"name": "Age"}, {"name": "Country"}],
            "factTypes": [{"readings": ["Person has Age", "Country knows Person"], "roles": ["Person", "Age"]}]
        }"#,
    )
    .unwrap_err();
    match err {
        ModelError::ReadingOutOfScope { noun, .. } => assert_eq!(noun, "Country"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn integrity_errors_are_fatal() {
    let duplicate = resolve(r#"{"nouns": [{"name": "A"}, {"name": "A"}]}"#).unwrap_err();
    assert!(matches!(duplicate, ModelError::DuplicateNoun(name) if name == "A"));

    let unknown = resolve(r#"{"nouns": [{"name": "A", "superType": "B"}]}"#).unwrap_err();
    assert!(matches!(unknown, ModelError::UnknownNoun { .. }));

    let arity = resolve(
        r#"{
            "nouns": [{"name": "A"}, {"name": "B"}, {"name": "C"}],
            "factTypes": [{"readings": ["A gives B to C"], "relationship": "many-to-one"}]
        }"#,
    )
    .unwrap_err();
    assert!(matches!(arity, ModelError::RelationshipArity { arity: 3, .. }));

    let example = resolve(
        r#"{
            "nouns": [{"name": "A"}, {"name": "B"}],
            "factTypes": [{"readings": ["A has B"]}],
            "examples": [{"factType": "A has B", "values": ["x"]}]
        }"#,
    )
    .unwrap_err();
    assert!(matches!(example, ModelError::ExampleArity { got: 1, arity: 2, .. }));

    let role = resolve(
        r#"{
            "nouns": [{"name": "A"}, {"name": "B"}],
            "factTypes": [{"readings": ["A has B"]}],
            "constraints": [{"kind": "MR", "roles": [{"factType": "A has B", "role": 5}]}]
        }"#,
    )
    .unwrap_err();
    assert!(matches!(role, ModelError::UnknownRole { .. }));

    let empty = resolve(
        r#"{
            "nouns": [{"name": "A"}],
            "constraints": [{"kind": "UC", "roles": []}]
        }"#,
    )
    .unwrap_err();
    assert!(matches!(empty, ModelError::EmptySpan { index: 0 }));
}

#[test]
fn malformed_document_is_a_json_error() {
    let err = ModelDocument::from_json("{\"nouns\": 3}").unwrap_err();
    assert!(matches!(err, ModelError::Json(_)));
}
