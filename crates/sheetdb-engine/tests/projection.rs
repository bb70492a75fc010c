use pretty_assertions::assert_eq;
use sheetdb_engine::{OperationError, Projection};
use sheetdb_model::{FieldType, Record, Schema, SchemaField};

fn schema() -> Schema {
    Schema::new(vec![
        SchemaField::new("full_name", FieldType::String).alias("name"),
        SchemaField::new("age", FieldType::Number),
    ])
}

fn records() -> Vec<Record> {
    vec![
        Record::new()
            .with("id", "1")
            .with("name", "Ada")
            .with("age", 36)
            .with("email", "ada@example.com"),
        Record::new()
            .with("id", "2")
            .with("name", "Grace")
            .with("age", 45)
            .with("email", "grace@example.com"),
    ]
}

fn keys(records: &[Record]) -> Vec<Vec<&str>> {
    records.iter().map(|r| r.keys().collect()).collect()
}

#[test]
fn select_keeps_only_requested_keys_in_record_order() {
    let out = Projection::select(["email", "full_name"])
        .apply(records(), &schema())
        .expect("select");
    assert_eq!(keys(&out), vec![vec!["name", "email"]; 2]);
    assert_eq!(out[1].get("name").and_then(|v| v.as_str()), Some("Grace"));
}

#[test]
fn omit_drops_requested_keys() {
    let out = Projection::omit(["age", "name"])
        .apply(records(), &schema())
        .expect("omit");
    assert_eq!(keys(&out), vec![vec!["id", "email"]; 2]);
}

#[test]
fn projection_is_idempotent() {
    let projection = Projection::select(["id", "age"]);
    let once = projection.apply(records(), &schema()).unwrap();
    let twice = projection.apply(once.clone(), &schema()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn unknown_keys_select_nothing() {
    let out = Projection::select(["nope"]).apply(records(), &schema()).unwrap();
    assert!(out.iter().all(Record::is_empty));
    let out = Projection::omit(["nope"]).apply(records(), &schema()).unwrap();
    assert_eq!(out, records());
}

#[test]
fn select_and_omit_conflict() {
    let projection = Projection::new(Some(vec!["name".into()]), Some(vec!["age".into()]));
    assert!(matches!(projection.validate(), Err(OperationError::SelectOmitConflict)));
    assert!(matches!(
        projection.apply(Vec::new(), &schema()),
        Err(OperationError::SelectOmitConflict)
    ));
}

#[test]
fn deserializes_from_options_json() {
    let projection: Projection = serde_json::from_str(r#"{"omit": ["email"]}"#).unwrap();
    assert_eq!(projection, Projection::omit(["email"]));
    assert!(Projection::default().is_identity());
}
