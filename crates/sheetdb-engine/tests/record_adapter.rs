use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sheetdb_engine::{OperationError, RecordAdapter};
use sheetdb_model::{FieldType, FieldValue, HeaderColumn, Record, Schema, SchemaField};

fn headers(names: &[&str]) -> Vec<HeaderColumn> {
    names
        .iter()
        .enumerate()
        .map(|(idx, name)| HeaderColumn::new(*name, idx as u32))
        .collect()
}

#[test]
fn non_numeric_cell_in_number_column_is_a_type_mismatch() {
    let headers = headers(&["age"]);
    let schema = Schema::new(vec![SchemaField::new("age", FieldType::Number)]);
    let adapter = RecordAdapter::new(&headers, &schema);

    let err = adapter.to_record(&["thirty"]).unwrap_err();
    match err {
        OperationError::SchemaTypeMismatch {
            header,
            value,
            expected,
        } => {
            assert_eq!(header, "age");
            assert_eq!(value, "thirty");
            assert_eq!(expected, FieldType::Number);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn reads_apply_types_aliases_and_nullability() {
    let headers = headers(&["name", "age", "active", "joined", "nickname"]);
    let schema = Schema::new(vec![
        SchemaField::new("age", FieldType::Number).alias("years"),
        SchemaField::new("active", FieldType::Boolean),
        SchemaField::new("joined", FieldType::Date),
        SchemaField::new("nickname", FieldType::String).nullable(),
    ]);
    let adapter = RecordAdapter::new(&headers, &schema);

    let record = adapter
        .to_record(&["Ada", "36", "TRUE", "1843-07-01"])
        .expect("valid row");
    let expected = Record::new()
        .with("name", "Ada")
        .with("years", 36)
        .with("active", true)
        .with("joined", Utc.with_ymd_and_hms(1843, 7, 1, 0, 0, 0).unwrap())
        .with("nickname", FieldValue::Null);
    assert_eq!(record, expected);
}

#[test]
fn required_is_not_enforced_on_read() {
    let headers = headers(&["name"]);
    let schema = Schema::new(vec![SchemaField::new("name", FieldType::String).required()]);
    let adapter = RecordAdapter::new(&headers, &schema);
    let record = adapter.to_record::<&str>(&[]).expect("tolerant read");
    assert_eq!(record.get("name"), Some(&FieldValue::from("")));
}

#[test]
fn writes_fill_gaps_and_render_types() {
    let headers = headers(&["name", "age", "active", "joined", "nickname"]);
    let schema = Schema::new(vec![
        SchemaField::new("age", FieldType::Number).alias("years").default_value(18),
        SchemaField::new("active", FieldType::Boolean),
        SchemaField::new("joined", FieldType::Date),
        SchemaField::new("nickname", FieldType::String).nullable(),
    ]);
    let adapter = RecordAdapter::new(&headers, &schema);

    let joined = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
    let row = adapter
        .from_record(
            &Record::new()
                .with("name", "Grace")
                .with("active", false)
                .with("joined", joined),
        )
        .expect("valid record");
    assert_eq!(
        row,
        vec![
            Some("Grace".to_string()),
            Some("18".to_string()),
            Some("FALSE".to_string()),
            Some("2024-01-15T09:30:00.000Z".to_string()),
            None,
        ]
    );
}

#[test]
fn write_side_schema_violations() {
    let headers = headers(&["age", "active", "email"]);
    let schema = Schema::new(vec![
        SchemaField::new("age", FieldType::Number),
        SchemaField::new("active", FieldType::Boolean),
        SchemaField::new("email", FieldType::String).required(),
    ]);
    let adapter = RecordAdapter::new(&headers, &schema);
    let base = Record::new().with("email", "a@x.io");

    let err = adapter.from_record(&base.clone().with("age", "")).unwrap_err();
    assert!(matches!(err, OperationError::NullableViolation(key) if key == "age"));

    let err = adapter
        .from_record(&base.clone().with("active", "maybe"))
        .unwrap_err();
    assert!(matches!(
        err,
        OperationError::InvalidBooleanValue { header, value } if header == "active" && value == "maybe"
    ));

    let err = adapter.from_record(&Record::new()).unwrap_err();
    assert!(matches!(err, OperationError::FieldRequiredNoDefault(key) if key == "email"));

    let conflicted = Schema::new(vec![SchemaField::new("age", FieldType::Number)
        .nullable()
        .required()]);
    let adapter = RecordAdapter::new(&headers, &conflicted);
    let err = adapter.from_record(&Record::new().with("age", 3)).unwrap_err();
    assert!(matches!(err, OperationError::NullableRequiredConflict(key) if key == "age"));
}

#[test]
fn unparseable_dates_are_type_mismatches_on_write() {
    let headers = headers(&["joined"]);
    let schema = Schema::new(vec![SchemaField::new("joined", FieldType::Date)]);
    let adapter = RecordAdapter::new(&headers, &schema);
    let err = adapter
        .from_record(&Record::new().with("joined", "someday"))
        .unwrap_err();
    assert!(matches!(
        err,
        OperationError::SchemaTypeMismatch { expected: FieldType::Date, .. }
    ));
}

fn round_trip(field_type: FieldType, value: FieldValue) -> FieldValue {
    let headers = headers(&["k"]);
    let schema = Schema::new(vec![SchemaField::new("k", field_type)]);
    let adapter = RecordAdapter::new(&headers, &schema);
    let row = adapter
        .from_record(&Record::new().with("k", value))
        .expect("write");
    let cells: Vec<String> = row.into_iter().map(Option::unwrap_or_default).collect();
    let record = adapter.to_record(&cells).expect("read");
    record.get("k").cloned().unwrap_or_default()
}

const CASES: u32 = 128;

proptest! {
    #![proptest_config(ProptestConfig { cases: CASES, ..ProptestConfig::default() })]

    #[test]
    fn strings_round_trip(s in "[a-zA-Z0-9 ,.@-]{1,24}") {
        prop_assert_eq!(round_trip(FieldType::String, s.clone().into()), FieldValue::String(s));
    }

    #[test]
    fn numbers_round_trip(n in -1.0e12f64..1.0e12) {
        prop_assert_eq!(round_trip(FieldType::Number, n.into()), FieldValue::Number(n));
    }

    #[test]
    fn integers_round_trip(n in -1_000_000i64..1_000_000) {
        prop_assert_eq!(round_trip(FieldType::Number, n.into()), FieldValue::Number(n as f64));
    }

    #[test]
    fn booleans_round_trip(b in any::<bool>()) {
        prop_assert_eq!(round_trip(FieldType::Boolean, b.into()), FieldValue::Boolean(b));
    }

    #[test]
    fn dates_round_trip_to_the_millisecond(ms in 0i64..4_102_444_800_000) {
        let date = DateTime::<Utc>::from_timestamp_millis(ms).expect("in range");
        let read = round_trip(FieldType::Date, date.into());
        prop_assert_eq!(read.as_date().map(|d| d.timestamp_millis()), Some(ms));
    }
}
