use barometer::datatype::{Cell, Value};
use barometer::pipeline::Pipeline;
use barometer::schema::Schema;
use barometer::settings::{ProjectionMode, Settings};
use barometer::table::CanonicalTable;
use barometer::BarometerError;
use tracing_subscriber::EnvFilter;

const COLUMNS: [&str; 10] = [
    "diagnostic_test",
    "country",
    "breed",
    "date",
    "province",
    "farm_id",
    "sample_type",
    "pathogen",
    "result",
    "lab_reference",
];

fn setup() -> CanonicalTable {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let mut table = CanonicalTable::new(COLUMNS);
    for (i, pathogen) in ["HS", "MH", "PM", "BCV", "MB", "PI3", "BRSV"].iter().enumerate() {
        let result = if i == 4 { Value::Missing } else { Value::from((i % 2) as i64) };
        table
            .push_row(vec![
                Value::from("PCR"),
                Value::from("The Netherlands"),
                Value::from("Veal"),
                Value::from("2022-11-01 00:00:00"),
                Value::from("Gelderland"),
                Value::from("5e88489"),
                Value::from("BAL"),
                Value::from(*pathogen),
                result,
                Value::from("2"),
            ])
            .unwrap();
    }
    table
}

#[test]
fn default_pipeline_reports_counts() {
    let table = setup();
    let output = Pipeline::with_schema("gd", Schema::canonical()).run(&table).unwrap();
    let report = output.report;
    assert_eq!(report.source, "gd");
    assert_eq!(report.mode, ProjectionMode::Materialized);
    assert_eq!(report.input_rows, 7);
    assert_eq!(report.facts, 70);
    assert_eq!(report.records, 7);
    assert_eq!(report.dropped, 0);
    assert_eq!(report.verified, None);
    assert_eq!(output.table.get(4, "Result"), Some(&Cell::Missing));
    assert_eq!(output.table.get(6, "Pathogen"), Some(&Cell::Text("BRSV".into())));
}

#[test]
fn streaming_and_verification_from_settings() {
    let table = setup();
    let settings = Settings::from_toml("mode = \"streaming\"\nverify_round_trip = true\n").unwrap();
    assert_eq!(settings.mode, ProjectionMode::Streaming);
    let output = Pipeline::new("ireland", &settings).unwrap().run(&table).unwrap();
    assert_eq!(output.report.mode, ProjectionMode::Streaming);
    assert_eq!(output.report.facts, 70);
    assert_eq!(output.report.verified, Some(true));
    let materialized = Pipeline::with_schema("ireland", Schema::canonical()).run(&table).unwrap();
    assert_eq!(output.table, materialized.table);
}

#[test]
fn verification_catches_text_that_looks_like_the_sentinel() {
    let mut table = setup();
    let mut row: Vec<Value> = table.rows()[0].clone();
    row[1] = Value::from("<NA>");
    table.push_row(row).unwrap();

    let unverified = Pipeline::with_schema("arsia", Schema::canonical()).run(&table).unwrap();
    assert_eq!(unverified.table.get(7, "Country"), Some(&Cell::Missing));

    let err = Pipeline::with_schema("arsia", Schema::canonical())
        .verify(true)
        .run(&table)
        .unwrap_err();
    assert!(matches!(err, BarometerError::Invariant(_)));
}

#[test]
fn schema_errors_stop_the_source() {
    let table = CanonicalTable::new(["country", "breed"]);
    let err = Pipeline::with_schema("pathosense", Schema::canonical())
        .mode(ProjectionMode::Streaming)
        .run(&table)
        .unwrap_err();
    assert!(err.is_schema());
}

#[test]
fn bad_dates_stop_the_source() {
    let mut table = setup();
    let mut row: Vec<Value> = table.rows()[0].clone();
    row[3] = Value::from("November");
    table.push_row(row).unwrap();
    let err = Pipeline::with_schema("dgz", Schema::canonical()).run(&table).unwrap_err();
    assert!(matches!(err, BarometerError::TypeCoercion { row: 7, .. }));
}

#[test]
fn settings_can_narrow_the_schema() {
    let toml = r#"
        namespace = "urn:barometer:"
        null_sentinel = "NULL"

        [[attributes]]
        column = "pathogen"
        predicate = "hasPathogen"
        output = "Pathogen"

        [[attributes]]
        column = "date"
        predicate = "hasDate"
        output = "Month"
        kind = "date"
    "#;
    let settings = Settings::from_toml(toml).unwrap();
    let schema = settings.schema().unwrap();
    assert_eq!(schema.arity(), 2);
    assert_eq!(schema.null_sentinel(), "NULL");
    let output = Pipeline::new("gd", &settings).unwrap().run(&setup()).unwrap();
    assert_eq!(output.table.columns(), ["Pathogen", "Month"]);
    assert_eq!(output.report.facts, 14);
    assert_eq!(
        output.table.get(0, "Month").and_then(Cell::as_date),
        chrono::NaiveDate::from_ymd_opt(2022, 11, 1)
    );
}

#[test]
fn invalid_settings_are_config_errors() {
    let toml = r#"
        [[attributes]]
        column = "pathogen"
        predicate = "hasPathogen"
        output = "Pathogen"

        [[attributes]]
        column = "pathogen"
        predicate = "hasAgent"
        output = "Agent"
    "#;
    let err = Settings::from_toml(toml).unwrap_err();
    assert!(matches!(err, BarometerError::Config(_)));
    assert!(Settings::from_toml("mode = \"sideways\"").is_err());
}

#[test]
fn settings_file_is_read() {
    let path = std::env::temp_dir().join("barometer_settings_test.toml");
    std::fs::write(&path, "entity_prefix = \"BovineSample\"\n").unwrap();
    let settings = Settings::load(Some(&path)).unwrap();
    assert_eq!(settings.entity_prefix, "BovineSample");
    assert_eq!(settings.null_sentinel, "<NA>");
    let _ = std::fs::remove_file(&path);
    assert!(Settings::load(Some(&path)).is_err());
}
