use barometer::builder::FactBuilder;
use barometer::datatype::{Cell, Value};
use barometer::materializer::TableMaterializer;
use barometer::projector::RecordProjector;
use barometer::schema::Schema;
use barometer::table::{CanonicalTable, MaterializedTable};
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

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
const OUTPUT: [&str; 10] = [
    "LabReference",
    "Country",
    "Breed",
    "Date",
    "Province",
    "FarmIdentification",
    "DiagnosticTest",
    "SampleType",
    "Pathogen",
    "Result",
];
// input column feeding each output column
const OUTPUT_SOURCE: [usize; 10] = [9, 1, 2, 3, 4, 5, 0, 6, 7, 8];
const DATE: usize = 3;

fn row(values: [&str; 10]) -> Vec<Value> {
    values.into_iter().map(Value::from).collect()
}

fn round_trip(schema: &Schema, table: &CanonicalTable) -> MaterializedTable {
    let facts = FactBuilder::new(schema).build(table).expect("build");
    let projection = RecordProjector::new(schema).project(&facts);
    TableMaterializer::new(schema).materialize(&projection).expect("materialize")
}

// What the materializer should hand back for an input row, in output order.
fn expected(row: &[Value]) -> Vec<Cell> {
    OUTPUT_SOURCE
        .iter()
        .map(|&source| match &row[source] {
            Value::Missing => Cell::Missing,
            Value::Date(d) => Cell::Date(*d),
            Value::DateTime(d) => Cell::Date(d.date()),
            other if source == DATE => {
                Cell::Date(NaiveDate::parse_from_str(&other.to_string(), "%Y-%m-%d").unwrap())
            }
            other => Cell::Text(other.to_string()),
        })
        .collect()
}

#[test]
fn belgian_pcr_sample_round_trips() {
    let schema = Schema::canonical();
    let table = CanonicalTable::from_rows(
        COLUMNS,
        vec![row([
            "PCR",
            "Belgium",
            "Dairy",
            "2022-01-01",
            "Antwerp",
            "9f86d081884c7d65",
            "BAL",
            "BRSV",
            "1",
            "3",
        ])],
    )
    .unwrap();
    let out = round_trip(&schema, &table);
    assert_eq!(out.columns(), OUTPUT);
    assert_eq!(out.len(), 1);
    let text = |column: &str| out.get(0, column).and_then(Cell::as_text).map(str::to_owned);
    assert_eq!(text("LabReference").as_deref(), Some("3"));
    assert_eq!(text("Country").as_deref(), Some("Belgium"));
    assert_eq!(text("Breed").as_deref(), Some("Dairy"));
    assert_eq!(out.get(0, "Date").and_then(Cell::as_date), NaiveDate::from_ymd_opt(2022, 1, 1));
    assert_eq!(text("Province").as_deref(), Some("Antwerp"));
    assert_eq!(text("FarmIdentification").as_deref(), Some("9f86d081884c7d65"));
    assert_eq!(text("DiagnosticTest").as_deref(), Some("PCR"));
    assert_eq!(text("SampleType").as_deref(), Some("BAL"));
    assert_eq!(text("Pathogen").as_deref(), Some("BRSV"));
    assert_eq!(text("Result").as_deref(), Some("1"));
}

#[test]
fn null_in_any_single_attribute_survives() {
    let schema = Schema::canonical();
    let full = row([
        "Culture",
        "The Netherlands",
        "Veal",
        "2021-06-01",
        "Utrecht",
        "ab12",
        "Swab",
        "PI3",
        "0",
        "2",
    ]);
    for missing in 0..COLUMNS.len() {
        let mut cells = full.clone();
        cells[missing] = Value::Missing;
        let table = CanonicalTable::from_rows(COLUMNS, vec![cells.clone()]).unwrap();
        let out = round_trip(&schema, &table);
        assert_eq!(out.len(), 1, "row with {} missing was dropped", COLUMNS[missing]);
        assert_eq!(out.rows()[0], expected(&cells));
        let output_position = OUTPUT_SOURCE.iter().position(|&s| s == missing).unwrap();
        assert!(out.rows()[0][output_position].is_missing());
    }
}

#[test]
fn empty_input_gives_empty_table_with_output_columns() {
    let schema = Schema::canonical();
    let table = CanonicalTable::new(COLUMNS);
    let facts = FactBuilder::new(&schema).build(&table).expect("build");
    assert!(facts.is_empty());
    let projection = RecordProjector::new(&schema).project(&facts);
    assert!(projection.is_empty());
    assert_eq!(projection.dropped(), 0);
    let out = TableMaterializer::new(&schema).materialize(&projection).expect("materialize");
    assert!(out.is_empty());
    assert_eq!(out.columns(), OUTPUT);
}

#[test]
fn typed_cells_reduce_to_strings_and_back() {
    let schema = Schema::canonical();
    let floored =
        NaiveDateTime::parse_from_str("2022-03-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
    let cells = vec![
        Value::from("PCR"),
        Value::from("Ireland"),
        Value::from("Beef"),
        Value::from(floored),
        Value::from("Cork"),
        Value::from(Some("c0ffee")),
        Value::from("Autopsy"),
        Value::from("M. bovis"),
        Value::from(1i64),
        Value::from(Option::<&str>::None),
    ];
    let table = CanonicalTable::from_rows(COLUMNS, vec![cells]).unwrap();
    let facts = FactBuilder::new(&schema).build(&table).unwrap();
    assert!(facts.iter().any(|f| f.value() == "2022-03-01 00:00:00"));
    assert!(facts.iter().any(|f| f.value() == "<NA>"));
    let out = round_trip(&schema, &table);
    assert_eq!(out.get(0, "Result"), Some(&Cell::Text("1".into())));
    assert_eq!(out.get(0, "Date"), Some(&Cell::Date(floored.date())));
    assert_eq!(out.get(0, "LabReference"), Some(&Cell::Missing));
}

#[test]
fn duplicate_rows_are_kept_as_separate_entities() {
    let schema = Schema::canonical();
    let same = row(["PCR", "Belgium", "Beef", "2022-02-01", "Namur", "aa", "BAL", "BCV", "0", "3"]);
    let table = CanonicalTable::from_rows(COLUMNS, vec![same.clone(), same.clone(), same]).unwrap();
    let out = round_trip(&schema, &table);
    assert_eq!(out.len(), 3);
    assert_eq!(out.fingerprint(), table.fingerprint(&schema).unwrap());
}

fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 .]{0,12}"
}

fn month() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2030, 1u32..=12).prop_map(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1).unwrap())
}

fn canonical_row() -> impl Strategy<Value = Vec<Value>> {
    (prop::collection::vec(text(), 9), month()).prop_map(|(texts, date)| {
        let mut cells: Vec<Value> = texts.into_iter().map(Value::from).collect();
        cells.insert(DATE, Value::Date(date));
        cells
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn round_trip_identity(rows in prop::collection::vec(canonical_row(), 0..40)) {
        let schema = Schema::canonical();
        let table = CanonicalTable::from_rows(COLUMNS, rows.clone()).unwrap();
        let facts = FactBuilder::new(&schema).build(&table).unwrap();
        prop_assert_eq!(facts.len(), 10 * table.len());
        let projection = RecordProjector::new(&schema).project(&facts);
        prop_assert_eq!(projection.len(), table.len());
        prop_assert_eq!(projection.dropped(), 0);
        let out = TableMaterializer::new(&schema).materialize(&projection).unwrap();
        let mut actual = out.into_rows();
        let mut wanted: Vec<Vec<Cell>> = rows.iter().map(|r| expected(r)).collect();
        actual.sort();
        wanted.sort();
        prop_assert_eq!(actual, wanted);
    }

    #[test]
    fn single_null_round_trips_as_missing(
        rows in prop::collection::vec(canonical_row(), 1..20),
        pick in any::<prop::sample::Index>(),
        attribute in 0usize..10,
    ) {
        let schema = Schema::canonical();
        let mut rows = rows;
        let target = pick.index(rows.len());
        rows[target][attribute] = Value::Missing;
        let table = CanonicalTable::from_rows(COLUMNS, rows.clone()).unwrap();
        let out = round_trip(&schema, &table);
        prop_assert_eq!(out.len(), rows.len());
        let output_position = OUTPUT_SOURCE.iter().position(|&s| s == attribute).unwrap();
        prop_assert!(out.rows()[target][output_position].is_missing());
        prop_assert_eq!(out.fingerprint(), table.fingerprint(&schema).unwrap());
    }
}
