//! Connector and reader lifecycle against in-memory workbooks.

mod common;

use common::{advance_workbook, sheet_xml, shared_strings_xml, WorkbookBuilder};
use sheetbind::{Connector, ConnectorConfig, Error, ReaderConfig, SheetDesignator};

sheetbind::record! {
    #[derive(Debug, Default, PartialEq)]
    struct Counted {
        n: i32,
    }
}

fn open(data: Vec<u8>) -> Connector {
    let mut conn = Connector::new();
    conn.open_bytes(data).unwrap();
    conn
}

#[test]
fn test_sheet_names_include_hidden() {
    let conn = open(advance_workbook());
    assert_eq!(
        conn.sheet_names(),
        vec!["Standard", "Secret", "Advance.suffix"]
    );
    assert!(conn
        .part_names()
        .unwrap()
        .contains(&"xl/sharedStrings.xml".to_string()));
}

#[test]
fn test_sheet_by_position_counts_hidden() {
    let conn = open(advance_workbook());

    let reader = conn.new_reader(3).unwrap();
    assert_eq!(reader.sheet_name(), "Advance.suffix");

    let reader = conn.new_reader(SheetDesignator::default()).unwrap();
    assert_eq!(reader.sheet_name(), "Standard");
    assert_eq!(reader.titles(), &["ID"]);

    assert!(matches!(conn.new_reader(0), Err(Error::SheetNotFound(_))));
    assert!(matches!(conn.new_reader(4), Err(Error::SheetNotFound(_))));
}

#[test]
fn test_sheet_affixes_apply_to_names() {
    let conn = open(advance_workbook());

    let config = ReaderConfig::new("Advance").with_sheet_suffix(".suffix");
    assert!(conn.new_reader_with_config(&config).is_ok());

    match conn.new_reader("Advance") {
        Err(Error::SheetNotFound(name)) => assert_eq!(name, "Advance"),
        other => panic!("unexpected: {other:?}"),
    }

    let config = ReaderConfig::new("Standard").with_sheet_prefix("x_");
    match conn.new_reader_with_config(&config) {
        Err(Error::SheetNotFound(name)) => assert_eq!(name, "x_Standard"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_not_open() {
    let mut conn = Connector::new();
    assert!(!conn.is_open());
    assert!(conn.sheet_names().is_empty());
    assert!(!conn.exceeded_shared_string_budget());
    assert!(matches!(conn.new_reader(1), Err(Error::NotOpen)));

    conn.open_bytes(advance_workbook()).unwrap();
    conn.close().unwrap();
    assert!(matches!(conn.new_reader(1), Err(Error::NotOpen)));
}

#[test]
fn test_empty_sheet() {
    let data = WorkbookBuilder::new().sheet("Empty", "").build();
    let conn = open(data);

    let mut reader = conn.new_reader(conn.sheet_names()[0].as_str()).unwrap();
    assert!(reader.titles().is_empty());
    assert!(!reader.next().unwrap());
    assert_eq!(reader.byte_offset(), reader.stream_size());
}

#[test]
fn test_title_row_without_data() {
    let data = WorkbookBuilder::new()
        .sheet(
            "Only",
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>ID</t></is></c></row>"#,
        )
        .build();
    let conn = open(data);

    let mut reader = conn.new_reader("Only").unwrap();
    assert_eq!(reader.titles(), &["ID"]);
    assert!(!reader.next().unwrap());
}

#[test]
fn test_read_requires_next() {
    let conn = open(advance_workbook());
    let mut reader = conn.new_reader("Standard").unwrap();

    assert!(matches!(
        reader.read::<Vec<String>>(),
        Err(Error::NoCurrentRow)
    ));
    assert!(reader.next().unwrap());
    assert_eq!(reader.read::<Vec<String>>().unwrap(), vec!["7"]);
    assert_eq!(reader.current_row().map(|r| r.index), Some(1));

    assert!(!reader.next().unwrap());
    assert!(matches!(
        reader.read::<Vec<String>>(),
        Err(Error::NoCurrentRow)
    ));
}

#[test]
fn test_close_is_idempotent() {
    let conn = open(advance_workbook());
    let mut reader = conn.new_reader("Standard").unwrap();

    reader.close().unwrap();
    reader.close().unwrap();
    assert!(reader.is_closed());
    assert!(!reader.next().unwrap());
    assert!(matches!(
        reader.read::<Vec<String>>(),
        Err(Error::NoCurrentRow)
    ));
}

#[test]
fn test_reader_outlives_connector_close() {
    let mut conn = open(advance_workbook());
    let mut reader = conn.new_reader("Standard").unwrap();
    conn.close().unwrap();

    assert!(reader.next().unwrap());
    assert_eq!(reader.read::<Vec<String>>().unwrap(), vec!["7"]);
}

#[test]
fn test_readers_share_string_table() {
    let data = WorkbookBuilder::new()
        .sheet("A", r#"<row r="1"><c r="A1" t="s"><v>1</v></c></row>"#)
        .sheet("B", r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#)
        .shared_strings(shared_strings_xml(&["first", "second"]))
        .build();
    let conn = open(data);

    let a = conn.new_reader("A").unwrap();
    assert_eq!(a.titles(), &["second"]);
    // Already scanned by the first reader.
    let b = conn.new_reader("B").unwrap();
    assert_eq!(b.titles(), &["first"]);
}

#[test]
fn test_missing_string_table() {
    let data = WorkbookBuilder::new()
        .sheet(
            "Sheet1",
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>ID</t></is></c></row><row r="2"><c r="A2" t="s"><v>0</v></c></row>"#,
        )
        .build();
    let conn = open(data);

    let mut reader = conn.new_reader("Sheet1").unwrap();
    assert_eq!(reader.titles(), &["ID"]);
    assert!(matches!(reader.next(), Err(Error::NoStringTable)));
    assert!(!reader.next().unwrap());

    // A title row made of shared strings fails when the reader opens.
    let data = WorkbookBuilder::new()
        .sheet("Sheet1", r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#)
        .build();
    let conn = open(data);
    assert!(matches!(conn.new_reader("Sheet1"), Err(Error::NoStringTable)));
}

#[test]
fn test_malformed_stream() {
    let data = WorkbookBuilder::new()
        .sheet(
            "Bad",
            r#"<row r="1"><c r="A1"><v>x</v></c></row><row r="2"><c r="??"><v>1</v></c></row>"#,
        )
        .build();
    let conn = open(data);

    let mut reader = conn.new_reader("Bad").unwrap();
    assert!(matches!(reader.next(), Err(Error::StreamMalformed(_))));
    assert!(!reader.next().unwrap());
    reader.close().unwrap();
}

#[test]
fn test_open_errors() {
    let mut conn = Connector::new();
    assert!(matches!(
        conn.open_bytes(b"not a workbook".to_vec()),
        Err(Error::Archive(_))
    ));
    assert!(!conn.is_open());

    assert!(matches!(
        conn.open("/nonexistent/book.xlsx"),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_stored_archive() {
    let data = WorkbookBuilder::new()
        .stored()
        .sheet(
            "Plain",
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row><row r="2"><c r="A2"><v>5</v></c></row>"#,
        )
        .shared_strings(shared_strings_xml(&["N"]))
        .build();
    let conn = open(data);

    let mut reader = conn.new_reader("Plain").unwrap();
    let mut rows: Vec<Vec<String>> = Vec::new();
    reader.read_all(&mut rows).unwrap();
    assert_eq!(rows, vec![vec!["5".to_string()]]);
    assert_eq!(reader.byte_offset(), reader.stream_size());
}

#[test]
fn test_title_affixes_and_json_rows() {
    let conn = open(advance_workbook());
    let config = ReaderConfig::new("Advance.suffix")
        .with_title_row(1)
        .with_skip_rows(1)
        .with_name_prefix("adv_")
        .with_name_suffix("_col");
    let mut reader = conn.new_reader_with_config(&config).unwrap();
    assert_eq!(reader.titles()[0], "adv_ID_col");
    let map = reader.title_map();
    assert_eq!(map.position("adv_NameOf_col"), Some(1));
    assert_eq!(map.position("NameOf"), None);

    let mut rows: Vec<serde_json::Map<String, serde_json::Value>> = Vec::new();
    reader.read_all(&mut rows).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["adv_NameOf_col"], serde_json::json!("Andy"));
    assert_eq!(rows[2]["adv_AgeOf_col"], serde_json::Value::Null);
}

#[test]
fn test_reopen_discards_budget_state() {
    let mut conn = Connector::new();
    conn.open_bytes_with_config(
        advance_workbook(),
        ConnectorConfig::new().with_max_shared_string_bytes(0),
    )
    .unwrap();
    let _ = conn.new_reader("Standard").unwrap();
    assert!(conn.exceeded_shared_string_budget());

    conn.open_bytes(advance_workbook()).unwrap();
    assert_eq!(conn.config().max_shared_string_bytes, None);
    let reader = conn.new_reader("Standard").unwrap();
    assert_eq!(reader.titles(), &["ID"]);
    assert!(!conn.exceeded_shared_string_budget());
}

#[test]
fn test_read_all_stops_at_first_bad_row() {
    let data = WorkbookBuilder::new()
        .sheet(
            "Counts",
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>n</t></is></c></row><row r="2"><c r="A2"><v>1</v></c></row><row r="3"><c r="A3" t="inlineStr"><is><t>bad</t></is></c></row><row r="4"><c r="A4"><v>4</v></c></row>"#,
        )
        .build();
    let conn = open(data);
    let mut reader = conn.new_reader("Counts").unwrap();

    let mut out: Vec<Counted> = Vec::new();
    match reader.read_all(&mut out) {
        Err(Error::TypeConversion { field, raw, .. }) => {
            assert_eq!(field, "n");
            assert_eq!(raw, "bad");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(out, vec![Counted { n: 1 }]);

    // The failed row does not wedge the cursor.
    assert!(reader.next().unwrap());
    assert_eq!(reader.read::<Counted>().unwrap(), Counted { n: 4 });
    assert!(!reader.next().unwrap());
    reader.close().unwrap();
}

#[test]
fn test_bom_prefixed_parts() {
    let rows = r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row><row r="2"><c r="A2"><v>9</v></c><c r="B2" t="s"><v>2</v></c></row>"#;
    let data = WorkbookBuilder::new()
        .raw_sheet("Marked", format!("\u{feff}{}", sheet_xml(rows)))
        .shared_strings(format!(
            "\u{feff}{}",
            shared_strings_xml(&["n", "name", "nine"])
        ))
        .build();
    let conn = open(data);

    let mut reader = conn.new_reader("Marked").unwrap();
    assert_eq!(reader.titles(), &["n", "name"]);
    let mut rows: Vec<Vec<String>> = Vec::new();
    reader.read_all(&mut rows).unwrap();
    assert_eq!(rows, vec![vec!["9".to_string(), "nine".to_string()]]);
    assert_eq!(reader.byte_offset(), reader.stream_size());
}
