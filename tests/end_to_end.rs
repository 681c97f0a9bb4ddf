use std::fs;

use shipview::export::{self, ExportFormat, ExportOutcome, OfflineExportService};
use shipview::grid::EMPTY_MARKER;
use shipview::json_view::{JsonViewer, TokenKind};
use shipview::record::{Record, RecordSet, parse_feed};
use shipview::table::ShipmentTable;

const FEED: &str = r#"{
    "success": true,
    "labeled_data": [
        {"office_name": "LA", "container_number": "", "seal": "SL-1",
         "eta_date": "2024-06-01", "ssl": "MAERSK"},
        {"office": "NY", "container_no": "MSCU1234567", "seal": "SL-2",
         "delivery_appointment_date_time": "2024-06-03T14:30:00"}
    ]
}"#;

fn csv_export(table: &ShipmentTable) -> String {
    let columns = export::visible_columns(table.columns());
    let rows = export::collect_visible_data(table.grid(), &columns);
    match export::run_export(&OfflineExportService, ExportFormat::Csv, rows) {
        ExportOutcome::Download { artifact, fallback } => {
            assert!(fallback);
            String::from_utf8(artifact.content).unwrap()
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn feed_renders_with_aliases_markers_and_dates() {
    let table = ShipmentTable::new(parse_feed(FEED).unwrap());
    let grid = table.grid();
    let la = &grid.rows[0];
    let ny = &grid.rows[1];

    assert_eq!(la.cell("container_number").unwrap().text(), EMPTY_MARKER);
    assert_eq!(la.cell("eta_date").unwrap().text(), "06/01/2024");
    assert_eq!(la.cell("steam_ship_line").unwrap().text(), "MAERSK");
    assert_eq!(ny.cell("office_name").unwrap().text(), "NY");
    assert_eq!(ny.cell("container_number").unwrap().text(), "MSCU1234567");
    assert_eq!(
        ny.cell("delivery_appointment_date_time").unwrap().text(),
        "06/03/2024 14:30"
    );
}

#[test]
fn csv_export_follows_order_and_visibility() {
    let mut table = ShipmentTable::new(parse_feed(FEED).unwrap());
    let csv = csv_export(&table);
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("\"Office\",\"Batch no\""));
    let la = lines.next().unwrap();
    assert!(la.starts_with("\"LA\",\"\""));
    assert!(la.contains("\"SL-1\""));

    table.set_visible("seal", false);
    table.start_drag("container_number");
    table.hover("office_name");
    table.drop_on("office_name");
    let csv = csv_export(&table);
    assert!(csv.starts_with("\"Container#\",\"Office\""));
    assert!(!csv.contains("Seal"));
    assert!(!csv.contains("SL-1"));
    assert!(csv.lines().nth(2).unwrap().starts_with("\"MSCU1234567\",\"NY\""));
}

#[test]
fn json_export_reads_filtered_grid_not_records() {
    let mut table = ShipmentTable::new(parse_feed(FEED).unwrap());
    table.apply_filter("mscu");
    let columns = export::visible_columns(table.columns());
    let rows = export::collect_visible_data(table.grid(), &columns);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["office_name"], "NY");
    assert_eq!(rows[0]["Tags"], "");
}

#[test]
fn json_viewer_ignores_table_state() {
    let records = parse_feed(FEED).unwrap();
    let mut table = ShipmentTable::new(records.clone());
    table.set_visible("seal", false);
    table.apply_filter("mscu");

    let viewer = JsonViewer::default();
    let text = viewer.copy_text(table.records()).unwrap().unwrap();
    let parsed: Vec<Record> = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, records);

    let tokens = shipview::json_view::format(table.records()).unwrap();
    assert!(tokens
        .iter()
        .any(|t| t.kind == TokenKind::Key && t.text == "\"container_no\""));
}

#[test]
fn loads_feed_files_and_summarizes() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("extract.json");
    fs::write(&json, FEED).unwrap();
    let csv = dir.path().join("extract.csv");
    fs::write(&csv, "office_name,container_number\nSEA,TGHU7654321\n").unwrap();

    let (set, load_time) = RecordSet::load(&[json, csv]).unwrap();
    let summary = set.summary(load_time);
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.shipments, 3);
    assert_eq!(summary.containers, 2);
}

#[test]
fn empty_container_is_marker_on_screen_and_empty_in_csv() {
    let table = ShipmentTable::new(vec![
        Record::new()
            .with("office_name", "LA")
            .with("container_number", ""),
    ]);
    let cell = table.grid().rows[0].cell("container_number").unwrap();
    assert_eq!(cell.text(), EMPTY_MARKER);

    let csv = csv_export(&table);
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let header = reader.headers().unwrap().clone();
    let container = header.iter().position(|h| h == "Container#").unwrap();
    assert_eq!(&header[0], "Office");

    let row = reader.records().next().unwrap().unwrap();
    assert_eq!(&row[0], "LA");
    assert_eq!(&row[container], "");
    assert!(csv.lines().nth(1).unwrap().starts_with("\"LA\",\"\""));
}
