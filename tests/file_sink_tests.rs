//! File-backed sinks: XLSX package and SpreadsheetML document on disk

use std::fs;

use gridstream_core::cancel::CancellationToken;
use gridstream_core::config::{ExportConfig, OverflowPolicy};
use gridstream_core::schema::{Column, ColumnKind, ColumnSchema};
use gridstream_exec::ExportSession;
use gridstream_io::sink::{CsvSink, XlsxSink, XmlSink};
use gridstream_io::source::{IterSource, JsonlSource};

struct Order {
    id: u32,
    customer: String,
    total: f64,
    paid: bool,
}

gridstream_cells::row_shape!(Order {
    id,
    customer,
    total,
    paid,
});

fn schema() -> ColumnSchema {
    ColumnSchema::new(vec![
        Column::new("id", ColumnKind::Number).with_header("Order"),
        Column::new("customer", ColumnKind::Text).with_header("Customer"),
        Column::new("total", ColumnKind::Number).with_header("Total"),
        Column::new("paid", ColumnKind::Boolean).with_header("Paid"),
    ])
    .unwrap()
}

fn orders(n: u32) -> Vec<Order> {
    (1..=n)
        .map(|id| Order {
            id,
            customer: format!("Customer <{id}> & Sons"),
            total: f64::from(id) * 1.5,
            paid: id % 2 == 0,
        })
        .collect()
}

fn config() -> ExportConfig {
    ExportConfig {
        max_rows_per_sheet: Some(4),
        max_cell_text_length: Some(12),
        overflow_policy: OverflowPolicy::Truncate,
        sheet_name: "Orders".into(),
        ..Default::default()
    }
}

#[test]
fn test_xlsx_file_is_a_zip_package() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.xlsx");
    let cfg = config();
    let sink = XlsxSink::create(&path, &cfg.sheet_name).unwrap();
    let outcome = ExportSession::new(cfg, schema(), sink)
        .unwrap()
        .run(IterSource::new(orders(7).into_iter()), &CancellationToken::new())
        .unwrap();

    let report = outcome.report();
    assert_eq!(report.sheets, 3);
    assert_eq!(report.truncated_cells, 7);

    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"PK"));
    assert_eq!(report.bytes_written, Some(bytes.len() as u64));
}

#[test]
fn test_xml_file_has_one_worksheet_per_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.xml");
    let cfg = ExportConfig {
        max_cell_text_length: None,
        ..config()
    };
    let sink = XmlSink::create(&path, &cfg.sheet_name).unwrap();
    ExportSession::new(cfg, schema(), sink)
        .unwrap()
        .run(IterSource::new(orders(7).into_iter()), &CancellationToken::new())
        .unwrap();

    let doc = fs::read_to_string(&path).unwrap();
    assert!(doc.starts_with("<?xml"));
    assert!(doc.contains("<?mso-application progid=\"Excel.Sheet\"?>"));
    assert_eq!(doc.matches("<Worksheet ").count(), 3);
    assert!(doc.contains("ss:Name=\"Orders\""));
    assert!(doc.contains("ss:Name=\"Orders_2\""));
    assert!(doc.contains("ss:Name=\"Orders_3\""));
    assert!(doc.contains("Customer &lt;1&gt; &amp; Sons"));
    assert!(doc.contains("<Data ss:Type=\"Number\">1.5</Data>"));
    assert!(doc.contains("<Data ss:Type=\"Boolean\">1</Data>"));
    assert!(doc.trim_end().ends_with("</Workbook>"));
}

#[test]
fn test_jsonl_file_to_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rows.jsonl");
    let output = dir.path().join("rows.csv");
    fs::write(
        &input,
        "{\"id\": 1, \"customer\": \"Ann\", \"total\": 2.5, \"paid\": true}\n\n\
         {\"id\": 2, \"customer\": \"Bo, Jr.\", \"total\": null}\n",
    )
    .unwrap();

    let source = JsonlSource::open(&input).unwrap();
    let sink = CsvSink::create(&output).unwrap();
    let outcome = ExportSession::new(ExportConfig::default(), schema(), sink)
        .unwrap()
        .run(source, &CancellationToken::new())
        .unwrap();
    assert_eq!(outcome.report().logical_rows, 2);

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(
        text,
        "Order,Customer,Total,Paid\n1,Ann,2.5,true\n2,\"Bo, Jr.\",,\n"
    );
}
