mod common;

use std::{collections::HashMap, path::Path, time::Duration};

use common::TestWorkspace;
use encoding_rs::GBK;
use table_extract::{
    Value,
    config::ExtractOptions,
    container::{RowExporter, TableLister},
    extract_with,
    model::SourceFormat,
    tool::ToolError,
};

/// In-memory stand-in for the container utilities.
struct FakeContainer {
    listing: Result<Vec<u8>, ()>,
    exports: HashMap<&'static str, Result<Vec<u8>, ()>>,
}

impl FakeContainer {
    fn new(listing: &str) -> Self {
        Self {
            listing: Ok(listing.as_bytes().to_vec()),
            exports: HashMap::new(),
        }
    }

    fn export(mut self, table: &'static str, csv: &[u8]) -> Self {
        self.exports.insert(table, Ok(csv.to_vec()));
        self
    }

    fn timing_out(mut self, table: &'static str) -> Self {
        self.exports.insert(table, Err(()));
        self
    }
}

impl TableLister for FakeContainer {
    fn list_tables(&self, _path: &Path) -> Result<Vec<u8>, ToolError> {
        self.listing.clone().map_err(|_| ToolError::Timeout {
            program: "mdb-tables".to_string(),
            timeout: Duration::from_secs(30),
        })
    }
}

impl RowExporter for FakeContainer {
    fn export_table(&self, _path: &Path, table: &str) -> Result<Vec<u8>, ToolError> {
        match self.exports.get(table) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            _ => Err(ToolError::Timeout {
                program: "mdb-export".to_string(),
                timeout: Duration::from_secs(60),
            }),
        }
    }
}

fn container_file(workspace: &TestWorkspace) -> std::path::PathBuf {
    workspace.write_bytes("plant.mdb", b"\x00\x01\x00\x00Standard Jet DB")
}

#[test]
fn timed_out_table_is_empty_while_siblings_extract() {
    let workspace = TestWorkspace::new();
    let path = container_file(&workspace);
    let source = FakeContainer::new("Devices\nReadings\nAlarms\n")
        .export("Devices", b"id,name\n1,Pump\n2,Fan\n")
        .timing_out("Readings")
        .export("Alarms", b"code,raised\nE1,\n");

    let parsed = extract_with(
        &path,
        SourceFormat::Container,
        &source,
        &ExtractOptions::default(),
    )
    .expect("extract container");

    assert_eq!(parsed.file_type, SourceFormat::Container);
    let counts = parsed
        .tables
        .iter()
        .map(|t| (t.table_name.as_str(), t.row_count))
        .collect::<Vec<_>>();
    assert_eq!(counts, vec![("Devices", 2), ("Readings", 0), ("Alarms", 1)]);
    assert!(parsed.table("Readings").unwrap().columns.is_empty());
    assert_eq!(
        parsed.table("Alarms").unwrap().preview[0].get("raised"),
        Some(&Value::Null)
    );
    assert_eq!(parsed.total_records, 3);
    assert_eq!(
        parsed.total_records,
        parsed.tables.iter().map(|t| t.row_count).sum::<usize>()
    );
}

#[test]
fn failed_listing_yields_zero_tables_not_an_error() {
    let workspace = TestWorkspace::new();
    let path = container_file(&workspace);
    let source = FakeContainer {
        listing: Err(()),
        exports: HashMap::new(),
    };

    let parsed = extract_with(
        &path,
        SourceFormat::Container,
        &source,
        &ExtractOptions::default(),
    )
    .expect("extract container");
    assert!(parsed.tables.is_empty());
    assert_eq!(parsed.total_records, 0);
}

#[test]
fn gbk_export_is_decoded_with_second_candidate() {
    let workspace = TestWorkspace::new();
    let path = container_file(&workspace);
    let (export, _, _) = GBK.encode("编号,设备名称\n1,水泵\n");
    let (listing, _, _) = GBK.encode("设备\n");
    let source = FakeContainer {
        listing: Ok(listing.into_owned()),
        exports: HashMap::new(),
    }
    .export("设备", &export);

    let parsed = extract_with(
        &path,
        SourceFormat::Container,
        &source,
        &ExtractOptions::default(),
    )
    .expect("extract container");
    let table = parsed.table("设备").expect("decoded table name");
    assert_eq!(table.columns, vec!["编号", "设备名称"]);
    assert_eq!(table.preview[0].get("设备名称"), Some(&Value::Text("水泵".into())));
}

#[test]
fn duplicate_listing_entries_are_extracted_once() {
    let workspace = TestWorkspace::new();
    let path = container_file(&workspace);
    let source = FakeContainer::new("Devices\nDevices\n").export("Devices", b"id\n1\n");

    let parsed = extract_with(
        &path,
        SourceFormat::Container,
        &source,
        &ExtractOptions::default(),
    )
    .expect("extract container");
    assert_eq!(parsed.tables.len(), 1);
    assert_eq!(parsed.total_records, 1);
}

#[test]
fn container_row_cap_marks_more_rows_available() {
    let workspace = TestWorkspace::new();
    let path = container_file(&workspace);
    let source = FakeContainer::new("Log\n").export("Log", b"n\n1\n2\n3\n4\n");
    let options = ExtractOptions {
        row_limit: 3,
        preview_rows: 2,
        ..ExtractOptions::default()
    };

    let parsed =
        extract_with(&path, SourceFormat::Container, &source, &options).expect("extract container");
    let log = &parsed.tables[0];
    assert_eq!(log.row_count, 3);
    assert_eq!(log.preview.len(), 2);
    assert!(log.full_rows_available);
}

#[cfg(unix)]
mod with_scripts {
    use super::*;
    use table_extract::extract;

    #[test]
    fn shell_tools_are_invoked_and_slow_exports_time_out() {
        let workspace = TestWorkspace::new();
        let path = container_file(&workspace);
        let tables = workspace.script("fake-mdb-tables", "printf 'Fast\\nSlow\\n'");
        let export = workspace.script(
            "fake-mdb-export",
            "if [ \"$2\" = \"Slow\" ]; then exec sleep 10; fi\nprintf 'id,label\\n1,quick\\n'",
        );
        let options = ExtractOptions {
            mdb_tables: tables.display().to_string(),
            mdb_export: export.display().to_string(),
            export_timeout_secs: 1,
            ..ExtractOptions::default()
        };

        let parsed = extract(&path, &options).expect("extract container");
        let counts = parsed
            .tables
            .iter()
            .map(|t| (t.table_name.as_str(), t.row_count))
            .collect::<Vec<_>>();
        assert_eq!(counts, vec![("Fast", 1), ("Slow", 0)]);
    }

    #[test]
    fn missing_tools_degrade_to_zero_tables() {
        let workspace = TestWorkspace::new();
        let path = container_file(&workspace);
        let options = ExtractOptions {
            mdb_tables: workspace.path().join("absent").display().to_string(),
            ..ExtractOptions::default()
        };

        let parsed = extract(&path, &options).expect("extract container");
        assert!(parsed.tables.is_empty());
    }
}
