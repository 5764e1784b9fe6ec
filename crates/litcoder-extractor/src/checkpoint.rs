//! CSV checkpoint store
//!
//! The table on disk is the only durable state of a run. It is rewritten in
//! full after every item through a sibling temporary file, so a crash leaves
//! either the previous snapshot or the new one, never a partial file.

use crate::config::CheckpointLayout;
use crate::error::ExtractorError;
use litcoder_domain::{ExtractionRecord, FieldValue, ItemState};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Ordered rows plus the union of their columns in first-seen order
#[derive(Debug, Clone)]
pub struct CheckpointTable {
    path: PathBuf,
    layout: CheckpointLayout,
    columns: Vec<String>,
    rows: Vec<ExtractionRecord>,
}

impl CheckpointTable {
    /// An empty table that will be saved to `path`
    pub fn empty(path: impl Into<PathBuf>, layout: CheckpointLayout) -> Self {
        Self {
            path: path.into(),
            layout,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Load the table, starting empty when the file is absent or unreadable
    pub fn load(path: impl Into<PathBuf>, layout: CheckpointLayout) -> Self {
        let path = path.into();
        if !path.exists() {
            info!("No checkpoint at {}, starting with an empty table", path.display());
            return Self::empty(path, layout);
        }

        match Self::open(&path, layout.clone()) {
            Ok(table) => {
                info!("Loaded checkpoint with {} rows from {}", table.len(), path.display());
                table
            }
            Err(e) => {
                warn!("Could not read checkpoint {}: {}. Starting with an empty table", path.display(), e);
                Self::empty(path, layout)
            }
        }
    }

    /// Load the table, failing if the file is absent or malformed
    pub fn open(path: impl Into<PathBuf>, layout: CheckpointLayout) -> Result<Self, ExtractorError> {
        let path = path.into();
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for result in reader.records() {
            let row = result?;
            let mut record = ExtractionRecord::new();
            for (column, cell) in columns.iter().zip(row.iter()) {
                let value = if cell.is_empty() {
                    FieldValue::Empty
                } else {
                    FieldValue::Text(cell.to_string())
                };
                record.insert(column.as_str(), value);
            }
            rows.push(record);
        }

        Ok(Self {
            path,
            layout,
            columns,
            rows,
        })
    }

    /// Whether a successful record exists for `name`
    ///
    /// Failure placeholders do not count, so failed items are retried.
    pub fn already_has(&self, name: &str) -> bool {
        self.successful_row(name).is_some()
    }

    /// First row for `name`, successful or not
    pub fn row_for(&self, name: &str) -> Option<&ExtractionRecord> {
        self.rows
            .iter()
            .find(|row| row.name(&self.layout.id_field) == Some(name))
    }

    /// Successful row for `name`
    pub fn successful_row(&self, name: &str) -> Option<&ExtractionRecord> {
        self.rows.iter().find(|row| {
            row.name(&self.layout.id_field) == Some(name) && !row.is_failure(&self.layout.error_field)
        })
    }

    /// Recorded state of `name`, or `None` when the table has no row for it
    pub fn status_of(&self, name: &str) -> Option<ItemState> {
        if self.already_has(name) {
            Some(ItemState::Succeeded)
        } else if self.row_for(name).is_some() {
            Some(ItemState::Failed)
        } else {
            None
        }
    }

    /// Append a record and rewrite the table on disk
    ///
    /// Earlier failure placeholders for the same item are dropped first.
    pub fn append_and_persist(&mut self, record: ExtractionRecord) -> Result<(), ExtractorError> {
        if let Some(name) = record.name(&self.layout.id_field).map(str::to_string) {
            let id_field = &self.layout.id_field;
            let error_field = &self.layout.error_field;
            let before = self.rows.len();
            self.rows
                .retain(|row| !(row.name(id_field) == Some(name.as_str()) && row.is_failure(error_field)));
            if self.rows.len() < before {
                debug!("Replaced {} earlier failure row(s) for {}", before - self.rows.len(), name);
            }
        }

        for field in record.field_names() {
            if !self.columns.iter().any(|c| c == field) {
                self.columns.push(field.to_string());
            }
        }
        self.rows.push(record);

        self.save()
    }

    /// Write the whole table through a temporary file and rename it into place
    pub fn save(&self) -> Result<(), ExtractorError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.persistence(e))?;
        }

        let tmp = self.temp_path();
        self.write_to(&tmp).map_err(|e| self.persistence(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.persistence(e))?;

        debug!("Wrote {} rows to {}", self.rows.len(), self.path.display());
        Ok(())
    }

    fn write_to(&self, path: &Path) -> Result<(), ExtractorError> {
        let mut writer = csv::Writer::from_path(path)?;
        if self.columns.is_empty() {
            writer.flush()?;
            return Ok(());
        }
        writer.write_record(&self.columns)?;

        for row in &self.rows {
            let cells = self
                .columns
                .iter()
                .map(|column| row.get(column).map(render_cell).transpose())
                .collect::<Result<Vec<_>, _>>()?;
            writer.write_record(cells.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }

        writer.flush()?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persistence(&self, e: impl std::fmt::Display) -> ExtractorError {
        ExtractorError::Persistence(format!("{}: {}", self.path.display(), e))
    }

    /// Rows in order
    pub fn rows(&self) -> &[ExtractionRecord] {
        &self.rows
    }

    /// Column names in first-seen order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// File the table is saved to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifying and error columns
    pub fn layout(&self) -> &CheckpointLayout {
        &self.layout
    }
}

/// Render a value as a CSV cell
fn render_cell(value: &FieldValue) -> Result<String, ExtractorError> {
    Ok(match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Integer(n) => n.to_string(),
        FieldValue::List(items) => serde_json::to_string(items)?,
        FieldValue::Empty => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> CheckpointLayout {
        CheckpointLayout::default()
    }

    fn record(name: &str, fields: &[(&str, FieldValue)]) -> ExtractionRecord {
        let mut record = ExtractionRecord::identified("File_Name", name);
        for (field, value) in fields {
            record.insert(*field, value.clone());
        }
        record
    }

    fn failure(name: &str) -> ExtractionRecord {
        ExtractionRecord::failure("File_Name", name, "ERROR", "failed_to_extract")
    }

    #[test]
    fn test_load_absent_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let table = CheckpointTable::load(dir.path().join("missing.csv"), layout());
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }

    #[test]
    fn test_open_absent_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(CheckpointTable::open(dir.path().join("missing.csv"), layout()).is_err());
    }

    #[test]
    fn test_append_writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("sectionD.csv");
        let mut table = CheckpointTable::empty(&path, layout());

        table
            .append_and_persist(record("a.pdf", &[("Year", 2016.into()), ("Country", "UK".into())]))
            .unwrap();
        table
            .append_and_persist(record(
                "b.pdf",
                &[("Services", vec!["Food".to_string(), "Fuel".to_string()].into())],
            ))
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "File_Name,Year,Country,Services");
        assert_eq!(lines[1], "a.pdf,2016,UK,");
        assert_eq!(lines[2], r#"b.pdf,,,"[""Food"",""Fuel""]""#);
        assert!(!dir.path().join("out").join("sectionD.csv.tmp").exists());
    }

    #[test]
    fn test_reload_round_trips_names_and_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.csv");
        let mut table = CheckpointTable::empty(&path, layout());
        table.append_and_persist(record("a.pdf", &[("Title", "Parks".into())])).unwrap();
        table.append_and_persist(failure("b.pdf")).unwrap();

        let loaded = CheckpointTable::load(&path, layout());
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.columns(), &["File_Name", "Title", "ERROR"]);
        assert!(loaded.already_has("a.pdf"));
        assert!(!loaded.already_has("b.pdf"));
        assert_eq!(
            loaded.row_for("a.pdf").unwrap().get("ERROR"),
            Some(&FieldValue::Empty)
        );
    }

    #[test]
    fn test_status_of() {
        let dir = TempDir::new().unwrap();
        let mut table = CheckpointTable::empty(dir.path().join("c.csv"), layout());
        table.append_and_persist(record("a.pdf", &[])).unwrap();
        table.append_and_persist(failure("b.pdf")).unwrap();

        assert_eq!(table.status_of("a.pdf"), Some(ItemState::Succeeded));
        assert_eq!(table.status_of("b.pdf"), Some(ItemState::Failed));
        assert_eq!(table.status_of("c.pdf"), None);
    }

    #[test]
    fn test_retry_replaces_failure_placeholder() {
        let dir = TempDir::new().unwrap();
        let mut table = CheckpointTable::empty(dir.path().join("c.csv"), layout());
        table.append_and_persist(failure("a.pdf")).unwrap();
        table.append_and_persist(failure("a.pdf")).unwrap();
        assert_eq!(table.len(), 1);

        table.append_and_persist(record("a.pdf", &[("Year", 2020.into())])).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.already_has("a.pdf"));
    }

    #[test]
    fn test_unreadable_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, [0xff, 0xfe, b'\n', 0xff]).unwrap();

        let table = CheckpointTable::load(&path, layout());
        assert!(table.is_empty());
    }

    #[test]
    fn test_short_rows_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.csv");
        fs::write(&path, "File_Name,Year,ERROR\na.pdf,2019\n").unwrap();

        let table = CheckpointTable::load(&path, layout());
        assert_eq!(table.len(), 1);
        assert!(table.already_has("a.pdf"));
    }

    #[test]
    fn test_save_failure_is_persistence_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), "x").unwrap();

        let mut table = CheckpointTable::empty(&path, layout());
        let result = table.append_and_persist(record("a.pdf", &[]));
        assert!(matches!(result, Err(ExtractorError::Persistence(_))));
    }
}
