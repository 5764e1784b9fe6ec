//! Context text drawn from a prior stage's checkpoint
//!
//! A later coding section can be told how the same study was coded in an
//! earlier one. The prior table is read once at start; for each item its
//! row is rendered as a short summary sent between the instruction and the
//! document.

use crate::checkpoint::CheckpointTable;
use crate::config::{CheckpointLayout, ContextSettings};
use crate::error::ExtractorError;
use litcoder_domain::FieldValue;
use tracing::{debug, info};

/// A prior stage's table plus the rules for rendering it
#[derive(Debug, Clone)]
pub struct PriorStage {
    settings: ContextSettings,
    table: CheckpointTable,
}

impl PriorStage {
    /// Load the prior table; it must exist and be readable
    pub fn load(settings: &ContextSettings, layout: &CheckpointLayout) -> Result<Self, ExtractorError> {
        let prior_layout = CheckpointLayout {
            id_field: settings
                .id_field
                .clone()
                .unwrap_or_else(|| layout.id_field.clone()),
            ..layout.clone()
        };

        let table = CheckpointTable::open(&settings.prior_output, prior_layout).map_err(|e| {
            ExtractorError::Context(format!(
                "Cannot load prior stage {}: {}",
                settings.prior_output.display(),
                e
            ))
        })?;

        info!(
            "Loaded prior stage with {} rows from {}",
            table.len(),
            settings.prior_output.display()
        );

        Ok(Self {
            settings: settings.clone(),
            table,
        })
    }

    /// Context text for one item
    pub fn context_for(&self, name: &str) -> String {
        let Some(row) = self.table.successful_row(name) else {
            debug!("No prior-stage row for {}, using fallback context", name);
            return format!("{}\n{}", self.settings.heading, self.settings.missing_text);
        };

        let mut lines = vec![self.settings.heading.clone()];
        for field in &self.settings.fields {
            let label = field.label.as_deref().unwrap_or(&field.column);
            lines.push(format!("- {}: {}", label, cell(row.get(&field.column))));
            if let Some(detail) = &field.detail {
                lines.push(format!("  Detail: {}", cell(row.get(detail))));
            }
        }
        lines.join("\n")
    }

    /// Number of rows in the prior table
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the prior table is empty
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn cell(value: Option<&FieldValue>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextField;
    use litcoder_domain::ExtractionRecord;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn settings(prior_output: PathBuf) -> ContextSettings {
        ContextSettings {
            prior_output,
            heading: "SECTION C SUMMARY FOR THIS STUDY".to_string(),
            missing_text: "- No Section C record was found for this file.".to_string(),
            fields: vec![
                ContextField {
                    column: "Park_Quality_Context".to_string(),
                    label: None,
                    detail: None,
                },
                ContextField {
                    column: "Physical_Functional_Dimensions".to_string(),
                    label: Some("Physical/Functional Dimensions".to_string()),
                    detail: Some("Physical_Functional_Dimensions_Detail".to_string()),
                },
            ],
            id_field: None,
        }
    }

    fn prior_table(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("sectionC.csv");
        let mut table = CheckpointTable::empty(&path, CheckpointLayout::default());

        let mut row = ExtractionRecord::identified("File_Name", "roe2016.pdf");
        row.insert("Park_Quality_Context", "Urban pocket parks".into());
        row.insert(
            "Physical_Functional_Dimensions",
            vec!["Amenities".to_string(), "Maintenance".to_string()].into(),
        );
        row.insert("Physical_Functional_Dimensions_Detail", "\"benches were broken\"".into());
        table.append_and_persist(row).unwrap();
        table
            .append_and_persist(ExtractionRecord::failure(
                "File_Name",
                "wood2018.pdf",
                "ERROR",
                "failed_to_extract",
            ))
            .unwrap();
        path
    }

    #[test]
    fn test_context_renders_prior_row() {
        let dir = TempDir::new().unwrap();
        let path = prior_table(&dir);
        let stage = PriorStage::load(&settings(path), &CheckpointLayout::default()).unwrap();

        let text = stage.context_for("roe2016.pdf");
        let expected = [
            "SECTION C SUMMARY FOR THIS STUDY",
            "- Park_Quality_Context: Urban pocket parks",
            r#"- Physical/Functional Dimensions: ["Amenities","Maintenance"]"#,
            "  Detail: \"benches were broken\"",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn test_context_fallback_for_missing_or_failed_row() {
        let dir = TempDir::new().unwrap();
        let path = prior_table(&dir);
        let stage = PriorStage::load(&settings(path), &CheckpointLayout::default()).unwrap();

        let fallback = "SECTION C SUMMARY FOR THIS STUDY\n- No Section C record was found for this file.";
        assert_eq!(stage.context_for("unknown.pdf"), fallback);
        assert_eq!(stage.context_for("wood2018.pdf"), fallback);
    }

    #[test]
    fn test_missing_prior_table_is_context_error() {
        let dir = TempDir::new().unwrap();
        let result = PriorStage::load(&settings(dir.path().join("nope.csv")), &CheckpointLayout::default());
        assert!(matches!(result, Err(ExtractorError::Context(_))));
    }

    #[test]
    fn test_custom_prior_id_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prior.csv");
        std::fs::write(&path, "Paper,Park_Quality_Context\nroe2016.pdf,Street trees\n").unwrap();

        let mut settings = settings(path);
        settings.id_field = Some("Paper".to_string());
        settings.fields.truncate(1);
        let stage = PriorStage::load(&settings, &CheckpointLayout::default()).unwrap();

        assert_eq!(stage.len(), 1);
        assert!(stage.context_for("roe2016.pdf").ends_with("- Park_Quality_Context: Street trees"));
    }
}
