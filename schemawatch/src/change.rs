//! Change model: what changed in a code revision, and which warehouse
//! tables those files map to.
//!
//! Everything here is transient - built once per pipeline run, serialized
//! into the review request, and dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One modified source file in a change batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedFile {
    /// Repository-relative path of the file.
    pub file_path: String,
    /// Unified diff of the change. Empty only for files tracked without
    /// a content change.
    pub diff: String,
    /// Full file contents before the change, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_content: Option<String>,
    /// Full file contents after the change, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_content: Option<String>,
}

/// A batch of modified files, keyed by file path.
///
/// The map keys are the file paths themselves, so a path can appear at
/// most once. `BTreeMap` keeps the serialized request deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChangeInfo {
    pub modified_files: BTreeMap<String, ModifiedFile>,
}

impl CodeChangeInfo {
    /// Add a modified file, replacing any previous entry for its path.
    pub fn insert(&mut self, file: ModifiedFile) {
        self.modified_files.insert(file.file_path.clone(), file);
    }

    pub fn is_empty(&self) -> bool {
        self.modified_files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.modified_files.len()
    }
}

/// Fully-qualified (database, schema, table) identity of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullTableName {
    pub database_name: String,
    pub schema_name: String,
    pub table_name: String,
}

impl FullTableName {
    pub fn new(
        database_name: impl Into<String>,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            database_name: database_name.into(),
            schema_name: schema_name.into(),
            table_name: table_name.into(),
        }
    }

    /// Upper-cased dotted form, e.g. `PC_DBT_DB.TEST_DATA.TPCH_ALL`.
    pub fn dotted_upper(&self) -> String {
        format!(
            "{}.{}.{}",
            self.database_name, self.schema_name, self.table_name
        )
        .to_uppercase()
    }

    /// Upper-cased table component, e.g. `TPCH_ALL`.
    pub fn short_upper(&self) -> String {
        self.table_name.to_uppercase()
    }
}

/// Metadata binding one modified file to the table it materializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbtModel {
    pub file_path: String,
    pub full_table_name: FullTableName,
}

/// Model metadata for a change batch, keyed by file path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbtModelInfo {
    pub models: BTreeMap<String, DbtModel>,
}

impl DbtModelInfo {
    /// Add a model, replacing any previous entry for its file path.
    pub fn insert(&mut self, model: DbtModel) {
        self.models.insert(model.file_path.clone(), model);
    }

    /// Serialize into the opaque context string sent alongside the
    /// change batch in a review request.
    pub fn to_context_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modified_file_serializes_camel_case() {
        let mut info = CodeChangeInfo::default();
        info.insert(ModifiedFile {
            file_path: "models/orders.sql".to_string(),
            diff: "-  order_total,\n".to_string(),
            base_content: None,
            head_content: Some("select 1".to_string()),
        });

        let json = serde_json::to_value(&info).unwrap();
        let file = &json["modifiedFiles"]["models/orders.sql"];
        assert_eq!(file["filePath"], "models/orders.sql");
        assert_eq!(file["headContent"], "select 1");
        // Absent optional content is omitted entirely
        assert!(file.get("baseContent").is_none());
    }

    #[test]
    fn test_insert_deduplicates_by_path() {
        let mut info = CodeChangeInfo::default();
        for diff in ["a", "b"] {
            info.insert(ModifiedFile {
                file_path: "models/orders.sql".to_string(),
                diff: diff.to_string(),
                base_content: None,
                head_content: None,
            });
        }
        assert_eq!(info.len(), 1);
        assert_eq!(info.modified_files["models/orders.sql"].diff, "b");
    }

    #[test]
    fn test_full_table_name_rendering() {
        let table = FullTableName::new("pc_dbt_db", "test_data", "tpch_all");
        assert_eq!(table.dotted_upper(), "PC_DBT_DB.TEST_DATA.TPCH_ALL");
        assert_eq!(table.short_upper(), "TPCH_ALL");
    }

    #[test]
    fn test_model_info_context_json() {
        let mut models = DbtModelInfo::default();
        models.insert(DbtModel {
            file_path: "snowflake/models/tpch_all.sql".to_string(),
            full_table_name: FullTableName::new("PC_DBT_DB", "TEST_DATA", "TPCH_ALL"),
        });

        let context = models.to_context_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&context).unwrap();
        assert_eq!(
            parsed["models"]["snowflake/models/tpch_all.sql"]["fullTableName"]["tableName"],
            "TPCH_ALL"
        );
    }
}
