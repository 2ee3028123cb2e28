//! Mock review API for testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{ApiError, SchemaChange, SchemaReviewApi, TableDetails};
use crate::change::{CodeChangeInfo, FullTableName};

/// Mock review API.
///
/// Configurable responses and call counters for unit tests.
pub struct MockReviewApi {
    connected: AtomicBool,
    changes: Vec<SchemaChange>,
    details: BTreeMap<String, TableDetails>,
    review_calls: AtomicU32,
    details_calls: AtomicU32,
    details_fetch_order: Mutex<Vec<String>>,
}

impl MockReviewApi {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            changes: Vec::new(),
            details: BTreeMap::new(),
            review_calls: AtomicU32::new(0),
            details_calls: AtomicU32::new(0),
            details_fetch_order: Mutex::new(Vec::new()),
        }
    }

    /// Set connectivity.
    pub fn with_connected(self, connected: bool) -> Self {
        self.connected.store(connected, Ordering::SeqCst);
        self
    }

    /// Set the changes returned by every review.
    pub fn with_changes(mut self, changes: Vec<SchemaChange>) -> Self {
        self.changes = changes;
        self
    }

    /// Register a table-details response. Lookups for unregistered
    /// tables fail with a 404-shaped error.
    pub fn with_details(mut self, table: &FullTableName, details: TableDetails) -> Self {
        self.details.insert(table.dotted_upper(), details);
        self
    }

    pub fn review_calls(&self) -> u32 {
        self.review_calls.load(Ordering::SeqCst)
    }

    pub fn details_calls(&self) -> u32 {
        self.details_calls.load(Ordering::SeqCst)
    }

    /// Dotted table names in the order their details were fetched.
    pub fn details_fetch_order(&self) -> Vec<String> {
        self.details_fetch_order
            .lock()
            .expect("fetch order lock poisoned")
            .clone()
    }
}

impl Default for MockReviewApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a plausible `TableDetails` for tests.
pub fn sample_table_details(artifact_id: u64, table: &FullTableName) -> TableDetails {
    TableDetails {
        artifact_id,
        artifact: table.clone(),
        inserted_row_count: 1_200,
        total_row_count: 3_456_789,
        most_recent_update_timestamp: 1_700_000_000,
        load_duration_seconds: 12.5,
        total_bytes_processed: 1_536,
        downstream_object_count: 4,
    }
}

#[async_trait]
impl SchemaReviewApi for MockReviewApi {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn review_changes(
        &self,
        _change: &CodeChangeInfo,
        _additional_context: &str,
    ) -> Result<Vec<SchemaChange>, ApiError> {
        self.review_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.changes.clone())
    }

    async fn table_details(&self, table: &FullTableName) -> Result<TableDetails, ApiError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        let key = table.dotted_upper();
        self.details_fetch_order
            .lock()
            .expect("fetch order lock poisoned")
            .push(key.clone());

        self.details
            .get(&key)
            .cloned()
            .ok_or(ApiError::Status {
                op: "table-details",
                status: 404,
                body: String::new(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let table = FullTableName::new("DB", "SCHEMA", "ORDERS");
        let api = MockReviewApi::new().with_details(&table, sample_table_details(1, &table));

        assert!(api.is_connected().await);
        assert_eq!(api.details_calls(), 0);

        let details = api.table_details(&table).await.unwrap();
        assert_eq!(details.artifact_id, 1);
        assert_eq!(api.details_calls(), 1);
        assert_eq!(api.details_fetch_order(), vec!["DB.SCHEMA.ORDERS"]);
    }

    #[tokio::test]
    async fn test_mock_unknown_table_fails() {
        let api = MockReviewApi::new();
        let table = FullTableName::new("DB", "SCHEMA", "MISSING");

        let result = api.table_details(&table).await;
        assert!(matches!(result, Err(ApiError::Status { status: 404, .. })));
    }
}
