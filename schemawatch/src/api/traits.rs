//! Core trait for the schema-review service.
//!
//! This module defines `SchemaReviewApi` - the abstraction over the
//! remote service the pipeline talks to - together with its wire types
//! and error taxonomy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::change::{CodeChangeInfo, FullTableName};

/// Error types for review-service operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("{op}: request failed: {detail}")]
    Network { op: &'static str, detail: String },

    /// The service answered with a non-success status.
    #[error("{op}: HTTP {status}: {body}")]
    Status {
        op: &'static str,
        status: u16,
        body: String,
    },

    /// The service answered 2xx but the required payload was absent.
    /// Distinct from `Status`: this is a service-side inconsistency,
    /// not a transport problem.
    #[error("{op}: response missing payload: {body}")]
    MissingPayload { op: &'static str, body: String },

    /// The response body could not be decoded.
    #[error("{op}: could not decode response: {detail}")]
    Decode { op: &'static str, detail: String },
}

/// One structural change detected by the review service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaChange {
    /// Source file the change was detected in.
    pub filename: String,
    /// Table the file materializes.
    pub full_table_name: FullTableName,
    /// Natural-language description of the change.
    pub change_description: String,
}

/// Operational snapshot of one tracked table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDetails {
    /// The service's opaque handle for the table; required for
    /// dashboard links.
    pub artifact_id: u64,
    /// Identity of the tracked table as the service knows it.
    pub artifact: FullTableName,
    pub inserted_row_count: u64,
    pub total_row_count: u64,
    /// Epoch seconds of the most recent load.
    pub most_recent_update_timestamp: i64,
    pub load_duration_seconds: f64,
    pub total_bytes_processed: u64,
    pub downstream_object_count: u64,
}

/// The three operations the pipeline depends on.
#[async_trait]
pub trait SchemaReviewApi: Send + Sync {
    /// Probe the service health endpoint.
    ///
    /// Any non-success outcome is reported as `false`, never as an
    /// error; the caller decides whether that is fatal.
    async fn is_connected(&self) -> bool;

    /// Submit a change batch plus serialized model metadata for review.
    ///
    /// An oversized-payload rejection from the service is a benign
    /// degradation and yields an empty list; any other non-success
    /// status is an error.
    async fn review_changes(
        &self,
        change: &CodeChangeInfo,
        additional_context: &str,
    ) -> Result<Vec<SchemaChange>, ApiError>;

    /// Fetch the operational snapshot for one table.
    ///
    /// Unlike `review_changes` there is no degraded outcome here: a
    /// finding without telemetry cannot be rendered, so any non-success
    /// status or missing payload is an error.
    async fn table_details(&self, table: &FullTableName) -> Result<TableDetails, ApiError>;
}
