//! reqwest-backed client for the schema-review service.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::traits::{ApiError, SchemaChange, SchemaReviewApi, TableDetails};
use crate::change::{CodeChangeInfo, FullTableName};
use crate::config::ReviewConfig;

/// Client identifier sent with every request.
const CLIENT_HEADER: &str = "X-Source-Application";
const CLIENT_NAME: &str = "schemawatch";

const OP_PING: &str = "ping";
const OP_REVIEW: &str = "schema-review";
const OP_TABLE_DETAILS: &str = "table-details";

/// HTTP client for the review service.
pub struct HttpReviewApi {
    client: Client,
    config: ReviewConfig,
}

impl HttpReviewApi {
    /// Create a client for the given configuration.
    pub fn new(config: ReviewConfig) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            CLIENT_HEADER,
            header::HeaderValue::from_static(CLIENT_NAME),
        );
        // Always fetch live data
        headers.insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.api_token)
    }

    fn ping_url(&self) -> String {
        format!("{}/ping", self.config.api_url)
    }

    fn review_url(&self) -> String {
        format!("{}/schema-review", self.config.api_url)
    }

    fn table_details_url(&self) -> String {
        format!("{}/table-details", self.config.api_url)
    }
}

/// Review request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest<'a> {
    data_source_id: u64,
    code_change_info: &'a CodeChangeInfo,
    additional_context: &'a str,
}

/// Review response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewResponse {
    schema_changes: Vec<SchemaChange>,
}

/// Table-details response body. The payload is optional on the wire;
/// its absence is an application-level failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableDetailsResponse {
    table_details: Option<TableDetails>,
}

#[async_trait]
impl SchemaReviewApi for HttpReviewApi {
    async fn is_connected(&self) -> bool {
        let url = self.ping_url();
        debug!(%url, "probing review service");

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!("connected to review service");
                true
            }
            Ok(response) => {
                warn!(
                    status = response.status().as_u16(),
                    "failed to connect to review service"
                );
                false
            }
            Err(error) => {
                warn!(%error, "failed to reach review service");
                false
            }
        }
    }

    async fn review_changes(
        &self,
        change: &CodeChangeInfo,
        additional_context: &str,
    ) -> Result<Vec<SchemaChange>, ApiError> {
        let url = self.review_url();
        let request = ReviewRequest {
            data_source_id: self.config.data_source_id,
            code_change_info: change,
            additional_context,
        };
        debug!(%url, files = change.len(), "submitting schema review request");

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Network {
                op: OP_REVIEW,
                detail: e.to_string(),
            })?;

        let status = response.status();
        // Oversized diffs are expected for large change batches and must
        // not fail the run.
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            warn!("schema review request was too large, skipping review");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                op: OP_REVIEW,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ReviewResponse = response.json().await.map_err(|e| ApiError::Decode {
            op: OP_REVIEW,
            detail: e.to_string(),
        })?;
        debug!(changes = parsed.schema_changes.len(), "schema review response parsed");
        Ok(parsed.schema_changes)
    }

    async fn table_details(&self, table: &FullTableName) -> Result<TableDetails, ApiError> {
        let url = self.table_details_url();
        debug!(%url, table = %table.dotted_upper(), "fetching table details");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("dataSourceId", self.config.data_source_id.to_string()),
                ("databaseName", table.database_name.clone()),
                ("schemaName", table.schema_name.clone()),
                ("tableName", table.table_name.clone()),
            ])
            .header(header::AUTHORIZATION, self.bearer())
            .send()
            .await
            .map_err(|e| ApiError::Network {
                op: OP_TABLE_DETAILS,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                op: OP_TABLE_DETAILS,
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| ApiError::Network {
            op: OP_TABLE_DETAILS,
            detail: e.to_string(),
        })?;
        let parsed: TableDetailsResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode {
                op: OP_TABLE_DETAILS,
                detail: e.to_string(),
            })?;

        let details = parsed.table_details.ok_or(ApiError::MissingPayload {
            op: OP_TABLE_DETAILS,
            body,
        })?;
        debug!(artifact_id = details.artifact_id, "table details fetched");
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_from_config() {
        let api = HttpReviewApi::new(ReviewConfig::new(
            "https://gateway.example.com/api/v1/",
            "https://app.example.com",
            "token",
            7,
        ));
        assert_eq!(api.ping_url(), "https://gateway.example.com/api/v1/ping");
        assert_eq!(
            api.review_url(),
            "https://gateway.example.com/api/v1/schema-review"
        );
        assert_eq!(
            api.table_details_url(),
            "https://gateway.example.com/api/v1/table-details"
        );
    }
}
