//! Aggregation of detected schema changes into an ordered report.

use tracing::{debug, info};

use crate::api::{ApiError, SchemaChange, SchemaReviewApi, TableDetails};
use crate::change::FullTableName;

/// Derives dashboard URLs for tracked tables.
///
/// Pure: the link is a function of (app URL, data source id, artifact
/// id) and nothing else.
#[derive(Debug, Clone)]
pub struct DashboardLinks {
    app_url: String,
    data_source_id: u64,
}

impl DashboardLinks {
    pub fn new(app_url: impl Into<String>, data_source_id: u64) -> Self {
        let mut app_url = app_url.into();
        while app_url.ends_with('/') {
            app_url.pop();
        }
        Self {
            app_url,
            data_source_id,
        }
    }

    /// Dashboard URL for the table behind `artifact_id`.
    pub fn table_dashboard(&self, artifact_id: u64) -> String {
        format!(
            "{}/table/{}/dashboard?dsId={}",
            self.app_url, artifact_id, self.data_source_id
        )
    }
}

/// One finding enriched with its telemetry and dashboard link.
#[derive(Debug, Clone)]
pub struct ReportItem {
    pub filename: String,
    pub full_table_name: FullTableName,
    pub change_description: String,
    pub table_details: TableDetails,
    pub dashboard_link: String,
}

/// The complete aggregation result. An empty item list is a valid
/// terminal state, not an error.
#[derive(Debug, Clone, Default)]
pub struct SchemaChangeReport {
    pub items: Vec<ReportItem>,
}

impl SchemaChangeReport {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builds a report by enriching each detected change with telemetry.
pub struct ReportBuilder<'a> {
    api: &'a dyn SchemaReviewApi,
    links: DashboardLinks,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(api: &'a dyn SchemaReviewApi, links: DashboardLinks) -> Self {
        Self { api, links }
    }

    /// Fetch telemetry for each change, in input order, and assemble the
    /// report.
    ///
    /// An empty input returns an empty report without any telemetry
    /// calls. A telemetry failure for any single change fails the whole
    /// build; a partial report would misrepresent which changes were
    /// vetted.
    pub async fn build(&self, changes: &[SchemaChange]) -> Result<SchemaChangeReport, ApiError> {
        if changes.is_empty() {
            debug!("no schema changes, skipping telemetry");
            return Ok(SchemaChangeReport::default());
        }

        let mut report = SchemaChangeReport::default();
        for change in changes {
            let table_details = self.api.table_details(&change.full_table_name).await?;
            let dashboard_link = self.links.table_dashboard(table_details.artifact_id);
            report.items.push(ReportItem {
                filename: change.filename.clone(),
                full_table_name: change.full_table_name.clone(),
                change_description: change.change_description.clone(),
                table_details,
                dashboard_link,
            });
        }

        info!(items = report.items.len(), "schema change report assembled");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{sample_table_details, MockReviewApi};

    fn change_for(table: &FullTableName, filename: &str) -> SchemaChange {
        SchemaChange {
            filename: filename.to_string(),
            full_table_name: table.clone(),
            change_description: format!("Column dropped from {}", table.table_name),
        }
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits() {
        let api = MockReviewApi::new();
        let builder = ReportBuilder::new(&api, DashboardLinks::new("https://app.example.com", 7));

        let report = builder.build(&[]).await.unwrap();
        assert!(report.is_empty());
        assert_eq!(api.details_calls(), 0);
    }

    #[tokio::test]
    async fn test_items_keep_input_order() {
        let orders = FullTableName::new("DB", "CORE", "ORDERS");
        let customers = FullTableName::new("DB", "CORE", "CUSTOMERS");
        let api = MockReviewApi::new()
            .with_details(&orders, sample_table_details(1, &orders))
            .with_details(&customers, sample_table_details(2, &customers));
        let builder = ReportBuilder::new(&api, DashboardLinks::new("https://app.example.com", 7));

        let changes = vec![
            change_for(&customers, "models/customers.sql"),
            change_for(&orders, "models/orders.sql"),
        ];
        let report = builder.build(&changes).await.unwrap();

        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].filename, "models/customers.sql");
        assert_eq!(report.items[1].filename, "models/orders.sql");
        assert_eq!(
            api.details_fetch_order(),
            vec!["DB.CORE.CUSTOMERS", "DB.CORE.ORDERS"]
        );
    }

    #[tokio::test]
    async fn test_single_telemetry_failure_aborts_build() {
        let orders = FullTableName::new("DB", "CORE", "ORDERS");
        let missing = FullTableName::new("DB", "CORE", "MISSING");
        let api = MockReviewApi::new().with_details(&orders, sample_table_details(1, &orders));
        let builder = ReportBuilder::new(&api, DashboardLinks::new("https://app.example.com", 7));

        let changes = vec![
            change_for(&orders, "models/orders.sql"),
            change_for(&missing, "models/missing.sql"),
        ];
        let result = builder.build(&changes).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_dashboard_link_derivation() {
        let links = DashboardLinks::new("https://app.example.com/", 7);
        assert_eq!(
            links.table_dashboard(42),
            "https://app.example.com/table/42/dashboard?dsId=7"
        );
        // Same inputs, same link
        assert_eq!(links.table_dashboard(42), links.table_dashboard(42));
    }
}
