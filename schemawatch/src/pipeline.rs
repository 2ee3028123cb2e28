//! End-to-end orchestration: connectivity gate, review, aggregation,
//! rendering.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::api::{ApiError, SchemaReviewApi};
use crate::change::{CodeChangeInfo, DbtModelInfo};
use crate::render;
use crate::report::{DashboardLinks, ReportBuilder};

/// Error type for the collaborator seams. Adapters surface their own
/// error types through this alias.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Supplies the change batch for the revision under review.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    async fn code_changes(&self) -> Result<CodeChangeInfo, SourceError>;
}

/// Maps modified files to the tables they materialize.
#[async_trait]
pub trait ModelResolver: Send + Sync {
    async fn resolve(&self, changes: &CodeChangeInfo) -> Result<DbtModelInfo, SourceError>;
}

/// Accepts the rendered report for publication.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, report: &str) -> Result<(), SourceError>;
}

/// Pipeline failures. No component swallows a fatal error; degraded
/// cases (oversized request, empty review) never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("review service is not reachable; check the API URL and token")]
    NotConnected,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to collect code changes: {0}")]
    Source(SourceError),

    #[error("failed to resolve model metadata: {0}")]
    Metadata(SourceError),

    #[error("failed to serialize model metadata: {0}")]
    Context(#[from] serde_json::Error),
}

/// Result of one pipeline run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The review returned no findings; nothing to publish.
    NoFindings,
    /// A rendered report ready to publish.
    Report(String),
}

/// One-shot review pipeline over a review API and the collaborator
/// seams. Holds no mutable state across runs.
pub struct SchemaReviewPipeline<A: SchemaReviewApi> {
    api: A,
    links: DashboardLinks,
}

impl<A: SchemaReviewApi> SchemaReviewPipeline<A> {
    pub fn new(api: A, links: DashboardLinks) -> Self {
        Self { api, links }
    }

    /// Run the full pipeline once.
    ///
    /// The connectivity probe gates everything: if it fails, no review
    /// request is ever issued.
    pub async fn run(
        &self,
        source: &dyn ChangeSource,
        resolver: &dyn ModelResolver,
    ) -> Result<RunOutcome, PipelineError> {
        if !self.api.is_connected().await {
            return Err(PipelineError::NotConnected);
        }

        let changes = source.code_changes().await.map_err(PipelineError::Source)?;
        debug!(files = changes.len(), "collected code changes");

        let models = resolver
            .resolve(&changes)
            .await
            .map_err(PipelineError::Metadata)?;
        let additional_context = models.to_context_json()?;

        let findings = self.api.review_changes(&changes, &additional_context).await?;
        if findings.is_empty() {
            info!("no schema changes detected");
            return Ok(RunOutcome::NoFindings);
        }
        info!(findings = findings.len(), "schema changes detected");

        let builder = ReportBuilder::new(&self.api, self.links.clone());
        let report = builder.build(&findings).await?;
        Ok(RunOutcome::Report(render::render(&report)))
    }
}
