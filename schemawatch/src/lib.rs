//! schemawatch - schema-change review for warehouse model changes.
//!
//! Correlates a batch of changed SQL model files with metadata about the
//! tables they materialize, submits that context to a remote
//! schema-review service, and enriches each finding with live table
//! telemetry before rendering a report.
//!
//! # Architecture
//!
//! ```text
//! ChangeSource ──┐
//!                ├─> SchemaReviewPipeline ──> SchemaReviewApi (review)
//! ModelResolver ─┘          │
//!                           ├─> ReportBuilder ──> SchemaReviewApi (telemetry)
//!                           └─> render ──> report body
//! ```
//!
//! The connectivity probe gates the whole pipeline; an oversized review
//! request degrades to an empty result rather than failing the run.

pub mod api;
pub mod change;
pub mod config;
pub mod pipeline;
pub mod render;
pub mod report;

// Re-export main types for convenience
pub use api::{ApiError, HttpReviewApi, MockReviewApi, SchemaChange, SchemaReviewApi, TableDetails};
pub use change::{CodeChangeInfo, DbtModel, DbtModelInfo, FullTableName, ModifiedFile};
pub use config::{ConfigError, ReviewConfig};
pub use pipeline::{
    ChangeSource, ModelResolver, PipelineError, ReportSink, RunOutcome, SchemaReviewPipeline,
    SourceError,
};
pub use report::{DashboardLinks, ReportBuilder, ReportItem, SchemaChangeReport};
