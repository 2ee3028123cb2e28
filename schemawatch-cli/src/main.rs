//! schemawatch: one-shot schema-change review for pull requests.
//!
//! Wires the review pipeline to its collaborators: GitHub supplies the
//! change batch and receives the report, dbt supplies the model-to-table
//! metadata, and the remote review service does the detection.

mod dbt;
mod github;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use schemawatch::{
    DashboardLinks, HttpReviewApi, ReportSink, ReviewConfig, RunOutcome, SchemaReviewPipeline,
};

use dbt::DbtModelResolver;
use github::GithubChangeSource;

#[derive(Parser)]
#[command(name = "schemawatch")]
#[command(about = "Reviews pull-request SQL changes against live warehouse telemetry")]
struct Cli {
    /// Review service API base URL
    #[arg(long, env = "SCHEMAWATCH_API_URL")]
    api_url: String,

    /// Review service app base URL, used for dashboard links
    #[arg(long, env = "SCHEMAWATCH_APP_URL")]
    app_url: String,

    /// Review service API token
    #[arg(long, env = "SCHEMAWATCH_API_TOKEN", hide_env_values = true)]
    api_token: String,

    /// Data source id findings are associated with
    #[arg(long, env = "SCHEMAWATCH_DATA_SOURCE_ID")]
    data_source_id: u64,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,

    /// Repository in owner/name form
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: String,

    /// Pull request number under review
    #[arg(long, env = "SCHEMAWATCH_PULL_NUMBER")]
    pull_number: u64,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    github_api_url: String,

    /// Repository checkout root scanned for dbt projects
    #[arg(long, default_value = ".")]
    repo_root: PathBuf,

    /// dbt profile secrets as a JSON object of env var name to value;
    /// passed to the dbt child process only
    #[arg(long, env = "DBT_PROFILE_SECRETS", hide_env_values = true, default_value = "{}")]
    dbt_profile_secrets: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("schemawatch=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = ReviewConfig::new(cli.api_url, cli.app_url, cli.api_token, cli.data_source_id);
    config
        .validate()
        .context("invalid review service configuration")?;

    let dbt_env: BTreeMap<String, String> = serde_json::from_str(&cli.dbt_profile_secrets)
        .context("dbt profile secrets must be a JSON object of string values")?;

    let github = GithubChangeSource::new(
        cli.github_api_url,
        cli.github_token,
        cli.repository,
        cli.pull_number,
    );
    let resolver = DbtModelResolver::new(cli.repo_root, dbt_env);

    let links = DashboardLinks::new(config.app_url.clone(), config.data_source_id);
    let pipeline = SchemaReviewPipeline::new(HttpReviewApi::new(config), links);

    info!("starting schema review");
    match pipeline.run(&github, &resolver).await? {
        RunOutcome::NoFindings => info!("no schema changes detected"),
        RunOutcome::Report(body) => {
            github
                .publish(&body)
                .await
                .map_err(anyhow::Error::from_boxed)
                .context("failed to post the review comment")?;
            info!("review comment posted");
        }
    }
    Ok(())
}
