//! dbt adapter: maps modified model files to the tables they
//! materialize by parsing each affected project's manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;

use schemawatch::{CodeChangeInfo, DbtModel, DbtModelInfo, FullTableName, ModelResolver, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum DbtError {
    #[error("failed to run `dbt {command}` in {project}: {detail}")]
    Run {
        command: &'static str,
        project: String,
        detail: String,
    },

    #[error("failed to read manifest at {path}: {detail}")]
    Manifest { path: String, detail: String },

    #[error("no dbt model found in the manifest for file: {0}")]
    UnknownModel(String),
}

/// Parsed subset of a dbt `manifest.json`.
#[derive(Debug, Deserialize)]
struct Manifest {
    nodes: BTreeMap<String, ManifestNode>,
}

#[derive(Debug, Deserialize)]
struct ManifestNode {
    original_file_path: String,
    database: String,
    schema: String,
    name: String,
}

impl Manifest {
    /// Find the node a modified file belongs to. The manifest records
    /// project-relative paths; the change batch carries repo-relative
    /// ones, so match on the suffix.
    fn model_for(&self, file_path: &str) -> Option<DbtModel> {
        self.nodes
            .values()
            .find(|node| file_path.ends_with(&node.original_file_path))
            .map(|node| DbtModel {
                file_path: file_path.to_string(),
                full_table_name: FullTableName::new(&node.database, &node.schema, &node.name),
            })
    }
}

/// Resolves model metadata by running `dbt parse` in each affected
/// project directory.
///
/// Profile secrets are an explicit by-value environment map handed to
/// the child process; the resolver never mutates its own environment.
pub struct DbtModelResolver {
    repo_root: PathBuf,
    dbt_env: BTreeMap<String, String>,
}

impl DbtModelResolver {
    pub fn new(repo_root: impl Into<PathBuf>, dbt_env: BTreeMap<String, String>) -> Self {
        Self {
            repo_root: repo_root.into(),
            dbt_env,
        }
    }

    /// Repo-relative dbt project directories: the parent of every
    /// `profiles.yml` in the checkout.
    fn project_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for entry in WalkDir::new(&self.repo_root)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() && entry.file_name() == "profiles.yml" {
                let parent = entry.path().parent().unwrap_or(Path::new(""));
                if let Ok(relative) = parent.strip_prefix(&self.repo_root) {
                    dirs.push(relative.to_path_buf());
                }
            }
        }
        info!(projects = dirs.len(), "discovered dbt project directories");
        dirs
    }

    async fn run_dbt(&self, command: &'static str, project_dir: &Path) -> Result<(), DbtError> {
        info!(project = %project_dir.display(), command, "running dbt");
        let status = Command::new("dbt")
            .arg(command)
            .current_dir(self.repo_root.join(project_dir))
            .envs(&self.dbt_env)
            .status()
            .await
            .map_err(|e| DbtError::Run {
                command,
                project: project_dir.display().to_string(),
                detail: e.to_string(),
            })?;

        if !status.success() {
            return Err(DbtError::Run {
                command,
                project: project_dir.display().to_string(),
                detail: format!("exited with {status}"),
            });
        }
        Ok(())
    }

    /// Run `dbt deps` + `dbt parse` and read back the manifest.
    async fn parse_project(&self, project_dir: &Path) -> Result<Manifest, DbtError> {
        self.run_dbt("deps", project_dir).await?;
        self.run_dbt("parse", project_dir).await?;

        let manifest_path = self
            .repo_root
            .join(project_dir)
            .join("target")
            .join("manifest.json");
        let data = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|e| DbtError::Manifest {
                path: manifest_path.display().to_string(),
                detail: e.to_string(),
            })?;
        serde_json::from_str(&data).map_err(|e| DbtError::Manifest {
            path: manifest_path.display().to_string(),
            detail: e.to_string(),
        })
    }
}

#[async_trait]
impl ModelResolver for DbtModelResolver {
    async fn resolve(&self, changes: &CodeChangeInfo) -> Result<DbtModelInfo, SourceError> {
        let modified: Vec<&str> = changes
            .modified_files
            .keys()
            .filter(|path| path.ends_with(".sql"))
            .map(String::as_str)
            .collect();

        let mut result = DbtModelInfo::default();
        if modified.is_empty() {
            return Ok(result);
        }

        for project_dir in self.project_dirs() {
            let in_project: Vec<&str> = modified
                .iter()
                .copied()
                .filter(|path| Path::new(path).starts_with(&project_dir))
                .collect();
            if in_project.is_empty() {
                continue;
            }
            debug!(
                project = %project_dir.display(),
                files = in_project.len(),
                "resolving models for project"
            );

            let manifest = self.parse_project(&project_dir).await?;
            for file_path in in_project {
                let model = manifest
                    .model_for(file_path)
                    .ok_or_else(|| DbtError::UnknownModel(file_path.to_string()))?;
                result.insert(model);
            }
        }
        Ok(result)
    }
}
