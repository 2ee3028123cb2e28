//! GitHub pull-request adapter: collects the change batch for a pull
//! request and posts the rendered report back as a comment.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use schemawatch::{ChangeSource, CodeChangeInfo, ModifiedFile, ReportSink, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("GitHub {op}: request failed: {detail}")]
    Network { op: &'static str, detail: String },

    #[error("GitHub {op}: HTTP {status}: {body}")]
    Status {
        op: &'static str,
        status: u16,
        body: String,
    },

    #[error("GitHub {op}: could not decode response: {detail}")]
    Decode { op: &'static str, detail: String },

    #[error("no diff found for file: {0}")]
    MissingDiff(String),

    #[error("file contents were not valid base64/UTF-8: {0}")]
    Content(String),
}

/// Change source and report sink backed by the GitHub REST API.
pub struct GithubChangeSource {
    api_url: String,
    token: String,
    repository: String,
    pull_number: u64,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    base: CommitRef,
    head: CommitRef,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullFile {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompareResponse {
    files: Option<Vec<CompareFile>>,
}

#[derive(Debug, Deserialize)]
struct CompareFile {
    filename: String,
    patch: Option<String>,
}

impl CompareResponse {
    fn patch_for(&self, file_path: &str) -> Option<String> {
        self.files
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|file| file.filename == file_path)
            .and_then(|file| file.patch.clone())
    }
}

#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

impl GithubChangeSource {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        repository: impl Into<String>,
        pull_number: u64,
    ) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("schemawatch"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client");

        let mut api_url = api_url.into();
        while api_url.ends_with('/') {
            api_url.pop();
        }

        Self {
            api_url,
            token: token.into(),
            repository: repository.into(),
            pull_number,
            client,
        }
    }

    fn repo_url(&self, tail: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, self.repository, tail)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        op: &'static str,
        url: &str,
    ) -> Result<T, GithubError> {
        debug!(%url, "GitHub GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| GithubError::Network {
                op,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Status {
                op,
                status: status.as_u16(),
                body,
            });
        }
        response.json().await.map_err(|e| GithubError::Decode {
            op,
            detail: e.to_string(),
        })
    }

    async fn pull(&self) -> Result<PullResponse, GithubError> {
        let url = self.repo_url(&format!("pulls/{}", self.pull_number));
        self.get_json("pull", &url).await
    }

    /// Paths of modified `.sql` files in the pull request.
    async fn modified_sql_paths(&self) -> Result<Vec<String>, GithubError> {
        let url = self.repo_url(&format!("pulls/{}/files", self.pull_number));
        let files: Vec<PullFile> = self.get_json("pull-files", &url).await?;
        Ok(files
            .into_iter()
            .map(|file| file.filename)
            .filter(|name| name.ends_with(".sql"))
            .collect())
    }

    async fn compare(&self, base: &str, head: &str) -> Result<CompareResponse, GithubError> {
        let url = self.repo_url(&format!("compare/{base}...{head}"));
        self.get_json("compare", &url).await
    }

    /// Full file contents at a commit. A missing side (e.g. a file that
    /// did not exist at the base SHA) degrades to `None`.
    async fn contents_at(&self, file_path: &str, sha: &str) -> Option<String> {
        let url = format!("{}?ref={}", self.repo_url(&format!("contents/{file_path}")), sha);
        let response: Result<ContentsResponse, GithubError> = self.get_json("contents", &url).await;
        match response.and_then(|contents| decode_contents(&contents.content)) {
            Ok(text) => Some(text),
            Err(error) => {
                info!(file = %file_path, %sha, %error, "could not fetch file contents");
                None
            }
        }
    }
}

/// Decode the base64 file payload the contents API returns. GitHub
/// wraps the encoding with newlines, which the strict engine rejects.
fn decode_contents(raw: &str) -> Result<String, GithubError> {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(stripped)
        .map_err(|e| GithubError::Content(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| GithubError::Content(e.to_string()))
}

#[async_trait]
impl ChangeSource for GithubChangeSource {
    async fn code_changes(&self) -> Result<CodeChangeInfo, SourceError> {
        let pull = self.pull().await?;
        debug!(base = %pull.base.sha, head = %pull.head.sha, "resolved pull request SHAs");

        let paths = self.modified_sql_paths().await?;
        let compare = self.compare(&pull.base.sha, &pull.head.sha).await?;

        let mut changes = CodeChangeInfo::default();
        for file_path in paths {
            let diff = compare
                .patch_for(&file_path)
                .ok_or_else(|| GithubError::MissingDiff(file_path.clone()))?;
            let base_content = self.contents_at(&file_path, &pull.base.sha).await;
            let head_content = self.contents_at(&file_path, &pull.head.sha).await;
            info!(file = %file_path, "modified file");
            changes.insert(ModifiedFile {
                file_path,
                diff,
                base_content,
                head_content,
            });
        }
        Ok(changes)
    }
}

#[async_trait]
impl ReportSink for GithubChangeSource {
    async fn publish(&self, report: &str) -> Result<(), SourceError> {
        let url = self.repo_url(&format!("issues/{}/comments", self.pull_number));
        debug!(%url, "posting review comment");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&CommentRequest { body: report })
            .send()
            .await
            .map_err(|e| GithubError::Network {
                op: "comment",
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Status {
                op: "comment",
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_contents_strips_wrapping() {
        // "select 1\n" encoded with a newline split, as the contents API returns it
        let raw = "c2VsZWN0\nIDEK\n";
        assert_eq!(decode_contents(raw).unwrap(), "select 1\n");
    }

    #[test]
    fn test_decode_contents_rejects_garbage() {
        assert!(decode_contents("not base64 at all!!!").is_err());
    }

    #[test]
    fn test_patch_lookup_by_filename() {
        let compare = CompareResponse {
            files: Some(vec![
                CompareFile {
                    filename: "models/orders.sql".to_string(),
                    patch: Some("-  order_total,\n".to_string()),
                },
                CompareFile {
                    filename: "models/renamed.sql".to_string(),
                    patch: None,
                },
            ]),
        };
        assert_eq!(
            compare.patch_for("models/orders.sql").as_deref(),
            Some("-  order_total,\n")
        );
        assert_eq!(compare.patch_for("models/renamed.sql"), None);
        assert_eq!(compare.patch_for("models/unknown.sql"), None);
    }

    #[test]
    fn test_repo_urls() {
        let source = GithubChangeSource::new("https://api.github.com/", "t", "acme/warehouse", 12);
        assert_eq!(
            source.repo_url("pulls/12"),
            "https://api.github.com/repos/acme/warehouse/pulls/12"
        );
    }
}
