//! Adapters turning external records into test case creation requests.
//!
//! Adapters never validate: they map fields and hand the requests to
//! bulk creation, which reports a per-item error for every bad record.

use std::collections::BTreeMap;

use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::{BulkCreateResponse, CreateTestCaseRequest, TestKind};

/// Tag applied to imported issues that carry no labels.
const DEFAULT_GITHUB_TAG: &str = "github";

/// Issue record as returned by the GitHub issues API.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GitHubIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default)]
    pub html_url: Option<String>,
    /// Present only on pull requests, which the issues API also lists
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub pull_request: Option<serde_json::Value>,
}

/// Issue label.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GitHubLabel {
    pub name: String,
}

/// GitHub import request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GitHubImportRequest {
    pub issues: Vec<GitHubIssue>,
}

/// Spreadsheet import request body. Each row maps column headers to cell values.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RowImportRequest {
    pub rows: Vec<BTreeMap<String, String>>,
}

/// Creation requests built from an issue list, remembering where each came from.
#[derive(Debug, Clone, Default)]
pub struct GitHubImport {
    pub requests: Vec<CreateTestCaseRequest>,
    /// Position in the submitted issue list of each request
    source_indexes: Vec<usize>,
}

impl GitHubImport {
    /// Rewrite per-item error indexes from request positions to positions in
    /// the submitted issue list, so skipped pull requests do not shift them.
    pub fn remap_errors(&self, outcome: &mut BulkCreateResponse) {
        for error in &mut outcome.errors {
            if let Some(&source) = self.source_indexes.get(error.index) {
                error.index = source;
            }
        }
    }
}

/// Map issues to creation requests, skipping pull requests.
pub fn from_github_issues(issues: &[GitHubIssue]) -> GitHubImport {
    let mut import = GitHubImport::default();

    for (index, issue) in issues.iter().enumerate() {
        if issue.pull_request.is_some() {
            continue;
        }

        let body = issue
            .body
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty());
        let mut description = body.unwrap_or(&issue.title).to_string();
        if let Some(url) = &issue.html_url {
            description.push_str(&format!("\n\nImported from {}", url));
        }

        let mut tags: Vec<String> = issue.labels.iter().map(|l| l.name.clone()).collect();
        if tags.is_empty() {
            tags.push(DEFAULT_GITHUB_TAG.to_string());
        }

        import.requests.push(CreateTestCaseRequest {
            kind: TestKind::General.as_str().to_string(),
            title: issue.title.clone(),
            description,
            feature: None,
            tags,
            is_draft: false,
            parent_id: None,
        });
        import.source_indexes.push(index);
    }

    import
}

/// Map header-keyed rows to creation requests.
///
/// Headers are matched case-insensitively. `tags` is comma-separated and
/// `draft` accepts true/yes/1/x.
pub fn from_rows(rows: &[BTreeMap<String, String>]) -> Vec<CreateTestCaseRequest> {
    rows.iter()
        .map(|row| {
            let cell = |name: &str| {
                row.iter()
                    .find(|(header, _)| header.trim().eq_ignore_ascii_case(name))
                    .map(|(_, value)| value.trim().to_string())
                    .unwrap_or_default()
            };

            let feature = cell("feature");
            CreateTestCaseRequest {
                kind: cell("kind"),
                title: cell("title"),
                description: cell("description"),
                feature: (!feature.is_empty()).then_some(feature),
                tags: cell("tags")
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
                is_draft: matches!(
                    cell("draft").to_lowercase().as_str(),
                    "true" | "yes" | "1" | "x"
                ),
                parent_id: None,
            }
        })
        .collect()
}
