use super::api::{
    AzureDevOpsApi, Commit, CommitQuery, GitRepository, Identity, Page, PullRequest,
    PullRequestStatus, TeamProject, WorkItem,
};
use crate::errors::ApiError;
use crate::http;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

const API_VERSION: &str = "7.1";
const PROJECTS_PAGE_SIZE: u32 = 500;
const WORK_ITEM_FIELDS: [&str; 4] = [
    "System.CreatedDate",
    "System.ChangedDate",
    "System.CreatedBy",
    "System.ChangedBy",
];

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct AzureDevOpsConfig {
    pub base_url: String,
    pub identity_url: String,
    pub timeout_secs: u64,
}

impl Default for AzureDevOpsConfig {
    fn default() -> Self {
        AzureDevOpsConfig {
            base_url: "https://dev.azure.com".into(),
            identity_url: "https://vssps.dev.azure.com".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityRecord {
    id: String,
    #[serde(default)]
    subject_descriptor: Option<String>,
    #[serde(default)]
    properties: HashMap<String, PropertyValue>,
}

#[derive(Deserialize)]
struct PropertyValue {
    #[serde(rename = "$value")]
    value: Value,
}

#[derive(Deserialize)]
struct ProjectRecord {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct RepositoryRecord {
    id: String,
    name: String,
    project: ProjectRef,
}

#[derive(Deserialize)]
struct ProjectRef {
    name: String,
}

#[derive(Deserialize)]
struct CommitRecord {
    author: Option<GitUserDate>,
    committer: Option<GitUserDate>,
}

#[derive(Deserialize)]
struct GitUserDate {
    date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestRecord {
    status: String,
    creation_date: DateTime<Utc>,
    #[serde(default)]
    closed_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlResponse {
    #[serde(default)]
    work_items: Vec<WorkItemRef>,
}

#[derive(Deserialize)]
struct WorkItemRef {
    id: u64,
}

#[derive(Deserialize)]
struct WorkItemRecord {
    id: u64,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl WorkItemRecord {
    fn date(&self, field: &str) -> Option<DateTime<Utc>> {
        self.fields
            .get(field)?
            .as_str()?
            .parse::<DateTime<Utc>>()
            .ok()
    }

    fn identity(&self, field: &str) -> Option<String> {
        let id = self.fields.get(field)?.get("id")?.as_str()?;
        (!id.is_empty()).then(|| id.to_string())
    }

    fn into_work_item(self) -> WorkItem {
        WorkItem {
            id: self.id,
            created_date: self.date("System.CreatedDate"),
            changed_date: self.date("System.ChangedDate"),
            created_by: self.identity("System.CreatedBy"),
            changed_by: self.identity("System.ChangedBy"),
        }
    }
}

fn parse_status(status: &str) -> PullRequestStatus {
    match status.to_ascii_lowercase().as_str() {
        "active" => PullRequestStatus::Active,
        "abandoned" => PullRequestStatus::Abandoned,
        "completed" => PullRequestStatus::Completed,
        _ => PullRequestStatus::Other,
    }
}

/// REST client for Azure DevOps. Every call authenticates with the caller's token.
pub struct AzureDevOpsClient {
    client: reqwest::Client,
    base_url: String,
    identity_url: String,
}

impl AzureDevOpsClient {
    pub fn new(config: &AzureDevOpsConfig) -> Result<Self, ApiError> {
        Ok(AzureDevOpsClient {
            client: http::build_client(Duration::from_secs(config.timeout_secs), "contributions")?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            identity_url: config.identity_url.trim_end_matches('/').to_string(),
        })
    }

    fn authorization(token: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!(":{token}")))
    }

    fn get(&self, url: String, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, Self::authorization(token))
            .query(&[("api-version", API_VERSION)])
    }

    fn post(&self, url: String, token: &str, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, Self::authorization(token))
            .query(&[("api-version", API_VERSION)])
            .json(body)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = http::send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AzureDevOpsApi for AzureDevOpsClient {
    async fn find_identity(
        &self,
        organization: &str,
        email: &str,
        token: &str,
    ) -> Result<Option<Identity>, ApiError> {
        let url = format!("{}/{organization}/_apis/identities", self.identity_url);
        let request = self
            .get(url, token)
            .query(&[("searchFilter", "MailAddress"), ("filterValue", email)]);

        let identities: ListResponse<IdentityRecord> = match Self::fetch(request).await {
            Err(ApiError::Status(reqwest::StatusCode::NOT_FOUND)) => return Ok(None),
            other => other?,
        };

        let Some(record) = identities.value.into_iter().next() else {
            return Ok(None);
        };
        let Some(descriptor) = record.subject_descriptor.filter(|d| !d.is_empty()) else {
            return Ok(None);
        };
        let account = record
            .properties
            .get("Account")
            .and_then(|p| p.value.as_str())
            .unwrap_or(email)
            .to_string();

        Ok(Some(Identity {
            id: record.id,
            descriptor,
            account,
        }))
    }

    async fn list_projects(
        &self,
        organization: &str,
        token: &str,
    ) -> Result<Vec<TeamProject>, ApiError> {
        let url = format!("{}/{organization}/_apis/projects", self.base_url);
        let mut projects = Vec::new();
        let mut page = Page {
            top: PROJECTS_PAGE_SIZE,
            skip: 0,
        };

        loop {
            let request = self
                .get(url.clone(), token)
                .query(&[("$top", page.top), ("$skip", page.skip)]);
            let batch: ListResponse<ProjectRecord> = Self::fetch(request).await?;
            let len = batch.value.len();
            projects.extend(batch.value.into_iter().map(|p| TeamProject {
                id: p.id,
                name: p.name,
            }));

            if page.is_last(len) {
                break;
            }
            let Some(next) = page.next() else {
                break;
            };
            page = next;
        }

        Ok(projects)
    }

    async fn list_repositories(
        &self,
        organization: &str,
        project: &TeamProject,
        token: &str,
    ) -> Result<Vec<GitRepository>, ApiError> {
        let url = format!(
            "{}/{organization}/{}/_apis/git/repositories",
            self.base_url, project.id
        );
        let repos: ListResponse<RepositoryRecord> = Self::fetch(self.get(url, token)).await?;

        Ok(repos
            .value
            .into_iter()
            .map(|r| GitRepository {
                id: r.id,
                name: r.name,
                project: r.project.name,
            })
            .collect())
    }

    async fn commits(
        &self,
        organization: &str,
        repository: &GitRepository,
        query: &CommitQuery,
        page: Page,
        token: &str,
    ) -> Result<Vec<Commit>, ApiError> {
        let url = format!(
            "{}/{organization}/_apis/git/repositories/{}/commits",
            self.base_url, repository.id
        );
        let request = self.get(url, token).query(&[
            ("searchCriteria.author", query.author.clone()),
            ("searchCriteria.fromDate", query.from.to_rfc3339()),
            ("searchCriteria.toDate", query.to.to_rfc3339()),
            ("searchCriteria.$top", page.top.to_string()),
            ("searchCriteria.$skip", page.skip.to_string()),
        ]);
        let commits: ListResponse<CommitRecord> = Self::fetch(request).await?;

        Ok(commits
            .value
            .into_iter()
            .map(|c| Commit {
                author_date: c.author.and_then(|a| a.date),
                committer_date: c.committer.and_then(|a| a.date),
            })
            .collect())
    }

    async fn pull_requests(
        &self,
        organization: &str,
        repository: &GitRepository,
        creator_id: &str,
        page: Page,
        token: &str,
    ) -> Result<Vec<PullRequest>, ApiError> {
        let url = format!(
            "{}/{organization}/_apis/git/repositories/{}/pullrequests",
            self.base_url, repository.id
        );
        let request = self.get(url, token).query(&[
            ("searchCriteria.creatorId", creator_id.to_string()),
            ("searchCriteria.status", "all".to_string()),
            ("$top", page.top.to_string()),
            ("$skip", page.skip.to_string()),
        ]);
        let prs: ListResponse<PullRequestRecord> = Self::fetch(request).await?;

        Ok(prs
            .value
            .into_iter()
            .map(|pr| PullRequest {
                status: parse_status(&pr.status),
                creation_date: pr.creation_date,
                closed_date: pr.closed_date,
            })
            .collect())
    }

    async fn query_work_items(
        &self,
        organization: &str,
        project: &TeamProject,
        wiql: &str,
        token: &str,
    ) -> Result<Vec<u64>, ApiError> {
        let url = format!("{}/{organization}/{}/_apis/wit/wiql", self.base_url, project.id);
        let body = json!({ "query": wiql });
        let result: WiqlResponse = Self::fetch(self.post(url, token, &body)).await?;
        Ok(result.work_items.into_iter().map(|w| w.id).collect())
    }

    async fn work_items(
        &self,
        organization: &str,
        ids: &[u64],
        token: &str,
    ) -> Result<Vec<WorkItem>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/{organization}/_apis/wit/workitemsbatch", self.base_url);
        let body = json!({ "ids": ids, "fields": WORK_ITEM_FIELDS });
        let items: ListResponse<WorkItemRecord> = Self::fetch(self.post(url, token, &body)).await?;
        Ok(items.value.into_iter().map(WorkItemRecord::into_work_item).collect())
    }
}
