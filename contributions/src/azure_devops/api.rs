use crate::errors::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user as known to one organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub descriptor: String,
    /// The account name (usually the mail address) used in author filters and WIQL.
    pub account: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamProject {
    pub id: String,
    pub name: String,
}

impl fmt::Display for TeamProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepository {
    pub id: String,
    pub name: String,
    pub project: String,
}

impl fmt::Display for GitRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub author_date: Option<DateTime<Utc>>,
    pub committer_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullRequestStatus {
    Active,
    Abandoned,
    Completed,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequest {
    pub status: PullRequestStatus,
    pub creation_date: DateTime<Utc>,
    pub closed_date: Option<DateTime<Utc>>,
}

/// Only the fields needed to attribute creation and last change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkItem {
    pub id: u64,
    pub created_date: Option<DateTime<Utc>>,
    pub changed_date: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub changed_by: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub top: u32,
    pub skip: u32,
}

impl Page {
    /// `None` once `skip` would overflow.
    pub fn next(self) -> Option<Page> {
        Some(Page {
            top: self.top,
            skip: self.skip.checked_add(self.top)?,
        })
    }

    /// A page shorter than requested is the last one.
    pub fn is_last(&self, len: usize) -> bool {
        len < self.top as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitQuery {
    pub author: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// The Azure DevOps REST surface the strategies need.
#[async_trait]
pub trait AzureDevOpsApi: Send + Sync {
    /// Looks the user up by mail address. `None` when the organization does not know it.
    async fn find_identity(
        &self,
        organization: &str,
        email: &str,
        token: &str,
    ) -> Result<Option<Identity>, ApiError>;

    async fn list_projects(
        &self,
        organization: &str,
        token: &str,
    ) -> Result<Vec<TeamProject>, ApiError>;

    async fn list_repositories(
        &self,
        organization: &str,
        project: &TeamProject,
        token: &str,
    ) -> Result<Vec<GitRepository>, ApiError>;

    async fn commits(
        &self,
        organization: &str,
        repository: &GitRepository,
        query: &CommitQuery,
        page: Page,
        token: &str,
    ) -> Result<Vec<Commit>, ApiError>;

    /// Pull requests of any status created by `creator_id`.
    async fn pull_requests(
        &self,
        organization: &str,
        repository: &GitRepository,
        creator_id: &str,
        page: Page,
        token: &str,
    ) -> Result<Vec<PullRequest>, ApiError>;

    /// Runs a WIQL query in the project and returns the matching work item ids.
    async fn query_work_items(
        &self,
        organization: &str,
        project: &TeamProject,
        wiql: &str,
        token: &str,
    ) -> Result<Vec<u64>, ApiError>;

    async fn work_items(
        &self,
        organization: &str,
        ids: &[u64],
        token: &str,
    ) -> Result<Vec<WorkItem>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_next() {
        let page = Page { top: 100, skip: 0 };
        assert_eq!(page.next().map(|next| next.skip), Some(100));
        assert!(page.is_last(99));
        assert!(!page.is_last(100));

        let near_end = Page {
            top: 100,
            skip: u32::MAX - 50,
        };
        assert_eq!(near_end.next(), None);
    }
}
