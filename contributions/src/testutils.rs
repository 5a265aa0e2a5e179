//! In-memory platform APIs for tests.
use crate::azure_devops::api::{
    AzureDevOpsApi, Commit, CommitQuery, GitRepository, Identity, Page, PullRequest, TeamProject,
    WorkItem,
};
use crate::azure_devops::{AzureDevOpsRepository, AzureUser};
use crate::calendar::DateRange;
use crate::errors::ApiError;
use crate::github::api::{ContributionsLookup, GitHubApi};
use crate::gitlab::api::{EVENTS_PER_PAGE, GitLabApi, GitLabEvent};
use crate::manager::ProviderAccount;
use crate::options::ContributionsOptions;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::cache::Cache;
use shared::cache_key::CacheKeyHasher;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

pub fn azure_account() -> ProviderAccount {
    ProviderAccount {
        user: "dev@example.com".into(),
        organization: Some("acme".into()),
        token: "token".into(),
    }
}

pub fn azure_identity() -> Identity {
    Identity {
        id: "user-1".into(),
        descriptor: "aad.user-1".into(),
        account: "dev@example.com".into(),
    }
}

pub fn azure_user() -> AzureUser {
    AzureUser {
        organization: "acme".into(),
        identity: azure_identity(),
    }
}

pub fn azure_repository(api: Arc<FakeAzureDevOps>) -> Arc<AzureDevOpsRepository> {
    Arc::new(AzureDevOpsRepository::new(
        api,
        Cache::in_memory(100),
        CacheKeyHasher::new("test"),
        &ContributionsOptions::default(),
    ))
}

fn page_of<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    items
        .iter()
        .skip(page.skip as usize)
        .take(page.top as usize)
        .cloned()
        .collect()
}

/// Serves the same commits and pull requests for every repository.
#[derive(Default)]
pub struct FakeAzureDevOps {
    pub identity: Option<Identity>,
    pub projects: Vec<TeamProject>,
    pub repositories: Vec<GitRepository>,
    pub commits: Vec<Commit>,
    pub pull_requests: Vec<PullRequest>,
    pub work_items: Vec<WorkItem>,
    /// Every WIQL result lists each id twice.
    pub duplicate_work_item_ids: bool,
    failing: HashSet<&'static str>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeAzureDevOps {
    /// `acme` with one project `Site` holding one repository `web`.
    pub fn single_repo() -> Self {
        FakeAzureDevOps {
            identity: Some(azure_identity()),
            projects: vec![TeamProject {
                id: "p1".into(),
                name: "Site".into(),
            }],
            repositories: vec![GitRepository {
                id: "web".into(),
                name: "web".into(),
                project: "Site".into(),
            }],
            ..Default::default()
        }
    }

    pub fn with_repository(mut self, name: &str) -> Self {
        self.repositories.push(GitRepository {
            id: name.into(),
            name: name.into(),
            project: "Site".into(),
        });
        self
    }

    /// Makes every call of operation `op` fail.
    pub fn fail(mut self, op: &'static str) -> Self {
        self.failing.insert(op);
        self
    }

    pub fn calls(&self, op: &'static str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    fn record(&self, op: &'static str) -> Result<(), ApiError> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        if self.failing.contains(op) {
            return Err(ApiError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok(())
    }
}

#[async_trait]
impl AzureDevOpsApi for FakeAzureDevOps {
    async fn find_identity(
        &self,
        _organization: &str,
        email: &str,
        _token: &str,
    ) -> Result<Option<Identity>, ApiError> {
        self.record("find_identity")?;
        Ok(self
            .identity
            .clone()
            .filter(|identity| identity.account.eq_ignore_ascii_case(email)))
    }

    async fn list_projects(
        &self,
        _organization: &str,
        _token: &str,
    ) -> Result<Vec<TeamProject>, ApiError> {
        self.record("list_projects")?;
        Ok(self.projects.clone())
    }

    async fn list_repositories(
        &self,
        _organization: &str,
        project: &TeamProject,
        _token: &str,
    ) -> Result<Vec<GitRepository>, ApiError> {
        self.record("list_repositories")?;
        Ok(self
            .repositories
            .iter()
            .filter(|repo| repo.project == project.name)
            .cloned()
            .collect())
    }

    async fn commits(
        &self,
        _organization: &str,
        _repository: &GitRepository,
        _query: &CommitQuery,
        page: Page,
        _token: &str,
    ) -> Result<Vec<Commit>, ApiError> {
        self.record("commits")?;
        Ok(page_of(&self.commits, page))
    }

    async fn pull_requests(
        &self,
        _organization: &str,
        _repository: &GitRepository,
        _creator_id: &str,
        page: Page,
        _token: &str,
    ) -> Result<Vec<PullRequest>, ApiError> {
        self.record("pull_requests")?;
        Ok(page_of(&self.pull_requests, page))
    }

    async fn query_work_items(
        &self,
        _organization: &str,
        _project: &TeamProject,
        _wiql: &str,
        _token: &str,
    ) -> Result<Vec<u64>, ApiError> {
        self.record("query_work_items")?;
        let repeat = if self.duplicate_work_item_ids { 2 } else { 1 };
        Ok(self
            .work_items
            .iter()
            .flat_map(|item| std::iter::repeat_n(item.id, repeat))
            .collect())
    }

    async fn work_items(
        &self,
        _organization: &str,
        ids: &[u64],
        _token: &str,
    ) -> Result<Vec<WorkItem>, ApiError> {
        self.record("work_items")?;
        Ok(self
            .work_items
            .iter()
            .filter(|item| ids.contains(&item.id))
            .cloned()
            .collect())
    }
}

pub struct FakeGitHub {
    lookup: ContributionsLookup,
    failure: Option<fn() -> ApiError>,
    calls: AtomicUsize,
}

impl FakeGitHub {
    pub fn returning(lookup: ContributionsLookup) -> Self {
        FakeGitHub {
            lookup,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(failure: fn() -> ApiError) -> Self {
        FakeGitHub {
            lookup: ContributionsLookup::default(),
            failure: Some(failure),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn contributions(
        &self,
        _login: &str,
        _range: &DateRange,
        _token: &str,
    ) -> Result<ContributionsLookup, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(failure) => Err(failure()),
            None => Ok(self.lookup.clone()),
        }
    }
}

/// Pages the given events like the real endpoint does.
pub struct FakeGitLab {
    events: Vec<GitLabEvent>,
    failure: Option<fn() -> ApiError>,
    calls: AtomicUsize,
}

impl FakeGitLab {
    pub fn with_events(events: Vec<GitLabEvent>) -> Self {
        FakeGitLab {
            events,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(failure: fn() -> ApiError) -> Self {
        FakeGitLab {
            events: Vec::new(),
            failure: Some(failure),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GitLabApi for FakeGitLab {
    async fn events(
        &self,
        _username: &str,
        _range: &DateRange,
        page: u32,
        _token: &str,
    ) -> Result<Vec<GitLabEvent>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.failure {
            return Err(failure());
        }
        let skip = (page as usize - 1) * EVENTS_PER_PAGE;
        Ok(self
            .events
            .iter()
            .skip(skip)
            .take(EVENTS_PER_PAGE)
            .cloned()
            .collect())
    }
}
