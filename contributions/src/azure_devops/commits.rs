use super::api::{AzureDevOpsApi, CommitQuery, GitRepository};
use super::repository::AzureDevOpsRepository;
use super::{AzureUser, ScanSettings};
use crate::calendar::DateRange;
use crate::errors::Result;
use crate::manager::ProviderAccount;
use crate::model::{ActivityKind, DayCounts};
use crate::strategy::{ContributionStrategy, scan_units};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Commits authored by the user, dated by author date (committer date as fallback).
pub struct CommitsStrategy {
    repository: Arc<AzureDevOpsRepository>,
    settings: ScanSettings,
}

impl CommitsStrategy {
    pub fn new(repository: Arc<AzureDevOpsRepository>, settings: ScanSettings) -> Self {
        CommitsStrategy {
            repository,
            settings,
        }
    }
}

#[async_trait]
impl ContributionStrategy<AzureUser> for CommitsStrategy {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Commits
    }

    async fn get_contributions(
        &self,
        user: &AzureUser,
        account: &ProviderAccount,
        range: &DateRange,
        cancel: &CancellationToken,
    ) -> Result<DayCounts> {
        let repositories = self
            .repository
            .repositories(&user.organization, &account.token)
            .await?;
        let query = Arc::new(CommitQuery {
            author: user.identity.account.clone(),
            from: range.from,
            to: range.to,
        });
        let range = *range;

        scan_units(
            self.kind(),
            repositories,
            self.settings.max_concurrency,
            cancel,
            |repository| {
                let api = self.repository.api();
                let organization = user.organization.clone();
                let token = account.token.clone();
                let query = query.clone();
                let settings = self.settings;
                async move {
                    count_commits(
                        api.as_ref(),
                        &organization,
                        &repository,
                        &query,
                        settings,
                        range,
                        &token,
                    )
                    .await
                }
            },
        )
        .await
    }
}

async fn count_commits(
    api: &dyn AzureDevOpsApi,
    organization: &str,
    repository: &GitRepository,
    query: &CommitQuery,
    settings: ScanSettings,
    range: DateRange,
    token: &str,
) -> Result<DayCounts> {
    let mut counts = DayCounts::new();
    let mut page = settings.first_page;

    for _ in 0..settings.max_pages {
        let commits = api.commits(organization, repository, query, page, token).await?;
        let len = commits.len();

        for commit in commits {
            let dated = commit.author_date.or(commit.committer_date);
            if let Some(at) = dated.filter(|at| range.contains(*at)) {
                counts.increment(at.date_naive());
            }
        }

        if page.is_last(len) {
            return Ok(counts);
        }
        let Some(next) = page.next() else {
            break;
        };
        page = next;
    }

    tracing::warn!(
        repository = %repository.name,
        max_pages = settings.max_pages,
        "Stopped paging commits early"
    );
    Ok(counts)
}
