use super::api::{AzureDevOpsApi, GitRepository, PullRequest, PullRequestStatus};
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

/// Pull requests created by the user.
///
/// The creation day counts once; a completed pull request also counts on the day it
/// was closed, even when that is the creation day.
pub struct PullRequestsStrategy {
    repository: Arc<AzureDevOpsRepository>,
    settings: ScanSettings,
}

impl PullRequestsStrategy {
    pub fn new(repository: Arc<AzureDevOpsRepository>, settings: ScanSettings) -> Self {
        PullRequestsStrategy {
            repository,
            settings,
        }
    }
}

#[async_trait]
impl ContributionStrategy<AzureUser> for PullRequestsStrategy {
    fn kind(&self) -> ActivityKind {
        ActivityKind::PullRequests
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
        let range = *range;

        scan_units(
            self.kind(),
            repositories,
            self.settings.max_concurrency,
            cancel,
            |repository| {
                let api = self.repository.api();
                let organization = user.organization.clone();
                let creator = user.identity.id.clone();
                let token = account.token.clone();
                let settings = self.settings;
                async move {
                    count_pull_requests(
                        api.as_ref(),
                        &organization,
                        &repository,
                        &creator,
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

async fn count_pull_requests(
    api: &dyn AzureDevOpsApi,
    organization: &str,
    repository: &GitRepository,
    creator: &str,
    settings: ScanSettings,
    range: DateRange,
    token: &str,
) -> Result<DayCounts> {
    let mut counts = DayCounts::new();
    let mut page = settings.first_page;

    for _ in 0..settings.max_pages {
        let pull_requests = api
            .pull_requests(organization, repository, creator, page, token)
            .await?;
        let len = pull_requests.len();

        for pull_request in &pull_requests {
            record(pull_request, range, &mut counts);
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
        "Stopped paging pull requests early"
    );
    Ok(counts)
}

fn record(pull_request: &PullRequest, range: DateRange, counts: &mut DayCounts) {
    if range.contains(pull_request.creation_date) {
        counts.increment(pull_request.creation_date.date_naive());
    }

    if pull_request.status != PullRequestStatus::Completed {
        return;
    }
    if let Some(closed) = pull_request.closed_date.filter(|at| range.contains(*at)) {
        counts.increment(closed.date_naive());
    }
}
