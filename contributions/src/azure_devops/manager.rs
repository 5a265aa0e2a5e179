use super::api::AzureDevOpsApi;
use super::{
    AzureDevOpsRepository, AzureUser, CommitsStrategy, PullRequestsStrategy, ScanSettings,
    WorkItemsStrategy,
};
use crate::calendar::DateRange;
use crate::errors::{ContributionsError, Result};
use crate::manager::{CachedYear, ContributionsManager, ContributionsRequest, Platform, YearCache};
use crate::model::ContributionsResponse;
use crate::options::ContributionsOptions;
use crate::strategy::{ContributionStrategy, assemble_year, run_strategies};
use async_trait::async_trait;
use shared::cache::Cache;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AzureDevOpsManager {
    years: YearCache,
    repository: Arc<AzureDevOpsRepository>,
    strategies: Vec<Arc<dyn ContributionStrategy<AzureUser>>>,
}

impl AzureDevOpsManager {
    pub fn new(api: Arc<dyn AzureDevOpsApi>, cache: Cache, options: &ContributionsOptions) -> Self {
        let years = YearCache::new(cache.clone(), options);
        let repository = Arc::new(AzureDevOpsRepository::new(
            api,
            cache,
            years.keys().clone(),
            options,
        ));
        let settings = ScanSettings::from_options(options);
        let strategies: Vec<Arc<dyn ContributionStrategy<AzureUser>>> = vec![
            Arc::new(CommitsStrategy::new(repository.clone(), settings)),
            Arc::new(PullRequestsStrategy::new(repository.clone(), settings)),
            Arc::new(WorkItemsStrategy::new(repository.clone(), settings)),
        ];

        Self::from_parts(years, repository, strategies)
    }

    pub fn from_parts(
        years: YearCache,
        repository: Arc<AzureDevOpsRepository>,
        strategies: Vec<Arc<dyn ContributionStrategy<AzureUser>>>,
    ) -> Self {
        AzureDevOpsManager {
            years,
            repository,
            strategies,
        }
    }

    async fn compute(
        &self,
        request: &ContributionsRequest,
        range: DateRange,
        cancel: &CancellationToken,
    ) -> Result<CachedYear> {
        let account = &request.account;
        let Some(organization) = account
            .organization
            .as_deref()
            .map(str::trim)
            .filter(|org| !org.is_empty())
        else {
            return Ok(CachedYear::Unresolved {
                error: "Missing organization".into(),
            });
        };
        if account.token.is_empty() {
            return Ok(CachedYear::Unresolved {
                error: "Missing PAT".into(),
            });
        }

        let identity = match self
            .repository
            .identity(organization, &account.user, &account.token)
            .await
        {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                return Ok(CachedYear::Unresolved {
                    error: format!(
                        "Could not resolve identity for {} in {organization}",
                        account.user
                    ),
                });
            }
            Err(ContributionsError::Api(e)) => {
                tracing::warn!(organization, error = %e, "Identity lookup failed");
                return Ok(CachedYear::Unresolved {
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let user = Arc::new(AzureUser {
            organization: organization.to_string(),
            identity,
        });

        let (scanned_projects, scanned_repos) = match self.scope(&user, &account.token).await {
            Ok(scope) => scope,
            Err(ContributionsError::Api(e)) => {
                tracing::warn!(
                    organization,
                    error = %e,
                    "Could not count projects and repositories"
                );
                (0, 0)
            }
            Err(e) => return Err(e),
        };

        let outcome = run_strategies(&self.strategies, user, account, range, cancel).await?;

        let mut response: ContributionsResponse = assemble_year(range, &outcome.per_kind, true);
        response.meta.scanned_projects = scanned_projects;
        response.meta.scanned_repos = scanned_repos;
        response.meta.errors = outcome.errors;

        Ok(CachedYear::Resolved(response))
    }

    /// Number of projects, and of repositories over all projects.
    async fn scope(&self, user: &AzureUser, token: &str) -> Result<(u64, u64)> {
        let projects = self.repository.projects(&user.organization, token).await?;
        let mut repos = 0;
        for project in &projects {
            repos += self
                .repository
                .repositories_of(&user.organization, project, token)
                .await?
                .len() as u64;
        }
        Ok((projects.len() as u64, repos))
    }
}

#[async_trait]
impl ContributionsManager for AzureDevOpsManager {
    fn platform(&self) -> Platform {
        Platform::AzureDevOps
    }

    async fn get_contributions(
        &self,
        request: &ContributionsRequest,
        cancel: &CancellationToken,
    ) -> Result<ContributionsResponse> {
        self.years
            .respond(Platform::AzureDevOps, request, |range| {
                self.compute(request, range, cancel)
            })
            .await
    }
}
