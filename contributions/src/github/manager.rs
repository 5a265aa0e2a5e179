use super::api::{ContributionsCollection, GitHubApi};
use crate::calendar::{DateRange, YearCalendar};
use crate::errors::{ContributionsError, Result};
use crate::manager::{CachedYear, ContributionsManager, ContributionsRequest, Platform, YearCache};
use crate::model::{ActivityKind, ContributionsResponse};
use crate::options::ContributionsOptions;
use async_trait::async_trait;
use shared::cache::Cache;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// GitHub answers the whole year in one GraphQL call, so there is nothing to fan out.
pub struct GitHubManager {
    years: YearCache,
    api: Arc<dyn GitHubApi>,
}

impl GitHubManager {
    pub fn new(api: Arc<dyn GitHubApi>, cache: Cache, options: &ContributionsOptions) -> Self {
        GitHubManager {
            years: YearCache::new(cache, options),
            api,
        }
    }

    async fn compute(
        &self,
        request: &ContributionsRequest,
        range: DateRange,
        cancel: &CancellationToken,
    ) -> Result<CachedYear> {
        let account = &request.account;
        let lookup = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ContributionsError::Cancelled),
            lookup = self.api.contributions(&account.user, &range, &account.token) => lookup,
        };

        let lookup = match lookup {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::warn!(error = %e, "GitHub contributions lookup failed");
                return Ok(CachedYear::Unresolved {
                    error: e.to_string(),
                });
            }
        };

        let Some(collection) = lookup.collection else {
            let error = if lookup.errors.is_empty() {
                format!("Could not resolve user or contributions for {}", account.user)
            } else {
                lookup.errors.join("; ")
            };
            return Ok(CachedYear::Unresolved { error });
        };

        let mut response = build_year(range, &collection);
        response.meta.errors = lookup.errors;
        Ok(CachedYear::Resolved(response))
    }
}

/// The calendar only knows daily totals; those are recorded as [`ActivityKind::All`].
/// The breakdown comes from GitHub's own counters.
fn build_year(range: DateRange, collection: &ContributionsCollection) -> ContributionsResponse {
    let mut calendar = YearCalendar::new(range);
    for (date, count) in &collection.days {
        calendar.add(*date, *count, Some(ActivityKind::All));
    }

    let breakdown = BTreeMap::from([
        (ActivityKind::Commits, collection.total_commits),
        (ActivityKind::Issues, collection.total_issues),
        (ActivityKind::PullRequests, collection.total_pull_requests),
        (ActivityKind::Reviews, collection.total_reviews),
        (ActivityKind::Restricted, collection.restricted),
    ]);

    let total = calendar.total();
    let mut response = ContributionsResponse {
        contributions: calendar.into_contributions(),
        breakdown: Some(breakdown),
        ..Default::default()
    };
    response.total.insert(range.year_label(), total);
    response.meta.scanned_repos = collection.total_repositories;
    response
}

#[async_trait]
impl ContributionsManager for GitHubManager {
    fn platform(&self) -> Platform {
        Platform::GitHub
    }

    async fn get_contributions(
        &self,
        request: &ContributionsRequest,
        cancel: &CancellationToken,
    ) -> Result<ContributionsResponse> {
        self.years
            .respond(Platform::GitHub, request, |range| {
                self.compute(request, range, cancel)
            })
            .await
    }
}
