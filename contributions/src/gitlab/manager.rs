use super::api::{EVENTS_PER_PAGE, GitLabApi, GitLabEvent};
use super::classify::classify;
use crate::calendar::{DateRange, YearCalendar};
use crate::errors::{ApiError, ContributionsError, Result};
use crate::manager::{CachedYear, ContributionsManager, ContributionsRequest, Platform, YearCache};
use crate::model::{ActivityKind, ContributionsResponse};
use crate::options::ContributionsOptions;
use async_trait::async_trait;
use shared::cache::Cache;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Kinds that always appear in the breakdown, zero or not.
const BREAKDOWN_KINDS: [ActivityKind; 5] = [
    ActivityKind::Commits,
    ActivityKind::PullRequests,
    ActivityKind::Issues,
    ActivityKind::Reviews,
    ActivityKind::WorkItems,
];

pub struct GitLabManager {
    years: YearCache,
    api: Arc<dyn GitLabApi>,
    max_pages: u32,
}

impl GitLabManager {
    pub fn new(api: Arc<dyn GitLabApi>, cache: Cache, options: &ContributionsOptions) -> Self {
        GitLabManager {
            years: YearCache::new(cache, options),
            api,
            max_pages: options.max_event_pages.max(1),
        }
    }

    async fn compute(
        &self,
        request: &ContributionsRequest,
        range: DateRange,
        cancel: &CancellationToken,
    ) -> Result<CachedYear> {
        let account = &request.account;
        let events = match self.events(&account.user, &range, &account.token, cancel).await {
            Ok(events) => events,
            Err(ContributionsError::Api(e)) => {
                tracing::warn!(error = %e, "GitLab events lookup failed");
                return Ok(CachedYear::Unresolved {
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        Ok(CachedYear::Resolved(build_year(range, &events)))
    }

    /// Every event page until a short page or the page limit.
    async fn events(
        &self,
        username: &str,
        range: &DateRange,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<GitLabEvent>> {
        let mut events = Vec::new();

        for page in 1..=self.max_pages {
            let batch: std::result::Result<Vec<GitLabEvent>, ApiError> = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ContributionsError::Cancelled),
                batch = self.api.events(username, range, page, token) => batch,
            };
            let batch = batch?;
            let len = batch.len();
            events.extend(batch);

            if len < EVENTS_PER_PAGE {
                return Ok(events);
            }
        }

        tracing::warn!(max_pages = self.max_pages, "Reached the event page limit");
        Ok(events)
    }
}

/// A user without events in the year gets a valid, empty year.
fn build_year(range: DateRange, events: &[GitLabEvent]) -> ContributionsResponse {
    let mut calendar = YearCalendar::new(range);
    let mut breakdown: BTreeMap<ActivityKind, u64> =
        BREAKDOWN_KINDS.iter().map(|kind| (*kind, 0)).collect();

    for event in events {
        let Some(at) = event.created_at.filter(|at| range.contains(*at)) else {
            continue;
        };
        let Some((kind, weight)) = classify(event) else {
            continue;
        };

        calendar.add(at.date_naive(), weight, Some(kind));
        if let Some(total) = breakdown.get_mut(&kind) {
            *total += weight;
        }
    }

    let total = calendar.total();
    let mut response = ContributionsResponse {
        contributions: calendar.into_contributions(),
        breakdown: Some(breakdown),
        ..Default::default()
    };
    response.total.insert(range.year_label(), total);
    response
}

#[async_trait]
impl ContributionsManager for GitLabManager {
    fn platform(&self) -> Platform {
        Platform::GitLab
    }

    async fn get_contributions(
        &self,
        request: &ContributionsRequest,
        cancel: &CancellationToken,
    ) -> Result<ContributionsResponse> {
        self.years
            .respond(Platform::GitLab, request, |range| {
                self.compute(request, range, cancel)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::api::PushData;
    use crate::manager::ProviderAccount;
    use crate::testutils::{FakeGitLab, utc};

    fn request() -> ContributionsRequest {
        ContributionsRequest {
            account: ProviderAccount {
                user: "jane.doe".into(),
                organization: None,
                token: "glpat".into(),
            },
            year: 2024,
            include_breakdown: true,
            include_activity: true,
        }
    }

    fn event(action: &str, target: Option<&str>, at: &str) -> GitLabEvent {
        GitLabEvent {
            action_name: Some(action.into()),
            target_type: target.map(Into::into),
            created_at: Some(utc(at)),
            ..Default::default()
        }
    }

    fn manager(fake: Arc<FakeGitLab>, max_event_pages: u32) -> GitLabManager {
        let options = ContributionsOptions {
            max_event_pages,
            ..Default::default()
        };
        GitLabManager::new(fake, Cache::in_memory(10), &options)
    }

    #[tokio::test]
    async fn test_events_are_classified() {
        let mut push = event("pushed to", None, "2024-05-01T10:00:00Z");
        push.push_data = Some(PushData { commit_count: 3 });
        let fake = Arc::new(FakeGitLab::with_events(vec![
            push,
            event("opened", Some("MergeRequest"), "2024-05-01T12:00:00Z"),
            event("commented on", Some("Issue"), "2024-05-02T12:00:00Z"),
            event("joined", None, "2024-05-02T12:00:00Z"),
            event("opened", Some("Issue"), "2023-12-31T23:00:00Z"),
        ]));

        let response = manager(fake, 100)
            .get_contributions(&request(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.year_total(2024), 5);
        let breakdown = response.breakdown.unwrap();
        assert_eq!(breakdown.len(), 5);
        assert_eq!(breakdown[&ActivityKind::Commits], 3);
        assert_eq!(breakdown[&ActivityKind::PullRequests], 1);
        assert_eq!(breakdown[&ActivityKind::Issues], 0);

        let may_first = response
            .contributions
            .iter()
            .find(|c| c.date == "2024-05-01".parse().unwrap())
            .unwrap();
        assert_eq!(may_first.count, 4);
        let may_second = response
            .contributions
            .iter()
            .find(|c| c.date == "2024-05-02".parse().unwrap())
            .unwrap();
        assert_eq!(may_second.activity.as_ref().unwrap()[&ActivityKind::All], 1);
    }

    #[tokio::test]
    async fn test_no_events_is_an_empty_year() {
        let fake = Arc::new(FakeGitLab::with_events(vec![]));

        let response = manager(fake, 100)
            .get_contributions(&request(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(response.meta.errors.is_empty());
        assert_eq!(response.year_total(2024), 0);
        assert_eq!(response.contributions.len(), 366);
        assert!(response.breakdown.unwrap().values().all(|v| *v == 0));
    }

    #[tokio::test]
    async fn test_paging_stops_at_short_page_and_limit() {
        let many: Vec<_> = (0..250)
            .map(|_| event("opened", Some("Issue"), "2024-08-08T08:00:00Z"))
            .collect();

        let fake = Arc::new(FakeGitLab::with_events(many.clone()));
        let response = manager(fake.clone(), 100)
            .get_contributions(&request(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.year_total(2024), 250);
        assert_eq!(fake.calls(), 3);

        let fake = Arc::new(FakeGitLab::with_events(many));
        let response = manager(fake.clone(), 2)
            .get_contributions(&request(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.year_total(2024), 200);
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let fake = Arc::new(FakeGitLab::failing(|| {
            ApiError::Status(reqwest::StatusCode::UNAUTHORIZED)
        }));

        let response = manager(fake, 100)
            .get_contributions(&request(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.meta.errors, vec!["HTTP 401 Unauthorized"]);
        assert_eq!(response.year_total(2024), 0);
    }
}
