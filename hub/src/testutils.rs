//! Scripted managers for tests.
use crate::user_data::{AzureProfile, GitHubProfile, GitLabProfile, Secret, UserData};
use async_trait::async_trait;
use contributions::calendar::DateRange;
use contributions::manager::unresolved_response;
use contributions::{
    ContributionsError, ContributionsManager, ContributionsRequest, ContributionsResponse,
    Platform,
};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

enum Script {
    Respond(ContributionsResponse),
    Fail(fn() -> ContributionsError),
    Unresolved(&'static str),
    Hang,
}

pub struct FakeManager {
    platform: Platform,
    script: Script,
    calls: AtomicUsize,
    last_request: Mutex<Option<ContributionsRequest>>,
    last_cancel: Mutex<Option<CancellationToken>>,
}

impl FakeManager {
    fn new(platform: Platform, script: Script) -> Self {
        FakeManager {
            platform,
            script,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            last_cancel: Mutex::new(None),
        }
    }

    pub fn returning(platform: Platform, response: ContributionsResponse) -> Self {
        Self::new(platform, Script::Respond(response))
    }

    pub fn failing(platform: Platform, error: fn() -> ContributionsError) -> Self {
        Self::new(platform, Script::Fail(error))
    }

    /// Answers with the zero-filled year a manager gives for an unknown user.
    pub fn unresolved(platform: Platform, error: &'static str) -> Self {
        Self::new(platform, Script::Unresolved(error))
    }

    /// Never answers until cancelled.
    pub fn hanging(platform: Platform) -> Self {
        Self::new(platform, Script::Hang)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ContributionsRequest> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn last_cancel(&self) -> Option<CancellationToken> {
        self.last_cancel.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContributionsManager for FakeManager {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn get_contributions(
        &self,
        request: &ContributionsRequest,
        cancel: &CancellationToken,
    ) -> contributions::Result<ContributionsResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        *self.last_cancel.lock().unwrap() = Some(cancel.clone());

        match &self.script {
            Script::Respond(response) => Ok(response
                .filtered(request.include_breakdown, request.include_activity)),
            Script::Fail(error) => Err(error()),
            Script::Unresolved(error) => {
                let range = DateRange::year(request.year)?;
                Ok(unresolved_response(range, error.to_string()))
            }
            Script::Hang => {
                cancel.cancelled().await;
                Err(ContributionsError::Cancelled)
            }
        }
    }
}

/// A response holding only the given days, as `yyyy-mm-dd` to count.
pub fn response_with(days: &[(&str, u64)]) -> ContributionsResponse {
    let mut response = ContributionsResponse::default();
    let mut total = 0;
    for (date, count) in days {
        response.contributions.push(contributions::Contribution {
            date: date.parse().unwrap(),
            count: *count,
            activity: None,
        });
        total += count;
    }
    response.total = BTreeMap::from([("2024".to_string(), total)]);
    response
}

/// A profile with every platform configured.
pub fn full_profile() -> UserData {
    UserData {
        id: "jane".into(),
        azure: Some(AzureProfile {
            email: "jane@example.com".into(),
            organization: "acme".into(),
            token: Secret::new("azure-pat"),
        }),
        github: Some(GitHubProfile {
            username: "janedoe".into(),
            token: Secret::new("github-pat"),
        }),
        gitlab: Some(GitLabProfile {
            username: "jane.doe".into(),
            token: Secret::new("gitlab-pat"),
        }),
    }
}
