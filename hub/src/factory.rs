use crate::metrics_defs::HUB_PROVIDER_FAILURE;
use crate::user_data::UserData;
use contributions::{ContributionsManager, ContributionsRequest, ContributionsResponse, Platform};
use serde::Serialize;
use shared::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What to ask every provider for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct YearQuery {
    pub year: i32,
    pub include_breakdown: bool,
    pub include_activity: bool,
}

/// The outcome of one provider call. Failures carry a message instead of data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderContribution {
    pub provider: String,
    pub is_successful: bool,
    pub error_message: Option<String>,
    pub data: Option<ContributionsResponse>,
}

impl ProviderContribution {
    pub fn success(provider: impl Into<String>, data: ContributionsResponse) -> Self {
        ProviderContribution {
            provider: provider.into(),
            is_successful: true,
            error_message: None,
            data: Some(data),
        }
    }

    pub fn failure(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderContribution {
            provider: provider.into(),
            is_successful: false,
            error_message: Some(message.into()),
            data: None,
        }
    }
}

/// Maps provider names to the manager of each platform.
pub struct ContributionProviderFactory {
    azure_devops: Arc<dyn ContributionsManager>,
    github: Arc<dyn ContributionsManager>,
    gitlab: Arc<dyn ContributionsManager>,
    timeout: Duration,
}

impl ContributionProviderFactory {
    pub fn new(
        azure_devops: Arc<dyn ContributionsManager>,
        github: Arc<dyn ContributionsManager>,
        gitlab: Arc<dyn ContributionsManager>,
        timeout: Duration,
    ) -> Self {
        ContributionProviderFactory {
            azure_devops,
            github,
            gitlab,
            timeout,
        }
    }

    pub fn supported_providers(&self) -> Vec<String> {
        Platform::ALL.iter().map(|p| p.as_str().to_string()).collect()
    }

    pub fn manager(&self, platform: Platform) -> &Arc<dyn ContributionsManager> {
        match platform {
            Platform::AzureDevOps => &self.azure_devops,
            Platform::GitHub => &self.github,
            Platform::GitLab => &self.gitlab,
        }
    }

    /// Asks one provider for the year. Never fails: every problem becomes a failed
    /// [`ProviderContribution`].
    pub async fn get_contributions(
        &self,
        provider: &str,
        user: &UserData,
        query: YearQuery,
        cancel: &CancellationToken,
    ) -> ProviderContribution {
        let contribution = self.call(provider, user, query, cancel).await;

        if let Some(message) = &contribution.error_message {
            tracing::warn!(provider, user_id = %user.id, error = %message, "Provider call failed");
            counter!(HUB_PROVIDER_FAILURE, "provider" => provider.to_string()).increment(1);
        }
        contribution
    }

    async fn call(
        &self,
        provider: &str,
        user: &UserData,
        query: YearQuery,
        cancel: &CancellationToken,
    ) -> ProviderContribution {
        let Ok(platform) = provider.parse::<Platform>() else {
            return ProviderContribution::failure(provider, "Unknown provider");
        };
        let Some(account) = user.account(platform) else {
            return ProviderContribution::failure(
                provider,
                format!("Provider '{provider}' not found in user data"),
            );
        };
        if account.token.trim().is_empty() {
            return ProviderContribution::failure(
                provider,
                format!("Missing token for provider '{provider}'"),
            );
        }

        let request = ContributionsRequest {
            account,
            year: query.year,
            include_breakdown: query.include_breakdown,
            include_activity: query.include_activity,
        };

        let child = cancel.child_token();
        let result = tokio::time::timeout(
            self.timeout,
            self.manager(platform).get_contributions(&request, &child),
        )
        .await;

        match result {
            Ok(Ok(response)) => ProviderContribution::success(provider, response),
            Ok(Err(e)) => ProviderContribution::failure(provider, e.to_string()),
            Err(_) => {
                child.cancel();
                ProviderContribution::failure(
                    provider,
                    format!("Timed out after {:?}", self.timeout),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{FakeManager, full_profile, response_with};
    use crate::user_data::Secret;
    use contributions::ContributionsError;

    struct Fakes {
        azure: Arc<FakeManager>,
        github: Arc<FakeManager>,
        gitlab: Arc<FakeManager>,
    }

    impl Fakes {
        fn factory(&self, timeout: Duration) -> ContributionProviderFactory {
            ContributionProviderFactory::new(
                self.azure.clone(),
                self.github.clone(),
                self.gitlab.clone(),
                timeout,
            )
        }
    }

    fn fakes() -> Fakes {
        Fakes {
            azure: Arc::new(FakeManager::returning(
                Platform::AzureDevOps,
                response_with(&[("2024-01-01", 1)]),
            )),
            github: Arc::new(FakeManager::returning(
                Platform::GitHub,
                response_with(&[("2024-01-02", 2)]),
            )),
            gitlab: Arc::new(FakeManager::hanging(Platform::GitLab)),
        }
    }

    const QUERY: YearQuery = YearQuery {
        year: 2024,
        include_breakdown: true,
        include_activity: false,
    };

    #[tokio::test]
    async fn test_dispatch_by_platform() {
        let fakes = fakes();
        let factory = fakes.factory(Duration::from_secs(5));
        let cancel = CancellationToken::new();

        let github = factory
            .get_contributions("GitHub", &full_profile(), QUERY, &cancel)
            .await;
        assert!(github.is_successful);
        assert_eq!(github.provider, "GitHub");
        assert_eq!(github.data.unwrap().contributions[0].count, 2);
        assert_eq!(fakes.github.calls(), 1);
        assert_eq!(fakes.azure.calls(), 0);

        let request = fakes.github.last_request().unwrap();
        assert_eq!(request.account.user, "janedoe");
        assert_eq!(request.account.token, "github-pat");
        assert_eq!(request.year, 2024);
        assert!(request.include_breakdown);
        assert!(!request.include_activity);

        for platform in Platform::ALL {
            assert_eq!(factory.manager(platform).platform(), platform);
        }
        assert_eq!(factory.supported_providers(), vec!["azure", "github", "gitlab"]);
    }

    #[tokio::test]
    async fn test_profile_problems_are_failures() {
        let fakes = fakes();
        let factory = fakes.factory(Duration::from_secs(5));
        let cancel = CancellationToken::new();

        let unknown = factory
            .get_contributions("bitbucket", &full_profile(), QUERY, &cancel)
            .await;
        assert!(!unknown.is_successful);
        assert_eq!(unknown.error_message.as_deref(), Some("Unknown provider"));
        assert!(unknown.data.is_none());

        let mut user = full_profile();
        user.azure = None;
        let missing = factory.get_contributions("azure", &user, QUERY, &cancel).await;
        assert_eq!(
            missing.error_message.as_deref(),
            Some("Provider 'azure' not found in user data")
        );

        let mut user = full_profile();
        if let Some(github) = user.github.as_mut() {
            github.token = Secret::new("  ");
        }
        let no_token = factory.get_contributions("github", &user, QUERY, &cancel).await;
        assert_eq!(
            no_token.error_message.as_deref(),
            Some("Missing token for provider 'github'")
        );

        assert_eq!(fakes.azure.calls(), 0);
        assert_eq!(fakes.github.calls(), 0);
    }

    #[tokio::test]
    async fn test_manager_error_is_a_failure() {
        let mut fakes = fakes();
        fakes.azure = Arc::new(FakeManager::failing(Platform::AzureDevOps, || {
            ContributionsError::InvalidYear(0)
        }));
        let factory = fakes.factory(Duration::from_secs(5));

        let result = factory
            .get_contributions("azure", &full_profile(), QUERY, &CancellationToken::new())
            .await;
        assert!(!result.is_successful);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Invalid year 0, expected 1970..=9999")
        );
    }

    #[tokio::test]
    async fn test_timeout_cancels_provider_work() {
        let fakes = fakes();
        let factory = fakes.factory(Duration::from_millis(50));
        let cancel = CancellationToken::new();

        let result = factory
            .get_contributions("gitlab", &full_profile(), QUERY, &cancel)
            .await;
        assert!(!result.is_successful);
        assert_eq!(result.error_message.as_deref(), Some("Timed out after 50ms"));

        assert!(fakes.gitlab.last_cancel().unwrap().is_cancelled());
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn test_json_shape() {
        let value =
            serde_json::to_value(ProviderContribution::failure("github", "HTTP 401 Unauthorized"))
                .unwrap();
        assert_eq!(value["provider"], "github");
        assert_eq!(value["isSuccessful"], false);
        assert_eq!(value["errorMessage"], "HTTP 401 Unauthorized");
        assert!(value["data"].is_null());
    }
}
