use crate::calendar::DateRange;
use crate::errors::ApiError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Aggregate counters GitHub keeps for one user and one time window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContributionsCollection {
    pub total_commits: u64,
    pub total_issues: u64,
    pub total_pull_requests: u64,
    pub total_reviews: u64,
    pub total_repositories: u64,
    pub restricted: u64,
    /// The contribution calendar, flattened from its weeks.
    pub days: Vec<(NaiveDate, u64)>,
}

/// What a lookup returned. GraphQL may answer with partial data and errors at once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContributionsLookup {
    /// `None` when the user does not exist or is not visible to the token.
    pub collection: Option<ContributionsCollection>,
    pub errors: Vec<String>,
}

#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn contributions(
        &self,
        login: &str,
        range: &DateRange,
        token: &str,
    ) -> Result<ContributionsLookup, ApiError>;
}
