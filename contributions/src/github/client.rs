use super::api::{ContributionsCollection, ContributionsLookup, GitHubApi};
use crate::calendar::DateRange;
use crate::errors::ApiError;
use crate::http;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const GRAPHQL_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const CONTRIBUTIONS_QUERY: &str = r#"
query($login: String!, $from: DateTime!, $to: DateTime!) {
  user(login: $login) {
    login
    contributionsCollection(from: $from, to: $to) {
      totalCommitContributions
      totalIssueContributions
      totalPullRequestContributions
      totalPullRequestReviewContributions
      totalRepositoryContributions
      restrictedContributionsCount
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            date
            contributionCount
          }
        }
      }
    }
  }
}
"#;

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct GitHubConfig {
    pub graphql_url: String,
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            graphql_url: "https://api.github.com/graphql".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<UserData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: Option<String>,
    path: Option<Vec<Value>>,
}

impl GraphQlError {
    fn describe(&self) -> Option<String> {
        let message = self.message.as_deref().filter(|m| !m.trim().is_empty())?;
        let Some(path) = &self.path else {
            return Some(message.to_string());
        };
        let path: Vec<String> = path
            .iter()
            .map(|segment| match segment {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        Some(format!("{}: {message}", path.join(".")))
    }
}

#[derive(Deserialize)]
struct UserData {
    user: Option<User>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    contributions_collection: Option<Collection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Collection {
    total_commit_contributions: u64,
    total_issue_contributions: u64,
    total_pull_request_contributions: u64,
    total_pull_request_review_contributions: u64,
    total_repository_contributions: u64,
    restricted_contributions_count: u64,
    contribution_calendar: Option<Calendar>,
}

#[derive(Deserialize)]
struct Calendar {
    #[serde(default)]
    weeks: Vec<Week>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Week {
    #[serde(default)]
    contribution_days: Vec<Day>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Day {
    date: NaiveDate,
    contribution_count: u64,
}

impl From<Collection> for ContributionsCollection {
    fn from(c: Collection) -> Self {
        let days = c
            .contribution_calendar
            .into_iter()
            .flat_map(|calendar| calendar.weeks)
            .flat_map(|week| week.contribution_days)
            .map(|day| (day.date, day.contribution_count))
            .collect();

        ContributionsCollection {
            total_commits: c.total_commit_contributions,
            total_issues: c.total_issue_contributions,
            total_pull_requests: c.total_pull_request_contributions,
            total_reviews: c.total_pull_request_review_contributions,
            total_repositories: c.total_repository_contributions,
            restricted: c.restricted_contributions_count,
            days,
        }
    }
}

/// GraphQL client for the GitHub contributions collection.
pub struct GitHubClient {
    client: reqwest::Client,
    graphql_url: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, ApiError> {
        Ok(GitHubClient {
            // GitHub rejects requests without a user agent
            client: http::build_client(Duration::from_secs(config.timeout_secs), "contributions")?,
            graphql_url: config.graphql_url.clone(),
        })
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn contributions(
        &self,
        login: &str,
        range: &DateRange,
        token: &str,
    ) -> Result<ContributionsLookup, ApiError> {
        if token.trim().is_empty() {
            return Err(ApiError::MissingToken);
        }

        let body = json!({
            "query": CONTRIBUTIONS_QUERY,
            "variables": {
                "login": login,
                "from": range.from.format(GRAPHQL_DATE_FORMAT).to_string(),
                "to": range.to.format(GRAPHQL_DATE_FORMAT).to_string(),
            }
        });
        let request = self
            .client
            .post(&self.graphql_url)
            .bearer_auth(token)
            .json(&body);

        let response: GraphQlResponse = http::send(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        let errors: Vec<String> = response
            .errors
            .iter()
            .filter_map(GraphQlError::describe)
            .collect();
        if !errors.is_empty() {
            tracing::warn!(errors = %errors.join(";"), "GraphQL returned errors");
        }

        let collection = response
            .data
            .and_then(|data| data.user)
            .and_then(|user| user.contributions_collection)
            .map(ContributionsCollection::from);

        Ok(ContributionsLookup { collection, errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&GitHubConfig {
            graphql_url: format!("{}/graphql", server.uri()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_contributions() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer ghp_token"))
            .and(body_partial_json(json!({
                "variables": {
                    "login": "octocat",
                    "from": "2024-01-01T00:00:00Z",
                    "to": "2024-12-31T23:59:59Z"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "user": {
                        "login": "octocat",
                        "contributionsCollection": {
                            "totalCommitContributions": 5,
                            "totalIssueContributions": 1,
                            "totalPullRequestContributions": 2,
                            "totalPullRequestReviewContributions": 3,
                            "totalRepositoryContributions": 4,
                            "restrictedContributionsCount": 0,
                            "contributionCalendar": {
                                "totalContributions": 11,
                                "weeks": [
                                    { "contributionDays": [
                                        { "date": "2024-01-01", "contributionCount": 4 },
                                        { "date": "2024-01-02", "contributionCount": 0 }
                                    ]},
                                    { "contributionDays": [
                                        { "date": "2024-01-08", "contributionCount": 7 }
                                    ]}
                                ]
                            }
                        }
                    }
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let lookup = client(&mock_server)
            .contributions("octocat", &DateRange::year(2024).unwrap(), "ghp_token")
            .await
            .unwrap();

        assert!(lookup.errors.is_empty());
        let collection = lookup.collection.unwrap();
        assert_eq!(collection.total_commits, 5);
        assert_eq!(collection.total_reviews, 3);
        assert_eq!(collection.total_repositories, 4);
        assert_eq!(collection.days.len(), 3);
        assert_eq!(collection.days[2], ("2024-01-08".parse().unwrap(), 7));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "user": null },
                "errors": [
                    {
                        "type": "NOT_FOUND",
                        "path": ["user"],
                        "message": "Could not resolve to a User with the login of 'ghost'."
                    },
                    { "message": "" }
                ]
            })))
            .mount(&mock_server)
            .await;

        let lookup = client(&mock_server)
            .contributions("ghost", &DateRange::year(2024).unwrap(), "ghp_token")
            .await
            .unwrap();

        assert!(lookup.collection.is_none());
        assert_eq!(
            lookup.errors,
            vec!["user: Could not resolve to a User with the login of 'ghost'."]
        );
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .contributions("octocat", &DateRange::year(2024).unwrap(), " ")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing PAT");
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server)
            .contributions("octocat", &DateRange::year(2024).unwrap(), "expired")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 401 Unauthorized");
    }
}
