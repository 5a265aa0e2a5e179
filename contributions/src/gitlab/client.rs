use super::api::{EVENTS_PER_PAGE, GitLabApi, GitLabEvent};
use crate::calendar::DateRange;
use crate::errors::ApiError;
use crate::http;
use async_trait::async_trait;
use chrono::Days;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

const EVENTS_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct GitLabConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        GitLabConfig {
            base_url: "https://gitlab.com/api/v4".into(),
            timeout_secs: 30,
        }
    }
}

/// REST client for the user events feed.
pub struct GitLabClient {
    client: reqwest::Client,
    base_url: Url,
}

impl GitLabClient {
    pub fn new(config: &GitLabConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Decode(format!("invalid base url {}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Decode(format!("invalid base url {}", config.base_url)));
        }

        Ok(GitLabClient {
            client: http::build_client(Duration::from_secs(config.timeout_secs), "contributions")?,
            base_url,
        })
    }

    fn events_url(&self, username: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["users", username, "events"]);
        }
        url
    }
}

#[async_trait]
impl GitLabApi for GitLabClient {
    async fn events(
        &self,
        username: &str,
        range: &DateRange,
        page: u32,
        token: &str,
    ) -> Result<Vec<GitLabEvent>, ApiError> {
        if token.trim().is_empty() {
            return Err(ApiError::MissingToken);
        }

        // `after` and `before` are exclusive
        let after = range.from.date_naive() - Days::new(1);
        let before = range.to.date_naive() + Days::new(1);

        let request = self
            .client
            .get(self.events_url(username))
            .header("PRIVATE-TOKEN", token)
            .query(&[
                ("after", after.format(EVENTS_DATE_FORMAT).to_string()),
                ("before", before.format(EVENTS_DATE_FORMAT).to_string()),
                ("per_page", EVENTS_PER_PAGE.to_string()),
                ("page", page.to_string()),
                ("sort", "asc".to_string()),
            ]);

        http::send(request)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}
