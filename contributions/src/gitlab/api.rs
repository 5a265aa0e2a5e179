use crate::calendar::DateRange;
use crate::errors::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Largest page the events endpoint serves.
pub const EVENTS_PER_PAGE: usize = 100;

/// One entry of a user's activity feed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct GitLabEvent {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub push_data: Option<PushData>,
    #[serde(default)]
    pub note: Option<Note>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PushData {
    #[serde(default)]
    pub commit_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub noteable_type: Option<String>,
}

#[async_trait]
pub trait GitLabApi: Send + Sync {
    /// One page (1-based) of the user's events around `range`, oldest first.
    async fn events(
        &self,
        username: &str,
        range: &DateRange,
        page: u32,
        token: &str,
    ) -> Result<Vec<GitLabEvent>, ApiError>;
}
