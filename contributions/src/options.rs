use crate::errors::{ContributionsError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Tuning knobs shared by every platform integration.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct ContributionsOptions {
    /// Scanning units fetched in parallel within one strategy invocation.
    pub max_concurrency: usize,
    pub contributions_cache_minutes: u64,
    pub projects_cache_minutes: u64,
    pub identity_cache_minutes: u64,
    pub repo_cache_minutes: u64,
    /// Page size for paged listings.
    pub default_top: u32,
    pub default_skip: u32,
    pub work_item_batch_size: usize,
    /// Commit and pull request pages fetched per repository.
    pub max_scan_pages: u32,
    pub max_event_pages: u32,
    /// Cache "identity not found" years like any other result.
    pub cache_unresolved_identities: bool,
    pub cache_key_salt: String,
}

impl Default for ContributionsOptions {
    fn default() -> Self {
        ContributionsOptions {
            max_concurrency: 8,
            contributions_cache_minutes: 1440,
            projects_cache_minutes: 15,
            identity_cache_minutes: 60,
            repo_cache_minutes: 15,
            default_top: 2000,
            default_skip: 0,
            work_item_batch_size: 200,
            max_scan_pages: 100,
            max_event_pages: 100,
            cache_unresolved_identities: false,
            cache_key_salt: "contributions".into(),
        }
    }
}

impl ContributionsOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(ContributionsError::InvalidOptions(
                "max_concurrency cannot be 0".into(),
            ));
        }
        if self.default_top == 0 {
            return Err(ContributionsError::InvalidOptions(
                "default_top cannot be 0".into(),
            ));
        }
        if self.work_item_batch_size == 0 {
            return Err(ContributionsError::InvalidOptions(
                "work_item_batch_size cannot be 0".into(),
            ));
        }
        Ok(())
    }

    pub fn contributions_ttl(&self) -> Duration {
        minutes(self.contributions_cache_minutes)
    }

    pub fn projects_ttl(&self) -> Duration {
        minutes(self.projects_cache_minutes)
    }

    pub fn identity_ttl(&self) -> Duration {
        minutes(self.identity_cache_minutes)
    }

    pub fn repo_ttl(&self) -> Duration {
        minutes(self.repo_cache_minutes)
    }
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}
