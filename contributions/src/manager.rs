//! The per-platform entry point and the cache-aside logic every platform shares.
//!
//! A manager computes the *full* year (breakdown and per-day activity included) once,
//! stores it under a hashed key, and hands each caller a filtered copy. The cached
//! value is never mutated after it is written.

use crate::calendar::{DateRange, YearCalendar};
use crate::errors::{ContributionsError, Result};
use crate::metrics_defs::{MANAGER_DURATION, MANAGER_UNRESOLVED};
use crate::model::ContributionsResponse;
use crate::options::ContributionsOptions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::cache::Cache;
use shared::cache_key::CacheKeyHasher;
use shared::{counter, histogram};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "azure")]
    AzureDevOps,
    #[serde(rename = "github")]
    GitHub,
    #[serde(rename = "gitlab")]
    GitLab,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::AzureDevOps, Platform::GitHub, Platform::GitLab];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Platform::AzureDevOps => "azure",
            Platform::GitHub => "github",
            Platform::GitLab => "gitlab",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("Unknown provider")]
pub struct UnknownPlatform;

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(UnknownPlatform)
    }
}

/// Who to look up and with which credential.
///
/// `user` is an email address on Azure DevOps and a username elsewhere.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderAccount {
    pub user: String,
    pub organization: Option<String>,
    pub token: String,
}

impl fmt::Debug for ProviderAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAccount")
            .field("user", &self.user)
            .field("organization", &self.organization)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContributionsRequest {
    pub account: ProviderAccount,
    pub year: i32,
    pub include_breakdown: bool,
    pub include_activity: bool,
}

#[async_trait]
pub trait ContributionsManager: Send + Sync {
    fn platform(&self) -> Platform;

    /// One year of contributions for one account.
    ///
    /// Partial failures are reported in `meta.errors`. Only cache failures,
    /// invalid years and cancellation are returned as `Err`.
    async fn get_contributions(
        &self,
        request: &ContributionsRequest,
        cancel: &CancellationToken,
    ) -> Result<ContributionsResponse>;
}

/// What is stored under a contributions key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum CachedYear {
    Resolved(ContributionsResponse),
    /// The user could not be found on the platform. Kept apart from an empty year.
    Unresolved { error: String },
}

/// Cache-aside wrapper for full-year responses.
#[derive(Clone, Debug)]
pub struct YearCache {
    cache: Cache,
    keys: CacheKeyHasher,
    ttl: Duration,
    cache_unresolved: bool,
}

impl YearCache {
    pub fn new(cache: Cache, options: &ContributionsOptions) -> Self {
        YearCache {
            cache,
            keys: CacheKeyHasher::new(options.cache_key_salt.clone()),
            ttl: options.contributions_ttl(),
            cache_unresolved: options.cache_unresolved_identities,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn keys(&self) -> &CacheKeyHasher {
        &self.keys
    }

    pub fn key(&self, platform: Platform, account: &ProviderAccount, year: i32) -> String {
        self.keys.contributions_key(
            platform.as_str(),
            &account.user,
            account.organization.as_deref(),
            year,
            &account.token,
        )
    }

    /// Serves the request from the cached full year, computing and storing it on a miss.
    pub async fn respond<F, Fut>(
        &self,
        platform: Platform,
        request: &ContributionsRequest,
        compute: F,
    ) -> Result<ContributionsResponse>
    where
        F: FnOnce(DateRange) -> Fut,
        Fut: Future<Output = Result<CachedYear>>,
    {
        let started = Instant::now();
        let range = DateRange::year(request.year)?;
        let key = self.key(platform, &request.account, request.year);
        let cache_unresolved = self.cache_unresolved;

        // Unresolved years that must not be cached are handed out through here.
        let mut uncached = None;
        let result = self
            .cache
            .get_or_set_with_status::<CachedYear, ContributionsError, _, _>(
                &key,
                self.ttl,
                || async {
                    match compute(range).await? {
                        CachedYear::Unresolved { error } if !cache_unresolved => {
                            uncached = Some(error);
                            Ok(None)
                        }
                        year => Ok(Some(year)),
                    }
                },
            )
            .await?;

        let year = match (result.value, uncached) {
            (Some(year), _) => year,
            (None, error) => CachedYear::Unresolved {
                error: error.unwrap_or_else(|| "No contributions computed".into()),
            },
        };

        let mut response = match year {
            CachedYear::Resolved(full) => {
                full.filtered(request.include_breakdown, request.include_activity)
            }
            CachedYear::Unresolved { error } => {
                counter!(MANAGER_UNRESOLVED, "platform" => platform.as_str()).increment(1);
                unresolved_response(range, error)
            }
        };

        let elapsed = started.elapsed();
        response.meta.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        response.meta.cache_hit = result.is_hit;
        histogram!(MANAGER_DURATION, "platform" => platform.as_str()).record(elapsed.as_secs_f64());

        tracing::debug!(
            platform = platform.as_str(),
            year = request.year,
            cache_hit = result.is_hit,
            elapsed_ms = response.meta.elapsed_ms,
            "Served contributions"
        );

        Ok(response)
    }
}

/// Zero-filled year carrying only the reason the user could not be resolved.
pub fn unresolved_response(range: DateRange, error: String) -> ContributionsResponse {
    let mut response = ContributionsResponse {
        contributions: YearCalendar::new(range).into_contributions(),
        ..Default::default()
    };
    response.total.insert(range.year_label(), 0);
    response.meta.errors.push(error);
    response
}
