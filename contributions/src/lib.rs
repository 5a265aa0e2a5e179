//! Yearly contribution calendars for Azure DevOps, GitHub and GitLab users.
//!
//! Each platform has a [`manager::ContributionsManager`] that serves one year for one
//! account. Managers cache the full year and hand out filtered copies; the Azure DevOps
//! manager additionally fans out over [`strategy::ContributionStrategy`] implementations.

pub mod azure_devops;
pub mod calendar;
pub mod errors;
pub mod github;
pub mod gitlab;
pub mod manager;
pub mod metrics_defs;
pub mod model;
pub mod options;
pub mod strategy;

mod http;

#[cfg(test)]
mod testutils;

pub use errors::{ApiError, ContributionsError, Result};
pub use manager::{ContributionsManager, ContributionsRequest, Platform, ProviderAccount};
pub use model::{ActivityKind, Contribution, ContributionsResponse, MetaInfo};
pub use options::ContributionsOptions;
