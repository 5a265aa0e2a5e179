//! Cross-provider contributions: one merged year across Azure DevOps, GitHub and GitLab.
//!
//! The [`aggregator::ContributionAggregator`] resolves the requested provider names, asks
//! the [`factory::ContributionProviderFactory`] for each one concurrently and folds the
//! results together with [`merger::MergedContributions`].

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod factory;
pub mod merger;
pub mod metrics_defs;
pub mod user_data;

#[cfg(test)]
mod testutils;

pub use aggregator::{AggregateRequest, ContributionAggregator};
pub use config::HubConfig;
pub use errors::{HubError, Result};
pub use factory::{ContributionProviderFactory, ProviderContribution, YearQuery};
pub use merger::MergedContributions;
pub use user_data::{FileUserDataRepository, UserData, UserDataRepository};
