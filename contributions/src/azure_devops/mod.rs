//! Azure DevOps: commits, pull requests and work items across every project of an
//! organization, attributed to the identity behind a mail address.

pub mod api;
mod client;
mod commits;
mod manager;
mod pull_requests;
mod repository;
mod work_items;

pub use client::{AzureDevOpsClient, AzureDevOpsConfig};
pub use commits::CommitsStrategy;
pub use manager::AzureDevOpsManager;
pub use pull_requests::PullRequestsStrategy;
pub use repository::AzureDevOpsRepository;
pub use work_items::WorkItemsStrategy;

use crate::options::ContributionsOptions;
use api::{Identity, Page};

/// The resolved user the strategies run for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AzureUser {
    pub organization: String,
    pub identity: Identity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanSettings {
    pub max_concurrency: usize,
    pub first_page: Page,
    pub max_pages: u32,
    pub work_item_batch_size: usize,
}

impl ScanSettings {
    pub fn from_options(options: &ContributionsOptions) -> Self {
        ScanSettings {
            max_concurrency: options.max_concurrency,
            first_page: Page {
                top: options.default_top,
                skip: options.default_skip,
            },
            max_pages: options.max_scan_pages.max(1),
            work_item_batch_size: options.work_item_batch_size,
        }
    }
}
