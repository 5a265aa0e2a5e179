//! GitLab: the user's public events feed, classified into activity kinds.

pub mod api;
mod classify;
mod client;
mod manager;

pub use classify::classify;
pub use client::{GitLabClient, GitLabConfig};
pub use manager::GitLabManager;
