//! GitHub: one GraphQL `contributionsCollection` lookup per user and year.

pub mod api;
mod client;
mod manager;

pub use client::{GitHubClient, GitHubConfig};
pub use manager::GitHubManager;
