use super::api::{AzureDevOpsApi, GitRepository, Identity, TeamProject};
use crate::errors::{ContributionsError, Result};
use crate::options::ContributionsOptions;
use shared::cache::Cache;
use shared::cache_key::CacheKeyHasher;
use std::sync::Arc;
use std::time::Duration;

/// Cached lookups of slow-changing Azure DevOps metadata.
///
/// Identities, project lists and repository lists are cached per organization and
/// per credential, since what a token can see depends on the token. Tokens only
/// enter keys through [`CacheKeyHasher::credential_scope`].
pub struct AzureDevOpsRepository {
    api: Arc<dyn AzureDevOpsApi>,
    cache: Cache,
    keys: CacheKeyHasher,
    identity_ttl: Duration,
    projects_ttl: Duration,
    repo_ttl: Duration,
}

impl AzureDevOpsRepository {
    pub fn new(
        api: Arc<dyn AzureDevOpsApi>,
        cache: Cache,
        keys: CacheKeyHasher,
        options: &ContributionsOptions,
    ) -> Self {
        AzureDevOpsRepository {
            api,
            cache,
            keys,
            identity_ttl: options.identity_ttl(),
            projects_ttl: options.projects_ttl(),
            repo_ttl: options.repo_ttl(),
        }
    }

    pub fn api(&self) -> Arc<dyn AzureDevOpsApi> {
        self.api.clone()
    }

    /// An identity that was not found is not cached.
    pub async fn identity(
        &self,
        organization: &str,
        email: &str,
        token: &str,
    ) -> Result<Option<Identity>> {
        let key = format!(
            "azure-identity:{}:{}",
            self.keys.digest(&[organization, &email.to_lowercase()]),
            self.keys.credential_scope(token)
        );
        self.cache
            .get_or_set(&key, self.identity_ttl, || async {
                let identity = self.api.find_identity(organization, email, token).await?;
                Ok::<_, ContributionsError>(identity)
            })
            .await
    }

    pub async fn projects(&self, organization: &str, token: &str) -> Result<Vec<TeamProject>> {
        let key = format!(
            "azure-projects:{}:{}",
            self.keys.digest(&[organization]),
            self.keys.credential_scope(token)
        );
        self.cache
            .get_or_set_collection(&key, self.projects_ttl, || async {
                Ok::<_, ContributionsError>(self.api.list_projects(organization, token).await?)
            })
            .await
    }

    pub async fn repositories_of(
        &self,
        organization: &str,
        project: &TeamProject,
        token: &str,
    ) -> Result<Vec<GitRepository>> {
        let key = format!(
            "azure-repos:{}:{}",
            self.keys.digest(&[organization, &project.id]),
            self.keys.credential_scope(token)
        );
        self.cache
            .get_or_set_collection(&key, self.repo_ttl, || async {
                let repositories = self
                    .api
                    .list_repositories(organization, project, token)
                    .await?;
                Ok::<_, ContributionsError>(repositories)
            })
            .await
    }

    /// Every repository of every project visible to the token.
    pub async fn repositories(
        &self,
        organization: &str,
        token: &str,
    ) -> Result<Vec<GitRepository>> {
        let mut repositories = Vec::new();
        for project in self.projects(organization, token).await? {
            repositories.extend(self.repositories_of(organization, &project, token).await?);
        }
        Ok(repositories)
    }
}
