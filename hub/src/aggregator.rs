use crate::errors::{HubError, Result};
use crate::factory::{ContributionProviderFactory, ProviderContribution, YearQuery};
use crate::merger::MergedContributions;
use crate::metrics_defs::HUB_AGGREGATE_DURATION;
use crate::user_data::{UserData, UserDataRepository};
use contributions::ContributionsResponse;
use shared::histogram;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// One aggregated query. `providers: None` asks every supported provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregateRequest {
    pub providers: Option<Vec<String>>,
    pub query: YearQuery,
}

/// Fans out to every requested provider concurrently and merges what comes back.
///
/// A failing provider only adds an error line to the merged response.
pub struct ContributionAggregator {
    factory: Arc<ContributionProviderFactory>,
    users: Arc<dyn UserDataRepository>,
}

impl ContributionAggregator {
    pub fn new(
        factory: Arc<ContributionProviderFactory>,
        users: Arc<dyn UserDataRepository>,
    ) -> Self {
        Self { factory, users }
    }

    /// Looks up the profile of `user_id` first.
    pub async fn get_contributions_for(
        &self,
        user_id: &str,
        request: &AggregateRequest,
        cancel: &CancellationToken,
    ) -> Result<ContributionsResponse> {
        let user = self
            .users
            .user_data(user_id)
            .await?
            .ok_or_else(|| HubError::UserNotFound(user_id.to_string()))?;
        self.get_aggregated_contributions(&user, request, cancel).await
    }

    pub async fn get_aggregated_contributions(
        &self,
        user: &UserData,
        request: &AggregateRequest,
        cancel: &CancellationToken,
    ) -> Result<ContributionsResponse> {
        let started = Instant::now();
        let providers = self.resolve_providers(request.providers.as_deref())?;
        let query = request.query;
        let user = Arc::new(user.clone());

        let mut join_set = JoinSet::new();
        let mut task_providers = HashMap::new();

        for provider in providers {
            let factory = self.factory.clone();
            let user = user.clone();
            let cancel = cancel.clone();
            let name = provider.clone();

            let abort_handle = join_set.spawn(async move {
                factory
                    .get_contributions(&name, &user, query, &cancel)
                    .await
            });
            task_providers.insert(abort_handle.id(), provider);
        }

        let mut merged = MergedContributions::new(query.year, query.include_breakdown);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    join_set.abort_all();
                    return Err(HubError::Cancelled);
                }
                joined = join_set.join_next_with_id() => {
                    match joined {
                        Some(Ok((id, contribution))) => {
                            task_providers.remove(&id);
                            merged.merge(contribution);
                        }
                        Some(Err(e)) => {
                            tracing::error!("Provider task failed: {e}");
                            if let Some(provider) = task_providers.remove(&e.id()) {
                                merged.merge(ProviderContribution::failure(
                                    provider,
                                    "provider task panicked",
                                ));
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        let response = merged.into_response();
        histogram!(HUB_AGGREGATE_DURATION).record(started.elapsed().as_secs_f64());
        tracing::debug!(
            user_id = %user.id,
            year = query.year,
            errors = response.meta.errors.len(),
            "Aggregated contributions"
        );

        Ok(response)
    }

    /// Lower-cased, de-duplicated provider names in request order. Blank names are dropped.
    pub fn resolve_providers(&self, providers: Option<&[String]>) -> Result<Vec<String>> {
        let requested = match providers {
            Some(providers) => providers.to_vec(),
            None => self.factory.supported_providers(),
        };

        let mut resolved: Vec<String> = Vec::with_capacity(requested.len());
        for name in requested {
            let name = name.trim().to_lowercase();
            if !name.is_empty() && !resolved.contains(&name) {
                resolved.push(name);
            }
        }

        if resolved.is_empty() {
            return Err(HubError::NoProviders);
        }
        Ok(resolved)
    }
}
