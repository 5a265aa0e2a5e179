use super::ContributionStrategy;
use crate::calendar::{DateRange, YearCalendar};
use crate::errors::{ContributionsError, Result};
use crate::manager::ProviderAccount;
use crate::metrics_defs::STRATEGY_FAILURES;
use crate::model::{ActivityKind, ContributionsResponse, DayCounts};
use shared::counter;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Day counts per strategy that succeeded, plus one error line per strategy that did not.
#[derive(Debug, Default)]
pub struct StrategyOutcome {
    pub per_kind: BTreeMap<ActivityKind, DayCounts>,
    pub errors: Vec<String>,
}

/// Runs every strategy of one platform concurrently.
///
/// A failing strategy becomes a `strategy:<kind>, reason:<message>` line; the others
/// still contribute. Cache failures and cancellation abort the whole run.
pub async fn run_strategies<I>(
    strategies: &[Arc<dyn ContributionStrategy<I>>],
    identity: Arc<I>,
    account: &ProviderAccount,
    range: DateRange,
    cancel: &CancellationToken,
) -> Result<StrategyOutcome>
where
    I: Send + Sync + 'static,
{
    let mut join_set = JoinSet::new();
    let mut task_kinds = HashMap::new();

    for strategy in strategies {
        let strategy = strategy.clone();
        let identity = identity.clone();
        let account = account.clone();
        let cancel = cancel.clone();
        let kind = strategy.kind();

        let abort_handle = join_set.spawn(async move {
            strategy
                .get_contributions(&identity, &account, &range, &cancel)
                .await
        });
        task_kinds.insert(abort_handle.id(), kind);
    }

    let mut outcome = StrategyOutcome::default();
    let mut failures = BTreeMap::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                join_set.abort_all();
                return Err(ContributionsError::Cancelled);
            }
            joined = join_set.join_next_with_id() => {
                let (kind, result) = match joined {
                    Some(Ok((id, result))) => (task_kinds.remove(&id), result),
                    Some(Err(e)) => {
                        tracing::error!("Strategy task failed: {e}");
                        if let Some(kind) = task_kinds.remove(&e.id()) {
                            failures.insert(kind, "strategy task panicked".to_string());
                        }
                        continue;
                    }
                    None => break,
                };
                let Some(kind) = kind else {
                    continue;
                };

                match result {
                    Ok(counts) => {
                        outcome.per_kind.insert(kind, counts);
                    }
                    Err(e @ (ContributionsError::Cancelled | ContributionsError::Cache(_))) => {
                        join_set.abort_all();
                        return Err(e);
                    }
                    Err(e) => {
                        tracing::warn!(kind = kind.as_str(), error = %e, "Strategy failed");
                        counter!(STRATEGY_FAILURES, "kind" => kind.as_str()).increment(1);
                        failures.insert(kind, e.to_string());
                    }
                }
            }
        }
    }

    outcome.errors = failures
        .into_iter()
        .map(|(kind, reason)| format!("strategy:{kind}, reason:{reason}"))
        .collect();

    Ok(outcome)
}

/// Builds the full-year response from per-kind day counts.
///
/// Every day of the year is present. The breakdown holds one entry per kind that
/// produced counts; with `include_detail` each active day also lists its counts per kind.
pub fn assemble_year(
    range: DateRange,
    per_kind: &BTreeMap<ActivityKind, DayCounts>,
    include_detail: bool,
) -> ContributionsResponse {
    let mut calendar = YearCalendar::new(range);
    let mut breakdown = BTreeMap::new();

    for (kind, counts) in per_kind {
        let detail = include_detail.then_some(*kind);
        calendar.add_counts(counts, detail);
        let in_range: u64 = counts
            .iter()
            .filter(|(date, _)| range.contains_date(*date))
            .map(|(_, count)| count)
            .sum();
        breakdown.insert(*kind, in_range);
    }

    let total = calendar.total();
    let mut response = ContributionsResponse {
        contributions: calendar.into_contributions(),
        breakdown: Some(breakdown),
        ..Default::default()
    };
    response.total.insert(range.year_label(), total);
    response
}
