use crate::errors::{ContributionsError, Result};
use crate::metrics_defs::STRATEGY_UNIT_FAILURES;
use crate::model::{ActivityKind, DayCounts};
use shared::counter;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Runs `scan` for every unit, at most `max_concurrency` at a time, and sums the results.
///
/// Each task returns its own [`DayCounts`]; nothing is shared between tasks. A failing
/// unit is logged and skipped. Cancellation aborts every task and discards what was
/// collected so far.
pub async fn scan_units<U, F, Fut>(
    kind: ActivityKind,
    units: Vec<U>,
    max_concurrency: usize,
    cancel: &CancellationToken,
    scan: F,
) -> Result<DayCounts>
where
    U: Display,
    F: Fn(U) -> Fut,
    Fut: Future<Output = Result<DayCounts>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut join_set = JoinSet::new();

    for unit in units {
        let label = unit.to_string();
        let semaphore = semaphore.clone();
        let fetch = scan(unit);

        join_set.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (label, Err(ContributionsError::Cancelled));
            };
            (label, fetch.await)
        });
    }

    let mut counts = DayCounts::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                join_set.abort_all();
                return Err(ContributionsError::Cancelled);
            }
            joined = join_set.join_next() => {
                match joined {
                    Some(Ok((_, Ok(partial)))) => counts.merge(partial),
                    Some(Ok((_, Err(ContributionsError::Cancelled)))) => {
                        join_set.abort_all();
                        return Err(ContributionsError::Cancelled);
                    }
                    Some(Ok((unit, Err(e)))) => {
                        tracing::warn!(
                            kind = kind.as_str(),
                            unit = %unit,
                            error = %e,
                            "Skipping scanning unit"
                        );
                        counter!(STRATEGY_UNIT_FAILURES, "kind" => kind.as_str()).increment(1);
                    }
                    Some(Err(e)) => {
                        tracing::error!(kind = kind.as_str(), "Scan task panicked: {}", e);
                        counter!(STRATEGY_UNIT_FAILURES, "kind" => kind.as_str()).increment(1);
                    }
                    None => break,
                }
            }
        }
    }

    Ok(counts)
}
