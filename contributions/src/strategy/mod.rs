//! Strategies count one kind of activity for one user on one platform.
//!
//! A strategy enumerates its scanning units (repositories or projects) and hands them
//! to [`scan_units`], which fetches them with bounded concurrency and folds the partial
//! day maps. All strategies of a platform then run side by side in [`run_strategies`].

mod runner;
mod scan;

pub use runner::{StrategyOutcome, assemble_year, run_strategies};
pub use scan::scan_units;

use crate::calendar::DateRange;
use crate::errors::Result;
use crate::manager::ProviderAccount;
use crate::model::{ActivityKind, DayCounts};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Counts one [`ActivityKind`] for a resolved platform identity `I`.
#[async_trait]
pub trait ContributionStrategy<I>: Send + Sync
where
    I: Send + Sync,
{
    fn kind(&self) -> ActivityKind;

    /// Per-day counts within `range`.
    ///
    /// Failures of single scanning units are skipped. An `Err` means the strategy
    /// as a whole could not run.
    async fn get_contributions(
        &self,
        identity: &I,
        account: &ProviderAccount,
        range: &DateRange,
        cancel: &CancellationToken,
    ) -> Result<DayCounts>;
}
