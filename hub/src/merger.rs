//! Combining the yearly responses of several providers into one.
//!
//! - Totals, breakdown and per-day activity: summed per key
//! - Days: every day of the year, zero-filled; counts for the same date are summed
//! - Errors: prefixed with the provider name
//! - Meta counters: summed; `cache_hit` is set when any provider was served from cache

use crate::factory::ProviderContribution;
use chrono::NaiveDate;
use contributions::calendar::days_in_year;
use contributions::model::ActivityCounts;
use contributions::{Contribution, ContributionsResponse, MetaInfo};
use std::collections::BTreeMap;

/// Merged results from every provider task.
pub struct MergedContributions {
    total: BTreeMap<String, u64>,
    days: BTreeMap<NaiveDate, Contribution>,
    breakdown: Option<ActivityCounts>,
    meta: MetaInfo,
}

impl MergedContributions {
    /// Creates a zero-filled year. The year always shows up in `total`, and with
    /// `include_breakdown` the breakdown is present even when no provider answered.
    pub fn new(year: i32, include_breakdown: bool) -> Self {
        Self {
            total: BTreeMap::from([(year.to_string(), 0)]),
            days: days_in_year(year)
                .map(|date| (date, Contribution::empty(date)))
                .collect(),
            breakdown: include_breakdown.then(BTreeMap::new),
            meta: MetaInfo::default(),
        }
    }

    pub fn merge(&mut self, contribution: ProviderContribution) {
        match contribution.data {
            Some(data) if contribution.is_successful => {
                self.merge_response(&contribution.provider, data)
            }
            _ => {
                let message = contribution
                    .error_message
                    .unwrap_or_else(|| "No data returned".to_string());
                self.add_failure(&contribution.provider, &message);
            }
        }
    }

    /// Adds one provider's response. Days outside the year are dropped.
    pub fn merge_response(&mut self, provider: &str, response: ContributionsResponse) {
        for (year, count) in response.total {
            *self.total.entry(year).or_default() += count;
        }

        for day in response.contributions {
            let Some(merged) = self.days.get_mut(&day.date) else {
                continue;
            };
            merged.count += day.count;
            if let Some(activity) = day.activity {
                add_counts(merged.activity.get_or_insert_with(BTreeMap::new), activity);
            }
        }

        if let Some(breakdown) = response.breakdown {
            add_counts(self.breakdown.get_or_insert_with(BTreeMap::new), breakdown);
        }

        let meta = response.meta;
        self.meta.scanned_projects += meta.scanned_projects;
        self.meta.scanned_repos += meta.scanned_repos;
        self.meta.elapsed_ms += meta.elapsed_ms;
        self.meta.cache_hit |= meta.cache_hit;
        self.meta
            .errors
            .extend(meta.errors.into_iter().map(|e| format!("{provider}: {e}")));
    }

    /// Records a provider that produced no data.
    pub fn add_failure(&mut self, provider: &str, message: &str) {
        self.meta.errors.push(format!("{provider}: {message}"));
    }

    pub fn into_response(mut self) -> ContributionsResponse {
        // Tasks finish in any order.
        self.meta.errors.sort();

        ContributionsResponse {
            total: self.total,
            contributions: self.days.into_values().collect(),
            breakdown: self.breakdown,
            meta: self.meta,
        }
    }
}

fn add_counts(into: &mut ActivityCounts, from: ActivityCounts) {
    for (kind, count) in from {
        *into.entry(kind).or_default() += count;
    }
}
