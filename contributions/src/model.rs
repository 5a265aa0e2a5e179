//! Response model shared by every platform.
//!
//! The JSON shape (camelCase keys, `yyyy-mm-dd` dates, lowercase activity kinds) is what
//! downstream heatmap renderers consume, and it is also the shape stored in the cache.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Commits,
    PullRequests,
    WorkItems,
    Issues,
    Reviews,
    /// Private contributions the platform only reports as a count.
    Restricted,
    All,
}

impl ActivityKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Commits => "commits",
            ActivityKind::PullRequests => "pullrequests",
            ActivityKind::WorkItems => "workitems",
            ActivityKind::Issues => "issues",
            ActivityKind::Reviews => "reviews",
            ActivityKind::Restricted => "restricted",
            ActivityKind::All => "all",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation bucket for a day count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    None,
    Low,
    Medium,
    High,
    Max,
}

impl Level {
    pub fn from_count(count: u64) -> Self {
        match count {
            0 => Level::None,
            1..=4 => Level::Low,
            5..=9 => Level::Medium,
            10..=14 => Level::High,
            _ => Level::Max,
        }
    }

    pub const fn as_u8(&self) -> u8 {
        *self as u8
    }
}

pub type ActivityCounts = BTreeMap<ActivityKind, u64>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub date: NaiveDate,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<ActivityCounts>,
}

impl Contribution {
    pub fn empty(date: NaiveDate) -> Self {
        Contribution {
            date,
            count: 0,
            activity: None,
        }
    }

    pub fn level(&self) -> Level {
        Level::from_count(self.count)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaInfo {
    pub scanned_projects: u64,
    pub scanned_repos: u64,
    pub elapsed_ms: u64,
    pub cache_hit: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsResponse {
    /// Year label (`"2024"`) to the sum of every day count.
    pub total: BTreeMap<String, u64>,
    pub contributions: Vec<Contribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ActivityCounts>,
    pub meta: MetaInfo,
}

impl ContributionsResponse {
    /// Copy of this response without the parts the caller did not ask for.
    ///
    /// `self` is usually a cached value shared with other callers and is left untouched.
    pub fn filtered(&self, include_breakdown: bool, include_activity: bool) -> Self {
        let contributions = self
            .contributions
            .iter()
            .map(|c| Contribution {
                date: c.date,
                count: c.count,
                activity: if include_activity {
                    c.activity.clone()
                } else {
                    None
                },
            })
            .collect();

        ContributionsResponse {
            total: self.total.clone(),
            contributions,
            breakdown: if include_breakdown {
                self.breakdown.clone()
            } else {
                None
            },
            meta: self.meta.clone(),
        }
    }

    pub fn year_total(&self, year: i32) -> u64 {
        self.total.get(&year.to_string()).copied().unwrap_or(0)
    }
}

/// Per-day counts produced by one strategy or one scanning unit.
///
/// Merging is a per-key sum, so the result does not depend on the order partial
/// maps arrive in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DayCounts {
    days: BTreeMap<NaiveDate, u64>,
}

impl DayCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, date: NaiveDate) {
        self.add(date, 1);
    }

    pub fn add(&mut self, date: NaiveDate, count: u64) {
        if count == 0 {
            return;
        }
        *self.days.entry(date).or_default() += count;
    }

    pub fn merge(&mut self, other: DayCounts) {
        for (date, count) in other.days {
            self.add(date, count);
        }
    }

    pub fn get(&self, date: NaiveDate) -> u64 {
        self.days.get(&date).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.days.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.days.iter().map(|(date, count)| (*date, *count))
    }
}

impl FromIterator<(NaiveDate, u64)> for DayCounts {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, u64)>>(iter: T) -> Self {
        let mut counts = DayCounts::new();
        for (date, count) in iter {
            counts.add(date, count);
        }
        counts
    }
}
