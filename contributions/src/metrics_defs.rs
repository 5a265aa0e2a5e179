//! Metrics definitions for the contribution strategies and managers.

use shared::metrics_defs::{MetricDef, MetricType};

pub const STRATEGY_UNIT_FAILURES: MetricDef = MetricDef {
    name: "strategy.unit_failures",
    metric_type: MetricType::Counter,
    description: "Number of scanning units (repositories, projects) skipped after a failure",
};

pub const STRATEGY_FAILURES: MetricDef = MetricDef {
    name: "strategy.failures",
    metric_type: MetricType::Counter,
    description: "Number of strategies that failed as a whole",
};

pub const MANAGER_DURATION: MetricDef = MetricDef {
    name: "manager.duration",
    metric_type: MetricType::Histogram,
    description: "Time to answer one platform request in seconds, cache hits included",
};

pub const MANAGER_UNRESOLVED: MetricDef = MetricDef {
    name: "manager.unresolved",
    metric_type: MetricType::Counter,
    description: "Number of requests where the user could not be resolved on the platform",
};

pub const ALL_METRICS: &[MetricDef] = &[
    STRATEGY_UNIT_FAILURES,
    STRATEGY_FAILURES,
    MANAGER_DURATION,
    MANAGER_UNRESOLVED,
];
