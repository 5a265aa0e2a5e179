//! Metrics definitions for the cross-provider hub.

use shared::metrics_defs::{MetricDef, MetricType};

pub const HUB_PROVIDER_FAILURE: MetricDef = MetricDef {
    name: "hub.provider.failure",
    metric_type: MetricType::Counter,
    description: "Number of provider calls that produced no data, labelled by provider",
};

pub const HUB_AGGREGATE_DURATION: MetricDef = MetricDef {
    name: "hub.aggregate.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fan out to every requested provider and merge the results, in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[HUB_PROVIDER_FAILURE, HUB_AGGREGATE_DURATION];
