//! Metrics definitions for the resilient client.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REMOTE_ATTEMPTS: MetricDef = MetricDef {
    name: "remote.attempts",
    metric_type: MetricType::Counter,
    description: "Number of attempts made against remote servers. Tagged with outcome.",
};

pub const REMOTE_RETRIES_EXHAUSTED: MetricDef = MetricDef {
    name: "remote.retries_exhausted",
    metric_type: MetricType::Counter,
    description: "Number of requests that failed on every attempt",
};

pub const REMOTE_NO_SERVERS: MetricDef = MetricDef {
    name: "remote.no_servers",
    metric_type: MetricType::Counter,
    description: "Number of requests made while no server was registered",
};

pub const REMOTE_REQUEST_DURATION: MetricDef = MetricDef {
    name: "remote.request.duration",
    metric_type: MetricType::Histogram,
    description: "Time spent on a request across all attempts, in seconds",
};

pub const REMOTE_SERVERS: MetricDef = MetricDef {
    name: "remote.servers",
    metric_type: MetricType::Gauge,
    description: "Number of servers resolved for a service when its client was built. Tagged with service.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REMOTE_ATTEMPTS,
    REMOTE_RETRIES_EXHAUSTED,
    REMOTE_NO_SERVERS,
    REMOTE_REQUEST_DURATION,
    REMOTE_SERVERS,
];
