//! Metrics definitions for the enrichment pipeline.

use shared::metrics_defs::{MetricDef, MetricType};

pub const ENRICHMENTS: MetricDef = MetricDef {
    name: "enrichment.requests",
    metric_type: MetricType::Counter,
    description: "Number of enrichments. Tagged with source: remote, cache, none or unavailable.",
};

pub const REMOTE_PROFILES_MISSING: MetricDef = MetricDef {
    name: "enrichment.remote.profiles_missing",
    metric_type: MetricType::Counter,
    description: "Number of requested couriers omitted from a successful users service response",
};

pub const CACHE_FALLBACK_HIT: MetricDef = MetricDef {
    name: "enrichment.cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of profiles found in the cache during fallback",
};

pub const CACHE_FALLBACK_MISS: MetricDef = MetricDef {
    name: "enrichment.cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of profiles missing from the cache during fallback",
};

pub const CACHE_WRITE_FAILED: MetricDef = MetricDef {
    name: "enrichment.cache.write_failed",
    metric_type: MetricType::Counter,
    description: "Number of profile write-throughs rejected by the cache store",
};

pub const ALL_METRICS: &[MetricDef] = &[
    ENRICHMENTS,
    REMOTE_PROFILES_MISSING,
    CACHE_FALLBACK_HIT,
    CACHE_FALLBACK_MISS,
    CACHE_WRITE_FAILED,
];
