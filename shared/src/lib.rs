pub mod cache;
pub mod cache_key;
pub mod metrics_defs;
