//! Engagement maps for video watch-percentage analysis
//!
//! Watch percentage is strongly confounded by video length: short videos are
//! watched near-completely, long ones are not. An engagement map removes the
//! confound by stratifying a training corpus into duration bins and storing
//! the empirical watch-percentage percentiles of each bin. Relative
//! engagement is then the percentile rank of a video's watch percentage
//! within its duration cohort.
//!
//! This library provides the map builder, a persisted JSON artifact, the
//! bidirectional watch-percentage <-> relative-engagement conversion, and
//! dataset helpers to build a map from (and relabel) formatted tab-separated
//! video records.

pub mod constants;
pub mod converter;
pub mod dataset;
pub mod map;
pub mod models;

// Re-export main types for convenience
pub use converter::{
    to_relative_engagement, to_relative_engagement_all, to_watch_percentage,
    to_watch_percentage_all,
};
pub use dataset::{collect_observations, relabel_dataset, DatasetError};
pub use map::{EngagementMap, EngagementMapBuilder, MapError};
pub use models::{Observation, RecordError, VideoRecord};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
