//! Engagement map construction and persistence
//!
//! An engagement map is a duration-binned table of empirical watch-percentage
//! percentiles. The builder stratifies observations into variable-width
//! duration bins (log-uniform in intent, data-driven in realized boundaries,
//! with a hard floor on bin population) and stores 1000 percentile samples
//! per bin. The persisted JSON keeps the same logical shape as the original
//! dataset release: a `"duration"` key holding the bin boundaries, and keys
//! `"0"`, `"1"`, ... holding the per-bin percentile tables.

use crate::constants::{
    BIN_NUMBER, LOG_DURATION_LOWER, LOG_DURATION_UPPER, MIN_BIN_SIZE, PERCENTILE_COUNT,
};
use crate::models::Observation;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Map construction and persistence errors
#[derive(Error, Debug)]
pub enum MapError {
    #[error("engagement map not found at {path}, build it first")]
    NotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no observations to build an engagement map from")]
    NoObservations,

    #[error("bin {bin} is empty")]
    EmptyBin { bin: usize },

    #[error("malformed engagement map: {message}")]
    Malformed { message: String },
}

/// Duration-stratified percentile lookup table.
///
/// Built once from a training corpus and read-only afterwards. Bin `i`
/// covers durations `(duration_splits[i-1], duration_splits[i]]`, with the
/// first bin open below and the last bin open above.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementMap {
    duration_splits: Vec<u32>,
    bins: Vec<Vec<f64>>,
}

impl EngagementMap {
    /// Assemble a map from raw parts, validating every structural invariant.
    pub fn from_parts(duration_splits: Vec<u32>, bins: Vec<Vec<f64>>) -> Result<Self, MapError> {
        if bins.is_empty() {
            return Err(MapError::Malformed {
                message: "map has no bins".to_string(),
            });
        }
        if bins.len() != duration_splits.len() + 1 {
            return Err(MapError::Malformed {
                message: format!(
                    "{} bins do not match {} duration splits",
                    bins.len(),
                    duration_splits.len()
                ),
            });
        }
        if !duration_splits.windows(2).all(|w| w[0] < w[1]) {
            return Err(MapError::Malformed {
                message: "duration splits are not strictly increasing".to_string(),
            });
        }
        for (i, bin) in bins.iter().enumerate() {
            if bin.is_empty() {
                return Err(MapError::EmptyBin { bin: i });
            }
            if bin.len() != PERCENTILE_COUNT {
                return Err(MapError::Malformed {
                    message: format!(
                        "bin {} holds {} percentile samples, expected {}",
                        i,
                        bin.len(),
                        PERCENTILE_COUNT
                    ),
                });
            }
            if !bin.windows(2).all(|w| w[0] <= w[1]) {
                return Err(MapError::Malformed {
                    message: format!("bin {} percentiles are not non-decreasing", i),
                });
            }
        }

        Ok(Self {
            duration_splits,
            bins,
        })
    }

    /// Realized upper boundaries of every bin except the last.
    pub fn duration_splits(&self) -> &[u32] {
        &self.duration_splits
    }

    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Index of the bin covering `duration`: the number of boundaries the
    /// duration exceeds. Mirrors the boundary semantics used at build time.
    pub fn bin_index(&self, duration: u32) -> usize {
        self.duration_splits.partition_point(|&split| split < duration)
    }

    /// Percentile table of the bin covering `duration`, ascending.
    pub fn bin(&self, duration: u32) -> &[f64] {
        &self.bins[self.bin_index(duration)]
    }

    /// Percentile table of bin `index`, ascending.
    pub fn bin_at(&self, index: usize) -> &[f64] {
        &self.bins[index]
    }

    /// Load a map from a JSON artifact, re-validating all invariants.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MapError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MapError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let start = std::time::Instant::now();
        let content = fs::read_to_string(path)?;
        let map: Self = serde_json::from_str(&content)?;
        tracing::info!(
            "Loaded engagement map with {} bins from {} in {:?}",
            map.num_bins(),
            path.display(),
            start.elapsed()
        );
        Ok(map)
    }

    /// Persist the map as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MapError> {
        let content = serde_json::to_string(self)?;
        fs::write(path.as_ref(), content)?;
        tracing::info!(
            "Saved engagement map with {} bins to {}",
            self.num_bins(),
            path.as_ref().display()
        );
        Ok(())
    }
}

impl Serialize for EngagementMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.bins.len() + 1))?;
        map.serialize_entry("duration", &self.duration_splits)?;
        for (i, bin) in self.bins.iter().enumerate() {
            map.serialize_entry(&i.to_string(), bin)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EngagementMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = EngagementMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an engagement map keyed by \"duration\" and bin indices")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut duration_splits: Option<Vec<u32>> = None;
                let mut indexed_bins: Vec<(usize, Vec<f64>)> = Vec::new();

                while let Some(key) = access.next_key::<String>()? {
                    if key == "duration" {
                        if duration_splits.is_some() {
                            return Err(de::Error::duplicate_field("duration"));
                        }
                        duration_splits = Some(access.next_value()?);
                    } else {
                        let index: usize = key.parse().map_err(|_| {
                            de::Error::custom(format!("unexpected key {:?}", key))
                        })?;
                        indexed_bins.push((index, access.next_value()?));
                    }
                }

                let duration_splits =
                    duration_splits.ok_or_else(|| de::Error::missing_field("duration"))?;
                indexed_bins.sort_by_key(|(index, _)| *index);
                for (position, (index, _)) in indexed_bins.iter().enumerate() {
                    if *index != position {
                        return Err(de::Error::custom(format!(
                            "bin indices are not contiguous from 0, found {}",
                            index
                        )));
                    }
                }
                let bins = indexed_bins.into_iter().map(|(_, bin)| bin).collect();

                EngagementMap::from_parts(duration_splits, bins)
                    .map_err(|e| de::Error::custom(e.to_string()))
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// Builds an [`EngagementMap`] from a corpus of observations.
///
/// Split candidates are laid out evenly in log10(duration) space over
/// [10, 100,000] seconds. Walking the duration-sorted corpus, a bin closes
/// when an observation crosses the current candidate, provided the bin
/// already holds [`MIN_BIN_SIZE`] observations; the realized boundary is the
/// crossing duration minus one. Leftovers form the final unbounded bin.
#[derive(Debug, Clone)]
pub struct EngagementMapBuilder {
    bin_number: usize,
}

impl EngagementMapBuilder {
    pub fn new() -> Self {
        Self {
            bin_number: BIN_NUMBER,
        }
    }

    /// Override the number of split candidates.
    pub fn with_bin_number(bin_number: usize) -> Self {
        Self { bin_number }
    }

    /// Build a map from the given observations.
    ///
    /// Deterministic: the output depends only on the multiset of
    /// observations, not their order. Callers guarantee positive durations
    /// and clamped watch percentages; neither is re-validated here.
    pub fn build(&self, observations: &[Observation]) -> Result<EngagementMap, MapError> {
        if observations.is_empty() {
            return Err(MapError::NoObservations);
        }
        if observations.len() < MIN_BIN_SIZE {
            tracing::warn!(
                "Only {} observations; producing a single catch-all bin with unreliable percentiles",
                observations.len()
            );
        }

        let mut sorted = observations.to_vec();
        sorted.sort_by_key(|obs| obs.duration);

        let candidates = even_split_points(self.bin_number);
        let mut candidate_idx = 0;
        let mut duration_splits: Vec<u32> = Vec::new();
        let mut raw_bins: Vec<Vec<f64>> = Vec::new();
        let mut current: Vec<f64> = Vec::new();

        for obs in &sorted {
            if candidate_idx < candidates.len()
                && (obs.duration as f64).log10() > candidates[candidate_idx]
            {
                candidate_idx += 1;
                if current.len() >= MIN_BIN_SIZE {
                    raw_bins.push(std::mem::take(&mut current));
                    duration_splits.push(obs.duration - 1);
                }
            }
            current.push(obs.watch_percentage);
        }
        if !current.is_empty() {
            raw_bins.push(current);
        }

        let mut bins = Vec::with_capacity(raw_bins.len());
        for (i, mut raw) in raw_bins.into_iter().enumerate() {
            if raw.is_empty() {
                return Err(MapError::EmptyBin { bin: i });
            }
            raw.sort_by(f64::total_cmp);
            bins.push(percentile_table(&raw));
        }

        tracing::info!(
            "Built engagement map: {} observations into {} bins",
            sorted.len(),
            bins.len()
        );
        EngagementMap::from_parts(duration_splits, bins)
    }
}

impl Default for EngagementMapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Evenly spaced split candidates in log10(duration) space.
fn even_split_points(bin_number: usize) -> Vec<f64> {
    if bin_number <= 1 {
        return vec![LOG_DURATION_LOWER];
    }
    let step = (LOG_DURATION_UPPER - LOG_DURATION_LOWER) / (bin_number - 1) as f64;
    (0..bin_number)
        .map(|i| LOG_DURATION_LOWER + step * i as f64)
        .collect()
}

/// The 1000 percentile samples (0.0th, 0.1th, ..., 99.9th) of a sorted bin.
fn percentile_table(sorted: &[f64]) -> Vec<f64> {
    (0..PERCENTILE_COUNT)
        .map(|j| percentile_sorted(sorted, j as f64 / 10.0))
        .collect()
}

/// Percentile of pre-sorted values with linear interpolation between the two
/// bracketing order statistics. `q` is in [0, 100].
fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = q / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}
