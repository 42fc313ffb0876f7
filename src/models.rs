//! Core data models for engagement analysis
//!
//! Observations are the minimal (duration, watch percentage) pairs the map
//! builder consumes; video records carry the full tab-separated rows of the
//! formatted dataset so that relabeling can pass unrelated columns through
//! untouched.

use crate::constants::{FIELD_DURATION, FIELD_WATCH_PERCENTAGE, FORMATTED_FIELD_COUNT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single engagement observation.
///
/// `duration` is the video length in seconds and must be positive; videos
/// with zero duration are excluded upstream. `watch_percentage` is the
/// average fraction of the video watched over the first 30 days, clamped to
/// [0, 1] by the formatting stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Video length in seconds
    pub duration: u32,

    /// Average watch percentage over the first 30 days, in [0, 1]
    pub watch_percentage: f64,
}

impl Observation {
    pub fn new(duration: u32, watch_percentage: f64) -> Self {
        Self {
            duration,
            watch_percentage,
        }
    }
}

/// Record-level parse errors
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("expected at least {expected} tab-separated fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("invalid duration {value:?}: {source}")]
    Duration {
        value: String,
        source: std::num::ParseIntError,
    },

    #[error("invalid watch percentage {value:?}: {source}")]
    WatchPercentage {
        value: String,
        source: std::num::ParseFloatError,
    },
}

/// One row of a formatted dataset file.
///
/// Only `duration` and `wp30` are interpreted; every other column (id,
/// publish date, category, channel, topics, daily series, ...) belongs to the
/// downstream feature builders and is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    fields: Vec<String>,

    /// Video length in seconds, parsed from the `duration` column
    pub duration: u32,

    /// 30-day watch percentage, parsed from the `wp30` column
    pub watch_percentage: f64,
}

impl VideoRecord {
    /// Parse a tab-separated formatted record.
    ///
    /// Trailing newline characters are stripped; interior empty fields are
    /// preserved as-is.
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        let fields: Vec<String> = trimmed.split('\t').map(str::to_string).collect();
        if fields.len() < FORMATTED_FIELD_COUNT {
            return Err(RecordError::FieldCount {
                expected: FORMATTED_FIELD_COUNT,
                found: fields.len(),
            });
        }

        let duration =
            fields[FIELD_DURATION]
                .parse::<u32>()
                .map_err(|source| RecordError::Duration {
                    value: fields[FIELD_DURATION].clone(),
                    source,
                })?;
        let watch_percentage = fields[FIELD_WATCH_PERCENTAGE].parse::<f64>().map_err(
            |source| RecordError::WatchPercentage {
                value: fields[FIELD_WATCH_PERCENTAGE].clone(),
                source,
            },
        )?;

        Ok(Self {
            fields,
            duration,
            watch_percentage,
        })
    }

    /// The (duration, watch percentage) pair this record contributes to map
    /// construction.
    pub fn observation(&self) -> Observation {
        Observation::new(self.duration, self.watch_percentage)
    }

    /// Re-emit the record with a relative engagement column inserted
    /// directly after `wp30`.
    pub fn to_relabeled_line(&self, relative_engagement: f64) -> String {
        let mut out = self.fields[..=FIELD_WATCH_PERCENTAGE].join("\t");
        out.push('\t');
        out.push_str(&relative_engagement.to_string());
        for field in &self.fields[FIELD_WATCH_PERCENTAGE + 1..] {
            out.push('\t');
            out.push_str(field);
        }
        out
    }
}
