//! Formatted dataset access
//!
//! The formatting stage (out of scope here) turns the raw JSON collection
//! into tab-separated files, one video per line, under a dataset directory.
//! This module walks those files to feed the map builder, and rewrites them
//! with a relative engagement column for the downstream predictors.

use crate::converter::to_relative_engagement;
use crate::map::EngagementMap;
use crate::models::{Observation, RecordError, VideoRecord};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Header line of a formatted dataset file.
pub const FORMATTED_HEADER: &str = "id\tpublish\tduration\tdefinition\tcategory\tdetect_lang\t\
channel\ttopics\tview30\twatch30\twp30\tdays\tdaily_view\tdaily_watch";

/// Header line after relabeling, with `re30` inserted after `wp30`.
pub const RELABELED_HEADER: &str = "id\tpublish\tduration\tdefinition\tcategory\tdetect_lang\t\
channel\ttopics\tview30\twatch30\twp30\tre30\tdays\tdaily_view\tdaily_watch";

/// Dataset-level errors
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("dataset directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record at {path}:{line}: {source}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        source: RecordError,
    },
}

/// Collect (duration, watch percentage) observations from every formatted
/// file under `input_dir`.
///
/// Lenient by design: the released dataset is pre-cleaned, so malformed rows
/// and zero-duration videos are skipped with a warning rather than aborting
/// a multi-gigabyte pass.
pub fn collect_observations(input_dir: &Path) -> Result<Vec<Observation>, DatasetError> {
    let files = walk_dataset_files(input_dir)?;
    let mut observations = Vec::new();

    for path in &files {
        tracing::info!("Loading observations from {}", path.display());
        let reader = BufReader::new(fs::File::open(path)?);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line_no == 0 {
                // header
                continue;
            }
            match VideoRecord::parse(&line) {
                Ok(record) => {
                    if record.duration == 0 {
                        tracing::warn!(
                            "Skipping zero-duration video at {}:{}",
                            path.display(),
                            line_no + 1
                        );
                        continue;
                    }
                    observations.push(record.observation());
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed record at {}:{}: {}",
                        path.display(),
                        line_no + 1,
                        e
                    );
                }
            }
        }
    }

    tracing::info!(
        "Collected {} observations from {} files",
        observations.len(),
        files.len()
    );
    Ok(observations)
}

/// Rewrite every formatted file under `input_dir` into `output_dir`, with a
/// relative engagement column appended after `wp30`.
///
/// Output files keep the input basenames. Unlike observation collection,
/// malformed rows are a hard error here: silently dropping records would
/// desynchronize the relabeled dataset from its source.
///
/// Returns the number of records relabeled.
pub fn relabel_dataset(
    map: &EngagementMap,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<usize, DatasetError> {
    let files = walk_dataset_files(input_dir)?;
    fs::create_dir_all(output_dir)?;

    let mut total = 0;
    for path in &files {
        tracing::info!("Relabeling {}", path.display());
        let file_name = path.file_name().unwrap_or_default();
        let output_path = output_dir.join(file_name);

        let reader = BufReader::new(fs::File::open(path)?);
        let mut writer = BufWriter::new(fs::File::create(&output_path)?);
        writeln!(writer, "{}", RELABELED_HEADER)?;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line_no == 0 {
                continue;
            }
            let record =
                VideoRecord::parse(&line).map_err(|source| DatasetError::MalformedRecord {
                    path: path.clone(),
                    line: line_no + 1,
                    source,
                })?;
            let re = to_relative_engagement(map, record.duration, record.watch_percentage);
            writeln!(writer, "{}", record.to_relabeled_line(re))?;
            total += 1;
        }
        writer.flush()?;
    }

    tracing::info!("Relabeled {} records across {} files", total, files.len());
    Ok(total)
}

/// All regular files under `dir`, recursively, in a stable sorted order.
fn walk_dataset_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    if !dir.is_dir() {
        return Err(DatasetError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PERCENTILE_COUNT;
    use tempfile::TempDir;

    fn record_line(id: &str, duration: u32, wp30: f64) -> String {
        format!(
            "{}\t2016-07-15\t{}\t1\t24\ten\tUCabc\tmusic\t1000\t50000\t{}\t30\t1,2,3\t4,5,6",
            id, duration, wp30
        )
    }

    fn write_dataset(dir: &Path, name: &str, lines: &[String]) {
        let mut content = String::from(FORMATTED_HEADER);
        content.push('\n');
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        fs::write(dir.join(name), content).unwrap();
    }

    fn constant_map() -> EngagementMap {
        EngagementMap::from_parts(vec![], vec![vec![0.5; PERCENTILE_COUNT]]).unwrap()
    }

    #[test]
    fn test_collect_observations_skips_header_and_zero_duration() {
        let temp_dir = TempDir::new().unwrap();
        write_dataset(
            temp_dir.path(),
            "part-00.tsv",
            &[
                record_line("v1", 120, 0.8),
                record_line("v2", 0, 0.5),
                record_line("v3", 3600, 0.25),
            ],
        );

        let observations = collect_observations(temp_dir.path()).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].duration, 120);
        assert_eq!(observations[1].duration, 3600);
    }

    #[test]
    fn test_collect_observations_skips_malformed_rows() {
        let temp_dir = TempDir::new().unwrap();
        write_dataset(
            temp_dir.path(),
            "part-00.tsv",
            &[record_line("v1", 120, 0.8), "not a record".to_string()],
        );

        let observations = collect_observations(temp_dir.path()).unwrap();
        assert_eq!(observations.len(), 1);
    }

    #[test]
    fn test_collect_observations_missing_directory() {
        let result = collect_observations(Path::new("/nonexistent/dataset"));
        assert!(matches!(result, Err(DatasetError::DirectoryNotFound { .. })));
    }

    #[test]
    fn test_relabel_appends_re30() {
        let temp_dir = TempDir::new().unwrap();
        let input_dir = temp_dir.path().join("input");
        let output_dir = temp_dir.path().join("output");
        fs::create_dir(&input_dir).unwrap();
        write_dataset(
            &input_dir,
            "part-00.tsv",
            &[record_line("v1", 120, 0.8), record_line("v2", 120, 0.2)],
        );

        let map = constant_map();
        let total = relabel_dataset(&map, &input_dir, &output_dir).unwrap();
        assert_eq!(total, 2);

        let content = fs::read_to_string(output_dir.join("part-00.tsv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], RELABELED_HEADER);

        // all samples are 0.5: wp 0.8 covers everything, wp 0.2 nothing
        let v1: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(v1[11], "1");
        let v2: Vec<&str> = lines[2].split('\t').collect();
        assert_eq!(v2[11], "0");
    }

    #[test]
    fn test_relabel_malformed_row_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let input_dir = temp_dir.path().join("input");
        let output_dir = temp_dir.path().join("output");
        fs::create_dir(&input_dir).unwrap();
        write_dataset(
            &input_dir,
            "part-00.tsv",
            &[record_line("v1", 120, 0.8), "truncated\trow".to_string()],
        );

        let map = constant_map();
        let result = relabel_dataset(&map, &input_dir, &output_dir);
        assert!(matches!(result, Err(DatasetError::MalformedRecord { line: 3, .. })));
    }
}
