//! CSV training table loading
//!
//! Reads headerless, index-free tables whose first column is the label and
//! whose remaining columns are features. Empty feature cells are treated as
//! missing values (NaN).

use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::errors::DatasetError;

/// Training table with one label and `feature_count` features per row
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub labels: Vec<f64>,
    pub features: Vec<Vec<f64>>,
    pub feature_count: usize,
}

impl Dataset {
    /// Build a dataset from in-memory rows
    pub fn new(labels: Vec<f64>, features: Vec<Vec<f64>>) -> Result<Self, DatasetError> {
        if labels.is_empty() {
            return Err(DatasetError::Empty);
        }
        if labels.len() != features.len() {
            return Err(DatasetError::RowCountMismatch {
                labels: labels.len(),
                rows: features.len(),
            });
        }
        let feature_count = features.first().map(Vec::len).unwrap_or(0);
        for (i, row) in features.iter().enumerate() {
            if row.len() != feature_count {
                return Err(DatasetError::Ragged {
                    line: i as u64 + 1,
                    expected: feature_count + 1,
                    found: row.len() + 1,
                });
            }
        }

        Ok(Self {
            labels,
            features,
            feature_count,
        })
    }

    /// Load the table at `path`
    /// Expected format: label,feature1,feature2,...
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = open(path)?;

        let mut labels = Vec::new();
        let mut features = Vec::new();
        let mut width = None;

        for_each_record(path, file, |line, record| {
            let expected = *width.get_or_insert(record.len());
            if record.len() < 2 {
                return Err(DatasetError::TooFewColumns { line });
            }
            if record.len() != expected {
                return Err(DatasetError::Ragged {
                    line,
                    expected,
                    found: record.len(),
                });
            }

            let raw_label = &record[0];
            let label = raw_label
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DatasetError::InvalidLabel {
                    line,
                    value: raw_label.to_string(),
                })?;

            labels.push(label);
            features.push(parse_features(line, record, 1)?);
            Ok(())
        })?;

        if labels.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            labels,
            features,
            feature_count: width.unwrap_or(1) - 1,
        })
    }

    /// Rows at `indices`, in the given order
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            feature_count: self.feature_count,
        }
    }

    /// Get number of rows
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label_mean(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        // Running mean stays finite for any finite labels
        self.labels
            .iter()
            .enumerate()
            .fold(0.0, |mean, (i, &y)| {
                let n = (i + 1) as f64;
                mean + (y / n - mean / n)
            })
    }

    /// Per-feature (min, max, missing count), ignoring missing values
    pub fn feature_stats(&self) -> Vec<FeatureStats> {
        let mut stats = vec![FeatureStats::default(); self.feature_count];

        for row in &self.features {
            for (stat, &val) in stats.iter_mut().zip(row) {
                if val.is_nan() {
                    stat.missing += 1;
                } else {
                    stat.min = stat.min.min(val);
                    stat.max = stat.max.max(val);
                }
            }
        }

        stats
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureStats {
    pub min: f64,
    pub max: f64,
    pub missing: usize,
}

impl Default for FeatureStats {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            missing: 0,
        }
    }
}

/// Read a headerless table where every column is a feature (scoring input)
pub fn read_feature_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f64>>, DatasetError> {
    let path = path.as_ref();
    let file = open(path)?;

    let mut rows = Vec::new();
    let mut width = None;
    for_each_record(path, file, |line, record| {
        let expected = *width.get_or_insert(record.len());
        if record.len() != expected {
            return Err(DatasetError::Ragged {
                line,
                expected,
                found: record.len(),
            });
        }
        rows.push(parse_features(line, record, 0)?);
        Ok(())
    })?;

    Ok(rows)
}

fn open(path: &Path) -> Result<File, DatasetError> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DatasetError::Missing(path.to_path_buf()),
        _ => DatasetError::Read {
            path: path.to_path_buf(),
            source: e.into(),
        },
    })
}

fn for_each_record<R, F>(path: &Path, source: R, mut f: F) -> Result<(), DatasetError>
where
    R: Read,
    F: FnMut(u64, &StringRecord) -> Result<(), DatasetError>,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source);

    let mut record = StringRecord::new();
    loop {
        let more = reader.read_record(&mut record).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if !more {
            return Ok(());
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        f(line, &record)?;
    }
}

fn parse_features(line: u64, record: &StringRecord, skip: usize) -> Result<Vec<f64>, DatasetError> {
    record
        .iter()
        .enumerate()
        .skip(skip)
        .map(|(column, cell)| {
            if cell.is_empty() {
                return Ok(f64::NAN);
            }
            cell.parse::<f64>().map_err(|_| DatasetError::InvalidNumber {
                line,
                column: column + 1,
                value: cell.to_string(),
            })
        })
        .collect()
}
