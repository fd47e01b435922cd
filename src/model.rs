use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// Line counts of a single non-merge commit, summed over its non-binary files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitRecord {
    pub added: u64,
    pub removed: u64,
    pub changed: u64,
}

impl CommitRecord {
    pub fn new(added: u64, removed: u64) -> Self {
        Self {
            added,
            removed,
            changed: added.saturating_add(removed),
        }
    }

    pub fn get(&self, series: Series) -> u64 {
        match series {
            Series::Added => self.added,
            Series::Removed => self.removed,
            Series::Changed => self.changed,
        }
    }
}

/// Per-commit records in the order `git log` emitted them (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitTable {
    records: Vec<CommitRecord>,
}

impl CommitTable {
    pub fn new(records: Vec<CommitRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CommitRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn values(&self, series: Series) -> impl Iterator<Item = u64> + '_ {
        self.records.iter().map(move |r| r.get(series))
    }
}

impl FromIterator<CommitRecord> for CommitTable {
    fn from_iter<I: IntoIterator<Item = CommitRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Series {
    Added,
    Removed,
    Changed,
}

impl Series {
    pub const ALL: [Series; 3] = [Series::Added, Series::Removed, Series::Changed];

    pub fn name(&self) -> &'static str {
        match self {
            Series::Added => "added",
            Series::Removed => "removed",
            Series::Changed => "changed",
        }
    }

    pub fn rgb(&self) -> [u8; 3] {
        match self {
            Series::Added => [0, 160, 0],
            Series::Removed => [220, 0, 0],
            Series::Changed => [0, 0, 220],
        }
    }
}

/// Optional time bounds handed verbatim to `git log --after/--before`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionRange {
    pub after: Option<String>,
    pub before: Option<String>,
}

impl RevisionRange {
    pub fn new() -> Self {
        Self { after: None, before: None }
    }

    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = Some(after.into());
        self
    }

    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = Some(before.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Fraction of commits at or below a size.
    Ascending,
    /// Fraction of commits at or above a size.
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CdfPoint {
    pub value: u64,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesOutput {
    pub name: Series,
    pub points: Vec<CdfPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub head: String,
    pub after: Option<String>,
    pub before: Option<String>,
    pub commit_count: usize,
    pub direction: Direction,
    pub series: Vec<SeriesOutput>,
}
