use crate::error::{CommitSizeError, Result};
use crate::model::{CdfPoint, CommitTable, Direction, Series, SeriesOutput};

/// Fraction of `sorted` (ascending) that is `<= x`.
pub fn cdf(sorted: &[u64], x: u64) -> Result<f64> {
    if sorted.is_empty() {
        return Err(CommitSizeError::EmptyDistribution);
    }
    let at_or_below = sorted.partition_point(|&v| v <= x);
    Ok(at_or_below as f64 / sorted.len() as f64)
}

/// Fraction of `sorted` (ascending) that is `>= x`.
pub fn ccdf(sorted: &[u64], x: u64) -> Result<f64> {
    if sorted.is_empty() {
        return Err(CommitSizeError::EmptyDistribution);
    }
    let below = sorted.partition_point(|&v| v < x);
    Ok((sorted.len() - below) as f64 / sorted.len() as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalDistribution {
    sorted: Vec<u64>,
}

impl EmpiricalDistribution {
    pub fn from_values<I: IntoIterator<Item = u64>>(values: I) -> Result<Self> {
        let mut sorted: Vec<u64> = values.into_iter().collect();
        if sorted.is_empty() {
            return Err(CommitSizeError::EmptyDistribution);
        }
        sorted.sort_unstable();
        Ok(Self { sorted })
    }

    pub fn values(&self) -> &[u64] {
        &self.sorted
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn min(&self) -> u64 {
        self.sorted[0]
    }

    pub fn max(&self) -> u64 {
        self.sorted[self.sorted.len() - 1]
    }

    pub fn cdf(&self, x: u64) -> f64 {
        let n = self.sorted.len() as f64;
        self.sorted.partition_point(|&v| v <= x) as f64 / n
    }

    pub fn ccdf(&self, x: u64) -> f64 {
        let n = self.sorted.len();
        (n - self.sorted.partition_point(|&v| v < x)) as f64 / n as f64
    }

    /// One point per distinct sample value, ascending by value.
    pub fn points(&self, direction: Direction) -> Vec<CdfPoint> {
        let mut points: Vec<CdfPoint> = Vec::new();
        for &value in &self.sorted {
            if points.last().is_some_and(|p| p.value == value) {
                continue;
            }
            let probability = match direction {
                Direction::Ascending => self.cdf(value),
                Direction::Descending => self.ccdf(value),
            };
            points.push(CdfPoint { value, probability });
        }
        points
    }
}

/// The three per-series distributions of one commit table.
#[derive(Debug, Clone)]
pub struct Distributions {
    series: Vec<(Series, EmpiricalDistribution)>,
}

impl Distributions {
    /// Builds all series, keeping only samples `<= max_size` when a bound is given.
    ///
    /// A series the bound empties is left out with a warning. An empty table is
    /// `EmptyDistribution`; a bound that empties every series is `InvalidArgument`.
    pub fn from_table(table: &CommitTable, max_size: Option<u64>) -> Result<Self> {
        if table.is_empty() {
            return Err(CommitSizeError::EmptyDistribution);
        }

        let mut series = Vec::with_capacity(Series::ALL.len());
        for &s in &Series::ALL {
            let values = table
                .values(s)
                .filter(|&v| max_size.map_or(true, |bound| v <= bound));
            match EmpiricalDistribution::from_values(values) {
                Ok(dist) => series.push((s, dist)),
                Err(CommitSizeError::EmptyDistribution) => {
                    log::warn!(
                        "every {} sample exceeds the size bound {:?}; series skipped",
                        s.name(),
                        max_size
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if series.is_empty() {
            return Err(CommitSizeError::InvalidArgument(format!(
                "size bound {} excludes all {} commits",
                max_size.unwrap_or_default(),
                table.len()
            )));
        }
        Ok(Self { series })
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Series, EmpiricalDistribution)> {
        self.series.iter()
    }

    pub fn get(&self, series: Series) -> Option<&EmpiricalDistribution> {
        self.series.iter().find(|(s, _)| *s == series).map(|(_, d)| d)
    }

    pub fn to_output(&self, direction: Direction) -> Vec<SeriesOutput> {
        self.series
            .iter()
            .map(|(s, d)| SeriesOutput {
                name: *s,
                points: d.points(direction),
            })
            .collect()
    }
}

/// Horizontal extent used for binning and plotting.
///
/// Without a bound this spans every sample of every series. With a bound it
/// starts at zero and ends at the bound or the largest commit, whichever is
/// smaller, so the axis never reaches past the data.
pub fn plot_range(table: &CommitTable, max_size: Option<u64>) -> Result<(f64, f64)> {
    if table.is_empty() {
        return Err(CommitSizeError::EmptyDistribution);
    }
    let max_changed = table.values(Series::Changed).max().unwrap_or(0);
    let (lo, hi) = match max_size {
        Some(bound) => (0, bound.min(max_changed)),
        None => {
            let all = || Series::ALL.iter().flat_map(|&s| table.values(s));
            (all().min().unwrap_or(0), all().max().unwrap_or(0))
        }
    };
    let (lo, hi) = (lo as f64, hi as f64);
    if lo == hi {
        Ok((lo - 0.5, hi + 0.5))
    } else {
        Ok((lo, hi))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    /// Fraction of in-range samples falling in this bin or any later one.
    pub probability: f64,
}

/// Normalised histogram accumulated from the right, drawn as a descending step curve.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplementaryHistogram {
    pub series: Series,
    pub bins: Vec<HistogramBin>,
    pub included: usize,
}

impl ComplementaryHistogram {
    pub fn compute(series: Series, samples: &[u64], bins: usize, range: (f64, f64)) -> Result<Self> {
        let (lo, hi) = range;
        if bins == 0 {
            return Err(CommitSizeError::InvalidArgument("bin count must be positive".into()));
        }
        if lo.is_nan() || hi.is_nan() || lo >= hi {
            return Err(CommitSizeError::InvalidArgument(format!(
                "empty histogram range {lo}..{hi}"
            )));
        }

        let width = (hi - lo) / bins as f64;
        let mut counts = vec![0usize; bins];
        for &sample in samples {
            let v = sample as f64;
            if v < lo || v > hi {
                continue;
            }
            // last bin is closed on the right
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        let included: usize = counts.iter().sum();
        if included == 0 {
            log::warn!("no {} samples fall inside {lo}..{hi}", series.name());
        }

        let mut remaining = included;
        let bins = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let probability = if included == 0 {
                    0.0
                } else {
                    remaining as f64 / included as f64
                };
                remaining -= count;
                HistogramBin {
                    start: lo + width * i as f64,
                    end: lo + width * (i + 1) as f64,
                    probability,
                }
            })
            .collect();

        Ok(Self {
            series,
            bins,
            included,
        })
    }

    /// One histogram per series with `bins` defaulting to the number of commits.
    pub fn for_table(
        table: &CommitTable,
        bins: Option<usize>,
        max_size: Option<u64>,
    ) -> Result<Vec<Self>> {
        let range = plot_range(table, max_size)?;
        let bins = bins.unwrap_or(table.len());
        Series::ALL
            .iter()
            .map(|&s| {
                let samples: Vec<u64> = table.values(s).collect();
                Self::compute(s, &samples, bins, range)
            })
            .collect()
    }
}
