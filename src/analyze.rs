use crate::cache::{CacheKey, StatsCache};
use crate::cli::{AnalyzeArgs, OutputArgs};
use crate::distribution::{plot_range, ComplementaryHistogram, Distributions};
use crate::error::{CommitSizeError, Result};
use crate::git::{GitRepo, HistoryReader};
use crate::model::{CommitTable, RevisionRange};
use crate::numstat::{self, ParseMode};
use crate::output::{output_json, output_preview, output_table};
use crate::plot::{render_png, PlotOptions};
use anyhow::Context;
use std::path::PathBuf;

/// Everything known about one analysed repository and range.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub repository: PathBuf,
    pub head: String,
    pub range: RevisionRange,
    pub table: CommitTable,
}

/// Runs the history query and parser, going through the cache unless `cache` is `None`.
pub fn collect(
    repo: &GitRepo,
    range: &RevisionRange,
    cache: Option<&StatsCache>,
    mode: ParseMode,
    show_progress: bool,
) -> Result<Analysis> {
    let head = repo.head_revision()?;
    let reader = HistoryReader::new(repo.path()).with_progress(show_progress);
    let compute = || -> Result<CommitTable> {
        let raw = reader.fetch(range)?;
        let table = numstat::parse_with(&raw, mode)?;
        log::info!("parsed {} non-merge commits", table.len());
        Ok(table)
    };

    let table = match cache {
        Some(cache) => {
            let key = CacheKey::derive(repo.path(), &head, range);
            log::debug!("cache entry {}", cache.entry_path(&key).display());
            match mode {
                // a lenient run may have cached a table with malformed lines dropped
                ParseMode::Strict => cache.recompute(&key, compute)?,
                ParseMode::Lenient => cache.get_or_compute(&key, compute)?,
            }
        }
        None => compute()?,
    };

    Ok(Analysis {
        repository: repo.path().to_path_buf(),
        head,
        range: range.clone(),
        table,
    })
}

pub fn exec(args: AnalyzeArgs, output: OutputArgs) -> anyhow::Result<()> {
    if args.max_size == Some(0) {
        return Err(CommitSizeError::InvalidArgument("--max-size must be at least 1".into()).into());
    }

    let repo = GitRepo::open(Some(&args.repository)).context("Failed to open git repository")?;

    let mut range = RevisionRange::new();
    if let Some(after) = &args.after {
        range = range.with_after(after.as_str());
    }
    if let Some(before) = &args.before {
        range = range.with_before(before.as_str());
    }

    let cache = (!args.no_cache).then(|| StatsCache::new(args.cache.as_deref(), repo.path()));
    let mode = if args.strict {
        ParseMode::Strict
    } else {
        ParseMode::Lenient
    };

    let analysis = collect(&repo, &range, cache.as_ref(), mode, true)
        .context("Failed to collect commit statistics")?;

    if analysis.table.is_empty() {
        return Err(CommitSizeError::EmptyDistribution)
            .context(format!("No non-merge commits in {}", analysis.repository.display()));
    }

    let wants_plot = output.plot_outfile.is_some() || output.preview;
    if wants_plot {
        let x_range = plot_range(&analysis.table, args.max_size)?;
        let histograms = ComplementaryHistogram::for_table(&analysis.table, None, args.max_size)
            .context("Failed to bin commit sizes")?;

        if let Some(path) = &output.plot_outfile {
            let options = PlotOptions {
                mark_hours: output.mark_hours,
                ..PlotOptions::default()
            };
            render_png(&histograms, x_range, &options, path)
                .with_context(|| format!("Failed to write plot to {}", path.display()))?;
        }
        if output.preview {
            output_preview(&analysis, &histograms, x_range, output.mark_hours)?;
        }
    }

    if output.json || !wants_plot {
        let distributions = Distributions::from_table(&analysis.table, args.max_size)
            .context("Failed to compute commit size distribution")?;
        if output.json {
            output_json(&analysis, &distributions, output.direction)?;
        } else {
            output_table(&distributions, output.direction)?;
        }
    }

    Ok(())
}
