use crate::analyze::Analysis;
use crate::distribution::{ComplementaryHistogram, Distributions};
use crate::model::{Direction, DistributionOutput, Series, SCHEMA_VERSION};
use crate::plot::hour_marks;
use anyhow::Result;
use chrono::Utc;
use console::style;
use std::fmt::Write as _;

const PREVIEW_WIDTH: usize = 72;
const PREVIEW_HEIGHT: usize = 20;

pub fn output_table(distributions: &Distributions, direction: Direction) -> Result<()> {
    for (series, dist) in distributions.iter() {
        println!("{}", style(series.name()).bold());
        println!("value, probability");
        for point in dist.points(direction) {
            println!("{}, {:.6}", point.value, point.probability);
        }
        println!();
    }
    Ok(())
}

pub fn build_json(
    analysis: &Analysis,
    distributions: &Distributions,
    direction: Direction,
) -> DistributionOutput {
    DistributionOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        repository_path: analysis.repository.to_string_lossy().to_string(),
        head: analysis.head.clone(),
        after: analysis.range.after.clone(),
        before: analysis.range.before.clone(),
        commit_count: analysis.table.len(),
        direction,
        series: distributions.to_output(direction),
    }
}

pub fn output_json(
    analysis: &Analysis,
    distributions: &Distributions,
    direction: Direction,
) -> Result<()> {
    let output = build_json(analysis, distributions, direction);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn output_preview(
    analysis: &Analysis,
    histograms: &[ComplementaryHistogram],
    range: (f64, f64),
    mark_hours: bool,
) -> Result<()> {
    println!("{}", style("Size of non-merge commits").bold());
    if let Some(after) = &analysis.range.after {
        println!("after {}", after);
    }
    if let Some(before) = &analysis.range.before {
        println!("before {}", before);
    }
    print!("{}", render_preview(histograms, range, mark_hours, true));
    println!(
        "{} added  {} removed  {} changed  ({} commits)",
        style("a").green(),
        style("r").red(),
        style("c").blue(),
        analysis.table.len()
    );
    Ok(())
}

/// Character chart of the complementary curves. Later series overwrite earlier ones.
pub fn render_preview(
    histograms: &[ComplementaryHistogram],
    range: (f64, f64),
    mark_hours: bool,
    colored: bool,
) -> String {
    let (lo, hi) = range;
    let mut grid = vec![vec![' '; PREVIEW_WIDTH]; PREVIEW_HEIGHT];
    let mut owner: Vec<Vec<Option<Series>>> = vec![vec![None; PREVIEW_WIDTH]; PREVIEW_HEIGHT];

    let column_x = |col: usize| lo + (col as f64 + 0.5) / PREVIEW_WIDTH as f64 * (hi - lo);

    if mark_hours {
        for mark in hour_marks(hi) {
            let col = (((mark as f64 - lo) / (hi - lo)) * PREVIEW_WIDTH as f64) as usize;
            if col < PREVIEW_WIDTH {
                for row in grid.iter_mut() {
                    row[col] = '│';
                }
            }
        }
    }

    for histogram in histograms {
        let symbol = series_symbol(histogram.series);
        for col in 0..PREVIEW_WIDTH {
            let x = column_x(col);
            let Some(bin) = histogram.bins.iter().find(|b| x >= b.start && x < b.end).or_else(|| {
                histogram.bins.last().filter(|b| x >= b.end)
            }) else {
                continue;
            };
            let level = (bin.probability * (PREVIEW_HEIGHT - 1) as f64).round() as usize;
            let row = PREVIEW_HEIGHT - 1 - level.min(PREVIEW_HEIGHT - 1);
            grid[row][col] = symbol;
            owner[row][col] = Some(histogram.series);
        }
    }

    let mut out = String::new();
    for (r, row) in grid.iter().enumerate() {
        let level = 1.0 - r as f64 / (PREVIEW_HEIGHT - 1) as f64;
        let label = if r % 5 == 0 || r == PREVIEW_HEIGHT - 1 {
            format!("{level:>5.2}")
        } else {
            " ".repeat(5)
        };
        let _ = write!(out, "{label} ┤");
        for (c, &ch) in row.iter().enumerate() {
            match (owner[r][c], colored) {
                (Some(series), true) => {
                    let _ = write!(out, "{}", paint(series, ch));
                }
                _ => out.push(ch),
            }
        }
        out.push('\n');
    }
    let _ = writeln!(out, "      └{}", "─".repeat(PREVIEW_WIDTH));
    let lo_label = format!("{lo:.0}");
    let hi_label = format!("{hi:.0}");
    let gap = PREVIEW_WIDTH.saturating_sub(lo_label.len() + hi_label.len());
    let _ = writeln!(out, "       {lo_label}{}{hi_label}", " ".repeat(gap));
    out
}

fn series_symbol(series: Series) -> char {
    match series {
        Series::Added => 'a',
        Series::Removed => 'r',
        Series::Changed => 'c',
    }
}

fn paint(series: Series, ch: char) -> console::StyledObject<char> {
    match series {
        Series::Added => style(ch).green(),
        Series::Removed => style(ch).red(),
        Series::Changed => style(ch).blue(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommitRecord, CommitTable, RevisionRange};
    use std::path::PathBuf;

    fn analysis() -> Analysis {
        Analysis {
            repository: PathBuf::from("/work/project"),
            head: "a".repeat(40),
            range: RevisionRange::new().with_after("2020-01-01"),
            table: CommitTable::new(vec![CommitRecord::new(10, 2), CommitRecord::new(5, 0)]),
        }
    }

    #[test]
    fn json_document_carries_context() {
        let a = analysis();
        let d = Distributions::from_table(&a.table, None).unwrap();
        let doc = build_json(&a, &d, Direction::Descending);
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["commit_count"], 2);
        assert_eq!(v["after"], "2020-01-01");
        assert!(v["before"].is_null());
        assert_eq!(v["direction"], "descending");
        let names: Vec<_> = v["series"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["added", "removed", "changed"]);
        assert_eq!(v["series"][2]["points"][0]["value"], 5);
        assert_eq!(v["series"][2]["points"][0]["probability"], 1.0);
    }

    #[test]
    fn preview_has_fixed_shape() {
        let a = analysis();
        let hs = ComplementaryHistogram::for_table(&a.table, None, None).unwrap();
        let text = render_preview(&hs, (0.0, 12.0), false, false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), PREVIEW_HEIGHT + 2);
        assert!(lines[0].contains('c') || lines[0].contains('a') || lines[0].contains('r'));
        assert!(!text.contains('│'));
    }

    #[test]
    fn preview_marks_review_hours() {
        let a = analysis();
        let hs = ComplementaryHistogram::for_table(&a.table, Some(10), None).unwrap();
        let text = render_preview(&hs, (0.0, 1000.0), true, false);
        assert!(text.contains('│'));
    }
}
