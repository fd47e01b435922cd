use crate::model::Direction;
use anyhow::Result;
use clap::{Args, Parser};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "commit-size")]
#[command(about = "Plot the size distribution of non-merge git commits")]
#[command(long_about = "Computes the distribution of added, removed and total changed lines \
over every non-merge commit reachable from HEAD. History analysis is linear in the number of \
commits and is cached between runs, keyed by repository, HEAD and time bounds.")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub analyze: AnalyzeArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    #[arg(long, help = "Log level (overridden by RUST_LOG)", default_value = "warn")]
    pub log_level: String,
}

#[derive(Args, Clone, Debug)]
pub struct AnalyzeArgs {
    #[arg(help = "Path to the repository to analyse")]
    pub repository: PathBuf,

    #[arg(long, help = "Skip commits before this timespec (passed to git log)")]
    pub after: Option<String>,

    #[arg(long, help = "Skip commits after this timespec (passed to git log)")]
    pub before: Option<String>,

    #[arg(long, help = "Disregard commits larger than this many changed lines")]
    pub max_size: Option<u64>,

    #[arg(long, help = "Fail on malformed numstat lines instead of skipping them (always re-reads history)")]
    pub strict: bool,

    #[arg(long, help = "Directory for cached history tables (default: system temp dir)")]
    pub cache: Option<PathBuf>,

    #[arg(long, help = "Do not read or write the history cache")]
    pub no_cache: bool,
}

#[derive(Args, Clone, Debug)]
pub struct OutputArgs {
    #[arg(value_name = "PLOT_OUTFILE", help = "Path to write a PNG plot to (curves, gridlines and a colour-keyed legend; no text labels)")]
    pub plot_outfile: Option<PathBuf>,

    #[arg(long, help = "Draw a preview of the plot in the terminal")]
    pub preview: bool,

    #[arg(long, help = "Mark every 400 lines, roughly one hour of review")]
    pub mark_hours: bool,

    #[arg(long, help = "Print the distribution as JSON")]
    pub json: bool,

    #[arg(long, value_enum, default_value_t = Direction::Descending, help = "Tabulate P(X <= x) (ascending) or P(X >= x) (descending)")]
    pub direction: Direction,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(&self.log_level)
        ).init();

        crate::analyze::exec(self.analyze, self.output)
    }
}
