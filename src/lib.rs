//! Empirical size distribution of non-merge git commits.
//!
//! The pipeline runs `git log --numstat`, folds its output into one
//! [`model::CommitRecord`] per commit, caches the resulting table on disk and
//! derives cumulative and complementary distributions for plotting.

pub mod analyze;
pub mod cache;
pub mod cli;
pub mod distribution;
pub mod error;
pub mod git;
pub mod model;
pub mod numstat;
pub mod output;
pub mod plot;

pub use error::{CommitSizeError, Result};
