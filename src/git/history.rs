use crate::error::{CommitSizeError, Result};
use crate::model::RevisionRange;
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Runs `git log --numstat` over the non-merge history of one repository.
pub struct HistoryReader {
    repository: PathBuf,
    git: OsString,
    show_progress: bool,
}

impl HistoryReader {
    pub fn new<P: AsRef<Path>>(repository: P) -> Self {
        Self {
            repository: repository.as_ref().to_path_buf(),
            git: OsString::from("git"),
            show_progress: false,
        }
    }

    pub fn with_git_binary(mut self, git: impl Into<OsString>) -> Self {
        self.git = git.into();
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn args(&self, range: &RevisionRange) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-C".into(),
            self.repository.clone().into_os_string(),
            "log".into(),
            "--no-merges".into(),
            "--format=%H".into(),
            "--numstat".into(),
        ];
        if let Some(after) = &range.after {
            args.push("--after".into());
            args.push(after.into());
        }
        if let Some(before) = &range.before {
            args.push("--before".into());
            args.push(before.into());
        }
        args
    }

    /// Raw stdout of the history query. A non-zero exit is reported with its stderr.
    pub fn fetch(&self, range: &RevisionRange) -> Result<Vec<u8>> {
        let args = self.args(range);
        log::debug!("running {:?} {:?}", self.git, args);

        let pb = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message("Reading commit history...");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        let output = Command::new(&self.git).args(&args).output();
        pb.finish_and_clear();
        let output = output?;

        if !output.status.success() {
            return Err(CommitSizeError::HistoryQuery {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        log::debug!("git log produced {} bytes", output.stdout.len());
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn args_omit_absent_bounds() {
        let reader = HistoryReader::new("/tmp/repo");
        let args = reader.args(&RevisionRange::new());
        assert_eq!(
            args,
            vec!["-C", "/tmp/repo", "log", "--no-merges", "--format=%H", "--numstat"]
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn args_pass_bounds_as_separate_values() {
        let reader = HistoryReader::new("repo");
        let range = RevisionRange::new()
            .with_after("2 weeks ago")
            .with_before("2024-01-01");
        let args = reader.args(&range);
        let tail: Vec<_> = args[6..].iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(tail, vec!["--after", "2 weeks ago", "--before", "2024-01-01"]);
    }

    #[test]
    fn failing_query_carries_stderr() {
        let dir = tempdir().unwrap();
        let reader = HistoryReader::new(dir.path().join("missing"));
        match reader.fetch(&RevisionRange::new()) {
            Err(CommitSizeError::HistoryQuery { stderr, .. }) => assert!(!stderr.is_empty()),
            // no git on this machine
            Err(CommitSizeError::Io(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_binary_is_io_error() {
        let reader = HistoryReader::new(".").with_git_binary("definitely-not-a-git-binary-xyz");
        assert!(matches!(
            reader.fetch(&RevisionRange::new()),
            Err(CommitSizeError::Io(_))
        ));
    }
}
