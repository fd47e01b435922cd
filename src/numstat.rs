//! Parser for `git log --no-merges --format=%H --numstat` output.
//!
//! The stream is a run of blocks, one per commit:
//!
//! ```text
//! <40 hex digit commit id>
//!
//! <added>\t<removed>\t<path>
//! ...
//! ```
//!
//! A block only ends when the next header arrives or the stream runs out, so
//! the parser keeps an explicit state and emits on both transitions.

use crate::error::{CommitSizeError, Result};
use crate::model::{CommitRecord, CommitTable};

const BINARY_MARKER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Skip malformed lines with a warning.
    #[default]
    Lenient,
    /// Fail on the first malformed line.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingFirstHeader,
    InBlock { added: u64, removed: u64 },
}

enum Line<'a> {
    Header,
    Blank,
    Binary,
    Counts(u64, u64),
    Malformed(&'a str),
}

pub fn parse(raw: &[u8]) -> Result<CommitTable> {
    parse_with(raw, ParseMode::default())
}

pub fn parse_with(raw: &[u8], mode: ParseMode) -> Result<CommitTable> {
    let text = String::from_utf8_lossy(raw);
    let mut records = Vec::new();
    let mut state = State::AwaitingFirstHeader;

    for (idx, line) in text.lines().enumerate() {
        let line_number = idx + 1;
        match (classify(line), state) {
            (Line::Header, State::InBlock { added, removed }) => {
                records.push(CommitRecord::new(added, removed));
                state = State::InBlock { added: 0, removed: 0 };
            }
            (Line::Header, State::AwaitingFirstHeader) => {
                state = State::InBlock { added: 0, removed: 0 };
            }
            (Line::Blank, _) | (Line::Binary, State::InBlock { .. }) => {}
            (Line::Counts(a, r), State::InBlock { added, removed }) => {
                state = State::InBlock {
                    added: added.saturating_add(a),
                    removed: removed.saturating_add(r),
                };
            }
            (Line::Malformed(bad), _) => malformed(mode, line_number, bad)?,
            // stat lines with no commit header above them
            (Line::Binary | Line::Counts(..), State::AwaitingFirstHeader) => {
                malformed(mode, line_number, line)?
            }
        }
    }

    if let State::InBlock { added, removed } = state {
        records.push(CommitRecord::new(added, removed));
    }

    Ok(CommitTable::new(records))
}

fn malformed(mode: ParseMode, line_number: usize, line: &str) -> Result<()> {
    match mode {
        ParseMode::Strict => Err(CommitSizeError::MalformedLine {
            line_number,
            line: line.to_string(),
        }),
        ParseMode::Lenient => {
            log::warn!("skipping malformed numstat line {line_number}: {line:?}");
            Ok(())
        }
    }
}

fn classify(line: &str) -> Line<'_> {
    if is_commit_id(line) {
        return Line::Header;
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }

    // runs of whitespace separate the counts; the path keeps its inner spaces
    let Some((added, rest)) = trimmed.split_once(char::is_whitespace) else {
        return Line::Malformed(line);
    };
    let Some((removed, path)) = rest.trim_start().split_once(char::is_whitespace) else {
        return Line::Malformed(line);
    };
    if path.trim().is_empty() {
        return Line::Malformed(line);
    }

    if added == BINARY_MARKER || removed == BINARY_MARKER {
        return Line::Binary;
    }

    match (added.parse::<u64>(), removed.parse::<u64>()) {
        (Ok(a), Ok(r)) => Line::Counts(a, r),
        _ => Line::Malformed(line),
    }
}

fn is_commit_id(line: &str) -> bool {
    line.len() == 40 && line.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
