use std::process::ExitStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CommitSizeError>;

#[derive(Error, Debug)]
pub enum CommitSizeError {
    #[error("git log failed ({status}): {stderr}")]
    HistoryQuery { status: ExitStatus, stderr: String },
    #[error("Malformed numstat line {line_number}: {line:?}")]
    MalformedLine { line_number: usize, line: String },
    #[error("No commits matched the requested range")]
    EmptyDistribution,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Git discover error: {0}")]
    Git(#[from] Box<gix::discover::Error>),
    #[error("Reference find error: {0}")]
    RefFind(#[from] Box<gix::reference::find::existing::Error>),
    #[error("Head peel error: {0}")]
    HeadPeel(#[from] Box<gix::head::peel::to_commit::Error>),
}

// Manual From implementations for unboxed to boxed conversions
impl From<gix::discover::Error> for CommitSizeError {
    fn from(err: gix::discover::Error) -> Self {
        CommitSizeError::Git(Box::new(err))
    }
}

impl From<gix::reference::find::existing::Error> for CommitSizeError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        CommitSizeError::RefFind(Box::new(err))
    }
}

impl From<gix::head::peel::to_commit::Error> for CommitSizeError {
    fn from(err: gix::head::peel::to_commit::Error) -> Self {
        CommitSizeError::HeadPeel(Box::new(err))
    }
}
