use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop grading before any stage could produce a verdict.
#[derive(Debug, Error)]
pub enum Error {
    #[error("entity `{0}` not found")]
    NotFound(String),
    #[error("failed in IO")]
    IO(#[from] io::Error),
    #[error("argument provided is error: {0}")]
    Argument(String),
    #[error("Invalid file `{0}`")]
    InvalidFile(String),
    #[error("status code {0} is not registered")]
    UnknownCode(u16),
    #[error("environment error: {0}")]
    Environment(String),
    #[error("failed to launch `{program}`")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("config error")]
    Config(#[from] serde_yaml::Error),
    #[error("pattern error")]
    Pattern(#[from] regex::Error),
}
