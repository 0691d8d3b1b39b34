use thiserror::Error;

use crate::runner::{RunnerId, SplitId};

/// Everything a timing operation can refuse or fail with.
///
/// None of these are fatal: the caller reports them and the session is left
/// exactly as it was before the call.
#[derive(Error, Debug)]
pub enum RaceError {
    #[error("the clock is not running")]
    ClockNotRunning,

    #[error("the clock has not been started")]
    ClockNotStarted,

    #[error("runner {0} has already finished")]
    AlreadyFinished(RunnerId),

    #[error("runner names are locked once the clock has time on it")]
    NamesLocked,

    #[error("runner {0} not found")]
    RunnerNotFound(RunnerId),

    #[error("split {split} not found for runner {runner}")]
    SplitNotFound { runner: RunnerId, split: SplitId },

    #[error("runner name must not be empty")]
    EmptyName,

    #[error("no valid runner names found")]
    NoValidNames,

    #[error("there are no splits to export")]
    NothingToExport,

    #[error("there is no race data to analyse yet")]
    NothingToAnalyze,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("analysis failed: {0}")]
    Analysis(String),
}

pub type Result<T> = std::result::Result<T, RaceError>;
