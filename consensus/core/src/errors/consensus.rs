use kaspad_hashes::Hash;
use thiserror::Error;

use super::{block::RuleError, difficulty::DifficultyError};

#[derive(Error, Debug, Clone)]
pub enum ConsensusError {
    #[error("block rule error: {0}")]
    RuleError(#[from] RuleError),

    #[error("difficulty error: {0}")]
    DifficultyError(#[from] DifficultyError),

    #[error("block {0} not found")]
    BlockNotFound(Hash),

    #[error("block {0} has a missing body")]
    MissingBlockBody(Hash),

    #[error("some data is missing for block {0}")]
    MissingData(Hash),

    #[error("got unexpected pruning point")]
    UnexpectedPruningPoint,

    #[error("{0}")]
    General(&'static str),
}

pub type ConsensusResult<T> = std::result::Result<T, ConsensusError>;
