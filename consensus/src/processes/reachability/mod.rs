mod extensions;
pub mod inquirer;
pub mod interval;
mod reindex;
#[cfg(test)]
pub mod tests;
mod tree;

use crate::model::stores::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReachabilityError {
    #[error("data store error")]
    StoreError(#[from] StoreError),

    #[error("data overflow error: {0}")]
    DataOverflow(String),

    #[error("data inconsistency error")]
    DataInconsistency,

    #[error("query is inconsistent with the current reachability tree (block {0} is unknown)")]
    UnknownBlock(kaspad_hashes::Hash),
}

pub type Result<T> = std::result::Result<T, ReachabilityError>;
