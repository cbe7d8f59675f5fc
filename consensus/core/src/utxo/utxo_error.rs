use crate::tx::TransactionOutpoint;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UtxoAlgebraError {
    #[error("outpoint {0} is added twice within the same diff")]
    DuplicateAddPoint(TransactionOutpoint),

    #[error("outpoint {0} is removed twice within the same diff")]
    DuplicateRemovePoint(TransactionOutpoint),

    #[error("cannot remove outpoint {0} which is missing from the collection")]
    RemovePointMissing(TransactionOutpoint),

    #[error("cannot add outpoint {0} which already exists in the collection")]
    AddPointExists(TransactionOutpoint),
}

pub type UtxoResult<T> = Result<T, UtxoAlgebraError>;
