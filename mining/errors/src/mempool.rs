use kaspad_consensus_core::{
    errors::tx::TxRuleError,
    tx::{TransactionId, TransactionOutpoint},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// A consensus transaction rule error
    #[error(transparent)]
    RejectTxRule(TxRuleError),

    #[error("transaction {0} is already in the mempool")]
    RejectDuplicate(TransactionId),

    #[error("output {0} already spent by transaction {1} in the memory pool")]
    RejectDoubleSpendInMempool(TransactionOutpoint, TransactionId),

    #[error("transaction {0} is an orphan where orphan transactions are disallowed")]
    RejectDisallowedOrphan(TransactionId),

    #[error("orphan transaction size of {0} bytes is larger than max allowed size of {1} bytes")]
    RejectBadOrphan(u64, u64),

    #[error("number of orphan transactions exceeds the maximum allowed of {0}")]
    RejectOrphanPoolIsFull(u64),

    #[error("transaction {0} fee rate of {1} sompi/gram is below the minimum of {2}")]
    RejectInsufficientFee(TransactionId, u64, u64),

    #[error("transaction {0} mass of {1} is higher than the maximum of {2}")]
    RejectMassTooHigh(TransactionId, u64, u64),

    #[error("coinbase transaction {0} is not allowed in the memory pool")]
    RejectCoinbase(TransactionId),

    #[error("transaction {0} was not found in the mempool")]
    RejectMissingTransaction(TransactionId),

    #[error("transaction {0} has a non standard script public key")]
    RejectNonStandard(TransactionId),
}

impl From<TxRuleError> for RuleError {
    fn from(err: TxRuleError) -> Self {
        RuleError::RejectTxRule(err)
    }
}

pub type RuleResult<T> = std::result::Result<T, RuleError>;
