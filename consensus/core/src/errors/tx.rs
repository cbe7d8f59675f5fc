use crate::constants::MAX_SOMPI;
use crate::tx::TransactionOutpoint;
use kaspad_txscript_errors::TxScriptError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxRuleError {
    #[error("transaction has no inputs")]
    NoTxInputs,

    #[error("transaction has duplicate inputs")]
    TxDuplicateInputs,

    #[error("transaction version {0} is unknown")]
    UnknownTxVersion(u16),

    #[error("transaction has non zero gas value while belonging to the native subnetwork")]
    TxHasGas,

    #[error("transaction gas {0} is above the subnetwork limit of {1}")]
    TxGasAboveLimit(u64, u64),

    #[error("a native subnetwork transaction has a payload")]
    NonCoinbaseTxHasPayload,

    #[error("transaction payload hash {0:?} does not commit to the payload")]
    WrongPayloadHash(Option<kaspad_hashes::Hash>),

    #[error("transaction payload is above {0} bytes")]
    TooBigPayload(usize),

    #[error("transaction input #{0} signature script is above {1} bytes")]
    TooBigSignatureScript(usize, usize),

    #[error("transaction output #{0} script public key is above {1} bytes")]
    TooBigScriptPublicKey(usize, usize),

    #[error("transaction input #{0} is not finalized")]
    NotFinalized(usize),

    #[error("coinbase transaction has {0} inputs while none are expected")]
    CoinbaseHasInputs(usize),

    #[error(
        "transaction input #{0} tried to spend coinbase outpoint {1} with blue score of {2} \
         while the merging block blue score is {3} and the coinbase maturity period of {4} hasn't passed yet"
    )]
    ImmatureCoinbaseSpend(usize, TransactionOutpoint, u64, u64, u64),

    #[error("transaction total inputs spending amount overflowed u64")]
    InputAmountOverflow,

    #[error("transaction total inputs spending amount is higher than the max allowed of {}", MAX_SOMPI)]
    InputAmountTooHigh,

    #[error("transaction output {0} has zero value")]
    TxOutZero(usize),

    #[error("transaction output {0} value is higher than the max allowed of {}", MAX_SOMPI)]
    TxOutTooHigh(usize),

    #[error("transaction total outputs value overflowed u64")]
    OutputsValueOverflow,

    #[error("transaction total outputs value is higher than the max allowed of {}", MAX_SOMPI)]
    TotalTxOutTooHigh,

    #[error("transaction tries to spend {0} while its total inputs amount is {1}")]
    SpendTooHigh(u64, u64),

    #[error("one of the transaction sequence locks conditions was not met")]
    SequenceLockConditionsAreNotMet,

    #[error("outpoints corresponding to some transaction inputs are missing from current utxo context")]
    MissingTxOutpoints,

    #[error("transaction mass {0} is above the maximum of {1}")]
    MassTooHigh(u64, u64),

    #[error("failed to verify the signature script: {0}")]
    SignatureInvalid(TxScriptError),
}

pub type TxResult<T> = std::result::Result<T, TxRuleError>;
