use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinbaseError {
    #[error("coinbase payload length is {0} while the minimum length is {1}")]
    PayloadLenBelowMin(usize, usize),

    #[error("coinbase payload length is {0} while the maximum length is {1}")]
    PayloadLenAboveMax(usize, usize),

    #[error("coinbase payload length {0} is too short to contain its script public key ({1} bytes required)")]
    PayloadCantContainScriptPublicKey(usize, usize),

    #[error("coinbase payload extra data length {0} is above the maximum of {1}")]
    PayloadExtraDataAboveMax(usize, usize),
}

pub type CoinbaseResult<T> = std::result::Result<T, CoinbaseError>;
