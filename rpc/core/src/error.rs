use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RpcError {
    #[error("method not found")]
    MethodNotFound,

    #[error("requested item was not found: {0}")]
    NotFound(String),

    #[error("block rejected: {0}")]
    BlockRejected(String),

    #[error("transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    General(String),
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;
