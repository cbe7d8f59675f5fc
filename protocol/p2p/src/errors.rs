use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    #[error("malformed message frame: {0}")]
    MalformedFrame(String),

    #[error("payload of {0} bytes exceeds the maximum of {1}")]
    OversizePayload(usize, usize),

    #[error("unknown message command {0}")]
    UnknownCommand(u8),

    #[error("frame checksum mismatch")]
    ChecksumMismatch,

    #[error("wrong network magic {0:#x}, expected {1:#x}")]
    WrongNetworkMagic(u32, u32),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("peer version is unacceptable: {0}")]
    VersionRejected(String),

    #[error("timeout expired while waiting for {0}")]
    Timeout(&'static str),

    #[error("the incoming route of command {0:?} is full")]
    IncomingRouteOverflow(crate::wire::Command),

    #[error("the outgoing route is full")]
    OutgoingRouteOverflow,

    #[error("connection is closed")]
    ConnectionClosed,

    #[error("peer misbehaved: {0}")]
    Misbehavior(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("rejected by peer: {0}")]
    Rejected(String),
}

impl ProtocolError {
    /// Errors which indicate an intentional protocol violation and therefore
    /// contribute to the peer's ban score
    pub fn should_ban(&self) -> bool {
        matches!(
            self,
            ProtocolError::MalformedFrame(_)
                | ProtocolError::OversizePayload(..)
                | ProtocolError::UnknownCommand(_)
                | ProtocolError::ChecksumMismatch
                | ProtocolError::WrongNetworkMagic(..)
                | ProtocolError::MalformedPayload(_)
                | ProtocolError::Misbehavior(_)
        )
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        ProtocolError::Io(err.to_string())
    }
}
