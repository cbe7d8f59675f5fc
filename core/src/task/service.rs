use futures_util::future::BoxFuture;
use std::sync::Arc;

pub type AsyncServiceResult<T> = std::result::Result<T, AsyncServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum AsyncServiceError {
    #[error("async service error: {0}")]
    Service(String),
}

pub type AsyncServiceFuture = BoxFuture<'static, AsyncServiceResult<()>>;

/// A cooperative service hosted on the shared tokio runtime
pub trait AsyncService: Send + Sync {
    fn ident(self: Arc<Self>) -> &'static str;
    fn start(self: Arc<Self>) -> AsyncServiceFuture;
    fn signal_exit(self: Arc<Self>);
    fn stop(self: Arc<Self>) -> AsyncServiceFuture;
}
