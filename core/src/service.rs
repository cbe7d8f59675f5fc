use crate::core::Core;
use std::sync::Arc;
use std::thread::JoinHandle;

/// A blocking (thread-based) service hosted by [`Core`]
pub trait Service: Send + Sync {
    fn ident(self: Arc<Self>) -> &'static str;
    fn start(self: Arc<Self>, core: Arc<Core>) -> Vec<JoinHandle<()>>;
    fn stop(self: Arc<Self>);
}
