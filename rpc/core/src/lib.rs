pub mod api;
pub mod error;
pub mod model;
pub mod notify;

pub use api::RpcApi;
pub use error::{RpcError, RpcResult};
pub use model::*;
pub use notify::{Notification, NotificationScope};
