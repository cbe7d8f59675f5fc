mod service;

pub use service::RpcCoreService;
