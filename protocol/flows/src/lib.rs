pub mod flow_context;
pub mod flows;

pub use flow_context::FlowContext;
