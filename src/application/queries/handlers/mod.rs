//! Query Handlers 实现

mod subscription_handlers;

pub use subscription_handlers::*;
