// 远端任务服务模块

pub mod client;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{RemoteClient, DEFAULT_BASE_URL};
pub use service::TaskService;
pub use types::*;
