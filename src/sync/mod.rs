// 任务同步模块

pub mod events;
pub mod synchronizer;

pub use events::{diff_snapshots, EventCallback, SyncEvent};
pub use synchronizer::{PollingConfig, TaskSnapshot, TaskSynchronizer};
