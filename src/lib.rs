// Hana Download Client Library
// 远端下载任务客户端核心库

// 错误类型
pub mod error;

// 配置管理模块
pub mod config;

// 日志模块
pub mod logging;

// 公共模块（链接解析、限速曲线、防抖等）
pub mod common;

// 远端任务服务模块
pub mod remote;

// 任务同步模块
pub mod sync;

// 命令分发模块
pub mod dispatcher;

// 导出常用类型
pub use config::AppConfig;
pub use dispatcher::{AddDownloadForm, CommandDispatcher, DriveCloneOptions, TransferOptions};
pub use error::{ClientError, ClientResult, ValidationError};
pub use remote::{DownloadTask, RemoteClient, TaskService, TaskStatus};
pub use sync::{PollingConfig, SyncEvent, TaskSynchronizer};
