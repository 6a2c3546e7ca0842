// 命令分发模块

pub mod command;
pub mod form;

pub use command::{CommandDispatcher, DriveCloneOptions, TransferOptions};
pub use form::{AddDownloadForm, ProbeTimings};
