//! 任务服务接口
//!
//! 同步器和命令分发器只依赖此 trait，测试中可替换为内存实现

use crate::error::ClientResult;
use crate::remote::types::{
    AddTaskRequest, CreatedTask, DownloadTask, DriveCloneRequest, DriveMetadata, DriveStatus,
    ServiceSettings,
};
use async_trait::async_trait;

/// 远端任务服务
#[async_trait]
pub trait TaskService: Send + Sync {
    /// 获取全部任务
    async fn list_tasks(&self) -> ClientResult<Vec<DownloadTask>>;

    /// 创建下载任务
    async fn add_task(&self, request: &AddTaskRequest) -> ClientResult<CreatedTask>;

    async fn pause(&self, task_id: &str) -> ClientResult<()>;

    async fn resume(&self, task_id: &str) -> ClientResult<()>;

    /// 设置限速（KB/s，0 表示不限速）
    async fn set_limit(&self, task_id: &str, limit_kbps: u64) -> ClientResult<()>;

    async fn rename(&self, task_id: &str, filename: &str) -> ClientResult<()>;

    /// 替换任务的下载源链接
    async fn refresh_link(&self, task_id: &str, url: &str) -> ClientResult<()>;

    /// 取消任务
    ///
    /// # 参数
    /// * `delete_file` - 是否同时删除已下载的文件
    async fn cancel(&self, task_id: &str, delete_file: bool) -> ClientResult<()>;

    async fn get_settings(&self) -> ClientResult<ServiceSettings>;

    async fn update_settings(&self, settings: &ServiceSettings) -> ClientResult<()>;

    /// 下载目录中是否已存在同名文件
    async fn file_exists(&self, filename: &str) -> ClientResult<bool>;

    async fn drive_status(&self) -> ClientResult<DriveStatus>;

    /// 获取云盘文件元数据
    async fn drive_metadata(&self, file_id: &str) -> ClientResult<DriveMetadata>;

    /// 从云盘克隆文件，返回新任务 ID
    async fn drive_clone(&self, request: &DriveCloneRequest) -> ClientResult<String>;
}
