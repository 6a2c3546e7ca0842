//! 命令分发器
//!
//! 所有用户操作的统一入口，每个操作按以下顺序执行：
//! 1. 本地校验（失败时不会发出任何请求）
//! 2. 调用远端服务
//! 3. 成功后立即刷新同步器，让界面尽快看到新状态
//!
//! 失败时直接返回错误，本地缓存保持不变。不做任何乐观更新

use crate::common::link_parser::{extract_drive_id, resolve_mime_type};
use crate::error::{ClientError, ClientResult, ValidationError};
use crate::remote::service::TaskService;
use crate::remote::types::{
    AddTaskRequest, CreatedTask, DriveCloneRequest, DriveMetadata, DriveStatus, ServiceSettings,
};
use crate::sync::TaskSynchronizer;
use std::sync::Arc;
use tracing::{debug, info, warn};

// =====================================================
// 命令参数
// =====================================================

/// 传输选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferOptions {
    /// 完成后自动解压
    pub auto_extract: bool,
    /// 限速（KB/s，0 表示不限速）
    pub speed_limit: u64,
    /// 最大连接数（None 或 0 表示使用服务端默认值）
    pub max_connections: Option<u32>,
}

impl TransferOptions {
    fn effective_max_connections(&self) -> Option<u32> {
        self.max_connections.filter(|&n| n > 0)
    }
}

/// 云盘克隆选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveCloneOptions {
    /// 用户手动输入的名称
    pub display_name: Option<String>,
    /// 从元数据获取到的名称
    pub fetched_name: Option<String>,
    /// 元数据中的 MIME 类型
    pub mime_type_hint: Option<String>,
    /// 传输选项
    pub transfer: TransferOptions,
}

impl DriveCloneOptions {
    /// 实际使用的名称：手动输入优先，其次是获取到的名称
    fn effective_name(&self) -> Option<String> {
        non_blank(self.display_name.as_deref())
            .or_else(|| non_blank(self.fetched_name.as_deref()))
            .map(str::to_string)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn require_task_id(task_id: &str) -> ClientResult<&str> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(ValidationError::EmptyTaskId.into());
    }
    Ok(task_id)
}

fn require_url(url: &str) -> ClientResult<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ValidationError::EmptyUrl.into());
    }
    Ok(url)
}

fn log_failure(op: &str, e: ClientError) -> ClientError {
    warn!("{}失败: {}", op, e);
    e
}

// =====================================================
// 命令分发器
// =====================================================

/// 命令分发器
pub struct CommandDispatcher {
    /// 任务服务
    service: Arc<dyn TaskService>,
    /// 任务同步器
    synchronizer: Arc<TaskSynchronizer>,
}

impl CommandDispatcher {
    /// 创建命令分发器
    pub fn new(service: Arc<dyn TaskService>, synchronizer: Arc<TaskSynchronizer>) -> Self {
        Self {
            service,
            synchronizer,
        }
    }

    /// 关联的任务同步器
    pub fn synchronizer(&self) -> &Arc<TaskSynchronizer> {
        &self.synchronizer
    }

    // ==================== 任务创建 ====================

    /// 添加下载任务
    ///
    /// # 参数
    /// * `url` - 下载链接
    /// * `filename` - 自定义文件名（空白视为未指定）
    /// * `options` - 传输选项
    pub async fn add_task(
        &self,
        url: &str,
        filename: Option<&str>,
        options: &TransferOptions,
    ) -> ClientResult<CreatedTask> {
        let url = require_url(url)?;
        let request = AddTaskRequest {
            url: url.to_string(),
            filename: non_blank(filename).map(str::to_string),
            auto_extract: options.auto_extract,
            speed_limit: options.speed_limit,
            max_connections: options.effective_max_connections(),
        };

        let created = self
            .service
            .add_task(&request)
            .await
            .map_err(|e| log_failure("添加下载任务", e))?;

        info!("下载任务已创建: id={}", created.id);
        self.synchronizer.refresh().await;
        Ok(created)
    }

    /// 从云盘链接克隆
    ///
    /// # 参数
    /// * `link` - 云盘分享链接或资源 ID
    /// * `options` - 名称、MIME 类型和传输选项
    ///
    /// # 返回
    /// 新任务 ID
    pub async fn add_drive_clone(
        &self,
        link: &str,
        options: &DriveCloneOptions,
    ) -> ClientResult<String> {
        let file_id = extract_drive_id(link).ok_or(ValidationError::InvalidLink)?;
        let name = options
            .effective_name()
            .ok_or(ValidationError::NameRequired)?;
        let mime_type = resolve_mime_type(link, options.mime_type_hint.as_deref());

        let request = DriveCloneRequest {
            file_id,
            name,
            mime_type,
            auto_extract: options.transfer.auto_extract,
            speed_limit: options.transfer.speed_limit,
            max_connections: options.transfer.effective_max_connections(),
        };

        let task_id = self
            .service
            .drive_clone(&request)
            .await
            .map_err(|e| log_failure("云盘克隆", e))?;

        self.synchronizer.refresh().await;
        Ok(task_id)
    }

    // ==================== 任务控制 ====================

    /// 暂停任务
    pub async fn pause(&self, task_id: &str) -> ClientResult<()> {
        let task_id = require_task_id(task_id)?;
        self.service
            .pause(task_id)
            .await
            .map_err(|e| log_failure("暂停任务", e))?;
        self.synchronizer.refresh().await;
        Ok(())
    }

    /// 恢复任务
    pub async fn resume(&self, task_id: &str) -> ClientResult<()> {
        let task_id = require_task_id(task_id)?;
        self.service
            .resume(task_id)
            .await
            .map_err(|e| log_failure("恢复任务", e))?;
        self.synchronizer.refresh().await;
        Ok(())
    }

    /// 设置限速（KB/s，0 表示不限速）
    pub async fn set_limit(&self, task_id: &str, limit_kbps: u64) -> ClientResult<()> {
        let task_id = require_task_id(task_id)?;
        self.service
            .set_limit(task_id, limit_kbps)
            .await
            .map_err(|e| log_failure("设置限速", e))?;
        self.synchronizer.refresh().await;
        Ok(())
    }

    /// 重命名任务
    ///
    /// 空白名称在本地拒绝，其余名称按输入原样发送；服务端拒绝时原样返回其错误描述
    pub async fn rename_task(&self, task_id: &str, new_name: &str) -> ClientResult<()> {
        let task_id = require_task_id(task_id)?;
        if new_name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        self.service
            .rename(task_id, new_name)
            .await
            .map_err(|e| log_failure("重命名任务", e))?;
        self.synchronizer.refresh().await;
        Ok(())
    }

    /// 替换任务的下载链接（用于链接过期）
    pub async fn refresh_link(&self, task_id: &str, new_url: &str) -> ClientResult<()> {
        let task_id = require_task_id(task_id)?;
        let new_url = require_url(new_url)?;
        self.service
            .refresh_link(task_id, new_url)
            .await
            .map_err(|e| log_failure("刷新下载链接", e))?;
        self.synchronizer.refresh().await;
        Ok(())
    }

    /// 取消任务
    ///
    /// 不在本地检查任务状态，是否允许由服务端决定
    pub async fn cancel(&self, task_id: &str, delete_file: bool) -> ClientResult<()> {
        let task_id = require_task_id(task_id)?;
        self.service
            .cancel(task_id, delete_file)
            .await
            .map_err(|e| log_failure("取消任务", e))?;
        self.synchronizer.refresh().await;
        Ok(())
    }

    // ==================== 辅助查询 ====================

    /// 下载目录中是否已有同名文件
    ///
    /// 仅作提示使用，查询失败视为不存在
    pub async fn check_file_exists(&self, filename: &str) -> bool {
        let filename = filename.trim();
        if filename.is_empty() {
            return false;
        }
        match self.service.file_exists(filename).await {
            Ok(exists) => exists,
            Err(e) => {
                debug!("检查文件是否存在失败: filename={}, error={}", filename, e);
                false
            }
        }
    }

    /// 获取云盘文件元数据
    ///
    /// 仅作提示使用，查询失败返回 None
    pub async fn drive_metadata(&self, file_id: &str) -> Option<DriveMetadata> {
        let file_id = file_id.trim();
        if file_id.is_empty() {
            return None;
        }
        match self.service.drive_metadata(file_id).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                debug!("获取云盘元数据失败: file_id={}, error={}", file_id, e);
                None
            }
        }
    }

    /// 云盘授权状态
    pub async fn drive_status(&self) -> ClientResult<DriveStatus> {
        self.service
            .drive_status()
            .await
            .map_err(|e| log_failure("获取云盘状态", e))
    }

    // ==================== 设置 ====================

    /// 获取服务设置
    pub async fn settings(&self) -> ClientResult<ServiceSettings> {
        let settings = self
            .service
            .get_settings()
            .await
            .map_err(|e| log_failure("获取设置", e))?;
        Ok(settings.normalized())
    }

    /// 更新服务设置
    ///
    /// 0 值会先替换为默认值再发送，返回实际发送的设置
    pub async fn update_settings(&self, settings: ServiceSettings) -> ClientResult<ServiceSettings> {
        let settings = settings.normalized();
        self.service
            .update_settings(&settings)
            .await
            .map_err(|e| log_failure("更新设置", e))?;
        info!("设置已更新: download_dir={}", settings.download_dir);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::link_parser::FOLDER_MIME_TYPE;
    use crate::remote::mock::{task, MockTaskService};
    use crate::remote::types::TaskStatus;
    use crate::sync::PollingConfig;

    fn dispatcher(
        tasks: Vec<crate::remote::types::DownloadTask>,
    ) -> (CommandDispatcher, Arc<MockTaskService>) {
        let service = Arc::new(MockTaskService::new(tasks));
        let service_dyn: Arc<dyn TaskService> = Arc::clone(&service) as Arc<dyn TaskService>;
        let sync = Arc::new(TaskSynchronizer::new(
            Arc::clone(&service_dyn),
            PollingConfig::default(),
        ));
        (CommandDispatcher::new(service_dyn, sync), service)
    }

    const FILE_ID: &str = "1AbCdEfGhIjKlMnOpQrStUvWxYz";

    #[tokio::test]
    async fn test_add_task_refreshes_cache() {
        let (dispatcher, service) = dispatcher(Vec::new());
        let created = dispatcher
            .add_task(
                "  http://example.com/file.zip ",
                Some("   "),
                &TransferOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(service.calls(), vec!["add http://example.com/file.zip"]);
        assert_eq!(service.list_count(), 1);
        let tasks = dispatcher.synchronizer().tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, created.id);
        assert_eq!(tasks[0].filename, "download.bin");
    }

    #[tokio::test]
    async fn test_add_task_empty_url_is_rejected_locally() {
        let (dispatcher, service) = dispatcher(Vec::new());
        let err = dispatcher
            .add_task("  ", None, &TransferOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::Validation(ValidationError::EmptyUrl));
        assert!(service.calls().is_empty());
        assert_eq!(service.list_count(), 0);
    }

    #[tokio::test]
    async fn test_rename_empty_name_makes_no_remote_call() {
        let (dispatcher, service) = dispatcher(vec![task("t1", TaskStatus::Paused)]);
        let err = dispatcher.rename_task("t1", "").await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(err, ClientError::Validation(ValidationError::EmptyName));
        assert!(service.calls().is_empty());
        assert_eq!(service.list_count(), 0);
    }

    #[tokio::test]
    async fn test_rename_rejection_is_surfaced_verbatim() {
        let (dispatcher, service) = dispatcher(vec![
            task("t1", TaskStatus::Paused),
            task("t2", TaskStatus::Completed),
        ]);
        let err = dispatcher.rename_task("t1", "t2.zip").await.unwrap_err();

        assert_eq!(err.to_string(), "File already exists");
        assert_eq!(service.list_count(), 0);

        dispatcher.rename_task("t1", "renamed (1).zip").await.unwrap();
        assert_eq!(
            dispatcher.synchronizer().find_task("t1").unwrap().filename,
            "renamed (1).zip"
        );
    }

    #[tokio::test]
    async fn test_rename_sends_name_as_typed() {
        let (dispatcher, service) = dispatcher(vec![task("t1", TaskStatus::Paused)]);
        dispatcher.rename_task("t1", " notes.txt").await.unwrap();

        assert_eq!(service.calls(), vec!["rename t1  notes.txt"]);
        assert_eq!(
            dispatcher.synchronizer().find_task("t1").unwrap().filename,
            " notes.txt"
        );
        assert!(dispatcher.rename_task("t1", " \t ").await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_cancel_missing_task_keeps_cache() {
        let (dispatcher, _service) = dispatcher(vec![task("t1", TaskStatus::Downloading)]);
        dispatcher.synchronizer().refresh().await;
        let before = dispatcher.synchronizer().tasks();

        let err = dispatcher.cancel("missing", true).await.unwrap_err();
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "Task not found");
        assert!(Arc::ptr_eq(&before, &dispatcher.synchronizer().tasks()));
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned_and_keeps_cache() {
        let (dispatcher, service) = dispatcher(vec![task("t1", TaskStatus::Downloading)]);
        dispatcher.synchronizer().refresh().await;
        let before = dispatcher.synchronizer().tasks();
        service.set_command_error(Some(ClientError::Transport("connection refused".to_string())));

        for err in [
            dispatcher
                .add_task("http://example.com/a.zip", None, &TransferOptions::default())
                .await
                .unwrap_err(),
            dispatcher.pause("t1").await.unwrap_err(),
            dispatcher.set_limit("t1", 512).await.unwrap_err(),
        ] {
            assert!(err.is_transport());
        }

        assert_eq!(service.list_count(), 1);
        assert!(Arc::ptr_eq(&before, &dispatcher.synchronizer().tasks()));
        assert_eq!(
            service.calls(),
            vec!["add http://example.com/a.zip", "pause t1", "limit t1 512"]
        );
    }

    #[tokio::test]
    async fn test_add_task_rejection_is_surfaced_verbatim() {
        let (dispatcher, service) = dispatcher(Vec::new());
        service.set_command_error(Some(ClientError::Remote {
            status: 400,
            detail: "Unsupported URL scheme".to_string(),
        }));

        let err = dispatcher
            .add_task("ftp://example.com/a.zip", None, &TransferOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "Unsupported URL scheme");
        assert_eq!(service.list_count(), 0);
        assert!(dispatcher.synchronizer().tasks().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_forwards_delete_flag_and_refreshes() {
        let (dispatcher, service) = dispatcher(vec![task("t1", TaskStatus::Completed)]);
        dispatcher.synchronizer().refresh().await;

        dispatcher.cancel("t1", false).await.unwrap();
        assert_eq!(service.calls(), vec!["cancel t1 false"]);
        assert!(dispatcher.synchronizer().tasks().is_empty());
    }

    #[tokio::test]
    async fn test_empty_task_id_is_rejected() {
        let (dispatcher, service) = dispatcher(Vec::new());
        for err in [
            dispatcher.pause("").await.unwrap_err(),
            dispatcher.resume(" ").await.unwrap_err(),
            dispatcher.set_limit("", 100).await.unwrap_err(),
            dispatcher.cancel("", true).await.unwrap_err(),
        ] {
            assert_eq!(err, ClientError::Validation(ValidationError::EmptyTaskId));
        }
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pause_resume_limit_refresh_link() {
        let (dispatcher, service) = dispatcher(vec![task("t1", TaskStatus::Downloading)]);

        dispatcher.pause("t1").await.unwrap();
        assert_eq!(
            dispatcher.synchronizer().find_task("t1").unwrap().status,
            TaskStatus::Paused
        );
        assert!(!dispatcher.synchronizer().has_active_task());

        dispatcher.resume("t1").await.unwrap();
        dispatcher.set_limit("t1", 2048).await.unwrap();
        dispatcher
            .refresh_link("t1", "http://mirror.example.com/t1")
            .await
            .unwrap();

        let t1 = dispatcher.synchronizer().find_task("t1").unwrap();
        assert_eq!(t1.status, TaskStatus::Downloading);
        assert_eq!(t1.speed_limit, 2048);
        assert_eq!(t1.url, "http://mirror.example.com/t1");
        assert_eq!(service.list_count(), 4);

        let err = dispatcher.refresh_link("t1", "").await.unwrap_err();
        assert_eq!(err, ClientError::Validation(ValidationError::EmptyUrl));
    }

    #[tokio::test]
    async fn test_drive_clone_folder_forces_mime_type() {
        let (dispatcher, service) = dispatcher(Vec::new());
        let link = format!("https://drive.google.com/drive/folders/{}?usp=sharing", FILE_ID);
        let options = DriveCloneOptions {
            display_name: Some("Album".to_string()),
            mime_type_hint: Some("video/mp4".to_string()),
            ..Default::default()
        };

        dispatcher.add_drive_clone(&link, &options).await.unwrap();
        assert_eq!(
            service.calls(),
            vec![format!("clone {} Album {}", FILE_ID, FOLDER_MIME_TYPE)]
        );
        assert_eq!(dispatcher.synchronizer().tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_drive_clone_prefers_display_name() {
        let (dispatcher, service) = dispatcher(Vec::new());
        let link = format!("https://drive.google.com/file/d/{}/view", FILE_ID);

        let options = DriveCloneOptions {
            display_name: Some("  ".to_string()),
            fetched_name: Some("movie.mkv".to_string()),
            ..Default::default()
        };
        dispatcher.add_drive_clone(&link, &options).await.unwrap();

        let options = DriveCloneOptions {
            display_name: Some("custom.mkv".to_string()),
            fetched_name: Some("movie.mkv".to_string()),
            mime_type_hint: Some("video/x-matroska".to_string()),
            ..Default::default()
        };
        dispatcher.add_drive_clone(&link, &options).await.unwrap();

        assert_eq!(
            service.calls(),
            vec![
                format!("clone {} movie.mkv application/octet-stream", FILE_ID),
                format!("clone {} custom.mkv video/x-matroska", FILE_ID),
            ]
        );
    }

    #[tokio::test]
    async fn test_drive_clone_validation() {
        let (dispatcher, service) = dispatcher(Vec::new());

        let err = dispatcher
            .add_drive_clone("not a url", &DriveCloneOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::Validation(ValidationError::InvalidLink));

        let link = format!("https://drive.google.com/file/d/{}/view", FILE_ID);
        let err = dispatcher
            .add_drive_clone(&link, &DriveCloneOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::Validation(ValidationError::NameRequired));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_advisory_lookups_degrade() {
        let (dispatcher, service) = dispatcher(Vec::new());
        service.add_existing_file("a.zip");
        service.add_metadata(DriveMetadata {
            id: FILE_ID.to_string(),
            name: "movie.mkv".to_string(),
            mime_type: "video/x-matroska".to_string(),
            size: None,
        });

        assert!(dispatcher.check_file_exists("a.zip").await);
        assert!(!dispatcher.check_file_exists("b.zip").await);
        assert!(!dispatcher.check_file_exists("").await);

        assert_eq!(
            dispatcher.drive_metadata(FILE_ID).await.map(|m| m.name),
            Some("movie.mkv".to_string())
        );
        assert!(dispatcher.drive_metadata("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_update_settings_normalizes_zero_values() {
        let (dispatcher, service) = dispatcher(Vec::new());
        let sent = dispatcher
            .update_settings(ServiceSettings {
                download_dir: "/downloads".to_string(),
                max_concurrent_downloads: 0,
                max_connections_per_task: 8,
                organize_files: false,
            })
            .await
            .unwrap();

        assert_eq!(sent.max_concurrent_downloads, 3);
        assert_eq!(service.calls(), vec!["settings 3 8"]);
        assert_eq!(dispatcher.settings().await.unwrap(), sent);
    }
}
