//! 内存任务服务（仅测试使用）
//!
//! 行为与远端服务保持一致：未知任务返回 404 "Task not found"，
//! 重命名到已存在的文件名返回 400 "File already exists"

use crate::error::{ClientError, ClientResult};
use crate::remote::service::TaskService;
use crate::remote::types::{
    AddTaskRequest, CreatedTask, DownloadTask, DriveCloneRequest, DriveMetadata, DriveStatus,
    ServiceSettings, TaskStatus,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// 构造一个测试任务
pub(crate) fn task(id: &str, status: TaskStatus) -> DownloadTask {
    DownloadTask {
        id: id.to_string(),
        url: format!("http://example.com/{}", id),
        filename: format!("{}.zip", id),
        status,
        progress: 0,
        total_size: 0,
        downloaded_size: 0,
        speed: 0,
        speed_limit: 0,
        auto_extract: false,
        extraction_skipped: false,
        supports_resume: true,
        error_message: None,
    }
}

fn not_found() -> ClientError {
    ClientError::Remote {
        status: 404,
        detail: "Task not found".to_string(),
    }
}

pub(crate) struct MockTaskService {
    tasks: Mutex<Vec<DownloadTask>>,
    fail_list: AtomicBool,
    command_error: Mutex<Option<ClientError>>,
    list_delay: Mutex<Duration>,
    list_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
    calls: Mutex<Vec<String>>,
    existing_files: Mutex<Vec<String>>,
    metadata: Mutex<HashMap<String, DriveMetadata>>,
    settings: Mutex<Option<ServiceSettings>>,
}

impl MockTaskService {
    pub(crate) fn new(tasks: Vec<DownloadTask>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            fail_list: AtomicBool::new(false),
            command_error: Mutex::new(None),
            list_delay: Mutex::new(Duration::ZERO),
            list_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
            calls: Mutex::new(Vec::new()),
            existing_files: Mutex::new(Vec::new()),
            metadata: Mutex::new(HashMap::new()),
            settings: Mutex::new(None),
        }
    }

    pub(crate) fn set_tasks(&self, tasks: Vec<DownloadTask>) {
        *self.tasks.lock() = tasks;
    }

    pub(crate) fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// 之后除列表查询以外的调用都返回该错误
    pub(crate) fn set_command_error(&self, error: Option<ClientError>) {
        *self.command_error.lock() = error;
    }

    pub(crate) fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock() = delay;
    }

    pub(crate) fn add_existing_file(&self, filename: &str) {
        self.existing_files.lock().push(filename.to_string());
    }

    pub(crate) fn add_metadata(&self, metadata: DriveMetadata) {
        self.metadata.lock().insert(metadata.id.clone(), metadata);
    }

    pub(crate) fn list_count(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// 除列表查询以外的调用记录
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// 记录调用，并返回注入的命令错误
    fn record(&self, call: String) -> ClientResult<()> {
        self.calls.lock().push(call);
        match self.command_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn with_task<F>(&self, task_id: &str, f: F) -> ClientResult<()>
    where
        F: FnOnce(&mut DownloadTask),
    {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(not_found)?;
        f(task);
        Ok(())
    }

    fn push_task(&self, url: String, filename: String) -> String {
        let id = format!("task-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut created = task(&id, TaskStatus::Queued);
        created.url = url;
        created.filename = filename;
        self.tasks.lock().push(created);
        id
    }
}

#[async_trait]
impl TaskService for MockTaskService {
    async fn list_tasks(&self) -> ClientResult<Vec<DownloadTask>> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.list_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("connection refused".to_string()));
        }
        Ok(self.tasks.lock().clone())
    }

    async fn add_task(&self, request: &AddTaskRequest) -> ClientResult<CreatedTask> {
        self.record(format!("add {}", request.url))?;
        let filename = request
            .filename
            .clone()
            .unwrap_or_else(|| "download.bin".to_string());
        let id = self.push_task(request.url.clone(), filename);
        Ok(CreatedTask {
            id,
            status: "queued".to_string(),
        })
    }

    async fn pause(&self, task_id: &str) -> ClientResult<()> {
        self.record(format!("pause {}", task_id))?;
        self.with_task(task_id, |t| t.status = TaskStatus::Paused)
    }

    async fn resume(&self, task_id: &str) -> ClientResult<()> {
        self.record(format!("resume {}", task_id))?;
        self.with_task(task_id, |t| t.status = TaskStatus::Downloading)
    }

    async fn set_limit(&self, task_id: &str, limit_kbps: u64) -> ClientResult<()> {
        self.record(format!("limit {} {}", task_id, limit_kbps))?;
        self.with_task(task_id, |t| t.speed_limit = limit_kbps)
    }

    async fn rename(&self, task_id: &str, filename: &str) -> ClientResult<()> {
        self.record(format!("rename {} {}", task_id, filename))?;
        let taken = self
            .tasks
            .lock()
            .iter()
            .any(|t| t.id != task_id && t.filename == filename)
            || self.existing_files.lock().iter().any(|f| f == filename);
        if taken {
            return Err(ClientError::Remote {
                status: 400,
                detail: "File already exists".to_string(),
            });
        }
        self.with_task(task_id, |t| t.filename = filename.to_string())
    }

    async fn refresh_link(&self, task_id: &str, url: &str) -> ClientResult<()> {
        self.record(format!("refresh_link {} {}", task_id, url))?;
        self.with_task(task_id, |t| t.url = url.to_string())
    }

    async fn cancel(&self, task_id: &str, delete_file: bool) -> ClientResult<()> {
        self.record(format!("cancel {} {}", task_id, delete_file))?;
        let mut tasks = self.tasks.lock();
        let index = tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(not_found)?;
        tasks.remove(index);
        Ok(())
    }

    async fn get_settings(&self) -> ClientResult<ServiceSettings> {
        self.settings.lock().clone().ok_or_else(|| ClientError::Remote {
            status: 404,
            detail: "Settings not found".to_string(),
        })
    }

    async fn update_settings(&self, settings: &ServiceSettings) -> ClientResult<()> {
        self.record(format!(
            "settings {} {}",
            settings.max_concurrent_downloads, settings.max_connections_per_task
        ))?;
        *self.settings.lock() = Some(settings.clone());
        Ok(())
    }

    async fn file_exists(&self, filename: &str) -> ClientResult<bool> {
        self.record(format!("check_file {}", filename))?;
        Ok(self.existing_files.lock().iter().any(|f| f == filename))
    }

    async fn drive_status(&self) -> ClientResult<DriveStatus> {
        Ok(DriveStatus {
            is_authenticated: true,
            has_credentials: true,
        })
    }

    async fn drive_metadata(&self, file_id: &str) -> ClientResult<DriveMetadata> {
        self.record(format!("metadata {}", file_id))?;
        self.metadata
            .lock()
            .get(file_id)
            .cloned()
            .ok_or_else(|| ClientError::Remote {
                status: 404,
                detail: "File not found".to_string(),
            })
    }

    async fn drive_clone(&self, request: &DriveCloneRequest) -> ClientResult<String> {
        self.record(format!(
            "clone {} {} {}",
            request.file_id, request.name, request.mime_type
        ))?;
        Ok(self.push_task(
            format!("drive://{}", request.file_id),
            request.name.clone(),
        ))
    }
}
