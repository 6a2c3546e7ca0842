//! 添加下载表单
//!
//! 无界面的表单状态，输入变化时通过防抖探测器做提示性查询：
//! - 文件名变化 500ms 后检查下载目录中是否已有同名文件
//! - 云盘链接变化 800ms 后获取元数据（名称、MIME 类型）
//!
//! 提交时把表单内容交给命令分发器

use crate::common::debounce::DebouncedProbe;
use crate::common::link_parser::extract_drive_id;
use crate::dispatcher::command::{CommandDispatcher, DriveCloneOptions, TransferOptions};
use crate::error::ClientResult;
use crate::remote::types::{CreatedTask, DriveMetadata};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// 探测器静置时长
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeTimings {
    /// 文件名检查
    pub file_check_settle: Duration,
    /// 云盘元数据获取
    pub metadata_settle: Duration,
}

impl Default for ProbeTimings {
    fn default() -> Self {
        Self {
            file_check_settle: Duration::from_millis(500),
            metadata_settle: Duration::from_millis(800),
        }
    }
}

#[derive(Debug, Default)]
struct FormFields {
    filename: String,
    drive_link: String,
    display_name: String,
}

/// 添加下载表单
pub struct AddDownloadForm {
    dispatcher: Arc<CommandDispatcher>,
    fields: Mutex<FormFields>,
    file_check: DebouncedProbe<String, bool>,
    metadata_probe: DebouncedProbe<String, Option<DriveMetadata>>,
}

impl AddDownloadForm {
    /// 创建表单
    pub fn new(dispatcher: Arc<CommandDispatcher>, timings: ProbeTimings) -> Self {
        let file_check_dispatcher = Arc::clone(&dispatcher);
        let file_check = DebouncedProbe::new(
            "文件名检查",
            timings.file_check_settle,
            move |filename: String| {
                let dispatcher = Arc::clone(&file_check_dispatcher);
                async move { dispatcher.check_file_exists(&filename).await }
            },
        );

        let metadata_dispatcher = Arc::clone(&dispatcher);
        let metadata_probe = DebouncedProbe::new(
            "云盘元数据",
            timings.metadata_settle,
            move |file_id: String| {
                let dispatcher = Arc::clone(&metadata_dispatcher);
                async move { dispatcher.drive_metadata(&file_id).await }
            },
        );

        Self {
            dispatcher,
            fields: Mutex::new(FormFields::default()),
            file_check,
            metadata_probe,
        }
    }

    // ==================== 输入 ====================

    /// 修改文件名，返回本次检查的代数
    pub fn set_filename(&self, filename: &str) -> u64 {
        self.fields.lock().filename = filename.to_string();
        self.file_check.update(filename.trim().to_string())
    }

    /// 修改云盘链接，返回本次元数据查询的代数
    ///
    /// 无法提取资源 ID 时同样会发起一次（空）查询，用于清除旧结果
    pub fn set_drive_link(&self, link: &str) -> u64 {
        self.fields.lock().drive_link = link.to_string();
        let file_id = extract_drive_id(link).unwrap_or_default();
        self.metadata_probe.update(file_id)
    }

    /// 修改手动输入的名称
    pub fn set_display_name(&self, name: &str) {
        self.fields.lock().display_name = name.to_string();
    }

    // ==================== 查询结果 ====================

    /// 当前文件名是否已存在（检查未完成时视为不存在）
    pub fn filename_exists(&self) -> bool {
        self.file_check.latest().unwrap_or(false)
    }

    /// 当前链接对应的云盘元数据，获取未完成时为 None
    pub fn fetched_metadata(&self) -> Option<DriveMetadata> {
        self.metadata_probe.latest().flatten()
    }

    /// 等待指定代数的文件名检查结果
    pub async fn file_check_result(&self, generation: u64) -> Option<bool> {
        self.file_check.result_for(generation).await
    }

    /// 等待指定代数的元数据查询结果
    pub async fn metadata_result(&self, generation: u64) -> Option<Option<DriveMetadata>> {
        self.metadata_probe.result_for(generation).await
    }

    // ==================== 提交 ====================

    /// 以普通链接提交
    pub async fn submit_url(&self, url: &str, transfer: TransferOptions) -> ClientResult<CreatedTask> {
        let filename = self.fields.lock().filename.clone();
        self.dispatcher
            .add_task(url, Some(&filename), &transfer)
            .await
    }

    /// 以云盘链接提交
    ///
    /// 只使用当前链接的元数据；元数据尚未获取到且没有手动输入名称时返回 `NameRequired`
    pub async fn submit_drive_clone(&self, transfer: TransferOptions) -> ClientResult<String> {
        let (link, display_name) = {
            let fields = self.fields.lock();
            (fields.drive_link.clone(), fields.display_name.clone())
        };
        let metadata = self.fetched_metadata();

        let options = DriveCloneOptions {
            display_name: Some(display_name),
            fetched_name: metadata.as_ref().map(|m| m.name.clone()),
            mime_type_hint: metadata.map(|m| m.mime_type),
            transfer,
        };
        self.dispatcher.add_drive_clone(&link, &options).await
    }

    /// 关闭表单，取消尚未完成的查询
    pub fn close(&self) {
        self.file_check.shutdown();
        self.metadata_probe.shutdown();
    }
}
