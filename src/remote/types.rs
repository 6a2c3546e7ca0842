//! 远端任务服务数据类型定义
//!
//! 本模块定义了与任务服务通信使用的数据结构，包括：
//! - 任务状态枚举
//! - 任务信息结构体
//! - 请求/响应类型
//! - 设置与云盘相关类型

use serde::{Deserialize, Deserializer, Serialize};

// =====================================================
// 任务状态枚举
// =====================================================

/// 下载任务状态
///
/// 与任务服务返回的 status 字符串一一对应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 等待开始
    Pending,
    /// 排队中
    Queued,
    /// 下载中
    Downloading,
    /// 已暂停
    Paused,
    /// 已完成
    Completed,
    /// 出错
    Error,
    /// 已取消
    Canceled,
    /// 解压中
    Extracting,
    /// 未知状态（服务端新增的状态值）
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// 是否为活跃状态（需要快速轮询）
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Downloading | Self::Extracting | Self::Queued | Self::Pending
        )
    }

    /// 状态文本
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Canceled => "canceled",
            Self::Extracting => "extracting",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =====================================================
// 任务信息结构体
// =====================================================

/// 进度百分比，服务端可能返回小数，统一截断并限制在 0-100
fn deserialize_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_nan() {
        return Ok(0);
    }
    Ok(value.clamp(0.0, 100.0) as u8)
}

/// 字节数和速度，服务端可能返回小数或负数
fn deserialize_non_negative<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_nan() || value <= 0.0 {
        return Ok(0);
    }
    Ok(value as u64)
}

/// 下载任务
///
/// 本地缓存中的任务只会随整表刷新被替换，不会逐字段修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// 任务唯一标识
    pub id: String,
    /// 当前下载源链接
    pub url: String,
    /// 文件名
    pub filename: String,
    /// 任务状态
    pub status: TaskStatus,
    /// 进度百分比 (0-100)
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: u8,
    /// 文件总大小（字节，0 表示未知）
    #[serde(default, deserialize_with = "deserialize_non_negative")]
    pub total_size: u64,
    /// 已下载大小（字节）
    #[serde(default, deserialize_with = "deserialize_non_negative")]
    pub downloaded_size: u64,
    /// 当前速度（字节/秒，仅下载中有意义）
    #[serde(default, deserialize_with = "deserialize_non_negative")]
    pub speed: u64,
    /// 限速（KB/s，0 表示不限速）
    #[serde(default, deserialize_with = "deserialize_non_negative")]
    pub speed_limit: u64,
    /// 完成后是否自动解压
    #[serde(default)]
    pub auto_extract: bool,
    /// 是否跳过了解压
    #[serde(default)]
    pub extraction_skipped: bool,
    /// 是否支持断点续传
    #[serde(default)]
    pub supports_resume: bool,
    /// 错误信息（仅 error 状态）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DownloadTask {
    /// 是否处于活跃状态
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// 文件大小是否未知
    pub fn is_size_unknown(&self) -> bool {
        self.total_size == 0
    }
}

/// 任务集合中是否存在活跃任务
pub fn has_active_task(tasks: &[DownloadTask]) -> bool {
    tasks.iter().any(DownloadTask::is_active)
}

// =====================================================
// 请求类型
// =====================================================

/// 添加下载任务请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddTaskRequest {
    /// 下载链接
    pub url: String,
    /// 自定义文件名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// 完成后自动解压
    pub auto_extract: bool,
    /// 限速（KB/s，0 表示不限速）
    pub speed_limit: u64,
    /// 最大连接数（不传则使用服务端默认值）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

/// 添加任务响应
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedTask {
    /// 新任务 ID
    #[serde(alias = "task_id")]
    pub id: String,
    /// 服务端返回的状态文本
    #[serde(default)]
    pub status: String,
}

/// 限速请求
#[derive(Debug, Clone, Serialize)]
pub struct SpeedLimitRequest {
    /// 限速（KB/s）
    pub limit: u64,
}

/// 重命名请求
#[derive(Debug, Clone, Serialize)]
pub struct RenameRequest {
    /// 新文件名
    pub filename: String,
}

/// 刷新链接请求
#[derive(Debug, Clone, Serialize)]
pub struct RefreshLinkRequest {
    /// 新下载链接
    pub url: String,
}

/// 云盘克隆请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveCloneRequest {
    /// 云盘资源 ID
    pub file_id: String,
    /// 保存名称
    pub name: String,
    /// MIME 类型（文件夹使用文件夹类型）
    pub mime_type: String,
    /// 完成后自动解压
    pub auto_extract: bool,
    /// 限速（KB/s）
    pub speed_limit: u64,
    /// 最大连接数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

// =====================================================
// 响应类型
// =====================================================

/// 服务端错误响应体
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// 可读的错误描述
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// 提取错误描述文本
    ///
    /// detail 可能是字符串，也可能是校验错误数组
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

/// 文件存在检查响应
#[derive(Debug, Clone, Deserialize)]
pub struct FileExistsResponse {
    pub exists: bool,
}

// =====================================================
// 设置
// =====================================================

/// 默认最大同时下载数
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: u32 = 3;

/// 默认单任务最大连接数
pub const DEFAULT_MAX_CONNECTIONS_PER_TASK: u32 = 4;

/// 任务服务设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// 下载目录
    pub download_dir: String,
    /// 最大同时下载数
    pub max_concurrent_downloads: u32,
    /// 单任务最大连接数
    pub max_connections_per_task: u32,
    /// 按类型整理文件
    #[serde(default)]
    pub organize_files: bool,
}

impl ServiceSettings {
    /// 将无效的 0 值替换为默认值
    pub fn normalized(mut self) -> Self {
        if self.max_concurrent_downloads == 0 {
            self.max_concurrent_downloads = DEFAULT_MAX_CONCURRENT_DOWNLOADS;
        }
        if self.max_connections_per_task == 0 {
            self.max_connections_per_task = DEFAULT_MAX_CONNECTIONS_PER_TASK;
        }
        self
    }
}

// =====================================================
// 云盘
// =====================================================

/// 云盘授权状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DriveStatus {
    /// 是否已授权
    pub is_authenticated: bool,
    /// 是否已上传凭证
    pub has_credentials: bool,
}

/// 云盘文件元数据
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DriveMetadata {
    /// 资源 ID
    pub id: String,
    /// 文件名
    pub name: String,
    /// MIME 类型
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// 文件大小（云盘 API 以字符串返回，文件夹没有该字段）
    #[serde(default)]
    pub size: Option<String>,
}

impl DriveMetadata {
    /// 文件大小（字节）
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}
