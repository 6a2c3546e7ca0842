//! 客户端错误类型
//!
//! 三类错误：
//! - 本地校验失败（从不到达远端服务）
//! - 远端服务可达但拒绝了请求（携带服务端 detail）
//! - 远端不可达 / 超时 / 响应无法解析

use thiserror::Error;

/// 本地输入校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 下载链接为空
    #[error("下载链接不能为空")]
    EmptyUrl,
    /// 任务 ID 为空
    #[error("任务 ID 不能为空")]
    EmptyTaskId,
    /// 文件名为空或只有空白字符
    #[error("文件名不能为空")]
    EmptyName,
    /// 无法从链接中提取资源 ID
    #[error("无效的云盘链接")]
    InvalidLink,
    /// 既没有手动输入名称，也没有获取到远端名称
    #[error("请等待元数据获取完成或手动输入名称")]
    NameRequired,
}

/// 客户端统一错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// 本地校验失败
    #[error("{0}")]
    Validation(#[from] ValidationError),
    /// 远端服务拒绝请求
    #[error("{detail}")]
    Remote { status: u16, detail: String },
    /// 网络错误
    #[error("网络错误: {0}")]
    Transport(String),
}

impl ClientError {
    /// 是否为本地校验错误
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// 是否为远端拒绝
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// 是否为网络错误
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Transport(format!("请求超时: {}", e))
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
