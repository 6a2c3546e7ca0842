// 配置管理模块

use crate::dispatcher::ProbeTimings;
use crate::remote::DEFAULT_BASE_URL;
use crate::sync::PollingConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/client.toml";

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 任务服务配置
    #[serde(default)]
    pub remote: RemoteConfig,
    /// 轮询配置
    #[serde(default)]
    pub polling: PollingSettings,
    /// 输入检查配置
    #[serde(default)]
    pub probe: ProbeSettings,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 任务服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// 服务根地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 请求超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 轮询配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingSettings {
    /// 有活跃任务时的轮询间隔（毫秒）
    #[serde(default = "default_active_interval_ms")]
    pub active_interval_ms: u64,
    /// 无活跃任务时的轮询间隔（毫秒）
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,
}

fn default_active_interval_ms() -> u64 {
    1000
}

fn default_idle_interval_ms() -> u64 {
    5000
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            active_interval_ms: default_active_interval_ms(),
            idle_interval_ms: default_idle_interval_ms(),
        }
    }
}

impl PollingSettings {
    /// 转换为同步器轮询配置
    pub fn to_polling_config(&self) -> PollingConfig {
        PollingConfig {
            active_interval: Duration::from_millis(self.active_interval_ms),
            idle_interval: Duration::from_millis(self.idle_interval_ms),
        }
    }
}

/// 输入检查配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// 文件名检查静置时长（毫秒）
    #[serde(default = "default_file_check_settle_ms")]
    pub file_check_settle_ms: u64,
    /// 云盘元数据获取静置时长（毫秒）
    #[serde(default = "default_metadata_settle_ms")]
    pub metadata_settle_ms: u64,
}

fn default_file_check_settle_ms() -> u64 {
    500
}

fn default_metadata_settle_ms() -> u64 {
    800
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            file_check_settle_ms: default_file_check_settle_ms(),
            metadata_settle_ms: default_metadata_settle_ms(),
        }
    }
}

impl ProbeSettings {
    /// 转换为表单探测器配置
    pub fn to_probe_timings(&self) -> ProbeTimings {
        ProbeTimings {
            file_check_settle: Duration::from_millis(self.file_check_settle_ms),
            metadata_settle: Duration::from_millis(self.metadata_settle_ms),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否启用日志文件持久化
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件保存目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（默认 7 天）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_enabled() -> bool {
    false
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        let base_url = self.remote.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            anyhow::bail!("服务地址必须以 http:// 或 https:// 开头: {}", base_url);
        }
        if self.remote.timeout_secs == 0 {
            anyhow::bail!("请求超时必须大于 0");
        }
        if self.polling.active_interval_ms == 0 || self.polling.idle_interval_ms == 0 {
            anyhow::bail!("轮询间隔必须大于 0");
        }
        Ok(())
    }

    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate().context("配置文件校验失败")?;

        Ok(config)
    }

    /// 保存配置到文件
    pub async fn save_to_file(&self, path: &str) -> Result<()> {
        self.validate().context("保存配置失败")?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        // 确保父目录存在
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }

        fs::write(path, content)
            .await
            .context("Failed to write config file")?;

        tracing::info!("配置已保存: {}", path);
        Ok(())
    }
}
