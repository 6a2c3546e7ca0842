//! 命令行参数与输出格式

use clap::{Args, Parser, Subcommand};
use hana_download_client::common::{format_bytes, format_limit, format_speed};
use hana_download_client::config::DEFAULT_CONFIG_PATH;
use hana_download_client::{DownloadTask, TaskStatus, TransferOptions};

/// 远端下载任务客户端
#[derive(Parser, Debug)]
#[command(name = "hana-client")]
#[command(version)]
#[command(about = "查看和控制远端下载服务中的任务", long_about = None)]
pub struct Cli {
    /// 配置文件路径
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// 覆盖配置中的服务地址
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// 传输选项参数
#[derive(Args, Debug, Clone, Default)]
pub struct TransferArgs {
    /// 完成后自动解压
    #[arg(long)]
    pub auto_extract: bool,

    /// 限速（KB/s，0 表示不限速）
    #[arg(long, value_name = "KBPS", default_value_t = 0)]
    pub limit: u64,

    /// 最大连接数（不指定则使用服务端设置）
    #[arg(long, value_name = "N")]
    pub connections: Option<u32>,
}

impl From<TransferArgs> for TransferOptions {
    fn from(args: TransferArgs) -> Self {
        TransferOptions {
            auto_extract: args.auto_extract,
            speed_limit: args.limit,
            max_connections: args.connections,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 持续显示任务列表（Ctrl-C 退出）
    Watch {
        /// 同时以 JSON 行输出状态变化事件
        #[arg(long)]
        events: bool,
    },
    /// 显示一次任务列表
    List,
    /// 添加下载任务
    Add {
        /// 下载链接
        url: String,
        /// 自定义文件名
        #[arg(long)]
        filename: Option<String>,
        #[command(flatten)]
        transfer: TransferArgs,
    },
    /// 从云盘链接克隆
    DriveClone {
        /// 云盘分享链接或资源 ID
        link: String,
        /// 保存名称（不指定则使用云盘中的名称）
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        transfer: TransferArgs,
    },
    /// 暂停任务
    Pause { id: String },
    /// 恢复任务
    Resume { id: String },
    /// 取消任务
    Cancel {
        id: String,
        /// 同时删除已下载的文件
        #[arg(long)]
        delete_file: bool,
    },
    /// 重命名任务
    Rename { id: String, name: String },
    /// 设置限速
    Limit {
        id: String,
        /// 限速值（KB/s）；使用 --slider 时为 0-100 的滑块值
        value: f64,
        /// 按滑块曲线换算
        #[arg(long)]
        slider: bool,
    },
    /// 替换任务的下载链接
    RefreshLink { id: String, url: String },
    /// 检查下载目录中是否已有同名文件
    CheckFile { filename: String },
    /// 查看或修改服务设置
    Settings {
        #[arg(long)]
        download_dir: Option<String>,
        #[arg(long)]
        max_concurrent: Option<u32>,
        #[arg(long)]
        max_connections: Option<u32>,
        #[arg(long)]
        organize_files: Option<bool>,
    },
    /// 查看云盘授权状态
    DriveStatus,
}

/// 单个任务的展示行
pub fn render_task(task: &DownloadTask) -> String {
    let size = if task.is_size_unknown() {
        format!("{} / 未知", format_bytes(task.downloaded_size))
    } else {
        format!(
            "{} / {}",
            format_bytes(task.downloaded_size),
            format_bytes(task.total_size)
        )
    };
    let speed = if task.status == TaskStatus::Downloading {
        format_speed(task.speed)
    } else {
        "-".to_string()
    };

    let mut line = format!(
        "{:<12} {:<11} {:>3}%  {:<24} {:<14} {:<12} {}",
        task.id,
        task.status,
        task.progress,
        size,
        speed,
        format_limit(task.speed_limit),
        task.filename
    );
    if let Some(message) = &task.error_message {
        line.push_str(&format!("  ({})", message));
    }
    line
}

/// 任务列表
pub fn render_tasks(tasks: &[DownloadTask]) -> String {
    if tasks.is_empty() {
        return "暂无任务".to_string();
    }
    tasks
        .iter()
        .map(render_task)
        .collect::<Vec<_>>()
        .join("\n")
}
