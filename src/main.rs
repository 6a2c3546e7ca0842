use anyhow::Context;
use clap::Parser;
use hana_download_client::common::{format_bytes, format_limit, speed_curve};
use hana_download_client::config::AppConfig;
use hana_download_client::remote::ServiceSettings;
use hana_download_client::{
    logging, AddDownloadForm, CommandDispatcher, RemoteClient, SyncEvent, TaskService,
    TaskSynchronizer, TransferOptions,
};
use std::sync::Arc;
use tracing::{info, warn};

mod cli;
use cli::{render_tasks, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 日志系统依赖配置，先加载配置，加载失败的原因在日志初始化后再输出
    let (mut config, load_error) = match AppConfig::load_from_file(&cli.config).await {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    if let Some(base_url) = &cli.base_url {
        config.remote.base_url = base_url.clone();
    }

    // 必须保持 _log_guard 存活
    let _log_guard = logging::init_logging(&config.log);
    match load_error {
        None => info!("配置文件加载成功: {}", cli.config),
        Some(e) => warn!("配置文件加载失败，使用默认配置: {:#}", e),
    }
    config.validate().context("配置无效")?;

    let service: Arc<dyn TaskService> = Arc::new(
        RemoteClient::new(&config.remote.base_url, config.remote.timeout())
            .context("创建任务服务客户端失败")?,
    );
    let synchronizer = Arc::new(TaskSynchronizer::new(
        Arc::clone(&service),
        config.polling.to_polling_config(),
    ));
    let dispatcher = Arc::new(CommandDispatcher::new(service, Arc::clone(&synchronizer)));

    match cli.command {
        Command::Watch { events } => watch(&synchronizer, events).await?,
        Command::List => {
            synchronizer.refresh().await;
            println!("{}", render_tasks(&synchronizer.tasks()));
        }
        Command::Add {
            url,
            filename,
            transfer,
        } => {
            let created = dispatcher
                .add_task(&url, filename.as_deref(), &transfer.into())
                .await?;
            println!("已添加任务: {} ({})", created.id, created.status);
        }
        Command::DriveClone {
            link,
            name,
            transfer,
        } => {
            let task_id = drive_clone(&dispatcher, &config, &link, name, transfer.into()).await?;
            println!("已添加云盘克隆任务: {}", task_id);
        }
        Command::Pause { id } => {
            dispatcher.pause(&id).await?;
            println!("已暂停: {}", id);
        }
        Command::Resume { id } => {
            dispatcher.resume(&id).await?;
            println!("已恢复: {}", id);
        }
        Command::Cancel { id, delete_file } => {
            dispatcher.cancel(&id, delete_file).await?;
            println!("已取消: {}", id);
        }
        Command::Rename { id, name } => {
            dispatcher.rename_task(&id, &name).await?;
            println!("已重命名: {} -> {}", id, name);
        }
        Command::Limit { id, value, slider } => {
            let limit_kbps = if slider {
                speed_curve::to_speed(value)
            } else if value.is_finite() && value > 0.0 {
                value.round() as u64
            } else {
                0
            };
            dispatcher.set_limit(&id, limit_kbps).await?;
            println!("已设置限速: {} -> {}", id, format_limit(limit_kbps));
        }
        Command::RefreshLink { id, url } => {
            dispatcher.refresh_link(&id, &url).await?;
            println!("已更新下载链接: {}", id);
        }
        Command::CheckFile { filename } => {
            if dispatcher.check_file_exists(&filename).await {
                println!("文件已存在: {}", filename);
            } else {
                println!("文件不存在: {}", filename);
            }
        }
        Command::Settings {
            download_dir,
            max_concurrent,
            max_connections,
            organize_files,
        } => {
            let mut settings = dispatcher.settings().await?;
            let changed = download_dir.is_some()
                || max_concurrent.is_some()
                || max_connections.is_some()
                || organize_files.is_some();
            if changed {
                if let Some(dir) = download_dir {
                    settings.download_dir = dir;
                }
                if let Some(n) = max_concurrent {
                    settings.max_concurrent_downloads = n;
                }
                if let Some(n) = max_connections {
                    settings.max_connections_per_task = n;
                }
                if let Some(organize) = organize_files {
                    settings.organize_files = organize;
                }
                settings = dispatcher.update_settings(settings).await?;
            }
            print_settings(&settings);
        }
        Command::DriveStatus => {
            let status = dispatcher.drive_status().await?;
            println!(
                "已上传凭证: {}\n已授权: {}",
                status.has_credentials, status.is_authenticated
            );
        }
    }

    Ok(())
}

/// 持续显示任务列表，直到收到 Ctrl-C
async fn watch(synchronizer: &Arc<TaskSynchronizer>, print_events: bool) -> anyhow::Result<()> {
    if print_events {
        synchronizer.add_event_callback(Arc::new(|event: SyncEvent| {
            if matches!(event, SyncEvent::TaskListRefreshed { .. }) {
                return;
            }
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{}", line);
            }
        }));
    }

    let mut rx = synchronizer.subscribe();
    synchronizer.start().await;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("监听 Ctrl-C 失败")?;
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                println!("{}\n", render_tasks(&snapshot));
            }
        }
    }

    synchronizer.stop();
    Ok(())
}

/// 云盘克隆：先等待元数据获取完成，再提交
async fn drive_clone(
    dispatcher: &Arc<CommandDispatcher>,
    config: &AppConfig,
    link: &str,
    name: Option<String>,
    transfer: TransferOptions,
) -> anyhow::Result<String> {
    let form = AddDownloadForm::new(Arc::clone(dispatcher), config.probe.to_probe_timings());
    if let Some(name) = &name {
        form.set_display_name(name);
    }

    let generation = form.set_drive_link(link);
    if let Some(Some(metadata)) = form.metadata_result(generation).await {
        let size = metadata
            .size_bytes()
            .map(format_bytes)
            .unwrap_or_else(|| "-".to_string());
        println!("云盘文件: {} ({}, {})", metadata.name, metadata.mime_type, size);
    }

    let result = form.submit_drive_clone(transfer).await;
    form.close();
    Ok(result?)
}

fn print_settings(settings: &ServiceSettings) {
    println!("下载目录: {}", settings.download_dir);
    println!("最大同时下载数: {}", settings.max_concurrent_downloads);
    println!("单任务最大连接数: {}", settings.max_connections_per_task);
    println!("按类型整理文件: {}", settings.organize_files);
}
