// 任务服务 HTTP 客户端实现

use crate::error::{ClientError, ClientResult};
use crate::remote::service::TaskService;
use crate::remote::types::{
    AddTaskRequest, CreatedTask, DownloadTask, DriveCloneRequest, DriveMetadata, DriveStatus,
    ErrorBody, FileExistsResponse, RefreshLinkRequest, RenameRequest, ServiceSettings,
    SpeedLimitRequest,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 默认服务地址
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// 云盘克隆响应
#[derive(Debug, Deserialize)]
struct DriveCloneResponse {
    #[serde(default)]
    status: String,
    task_id: String,
}

/// 任务服务客户端
#[derive(Debug, Clone)]
pub struct RemoteClient {
    /// HTTP客户端
    client: Client,
    /// 服务根地址（不含末尾 /）
    base_url: String,
}

impl RemoteClient {
    /// 创建新的任务服务客户端
    ///
    /// # 参数
    /// * `base_url` - 服务根地址，如 `http://127.0.0.1:8000/api`
    /// * `timeout` - 单次请求超时
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("创建 HTTP 客户端失败: {}", e)))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        info!(
            "初始化任务服务客户端: base_url={}, timeout={}s",
            base_url,
            timeout.as_secs()
        );

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// 单个任务的接口地址，任务 ID 会做百分号编码
    fn task_url(&self, task_id: &str, action: Option<&str>) -> String {
        let encoded = urlencoding::encode(task_id);
        match action {
            Some(action) => self.url(&format!("downloads/{}/{}", encoded, action)),
            None => self.url(&format!("downloads/{}", encoded)),
        }
    }

    /// 发送请求并读取响应体
    ///
    /// 非 2xx 响应转换为 `ClientError::Remote`，优先使用响应体中的 detail
    async fn send(&self, op: &str, request: RequestBuilder) -> ClientResult<String> {
        let response = request.send().await.map_err(|e| {
            warn!("{}请求失败: {}", op, e);
            ClientError::from(e)
        })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            warn!("读取{}响应失败: {}", op, e);
            ClientError::from(e)
        })?;

        debug!("{}响应: status={}, body={}", op, status, response_text);

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&response_text)
                .ok()
                .and_then(|body| body.message())
                .unwrap_or_else(|| format!("HTTP {}", status));
            error!("{}失败: status={}, detail={}", op, status, detail);
            return Err(ClientError::Remote {
                status: status.as_u16(),
                detail,
            });
        }

        Ok(response_text)
    }

    /// 发送请求并解析 JSON 响应
    async fn send_json<T: DeserializeOwned>(
        &self,
        op: &str,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        let response_text = self.send(op, request).await?;
        serde_json::from_str(&response_text).map_err(|e| {
            error!(
                "解析{}响应失败: error={}, response_text={}",
                op, e, response_text
            );
            ClientError::Transport(format!("解析{}响应失败: {}", op, e))
        })
    }
}

#[async_trait]
impl TaskService for RemoteClient {
    async fn list_tasks(&self) -> ClientResult<Vec<DownloadTask>> {
        let tasks: Vec<DownloadTask> = self
            .send_json("查询任务列表", self.client.get(self.url("downloads")))
            .await?;
        debug!("查询到 {} 个下载任务", tasks.len());
        Ok(tasks)
    }

    async fn add_task(&self, request: &AddTaskRequest) -> ClientResult<CreatedTask> {
        info!(
            "添加下载任务: url={}, filename={:?}, speed_limit={}",
            request.url, request.filename, request.speed_limit
        );
        let created: CreatedTask = self
            .send_json(
                "添加下载任务",
                self.client.post(self.url("downloads")).json(request),
            )
            .await?;
        info!("添加下载任务成功: id={}, status={}", created.id, created.status);
        Ok(created)
    }

    async fn pause(&self, task_id: &str) -> ClientResult<()> {
        info!("暂停任务: task_id={}", task_id);
        self.send("暂停任务", self.client.post(self.task_url(task_id, Some("pause"))))
            .await?;
        Ok(())
    }

    async fn resume(&self, task_id: &str) -> ClientResult<()> {
        info!("恢复任务: task_id={}", task_id);
        self.send("恢复任务", self.client.post(self.task_url(task_id, Some("resume"))))
            .await?;
        Ok(())
    }

    async fn set_limit(&self, task_id: &str, limit_kbps: u64) -> ClientResult<()> {
        info!("设置限速: task_id={}, limit={} KB/s", task_id, limit_kbps);
        let body = SpeedLimitRequest { limit: limit_kbps };
        self.send(
            "设置限速",
            self.client
                .post(self.task_url(task_id, Some("limit")))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn rename(&self, task_id: &str, filename: &str) -> ClientResult<()> {
        info!("重命名任务: task_id={}, filename={}", task_id, filename);
        let body = RenameRequest {
            filename: filename.to_string(),
        };
        self.send(
            "重命名任务",
            self.client
                .post(self.task_url(task_id, Some("rename")))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn refresh_link(&self, task_id: &str, url: &str) -> ClientResult<()> {
        info!("刷新下载链接: task_id={}", task_id);
        let body = RefreshLinkRequest {
            url: url.to_string(),
        };
        self.send(
            "刷新下载链接",
            self.client
                .post(self.task_url(task_id, Some("refresh_link")))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn cancel(&self, task_id: &str, delete_file: bool) -> ClientResult<()> {
        info!("取消任务: task_id={}, delete_file={}", task_id, delete_file);
        let url = format!("{}?delete_file={}", self.task_url(task_id, None), delete_file);
        self.send("取消任务", self.client.delete(url)).await?;
        Ok(())
    }

    async fn get_settings(&self) -> ClientResult<ServiceSettings> {
        self.send_json("获取设置", self.client.get(self.url("settings")))
            .await
    }

    async fn update_settings(&self, settings: &ServiceSettings) -> ClientResult<()> {
        info!(
            "更新设置: download_dir={}, max_concurrent_downloads={}, max_connections_per_task={}",
            settings.download_dir,
            settings.max_concurrent_downloads,
            settings.max_connections_per_task
        );
        self.send(
            "更新设置",
            self.client.post(self.url("settings")).json(settings),
        )
        .await?;
        Ok(())
    }

    async fn file_exists(&self, filename: &str) -> ClientResult<bool> {
        let url = format!(
            "{}?filename={}",
            self.url("downloads/check_file"),
            urlencoding::encode(filename)
        );
        let response: FileExistsResponse =
            self.send_json("检查文件", self.client.get(url)).await?;
        Ok(response.exists)
    }

    async fn drive_status(&self) -> ClientResult<DriveStatus> {
        self.send_json("获取云盘状态", self.client.get(self.url("drive/status")))
            .await
    }

    async fn drive_metadata(&self, file_id: &str) -> ClientResult<DriveMetadata> {
        let url = format!(
            "{}?file_id={}",
            self.url("drive/metadata"),
            urlencoding::encode(file_id)
        );
        self.send_json("获取云盘元数据", self.client.get(url)).await
    }

    async fn drive_clone(&self, request: &DriveCloneRequest) -> ClientResult<String> {
        info!(
            "云盘克隆: file_id={}, name={}, mime_type={}",
            request.file_id, request.name, request.mime_type
        );
        let response: DriveCloneResponse = self
            .send_json(
                "云盘克隆",
                self.client.post(self.url("drive/clone")).json(request),
            )
            .await?;
        info!(
            "云盘克隆任务已创建: task_id={}, status={}",
            response.task_id, response.status
        );
        Ok(response.task_id)
    }
}
