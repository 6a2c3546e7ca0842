//! 任务同步器
//!
//! 通过自适应轮询保持本地任务列表与远端服务一致：
//! - 有活跃任务（下载中/解压中/排队中/等待中）时 1 秒轮询一次
//! - 否则 5 秒轮询一次
//! - 只有活跃/空闲分类发生翻转时才重建定时器
//!
//! ## 设计要点
//! - 缓存只会被整体替换（一次 `Arc` 交换），刷新失败时保留旧缓存
//! - 所有刷新经同一把异步锁串行执行，后完成的响应覆盖先完成的
//! - `stop()` 返回后，定时刷新不会再修改缓存

use crate::remote::service::TaskService;
use crate::remote::types::{has_active_task, DownloadTask};
use crate::sync::events::{diff_snapshots, EventCallback, SyncEvent};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 任务快照
pub type TaskSnapshot = Arc<Vec<DownloadTask>>;

// =====================================================
// 轮询配置
// =====================================================

/// 轮询配置
#[derive(Debug, Clone, PartialEq)]
pub struct PollingConfig {
    /// 有活跃任务时的轮询间隔（默认 1 秒）
    pub active_interval: Duration,
    /// 无活跃任务时的轮询间隔（默认 5 秒）
    pub idle_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            active_interval: Duration::from_millis(1000),
            idle_interval: Duration::from_millis(5000),
        }
    }
}

impl PollingConfig {
    /// 根据活跃状态选择轮询间隔
    pub fn interval_for(&self, has_active_task: bool) -> Duration {
        if has_active_task {
            self.active_interval
        } else {
            self.idle_interval
        }
    }
}

/// 运行期状态（取消令牌与后台循环句柄）
#[derive(Default)]
struct Lifecycle {
    cancel_token: Option<CancellationToken>,
    loop_handle: Option<JoinHandle<()>>,
}

// =====================================================
// 任务同步器
// =====================================================

/// 任务同步器
///
/// 负责后台轮询任务列表，并通过快照通道和事件回调通知使用方
pub struct TaskSynchronizer {
    /// 任务服务
    service: Arc<dyn TaskService>,
    /// 轮询配置
    config: PollingConfig,
    /// 本地任务缓存
    cache: RwLock<TaskSnapshot>,
    /// 快照发布通道
    snapshot_tx: watch::Sender<TaskSnapshot>,
    /// 刷新串行锁
    refresh_gate: tokio::sync::Mutex<()>,
    /// 最近一次快照中是否有活跃任务
    has_active: AtomicBool,
    /// 活跃/空闲分类翻转通知
    mode_changed: Notify,
    /// 事件回调列表
    event_callbacks: RwLock<Vec<EventCallback>>,
    /// 是否正在运行
    running: AtomicBool,
    /// 运行期状态
    lifecycle: Mutex<Lifecycle>,
}

impl TaskSynchronizer {
    /// 创建新的任务同步器
    pub fn new(service: Arc<dyn TaskService>, config: PollingConfig) -> Self {
        let empty: TaskSnapshot = Arc::new(Vec::new());
        let (snapshot_tx, _) = watch::channel(Arc::clone(&empty));
        Self {
            service,
            config,
            cache: RwLock::new(empty),
            snapshot_tx,
            refresh_gate: tokio::sync::Mutex::new(()),
            has_active: AtomicBool::new(false),
            mode_changed: Notify::new(),
            event_callbacks: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// 当前任务快照
    pub fn tasks(&self) -> TaskSnapshot {
        Arc::clone(&self.cache.read())
    }

    /// 按 ID 查找任务
    pub fn find_task(&self, task_id: &str) -> Option<DownloadTask> {
        self.cache.read().iter().find(|t| t.id == task_id).cloned()
    }

    /// 订阅快照变化
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// 添加事件回调
    pub fn add_event_callback(&self, callback: EventCallback) {
        self.event_callbacks.write().push(callback);
    }

    /// 最近一次快照中是否有活跃任务
    pub fn has_active_task(&self) -> bool {
        self.has_active.load(Ordering::SeqCst)
    }

    /// 当前应使用的轮询间隔
    pub fn next_delay(&self) -> Duration {
        self.config.interval_for(self.has_active_task())
    }

    /// 检查是否正在运行
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ==================== 刷新 ====================

    /// 立即刷新任务列表
    ///
    /// 失败时只记录日志，保留现有缓存
    pub async fn refresh(&self) {
        self.refresh_guarded(None).await;
    }

    /// 刷新任务列表
    ///
    /// 传入取消令牌时，令牌被取消后不再写入缓存。返回是否替换了缓存
    async fn refresh_guarded(&self, token: Option<&CancellationToken>) -> bool {
        let gate = self.refresh_gate.lock().await;

        let tasks = match self.service.list_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!("刷新任务列表失败，保留现有缓存: {}", e);
                return false;
            }
        };

        let previous = {
            // 与 stop() 互斥，保证 stop() 返回后不会再有定时刷新写入
            let _lifecycle = token.map(|_| self.lifecycle.lock());
            if token.map_or(false, |t| t.is_cancelled()) {
                debug!("同步器已停止，丢弃本次刷新结果");
                return false;
            }
            self.replace_cache(tasks)
        };

        let current = self.tasks();
        // 回调在刷新锁之外执行
        drop(gate);
        self.publish_events(&previous, &current);
        true
    }

    /// 整体替换缓存，返回旧快照
    fn replace_cache(&self, tasks: Vec<DownloadTask>) -> TaskSnapshot {
        let active = has_active_task(&tasks);
        let count = tasks.len();
        let snapshot: TaskSnapshot = Arc::new(tasks);

        let previous = std::mem::replace(&mut *self.cache.write(), Arc::clone(&snapshot));
        self.snapshot_tx.send_replace(snapshot);

        let was_active = self.has_active.swap(active, Ordering::SeqCst);
        if was_active != active {
            info!(
                "任务活跃状态变化: {} -> {}, 轮询间隔调整为 {:?}",
                was_active,
                active,
                self.config.interval_for(active)
            );
            self.mode_changed.notify_one();
        }

        debug!("任务列表已刷新: count={}, has_active={}", count, active);
        previous
    }

    /// 对比前后快照并发布事件，没有注册回调时不做对比
    fn publish_events(&self, previous: &[DownloadTask], current: &[DownloadTask]) {
        let callbacks = self.event_callbacks.read().clone();
        if callbacks.is_empty() {
            return;
        }

        for event in diff_snapshots(previous, current) {
            if event.task_id().is_some() {
                info!(
                    "发布同步事件: type={}, task_id={:?}",
                    event.event_type_name(),
                    event.task_id()
                );
            }
            for callback in callbacks.iter() {
                callback(event.clone());
            }
        }
    }

    // ==================== 生命周期 ====================

    /// 启动同步器
    ///
    /// 立即刷新一次，然后启动后台定时轮询。重复调用不会创建多个定时器
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("任务同步器已在运行");
            return;
        }

        let token = CancellationToken::new();
        self.lifecycle.lock().cancel_token = Some(token.clone());
        info!(
            "任务同步器已启动: active_interval={:?}, idle_interval={:?}",
            self.config.active_interval, self.config.idle_interval
        );

        self.refresh_guarded(Some(&token)).await;

        let mut lifecycle = self.lifecycle.lock();
        if token.is_cancelled() {
            return;
        }
        let handle = tokio::spawn(Arc::clone(self).run_loop(token));
        lifecycle.loop_handle = Some(handle);
    }

    /// 停止同步器
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("任务同步器未运行，忽略停止请求");
            return;
        }

        let mut lifecycle = self.lifecycle.lock();
        if let Some(token) = lifecycle.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = lifecycle.loop_handle.take() {
            handle.abort();
        }
        info!("任务同步器已停止");
    }

    /// 后台轮询循环
    async fn run_loop(self: Arc<Self>, token: CancellationToken) {
        let mut armed_active = self.has_active_task();
        let mut ticker = self.build_ticker(armed_active);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = self.mode_changed.notified() => {}
                _ = ticker.tick() => {
                    debug!("定时刷新任务列表");
                    self.refresh_guarded(Some(&token)).await;
                }
            }

            let active = self.has_active_task();
            if active != armed_active {
                armed_active = active;
                ticker = self.build_ticker(active);
                debug!("轮询定时器已重建: interval={:?}", self.config.interval_for(active));
            }
        }

        debug!("任务同步循环已退出");
    }

    /// 创建定时器，首次触发在一个周期之后
    fn build_ticker(&self, has_active_task: bool) -> Interval {
        let period = self.config.interval_for(has_active_task);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

// =====================================================
// 单元测试
// =====================================================
