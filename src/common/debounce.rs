//! 防抖探测器
//!
//! 输入停止变化一段时间后才执行一次异步检查，用于：
//! - 文件名是否已存在
//! - 云盘链接元数据获取
//!
//! 新输入到达时取消尚未完成的旧检查，旧检查的结果不会被发布

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 异步检查函数
pub type ProbeCheck<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, O> + Send + Sync>;

/// 一次检查的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult<O> {
    /// 对应的输入代数
    pub generation: u64,
    /// 检查结果
    pub value: O,
}

/// 防抖探测器
pub struct DebouncedProbe<I, O> {
    /// 名称（用于日志）
    name: &'static str,
    /// 静置时长
    settle: Duration,
    /// 检查函数
    check: ProbeCheck<I, O>,
    /// 最新输入的代数
    generation: Arc<AtomicU64>,
    /// 待执行检查的取消令牌
    pending: Mutex<Option<CancellationToken>>,
    /// 整体关闭令牌
    shutdown_token: CancellationToken,
    /// 结果发布通道
    result_tx: Arc<watch::Sender<Option<ProbeResult<O>>>>,
}

impl<I, O> DebouncedProbe<I, O>
where
    I: Send + 'static,
    O: Clone + Send + Sync + 'static,
{
    /// 创建防抖探测器
    ///
    /// # 参数
    /// * `name` - 日志中显示的名称
    /// * `settle` - 输入静置多久后执行检查
    /// * `check` - 异步检查函数，自行处理失败（视为"不存在"）
    pub fn new<F, Fut>(name: &'static str, settle: Duration, check: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        let check: ProbeCheck<I, O> = Arc::new(move |input| check(input).boxed());
        let (result_tx, _) = watch::channel(None);
        Self {
            name,
            settle,
            check,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
            shutdown_token: CancellationToken::new(),
            result_tx: Arc::new(result_tx),
        }
    }

    /// 提交新输入
    ///
    /// 取消尚未执行完的旧检查，返回本次输入的代数
    pub fn update(&self, input: I) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if self.shutdown_token.is_cancelled() {
            debug!("{} 已关闭，忽略输入: generation={}", self.name, generation);
            return generation;
        }

        let token = self.shutdown_token.child_token();
        if let Some(previous) = self.pending.lock().replace(token.clone()) {
            previous.cancel();
        }

        let name = self.name;
        let settle = self.settle;
        let check = Arc::clone(&self.check);
        let latest = Arc::clone(&self.generation);
        let result_tx = Arc::clone(&self.result_tx);

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(settle) => {}
                _ = token.cancelled() => {
                    debug!("{} 检查已取消（等待期间）: generation={}", name, generation);
                    return;
                }
            }

            let value = tokio::select! {
                value = check(input) => value,
                _ = token.cancelled() => {
                    debug!("{} 检查已取消（执行期间）: generation={}", name, generation);
                    return;
                }
            };

            // 执行期间有更新的输入，丢弃旧结果
            if latest.load(Ordering::SeqCst) != generation || token.is_cancelled() {
                debug!("{} 丢弃过期结果: generation={}", name, generation);
                return;
            }

            result_tx.send_replace(Some(ProbeResult { generation, value }));
            debug!("{} 检查完成: generation={}", name, generation);
        });

        generation
    }

    /// 最新输入的检查结果
    ///
    /// 最新输入尚未检查完成时返回 `None`，不会退回到旧输入的结果
    pub fn latest(&self) -> Option<O> {
        let current = self.generation.load(Ordering::SeqCst);
        self.result_tx
            .borrow()
            .as_ref()
            .filter(|r| r.generation == current)
            .map(|r| r.value.clone())
    }

    /// 订阅结果变化
    pub fn subscribe(&self) -> watch::Receiver<Option<ProbeResult<O>>> {
        self.result_tx.subscribe()
    }

    /// 等待指定代数输入的检查结果
    ///
    /// 若该输入已被更新的输入取代，或探测器已关闭，返回 `None`
    pub async fn result_for(&self, generation: u64) -> Option<O> {
        let mut rx = self.result_tx.subscribe();
        let published = tokio::select! {
            r = rx.wait_for(|r| r.as_ref().map_or(false, |r| r.generation >= generation)) => {
                r.ok().and_then(|r| (*r).clone())
            }
            _ = self.shutdown_token.cancelled() => None,
        };

        published
            .filter(|r| r.generation == generation)
            .map(|r| r.value)
    }

    /// 关闭探测器，取消所有待执行的检查
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
        self.pending.lock().take();
        debug!("{} 已关闭", self.name);
    }
}

impl<I, O> Drop for DebouncedProbe<I, O> {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
