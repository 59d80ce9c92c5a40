//! 重载引擎模块
//!
//! 负责拉取 → 扁平化 → 比较 → 发布 → 通知的完整周期，
//! 以及后台轮询循环和重载状态的可观测性

use crate::config::{validate_options, AppConfigOptions, PollInterval};
use crate::error::{AppConfigError, OptionsError, ReloadError};
use crate::fetch::{ConfigFetcher, HttpConfigFetcher};
use crate::reload::gate::{ReloadGate, ReloadState};
use crate::snapshot::comparer::{self, SnapshotDiff};
use crate::snapshot::{flatten, PublishedStore, Snapshot};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 配置重载完成通知
#[derive(Debug, Clone)]
pub struct ReloadNotification {
    /// 快照版本号，首次发布为 1
    pub version: u64,
    /// 相对上一快照的差异
    pub diff: SnapshotDiff,
    /// 新快照的键数量
    pub key_count: usize,
    /// 新快照的指纹
    pub fingerprint: u64,
    /// 发布时间
    pub timestamp: DateTime<Utc>,
}

/// 单个周期的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// 发布了新快照
    Published { version: u64 },
    /// 内容未变化，未发布
    Unchanged,
}

/// 重载引擎
///
/// 克隆开销很小，所有克隆共享同一份状态。
#[derive(Clone)]
pub struct ReloadEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    /// 配置拉取器
    fetcher: Arc<dyn ConfigFetcher>,
    /// 已发布配置
    store: PublishedStore,
    /// 重载状态门
    gate: ReloadGate,
    /// 串行化所有周期
    cycle_lock: Mutex<()>,
    /// 轮询节奏
    poll_interval: PollInterval,
    /// 重载通知发送器
    update_sender: broadcast::Sender<ReloadNotification>,
    /// 引擎生命周期的取消令牌
    shutdown: CancellationToken,
}

/// 后台轮询任务句柄
pub struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// 停止轮询并等待任务结束
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("轮询任务异常结束: {}", e);
        }
    }

    /// 轮询任务是否已经结束
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl ReloadEngine {
    /// 创建新的重载引擎
    ///
    /// # 参数
    /// * `fetcher` - 配置拉取器
    /// * `poll_interval` - 轮询节奏
    pub fn new(fetcher: Arc<dyn ConfigFetcher>, poll_interval: PollInterval) -> Self {
        let (update_sender, _) = broadcast::channel(32);

        Self {
            inner: Arc::new(EngineInner {
                fetcher,
                store: PublishedStore::new(),
                gate: ReloadGate::new(),
                cycle_lock: Mutex::new(()),
                poll_interval,
                update_sender,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// 根据选项创建使用 HTTP 拉取器的引擎
    ///
    /// 选项先经过校验，轮询间隔为 0 等无效选项返回 `ValidationError`。
    pub fn from_options(options: &AppConfigOptions) -> Result<Self, AppConfigError> {
        validate_options(options).map_err(OptionsError::ValidationError)?;
        let fetcher = HttpConfigFetcher::new(options)?;
        Ok(Self::new(Arc::new(fetcher), options.poll_interval()))
    }

    /// 首次加载
    ///
    /// 执行一个完整周期，所有失败都返回给调用方。
    pub async fn load(&self) -> Result<ReloadOutcome, ReloadError> {
        info!("首次加载配置: {}", self.inner.fetcher.endpoint());

        self.run_cycle(&self.inner.shutdown).await.inspect_err(|e| {
            error!(kind = e.kind(), "首次加载配置失败: {}", e);
        })
    }

    /// 启动后台轮询
    ///
    /// 轮询节奏为 `Never` 时任务立即结束。
    pub fn start(&self) -> PollerHandle {
        let cancel = self.inner.shutdown.child_token();
        let engine = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { engine.poll_loop(token).await });

        PollerHandle { cancel, task }
    }

    /// 轮询主循环：等待一个间隔，执行一个周期，如此往复
    async fn poll_loop(self, cancel: CancellationToken) {
        let Some(interval) = self.inner.poll_interval.as_duration() else {
            info!("轮询已禁用，仅使用初始加载的配置");
            return;
        };

        info!("启动配置轮询，间隔: {:?}", interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            match self.run_cycle(&cancel).await {
                Ok(ReloadOutcome::Published { version }) => {
                    debug!("轮询发布了新配置，版本: {}", version);
                }
                Ok(ReloadOutcome::Unchanged) => {
                    debug!("配置无变化");
                }
                Err(ReloadError::Canceled) if cancel.is_cancelled() => break,
                Err(e) => {
                    warn!(kind = e.kind(), "重载配置失败: {}，继续使用缓存的配置", e);
                }
            }
        }

        info!("配置轮询已停止");
    }

    /// 执行一个重载周期
    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<ReloadOutcome, ReloadError> {
        let _serial = self.inner.cycle_lock.lock().await;
        let _in_progress = self.inner.gate.enter();

        let fetch = self.inner.fetcher.fetch();
        let document = match self.inner.poll_interval.as_duration() {
            Some(limit) => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReloadError::Canceled),
                result = tokio::time::timeout(limit, fetch) => {
                    result.map_err(|_| ReloadError::Timeout)??
                }
            },
            None => tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReloadError::Canceled),
                result = fetch => result?,
            },
        };

        let candidate = flatten(&document)?;
        Ok(self.publish_if_changed(Snapshot::new(candidate)))
    }

    /// 与当前快照比较，有变化时发布并通知
    fn publish_if_changed(&self, candidate: Snapshot) -> ReloadOutcome {
        let current = self.inner.store.load();

        if !comparer::has_changed(
            &candidate.data,
            candidate.fingerprint,
            &current.data,
            current.fingerprint,
        ) {
            return ReloadOutcome::Unchanged;
        }

        let diff = comparer::diff(&current.data, &candidate.data);
        let key_count = candidate.data.len();
        let fingerprint = candidate.fingerprint;

        // 周期已串行化，版本号随快照在同一次替换中可见
        let version = current.version + 1;
        self.inner.store.publish(candidate.with_version(version));

        info!(
            version,
            key_count,
            added = diff.added.len(),
            removed = diff.removed.len(),
            modified = diff.modified.len(),
            "配置已重载"
        );

        let notification = ReloadNotification {
            version,
            diff,
            key_count,
            fingerprint,
            timestamp: Utc::now(),
        };

        if self.inner.update_sender.send(notification).is_err() {
            debug!("没有重载通知的订阅者");
        }

        ReloadOutcome::Published { version }
    }

    /// 忽略大小写查找单个配置值
    pub fn try_get(&self, key: &str) -> Option<String> {
        self.inner.store.try_get(key)
    }

    /// 手动覆盖单个配置值
    ///
    /// 指纹随之更新，后续拉取到的相同内容会被正确识别为变化。
    pub fn set(&self, key: &str, value: &str) {
        self.inner.store.set(key, value);
    }

    /// 当前快照
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.load()
    }

    /// 订阅重载通知
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadNotification> {
        self.inner.update_sender.subscribe()
    }

    /// 当前重载状态
    pub fn state(&self) -> ReloadState {
        self.inner.gate.state()
    }

    /// 已发布快照的版本号，尚未发布时为 0
    pub fn version(&self) -> u64 {
        self.inner.store.load().version
    }

    /// 拉取目标
    pub fn endpoint(&self) -> &str {
        self.inner.fetcher.endpoint()
    }

    /// 等待正在进行的重载结束
    ///
    /// 没有重载在进行时立即返回；`cancel` 先触发时返回 `Canceled`。
    pub async fn wait_for_reload_to_complete(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), ReloadError> {
        tokio::select! {
            biased;
            _ = self.inner.gate.wait_idle() => Ok(()),
            _ = cancel.cancelled() => Err(ReloadError::Canceled),
        }
    }

    /// 关闭引擎：取消进行中的拉取并停止所有轮询任务
    pub fn close(&self) {
        self.inner.shutdown.cancel();
    }
}

/// 等待多个引擎各自的重载结束
pub async fn wait_all(
    engines: &[ReloadEngine],
    cancel: &CancellationToken,
) -> Result<(), ReloadError> {
    let waits = engines
        .iter()
        .map(|engine| engine.wait_for_reload_to_complete(cancel));
    futures::future::try_join_all(waits).await.map(|_| ())
}
