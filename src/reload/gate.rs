//! 重载状态门
//!
//! 记录当前是否有重载周期在执行，并允许调用方等待其结束

use tokio::sync::watch;

/// 重载状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    /// 空闲
    Idle,
    /// 重载进行中
    InProgress,
}

/// 重载状态门
#[derive(Debug)]
pub struct ReloadGate {
    state: watch::Sender<ReloadState>,
}

/// 进入 `InProgress` 后返回的守卫，析构时恢复 `Idle`
#[must_use = "守卫被丢弃时状态会立即恢复为 Idle"]
#[derive(Debug)]
pub struct ReloadGuard<'a> {
    gate: &'a ReloadGate,
}

impl ReloadGate {
    /// 创建处于 `Idle` 的状态门
    pub fn new() -> Self {
        let (state, _) = watch::channel(ReloadState::Idle);
        Self { state }
    }

    /// 当前状态
    pub fn state(&self) -> ReloadState {
        *self.state.borrow()
    }

    /// 标记重载开始
    pub fn enter(&self) -> ReloadGuard<'_> {
        self.state.send_replace(ReloadState::InProgress);
        ReloadGuard { gate: self }
    }

    /// 等待直到状态为 `Idle`；已经空闲时立即返回
    pub async fn wait_idle(&self) {
        let mut receiver = self.state.subscribe();
        // 发送端与状态门同生命周期，这里不会收到关闭错误
        let _ = receiver
            .wait_for(|state| *state == ReloadState::Idle)
            .await;
    }
}

impl Default for ReloadGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReloadGuard<'_> {
    fn drop(&mut self) {
        self.gate.state.send_replace(ReloadState::Idle);
    }
}
