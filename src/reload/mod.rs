//! 配置重载模块
//!
//! 提供重载引擎、后台轮询和重载状态等待功能

pub mod engine;
pub mod gate;

// 重新导出主要类型
pub use engine::{wait_all, PollerHandle, ReloadEngine, ReloadNotification, ReloadOutcome};
pub use gate::{ReloadGate, ReloadGuard, ReloadState};
