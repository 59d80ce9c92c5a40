//! 配置拉取模块
//!
//! 提供访问本地 AppConfig 扩展的拉取接口和 HTTP 实现

pub mod fetcher;

// 重新导出主要类型
pub use fetcher::{ConfigFetcher, HttpConfigFetcher};
