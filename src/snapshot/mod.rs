//! 配置快照模块
//!
//! 提供扁平化、快照比较和已发布配置存储

pub mod comparer;
pub mod flatten;
pub mod mapping;
pub mod store;

// 重新导出主要类型
pub use comparer::{diff, equals, fingerprint, SnapshotDiff};
pub use flatten::flatten;
pub use mapping::{FlatMap, KEY_DELIMITER};
pub use store::{PublishedStore, Snapshot};
