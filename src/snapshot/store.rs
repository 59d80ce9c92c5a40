//! 已发布配置存储
//!
//! 使用 `ArcSwap` 保存当前快照。读取无锁，发布是一次指针替换，
//! 读者持有的旧快照在替换期间保持完整、不可变。

use crate::snapshot::comparer::fingerprint;
use crate::snapshot::mapping::FlatMap;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// 不可变配置快照
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// 扁平配置数据
    pub data: FlatMap,
    /// `data` 的指纹
    pub fingerprint: u64,
    /// 发布版本号，尚未发布时为 0
    pub version: u64,
}

impl Snapshot {
    /// 由扁平数据构建快照并计算指纹
    pub fn new(data: FlatMap) -> Self {
        let fingerprint = fingerprint(&data);
        Self {
            data,
            fingerprint,
            version: 0,
        }
    }

    /// 设置发布版本号
    pub fn with_version(self, version: u64) -> Self {
        Self { version, ..self }
    }
}

/// 当前可见的配置
pub struct PublishedStore {
    current: ArcSwap<Snapshot>,
}

impl PublishedStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::default()),
        }
    }

    /// 获取当前快照
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// 忽略大小写查找单个键
    pub fn try_get(&self, key: &str) -> Option<String> {
        self.current.load().data.get(key).map(str::to_string)
    }

    /// 整体替换快照
    pub fn publish(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// 手动覆盖单个键，同时更新指纹，版本号保持不变
    pub fn set(&self, key: &str, value: &str) {
        self.current.rcu(|current| {
            let mut data = current.data.clone();
            data.insert(key, value);
            Snapshot::new(data).with_version(current.version)
        });
    }
}

impl Default for PublishedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = PublishedStore::new();
        assert!(store.load().data.is_empty());
        assert_eq!(store.load().fingerprint, 0);
        assert_eq!(store.try_get("anything"), None);
    }

    #[test]
    fn test_readers_keep_old_snapshot_after_publish() {
        let store = PublishedStore::new();
        store.publish(Snapshot::new([("k", "old")].into_iter().collect()));

        let before = store.load();
        store.publish(Snapshot::new([("k", "new")].into_iter().collect()));

        assert_eq!(before.data.get("k"), Some("old"));
        assert_eq!(store.try_get("K").as_deref(), Some("new"));
    }

    #[test]
    fn test_set_updates_fingerprint() {
        let store = PublishedStore::new();
        store.publish(Snapshot::new([("a", "1")].into_iter().collect()));
        let before = store.load().fingerprint;

        store.set("b", "2");

        let after = store.load();
        assert_eq!(after.data.get("b"), Some("2"));
        assert_ne!(after.fingerprint, before);
        assert_eq!(after.fingerprint, fingerprint(&after.data));
    }

    #[test]
    fn test_version_swaps_with_data() {
        let store = PublishedStore::new();
        assert_eq!(store.load().version, 0);

        store.publish(Snapshot::new([("k", "v")].into_iter().collect()).with_version(3));
        let published = store.load();
        assert_eq!(published.version, 3);
        assert_eq!(published.data.get("k"), Some("v"));

        // 手动覆盖不产生新版本
        store.set("k", "override");
        assert_eq!(store.load().version, 3);
    }
}
