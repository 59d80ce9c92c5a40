//! 快照比较
//!
//! 键忽略大小写比较，值严格按字节比较。指纹与 `equals` 保持一致：
//! 相等的映射指纹一定相同；指纹只用于快速判定“已变化”，
//! “未变化”必须由 `equals` 确认。

use crate::snapshot::mapping::FlatMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// 两个快照之间的键级差异
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// 新增的键
    pub added: Vec<String>,
    /// 移除的键
    pub removed: Vec<String>,
    /// 值发生变化的键
    pub modified: Vec<String>,
}

impl SnapshotDiff {
    /// 是否没有任何差异
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// 差异条目总数
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

/// 计算与顺序无关的指纹
pub fn fingerprint(map: &FlatMap) -> u64 {
    map.folded()
        .map(|(key, value)| entry_hash(key, value))
        .fold(0u64, u64::wrapping_add)
}

fn entry_hash(folded_key: &str, value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    (folded_key, value).hash(&mut hasher);
    hasher.finish()
}

/// 判断两个映射是否相等
pub fn equals(a: &FlatMap, b: &FlatMap) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }

    if a.len() != b.len() {
        return false;
    }

    a.iter()
        .all(|(key, value)| b.get(key).is_some_and(|other| other == value))
}

/// 两步判定：指纹不同则必然变化，指纹相同时再做完整比较
pub fn has_changed(
    candidate: &FlatMap,
    candidate_fingerprint: u64,
    current: &FlatMap,
    current_fingerprint: u64,
) -> bool {
    candidate_fingerprint != current_fingerprint || !equals(candidate, current)
}

/// 计算从 `old` 到 `new` 的差异，结果按键排序
pub fn diff(old: &FlatMap, new: &FlatMap) -> SnapshotDiff {
    let mut result = SnapshotDiff::default();

    for (key, value) in new.iter() {
        match old.get(key) {
            None => result.added.push(key.to_string()),
            Some(previous) if previous != value => result.modified.push(key.to_string()),
            Some(_) => {}
        }
    }

    for (key, _) in old.iter() {
        if !new.contains_key(key) {
            result.removed.push(key.to_string());
        }
    }

    result.added.sort();
    result.removed.sort();
    result.modified.sort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatMap {
        [
            ("Logging:Level", "Debug"),
            ("Feature:Enabled", "true"),
            ("Servers:0", "a.internal"),
            ("Servers:1", "b.internal"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_identical_maps_are_equal() {
        let map = sample();
        assert!(equals(&map, &map));
        assert_eq!(fingerprint(&map), fingerprint(&map));
    }

    #[test]
    fn test_copies_are_equal_with_same_fingerprint() {
        let map = sample();
        let copy = map.clone();
        assert!(equals(&map, &copy));
        assert_eq!(fingerprint(&map), fingerprint(&copy));
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let forward = sample();
        let mut pairs: Vec<_> = forward.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        pairs.reverse();
        let backward: FlatMap = pairs.into_iter().collect();

        assert!(equals(&forward, &backward));
        assert_eq!(fingerprint(&forward), fingerprint(&backward));
    }

    #[test]
    fn test_key_case_is_ignored() {
        let lower: FlatMap = [("logging:level", "Debug")].into_iter().collect();
        let upper: FlatMap = [("LOGGING:LEVEL", "Debug")].into_iter().collect();

        assert!(equals(&lower, &upper));
        assert_eq!(fingerprint(&lower), fingerprint(&upper));
    }

    #[test]
    fn test_value_case_is_significant() {
        let upper: FlatMap = [("k", "V")].into_iter().collect();
        let lower: FlatMap = [("k", "v")].into_iter().collect();

        assert!(!equals(&upper, &lower));
        assert_ne!(fingerprint(&upper), fingerprint(&lower));
    }

    #[test]
    fn test_different_count_is_unequal() {
        let map = sample();
        let mut bigger = map.clone();
        bigger.insert("Extra", "value");

        assert!(!equals(&map, &bigger));
        assert!(!equals(&bigger, &map));
        assert_ne!(fingerprint(&map), fingerprint(&bigger));
    }

    #[test]
    fn test_different_value_is_unequal() {
        let map = sample();
        let mut changed = map.clone();
        changed.insert("Logging:Level", "DebugX");

        assert!(!equals(&map, &changed));
        assert_ne!(fingerprint(&map), fingerprint(&changed));
    }

    #[test]
    fn test_different_key_same_size_is_unequal() {
        let a: FlatMap = [("a", "1"), ("b", "2")].into_iter().collect();
        let b: FlatMap = [("a", "1"), ("c", "2")].into_iter().collect();
        assert!(!equals(&a, &b));
    }

    #[test]
    fn test_empty_maps() {
        let empty = FlatMap::new();
        assert!(equals(&empty, &FlatMap::new()));
        assert_eq!(fingerprint(&empty), 0);
    }

    #[test]
    fn test_has_changed_confirms_equal_fingerprints() {
        let a: FlatMap = [("k", "1")].into_iter().collect();
        let b: FlatMap = [("k", "2")].into_iter().collect();

        // 人为构造指纹碰撞，仍必须判定为变化
        assert!(has_changed(&a, 7, &b, 7));
        assert!(!has_changed(&a, 7, &a.clone(), 7));
        assert!(has_changed(&a, 1, &a.clone(), 2));
    }

    #[test]
    fn test_diff_reports_added_removed_modified() {
        let old: FlatMap = [("keep", "1"), ("change", "a"), ("drop", "x")].into_iter().collect();
        let new: FlatMap = [("KEEP", "1"), ("change", "b"), ("add", "y")].into_iter().collect();

        let result = diff(&old, &new);
        assert_eq!(result.added, vec!["add".to_string()]);
        assert_eq!(result.removed, vec!["drop".to_string()]);
        assert_eq!(result.modified, vec!["change".to_string()]);
        assert_eq!(result.len(), 3);
        assert!(diff(&old, &old).is_empty());
    }
}
