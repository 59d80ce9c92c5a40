//! 扁平配置映射
//!
//! 键按忽略大小写的方式识别，值按原样（区分大小写）比较

use std::collections::HashMap;
use std::fmt;

/// 配置路径分隔符
pub const KEY_DELIMITER: &str = ":";

/// 单个条目：保留首次出现时的键写法
#[derive(Debug, Clone)]
struct FlatEntry {
    key: String,
    value: String,
}

/// 扁平配置映射，从分隔路径到字符串值
///
/// 插入顺序与相等性无关；重复键以最后一次写入的值为准。
#[derive(Clone, Default)]
pub struct FlatMap {
    entries: HashMap<String, FlatEntry>,
}

/// 将键折叠为忽略大小写的标识
///
/// 逐字符取简单大写映射；大写结果超过一个字符时保留原字符，
/// 因此折叠前后字符数不变。
pub(crate) fn fold_key(key: &str) -> String {
    key.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => c,
    }
}

/// 将多个路径段组合为单个键
pub fn combine_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

impl FlatMap {
    /// 创建空映射
    pub fn new() -> Self {
        Self::default()
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 写入一个键值对
    ///
    /// 已存在同一键（忽略大小写）时只替换值，保留原有的键写法。
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        self.entries
            .entry(fold_key(&key))
            .and_modify(|entry| entry.value.clone_from(&value))
            .or_insert(FlatEntry { key, value });
    }

    /// 忽略大小写查找
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&fold_key(key))
            .map(|entry| entry.value.as_str())
    }

    /// 是否包含指定键
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&fold_key(key))
    }

    /// 遍历所有 (键, 值)，顺序不确定
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
    }

    /// 按键排序后的条目，便于展示
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut items: Vec<_> = self.iter().collect();
        items.sort_by_key(|(key, _)| fold_key(key));
        items
    }

    /// 遍历 (折叠后的键, 值)，供比较器使用
    pub(crate) fn folded(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(folded, entry)| (folded.as_str(), entry.value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for FlatMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FlatMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl PartialEq for FlatMap {
    fn eq(&self, other: &Self) -> bool {
        super::comparer::equals(self, other)
    }
}

impl Eq for FlatMap {}

impl fmt::Debug for FlatMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.sorted()).finish()
    }
}
