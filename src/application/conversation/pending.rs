//! Pending Selection - 短期的索引到标识映射
//!
//! 由展示选项的步骤创建，只被下一步消费一次

/// 有上限的索引映射，索引即条目位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection<T> {
    entries: Vec<T>,
}

impl<T> PendingSelection<T> {
    /// 超过 `capacity` 的条目被丢弃
    pub fn new(items: impl IntoIterator<Item = T>, capacity: usize) -> Self {
        Self {
            entries: items.into_iter().take(capacity).collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// 消费映射并取出条目；映射本身随之失效
    pub fn take(self, index: usize) -> Option<T> {
        self.entries.into_iter().nth(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.entries.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
