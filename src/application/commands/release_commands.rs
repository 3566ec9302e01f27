//! Release Commands - 新章节检查

use crate::domain::{Release, Title};

/// 检查单个 Title 的最新发布
#[derive(Debug, Clone)]
pub struct CheckReleaseCommand {
    pub title: Title,
}

/// 检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseCheckOutcome {
    /// 没有更新
    Unchanged,
    /// 站点页面不存在或没有可读的发布信息
    Unavailable,
    /// 发布点前进，已向订阅者推送
    Advanced {
        release: Release,
        delivered: usize,
        failed: usize,
    },
}
