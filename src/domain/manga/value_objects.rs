//! Manga Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TitleError;

/// 来源站点
///
/// 数值与历史存储保持一致，新增站点只能追加
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteType {
    Mangalib,
    MangaOvh,
    ReadManga,
}

impl SiteType {
    pub fn as_i64(&self) -> i64 {
        match self {
            SiteType::Mangalib => 1,
            SiteType::MangaOvh => 2,
            SiteType::ReadManga => 3,
        }
    }

    pub fn from_i64(value: i64) -> Result<Self, TitleError> {
        match value {
            1 => Ok(SiteType::Mangalib),
            2 => Ok(SiteType::MangaOvh),
            3 => Ok(SiteType::ReadManga),
            other => Err(TitleError::UnknownSite(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::Mangalib => "mangalib",
            SiteType::MangaOvh => "mangaovh",
            SiteType::ReadManga => "readmanga",
        }
    }
}

impl std::fmt::Display for SiteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title 唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TitleId(Uuid);

impl TitleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TitleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TitleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 站点内标识（例如 `/bleach`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Urn(String);

impl Urn {
    pub fn new(urn: impl Into<String>) -> Result<Self, TitleError> {
        let urn = urn.into();
        let trimmed = urn.trim();
        if trimmed.is_empty() {
            return Err(TitleError::InvalidUrn("站点标识不能为空".to_string()));
        }
        if trimmed.len() > 512 {
            return Err(TitleError::InvalidUrn(format!(
                "站点标识过长: {} 字节",
                trimmed.len()
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Urn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 发布点
///
/// 字段顺序决定了派生的 `Ord`：先比较卷，再比较话
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Release {
    pub volume: u32,
    pub chapter: u32,
}

impl Release {
    pub fn new(volume: u32, chapter: u32) -> Self {
        Self { volume, chapter }
    }

    pub fn is_newer_than(&self, other: &Release) -> bool {
        self > other
    }
}

impl std::fmt::Display for Release {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.volume, self.chapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_ordering_is_lexicographic() {
        assert!(Release::new(1, 6).is_newer_than(&Release::new(1, 5)));
        assert!(Release::new(2, 1).is_newer_than(&Release::new(1, 99)));
        assert!(!Release::new(1, 5).is_newer_than(&Release::new(1, 5)));
        // 卷号回退时即使话数更大也不算更新
        assert!(!Release::new(1, 10).is_newer_than(&Release::new(2, 1)));
    }

    #[test]
    fn test_site_type_roundtrip_values() {
        assert_eq!(SiteType::ReadManga.as_i64(), 3);
        assert_eq!(SiteType::from_i64(1).unwrap(), SiteType::Mangalib);
        assert!(SiteType::from_i64(42).is_err());
    }

    #[test]
    fn test_urn_is_trimmed_and_required() {
        assert_eq!(Urn::new("  /bleach ").unwrap().as_str(), "/bleach");
        assert!(Urn::new("   ").is_err());
    }

    #[test]
    fn test_release_display() {
        assert_eq!(Release::new(3, 27).to_string(), "3-27");
    }
}
