//! Manga Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Release, SiteType, TitleError, TitleId, Urn};

/// Title 聚合根
///
/// 不变量:
/// - (site, urn) 在存储中唯一
/// - release 单调不减，只能通过 `advance_to` 前进
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    id: TitleId,
    site: SiteType,
    urn: Urn,
    name: String,
    release: Release,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Title {
    /// 首次订阅时创建
    pub fn new(
        site: SiteType,
        urn: Urn,
        name: impl Into<String>,
        release: Release,
    ) -> Result<Self, TitleError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TitleError::InvalidName("名称不能为空".to_string()));
        }
        let now = Utc::now();
        Ok(Self {
            id: TitleId::new(),
            site,
            urn,
            name: name.trim().to_string(),
            release,
            created_at: now,
            updated_at: now,
        })
    }

    /// 从持久化数据重建
    pub fn restore(
        id: TitleId,
        site: SiteType,
        urn: Urn,
        name: String,
        release: Release,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            site,
            urn,
            name,
            release,
            created_at,
            updated_at,
        }
    }

    /// 观察到新发布点时前进；返回是否发生了变化
    pub fn advance_to(&mut self, observed: Release) -> bool {
        if !observed.is_newer_than(&self.release) {
            return false;
        }
        self.release = observed;
        self.updated_at = Utc::now();
        true
    }

    // Getters
    pub fn id(&self) -> &TitleId {
        &self.id
    }

    pub fn site(&self) -> SiteType {
        self.site
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn release(&self) -> Release {
        self.release
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bleach() -> Title {
        Title::new(
            SiteType::ReadManga,
            Urn::new("/bleach").unwrap(),
            "Bleach",
            Release::new(1, 5),
        )
        .unwrap()
    }

    #[test]
    fn test_title_creation() {
        let title = bleach();
        assert_eq!(title.name(), "Bleach");
        assert_eq!(title.urn().as_str(), "/bleach");
        assert_eq!(title.release(), Release::new(1, 5));
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = Title::new(
            SiteType::ReadManga,
            Urn::new("/x").unwrap(),
            "  ",
            Release::new(0, 0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut title = bleach();

        assert!(!title.advance_to(Release::new(1, 5)));
        assert!(!title.advance_to(Release::new(1, 4)));
        assert_eq!(title.release(), Release::new(1, 5));

        assert!(title.advance_to(Release::new(1, 6)));
        assert_eq!(title.release(), Release::new(1, 6));
    }
}
