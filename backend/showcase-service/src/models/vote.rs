use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// `limit`/`offset` query parameters shared by the public listings
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Result<Self> {
        let page = Self { limit, offset };
        page.check()?;
        Ok(page)
    }

    pub fn check(&self) -> Result<()> {
        if !(1..=MAX_PAGE_LIMIT).contains(&self.limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        if self.offset < 0 {
            return Err(AppError::Validation("offset must be >= 0".to_string()));
        }
        Ok(())
    }

    /// Position of the first row on this page (1-based).
    pub fn first_position(&self) -> i64 {
        self.offset + 1
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingQuery {
    pub city: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl RankingQuery {
    pub fn page(&self) -> Result<Pagination> {
        Pagination::new(self.limit, self.offset)
    }

    /// Blank city means "all cities".
    pub fn city_filter(&self) -> Option<&str> {
        self.city.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// One ranked video with its owner's public profile
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RankingEntry {
    pub video_id: Uuid,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub votes_count: i32,
}

/// Public listing row
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PublicVideo {
    pub video_id: Uuid,
    pub title: String,
    pub storage_key: String,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub votes_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        assert!(Pagination::new(1, 0).is_ok());
        assert!(Pagination::new(100, 0).is_ok());
        assert!(Pagination::new(0, 0).is_err());
        assert!(Pagination::new(101, 0).is_err());
    }

    #[test]
    fn test_negative_offset() {
        assert!(Pagination::new(20, -1).is_err());
        assert_eq!(Pagination::new(20, 40).unwrap().first_position(), 41);
    }
}
