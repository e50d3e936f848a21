use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 50;

/// PageQuery
///
/// Raw `page`/`limit` query parameters. Kept as strings so that garbage values fall back
/// to the defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number; values below 1 are treated as 1.
    pub page: Option<String>,
    /// Page size, clamped to 1..=50 (default 10).
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn window(&self) -> PageRequest {
        PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref())
    }
}

/// PageRequest
///
/// A normalized window: `page >= 1`, `1 <= limit <= MAX_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Unparseable values take the defaults; parseable ones are clamped by [`PageRequest::new`].
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|s| s.trim().parse::<i64>().ok());
        Self::new(
            parse(page).unwrap_or(1),
            parse(limit).filter(|l| *l != 0).unwrap_or(DEFAULT_LIMIT),
        )
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Page
///
/// The list envelope shared by every paginated resource.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(window: PageRequest, total: i64, data: Vec<T>) -> Self {
        Self {
            page: window.page,
            limit: window.limit,
            total,
            total_pages: (total + window.limit - 1) / window.limit,
            data,
        }
    }
}
