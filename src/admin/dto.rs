use serde::{Deserialize, Serialize};

use crate::{activity::ActivityLogView, users::UserSummary};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 200;
pub const MAX_LIMIT: i64 = 1000;

/// Raw `page`/`limit` query values. Kept as text so junk falls back to defaults
/// instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Reads the leading integer of `raw`, ignoring whatever trails it: `"2abc"` is 2.
fn leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let n = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -n } else { n })
}

/// A validated page request. Missing, unparsable or non-positive inputs fall
/// back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl From<LogsQuery> for PageRequest {
    fn from(q: LogsQuery) -> Self {
        let page = q
            .page
            .as_deref()
            .and_then(leading_int)
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PAGE);
        let limit = q
            .limit
            .as_deref()
            .and_then(leading_int)
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Self { page, limit }
    }
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn pagination(&self, total_count: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total_count,
            total_pages: (total_count + self.limit - 1) / self.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<ActivityLogView>,
    pub pagination: Pagination,
}
