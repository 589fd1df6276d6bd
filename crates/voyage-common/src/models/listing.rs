//! Listing request / response shapes.

use serde::{Deserialize, Serialize};

use super::vacation::Vacation;

/// Independent listing filters, combined with AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ListFilters {
    /// Only vacations the requesting user follows
    #[serde(default)]
    pub followed_only: bool,
    /// Only vacations whose date range contains today
    #[serde(default)]
    pub active_only: bool,
    /// Only vacations starting after today
    #[serde(default)]
    pub upcoming_only: bool,
}

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

/// A vacation as seen by a particular user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VacationListing {
    #[serde(flatten)]
    pub vacation: Vacation,
    pub is_following: bool,
}

/// One page of results plus the totals needed to paginate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total_pages(total, request.limit),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

/// `ceil(total / limit)`, zero for an empty result.
pub fn total_pages(total: i64, limit: u32) -> i64 {
    if limit == 0 || total <= 0 {
        return 0;
    }
    let limit = i64::from(limit);
    (total + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(5, 2), 3);
        assert_eq!(total_pages(4, 2), 2);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(0, 10), 0);
    }

    #[test]
    fn offset_is_one_indexed() {
        assert_eq!(PageRequest { page: 1, limit: 2 }.offset(), 0);
        assert_eq!(PageRequest { page: 3, limit: 2 }.offset(), 4);
        assert_eq!(PageRequest { page: 0, limit: 2 }.offset(), 0);
    }
}
