use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32, // (1-based)
    pub total_pages: u32,
    pub total_items: u64,
    pub page_size: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PaginationInfo {
    pub fn new(current_page: u32, page_size: u32, total_items: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_items.div_ceil(page_size as u64) as u32
        };
        Self {
            current_page,
            total_pages,
            total_items,
            page_size,
            has_next_page: current_page < total_pages,
            has_previous_page: current_page > 1,
        }
    }
}

/// `?page=&limit=` query shared by the admin listings.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    /// Page (>= 1) and limit clamped to `1..=max_limit`.
    pub fn resolve(&self, default_limit: u32, max_limit: u32) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit);
        (page, limit)
    }
}

pub fn offset(page: u32, limit: u32) -> u32 {
    (page.max(1) - 1) * limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_info() {
        let info = PaginationInfo::new(2, 20, 45);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next_page);
        assert!(info.has_previous_page);

        let last = PaginationInfo::new(3, 20, 45);
        assert!(!last.has_next_page);

        let empty = PaginationInfo::new(1, 20, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_previous_page);
    }

    #[test]
    fn test_page_query_resolve() {
        let q = PageQuery { page: Some(0), limit: Some(500) };
        assert_eq!(q.resolve(20, 100), (1, 100));
        assert_eq!(PageQuery::default().resolve(20, 100), (1, 20));
        assert_eq!(offset(3, 20), 40);
    }
}
