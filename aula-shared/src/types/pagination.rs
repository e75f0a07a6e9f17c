use serde::{Deserialize, Serialize};

/// Hard ceiling on page size; larger requests are clamped, not rejected.
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl PaginationParams {
    /// Requested page, clamped to at least 1. Page 0 means page 1.
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    /// Effective page size, clamped to `[1, MAX_PER_PAGE]`.
    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> u64 {
        self.page().saturating_sub(1).saturating_mul(self.limit())
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit();
        let total_pages = if total == 0 { 0 } else { (total + per_page - 1) / per_page };
        Self {
            items,
            total,
            page: params.page(),
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: u64, per_page: u64) -> PaginationParams {
        PaginationParams { page, per_page }
    }

    #[test]
    fn page_zero_clamps_to_one() {
        let p = params(0, 20);
        assert_eq!(p.page(), 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn per_page_clamps_to_bounds() {
        assert_eq!(params(1, 0).limit(), 1);
        assert_eq!(params(1, 5000).limit(), MAX_PER_PAGE);
        assert_eq!(params(1, 25).limit(), 25);
    }

    #[test]
    fn offset_uses_clamped_values() {
        let p = params(3, 10);
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn offset_saturates_instead_of_overflowing() {
        let p = params(u64::MAX, u64::MAX);
        assert_eq!(p.limit(), MAX_PER_PAGE);
        assert_eq!(p.offset(), u64::MAX);
    }

    #[test]
    fn total_pages_rounds_up() {
        let env = Paginated::new(vec![1, 2, 3], 21, &params(1, 10));
        assert_eq!(env.total_pages, 3);

        let empty: Paginated<i32> = Paginated::new(vec![], 0, &params(1, 10));
        assert_eq!(empty.total_pages, 0);
    }
}
