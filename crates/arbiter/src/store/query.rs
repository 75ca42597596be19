/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (0-indexed).
    pub page: u64,
    /// Items per page.
    pub per_page: u64,
}

const MIN_PER_PAGE: u64 = 1;

/// Page size used when a caller does not choose one.
pub const DEFAULT_PER_PAGE: u64 = 50;

impl Pagination {
    /// Create a new pagination with the given page and per_page values.
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page,
            per_page: per_page.max(MIN_PER_PAGE),
        }
    }

    /// Offset of the first item on this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Result of a paginated query.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    /// The items for the current page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// Current page number (0-indexed).
    pub page: u64,
    /// Items per page.
    pub per_page: u64,
    /// Total number of pages.
    pub total_pages: u64,
}

impl<T> PaginatedResult<T> {
    /// Paginate an already-materialized, already-sorted list.
    pub fn from_vec(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let total_pages = total.div_ceil(pagination.per_page);
        let items = all
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.per_page as usize)
            .collect();

        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_per_page() {
        assert_eq!(Pagination::new(3, 0).per_page, 1);
        assert_eq!(Pagination::new(2, 25).offset(), 50);
    }

    #[test]
    fn from_vec_slices_the_requested_page() {
        let result = PaginatedResult::from_vec((1..=7).collect::<Vec<_>>(), Pagination::new(1, 3));
        assert_eq!(result.items, vec![4, 5, 6]);
        assert_eq!(result.total, 7);
        assert_eq!(result.total_pages, 3);

        let last = PaginatedResult::from_vec((1..=7).collect::<Vec<_>>(), Pagination::new(2, 3));
        assert_eq!(last.items, vec![7]);

        let past_end =
            PaginatedResult::from_vec((1..=7).collect::<Vec<_>>(), Pagination::new(9, 3));
        assert!(past_end.items.is_empty());
    }
}
