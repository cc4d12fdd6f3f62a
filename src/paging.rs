//! Paging

/// Largest page size a query may request.
pub const MAX_LIMIT: u32 = 200;

/// Page size used when a query does not ask for one.
pub const DEFAULT_LIMIT: u32 = 50;

/// A one-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Page number, starting at 1
    pub page: u32,

    /// Entries per page
    pub limit: u32,
}

impl Paging {
    /// Create a page request. Out of range values are clamped when the page is applied.
    pub const fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Page number clamped to at least 1.
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Page size clamped to `1..=MAX_LIMIT`.
    pub fn limit(&self) -> u32 {
        self.limit.clamp(1, MAX_LIMIT)
    }

    /// Number of entries skipped before this page.
    pub fn offset(&self) -> usize {
        let skipped = u64::from(self.page() - 1) * u64::from(self.limit());

        usize::try_from(skipped).unwrap_or(usize::MAX)
    }

    /// Apply the page to an iterator.
    pub fn apply<I: Iterator>(&self, iter: I) -> impl Iterator<Item = I::Item> + use<I> {
        iter.skip(self.offset()).take(self.limit() as usize)
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self::new(1, DEFAULT_LIMIT)
    }
}
