use crate::serializer::OrderSpecifier;

/// A page window: zero-based page index, page size and optional sort keys
/// appended to the query's own ordering.
#[derive(Clone, Debug, Default)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
    pub sort: Vec<OrderSpecifier>,
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size, sort: Vec::new() }
    }

    pub fn with_sort(mut self, sort: Vec<OrderSpecifier>) -> Self {
        self.sort = sort;
        self
    }

    pub fn offset(&self) -> u64 {
        self.page * self.size
    }
}

/// One page of results plus the total count across all pages.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            0
        } else {
            self.total.div_ceil(self.size)
        }
    }
}
