/// Opaque pagination position
///
/// Created when traversal starts and advanced one page at a time by the
/// navigation controller. Only the values a URL template needs are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageCursor {
    page_index: usize,
    page_size: usize,
}

impl PageCursor {
    #[must_use]
    pub fn first(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    /// 1-based page number
    #[must_use]
    pub fn page_number(&self) -> usize {
        self.page_index + 1
    }

    /// 1-based offset of the first result on this page
    #[must_use]
    pub fn start_offset(&self) -> usize {
        self.page_index * self.page_size + 1
    }

    #[must_use]
    pub fn advance(&self) -> Self {
        Self {
            page_index: self.page_index + 1,
            page_size: self.page_size,
        }
    }
}
