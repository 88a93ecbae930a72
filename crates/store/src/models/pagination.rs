use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::PageInfo;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Pagination state owned by a list page. `page` and `total` follow the server; `page_size` is
/// chosen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
        }
    }
}

impl Pagination {
    pub fn with_page_size(page_size: u64) -> Self {
        Self {
            page_size,
            ..Default::default()
        }
    }

    /// Take `page` and `total` from a server response, keeping the client page size.
    pub fn apply(&mut self, info: &PageInfo) {
        self.page = info.page;
        self.total = info.total;
    }
}
