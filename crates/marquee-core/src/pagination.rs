//! Page-number pagination for list endpoints.
//!
//! Lists are served in pages of `page_size` items (default 10). Clients may
//! ask for another size with `page_size`, capped at the configured maximum
//! (default 100). Page numbers are 1-based; `last` selects the final page.

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// The requested page does not exist or could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid page.")]
pub struct InvalidPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    Number(usize),
    Last,
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: PageNumber,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: PageNumber::Number(1),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: PageNumber::Number(page),
            page_size: page_size.max(1),
        }
    }

    /// Parse the `page` / `page_size` query parameters.
    ///
    /// An unusable `page_size` falls back to `default_size`; an oversized one
    /// is clamped to `max_size`. A malformed `page` is an error.
    pub fn from_params(
        page: Option<&str>,
        page_size: Option<&str>,
        default_size: usize,
        max_size: usize,
    ) -> Result<Self, InvalidPage> {
        let page_size = page_size
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .map(|n| n.min(max_size))
            .unwrap_or(default_size)
            .max(1);

        let page = match page.map(str::trim) {
            None | Some("") => PageNumber::Number(1),
            Some("last") => PageNumber::Last,
            Some(s) => match s.parse::<usize>() {
                Ok(n) if n >= 1 => PageNumber::Number(n),
                _ => return Err(InvalidPage),
            },
        };

        Ok(Self { page, page_size })
    }

    /// Locate this page within a result set of `count` items.
    pub fn window(&self, count: usize) -> Result<PageWindow, InvalidPage> {
        let num_pages = count.div_ceil(self.page_size).max(1);
        let number = match self.page {
            PageNumber::Last => num_pages,
            PageNumber::Number(n) if n <= num_pages => n,
            PageNumber::Number(_) => return Err(InvalidPage),
        };
        Ok(PageWindow {
            number,
            num_pages,
            offset: (number - 1) * self.page_size,
            limit: self.page_size,
        })
    }
}

/// Position of a page inside the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: usize,
    pub num_pages: usize,
    pub offset: usize,
    pub limit: usize,
}

/// One page of results plus the total item count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: usize,
    #[serde(skip)]
    pub number: usize,
    #[serde(skip)]
    pub num_pages: usize,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(count: usize, window: PageWindow, results: Vec<T>) -> Self {
        Self {
            count,
            number: window.number,
            num_pages: window.num_pages,
            results,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}
