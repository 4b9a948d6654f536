//! Page slicing for listings.
//!
//! Out-of-range requests never fail: anything below 1 is page 1,
//! anything past the end is the last page. An empty listing still
//! has one (empty) page.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served
    pub number: u64,
    pub per_page: u64,
    pub total: u64,
    pub num_pages: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            total: self.total,
            num_pages: self.num_pages,
        }
    }
}

/// Where a page starts and how many rows it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    pub fn new(requested: i64, per_page: u64, total: u64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = num_pages(total, per_page);
        let number = clamp_page(requested, num_pages);
        Self {
            number,
            num_pages,
            offset: (number - 1) * per_page,
            limit: per_page,
        }
    }

    pub fn into_page<T>(self, items: Vec<T>, total: u64) -> Page<T> {
        Page {
            items,
            number: self.number,
            per_page: self.limit,
            total,
            num_pages: self.num_pages,
        }
    }
}

pub fn num_pages(total: u64, per_page: u64) -> u64 {
    let per_page = per_page.max(1);
    ((total + per_page - 1) / per_page).max(1)
}

pub fn clamp_page(requested: i64, num_pages: u64) -> u64 {
    if requested < 1 {
        return 1;
    }
    (requested as u64).min(num_pages.max(1))
}
