//! Catalog listing: filtering, price sorting and pagination.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::mouse::Mouse;

/// Page size used when only `page` is supplied.
pub const DEFAULT_PAGE_SIZE: u32 = 6;

/// Price ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Accepts both the storefront spelling (`lowToHigh`/`highToLow`) and `asc`/`desc`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "lowToHigh" | "asc" | "ASC" => Some(SortOrder::Ascending),
            "highToLow" | "desc" | "DESC" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// Row-level predicates. Storage backends may push these down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MouseFilter {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub is_generated: Option<bool>,
}

impl MouseFilter {
    pub fn matches(&self, mouse: &Mouse) -> bool {
        if let Some(min) = self.min_price {
            if mouse.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if mouse.price > max {
                return false;
            }
        }
        if let Some(flag) = self.is_generated {
            if mouse.is_generated != flag {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            if !mouse.name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Full listing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: MouseFilter,
    pub sort: Option<SortOrder>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListQuery {
    pub fn is_paginated(&self) -> bool {
        self.page.is_some() || self.page_size.is_some()
    }

    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = Vec::new();
        if let (Some(min), Some(max)) = (self.filter.min_price, self.filter.max_price) {
            if min > max {
                errors.push("minPrice must not exceed maxPrice".to_string());
            }
        }
        if self.page == Some(0) {
            errors.push("page starts at 1".to_string());
        }
        if self.page_size == Some(0) {
            errors.push("pageSize must be positive".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(errors))
        }
    }

    /// Filter, sort and (optionally) paginate an unordered set of records.
    ///
    /// Without an explicit sort order records are returned by ascending id.
    pub fn apply(&self, mice: Vec<Mouse>) -> Listing {
        let mut rows: Vec<Mouse> = mice.into_iter().filter(|m| self.filter.matches(m)).collect();

        match self.sort {
            Some(SortOrder::Ascending) => rows.sort_by(|a, b| a.price.total_cmp(&b.price)),
            Some(SortOrder::Descending) => rows.sort_by(|a, b| b.price.total_cmp(&a.price)),
            None => rows.sort_by_key(|m| m.id),
        }

        if !self.is_paginated() {
            return Listing::All(rows);
        }

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let current_page = self.page.unwrap_or(1).max(1);
        let total_count = rows.len() as u64;
        let total_pages = total_count.div_ceil(page_size as u64) as u32;

        let start = ((current_page - 1) as usize).saturating_mul(page_size as usize);
        let mice = rows
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();

        Listing::Paged(Page {
            mice,
            total_count,
            total_pages,
            current_page,
            page_size,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub mice: Vec<Mouse>,
    pub total_count: u64,
    pub total_pages: u32,
    pub current_page: u32,
    pub page_size: u32,
}

/// Either a bare array or a page envelope, matching the `GET /api/mice` contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing {
    All(Vec<Mouse>),
    Paged(Page),
}

impl Listing {
    pub fn mice(&self) -> &[Mouse] {
        match self {
            Listing::All(mice) => mice,
            Listing::Paged(page) => &page.mice,
        }
    }

    pub fn into_mice(self) -> Vec<Mouse> {
        match self {
            Listing::All(mice) => mice,
            Listing::Paged(page) => page.mice,
        }
    }
}
