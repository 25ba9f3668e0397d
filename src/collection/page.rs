use crate::config::CollectionConfig;
use crate::document::Record;
use crate::query::{QueryOptions, parse_order_by};
use serde::{Deserialize, Serialize};

/// One page of documents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub docs: Vec<Record>,
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_page: Option<u64>,
}

/// Pagination parameters as they arrive from a query string or form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageParams {
    pub page: u32,
    pub per_page: u32,
    pub sort: String,
}

impl PageParams {
    /// Options clause carrying the requested sort, or the configured default sort.
    #[must_use]
    pub fn options(&self, config: &CollectionConfig) -> QueryOptions {
        let spec = if self.sort.trim().is_empty() { &config.default_order_by } else { &self.sort };
        QueryOptions {
            order_by: spec.split(',').filter_map(parse_order_by).collect(),
            ..QueryOptions::default()
        }
    }
}

/// `page` (1-based, `0` means first) and `per_page` (`0` means the configured default)
/// resolved to concrete values.
#[must_use]
pub fn resolve(page: u32, per_page: u32, config: &CollectionConfig) -> (u32, u32) {
    let page = if page == 0 { 1 } else { page };
    let per_page = if per_page == 0 { config.effective_per_page() } else { per_page };
    (page, per_page)
}

#[must_use]
pub fn offset_for(page: u32, per_page: u32) -> i64 {
    (i64::from(page) - 1) * i64::from(per_page)
}

#[must_use]
pub fn total_pages(count: u64, per_page: u32) -> u64 {
    count.div_ceil(u64::from(per_page.max(1)))
}
