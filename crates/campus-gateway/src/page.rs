//! Response wrappers shared by every API module.

use serde::{Deserialize, Serialize};

use crate::QueryParams;

/// The `{ data }` envelope most endpoints answer with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Number of pages at this page size (0 when the listing is empty).
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// Sort direction for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Paging, sorting and filtering for [`RequestGateway::list`](crate::RequestGateway::list).
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    pub filters: QueryParams,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort: None,
            order: None,
            filters: QueryParams::new(),
        }
    }
}

impl PageQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn sorted_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(field.into());
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(key, Some(value.to_string()));
        self
    }

    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new()
            .with("page", self.page)
            .with("pageSize", self.page_size)
            .with_opt("sort", self.sort.as_deref())
            .with_opt("order", self.order.map(|o| o.as_str()));
        params.extend(self.filters.clone());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: u64, page: u32, page_size: u32) -> Page<()> {
        Page {
            data: Vec::new(),
            total,
            page,
            page_size,
        }
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(page(41, 1, 20).total_pages(), 3);
        assert_eq!(page(40, 1, 20).total_pages(), 2);
        assert_eq!(page(0, 1, 20).total_pages(), 0);
        assert_eq!(page(10, 1, 0).total_pages(), 0);
    }

    #[test]
    fn test_has_next_false_on_last_page() {
        assert!(page(41, 2, 20).has_next());
        assert!(!page(41, 3, 20).has_next());
    }

    #[test]
    fn test_to_params_orders_paging_before_filters() {
        let query = PageQuery::new(2, 50)
            .sorted_by("lastName", SortOrder::Desc)
            .filter("grade", 7);

        assert_eq!(
            query.to_params().to_query_string(),
            "page=2&pageSize=50&sort=lastName&order=desc&grade=7"
        );
    }

    #[test]
    fn test_page_deserializes_camel_case() {
        let json = r#"{"data":[1,2],"total":2,"page":1,"pageSize":20}"#;

        let page: Page<u32> = serde_json::from_str(json).unwrap();

        assert_eq!(page.data, vec![1, 2]);
        assert_eq!(page.page_size, 20);
    }
}
