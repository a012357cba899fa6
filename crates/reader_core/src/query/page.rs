//! Paginated result envelope.

use serde::Serialize;

/// One page of a listing plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    /// Rows matching the filters, independent of the page window.
    #[serde(rename = "totalItems")]
    pub total_items: u64,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

impl<T> ListPage<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListPage<U> {
        ListPage {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ListPage;

    #[test]
    fn serializes_with_camel_case_counters() {
        let page = ListPage {
            items: vec![1, 2],
            total_items: 13,
            page: 2,
            page_size: 10,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalItems"], 13);
        assert_eq!(json["pageSize"], 10);
        assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
    }
}
