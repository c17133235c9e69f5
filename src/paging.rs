use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw `?page=&size=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Zero-based page number (default 0)
    pub page: Option<u32>,
    /// Page size (default 5, max 100)
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size: size.clamp(1, MAX_PAGE_SIZE) }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// Cuts one page out of an already filtered and sorted collection.
    pub fn slice<T>(&self, items: Vec<T>, sort: Sort) -> Page<T> {
        let total = items.len() as u64;
        let content = items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.size as usize)
            .collect();
        Page::new(content, *self, total, sort)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

impl From<PageParams> for PageRequest {
    fn from(p: PageParams) -> Self {
        Self::new(p.page.unwrap_or(0), p.size.unwrap_or(DEFAULT_PAGE_SIZE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub key: String,
    pub direction: Direction,
}

impl Sort {
    pub fn new(key: &str, direction: Direction) -> Self {
        Self { key: key.to_string(), direction }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub sort: Sort,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, req: PageRequest, total_elements: u64, sort: Sort) -> Self {
        let total_pages = total_elements.div_ceil(u64::from(req.size)) as u32;
        Self { content, page: req.page, size: req.size, total_elements, total_pages, sort }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            sort: self.sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_five_per_page() {
        let req = PageRequest::from(PageParams::default());
        assert_eq!(req, PageRequest { page: 0, size: 5 });
    }

    #[test]
    fn size_is_clamped() {
        assert_eq!(PageRequest::new(0, 0).size, 1);
        assert_eq!(PageRequest::new(0, 10_000).size, MAX_PAGE_SIZE);
    }

    #[test]
    fn slices_and_counts() {
        let sort = Sort::new("id", Direction::Asc);
        let first = PageRequest::new(0, 5).slice((1..=7).collect::<Vec<_>>(), sort.clone());
        assert_eq!(first.content, vec![1, 2, 3, 4, 5]);
        assert_eq!(first.total_elements, 7);
        assert_eq!(first.total_pages, 2);

        let second = PageRequest::new(1, 5).slice((1..=7).collect::<Vec<_>>(), sort.clone());
        assert_eq!(second.content, vec![6, 7]);

        let past_end = PageRequest::new(4, 5).slice((1..=7).collect::<Vec<_>>(), sort);
        assert!(past_end.content.is_empty());
        assert_eq!(past_end.total_elements, 7);
    }
}
