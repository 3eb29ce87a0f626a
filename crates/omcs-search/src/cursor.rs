//! Page keys and end-of-data detection for cursor-based lists

use std::fmt;

/// Composite identity of one page: a fixed namespace, an optional partition
/// (such as a label id) and the page index.
///
/// The page size is part of the key, since page `n` covers a different window
/// for every size. It is left out of the display form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub namespace: String,
    pub partition: Option<String>,
    pub page_size: usize,
    pub index: usize,
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.partition {
            Some(partition) => write!(f, "{}/{}/{}", self.namespace, partition, self.index),
            None => write!(f, "{}/{}", self.namespace, self.index),
        }
    }
}

/// One fetched page. The page before page `n` is the `n-1`th element of
/// whatever holds the pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState<T> {
    pub index: usize,
    pub hits: Vec<T>,
    /// The source reported there is nothing after this page
    pub is_last: bool,
}

impl<T> PageState<T> {
    pub fn new(index: usize, hits: Vec<T>, is_last: bool) -> Self {
        Self {
            index,
            hits,
            is_last,
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    namespace: String,
    partition: Option<String>,
    page_size: usize,
}

impl PaginationCursor {
    pub fn new(namespace: impl Into<String>, page_size: usize) -> Self {
        Self {
            namespace: namespace.into(),
            partition: None,
            page_size: page_size.max(1),
        }
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Key for page `index`, or `None` when the previous page came back
    /// empty and there is nothing more to ask for.
    pub fn next_key<T>(&self, index: usize, previous: Option<&PageState<T>>) -> Option<PageKey> {
        if previous.is_some_and(|page| page.is_empty()) {
            return None;
        }
        Some(PageKey {
            namespace: self.namespace.clone(),
            partition: self.partition.clone(),
            page_size: self.page_size,
            index,
        })
    }

    pub fn offset(&self, key: &PageKey) -> usize {
        key.index * self.page_size
    }

    /// Whether the most recently appended page ends the list. Only the last
    /// page is ever consulted.
    pub fn is_end<T>(&self, last: Option<&PageState<T>>) -> bool {
        match last {
            Some(page) => page.is_last || page.is_empty() || page.len() < self.page_size,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(index: usize, count: usize) -> PageState<usize> {
        PageState::new(index, (0..count).collect(), false)
    }

    #[test]
    fn test_first_key_and_display() {
        let cursor = PaginationCursor::new("issues", 20);
        let key = cursor.next_key::<usize>(0, None).unwrap();
        assert_eq!(key.to_string(), "issues/0");
        assert_eq!(cursor.offset(&key), 0);

        let cursor = cursor.with_partition("1234");
        let key = cursor.next_key(3, Some(&page(2, 20))).unwrap();
        assert_eq!(key.to_string(), "issues/1234/3");
        assert_eq!(cursor.offset(&key), 60);
    }

    #[test]
    fn test_empty_previous_page_stops() {
        let cursor = PaginationCursor::new("labels", 20);
        assert_eq!(cursor.next_key(1, Some(&page(0, 0))), None);
    }

    #[test]
    fn test_end_detection_uses_last_page() {
        let cursor = PaginationCursor::new("issues", 20);
        assert!(!cursor.is_end::<usize>(None));
        assert!(!cursor.is_end(Some(&page(0, 20))));
        assert!(cursor.is_end(Some(&page(1, 19))));
        assert!(cursor.is_end(Some(&page(1, 0))));
        assert!(cursor.is_end(Some(&PageState::new(0, vec![1; 20], true))));
    }

    #[test]
    fn test_page_size_is_part_of_the_key() {
        let small = PaginationCursor::new("issues", 20).next_key::<usize>(1, None);
        let large = PaginationCursor::new("issues", 50).next_key::<usize>(1, None);
        assert_ne!(small, large);
        assert_eq!(small.unwrap().to_string(), "issues/1");
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        assert_eq!(PaginationCursor::new("issues", 0).page_size(), 1);
    }
}
