//! Resolved pages, keyed by [`PageKey`]
//!
//! Several feeds over the same source can share one cache, so a list that is
//! torn down and mounted again reuses the pages it already fetched.

use crate::cursor::{PageKey, PageState};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

pub const DEFAULT_CAPACITY: usize = 256;

pub struct PageCache<T> {
    pages: Mutex<LruCache<PageKey, PageState<T>>>,
}

impl<T: Clone> PageCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            pages: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn get(&self, key: &PageKey) -> Option<PageState<T>> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: PageKey, page: PageState<T>) {
        self.lock().put(key, page);
    }

    pub fn contains(&self, key: &PageKey) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<PageKey, PageState<T>>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Default for PageCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
