//! Rendered-page cache for the server-rendered todo view.
//!
//! Pages are cached per route path and per viewer, since two users never see the same list.
//! Mutation handlers invalidate a whole route path, which drops every viewer's copy so the next
//! navigation re-reads fresh data from the store.

use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Identifies whose copy of a page is cached. Anonymous viewers share one entry.
pub type ViewerKey = Option<String>;

type PageKey = (String, ViewerKey);

pub const DEFAULT_MAX_PAGES: u64 = 10_000;
pub const DEFAULT_PAGE_TTL: Duration = Duration::from_secs(300);

/// Snapshot of the invalidation count, taken before a render reads the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generation(u64);

pub struct PageCache {
    pages: Cache<PageKey, String>,
    generation: AtomicU64,
}

impl Default for PageCache {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_PAGES, DEFAULT_PAGE_TTL)
    }
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_pages: u64, ttl: Duration) -> Self {
        let pages = Cache::builder()
            .max_capacity(max_pages)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();

        PageCache {
            pages,
            generation: AtomicU64::new(0),
        }
    }

    /// Returns the cached page for a viewer, if one is still fresh
    pub fn get(&self, path: &str, viewer: &ViewerKey) -> Option<String> {
        self.pages.get(&(path.to_owned(), viewer.clone()))
    }

    /// Must be called before reading the data a page is rendered from
    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::Acquire))
    }

    /// Keeps a rendered page unless an invalidation happened after `rendered_from` was taken.
    /// Returns whether the page was kept.
    pub fn store(
        &self,
        path: &str,
        viewer: ViewerKey,
        rendered: String,
        rendered_from: Generation,
    ) -> bool {
        if self.generation() != rendered_from {
            debug!(path, "Skipped caching a page rendered before the last invalidation");
            return false;
        }

        let key = (path.to_owned(), viewer);
        self.pages.insert(key.clone(), rendered);

        // An invalidation that ran between the check and the insert only covered older entries
        if self.generation() != rendered_from {
            self.pages.invalidate(&key);
            return false;
        }

        true
    }

    /// Marks every cached copy of `path` stale
    pub fn invalidate(&self, path: &str) {
        self.generation.fetch_add(1, Ordering::AcqRel);

        let stale_path = path.to_owned();
        if let Err(err) = self
            .pages
            .invalidate_entries_if(move |key: &PageKey, _: &String| key.0 == stale_path)
        {
            warn!(path, "Could not invalidate by path, dropping every cached page: {err}");
            self.pages.invalidate_all();
            return;
        }

        debug!(path, "Invalidated cached pages");
    }

    /// Approximate, since eviction runs lazily
    pub fn page_count(&self) -> u64 {
        self.pages.run_pending_tasks();
        self.pages.entry_count()
    }
}
