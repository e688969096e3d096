use gettext_anywhere_catalog::Catalog;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The identity of a parsed catalog: the parser that produced it and the absolute path it was
/// read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub parser: &'static str,
    pub path: String,
}

impl CacheKey {
    pub fn new(parser: &'static str, path: impl Into<String>) -> Self {
        Self {
            parser,
            path: path.into(),
        }
    }
}

/// [CatalogCache] holds every catalog that was parsed during the lifetime of the process.
///
/// Entries are never replaced or invalidated. Resolutions only ever hand out clones of the
/// cached catalogs, so the cached instances stay untouched.
#[derive(Debug, Default)]
pub struct CatalogCache {
    entries: RwLock<HashMap<CacheKey, Arc<Catalog>>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Catalog>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Inserts `catalog` unless the key is already present and returns the cached catalog.
    ///
    /// If another resolution inserted the same key first, its catalog wins and `catalog` is
    /// discarded.
    pub async fn insert(&self, key: CacheKey, catalog: Catalog) -> Arc<Catalog> {
        let mut entries = self.entries.write().await;
        Arc::clone(entries.entry(key).or_insert_with(|| Arc::new(catalog)))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops all entries. Only intended for resetting between tests.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
