//! A catalog handler that loads catalogs from an S3 compatible object storage.
//!
//! Catalogs are stored with the same layout as on the filesystem, so the locale directory
//! becomes a key prefix inside the configured bucket (`locale/de/LC_MESSAGES/messages.mo`).

use async_trait::async_trait;
use gettext_anywhere_handlers::{
    CandidatePath, CatalogHandler, Error, FindMode, HandlerOptions, HandlerType, Operation, Result,
    SearchPolicy,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::trace;

pub mod store;

pub use store::{ConnectionKey, ObjectStore, S3ObjectStore, StorePool};
use store::STORES;

/// The key prefix that is searched if neither the caller nor the options provide one.
pub const DEFAULT_LOCALE_DIR: &str = "locale";

fn default_locale_dir() -> String {
    DEFAULT_LOCALE_DIR.to_string()
}

/// The options of the S3 handler.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Options {
    /// The bucket that holds the catalogs.
    pub bucket_name: String,

    /// The access key, the default AWS credential chain is used if unset.
    #[serde(default)]
    pub aws_access_key_id: Option<String>,

    /// The secret key, the default AWS credential chain is used if unset.
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    /// A custom endpoint for S3 compatible storages.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub force_path_style: bool,

    #[serde(default = "default_locale_dir")]
    pub default_locale_dir: String,

    #[serde(default)]
    pub search: SearchPolicy,
}

impl S3Options {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            region: None,
            endpoint: None,
            force_path_style: false,
            default_locale_dir: default_locale_dir(),
            search: SearchPolicy::default(),
        }
    }
}

/// A handler that reads catalogs from objects of a single bucket.
#[derive(Debug)]
pub struct S3Handler {
    domain: String,
    options: S3Options,
    store: Option<Arc<dyn ObjectStore>>,
    key: Option<CandidatePath>,
}

impl S3Handler {
    pub fn new(domain: impl Into<String>, options: S3Options) -> Self {
        Self {
            domain: domain.into(),
            options,
            store: None,
            key: None,
        }
    }

    /// Uses `store` instead of the shared store for the connection options.
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn options(&self) -> &S3Options {
        &self.options
    }

    async fn store(&mut self) -> Arc<dyn ObjectStore> {
        if let Some(store) = &self.store {
            return Arc::clone(store);
        }
        let options = &self.options;
        let store = STORES
            .get_or_connect(ConnectionKey::from(options), || async move {
                Arc::new(S3ObjectStore::connect(options).await) as Arc<dyn ObjectStore>
            })
            .await;
        self.store = Some(Arc::clone(&store));
        store
    }
}

impl HandlerType for S3Handler {
    const KIND: &'static str = "s3";

    fn create(domain: &str, options: &HandlerOptions) -> Result<Self> {
        let options: S3Options = options.parse(Self::KIND)?;
        if options.bucket_name.trim().is_empty() {
            return Err(Error::initialization(
                Self::KIND,
                "bucket_name must not be empty",
            ));
        }
        Ok(Self::new(domain, options))
    }
}

#[async_trait]
impl CatalogHandler for S3Handler {
    async fn open(&mut self, candidate: &CandidatePath) -> Result<()> {
        self.key = Some(candidate.clone());
        Ok(())
    }

    async fn find(
        &mut self,
        locale_dir: Option<&str>,
        languages: Option<&[String]>,
        mode: FindMode,
    ) -> Result<Vec<CandidatePath>> {
        let store = self.store().await;
        let locale_dir = locale_dir.unwrap_or(&self.options.default_locale_dir);
        let languages = self.options.search.languages(languages);

        let mut found = Vec::new();
        for candidate in self
            .options
            .search
            .candidates(&self.domain, locale_dir, &languages)
        {
            let exists = store
                .exists(&self.options.bucket_name, candidate.as_str())
                .await
                .map_err(|err| {
                    Error::access(Self::KIND, Operation::Find, candidate.as_str(), err)
                })?;
            if !exists {
                continue;
            }

            trace!(bucket = %self.options.bucket_name, key = %candidate, "found catalog object");
            found.push(candidate);
            if mode == FindMode::First {
                break;
            }
        }
        Ok(found)
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        let Some(key) = self.key.clone() else {
            return Err(Error::NotOpen {
                handler_type: Self::KIND,
            });
        };
        let store = self.store().await;
        let contents = store
            .get(&self.options.bucket_name, key.as_str())
            .await
            .map_err(|err| Error::access(Self::KIND, Operation::Read, key.as_str(), err))?;
        Ok(contents.unwrap_or_default())
    }

    async fn close(&mut self) -> Result<()> {
        self.key = None;
        Ok(())
    }

    fn absolute(&self, candidate: &CandidatePath) -> String {
        format!("s3://{}/{}", self.options.bucket_name, candidate)
    }
}
