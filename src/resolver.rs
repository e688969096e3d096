use crate::cache::{CacheKey, CatalogCache};
use crate::error::{Error, Result};
use crate::metrics;
use crate::registry::{HandlerRegistry, ResolvedHandler};
use gettext_anywhere_catalog::{Catalog, CatalogParser, MoParser};
use gettext_anywhere_handlers::{CandidatePath, CatalogHandler, FindMode};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// The options of a single catalog resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// The locale directory to search, the handler's default if unset.
    pub locale_dir: Option<String>,

    /// The languages to search for, derived from the environment if unset.
    pub languages: Option<Vec<String>>,

    /// The parser for the catalogs, the resolver's default if unset.
    pub parser: Option<Arc<dyn CatalogParser>>,

    /// Whether a neutral catalog is returned if no catalog exists.
    pub fallback: bool,

    /// The charset that translated messages should be encoded in.
    pub output_charset: Option<String>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale_dir(mut self, locale_dir: impl Into<String>) -> Self {
        self.locale_dir = Some(locale_dir.into());
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn CatalogParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_output_charset(mut self, charset: impl Into<String>) -> Self {
        self.output_charset = Some(charset.into());
        self
    }
}

/// [Resolver] turns a domain into a chain of catalogs.
///
/// It asks the registered handler for all existing catalogs, parses the ones that are not
/// cached yet and links clones of them into a fallback chain in search order.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: Arc<HandlerRegistry>,
    cache: Arc<CatalogCache>,
    parser: Arc<dyn CatalogParser>,
}

impl Resolver {
    pub fn new(registry: Arc<HandlerRegistry>, cache: Arc<CatalogCache>) -> Self {
        Self {
            registry,
            cache,
            parser: Arc::new(MoParser),
        }
    }

    /// Replaces the parser that is used if a resolution does not name one.
    pub fn with_parser(mut self, parser: Arc<dyn CatalogParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    /// Resolves the catalog chain of `domain`.
    ///
    /// # Errors
    ///
    /// Will return [`Error::UnregisteredDomain`] if no handler is registered for `domain`,
    /// [`Error::CatalogNotFound`] if no catalog exists and no fallback was requested, and
    /// [`Error::Backend`] or [`Error::Parse`] if a catalog could not be loaded.
    #[tracing::instrument(skip_all, fields(domain = domain))]
    pub async fn resolve(&self, domain: &str, options: &ResolveOptions) -> Result<Catalog> {
        match self.load_chain(domain, options).await {
            Ok(Some(catalog)) => {
                metrics::resolutions::inc(domain, "found");
                Ok(catalog)
            }
            Ok(None) if options.fallback => {
                debug!("no catalog found, using neutral catalog");
                metrics::resolutions::inc(domain, "fallback");
                Ok(Catalog::empty())
            }
            Ok(None) => {
                metrics::resolutions::inc(domain, "not_found");
                Err(Error::CatalogNotFound {
                    domain: domain.to_string(),
                })
            }
            Err(err) => {
                metrics::resolutions::inc(domain, "error");
                Err(err)
            }
        }
    }

    async fn load_chain(&self, domain: &str, options: &ResolveOptions) -> Result<Option<Catalog>> {
        let ResolvedHandler { kind, mut handler } = self.registry.resolve_handler(domain).await?;
        let parser = options.parser.as_ref().unwrap_or(&self.parser);

        let candidates = handler
            .find(
                options.locale_dir.as_deref(),
                options.languages.as_deref(),
                FindMode::All,
            )
            .await
            .inspect_err(|err| {
                error!(handler = kind, domain, err = %err, "failed to search catalogs");
            })?;
        debug!(handler = kind, count = candidates.len(), "found catalogs");

        let mut catalogs = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let key = CacheKey::new(parser.kind(), handler.absolute(&candidate));
            let cached = match self.cache.get(&key).await {
                Some(catalog) => {
                    trace!(path = %key.path, "catalog cache hit");
                    metrics::cache_lookups::hit();
                    catalog
                }
                None => {
                    trace!(path = %key.path, "catalog cache miss");
                    metrics::cache_lookups::miss();
                    let catalog = load(handler.as_mut(), &candidate, &key.path, parser.as_ref())
                        .await
                        .inspect_err(|err| {
                            error!(
                                handler = kind,
                                domain,
                                path = %candidate,
                                err = %err,
                                "failed to load catalog"
                            );
                        })?;
                    self.cache.insert(key, catalog).await
                }
            };

            let mut catalog = Catalog::clone(&cached);
            if let Some(charset) = &options.output_charset {
                catalog.set_output_charset(charset.clone());
            }
            catalogs.push(catalog);
        }

        let mut catalogs = catalogs.into_iter();
        let Some(mut head) = catalogs.next() else {
            return Ok(None);
        };
        for catalog in catalogs {
            head.add_fallback(catalog);
        }
        Ok(Some(head))
    }
}

/// Opens, reads and parses a single candidate. The handler is closed exactly once, no matter
/// which step failed.
async fn load(
    handler: &mut dyn CatalogHandler,
    candidate: &CandidatePath,
    path: &str,
    parser: &dyn CatalogParser,
) -> Result<Catalog> {
    let loaded = match handler.open(candidate).await {
        Ok(()) => read_and_parse(handler, path, parser).await,
        Err(err) => Err(err.into()),
    };
    let closed = handler.close().await;

    match (loaded, closed) {
        (Ok(catalog), Ok(())) => Ok(catalog),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(path, err = %close_err, "failed to close catalog after error");
            Err(err)
        }
    }
}

async fn read_and_parse(
    handler: &mut dyn CatalogHandler,
    path: &str,
    parser: &dyn CatalogParser,
) -> Result<Catalog> {
    let bytes = handler.read().await?;
    parser.parse(&bytes).map_err(|cause| Error::Parse {
        path: path.to_string(),
        cause,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gettext_anywhere_catalog::MoWriter;
    use gettext_anywhere_handlers::{HandlerOptions, HandlerType};
    use std::collections::HashMap;

    /// Serves catalogs for `de` and `de_DE` from memory.
    #[derive(Debug)]
    struct MemoryHandler {
        files: HashMap<String, Vec<u8>>,
        open: Option<String>,
    }

    #[async_trait]
    impl CatalogHandler for MemoryHandler {
        async fn open(
            &mut self,
            candidate: &CandidatePath,
        ) -> gettext_anywhere_handlers::Result<()> {
            self.open = Some(candidate.to_string());
            Ok(())
        }

        async fn find(
            &mut self,
            _locale_dir: Option<&str>,
            languages: Option<&[String]>,
            mode: FindMode,
        ) -> gettext_anywhere_handlers::Result<Vec<CandidatePath>> {
            let mut found: Vec<CandidatePath> = languages
                .unwrap_or_default()
                .iter()
                .filter(|language| self.files.contains_key(language.as_str()))
                .map(|language| CandidatePath::new(language.as_str()))
                .collect();
            if mode == FindMode::First {
                found.truncate(1);
            }
            Ok(found)
        }

        async fn read(&mut self) -> gettext_anywhere_handlers::Result<Vec<u8>> {
            Ok(self
                .open
                .as_ref()
                .and_then(|path| self.files.get(path))
                .cloned()
                .unwrap_or_default())
        }

        async fn close(&mut self) -> gettext_anywhere_handlers::Result<()> {
            self.open = None;
            Ok(())
        }

        fn absolute(&self, candidate: &CandidatePath) -> String {
            format!("memory://{candidate}")
        }
    }

    impl HandlerType for MemoryHandler {
        const KIND: &'static str = "memory";

        fn create(

            _domain: &str,

            _options: &HandlerOptions,

        ) -> gettext_anywhere_handlers::Result<Self> {
            let header = "Content-Type: text/plain; charset=UTF-8\n";
            let mut files = HashMap::new();
            files.insert(
                "de_DE".to_string(),
                MoWriter::new()
                    .header(header)
                    .message("Hello", "Hallo")
                    .to_bytes(),
            );
            files.insert(
                "de".to_string(),
                MoWriter::new()
                    .header(header)
                    .message("Hello", "Servus")
                    .message("Goodbye", "Tschüss")
                    .to_bytes(),
            );
            files.insert("broken".to_string(), b"not a catalog".to_vec());
            files.insert("empty".to_string(), Vec::new());
            Ok(Self { files, open: None })
        }
    }

    async fn resolver() -> Resolver {
        let registry = Arc::new(HandlerRegistry::new());
        registry
            .register_handler::<MemoryHandler>("app", HandlerOptions::new())
            .await;
        Resolver::new(registry, Arc::new(CatalogCache::new()))
    }

    #[tokio::test]
    async fn resolve_chain() {
        let resolver = resolver().await;
        let options = ResolveOptions::new().with_languages(["de_DE", "de"]);
        let catalog = resolver.resolve("app", &options).await.unwrap();

        assert_eq!(catalog.gettext("Hello"), "Hallo");
        assert_eq!(catalog.gettext("Goodbye"), "Tschüss");
        assert_eq!(catalog.gettext("Missing"), "Missing");
        assert_eq!(catalog.chain().count(), 2);
        assert_eq!(resolver.cache().len().await, 2);
    }

    #[tokio::test]
    async fn resolve_uses_cache() {
        let resolver = resolver().await;
        let options = ResolveOptions::new()
            .with_languages(["de"])
            .with_output_charset("ISO-8859-1");
        let first = resolver.resolve("app", &options).await.unwrap();
        let second = resolver
            .resolve("app", &ResolveOptions::new().with_languages(["de"]))
            .await
            .unwrap();

        assert!(first.shares_messages_with(&second));
        assert_eq!(first.output_charset(), Some("ISO-8859-1"));
        assert_eq!(second.output_charset(), None);
        assert_eq!(resolver.cache().len().await, 1);
    }

    #[tokio::test]
    async fn resolve_not_found() {
        let resolver = resolver().await;
        let options = ResolveOptions::new().with_languages(["fr"]);
        let err = resolver.resolve("app", &options).await.unwrap_err();
        assert!(matches!(err, Error::CatalogNotFound { domain } if domain == "app"));

        let catalog = resolver
            .resolve("app", &options.with_fallback(true))
            .await
            .unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.gettext("Hello"), "Hello");
    }

    #[tokio::test]
    async fn resolve_unregistered() {
        let resolver = resolver().await;
        let err = resolver
            .resolve("other", &ResolveOptions::new().with_fallback(true))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnregisteredDomain { .. }));
    }

    #[tokio::test]
    async fn parse_failure_is_not_cached() {
        let resolver = resolver().await;
        let err = resolver
            .resolve("app", &ResolveOptions::new().with_languages(["de", "broken"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse { path, .. } if path == "memory://broken"));
        assert_eq!(resolver.cache().len().await, 1);
    }

    #[tokio::test]
    async fn empty_contents_fail_to_parse() {
        let resolver = resolver().await;
        let err = resolver
            .resolve("app", &ResolveOptions::new().with_languages(["empty"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(resolver.cache().is_empty().await);
    }
}
