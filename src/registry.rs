use crate::error::{Error, Result};
use gettext_anywhere_handlers::{
    CatalogHandler, FileHandler, HandlerFactory, HandlerOptions, HandlerType, create_boxed,
};
#[cfg(feature = "s3")]
use gettext_anywhere_handlers_s3::S3Handler;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// The domain that is used if an application does not name one.
pub const DEFAULT_DOMAIN: &str = "messages";

#[derive(Clone)]
struct Registration {
    kind: &'static str,
    factory: HandlerFactory,
    options: Arc<HandlerOptions>,
}

impl Debug for Registration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish()
    }
}

/// A freshly created handler together with the name of its type.
#[derive(Debug)]
pub struct ResolvedHandler {
    pub kind: &'static str,
    pub handler: Box<dyn CatalogHandler>,
}

/// [HandlerRegistry] binds domains to handler types and their options.
///
/// The registry never holds handler instances. Every [`resolve_handler`](Self::resolve_handler)
/// creates a new handler from the stored registration.
#[derive(Default)]
pub struct HandlerRegistry {
    kinds: RwLock<HashMap<&'static str, HandlerFactory>>,
    domains: RwLock<HashMap<String, Registration>>,
}

impl Debug for HandlerRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry").finish_non_exhaustive()
    }
}

impl HandlerRegistry {
    /// Creates an empty registry that knows no handler types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry that knows all handler types of this crate by name.
    pub fn with_builtin_kinds() -> Self {
        let mut kinds: HashMap<&'static str, HandlerFactory> = HashMap::new();
        kinds.insert(FileHandler::KIND, create_boxed::<FileHandler>);
        #[cfg(feature = "s3")]
        kinds.insert(S3Handler::KIND, create_boxed::<S3Handler>);

        Self {
            kinds: RwLock::new(kinds),
            domains: RwLock::default(),
        }
    }

    /// Makes the handler type `H` known by its name.
    pub async fn register_kind<H: HandlerType>(&self) {
        self.kinds
            .write()
            .await
            .insert(H::KIND, create_boxed::<H>);
    }

    /// Binds `domain` to the handler type `H`, replacing any previous registration.
    pub async fn register_handler<H: HandlerType>(
        &self,
        domain: impl Into<String>,
        options: HandlerOptions,
    ) {
        self.register_kind::<H>().await;
        self.insert(domain.into(), H::KIND, create_boxed::<H>, options)
            .await;
    }

    /// Binds `domain` to the handler type with the name `kind`, replacing any previous
    /// registration.
    ///
    /// # Errors
    ///
    /// Will return [`Error::ContractViolation`] if `kind` does not name a known handler type.
    pub async fn register_named(
        &self,
        domain: impl Into<String>,
        kind: &str,
        options: HandlerOptions,
    ) -> Result<()> {
        let (kind, factory) = self
            .kinds
            .read()
            .await
            .get_key_value(kind)
            .map(|(kind, factory)| (*kind, *factory))
            .ok_or_else(|| Error::ContractViolation {
                kind: kind.to_string(),
            })?;
        self.insert(domain.into(), kind, factory, options).await;
        Ok(())
    }

    /// Binds the [default domain](DEFAULT_DOMAIN) to the handler type `H`.
    pub async fn register_default_handler<H: HandlerType>(&self, options: HandlerOptions) {
        self.register_handler::<H>(DEFAULT_DOMAIN, options).await;
    }

    /// Binds the [default domain](DEFAULT_DOMAIN) to the handler type with the name `kind`.
    pub async fn register_default_named(&self, kind: &str, options: HandlerOptions) -> Result<()> {
        self.register_named(DEFAULT_DOMAIN, kind, options).await
    }

    async fn insert(
        &self,
        domain: String,
        kind: &'static str,
        factory: HandlerFactory,
        options: HandlerOptions,
    ) {
        debug!(domain = %domain, handler = kind, "registering catalog handler");
        self.domains.write().await.insert(
            domain,
            Registration {
                kind,
                factory,
                options: Arc::new(options),
            },
        );
    }

    /// Creates a new handler for `domain` from its registration.
    ///
    /// # Errors
    ///
    /// Will return [`Error::UnregisteredDomain`] if there is no registration for `domain` and
    /// [`Error::Backend`] if the handler rejects its options.
    pub async fn resolve_handler(&self, domain: &str) -> Result<ResolvedHandler> {
        let registration = self
            .domains
            .read()
            .await
            .get(domain)
            .cloned()
            .ok_or_else(|| Error::UnregisteredDomain {
                domain: domain.to_string(),
            })?;

        let handler = (registration.factory)(domain, &registration.options)?;
        Ok(ResolvedHandler {
            kind: registration.kind,
            handler,
        })
    }

    /// Drops all domain registrations. Known handler types stay known.
    pub async fn clear(&self) {
        self.domains.write().await.clear();
    }

    pub async fn contains(&self, domain: &str) -> bool {
        self.domains.read().await.contains_key(domain)
    }

    /// The registered domains in alphabetical order.
    pub async fn domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = self.domains.read().await.keys().cloned().collect();
        domains.sort();
        domains
    }

    /// The names of all known handler types in alphabetical order.
    pub async fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<&'static str> = self.kinds.read().await.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gettext_anywhere_handlers::{CandidatePath, FindMode};

    #[derive(Debug)]
    struct NoopHandler;

    #[async_trait]
    impl CatalogHandler for NoopHandler {
        async fn open(
            &mut self,
            _candidate: &CandidatePath,
        ) -> gettext_anywhere_handlers::Result<()> {
            Ok(())
        }

        async fn find(
            &mut self,
            _locale_dir: Option<&str>,
            _languages: Option<&[String]>,
            _mode: FindMode,
        ) -> gettext_anywhere_handlers::Result<Vec<CandidatePath>> {
            Ok(Vec::new())
        }

        async fn read(&mut self) -> gettext_anywhere_handlers::Result<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn close(&mut self) -> gettext_anywhere_handlers::Result<()> {
            Ok(())
        }
    }

    impl HandlerType for NoopHandler {
        const KIND: &'static str = "noop";

        fn create(

            _domain: &str,

            _options: &HandlerOptions,

        ) -> gettext_anywhere_handlers::Result<Self> {
            Ok(NoopHandler)
        }
    }

    #[tokio::test]
    async fn unregistered_domain() {
        let registry = HandlerRegistry::with_builtin_kinds();
        let err = registry.resolve_handler("messages").await.unwrap_err();
        assert!(matches!(err, Error::UnregisteredDomain { domain } if domain == "messages"));
    }

    #[tokio::test]
    async fn register_typed_handler() {
        let registry = HandlerRegistry::new();
        registry
            .register_handler::<NoopHandler>("app", HandlerOptions::new())
            .await;

        let resolved = registry.resolve_handler("app").await.unwrap();
        assert_eq!(resolved.kind, "noop");
        assert!(registry.contains("app").await);
        assert_eq!(registry.kinds().await, vec!["noop"]);
    }

    #[tokio::test]
    async fn register_named_builtin() {
        let registry = HandlerRegistry::with_builtin_kinds();
        registry
            .register_default_named("file", HandlerOptions::new())
            .await
            .unwrap();

        let resolved = registry.resolve_handler(DEFAULT_DOMAIN).await.unwrap();
        assert_eq!(resolved.kind, "file");
    }

    #[tokio::test]
    async fn register_named_unknown_kind() {
        let registry = HandlerRegistry::with_builtin_kinds();
        let err = registry
            .register_named("app", "ftp", HandlerOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ContractViolation { kind } if kind == "ftp"));
        assert!(!registry.contains("app").await);
    }

    #[tokio::test]
    async fn registration_is_replaced() {
        let registry = HandlerRegistry::with_builtin_kinds();
        registry
            .register_named("app", "file", HandlerOptions::new())
            .await
            .unwrap();
        registry
            .register_handler::<NoopHandler>("app", HandlerOptions::new())
            .await;

        let resolved = registry.resolve_handler("app").await.unwrap();
        assert_eq!(resolved.kind, "noop");
        assert_eq!(registry.domains().await, vec!["app"]);
    }

    #[cfg(feature = "s3")]
    #[tokio::test]
    async fn invalid_options_fail_on_resolve() {
        let registry = HandlerRegistry::with_builtin_kinds();
        registry
            .register_named("app", "s3", HandlerOptions::new())
            .await
            .unwrap();

        let err = registry.resolve_handler("app").await.unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }

    #[tokio::test]
    async fn clear_keeps_kinds() {
        let registry = HandlerRegistry::with_builtin_kinds();
        registry
            .register_default_handler::<NoopHandler>(HandlerOptions::new())
            .await;
        registry.clear().await;

        assert!(registry.domains().await.is_empty());
        assert!(registry.kinds().await.contains(&"noop"));
        assert!(registry.kinds().await.contains(&"file"));
    }
}
