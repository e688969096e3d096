//! The seam between the resolver and a host that loads catalogs through a [`CatalogLoader`].
//!
//! A [`TranslationHook`] wraps the loader the host used before and can switch between that
//! loader and the [`Resolver`] at any time. The original loader is never lost, so the host's
//! behavior is always recoverable.

use crate::error::{Error, Result};
use crate::registry::DEFAULT_DOMAIN;
use crate::resolver::{ResolveOptions, Resolver};
use async_trait::async_trait;
use gettext_anywhere_catalog::Catalog;
use gettext_anywhere_handlers::{FileHandler, HandlerOptions};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// The entry point a host uses to obtain the catalog chain of a domain.
#[async_trait]
pub trait CatalogLoader: Debug + Send + Sync {
    async fn translation(&self, domain: &str, options: &ResolveOptions) -> Result<Catalog>;
}

#[async_trait]
impl CatalogLoader for Resolver {
    async fn translation(&self, domain: &str, options: &ResolveOptions) -> Result<Catalog> {
        self.resolve(domain, options).await
    }
}

/// A loader without any catalogs. Every domain either falls back to the neutral catalog or is
/// not found.
#[derive(Debug, Default, Clone, Copy)]
pub struct UntranslatedLoader;

#[async_trait]
impl CatalogLoader for UntranslatedLoader {
    async fn translation(&self, domain: &str, options: &ResolveOptions) -> Result<Catalog> {
        if options.fallback {
            return Ok(Catalog::empty());
        }
        Err(Error::CatalogNotFound {
            domain: domain.to_string(),
        })
    }
}

/// [TranslationHook] dispatches translations to either the host's original loader or the
/// resolver, depending on whether it is installed.
#[derive(Debug)]
pub struct TranslationHook {
    original: Arc<dyn CatalogLoader>,
    resolver: Arc<Resolver>,
    installed: Mutex<bool>,
}

impl TranslationHook {
    pub fn new(original: Arc<dyn CatalogLoader>, resolver: Arc<Resolver>) -> Self {
        Self {
            original,
            resolver,
            installed: Mutex::new(false),
        }
    }

    /// Routes all translations to the resolver.
    ///
    /// If the [default domain](DEFAULT_DOMAIN) has no handler yet, it is bound to the
    /// [`FileHandler`]. Installing an installed hook does nothing.
    pub async fn install(&self) {
        let mut installed = self.installed.lock().await;
        if *installed {
            return;
        }

        let registry = self.resolver.registry();
        if !registry.contains(DEFAULT_DOMAIN).await {
            registry
                .register_default_handler::<FileHandler>(HandlerOptions::new())
                .await;
        }
        *installed = true;
        info!("installed translation hook");
    }

    /// Routes all translations back to the original loader and drops all handler
    /// registrations. Uninstalling an uninstalled hook does nothing.
    pub async fn uninstall(&self) {
        let mut installed = self.installed.lock().await;
        if !*installed {
            return;
        }

        self.resolver.registry().clear().await;
        *installed = false;
        info!("uninstalled translation hook");
    }

    pub async fn is_installed(&self) -> bool {
        *self.installed.lock().await
    }

    /// The loader the host used before the hook was installed.
    pub fn original(&self) -> &Arc<dyn CatalogLoader> {
        &self.original
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// The loader that currently receives translations.
    pub async fn active(&self) -> Arc<dyn CatalogLoader> {
        if self.is_installed().await {
            Arc::clone(&self.resolver) as Arc<dyn CatalogLoader>
        } else {
            Arc::clone(&self.original)
        }
    }
}

#[async_trait]
impl CatalogLoader for TranslationHook {
    async fn translation(&self, domain: &str, options: &ResolveOptions) -> Result<Catalog> {
        self.active().await.translation(domain, options).await
    }
}
