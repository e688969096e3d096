#![deny(clippy::all)]
#![forbid(unsafe_code)]

//! gettext-anywhere loads gettext catalogs from any storage backend.
//!
//! Domains are bound to catalog handlers in a [`HandlerRegistry`]. The [`Resolver`] asks the
//! handler of a domain for all catalogs that match the requested languages, parses each of them
//! once (see [`CatalogCache`]) and links them into a fallback chain. Hosts obtain catalogs
//! through the [`CatalogLoader`] seam, which a [`TranslationHook`] switches between the host's
//! original loader and the resolver.

pub mod cache;
pub mod config;
pub mod error;
pub mod hook;
mod metrics;
pub mod registry;
pub mod resolver;

pub use cache::{CacheKey, CatalogCache};
pub use error::{Error, Result};
pub use hook::{CatalogLoader, TranslationHook, UntranslatedLoader};
pub use registry::{DEFAULT_DOMAIN, HandlerRegistry, ResolvedHandler};
pub use resolver::{ResolveOptions, Resolver};

// reexport the building blocks
pub use gettext_anywhere_catalog as catalog;
pub use gettext_anywhere_handlers as handlers;
#[cfg(feature = "s3")]
pub use gettext_anywhere_handlers_s3 as s3;
