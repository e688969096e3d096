//! This crate contains the handler contract that storage backends implement to provide catalog
//! files, the search policy that all handlers share and the built-in filesystem handler.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Debug, Display, Formatter};

pub mod error;
pub mod file;
pub mod search;

// reexport errors types
pub use error::*;

// reexport handlers
pub use file::FileHandler;
pub use search::{SearchPolicy, expand_locale};

/// A backend specific location where a catalog might exist.
///
/// Candidate paths are constructed by the [`SearchPolicy`] and are not guaranteed to exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidatePath(String);

impl CandidatePath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CandidatePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CandidatePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CandidatePath {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CandidatePath {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Whether a search stops at the first existing candidate or collects all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FindMode {
    /// Return at most one path, the first candidate that exists.
    #[default]
    First,
    /// Return every existing candidate in search order.
    All,
}

/// The opaque configuration of a handler registration (option name to value).
///
/// Handlers parse the options they understand into their own typed structures, unknown
/// options are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerOptions(Map<String, Value>);

impl HandlerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deserializes the options into the typed configuration of a handler.
    ///
    /// # Errors
    ///
    /// Will return [`Error::FailedInitialization`] for `handler_type` if required options are
    /// missing or have the wrong type.
    pub fn parse<T: DeserializeOwned>(&self, handler_type: &'static str) -> Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|err| Error::initialization(handler_type, err))
    }
}

impl From<Map<String, Value>> for HandlerOptions {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for HandlerOptions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// The file-like capability set that every storage backend implements.
///
/// A handler instance is created for a single resolution and never shared. `open` selects a
/// candidate, `read` returns its full contents and `close` releases everything that `open`
/// acquired. Backends may keep connections for the lifetime of the instance, but no per-open
/// state may survive `close`.
#[async_trait]
pub trait CatalogHandler: Debug + Send + Sync {
    /// Records `candidate` as the target of the following [`read`](CatalogHandler::read).
    ///
    /// Implementations do not need to check whether the candidate exists.
    async fn open(&mut self, candidate: &CandidatePath) -> Result<()>;

    /// Searches for existing catalogs of the handler's domain.
    ///
    /// Without a `locale_dir` the handler's configured default is used; without `languages`
    /// they are derived from the environment (see [`SearchPolicy::languages`]).
    async fn find(
        &mut self,
        locale_dir: Option<&str>,
        languages: Option<&[String]>,
        mode: FindMode,
    ) -> Result<Vec<CandidatePath>>;

    /// Reads the full contents of the opened candidate.
    ///
    /// A candidate that does not exist (anymore) yields empty contents instead of an error.
    async fn read(&mut self) -> Result<Vec<u8>>;

    /// Releases the state of the last `open`. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// The absolute identity of a candidate, used to recognize catalogs that were loaded
    /// before.
    fn absolute(&self, candidate: &CandidatePath) -> String {
        std::path::absolute(candidate.as_str())
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|_| candidate.to_string())
    }
}

/// A [`CatalogHandler`] that can be registered by type and instantiated from options.
pub trait HandlerType: CatalogHandler + Sized + 'static {
    /// The unique name of this handler type (used in configuration and logs).
    const KIND: &'static str;

    /// Creates a handler for `domain`. This must not perform any I/O.
    fn create(domain: &str, options: &HandlerOptions) -> Result<Self>;
}

/// A type-erased constructor of handler instances.
pub type HandlerFactory = fn(&str, &HandlerOptions) -> Result<Box<dyn CatalogHandler>>;

/// Creates a boxed handler of type `H`. Coerces to [`HandlerFactory`].
pub fn create_boxed<H: HandlerType>(
    domain: &str,
    options: &HandlerOptions,
) -> Result<Box<dyn CatalogHandler>> {
    Ok(Box::new(H::create(domain, options)?))
}
