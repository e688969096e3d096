use gettext_anywhere_catalog as catalog;
use gettext_anywhere_handlers as handlers;

/// The error type for all failures while registering handlers and resolving catalogs.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A registration named a handler type that does not implement the handler contract.
    #[error("'{kind}' is not a known catalog handler type")]
    ContractViolation {
        /// The handler type that was requested.
        kind: String,
    },

    /// No handler is registered for the domain.
    #[error("no catalog handler is registered for domain '{domain}'")]
    UnregisteredDomain {
        /// The domain that was resolved.
        domain: String,
    },

    /// No catalog exists for the domain and the neutral fallback was not requested.
    #[error("no translation file found for domain '{domain}'")]
    CatalogNotFound {
        /// The domain that was resolved.
        domain: String,
    },

    /// The handler or its storage backend failed.
    #[error(transparent)]
    Backend(#[from] handlers::Error),

    /// The contents of a catalog could not be parsed.
    #[error("failed to parse catalog '{path}': {cause}")]
    Parse {
        /// The absolute path of the catalog.
        path: String,
        /// The cause of the error.
        #[source]
        cause: catalog::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
