//! Parsed translation catalogs and the parsers that produce them from raw catalog bytes.
//!
//! A [`Catalog`] is the in-memory form of one catalog file. Its parsed content is shared
//! between shallow clones, so per-use settings (output charset, fallbacks) never leak into
//! other users of the same parsed file. Parsers implement [`CatalogParser`]; [`MoParser`]
//! handles compiled GNU gettext catalogs.

use std::fmt::Debug;

pub mod catalog;
pub mod mo;
pub mod plural;
pub mod writer;

pub use catalog::{Catalog, CatalogContent, Translation, context_key};
pub use mo::MoParser;
pub use plural::PluralRule;
pub use writer::MoWriter;

/// The error type for all problems with decoding catalog bytes.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The input ended before the fixed header could be read.
    #[error("catalog is truncated ({length} bytes)")]
    Truncated {
        /// The number of bytes that were available.
        length: usize,
    },

    /// The input does not start with a known magic number.
    #[error("bad magic number: {magic:#010x}")]
    BadMagic {
        /// The magic number that was found (read as little endian).
        magic: u32,
    },

    /// The major revision of the catalog format is not supported.
    #[error("unsupported catalog revision: {revision:#x}")]
    UnsupportedRevision {
        /// The revision that was found.
        revision: u32,
    },

    /// A string descriptor points outside of the catalog.
    #[error("catalog is corrupt (out of bounds at offset {offset})")]
    Corrupt {
        /// The offset that could not be resolved.
        offset: usize,
    },

    /// The catalog declares a charset that cannot be decoded.
    #[error("unsupported catalog charset: {charset}")]
    UnsupportedCharset {
        /// The declared charset.
        charset: String,
    },

    /// A message is not valid in the charset of the catalog.
    #[error("message is not valid {charset}")]
    InvalidEncoding {
        /// The charset that was used for decoding.
        charset: &'static str,
    },

    /// The plural forms expression could not be parsed.
    #[error("invalid plural forms '{expression}': {reason}")]
    InvalidPluralForms {
        /// The offending expression.
        expression: String,
        /// Why the expression was rejected.
        reason: &'static str,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A capability that turns raw catalog bytes into a [`Catalog`].
///
/// The [`kind`](CatalogParser::kind) identifies the parser in cache keys, so two parsers with
/// the same kind must produce identical catalogs from identical bytes.
pub trait CatalogParser: Debug + Send + Sync {
    /// The unique name of this parser.
    fn kind(&self) -> &'static str;

    /// Parses a complete catalog file.
    fn parse(&self, bytes: &[u8]) -> Result<Catalog>;
}
