use crate::plural::PluralRule;
use std::collections::HashMap;
use std::iter::successors;
use std::sync::Arc;

/// The separator between the message context and the message id of a context entry.
pub const CONTEXT_SEPARATOR: char = '\u{4}';

/// The translation of a single catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// A message without plural forms.
    Singular(String),
    /// All plural forms of a message, indexed by the [`PluralRule`] of the catalog.
    Plural(Vec<String>),
}

/// The immutable, parsed content of a single catalog file.
///
/// Content is produced once by a parser and then shared between all [`Catalog`] clones that
/// originate from it.
#[derive(Debug, Clone, Default)]
pub struct CatalogContent {
    /// The translations keyed by message id (`context\u{4}msgid` for context entries).
    pub entries: HashMap<String, Translation>,
    /// The header metadata with lowercase keys (e.g., `content-type`, `plural-forms`).
    pub info: HashMap<String, String>,
    /// The charset the catalog was encoded with, if it declared one.
    pub charset: Option<String>,
    /// The rule selecting plural forms.
    pub plural: PluralRule,
}

/// A parsed translation catalog together with its per-use metadata.
///
/// Cloning a catalog is shallow: the parsed [`CatalogContent`] is shared, while the output
/// charset and the fallback chain belong to the clone. This allows every resolution to attach
/// its own fallbacks without touching the cached original.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    content: Arc<CatalogContent>,
    output_charset: Option<String>,
    fallback: Option<Box<Catalog>>,
}

impl Catalog {
    pub fn new(content: CatalogContent) -> Self {
        Self {
            content: Arc::new(content),
            output_charset: None,
            fallback: None,
        }
    }

    /// Creates the neutral catalog. All lookups against it miss.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &CatalogContent {
        &self.content
    }

    /// The header metadata of this catalog (not of its fallbacks).
    pub fn info(&self) -> &HashMap<String, String> {
        &self.content.info
    }

    pub fn charset(&self) -> Option<&str> {
        self.content.charset.as_deref()
    }

    /// The charset the host should encode translations in.
    ///
    /// This is metadata for the host only. Lookups always return decoded `&str` and never
    /// re-encode text.
    pub fn output_charset(&self) -> Option<&str> {
        self.output_charset.as_deref()
    }

    /// Sets the [output charset](Self::output_charset) of this clone only.
    pub fn set_output_charset(&mut self, charset: impl Into<String>) {
        self.output_charset = Some(charset.into());
    }

    pub fn plural_rule(&self) -> &PluralRule {
        &self.content.plural
    }

    /// The number of entries of this catalog (not of its fallbacks).
    pub fn len(&self) -> usize {
        self.content.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.entries.is_empty()
    }

    /// The catalog that is consulted if a lookup misses this catalog.
    pub fn fallback(&self) -> Option<&Catalog> {
        self.fallback.as_deref()
    }

    /// Replaces the direct fallback of this catalog.
    pub fn set_fallback(&mut self, fallback: Catalog) {
        self.fallback = Some(Box::new(fallback));
    }

    /// Appends a catalog at the end of this catalog's fallback chain.
    pub fn add_fallback(&mut self, fallback: Catalog) {
        match self.fallback.as_mut() {
            Some(next) => next.add_fallback(fallback),
            None => self.fallback = Some(Box::new(fallback)),
        }
    }

    /// Iterates over this catalog and all of its fallbacks in lookup order.
    pub fn chain(&self) -> impl Iterator<Item = &Catalog> {
        successors(Some(self), |catalog| catalog.fallback())
    }

    /// Whether both catalogs are clones of the same parsed content.
    pub fn shares_messages_with(&self, other: &Catalog) -> bool {
        Arc::ptr_eq(&self.content, &other.content)
    }

    fn own_singular(&self, key: &str) -> Option<&str> {
        match self.content.entries.get(key)? {
            Translation::Singular(message) => Some(message),
            Translation::Plural(_) => None,
        }
    }

    fn own_plural(&self, key: &str, n: u64) -> Option<&str> {
        match self.content.entries.get(key)? {
            Translation::Plural(forms) => forms
                .get(self.content.plural.index(n))
                .map(String::as_str),
            Translation::Singular(_) => None,
        }
    }

    /// Looks up the translation of `msgid` along the fallback chain.
    pub fn lookup(&self, msgid: &str) -> Option<&str> {
        self.chain().find_map(|catalog| catalog.own_singular(msgid))
    }

    /// Looks up the plural form for `n` items of `msgid` along the fallback chain.
    pub fn lookup_plural(&self, msgid: &str, n: u64) -> Option<&str> {
        self.chain().find_map(|catalog| catalog.own_plural(msgid, n))
    }

    /// Translates `msgid`, returning it untranslated if no catalog of the chain knows it.
    pub fn gettext<'a>(&'a self, msgid: &'a str) -> &'a str {
        self.lookup(msgid).unwrap_or(msgid)
    }

    /// Translates the plural message for `n` items.
    ///
    /// Untranslated messages resolve to `singular` for exactly one item and to `plural`
    /// otherwise.
    pub fn ngettext<'a>(&'a self, singular: &'a str, plural: &'a str, n: u64) -> &'a str {
        self.lookup_plural(singular, n)
            .unwrap_or(if n == 1 { singular } else { plural })
    }

    /// Translates `msgid` within `context`.
    pub fn pgettext<'a>(&'a self, context: &str, msgid: &'a str) -> &'a str {
        self.lookup(&context_key(context, msgid)).unwrap_or(msgid)
    }

    /// Translates the plural message for `n` items within `context`.
    pub fn npgettext<'a>(
        &'a self,
        context: &str,
        singular: &'a str,
        plural: &'a str,
        n: u64,
    ) -> &'a str {
        self.lookup_plural(&context_key(context, singular), n)
            .unwrap_or(if n == 1 { singular } else { plural })
    }
}

/// Builds the entry key of a message with context.
pub fn context_key(context: &str, msgid: &str) -> String {
    format!("{context}{CONTEXT_SEPARATOR}{msgid}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(entries: &[(&str, &str)]) -> Catalog {
        Catalog::new(CatalogContent {
            entries: entries
                .iter()
                .map(|(k, v)| (k.to_string(), Translation::Singular(v.to_string())))
                .collect(),
            ..Default::default()
        })
    }

    #[test]
    fn empty_catalog_misses() {
        let catalog = Catalog::empty();
        assert!(catalog.is_empty());
        assert_eq!(catalog.lookup("Hello"), None);
        assert_eq!(catalog.gettext("Hello"), "Hello");
        assert_eq!(catalog.ngettext("apple", "apples", 1), "apple");
        assert_eq!(catalog.ngettext("apple", "apples", 3), "apples");
        assert_eq!(catalog.pgettext("menu", "Open"), "Open");
    }

    #[test]
    fn fallback_chain_order() {
        let mut first = catalog(&[("a", "first a")]);
        first.add_fallback(catalog(&[("a", "second a"), ("b", "second b")]));
        first.add_fallback(catalog(&[("b", "third b"), ("c", "third c")]));

        assert_eq!(first.chain().count(), 3);
        assert_eq!(first.gettext("a"), "first a");
        assert_eq!(first.gettext("b"), "second b");
        assert_eq!(first.gettext("c"), "third c");
        assert_eq!(first.gettext("d"), "d");
    }

    #[test]
    fn set_fallback_replaces_tail() {
        let mut first = catalog(&[]);
        first.set_fallback(catalog(&[("a", "old")]));
        first.set_fallback(catalog(&[("a", "new")]));
        assert_eq!(first.chain().count(), 2);
        assert_eq!(first.gettext("a"), "new");
    }

    #[test]
    fn clones_share_content_but_not_metadata() {
        let original = catalog(&[("a", "b")]);
        let mut left = original.clone();
        let right = original.clone();

        left.set_output_charset("latin-1");
        left.add_fallback(catalog(&[("x", "y")]));

        assert!(left.shares_messages_with(&right));
        assert!(left.shares_messages_with(&original));
        assert_eq!(left.output_charset(), Some("latin-1"));
        assert_eq!(right.output_charset(), None);
        assert!(right.fallback().is_none());
        assert!(!left.shares_messages_with(&catalog(&[("a", "b")])));
    }

    #[test]
    fn output_charset_does_not_change_lookups() {
        let mut catalog = catalog(&[("cheese", "Käse")]);
        catalog.set_output_charset("ISO-8859-1");
        assert_eq!(catalog.output_charset(), Some("ISO-8859-1"));
        assert_eq!(catalog.gettext("cheese"), "Käse");
    }

    #[test]
    fn plural_and_context_entries() {
        let mut entries = HashMap::new();
        entries.insert(
            "file".to_string(),
            Translation::Plural(vec!["Datei".to_string(), "Dateien".to_string()]),
        );
        entries.insert(
            context_key("menu", "Open"),
            Translation::Singular("Öffnen".to_string()),
        );
        let catalog = Catalog::new(CatalogContent {
            entries,
            ..Default::default()
        });

        assert_eq!(catalog.ngettext("file", "files", 1), "Datei");
        assert_eq!(catalog.ngettext("file", "files", 2), "Dateien");
        assert_eq!(catalog.pgettext("menu", "Open"), "Öffnen");
        assert_eq!(catalog.gettext("Open"), "Open");
        // plural entries never answer singular lookups
        assert_eq!(catalog.gettext("file"), "file");
    }
}
