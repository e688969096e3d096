use crate::CandidatePath;
use serde::Deserialize;
use std::env;

/// The sentinel language that ends every search. It never matches a catalog.
pub const C_LOCALE: &str = "C";

/// The locale category directory that catalogs are stored under.
pub const DEFAULT_CATEGORY: &str = "LC_MESSAGES";

/// The file extension of compiled catalogs.
pub const DEFAULT_EXTENSION: &str = "mo";

/// The alternate root that is searched after the locale directory for every language.
pub const DEFAULT_LANGPACK_ROOT: &str = "locale-langpack";

/// The environment variables that define the preferred languages, in order of precedence.
pub const DEFAULT_ENV_VARS: [&str; 4] = ["LANGUAGE", "LC_ALL", "LC_MESSAGES", "LANG"];

const COMPONENT_CODESET: u8 = 1 << 0;
const COMPONENT_TERRITORY: u8 = 1 << 1;
const COMPONENT_MODIFIER: u8 = 1 << 2;

/// [SearchPolicy] holds the rules that turn a domain and a list of languages into the ordered
/// candidate paths a handler probes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchPolicy {
    /// The category directory below each language directory.
    pub category: String,

    /// The extension of catalog files.
    pub extension: String,

    /// The alternate root searched after the locale directory (disabled if unset).
    pub langpack_root: Option<String>,

    /// The environment variables consulted when no languages are given.
    pub env_vars: Vec<String>,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            langpack_root: Some(DEFAULT_LANGPACK_ROOT.to_string()),
            env_vars: DEFAULT_ENV_VARS.iter().map(|var| var.to_string()).collect(),
        }
    }
}

impl SearchPolicy {
    /// Determines the languages to search for using the process environment.
    ///
    /// Explicit languages are returned as they are. Otherwise, the first non-empty environment
    /// variable is split by `:` and the `C` sentinel is appended if it is not already present.
    pub fn languages(&self, explicit: Option<&[String]>) -> Vec<String> {
        self.languages_with(explicit, |name| env::var(name).ok())
    }

    /// Like [`languages`](SearchPolicy::languages) but with a custom environment lookup.
    pub fn languages_with<F>(&self, explicit: Option<&[String]>, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(explicit) = explicit {
            return explicit.to_vec();
        }

        let mut languages: Vec<String> = self
            .env_vars
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.is_empty())
            .map(|value| value.split(':').map(str::to_string).collect())
            .unwrap_or_default();
        if !languages.iter().any(|language| language == C_LOCALE) {
            languages.push(C_LOCALE.to_string());
        }
        languages
    }

    /// Builds the ordered candidate paths for `domain` below `locale_dir`.
    ///
    /// Every language is expanded into its variants (see [`expand_locale`]) and duplicates are
    /// dropped, keeping the first occurrence. The search ends at the `C` sentinel, even if more
    /// languages follow it. Each variant contributes its canonical path followed by its
    /// alternate path.
    pub fn candidates(
        &self,
        domain: &str,
        locale_dir: &str,
        languages: &[String],
    ) -> Vec<CandidatePath> {
        let mut variants: Vec<String> = Vec::new();
        for language in languages.iter().filter(|language| !language.is_empty()) {
            for variant in expand_locale(language) {
                if !variants.contains(&variant) {
                    variants.push(variant);
                }
            }
        }

        let file_name = format!("{domain}.{}", self.extension);
        let mut candidates = Vec::with_capacity(variants.len() * 2);
        for variant in &variants {
            if variant == C_LOCALE {
                break;
            }
            candidates.push(CandidatePath::new(join(&[
                locale_dir,
                variant,
                &self.category,
                &file_name,
            ])));
            if let Some(root) = &self.langpack_root {
                candidates.push(CandidatePath::new(join(&[
                    root,
                    variant,
                    &self.category,
                    &file_name,
                ])));
            }
        }
        candidates
    }
}

/// Expands a locale tag into all of its variants, most specific first.
///
/// A tag has the form `language[_territory][.codeset][@modifier]`. Every combination of the
/// present optional components is produced, e.g. `de_DE.UTF-8` expands to
/// `["de_DE.UTF-8", "de_DE", "de.UTF-8", "de"]`.
pub fn expand_locale(tag: &str) -> Vec<String> {
    let (rest, modifier) = split_suffix(tag, '@');
    let (rest, codeset) = split_suffix(rest, '.');
    let (language, territory) = split_suffix(rest, '_');

    let mut mask = 0;
    if codeset.is_some() {
        mask |= COMPONENT_CODESET;
    }
    if territory.is_some() {
        mask |= COMPONENT_TERRITORY;
    }
    if modifier.is_some() {
        mask |= COMPONENT_MODIFIER;
    }

    (0..=mask)
        .rev()
        // only combinations of components that are actually present
        .filter(|combination| combination & !mask == 0)
        .map(|combination| {
            let mut variant = language.to_string();
            for (component, value) in [
                (COMPONENT_TERRITORY, territory),
                (COMPONENT_CODESET, codeset),
                (COMPONENT_MODIFIER, modifier),
            ] {
                if let Some(value) = value.filter(|_| combination & component != 0) {
                    variant.push_str(value);
                }
            }
            variant
        })
        .collect()
}

/// Splits `value` at the first `separator`, keeping the separator in the suffix.
fn split_suffix(value: &str, separator: char) -> (&str, Option<&str>) {
    match value.find(separator) {
        Some(position) => (&value[..position], Some(&value[position..])),
        None => (value, None),
    }
}

/// Joins path segments with `/`, without doubling separators that are already present.
fn join(segments: &[&str]) -> String {
    let mut path = String::new();
    for segment in segments {
        if !path.is_empty() && !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(segment);
    }
    path
}
