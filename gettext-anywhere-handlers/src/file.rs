use crate::search::SearchPolicy;
use crate::{
    CandidatePath, CatalogHandler, Error, FindMode, HandlerOptions, HandlerType, Operation, Result,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

/// The locale directory that is searched if neither the caller nor the options provide one.
pub const DEFAULT_LOCALE_DIR: &str = "/usr/share/locale";

fn default_locale_dir() -> String {
    DEFAULT_LOCALE_DIR.to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct FileOptions {
    #[serde(default = "default_locale_dir")]
    default_locale_dir: String,
    #[serde(default)]
    search: SearchPolicy,
}

/// A handler that reads catalogs from the local filesystem.
///
/// Options:
/// - `default_locale_dir` (default `/usr/share/locale`)
/// - `search`, overrides of the [`SearchPolicy`]
#[derive(Debug)]
pub struct FileHandler {
    domain: String,
    default_locale_dir: String,
    policy: SearchPolicy,
    path: Option<CandidatePath>,
    file: Option<File>,
}

impl FileHandler {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            default_locale_dir: default_locale_dir(),
            policy: SearchPolicy::default(),
            path: None,
            file: None,
        }
    }

    pub fn with_default_locale_dir(mut self, locale_dir: impl Into<String>) -> Self {
        self.default_locale_dir = locale_dir.into();
        self
    }

    pub fn with_policy(mut self, policy: SearchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl HandlerType for FileHandler {
    const KIND: &'static str = "file";

    fn create(domain: &str, options: &HandlerOptions) -> Result<Self> {
        let options: FileOptions = options.parse(Self::KIND)?;
        Ok(Self::new(domain)
            .with_default_locale_dir(options.default_locale_dir)
            .with_policy(options.search))
    }
}

#[async_trait]
impl CatalogHandler for FileHandler {
    async fn open(&mut self, candidate: &CandidatePath) -> Result<()> {
        self.close().await?;
        match File::open(candidate.as_str()).await {
            Ok(file) => self.file = Some(file),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %candidate, "catalog file does not exist");
            }
            Err(err) => {
                return Err(Error::access(
                    Self::KIND,
                    Operation::Open,
                    candidate.as_str(),
                    err,
                ));
            }
        }
        self.path = Some(candidate.clone());
        Ok(())
    }

    async fn find(
        &mut self,
        locale_dir: Option<&str>,
        languages: Option<&[String]>,
        mode: FindMode,
    ) -> Result<Vec<CandidatePath>> {
        let locale_dir = locale_dir.unwrap_or(&self.default_locale_dir);
        let languages = self.policy.languages(languages);

        let mut found = Vec::new();
        for candidate in self.policy.candidates(&self.domain, locale_dir, &languages) {
            let exists = fs::try_exists(candidate.as_str())
                .await
                .map_err(|err| {
                    Error::access(Self::KIND, Operation::Find, candidate.as_str(), err)
                })?;
            if !exists {
                continue;
            }

            trace!(path = %candidate, "found catalog file");
            found.push(candidate);
            if mode == FindMode::First {
                break;
            }
        }
        Ok(found)
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        let Some(path) = &self.path else {
            return Err(Error::NotOpen {
                handler_type: Self::KIND,
            });
        };
        let Some(file) = self.file.as_mut() else {
            return Ok(Vec::new());
        };

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .await
            .map_err(|err| Error::access(Self::KIND, Operation::Read, path.as_str(), err))?;
        Ok(buffer)
    }

    async fn close(&mut self) -> Result<()> {
        self.file = None;
        self.path = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_catalog(root: &Path, language: &str, domain: &str, contents: &[u8]) {
        let dir = root.join(language).join("LC_MESSAGES");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{domain}.mo")), contents).unwrap();
    }

    fn handler(root: &Path) -> FileHandler {
        FileHandler::new("messages")
            .with_default_locale_dir(root.to_string_lossy())
            .with_policy(SearchPolicy {
                langpack_root: None,
                ..Default::default()
            })
    }

    fn languages(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn find_first() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), "de_DE", "messages", b"specific");
        write_catalog(dir.path(), "de", "messages", b"generic");

        let mut handler = handler(dir.path());
        let found = handler
            .find(None, Some(&languages(&["de_DE"])), FindMode::First)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].as_str().ends_with("de_DE/LC_MESSAGES/messages.mo"));
    }

    #[tokio::test]
    async fn find_all_in_search_order() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), "de", "messages", b"generic");
        write_catalog(dir.path(), "de_DE", "messages", b"specific");
        write_catalog(dir.path(), "fr", "messages", b"french");

        let mut handler = handler(dir.path());
        let found = handler
            .find(None, Some(&languages(&["de_DE", "fr"])), FindMode::All)
            .await
            .unwrap();
        let found: Vec<_> = found
            .iter()
            .map(|path| path.as_str().trim_start_matches(&*dir.path().to_string_lossy()))
            .collect();
        assert_eq!(
            found,
            vec![
                "/de_DE/LC_MESSAGES/messages.mo",
                "/de/LC_MESSAGES/messages.mo",
                "/fr/LC_MESSAGES/messages.mo",
            ]
        );
    }

    #[tokio::test]
    async fn find_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), "de", "other", b"other domain");

        let mut handler = handler(dir.path());
        let found = handler
            .find(None, Some(&languages(&["de"])), FindMode::All)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn find_with_explicit_locale_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), "de", "messages", b"generic");

        let mut handler = FileHandler::new("messages");
        let locale_dir = dir.path().to_string_lossy().to_string();
        let found = handler
            .find(Some(&locale_dir), Some(&languages(&["de"])), FindMode::First)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn open_read_close() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog(dir.path(), "de", "messages", b"catalog bytes");

        let mut handler = handler(dir.path());
        let found = handler
            .find(None, Some(&languages(&["de"])), FindMode::First)
            .await
            .unwrap();
        handler.open(&found[0]).await.unwrap();
        assert_eq!(handler.read().await.unwrap(), b"catalog bytes");
        handler.close().await.unwrap();
        handler.close().await.unwrap();
        assert!(matches!(
            handler.read().await,
            Err(Error::NotOpen { handler_type: "file" })
        ));
    }

    #[tokio::test]
    async fn read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(dir.path());
        let candidate = CandidatePath::new(
            dir.path()
                .join("de/LC_MESSAGES/messages.mo")
                .to_string_lossy(),
        );
        handler.open(&candidate).await.unwrap();
        assert!(handler.read().await.unwrap().is_empty());
    }

    #[test]
    fn create_from_options() {
        let options = HandlerOptions::new()
            .with("default_locale_dir", "/srv/locale")
            .with("search", serde_json::json!({"langpack_root": null}));
        let handler = FileHandler::create("app", &options).unwrap();
        assert_eq!(handler.domain(), "app");
        assert_eq!(handler.default_locale_dir, "/srv/locale");
        assert_eq!(handler.policy.langpack_root, None);
        assert_eq!(handler.policy.category, "LC_MESSAGES");
    }

    #[test]
    fn create_with_defaults() {
        let handler = FileHandler::create("app", &HandlerOptions::new()).unwrap();
        assert_eq!(handler.default_locale_dir, DEFAULT_LOCALE_DIR);
        assert_eq!(handler.policy, SearchPolicy::default());
    }
}
