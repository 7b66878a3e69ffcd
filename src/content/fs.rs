//! Filesystem-backed content store

use super::traits::{ContentEntry, ContentReader, ContentStore, Locator, PendingContent};
use crate::error::StorageError;
use crate::utils::sanitize_file_name;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Staged files are hidden; locators never start with a dot
const STAGING_PREFIX: &str = ".";
const STAGING_SUFFIX: &str = ".part";

/// Content store keeping one file per attachment in a flat directory
///
/// Locators are bare file names of the form `<random>_<sanitized name>`, so a
/// locator can never address anything outside the root. Writes are staged as
/// `.<locator>.part` and renamed into place on commit.
#[derive(Clone, Debug)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Open (creating if needed) a content directory
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| Error::Config {
            message: format!(
                "failed to create content directory {}: {}",
                root.display(),
                e
            ),
            key: Some("content.content_dir".to_string()),
        })?;
        Ok(Self { root })
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a locator to its path, rejecting anything that is not a plain file name
    fn resolve(&self, locator: &Locator) -> Result<PathBuf> {
        let raw = locator.as_str();
        let valid = !raw.is_empty()
            && !raw.starts_with('.')
            && !raw.contains(['/', '\\', '\0'])
            && Path::new(raw).components().count() == 1;
        if !valid {
            return Err(StorageError::InvalidLocator(raw.to_string()).into());
        }
        Ok(self.root.join(raw))
    }

    /// Path of the staged file behind `locator`
    fn staging_path(&self, locator: &Locator) -> Result<PathBuf> {
        self.resolve(locator)?;
        Ok(self.root.join(format!(
            "{}{}{}",
            STAGING_PREFIX,
            locator.as_str(),
            STAGING_SUFFIX
        )))
    }

    fn file_name_for(name: &str, mime_type: Option<&str>) -> String {
        let mut file_name = sanitize_file_name(name);
        if Path::new(&file_name).extension().is_none()
            && let Some(ext) = mime_type.and_then(extension_for_mime)
        {
            file_name.push('.');
            file_name.push_str(ext);
        }
        let prefix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}", &prefix[..12], file_name)
    }
}

/// Extension implied by a MIME subtype, when it is a plain short token
fn extension_for_mime(mime_type: &str) -> Option<&str> {
    let subtype = mime_type.split(';').next()?.split('/').nth(1)?.trim();
    match subtype {
        "jpeg" => Some("jpg"),
        "plain" => Some("txt"),
        s if !s.is_empty() && s.len() <= 5 && s.chars().all(|c| c.is_ascii_alphanumeric()) => {
            Some(s)
        }
        _ => None,
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn exists(&self, locator: &Locator) -> bool {
        let Ok(path) = self.resolve(locator) else {
            return false;
        };
        tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn open_read(&self, locator: &Locator) -> Result<ContentReader> {
        let path = self.resolve(locator)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(locator.to_string()).into());
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let size = file.metadata().await?.len();
        Ok(ContentReader {
            size,
            reader: Box::new(file),
        })
    }

    async fn open_write(&self, name: &str, mime_type: Option<&str>) -> Result<PendingContent> {
        let locator = Locator::new(Self::file_name_for(name, mime_type));
        let path = self.staging_path(&locator)?;

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| StorageError::WriteFailed {
                locator: locator.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(locator = %locator, "staged content for writing");

        Ok(PendingContent {
            locator,
            writer: Box::new(tokio::io::BufWriter::new(file)),
        })
    }

    async fn commit(&self, locator: &Locator) -> Result<()> {
        let staged = self.staging_path(locator)?;
        let path = self.resolve(locator)?;
        match tokio::fs::rename(&staged, &path).await {
            Ok(()) => {
                tracing::debug!(locator = %locator, "committed content");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(locator.to_string()).into())
            }
            Err(e) => Err(StorageError::WriteFailed {
                locator: locator.to_string(),
                reason: e.to_string(),
            }
            .into()),
        }
    }

    async fn discard(&self, locator: &Locator) -> Result<bool> {
        remove(&self.staging_path(locator)?, locator).await
    }

    async fn delete(&self, locator: &Locator) -> Result<bool> {
        remove(&self.resolve(locator)?, locator).await
    }

    async fn list(&self) -> Result<Vec<ContentEntry>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = dir.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                // Removed between listing and stat
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            };
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let (name, pending) = match name
                .strip_prefix(STAGING_PREFIX)
                .and_then(|n| n.strip_suffix(STAGING_SUFFIX))
            {
                Some(staged) => (staged.to_string(), true),
                None if name.starts_with(STAGING_PREFIX) => continue,
                None => (name, false),
            };
            entries.push(ContentEntry {
                locator: Locator::new(name),
                modified: metadata.modified()?,
                pending,
            });
        }

        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}

async fn remove(path: &Path, locator: &Locator) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(locator = %locator, path = %path.display(), "removed content");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::DeleteFailed {
            locator: locator.to_string(),
            reason: e.to_string(),
        }
        .into()),
    }
}
