use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::warn;

use super::{sort_holdings, Storage};
use crate::models::{Holding, Id};

/// JSON file-based storage implementation.
///
/// Directory structure:
/// ```text
/// data/
///   users/
///     {user_id}/
///       holdings/
///         {holding_id}.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    base_path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn users_dir(&self) -> PathBuf {
        self.base_path.join("users")
    }

    fn holdings_dir(&self, user_id: &Id) -> Result<PathBuf> {
        ensure_path_safe(user_id)?;
        Ok(self.users_dir().join(user_id.as_str()).join("holdings"))
    }

    fn holding_file(&self, user_id: &Id, id: &Id) -> Result<PathBuf> {
        ensure_path_safe(id)?;
        Ok(self.holdings_dir(user_id)?.join(format!("{id}.json")))
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(
        &self,
        path: &Path,
    ) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let parent = path
            .parent()
            .with_context(|| format!("No parent directory for {:?}", path))?
            .to_path_buf();
        fs::create_dir_all(&parent)
            .await
            .context("Failed to create directory")?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        let path = path.to_path_buf();

        // Every write gets its own temp file in the target directory, then is
        // renamed over the destination. Readers never see a partial file.
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = NamedTempFile::new_in(&parent).context("Failed to create temp file")?;
            tmp.write_all(content.as_bytes()).context("Failed to write file")?;
            tmp.persist(&path).context("Failed to move file into place")?;
            Ok(())
        })
        .await
        .context("File write task panicked")?
    }
}

fn ensure_path_safe(id: &Id) -> Result<()> {
    if !Id::is_path_safe(id.as_str()) {
        anyhow::bail!("Refusing unsafe id {:?}", id.as_str());
    }
    Ok(())
}

#[async_trait::async_trait]
impl Storage for JsonFileStorage {
    async fn list_holdings(&self, user_id: &Id) -> Result<Vec<Holding>> {
        let dir = self.holdings_dir(user_id)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read holdings directory"),
        };

        let mut holdings = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_json::<Holding>(&path).await {
                Ok(Some(holding)) => holdings.push(holding),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable holding");
                }
            }
        }

        sort_holdings(&mut holdings);
        Ok(holdings)
    }

    async fn get_holding(&self, user_id: &Id, id: &Id) -> Result<Option<Holding>> {
        let path = self.holding_file(user_id, id)?;
        self.read_json(&path).await
    }

    async fn save_holding(&self, user_id: &Id, holding: &Holding) -> Result<()> {
        let path = self.holding_file(user_id, &holding.id)?;
        self.write_json(&path, holding).await
    }

    async fn delete_holding(&self, user_id: &Id, id: &Id) -> Result<bool> {
        let path = self.holding_file(user_id, id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).context("Failed to delete holding"),
        }
    }

    async fn ping(&self) -> Result<()> {
        fs::create_dir_all(self.users_dir())
            .await
            .with_context(|| format!("Data directory not writable: {}", self.base_path.display()))
    }
}
