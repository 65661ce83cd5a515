//! JSON file-backed subscriber storage with atomic writes.

use std::path::{Path, PathBuf};

use {async_trait::async_trait, tokio::fs, tracing::debug};

use crate::{Error, Result, store::SubscriberBackend, types::SubscriberState};

/// File-backed store. Active and removed subscribers in a single JSON file.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store under `<dir>/<storage_name>.json`.
    pub fn in_dir(dir: &Path, storage_name: &str) -> Self {
        Self::new(dir.join(format!("{storage_name}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomic write: write to temp, rename over target, keep `.bak`.
    async fn atomic_write(&self, state: &SubscriberState) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, json.as_bytes()).await?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            let _ = fs::rename(&self.path, &bak).await;
        }

        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriberBackend for FileBackend {
    async fn load(&self) -> Result<SubscriberState> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!(path = %self.path.display(), "no subscriber storage yet, starting empty");
            return Ok(SubscriberState::default());
        }
        let data = fs::read_to_string(&self.path).await?;
        serde_json::from_str(&data).map_err(|e| {
            Error::external(format!("failed to parse {}", self.path.display()), e)
        })
    }

    async fn save(&self, state: &SubscriberState) -> Result<()> {
        self.atomic_write(state).await?;
        debug!(
            path = %self.path.display(),
            active = state.subscribers.len(),
            removed = state.removed_subscribers.len(),
            "saved subscriber storage"
        );
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::types::Subscriber, tempfile::TempDir};

    fn make_state() -> SubscriberState {
        SubscriberState {
            subscribers: vec![Subscriber::new(Some("@alice".into()), Some("1".into()))],
            removed_subscribers: vec![Subscriber::new(Some("@bob".into()), Some("2".into()))],
        }
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::in_dir(tmp.path(), "subscriber-storage");
        assert_eq!(backend.load().await.unwrap(), SubscriberState::default());
    }

    #[tokio::test]
    async fn save_then_load_returns_same_state() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::in_dir(tmp.path(), "subscriber-storage");
        let state = make_state();
        backend.save(&state).await.unwrap();
        assert_eq!(backend.load().await.unwrap(), state);
        assert!(tmp.path().join("subscriber-storage.json").exists());
    }

    #[tokio::test]
    async fn second_save_keeps_backup() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::in_dir(tmp.path(), "subscriber-storage");
        backend.save(&SubscriberState::default()).await.unwrap();
        backend.save(&make_state()).await.unwrap();

        assert!(tmp.path().join("subscriber-storage.json.bak").exists());
        assert!(!tmp.path().join("subscriber-storage.json.tmp").exists());
    }

    #[tokio::test]
    async fn creates_missing_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::new(tmp.path().join("nested/dir/state.json"));
        backend.save(&make_state()).await.unwrap();
        assert_eq!(backend.load().await.unwrap().subscribers.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_reports_path() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::in_dir(tmp.path(), "broken");
        std::fs::write(backend.path(), "{not json").unwrap();
        let err = backend.load().await.unwrap_err();
        assert!(err.to_string().contains("broken.json"), "{err}");
    }
}
