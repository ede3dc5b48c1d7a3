use std::ffi::OsString;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::{ApiError, ApiResult};

/// A whole JSON document on disk.
///
/// Every mutation is a read-modify-write of the full file. Mutations on
/// one document are serialized by `write_lock`, and the rewrite goes
/// through a temp file and a rename, so readers never observe a partial
/// document and concurrent writers never drop each other's changes.
pub struct JsonDocument<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Opens the document, creating it with `T::default()` when absent.
    pub async fn open(path: impl Into<PathBuf>) -> ApiResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        if !fs::try_exists(&path).await? {
            write_atomic(&path, &T::default()).await?;
            info!(path = %path.display(), "created empty document");
        }
        Ok(JsonDocument {
            path,
            write_lock: Mutex::new(()),
            _doc: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> ApiResult<T> {
        let bytes = fs::read(&self.path).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "document is not valid JSON");
            ApiError::StorageFailure("stored document is unreadable".to_string())
        })
    }

    /// Replaces the whole document.
    pub async fn write(&self, value: &T) -> ApiResult<()> {
        let _guard = self.write_lock.lock().await;
        write_atomic(&self.path, value).await
    }

    /// Reads the document, applies `mutate` and rewrites it.
    ///
    /// Nothing is written when `mutate` fails.
    pub async fn update<R, F>(&self, mutate: F) -> ApiResult<R>
    where
        F: FnOnce(&mut T) -> ApiResult<R>,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read().await?;
        let out = mutate(&mut doc)?;
        write_atomic(&self.path, &doc).await?;
        Ok(out)
    }
}

async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> ApiResult<()> {
    let body = serde_json::to_vec_pretty(value)?;
    let tmp = temp_path(path);
    fs::write(&tmp, &body).await?;
    fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = body.len(), "document written");
    Ok(())
}

/// `<file name>.tmp` next to the document.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::models::SiteConfig;

    #[tokio::test]
    async fn open_creates_default_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("products.json");
        let doc = JsonDocument::<Vec<String>>::open(&path).await.unwrap();
        assert!(path.exists());
        assert!(doc.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_keeps_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(&path, r#"["a","b"]"#).unwrap();
        let doc = JsonDocument::<Vec<String>>::open(&path).await.unwrap();
        assert_eq!(doc.read().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn config_round_trip_is_lossless() {
        let dir = TempDir::new().unwrap();
        let doc = JsonDocument::<SiteConfig>::open(dir.path().join("config.json"))
            .await
            .unwrap();
        let config: SiteConfig = serde_json::from_value(json!({
            "hero": [{"video": "data:video/mp4;base64,AAAA", "title": "T", "text": "X", "buttonText": "B"}],
            "featured": {"rolex": "uploads/1-rolex.png", "patek": "img/pat.jpg"},
            "subpages": {"richard": [null, "uploads/2-r.png"]},
            "announcement": "Summer sale"
        }))
        .unwrap();
        doc.write(&config).await.unwrap();
        assert_eq!(doc.read().await.unwrap(), config);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_document_untouched() {
        let dir = TempDir::new().unwrap();
        let doc = JsonDocument::<Vec<u32>>::open(dir.path().join("n.json")).await.unwrap();
        doc.write(&vec![1, 2]).await.unwrap();
        let result = doc
            .update(|list| {
                list.push(3);
                Err::<(), _>(ApiError::InvalidInput("nope".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(doc.read().await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn concurrent_updates_are_all_kept() {
        let dir = TempDir::new().unwrap();
        let doc = Arc::new(
            JsonDocument::<Vec<u32>>::open(dir.path().join("n.json"))
                .await
                .unwrap(),
        );
        let mut handles = Vec::new();
        for n in 0..16 {
            let doc = Arc::clone(&doc);
            handles.push(tokio::spawn(async move {
                doc.update(|list| {
                    list.push(n);
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let mut stored = doc.read().await.unwrap();
        stored.sort_unstable();
        assert_eq!(stored, (0..16).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn corrupt_document_is_a_storage_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let doc = JsonDocument::<SiteConfig>::open(&path).await.unwrap();
        match doc.read().await {
            Err(ApiError::StorageFailure(msg)) => {
                assert!(!msg.contains(&*dir.path().to_string_lossy()));
            }
            other => panic!("expected a storage failure, got {:?}", other),
        }
    }

    #[test]
    fn temp_path_keeps_the_full_file_name() {
        let dir = Path::new("data");
        assert_eq!(temp_path(&dir.join("data.products")), dir.join("data.products.tmp"));
        assert_eq!(temp_path(&dir.join("data.config")), dir.join("data.config.tmp"));
    }

    #[tokio::test]
    async fn documents_sharing_a_stem_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let products = Arc::new(
            JsonDocument::<Vec<u32>>::open(dir.path().join("data.products"))
                .await
                .unwrap(),
        );
        let config = Arc::new(
            JsonDocument::<Vec<u32>>::open(dir.path().join("data.config"))
                .await
                .unwrap(),
        );
        let mut handles = Vec::new();
        for n in 0..8 {
            for doc in [Arc::clone(&products), Arc::clone(&config)] {
                handles.push(tokio::spawn(async move {
                    doc.update(|list| {
                        list.push(n);
                        Ok(())
                    })
                    .await
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        for doc in [&products, &config] {
            let mut stored = doc.read().await.unwrap();
            stored.sort_unstable();
            assert_eq!(stored, (0..8).collect::<Vec<_>>());
        }
    }
}
