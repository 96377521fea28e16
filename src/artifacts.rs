//! Source artifact resolution and result publication.
//!
//! A task's `input_file` is an opaque handle: an `http(s)` URL is downloaded,
//! anything else is treated as a local path and copied into the worker's
//! scratch space. Published results get a short random prefix so repeated
//! conversions of the same file never collide in the output directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;

use fr_core::config::ArtifactConfig;
use fr_core::{Error, Result};

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Materialize the source artifact as a local file under `dest_dir`.
    async fn fetch(&self, source: &str, dest_dir: &Path) -> Result<PathBuf>;

    /// Publish a finished result and return its URL (or local path when no
    /// public base URL is configured).
    async fn publish(&self, file: &Path) -> Result<String>;
}

/// Filesystem-backed artifact store with HTTP fetch support.
pub struct FsArtifactStore {
    config: ArtifactConfig,
    http: reqwest::Client,
}

impl FsArtifactStore {
    pub fn new(config: ArtifactConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn random_prefix() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(4)
            .map(|c| (c as char).to_ascii_lowercase())
            .collect()
    }

    /// Published file name: `{4-char random}_{original name}`.
    fn published_name(file: &Path) -> String {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        format!("{}_{name}", Self::random_prefix())
    }

    async fn fetch_url(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Artifact(format!("download failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Artifact(format!(
                "download failed: {} returned {}",
                url,
                response.status()
            )));
        }

        // file name from the URL path, ignoring any query string
        let name = url
            .split('?')
            .next()
            .and_then(|u| u.rsplit('/').next())
            .filter(|n| !n.is_empty())
            .unwrap_or("input")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Artifact(format!("download failed: {e}")))?;

        let dest = dest_dir.join(name);
        tokio::fs::write(&dest, &bytes).await?;
        Ok(dest)
    }

    async fn fetch_local(&self, source: &str, dest_dir: &Path) -> Result<PathBuf> {
        let src = Path::new(source);
        if !src.exists() {
            return Err(Error::Artifact(format!("source file not found: {source}")));
        }

        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "input".to_string());
        let dest = dest_dir.join(name);
        tokio::fs::copy(src, &dest).await?;
        Ok(dest)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn fetch(&self, source: &str, dest_dir: &Path) -> Result<PathBuf> {
        if source.starts_with("http://") || source.starts_with("https://") {
            self.fetch_url(source, dest_dir).await
        } else {
            self.fetch_local(source, dest_dir).await
        }
    }

    async fn publish(&self, file: &Path) -> Result<String> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let name = Self::published_name(file);
        let dest = self.config.output_dir.join(&name);
        tokio::fs::copy(file, &dest).await?;

        tracing::debug!(file = %dest.display(), "Result published");

        Ok(match &self.config.public_url {
            Some(base) => format!("{}/{name}", base.trim_end_matches('/')),
            None => dest.to_string_lossy().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> FsArtifactStore {
        FsArtifactStore::new(ArtifactConfig {
            output_dir: dir.join("output"),
            public_url: None,
        })
    }

    #[tokio::test]
    async fn fetch_local_copies_into_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let src = dir.path().join("model.step");
        std::fs::write(&src, b"ISO-10303-21;").unwrap();

        let store = store_in(dir.path());
        let fetched = store
            .fetch(&src.to_string_lossy(), scratch.path())
            .await
            .unwrap();

        assert_eq!(fetched, scratch.path().join("model.step"));
        assert!(fetched.exists());
    }

    #[tokio::test]
    async fn fetch_missing_local_is_artifact_error() {
        let scratch = tempfile::tempdir().unwrap();
        let store = store_in(scratch.path());

        let err = store
            .fetch("/nonexistent/model.step", scratch.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Artifact(_)));
    }

    #[tokio::test]
    async fn publish_prefixes_and_copies() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("part.stl");
        std::fs::write(&file, b"solid part\nendsolid part\n").unwrap();

        let store = store_in(dir.path());
        let url = store.publish(&file).await.unwrap();

        let name = url.rsplit('/').next().unwrap();
        assert!(name.ends_with("_part.stl"), "unexpected name: {name}");
        assert_eq!(name.len(), "part.stl".len() + 5);
        assert!(dir.path().join("output").join(name).exists());
    }

    #[tokio::test]
    async fn publish_uses_public_url_base() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("part.stl");
        std::fs::write(&file, b"solid part\nendsolid part\n").unwrap();

        let store = FsArtifactStore::new(ArtifactConfig {
            output_dir: dir.path().join("output"),
            public_url: Some("http://files.local/results/".to_string()),
        });
        let url = store.publish(&file).await.unwrap();
        assert!(url.starts_with("http://files.local/results/"));
    }
}
