use kiln_core::ports::{ReleaseSink, SecretProvider};
use kiln_core::run::ReleaseAsset;
use kiln_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Attaches release archives and the benchmark archive to a tag's release.
pub struct Publisher {
    sink: Arc<dyn ReleaseSink>,
    secrets: Arc<dyn SecretProvider>,
    credential_secret: String,
}

impl Publisher {
    pub fn new(
        sink: Arc<dyn ReleaseSink>,
        secrets: Arc<dyn SecretProvider>,
        credential_secret: impl Into<String>,
    ) -> Self {
        Self {
            sink,
            secrets,
            credential_secret: credential_secret.into(),
        }
    }

    /// Publish `archives` plus the file at `bench_archive` in one sink call.
    /// Returns the attached asset names.
    #[instrument(skip(self, archives), fields(archives = archives.len()))]
    pub async fn publish(
        &self,
        tag: &str,
        archives: &[ReleaseAsset],
        bench_archive: &Path,
    ) -> Result<Vec<String>> {
        let bench = asset_from_file(bench_archive).await.map_err(|e| {
            Error::Publish(format!(
                "benchmark archive {} unavailable: {}",
                bench_archive.display(),
                e
            ))
        })?;

        let credential = self.secrets.get(&self.credential_secret).await?;

        let mut assets = archives.to_vec();
        assets.push(bench);

        let attached = self.sink.attach(tag, &credential, &assets).await?;
        info!(tag = %tag, assets = ?attached, "Release published");
        Ok(attached)
    }
}

/// Describe an existing file as a release asset named after its file name.
pub async fn asset_from_file(path: &Path) -> Result<ReleaseAsset> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Internal(format!("{} has no file name", path.display())))?
        .to_string();

    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(Error::Internal(format!("{} is not a file", path.display())));
    }

    let owned = path.to_path_buf();
    let sha256 = tokio::task::spawn_blocking(move || kiln_package::sha256_file(&owned))
        .await
        .map_err(|e| Error::Internal(e.to_string()))??;

    Ok(ReleaseAsset {
        name,
        path: path.to_path_buf(),
        size: metadata.len(),
        sha256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kiln_core::ports::Credential;
    use kiln_secrets::FileProvider;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<(String, String, Vec<String>)>>,
    }

    #[async_trait]
    impl ReleaseSink for RecordingSink {
        async fn attach(
            &self,
            tag: &str,
            credential: &Credential,
            assets: &[ReleaseAsset],
        ) -> Result<Vec<String>> {
            let names: Vec<String> = assets.iter().map(|a| a.name.clone()).collect();
            self.calls.lock().unwrap().push((
                tag.to_string(),
                credential.expose().to_string(),
                names.clone(),
            ));
            Ok(names)
        }
    }

    fn secrets() -> Arc<dyn SecretProvider> {
        Arc::new(FileProvider::from_map(HashMap::from([(
            "GITHUB_TOKEN".to_string(),
            "ghp_test".to_string(),
        )])))
    }

    #[tokio::test]
    async fn test_publish_adds_bench_and_calls_sink_once() {
        let dir = tempfile::tempdir().unwrap();
        let bench = dir.path().join("bench.tar.gz");
        std::fs::write(&bench, b"bench").unwrap();
        let archive = dir.path().join("zr-linux.tar.gz");
        std::fs::write(&archive, b"linux").unwrap();
        let linux = asset_from_file(&archive).await.unwrap();

        let sink = Arc::new(RecordingSink::default());
        let publisher = Publisher::new(sink.clone(), secrets(), "GITHUB_TOKEN");

        let attached = publisher.publish("v1.2.0", &[linux], &bench).await.unwrap();

        assert_eq!(attached, vec!["zr-linux.tar.gz", "bench.tar.gz"]);
        let calls = sink.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "v1.2.0");
        assert_eq!(calls[0].1, "ghp_test");
    }

    #[tokio::test]
    async fn test_missing_bench_fails_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let publisher = Publisher::new(sink.clone(), secrets(), "GITHUB_TOKEN");

        let result = publisher
            .publish("v1.2.0", &[], &dir.path().join("bench.tar.gz"))
            .await;

        assert!(matches!(result, Err(Error::Publish(_))));
        assert!(sink.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bench = dir.path().join("bench.tar.gz");
        std::fs::write(&bench, b"bench").unwrap();
        let sink = Arc::new(RecordingSink::default());
        let publisher = Publisher::new(sink.clone(), secrets(), "RELEASE_TOKEN");

        let result = publisher.publish("v1.2.0", &[], &bench).await;

        assert!(matches!(result, Err(Error::SecretNotFound(_))));
        assert!(sink.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_asset_from_file_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.tar.gz");
        std::fs::write(&path, b"abc").unwrap();

        let asset = asset_from_file(&path).await.unwrap();
        assert_eq!(asset.name, "bench.tar.gz");
        assert_eq!(asset.size, 3);
        assert_eq!(
            asset.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
