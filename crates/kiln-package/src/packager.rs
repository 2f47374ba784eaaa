//! Shrink, archive and relocate one platform's release binary.

use crate::archiver::create_archive;
use crate::checksum::sha256_file;
use crate::shrink::Shrinker;
use kiln_core::run::ReleaseAsset;
use kiln_core::{Error, MatrixEntry, Result};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Turns a built release binary into a named archive in the shared output
/// directory.
pub struct ArtifactPackager {
    shrinker: Shrinker,
    workspace: PathBuf,
    output_dir: PathBuf,
}

impl ArtifactPackager {
    pub fn new(shrinker: Shrinker, workspace: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            shrinker,
            workspace,
            output_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[instrument(skip(self, entry), fields(platform = %entry.platform, archive = %entry.archive_name))]
    pub async fn package(&self, entry: &MatrixEntry) -> Result<ReleaseAsset> {
        let binary = self.workspace.join(&entry.source_binary_path);
        let shrunk = self.shrinker.shrink(entry, &binary).await?;

        let packaging = |e: Error| Error::Packaging {
            platform: entry.platform,
            message: e.to_string(),
        };

        // Archive next to the binary, then move it to the shared location.
        let build_dir = binary
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.workspace.clone());
        let staged = build_dir.join(&entry.archive_name);
        let format = entry.archive_format;
        let entry_name = entry.binary_file_name.clone();
        {
            let binary = binary.clone();
            let staged = staged.clone();
            tokio::task::spawn_blocking(move || {
                create_archive(&binary, &entry_name, &staged, format)
            })
            .await
            .map_err(|e| Error::Internal(e.to_string()))
            .and_then(|res| res)
            .map_err(packaging)?;
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| packaging(e.into()))?;
        let dest = self.output_dir.join(&entry.archive_name);
        relocate(&staged, &dest).await.map_err(packaging)?;

        let size = tokio::fs::metadata(&dest)
            .await
            .map_err(|e| packaging(e.into()))?
            .len();
        let digest_path = dest.clone();
        let sha256 = tokio::task::spawn_blocking(move || sha256_file(&digest_path))
            .await
            .map_err(|e| Error::Internal(e.to_string()))
            .and_then(|res| res)
            .map_err(packaging)?;

        info!(
            path = %dest.display(),
            binary_size = shrunk.final_size,
            size,
            %sha256,
            "Archive ready"
        );

        Ok(ReleaseAsset {
            name: entry.archive_name.clone(),
            path: dest,
            size,
            sha256,
        })
    }
}

async fn relocate(from: &Path, to: &Path) -> Result<()> {
    if from == to {
        return Ok(());
    }
    if tokio::fs::rename(from, to).await.is_err() {
        // Different filesystems.
        tokio::fs::copy(from, to).await?;
        tokio::fs::remove_file(from).await?;
    }
    Ok(())
}
