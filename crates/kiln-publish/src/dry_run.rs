use async_trait::async_trait;
use kiln_core::Result;
use kiln_core::ports::{Credential, ReleaseSink};
use kiln_core::run::ReleaseAsset;
use tracing::info;

/// Sink that logs what would be uploaded and touches nothing remote.
#[derive(Debug, Default)]
pub struct DryRunSink;

#[async_trait]
impl ReleaseSink for DryRunSink {
    async fn attach(
        &self,
        tag: &str,
        _credential: &Credential,
        assets: &[ReleaseAsset],
    ) -> Result<Vec<String>> {
        for asset in assets {
            info!(
                tag = %tag,
                asset = %asset.name,
                size = asset.size,
                sha256 = %asset.sha256,
                "Dry run: would upload asset"
            );
        }
        Ok(assets.iter().map(|a| a.name.clone()).collect())
    }
}
