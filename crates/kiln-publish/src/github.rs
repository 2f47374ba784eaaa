//! GitHub releases as the release-asset store.

use async_trait::async_trait;
use kiln_core::ports::{Credential, ReleaseSink};
use kiln_core::run::ReleaseAsset;
use kiln_core::{Error, PipelineConfig, Result};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

const USER_AGENT: &str = concat!("kiln/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Release {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct UploadedAsset {
    id: u64,
    name: String,
}

/// Uploads assets to the GitHub release of a tag, creating the release when
/// it does not exist yet.
///
/// Attaching is all or nothing: when an upload fails, the assets uploaded
/// by this call are deleted again, as is a release this call created.
pub struct GithubReleaseSink {
    client: Client,
    api_url: Url,
    uploads_url: Url,
    repository: String,
}

impl GithubReleaseSink {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_url: base_url("api_url", &config.api_url)?,
            uploads_url: base_url("uploads_url", &config.uploads_url)?,
            repository: config.repository.clone(),
        })
    }

    /// `base` joined with `segments`; each segment is percent-encoded, so a
    /// tag like `release/1.0` stays a single path segment.
    fn endpoint<'a>(&self, base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn repo_endpoint(&self, base: &Url, segments: &[&str]) -> Url {
        let repo = std::iter::once("repos").chain(self.repository.split('/'));
        self.endpoint(base, repo.chain(segments.iter().copied()))
    }

    fn request(&self, method: Method, url: Url, credential: &Credential) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", credential.expose()))
            .header("Accept", "application/vnd.github+json")
    }

    async fn authenticate(&self, credential: &Credential) -> Result<()> {
        let url = self.endpoint(&self.api_url, ["user"]);
        let res = self
            .request(Method::GET, url, credential)
            .send()
            .await
            .map_err(network)?;

        match res.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Authentication(
                format!("release store rejected the credential ({})", res.status()),
            )),
            s => Err(Error::Publish(format!("credential check returned {}", s))),
        }
    }

    /// The tag's release, and whether this call created it.
    async fn release_for_tag(&self, tag: &str, credential: &Credential) -> Result<(Release, bool)> {
        let url = self.repo_endpoint(&self.api_url, &["releases", "tags", tag]);
        let res = self
            .request(Method::GET, url, credential)
            .send()
            .await
            .map_err(network)?;

        match res.status() {
            StatusCode::OK => Ok((res.json().await.map_err(network)?, false)),
            StatusCode::NOT_FOUND => Ok((self.create_release(tag, credential).await?, true)),
            s => Err(Error::Publish(format!("looking up release {} returned {}", tag, s))),
        }
    }

    async fn create_release(&self, tag: &str, credential: &Credential) -> Result<Release> {
        debug!(tag = %tag, "Creating release");
        let url = self.repo_endpoint(&self.api_url, &["releases"]);
        let res = self
            .request(Method::POST, url, credential)
            .json(&serde_json::json!({ "tag_name": tag, "name": tag }))
            .send()
            .await
            .map_err(network)?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Publish(format!(
                "creating release {} returned {}: {}",
                tag, status, body
            )));
        }
        res.json().await.map_err(network)
    }

    async fn upload(
        &self,
        release: &Release,
        asset: &ReleaseAsset,
        credential: &Credential,
    ) -> Result<UploadedAsset> {
        let bytes = tokio::fs::read(&asset.path).await?;
        let release_id = release.id.to_string();
        let url = self.repo_endpoint(&self.uploads_url, &["releases", &release_id, "assets"]);
        let res = self
            .request(Method::POST, url, credential)
            .query(&[("name", asset.name.as_str())])
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(network)?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Publish(format!(
                "uploading {} returned {}: {}",
                asset.name, status, body
            )));
        }
        res.json().await.map_err(network)
    }

    async fn delete(&self, url: Url, credential: &Credential) -> Result<()> {
        let res = self
            .request(Method::DELETE, url, credential)
            .send()
            .await
            .map_err(network)?;

        match res.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            s => Err(Error::Publish(format!("delete returned {}", s))),
        }
    }

    /// Undo a partial attach. Deleting a created release takes its assets
    /// with it; on a pre-existing release only our uploads are removed.
    async fn roll_back(
        &self,
        release: &Release,
        created: bool,
        uploaded: &[UploadedAsset],
        credential: &Credential,
    ) {
        if created {
            let release_id = release.id.to_string();
            let url = self.repo_endpoint(&self.api_url, &["releases", &release_id]);
            if let Err(e) = self.delete(url, credential).await {
                warn!(release = release.id, error = %e, "Failed to delete release");
            }
            return;
        }

        for asset in uploaded {
            let asset_id = asset.id.to_string();
            let url = self.repo_endpoint(&self.api_url, &["releases", "assets", &asset_id]);
            match self.delete(url, credential).await {
                Ok(()) => debug!(asset = %asset.name, "Uploaded asset removed"),
                Err(e) => warn!(asset = %asset.name, error = %e, "Failed to remove uploaded asset"),
            }
        }
    }
}

#[async_trait]
impl ReleaseSink for GithubReleaseSink {
    #[instrument(skip(self, credential, assets), fields(repository = %self.repository, count = assets.len()))]
    async fn attach(
        &self,
        tag: &str,
        credential: &Credential,
        assets: &[ReleaseAsset],
    ) -> Result<Vec<String>> {
        self.authenticate(credential).await?;
        let (release, created) = self.release_for_tag(tag, credential).await?;

        let mut uploaded = Vec::with_capacity(assets.len());
        for asset in assets {
            match self.upload(&release, asset, credential).await {
                Ok(done) => {
                    info!(asset = %done.name, size = asset.size, "Asset uploaded");
                    uploaded.push(done);
                }
                Err(e) => {
                    warn!(asset = %asset.name, error = %e, "Upload failed, rolling back");
                    self.roll_back(&release, created, &uploaded, credential).await;
                    return Err(e);
                }
            }
        }
        Ok(uploaded.into_iter().map(|asset| asset.name).collect())
    }
}

fn base_url(field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| Error::InvalidConfig(format!("{} {:?} is not a URL: {}", field, raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidConfig(format!("{} {:?} cannot hold a path", field, raw)));
    }
    Ok(url)
}

fn network(err: reqwest::Error) -> Error {
    Error::Network(err.to_string())
}
