//! Remote state download
//!
//! A state bucket holds one gzipped tarball per environment, `<env-name>.tgz`,
//! whose entries are the contents of a state directory.

use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait StateDownloader: Send + Sync {
    /// Fetch `<bucket>/<env_name>.tgz` and unpack it into `dest`
    async fn download(&self, bucket: &str, env_name: &str, dest: &Path) -> Result<()>;
}

pub struct HttpStateDownloader {
    client: reqwest::Client,
}

impl HttpStateDownloader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Bare bucket names resolve to S3; anything with a scheme is used as a base URL
    pub fn archive_url(bucket: &str, env_name: &str) -> String {
        if bucket.starts_with("http://") || bucket.starts_with("https://") {
            format!("{}/{}.tgz", bucket.trim_end_matches('/'), env_name)
        } else {
            format!("https://{}.s3.amazonaws.com/{}.tgz", bucket, env_name)
        }
    }
}

impl Default for HttpStateDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateDownloader for HttpStateDownloader {
    async fn download(&self, bucket: &str, env_name: &str, dest: &Path) -> Result<()> {
        let url = Self::archive_url(bucket, env_name);
        tracing::info!(url = %url, "Downloading remote state");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ConfigError::RemoteState(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ConfigError::RemoteState(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ConfigError::RemoteState(format!("{}: {}", url, e)))?;

        unpack_blocking(bytes, dest.to_path_buf()).await
    }
}

/// [`unpack`] on the blocking pool
pub async fn unpack_blocking(
    archive: impl AsRef<[u8]> + Send + 'static,
    dest: PathBuf,
) -> Result<()> {
    tokio::task::spawn_blocking(move || unpack(archive.as_ref(), &dest))
        .await
        .map_err(|e| ConfigError::RemoteState(format!("unpacking state archive: {}", e)))?
}

/// Unpack a gzipped tarball into `dest`
pub fn unpack(archive: &[u8], dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(GzDecoder::new(archive));
    archive
        .unpack(dest)
        .map_err(|e| ConfigError::RemoteState(format!("unpacking state archive: {}", e)))?;
    tracing::debug!("Unpacked remote state into {}", dest.display());
    Ok(())
}
