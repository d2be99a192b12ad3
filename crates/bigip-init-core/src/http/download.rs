//! Artifact download and digest helpers

use crate::error::{Error, Result};
use crate::http::client::build_client;
use camino::{Utf8Path, Utf8PathBuf};
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// Read buffer size for digest computation (1MB)
const DIGEST_CHUNK_SIZE: usize = 1024 * 1024;

/// TLS options applied to a download request.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Validate the server certificate.
    pub verify_tls: bool,

    /// Trust only these CA bundles when non-empty.
    pub trusted_cert_bundles: Vec<Utf8PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            verify_tls: true,
            trusted_cert_bundles: Vec::new(),
        }
    }
}

/// Stream `url` to `dest`, returning the number of bytes written.
///
/// The destination is truncated first so a retried download always starts
/// from a clean file.
pub async fn download_to_file(
    url: &str,
    dest: &Utf8Path,
    options: &DownloadOptions,
) -> Result<u64> {
    let parsed = url::Url::parse(url)
        .map_err(|e| Error::http_transport(format!("invalid download url {}: {}", url, e)))?;
    let host = parsed.host_str().unwrap_or_default().to_string();
    let client = build_client(&host, options.verify_tls, &options.trusted_cert_bundles)?;

    debug!(%url, %dest, "Downloading artifact");

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| Error::http_transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::http_status(
            status.as_u16(),
            format!("download of {} failed", url),
        ));
    }

    let mut file = File::create(dest.as_std_path()).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk: bytes::Bytes = chunk.map_err(|e| Error::http_transport(e.to_string()))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;

    debug!(bytes = written, "Download complete");

    Ok(written)
}

/// SHA-256 digest of a file as lowercase hex.
pub async fn sha256_file(path: &Utf8Path) -> Result<String> {
    let mut file = File::open(path.as_std_path()).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; DIGEST_CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
