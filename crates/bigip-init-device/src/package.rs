//! Package install lifecycle against the management API
//!
//! Install walks: catalog lookup, artifact download, hash gate, chunked
//! upload, INSTALL task submission, task polling. Uninstall submits the
//! task and returns without polling; the caller reinstalls immediately
//! and validates availability afterwards.

use crate::error::{DeviceError, Result};
use crate::management::ManagementClient;
use crate::metadata::MetadataClient;
use bigip_init_core::http::{download_to_file, sha256_file, DownloadOptions};
use bigip_init_core::retry::{ClosurePredicate, Retrier, RetryError, RetryPolicy};
use bigip_init_core::types::InstallOperation;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// The device's canonical downloads directory; artifacts already here are
/// installed in place without a REST upload.
pub const DEVICE_DOWNLOADS_DIR: &str = "/var/config/rest/downloads";

const PACKAGE_TASKS_PATH: &str = "/mgmt/shared/iapp/package-management-tasks";
const INSTALLED_PACKAGES_PATH: &str = "/mgmt/shared/iapp/global-installed-packages";
const FILE_UPLOAD_PATH: &str = "/mgmt/shared/file-transfer/uploads";

/// Upload chunk size (1MB); chunks are sent strictly in order
const UPLOAD_CHUNK_SIZE: usize = 1024 * 1024;

/// What the device reports about a declared package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallState {
    /// A release of this package is present on the device
    pub installed: bool,

    /// The installed release differs from the declared version
    pub reinstall_required: bool,

    /// Version string the device reported, if any
    pub installed_version: Option<String>,
}

/// Returned by a successful install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub component: String,
    pub version: String,
    pub installed: bool,
}

/// Client for one declared package install operation
pub struct PackageClient<'a> {
    mgmt: &'a ManagementClient,
    metadata: MetadataClient,
    hash: Option<String>,
    verify_tls: bool,
    trusted_cert_bundles: Vec<Utf8PathBuf>,
    policy: RetryPolicy,
    downloads_dir: Utf8PathBuf,
}

impl<'a> PackageClient<'a> {
    /// Build a client for `operation`, validating the component against the
    /// bundled catalog up front.
    pub fn new(mgmt: &'a ManagementClient, operation: &InstallOperation) -> Result<Self> {
        let metadata = MetadataClient::for_install(operation)?;
        Ok(Self::with_metadata(mgmt, metadata, operation))
    }

    /// Build a client around an already-resolved metadata lookup
    pub fn with_metadata(
        mgmt: &'a ManagementClient,
        metadata: MetadataClient,
        operation: &InstallOperation,
    ) -> Self {
        Self {
            mgmt,
            metadata,
            hash: operation.extension_hash.clone(),
            verify_tls: operation.verify_tls,
            trusted_cert_bundles: operation.trusted_cert_bundles.clone(),
            policy: operation.retry_policy(),
            downloads_dir: Utf8PathBuf::from(DEVICE_DOWNLOADS_DIR),
        }
    }

    /// Download artifacts somewhere other than the device's canonical
    /// directory. Artifacts outside that directory are uploaded over REST.
    pub fn with_downloads_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.downloads_dir = dir.into();
        self
    }

    /// Component name
    pub fn component(&self) -> &str {
        self.metadata.component()
    }

    /// Declared version
    pub fn version(&self) -> &str {
        self.metadata.version()
    }

    /// Metadata lookups backing this client
    pub fn metadata(&self) -> &MetadataClient {
        &self.metadata
    }

    /// Query the device's installed-packages list for this package.
    ///
    /// Matching is by the package's base name so a stale release of the
    /// same component is found and flagged for reinstall.
    pub async fn is_installed(&self) -> Result<InstallState> {
        let package_name = self.metadata.package_name()?;
        let base = rpm_base_name(&package_name);

        debug!("Checking installed packages for {}", base);

        let response = self.mgmt.get(INSTALLED_PACKAGES_PATH).send().await?;
        let items = response
            .body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for item in &items {
            let installed_name = item
                .get("packageName")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if installed_name.is_empty() || rpm_base_name(installed_name) != base {
                continue;
            }

            let installed_version = item
                .get("version")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            let reinstall_required = installed_version != self.metadata.version().trim();

            debug!(
                "{} is installed at version {} (declared {})",
                base,
                installed_version,
                self.metadata.version()
            );

            return Ok(InstallState {
                installed: true,
                reinstall_required,
                installed_version: Some(installed_version),
            });
        }

        Ok(InstallState {
            installed: false,
            reinstall_required: false,
            installed_version: None,
        })
    }

    /// Run the full install: obtain the artifact, verify it, upload it and
    /// drive the INSTALL task to completion.
    pub async fn install(&self) -> Result<InstallResult> {
        // Catalog misses fail here, before any network work.
        let url = self.metadata.download_url()?;
        let file_name = self.metadata.download_package_file()?;

        info!("Installing {} {}", self.component(), self.version());

        let (local_path, downloaded) = match local_file_path(&url) {
            Some(path) => {
                if !path.exists() {
                    return Err(DeviceError::InvalidPackagePath {
                        path: path.to_string(),
                    });
                }
                (path, false)
            }
            None => {
                self.ensure_downloads_dir().await?;
                let dest = self.downloads_dir.join(&file_name);
                self.download_artifact(&url, &dest).await?;
                (dest, true)
            }
        };

        // Integrity gate: a declared hash must match before the artifact is
        // allowed anywhere near the device.
        if let Some(expected) = &self.hash {
            let expected = expected.trim();
            let actual = sha256_file(&local_path).await?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(DeviceError::hash_mismatch(&file_name, expected, actual));
            }
            debug!("Hash verified for {}", file_name);
        }

        if local_path.starts_with(DEVICE_DOWNLOADS_DIR) {
            debug!("{} already under {}, skipping upload", file_name, DEVICE_DOWNLOADS_DIR);
        } else {
            self.upload_package(&local_path, &file_name).await?;
            // Only downloaded artifacts are temporary; user-supplied local
            // files stay where they are.
            if downloaded {
                if let Err(err) = tokio::fs::remove_file(local_path.as_std_path()).await {
                    warn!("Could not remove downloaded artifact {}: {}", local_path, err);
                }
            }
        }

        let package_path = format!("{}/{}", DEVICE_DOWNLOADS_DIR, file_name);
        self.submit_and_wait_install(&package_path).await?;

        info!("Installed {} {}", self.component(), self.version());

        Ok(InstallResult {
            component: self.component().to_string(),
            version: self.version().to_string(),
            installed: true,
        })
    }

    /// Submit an UNINSTALL task for the declared package. Fire and forget.
    pub async fn uninstall(&self) -> Result<()> {
        let package_name = self.metadata.package_name()?;

        info!("Uninstalling {}", package_name);

        self.mgmt
            .post(PACKAGE_TASKS_PATH)
            .json_body(json!({
                "operation": "UNINSTALL",
                "packageName": package_name,
            }))
            .send()
            .await?;

        Ok(())
    }

    async fn ensure_downloads_dir(&self) -> Result<()> {
        let dir = &self.downloads_dir;
        Retrier::named("downloads-dir", RetryPolicy::quick())
            .execute(|| async move {
                tokio::fs::create_dir_all(dir.as_std_path())
                    .await
                    .map_err(|e| DeviceError::from(bigip_init_core::Error::from(e)))
            })
            .await?;
        Ok(())
    }

    async fn download_artifact(&self, url: &str, dest: &Utf8Path) -> Result<()> {
        let options = DownloadOptions {
            verify_tls: self.verify_tls,
            trusted_cert_bundles: self.trusted_cert_bundles.clone(),
        };

        Retrier::named("package-download", RetryPolicy::quick())
            .with_predicate(ClosurePredicate::new(DeviceError::is_transient))
            .execute(|| async {
                download_to_file(url, dest, &options)
                    .await
                    .map(|_| ())
                    .map_err(DeviceError::from)
            })
            .await?;
        Ok(())
    }

    /// Upload the artifact in sequential 1MB byte-range chunks. A chunk
    /// failure restarts the whole file rather than resuming.
    async fn upload_package(&self, local_path: &Utf8Path, file_name: &str) -> Result<()> {
        debug!("Uploading {} to the device", file_name);

        Retrier::named("package-upload", RetryPolicy::quick())
            .with_predicate(ClosurePredicate::new(DeviceError::is_transient))
            .execute(|| self.upload_once(local_path, file_name))
            .await?;
        Ok(())
    }

    async fn upload_once(&self, local_path: &Utf8Path, file_name: &str) -> Result<()> {
        let contents = tokio::fs::read(local_path.as_std_path())
            .await
            .map_err(bigip_init_core::Error::from)?;
        let total = contents.len();
        let upload_path = format!("{}/{}", FILE_UPLOAD_PATH, file_name);

        let mut start = 0usize;
        while start < total {
            let end = (start + UPLOAD_CHUNK_SIZE).min(total);

            self.mgmt
                .post(&upload_path)
                .header("Content-Type", "application/octet-stream")
                .header("Content-Range", format!("{}-{}/{}", start, end - 1, total))
                .bytes_body(contents[start..end].to_vec())
                .send()
                .await?;

            start = end;
        }

        debug!(
            "Uploaded {} bytes in {} chunks",
            total,
            total.div_ceil(UPLOAD_CHUNK_SIZE)
        );
        Ok(())
    }

    async fn submit_and_wait_install(&self, package_path: &str) -> Result<()> {
        let response = self
            .mgmt
            .post(PACKAGE_TASKS_PATH)
            .json_body(json!({
                "operation": "INSTALL",
                "packageFilePath": package_path,
            }))
            .send()
            .await?;

        let task_id = response
            .body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| DeviceError::install_failed("task submission returned no id"))?
            .to_string();

        debug!("Submitted INSTALL task {}", task_id);

        let result = Retrier::named("install-task", self.policy)
            .with_predicate(ClosurePredicate::new(DeviceError::is_transient))
            .execute(|| self.check_install_task(&task_id))
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(RetryError::NonRetryable(source)) => Err(source),
            Err(RetryError::Exhausted { .. }) => Err(DeviceError::MaxCountExceeded),
        }
    }

    async fn check_install_task(&self, task_id: &str) -> Result<()> {
        let path = format!("{}/{}", PACKAGE_TASKS_PATH, task_id);
        let response = self.mgmt.get(&path).send().await?;

        let status = response
            .body
            .get("status")
            .and_then(Value::as_str)
            .ok_or(DeviceError::TaskMissingStatus)?;

        match status {
            "FINISHED" => Ok(()),
            "FAILED" => {
                let message = response
                    .body
                    .get("errorMessage")
                    .and_then(Value::as_str)
                    .unwrap_or("no error message reported");
                Err(DeviceError::install_failed(message))
            }
            other => Err(DeviceError::TaskPending {
                status: other.to_string(),
            }),
        }
    }
}

/// Local filesystem path for file-scheme and absolute-path references
fn local_file_path(url: &str) -> Option<Utf8PathBuf> {
    if let Some(stripped) = url.strip_prefix("file://") {
        return Some(Utf8PathBuf::from(stripped));
    }
    if url.starts_with('/') {
        return Some(Utf8PathBuf::from(url));
    }
    None
}

/// Base name of an rpm package: the leading segments before the version.
/// "f5-appsvcs-3.17.0-3.noarch" becomes "f5-appsvcs".
fn rpm_base_name(package_name: &str) -> &str {
    let mut end = 0;
    for (index, segment) in package_name.split('-').enumerate() {
        if index > 0 && segment.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            break;
        }
        end += segment.len() + usize::from(index > 0);
    }
    &package_name[..end]
}
