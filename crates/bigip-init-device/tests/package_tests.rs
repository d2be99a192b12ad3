//! Integration tests for the package install lifecycle
//!
//! Tests cover:
//! - Installed-state queries with base-name matching and version drift
//! - The full install walk: download, hash gate, chunked upload, task poll
//! - The integrity gate stopping bad artifacts before any upload
//! - Device-reported task failures and poll-budget exhaustion
//! - Fire-and-forget uninstall

use bigip_init_device::{DeviceError, ManagementClient, PackageClient};
use camino::Utf8PathBuf;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{install_operation, installed_packages, mock_management};

const HELLO_SHA256: &str = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";

fn temp_downloads() -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

/// Mount the task endpoints for a successful INSTALL.
async fn mount_install_task(server: &MockServer, package_file: &str) {
    Mock::given(method("POST"))
        .and(path("/mgmt/shared/iapp/package-management-tasks"))
        .and(body_json(json!({
            "operation": "INSTALL",
            "packageFilePath": format!("/var/config/rest/downloads/{}", package_file),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-1"})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/iapp/package-management-tasks/task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "FINISHED"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_is_installed_reports_version_drift() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/iapp/global-installed-packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(installed_packages(json!([
            {"packageName": "f5-appsvcs-3.45.0-5.noarch", "version": "3.45.0"}
        ]))))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = install_operation(json!({
        "extensionType": "as3",
        "extensionVersion": "3.17.0",
    }));
    let client = PackageClient::new(&mgmt, &operation).unwrap();

    let state = client.is_installed().await.unwrap();
    assert!(state.installed);
    assert!(state.reinstall_required);
    assert_eq!(state.installed_version.as_deref(), Some("3.45.0"));
}

#[tokio::test]
async fn test_is_installed_matching_version_needs_no_reinstall() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/iapp/global-installed-packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(installed_packages(json!([
            {"packageName": "f5-appsvcs-3.17.0-3.noarch", "version": " 3.17.0 "}
        ]))))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = install_operation(json!({
        "extensionType": "as3",
        "extensionVersion": "3.17.0",
    }));
    let client = PackageClient::new(&mgmt, &operation).unwrap();

    let state = client.is_installed().await.unwrap();
    assert!(state.installed);
    assert!(!state.reinstall_required, "trimmed versions must compare equal");
}

#[tokio::test]
async fn test_is_installed_ignores_other_components() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/iapp/global-installed-packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(installed_packages(json!([
            {"packageName": "f5-telemetry-1.33.0-1.noarch", "version": "1.33.0"},
            {"packageName": "f5-appsvcs-templates-1.25.0-1.noarch", "version": "1.25.0"}
        ]))))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = install_operation(json!({
        "extensionType": "as3",
        "extensionVersion": "3.17.0",
    }));
    let client = PackageClient::new(&mgmt, &operation).unwrap();

    let state = client.is_installed().await.unwrap();
    assert!(!state.installed);
    assert!(!state.reinstall_required);
}

#[tokio::test]
async fn test_install_downloads_verifies_uploads_and_polls() {
    let server = MockServer::start().await;
    let (_guard, downloads) = temp_downloads();

    Mock::given(method("GET"))
        .and(path("/artifacts/f5-appsvcs-3.17.0-3.noarch.rpm"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("Hello, World!".as_bytes()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(
            "/mgmt/shared/file-transfer/uploads/f5-appsvcs-3.17.0-3.noarch.rpm",
        ))
        .and(header("Content-Range", "0-12/13"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_install_task(&server, "f5-appsvcs-3.17.0-3.noarch.rpm").await;

    let mgmt = mock_management(&server);
    let operation = install_operation(json!({
        "extensionType": "as3",
        "extensionVersion": "3.17.0",
        "extensionUrl": format!("{}/artifacts/f5-appsvcs-3.17.0-3.noarch.rpm", server.uri()),
        "extensionHash": HELLO_SHA256,
        "maxRetries": 5,
        "retryInterval": 10,
    }));
    let client = PackageClient::new(&mgmt, &operation)
        .unwrap()
        .with_downloads_dir(&downloads);

    let result = client.install().await.unwrap();
    assert_eq!(result.component, "as3");
    assert_eq!(result.version, "3.17.0");
    assert!(result.installed);

    // The downloaded artifact is temporary and must be cleaned up.
    assert!(!downloads.join("f5-appsvcs-3.17.0-3.noarch.rpm").exists());
}

#[tokio::test]
async fn test_hash_mismatch_stops_before_upload() {
    let server = MockServer::start().await;
    let (_guard, downloads) = temp_downloads();

    Mock::given(method("GET"))
        .and(path("/artifacts/f5-appsvcs-3.17.0-3.noarch.rpm"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("Hello, World!".as_bytes()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(
            "/mgmt/shared/file-transfer/uploads/f5-appsvcs-3.17.0-3.noarch.rpm",
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mgmt/shared/iapp/package-management-tasks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = install_operation(json!({
        "extensionType": "as3",
        "extensionVersion": "3.17.0",
        "extensionUrl": format!("{}/artifacts/f5-appsvcs-3.17.0-3.noarch.rpm", server.uri()),
        "extensionHash": "0000000000000000000000000000000000000000000000000000000000000000",
    }));
    let client = PackageClient::new(&mgmt, &operation)
        .unwrap()
        .with_downloads_dir(&downloads);

    let err = client.install().await.unwrap_err();
    assert!(matches!(err, DeviceError::HashMismatch { .. }));
    assert!(err.to_string().contains("File verification failed"));
}

#[tokio::test]
async fn test_install_uploads_local_file_in_chunks() {
    let server = MockServer::start().await;
    let (_guard, staging) = temp_downloads();

    // One full chunk plus one trailing byte.
    let artifact = staging.join("f5-appsvcs-3.17.0-3.noarch.rpm");
    tokio::fs::write(artifact.as_std_path(), vec![0xABu8; 1024 * 1024 + 1])
        .await
        .unwrap();

    Mock::given(method("POST"))
        .and(path(
            "/mgmt/shared/file-transfer/uploads/f5-appsvcs-3.17.0-3.noarch.rpm",
        ))
        .and(header("Content-Range", "0-1048575/1048577"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(
            "/mgmt/shared/file-transfer/uploads/f5-appsvcs-3.17.0-3.noarch.rpm",
        ))
        .and(header("Content-Range", "1048576-1048576/1048577"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_install_task(&server, "f5-appsvcs-3.17.0-3.noarch.rpm").await;

    let mgmt = mock_management(&server);
    let operation = install_operation(json!({
        "extensionType": "as3",
        "extensionVersion": "3.17.0",
        "extensionUrl": format!("file://{}", artifact),
        "maxRetries": 5,
        "retryInterval": 10,
    }));
    let client = PackageClient::new(&mgmt, &operation).unwrap();

    client.install().await.unwrap();

    // User-supplied local artifacts are left in place.
    assert!(artifact.exists());
}

#[tokio::test]
async fn test_install_task_failure_surfaces_device_message() {
    let server = MockServer::start().await;
    let (_guard, staging) = temp_downloads();

    let artifact = staging.join("f5-appsvcs-3.17.0-3.noarch.rpm");
    tokio::fs::write(artifact.as_std_path(), b"rpm bytes").await.unwrap();

    Mock::given(method("POST"))
        .and(path(
            "/mgmt/shared/file-transfer/uploads/f5-appsvcs-3.17.0-3.noarch.rpm",
        ))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mgmt/shared/iapp/package-management-tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-9"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/iapp/package-management-tasks/task-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAILED",
            "errorMessage": "Package conflicts with installed f5-appsvcs"
        })))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = install_operation(json!({
        "extensionType": "as3",
        "extensionVersion": "3.17.0",
        "extensionUrl": format!("file://{}", artifact),
        "maxRetries": 5,
        "retryInterval": 10,
    }));
    let client = PackageClient::new(&mgmt, &operation).unwrap();

    let err = client.install().await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("RPM installation failed"));
    assert!(message.contains("Package conflicts with installed f5-appsvcs"));
}

#[tokio::test]
async fn test_install_task_poll_budget_exhaustion() {
    let server = MockServer::start().await;
    let (_guard, staging) = temp_downloads();

    let artifact = staging.join("f5-appsvcs-3.17.0-3.noarch.rpm");
    tokio::fs::write(artifact.as_std_path(), b"rpm bytes").await.unwrap();

    Mock::given(method("POST"))
        .and(path(
            "/mgmt/shared/file-transfer/uploads/f5-appsvcs-3.17.0-3.noarch.rpm",
        ))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mgmt/shared/iapp/package-management-tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-9"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mgmt/shared/iapp/package-management-tasks/task-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "RUNNING"})))
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = install_operation(json!({
        "extensionType": "as3",
        "extensionVersion": "3.17.0",
        "extensionUrl": format!("file://{}", artifact),
        "maxRetries": 3,
        "retryInterval": 10,
    }));
    let client = PackageClient::new(&mgmt, &operation).unwrap();

    let err = client.install().await.unwrap_err();
    assert_eq!(err.to_string(), "Max count exceeded");
}

#[tokio::test]
async fn test_catalog_miss_fails_before_any_device_traffic() {
    let mgmt = ManagementClient::new();
    let operation = install_operation(json!({
        "extensionType": "as3",
        "extensionVersion": "9.9.9",
    }));
    let client = PackageClient::new(&mgmt, &operation).unwrap();

    let err = client.install().await.unwrap_err();
    assert!(matches!(err, DeviceError::CatalogMiss { .. }));
    let message = err.to_string();
    assert!(message.contains("as3"));
    assert!(message.contains("9.9.9"));
}

#[tokio::test]
async fn test_uninstall_is_fire_and_forget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mgmt/shared/iapp/package-management-tasks"))
        .and(body_json(json!({
            "operation": "UNINSTALL",
            "packageName": "f5-appsvcs-3.17.0-3.noarch",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "task-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let mgmt = mock_management(&server);
    let operation = install_operation(json!({
        "extensionType": "as3",
        "extensionVersion": "3.17.0",
    }));
    let client = PackageClient::new(&mgmt, &operation).unwrap();

    client.uninstall().await.unwrap();
    // No GET against the task: the mock above is the only expectation.
}
