//! HTTP primitives shared by the device and cloud clients
//!
//! The device management API, the cloud metadata services and webhook
//! targets all go through the same request shape so TLS and proxy policy
//! are applied in exactly one place.

pub mod client;
pub mod download;
pub mod request;

pub use client::build_client;
pub use download::{download_to_file, sha256_file, DownloadOptions};
pub use request::{HttpRequest, HttpResponse, Protocol, RequestBody};
