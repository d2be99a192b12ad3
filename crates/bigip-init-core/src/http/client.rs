//! Shared reqwest client construction with TLS and proxy policy

use crate::error::{Error, Result};
use camino::Utf8PathBuf;
use reqwest::{Certificate, Client, Proxy};
use tracing::debug;

/// Hosts that must never be reached through a corporate proxy. Management
/// traffic stays on the box and the metadata services are link-local.
const PROXY_BYPASS_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "::1",
    "169.254.169.254",
    "metadata.google.internal",
];

/// Environment variables consulted for a proxy descriptor, in order.
const PROXY_ENV_VARS: &[&str] = &["https_proxy", "HTTPS_PROXY", "http_proxy", "HTTP_PROXY"];

/// Build a client for requests against `host`.
///
/// Trust evaluation is exclusive when CA bundles are given: only the bundled
/// certificates are trusted and built-in roots are dropped. Without bundles,
/// `verify_tls = false` disables certificate validation entirely.
///
/// A proxy from the conventional environment variables is honored for HTTPS
/// traffic only, and never when the target is the local management listener
/// or a cloud metadata host.
pub fn build_client(
    host: &str,
    verify_tls: bool,
    trusted_cert_bundles: &[Utf8PathBuf],
) -> Result<Client> {
    // Explicit proxy wiring; reqwest's implicit env handling would not know
    // about the bypass hosts.
    let mut builder = Client::builder().no_proxy();

    if let Some(proxy_url) = proxy_from_env() {
        if !PROXY_BYPASS_HOSTS.contains(&host) {
            debug!("Routing requests for {} through configured proxy", host);
            let proxy =
                Proxy::https(&proxy_url).map_err(|e| Error::http_transport(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
    }

    if !trusted_cert_bundles.is_empty() {
        builder = builder.tls_certs_only(std::iter::empty::<Certificate>());
        for bundle in trusted_cert_bundles {
            let pem = std::fs::read(bundle.as_std_path())?;
            let certs = Certificate::from_pem_bundle(&pem).map_err(|e| {
                Error::http_transport(format!("invalid CA bundle {}: {}", bundle, e))
            })?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }
    } else if !verify_tls {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| Error::http_transport(e.to_string()))
}

/// First non-empty proxy descriptor found in the environment.
fn proxy_from_env() -> Option<String> {
    PROXY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}
