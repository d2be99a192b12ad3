//! Post-run webhook notifications.
//!
//! Hooks fire after the onboarding attempt regardless of its outcome and
//! never turn a successful run into a failure.

use anyhow::Result;
use bigip_init_core::http::{HttpRequest, Protocol};
use bigip_init_core::types::PostHook;
use bigip_init_core::Error;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Outcome summary included in every webhook payload.
pub struct RunReport {
    pub status: &'static str,
    pub cloud: Option<String>,
    pub customer_id: Option<String>,
}

pub async fn fire_post_hooks(hooks: &[PostHook], report: &RunReport) {
    for hook in hooks {
        if hook.kind != "webhook" {
            warn!("Skipping post hook {} with unknown type {}", hook.name, hook.kind);
            continue;
        }
        match fire_one(hook, report).await {
            Ok(()) => info!("Post hook {} delivered", hook.name),
            Err(err) => warn!("Post hook {} failed: {}", hook.name, err),
        }
    }
}

async fn fire_one(hook: &PostHook, report: &RunReport) -> Result<()> {
    let url = url::Url::parse(&hook.url)
        .map_err(|e| Error::http_transport(format!("invalid webhook url {}: {}", hook.url, e)))?;
    let protocol: Protocol = url.scheme().parse()?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::http_transport(format!("webhook url {} has no host", hook.url)))?;

    let mut request = HttpRequest::post(host, url.path())
        .protocol(protocol)
        .json_body(build_payload(hook, report))
        .verify_tls(hook.verify_tls)
        .trusted_cert_bundles(hook.trusted_cert_bundles.clone());
    if let Some(port) = url.port() {
        request = request.port(port);
    }
    if let Some(query) = url.query() {
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            request = request.query(name.to_string(), value.to_string());
        }
    }

    request.send().await?;
    Ok(())
}

fn build_payload(hook: &PostHook, report: &RunReport) -> Value {
    let mut payload = json!({
        "name": hook.name,
        "version": env!("CARGO_PKG_VERSION"),
        "status": report.status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "properties": hook.properties.clone(),
    });
    if let Some(cloud) = &report.cloud {
        payload["cloud"] = json!(cloud);
    }
    if let Some(customer_id) = &report.customer_id {
        payload["customerId"] = json!(customer_id);
    }
    payload
}
