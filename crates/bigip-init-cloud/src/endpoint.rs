//! Addressing for cloud service endpoints
//!
//! Metadata services sit on fixed link-local or virtual hosts; tests point
//! these at a local mock instead. All traffic goes through the shared HTTP
//! primitive so proxy bypass applies to the metadata hosts.

use bigip_init_core::http::{HttpRequest, Protocol};

/// Host, port and protocol for one cloud service
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    host: String,
    port: Option<u16>,
    protocol: Protocol,
}

impl ServiceEndpoint {
    /// Endpoint on the protocol's default port
    pub fn new(host: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            host: host.into(),
            port: None,
            protocol,
        }
    }

    /// Override the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Endpoint from a full base URL; used by tests to aim at a mock server
    pub fn from_base_url(base: &url::Url) -> Self {
        let protocol = if base.scheme() == "http" {
            Protocol::Http
        } else {
            Protocol::Https
        };
        let mut endpoint = Self::new(base.host_str().unwrap_or_default(), protocol);
        if let Some(port) = base.port() {
            endpoint = endpoint.with_port(port);
        }
        endpoint
    }

    /// Host name
    pub fn host(&self) -> &str {
        &self.host
    }

    /// GET request against this endpoint
    pub fn get(&self, path: impl Into<String>) -> HttpRequest {
        self.wire(HttpRequest::get(&self.host, path))
    }

    /// PUT request against this endpoint
    pub fn put(&self, path: impl Into<String>) -> HttpRequest {
        self.wire(HttpRequest::put(&self.host, path))
    }

    fn wire(&self, request: HttpRequest) -> HttpRequest {
        let request = request.protocol(self.protocol);
        match self.port {
            Some(port) => request.port(port),
            None => request,
        }
    }
}

/// Render a response body to text. Metadata services answer plain text,
/// which the HTTP layer hands back as a JSON string; anything structured
/// renders compactly.
pub(crate) fn body_text(body: &serde_json::Value) -> String {
    match body {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
