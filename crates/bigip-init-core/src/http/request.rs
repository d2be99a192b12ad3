//! Request and response shapes for the management and cloud surfaces

use crate::error::{Error, Result};
use crate::http::client::build_client;
use camino::Utf8PathBuf;
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Wire protocol for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Https,
    Http,
}

impl Protocol {
    /// Default port when the caller does not override it.
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Https => 443,
            Protocol::Http => 80,
        }
    }

    /// URL scheme string.
    pub fn scheme(self) -> &'static str {
        match self {
            Protocol::Https => "https",
            Protocol::Http => "http",
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "https" => Ok(Protocol::Https),
            "http" => Ok(Protocol::Http),
            other => Err(Error::http_transport(format!(
                "unsupported protocol: {}",
                other
            ))),
        }
    }
}

/// Request body variants.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Bytes(Vec<u8>),
    Form(Vec<(String, String)>),
}

/// A single HTTP request against a host.
///
/// Built incrementally, sent once. Any status code above 300 is a failure
/// unless `continue_on_error` is set, in which case the raw response is
/// handed back for the caller to inspect.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    host: String,
    path: String,
    method: Method,
    protocol: Protocol,
    port: Option<u16>,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: RequestBody,
    basic_auth: Option<(String, String)>,
    continue_on_error: bool,
    verify_tls: bool,
    trusted_cert_bundles: Vec<Utf8PathBuf>,
    timeout: Option<Duration>,
}

/// What came back from the endpoint.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub code: u16,

    /// Body parsed as JSON when possible, raw text otherwise.
    pub body: Value,

    /// Response headers, lossy-decoded.
    pub headers: HashMap<String, String>,
}

impl HttpRequest {
    /// Start a GET request for `path` on `host`.
    pub fn get(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(host, path, Method::GET)
    }

    /// Start a POST request for `path` on `host`.
    pub fn post(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(host, path, Method::POST)
    }

    /// Start a PUT request for `path` on `host`.
    pub fn put(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(host, path, Method::PUT)
    }

    /// Start a DELETE request for `path` on `host`.
    pub fn delete(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(host, path, Method::DELETE)
    }

    fn new(host: impl Into<String>, path: impl Into<String>, method: Method) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            method,
            protocol: Protocol::default(),
            port: None,
            headers: Vec::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
            basic_auth: None,
            continue_on_error: false,
            verify_tls: true,
            trusted_cert_bundles: Vec::new(),
            timeout: None,
        }
    }

    /// Override the request method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Select http or https.
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Override the port derived from the protocol.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add multiple request headers.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json_body(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Attach a raw byte body.
    pub fn bytes_body(mut self, body: Vec<u8>) -> Self {
        self.body = RequestBody::Bytes(body);
        self
    }

    /// Attach a form-encoded body.
    pub fn form_body(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    /// Authenticate with HTTP basic auth.
    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    /// Return error statuses to the caller instead of failing.
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Toggle TLS certificate validation.
    pub fn verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Trust only the given CA bundles.
    pub fn trusted_cert_bundles(mut self, bundles: Vec<Utf8PathBuf>) -> Self {
        self.trusted_cert_bundles = bundles;
        self
    }

    /// Bound the whole request in wall-clock time. Unset by default; retry
    /// ceilings are the effective bound on most operations.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full request URL.
    pub fn url(&self) -> String {
        let port = self.port.unwrap_or_else(|| self.protocol.default_port());
        // Bracket bare IPv6 literals so the authority parses.
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{}://{}:{}{}", self.protocol.scheme(), host, port, self.path)
    }

    /// Send the request and interpret the response.
    pub async fn send(&self) -> Result<HttpResponse> {
        let client = build_client(&self.host, self.verify_tls, &self.trusted_cert_bundles)?;
        let url = self.url();

        debug!(method = %self.method, %url, "Sending request");

        let mut request = client.request(self.method.clone(), &url);

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        if !self.query.is_empty() {
            request = request.query(&self.query);
        }
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if let Some((user, password)) = &self.basic_auth {
            request = request.basic_auth(user, Some(password));
        }
        request = match &self.body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Bytes(bytes) => request.body(bytes.clone()),
            RequestBody::Form(fields) => request.form(fields),
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::http_transport(e.to_string()))?;

        let code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| Error::http_transport(e.to_string()))?;
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text))
        };

        if code > 300 && !self.continue_on_error {
            return Err(Error::http_status(code, render_body(&body)));
        }

        debug!(code, "Request completed");

        Ok(HttpResponse {
            code,
            body,
            headers,
        })
    }

    /// Send and return only the parsed body.
    pub async fn send_json(&self) -> Result<Value> {
        Ok(self.send().await?.body)
    }
}

fn render_body(body: &Value) -> String {
    match body {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
