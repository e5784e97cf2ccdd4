use crate::error::{ReportError, Result};
use base64::Engine;
use std::cell::Cell;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;
use url::Url;

/// Rendered reports can be large; the default body limit of ureq is 10 MB.
const MAX_RESPONSE_SIZE: u64 = 512 * 1024 * 1024;

/// Raw result of a SOAP call:
/// - HTTP status code
/// - `Content-Type` response header, if any
/// - body bytes, untouched (may be multipart)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends a SOAP envelope for an operation and returns the raw response.
///
/// HTTP error statuses are not errors here: SOAP faults come back as HTTP 500
/// and their body must stay readable.
pub trait SoapTransport {
    fn call(&self, operation: &str, envelope: String) -> Result<RawResponse>;
}

impl<T: SoapTransport + ?Sized> SoapTransport for &T {
    fn call(&self, operation: &str, envelope: String) -> Result<RawResponse> {
        (**self).call(operation, envelope)
    }
}

/// Blocking HTTP transport with basic authentication.
pub struct HttpTransport {
    agent: Agent,
    endpoint: String,
    authorization: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// `url` may be the WSDL location (`...?wsdl`); the query is dropped.
    pub fn new(url: &str, username: &str, password: &str, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint_from_url(url)?;
        if username.is_empty() {
            return Err(ReportError::invalid_endpoint(url, "empty username"));
        }

        // Do NOT treat 4xx/5xx as errors: we want to read SOAP Fault bodies.
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        let agent: Agent = config.into();

        let credentials = format!("{}:{}", username, password);
        let authorization = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        );

        Ok(Self {
            agent,
            endpoint,
            authorization,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl SoapTransport for HttpTransport {
    fn call(&self, operation: &str, envelope: String) -> Result<RawResponse> {
        debug!(operation = %operation, endpoint = %self.endpoint, size = envelope.len(), "Sending SOAP request");

        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Content-Type", r#"text/xml; charset="utf-8""#)
            .header("SOAPAction", r#""""#)
            .header("Authorization", &self.authorization)
            .send(envelope)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_SIZE)
            .read_to_vec()?;

        debug!(operation = %operation, status, size = body.len(), content_type = ?content_type, "Received SOAP response");

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Endpoint URL from a service or WSDL URL.
pub fn endpoint_from_url(url: &str) -> Result<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| ReportError::invalid_endpoint(url, e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ReportError::invalid_endpoint(url, "scheme must be http or https"));
    }

    if parsed
        .query()
        .is_some_and(|q| q.eq_ignore_ascii_case("wsdl"))
    {
        parsed.set_query(None);
    }

    Ok(parsed.to_string())
}

/// How the client treats responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Responses must be SOAP envelopes; faults and HTTP errors are raised.
    Envelope,
    /// Raw passthrough: the body is handed back untouched, whatever the status.
    Raw,
}

/// Switches a mode cell to [`ResponseMode::Raw`] until dropped.
///
/// The previous mode is restored on every exit path, errors included.
pub struct PassthroughGuard<'a> {
    mode: &'a Cell<ResponseMode>,
    previous: ResponseMode,
}

impl<'a> PassthroughGuard<'a> {
    pub fn acquire(mode: &'a Cell<ResponseMode>) -> Self {
        let previous = mode.replace(ResponseMode::Raw);
        Self { mode, previous }
    }
}

impl Drop for PassthroughGuard<'_> {
    fn drop(&mut self) {
        self.mode.set(self.previous);
    }
}
