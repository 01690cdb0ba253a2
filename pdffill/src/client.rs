//! Client abstraction for the remote fill service.
//!
//! The `FillClient` trait hides the HTTP call so the fill-and-save flow can be
//! exercised with a mock in tests and with reqwest in production.

use crate::error::{FillError, Result};
use crate::types::{FillRequest, FillResult};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Trait for filling a template on the remote service.
///
/// One call, one request on the wire. Implementations must not retry or cache:
/// calling `fill` twice with the same request issues two calls.
///
/// # Example
/// ```ignore
/// let client = ReqwestFillClient::new(base_url, Some(api_key), Duration::from_secs(60))?;
/// let result = client.fill(&request).await?;
/// println!("Status: {}, {} bytes", result.status, result.data.len());
/// ```
#[async_trait]
pub trait FillClient: Send + Sync {
    /// Fill `request.template_id` with `request.payload`.
    ///
    /// Non-success statuses are returned as a `FillResult`, not an error; only
    /// transport failures produce `Err`.
    async fn fill(&self, request: &FillRequest) -> Result<FillResult>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Fill client backed by reqwest.
///
/// Authenticates with HTTP Basic auth, the API key as user name and an empty
/// password.
#[derive(Clone)]
pub struct ReqwestFillClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ReqwestFillClient {
    /// Create a client for the service rooted at `base_url`.
    ///
    /// The API key is taken as given. A missing key is not rejected here: the
    /// service's authentication failure is what surfaces it.
    pub fn new(base_url: Url, api_key: Option<String>, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// `{base_url}/fill/{template_id}.pdf`, with the template id encoded as a single path segment.
    pub fn fill_url(&self, request: &FillRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                FillError::InvalidRequest(format!("base URL '{}' cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .push("fill")
            .push(&format!("{}.pdf", request.template_id));
        Ok(url)
    }
}

#[async_trait]
impl FillClient for ReqwestFillClient {
    #[tracing::instrument(skip(self, request), fields(template_id = %request.template_id))]
    async fn fill(&self, request: &FillRequest) -> Result<FillResult> {
        let url = self.fill_url(request)?;

        tracing::debug!(
            url = %url,
            fields = request.payload.data.len(),
            "Executing fill request"
        );

        let mut req = self.client.post(url.clone()).json(&request.payload);

        match &self.api_key {
            Some(api_key) => {
                req = req.basic_auth(api_key, None::<&str>);
            }
            None => {
                tracing::warn!("No API key configured, sending fill request without credentials");
            }
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "Fill request failed");
            e
        })?;

        let status = response.status().as_u16();
        let data = response.bytes().await?;

        tracing::info!(status = status, response_len = data.len(), "Fill request completed");

        Ok(FillResult { status, data })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Mock fill client for testing.
///
/// Returns queued responses in FIFO order and records every request it sees.
///
/// # Example
/// ```ignore
/// let mock = MockFillClient::new();
/// mock.add_response(Ok(FillResult { status: 200, data: Bytes::from_static(b"%PDF-1.7") }));
/// ```
#[derive(Clone, Default)]
pub struct MockFillClient {
    responses: Arc<Mutex<VecDeque<Result<FillResult>>>>,
    calls: Arc<Mutex<Vec<FillRequest>>>,
}

impl MockFillClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next unanswered call.
    pub fn add_response(&self, response: Result<FillResult>) {
        self.responses.lock().push_back(response);
    }

    /// Every request received so far, oldest first.
    pub fn get_calls(&self) -> Vec<FillRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl FillClient for MockFillClient {
    async fn fill(&self, request: &FillRequest) -> Result<FillResult> {
        self.calls.lock().push(request.clone());

        self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(FillError::Other(anyhow::anyhow!(
                "No mock response configured for template {}",
                request.template_id
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_TEMPLATE_ID, FillPayload, TemplateId};
    use bytes::Bytes;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PDF: &[u8] = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<<>>\nendobj\n%%EOF\n";

    fn example_request() -> FillRequest {
        FillRequest::new(TemplateId::new(DEFAULT_TEMPLATE_ID).unwrap(), FillPayload::default())
    }

    fn client_for(server: &MockServer, api_key: Option<&str>) -> ReqwestFillClient {
        let base_url = Url::parse(&format!("{}/api/v1/", server.uri())).unwrap();
        ReqwestFillClient::new(base_url, api_key.map(str::to_string), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_fill_url_with_and_without_trailing_slash() {
        let request = example_request();
        for base in ["https://app.useanvil.com/api/v1", "https://app.useanvil.com/api/v1/"] {
            let client =
                ReqwestFillClient::new(Url::parse(base).unwrap(), None, Duration::from_secs(1))
                    .unwrap();
            assert_eq!(
                client.fill_url(&request).unwrap().as_str(),
                "https://app.useanvil.com/api/v1/fill/7VCXZAolDIPToVLh3O3O.pdf"
            );
        }
    }

    #[test]
    fn test_fill_url_escapes_template_id() {
        let client = ReqwestFillClient::new(
            Url::parse("https://example.com/").unwrap(),
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        let request = FillRequest::new(TemplateId::new("a/b").unwrap(), FillPayload::default());
        assert_eq!(
            client.fill_url(&request).unwrap().as_str(),
            "https://example.com/fill/a%2Fb.pdf"
        );
    }

    #[tokio::test]
    async fn test_fill_sends_payload_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/fill/7VCXZAolDIPToVLh3O3O.pdf"))
            .and(basic_auth("test-key", ""))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "title": "My PDF Title",
                "fontSize": 10,
                "textColor": "#CC0000",
                "data": { "someFieldId": "Hello World!" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PDF))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, Some("test-key")).fill(&example_request()).await.unwrap();

        assert_eq!(result.status, 200);
        assert_eq!(result.data, Bytes::from_static(PDF));
        assert!(result.data.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_fill_without_key_returns_service_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "name": "AuthorizationError" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        // An empty key is treated the same as no key at all
        let result = client_for(&server, Some("")).fill(&example_request()).await.unwrap();

        assert_eq!(result.status, 401);
        assert!(!result.is_success());

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(!received[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_fill_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PDF))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        let request = example_request();
        client.fill(&request).await.unwrap();
        client.fill(&request).await.unwrap();
    }

    #[tokio::test]
    async fn test_fill_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let base_url = Url::parse(&server.uri()).unwrap();
        let client = ReqwestFillClient::new(base_url, None, Duration::from_millis(100)).unwrap();
        let err = client.fill(&example_request()).await.unwrap_err();

        match err {
            FillError::Http(e) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fill_transport_failure() {
        // Nothing listens on port 1
        let base_url = Url::parse("http://127.0.0.1:1/api/v1/").unwrap();
        let client = ReqwestFillClient::new(base_url, Some("k".to_string()), Duration::from_secs(5))
            .unwrap();
        let err = client.fill(&example_request()).await.unwrap_err();
        assert!(matches!(err, FillError::Http(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_mock_client_fifo_and_recording() {
        let mock = MockFillClient::new();
        mock.add_response(Ok(FillResult { status: 200, data: Bytes::from_static(b"first") }));
        mock.add_response(Ok(FillResult { status: 500, data: Bytes::from_static(b"second") }));

        let request = example_request();
        assert_eq!(mock.fill(&request).await.unwrap().data, Bytes::from_static(b"first"));
        assert_eq!(mock.fill(&request).await.unwrap().status, 500);
        assert!(mock.fill(&request).await.is_err());

        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.get_calls()[0], request);
    }
}
