//! Mock HTTP transport for testing.

use crate::error::Error;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// A 200 response with an empty body.
    pub fn ok() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// A 200 response with a body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// A 204 No Content response.
    pub fn no_content() -> Self {
        Self {
            status: 204,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// A response with an arbitrary status and body.
    pub fn error(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header to the response.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the status of the response.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Mock HTTP transport replaying a queue of responses and recording
/// every request it sees.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<Vec<MockResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    default_response: Option<MockResponse>,
}

impl MockTransport {
    /// Create a mock transport with no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock transport with queued responses, returned in
    /// order.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            default_response: None,
        }
    }

    /// Create a mock transport answering every request with the same
    /// response.
    pub fn with_default(response: MockResponse) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            default_response: Some(response),
        }
    }

    /// Queue an additional response.
    pub fn queue_response(&self, response: MockResponse) {
        self.responses.lock().unwrap().push(response);
    }

    /// All recorded requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        self.requests.lock().unwrap().push(request);

        let response = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                self.default_response.clone()
            } else {
                Some(responses.remove(0))
            }
        };

        match response {
            Some(mock) => Ok(HttpResponse {
                status: mock.status,
                headers: mock.headers,
                body: mock.body,
            }),
            None => Err(Error::Network {
                message: "no mock response available".to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued_responses", &self.responses.lock().unwrap().len())
            .field("recorded_requests", &self.requests.lock().unwrap().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queued_responses_in_order() {
        let transport = MockTransport::with_responses(vec![
            MockResponse::ok_with_body("first"),
            MockResponse::error(404, "second"),
        ]);

        let r1 = transport
            .send(HttpRequest::new("GET", "http://localhost/1"))
            .await
            .unwrap();
        assert_eq!(r1.status, 200);
        assert_eq!(r1.body, Bytes::from("first"));

        let r2 = transport
            .send(HttpRequest::new("GET", "http://localhost/2"))
            .await
            .unwrap();
        assert_eq!(r2.status, 404);

        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn default_response_repeats() {
        let transport = MockTransport::with_default(MockResponse::no_content());
        for _ in 0..3 {
            let response = transport
                .send(HttpRequest::new("DELETE", "http://localhost/x"))
                .await
                .unwrap();
            assert_eq!(response.status, 204);
        }
    }

    #[tokio::test]
    async fn empty_queue_errors() {
        let transport = MockTransport::new();
        let result = transport
            .send(HttpRequest::new("GET", "http://localhost/"))
            .await;
        assert!(matches!(result, Err(Error::Network { .. })));
    }

    #[tokio::test]
    async fn records_request_details() {
        let transport = MockTransport::with_default(MockResponse::ok());
        transport
            .send(
                HttpRequest::new("POST", "http://localhost/b?uploads")
                    .with_header("Content-Type", "application/xml")
                    .with_body("payload"),
            )
            .await
            .unwrap();

        let recorded = transport.last_request().unwrap();
        assert_eq!(recorded.method, "POST");
        assert!(recorded.url.ends_with("?uploads"));
        assert_eq!(
            recorded.headers.get("content-type").map(String::as_str),
            Some("application/xml")
        );
        assert_eq!(recorded.body, Some(Bytes::from("payload")));
    }
}
