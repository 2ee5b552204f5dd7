//! HTTP transport layer.
//!
//! [`HttpTransport`] is the seam between the request pipeline and the
//! actual HTTP client; callers may inject their own implementation.
//! [`ReqwestTransport`] is the default, with connection pooling and a
//! streaming response path for object downloads.

use crate::error::Error;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

/// A stream of response body chunks.
pub type ByteStream = Pin<Box<dyn futures::Stream<Item = Result<Bytes, Error>> + Send>>;

/// HTTP request to be sent.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Request headers, keys lower-cased.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a new HTTP request.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a header; the key is lower-cased.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Add multiple headers; keys are lower-cased.
    pub fn with_headers<I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in headers {
            self.headers.insert(name.to_lowercase(), value);
        }
        self
    }
}

/// Buffered HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Get a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }

    /// Get the server-assigned request id.
    pub fn request_id(&self) -> Option<&str> {
        self.get_header("x-amz-request-id")
    }

    /// Get the content length.
    pub fn content_length(&self) -> Option<u64> {
        self.get_header("content-length").and_then(|v| v.parse().ok())
    }

    /// Get the ETag, with surrounding quotes stripped.
    pub fn etag(&self) -> Option<String> {
        self.get_header("etag").map(crate::types::trim_etag)
    }
}

/// HTTP response whose body is consumed as a stream.
pub struct StreamingResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body chunks.
    pub body: ByteStream,
}

impl StreamingResponse {
    /// Get a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }

    /// Drain the stream into a single buffer.
    pub async fn collect(mut self) -> Result<Bytes, Error> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// HTTP transport trait for making requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request and buffer the response body.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error>;

    /// Send a request and hand the response body back as a stream.
    ///
    /// The default implementation buffers via [`HttpTransport::send`];
    /// real transports should override it.
    async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse, Error> {
        let response = self.send(request).await?;
        Ok(StreamingResponse {
            status: response.status,
            headers: response.headers,
            body: Box::pin(stream::once(async move { Ok::<_, Error>(response.body) })),
        })
    }
}

/// Default HTTP transport built on reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a new transport with default settings.
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    /// Create a transport builder.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    fn prepare(&self, request: &HttpRequest) -> Result<reqwest::RequestBuilder, Error> {
        let method = request
            .method
            .parse::<reqwest::Method>()
            .map_err(|e| Error::Network {
                message: format!("invalid HTTP method: {}", e),
            })?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }
}

fn network_error(e: reqwest::Error) -> Error {
    Error::Network {
        message: e.to_string(),
    }
}

fn collect_headers(response: &reqwest::Response) -> HashMap<String, String> {
    response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect()
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let response = self.prepare(&request)?.send().await.map_err(network_error)?;

        let status = response.status().as_u16();
        let headers = collect_headers(&response);
        let body = response.bytes().await.map_err(network_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse, Error> {
        let response = self.prepare(&request)?.send().await.map_err(network_error)?;

        let status = response.status().as_u16();
        let headers = collect_headers(&response);
        let body = response.bytes_stream().map(|chunk| chunk.map_err(network_error));

        Ok(StreamingResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

/// Builder for [`ReqwestTransport`].
pub struct ReqwestTransportBuilder {
    connect_timeout: Duration,
    pool_idle_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ReqwestTransportBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            user_agent: None,
        }
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle connection timeout.
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set the `User-Agent` header sent with every request.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport, Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(self.pool_idle_timeout);

        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder.build().map_err(|e| Error::Network {
            message: e.to_string(),
        })?;

        Ok(ReqwestTransport { client })
    }
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_lowercases_headers() {
        let request = HttpRequest::new("GET", "https://example.com")
            .with_header("Content-Type", "application/xml")
            .with_body(b"test body".as_ref());

        assert_eq!(request.method, "GET");
        assert_eq!(
            request.headers.get("content-type"),
            Some(&"application/xml".to_string())
        );
        assert!(request.body.is_some());
    }

    #[test]
    fn response_header_lookup() {
        let mut headers = HashMap::new();
        headers.insert("Content-Length".to_string(), "1024".to_string());
        headers.insert("ETag".to_string(), "\"abc123\"".to_string());
        headers.insert("x-amz-request-id".to_string(), "ABC123".to_string());

        let response = HttpResponse {
            status: 200,
            headers,
            body: Bytes::new(),
        };

        assert_eq!(response.content_length(), Some(1024));
        assert_eq!(response.etag().as_deref(), Some("abc123"));
        assert_eq!(response.request_id(), Some("ABC123"));
        assert_eq!(response.get_header("content-length"), Some("1024"));
    }

    #[test]
    fn transport_builder() {
        let transport = ReqwestTransport::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent("test/1.0")
            .build();
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn streaming_collect() {
        let chunks: Vec<Result<Bytes, Error>> =
            vec![Ok(Bytes::from("hello ")), Ok(Bytes::from("world"))];
        let response = StreamingResponse {
            status: 200,
            headers: HashMap::new(),
            body: Box::pin(stream::iter(chunks)),
        };
        assert_eq!(response.collect().await.unwrap(), Bytes::from("hello world"));
    }
}
