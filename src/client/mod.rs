//! The client handle.
//!
//! One [`Client`] per process is enough: all operations may be called
//! concurrently, and the region cache is the only mutable shared state.

use crate::api::{BucketsService, ObjectsService};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::executor::Executor;
use crate::multipart::MultipartService;
use crate::presign::PresignService;
use crate::transport::{HttpTransport, ReqwestTransport};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// S3-compatible object storage client.
pub struct Client {
    executor: Arc<Executor>,

    // Lazily-initialized services
    buckets: OnceCell<BucketsService>,
    objects: OnceCell<ObjectsService>,
    multipart: OnceCell<MultipartService>,
    presign: OnceCell<PresignService>,
}

impl Client {
    /// Create a client with the default HTTP transport.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        ClientBuilder::new().config(config).build()
    }

    /// Create a client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Bucket operations.
    pub fn buckets(&self) -> &BucketsService {
        self.buckets
            .get_or_init(|| BucketsService::new(self.executor.clone()))
    }

    /// Object operations.
    pub fn objects(&self) -> &ObjectsService {
        self.objects
            .get_or_init(|| ObjectsService::new(self.executor.clone()))
    }

    /// Multipart upload operations.
    pub fn multipart(&self) -> &MultipartService {
        self.multipart
            .get_or_init(|| MultipartService::new(self.executor.clone()))
    }

    /// Presigned URL and POST-policy operations.
    pub fn presign(&self) -> &PresignService {
        self.presign
            .get_or_init(|| PresignService::new(self.executor.clone()))
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        self.executor.config()
    }

    /// Write request/response traces to the given sink. The SigV4
    /// signature is redacted from traced headers.
    pub fn trace_on(&self, sink: Box<dyn std::io::Write + Send>) {
        self.executor.trace_on(sink);
    }

    /// Stop tracing.
    pub fn trace_off(&self) {
        self.executor.trace_off();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", self.config())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    config: Option<ClientConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl ClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            transport: None,
        }
    }

    /// Use the given configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client, Error> {
        let config = match self.config {
            Some(config) => config,
            None => ClientConfig::builder().build()?,
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                ReqwestTransport::builder()
                    .user_agent(config.user_agent.clone())
                    .build()?,
            ),
        };

        let executor = Arc::new(Executor::new(Arc::new(config), transport));

        Ok(Client {
            executor,
            buckets: OnceCell::new(),
            objects: OnceCell::new(),
            multipart: OnceCell::new(),
            presign: OnceCell::new(),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_with_config() {
        let config = ClientConfig::builder()
            .endpoint("play.min.io")
            .credentials("AK", "SK")
            .build()
            .unwrap();

        let client = Client::new(config).unwrap();
        assert_eq!(client.config().endpoint, "play.min.io");
        assert!(!client.config().is_anonymous());
    }

    #[test]
    fn builder_without_config_fails_on_missing_endpoint() {
        assert!(ClientBuilder::new().build().is_err());
    }

    #[test]
    fn services_are_shared() {
        let config = ClientConfig::builder().endpoint("localhost").build().unwrap();
        let client = Client::new(config).unwrap();

        let first = client.objects() as *const _;
        let second = client.objects() as *const _;
        assert_eq!(first, second);
    }
}
