//! Client configuration.
//!
//! [`ClientConfig`] is immutable after construction; everything the
//! request pipeline needs to know about the endpoint and credentials
//! lives here. Validation happens at build time so configuration errors
//! are raised before any I/O.

use crate::error::Error;
use url::Host;

/// Immutable client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Endpoint host, without scheme or port (e.g. `s3.amazonaws.com`,
    /// `localhost`).
    pub endpoint: String,
    /// TCP port; 0 means the protocol default (80 for http, 443 for
    /// https).
    pub port: u16,
    /// Whether to use TLS.
    pub secure: bool,
    /// Access key; empty for anonymous access.
    pub access_key: String,
    /// Secret key; empty for anonymous access.
    pub secret_key: String,
    /// Value of the `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// An anonymous client has no complete credential pair and never
    /// signs requests.
    pub fn is_anonymous(&self) -> bool {
        self.access_key.is_empty() || self.secret_key.is_empty()
    }

    /// Whether the endpoint is an Amazon host, which enables
    /// virtual-host-style bucket addressing.
    pub fn is_amazon_endpoint(&self) -> bool {
        self.endpoint == "s3.amazonaws.com" || self.endpoint.ends_with(".amazonaws.com")
    }

    /// URL scheme implied by the TLS flag.
    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// Default port of the configured scheme.
    pub fn default_port(&self) -> u16 {
        if self.secure {
            443
        } else {
            80
        }
    }

    /// The port requests actually connect to.
    pub fn effective_port(&self) -> u16 {
        if self.port == 0 {
            self.default_port()
        } else {
            self.port
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("anonymous", &self.is_anonymous())
            .field("user_agent", &self.user_agent)
            // Credentials intentionally omitted
            .finish_non_exhaustive()
    }
}

fn default_user_agent() -> String {
    format!(
        "S3Client ({}; {}) s3-client/{}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_VERSION")
    )
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<String>,
    port: Option<u32>,
    secure: Option<bool>,
    access_key: Option<String>,
    secret_key: Option<String>,
    app_info: Option<(String, String)>,
}

impl ClientConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint host (no scheme, no port).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the TCP port. 0 keeps the protocol default.
    pub fn port(mut self, port: u32) -> Self {
        self.port = Some(port);
        self
    }

    /// Enable or disable TLS. Defaults to enabled.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Set the credential pair. Leave unset for anonymous access.
    pub fn credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Append an application identifier to the `User-Agent` header.
    pub fn app_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.app_info = Some((name.into(), version.into()));
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<ClientConfig, Error> {
        let endpoint = self.endpoint.unwrap_or_default();
        if endpoint.is_empty()
            || endpoint.contains('/')
            || endpoint.contains(':')
            || Host::parse(&endpoint).is_err()
        {
            return Err(Error::InvalidEndpoint { endpoint });
        }

        let port = self.port.unwrap_or(0);
        if port > u16::MAX as u32 {
            return Err(Error::InvalidPort { port });
        }

        let mut user_agent = default_user_agent();
        if let Some((name, version)) = self.app_info {
            user_agent.push_str(&format!(" {name}/{version}"));
        }

        Ok(ClientConfig {
            endpoint,
            port: port as u16,
            secure: self.secure.unwrap_or(true),
            access_key: self.access_key.unwrap_or_default(),
            secret_key: self.secret_key.unwrap_or_default(),
            user_agent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let config = ClientConfig::builder().endpoint("localhost").build().unwrap();
        assert_eq!(config.endpoint, "localhost");
        assert_eq!(config.port, 0);
        assert!(config.secure);
        assert!(config.is_anonymous());
        assert_eq!(config.effective_port(), 443);
    }

    #[test]
    fn rejects_empty_endpoint() {
        assert!(matches!(
            ClientConfig::builder().build(),
            Err(Error::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn rejects_endpoint_with_scheme_or_port() {
        assert!(ClientConfig::builder()
            .endpoint("https://s3.amazonaws.com")
            .build()
            .is_err());
        assert!(ClientConfig::builder()
            .endpoint("localhost:9000")
            .build()
            .is_err());
    }

    #[test]
    fn rejects_out_of_range_port() {
        let result = ClientConfig::builder()
            .endpoint("localhost")
            .port(70000)
            .build();
        assert!(matches!(result, Err(Error::InvalidPort { port: 70000 })));
    }

    #[test]
    fn anonymous_requires_both_keys() {
        let config = ClientConfig::builder()
            .endpoint("localhost")
            .credentials("AKID", "")
            .build()
            .unwrap();
        assert!(config.is_anonymous());

        let config = ClientConfig::builder()
            .endpoint("localhost")
            .credentials("AKID", "SECRET")
            .build()
            .unwrap();
        assert!(!config.is_anonymous());
    }

    #[test]
    fn amazon_endpoint_detection() {
        let amazon = ClientConfig::builder()
            .endpoint("s3.amazonaws.com")
            .build()
            .unwrap();
        assert!(amazon.is_amazon_endpoint());

        let other = ClientConfig::builder()
            .endpoint("play.min.io")
            .build()
            .unwrap();
        assert!(!other.is_amazon_endpoint());
    }

    #[test]
    fn user_agent_with_app_info() {
        let config = ClientConfig::builder()
            .endpoint("localhost")
            .app_info("backup-tool", "2.1")
            .build()
            .unwrap();
        assert!(config.user_agent.starts_with("S3Client ("));
        assert!(config.user_agent.ends_with(" backup-tool/2.1"));
    }

    #[test]
    fn insecure_default_port() {
        let config = ClientConfig::builder()
            .endpoint("localhost")
            .secure(false)
            .build()
            .unwrap();
        assert_eq!(config.scheme(), "http");
        assert_eq!(config.effective_port(), 80);
    }
}
