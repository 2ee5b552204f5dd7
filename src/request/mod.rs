//! Translation of request specifications into concrete HTTP targets.
//!
//! Decides between virtual-host and path-style addressing, escapes path
//! segments and assembles the `Host` header (port appended only when it
//! differs from the protocol default).

use crate::config::ClientConfig;
use crate::signing::uri_encode_path;
use std::collections::HashMap;

/// Specification of one S3 request, independent of host selection and
/// signing.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: String,
    /// Bucket name, when the request targets a bucket.
    pub bucket: Option<String>,
    /// Object key, when the request targets an object.
    pub object: Option<String>,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    /// Extra headers; keys are lower-cased on insert.
    pub headers: HashMap<String, String>,
    /// Force path-style addressing even on Amazon endpoints (used by
    /// region discovery).
    pub path_style: bool,
}

impl RequestSpec {
    /// Create a new spec for the given method.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            bucket: None,
            object: None,
            query: None,
            headers: HashMap::new(),
            path_style: false,
        }
    }

    /// Target a bucket.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Target an object.
    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Set the query string (without the leading `?`).
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Add a header; the key is lower-cased for stable SigV4
    /// canonicalization.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Force path-style addressing.
    pub fn path_style(mut self, path_style: bool) -> Self {
        self.path_style = path_style;
        self
    }
}

/// A resolved HTTP target for a [`RequestSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Value of the `Host` header (port included only when
    /// non-default).
    pub host_header: String,
    /// Escaped request path, always starting with `/`.
    pub path: String,
    /// Full URL including query.
    pub url: String,
}

/// Build the HTTP target for a request.
pub fn build_target(config: &ClientConfig, spec: &RequestSpec) -> RequestTarget {
    let virtual_host =
        config.is_amazon_endpoint() && spec.bucket.is_some() && !spec.path_style;

    let host = if virtual_host {
        format!("{}.{}", spec.bucket.as_deref().unwrap(), config.endpoint)
    } else {
        config.endpoint.clone()
    };

    let mut path = String::from("/");
    if !virtual_host {
        if let Some(bucket) = &spec.bucket {
            path.push_str(bucket);
        }
    }
    if let Some(object) = &spec.object {
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(&uri_encode_path(object));
    }

    let host_header = if config.effective_port() == config.default_port() {
        host.clone()
    } else {
        format!("{}:{}", host, config.effective_port())
    };

    let mut url = format!("{}://{}{}", config.scheme(), host_header, path);
    if let Some(query) = &spec.query {
        url.push('?');
        url.push_str(query);
    }

    RequestTarget {
        host_header,
        path,
        url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amazon_config() -> ClientConfig {
        ClientConfig::builder()
            .endpoint("s3.amazonaws.com")
            .credentials("AK", "SK")
            .build()
            .unwrap()
    }

    fn local_config() -> ClientConfig {
        ClientConfig::builder()
            .endpoint("localhost")
            .port(9000)
            .secure(false)
            .credentials("AK", "SK")
            .build()
            .unwrap()
    }

    #[test]
    fn amazon_bucket_uses_virtual_host() {
        let spec = RequestSpec::new("GET").bucket("mybucket").object("photos/cat.png");
        let target = build_target(&amazon_config(), &spec);

        assert_eq!(target.host_header, "mybucket.s3.amazonaws.com");
        assert_eq!(target.path, "/photos/cat.png");
        assert_eq!(
            target.url,
            "https://mybucket.s3.amazonaws.com/photos/cat.png"
        );
    }

    #[test]
    fn amazon_without_bucket_is_path_style() {
        let spec = RequestSpec::new("GET");
        let target = build_target(&amazon_config(), &spec);
        assert_eq!(target.host_header, "s3.amazonaws.com");
        assert_eq!(target.path, "/");
    }

    #[test]
    fn path_style_flag_overrides_virtual_host() {
        let spec = RequestSpec::new("GET")
            .bucket("mybucket")
            .query("location")
            .path_style(true);
        let target = build_target(&amazon_config(), &spec);

        assert_eq!(target.host_header, "s3.amazonaws.com");
        assert_eq!(target.url, "https://s3.amazonaws.com/mybucket?location");
    }

    #[test]
    fn non_amazon_endpoint_is_path_style() {
        let spec = RequestSpec::new("PUT").bucket("mybucket").object("a/b.txt");
        let target = build_target(&local_config(), &spec);

        assert_eq!(target.host_header, "localhost:9000");
        assert_eq!(target.url, "http://localhost:9000/mybucket/a/b.txt");
    }

    #[test]
    fn default_port_omitted_from_host_header() {
        let config = ClientConfig::builder()
            .endpoint("localhost")
            .port(443)
            .build()
            .unwrap();
        let spec = RequestSpec::new("GET").bucket("b");
        let target = build_target(&config, &spec);
        assert_eq!(target.host_header, "localhost");
    }

    #[test]
    fn object_keys_escaped_as_path_segments() {
        let spec = RequestSpec::new("GET").bucket("b").object("dir 1/file+x.txt");
        let target = build_target(&local_config(), &spec);
        assert_eq!(target.path, "/b/dir%201/file%2Bx.txt");
    }

    #[test]
    fn query_appended() {
        let spec = RequestSpec::new("GET")
            .bucket("b")
            .query("uploads&prefix=logs%2F");
        let target = build_target(&local_config(), &spec);
        assert!(target.url.ends_with("/b?uploads&prefix=logs%2F"));
    }

    #[test]
    fn headers_lowercased() {
        let spec = RequestSpec::new("PUT").header("X-Amz-Acl", "private");
        assert_eq!(spec.headers.get("x-amz-acl"), Some(&"private".to_string()));
    }
}
