//! Error types for the client.
//!
//! Every failure surfaces to the caller as one variant of [`Error`]; the
//! library never retries on its own. Validation errors are raised before
//! any I/O happens, server errors carry the decoded `<Error>` payload.

use serde::Serialize;
use thiserror::Error;

/// Top-level error type for all client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured endpoint is empty or not a legal host name.
    #[error("invalid endpoint: {endpoint:?}")]
    InvalidEndpoint {
        /// The rejected endpoint value.
        endpoint: String,
    },

    /// The configured port is outside the valid range.
    #[error("invalid port: {port} (must be 0-65535)")]
    InvalidPort {
        /// The rejected port value.
        port: u32,
    },

    /// A caller-supplied argument failed validation.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument.
        message: String,
    },

    /// The bucket name does not satisfy S3 naming rules.
    #[error("invalid bucket name {bucket:?}: {reason}")]
    InvalidBucketName {
        /// The rejected bucket name.
        bucket: String,
        /// Which rule was violated.
        reason: String,
    },

    /// The object key does not satisfy S3 naming rules.
    #[error("invalid object name {object:?}: {reason}")]
    InvalidObjectName {
        /// The rejected object key.
        object: String,
        /// Which rule was violated.
        reason: String,
    },

    /// The listing prefix is not valid.
    #[error("invalid prefix {prefix:?}")]
    InvalidPrefix {
        /// The rejected prefix.
        prefix: String,
    },

    /// The ACL string is not one of the canned ACL names.
    #[error("invalid ACL {acl:?}")]
    InvalidAcl {
        /// The rejected ACL value.
        acl: String,
    },

    /// A date or expiry value is out of range.
    #[error("invalid date: {message}")]
    InvalidDate {
        /// What was wrong with the value.
        message: String,
    },

    /// A presign operation was attempted without credentials.
    #[error("presigned operations are not allowed for anonymous clients")]
    AnonymousRequest,

    /// The server answered with an unexpected status; the decoded
    /// `<Error>` document is attached.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The HTTP transport failed before a response could be read.
    #[error("network error: {message}")]
    Network {
        /// Description of the underlying transport failure.
        message: String,
    },

    /// The number of bytes streamed differs from the declared size.
    #[error("size mismatch: declared {expected} bytes, streamed {actual}")]
    SizeMismatch {
        /// The size the caller declared.
        expected: u64,
        /// The number of bytes actually read.
        actual: u64,
    },

    /// The chunk aggregator received input violating its block contract.
    #[error("chunk aggregation error: {message}")]
    Aggregation {
        /// Which invariant was violated.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },

    /// A file-system operation failed (file uploads and downloads).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Error decoded from an S3 `<Error>` response document.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{code}: {message} (status {status_code})")]
pub struct ServerError {
    /// S3 error code, e.g. `NoSuchKey`.
    pub code: String,
    /// Human-readable message from the server.
    pub message: String,
    /// The resource the error refers to.
    pub resource: Option<String>,
    /// Request id assigned by the server.
    pub request_id: Option<String>,
    /// HTTP status the response carried.
    pub status_code: u16,
}

impl ServerError {
    /// Build a fallback error for responses whose body carried no
    /// parseable `<Error>` document (HEAD responses, empty bodies).
    pub fn from_status(status_code: u16) -> Self {
        let (code, message) = match status_code {
            301 => ("MovedPermanently", "Moved Permanently"),
            307 => ("TemporaryRedirect", "Temporary Redirect"),
            400 => ("BadRequest", "Bad Request"),
            403 => ("AccessDenied", "Access Denied"),
            404 => ("NotFound", "Not Found"),
            405 => ("MethodNotAllowed", "Method Not Allowed"),
            409 => ("Conflict", "Conflict"),
            501 => ("MethodNotAllowed", "Method Not Allowed"),
            _ => ("UnknownError", "Unexpected response status"),
        };
        Self {
            code: code.to_string(),
            message: message.to_string(),
            resource: None,
            request_id: None,
            status_code,
        }
    }
}

impl Error {
    /// The HTTP status code of the failing response, if this error came
    /// from one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Server(e) => Some(e.status_code),
            _ => None,
        }
    }

    /// The S3 error code, if this error came from a server response.
    pub fn s3_error_code(&self) -> Option<&str> {
        match self {
            Error::Server(e) => Some(&e.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display() {
        let err = ServerError {
            code: "NoSuchKey".into(),
            message: "The specified key does not exist.".into(),
            resource: Some("/b/o".into()),
            request_id: Some("ABC123".into()),
            status_code: 404,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("NoSuchKey"));
        assert!(rendered.contains("404"));
    }

    #[test]
    fn fallback_codes_by_status() {
        assert_eq!(ServerError::from_status(404).code, "NotFound");
        assert_eq!(ServerError::from_status(403).code, "AccessDenied");
        assert_eq!(ServerError::from_status(599).code, "UnknownError");
    }

    #[test]
    fn status_code_accessor() {
        let err = Error::Server(ServerError::from_status(409));
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(err.s3_error_code(), Some("Conflict"));

        let err = Error::AnonymousRequest;
        assert_eq!(err.status_code(), None);
    }
}
