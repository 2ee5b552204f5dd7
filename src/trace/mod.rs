//! Wire tracing to a caller-supplied sink.
//!
//! Off by default. When enabled, every request and response is written
//! as human-readable lines; the SigV4 signature inside the
//! `authorization` header is redacted before it leaves the process.

use crate::error::ServerError;
use std::io::Write;

/// Placeholder written instead of the signature value.
const REDACTED: &str = "**REDACTED**";

/// Writes request/response trace lines to a byte sink.
pub struct RequestTracer {
    sink: Box<dyn Write + Send>,
}

impl RequestTracer {
    /// Create a tracer writing to the given sink.
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self { sink }
    }

    /// Trace an outgoing request.
    pub fn request<'a, I>(&mut self, method: &str, path: &str, headers: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let _ = writeln!(self.sink, "REQUEST {} {}", method, path);
        for (name, value) in headers {
            let _ = writeln!(self.sink, "{}: {}", name, redact_signature(name, value));
        }
        let _ = writeln!(self.sink);
    }

    /// Trace a received response.
    pub fn response<'a, I>(&mut self, status: u16, headers: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let _ = writeln!(self.sink, "RESPONSE {}", status);
        for (name, value) in headers {
            let _ = writeln!(self.sink, "{}: {}", name, value);
        }
        let _ = writeln!(self.sink);
    }

    /// Trace a decoded server error as a JSON dump.
    pub fn error(&mut self, error: &ServerError) {
        if let Ok(json) = serde_json::to_string(error) {
            let _ = writeln!(self.sink, "{}", json);
        }
        let _ = writeln!(self.sink);
    }
}

impl std::fmt::Debug for RequestTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTracer").finish_non_exhaustive()
    }
}

/// Replace the `Signature=` value of an authorization header.
fn redact_signature(name: &str, value: &str) -> String {
    if !name.eq_ignore_ascii_case("authorization") {
        return value.to_string();
    }
    match value.find("Signature=") {
        Some(idx) => format!("{}Signature={}", &value[..idx], REDACTED),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn signature_redacted_in_request_lines() {
        let buf = SharedBuf::default();
        let mut tracer = RequestTracer::new(Box::new(buf.clone()));

        tracer.request(
            "GET",
            "/bucket/key",
            [(
                "authorization",
                "AWS4-HMAC-SHA256 Credential=AK/scope, SignedHeaders=host, Signature=deadbeef",
            )],
        );

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(out.starts_with("REQUEST GET /bucket/key\n"));
        assert!(out.contains("Signature=**REDACTED**"));
        assert!(!out.contains("deadbeef"));
    }

    #[test]
    fn response_and_error_lines() {
        let buf = SharedBuf::default();
        let mut tracer = RequestTracer::new(Box::new(buf.clone()));

        tracer.response(404, [("content-type", "application/xml")]);
        tracer.error(&ServerError::from_status(404));

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("RESPONSE 404"));
        assert!(out.contains("\"code\":\"NotFound\""));
    }

    #[test]
    fn non_authorization_headers_untouched() {
        assert_eq!(
            redact_signature("x-amz-date", "20240101T000000Z"),
            "20240101T000000Z"
        );
    }
}
