//! AWS Signature V4 signing.
//!
//! Implements the three SigV4 flavors the protocol needs: the
//! `Authorization` header for ordinary requests, query-string signatures
//! for presigned URLs, and the HMAC over a base64 POST policy for
//! browser-based uploads. Anonymous clients never call into this module.

mod canonical;
mod signer;

pub use canonical::{uri_encode_path, uri_encode_query};
pub use signer::{encode_policy, post_presign_signature, presign_v4, sign_v4};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// AWS Signature V4 algorithm identifier.
pub const AWS_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name for S3.
pub const S3_SERVICE: &str = "s3";

/// Unsigned payload constant used by presigned URLs.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// SHA-256 of the empty byte string.
pub const EMPTY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Calculate the hex-encoded SHA-256 hash of data.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Calculate HMAC-SHA256.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the SigV4 signing key.
///
/// kDate = HMAC("AWS4" + SecretKey, Date)
/// kRegion = HMAC(kDate, Region)
/// kService = HMAC(kRegion, Service)
/// kSigning = HMAC(kService, "aws4_request")
pub fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str) -> Vec<u8> {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, S3_SERVICE.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Build the credential scope string: `{date}/{region}/s3/aws4_request`.
pub fn credential_scope(date_stamp: &str, region: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, S3_SERVICE)
}

/// Format a timestamp as `YYYYMMDD'T'HHMMSS'Z'`.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format a date stamp as `YYYYMMDD`.
pub fn format_date_stamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}

/// Whether a header participates in the signature.
pub fn should_sign_header(header_name: &str) -> bool {
    let name_lower = header_name.to_lowercase();

    if name_lower == "host" || name_lower.starts_with("x-amz-") {
        return true;
    }

    matches!(
        name_lower.as_str(),
        "content-type" | "content-md5" | "content-length" | "range" | "date"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sha256_hex_known_values() {
        assert_eq!(sha256_hex(b""), EMPTY_SHA256);
        assert_eq!(
            sha256_hex(b"test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn signing_key_is_32_bytes() {
        let key = derive_signing_key("secret", "20231215", "us-east-1");
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn scope_format() {
        assert_eq!(
            credential_scope("20231215", "eu-west-1"),
            "20231215/eu-west-1/s3/aws4_request"
        );
    }

    #[test]
    fn datetime_formats() {
        let dt = Utc.with_ymd_and_hms(2023, 12, 15, 10, 30, 45).unwrap();
        assert_eq!(format_datetime(&dt), "20231215T103045Z");
        assert_eq!(format_date_stamp(&dt), "20231215");
    }

    #[test]
    fn header_signing_filter() {
        assert!(should_sign_header("Host"));
        assert!(should_sign_header("x-amz-date"));
        assert!(should_sign_header("X-Amz-Content-Sha256"));
        assert!(should_sign_header("Content-MD5"));
        assert!(should_sign_header("Range"));
        assert!(!should_sign_header("User-Agent"));
        assert!(!should_sign_header("Accept"));
    }
}
