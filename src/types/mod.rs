//! Common data types shared across the client API.

use serde::{Deserialize, Serialize};

/// Canned ACL (Access Control List) presets accepted by bucket and
/// object operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CannedAcl {
    /// Owner gets FULL_CONTROL. No one else has access rights (default).
    #[default]
    Private,
    /// Owner gets FULL_CONTROL. Everyone else gets READ access.
    PublicRead,
    /// Owner gets FULL_CONTROL. Everyone else gets READ and WRITE access.
    PublicReadWrite,
    /// Owner gets FULL_CONTROL. Authenticated users get READ access.
    AuthenticatedRead,
}

impl CannedAcl {
    /// Returns the S3 API string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
        }
    }
}

impl std::str::FromStr for CannedAcl {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(CannedAcl::Private),
            "public-read" => Ok(CannedAcl::PublicRead),
            "public-read-write" => Ok(CannedAcl::PublicReadWrite),
            "authenticated-read" => Ok(CannedAcl::AuthenticatedRead),
            _ => Err(crate::Error::InvalidAcl { acl: s.to_string() }),
        }
    }
}

/// ACL of a bucket as reduced from the server's grant list.
///
/// The server reports individual grants; [`BucketAcl::Unsupported`] covers
/// every grant combination with no canned equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketAcl {
    /// No grants beyond the owner.
    Private,
    /// Everyone may read.
    PublicRead,
    /// Everyone may read and write.
    PublicReadWrite,
    /// Authenticated users may read.
    AuthenticatedRead,
    /// A grant combination with no canned ACL name.
    Unsupported,
}

impl BucketAcl {
    /// Returns the canned ACL name, or `unsupported-acl`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketAcl::Private => "private",
            BucketAcl::PublicRead => "public-read",
            BucketAcl::PublicReadWrite => "public-read-write",
            BucketAcl::AuthenticatedRead => "authenticated-read",
            BucketAcl::Unsupported => "unsupported-acl",
        }
    }
}

/// Region codes accepted by `make_bucket`.
pub const REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "sa-east-1",
];

/// A bucket record from the service listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    /// Bucket name.
    pub name: String,
    /// Creation date (ISO 8601 format).
    pub creation_date: Option<String>,
}

/// Object metadata returned by `stat_object`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStat {
    /// Size in bytes.
    pub size: u64,
    /// ETag with surrounding quotes stripped.
    pub etag: String,
    /// Content type.
    pub content_type: String,
    /// Last modified date (RFC 1123 format, as sent by the server).
    pub last_modified: String,
}

/// One entry of an object listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object key.
    pub key: String,
    /// Last modified date.
    pub last_modified: Option<String>,
    /// ETag with surrounding quotes stripped.
    pub etag: Option<String>,
    /// Size in bytes.
    pub size: u64,
}

/// One page of an object listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectPage {
    /// Whether more entries follow this page.
    pub is_truncated: bool,
    /// Marker to pass for the next page.
    pub next_marker: Option<String>,
    /// Object entries of this page.
    pub objects: Vec<ObjectEntry>,
    /// Prefixes rolled up under the request delimiter.
    pub common_prefixes: Vec<String>,
}

/// An in-progress multipart upload from the incomplete-upload listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompleteUpload {
    /// Object key the upload targets.
    pub key: String,
    /// Opaque server-assigned upload id.
    pub upload_id: String,
    /// When the upload was initiated (ISO 8601 format).
    pub initiated: Option<String>,
}

/// One page of the incomplete-upload listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadPage {
    /// Whether more entries follow this page.
    pub is_truncated: bool,
    /// Key marker to pass for the next page.
    pub next_key_marker: Option<String>,
    /// Upload-id marker to pass for the next page.
    pub next_upload_id_marker: Option<String>,
    /// Uploads of this page.
    pub uploads: Vec<IncompleteUpload>,
}

/// An uploaded part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    /// 1-based part number, contiguous from 1.
    pub part_number: u32,
    /// ETag with surrounding quotes stripped; the MD5 hex of the part
    /// bytes for unencrypted uploads.
    pub etag: String,
}

/// One page of the part listing for a multipart upload.
#[derive(Debug, Clone, Default)]
pub struct PartPage {
    /// Whether more parts follow this page.
    pub is_truncated: bool,
    /// Part-number marker to pass for the next page.
    pub next_part_number_marker: Option<u32>,
    /// Parts of this page.
    pub parts: Vec<PartRecord>,
}

/// Result of initiating a multipart upload.
#[derive(Debug, Clone)]
pub struct MultipartInit {
    /// Bucket the upload lives in.
    pub bucket: String,
    /// Object key the upload targets.
    pub key: String,
    /// Opaque server-assigned upload id.
    pub upload_id: String,
}

/// Result of completing a multipart upload.
#[derive(Debug, Clone)]
pub struct CompleteResult {
    /// Bucket of the finished object.
    pub bucket: Option<String>,
    /// Key of the finished object.
    pub key: Option<String>,
    /// Final object ETag with surrounding quotes stripped.
    pub etag: String,
    /// Location URL reported by the server.
    pub location: Option<String>,
}

/// One grant from a bucket's access-control policy.
#[derive(Debug, Clone)]
pub struct Grant {
    /// Grantee group URI, when the grantee is a group.
    pub grantee_uri: Option<String>,
    /// Granted permission (`READ`, `WRITE`, `FULL_CONTROL`, ...).
    pub permission: String,
}

/// Strip the surrounding double quotes S3 puts around ETag values.
pub fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_acl_roundtrip() {
        assert_eq!(CannedAcl::Private.as_str(), "private");
        assert_eq!(
            "public-read-write".parse::<CannedAcl>().unwrap(),
            CannedAcl::PublicReadWrite
        );
        assert!("bucket-owner-read".parse::<CannedAcl>().is_err());
    }

    #[test]
    fn bucket_acl_names() {
        assert_eq!(BucketAcl::AuthenticatedRead.as_str(), "authenticated-read");
        assert_eq!(BucketAcl::Unsupported.as_str(), "unsupported-acl");
    }

    #[test]
    fn trim_etag_strips_quotes() {
        assert_eq!(trim_etag("\"abc123\""), "abc123");
        assert_eq!(trim_etag("abc123"), "abc123");
        assert_eq!(trim_etag("\"abc-5\""), "abc-5");
    }
}
