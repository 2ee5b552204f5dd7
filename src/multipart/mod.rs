//! Multipart upload engine.
//!
//! Streams input through a block chunker, computes per-part digests,
//! resumes prior incomplete uploads by matching part digests against
//! server ETags, uploads what is missing in strictly ascending part
//! order, and finalizes the object with the complete manifest.

mod chunker;

pub use chunker::ChunkAggregator;

use crate::error::Error;
use crate::executor::{Executor, RequestSpec};
use crate::signing::{sha256_hex, uri_encode_query};
use crate::types::{trim_etag, PartPage, PartRecord, UploadPage};
use crate::xml;
use base64::encode as b64_encode;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::debug;

/// Smallest part the protocol accepts (except the final one).
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Largest single part the protocol accepts.
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Largest object a multipart upload can produce.
pub const MAX_OBJECT_SIZE: u64 = 5 * 1024 * 1024 * 1024 * 1024;

/// Compute the part size for an object of the given total size.
///
/// The size is the smallest multiple of [`MIN_PART_SIZE`] that fits the
/// object into at most 10000 parts.
pub fn calculate_part_size(object_size: u64) -> Result<u64, Error> {
    if object_size > MAX_OBJECT_SIZE {
        return Err(Error::InvalidArgument {
            message: format!(
                "object size {object_size} exceeds maximum of {MAX_OBJECT_SIZE} bytes"
            ),
        });
    }
    let per_part = object_size.div_ceil(10000);
    let blocks = per_part.div_ceil(MIN_PART_SIZE).max(1);
    Ok(blocks * MIN_PART_SIZE)
}

/// Digests of one part, computed over the exact bytes to be uploaded.
#[derive(Debug, Clone)]
pub struct PartDigests {
    /// Hex MD5, compared against the server's part ETag on resume.
    pub md5_hex: String,
    /// Base64 MD5, sent as `Content-MD5`.
    pub md5_base64: String,
    /// Hex SHA-256, sent as `x-amz-content-sha256`.
    pub sha256_hex: String,
}

impl PartDigests {
    /// Digest a chunk.
    pub fn compute(chunk: &[u8]) -> Self {
        let md5 = md5::compute(chunk);
        Self {
            md5_hex: hex::encode(md5.0),
            md5_base64: b64_encode(md5.0),
            sha256_hex: sha256_hex(chunk),
        }
    }
}

/// State of one multipart upload while the engine drives it.
#[derive(Debug)]
pub struct UploadContext {
    /// Server-assigned upload id.
    pub upload_id: String,
    /// Parts already on the server, by part number.
    pub existing: BTreeMap<u32, PartRecord>,
    /// Planned part size in bytes.
    pub part_size: u64,
    /// Bytes accounted for so far (uploaded or skipped).
    pub uploaded_size: u64,
}

/// Multipart upload operations and the streaming upload engine.
pub struct MultipartService {
    executor: Arc<Executor>,
}

impl MultipartService {
    /// Create a new multipart service.
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    /// Initiate a new multipart upload and return its upload id.
    pub async fn initiate(
        &self,
        bucket: &str,
        object: &str,
        content_type: Option<&str>,
    ) -> Result<String, Error> {
        let mut spec = RequestSpec::new("POST")
            .bucket(bucket)
            .object(object)
            .query("uploads");
        if let Some(content_type) = content_type {
            spec = spec.header("content-type", content_type);
        }

        let response = self.executor.execute(spec, None, None, 200).await?;
        let init = xml::decode_initiate_upload(&String::from_utf8_lossy(&response.body))?;
        debug!(bucket, object, upload_id = %init.upload_id, "initiated multipart upload");
        Ok(init.upload_id)
    }

    /// Upload one part and return its ETag.
    pub async fn upload_part(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_number: u32,
        chunk: Bytes,
        digests: &PartDigests,
    ) -> Result<String, Error> {
        let spec = RequestSpec::new("PUT")
            .bucket(bucket)
            .object(object)
            .query(format!(
                "partNumber={}&uploadId={}",
                part_number,
                uri_encode_query(upload_id)
            ))
            .header("content-length", chunk.len().to_string())
            .header("content-md5", digests.md5_base64.clone());

        let response = self
            .executor
            .execute(spec, Some(chunk), Some(digests.sha256_hex.clone()), 200)
            .await?;

        response.etag().ok_or_else(|| Error::Decode {
            message: format!("part {part_number} response carried no ETag"),
        })
    }

    /// Complete a multipart upload with the ordered part manifest and
    /// return the final object ETag.
    pub async fn complete(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        parts: &[PartRecord],
    ) -> Result<String, Error> {
        let body = Bytes::from(xml::complete_upload_xml(parts));
        let spec = RequestSpec::new("POST")
            .bucket(bucket)
            .object(object)
            .query(format!("uploadId={}", uri_encode_query(upload_id)))
            .header("content-type", "application/xml")
            .header("content-length", body.len().to_string());

        let response = self.executor.execute_buffered(spec, body, 200).await?;
        let result = xml::decode_complete_upload(&String::from_utf8_lossy(&response.body))?;
        Ok(result.etag)
    }

    /// Abort an in-progress multipart upload.
    pub async fn abort(&self, bucket: &str, object: &str, upload_id: &str) -> Result<(), Error> {
        let spec = RequestSpec::new("DELETE")
            .bucket(bucket)
            .object(object)
            .query(format!("uploadId={}", uri_encode_query(upload_id)));
        self.executor.execute(spec, None, None, 204).await?;
        Ok(())
    }

    /// Fetch one page of the part listing.
    pub async fn list_parts_page(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_number_marker: Option<u32>,
    ) -> Result<PartPage, Error> {
        let mut query = format!("uploadId={}", uri_encode_query(upload_id));
        if let Some(marker) = part_number_marker {
            query.push_str(&format!("&part-number-marker={marker}"));
        }

        let spec = RequestSpec::new("GET").bucket(bucket).object(object).query(query);
        let response = self.executor.execute(spec, None, None, 200).await?;
        xml::decode_list_parts(&String::from_utf8_lossy(&response.body))
    }

    /// Fetch every uploaded part of an upload, keyed by part number.
    pub async fn list_parts(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
    ) -> Result<BTreeMap<u32, PartRecord>, Error> {
        let mut parts = BTreeMap::new();
        let mut marker = None;
        loop {
            let page = self
                .list_parts_page(bucket, object, upload_id, marker)
                .await?;
            for part in page.parts {
                parts.insert(part.part_number, part);
            }
            if !page.is_truncated {
                break;
            }
            marker = page.next_part_number_marker;
        }
        Ok(parts)
    }

    /// Fetch one page of the incomplete-upload listing.
    pub async fn list_uploads_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        key_marker: Option<&str>,
        upload_id_marker: Option<&str>,
    ) -> Result<UploadPage, Error> {
        let mut query = String::from("uploads");
        if let Some(prefix) = prefix {
            query.push_str(&format!("&prefix={}", uri_encode_query(prefix)));
        }
        if let Some(marker) = key_marker {
            query.push_str(&format!("&key-marker={}", uri_encode_query(marker)));
        }
        if let Some(marker) = upload_id_marker {
            query.push_str(&format!("&upload-id-marker={}", uri_encode_query(marker)));
        }

        let spec = RequestSpec::new("GET").bucket(bucket).query(query);
        let response = self.executor.execute(spec, None, None, 200).await?;
        xml::decode_list_uploads(&String::from_utf8_lossy(&response.body))
    }

    /// Find the upload id of a pending multipart upload for an object.
    ///
    /// Lists incomplete uploads with the object key as prefix and
    /// filters for an exact key match; among several pending uploads
    /// the most recently initiated one wins.
    pub async fn find_upload_id(
        &self,
        bucket: &str,
        object: &str,
    ) -> Result<Option<String>, Error> {
        let mut best: Option<(String, String)> = None; // (initiated, upload_id)
        let mut key_marker: Option<String> = None;
        let mut upload_id_marker: Option<String> = None;

        loop {
            let page = self
                .list_uploads_page(
                    bucket,
                    Some(object),
                    key_marker.as_deref(),
                    upload_id_marker.as_deref(),
                )
                .await?;

            for upload in page.uploads {
                if upload.key != object {
                    continue;
                }
                let initiated = upload.initiated.unwrap_or_default();
                if best.as_ref().map_or(true, |(when, _)| initiated >= *when) {
                    best = Some((initiated, upload.upload_id));
                }
            }

            if !page.is_truncated {
                break;
            }
            key_marker = page.next_key_marker;
            upload_id_marker = page.next_upload_id_marker;
        }

        Ok(best.map(|(_, upload_id)| upload_id))
    }

    /// Upload a stream of known size as a multipart object and return
    /// the final ETag.
    ///
    /// Resumes a pending upload for the same object when one exists:
    /// parts whose server ETag equals the MD5 of the locally computed
    /// chunk are skipped without re-uploading. The comparison cannot
    /// match on SSE buckets, where part ETags are not plain MD5s; such
    /// parts are simply uploaded again.
    pub async fn upload_stream<R>(
        &self,
        bucket: &str,
        object: &str,
        mut reader: R,
        size: u64,
        content_type: Option<&str>,
    ) -> Result<String, Error>
    where
        R: AsyncRead + Unpin + Send,
    {
        let part_size = calculate_part_size(size)?;

        let mut context = self.prepare_context(bucket, object, part_size, content_type).await?;
        debug!(
            bucket,
            object,
            upload_id = %context.upload_id,
            part_size,
            resumed_parts = context.existing.len(),
            "starting multipart upload"
        );

        let mut aggregator = ChunkAggregator::new(&mut reader, part_size);
        let mut manifest: Vec<PartRecord> = Vec::new();
        let mut part_number: u32 = 1;

        while let Some(chunk) = aggregator.next_part().await? {
            context.uploaded_size += chunk.len() as u64;
            if context.uploaded_size > size {
                return Err(Error::SizeMismatch {
                    expected: size,
                    actual: context.uploaded_size,
                });
            }

            let digests = PartDigests::compute(&chunk);

            let record = match context.existing.get(&part_number) {
                Some(prev) if prev.etag == digests.md5_hex => {
                    debug!(part_number, "part digest matches, skipping upload");
                    prev.clone()
                }
                _ => {
                    let etag = self
                        .upload_part(
                            bucket,
                            object,
                            &context.upload_id,
                            part_number,
                            chunk,
                            &digests,
                        )
                        .await?;
                    PartRecord {
                        part_number,
                        etag: trim_etag(&etag),
                    }
                }
            };

            manifest.push(record);
            part_number += 1;
        }

        if context.uploaded_size != size {
            return Err(Error::SizeMismatch {
                expected: size,
                actual: context.uploaded_size,
            });
        }

        self.complete(bucket, object, &context.upload_id, &manifest).await
    }

    /// Locate a pending upload to resume, or initiate a fresh one.
    async fn prepare_context(
        &self,
        bucket: &str,
        object: &str,
        part_size: u64,
        content_type: Option<&str>,
    ) -> Result<UploadContext, Error> {
        let (upload_id, existing) = match self.find_upload_id(bucket, object).await? {
            Some(upload_id) => {
                let parts = self.list_parts(bucket, object, &upload_id).await?;
                (upload_id, parts)
            }
            None => {
                let upload_id = self.initiate(bucket, object, content_type).await?;
                (upload_id, BTreeMap::new())
            }
        };

        Ok(UploadContext {
            upload_id,
            existing,
            part_size,
            uploaded_size: 0,
        })
    }
}

impl std::fmt::Debug for MultipartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_size_small_objects() {
        assert_eq!(calculate_part_size(0).unwrap(), MIN_PART_SIZE);
        assert_eq!(calculate_part_size(1).unwrap(), MIN_PART_SIZE);
        assert_eq!(calculate_part_size(MIN_PART_SIZE).unwrap(), MIN_PART_SIZE);
    }

    #[test]
    fn part_size_grows_past_ten_thousand_parts() {
        // 100 GiB still fits in 10000 parts of 15 MiB.
        let size = 100 * 1024 * 1024 * 1024_u64;
        let part_size = calculate_part_size(size).unwrap();
        assert_eq!(part_size % MIN_PART_SIZE, 0);
        assert!(size.div_ceil(part_size) <= 10000);
    }

    #[test]
    fn part_size_at_max_object_size() {
        let part_size = calculate_part_size(MAX_OBJECT_SIZE).unwrap();
        assert_eq!(part_size, 525 * 1024 * 1024);
        assert!(part_size <= MAX_PART_SIZE);
    }

    #[test]
    fn part_size_rejects_oversized_objects() {
        assert!(calculate_part_size(MAX_OBJECT_SIZE + 1).is_err());
    }

    #[test]
    fn digests_over_known_bytes() {
        let digests = PartDigests::compute(b"hello");
        assert_eq!(digests.md5_hex, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(digests.md5_base64, "XUFAKrxLKna5cZ2REBfFkg==");
        assert_eq!(
            digests.sha256_hex,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
