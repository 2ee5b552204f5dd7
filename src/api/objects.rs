//! Object operations.

use crate::error::Error;
use crate::executor::{Executor, RequestSpec};
use crate::multipart::{MultipartService, PartDigests, MIN_PART_SIZE};
use crate::signing::uri_encode_query;
use crate::transport::ByteStream;
use crate::types::{trim_etag, ObjectPage, ObjectStat, UploadPage};
use crate::validate;
use crate::xml;
use bytes::Bytes;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// A downloaded object: metadata headers plus the body stream.
pub struct GetObjectOutput {
    /// Content length reported by the server.
    pub content_length: Option<u64>,
    /// ETag with surrounding quotes stripped.
    pub etag: Option<String>,
    /// Content type.
    pub content_type: Option<String>,
    /// Last modified date (RFC 1123 format).
    pub last_modified: Option<String>,
    /// Body chunks.
    pub body: ByteStream,
}

impl GetObjectOutput {
    /// Drain the body into a single buffer.
    pub async fn collect(mut self) -> Result<Bytes, Error> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }
}

impl std::fmt::Debug for GetObjectOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetObjectOutput")
            .field("content_length", &self.content_length)
            .field("etag", &self.etag)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Object CRUD, listings and file transfer helpers.
pub struct ObjectsService {
    executor: Arc<Executor>,
    multipart: MultipartService,
}

impl ObjectsService {
    /// Create a new objects service.
    pub fn new(executor: Arc<Executor>) -> Self {
        let multipart = MultipartService::new(executor.clone());
        Self { executor, multipart }
    }

    /// Upload an in-memory payload and return the object ETag.
    ///
    /// Payloads up to the minimum part size go out as one PUT with
    /// `Content-MD5`; anything larger is handed to the multipart engine.
    pub async fn put_object(
        &self,
        bucket: &str,
        object: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, Error> {
        validate::bucket_name(bucket)?;
        validate::object_name(object)?;

        if data.len() as u64 <= MIN_PART_SIZE {
            return self.put_single(bucket, object, data, content_type).await;
        }

        let size = data.len() as u64;
        self.multipart
            .upload_stream(bucket, object, std::io::Cursor::new(data), size, content_type)
            .await
    }

    /// Upload a stream of known size and return the object ETag.
    ///
    /// The declared size must match the bytes the stream yields; a
    /// mismatch aborts with [`Error::SizeMismatch`].
    pub async fn put_object_stream<R>(
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
        validate::bucket_name(bucket)?;
        validate::object_name(object)?;

        if size <= MIN_PART_SIZE {
            // Small enough for a single shot; buffer and verify the
            // declared size.
            let mut data = Vec::with_capacity(size as usize);
            reader.read_to_end(&mut data).await?;
            if data.len() as u64 != size {
                return Err(Error::SizeMismatch {
                    expected: size,
                    actual: data.len() as u64,
                });
            }
            return self
                .put_single(bucket, object, Bytes::from(data), content_type)
                .await;
        }

        self.multipart
            .upload_stream(bucket, object, reader, size, content_type)
            .await
    }

    /// Upload a file and return the object ETag.
    pub async fn fput_object(
        &self,
        bucket: &str,
        object: &str,
        path: impl AsRef<Path>,
        content_type: Option<&str>,
    ) -> Result<String, Error> {
        let path = path.as_ref();
        let size = tokio::fs::metadata(path).await?.len();
        let file = tokio::fs::File::open(path).await?;
        self.put_object_stream(bucket, object, file, size, content_type)
            .await
    }

    /// Single-shot PUT with `Content-MD5` and payload SHA-256.
    async fn put_single(
        &self,
        bucket: &str,
        object: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, Error> {
        let digests = PartDigests::compute(&data);

        let mut spec = RequestSpec::new("PUT")
            .bucket(bucket)
            .object(object)
            .header("content-length", data.len().to_string())
            .header("content-md5", digests.md5_base64.clone());
        if let Some(content_type) = content_type {
            spec = spec.header("content-type", content_type);
        }

        let response = self
            .executor
            .execute(spec, Some(data), Some(digests.sha256_hex.clone()), 200)
            .await?;

        Ok(response.etag().unwrap_or(digests.md5_hex))
    }

    /// Download an object as a byte stream.
    pub async fn get_object(&self, bucket: &str, object: &str) -> Result<GetObjectOutput, Error> {
        validate::bucket_name(bucket)?;
        validate::object_name(object)?;

        let spec = RequestSpec::new("GET").bucket(bucket).object(object);
        let response = self.executor.execute_streaming(spec, 200).await?;
        Ok(into_output(response))
    }

    /// Download part of an object.
    ///
    /// `length` 0 means everything from `offset` to the end. A request
    /// with a `Range` header expects 206; offset 0 with length 0 is a
    /// plain download.
    pub async fn get_partial_object(
        &self,
        bucket: &str,
        object: &str,
        offset: u64,
        length: u64,
    ) -> Result<GetObjectOutput, Error> {
        validate::bucket_name(bucket)?;
        validate::object_name(object)?;

        if offset == 0 && length == 0 {
            return self.get_object(bucket, object).await;
        }

        let range = if length == 0 {
            format!("bytes={offset}-")
        } else {
            format!("bytes={}-{}", offset, offset + length - 1)
        };

        let spec = RequestSpec::new("GET")
            .bucket(bucket)
            .object(object)
            .header("range", range);
        let response = self.executor.execute_streaming(spec, 206).await?;
        Ok(into_output(response))
    }

    /// Download an object to a file, resuming a previous partial
    /// download when possible.
    ///
    /// Data lands in `{path}.{etag}.part`; when a partial file for the
    /// current ETag exists the download continues from its size, and the
    /// finished file is renamed into place.
    pub async fn fget_object(
        &self,
        bucket: &str,
        object: &str,
        path: impl AsRef<Path>,
    ) -> Result<ObjectStat, Error> {
        let path = path.as_ref();
        let stat = self.stat_object(bucket, object).await?;

        let part_path = path.with_file_name(format!(
            "{}.{}.part",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            stat.etag
        ));

        let existing = match tokio::fs::metadata(&part_path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        if existing == stat.size && stat.size > 0 {
            tokio::fs::rename(&part_path, path).await?;
            return Ok(stat);
        }

        let resume = existing > 0 && existing < stat.size;
        let (output, mut file, mut written) = if resume {
            debug!(bucket, object, offset = existing, "resuming download");
            let output = self.get_partial_object(bucket, object, existing, 0).await?;
            let file = tokio::fs::OpenOptions::new()
                .append(true)
                .open(&part_path)
                .await?;
            (output, file, existing)
        } else {
            let output = self.get_object(bucket, object).await?;
            let file = tokio::fs::File::create(&part_path).await?;
            (output, file, 0)
        };

        let mut body = output.body;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written != stat.size {
            return Err(Error::SizeMismatch {
                expected: stat.size,
                actual: written,
            });
        }

        tokio::fs::rename(&part_path, path).await?;
        Ok(stat)
    }

    /// Read an object's metadata via HEAD.
    pub async fn stat_object(&self, bucket: &str, object: &str) -> Result<ObjectStat, Error> {
        validate::bucket_name(bucket)?;
        validate::object_name(object)?;

        let spec = RequestSpec::new("HEAD").bucket(bucket).object(object);
        let response = self.executor.execute(spec, None, None, 200).await?;

        let size = response.content_length().ok_or_else(|| Error::Decode {
            message: "HEAD response carried no Content-Length".to_string(),
        })?;

        Ok(ObjectStat {
            size,
            etag: response
                .get_header("etag")
                .map(trim_etag)
                .unwrap_or_default(),
            content_type: response
                .get_header("content-type")
                .unwrap_or("application/octet-stream")
                .to_string(),
            last_modified: response
                .get_header("last-modified")
                .unwrap_or_default()
                .to_string(),
        })
    }

    /// Delete an object.
    pub async fn remove_object(&self, bucket: &str, object: &str) -> Result<(), Error> {
        validate::bucket_name(bucket)?;
        validate::object_name(object)?;

        let spec = RequestSpec::new("DELETE").bucket(bucket).object(object);
        self.executor.execute(spec, None, None, 204).await?;
        Ok(())
    }

    /// List one page of objects under a prefix.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        marker: Option<&str>,
        delimiter: Option<&str>,
        max_keys: Option<u32>,
    ) -> Result<ObjectPage, Error> {
        validate::bucket_name(bucket)?;
        if let Some(prefix) = prefix {
            validate::prefix(prefix)?;
        }

        let mut params = Vec::new();
        if let Some(prefix) = prefix {
            params.push(format!("prefix={}", uri_encode_query(prefix)));
        }
        if let Some(marker) = marker {
            params.push(format!("marker={}", uri_encode_query(marker)));
        }
        if let Some(delimiter) = delimiter {
            params.push(format!("delimiter={}", uri_encode_query(delimiter)));
        }
        if let Some(max_keys) = max_keys {
            params.push(format!("max-keys={max_keys}"));
        }

        let mut spec = RequestSpec::new("GET").bucket(bucket);
        if !params.is_empty() {
            spec = spec.query(params.join("&"));
        }

        let response = self.executor.execute(spec, None, None, 200).await?;
        xml::decode_list_objects(&String::from_utf8_lossy(&response.body))
    }

    /// List one page of incomplete multipart uploads under a prefix.
    pub async fn list_incomplete_uploads(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        key_marker: Option<&str>,
        upload_id_marker: Option<&str>,
    ) -> Result<UploadPage, Error> {
        validate::bucket_name(bucket)?;
        if let Some(prefix) = prefix {
            validate::prefix(prefix)?;
        }
        self.multipart
            .list_uploads_page(bucket, prefix, key_marker, upload_id_marker)
            .await
    }

    /// Abort the pending multipart upload of an object, if any.
    pub async fn remove_incomplete_upload(
        &self,
        bucket: &str,
        object: &str,
    ) -> Result<(), Error> {
        validate::bucket_name(bucket)?;
        validate::object_name(object)?;

        if let Some(upload_id) = self.multipart.find_upload_id(bucket, object).await? {
            self.multipart.abort(bucket, object, &upload_id).await?;
        }
        Ok(())
    }

    /// The multipart service backing the high-level uploads.
    pub fn multipart(&self) -> &MultipartService {
        &self.multipart
    }
}

fn into_output(response: crate::transport::StreamingResponse) -> GetObjectOutput {
    GetObjectOutput {
        content_length: response
            .get_header("content-length")
            .and_then(|v| v.parse().ok()),
        etag: response.get_header("etag").map(trim_etag),
        content_type: response.get_header("content-type").map(String::from),
        last_modified: response.get_header("last-modified").map(String::from),
        body: response.body,
    }
}

impl std::fmt::Debug for ObjectsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectsService").finish_non_exhaustive()
    }
}
