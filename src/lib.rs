//! Client library for Amazon S3-compatible object storage.
//!
//! The crate speaks the S3 HTTP protocol against AWS itself or any
//! compatible endpoint (MinIO, LocalStack, R2, ...). The request pipeline
//! is fully streaming: request and response bodies flow as byte chunks,
//! digests are computed incrementally, and large objects are uploaded
//! through a resumable multipart engine.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use s3_client::{CannedAcl, Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), s3_client::Error> {
//!     let config = ClientConfig::builder()
//!         .endpoint("play.min.io")
//!         .credentials("ACCESS-KEY", "SECRET-KEY")
//!         .build()?;
//!     let client = Client::new(config)?;
//!
//!     client.buckets().make_bucket("my-bucket", CannedAcl::Private, "us-east-1").await?;
//!     let etag = client
//!         .objects()
//!         .put_object("my-bucket", "hello.txt", b"Hello, world!".as_ref().into(), None)
//!         .await?;
//!     println!("uploaded, etag {etag}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod mocks;
pub mod multipart;
pub mod presign;
pub mod region;
pub mod request;
pub mod signing;
pub mod trace;
pub mod transport;
pub mod types;
pub mod validate;
pub mod xml;

pub use api::{BucketsService, ObjectsService};
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ServerError};
pub use executor::{Executor, RequestSpec};
pub use multipart::{MultipartService, MAX_OBJECT_SIZE, MAX_PART_SIZE, MIN_PART_SIZE};
pub use presign::{PostPolicy, PresignService};
pub use transport::{ByteStream, HttpRequest, HttpResponse, HttpTransport, StreamingResponse};
pub use types::{
    BucketAcl, BucketInfo, CannedAcl, IncompleteUpload, ObjectEntry, ObjectPage, ObjectStat,
    PartRecord, UploadPage,
};

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
