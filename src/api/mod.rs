//! High-level bucket and object operations.
//!
//! Every operation here is a thin shell over the request executor; the
//! heavy lifting lives in the pipeline and the multipart engine.

mod buckets;
mod objects;

pub use buckets::BucketsService;
pub use objects::{GetObjectOutput, ObjectsService};
