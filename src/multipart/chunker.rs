//! Block chunking for the upload stream.

use crate::error::Error;
use crate::multipart::MIN_PART_SIZE;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads an input stream in [`MIN_PART_SIZE`] blocks and aggregates them
/// into part-sized chunks.
///
/// Blocks are filled completely except at end-of-input, so a short block
/// reliably signals the final part. The aggregator enforces its own
/// contract: a block may never exceed [`MIN_PART_SIZE`] and an aggregate
/// may never exceed the planned part size.
pub struct ChunkAggregator<R> {
    reader: R,
    part_size: u64,
    done: bool,
}

impl<R: AsyncRead + Unpin> ChunkAggregator<R> {
    /// Create an aggregator producing chunks of at most `part_size`
    /// bytes.
    pub fn new(reader: R, part_size: u64) -> Self {
        Self {
            reader,
            part_size,
            done: false,
        }
    }

    /// Read the next aggregated chunk, or `None` at end-of-input.
    pub async fn next_part(&mut self) -> Result<Option<Bytes>, Error> {
        if self.done {
            return Ok(None);
        }

        let mut aggregate: Vec<u8> = Vec::new();

        loop {
            let block = self.read_block().await?;
            if block.is_empty() {
                self.done = true;
                break;
            }
            if block.len() as u64 > MIN_PART_SIZE {
                return Err(Error::Aggregation {
                    message: format!(
                        "block of {} bytes exceeds the {} byte block size",
                        block.len(),
                        MIN_PART_SIZE
                    ),
                });
            }
            if aggregate.len() as u64 + block.len() as u64 > self.part_size {
                return Err(Error::Aggregation {
                    message: format!(
                        "aggregate would exceed the {} byte part size",
                        self.part_size
                    ),
                });
            }

            let short = (block.len() as u64) < MIN_PART_SIZE;
            aggregate.extend_from_slice(&block);

            if short {
                // A short block only happens at true end-of-input.
                self.done = true;
                break;
            }
            if aggregate.len() as u64 == self.part_size {
                break;
            }
        }

        if aggregate.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Bytes::from(aggregate)))
        }
    }

    /// Fill one block of up to [`MIN_PART_SIZE`] bytes; shorter only at
    /// end-of-input.
    async fn read_block(&mut self) -> Result<Vec<u8>, Error> {
        let mut block = vec![0u8; MIN_PART_SIZE as usize];
        let mut filled = 0;

        while filled < block.len() {
            let n = self.reader.read(&mut block[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        block.truncate(filled);
        Ok(block)
    }
}
