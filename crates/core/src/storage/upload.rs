//! Streaming upload path.
//!
//! An inbound stream is read in fixed-size chunks and every chunk is handed
//! to the backend writer before the next one is requested, so at most one
//! chunk of the request body is held in memory by this layer.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use super::error::StorageError;

/// Forward-only cursor producing fixed-size chunks from a reader.
pub struct ChunkCursor<R> {
    reader: R,
    chunk_size: usize,
    finished: bool,
}

impl<R: AsyncRead + Unpin> ChunkCursor<R> {
    /// Create a cursor yielding chunks of `chunk_size` bytes (at least 1).
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            finished: false,
        }
    }

    /// Next chunk, or `None` once a read has returned zero bytes.
    ///
    /// Every chunk except the last is exactly `chunk_size` bytes long.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                self.finished = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }

        buf.truncate(filled);
        Ok(Some(Bytes::from(buf)))
    }
}

/// Write side of an upload.
#[async_trait]
pub trait ChunkSink: Send {
    /// Append one chunk.
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), StorageError>;

    /// Commit everything written so far.
    async fn finish(&mut self) -> Result<(), StorageError>;

    /// Give up on the upload. Remote partial state is left to the backend.
    async fn abort(&mut self);
}

/// Drain `cursor` into `sink`, returning the number of bytes stored.
///
/// Any read or write failure aborts the sink once and surfaces as
/// `StorageError::TransferFailed`; nothing is retried.
pub async fn pipe<R, S>(cursor: &mut ChunkCursor<R>, sink: &mut S) -> Result<u64, StorageError>
where
    R: AsyncRead + Unpin + Send,
    S: ChunkSink + ?Sized,
{
    let mut written: u64 = 0;

    loop {
        let chunk = match cursor.next_chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                sink.abort().await;
                return Err(StorageError::TransferFailed(format!(
                    "reading upload stream failed after {written} bytes: {e}"
                )));
            }
        };

        let len = chunk.len() as u64;
        if let Err(e) = sink.write_chunk(chunk).await {
            sink.abort().await;
            return Err(e.into_transfer_failure(written));
        }
        written += len;
        debug!(bytes = written, "chunk forwarded");
    }

    if let Err(e) = sink.finish().await {
        sink.abort().await;
        return Err(e.into_transfer_failure(written));
    }

    Ok(written)
}


#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use super::*;

    // Chunking never loses, duplicates or reorders bytes, and only the last
    // chunk may be short.
    proptest! {
        #[test]
        fn prop_chunks_reassemble_input(
            data in proptest::collection::vec(any::<u8>(), 0..5000),
            chunk_size in 1usize..2048,
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("runtime");
            let chunks = runtime.block_on(async {
                let mut cursor = ChunkCursor::new(data.as_slice(), chunk_size);
                let mut chunks = Vec::new();
                while let Some(chunk) = cursor.next_chunk().await.expect("read") {
                    chunks.push(chunk);
                }
                chunks
            });

            let total: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
            prop_assert_eq!(&total, &data);
            if let Some((last, rest)) = chunks.split_last() {
                prop_assert!(rest.iter().all(|c| c.len() == chunk_size));
                prop_assert!(!last.is_empty() && last.len() <= chunk_size);
            }
        }
    }
}
