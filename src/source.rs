//! Chunked, consume-once row source with header skipping and footer exclusion.

use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::VecDeque;
use std::io;

use crate::{DsvError, DsvResult};

/// Smallest accepted chunk size.
pub const MIN_CHUNK_SIZE: usize = 100;

/// Boxed stream of pre-split rows, the input every model consumes.
pub type RowStream = BoxStream<'static, io::Result<Vec<String>>>;

/// Fixed-capacity look-ahead window.
///
/// Holds the most recent `capacity` items; pushing into a full window evicts
/// and returns the oldest one. Whatever is left at end of input is the footer.
#[derive(Debug)]
pub struct FooterWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> FooterWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes `item`; returns the item that is now known not to be footer.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops the withheld items, returning how many there were.
    pub fn discard(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        n
    }
}

/// Skip/chunk settings for [`ChunkedRows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingOptions {
    pub skip_header_rows: usize,
    pub skip_footer_rows: usize,
    pub chunk_size: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            skip_header_rows: 0,
            skip_footer_rows: 0,
            chunk_size: 500,
        }
    }
}

/// Groups a stream into chunks of at most `chunk_size` items.
pub struct ChunkedRows<T> {
    inner: BoxStream<'static, io::Result<T>>,
    footer: FooterWindow<T>,
    skip_remaining: usize,
    chunk_size: usize,
    done: bool,
    // Error held back so the rows read before it are handed out first.
    deferred: Option<io::Error>,
}

impl<T: Send + 'static> ChunkedRows<T> {
    pub fn new(inner: BoxStream<'static, io::Result<T>>, options: ChunkingOptions) -> DsvResult<Self> {
        if options.chunk_size < MIN_CHUNK_SIZE {
            return Err(DsvError::Config(format!(
                "chunk_size must be at least {MIN_CHUNK_SIZE}, got {}",
                options.chunk_size
            )));
        }
        Ok(Self {
            inner,
            footer: FooterWindow::new(options.skip_footer_rows),
            skip_remaining: options.skip_header_rows,
            chunk_size: options.chunk_size,
            done: false,
            deferred: None,
        })
    }

    /// Next chunk, or `None` once the input is exhausted.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Vec<T>>> {
        self.next_chunk_within(usize::MAX).await
    }

    /// Like [`next_chunk`](Self::next_chunk), but accepts at most `budget`
    /// items from the input, counting those absorbed by the footer window.
    ///
    /// The chunk may be empty while the input is not exhausted when the whole
    /// budget went into the footer window. A source error is returned on the
    /// call after the rows that preceded it.
    pub async fn next_chunk_within(&mut self, budget: usize) -> io::Result<Option<Vec<T>>> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }
        if self.done {
            return Ok(None);
        }
        let mut chunk = Vec::with_capacity(self.chunk_size.min(budget));
        let mut accepted = 0usize;
        while chunk.len() < self.chunk_size && accepted < budget {
            let Some(item) = self.inner.next().await else {
                self.done = true;
                let withheld = self.footer.discard();
                if withheld > 0 {
                    tracing::trace!(withheld, "dropped footer rows");
                }
                break;
            };
            let item = match item {
                Ok(item) => item,
                Err(e) if chunk.is_empty() => return Err(e),
                Err(e) => {
                    self.deferred = Some(e);
                    break;
                }
            };
            if self.skip_remaining > 0 {
                self.skip_remaining -= 1;
                continue;
            }
            accepted += 1;
            if let Some(released) = self.footer.push(item) {
                chunk.push(released);
            }
        }
        if chunk.is_empty() && self.done {
            return Ok(None);
        }
        tracing::trace!(rows = chunk.len(), "pulled chunk");
        Ok(Some(chunk))
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn is_exhausted(&self) -> bool {
        self.done
    }

    /// Number of items currently withheld as potential footer.
    pub fn withheld(&self) -> usize {
        self.footer.len()
    }
}
