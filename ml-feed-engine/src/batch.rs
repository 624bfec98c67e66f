//! Fixed-size batching operator

use ml_feed_core::error::{Error, Result};

use crate::options::PartialBatch;
use crate::stream::Stream;

/// A stream grouping consecutive items into fixed-size batches
///
/// The final batch may be short when the item count is not a multiple
/// of the batch size; [`PartialBatch`] decides whether it is emitted or
/// discarded.
pub struct BatchStream<S: Stream> {
    /// The stream being batched
    inner: S,

    /// Number of items per batch
    batch_size: usize,

    /// Final partial batch policy
    partial: PartialBatch,
}

impl<S: Stream> BatchStream<S> {
    /// Create a new batching stage over the inner stream
    pub fn new(inner: S, batch_size: usize, partial: PartialBatch) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be positive".into()));
        }

        Ok(Self {
            inner,
            batch_size,
            partial,
        })
    }
}

impl<S: Stream> Stream for BatchStream<S> {
    type Item = Vec<S::Item>;

    fn next(&mut self) -> Result<Option<Vec<S::Item>>> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.inner.next()? {
                Some(item) => batch.push(item),
                None => break,
            }
        }

        if batch.is_empty() {
            return Ok(None);
        }

        if batch.len() < self.batch_size && self.partial == PartialBatch::Drop {
            return Ok(None);
        }

        Ok(Some(batch))
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reset()
    }

    fn size_hint(&self) -> Option<usize> {
        self.inner.size_hint().map(|n| match self.partial {
            PartialBatch::Keep => n.div_ceil(self.batch_size),
            PartialBatch::Drop => n / self.batch_size,
        })
    }
}
