//! Predicate filter operator

use std::sync::Arc;

use ml_feed_core::error::Result;

use crate::stream::Stream;

/// Shared filter predicate over borrowed items
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A stream retaining only items that match a predicate
///
/// Order preserving; carries no state across resets.
pub struct FilterStream<S: Stream> {
    /// The stream being filtered
    inner: S,

    /// The retention predicate
    predicate: Predicate<S::Item>,
}

impl<S: Stream> FilterStream<S> {
    /// Create a new filter over the inner stream
    pub fn new(inner: S, predicate: Predicate<S::Item>) -> Self {
        Self { inner, predicate }
    }
}

impl<S: Stream> Stream for FilterStream<S> {
    type Item = S::Item;

    fn next(&mut self) -> Result<Option<S::Item>> {
        loop {
            match self.inner.next()? {
                Some(item) if (self.predicate)(&item) => return Ok(Some(item)),
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reset()
    }
}
