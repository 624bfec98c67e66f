//! Order-preserving parallel map operator

use std::collections::VecDeque;
use std::sync::Arc;

use rayon::prelude::*;

use ml_feed_core::error::Result;

use crate::stream::Stream;

/// Shared fallible mapping function
pub type MapFn<I, O> = Arc<dyn Fn(I) -> Result<O> + Send + Sync>;

/// A stream applying a fallible function to every item, with up to a
/// fixed number of concurrent invocations
///
/// Items are pulled from the inner stream in windows of the parallelism
/// degree and evaluated on the rayon pool. Output order equals input
/// order regardless of internal evaluation order. An error raised by
/// the function is reported at the failing item's position and ends the
/// stream until reset.
pub struct ParMapStream<S: Stream, O: Send + 'static> {
    /// The stream being mapped
    inner: S,

    /// The mapping function
    func: MapFn<S::Item, O>,

    /// Maximum concurrent invocations
    degree: usize,

    /// Mapped results awaiting emission, in input order
    ready: VecDeque<Result<O>>,

    /// Set once the stream stops producing (exhaustion or error)
    finished: bool,
}

impl<S: Stream, O: Send + 'static> ParMapStream<S, O> {
    /// Create a new parallel map with the given resolved degree
    pub fn new(inner: S, func: MapFn<S::Item, O>, degree: usize) -> Self {
        Self {
            inner,
            func,
            degree: degree.max(1),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    fn refill(&mut self) -> Result<()> {
        let mut window = Vec::with_capacity(self.degree);
        while window.len() < self.degree {
            match self.inner.next()? {
                Some(item) => window.push(item),
                None => break,
            }
        }

        if window.is_empty() {
            self.finished = true;
            return Ok(());
        }

        let func = Arc::clone(&self.func);
        if self.degree == 1 {
            self.ready.extend(window.into_iter().map(|item| func(item)));
        } else {
            let results: Vec<Result<O>> =
                window.into_par_iter().map(|item| func(item)).collect();
            self.ready.extend(results);
        }

        Ok(())
    }
}

impl<S: Stream, O: Send + 'static> Stream for ParMapStream<S, O> {
    type Item = O;

    fn next(&mut self) -> Result<Option<O>> {
        if self.ready.is_empty() && !self.finished {
            self.refill()?;
        }

        match self.ready.pop_front() {
            Some(Ok(item)) => Ok(Some(item)),
            Some(Err(e)) => {
                self.ready.clear();
                self.finished = true;
                Err(e)
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.ready.clear();
        self.finished = false;
        self.inner.reset()
    }

    fn size_hint(&self) -> Option<usize> {
        self.inner.size_hint()
    }
}
