//! Windowed shuffle operator

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ml_feed_core::error::{Error, Result};

use crate::stream::Stream;

/// A stream emitting items in pseudo-random order from a bounded
/// reservoir
///
/// The reservoir is topped up to `buffer_size` items from the inner
/// stream, then a uniformly random occupant is emitted. An item can
/// therefore surface at most `buffer_size` positions away from where
/// the inner stream produced it; the shuffle is a full permutation only
/// when the reservoir covers the whole stream.
///
/// With a fixed seed the emission order is a pure function of the inner
/// stream's content, the buffer size, and the seed; `reset` reseeds so
/// every pass over a seeded stream repeats the same order. Without a
/// seed each pass draws fresh OS entropy.
pub struct ShuffleStream<S: Stream> {
    /// The stream being shuffled
    inner: S,

    /// The reservoir of pending items
    buffer: Vec<S::Item>,

    /// Reservoir capacity
    buffer_size: usize,

    /// Fixed seed, if any
    seed: Option<u64>,

    /// Random source for occupant selection
    rng: StdRng,
}

impl<S: Stream> ShuffleStream<S> {
    /// Create a new windowed shuffle over the inner stream
    pub fn new(inner: S, buffer_size: usize, seed: Option<u64>) -> Result<Self> {
        if buffer_size == 0 {
            return Err(Error::InvalidArgument(
                "shuffle buffer size must be positive".into(),
            ));
        }

        Ok(Self {
            inner,
            buffer: Vec::with_capacity(buffer_size),
            buffer_size,
            seed,
            rng: Self::make_rng(seed),
        })
    }

    fn make_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl<S: Stream> Stream for ShuffleStream<S> {
    type Item = S::Item;

    fn next(&mut self) -> Result<Option<S::Item>> {
        while self.buffer.len() < self.buffer_size {
            match self.inner.next()? {
                Some(item) => self.buffer.push(item),
                None => break,
            }
        }

        if self.buffer.is_empty() {
            return Ok(None);
        }

        let index = self.rng.gen_range(0..self.buffer.len());
        Ok(Some(self.buffer.swap_remove(index)))
    }

    fn reset(&mut self) -> Result<()> {
        self.buffer.clear();
        self.rng = Self::make_rng(self.seed);
        self.inner.reset()
    }

    fn size_hint(&self) -> Option<usize> {
        self.inner.size_hint()
    }
}
