//! Record-and-replay cache operator

use ml_feed_core::error::Result;
use tracing::debug;

use crate::stream::Stream;

enum CacheState {
    /// First pass: items are recorded as they flow through
    Filling,
    /// The recording is complete; passes replay it
    Sealed,
}

/// A stream that records its first complete pass and replays it on
/// every later pass
///
/// While filling, items flow through unchanged and are recorded. Once
/// the inner stream reports exhaustion the recording is sealed; after a
/// reset the stream replays the recording without pulling the inner
/// stream again. A reset before the first pass completes discards the
/// partial recording and recomputes from the inner stream.
///
/// The recording lives in memory and dies with the operator.
pub struct CacheStream<S: Stream>
where
    S::Item: Clone,
{
    /// The stream being cached
    inner: S,

    /// Recorded items
    store: Vec<S::Item>,

    /// Whether the recording is still being built
    state: CacheState,

    /// Replay cursor, valid when sealed
    replay_position: usize,
}

impl<S: Stream> CacheStream<S>
where
    S::Item: Clone,
{
    /// Create a new cache over the inner stream
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            store: Vec::new(),
            state: CacheState::Filling,
            replay_position: 0,
        }
    }

    /// Whether the first pass has completed
    pub fn is_sealed(&self) -> bool {
        matches!(self.state, CacheState::Sealed)
    }
}

impl<S: Stream> Stream for CacheStream<S>
where
    S::Item: Clone,
{
    type Item = S::Item;

    fn next(&mut self) -> Result<Option<S::Item>> {
        match self.state {
            CacheState::Sealed => {
                if self.replay_position >= self.store.len() {
                    return Ok(None);
                }
                let item = self.store[self.replay_position].clone();
                self.replay_position += 1;
                Ok(Some(item))
            }
            CacheState::Filling => match self.inner.next()? {
                Some(item) => {
                    self.store.push(item.clone());
                    Ok(Some(item))
                }
                None => {
                    debug!(target: "ml_feed::engine", items = self.store.len(), "cache sealed");
                    self.state = CacheState::Sealed;
                    self.replay_position = self.store.len();
                    Ok(None)
                }
            },
        }
    }

    fn reset(&mut self) -> Result<()> {
        match self.state {
            CacheState::Sealed => {
                self.replay_position = 0;
                Ok(())
            }
            CacheState::Filling => {
                self.store.clear();
                self.inner.reset()
            }
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.state {
            CacheState::Sealed => Some(self.store.len()),
            CacheState::Filling => self.inner.size_hint(),
        }
    }
}
