//! Background-thread prefetch operator

use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver};
use tracing::debug;

use ml_feed_core::error::{Error, Result};

use crate::stream::Stream;

/// A stream that produces its inner stream's items on a background
/// thread, ahead of consumption
///
/// The worker owns the inner stream and pushes items through a bounded
/// channel of the configured capacity, so production of upcoming items
/// overlaps the consumer's processing of the current one. Exhaustion
/// and errors are forwarded in-band. `reset` tears the worker down,
/// recovers the inner stream, rewinds it, and respawns on the next
/// pull. Dropping the stream stops the worker.
pub struct PrefetchStream<S: Stream + 'static> {
    /// The inner stream, held while no worker is running
    idle: Option<S>,

    /// The running worker, if any
    worker: Option<Worker<S>>,

    /// Channel capacity (items held in flight)
    capacity: usize,

    /// Whether the current pass has finished
    finished: bool,
}

struct Worker<S: Stream> {
    receiver: Receiver<Result<Option<S::Item>>>,
    handle: JoinHandle<S>,
}

impl<S: Stream + 'static> PrefetchStream<S> {
    /// Create a new prefetch stage with the given resolved capacity
    pub fn new(inner: S, capacity: usize) -> Self {
        Self {
            idle: Some(inner),
            worker: None,
            capacity: capacity.max(1),
            finished: false,
        }
    }

    fn spawn(&mut self) -> Result<()> {
        let mut source = self.idle.take().ok_or_else(|| {
            Error::PipelineExecution("prefetch source unavailable after worker failure".into())
        })?;
        let (sender, receiver) = bounded(self.capacity);

        let handle = std::thread::spawn(move || {
            loop {
                match source.next() {
                    Ok(Some(item)) => {
                        if sender.send(Ok(Some(item))).is_err() {
                            // Consumer went away
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = sender.send(Ok(None));
                        break;
                    }
                    Err(e) => {
                        let _ = sender.send(Err(e));
                        break;
                    }
                }
            }
            source
        });

        debug!(target: "ml_feed::engine", capacity = self.capacity, "prefetch worker started");
        self.worker = Some(Worker { receiver, handle });
        Ok(())
    }

    fn reclaim(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            drop(worker.receiver);
            let source = worker
                .handle
                .join()
                .map_err(|_| Error::PipelineExecution("prefetch worker panicked".into()))?;
            self.idle = Some(source);
        }
        Ok(())
    }
}

impl<S: Stream + 'static> Stream for PrefetchStream<S> {
    type Item = S::Item;

    fn next(&mut self) -> Result<Option<S::Item>> {
        if self.finished {
            return Ok(None);
        }

        if self.worker.is_none() {
            self.spawn()?;
        }

        let received = match &self.worker {
            Some(worker) => worker.receiver.recv(),
            None => return Ok(None),
        };
        match received {
            Ok(Ok(Some(item))) => Ok(Some(item)),
            Ok(Ok(None)) => {
                self.finished = true;
                self.reclaim()?;
                Ok(None)
            }
            Ok(Err(e)) => {
                self.finished = true;
                self.reclaim()?;
                Err(e)
            }
            Err(_) => {
                self.finished = true;
                self.reclaim()?;
                Err(Error::PipelineExecution(
                    "prefetch worker terminated unexpectedly".into(),
                ))
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.finished = false;
        self.reclaim()?;
        if let Some(source) = self.idle.as_mut() {
            source.reset()?;
        }
        Ok(())
    }
}

impl<S: Stream + 'static> Drop for PrefetchStream<S> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            drop(worker.receiver);
            let _ = worker.handle.join();
        }
    }
}
