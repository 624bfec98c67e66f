//! Tuning knobs for pipeline stages

use ml_feed_core::error::{Error, Result};

/// Parallelism degree for a mapped stage
///
/// `Auto` defers the choice to the engine, which resolves it to the
/// logical CPU count at pipeline-build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parallelism {
    /// Engine-chosen degree (logical CPU count)
    Auto,
    /// Fixed number of concurrent invocations; must be positive
    Degree(usize),
}

impl Parallelism {
    /// Resolve to a concrete degree
    pub fn resolve(self) -> Result<usize> {
        match self {
            Parallelism::Auto => Ok(num_cpus::get().max(1)),
            Parallelism::Degree(0) => Err(Error::InvalidArgument(
                "parallelism degree must be positive".into(),
            )),
            Parallelism::Degree(n) => Ok(n),
        }
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::Auto
    }
}

/// Capacity of a buffering stage
///
/// `Auto` resolves to 2, enough to overlap producing the next item with
/// consuming the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSize {
    /// Engine-chosen capacity (double buffering)
    Auto,
    /// Fixed capacity in elements; must be positive
    Elements(usize),
}

impl BufferSize {
    /// Resolve to a concrete capacity
    pub fn resolve(self) -> Result<usize> {
        match self {
            BufferSize::Auto => Ok(2),
            BufferSize::Elements(0) => Err(Error::InvalidArgument(
                "buffer size must be positive".into(),
            )),
            BufferSize::Elements(n) => Ok(n),
        }
    }
}

impl Default for BufferSize {
    fn default() -> Self {
        BufferSize::Auto
    }
}

/// Policy for the final batch when the item count is not a multiple of
/// the batch size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialBatch {
    /// Emit the short final batch
    Keep,
    /// Discard the short final batch
    Drop,
}

impl Default for PartialBatch {
    fn default() -> Self {
        PartialBatch::Keep
    }
}
