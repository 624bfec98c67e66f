//! Streaming execution engine for ml-feed data pipelines
//!
//! This crate provides the operator set pipelines are composed from: an
//! in-memory slice source, predicate filtering, order-preserving
//! parallel mapping, record-and-replay caching, windowed shuffling,
//! fixed-size batching, and background-thread prefetching. Every
//! operator implements the restartable [`Stream`] contract and
//! preserves element order except the shuffle.

#![warn(missing_docs)]

pub mod batch;
pub mod cache;
pub mod filter;
pub mod options;
pub mod par_map;
pub mod prefetch;
pub mod shuffle;
pub mod stream;

// Re-export key types for convenience
pub use batch::BatchStream;
pub use cache::CacheStream;
pub use filter::{FilterStream, Predicate};
pub use options::{BufferSize, Parallelism, PartialBatch};
pub use par_map::{MapFn, ParMapStream};
pub use prefetch::PrefetchStream;
pub use shuffle::ShuffleStream;
pub use stream::{BoxStream, SliceStream, Stream};
