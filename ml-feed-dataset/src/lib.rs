//! Dataset abstractions and pipeline building for ml-feed
//!
//! This crate defines the contract dataset implementations supply
//! ([`DatasetSource`]), the eagerly validated [`Dataset`] owner, and
//! the pipeline builder that composes the engine's operators into the
//! standard loading flow: discover → sort → filter → decode → cache →
//! augment → shuffle → batch → prefetch.

#![warn(missing_docs)]

pub mod dataset;
pub mod pipeline;
pub mod record_file;
pub mod source;

// Re-export key types for convenience
pub use dataset::{Dataset, DatasetBuilder, DEFAULT_SHUFFLE_BUFFER_SIZE};
pub use pipeline::{PathPredicate, Pipeline, PipelineIter, PipelineOptions};
pub use record_file::{LabeledExample, RecordFileDataset, TensorRecord};
pub use source::DatasetSource;
