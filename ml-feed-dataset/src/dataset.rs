//! Dataset construction and ownership

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use ml_feed_core::config::Config;
use ml_feed_core::error::{Error, Result};
use ml_feed_core::mode::Mode;
use ml_feed_engine::options::{BufferSize, Parallelism};

use crate::source::DatasetSource;

/// Default shuffle reservoir size
pub const DEFAULT_SHUFFLE_BUFFER_SIZE: usize = 64;

/// A dataset split bound to a configuration and a file list
///
/// Construction is eager: file discovery and batch-size resolution run
/// inside [`DatasetBuilder::build`] and any failure there is fatal.
/// After construction the instance is immutable and may be shared; each
/// call to a pipeline builder produces an independent pipeline.
pub struct Dataset<S: DatasetSource> {
    /// The dataset implementation
    source: Arc<S>,

    /// The owning configuration, read-only
    config: Config,

    /// The split this instance serves
    mode: Mode,

    /// Reservoir size for training-mode shuffling
    shuffle_buffer_size: usize,

    /// Prefetch capacity
    prefetch_buffer_size: BufferSize,

    /// Parallelism degree for the decode and augment stages
    map_parallelism: Parallelism,

    /// Discovered file paths, sorted lexicographically
    files: Vec<PathBuf>,

    /// Resolved batch size
    batch_size: usize,
}

impl<S: DatasetSource> std::fmt::Debug for Dataset<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("shuffle_buffer_size", &self.shuffle_buffer_size)
            .field("prefetch_buffer_size", &self.prefetch_buffer_size)
            .field("map_parallelism", &self.map_parallelism)
            .field("files", &self.files)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl<S: DatasetSource> Dataset<S> {
    /// Start building a dataset for the given source, configuration,
    /// and mode
    pub fn builder(source: S, config: Config, mode: Mode) -> DatasetBuilder<S> {
        DatasetBuilder {
            source,
            config,
            mode,
            shuffle_buffer_size: DEFAULT_SHUFFLE_BUFFER_SIZE,
            prefetch_buffer_size: BufferSize::Auto,
            map_parallelism: Parallelism::Auto,
        }
    }

    /// The split this dataset serves
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The discovered file paths, sorted lexicographically
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// The resolved batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The owning configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shuffle reservoir size used in training mode
    pub fn shuffle_buffer_size(&self) -> usize {
        self.shuffle_buffer_size
    }

    pub(crate) fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub(crate) fn prefetch_buffer_size(&self) -> BufferSize {
        self.prefetch_buffer_size
    }

    pub(crate) fn map_parallelism(&self) -> Parallelism {
        self.map_parallelism
    }
}

/// Builder for [`Dataset`]
pub struct DatasetBuilder<S: DatasetSource> {
    /// The dataset implementation
    source: S,

    /// The owning configuration
    config: Config,

    /// The split to serve
    mode: Mode,

    /// Reservoir size for training-mode shuffling
    shuffle_buffer_size: usize,

    /// Prefetch capacity
    prefetch_buffer_size: BufferSize,

    /// Parallelism degree for the decode and augment stages
    map_parallelism: Parallelism,
}

impl<S: DatasetSource> DatasetBuilder<S> {
    /// Set the shuffle reservoir size; must be positive
    pub fn shuffle_buffer_size(mut self, size: usize) -> Self {
        self.shuffle_buffer_size = size;
        self
    }

    /// Set the prefetch capacity
    pub fn prefetch_buffer_size(mut self, size: BufferSize) -> Self {
        self.prefetch_buffer_size = size;
        self
    }

    /// Set the parallelism degree for the decode and augment stages
    pub fn map_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.map_parallelism = parallelism;
        self
    }

    /// Validate the parameters, discover files, and resolve the batch
    /// size
    ///
    /// Fails when the shuffle buffer is zero, a tuning knob is invalid,
    /// discovery returns no files, or the batch size cannot be
    /// resolved.
    pub fn build(self) -> Result<Dataset<S>> {
        if self.shuffle_buffer_size == 0 {
            return Err(Error::InvalidArgument(
                "shuffle buffer size must be positive".into(),
            ));
        }
        self.map_parallelism.resolve()?;
        self.prefetch_buffer_size.resolve()?;

        let mut files = self.source.discover_files(&self.config, self.mode)?;
        if files.is_empty() {
            return Err(Error::NoFiles(format!("mode '{}'", self.mode)));
        }
        files.sort();

        let batch_size = self.source.batch_size(&self.config)?;

        debug!(
            target: "ml_feed::dataset",
            mode = %self.mode,
            files = files.len(),
            batch_size,
            shuffle_buffer_size = self.shuffle_buffer_size,
            "dataset constructed"
        );

        Ok(Dataset {
            source: Arc::new(self.source),
            config: self.config,
            mode: self.mode,
            shuffle_buffer_size: self.shuffle_buffer_size,
            prefetch_buffer_size: self.prefetch_buffer_size,
            map_parallelism: self.map_parallelism,
            files,
            batch_size,
        })
    }
}
