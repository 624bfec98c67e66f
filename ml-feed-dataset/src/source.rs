//! Dataset capability trait

use std::path::{Path, PathBuf};

use ml_feed_core::config::{Config, DEFAULT_SECTION};
use ml_feed_core::error::{Error, Result};
use ml_feed_core::mode::Mode;

/// The capabilities a dataset implementation supplies
///
/// Required capabilities are `discover_files` and `load_example`;
/// conformance is checked at compile time. `augment_example` and
/// `batch_size` carry default behavior and are overridden as needed.
pub trait DatasetSource: Send + Sync + 'static {
    /// The per-example payload flowing through pipelines
    type Example: Clone + Send + 'static;

    /// Produce the source file paths for this configuration and mode
    ///
    /// The returned order does not matter; paths are sorted
    /// lexicographically before streaming.
    fn discover_files(&self, config: &Config, mode: Mode) -> Result<Vec<PathBuf>>;

    /// Decode one source file into one example
    ///
    /// The output of this stage is what a cache-enabled pipeline
    /// stores, so it must be deterministic across passes: anything that
    /// should vary between epochs belongs in [`augment_example`].
    ///
    /// [`augment_example`]: DatasetSource::augment_example
    fn load_example(&self, path: &Path) -> Result<Self::Example>;

    /// Transform an example after the cache read
    ///
    /// Runs after any cache stage, so randomized augmentation placed
    /// here is never cached. The default is the identity passthrough.
    fn augment_example(&self, example: Self::Example) -> Result<Self::Example> {
        Ok(example)
    }

    /// Resolve the batch size from the configuration
    ///
    /// The default reads the integer `bs` from the default section.
    /// Override this for schemes where the effective batch size is
    /// computed differently (for example, per-mode batch sizes or
    /// variable-length batching).
    fn batch_size(&self, config: &Config) -> Result<usize> {
        if !config.contains(DEFAULT_SECTION, "bs") {
            return Err(Error::BatchSizeUnspecified(
                "set 'bs' in the configuration's default section, \
                 or override batch_size to resolve a value another way"
                    .into(),
            ));
        }

        let batch_size = config.get_int_default("bs")?;
        if batch_size <= 0 {
            return Err(Error::InvalidArgument(format!(
                "batch size must be positive, got {}",
                batch_size
            )));
        }
        Ok(batch_size as usize)
    }
}
