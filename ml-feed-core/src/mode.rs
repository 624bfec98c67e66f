//! Dataset split modes

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The split a dataset instance serves.
///
/// The mode decides whether the built pipeline shuffles (training only)
/// and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Training split; pipelines shuffle
    Train,
    /// Validation split; pipelines preserve sorted order
    Validation,
    /// Test split; pipelines preserve sorted order
    Test,
}

impl Mode {
    /// Whether this mode shuffles examples during pipeline iteration
    pub fn is_train(self) -> bool {
        matches!(self, Mode::Train)
    }

    /// The lowercase name of this mode
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Train => "train",
            Mode::Validation => "validation",
            Mode::Test => "test",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Mode::Train),
            "validation" => Ok(Mode::Validation),
            "test" => Ok(Mode::Test),
            other => Err(Error::InvalidMode {
                provided: other.to_string(),
            }),
        }
    }
}
