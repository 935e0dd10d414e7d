//! Definition of errors.

use std::error::Error;
use std::fmt;

/// Error used when the argument is invalid.
///
/// This is the error a caller gets for framework-usage bugs, such as handing a DP state to a
/// stateless feature.
#[derive(Clone, Debug)]
pub struct InvalidArgumentError {
    msg: String,
}

/// Error used when a configuration file or an example line is malformed.
#[derive(Clone, Debug)]
pub struct InvalidFormatError {
    line: usize,
    msg: String,
}

/// Error used when an object is in a state that cannot serve the request.
#[derive(Clone, Debug)]
pub struct InvalidStateError {
    msg: &'static str,
}

/// Error used when a model grows beyond its index space.
#[derive(Clone, Debug)]
pub struct ModelScaleError {
    msg: &'static str,
}

/// Error used when the optimizer of a classifier fails.
#[derive(Clone, Debug)]
pub struct TrainingError {
    msg: String,
}

/// The error type for hgscore.
#[derive(Clone, Debug)]
pub enum HgscoreError {
    /// The error variant for [`InvalidArgumentError`].
    InvalidArgument(InvalidArgumentError),

    /// The error variant for [`InvalidFormatError`].
    InvalidFormat(InvalidFormatError),

    /// The error variant for [`InvalidStateError`].
    InvalidState(InvalidStateError),

    /// The error variant for [`ModelScaleError`].
    ModelScale(ModelScaleError),

    /// The error variant for [`TrainingError`].
    Training(TrainingError),
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}", self.msg)
    }
}

impl Error for InvalidArgumentError {}

impl fmt::Display for InvalidFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidFormatError: line {}: {}", self.line, self.msg)
    }
}

impl Error for InvalidFormatError {}

impl fmt::Display for InvalidStateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidStateError: {}", self.msg)
    }
}

impl Error for InvalidStateError {}

impl fmt::Display for ModelScaleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ModelScaleError: {}", self.msg)
    }
}

impl Error for ModelScaleError {}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TrainingError: {}", self.msg)
    }
}

impl Error for TrainingError {}

impl HgscoreError {
    /// Creates a new [`InvalidArgumentError`].
    pub fn invalid_argument<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError { msg: msg.into() })
    }

    /// Creates a new [`InvalidFormatError`] pointing at a 1-origin line number.
    pub fn invalid_format<S>(line: usize, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidFormat(InvalidFormatError {
            line,
            msg: msg.into(),
        })
    }

    /// Creates a new [`InvalidStateError`].
    pub const fn invalid_state(msg: &'static str) -> Self {
        Self::InvalidState(InvalidStateError { msg })
    }

    /// Creates a new [`ModelScaleError`].
    pub const fn model_scale(msg: &'static str) -> Self {
        Self::ModelScale(ModelScaleError { msg })
    }

    /// Creates a new [`TrainingError`].
    pub fn training<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Training(TrainingError { msg: msg.into() })
    }

    /// Returns `true` if this is an [`InvalidArgumentError`].
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

impl fmt::Display for HgscoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => e.fmt(f),
            Self::InvalidFormat(e) => e.fmt(f),
            Self::InvalidState(e) => e.fmt(f),
            Self::ModelScale(e) => e.fmt(f),
            Self::Training(e) => e.fmt(f),
        }
    }
}

impl Error for HgscoreError {}

/// A specialized Result type.
pub type Result<T, E = HgscoreError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_argument() {
        let e = HgscoreError::invalid_argument("state given to a stateless feature");
        assert!(e.is_invalid_argument());
        assert_eq!(
            "InvalidArgumentError: state given to a stateless feature",
            e.to_string()
        );
    }

    #[test]
    fn test_display_invalid_format() {
        let e = HgscoreError::invalid_format(3, "missing value");
        assert!(!e.is_invalid_argument());
        assert_eq!("InvalidFormatError: line 3: missing value", e.to_string());
    }
}
