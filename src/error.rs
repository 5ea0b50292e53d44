use thiserror::Error;

pub type Result<T, E = FeaturizerError> = core::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeaturizerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),
    #[error("Missing annotation `{name}` for column {column}")]
    MissingAnnotation { name: String, column: usize },
}
impl FeaturizerError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::CorruptArchive(_) => ErrorKind::CorruptArchive,
            Self::MissingAnnotation { .. } => ErrorKind::MissingAnnotation,
        }
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
    pub(crate) fn corrupt_archive(msg: impl Into<String>) -> Self {
        Self::CorruptArchive(msg.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A structurally invalid parameter; detected before any state mutation.
    InvalidArgument,
    /// The operation is forbidden in the current lifecycle state.
    InvalidState,
    /// The archive ran out of bytes or carries an unexpected version stamp.
    CorruptArchive,
    /// An upstream statistic was never published.
    MissingAnnotation,
}
