/// Crate-wide result alias.
pub type MontageResult<T> = Result<T, MontageError>;

/// Errors surfaced by compositing, probing and encoding operations.
///
/// Every failure is reported to the caller of the top-level operation; nothing
/// is swallowed, and no operation retries. Failures are permanent for a given
/// input.
#[derive(thiserror::Error, Debug)]
pub enum MontageError {
    /// Non-positive dimensions or malformed numeric option values.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Input bytes are not a recognized or decodable image.
    #[error("format error: {0}")]
    Format(String),

    /// The requested output format or extension is not an encode target.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An operation was attempted on a session or canvas after its bounded
    /// lifetime ended.
    #[error("used outside scope: {0}")]
    UsedOutsideScope(String),

    /// A canvas backend does not implement a required capability.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Underlying file system failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other collaborator failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MontageError {
    /// Construct a [`MontageError::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Construct a [`MontageError::Format`].
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Construct a [`MontageError::UnsupportedFormat`].
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Construct a [`MontageError::UsedOutsideScope`].
    pub fn used_outside_scope(msg: impl Into<String>) -> Self {
        Self::UsedOutsideScope(msg.into())
    }

    /// Construct a [`MontageError::NotImplemented`].
    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }
}
