use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamFileError {
    /// The filename does not follow the stream filename grammar.
    #[error("Invalid stream filename format: {0}")]
    InvalidFormat(String),
    /// The operation does not apply to this kind of stream file.
    #[error("Illegal state: {0}")]
    IllegalState(String),
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
}

pub type Result<T> = std::result::Result<T, StreamFileError>;
