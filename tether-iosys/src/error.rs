use std::borrow::Cow;

/// Anything that can go wrong talking to a display or input device.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An `io::Error` occurred.
    #[error("display I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The backend has already been [stopped](crate::IoSystem::stop).
    #[error("the I/O system was already stopped")]
    Stopped,
    /// Just directly contains an error message.
    #[error("{0}")]
    Bare(Cow<'static, str>),
}

impl From<&'static str> for Error {
    fn from(value: &'static str) -> Self {
        Self::Bare(Cow::Borrowed(value))
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Self::Bare(Cow::Owned(value))
    }
}

pub type Result<T> = core::result::Result<T, Error>;
