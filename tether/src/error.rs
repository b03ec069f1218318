/// Everything which can fail while setting up the request machinery.
///
/// Note what's *not* here: posting and calling never fail loudly. A request to a dead receiver is dropped, and a
/// [`Downlink::call`](crate::Downlink::call) that couldn't run just returns `None`.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The IO system failed to start or draw.
    #[error(transparent)]
    Io(#[from] tether_iosys::Error),
    /// The OS refused to start a [`RequestThread`](crate::RequestThread).
    #[error("couldn't spawn request thread: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
