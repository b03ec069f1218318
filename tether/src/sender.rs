//! `RequestSender`, the posting half of a receiver.

use std::{fmt, sync::Arc};

use crate::request::Request;

/// Something that can move a boxed request toward its target.
pub(crate) trait Endpoint<T>: Send + Sync {
    fn post_boxed(&self, request: Box<dyn Request<T>>);
}

/// A cheap, clonable handle for posting [`Request`]s to a [`RequestReceiver`](crate::RequestReceiver).
///
/// Senders are `Send + Sync`, so they can be copied into any thread and posted from anywhere. They're weak: holding
/// one never keeps the receiver's target alive, and once the receiver is gone, anything posted is silently dropped
/// without being handled. Whether the receiver still exists is checked when the request reaches the front of the
/// dispatcher queue, not when it's posted.
///
/// Posts from one sender (or from several clones of it, used on one thread) are handled in order.
pub struct RequestSender<T> {
    endpoint: Arc<dyn Endpoint<T>>,
}

impl<T> Clone for RequestSender<T> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
        }
    }
}

impl<T> fmt::Debug for RequestSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(std::any::type_name::<Self>()).finish_non_exhaustive()
    }
}

impl<T: 'static> RequestSender<T> {
    pub(crate) fn from_endpoint(endpoint: Arc<dyn Endpoint<T>>) -> Self {
        Self { endpoint }
    }

    /// Queue a request for the target. Returns immediately; see the type docs for what happens next.
    pub fn post(&self, request: impl Request<T> + 'static) {
        self.post_boxed(Box::new(request))
    }

    /// The same as [`Self::post`], but with a request that's already boxed.
    pub fn post_boxed(&self, request: Box<dyn Request<T>>) {
        self.endpoint.post_boxed(request)
    }

    /// Make a sender addressing part of this sender's target.
    ///
    /// Requests posted through the new sender go through the same queue, in the same order relative to each other,
    /// and have the same lifetime rules; `f` is applied to the target just before each one is handled. This lets a
    /// dialog talk to e.g. one player's view of the session without knowing about the rest of it.
    pub fn convert<U, F>(&self, f: F) -> RequestSender<U>
    where
        U: 'static,
        F: Fn(&mut T) -> &mut U + Send + Sync + 'static,
    {
        RequestSender::from_endpoint(Arc::new(Converted {
            outer: self.clone(),
            map: Arc::new(f),
        }))
    }
}

struct Converted<T, U> {
    outer: RequestSender<T>,
    map: Arc<dyn Fn(&mut T) -> &mut U + Send + Sync>,
}

impl<T: 'static, U: 'static> Endpoint<U> for Converted<T, U> {
    fn post_boxed(&self, mut request: Box<dyn Request<U>>) {
        let map = self.map.clone();
        self.outer
            .post(move |target: &mut T| request.handle((*map)(target)));
    }
}
