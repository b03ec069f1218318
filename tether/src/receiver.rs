//! `RequestReceiver`, the owner of a request target.

use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use tracing::trace;

use crate::{
    dispatcher::Dispatcher,
    request::Request,
    sender::{Endpoint, RequestSender},
};

/// Owns a target object for its whole life, and turns requests posted to it into calls on the dispatcher's thread.
///
/// All requests run on the dispatcher the receiver was created with, one at a time, never concurrently with each
/// other. The target is dropped when the receiver is; anything posted after that is dropped unhandled.
///
/// The target is only ever touched from the dispatcher's thread, by requests, and from whoever owns the receiver,
/// through [`Self::with`]. Usually the receiver lives on the dispatcher's thread too, so those never contend.
///
/// A request may run a nested event loop, e.g. by making a [`Downlink`](crate::Downlink) call from a UI-side
/// receiver. Requests for the same receiver which come up inside that loop are held back, and handled in order right
/// after the outer request returns.
pub struct RequestReceiver<T> {
    target: Arc<Mutex<T>>,
    sender: RequestSender<T>,
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // a poisoned target means a request panicked on a non-fatal dispatcher; the target is as consistent as that
    // request left it, which is all anyone could promise anyway
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Send + 'static> RequestReceiver<T> {
    /// Take ownership of `target`, handling requests for it on `dispatcher`.
    pub fn new(dispatcher: Dispatcher, target: T) -> Self {
        let target = Arc::new(Mutex::new(target));
        let sender = RequestSender::from_endpoint(Arc::new(Direct {
            dispatcher,
            inbox: Arc::new(Inbox {
                target: Arc::downgrade(&target),
                handling: AtomicBool::new(false),
                deferred: Mutex::new(VecDeque::new()),
            }),
        }));
        Self { target, sender }
    }

    /// Get a sender which posts to this receiver.
    pub fn sender(&self) -> RequestSender<T> {
        self.sender.clone()
    }

    /// Access the target directly.
    ///
    /// Call this from the dispatcher's own thread. From anywhere else it works, but blocks while a request is being
    /// handled, which is exactly what posting requests is meant to avoid. Don't call it from inside one of this
    /// receiver's own requests: the target is already borrowed there.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut target = lock(&self.target);
        f(&mut *target)
    }
}

impl<T> fmt::Debug for RequestReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(std::any::type_name::<Self>())
            .field("senders", &Arc::weak_count(&self.target))
            .finish()
    }
}

struct Direct<T> {
    dispatcher: Dispatcher,
    inbox: Arc<Inbox<T>>,
}

/// Delivery state shared by every task headed for one target.
struct Inbox<T> {
    target: Weak<Mutex<T>>,
    /// Set while one of this target's requests is running. A dispatcher runs one task at a time, so seeing it set
    /// from another task means that task was started by a nested event loop inside the running request.
    handling: AtomicBool,
    deferred: Mutex<VecDeque<Box<dyn Request<T>>>>,
}

impl<T> Inbox<T> {
    fn deliver(&self, request: Box<dyn Request<T>>) {
        if self.handling.swap(true, Ordering::AcqRel) {
            trace!(
                receiver = std::any::type_name::<T>(),
                "target busy further up the stack, deferring request"
            );
            lock(&self.deferred).push_back(request);
            return;
        }
        let mut request = request;
        loop {
            match self.target.upgrade() {
                Some(target) => request.handle(&mut *lock(&target)),
                None => trace!(
                    receiver = std::any::type_name::<T>(),
                    "receiver gone, dropping request"
                ),
            }
            drop(request);
            let next = lock(&self.deferred).pop_front();
            match next {
                Some(next) => request = next,
                None => break,
            }
        }
        self.handling.store(false, Ordering::Release);
    }
}

impl<T: Send + 'static> Endpoint<T> for Direct<T> {
    fn post_boxed(&self, request: Box<dyn Request<T>>) {
        let inbox = self.inbox.clone();
        self.dispatcher
            .post_task(Box::new(move || inbox.deliver(request)));
    }
}
