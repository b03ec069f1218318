//! Senders which come with a private helper object living next to the target.
//!
//! Sometimes one client of the session needs state of its own on the worker side: a cursor into the turn history,
//! a cached view of one player's units, a scratch buffer. Storing that in the session itself means every client
//! pays for every other client's state. Instead, a [`SlaveRequestSender`] owns a "slave" object which is built on the
//! worker thread the first time it's needed, handed to every request posted through that sender, and retired when
//! the sender goes away.

use std::{
    fmt, mem,
    sync::{Arc, Mutex},
};

use tracing::trace;

use crate::{receiver::lock, RequestSender};

/// A per-sender helper object for a session `T`. See the [module docs](self).
///
/// Both hooks run on the worker thread, with the session available.
pub trait SlaveObject<T>: Send {
    /// Called right after the slave is built, before it handles anything.
    fn init(&mut self, _session: &mut T) {}
    /// Called when the owning [`SlaveRequestSender`] is dropped, after every request it posted.
    fn done(&mut self, _session: &mut T) {}
}

/// A single piece of work against a session `T` and this sender's slave `S`.
///
/// This is [`Request`](crate::Request) with an extra argument, and the same rules apply: `handle` is called at most
/// once, on the worker thread, and the request is dropped afterwards whether or not it ran.
pub trait SlaveRequest<T, S>: Send {
    fn handle(&mut self, session: &mut T, slave: &mut S);
}

impl<T, S, F: FnMut(&mut T, &mut S) + Send> SlaveRequest<T, S> for F {
    fn handle(&mut self, session: &mut T, slave: &mut S) {
        self(session, slave)
    }
}

type Factory<T, S> = Box<dyn FnOnce(&mut T) -> S + Send>;

enum SlaveSlot<T, S> {
    Pending(Factory<T, S>),
    Ready(S),
    Retired,
}

impl<T, S: SlaveObject<T>> SlaveSlot<T, S> {
    /// Get the slave, building it first if this is the first time.
    fn ready(&mut self, session: &mut T) -> Option<&mut S> {
        if matches!(self, Self::Pending(_)) {
            if let Self::Pending(factory) = mem::replace(self, Self::Retired) {
                let mut slave = factory(session);
                slave.init(session);
                *self = Self::Ready(slave);
            }
        }
        match self {
            Self::Ready(slave) => Some(slave),
            _ => None,
        }
    }

    fn retire(&mut self, session: &mut T) {
        if let Self::Ready(mut slave) = mem::replace(self, Self::Retired) {
            slave.done(session);
        }
    }
}

/// Posts [`SlaveRequest`]s to a session through a master [`RequestSender`], pairing each with this sender's slave.
///
/// The slave is built by the factory on the worker thread, lazily, right before the first request posted through
/// this sender is handled; if nothing is ever handled, it's never built. Dropping the sender posts one last request
/// which calls [`SlaveObject::done`] and drops the slave, so it's retired on the worker thread too, after everything
/// posted before it.
///
/// All the weak-reference rules of the master sender apply: if the session is gone, requests (including the
/// retirement) are silently dropped.
pub struct SlaveRequestSender<T: 'static, S: SlaveObject<T> + 'static> {
    master: RequestSender<T>,
    slot: Arc<Mutex<SlaveSlot<T, S>>>,
}

impl<T: 'static, S: SlaveObject<T> + 'static> SlaveRequestSender<T, S> {
    /// Make a new sender with its own slave, built by `factory` when first needed.
    pub fn new(master: RequestSender<T>, factory: impl FnOnce(&mut T) -> S + Send + 'static) -> Self {
        Self {
            master,
            slot: Arc::new(Mutex::new(SlaveSlot::Pending(Box::new(factory)))),
        }
    }

    /// The sender this one posts through.
    pub fn master(&self) -> &RequestSender<T> {
        &self.master
    }

    /// Queue a request for the session and slave. Returns immediately.
    pub fn post(&self, request: impl SlaveRequest<T, S> + 'static) {
        self.post_boxed(Box::new(request))
    }

    /// The same as [`Self::post`], but with a request that's already boxed.
    pub fn post_boxed(&self, mut request: Box<dyn SlaveRequest<T, S>>) {
        let slot = self.slot.clone();
        self.master.post(move |session: &mut T| {
            let mut slot = lock(&slot);
            match slot.ready(session) {
                Some(slave) => request.handle(session, slave),
                None => trace!(slave = std::any::type_name::<S>(), "slave retired, dropping request"),
            }
        });
    }
}

impl<T: 'static, S: SlaveObject<T> + 'static> Drop for SlaveRequestSender<T, S> {
    fn drop(&mut self) {
        let slot = self.slot.clone();
        self.master
            .post(move |session: &mut T| lock(&slot).retire(session));
    }
}

impl<T: 'static, S: SlaveObject<T> + 'static> fmt::Debug for SlaveRequestSender<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *lock(&self.slot) {
            SlaveSlot::Pending(_) => "pending",
            SlaveSlot::Ready(_) => "ready",
            SlaveSlot::Retired => "retired",
        };
        f.debug_struct(std::any::type_name::<Self>())
            .field("slave", &state)
            .finish()
    }
}
