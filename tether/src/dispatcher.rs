//! The queue abstraction everything else is built on.

use std::sync::Arc;

use crate::request::Task;

/// "Some thread's queue": accepts [`Task`]s from any thread and runs them on its own.
///
/// Implementations guarantee:
///
/// - every accepted task runs exactly once, on the dispatcher's thread, unless the dispatcher shuts down first, in
///   which case the task is dropped without running;
/// - tasks posted from one thread run in the order they were posted;
/// - tasks never run concurrently with each other.
///
/// Posting never blocks and never fails loudly. Posting to a dispatcher which has shut down drops the task right away.
///
/// The builtin implementations are [`RequestThread`](crate::RequestThread)'s dispatcher, for a worker thread, and
/// [`Root::dispatcher`](crate::ui::Root::dispatcher), for the UI thread.
pub trait RequestDispatcher: Send + Sync {
    fn post_task(&self, task: Task);
}

/// A shared handle to some [`RequestDispatcher`], as stored in receivers and senders.
pub type Dispatcher = Arc<dyn RequestDispatcher>;
