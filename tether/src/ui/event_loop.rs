use std::sync::{
    atomic::{AtomicBool, AtomicI32, Ordering},
    Arc,
};

use tracing::trace;

use super::Root;

#[derive(Default)]
struct LoopState {
    stopped: AtomicBool,
    code: AtomicI32,
}

/// Stops an [`EventLoop`] from anywhere. Cheap to clone, and `Send`, so it can ride along inside requests.
#[derive(Clone)]
pub struct LoopHandle(Arc<LoopState>);

impl LoopHandle {
    /// Make the loop return `code` once it finishes handling the current event.
    pub fn stop(&self, code: i32) {
        self.0.code.store(code, Ordering::Release);
        self.0.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.stopped.load(Ordering::Acquire)
    }
}

/// A blocking run loop on the UI thread: pumps a [`Root`] until it's told to stop.
///
/// Loops nest. Running one from inside a widget handler, a timer, or a UI task keeps the whole UI alive (input,
/// timers, redraws, and other tasks all keep being handled) while that code waits; this is what lets a
/// [`Downlink`](crate::Downlink) call look synchronous.
///
/// A stop requested before [`Self::run`] makes the next `run` return right away. Each `run` consumes the stop, so
/// the loop can be run again.
pub struct EventLoop {
    root: Root,
    state: LoopHandle,
}

impl EventLoop {
    pub fn new(root: &Root) -> Self {
        Self {
            root: root.clone(),
            state: LoopHandle(Arc::new(LoopState::default())),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.state.clone()
    }

    pub fn stop(&self, code: i32) {
        self.state.stop(code)
    }

    /// Handle events until stopped, then return the stop's code.
    pub fn run(&self) -> i32 {
        let mut events = 0usize;
        while !self.state.is_stopped() {
            self.root.handle_event();
            events += 1;
        }
        self.state.0.stopped.store(false, Ordering::Release);
        let code = self.state.0.code.swap(0, Ordering::AcqRel);
        trace!(events, code, "event loop stopped");
        code
    }
}
