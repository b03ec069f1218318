//! `RequestThread`, a dispatcher with a dedicated worker thread.

use std::{
    panic::{self, AssertUnwindSafe},
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error, info_span, trace};

use crate::{
    dispatcher::{Dispatcher, RequestDispatcher},
    request::Task,
    Error, Result,
};

enum Job {
    Run(Task),
    Stop,
}

struct ThreadDispatcher {
    name: Arc<str>,
    jobs: Sender<Job>,
    stopping: Arc<AtomicBool>,
}

impl RequestDispatcher for ThreadDispatcher {
    fn post_task(&self, task: Task) {
        if let Err(rejected) = self.jobs.send(Job::Run(task)) {
            trace!(thread = %self.name, "request thread stopped, dropping task");
            drop(rejected);
        }
    }
}

/// A [`RequestDispatcher`] which runs its tasks on a thread of its own, e.g. the session thread.
///
/// Dropping the `RequestThread` stops it: the task it's running (if any) finishes, everything still queued is dropped
/// without running, and then the thread is joined. The stop doesn't wait its turn in the queue. Anything posted
/// afterwards is dropped right away. Requests that get dropped this way never have `handle` called, which is exactly
/// what [`Downlink`](crate::Downlink) needs to notice and report failure.
///
/// # Panics
///
/// A task panicking on a request thread is treated as fatal: the panic is logged and the process aborts. Requests
/// are expected to report failure through their own result data; a panic here means the session thread's state can
/// no longer be trusted, and there's no sensible thread to report it to.
pub struct RequestThread {
    dispatcher: Arc<ThreadDispatcher>,
    handle: Option<JoinHandle<()>>,
}

impl RequestThread {
    /// Start a new request thread. `name` becomes the OS thread's name, and shows up in logs.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name: String = name.into();
        let (jobs, queue) = channel::unbounded();
        let thread_name: Arc<str> = name.clone().into();
        let span_name = thread_name.clone();
        let stopping = Arc::new(AtomicBool::new(false));
        let thread_stopping = stopping.clone();
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                let _span = info_span!("request_thread", name = %span_name).entered();
                run(queue, &thread_stopping);
            })
            .map_err(Error::Spawn)?;
        Ok(Self {
            dispatcher: Arc::new(ThreadDispatcher {
                name: thread_name,
                jobs,
                stopping,
            }),
            handle: Some(handle),
        })
    }

    /// The handle to post tasks to this thread with. Receivers created with it handle their requests here.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// The name this thread was started with.
    pub fn name(&self) -> &str {
        &self.dispatcher.name
    }
}

fn run(queue: Receiver<Job>, stopping: &AtomicBool) {
    debug!("request thread started");
    let mut handled = 0u64;
    let mut discarded = 0usize;
    for job in queue.iter() {
        match job {
            Job::Run(_) if stopping.load(Ordering::Acquire) => {
                discarded += 1;
                break;
            }
            Job::Run(task) => {
                // only reached with `panic = 'unwind'`; under 'abort' the process is gone before this can log
                if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(task)) {
                    let msg = panic
                        .downcast_ref::<&str>()
                        .copied()
                        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                        .unwrap_or("<non-string panic>");
                    error!(panic = msg, "request panicked on request thread; aborting");
                    process::abort();
                }
                handled += 1;
            }
            Job::Stop => break,
        }
    }
    // dropped unexecuted, so e.g. pending downlink calls still get their (failed) confirmations
    discarded += queue
        .try_iter()
        .filter(|job| matches!(job, Job::Run(_)))
        .count();
    debug!(handled, discarded, "request thread stopped");
}

impl Drop for RequestThread {
    fn drop(&mut self) {
        self.dispatcher.stopping.store(true, Ordering::Release);
        // wakes the thread if it's idle; if the thread's already gone there's nothing to stop
        let _ = self.dispatcher.jobs.send(Job::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(thread = %self.dispatcher.name, "request thread panicked outside of a task");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::{Arc, Barrier},
        time::Duration,
    };

    use crossbeam::channel;

    use super::*;
    use crate::RequestReceiver;

    const PATIENCE: Duration = Duration::from_secs(5);

    #[test]
    fn runs_tasks_on_own_thread() {
        let rt = RequestThread::new("test-worker").unwrap();
        assert_eq!(rt.name(), "test-worker");
        let (tx, rx) = channel::bounded(1);
        rt.dispatcher().post_task(Box::new(move || {
            tx.send(thread::current().name().map(str::to_owned)).unwrap();
        }));
        assert_eq!(rx.recv_timeout(PATIENCE).unwrap().as_deref(), Some("test-worker"));
    }

    #[test]
    fn requests_execute_in_order() {
        let rt = RequestThread::new("fifo").unwrap();
        let recv = RequestReceiver::new(rt.dispatcher(), Vec::new());
        let send = recv.sender();
        for i in 0..100 {
            send.post(move |v: &mut Vec<i32>| v.push(i));
        }
        let (tx, rx) = channel::bounded(1);
        send.post(move |v: &mut Vec<i32>| tx.send(v.clone()).unwrap());
        assert_eq!(rx.recv_timeout(PATIENCE).unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn stopping_discards_queued_tasks() {
        let rt = RequestThread::new("stopper").unwrap();
        let disp = rt.dispatcher();
        let gate = Arc::new(Barrier::new(2));
        let inner_gate = gate.clone();
        // park the thread so the next tasks pile up behind it
        disp.post_task(Box::new(move || {
            inner_gate.wait();
        }));
        let token = Arc::new(());
        for _ in 0..5 {
            let t = token.clone();
            disp.post_task(Box::new(move || panic!("ran after stop with {:?}", t)));
        }
        let stopper = thread::spawn(move || drop(rt));
        // give the stopper a moment to flag the stop before releasing the thread
        thread::sleep(Duration::from_millis(200));
        gate.wait();
        stopper.join().unwrap();
        assert_eq!(Arc::strong_count(&token), 1, "discarded tasks leaked");
    }

    #[test]
    fn posting_after_stop_drops_immediately() {
        let rt = RequestThread::new("gone").unwrap();
        let disp = rt.dispatcher();
        drop(rt);
        let token = Arc::new(());
        let t = token.clone();
        disp.post_task(Box::new(move || panic!("ran after stop with {:?}", t)));
        assert_eq!(Arc::strong_count(&token), 1);
    }
}
