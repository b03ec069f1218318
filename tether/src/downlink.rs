//! [`Downlink`], the synchronous face of the whole request machinery.

use std::{any::Any, cell::Cell, cell::RefCell, fmt, rc::Rc};

use tracing::{debug, trace, warn};

use crate::{
    slave::{SlaveObject, SlaveRequest, SlaveRequestSender},
    ui::{BusyIndicator, EventLoop, Interrupt, LoopHandle, Root},
    Request, RequestReceiver, RequestSender,
};

/// Anything a [`Downlink`] can post a call through. Implemented for [`RequestSender`] and [`SlaveRequestSender`].
pub trait Post<R> {
    fn post(&self, request: R);
}

impl<T: 'static, R: Request<T> + 'static> Post<R> for RequestSender<T> {
    fn post(&self, request: R) {
        RequestSender::post(self, request)
    }
}

impl<T: 'static, S: SlaveObject<T> + 'static, R: SlaveRequest<T, S> + 'static> Post<R> for SlaveRequestSender<T, S> {
    fn post(&self, request: R) {
        SlaveRequestSender::post(self, request)
    }
}

/// The Downlink's end of every call: where the result lands, and what wakes the waiting loop.
struct Confirmation {
    done: LoopHandle,
    expecting: u64,
    payload: Option<Box<dyn Any + Send>>,
}

impl Confirmation {
    fn complete(&mut self, call: u64, handled: bool, payload: Option<Box<dyn Any + Send>>) {
        if call != self.expecting {
            // only possible if an earlier call unwound out of its loop before confirming
            trace!(call, expecting = self.expecting, "ignoring stale confirmation");
            return;
        }
        self.payload = payload;
        self.done.stop(handled as i32);
    }
}

/// Wraps a request on its way through a [`Downlink::call`].
///
/// However the wrapper ends up dropped (after running, by a shutting-down dispatcher, or because the receiver was
/// gone) its `Drop` posts exactly one confirmation back to the Downlink, saying whether the request was handled and,
/// if so, carrying the request back.
pub struct CallWrapper<R: Send + 'static> {
    request: Option<R>,
    handled: bool,
    call: u64,
    confirm: RequestSender<Confirmation>,
}

impl<T, R: Request<T> + 'static> Request<T> for CallWrapper<R> {
    fn handle(&mut self, target: &mut T) {
        if let Some(request) = self.request.as_mut() {
            request.handle(target);
            self.handled = true;
        }
    }
}

impl<T, S, R: SlaveRequest<T, S> + 'static> SlaveRequest<T, S> for CallWrapper<R> {
    fn handle(&mut self, session: &mut T, slave: &mut S) {
        if let Some(request) = self.request.as_mut() {
            request.handle(session, slave);
            self.handled = true;
        }
    }
}

impl<R: Send + 'static> Drop for CallWrapper<R> {
    fn drop(&mut self) {
        let (call, handled) = (self.call, self.handled);
        let mut payload = if handled {
            self.request.take().map(|r| Box::new(r) as Box<dyn Any + Send>)
        } else {
            // dropped before confirming, so the request never outlives the call
            drop(self.request.take());
            None
        };
        self.confirm
            .post(move |c: &mut Confirmation| c.complete(call, handled, payload.take()));
    }
}

impl<R: Send + 'static> fmt::Debug for CallWrapper<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallWrapper")
            .field("request", &std::any::type_name::<R>())
            .field("call", &self.call)
            .field("handled", &self.handled)
            .finish()
    }
}

/// Makes a call from the UI thread to an object on another thread look like a plain function call.
///
/// [`Self::call`] posts a request and then runs a nested [`EventLoop`] until the request has been handled (or
/// dropped), so the caller's code reads top to bottom while the UI keeps drawing, running timers, and handling other
/// tasks. While the call is outstanding a [`BusyIndicator`] sits on top of the widget stack and captures the player's
/// input; once the call is over, the input is replayed to whoever would have gotten it.
///
/// Make one per dialog or operation. A Downlink only handles one call at a time: calling it again while it's waiting
/// (e.g. from a timer that fires during the call) fails right away.
pub struct Downlink {
    root: Root,
    event_loop: EventLoop,
    indicator: Rc<RefCell<BusyIndicator>>,
    confirm: RequestReceiver<Confirmation>,
    interrupt: Interrupt,
    busy: Cell<bool>,
    calls: Cell<u64>,
}

/// Undoes the visible parts of a call, even if it unwinds.
struct BusyGuard<'d>(&'d Downlink);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let d = self.0;
        d.root.remove(&d.indicator);
        let buffered = d.indicator.borrow_mut().deactivate();
        d.root.replay(buffered);
        d.busy.set(false);
    }
}

impl Downlink {
    pub fn new(root: &Root) -> Self {
        let event_loop = EventLoop::new(root);
        let interrupt = Interrupt::new();
        let confirm = RequestReceiver::new(
            root.dispatcher(),
            Confirmation {
                done: event_loop.handle(),
                expecting: 0,
                payload: None,
            },
        );
        Self {
            indicator: Rc::new(RefCell::new(BusyIndicator::new(root.config(), interrupt.clone()))),
            root: root.clone(),
            event_loop,
            confirm,
            interrupt,
            busy: Cell::new(false),
            calls: Cell::new(0),
        }
    }

    /// Post `request` through `link` and wait, without blocking the UI, until it's been dealt with.
    ///
    /// Returns the request, after its `handle` has run exactly once, so results stored in it can be read out. Returns
    /// `None` if `handle` never ran: either this Downlink was already busy with another call (in which case nothing
    /// was posted at all) or the receiver was gone by the time the request got there.
    pub fn call<L, R>(&self, link: &L, request: R) -> Option<R>
    where
        L: Post<CallWrapper<R>> + ?Sized,
        R: Send + 'static,
    {
        if self.busy.get() {
            warn!(request = std::any::type_name::<R>(), "downlink is already waiting on a call");
            return None;
        }
        self.busy.set(true);
        let call = self.calls.get() + 1;
        self.calls.set(call);
        let _guard = BusyGuard(self);

        self.interrupt.reset();
        self.confirm.with(|c| {
            c.expecting = call;
            c.payload = None;
        });
        self.indicator.borrow_mut().activate();
        self.root.push(self.indicator.clone());

        debug!(call, request = std::any::type_name::<R>(), "call started");
        link.post(CallWrapper {
            request: Some(request),
            handled: false,
            call,
            confirm: self.confirm.sender(),
        });
        let handled = self.event_loop.run() != 0;
        let payload = self.confirm.with(|c| c.payload.take());
        debug!(call, handled, "call finished");

        if !handled {
            return None;
        }
        payload.and_then(|p| p.downcast::<R>().ok()).map(|r| *r)
    }

    /// Run `f` against the target on its own thread, and return what it returns.
    ///
    /// This is [`Self::call`] for the common case where all the caller wants is a value back.
    pub fn query<T, V, F>(&self, sender: &RequestSender<T>, f: F) -> Option<V>
    where
        T: 'static,
        V: Send + 'static,
        F: FnOnce(&mut T) -> V + Send + 'static,
    {
        self.call(
            sender,
            Query {
                f: Some(f),
                value: None,
            },
        )
        .and_then(|q| q.value)
    }

    /// The interrupt flag for this Downlink's calls. It's reset at the start of each call; clone it into requests
    /// which should stop early when the player asks.
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Whether a call is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Whether the player asked to quit during the most recent call.
    pub fn quit_requested(&self) -> bool {
        self.indicator.borrow().quit_requested()
    }
}

struct Query<F, V> {
    f: Option<F>,
    value: Option<V>,
}

impl<T, V: Send, F: FnOnce(&mut T) -> V + Send> Request<T> for Query<F, V> {
    fn handle(&mut self, target: &mut T) {
        if let Some(f) = self.f.take() {
            self.value = Some(f(target));
        }
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread, time::Duration};

    use crossbeam::channel;

    use super::*;
    use crate::{
        io::{
            backends::{HeadlessHandle, HeadlessSystem},
            Action, Frame, Key, XY,
        },
        ui::Widget,
        Config, Hotkey, RequestThread,
    };

    const PATIENCE: Duration = Duration::from_secs(5);

    struct Inc;

    impl Request<i32> for Inc {
        fn handle(&mut self, target: &mut i32) {
            *target += 1;
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Vec<Action>,
    }

    impl Widget for Recorder {
        fn handle_action(&mut self, action: &Action) -> bool {
            self.seen.push(action.clone());
            true
        }

        fn draw(&self, frame: &mut Frame) {
            frame.push_line("game view");
        }
    }

    struct Setup {
        worker: RequestThread,
        counter: RequestReceiver<i32>,
        root: Root,
        io: HeadlessHandle,
        under: Rc<RefCell<Recorder>>,
    }

    fn setup_with(config: Config) -> Setup {
        let worker = RequestThread::new("session").unwrap();
        let counter = RequestReceiver::new(worker.dispatcher(), 42);
        let (sys, io) = HeadlessSystem::new(XY(40, 10)).unwrap();
        let root = Root::with_config(Box::new(sys), config).unwrap();
        let under = Rc::new(RefCell::new(Recorder::default()));
        root.push(under.clone());
        Setup {
            worker,
            counter,
            root,
            io,
            under,
        }
    }

    fn setup() -> Setup {
        setup_with(Config::default())
    }

    fn press(key: Key) -> Action {
        Action::KeyPress { key }
    }

    #[test]
    fn call_increments_once() {
        let s = setup();
        let dl = Downlink::new(&s.root);
        assert!(dl.call(&s.counter.sender(), Inc).is_some());
        assert_eq!(s.counter.with(|v| *v), 43);
        assert!(!dl.is_busy());
        assert_eq!(s.root.depth(), 1, "busy indicator left on the stack");
    }

    #[test]
    fn sequential_calls_each_run_once() {
        let s = setup();
        let dl = Downlink::new(&s.root);
        let send = s.counter.sender();
        assert!(dl.call(&send, Inc).is_some());
        assert!(dl.call(&send, |v: &mut i32| *v *= 2).is_some());
        assert_eq!(s.counter.with(|v| *v), 86);
    }

    #[test]
    fn results_come_back_in_the_request() {
        struct Peek {
            seen: Option<i32>,
            on: Option<String>,
        }
        impl Request<i32> for Peek {
            fn handle(&mut self, target: &mut i32) {
                self.seen = Some(*target);
                self.on = thread::current().name().map(str::to_owned);
            }
        }
        let s = setup();
        let dl = Downlink::new(&s.root);
        let peek = dl
            .call(&s.counter.sender(), Peek { seen: None, on: None })
            .expect("call failed");
        assert_eq!(peek.seen, Some(42));
        assert_eq!(peek.on.as_deref(), Some("session"));
    }

    #[test]
    fn query_returns_value() {
        let s = setup();
        let dl = Downlink::new(&s.root);
        assert_eq!(dl.query(&s.counter.sender(), |v: &mut i32| *v * 2), Some(84));
    }

    #[test]
    fn reentrant_call_fails_without_posting() {
        let s = setup();
        let dl = Rc::new(Downlink::new(&s.root));
        let (go_tx, go_rx) = channel::bounded::<()>(1);
        let nested = Rc::new(Cell::new(None));
        {
            let (dl, send, nested) = (dl.clone(), s.counter.sender(), nested.clone());
            s.root.schedule(Duration::ZERO, move || {
                nested.set(Some(dl.call(&send, |v: &mut i32| *v += 100).is_some()));
                let _ = go_tx.send(());
            });
        }
        let outer = dl.call(&s.counter.sender(), move |v: &mut i32| {
            if go_rx.recv_timeout(PATIENCE).is_ok() {
                *v += 1;
            }
        });
        assert!(outer.is_some());
        assert_eq!(nested.get(), Some(false));
        assert_eq!(s.counter.with(|v| *v), 43);
    }

    #[test]
    fn dead_receiver_fails_without_leaking() {
        let s = setup();
        let dl = Downlink::new(&s.root);
        let send = s.counter.sender();
        drop(s.counter);
        let token = Arc::new(());
        let t = token.clone();
        assert!(dl
            .call(&send, move |_: &mut i32| panic!("handled after the receiver died: {:?}", t))
            .is_none());
        assert_eq!(Arc::strong_count(&token), 1, "request leaked");
        assert!(!dl.is_busy());
    }

    #[test]
    fn stopped_worker_fails_call() {
        let s = setup();
        let dl = Downlink::new(&s.root);
        let send = s.counter.sender();
        drop(s.worker);
        assert!(dl.call(&send, Inc).is_none());
        assert_eq!(s.counter.with(|v| *v), 42);
    }

    #[test]
    fn typed_input_is_replayed_in_order() {
        let s = setup();
        let dl = Downlink::new(&s.root);
        let typed = vec![press(Key::Char('g')), press(Key::Char('g')), press(Key::Enter)];
        for a in &typed {
            s.io.send(a.clone());
        }
        assert!(dl.call(&s.counter.sender(), Inc).is_some());
        assert!(s.under.borrow().seen.is_empty(), "input leaked past the busy indicator");
        for _ in 0..typed.len() {
            s.root.handle_event();
        }
        assert_eq!(s.under.borrow().seen, typed);
    }

    #[test]
    fn ctrl_pause_interrupts_without_resolving() {
        let s = setup();
        let dl = Downlink::new(&s.root);
        s.io.send(press(Key::LeftCtrl));
        s.io.send(press(Key::Pause));
        let int = dl.interrupt();
        let result = dl.call(&s.counter.sender(), move |v: &mut i32| {
            let start = std::time::Instant::now();
            while !int.is_raised() && start.elapsed() < PATIENCE {
                thread::sleep(Duration::from_millis(1));
            }
            *v = if int.is_raised() { -1 } else { 0 };
        });
        assert!(result.is_some(), "interrupting shouldn't fail the call");
        assert_eq!(s.counter.with(|v| *v), -1);
        assert_eq!(dl.interrupt().count(), 1);
        assert!(s.under.borrow().seen.is_empty());
    }

    #[test]
    fn quitting_is_replayed_after_call() {
        let s = setup();
        let dl = Downlink::new(&s.root);
        s.io.send(press(Key::Char('x')));
        s.io.send(Action::Closed);
        s.io.send(press(Key::Char('y')));
        assert!(dl.call(&s.counter.sender(), Inc).is_some());
        assert!(dl.quit_requested());
        s.root.handle_event();
        assert_eq!(s.under.borrow().seen, vec![Action::Closed]);
    }

    #[test]
    fn busy_text_drawn_during_call() {
        let s = setup_with(Config::default().busy_text("Ending turn").frame_rate(0.0));
        let dl = Downlink::new(&s.root);
        let io = s.io.clone();
        let seen = dl.query(&s.counter.sender(), move |_: &mut i32| {
            // the UI thread draws while we wait here
            let start = std::time::Instant::now();
            while start.elapsed() < PATIENCE {
                if io.last_frame().map_or(false, |f| f.contains("Ending turn")) {
                    return true;
                }
                thread::sleep(Duration::from_millis(1));
            }
            false
        });
        assert_eq!(seen, Some(true));
    }

    #[test]
    fn calls_through_slave_senders() {
        struct Tally(Vec<i32>);
        impl SlaveObject<i32> for Tally {}
        let s = setup();
        let dl = Downlink::new(&s.root);
        let slave = SlaveRequestSender::new(s.counter.sender(), |_: &mut i32| Tally(vec![]));
        for _ in 0..2 {
            assert!(dl
                .call(&slave, |v: &mut i32, t: &mut Tally| {
                    *v += 1;
                    t.0.push(*v);
                })
                .is_some());
        }
        assert!(dl
            .call(&slave, |v: &mut i32, t: &mut Tally| *v = t.0.iter().sum())
            .is_some());
        assert_eq!(s.counter.with(|v| *v), 87);
    }

    #[test]
    fn separate_downlinks_can_nest() {
        let s = setup();
        let outer = Downlink::new(&s.root);
        let inner = Rc::new(Downlink::new(&s.root));
        let inner_ok = Rc::new(Cell::new(None));
        {
            let (inner, send, inner_ok) = (inner.clone(), s.counter.sender(), inner_ok.clone());
            s.root.schedule(Duration::ZERO, move || {
                inner_ok.set(Some(inner.call(&send, Inc).is_some()));
            });
        }
        assert!(outer.call(&s.counter.sender(), Inc).is_some());
        assert_eq!(inner_ok.get(), Some(true));
        assert_eq!(s.counter.with(|v| *v), 44);
    }

    #[test]
    fn calls_from_ui_side_requests() {
        thread_local! {
            static LINK: RefCell<Option<(Downlink, RequestSender<i32>)>> = RefCell::new(None);
        }
        let s = setup();
        LINK.with(|l| *l.borrow_mut() = Some((Downlink::new(&s.root), s.counter.sender())));
        let replies = RequestReceiver::new(s.root.dispatcher(), Vec::<&'static str>::new());
        let back = replies.sender();
        replies.sender().post(move |log: &mut Vec<&'static str>| {
            log.push("reply");
            let back = back.clone();
            let handled = LINK.with(|l| {
                let l = l.borrow();
                let (dl, counter) = l.as_ref().expect("no downlink set up");
                dl.call(counter, move |v: &mut i32| {
                    *v += 1;
                    back.post(|log: &mut Vec<&'static str>| log.push("follow-up"));
                })
                .is_some()
            });
            log.push(if handled { "called" } else { "failed" });
        });
        let start = std::time::Instant::now();
        while replies.with(|l| l.len()) < 3 && start.elapsed() < PATIENCE {
            s.root.handle_event();
        }
        assert_eq!(replies.with(|l| l.clone()), vec!["reply", "called", "follow-up"]);
        assert_eq!(s.counter.with(|v| *v), 43);
        LINK.with(|l| l.borrow_mut().take());
    }

    #[test]
    fn quit_chord_replayed_whole() {
        let hotkey = Hotkey::new(Key::Char('q')).ctrl();
        let s = setup_with(Config::default().quit(hotkey));
        let dl = Downlink::new(&s.root);
        let chord = vec![
            press(Key::LeftCtrl),
            press(Key::Char('q')),
            Action::KeyRelease { key: Key::Char('q') },
            Action::KeyRelease { key: Key::LeftCtrl },
        ];
        for a in &chord {
            s.io.send(a.clone());
        }
        assert!(dl.call(&s.counter.sender(), Inc).is_some());
        assert!(dl.quit_requested());
        for _ in 0..chord.len() {
            s.root.handle_event();
        }
        assert_eq!(s.under.borrow().seen, chord);
    }
}
