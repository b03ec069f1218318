use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    mem,
    rc::Rc,
    sync::Arc,
    time::Duration,
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace, warn};

use super::Widget;
use crate::{
    dispatcher::{Dispatcher, RequestDispatcher},
    io::{Action, ActionSink, Frame, IoSystem},
    request::Task,
    util::timing::{Instant, Timer},
    Config, Result,
};

/// Everything the UI thread wakes up for. Input and tasks share a queue, so they're handled in the order they came.
enum UiEvent {
    Action(Action),
    Task(Task),
}

struct UiDispatcher {
    events: Sender<UiEvent>,
}

impl RequestDispatcher for UiDispatcher {
    fn post_task(&self, task: Task) {
        if let Err(rejected) = self.events.send(UiEvent::Task(task)) {
            trace!("UI root gone, dropping task");
            drop(rejected);
        }
    }
}

/// The [`ActionSink`] a [`Root`] hands its [`IoSystem`]. It's `Send`, so any thread can feed the UI input through it.
///
/// `send` returns `false` once the root is gone.
#[derive(Clone)]
pub struct InputSink {
    events: Sender<UiEvent>,
}

impl ActionSink for InputSink {
    fn send(&self, action: Action) -> bool {
        self.events.send(UiEvent::Action(action)).is_ok()
    }
}

struct Scheduled {
    at: Instant,
    callback: Box<dyn FnOnce()>,
}

type WidgetRef = Rc<RefCell<dyn Widget>>;

struct RootInner {
    io: RefCell<Box<dyn IoSystem>>,
    config: Config,
    events: Receiver<UiEvent>,
    dispatcher: Arc<UiDispatcher>,
    widgets: RefCell<Vec<WidgetRef>>,
    replay: RefCell<VecDeque<Action>>,
    timers: RefCell<Vec<Scheduled>>,
    frame: RefCell<Frame>,
    render: RefCell<Timer>,
    tainted: Cell<bool>,
}

impl Drop for RootInner {
    fn drop(&mut self) {
        self.io.get_mut().stop();
    }
}

/// The UI thread's side of everything: the IO system, the widget stack, timers, and the UI's request queue.
///
/// A `Root` is a cheap handle; clones share everything. It's not `Send`: it lives and dies on the UI thread. Other
/// threads reach it through [`Self::dispatcher`] and [`Self::input_sink`].
///
/// Nothing happens until someone calls [`Self::handle_event`], usually through an
/// [`EventLoop`](super::EventLoop). Each call handles whatever's due: timers, then one queued action or task, then a
/// redraw if anything changed and the frame rate allows.
///
/// Input goes to the top widget only, so pushing a widget makes it modal until it's removed. While drawing, widgets
/// are drawn bottom to top, and any widget that's currently in the middle of handling something (because a nested
/// event loop was started from inside its handler) is skipped.
///
/// A widget which starts a nested loop from its own handler should push something on top of itself first, the way
/// [`Downlink`](crate::Downlink) pushes its [`BusyIndicator`](super::BusyIndicator). Input that arrives while the top
/// widget is still busy in its handler has nowhere to go, and is dropped with a warning.
#[derive(Clone)]
pub struct Root(Rc<RootInner>);

impl Root {
    /// Start a root on the given IO system with the default [`Config`].
    pub fn new(io: Box<dyn IoSystem>) -> Result<Self> {
        Self::with_config(io, Config::default())
    }

    pub fn with_config(mut io: Box<dyn IoSystem>, config: Config) -> Result<Self> {
        let (events_tx, events) = channel::unbounded();
        io.start(Box::new(InputSink {
            events: events_tx.clone(),
        }))?;
        let frame = Frame::new(io.size());
        debug!(size = ?frame.size(), "UI root started");
        Ok(Self(Rc::new(RootInner {
            io: RefCell::new(io),
            render: RefCell::new(Timer::new(config.frame_period())),
            config,
            events,
            dispatcher: Arc::new(UiDispatcher { events: events_tx }),
            widgets: RefCell::new(vec![]),
            replay: RefCell::new(VecDeque::new()),
            timers: RefCell::new(vec![]),
            frame: RefCell::new(frame),
            tainted: Cell::new(true),
        })))
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// The UI thread's [`RequestDispatcher`]. Tasks posted to it run inside [`Self::handle_event`].
    pub fn dispatcher(&self) -> Dispatcher {
        self.0.dispatcher.clone()
    }

    /// Another sink feeding this root's input queue, as though the IO system had sent the actions.
    pub fn input_sink(&self) -> InputSink {
        InputSink {
            events: self.0.dispatcher.events.clone(),
        }
    }

    /// Put a widget on top of the stack. It gets all input until it's removed or covered.
    pub fn push<W: Widget + 'static>(&self, widget: Rc<RefCell<W>>) {
        self.0.widgets.borrow_mut().push(widget);
        self.taint();
    }

    /// Take a widget off the stack, wherever it is. Returns whether it was there.
    pub fn remove<W: Widget + ?Sized + 'static>(&self, widget: &Rc<RefCell<W>>) -> bool {
        let target = Rc::as_ptr(widget) as *const ();
        let mut widgets = self.0.widgets.borrow_mut();
        match widgets.iter().rposition(|w| Rc::as_ptr(w) as *const () == target) {
            Some(idx) => {
                widgets.remove(idx);
                drop(widgets);
                self.taint();
                true
            }
            None => false,
        }
    }

    /// How many widgets are on the stack.
    pub fn depth(&self) -> usize {
        self.0.widgets.borrow().len()
    }

    /// Queue actions to be handled before anything else that's waiting, in the order given.
    pub fn replay(&self, actions: impl IntoIterator<Item = Action>) {
        let actions: Vec<_> = actions.into_iter().collect();
        if actions.is_empty() {
            return;
        }
        trace!(count = actions.len(), "replaying actions");
        let mut replay = self.0.replay.borrow_mut();
        for action in actions.into_iter().rev() {
            replay.push_front(action);
        }
    }

    /// Run `callback` on the UI thread once `delay` has passed. Timers fire from any event loop on this root,
    /// including the ones running while a call is outstanding.
    pub fn schedule(&self, delay: Duration, callback: impl FnOnce() + 'static) {
        self.0.timers.borrow_mut().push(Scheduled {
            at: Instant::now() + delay,
            callback: Box::new(callback),
        });
    }

    /// Mark the display as out of date, so it's redrawn soon.
    pub fn taint(&self) {
        self.0.tainted.set(true);
    }

    /// Handle whatever's due, waiting up to [`Config::idle_poll`] for something to happen if nothing is.
    pub fn handle_event(&self) {
        self.fire_timers();
        let replayed = self.0.replay.borrow_mut().pop_front();
        match replayed {
            Some(action) => self.dispatch(action),
            None => match self.0.events.recv_timeout(self.wait_time()) {
                Ok(UiEvent::Action(action)) => self.dispatch(action),
                Ok(UiEvent::Task(task)) => task(),
                // we hold a sender ourselves, so it never disconnects
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => (),
            },
        }
        if self.0.tainted.get() && self.0.render.borrow_mut().ready() {
            self.render();
        }
    }

    fn wait_time(&self) -> Duration {
        let mut wait = self.0.config.idle_duration();
        if !self.0.replay.borrow().is_empty() {
            return Duration::ZERO;
        }
        if self.0.tainted.get() {
            wait = wait.min(self.0.render.borrow().remaining());
        }
        let now = Instant::now();
        let timers = self.0.timers.borrow();
        if let Some(next) = timers
            .iter()
            .map(|t| t.at.checked_duration_since(now).unwrap_or(Duration::ZERO))
            .min()
        {
            wait = wait.min(next);
        }
        wait
    }

    fn fire_timers(&self) {
        let now = Instant::now();
        let mut due: Vec<_> = {
            let mut timers = self.0.timers.borrow_mut();
            let (due, later): (Vec<_>, Vec<_>) = mem::take(&mut *timers).into_iter().partition(|t| t.at <= now);
            *timers = later;
            due
        };
        due.sort_by_key(|t| t.at);
        for timer in due {
            (timer.callback)();
        }
    }

    fn dispatch(&self, action: Action) {
        if action == Action::Redraw {
            let size = self.0.io.borrow().size();
            self.0.frame.borrow_mut().resize(size);
            self.taint();
            return;
        }
        let top = self.0.widgets.borrow().last().cloned();
        let top = match top {
            Some(top) => top,
            None => {
                trace!(?action, "no widgets to take input");
                return;
            }
        };
        let handled = match top.try_borrow_mut() {
            Ok(mut widget) => widget.handle_action(&action),
            Err(_) => {
                warn!(?action, "top widget is busy handling something else; dropping input");
                false
            }
        };
        if handled {
            self.taint();
        } else {
            trace!(?action, "input not handled");
        }
    }

    fn render(&self) {
        let widgets: Vec<_> = self.0.widgets.borrow().clone();
        let mut frame = self.0.frame.borrow_mut();
        frame.clear();
        for widget in &widgets {
            match widget.try_borrow() {
                Ok(widget) => widget.draw(&mut frame),
                Err(_) => trace!("skipping draw of busy widget"),
            }
        }
        if let Err(e) = self.0.io.borrow_mut().draw(&frame) {
            warn!(error = %e, "failed to draw frame");
        }
        self.0.tainted.set(false);
    }
}
