//! tether lets a game client's UI make synchronous-looking calls into a session that lives on another thread.
//!
//! If you just want to see it in action, the `session-demo` binary (feature `io_nop`) walks through a whole session.
//!
//! # Architecture
//!
//! A turn-based client tends to have two long-lived threads. The session thread owns the game: state, rules, the
//! connection to the server. The UI thread owns the display, the widgets, and the player's input. They only ever
//! talk through queues.
//!
//! The queues are [`RequestDispatcher`]s. A [`RequestThread`] is one, running its tasks on a worker thread of its
//! own, and the UI [`Root`](ui::Root) has another, running tasks between input events. An object that other threads
//! want to work on is handed to a [`RequestReceiver`], bound to the dispatcher of the thread it should live on, and
//! work is sent to it through [`RequestSender`]s as [`Request`]s. Senders are weak and cheap: clone them into
//! whatever thread needs them, and if the object is gone by the time the request arrives, the request is quietly
//! dropped. Everything one sender posts is handled in order.
//!
//! That's enough for fire-and-forget. Dialogs usually want an answer, though, and they want it in the middle of an
//! input handler, where it's awkward to wait for a reply message. That's what [`Downlink`] is for:
//! [`Downlink::call`] posts a request, then keeps the UI running in a nested [`EventLoop`](ui::EventLoop) until the
//! request has been handled and handed back. Meanwhile a [`BusyIndicator`](ui::BusyIndicator) covers the UI and
//! holds on to the player's input, to replay once the call is done. The player can also interrupt a long call
//! (Ctrl+Pause by default, see [`Config`]) or quit.
//!
//! [`SlaveRequestSender`] covers the case where one client needs private state next to the session; see the
//! [`slave`] module.
//!
//! # Feature selection
//!
//! The IO system -- one of the [`tether-iosys::backends`](tether_iosys::backends) -- handles the platform's input and
//! output. The backend features are all available with an extra `io_` prefix:
//!
//! -   `io_nop`: no input or output at all. Good for scripted demos and integration tests.
//! -   `io_headless`: records what's drawn and lets the caller inject input. Good for tests.
//! -   `io_cli_crossterm`: render to a real terminal, using `crossterm`.
//!
//! [`io::load`] will pick the best one available, but you can always construct one yourself.
//!
//! # Logging
//!
//! Everything logs through `tracing`. Binaries which don't set up their own subscriber can call [`trace_init`].

mod config;
mod dispatcher;
mod downlink;
mod error;
mod logging;
mod receiver;
mod request;
mod sender;
pub mod slave;
mod thread;
pub mod ui;
mod util;

pub use {
    config::{Config, Hotkey},
    dispatcher::{Dispatcher, RequestDispatcher},
    downlink::{CallWrapper, Downlink, Post},
    error::{Error, Result},
    logging::trace_init,
    receiver::RequestReceiver,
    request::{Request, Task},
    sender::RequestSender,
    slave::{SlaveObject, SlaveRequest, SlaveRequestSender},
    thread::RequestThread,
    tether_iosys as io,
};
