//! The UI thread's half: the [`Root`] which owns the display and widgets, [`EventLoop`]s which pump it, and the
//! [`BusyIndicator`] shown while a call is outstanding.
//!
//! Dialogs, maps, and everything else the player actually looks at are out of scope here; they only need to be
//! [`Widget`]s.

mod busy;
mod event_loop;
mod input;
mod root;

pub use busy::{BusyIndicator, Interrupt};
pub use event_loop::{EventLoop, LoopHandle};
pub use input::InputState;
pub use root::{InputSink, Root};

use crate::io::{Action, Frame};

/// Something on the [`Root`]'s widget stack.
pub trait Widget {
    /// Handle one action, returning whether it was used. Only the topmost widget is asked.
    fn handle_action(&mut self, action: &Action) -> bool;

    /// Add this widget's lines to the frame. Called bottom of the stack first.
    fn draw(&self, _frame: &mut Frame) {}
}
