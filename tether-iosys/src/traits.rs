//! The IO system/backend traits themselves.

use crate::{Action, Frame, Result, XY};

/// Where an [`IoSystem`] delivers the player's [`Action`]s.
///
/// Sinks are handed to the backend once, at [`IoSystem::start`], and are usually called from a backend-owned input
/// thread. `send` returns `false` once nobody is listening anymore; the backend should stop reading input then.
pub trait ActionSink: Send {
    fn send(&self, action: Action) -> bool;
}

impl<F: Fn(Action) -> bool + Send> ActionSink for F {
    fn send(&self, action: Action) -> bool {
        self(action)
    }
}

/// An input/output system.
///
/// # Terminology
///
/// * frame: The type, [`Frame`]. Lines of text in memory.
/// * display: The actual output to be rendered to, whether that's characters in a terminal or nothing at all.
/// * action: The type, [`Action`]. A single raw user input, conveying what changed.
pub trait IoSystem: Send {
    /// Begin delivering input to the sink.
    ///
    /// This is called exactly once, before anything else. It must not block waiting for input: backends which need
    /// to wait should do so on their own thread.
    fn start(&mut self, sink: Box<dyn ActionSink>) -> Result<()>;

    /// Actually render a [`Frame`] to the display.
    ///
    /// This must be able to handle `Frame`s of the wrong size. What exactly that means is up to the display, but it
    /// can't crash.
    fn draw(&mut self, frame: &Frame) -> Result<()>;

    /// Get the size of the display, in characters.
    fn size(&self) -> XY;

    /// Stop delivering input and release whatever the backend holds.
    ///
    /// This will always be the last method called on this object (unless you count `Drop::drop`), and calling it
    /// more than once must be harmless.
    fn stop(&mut self);
}
