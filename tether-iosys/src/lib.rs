//! > *This crate was designed and built with [`tether`](../tether) in mind. If you're using tether, see its
//! documentation for information.*
//!
//! There are two central parts to familiarize yourself with.
//!
//! The first is [`Action`]: one raw piece of player input (a key press, a mouse click, the window closing). Keys are
//! delivered as separate press and release actions, with modifiers pressed before and released after the key they
//! modify, so anything downstream can track modifier state with a simple state machine.
//!
//! The second is [`IoSystem`]. It's handed an [`ActionSink`] when started and pushes every action into it, usually
//! from an input thread of its own, and it draws [`Frame`]s when asked. Builtin backends are enabled by features and
//! available in [`backends`]; [`load`] picks the first one which can start.
//!
//! # Features
//!
//! There's one feature to enable each builtin backend:
//!
//! - `nop`: never produces input, discards output. For benchmarks and scripted demos.
//! - `headless`: records frames and lets a test inject input. For tests.
//! - `cli_crossterm`: the real terminal, through `crossterm`.

mod error;
mod traits;

mod misc;
mod terminal;

mod action;
mod frame;
mod xy;

pub use crate::{
    action::{Action, Key, MouseButton},
    error::{Error, Result},
    frame::Frame,
    traits::{ActionSink, IoSystem},
    xy::XY,
};

/// Available rendering backends. See the [`IoSystem`] docs for more information.
pub mod backends {
    #[allow(unused)]
    use super::*;

    #[cfg(feature = "nop")]
    pub type NopSystem = misc::nop::NopSystem;

    #[cfg(feature = "headless")]
    pub type HeadlessSystem = misc::headless::HeadlessSystem;
    #[cfg(feature = "headless")]
    pub type HeadlessHandle = misc::headless::HeadlessHandle;

    #[cfg(feature = "cli_crossterm")]
    pub type CrosstermSystem = terminal::crossterm::CtSystem;
}

/// Based on IO system features enabled, attempt to initialize an IO system; in order:
///
/// - crossterm CLI (`cli_crossterm`)
/// - NOP (`nop`)
///
/// Every failure is logged. If nothing could be loaded, the error of the last attempt is returned.
#[allow(unused_mut)]
pub fn load() -> Result<Box<dyn IoSystem>> {
    let mut last = Error::from("no IO system features enabled");
    #[cfg(feature = "cli_crossterm")]
    match backends::CrosstermSystem::new() {
        Ok(sys) => return Ok(Box::new(sys)),
        Err(e) => {
            tracing::warn!(backend = "cli_crossterm", error = %e, "IO system failed to load");
            last = e;
        }
    }
    #[cfg(feature = "nop")]
    match backends::NopSystem::new() {
        Ok(sys) => return Ok(Box::new(sys)),
        Err(e) => {
            tracing::warn!(backend = "nop", error = %e, "IO system failed to load");
            last = e;
        }
    }
    Err(last)
}
