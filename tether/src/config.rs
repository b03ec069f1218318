//! Knobs for the UI side: what the busy indicator says, which keys interrupt and quit, and how often to redraw.

use serde::{Deserialize, Serialize};

use crate::{io::Key, util::macros::setters};

/// A key plus the modifiers which have to be held with it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Hotkey {
    pub key: Key,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
}

impl Hotkey {
    /// The key on its own, no modifiers.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    setters! {
        /// Require Ctrl to be held.
        ctrl => ctrl = true,
        /// Require Alt to be held.
        alt => alt = true,
        /// Require Shift to be held.
        shift => shift = true,
    }
}

/// Configuration shared by a [`Root`](crate::ui::Root) and every [`Downlink`](crate::Downlink) built on it.
///
/// Deserializing fills in anything missing with the defaults, so a config file only needs what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What the busy indicator shows while a call is outstanding.
    pub busy_text: String,
    /// Raises the call's [`Interrupt`](crate::ui::Interrupt) when pressed during a call.
    pub interrupt: Hotkey,
    /// An extra hotkey treated like the window closing. [`Action::Closed`](crate::io::Action::Closed) always is.
    pub quit: Option<Hotkey>,
    /// Most redraws per second. Zero or less means redraw whenever anything changes.
    pub frame_rate: f32,
    /// Longest the UI thread sleeps waiting for something to happen, in seconds.
    pub idle_poll: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            busy_text: "Working...".into(),
            interrupt: Hotkey::new(Key::Pause).ctrl(),
            quit: None,
            frame_rate: 60.0,
            idle_poll: 0.05,
        }
    }
}

impl Config {
    setters! {
        busy_text(text: impl Into<String>) => busy_text = text.into(),
        interrupt(hotkey: Hotkey) => interrupt = hotkey,
        quit(hotkey: Hotkey) => quit = Some(hotkey),
        frame_rate(fps: f32) => frame_rate = fps,
        idle_poll(secs: f32) => idle_poll = secs,
    }

    /// Seconds between redraws.
    pub(crate) fn frame_period(&self) -> f32 {
        if self.frame_rate > 0.0 {
            1.0 / self.frame_rate
        } else {
            0.0
        }
    }

    pub(crate) fn idle_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f32(self.idle_poll.max(0.001))
    }
}
