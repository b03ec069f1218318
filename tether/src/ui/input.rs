use crate::{
    io::{Action, Key},
    Hotkey,
};

/// Tracks which modifier keys are held, based on the actions seen so far.
///
/// Feed it every action you receive. Because press and release events are absolute, missing one can't leave it
/// permanently inverted; the next press or release of that modifier puts it right again.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputState {
    /// Whether either Shift key is held
    pub shift: bool,
    /// Whether either Control key is held
    pub ctrl: bool,
    /// Whether either Alt key is held
    pub alt: bool,
    /// Whether either Super (Windows) key is held
    // (`super` is a keyword)
    pub super_: bool,
}

impl InputState {
    pub fn new() -> Self {
        Default::default()
    }

    fn set(&mut self, key: &Key, held: bool) -> bool {
        let field = if key.is_shift() {
            &mut self.shift
        } else if key.is_ctrl() {
            &mut self.ctrl
        } else if key.is_alt() {
            &mut self.alt
        } else if key.is_super() {
            &mut self.super_
        } else {
            return false;
        };
        *field = held;
        true
    }

    /// Handle an action, returning whether it changed anything (i.e. whether it was a modifier press or release).
    pub fn action(&mut self, action: &Action) -> bool {
        match action {
            Action::KeyPress { key } => self.set(key, true),
            Action::KeyRelease { key } => self.set(key, false),
            // focus is gone, so releases will be too
            Action::Paused => {
                *self = Self::default();
                false
            }
            _ => false,
        }
    }

    /// The chord pressing `key` right now would make, for comparing against configured [`Hotkey`]s.
    ///
    /// Super isn't part of hotkeys; most desktops keep it for themselves.
    pub fn chord(&self, key: Key) -> Hotkey {
        Hotkey {
            key,
            ctrl: self.ctrl,
            alt: self.alt,
            shift: self.shift,
        }
    }
}
