use std::{
    mem,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use tracing::{debug, info, trace};

use super::{InputState, Widget};
use crate::{
    io::{Action, Frame, Key},
    Config, Hotkey,
};

/// A cooperative cancellation flag, shared between the UI and whatever request is currently running.
///
/// The [`BusyIndicator`] raises it when the player hits the interrupt hotkey; long-running requests should carry a
/// clone (see [`Downlink::interrupt`](crate::Downlink::interrupt)) and check [`Self::is_raised`] now and then. Raising
/// it never cancels anything by itself.
#[derive(Clone, Debug, Default)]
pub struct Interrupt(Arc<AtomicUsize>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_raised(&self) -> bool {
        self.count() > 0
    }

    /// How many times this has been raised since the last [`Self::reset`].
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }
}

/// The modal widget shown while a [`Downlink`](crate::Downlink) call is outstanding.
///
/// While active it sits on top of the widget stack and takes every action:
///
/// - ordinary keyboard and mouse input is buffered, in order, for [`Self::deactivate`] to hand back;
/// - the interrupt hotkey throws the buffer away and raises the [`Interrupt`];
/// - quitting ([`Action::Closed`] or the quit hotkey) throws the buffer away too, and leaves only the quit input in
///   it, so it's replayed to whoever's underneath once the call is over. For a hotkey that's the whole chord: the
///   modifier presses, the key, and the releases as they come in. Any other input is swallowed from then on.
///
/// Releases of keys whose presses were thrown away are swallowed as well, so nothing underneath ever sees a release
/// without its press.
///
/// Display notifications like [`Action::Redraw`] aren't input, and aren't taken.
pub struct BusyIndicator {
    text: String,
    interrupt_key: Hotkey,
    quit_key: Option<Hotkey>,
    interrupt: Interrupt,
    input: InputState,
    buffer: Vec<Action>,
    /// keys pressed during this activation and not released yet
    down: Vec<Key>,
    /// keys whose presses were cleared out of the buffer
    orphaned: Vec<Key>,
    /// keys of the quit chord, whose releases still belong in the buffer
    chord: Vec<Key>,
    active: bool,
    quitting: bool,
}

fn take_key(keys: &mut Vec<Key>, key: &Key) -> bool {
    match keys.iter().position(|k| k == key) {
        Some(idx) => {
            keys.remove(idx);
            true
        }
        None => false,
    }
}

impl BusyIndicator {
    pub fn new(config: &Config, interrupt: Interrupt) -> Self {
        Self {
            text: config.busy_text.clone(),
            interrupt_key: config.interrupt,
            quit_key: config.quit,
            interrupt,
            input: InputState::new(),
            buffer: vec![],
            down: vec![],
            orphaned: vec![],
            chord: vec![],
            active: false,
            quitting: false,
        }
    }

    /// Start capturing input.
    pub fn activate(&mut self) {
        self.active = true;
        self.quitting = false;
        self.input = InputState::new();
        self.buffer.clear();
        self.down.clear();
        self.orphaned.clear();
        self.chord.clear();
    }

    /// Stop capturing input, and take everything that was captured, oldest first.
    pub fn deactivate(&mut self) -> Vec<Action> {
        self.active = false;
        mem::take(&mut self.buffer)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the player asked to quit during this activation.
    pub fn quit_requested(&self) -> bool {
        self.quitting
    }

    /// The input captured so far.
    pub fn buffered(&self) -> &[Action] {
        &self.buffer
    }

    /// Throw the buffer away, along with the releases of everything it was still waiting on.
    fn clear(&mut self) {
        self.buffer.clear();
        self.orphaned.append(&mut self.down);
    }

    fn quit(&mut self, action: &Action) -> bool {
        info!("quit requested during call");
        if let Action::KeyPress { key } = action {
            take_key(&mut self.down, key);
            // modifiers cleared by an earlier interrupt can still be held
            let mut chord: Vec<_> = self
                .orphaned
                .iter()
                .chain(&self.down)
                .copied()
                .filter(Key::is_modifier)
                .collect();
            self.orphaned.retain(|k| !chord.contains(k));
            self.down.retain(|k| !chord.contains(k));
            chord.push(*key);
            self.clear();
            self.buffer
                .extend(chord.iter().map(|&key| Action::KeyPress { key }));
            self.chord = chord;
        } else {
            self.clear();
            self.buffer.push(action.clone());
        }
        self.quitting = true;
        true
    }
}

impl Widget for BusyIndicator {
    fn handle_action(&mut self, action: &Action) -> bool {
        if !self.active {
            return false;
        }
        if self.quitting {
            if let Action::KeyRelease { key } = action {
                if take_key(&mut self.chord, key) {
                    self.buffer.push(action.clone());
                }
            }
            return action.is_input() || *action == Action::Closed;
        }
        self.input.action(action);
        match action {
            Action::KeyPress { key } if !self.down.contains(key) => self.down.push(*key),
            Action::KeyRelease { key } => {
                take_key(&mut self.down, key);
                if take_key(&mut self.orphaned, key) {
                    trace!(?key, "dropping release of a cleared press");
                    return true;
                }
            }
            _ => (),
        }
        match action {
            Action::KeyPress { key } if self.input.chord(*key) == self.interrupt_key => {
                info!(raised = self.interrupt.count() + 1, "interrupt requested");
                self.clear();
                self.interrupt.raise();
                true
            }
            Action::KeyPress { key } if Some(self.input.chord(*key)) == self.quit_key => self.quit(action),
            Action::Closed => self.quit(action),
            a if a.is_input() => {
                debug!(action = ?a, "buffering input");
                self.buffer.push(a.clone());
                true
            }
            _ => false,
        }
    }

    fn draw(&self, frame: &mut Frame) {
        if !self.active {
            return;
        }
        if self.interrupt.is_raised() {
            frame.push_line(format!("{} (interrupting)", self.text));
        } else {
            frame.push_line(&self.text);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::{Key, MouseButton, XY};

    fn press(key: Key) -> Action {
        Action::KeyPress { key }
    }

    fn release(key: Key) -> Action {
        Action::KeyRelease { key }
    }

    fn active(config: &Config) -> (BusyIndicator, Interrupt) {
        let int = Interrupt::new();
        let mut bi = BusyIndicator::new(config, int.clone());
        bi.activate();
        (bi, int)
    }

    #[test]
    fn interrupt_counts() {
        let int = Interrupt::new();
        assert!(!int.is_raised());
        int.raise();
        int.clone().raise();
        assert_eq!(int.count(), 2);
        int.reset();
        assert!(!int.is_raised());
    }

    #[test]
    fn inactive_takes_nothing() {
        let mut bi = BusyIndicator::new(&Config::default(), Interrupt::new());
        assert!(!bi.handle_action(&press(Key::Char('a'))));
        assert!(bi.buffered().is_empty());
    }

    #[test]
    fn input_buffered_in_order() {
        let (mut bi, _) = active(&Config::default());
        let actions = vec![
            press(Key::Char('h')),
            release(Key::Char('h')),
            Action::MousePress {
                pos: XY(3, 4),
                button: MouseButton::Left,
            },
            press(Key::Enter),
        ];
        for a in &actions {
            assert!(bi.handle_action(a), "{:?} not taken", a);
        }
        assert_eq!(bi.deactivate(), actions);
        assert!(!bi.is_active());
        assert!(bi.buffered().is_empty());
    }

    #[test]
    fn notifications_pass_through() {
        let (mut bi, _) = active(&Config::default());
        assert!(!bi.handle_action(&Action::Redraw));
        assert!(!bi.handle_action(&Action::Paused));
        assert!(!bi.handle_action(&Action::Unknown("?".into())));
        assert!(bi.buffered().is_empty());
    }

    #[test]
    fn ctrl_pause_interrupts_once() {
        let (mut bi, int) = active(&Config::default());
        bi.handle_action(&press(Key::Char('x')));
        bi.handle_action(&press(Key::LeftCtrl));
        assert!(bi.handle_action(&press(Key::Pause)));
        assert_eq!(int.count(), 1);
        assert!(bi.buffered().is_empty(), "interrupt should clear the buffer");
        assert!(bi.is_active(), "interrupting doesn't end the call");
        assert!(bi.handle_action(&release(Key::Pause)));
        assert!(bi.handle_action(&release(Key::LeftCtrl)));
        assert_eq!(int.count(), 1);
        assert!(bi.buffered().is_empty(), "releases of cleared presses kept");
    }

    #[test]
    fn releases_after_interrupt_only_for_cleared_presses() {
        let (mut bi, int) = active(&Config::default());
        bi.handle_action(&press(Key::Char('x')));
        bi.handle_action(&press(Key::LeftCtrl));
        bi.handle_action(&press(Key::Pause));
        bi.handle_action(&release(Key::Pause));
        bi.handle_action(&release(Key::LeftCtrl));
        bi.handle_action(&release(Key::Char('x')));
        assert!(bi.buffered().is_empty());
        // pressed before the call started, so its press is already wherever it went
        bi.handle_action(&release(Key::Char('y')));
        bi.handle_action(&press(Key::Char('z')));
        bi.handle_action(&release(Key::Char('z')));
        assert_eq!(int.count(), 1);
        assert_eq!(
            bi.deactivate(),
            vec![release(Key::Char('y')), press(Key::Char('z')), release(Key::Char('z'))]
        );
    }

    #[test]
    fn plain_pause_is_just_input() {
        let (mut bi, int) = active(&Config::default());
        bi.handle_action(&press(Key::Pause));
        assert!(!int.is_raised());
        assert_eq!(bi.buffered(), &[press(Key::Pause)]);
    }

    #[test]
    fn closing_quits_and_rearms() {
        let (mut bi, _) = active(&Config::default());
        bi.handle_action(&press(Key::Char('a')));
        assert!(bi.handle_action(&Action::Closed));
        assert!(bi.quit_requested());
        assert!(bi.handle_action(&press(Key::Char('b'))), "input after quit should be swallowed");
        assert_eq!(bi.deactivate(), vec![Action::Closed]);
    }

    #[test]
    fn quit_hotkey_rearms_itself() {
        let config = Config::default().quit(Hotkey::new(Key::Char('q')).ctrl());
        let (mut bi, _) = active(&config);
        bi.handle_action(&press(Key::Char('q')));
        assert!(!bi.quit_requested(), "plain q isn't the hotkey");
        bi.handle_action(&release(Key::Char('q')));
        bi.handle_action(&press(Key::LeftShift));
        bi.handle_action(&release(Key::LeftShift));
        bi.handle_action(&press(Key::RightCtrl));
        bi.handle_action(&press(Key::Char('q')));
        assert!(bi.quit_requested());
        bi.handle_action(&press(Key::Char('w')));
        bi.handle_action(&release(Key::Char('q')));
        bi.handle_action(&release(Key::RightCtrl));
        bi.handle_action(&release(Key::Char('w')));
        assert_eq!(
            bi.deactivate(),
            vec![
                press(Key::RightCtrl),
                press(Key::Char('q')),
                release(Key::Char('q')),
                release(Key::RightCtrl),
            ]
        );
    }

    #[test]
    fn replayed_quit_chord_still_reads_as_the_hotkey() {
        let hotkey = Hotkey::new(Key::Char('q')).ctrl();
        let (mut bi, _) = active(&Config::default().quit(hotkey));
        for a in [press(Key::LeftCtrl), press(Key::Char('q'))] {
            bi.handle_action(&a);
        }
        let mut outer = InputState::new();
        let mut saw = false;
        for a in bi.deactivate() {
            outer.action(&a);
            if let Action::KeyPress { key } = a {
                saw |= outer.chord(key) == hotkey;
            }
        }
        assert!(saw, "outer loop never saw the quit chord");
    }

    #[test]
    fn quit_chord_keeps_modifier_held_through_interrupt() {
        let config = Config::default().quit(Hotkey::new(Key::Char('q')).ctrl());
        let (mut bi, int) = active(&config);
        bi.handle_action(&press(Key::LeftCtrl));
        bi.handle_action(&press(Key::Pause));
        bi.handle_action(&release(Key::Pause));
        bi.handle_action(&press(Key::Char('q')));
        bi.handle_action(&release(Key::Char('q')));
        bi.handle_action(&release(Key::LeftCtrl));
        assert_eq!(int.count(), 1);
        assert_eq!(
            bi.deactivate(),
            vec![
                press(Key::LeftCtrl),
                press(Key::Char('q')),
                release(Key::Char('q')),
                release(Key::LeftCtrl),
            ]
        );
    }

    #[test]
    fn reactivating_starts_fresh() {
        let (mut bi, _) = active(&Config::default());
        bi.handle_action(&Action::Closed);
        bi.deactivate();
        bi.activate();
        assert!(!bi.quit_requested());
        bi.handle_action(&press(Key::Char('z')));
        assert_eq!(bi.buffered(), &[press(Key::Char('z'))]);
    }

    #[test]
    fn draws_text_while_active() {
        let (mut bi, int) = active(&Config::default().busy_text("Ending turn"));
        let mut frame = Frame::new(XY(40, 3));
        bi.draw(&mut frame);
        assert_eq!(frame.lines(), &["Ending turn".to_owned()]);
        int.raise();
        frame.clear();
        bi.draw(&mut frame);
        assert!(frame.contains("interrupting"));
        bi.deactivate();
        frame.clear();
        bi.draw(&mut frame);
        assert!(frame.lines().is_empty());
    }
}
