//! Implements the (crossterm-based) rendering to CLI.

#![cfg(feature = "cli_crossterm")]

use std::{
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self as ct, DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};

use crate::{
    action::{Action, Key, MouseButton},
    frame::Frame,
    xy::XY,
    ActionSink, IoSystem,
};

/// How long the input thread waits for an event before checking whether it's been told to stop.
const INPUT_POLL: Duration = Duration::from_millis(50);

fn io4ct_btn(ct: ct::MouseButton) -> MouseButton {
    match ct {
        ct::MouseButton::Left => MouseButton::Left,
        ct::MouseButton::Middle => MouseButton::Middle,
        ct::MouseButton::Right => MouseButton::Right,
    }
}

fn io4ct_key(code: ct::KeyCode) -> Option<Key> {
    Some(match code {
        ct::KeyCode::Char(c) => Key::Char(c),
        ct::KeyCode::F(c) => Key::F(c as usize),
        ct::KeyCode::Backspace => Key::Backspace,
        ct::KeyCode::Enter => Key::Enter,
        ct::KeyCode::Left => Key::Left,
        ct::KeyCode::Right => Key::Right,
        ct::KeyCode::Up => Key::Up,
        ct::KeyCode::Down => Key::Down,
        ct::KeyCode::Home => Key::Home,
        ct::KeyCode::End => Key::End,
        ct::KeyCode::PageUp => Key::PageUp,
        ct::KeyCode::PageDown => Key::PageDown,
        ct::KeyCode::Tab => Key::Tab,
        ct::KeyCode::Delete => Key::Delete,
        ct::KeyCode::Insert => Key::Insert,
        ct::KeyCode::Esc => Key::Escape,
        ct::KeyCode::Pause => Key::Pause,
        _ => return None,
    })
}

/// Turn one terminal event into zero or more actions, in the order they should be delivered.
fn translate(ev: ct::Event, out: &mut Vec<Action>) {
    fn mods(mods: ct::KeyModifiers, out: &mut Vec<Action>, press: bool) {
        let mk = |key| {
            if press {
                Action::KeyPress { key }
            } else {
                Action::KeyRelease { key }
            }
        };
        if mods.contains(ct::KeyModifiers::SHIFT) {
            out.push(mk(Key::LeftShift));
        }
        if mods.contains(ct::KeyModifiers::CONTROL) {
            out.push(mk(Key::LeftCtrl));
        }
        if mods.contains(ct::KeyModifiers::ALT) {
            out.push(mk(Key::LeftAlt));
        }
    }

    match ev {
        ct::Event::Key(ct::KeyEvent {
            code, modifiers, ..
        }) => {
            mods(modifiers, out, true);
            if code == ct::KeyCode::BackTab {
                out.push(Action::KeyPress { key: Key::LeftShift });
                out.push(Action::KeyPress { key: Key::Tab });
                out.push(Action::KeyRelease { key: Key::Tab });
                out.push(Action::KeyRelease { key: Key::LeftShift });
            } else if let Some(key) = io4ct_key(code) {
                out.push(Action::KeyPress { key });
                out.push(Action::KeyRelease { key });
            } else {
                out.push(Action::Unknown(format!("key {:?}", code)));
            }
            mods(modifiers, out, false);
        }
        ct::Event::Resize(..) | ct::Event::FocusGained => out.push(Action::Redraw),
        ct::Event::FocusLost => (),
        ct::Event::Mouse(ct::MouseEvent {
            row,
            column,
            kind,
            modifiers,
        }) => {
            mods(modifiers, out, true);
            let pos = XY(column as usize, row as usize);
            match kind {
                ct::MouseEventKind::Down(btn) => out.push(Action::MousePress {
                    pos,
                    button: io4ct_btn(btn),
                }),
                ct::MouseEventKind::Up(btn) => out.push(Action::MouseRelease {
                    pos,
                    button: io4ct_btn(btn),
                }),
                ct::MouseEventKind::Drag(_) | ct::MouseEventKind::Moved => {
                    out.push(Action::MouseMove { pos })
                }
                ct::MouseEventKind::ScrollUp => {
                    out.push(Action::MousePress {
                        pos,
                        button: MouseButton::ScrollUp,
                    });
                    out.push(Action::MouseRelease {
                        pos,
                        button: MouseButton::ScrollUp,
                    });
                }
                ct::MouseEventKind::ScrollDown => {
                    out.push(Action::MousePress {
                        pos,
                        button: MouseButton::ScrollDown,
                    });
                    out.push(Action::MouseRelease {
                        pos,
                        button: MouseButton::ScrollDown,
                    });
                }
                #[allow(unreachable_patterns)]
                other => out.push(Action::Unknown(format!("mouse {:?}", other))),
            }
            mods(modifiers, out, false);
        }
        ct::Event::Paste(text) => out.push(Action::Unknown(format!("paste of {} chars", text.len()))),
    }
}

fn init_term() -> crate::Result<()> {
    terminal::enable_raw_mode()?;
    execute!(
        std::io::stdout(),
        EnableMouseCapture,
        EnterAlternateScreen,
        DisableLineWrap,
        Hide,
        Clear(ClearType::All),
    )?;
    Ok(())
}

fn clean_term() -> crate::Result<()> {
    execute!(
        std::io::stdout(),
        Clear(ClearType::All),
        Show,
        EnableLineWrap,
        LeaveAlternateScreen,
        DisableMouseCapture,
    )?;
    terminal::disable_raw_mode()?;
    Ok(())
}

/// Reads terminal events until told to stop or until the sink stops listening.
fn input_thread(sink: Box<dyn ActionSink>, stop: Arc<AtomicBool>) {
    let mut actions = Vec::new();
    while !stop.load(Ordering::Relaxed) {
        match ct::poll(INPUT_POLL) {
            Ok(false) => continue,
            Ok(true) => (),
            Err(e) => {
                sink.send(Action::Error(format!("polling: {}", e)));
                return;
            }
        }
        match ct::read() {
            Ok(ev) => translate(ev, &mut actions),
            Err(e) => {
                sink.send(Action::Error(format!("reading: {}", e)));
                return;
            }
        }
        for action in actions.drain(..) {
            if !sink.send(action) {
                tracing::debug!("terminal input no longer wanted, stopping");
                return;
            }
        }
    }
}

/// Renders frames to, and reads input from, the terminal the process is attached to.
pub struct CtSystem {
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    cleaned: bool,
}

impl CtSystem {
    pub fn new() -> crate::Result<Self> {
        init_term()?;
        std::panic::set_hook(Box::new(|i| {
            let _ = clean_term();
            println!("{}", i);
        }));
        Ok(Self {
            stop: Arc::new(AtomicBool::new(false)),
            reader: None,
            cleaned: false,
        })
    }
}

impl IoSystem for CtSystem {
    fn start(&mut self, sink: Box<dyn ActionSink>) -> crate::Result<()> {
        let stop = self.stop.clone();
        let handle = thread::Builder::new()
            .name("crossterm-input".into())
            .spawn(move || input_thread(sink, stop))?;
        self.reader = Some(handle);
        Ok(())
    }

    fn size(&self) -> XY {
        match terminal::size() {
            Ok((x, y)) => XY(x as usize, y as usize),
            Err(_) => XY(80, 24),
        }
    }

    fn draw(&mut self, frame: &Frame) -> crate::Result<()> {
        let mut out = vec![];
        queue!(&mut out, Clear(ClearType::All))?;
        for (row, line) in frame.lines().iter().enumerate() {
            queue!(&mut out, MoveTo(0, row as u16))?;
            out.extend_from_slice(line.as_bytes());
        }
        let stdout = std::io::stdout();
        let mut stdout = stdout.lock();
        stdout.write_all(&out)?;
        stdout.flush()?;
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                tracing::error!("terminal input thread panicked");
            }
        }
        if !self.cleaned {
            self.cleaned = true;
            let _ = clean_term();
        }
    }
}

impl Drop for CtSystem {
    fn drop(&mut self) {
        self.stop();
    }
}
