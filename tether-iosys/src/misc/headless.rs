#![cfg(feature = "headless")]

use std::sync::{Arc, Mutex, PoisonError};

use crate::{Action, ActionSink, Frame, IoSystem, XY};

#[derive(Default)]
struct Shared {
    sink: Option<Box<dyn ActionSink>>,
    last: Option<Frame>,
    draws: usize,
    stopped: bool,
}

/// An [`IoSystem`] which renders nowhere, but remembers what it was asked to render, and lets someone else inject
/// input through a [`HeadlessHandle`]. Built for tests.
pub struct HeadlessSystem {
    size: XY,
    shared: Arc<Mutex<Shared>>,
}

/// The test-facing half of a [`HeadlessSystem`].
#[derive(Clone)]
pub struct HeadlessHandle(Arc<Mutex<Shared>>);

impl HeadlessSystem {
    pub fn new(size: XY) -> crate::Result<(Self, HeadlessHandle)> {
        let shared = Arc::new(Mutex::new(Shared::default()));
        Ok((
            Self {
                size,
                shared: shared.clone(),
            },
            HeadlessHandle(shared),
        ))
    }
}

fn lock(m: &Mutex<Shared>) -> std::sync::MutexGuard<'_, Shared> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl IoSystem for HeadlessSystem {
    fn start(&mut self, sink: Box<dyn ActionSink>) -> crate::Result<()> {
        lock(&self.shared).sink = Some(sink);
        Ok(())
    }

    fn draw(&mut self, frame: &Frame) -> crate::Result<()> {
        let mut shared = lock(&self.shared);
        if shared.stopped {
            return Err(crate::Error::Stopped);
        }
        shared.last = Some(frame.clone());
        shared.draws += 1;
        Ok(())
    }

    fn size(&self) -> XY {
        self.size
    }

    fn stop(&mut self) {
        let mut shared = lock(&self.shared);
        shared.stopped = true;
        shared.sink = None;
    }
}

impl HeadlessHandle {
    /// Inject an action, as though the player did it. Returns `false` if the system isn't started or was stopped.
    pub fn send(&self, action: Action) -> bool {
        match &lock(&self.0).sink {
            Some(sink) => sink.send(action),
            None => false,
        }
    }

    /// The most recently drawn frame, if any.
    pub fn last_frame(&self) -> Option<Frame> {
        lock(&self.0).last.clone()
    }

    /// How many times a frame has been drawn.
    pub fn draws(&self) -> usize {
        lock(&self.0).draws
    }

    /// Whether [`IoSystem::stop`] was called.
    pub fn stopped(&self) -> bool {
        lock(&self.0).stopped
    }
}
