#![cfg(feature = "nop")]

use crate::{frame::Frame, xy::XY, ActionSink, IoSystem};

/// An [`IoSystem`] that doesn't actually do anything: it never produces input and throws away every frame. Used for
/// benchmarking, demos driven by a scripted sink, or testing.
///
/// It does keep the sink alive until it's stopped, so anything feeding the same channel by other means (e.g. the
/// UI root's own input sink) sees the usual lifetime.
#[derive(Default)]
pub struct NopSystem {
    sink: Option<Box<dyn ActionSink>>,
}

impl NopSystem {
    pub fn new() -> crate::Result<Self> {
        Ok(Self::default())
    }
}

impl IoSystem for NopSystem {
    fn start(&mut self, sink: Box<dyn ActionSink>) -> crate::Result<()> {
        self.sink = Some(sink);
        Ok(())
    }
    fn draw(&mut self, _frame: &Frame) -> crate::Result<()> {
        Ok(())
    }
    fn size(&self) -> XY {
        XY(80, 24)
    }
    fn stop(&mut self) {
        self.sink = None;
    }
}
