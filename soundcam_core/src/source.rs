// Frame source boundary. The capture device belongs to the host; the detector
// only pulls whatever frame is ready.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::frame::FrameBuffer;
use crate::types::FrameDimensions;

/// Anything that can hand the detector its latest frame.
pub trait FrameSource {
    /// Current stream size. Zero until the stream is negotiated.
    fn dimensions(&self) -> FrameDimensions;

    /// The newest frame, if one is ready. Never blocks.
    fn latest_frame(&mut self) -> Option<FrameBuffer>;
}

/// A frame supplied directly by the caller for a single tick.
impl FrameSource for Option<FrameBuffer> {
    fn dimensions(&self) -> FrameDimensions {
        self.as_ref().map(FrameBuffer::dimensions).unwrap_or_default()
    }

    fn latest_frame(&mut self) -> Option<FrameBuffer> {
        self.take()
    }
}

#[derive(Debug, Default)]
struct SlotState {
    frame: Option<FrameBuffer>,
    dimensions: FrameDimensions,
    overwritten: u64,
}

/// Single-slot, most-recent-wins frame hand-off between a capture thread and
/// the detection loop. Publishing replaces any frame not yet taken, so the
/// detector never works through a backlog.
#[derive(Debug, Clone, Default)]
pub struct LatestFrameSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl LatestFrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame`, replacing an unconsumed one. Returns true if a frame was dropped.
    pub fn publish(&self, frame: FrameBuffer) -> bool {
        let mut state = self.inner.lock();
        state.dimensions = frame.dimensions();
        let replaced = state.frame.replace(frame).is_some();
        if replaced {
            state.overwritten += 1;
            debug!(overwritten = state.overwritten, "stale frame replaced");
        }
        replaced
    }

    /// Take the pending frame, leaving the slot empty.
    pub fn take(&self) -> Option<FrameBuffer> {
        self.inner.lock().frame.take()
    }

    pub fn has_frame(&self) -> bool {
        self.inner.lock().frame.is_some()
    }

    /// Frames replaced before the detector got to them.
    pub fn overwritten(&self) -> u64 {
        self.inner.lock().overwritten
    }
}

impl FrameSource for LatestFrameSlot {
    fn dimensions(&self) -> FrameDimensions {
        self.inner.lock().dimensions
    }

    fn latest_frame(&mut self) -> Option<FrameBuffer> {
        self.take()
    }
}
