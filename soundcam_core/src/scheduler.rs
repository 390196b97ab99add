// Detection loop driven by an injected tick scheduler.
// Exactly one tick is pending at a time; stop cancels it synchronously and any
// stale handle that still fires is ignored.

use tracing::{debug, info};

use crate::detector::{DetectorObserver, ZoneDetector};
use crate::source::FrameSource;
use crate::types::*;

/// Opaque id of a scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u32);

impl TickHandle {
    pub fn new(id: u32) -> Self {
        TickHandle(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Platform capability that re-arms the loop once per rendered frame.
pub trait TickScheduler {
    /// Arrange for the loop's `on_tick` to be called with the returned handle.
    fn schedule_next_tick(&mut self) -> TickHandle;

    /// Invalidate a scheduled tick. Must take effect immediately.
    fn cancel(&mut self, handle: TickHandle);
}

/// Scheduler whose ticks fire only when the owner fires them.
///
/// Tests drive it synchronously; the WASM host reads [`ManualScheduler::pending`]
/// and forwards the handle from its `requestAnimationFrame` callback.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u32,
    pending: Option<TickHandle>,
    scheduled: u64,
    cancelled: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tick waiting to fire, if any.
    pub fn pending(&self) -> Option<TickHandle> {
        self.pending
    }

    pub fn scheduled_count(&self) -> u64 {
        self.scheduled
    }

    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule_next_tick(&mut self) -> TickHandle {
        self.next_id = self.next_id.wrapping_add(1);
        let handle = TickHandle(self.next_id);
        self.pending = Some(handle);
        self.scheduled += 1;
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            self.cancelled += 1;
        }
    }
}

/// Owns the detector and its scheduler; one evaluation per scheduled tick.
pub struct DetectionLoop<S: TickScheduler> {
    detector: ZoneDetector,
    scheduler: S,
    pending: Option<TickHandle>,
    running: bool,
    ticks_run: u64,
    ticks_skipped: u64,
}

impl<S: TickScheduler> DetectionLoop<S> {
    pub fn new(detector: ZoneDetector, scheduler: S) -> Self {
        DetectionLoop {
            detector,
            scheduler,
            pending: None,
            running: false,
            ticks_run: 0,
            ticks_skipped: 0,
        }
    }

    /// Arm the first tick. Starting a running loop is a no-op.
    pub fn start(&mut self) -> TickHandle {
        if let (true, Some(handle)) = (self.running, self.pending) {
            return handle;
        }
        self.running = true;
        let handle = self.scheduler.schedule_next_tick();
        self.pending = Some(handle);
        info!(tick = handle.id(), "detection loop started");
        handle
    }

    /// Run the tick identified by `handle`, then schedule the next one.
    ///
    /// A handle that is not the pending one (cancelled, or fired after stop)
    /// does nothing.
    pub fn on_tick<F, O>(
        &mut self,
        handle: TickHandle,
        now: Timestamp,
        source: &mut F,
        observer: &mut O,
    ) -> TickReport
    where
        F: FrameSource + ?Sized,
        O: DetectorObserver + ?Sized,
    {
        if !self.running || self.pending != Some(handle) {
            debug!(tick = handle.id(), "stale tick ignored");
            return TickReport::skipped();
        }
        self.pending = None;

        let frame = if source.dimensions().is_empty() {
            None
        } else {
            source.latest_frame()
        };
        let mut report = self.detector.tick(frame, now, observer);
        if report.evaluated {
            self.ticks_run += 1;
        } else {
            self.ticks_skipped += 1;
        }

        let next = self.scheduler.schedule_next_tick();
        self.pending = Some(next);
        report.next_tick = Some(next.id());
        report
    }

    /// Stop the loop. Safe to call at any time, any number of times.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
        self.detector.release_buffers();
        if self.running {
            info!(
                ticks_run = self.ticks_run,
                ticks_skipped = self.ticks_skipped,
                "detection loop stopped"
            );
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending_tick(&self) -> Option<TickHandle> {
        self.pending
    }

    pub fn detector(&self) -> &ZoneDetector {
        &self.detector
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    pub fn ticks_skipped(&self) -> u64 {
        self.ticks_skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameBuffer;
    use crate::source::LatestFrameSlot;

    fn covered_frame() -> FrameBuffer {
        // Brightness preset on 50x50: 10x10 corner zones. Black everywhere.
        let dims = FrameDimensions::new(50, 50);
        FrameBuffer::filled(dims, [0, 0, 0, 255]).unwrap()
    }

    fn new_loop() -> DetectionLoop<ManualScheduler> {
        let detector = ZoneDetector::new(DetectorConfig::brightness_preset()).unwrap();
        DetectionLoop::new(detector, ManualScheduler::new())
    }

    /// Fire whatever tick is pending, if any.
    fn fire(
        lp: &mut DetectionLoop<ManualScheduler>,
        now_ms: u64,
        source: &mut LatestFrameSlot,
        events: &mut Vec<ActionEvent>,
    ) -> Option<TickReport> {
        let handle = lp.scheduler().pending()?;
        Some(lp.on_tick(
            handle,
            Timestamp::from_millis(now_ms),
            source,
            &mut |e: ActionEvent| events.push(e),
        ))
    }

    #[test]
    fn ticks_rearm_until_stopped() {
        let mut lp = new_loop();
        let mut source = LatestFrameSlot::new();
        let mut events = Vec::new();

        assert!(fire(&mut lp, 0, &mut source, &mut events).is_none());
        let first = lp.start();
        assert_eq!(lp.scheduler().pending(), Some(first));

        source.publish(covered_frame());
        let report = fire(&mut lp, 0, &mut source, &mut events).unwrap();
        assert!(report.evaluated);
        assert_eq!(report.events.len(), 4);
        let next = report.next_tick.unwrap();
        assert_ne!(next, first.id());
        assert_eq!(lp.pending_tick().map(|h| h.id()), Some(next));
    }

    #[test]
    fn no_frame_ready_skips_but_rearms() {
        let mut lp = new_loop();
        let mut source = LatestFrameSlot::new();
        let mut events = Vec::new();
        lp.start();

        let report = fire(&mut lp, 16, &mut source, &mut events).unwrap();
        assert!(!report.evaluated);
        assert!(report.next_tick.is_some());
        assert_eq!(lp.ticks_skipped(), 1);
        assert_eq!(lp.ticks_run(), 0);
    }

    #[test]
    fn stop_cancels_pending_tick() {
        let mut lp = new_loop();
        let mut source = LatestFrameSlot::new();
        let mut events = Vec::new();

        let handle = lp.start();
        lp.stop();
        assert!(!lp.is_running());
        assert_eq!(lp.scheduler().pending(), None);
        assert_eq!(lp.scheduler().cancelled_count(), 1);

        // The host's callback fires anyway with the old handle.
        source.publish(covered_frame());
        let report = lp.on_tick(
            handle,
            Timestamp::from_millis(5),
            &mut source,
            &mut |e: ActionEvent| events.push(e),
        );
        assert!(!report.evaluated);
        assert!(report.next_tick.is_none());
        assert!(events.is_empty());
        assert!(source.has_frame());
    }

    #[test]
    fn stop_is_idempotent_and_safe_before_start() {
        let mut lp = new_loop();
        lp.stop();
        lp.stop();
        assert!(!lp.is_running());

        lp.start();
        lp.stop();
        lp.stop();
        assert_eq!(lp.scheduler().cancelled_count(), 1);
        assert!(lp.pending_tick().is_none());
    }

    #[test]
    fn stop_releases_previous_frame() {
        let detector = ZoneDetector::new(DetectorConfig::default()).unwrap();
        let mut lp = DetectionLoop::new(detector, ManualScheduler::new());
        let mut source = LatestFrameSlot::new();
        let mut events = Vec::new();

        lp.start();
        source.publish(covered_frame());
        fire(&mut lp, 0, &mut source, &mut events);
        assert!(lp.detector().has_previous_frame());

        lp.stop();
        assert!(!lp.detector().has_previous_frame());
    }

    #[test]
    fn restart_after_stop() {
        let mut lp = new_loop();
        let mut source = LatestFrameSlot::new();
        let mut events = Vec::new();

        let old = lp.start();
        lp.stop();
        let new = lp.start();
        assert_ne!(old, new);

        source.publish(covered_frame());
        let stale = lp.on_tick(old, Timestamp::from_millis(1), &mut source, &mut |e: ActionEvent| {
            events.push(e)
        });
        assert!(!stale.evaluated);

        let report = fire(&mut lp, 2, &mut source, &mut events).unwrap();
        assert!(report.evaluated);
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn double_start_keeps_single_pending_tick() {
        let mut lp = new_loop();
        let a = lp.start();
        let b = lp.start();
        assert_eq!(a, b);
        assert_eq!(lp.scheduler().scheduled_count(), 1);
    }

    #[test]
    fn held_cover_through_loop_repeats_per_cooldown() {
        let mut lp = new_loop();
        let mut source = LatestFrameSlot::new();
        let mut events = Vec::new();
        lp.start();

        // 30 ticks, 100ms apart, zone held: 3 events per zone.
        for i in 0..30 {
            source.publish(covered_frame());
            fire(&mut lp, i * 100, &mut source, &mut events);
        }
        let previous = events.iter().filter(|e| e.zone == ZoneId::Previous).count();
        assert_eq!(previous, 3);

        lp.stop();
        source.publish(covered_frame());
        assert!(fire(&mut lp, 5000, &mut source, &mut events).is_none());
        assert_eq!(events.len(), 12);
    }
}
