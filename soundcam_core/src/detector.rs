// Zone detector engine: per-tick signal evaluation, per-zone cooldown, event emission.
// Zone state lives in a fixed array indexed by ZoneId. Presentation hears about
// changes through DetectorObserver and is never touched directly.

use tracing::{debug, info};

use crate::error::DetectorError;
use crate::frame::FrameBuffer;
use crate::layout::ZoneLayout;
use crate::types::*;

/// Receives typed detector output. Implemented for any `FnMut(ActionEvent)`.
pub trait DetectorObserver {
    /// A zone fired. Fire-and-forget: the detector does not wait on the result.
    fn on_action(&mut self, event: ActionEvent);

    /// A zone's visual active flag changed.
    fn on_zone_state(&mut self, _change: ZoneStateChange) {}
}

impl<F: FnMut(ActionEvent)> DetectorObserver for F {
    fn on_action(&mut self, event: ActionEvent) {
        self(event)
    }
}

/// Per-zone bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ZoneState {
    last_trigger: Option<Timestamp>,
    active: bool,
    /// Rising-edge mode: already fired during the current cover.
    latched: bool,
}

/// Detects hand coverage of the four corner zones, one frame at a time.
pub struct ZoneDetector {
    config: DetectorConfig,
    layout: Option<ZoneLayout>,
    states: [ZoneState; 4],
    previous: Option<FrameBuffer>,
}

impl ZoneDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        info!(
            strategy = ?config.strategy,
            cooldown_ms = config.cooldown_ms,
            trigger_mode = ?config.trigger_mode,
            "zone detector created"
        );
        Ok(ZoneDetector {
            config,
            layout: None,
            states: [ZoneState::default(); 4],
            previous: None,
        })
    }

    /// Build from a JSON config; missing fields take their defaults.
    pub fn from_json(config_json: &str) -> Result<Self, DetectorError> {
        let config: DetectorConfig = serde_json::from_str(config_json)
            .map_err(|e| DetectorError::InvalidConfig(e.to_string()))?;
        ZoneDetector::new(config)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Current geometry. `None` until the first frame arrives.
    pub fn layout(&self) -> Option<&ZoneLayout> {
        self.layout.as_ref()
    }

    pub fn is_zone_active(&self, zone: ZoneId) -> bool {
        self.states[zone.index()].active
    }

    pub fn last_trigger(&self, zone: ZoneId) -> Option<Timestamp> {
        self.states[zone.index()].last_trigger
    }

    pub fn has_previous_frame(&self) -> bool {
        self.previous.is_some()
    }

    /// Evaluate one frame.
    ///
    /// `None` or an empty frame is a skipped tick: nothing changes. Events and
    /// visual changes go to `observer` and are also returned in the report.
    pub fn tick<O: DetectorObserver + ?Sized>(
        &mut self,
        frame: Option<FrameBuffer>,
        now: Timestamp,
        observer: &mut O,
    ) -> TickReport {
        let Some(frame) = frame else {
            debug!("no frame ready, tick skipped");
            return TickReport::skipped();
        };
        if frame.dimensions().is_empty() {
            debug!("zero-sized frame, tick skipped");
            return TickReport::skipped();
        }

        self.ensure_layout(frame.dimensions());
        let Some(layout) = self.layout.as_ref() else {
            return TickReport::skipped();
        };

        let strategy = self.config.strategy;
        let cooldown_us = self.config.cooldown_us();
        let previous = self.previous.as_ref();
        let mut report = TickReport {
            evaluated: true,
            ..Default::default()
        };

        for zone in layout.iter() {
            let signal = strategy.evaluate(&self.config, &zone.rect, &frame, previous);
            let state = &mut self.states[zone.id.index()];
            let was_active = state.active;

            if signal.active {
                let armed = match self.config.trigger_mode {
                    TriggerMode::RepeatWhileHeld => true,
                    TriggerMode::RisingEdge => !state.latched,
                };
                let cooled = state
                    .last_trigger
                    .map_or(true, |last| now.micros_since(last) >= cooldown_us);

                if armed && cooled {
                    state.last_trigger = Some(now);
                    state.latched = true;
                    let event = ActionEvent {
                        zone: zone.id,
                        timestamp: now,
                    };
                    info!(zone = zone.id.as_str(), signal = ?signal.value, "zone triggered");
                    observer.on_action(event);
                    report.events.push(event);
                }
            } else {
                state.latched = false;
            }

            state.active = signal.active;
            if was_active != signal.active {
                let change = ZoneStateChange {
                    zone: zone.id,
                    active: signal.active,
                };
                observer.on_zone_state(change);
                report.state_changes.push(change);
            }
        }

        // Keep exactly one predecessor, and only when the strategy reads it.
        self.previous = if strategy.needs_previous_frame() {
            Some(frame)
        } else {
            None
        };

        report
    }

    /// Drop the retained previous frame. Cooldown state is kept.
    pub fn release_buffers(&mut self) {
        self.previous = None;
    }

    /// Forget everything learned from frames: layout, zone state, buffers.
    pub fn reset(&mut self) {
        self.layout = None;
        self.states = [ZoneState::default(); 4];
        self.previous = None;
    }

    fn ensure_layout(&mut self, dimensions: FrameDimensions) {
        if self
            .layout
            .as_ref()
            .is_some_and(|l| l.dimensions() == dimensions)
        {
            return;
        }

        let layout = ZoneLayout::compute(dimensions, &self.config);
        debug!(
            width = dimensions.width,
            height = dimensions.height,
            "zone layout computed"
        );
        let degenerate = layout.degenerate_zones();
        if !degenerate.is_empty() {
            debug!(zones = ?degenerate, "zones have no pixels and will never activate");
        }

        // A frame of the old size cannot be diffed against the new one.
        self.previous = None;
        self.layout = Some(layout);
    }
}
