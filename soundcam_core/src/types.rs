// Strong typing over strings. Newtypes for timestamps and pixel geometry,
// closed enums for zones and corners so per-zone state is an array, not a map.

use serde::{Deserialize, Serialize};

use crate::error::DetectorError;

/// Monotonic timestamp in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms.saturating_mul(1000))
    }

    /// From a fractional millisecond clock (`performance.now()`, rAF timestamps).
    /// Negative and NaN inputs clamp to zero.
    pub fn from_millis_f64(ms: f64) -> Self {
        if ms.is_nan() || ms <= 0.0 {
            return Timestamp(0);
        }
        Timestamp((ms * 1000.0).round() as u64)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Microseconds elapsed since `earlier`, zero if the clock went backwards.
    pub fn micros_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        FrameDimensions { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte length of an RGBA buffer of this size, `None` if it overflows `usize`.
    pub fn rgba_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(4)
    }
}

/// Axis-aligned rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        PixelRect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn intersects(&self, other: &PixelRect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn fits_within(&self, dims: FrameDimensions) -> bool {
        self.right() <= dims.width && self.bottom() <= dims.height
    }
}

/// One of the four detection zones, keyed by the playback action it triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneId {
    Previous,
    Next,
    Play,
    Pause,
}

impl ZoneId {
    /// Fixed evaluation order within a tick.
    pub const ALL: [ZoneId; 4] = [ZoneId::Previous, ZoneId::Next, ZoneId::Play, ZoneId::Pause];

    pub fn index(self) -> usize {
        match self {
            ZoneId::Previous => 0,
            ZoneId::Next => 1,
            ZoneId::Play => 2,
            ZoneId::Pause => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneId::Previous => "previous",
            ZoneId::Next => "next",
            ZoneId::Play => "play",
            ZoneId::Pause => "pause",
        }
    }
}

/// Frame corner a zone is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub fn is_right(self) -> bool {
        matches!(self, Corner::TopRight | Corner::BottomRight)
    }

    pub fn is_bottom(self) -> bool {
        matches!(self, Corner::BottomLeft | Corner::BottomRight)
    }

    /// The corner on the other side of the vertical axis.
    pub fn mirrored(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::TopRight,
            Corner::TopRight => Corner::TopLeft,
            Corner::BottomLeft => Corner::BottomRight,
            Corner::BottomRight => Corner::BottomLeft,
        }
    }
}

/// Which corner each action lives in. Must be a bijection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CornerAssignment {
    #[serde(default = "default_previous_corner")]
    pub previous: Corner,
    #[serde(default = "default_next_corner")]
    pub next: Corner,
    #[serde(default = "default_play_corner")]
    pub play: Corner,
    #[serde(default = "default_pause_corner")]
    pub pause: Corner,
}

impl CornerAssignment {
    pub fn corner_of(&self, zone: ZoneId) -> Corner {
        match zone {
            ZoneId::Previous => self.previous,
            ZoneId::Next => self.next,
            ZoneId::Play => self.play,
            ZoneId::Pause => self.pause,
        }
    }

    pub fn is_bijection(&self) -> bool {
        let corners = ZoneId::ALL.map(|z| self.corner_of(z));
        (0..corners.len()).all(|i| !corners[i + 1..].contains(&corners[i]))
    }
}

impl Default for CornerAssignment {
    fn default() -> Self {
        CornerAssignment {
            previous: default_previous_corner(),
            next: default_next_corner(),
            play: default_play_corner(),
            pause: default_pause_corner(),
        }
    }
}

fn default_previous_corner() -> Corner {
    Corner::TopLeft
}

fn default_next_corner() -> Corner {
    Corner::TopRight
}

fn default_play_corner() -> Corner {
    Corner::BottomLeft
}

fn default_pause_corner() -> Corner {
    Corner::BottomRight
}

/// Which scalar decides whether a zone is covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrategy {
    /// Mean luminance below `brightness_threshold`. Needs only the current frame.
    Brightness,
    /// Fraction of sampled pixels that changed since the previous frame.
    #[default]
    MotionDiff,
}

/// How a zone that stays covered re-fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Fire again every cooldown interval while the zone stays active.
    #[default]
    RepeatWhileHeld,
    /// Fire once per cover; the zone must go inactive before re-arming.
    RisingEdge,
}

/// Detector configuration passed from JS as JSON. `{}` yields the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub strategy: SignalStrategy,
    /// Per-pixel mean channel difference (0-255) counted as motion.
    #[serde(default = "default_detection_threshold")]
    pub detection_threshold: f32,
    /// Percentage (0-100) of sampled pixels that must move.
    #[serde(default = "default_motion_threshold_percent")]
    pub motion_threshold_percent: f32,
    /// Mean luminance (0-255) below which a zone counts as covered.
    #[serde(default = "default_brightness_threshold")]
    pub brightness_threshold: f32,
    /// Minimum time between two events of the same zone.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_zone_width_fraction")]
    pub zone_width_fraction: f32,
    #[serde(default = "default_zone_height_fraction")]
    pub zone_height_fraction: f32,
    /// Inset from the frame edges, as a fraction of each axis.
    #[serde(default = "default_margin_fraction")]
    pub margin_fraction: f32,
    #[serde(default = "default_pixel_sample_stride")]
    pub pixel_sample_stride: u32,
    /// Analyse the frame as if mirrored horizontally (selfie view).
    ///
    /// Leave `false` when the host already draws the camera mirrored into its
    /// canvas (`ctx.scale(-1, 1)`), so zones match what the user sees. Set it
    /// when the pixels come straight from the camera.
    #[serde(default)]
    pub mirror: bool,
    #[serde(default)]
    pub corners: CornerAssignment,
    #[serde(default)]
    pub trigger_mode: TriggerMode,
}

fn default_detection_threshold() -> f32 {
    30.0
}

fn default_motion_threshold_percent() -> f32 {
    15.0
}

fn default_brightness_threshold() -> f32 {
    80.0
}

fn default_cooldown_ms() -> u64 {
    1000
}

fn default_zone_width_fraction() -> f32 {
    0.25
}

fn default_zone_height_fraction() -> f32 {
    0.35
}

fn default_margin_fraction() -> f32 {
    0.05
}

fn default_pixel_sample_stride() -> u32 {
    4
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            strategy: SignalStrategy::default(),
            detection_threshold: default_detection_threshold(),
            motion_threshold_percent: default_motion_threshold_percent(),
            brightness_threshold: default_brightness_threshold(),
            cooldown_ms: default_cooldown_ms(),
            zone_width_fraction: default_zone_width_fraction(),
            zone_height_fraction: default_zone_height_fraction(),
            margin_fraction: default_margin_fraction(),
            pixel_sample_stride: default_pixel_sample_stride(),
            mirror: false,
            corners: CornerAssignment::default(),
            trigger_mode: TriggerMode::default(),
        }
    }
}

impl DetectorConfig {
    /// Brightness-drop defaults: flush 20% corner zones, every pixel sampled.
    pub fn brightness_preset() -> Self {
        DetectorConfig {
            strategy: SignalStrategy::Brightness,
            zone_width_fraction: 0.2,
            zone_height_fraction: 0.2,
            margin_fraction: 0.0,
            pixel_sample_stride: 1,
            ..Default::default()
        }
    }

    pub fn cooldown_us(&self) -> u64 {
        self.cooldown_ms.saturating_mul(1000)
    }

    /// Reject values that would leave geometry or thresholds undefined.
    pub fn validate(&self) -> Result<(), DetectorError> {
        check_range("detection_threshold", self.detection_threshold, 0.0, 255.0)?;
        check_range(
            "motion_threshold_percent",
            self.motion_threshold_percent,
            0.0,
            100.0,
        )?;
        check_range("brightness_threshold", self.brightness_threshold, 0.0, 255.0)?;
        check_range("margin_fraction", self.margin_fraction, 0.0, 0.5)?;

        for (name, fraction) in [
            ("zone_width_fraction", self.zone_width_fraction),
            ("zone_height_fraction", self.zone_height_fraction),
        ] {
            check_range(name, fraction, 0.0, 0.5)?;
            if fraction >= 0.5 {
                return Err(DetectorError::InvalidConfig(format!(
                    "{name} must be below 0.5 so opposite zones cannot overlap, got {fraction}"
                )));
            }
            if fraction + self.margin_fraction > 0.5 {
                return Err(DetectorError::InvalidConfig(format!(
                    "{name} + margin_fraction must not exceed 0.5, got {}",
                    fraction + self.margin_fraction
                )));
            }
        }

        if self.pixel_sample_stride == 0 {
            return Err(DetectorError::InvalidConfig(
                "pixel_sample_stride must be >= 1".to_string(),
            ));
        }
        if !self.corners.is_bijection() {
            return Err(DetectorError::InvalidConfig(format!(
                "each action needs its own corner, got {:?}",
                self.corners
            )));
        }
        Ok(())
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<(), DetectorError> {
    if value.is_nan() || value < min || value > max {
        return Err(DetectorError::InvalidConfig(format!(
            "{name} must be within [{min}, {max}], got {value}"
        )));
    }
    Ok(())
}

/// Emitted when a zone fires. Consumed once by the playback side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub zone: ZoneId,
    pub timestamp: Timestamp,
}

/// A zone's visual active flag flipped this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStateChange {
    pub zone: ZoneId,
    pub active: bool,
}

/// Outcome of one detection tick, returned to JS as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// False when the tick was skipped (no frame, bad frame, not running).
    pub evaluated: bool,
    pub events: Vec<ActionEvent>,
    pub state_changes: Vec<ZoneStateChange>,
    /// Handle the host must pass to the next tick, if one was scheduled.
    pub next_tick: Option<u32>,
}

impl TickReport {
    pub fn skipped() -> Self {
        TickReport::default()
    }
}
