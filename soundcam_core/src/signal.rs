// Per-zone activation signals: mean luminance, or fraction of changed pixels
// against the previous frame. Both sample on a stride and report `None` when
// a zone has no pixels to sample.

use crate::frame::FrameBuffer;
use crate::types::*;

/// Rec. 601 luma weights.
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// Signal value and verdict for one zone in one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneSignal {
    /// Mean luminance (0-255) or moved-pixel percentage (0-100).
    /// `None` when nothing could be sampled.
    pub value: Option<f32>,
    pub active: bool,
}

impl ZoneSignal {
    pub fn inactive() -> Self {
        ZoneSignal {
            value: None,
            active: false,
        }
    }
}

/// Mean perceived luminance over the sampled pixels of `rect`.
pub fn mean_luminance(frame: &FrameBuffer, rect: &PixelRect, stride: u32) -> Option<f32> {
    let mut total = 0.0f64;
    let mut samples = 0u64;

    for (x, y) in sample_points(rect, frame.dimensions(), stride) {
        let [r, g, b] = frame.rgb(x, y);
        total += LUMA_R * r as f64 + LUMA_G * g as f64 + LUMA_B * b as f64;
        samples += 1;
    }

    if samples == 0 {
        return None;
    }
    Some((total / samples as f64) as f32)
}

/// Percentage (0-100) of sampled pixels in `rect` whose mean RGB difference
/// from `previous` exceeds `detection_threshold`.
///
/// Frames of different sizes cannot be compared and yield `None`.
pub fn motion_percent(
    current: &FrameBuffer,
    previous: &FrameBuffer,
    rect: &PixelRect,
    stride: u32,
    detection_threshold: f32,
) -> Option<f32> {
    if current.dimensions() != previous.dimensions() {
        return None;
    }

    let cur = current.as_bytes();
    let prev = previous.as_bytes();
    let mut moved = 0u64;
    let mut samples = 0u64;

    for (x, y) in sample_points(rect, current.dimensions(), stride) {
        let i = current.offset(x, y);
        let diff_sum = cur[i].abs_diff(prev[i]) as u32
            + cur[i + 1].abs_diff(prev[i + 1]) as u32
            + cur[i + 2].abs_diff(prev[i + 2]) as u32;

        if diff_sum as f32 / 3.0 > detection_threshold {
            moved += 1;
        }
        samples += 1;
    }

    if samples == 0 {
        return None;
    }
    Some((moved as f64 * 100.0 / samples as f64) as f32)
}

impl SignalStrategy {
    /// Whether this strategy needs the previous frame.
    pub fn needs_previous_frame(self) -> bool {
        matches!(self, SignalStrategy::MotionDiff)
    }

    /// Compute the zone's signal and decide whether it is active.
    /// Motion needs a predecessor; without one nothing is active.
    pub fn evaluate(
        self,
        config: &DetectorConfig,
        rect: &PixelRect,
        current: &FrameBuffer,
        previous: Option<&FrameBuffer>,
    ) -> ZoneSignal {
        let stride = config.pixel_sample_stride;
        match self {
            SignalStrategy::Brightness => {
                let value = mean_luminance(current, rect, stride);
                ZoneSignal {
                    value,
                    active: value.is_some_and(|v| v < config.brightness_threshold),
                }
            }
            SignalStrategy::MotionDiff => {
                let Some(previous) = previous else {
                    return ZoneSignal::inactive();
                };
                let value =
                    motion_percent(current, previous, rect, stride, config.detection_threshold);
                ZoneSignal {
                    value,
                    active: value.is_some_and(|v| v > config.motion_threshold_percent),
                }
            }
        }
    }
}

/// Sample coordinates inside `rect`, clipped to the frame, every `stride`
/// pixels on both axes starting at the rect origin.
fn sample_points(
    rect: &PixelRect,
    dims: FrameDimensions,
    stride: u32,
) -> impl Iterator<Item = (u32, u32)> {
    let step = stride.max(1) as usize;
    let x_end = rect.right().min(dims.width);
    let y_end = rect.bottom().min(dims.height);
    let x_start = rect.x;

    (rect.y..y_end)
        .step_by(step)
        .flat_map(move |y| (x_start..x_end).step_by(step).map(move |x| (x, y)))
}
