// soundcam_core: SoundCam Rust/WASM engine.
// Cover a corner of the camera view with a hand to trigger previous/next/play/pause.
// JS owns the camera, canvas and audio element; the zone logic lives here.

mod detector;
mod error;
mod frame;
mod layout;
mod playback;
mod scheduler;
mod signal;
mod source;
mod types;

use tracing::warn;
use wasm_bindgen::prelude::*;

pub use detector::{DetectorObserver, ZoneDetector};
pub use error::DetectorError;
pub use frame::FrameBuffer;
pub use layout::{Zone, ZoneLayout};
pub use playback::{format_time, PlaybackController, Playlist, Track};
pub use scheduler::{DetectionLoop, ManualScheduler, TickHandle, TickScheduler};
pub use signal::{mean_luminance, motion_percent, ZoneSignal};
pub use source::{FrameSource, LatestFrameSlot};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Forwards each action to an optional JS `(action: string) => void`.
struct JsActionCallback<'a> {
    callback: Option<&'a js_sys::Function>,
}

impl DetectorObserver for JsActionCallback<'_> {
    fn on_action(&mut self, event: ActionEvent) {
        if let Some(callback) = self.callback {
            let action = JsValue::from_str(event.zone.as_str());
            if let Err(err) = callback.call1(&JsValue::NULL, &action) {
                warn!(zone = event.zone.as_str(), ?err, "action callback threw");
            }
        }
    }
}

/// Zone detector exposed to JavaScript.
///
/// The host drives it from `requestAnimationFrame`:
///
/// ```js
/// const detector = new WasmZoneDetector('{"cooldown_ms": 800}');
/// detector.set_action_callback((action) => player.handle(action));
/// let handle = detector.start();
/// const loop = (now) => {
///   ctx.drawImage(video, 0, 0, canvas.width, canvas.height);
///   const image = ctx.getImageData(0, 0, canvas.width, canvas.height);
///   const report = JSON.parse(detector.tick(handle, image.data, image.width, image.height, now));
///   if (report.next_tick !== null) { handle = report.next_tick; requestAnimationFrame(loop); }
/// };
/// requestAnimationFrame(loop);
/// ```
#[wasm_bindgen]
pub struct WasmZoneDetector {
    engine: FrameEngine,
    callback: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl WasmZoneDetector {
    /// Create a detector from a JSON `DetectorConfig`. Invalid config is rejected here.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmZoneDetector, JsValue> {
        let engine = FrameEngine::from_json(config_json)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmZoneDetector {
            engine,
            callback: None,
        })
    }

    /// Called with the action name (`"previous"`, `"next"`, `"play"`, `"pause"`).
    pub fn set_action_callback(&mut self, callback: js_sys::Function) {
        self.callback = Some(callback);
    }

    pub fn clear_action_callback(&mut self) {
        self.callback = None;
    }

    /// Arm the loop. Returns the handle for the first tick.
    pub fn start(&mut self) -> u32 {
        self.engine.start()
    }

    /// Evaluate one frame of `ImageData.data`. Returns a `TickReport` as JSON.
    ///
    /// Empty or mis-sized pixel data counts as "no frame ready".
    pub fn tick(
        &mut self,
        handle: u32,
        pixels: &js_sys::Uint8ClampedArray,
        width: u32,
        height: u32,
        now_ms: f64,
    ) -> Result<String, JsValue> {
        let mut observer = JsActionCallback {
            callback: self.callback.as_ref(),
        };
        let report = self
            .engine
            .tick(handle, pixels.to_vec(), width, height, now_ms, &mut observer);
        serde_json::to_string(&report)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Stop the loop. Any outstanding handle becomes inert.
    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Current zone geometry as JSON, `null` before the first frame.
    pub fn zones_json(&self) -> Result<String, JsValue> {
        self.engine
            .zones_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// Binding logic kept free of `JsValue` so it runs natively under test.
struct FrameEngine {
    inner: DetectionLoop<ManualScheduler>,
}

impl FrameEngine {
    fn from_json(config_json: &str) -> Result<FrameEngine, DetectorError> {
        let detector = ZoneDetector::from_json(config_json)?;
        Ok(FrameEngine {
            inner: DetectionLoop::new(detector, ManualScheduler::new()),
        })
    }

    fn start(&mut self) -> u32 {
        self.inner.start().id()
    }

    fn tick<O: DetectorObserver + ?Sized>(
        &mut self,
        handle: u32,
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        now_ms: f64,
        observer: &mut O,
    ) -> TickReport {
        let dims = FrameDimensions::new(width, height);
        let mut supplied = match FrameBuffer::new(dims, pixels) {
            Ok(frame) => Some(frame),
            Err(err) => {
                warn!(%err, "frame dropped");
                None
            }
        };
        self.inner.on_tick(
            TickHandle::new(handle),
            Timestamp::from_millis_f64(now_ms),
            &mut supplied,
            observer,
        )
    }

    fn stop(&mut self) {
        self.inner.stop();
    }

    fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    fn zones_json(&self) -> Result<String, DetectorError> {
        Ok(serde_json::to_string(&self.inner.detector().layout())?)
    }
}
