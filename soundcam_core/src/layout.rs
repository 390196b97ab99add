// Corner zone geometry. Pure function of frame size and config.
// Sizes are clamped so opposite zones can never overlap, even after rounding.

use serde::{Deserialize, Serialize};

use crate::types::*;

/// One zone's placement in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub corner: Corner,
    pub rect: PixelRect,
}

/// The four corner zones for one frame size, indexed by [`ZoneId::index`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneLayout {
    dimensions: FrameDimensions,
    zones: [Zone; 4],
}

impl ZoneLayout {
    /// Place each zone in its corner.
    ///
    /// Origin is the margin on the near edges, `dimension - size - margin` on
    /// the far edges. With `mirror` the analysed frame is the horizontal
    /// reflection of what the user sees, so left and right corners swap.
    pub fn compute(dimensions: FrameDimensions, config: &DetectorConfig) -> ZoneLayout {
        let (width, height) = (dimensions.width, dimensions.height);
        let margin_x = fraction_of(config.margin_fraction, width).min(width / 2);
        let margin_y = fraction_of(config.margin_fraction, height).min(height / 2);
        let zone_w = fraction_of(config.zone_width_fraction, width).min(width / 2 - margin_x);
        let zone_h = fraction_of(config.zone_height_fraction, height).min(height / 2 - margin_y);

        let zones = ZoneId::ALL.map(|id| {
            let mut corner = config.corners.corner_of(id);
            if config.mirror {
                corner = corner.mirrored();
            }
            let x = if corner.is_right() {
                width - zone_w - margin_x
            } else {
                margin_x
            };
            let y = if corner.is_bottom() {
                height - zone_h - margin_y
            } else {
                margin_y
            };
            Zone {
                id,
                corner,
                rect: PixelRect::new(x, y, zone_w, zone_h),
            }
        });

        ZoneLayout { dimensions, zones }
    }

    pub fn dimensions(&self) -> FrameDimensions {
        self.dimensions
    }

    pub fn zone(&self, id: ZoneId) -> &Zone {
        &self.zones[id.index()]
    }

    /// Zones in evaluation order: previous, next, play, pause.
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    /// Zones with no pixels to sample. They can never activate.
    pub fn degenerate_zones(&self) -> Vec<ZoneId> {
        self.zones
            .iter()
            .filter(|z| z.rect.is_empty())
            .map(|z| z.id)
            .collect()
    }
}

/// `floor(fraction * extent)`, with the fraction snapped to six decimals so
/// f32 noise (0.35 -> 0.3499999940) does not cost a pixel.
fn fraction_of(fraction: f32, extent: u32) -> u32 {
    let fraction = (fraction as f64 * 1e6).round() / 1e6;
    let value = (fraction * extent as f64 + 1e-9).floor();
    if value <= 0.0 {
        0
    } else {
        (value as u32).min(extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_layout_for_720p() {
        let dims = FrameDimensions::new(1280, 720);
        let layout = ZoneLayout::compute(dims, &DetectorConfig::default());

        // 25% x 35% zones, 5% margin per axis.
        assert_eq!(layout.zone(ZoneId::Previous).rect, PixelRect::new(64, 36, 320, 252));
        assert_eq!(layout.zone(ZoneId::Next).rect, PixelRect::new(896, 36, 320, 252));
        assert_eq!(layout.zone(ZoneId::Play).rect, PixelRect::new(64, 432, 320, 252));
        assert_eq!(layout.zone(ZoneId::Pause).rect, PixelRect::new(896, 432, 320, 252));
    }

    #[test]
    fn brightness_preset_is_flush_with_edges() {
        let layout = ZoneLayout::compute(
            FrameDimensions::new(640, 480),
            &DetectorConfig::brightness_preset(),
        );
        assert_eq!(layout.zone(ZoneId::Previous).rect, PixelRect::new(0, 0, 128, 96));
        assert_eq!(layout.zone(ZoneId::Pause).rect, PixelRect::new(512, 384, 128, 96));
    }

    #[test]
    fn mirror_swaps_left_and_right() {
        let config = DetectorConfig {
            mirror: true,
            ..DetectorConfig::brightness_preset()
        };
        let layout = ZoneLayout::compute(FrameDimensions::new(640, 480), &config);
        assert_eq!(layout.zone(ZoneId::Previous).corner, Corner::TopRight);
        assert_eq!(layout.zone(ZoneId::Previous).rect.x, 512);
        assert_eq!(layout.zone(ZoneId::Play).corner, Corner::BottomRight);
    }

    #[test]
    fn corner_assignment_is_respected() {
        let config = DetectorConfig {
            corners: CornerAssignment {
                play: Corner::BottomRight,
                pause: Corner::BottomLeft,
                ..Default::default()
            },
            ..DetectorConfig::brightness_preset()
        };
        let layout = ZoneLayout::compute(FrameDimensions::new(100, 100), &config);
        assert_eq!(layout.zone(ZoneId::Play).rect, PixelRect::new(80, 80, 20, 20));
        assert_eq!(layout.zone(ZoneId::Pause).rect, PixelRect::new(0, 80, 20, 20));
    }

    #[test]
    fn zero_fraction_gives_degenerate_zones() {
        let config = DetectorConfig {
            zone_height_fraction: 0.0,
            ..Default::default()
        };
        let layout = ZoneLayout::compute(FrameDimensions::new(320, 240), &config);
        assert_eq!(layout.degenerate_zones().len(), 4);
    }

    #[test]
    fn empty_frame_gives_degenerate_zones() {
        let layout = ZoneLayout::compute(FrameDimensions::new(0, 0), &DetectorConfig::default());
        assert!(layout.iter().all(|z| z.rect.is_empty()));
    }

    #[test]
    fn iteration_order_is_fixed() {
        let layout = ZoneLayout::compute(FrameDimensions::new(64, 64), &DetectorConfig::default());
        let ids: Vec<ZoneId> = layout.iter().map(|z| z.id).collect();
        assert_eq!(ids, ZoneId::ALL.to_vec());
    }

    fn config_strategy() -> impl Strategy<Value = DetectorConfig> {
        (0.0f32..0.45, 0.0f32..0.45, 0.0f32..0.05, any::<bool>()).prop_map(
            |(zone_width_fraction, zone_height_fraction, margin_fraction, mirror)| DetectorConfig {
                zone_width_fraction,
                zone_height_fraction,
                margin_fraction,
                mirror,
                ..Default::default()
            },
        )
    }

    proptest! {
        /// Property: zones lie inside the frame and never overlap each other.
        #[test]
        fn zones_are_contained_and_disjoint(
            width in 0u32..4096,
            height in 0u32..4096,
            config in config_strategy(),
        ) {
            prop_assert!(config.validate().is_ok());
            let dims = FrameDimensions::new(width, height);
            let layout = ZoneLayout::compute(dims, &config);

            let zones: Vec<&Zone> = layout.iter().collect();
            for (i, a) in zones.iter().enumerate() {
                prop_assert!(a.rect.fits_within(dims), "{:?} outside {:?}", a, dims);
                for b in &zones[i + 1..] {
                    prop_assert!(!a.rect.intersects(&b.rect), "{:?} overlaps {:?}", a, b);
                }
            }
        }

        /// Property: same inputs, same layout.
        #[test]
        fn layout_is_deterministic(
            width in 1u32..2048,
            height in 1u32..2048,
            config in config_strategy(),
        ) {
            let dims = FrameDimensions::new(width, height);
            prop_assert_eq!(ZoneLayout::compute(dims, &config), ZoneLayout::compute(dims, &config));
        }
    }
}
