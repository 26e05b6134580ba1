//! Concrete segmentation layer whose feature is a single grayscale byte
//! per neuron, with homogeneity-based leader election and seeding.

use rand::Rng;

use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::identity::IdAllocator;
use crate::layer::LayerCore;
use crate::neuron::Neuron;
use crate::segmentation::{SegmentFeatures, SegmentationLayer};

/// Grayscale feature model: the row-major pixel buffer backing a
/// [`PixelLayer`].
#[derive(Debug, Clone)]
pub struct PixelFeatures {
    gray: Vec<u8>,
}

impl SegmentFeatures for PixelFeatures {
    fn feat_diff(&self, src_id: usize, dst_id: usize) -> f32 {
        (self.gray[src_id] as f32 - self.gray[dst_id] as f32).abs()
    }
}

/// A [`SegmentationLayer`] whose feature is grayscale pixel intensity.
pub type PixelLayer = SegmentationLayer<PixelFeatures>;

/// Fraction of neighbors within `radius` of `(x, y)` whose grayscale value
/// differs from the pixel at `(x, y)` by less than `delta`.
fn homogeneity(gray: &[u8], width: u32, height: u32, x: u32, y: u32, radius: u32, delta: u8) -> f32 {
    let center = gray[(y * width + x) as usize];
    let r = radius as i64;
    let mut similar = 0u32;
    let mut total = 0u32;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            total += 1;
            let neighbor = gray[(ny as u32 * width + nx as u32) as usize];
            if (center as i32 - neighbor as i32).unsigned_abs() < delta as u32 {
                similar += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        similar as f32 / total as f32
    }
}

impl PixelLayer {
    /// Build a pixel layer from a row-major 8-bit grayscale buffer.
    ///
    /// Each neuron's leader/follower status is decided by
    /// [`homogeneity`] against `config`'s pixel-layer thresholds; initial
    /// potential is either a uniform random draw (`PIXEL_RANDOM_INIT`) or
    /// derived from the pixel's own intensity.
    pub fn from_gray_buffer(
        gray: Vec<u8>,
        width: u32,
        height: u32,
        config: &Config,
        ids: &mut IdAllocator,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions {
                width: width as usize,
                height: height as usize,
            });
        }
        if gray.len() != (width as usize) * (height as usize) {
            return Err(CoreError::invalid_image(format!(
                "buffer length {} does not match {}x{}",
                gray.len(),
                width,
                height
            )));
        }

        let layer_id = ids.next_layer_id();
        let base_label = ids.next_labels((width * height) as usize);
        let mut rng = rand::thread_rng();

        let mut neurons = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let homog = homogeneity(
                    &gray,
                    width,
                    height,
                    x,
                    y,
                    config.pixels.pixel_homog_radius,
                    config.pixels.pixel_homog_delta,
                );
                let max_charge = if homog > config.pixels.pixel_homog_threshold {
                    config.neuron.charging_leader
                } else {
                    config.neuron.charging_follower
                };
                let pixel = gray[(y * width + x) as usize];
                let pot = if config.pixels.pixel_random_init {
                    rng.gen::<f32>() * config.neuron.pot_threshold
                } else {
                    0.99 * config.neuron.pot_threshold * (pixel as f32 / 255.0)
                };
                let label = base_label + (y * width + x) as i32;
                neurons.push(Neuron::new(x, y, width, label, max_charge, pot));
            }
        }

        let core = LayerCore::new(
            neurons,
            width,
            height,
            layer_id,
            config.neuron.pot_threshold,
            config.neuron.tau,
            config.neuron.global_inhib_val,
            config.neuron.charging_leader,
        );

        Ok(SegmentationLayer::new(
            core,
            PixelFeatures { gray },
            config.connection.seg_weight_max,
            config.connection.seg_weight_slope,
            config.connection.seg_weight_offset,
            config.simulation.seg_merge_delta,
            config.simulation.seg_trigger_same_label_neurons,
            config.simulation.seg_merge_segments,
            config.simulation.seg_max_cycles,
            config.simulation.seg_max_cascades,
            config.simulation.min_segment_size,
        ))
    }

    /// The grayscale buffer backing this layer.
    pub fn gray(&self) -> &[u8] {
        &self.features.gray
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_config() -> Config {
        let mut cfg = Config::default();
        cfg.pixels.pixel_random_init = false;
        cfg.pixels.pixel_homog_threshold = 0.5;
        cfg
    }

    #[test]
    fn solid_image_makes_every_neuron_a_leader() {
        let gray = vec![128u8; 8 * 8];
        let mut ids = IdAllocator::new();
        let layer = PixelLayer::from_gray_buffer(gray, 8, 8, &solid_config(), &mut ids).unwrap();
        assert!(layer
            .core
            .neurons
            .iter()
            .all(|n| n.max_charge == solid_config().neuron.charging_leader));
    }

    #[test]
    fn mismatched_buffer_length_is_rejected() {
        let gray = vec![0u8; 10];
        let mut ids = IdAllocator::new();
        let err = PixelLayer::from_gray_buffer(gray, 8, 8, &Config::default(), &mut ids).unwrap_err();
        matches!(err, CoreError::InvalidImage { .. });
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let mut ids = IdAllocator::new();
        let err = PixelLayer::from_gray_buffer(vec![], 0, 4, &Config::default(), &mut ids).unwrap_err();
        matches!(err, CoreError::InvalidDimensions { .. });
    }

    #[test]
    fn labels_are_globally_unique_across_two_layers() {
        let mut ids = IdAllocator::new();
        let a = PixelLayer::from_gray_buffer(vec![0u8; 4], 2, 2, &solid_config(), &mut ids).unwrap();
        let b = PixelLayer::from_gray_buffer(vec![0u8; 4], 2, 2, &solid_config(), &mut ids).unwrap();
        let a_labels: std::collections::HashSet<_> = a.core.neurons.iter().map(|n| n.label).collect();
        let b_labels: std::collections::HashSet<_> = b.core.neurons.iter().map(|n| n.label).collect();
        assert!(a_labels.is_disjoint(&b_labels));
    }

    #[test]
    fn homogeneity_is_one_for_a_uniform_neighborhood() {
        let gray = vec![10u8; 9];
        let h = homogeneity(&gray, 3, 3, 1, 1, 1, 5);
        assert_eq!(h, 1.0);
    }

    #[test]
    fn homogeneity_drops_across_a_sharp_edge() {
        let mut gray = vec![0u8; 4 * 4];
        for y in 0..4u32 {
            for x in 0..4u32 {
                gray[(y * 4 + x) as usize] = if x < 2 { 0 } else { 255 };
            }
        }
        let h = homogeneity(&gray, 4, 4, 1, 1, 1, 55);
        assert!(h < 1.0);
    }
}
