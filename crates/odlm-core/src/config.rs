//! Process-wide simulation parameters, loaded once per run and captured by
//! value into each layer at construction.
//!
//! The persisted format is an INI-style sectioned `key = value` file. No
//! crate in the dependency graph targets this exact format, so the reader
//! and writer below are hand-rolled, in the spirit of the small textual
//! formats the rest of this workspace parses by hand.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Neuron membrane dynamics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronParams {
    /// Firing threshold.
    pub pot_threshold: f32,
    /// Membrane time constant.
    pub tau: f32,
    /// Potential subtracted from every neuron once per cascade.
    pub global_inhib_val: f32,
    /// `max_charge` assigned to leader (self-oscillating) neurons.
    pub charging_leader: f32,
    /// `max_charge` assigned to follower neurons.
    pub charging_follower: f32,
}

/// Intra-layer segmentation weight shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionParams {
    /// Weight ceiling.
    pub seg_weight_max: f32,
    /// Logistic slope.
    pub seg_weight_slope: f32,
    /// Logistic offset.
    pub seg_weight_offset: f32,
}

/// Cross-layer matching weight shape and behavioral toggles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Hard cascade ceiling per run, 0 means unlimited.
    pub seg_max_cascades: u32,
    /// Hard cycle ceiling per run.
    pub seg_max_cycles: u32,
    /// Whether same-label neurons co-fire on a single spike.
    pub seg_trigger_same_label_neurons: bool,
    /// Whether adjacent segments merge on a strong cross-boundary weight.
    pub seg_merge_segments: bool,
    /// Feature difference beyond which two segments are eligible to merge.
    pub seg_merge_delta: f32,
    /// Segments smaller than this are cleared back to unsegmented.
    pub min_segment_size: u32,
    /// Cross-layer matching weight ceiling.
    pub matching_weight_max: f32,
    /// Cross-layer matching logistic slope.
    pub matching_weight_slope: f32,
    /// Cross-layer matching logistic offset.
    pub matching_weight_offset: f32,
}

/// Input image resize policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputImageParams {
    /// Resize preserving aspect ratio to `keep_ratio_longest_img_side`.
    pub resize_img_keep_ratio: bool,
    /// Target length of the longest side when `resize_img_keep_ratio`.
    pub keep_ratio_longest_img_side: u32,
    /// Resize (ignoring aspect ratio) to a fixed size.
    pub fixed_input_imgs_size: bool,
    /// Target width when `fixed_input_imgs_size`.
    pub fixed_input_imgs_width: u32,
    /// Target height when `fixed_input_imgs_size`.
    pub fixed_input_imgs_height: u32,
}

/// `PixelLayer` homogeneity-based leader election and seeding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelsParams {
    /// Maximum grayscale difference considered "similar" for homogeneity.
    pub pixel_homog_delta: u8,
    /// Square radius used by the homogeneity neighborhood scan.
    pub pixel_homog_radius: u32,
    /// Minimum similar-neighbor fraction to classify a pixel as a leader.
    pub pixel_homog_threshold: f32,
    /// Seed initial potential from a uniform random draw instead of the
    /// pixel value.
    pub pixel_random_init: bool,
}

/// Complete parameter bag for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// `[Neuron]` section.
    pub neuron: NeuronParams,
    /// `[NeuralConnexion]` section.
    pub connection: ConnectionParams,
    /// `[SimulationParams]` section.
    pub simulation: SimulationParams,
    /// `[InputImageParams]` section.
    pub input_image: InputImageParams,
    /// `[PixelsParams]` section.
    pub pixels: PixelsParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            neuron: NeuronParams {
                pot_threshold: 1.0,
                tau: 1.0,
                global_inhib_val: 0.002,
                charging_leader: 1.01,
                charging_follower: 0.5,
            },
            connection: ConnectionParams {
                seg_weight_max: 0.01,
                seg_weight_slope: 1.2,
                seg_weight_offset: 0.0,
            },
            simulation: SimulationParams {
                seg_max_cascades: 0,
                seg_max_cycles: 50,
                seg_trigger_same_label_neurons: false,
                seg_merge_segments: false,
                seg_merge_delta: 2.0,
                min_segment_size: 80,
                matching_weight_max: 1.0,
                matching_weight_slope: 1.0,
                matching_weight_offset: 10.0,
            },
            input_image: InputImageParams {
                resize_img_keep_ratio: false,
                keep_ratio_longest_img_side: 150,
                fixed_input_imgs_size: false,
                fixed_input_imgs_width: 64,
                fixed_input_imgs_height: 128,
            },
            pixels: PixelsParams {
                pixel_homog_delta: 55,
                pixel_homog_radius: 4,
                pixel_homog_threshold: 0.6,
                pixel_random_init: true,
            },
        }
    }
}

impl Config {
    /// Load a configuration from an INI-style sectioned file.
    ///
    /// Blank lines, lines starting with `;` or `#`, and `[section]` headers
    /// are recognized but section names are not otherwise validated — keys
    /// are matched by name regardless of which section they appear under —
    /// the key namespace is flat. An unparseable `key = value` line aborts
    /// the whole load.
    pub fn load_ini(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse_ini(&text)
    }

    /// Parse an INI-style string into a [`Config`], starting from
    /// [`Config::default()`] and overwriting only the keys present.
    pub fn parse_ini(text: &str) -> Result<Self> {
        let mut cfg = Self::default();
        for (idx, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| CoreError::ConfigParse {
                line: idx + 1,
                text: raw_line.to_string(),
            })?;
            let key = key.trim();
            let value = value.trim();
            cfg.set_key(key, value)
                .map_err(|_| CoreError::ConfigParse {
                    line: idx + 1,
                    text: raw_line.to_string(),
                })?;
        }
        Ok(cfg)
    }

    fn set_key(&mut self, key: &str, value: &str) -> std::result::Result<(), ()> {
        let f = |s: &str| s.parse::<f32>().map_err(|_| ());
        let u = |s: &str| s.parse::<u32>().map_err(|_| ());
        let b = |s: &str| match s {
            "True" => Ok(true),
            "False" => Ok(false),
            _ => Err(()),
        };
        match key {
            "POT_THRESHOLD" => self.neuron.pot_threshold = f(value)?,
            "TAU" => self.neuron.tau = f(value)?,
            "GLOBAL_INHIB_VAL" => self.neuron.global_inhib_val = f(value)?,
            "CHARGING_LEADER" => self.neuron.charging_leader = f(value)?,
            "CHARGING_FOLLOWER" => self.neuron.charging_follower = f(value)?,
            "SEG_WEIGHT_MAX" => self.connection.seg_weight_max = f(value)?,
            "SEG_WEIGHT_SLOPE" => self.connection.seg_weight_slope = f(value)?,
            "SEG_WEIGHT_OFFSET" => self.connection.seg_weight_offset = f(value)?,
            "MATCHING_WEIGHT_MAX" => self.simulation.matching_weight_max = f(value)?,
            "MATCHING_WEIGHT_SLOPE" => self.simulation.matching_weight_slope = f(value)?,
            "MATCHING_WEIGHT_OFFSET" => self.simulation.matching_weight_offset = f(value)?,
            "SEG_MAX_CASCADES" => self.simulation.seg_max_cascades = u(value)?,
            "SEG_MAX_CYCLES" => self.simulation.seg_max_cycles = u(value)?,
            "SEG_TRIGGER_SAME_LABEL_NEURONS" => {
                self.simulation.seg_trigger_same_label_neurons = b(value)?
            }
            "SEG_MERGE_SEGMENTS" => self.simulation.seg_merge_segments = b(value)?,
            "SEG_MERGE_DELTA" => self.simulation.seg_merge_delta = f(value)?,
            "MIN_SEGMENT_SIZE" => self.simulation.min_segment_size = u(value)?,
            "RESIZE_IMG_KEEP_RATIO" => self.input_image.resize_img_keep_ratio = b(value)?,
            "KEEP_RATIO_LONGEST_IMG_SIDE" => {
                self.input_image.keep_ratio_longest_img_side = u(value)?
            }
            "FIXED_INPUT_IMGS_SIZE" => self.input_image.fixed_input_imgs_size = b(value)?,
            "FIXED_INPUT_IMGS_WIDTH" => self.input_image.fixed_input_imgs_width = u(value)?,
            "FIXED_INPUT_IMGS_HEIGHT" => self.input_image.fixed_input_imgs_height = u(value)?,
            "PIXEL_HOMOG_DELTA" => self.pixels.pixel_homog_delta = u(value)? as u8,
            "PIXEL_HOMOG_RADIUS" => self.pixels.pixel_homog_radius = u(value)?,
            "PIXEL_HOMOG_THRESHOLD" => self.pixels.pixel_homog_threshold = f(value)?,
            "PIXEL_RANDOM_INIT" => self.pixels.pixel_random_init = b(value)?,
            _ => return Err(()),
        }
        Ok(())
    }

    /// Render this configuration as an INI-style sectioned string.
    pub fn to_ini(&self) -> String {
        let b = |v: bool| if v { "True" } else { "False" };
        let mut out = String::new();
        let _ = writeln!(out, "[Neuron]");
        let _ = writeln!(out, "POT_THRESHOLD = {}", self.neuron.pot_threshold);
        let _ = writeln!(out, "TAU = {}", self.neuron.tau);
        let _ = writeln!(out, "GLOBAL_INHIB_VAL = {}", self.neuron.global_inhib_val);
        let _ = writeln!(out, "CHARGING_LEADER = {}", self.neuron.charging_leader);
        let _ = writeln!(
            out,
            "CHARGING_FOLLOWER = {}",
            self.neuron.charging_follower
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "[NeuralConnexion]");
        let _ = writeln!(
            out,
            "SEG_WEIGHT_MAX = {}",
            self.connection.seg_weight_max
        );
        let _ = writeln!(
            out,
            "SEG_WEIGHT_SLOPE = {}",
            self.connection.seg_weight_slope
        );
        let _ = writeln!(
            out,
            "SEG_WEIGHT_OFFSET = {}",
            self.connection.seg_weight_offset
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "[SimulationParams]");
        let _ = writeln!(
            out,
            "SEG_MAX_CASCADES = {}",
            self.simulation.seg_max_cascades
        );
        let _ = writeln!(out, "SEG_MAX_CYCLES = {}", self.simulation.seg_max_cycles);
        let _ = writeln!(
            out,
            "SEG_TRIGGER_SAME_LABEL_NEURONS = {}",
            b(self.simulation.seg_trigger_same_label_neurons)
        );
        let _ = writeln!(
            out,
            "SEG_MERGE_SEGMENTS = {}",
            b(self.simulation.seg_merge_segments)
        );
        let _ = writeln!(out, "SEG_MERGE_DELTA = {}", self.simulation.seg_merge_delta);
        let _ = writeln!(
            out,
            "MIN_SEGMENT_SIZE = {}",
            self.simulation.min_segment_size
        );
        let _ = writeln!(
            out,
            "MATCHING_WEIGHT_MAX = {}",
            self.simulation.matching_weight_max
        );
        let _ = writeln!(
            out,
            "MATCHING_WEIGHT_SLOPE = {}",
            self.simulation.matching_weight_slope
        );
        let _ = writeln!(
            out,
            "MATCHING_WEIGHT_OFFSET = {}",
            self.simulation.matching_weight_offset
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "[InputImageParams]");
        let _ = writeln!(
            out,
            "RESIZE_IMG_KEEP_RATIO = {}",
            b(self.input_image.resize_img_keep_ratio)
        );
        let _ = writeln!(
            out,
            "KEEP_RATIO_LONGEST_IMG_SIDE = {}",
            self.input_image.keep_ratio_longest_img_side
        );
        let _ = writeln!(
            out,
            "FIXED_INPUT_IMGS_SIZE = {}",
            b(self.input_image.fixed_input_imgs_size)
        );
        let _ = writeln!(
            out,
            "FIXED_INPUT_IMGS_WIDTH = {}",
            self.input_image.fixed_input_imgs_width
        );
        let _ = writeln!(
            out,
            "FIXED_INPUT_IMGS_HEIGHT = {}",
            self.input_image.fixed_input_imgs_height
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "[PixelsParams]");
        let _ = writeln!(
            out,
            "PIXEL_HOMOG_DELTA = {}",
            self.pixels.pixel_homog_delta
        );
        let _ = writeln!(
            out,
            "PIXEL_HOMOG_RADIUS = {}",
            self.pixels.pixel_homog_radius
        );
        let _ = writeln!(
            out,
            "PIXEL_HOMOG_THRESHOLD = {}",
            self.pixels.pixel_homog_threshold
        );
        let _ = writeln!(
            out,
            "PIXEL_RANDOM_INIT = {}",
            b(self.pixels.pixel_random_init)
        );
        out
    }

    /// Write this configuration as an INI-style sectioned file.
    pub fn save_ini(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_ini())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.neuron.pot_threshold, 1.0);
        assert_eq!(cfg.neuron.charging_leader, 1.01);
        assert_eq!(cfg.neuron.charging_follower, 0.5);
        assert_eq!(cfg.simulation.seg_max_cycles, 50);
        assert_eq!(cfg.simulation.min_segment_size, 80);
        assert!(cfg.pixels.pixel_random_init);
    }

    #[test]
    fn round_trips_through_ini() {
        let cfg = Config::default();
        let text = cfg.to_ini();
        let parsed = Config::parse_ini(&text).expect("default ini must parse");
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn overrides_only_named_keys() {
        let text = "[Neuron]\nPOT_THRESHOLD = 2.5\n";
        let cfg = Config::parse_ini(text).unwrap();
        assert_eq!(cfg.neuron.pot_threshold, 2.5);
        // Untouched keys keep their defaults.
        assert_eq!(cfg.neuron.tau, 1.0);
    }

    #[test]
    fn malformed_line_aborts_load() {
        let text = "[Neuron]\nPOT_THRESHOLD\n";
        let err = Config::parse_ini(text).unwrap_err();
        matches!(err, CoreError::ConfigParse { line: 2, .. });
    }

    #[test]
    fn unknown_key_aborts_load() {
        let text = "NOT_A_REAL_KEY = 1\n";
        assert!(Config::parse_ini(text).is_err());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "; a comment\n\n# another comment\n[Neuron]\nTAU = 2.0\n";
        let cfg = Config::parse_ini(text).unwrap();
        assert_eq!(cfg.neuron.tau, 2.0);
    }
}
