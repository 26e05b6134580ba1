//! Integrate-and-fire spiking neuron simulator for oscillatory dynamic link
//! matching (ODLM) image segmentation.
//!
//! Pixels are mapped onto a 2-D grid of neurons. Temporally correlated
//! spiking lets neurons belonging to the same perceptual region synchronize
//! and acquire a common label, yielding a segmentation of the input image.
//! A [`coupler`] correlates two such layers (e.g. an input and a reference
//! image) so labels transfer across the pair.

#![warn(clippy::all)]
#![deny(missing_docs)]

pub mod config;
pub mod coupler;
pub mod error;
pub mod identity;
pub mod layer;
pub mod neuron;
pub mod orchestrator;
pub mod pixel;
pub mod segmentation;
pub mod snapshot;

pub use config::Config;
pub use coupler::{CouplerWeights, CrossLayerMessage, LayerSide, PixelLayerCoupler};
pub use error::{CoreError, Result};
pub use identity::IdAllocator;
pub use layer::{LayerCore, Rect};
pub use neuron::Neuron;
pub use orchestrator::{Orchestrator, RunReport};
pub use pixel::PixelLayer;
pub use segmentation::{RelPos, Segment, SegmentationLayer};

/// Potential a neuron is reset to immediately after it spikes, well below
/// any threshold so it cannot refire in the same cascade before
/// [`layer::LayerCore::global_inhibition`] clamps it.
pub const SPIKE_RESET_POTENTIAL: f32 = -1.0e5;
