//! Drives one or two segmentation layers to convergence.
//!
//! Owns the layer(s) plus an optional coupler and runs the cascade/cycle
//! loop from outside, so that cross-layer messages can be collected from
//! one layer's cascade and applied to the other before its own firing pass
//! in the same cascade step — the message-queue discipline described in
//! [`crate::coupler`].

use log::debug;

use crate::coupler::{LayerSide, PixelLayerCoupler};
use crate::pixel::PixelLayer;

/// Summary counters for one completed (or capped) run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunReport {
    /// Cycles completed.
    pub cycles: u32,
    /// Cascades completed.
    pub cascades: u32,
    /// Lifetime spikes fired.
    pub spikes: u64,
    /// Final stabilization coefficient.
    pub stabilization: f32,
}

enum Layers {
    Single(PixelLayer),
    Coupled(PixelLayer, PixelLayer, PixelLayerCoupler),
}

/// Owns one or two pixel layers and drives segmentation to convergence.
pub struct Orchestrator {
    layers: Layers,
}

impl Orchestrator {
    /// Drive a single layer to convergence independently.
    pub fn single(layer: PixelLayer) -> Self {
        Self {
            layers: Layers::Single(layer),
        }
    }

    /// Drive two layers in lockstep, exchanging coupler messages at every
    /// cascade boundary.
    pub fn coupled(first: PixelLayer, second: PixelLayer, coupler: PixelLayerCoupler) -> Self {
        Self {
            layers: Layers::Coupled(first, second, coupler),
        }
    }

    /// Run to convergence or the configured ceilings.
    ///
    /// For a single layer this is exactly
    /// [`crate::segmentation::SegmentationLayer::segment_layer`]. For a
    /// coupled pair, each iteration advances *both* layers one cascade,
    /// translates the spikes each produced through the coupler, and
    /// applies the resulting messages to the other layer before its next
    /// cascade — termination requires each side to independently satisfy
    /// its own stabilization/cascade/cycle conditions; a side that has
    /// already converged keeps being "stepped" but produces no further
    /// spikes and costs nothing beyond a firing pass that returns
    /// immediately.
    pub fn run(&mut self) -> RunReport {
        match &mut self.layers {
            Layers::Single(layer) => {
                let (cycles, cascades, stabilization) = layer.segment_layer();
                debug!(
                    "single-layer run complete: cycles={cycles} cascades={cascades} coef={stabilization:.4}"
                );
                RunReport {
                    cycles,
                    cascades,
                    spikes: layer.core.n_spikes,
                    stabilization,
                }
            }
            Layers::Coupled(first, second, coupler) => {
                let mut first_done = false;
                let mut second_done = false;
                loop {
                    if first_done && second_done {
                        break;
                    }

                    let first_outcome = if !first_done {
                        Some(first.step_cascade())
                    } else {
                        None
                    };
                    let second_outcome = if !second_done {
                        Some(second.step_cascade())
                    } else {
                        None
                    };

                    if let Some(outcome) = &first_outcome {
                        let messages =
                            coupler.propagate(first, second, &outcome.spikes, LayerSide::Second, first.core.n_cascades as i32);
                        coupler.apply(second, &messages, LayerSide::Second);
                    }
                    if let Some(outcome) = &second_outcome {
                        let messages =
                            coupler.propagate(second, first, &outcome.spikes, LayerSide::First, second.core.n_cascades as i32);
                        coupler.apply(first, &messages, LayerSide::First);
                    }

                    if !first_done {
                        first.finish_cycle_if_complete();
                        if let Some(outcome) = first_outcome {
                            first_done = outcome.converged || outcome.cascade_cap_hit || first.cycle_cap_hit();
                        }
                    }
                    if !second_done {
                        second.finish_cycle_if_complete();
                        if let Some(outcome) = second_outcome {
                            second_done = outcome.converged || outcome.cascade_cap_hit || second.cycle_cap_hit();
                        }
                    }
                }

                debug!(
                    "coupled run complete: first=(cycles={} cascades={}) second=(cycles={} cascades={})",
                    first.core.n_cycles, first.core.n_cascades, second.core.n_cycles, second.core.n_cascades
                );

                RunReport {
                    cycles: first.core.n_cycles.max(second.core.n_cycles),
                    cascades: first.core.n_cascades.max(second.core.n_cascades),
                    spikes: first.core.n_spikes + second.core.n_spikes,
                    stabilization: first
                        .core
                        .get_coef_stabilization(0)
                        .max(second.core.get_coef_stabilization(0)),
                }
            }
        }
    }

    /// Borrow the single layer, if this orchestrator was built with
    /// [`Orchestrator::single`].
    pub fn single_layer(&self) -> Option<&PixelLayer> {
        match &self.layers {
            Layers::Single(layer) => Some(layer),
            Layers::Coupled(..) => None,
        }
    }

    /// Borrow both layers, if this orchestrator was built with
    /// [`Orchestrator::coupled`].
    pub fn coupled_layers(&self) -> Option<(&PixelLayer, &PixelLayer)> {
        match &self.layers {
            Layers::Coupled(first, second, _) => Some((first, second)),
            Layers::Single(_) => None,
        }
    }

    /// Mutably borrow the single layer, if this orchestrator was built with
    /// [`Orchestrator::single`]. Used by hosts that want to apply
    /// post-processing such as [`crate::segmentation::SegmentationLayer::finalize_segments`]
    /// after [`Orchestrator::run`] returns.
    pub fn single_layer_mut(&mut self) -> Option<&mut PixelLayer> {
        match &mut self.layers {
            Layers::Single(layer) => Some(layer),
            Layers::Coupled(..) => None,
        }
    }

    /// Mutably borrow both layers, if this orchestrator was built with
    /// [`Orchestrator::coupled`].
    pub fn coupled_layers_mut(&mut self) -> Option<(&mut PixelLayer, &mut PixelLayer)> {
        match &mut self.layers {
            Layers::Coupled(first, second, _) => Some((first, second)),
            Layers::Single(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::coupler::CouplerWeights;
    use crate::identity::IdAllocator;

    fn solid_layer(value: u8, cfg: &Config, ids: &mut IdAllocator) -> PixelLayer {
        PixelLayer::from_gray_buffer(vec![value; 8 * 8], 8, 8, cfg, ids).unwrap()
    }

    #[test]
    fn single_layer_run_converges_on_a_solid_image() {
        let mut cfg = Config::default();
        cfg.pixels.pixel_random_init = false;
        cfg.pixels.pixel_homog_threshold = 0.5;
        let mut ids = IdAllocator::new();
        let layer = solid_layer(128, &cfg, &mut ids);
        let mut orch = Orchestrator::single(layer);
        let report = orch.run();
        assert!(report.cycles <= 2);
    }

    #[test]
    fn coupled_run_produces_reports_for_both_sides() {
        let mut cfg = Config::default();
        cfg.pixels.pixel_random_init = false;
        cfg.pixels.pixel_homog_threshold = 0.5;
        cfg.simulation.seg_max_cycles = 5;
        let mut ids = IdAllocator::new();
        let a = solid_layer(128, &cfg, &mut ids);
        let b = solid_layer(128, &cfg, &mut ids);
        let coupler = PixelLayerCoupler::new(CouplerWeights {
            max: cfg.simulation.matching_weight_max,
            slope: cfg.simulation.matching_weight_slope,
            offset: cfg.simulation.matching_weight_offset,
        });
        let mut orch = Orchestrator::coupled(a, b, coupler);
        let report = orch.run();
        assert!(report.cascades > 0);
        assert!(orch.coupled_layers().is_some());
    }
}
