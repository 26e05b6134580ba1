//! Cross-layer correlation between two pixel layers.
//!
//! A callback that reaches across and mutates a sibling layer's neurons
//! directly would need `&mut` references into two layers held open at once,
//! which Rust's aliasing rules forbid without `unsafe` or `RefCell`. This
//! instead models cross-layer effects as messages: the
//! [`crate::orchestrator::Orchestrator`] collects the spikes one layer's
//! cascade produced, asks the coupler to translate them, and applies the
//! resulting messages to the other layer before that layer's own firing
//! pass in the same cascade.

use crate::pixel::PixelLayer;

/// Which side of a coupled pair a message targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSide {
    /// The first layer passed to [`crate::orchestrator::Orchestrator::coupled`].
    First,
    /// The second layer.
    Second,
}

/// One cross-layer effect to apply to the target layer's neuron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossLayerMessage {
    /// Which layer this message applies to.
    pub target_layer: LayerSide,
    /// Neuron id within the target layer.
    pub neuron_id: usize,
    /// Potential to add to the target neuron.
    pub delta_pot: f32,
    /// Label to propagate to the target neuron if it crosses threshold.
    pub incoming_label: i32,
    /// Cascade phase of the originating spike.
    pub phase: i32,
}

/// Logistic weight parameters for cross-layer matching, independent from a
/// layer's own intra-layer segmentation weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CouplerWeights {
    /// Weight ceiling.
    pub max: f32,
    /// Logistic slope.
    pub slope: f32,
    /// Logistic offset.
    pub offset: f32,
}

impl CouplerWeights {
    /// Logistic weight for a feature difference.
    pub fn compute(&self, feat_diff: f32) -> f32 {
        let sigma = 1.0 / (1.0 + (-self.slope * (feat_diff.abs() - self.offset)).exp());
        self.max * (1.0 - sigma)
    }
}

/// Stateless bidirectional bridge between two pixel layers.
///
/// All state lives in the two layers; the coupler only carries the
/// matching weight parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelLayerCoupler {
    /// Cross-layer matching weight shape.
    pub weights: CouplerWeights,
}

impl PixelLayerCoupler {
    /// Build a coupler from matching weight parameters.
    pub fn new(weights: CouplerWeights) -> Self {
        Self { weights }
    }

    /// Absolute grayscale difference between the firing neuron `src_id` in
    /// `from` and the candidate neuron `dst_id` in `to`.
    fn feat_diff(from: &PixelLayer, to: &PixelLayer, src_id: usize, dst_id: usize) -> f32 {
        (from.gray()[src_id] as f32 - to.gray()[dst_id] as f32).abs()
    }

    /// Translate the spikes produced by `from`'s cascade into messages for
    /// `to`, mirroring every spiking neuron id onto its counterpart.
    ///
    /// Every neuron in `to` is visited for every spike, matching the
    /// all-pairs handler in the original design — acceptable on small
    /// images, a known quadratic hotspot on large ones.
    pub fn propagate(
        &self,
        from: &PixelLayer,
        to: &PixelLayer,
        spikes: &[usize],
        target: LayerSide,
        phase: i32,
    ) -> Vec<CrossLayerMessage> {
        let mut messages = Vec::new();
        for &src_id in spikes {
            let incoming_label = from.core.neurons[src_id].label;
            for dst_id in 0..to.core.neurons.len() {
                let diff = Self::feat_diff(from, to, src_id, dst_id);
                let w = self.weights.compute(diff);
                messages.push(CrossLayerMessage {
                    target_layer: target,
                    neuron_id: dst_id,
                    delta_pot: w,
                    incoming_label,
                    phase,
                });
            }
        }
        messages
    }

    /// Apply a batch of messages to their target layer's neurons, adding
    /// potential and propagating the incoming label on threshold crossing.
    pub fn apply(&self, layer: &mut PixelLayer, messages: &[CrossLayerMessage], side: LayerSide) {
        let pot_threshold = layer.core.pot_threshold;
        for msg in messages {
            if msg.target_layer != side {
                continue;
            }
            let n = &mut layer.core.neurons[msg.neuron_id];
            n.pot += msg.delta_pot;
            if n.pot >= pot_threshold && n.label != msg.incoming_label {
                n.label = msg.incoming_label;
                n.phase = msg.phase;
                n.is_segmented = true;
            }
        }
    }
}
