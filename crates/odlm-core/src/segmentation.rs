//! 8-neighbor intra-layer spike propagation, label synchronization and
//! segment bookkeeping shared by every concrete segmentation layer kind.

use crate::layer::LayerCore;
use crate::neuron::Neuron;

/// Relative position of one of a neuron's up-to-eight grid neighbors.
///
/// Ordered to match the offset table used throughout this module:
/// the four axis neighbors first, then the four diagonals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelPos {
    /// Directly above.
    Up,
    /// Directly below.
    Down,
    /// Directly left.
    Left,
    /// Directly right.
    Right,
    /// Above and to the left.
    UpLeft,
    /// Above and to the right.
    UpRight,
    /// Below and to the left.
    DownLeft,
    /// Below and to the right.
    DownRight,
}

impl RelPos {
    /// All eight relative positions.
    pub const ALL: [RelPos; 8] = [
        RelPos::UpLeft,
        RelPos::Up,
        RelPos::UpRight,
        RelPos::Left,
        RelPos::Right,
        RelPos::DownLeft,
        RelPos::Down,
        RelPos::DownRight,
    ];

    /// Flat index offset relative to a neuron's own id, for a layer of the
    /// given `width`.
    pub fn offset(self, width: u32) -> i64 {
        let w = width as i64;
        match self {
            RelPos::UpLeft => -w - 1,
            RelPos::Up => -w,
            RelPos::UpRight => -w + 1,
            RelPos::Left => -1,
            RelPos::Right => 1,
            RelPos::DownLeft => w - 1,
            RelPos::Down => w,
            RelPos::DownRight => w + 1,
        }
    }

    /// Whether a neuron at grid position `(col, row)` has a valid neighbor
    /// in this direction.
    ///
    /// The right/bottom bounds are `col < width - 2` / `row < height - 2`
    /// rather than `width - 1` / `height - 1` — this excludes the last
    /// column and row from receiving propagated spikes from their
    /// left/upper neighbors even though those cells lie inside the grid.
    /// Preserved exactly as inherited; see the design notes.
    fn is_valid(self, col: u32, row: u32, width: u32, height: u32) -> bool {
        // `width`/`height` may be as small as 1 (single-row or single-column
        // grids); saturate instead of underflowing so those grids simply
        // have no valid right/bottom neighbors rather than panicking or
        // wrapping.
        let col_limit = width.saturating_sub(2);
        let row_limit = height.saturating_sub(2);
        match self {
            RelPos::Up => row > 0,
            RelPos::Down => row < row_limit,
            RelPos::Left => col > 0,
            RelPos::Right => col < col_limit,
            RelPos::UpLeft => row > 0 && col > 0,
            RelPos::UpRight => row > 0 && col < col_limit,
            RelPos::DownLeft => row < row_limit && col > 0,
            RelPos::DownRight => row < row_limit && col < col_limit,
        }
    }
}

/// Feature model supplied by a concrete segmentation layer kind: how two
/// neurons' underlying features differ, used to shape propagation weight.
pub trait SegmentFeatures {
    /// Absolute feature difference between the neurons at `src_id` and
    /// `dst_id`.
    fn feat_diff(&self, src_id: usize, dst_id: usize) -> f32;
}

/// A materialized, derived record of one label's extent within a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    /// The label shared by every neuron in this segment.
    pub id: i32,
    /// Cascade phase at which the segment last changed.
    pub phase: i32,
    /// Neuron count.
    pub nb_neuron: u32,
    /// Count of boundary edges: for every neuron in the segment, the
    /// number of its (up to 8) valid neighbors carrying a different label.
    pub perimeter: u32,
}

/// A [`LayerCore`] specialized for intra-layer 8-neighbor spike
/// propagation, label propagation, and segment merging.
#[derive(Debug, Clone)]
pub struct SegmentationLayer<F> {
    /// Shared grid and scheduling state.
    pub core: LayerCore,
    /// Feature model used to weigh propagation.
    pub features: F,

    weight_max: f32,
    weight_slope: f32,
    weight_offset: f32,
    merge_threshold: f32,

    trigger_same_label_neurons: bool,
    merge_segments: bool,

    max_cycles: u32,
    max_cascades: u32,
    stable: u32,
    min_segment_size: u32,
}

/// Outcome of one cascade (one call to [`SegmentationLayer::step_cascade`]).
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    /// Ids of every neuron that spiked during this cascade, across all
    /// inner chain-reaction passes, in the order they fired.
    pub spikes: Vec<usize>,
    /// Whether the stabilization coefficient dropped below the
    /// convergence threshold on this cascade.
    pub converged: bool,
    /// Whether the configured cascade cap was reached on this cascade.
    pub cascade_cap_hit: bool,
}

impl<F: SegmentFeatures> SegmentationLayer<F> {
    /// Wrap a [`LayerCore`] and feature model into a segmentation layer,
    /// capturing the weight/behavior parameters from a configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        core: LayerCore,
        features: F,
        weight_max: f32,
        weight_slope: f32,
        weight_offset: f32,
        merge_delta: f32,
        trigger_same_label_neurons: bool,
        merge_segments: bool,
        max_cycles: u32,
        max_cascades: u32,
        min_segment_size: u32,
    ) -> Self {
        let merge_threshold = Self::compute_weight_with(weight_max, weight_slope, weight_offset, merge_delta);
        Self {
            core,
            features,
            weight_max,
            weight_slope,
            weight_offset,
            merge_threshold,
            trigger_same_label_neurons,
            merge_segments,
            max_cycles,
            max_cascades,
            stable: 0,
            min_segment_size,
        }
    }

    fn compute_weight_with(max: f32, slope: f32, offset: f32, d: f32) -> f32 {
        let sigma = 1.0 / (1.0 + (-slope * (d.abs() - offset)).exp());
        max * (1.0 - sigma)
    }

    /// Logistic weight for a feature difference, using this layer's
    /// segmentation weight parameters.
    pub fn compute_weight(&self, feat_diff: f32) -> f32 {
        Self::compute_weight_with(self.weight_max, self.weight_slope, self.weight_offset, feat_diff)
    }

    /// Run one firing pass, propagating intra-layer spikes, draining chain
    /// reactions until no neuron is above threshold.
    pub fn run_fire_neurons(&mut self, phase: i32) -> Vec<usize> {
        let weight_max = self.weight_max;
        let weight_slope = self.weight_slope;
        let weight_offset = self.weight_offset;
        let merge_threshold = self.merge_threshold;
        let merge_segments = self.merge_segments;
        let trigger_same_label = self.trigger_same_label_neurons;
        let pot_threshold = self.core.pot_threshold;
        let features = &self.features;

        let mut all_spikes = Vec::new();
        loop {
            let spikes = self.core.fire_neurons(phase, |neurons, width, height, src_id, ph| {
                propagate_spike(
                    neurons,
                    width,
                    height,
                    src_id,
                    ph,
                    features,
                    pot_threshold,
                    weight_max,
                    weight_slope,
                    weight_offset,
                    merge_threshold,
                    merge_segments,
                    trigger_same_label,
                );
            });
            if spikes.is_empty() {
                break;
            }
            all_spikes.extend(spikes);
        }
        all_spikes
    }

    /// Run one cascade: find the next time step, advance, drain firing,
    /// apply global inhibition, and update the stabilization gate.
    pub fn step_cascade(&mut self) -> CascadeOutcome {
        let dt = self.core.find_next_time_step();
        self.core.sim_time += dt;
        self.core.advance_time(dt);
        let phase = self.core.n_cascades as i32;
        let spikes = self.run_fire_neurons(phase);
        self.core.global_inhibition();
        self.core.n_cascades += 1;

        let coef = self.core.get_coef_stabilization(0);
        self.stable = if coef < 0.4 { self.stable + 1 } else { 0 };

        CascadeOutcome {
            spikes,
            converged: self.stable >= 1,
            cascade_cap_hit: self.max_cascades > 0 && self.core.n_cascades >= self.max_cascades,
        }
    }

    /// If the current cycle has completed (every leader has spiked),
    /// advance the cycle counter and clear spike flags. Returns whether a
    /// cycle boundary was crossed.
    pub fn finish_cycle_if_complete(&mut self) -> bool {
        if !self.core.is_cycle_completed() {
            return false;
        }
        self.core.n_cycles += 1;
        self.core.reset_cycle();
        true
    }

    /// Whether the configured cycle cap has been reached.
    pub fn cycle_cap_hit(&self) -> bool {
        self.core.n_cycles >= self.max_cycles
    }

    /// Run this layer alone to convergence or a configured ceiling. Returns
    /// `(n_cycles, n_cascades, stabilization_coefficient)`.
    pub fn segment_layer(&mut self) -> (u32, u32, f32) {
        while self.core.n_cycles < self.max_cycles {
            let outcome = self.step_cascade();
            if outcome.converged || outcome.cascade_cap_hit {
                break;
            }
            if !self.finish_cycle_if_complete() {
                continue;
            }
        }
        let coef = self.core.get_coef_stabilization(0);
        (self.core.n_cycles, self.core.n_cascades, coef)
    }

    /// Drop segments smaller than this layer's configured `min_segment_size`
    /// back to unsegmented.
    ///
    /// Not invoked automatically by [`SegmentationLayer::segment_layer`]:
    /// a small image can legitimately converge to a single segment smaller
    /// than the configured minimum, and clearing it unconditionally would
    /// erase a correct result rather than cleaning up a spurious one.
    /// Callers apply this explicitly as a post-processing step when
    /// small-segment cleanup is wanted.
    pub fn finalize_segments(&mut self) {
        self.clear_small_segments(self.min_segment_size);
    }

    /// Walk neurons with `phase > 0`, aggregating by label into segments.
    /// Derived, not authoritative.
    pub fn count_segments(&self) -> Vec<Segment> {
        use std::collections::BTreeMap;
        let mut by_label: BTreeMap<i32, (i32, u32, u32)> = BTreeMap::new();
        for (id, n) in self.core.neurons.iter().enumerate() {
            if n.phase <= 0 {
                continue;
            }
            let col = (id as u32) % self.core.width;
            let row = (id as u32) / self.core.width;
            let mut boundary = 0u32;
            for rel in RelPos::ALL {
                if !rel.is_valid(col, row, self.core.width, self.core.height) {
                    continue;
                }
                let dst = (id as i64 + rel.offset(self.core.width)) as usize;
                if self.core.neurons[dst].label != n.label {
                    boundary += 1;
                }
            }
            let entry = by_label.entry(n.label).or_insert((n.phase, 0, 0));
            entry.0 = entry.0.max(n.phase);
            entry.1 += 1;
            entry.2 += boundary;
        }
        by_label
            .into_iter()
            .map(|(id, (phase, nb_neuron, perimeter))| Segment {
                id,
                phase,
                nb_neuron,
                perimeter,
            })
            .collect()
    }

    /// Clear segments smaller than `min_size` back to unsegmented (`phase`
    /// reset to 0).
    pub fn clear_small_segments(&mut self, min_size: u32) {
        let small: std::collections::HashSet<i32> = self
            .count_segments()
            .into_iter()
            .filter(|s| s.nb_neuron < min_size)
            .map(|s| s.id)
            .collect();
        if small.is_empty() {
            return;
        }
        for n in &mut self.core.neurons {
            if small.contains(&n.label) {
                n.phase = 0;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn propagate_spike<F: SegmentFeatures>(
    neurons: &mut [Neuron],
    width: u32,
    height: u32,
    src_id: usize,
    phase: i32,
    features: &F,
    pot_threshold: f32,
    weight_max: f32,
    weight_slope: f32,
    weight_offset: f32,
    merge_threshold: f32,
    merge_segments: bool,
    trigger_same_label_neurons: bool,
) {
    let col = (src_id as u32) % width;
    let row = (src_id as u32) / width;

    if trigger_same_label_neurons {
        trigger_same_label_neighbors(neurons, src_id, phase, pot_threshold);
    }

    for rel in RelPos::ALL {
        if !rel.is_valid(col, row, width, height) {
            continue;
        }
        let dst_id = (src_id as i64 + rel.offset(width)) as usize;
        debug_assert!(
            dst_id < neurons.len(),
            "rel.is_valid guards every direction this offset can come from; \
             an out-of-bounds dst_id means that guard let an invalid neighbor through"
        );
        propagate(
            neurons,
            features,
            src_id,
            dst_id,
            phase,
            pot_threshold,
            weight_max,
            weight_slope,
            weight_offset,
            merge_threshold,
            merge_segments,
            trigger_same_label_neurons,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn propagate<F: SegmentFeatures>(
    neurons: &mut [Neuron],
    features: &F,
    src_id: usize,
    dst_id: usize,
    phase: i32,
    pot_threshold: f32,
    weight_max: f32,
    weight_slope: f32,
    weight_offset: f32,
    merge_threshold: f32,
    merge_segments: bool,
    trigger_same_label_neurons: bool,
) {
    let src_label = neurons[src_id].label;
    let dst_label = neurons[dst_id].label;

    if trigger_same_label_neurons && src_label == dst_label {
        return;
    }

    let d = features.feat_diff(src_id, dst_id);
    let sigma = 1.0 / (1.0 + (-weight_slope * (d.abs() - weight_offset)).exp());
    let w = weight_max * (1.0 - sigma);
    neurons[dst_id].pot += w;

    if neurons[dst_id].pot < pot_threshold {
        return;
    }
    if src_label == dst_label {
        return;
    }
    if merge_segments && neurons[dst_id].is_segmented && w > merge_threshold {
        merge_segments_into(neurons, src_label, dst_label, phase, pot_threshold);
    }
    propagate_label(neurons, dst_id, src_label, phase);
}

fn propagate_label(neurons: &mut [Neuron], id: usize, label: i32, phase: i32) {
    let n = &mut neurons[id];
    n.label = label;
    n.phase = phase;
    n.is_segmented = true;
}

/// Force every neuron sharing `dst_label` to fire on the next inner pass of
/// the current cascade, and fold it into `src_label`.
fn merge_segments_into(neurons: &mut [Neuron], src_label: i32, dst_label: i32, phase: i32, pot_threshold: f32) {
    for n in neurons.iter_mut() {
        if n.label == dst_label {
            n.pot = pot_threshold;
            n.label = src_label;
            n.phase = phase;
        }
    }
}

fn trigger_same_label_neighbors(neurons: &mut [Neuron], id: usize, new_phase: i32, pot_threshold: f32) {
    if neurons[id].phase == new_phase {
        return;
    }
    let label = neurons[id].label;
    for n in neurons.iter_mut() {
        if n.label == label && n.phase != new_phase {
            n.pot = pot_threshold;
            n.phase = new_phase;
        }
    }
}
