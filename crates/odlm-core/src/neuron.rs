//! Integrate-and-fire neuron for ODLM-type networks.
//!
//! Spikes when the membrane potential reaches the firing threshold and
//! propagates its label. Each neuron represents a feature at one grid
//! position.

use crate::SPIKE_RESET_POTENTIAL;

/// A single integrate-and-fire neuron in a [`crate::layer::LayerCore`] grid.
#[derive(Debug, Clone)]
pub struct Neuron {
    /// Membrane potential.
    pub pot: f32,
    /// Asymptote the potential charges toward. Exceeds the firing threshold
    /// for leader neurons (self-oscillating); at or below it for followers
    /// (cannot spike without external drive).
    pub max_charge: f32,
    /// Cascade index at which the neuron most recently spiked, or `-1` if
    /// it has never spiked.
    pub phase: i32,
    /// Flat index into the layer, `y * width + x`.
    pub id: usize,
    /// Grid column.
    pub x: u32,
    /// Grid row.
    pub y: u32,
    /// Segment identifier. Unique per neuron at construction, converges via
    /// label propagation.
    pub label: i32,
    /// Lifetime spike count.
    pub nb_spikes: u64,
    /// Whether this neuron has spiked during the current cycle.
    pub cycle_spiked: bool,
    /// Whether this neuron has ever received a label transfer.
    pub is_segmented: bool,
    /// Simulation time of the most recent spike.
    pub last_spike: f32,
    /// Interval between the two most recent spikes.
    pub fire_period: f32,
    /// Change in `fire_period` across the two most recent spikes.
    pub delta_period: f32,
}

impl Neuron {
    /// Create a neuron at `(x, y)` in a layer of the given `width`, with the
    /// given `label` and `max_charge`. Potential starts at `pot`.
    pub fn new(x: u32, y: u32, width: u32, label: i32, max_charge: f32, pot: f32) -> Self {
        Self {
            pot,
            max_charge,
            phase: -1,
            id: (y as usize) * (width as usize) + (x as usize),
            x,
            y,
            label,
            nb_spikes: 0,
            cycle_spiked: false,
            is_segmented: false,
            last_spike: 0.0,
            fire_period: 0.0,
            delta_period: 0.0,
        }
    }

    /// Whether this neuron is a leader (self-oscillating) under the given
    /// threshold.
    pub fn is_leader(&self, pot_threshold: f32) -> bool {
        self.max_charge > pot_threshold
    }

    /// Record a spike at the given `phase` and simulation time.
    ///
    /// Updates the stabilization bookkeeping (`fire_period`/`delta_period`)
    /// when this isn't the neuron's first spike, resets `pot` to a large
    /// negative sentinel so it cannot refire within this cascade before
    /// global inhibition clamps it, and bumps the spike counters.
    pub fn spike(&mut self, phase: i32, sim_time: f32) {
        if self.phase != -1 {
            let new_period = sim_time - self.last_spike;
            self.delta_period = self.fire_period - new_period;
            self.fire_period = new_period;
        }
        self.last_spike = sim_time;
        self.pot = SPIKE_RESET_POTENTIAL;
        self.phase = phase;
        self.nb_spikes += 1;
        self.cycle_spiked = true;
    }
}

impl PartialEq for Neuron {
    /// Structural equality on the behaviorally meaningful fields: `pot`,
    /// `phase`, `max_charge`, `id`, `label`, `nb_spikes`, `cycle_spiked`,
    /// `is_segmented`. Position and stabilization timing fields are
    /// intentionally excluded.
    fn eq(&self, other: &Self) -> bool {
        self.pot == other.pot
            && self.phase == other.phase
            && self.max_charge == other.max_charge
            && self.id == other.id
            && self.label == other.label
            && self.nb_spikes == other.nb_spikes
            && self.cycle_spiked == other.cycle_spiked
            && self.is_segmented == other.is_segmented
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_matches_row_major_position() {
        let n = Neuron::new(3, 2, 8, 42, 1.0, 0.0);
        assert_eq!(n.id, 2 * 8 + 3);
    }

    #[test]
    fn first_spike_leaves_period_bookkeeping_at_zero() {
        let mut n = Neuron::new(0, 0, 8, 0, 1.01, 0.5);
        n.spike(0, 10.0);
        assert_eq!(n.nb_spikes, 1);
        assert!(n.cycle_spiked);
        assert_eq!(n.phase, 0);
        assert_eq!(n.pot, SPIKE_RESET_POTENTIAL);
        // No previous spike, so no period could be computed yet.
        assert_eq!(n.fire_period, 0.0);
    }

    #[test]
    fn second_spike_updates_period_and_delta() {
        let mut n = Neuron::new(0, 0, 8, 0, 1.01, 0.5);
        n.spike(0, 10.0);
        n.spike(1, 25.0);
        assert_eq!(n.fire_period, 15.0);
        assert_eq!(n.delta_period, 0.0 - 15.0);
        assert_eq!(n.nb_spikes, 2);
    }

    #[test]
    fn leader_follower_classification() {
        let leader = Neuron::new(0, 0, 4, 0, 1.01, 0.0);
        let follower = Neuron::new(1, 0, 4, 1, 0.5, 0.0);
        assert!(leader.is_leader(1.0));
        assert!(!follower.is_leader(1.0));
    }

    #[test]
    fn equality_ignores_position_and_timing_fields() {
        let mut a = Neuron::new(0, 0, 4, 7, 1.0, 0.2);
        let mut b = Neuron::new(1, 0, 4, 7, 1.0, 0.2);
        b.id = a.id; // force same id, differing x
        a.last_spike = 3.0;
        b.last_spike = 99.0;
        assert_eq!(a, b);
    }
}
