//! Common state and time-evolution shared by every layer kind.
//!
//! [`LayerCore`] owns the neuron grid and the operations that don't vary
//! between a plain segmentation layer and a pixel layer (time advance,
//! firing, cycle bookkeeping, inhibition, stabilization). Concrete layer
//! kinds embed a `LayerCore` and supply the propagation behavior that does
//! vary, via closures passed into [`LayerCore::fire_neurons`] rather than
//! trait-object dispatch.

use crate::neuron::Neuron;

/// A rectangular sub-region of a layer's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge, inclusive.
    pub x: u32,
    /// Top edge, inclusive.
    pub y: u32,
    /// Width in neurons.
    pub width: u32,
    /// Height in neurons.
    pub height: u32,
}

impl Rect {
    /// The full `width` x `height` grid.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Whether `(col, row)` falls inside this region.
    pub fn contains(&self, col: u32, row: u32) -> bool {
        col >= self.x && col < self.x + self.width && row >= self.y && row < self.y + self.height
    }
}

/// Grid of neurons plus the scheduling state shared by every concrete layer.
#[derive(Debug, Clone)]
pub struct LayerCore {
    /// The neuron grid, row-major.
    pub neurons: Vec<Neuron>,
    /// Grid width in neurons.
    pub width: u32,
    /// Grid height in neurons.
    pub height: u32,
    /// Unique identifier allocated at construction.
    pub layer_id: u32,
    /// Sub-region operated on by every per-neuron pass; defaults to the
    /// full grid.
    pub active_region: Rect,
    /// Cumulative simulated time.
    pub sim_time: f32,
    /// Completed cycle count.
    pub n_cycles: u32,
    /// Completed cascade count.
    pub n_cascades: u32,
    /// Lifetime spike count across all neurons.
    pub n_spikes: u64,

    /// Firing threshold, captured from [`crate::Config`] at construction.
    pub pot_threshold: f32,
    /// Membrane time constant, captured at construction.
    pub tau: f32,
    /// Per-cascade inhibition subtracted from every neuron's potential.
    pub global_inhib_val: f32,
    /// `max_charge` value that marks a neuron as a leader.
    pub charging_leader: f32,
}

impl LayerCore {
    /// Build a `width` x `height` core from pre-built neurons. `neurons`
    /// must already be in row-major order and have `width * height`
    /// elements.
    pub fn new(
        neurons: Vec<Neuron>,
        width: u32,
        height: u32,
        layer_id: u32,
        pot_threshold: f32,
        tau: f32,
        global_inhib_val: f32,
        charging_leader: f32,
    ) -> Self {
        Self {
            neurons,
            width,
            height,
            layer_id,
            active_region: Rect::full(width, height),
            sim_time: 0.0,
            n_cycles: 0,
            n_cascades: 0,
            n_spikes: 0,
            pot_threshold,
            tau,
            global_inhib_val,
            charging_leader,
        }
    }

    /// Total neuron count (`width * height`).
    pub fn size(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn active_ids(&self) -> impl Iterator<Item = usize> + '_ {
        let width = self.width as usize;
        let r = self.active_region;
        (r.y..r.y + r.height).flat_map(move |row| {
            (r.x..r.x + r.width).map(move |col| row as usize * width + col as usize)
        })
    }

    /// Find the time until the leading leader neuron in the active region
    /// reaches threshold, or `0.0` if one has already reached it (or no
    /// leader exists).
    pub fn find_next_time_step(&self) -> f32 {
        let mut max_pot = f32::NEG_INFINITY;
        let mut found = false;
        for id in self.active_ids() {
            let n = &self.neurons[id];
            if n.max_charge > self.pot_threshold && n.pot > max_pot {
                max_pot = n.pot;
                found = true;
            }
        }
        if !found || max_pot >= self.pot_threshold {
            return 0.0;
        }
        let l = self.charging_leader;
        let pot_thr = self.pot_threshold;
        self.tau * (l / (l - pot_thr)).ln() - self.tau * (l / (l - max_pot)).ln()
    }

    /// Advance every neuron in the active region by `dt` under exponential
    /// charging toward `max_charge`. A no-op when `dt == 0.0`.
    ///
    /// Each neuron's update reads and writes only its own state, so with
    /// the `parallel` feature enabled this runs over `rayon`'s global
    /// thread pool instead of sequentially.
    pub fn advance_time(&mut self, dt: f32) {
        if dt == 0.0 {
            return;
        }
        let e = (-dt / self.tau).exp();
        let region = self.active_region;
        let width = self.width;
        let update = move |id: usize, n: &mut Neuron| {
            let col = (id as u32) % width;
            let row = (id as u32) / width;
            if !region.contains(col, row) {
                return;
            }
            if n.pot < 0.0 {
                n.pot = 0.0;
            }
            n.pot = n.max_charge - e * (n.max_charge - n.pot);
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.neurons.par_iter_mut().enumerate().for_each(|(id, n)| update(id, n));
        }
        #[cfg(not(feature = "parallel"))]
        {
            for (id, n) in self.neurons.iter_mut().enumerate() {
                update(id, n);
            }
        }
    }

    /// Drain one firing pass over the active region.
    ///
    /// For every neuron at or above threshold: run `propagate` (the
    /// layer-kind-specific intra-layer spike propagation), then record the
    /// spike. Returns the ids that spiked during this call; the caller must
    /// re-invoke until the returned vector is empty to drain chain
    /// reactions within one cascade.
    pub fn fire_neurons<P>(&mut self, phase: i32, mut propagate: P) -> Vec<usize>
    where
        P: FnMut(&mut [Neuron], u32, u32, usize, i32),
    {
        let order: Vec<usize> = self.active_ids().collect();
        let width = self.width;
        let height = self.height;
        let sim_time = self.sim_time;
        let pot_threshold = self.pot_threshold;
        let mut spiked = Vec::new();
        for id in order {
            if self.neurons[id].pot >= pot_threshold {
                propagate(&mut self.neurons, width, height, id, phase);
                self.neurons[id].spike(phase, sim_time);
                spiked.push(id);
            }
        }
        self.n_spikes += spiked.len() as u64;
        spiked
    }

    /// True iff every leader neuron in the active region has spiked during
    /// the current cycle.
    pub fn is_cycle_completed(&self) -> bool {
        self.active_ids().all(|id| {
            let n = &self.neurons[id];
            n.max_charge != self.charging_leader || n.cycle_spiked
        })
    }

    /// Clear `cycle_spiked` for every neuron in the active region.
    pub fn reset_cycle(&mut self) {
        for id in self.active_ids() {
            self.neurons[id].cycle_spiked = false;
        }
    }

    /// Subtract the global inhibition value from every neuron in the active
    /// region, clamped at zero.
    ///
    /// Independent per neuron, like [`LayerCore::advance_time`]; runs over
    /// `rayon` when the `parallel` feature is enabled.
    pub fn global_inhibition(&mut self) {
        let region = self.active_region;
        let width = self.width;
        let inhib = self.global_inhib_val;
        let update = move |id: usize, n: &mut Neuron| {
            let col = (id as u32) % width;
            let row = (id as u32) / width;
            if !region.contains(col, row) {
                return;
            }
            n.pot = (n.pot - inhib).max(0.0);
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.neurons.par_iter_mut().enumerate().for_each(|(id, n)| update(id, n));
        }
        #[cfg(not(feature = "parallel"))]
        {
            for (id, n) in self.neurons.iter_mut().enumerate() {
                update(id, n);
            }
        }
    }

    /// Mean absolute change in inter-spike interval over neurons in the
    /// active region whose `phase > min_phase`. Returns `1.0` if none
    /// qualify.
    pub fn get_coef_stabilization(&self, min_phase: i32) -> f32 {
        let mut sum = 0.0_f32;
        let mut count = 0u32;
        for id in self.active_ids() {
            let n = &self.neurons[id];
            if n.phase > min_phase {
                sum += n.delta_period.abs();
                count += 1;
            }
        }
        if count == 0 {
            1.0
        } else {
            sum / count as f32
        }
    }
}
