//! `odlm match` — correlate two images through a coupled pair of layers.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use odlm_core::{CouplerWeights, IdAllocator, Orchestrator, PixelLayer, PixelLayerCoupler};

use crate::error::CliResult;
use crate::image_io::load_gray;
use crate::report::print_run_report_json;

/// Run two images through a coupled pair of layers and compare labels.
#[derive(Args, Debug)]
pub struct MatchCommand {
    /// Path to the first (input) image.
    pub image_a: PathBuf,

    /// Path to the second (reference) image.
    pub image_b: PathBuf,

    /// Path to an INI configuration file; defaults are used if omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON instead of plain text.
    #[arg(long)]
    pub json: bool,
}

/// Sizes of every segment with `phase > 0`, sorted descending — the
/// partition shape independent of which label ids were assigned.
fn partition_shape(layer: &PixelLayer) -> Vec<u32> {
    let mut sizes: Vec<u32> = layer
        .count_segments()
        .into_iter()
        .map(|s| s.nb_neuron)
        .collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    sizes
}

impl MatchCommand {
    /// Run the command.
    pub fn execute(self) -> CliResult<()> {
        let config = super::load_config(&self.config)?;
        let a = load_gray(&self.image_a, &config)?;
        let b = load_gray(&self.image_b, &config)?;

        let mut ids = IdAllocator::new();
        let layer_a = PixelLayer::from_gray_buffer(a.data, a.width, a.height, &config, &mut ids)?;
        let layer_b = PixelLayer::from_gray_buffer(b.data, b.width, b.height, &config, &mut ids)?;

        let coupler = PixelLayerCoupler::new(CouplerWeights {
            max: config.simulation.matching_weight_max,
            slope: config.simulation.matching_weight_slope,
            offset: config.simulation.matching_weight_offset,
        });

        let mut orchestrator = Orchestrator::coupled(layer_a, layer_b, coupler);
        let report = orchestrator.run();
        if self.json {
            print_run_report_json("match", &report);
        } else {
            crate::report::print_run_report("match", &report);
        }

        let (first, second) = orchestrator
            .coupled_layers()
            .expect("coupled orchestrator always holds two layers");
        let shape_a = partition_shape(first);
        let shape_b = partition_shape(second);
        info!(
            "label partitions: a={:?} b={:?} (identical={})",
            shape_a,
            shape_b,
            shape_a == shape_b
        );

        Ok(())
    }
}
