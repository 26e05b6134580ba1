//! `odlm segment` — run a single pixel layer to convergence.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use odlm_core::{IdAllocator, Orchestrator, PixelLayer};

use crate::commands::load_config;
use crate::error::CliResult;
use crate::image_io::load_gray;
use crate::report::{print_run_report, print_run_report_json};

/// Segment a single image.
#[derive(Args, Debug)]
pub struct SegmentCommand {
    /// Path to the input image.
    pub image: PathBuf,

    /// Path to an INI configuration file; defaults are used if omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the final neuron state to this tab-separated snapshot file.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Drop segments smaller than the configured `MIN_SEGMENT_SIZE` back to
    /// unsegmented after the run converges. Off by default: applying it
    /// unconditionally would erase small-but-real segments on small images.
    #[arg(long)]
    pub clear_small_segments: bool,

    /// Print the run summary as JSON instead of plain text.
    #[arg(long)]
    pub json: bool,
}

impl SegmentCommand {
    /// Run the command.
    pub fn execute(self) -> CliResult<()> {
        let config = load_config(&self.config)?;
        let image = load_gray(&self.image, &config)?;
        info!(
            "loaded {} ({}x{})",
            self.image.display(),
            image.width,
            image.height
        );

        let mut ids = IdAllocator::new();
        let layer =
            PixelLayer::from_gray_buffer(image.data, image.width, image.height, &config, &mut ids)?;

        let mut orchestrator = Orchestrator::single(layer);
        let report = orchestrator.run();
        if self.json {
            print_run_report_json("segment", &report);
        } else {
            print_run_report("segment", &report);
        }

        if self.clear_small_segments {
            let layer = orchestrator
                .single_layer_mut()
                .expect("single-layer orchestrator always holds a layer");
            layer.finalize_segments();
        }

        let segments = orchestrator
            .single_layer()
            .expect("single-layer orchestrator always holds a layer")
            .count_segments();
        info!("{} segment(s) after convergence", segments.len());

        if let Some(out) = &self.out {
            let layer = orchestrator
                .single_layer()
                .expect("single-layer orchestrator always holds a layer");
            odlm_core::snapshot::save_state_to_file(&layer.core.neurons, out)?;
            info!("wrote snapshot to {}", out.display());
        }

        Ok(())
    }
}
