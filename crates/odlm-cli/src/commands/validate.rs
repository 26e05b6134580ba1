//! `odlm validate` — rebuild and re-run a layer, then check its final state
//! against a saved snapshot.

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use odlm_core::{snapshot, IdAllocator, Orchestrator, PixelLayer};

use crate::error::{CliError, CliResult};
use crate::image_io::load_gray;

/// Validate a layer's final state against a saved snapshot.
#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Path to the previously saved snapshot (`id\tlabel\tpotential`).
    pub snapshot: PathBuf,

    /// Path to the image the snapshot was taken from.
    pub image: PathBuf,

    /// Path to an INI configuration file; defaults are used if omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ValidateCommand {
    /// Run the command.
    pub fn execute(self) -> CliResult<()> {
        let config = super::load_config(&self.config)?;
        let image = load_gray(&self.image, &config)?;

        let mut ids = IdAllocator::new();
        let layer: PixelLayer =
            PixelLayer::from_gray_buffer(image.data, image.width, image.height, &config, &mut ids)?;

        let mut orchestrator = Orchestrator::single(layer);
        let report = orchestrator.run();
        crate::report::print_run_report("validate", &report);

        let layer = orchestrator
            .single_layer()
            .expect("single-layer orchestrator always holds a layer");

        match snapshot::validate_layer_state(&layer.core.neurons, &self.snapshot) {
            Ok(()) => {
                info!("layer state matches {}", self.snapshot.display());
                Ok(())
            }
            Err(err) => Err(CliError::ValidationFailed(err.to_string())),
        }
    }
}
