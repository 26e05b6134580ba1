//! CLI command implementations for the ODLM host.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::CliResult;

pub mod config_cmd;
pub mod match_cmd;
pub mod segment;
pub mod validate;

/// `odlm` — command-line host for the oscillatory dynamic link matching
/// spiking segmentation simulator.
#[derive(Parser, Debug)]
#[command(name = "odlm", version, about = "Spiking neuron image segmentation host")]
pub struct OdlmCli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Segment a single image.
    Segment(segment::SegmentCommand),

    /// Run two images through a coupled pair of layers and compare labels.
    Match(match_cmd::MatchCommand),

    /// Inspect or initialize a configuration file.
    Config(config_cmd::ConfigCommand),

    /// Validate a layer's final state against a saved snapshot.
    Validate(validate::ValidateCommand),
}

impl OdlmCli {
    /// Execute the selected command.
    pub fn execute(self) -> CliResult<()> {
        match self.command {
            Commands::Segment(cmd) => cmd.execute(),
            Commands::Match(cmd) => cmd.execute(),
            Commands::Config(cmd) => cmd.execute(),
            Commands::Validate(cmd) => cmd.execute(),
        }
    }
}

/// Load a [`odlm_core::Config`] from `path`. When no path is given, falls
/// back to [`default_config_path`] if a file exists there, then to
/// [`odlm_core::Config::default`].
pub(crate) fn load_config(path: &Option<PathBuf>) -> CliResult<odlm_core::Config> {
    match path {
        Some(p) => Ok(odlm_core::Config::load_ini(p)?),
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(p) => Ok(odlm_core::Config::load_ini(p)?),
            None => Ok(odlm_core::Config::default()),
        },
    }
}

/// The per-user configuration file path this host falls back to when no
/// `--config` flag is given: `<OS config dir>/odlm/config.ini`.
pub(crate) fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("odlm").join("config.ini"))
}
