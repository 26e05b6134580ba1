//! `odlm config` — inspect or initialize an INI configuration file.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use tracing::info;

use odlm_core::Config;

use crate::error::{CliError, CliResult};

/// Inspect or initialize a configuration file.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write the default configuration as an INI file.
    Init {
        /// Destination path. Ignored when `--global` is set.
        #[arg(short, long, default_value = "odlm.ini")]
        out: PathBuf,

        /// Write to the per-user config path (`<OS config dir>/odlm/config.ini`)
        /// instead of `--out`, so future runs pick it up without `--config`.
        #[arg(long)]
        global: bool,
    },
    /// Load a configuration file and pretty-print its effective values.
    Show {
        /// Path to an INI configuration file; defaults are shown if omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl ConfigCommand {
    /// Run the command.
    pub fn execute(self) -> CliResult<()> {
        match self.action {
            ConfigAction::Init { out, global } => {
                if global && out != PathBuf::from("odlm.ini") {
                    return Err(CliError::invalid_args(
                        "--out is ignored when --global is set; pass one or the other",
                    ));
                }
                let dest = if global {
                    super::default_config_path()
                        .ok_or_else(|| CliError::missing_resource("could not determine OS config directory"))?
                } else {
                    out
                };
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let cfg = Config::default();
                cfg.save_ini(&dest)?;
                info!("wrote default configuration to {}", dest.display());
            }
            ConfigAction::Show { config } => {
                let cfg = super::load_config(&config)?;
                print!("{}", cfg.to_ini());
            }
        }
        Ok(())
    }
}
