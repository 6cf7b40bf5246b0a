use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use frugal_config::Config;

/// Frugal inference router
#[derive(Debug, Parser)]
#[command(name = "frugal", about = "Routes each prompt to the cheapest model that can handle it")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "frugal.toml", env = "FRUGAL_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "FRUGAL_LISTEN")]
    pub listen: Option<SocketAddr>,
}

impl Args {
    /// Read the configuration file and apply command-line overrides
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(&self.config)?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(listen) = self.listen {
            config.server.listen_address = Some(listen);
        }
    }
}
