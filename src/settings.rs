use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use config_file::{ConfigFileError, FromConfigFile};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub intensity_channel: u8,
    pub spectrum_channel: u8,
    /// Where the lighting record is kept. Without it the record lives in memory only.
    pub state_file: Option<PathBuf>,
    /// Drive the fixture through OLA. Without it channel writes are only logged.
    pub ola: Option<OlaSettings>,
}

#[derive(Debug, Deserialize)]
pub struct OlaSettings {
    #[serde(default = "default_ola_address")]
    pub address: SocketAddr,
    #[serde(default)]
    pub universe: u16,
}

fn default_ola_address() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 7770))
}

impl Settings {
    pub fn load(path: &Path) -> Result<Settings, ConfigFileError> {
        let settings = Settings::from_config_file(path)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
