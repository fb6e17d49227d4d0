//! Operator configuration of the packet-forward middleware.

pub mod error;

use core::time::Duration;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

pub use error::Error;

pub mod default {
    use super::*;

    pub fn retries_on_timeout() -> u8 {
        0
    }

    /// The relative timeout ICS20 transfers use by default.
    pub fn forward_timeout() -> Duration {
        Duration::from_secs(5 * 60)
    }

    pub fn refund_timeout() -> Duration {
        Duration::from_secs(28 * 24 * 60 * 60)
    }

    pub fn address_prefix() -> String {
        "cosmos".to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ForwardConfig {
    /// Retries of a timed-out forward, for packets whose metadata sets none
    #[serde(default = "default::retries_on_timeout")]
    pub retries_on_timeout: u8,

    /// Relative timeout of forwards whose metadata sets none
    #[serde(default = "default::forward_timeout", with = "humantime_serde")]
    pub forward_timeout: Duration,

    /// Relative timeout of refund transfers issued by the host
    #[serde(default = "default::refund_timeout", with = "humantime_serde")]
    pub refund_timeout: Duration,

    /// Bech32 prefix of the accounts of this chain
    #[serde(default = "default::address_prefix")]
    pub address_prefix: String,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            retries_on_timeout: default::retries_on_timeout(),
            forward_timeout: default::forward_timeout(),
            refund_timeout: default::refund_timeout(),
            address_prefix: default::address_prefix(),
        }
    }
}

/// Attempt to load and parse the TOML config file as a `ForwardConfig`.
pub fn load(path: impl AsRef<Path>) -> Result<ForwardConfig, Error> {
    let config_toml = fs::read_to_string(&path).map_err(Error::io)?;

    let config = toml::from_str::<ForwardConfig>(&config_toml[..]).map_err(Error::decode)?;

    Ok(config)
}

/// Serialize the given `ForwardConfig` as TOML to the given config file.
pub fn store(config: &ForwardConfig, path: impl AsRef<Path>) -> Result<(), Error> {
    let mut file = if path.as_ref().exists() {
        fs::OpenOptions::new().write(true).truncate(true).open(path)
    } else {
        File::create(path)
    }
    .map_err(Error::io)?;

    store_writer(config, &mut file)
}

/// Serialize the given `ForwardConfig` as TOML to the given writer.
pub(crate) fn store_writer(config: &ForwardConfig, mut writer: impl Write) -> Result<(), Error> {
    let toml_config = toml::to_string_pretty(&config).map_err(Error::encode)?;

    writeln!(writer, "{toml_config}").map_err(Error::io)?;

    Ok(())
}
