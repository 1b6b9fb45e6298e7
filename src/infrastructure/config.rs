/// Settings file loading.
///
/// Every section is optional; missing keys keep their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::powershell_runner::ParserSettings;
use crate::domain::optimizer::OptimizerSettings;
use crate::error::Result;
use crate::ports::rebuilder::RebuilderSettings;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub parser: ParserSettings,
    pub optimizer: OptimizerSettings,
    pub rebuilder: RebuilderSettings,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Settings from `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                Self::from_toml(&fs::read_to_string(path)?)
            }
            None => Ok(Self::default()),
        }
    }
}
