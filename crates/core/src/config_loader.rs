use crate::config::Config;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering defaults, a TOML file, and
    /// `ORBIT_`-prefixed environment variables.
    ///
    /// A missing file is not an error — the defaults stand.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value fails to
    /// deserialize.
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("ORBIT_").split("__"))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.display()))?;

        Ok(config)
    }
}
