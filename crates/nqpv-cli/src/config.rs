//! Persisted settings file support: `--config settings.toml` loads
//! tolerances and flags the way `legalis-cli::config::Config` loads TOML,
//! trimmed to the single table spec §6 recognises (no inheritance or
//! environment-variable layer, since the verifier has neither jurisdiction
//! nor alias concepts to override).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nqpv_core::settings::Settings;
use serde::Deserialize;

/// On-disk shape of a settings file: every field optional, so a config only
/// needs to name the tolerances it means to override.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    eps: Option<f64>,
    sdp_precision: Option<f64>,
    silent: Option<bool>,
    identical_var_check: Option<bool>,
    opt_preserving: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse config file '{}'", path.display()))
    }

    /// Applies the file's overrides onto [`Settings::default`], validating
    /// `eps`/`sdp_precision` through the same checked setters an in-module
    /// `setting` command uses.
    pub fn into_settings(self) -> Result<Settings> {
        let mut settings = Settings::default();
        if let Some(eps) = self.eps {
            settings.set_eps(eps).map_err(|e| anyhow::anyhow!("{e}"))?;
        }
        if let Some(precision) = self.sdp_precision {
            settings.set_sdp_precision(precision).map_err(|e| anyhow::anyhow!("{e}"))?;
        }
        if let Some(v) = self.silent {
            settings.silent = v;
        }
        if let Some(v) = self.identical_var_check {
            settings.identical_var_check = v;
        }
        if let Some(v) = self.opt_preserving {
            settings.opt_preserving = v;
        }
        Ok(settings)
    }
}

/// Loads `settings` from `config_path` if given, else the verifier defaults.
pub fn resolve_settings(config_path: Option<&Path>) -> Result<Settings> {
    match config_path {
        Some(path) => ConfigFile::load(path)?.into_settings(),
        None => Ok(Settings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings = ConfigFile::default().into_settings().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn overrides_only_the_named_fields() {
        let file = ConfigFile { eps: Some(1e-5), ..Default::default() };
        let settings = file.into_settings().unwrap();
        assert_eq!(settings.eps, 1e-5);
        assert_eq!(settings.sdp_precision, Settings::default().sdp_precision);
    }

    #[test]
    fn rejects_non_positive_eps() {
        let file = ConfigFile { eps: Some(0.0), ..Default::default() };
        assert!(file.into_settings().is_err());
    }
}
