//! Load a settings object from the config locations.
//!
//! Sources are merged in order, later sources overriding earlier ones:
//!
//! 1. every `*.json` file in `./config`
//! 2. the comma separated list of files in the `CONFIG_FILES` env variable
//! 3. environment variables starting with `{prefix}_`, using `__` to
//!    separate nested keys (e.g. `MIXER_RELAYER_DEFAULTPRICES__GASPRICES__FAST`)

use std::{env, path::PathBuf};

use config::{Config, Environment, File};
use eyre::{bail, Context, Result};
use serde::de::DeserializeOwned;

pub use trace::*;

/// Tracing subscriber configuration
pub mod trace;

/// Deserialize a settings object from the configs. `env_prefix` limits the
/// environment variables considered, e.g. `MIXER_RELAYER`.
pub fn load_settings_object<T: DeserializeOwned>(env_prefix: &str) -> Result<T> {
    let mut base_config_sources = vec![];
    let mut builder = Config::builder();

    let config_dir = PathBuf::from("./config");
    if config_dir.is_dir() {
        let mut entries = config_dir
            .read_dir()
            .context("Failed to open config directory")?
            .collect::<std::io::Result<Vec<_>>>()
            .context("Failed to list config directory")?;
        // load in a stable order so overrides between files are predictable
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let entry_path = entry.path();
            if !entry_path.is_file() {
                continue;
            }
            if entry_path.extension() == Some("json".as_ref()) {
                base_config_sources.push(format!("{entry_path:?}"));
                builder = builder.add_source(File::from(entry_path));
            }
        }
    }

    let config_file_paths: Vec<String> = env::var("CONFIG_FILES")
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default();

    for path in &config_file_paths {
        let p = PathBuf::from(path);
        if p.is_file() {
            if p.extension() == Some("json".as_ref()) {
                builder = builder.add_source(File::from(p));
            } else {
                bail!("Provided config path via CONFIG_FILES is of an unsupported type ({p:?})");
            }
        } else if !p.exists() {
            bail!("Provided config path via CONFIG_FILES does not exist ({p:?})");
        } else {
            bail!("Provided config path via CONFIG_FILES is not a file ({p:?})");
        }
    }

    let config = builder
        .add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to load config sources")?;

    let mut res = config.try_deserialize::<T>().map_err(eyre::Report::from);
    for cfg_path in base_config_sources.iter().chain(config_file_paths.iter()) {
        res = res.with_context(|| format!("Config loaded: {cfg_path}"));
    }
    res.context("Config deserialization error")
}
