//! Project config file source: projtree.toml and config/{env}.toml under the project root

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;
use tracing::debug;

/// Add project config files to builder.
/// Precedence: projtree.toml (base) then config/{PROJTREE_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    project_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let env_name = std::env::var("PROJTREE_ENV").unwrap_or_else(|_| "development".to_string());

    let mut builder = builder;

    let base_config_path = project_root.join("projtree.toml");
    if base_config_path.is_file() {
        debug!(path = %base_config_path.display(), "Adding base config file");
        builder = builder.add_source(File::from(base_config_path).required(false));
    }

    let env_config_path = project_root
        .join("config")
        .join(format!("{}.toml", env_name));
    if env_config_path.is_file() {
        debug!(path = %env_config_path.display(), env = %env_name, "Adding environment config file");
        builder = builder.add_source(File::from(env_config_path).required(false));
    }

    Ok(builder)
}
