//! Environment source: PROJTREE__SECTION__KEY=value

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

/// Add `PROJTREE__`-prefixed environment variables to builder.
/// `PROJTREE__SYNC__IGNORE_PATTERNS` takes a comma-separated list.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("PROJTREE")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("sync.ignore_patterns"),
    )
}
