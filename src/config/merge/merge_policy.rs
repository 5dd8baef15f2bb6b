//! Merge rules: defaults first, then the repository file, then environment.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("storage.backend", "memory")?
        .set_default("storage.flush_on_commit", true)?
        .set_default("gc.aggressive", false)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")
}
