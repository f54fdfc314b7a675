use anyhow::{Context, Result};
use tracing::debug;

use fanout_router::RouterConfig;

/// Load `.env`, then the router config from `path` or from the environment,
/// and apply the `--mode` override.
pub fn load(path: Option<&str>, mode: Option<&str>) -> Result<RouterConfig> {
    dotenvy::dotenv().ok();

    let mut config = match path {
        Some(path) => {
            debug!(path, "loading router config file");
            RouterConfig::from_file(path)
                .with_context(|| format!("failed to load config from {path}"))?
        }
        None => RouterConfig::from_env().context("invalid FANOUT_* environment")?,
    };

    if let Some(mode) = mode {
        config.mode = mode.to_string();
        config.validate().context("invalid --mode")?;
    }
    Ok(config)
}
