//! Configuration resolution for riskreg-ingest
//!
//! Model API key priority: `ANTHROPIC_API_KEY` environment variable, then
//! TOML `[model] api_key`.

use riskreg_common::config::TomlConfig;
use riskreg_common::{Error, Result};
use tracing::{info, warn};

/// Environment variable holding the model API key
pub const API_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";

/// Resolve the model API key
pub fn resolve_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .model
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "Model API key found in environment and TOML. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("Model API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("Model API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "Model API key not configured. Set one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: [model] api_key = \"your-key\"",
        API_KEY_ENV_VAR
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("sk-ant-123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
