//! Catalog configuration loading from config.toml
//!
//! The categories listed in config.toml are created on startup when missing.
//! `sku_examples` names category/product pairs the binary previews SKUs for and
//! then allocates `allocate_count` real codes from.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_VAR: &str = "STOCKROOM_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Categories to seed
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    /// Category/product pairs to generate SKUs for
    #[serde(default)]
    pub sku_examples: Vec<SkuExample>,
    /// SKUs to allocate per example on each run; each one consumes a sequence number
    #[serde(default = "default_allocate_count")]
    pub allocate_count: usize,
}

const fn default_allocate_count() -> usize {
    1
}

/// Configuration for a single category
#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    /// Unique category name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

/// A category/product name pair
#[derive(Debug, Deserialize, Clone)]
pub struct SkuExample {
    /// Category name; created if missing
    pub category: String,
    /// Product name
    pub product: String,
}

/// Loads catalog configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.as_ref().display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Loads the file named by `STOCKROOM_CONFIG`, or ./config.toml
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_default_config() -> Result<Config> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}
