/// Database connection and schema creation
pub mod database;

/// Catalog seed configuration loaded from config.toml
pub mod catalog;
