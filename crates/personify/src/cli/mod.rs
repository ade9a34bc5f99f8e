//! CLI command modules.

pub mod caption;
pub mod config;
pub mod models;
