pub mod cache;
pub mod config;
pub mod database;
pub mod env_file;
pub mod logging;
pub mod reconciler;
