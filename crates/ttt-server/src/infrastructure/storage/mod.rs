//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the server's TOML file from the
//! platform-appropriate directory (or an explicit path), fills in defaults
//! for anything missing, and can write a default file for first-time setup.

pub mod config;
