//! Agent Configuration Module
//!
//! Both agents read one TOML file with `[capture]`, `[settlement]` and
//! `[endpoints]` sections.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` on the command line
//! 2. `AIRSENSE_CONFIG` environment variable
//! 3. `airsense.toml` in the current working directory
//! 4. Built-in defaults
//!
//! The loaded `AgentConfig` is passed by value into each agent at startup.

mod agent_config;
pub mod defaults;
pub mod validation;

pub use agent_config::*;
