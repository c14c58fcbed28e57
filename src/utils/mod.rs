//! Utilities shared across the crate.
//!
//! Submodules:
//! - `yaml`: helpers for inspecting untyped `serde_yaml::Value` trees.

pub mod yaml;
