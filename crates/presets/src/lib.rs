//! Persistent state for the sprite generator.
//!
//! - `library`: saved glows (`library.json`), newest first.
//! - `config`: user defaults (`config.toml`).

pub mod config;
pub mod library;

pub use config::{
    AnimationDefaults, ConfigError, GlowConfig, OutputDefaults, PreviewDefaults, CONFIG_FILE,
};
pub use library::{LibraryError, Preset, PresetLibrary, LIBRARY_FILE};
