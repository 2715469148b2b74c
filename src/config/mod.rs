//! Configuration management for the pod client
//!
//! This module handles loading and managing configuration settings
//! for the session and stream layers.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{
    HttpSettings, LoggingSettings, SessionSettings, Settings, StreamSettings, TokenSettings,
};
