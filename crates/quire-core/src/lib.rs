//! Quire Core Library
//!
//! Core types, configuration, and error handling for the Quire static site generator.

pub mod config;
pub mod content;
pub mod error;
pub mod properties;

pub use config::{Config, MenuEntry, MenuKind};
pub use content::{Game, Post, PostDate, Sketch, slugify};
pub use error::{CoreError, Result};
pub use properties::{EntryProperties, PostProperties};
