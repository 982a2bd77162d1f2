//! DPE command line
//!
//! Offline access to the patchers, document validation, stored version
//! history and PlantUML rendering.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod commands;
pub mod settings;

pub use commands::{Applied, Flavor};
pub use settings::{LoggingSettings, Settings};
