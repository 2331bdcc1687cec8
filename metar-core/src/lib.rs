//! Core library for the METAR map.
//!
//! This crate defines:
//! - Configuration handling and load-time validation
//! - METAR decoding and the weather-source abstraction
//! - The classification pipeline: feature extraction, the rule-table
//!   classifier, station resolution and light-sequence assembly
//! - The render gate that serializes access to the LED device
//!
//! It is used by `metar-map`, but can also be reused by other binaries or
//! services.

pub mod classify;
pub mod config;
pub mod error;
pub mod expr;
pub mod lights;
pub mod metar;
pub mod model;
pub mod resolve;
pub mod sequence;
pub mod source;

pub use classify::{Category, Classifier, Features};
pub use config::{AirportBinding, CategoryRule, Config, FaultConfig, LedConfig, SourceConfig};
pub use error::{ConfigError, ConfigWarning, DecodeError, DeviceError};
pub use lights::{ChannelOrder, LedDevice, RenderGate, device_from_config};
pub use model::{CloudLayer, DecodedMetar, LightMetadata, Rgb, WeatherRecord};
pub use resolve::{Classification, ResolvedStation, StationResolver};
pub use sequence::{LightEntry, LightSequence};
pub use source::{MetarSource, source_from_config};
