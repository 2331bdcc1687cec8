use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::error::{ConfigError, ConfigWarning};
use crate::expr::Expr;
use crate::lights::ChannelOrder;
use crate::model::Rgb;

/// One entry in the flight-category rule table.
///
/// The table is ordered by ascending severity: when several categories
/// match, the last match wins ("slice to most restrictive"). A category
/// matches when *any* of its expressions evaluates true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub color: Rgb,
    pub icon: String,
    pub expression: Vec<String>,
}

/// Static station-to-LED binding. Indices are 0-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportBinding {
    pub station: String,
    pub index: usize,
}

/// Color and icon used for stations with missing or unclassifiable data,
/// and as the pre-fill for LED positions with no binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultConfig {
    pub color: Rgb,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Development device that logs frames instead of driving hardware.
    #[default]
    Console,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedConfig {
    /// Physical LED count of the strip.
    pub count: usize,
    /// Channel packing order expected by the device.
    #[serde(default)]
    pub channel_order: ChannelOrder,
    #[serde(default)]
    pub device: DeviceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URI template for the raw-METAR endpoint; `{ids}` is replaced with a
    /// comma-separated list of station ids.
    pub uri: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_ceiling_codes() -> Vec<String> {
    vec!["BKN".to_string(), "OVC".to_string(), "VV".to_string()]
}

fn default_ceiling_ft() -> u32 {
    12_000
}

/// Top-level configuration. Loaded once at startup, read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cloud-layer codes that count towards the ceiling.
    #[serde(default = "default_ceiling_codes")]
    pub ceiling_codes: Vec<String>,

    /// Ceiling substituted when no significant layer is reported,
    /// effectively "unlimited" for classification purposes.
    #[serde(default = "default_ceiling_ft")]
    pub default_ceiling_ft: u32,

    pub categories: Vec<CategoryRule>,
    pub airports: Vec<AirportBinding>,
    pub fault: FaultConfig,
    pub leds: LedConfig,
    pub source: SourceConfig,
}

impl Config {
    /// Load configuration from an explicit path, or from the platform
    /// config directory. With no explicit path and no file on disk, the
    /// built-in default table is used (first-run behavior).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = Self::config_file_path()?;
                if !default.exists() {
                    return Ok(Self::builtin());
                }
                default
            }
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Path to the default config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "metar-map", "metar-map")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Validate the loaded configuration.
    ///
    /// Errors are fatal: malformed rule expressions, out-of-range or
    /// invalid bindings, an unusable LED count. Duplicate LED bindings are
    /// returned as warnings; at render time the last one configured wins.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::EmptyRuleTable);
        }

        for category in &self.categories {
            for clause in &category.expression {
                Expr::parse(clause).map_err(|source| ConfigError::InvalidExpression {
                    category: category.name.clone(),
                    expression: clause.clone(),
                    source,
                })?;
            }
        }

        if self.leds.count == 0 {
            return Err(ConfigError::ZeroLedCount);
        }

        let mut bound: HashMap<usize, Vec<String>> = HashMap::new();

        for binding in &self.airports {
            if binding.station.is_empty()
                || !binding
                    .station
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            {
                return Err(ConfigError::InvalidStationId {
                    station: binding.station.clone(),
                });
            }

            if binding.index >= self.leds.count {
                return Err(ConfigError::IndexOutOfRange {
                    station: binding.station.clone(),
                    index: binding.index,
                    count: self.leds.count,
                });
            }

            bound
                .entry(binding.index)
                .or_default()
                .push(binding.station.clone());
        }

        let mut warnings: Vec<ConfigWarning> = bound
            .into_iter()
            .filter(|(_, stations)| stations.len() > 1)
            .map(|(index, stations)| ConfigWarning::DuplicateIndex { index, stations })
            .collect();
        warnings.sort_by_key(|w| match w {
            ConfigWarning::DuplicateIndex { index, .. } => *index,
        });

        Ok(warnings)
    }

    /// Station ids of all configured bindings, in configuration order.
    pub fn station_ids(&self) -> Vec<String> {
        self.airports.iter().map(|a| a.station.clone()).collect()
    }

    /// Built-in configuration with the standard US flight-category table.
    /// Thresholds are data here, not code: a config file overrides all of
    /// this.
    pub fn builtin() -> Self {
        let categories = vec![
            CategoryRule {
                name: "VFR".to_string(),
                color: Rgb::new(0, 255, 0),
                icon: "☀️".to_string(),
                expression: vec!["visibility > 5 and ceiling > 3000".to_string()],
            },
            CategoryRule {
                name: "MVFR".to_string(),
                color: Rgb::new(0, 0, 255),
                icon: "🌤".to_string(),
                expression: vec![
                    "visibility <= 5".to_string(),
                    "ceiling <= 3000".to_string(),
                ],
            },
            CategoryRule {
                name: "IFR".to_string(),
                color: Rgb::new(255, 0, 0),
                icon: "🌧".to_string(),
                expression: vec!["visibility < 3".to_string(), "ceiling < 1000".to_string()],
            },
            CategoryRule {
                name: "LIFR".to_string(),
                color: Rgb::new(255, 0, 255),
                icon: "🌩".to_string(),
                expression: vec!["visibility < 1".to_string(), "ceiling < 500".to_string()],
            },
        ];

        Self {
            ceiling_codes: default_ceiling_codes(),
            default_ceiling_ft: default_ceiling_ft(),
            categories,
            airports: Vec::new(),
            fault: FaultConfig {
                color: Rgb::new(255, 255, 0),
                icon: "unknown".to_string(),
            },
            leds: LedConfig {
                count: 50,
                channel_order: ChannelOrder::default(),
                device: DeviceKind::default(),
            },
            source: SourceConfig {
                uri: "https://aviationweather.gov/api/data/metar?ids={ids}&format=raw".to_string(),
                timeout_secs: default_timeout_secs(),
                headers: HashMap::new(),
            },
        }
    }
}
