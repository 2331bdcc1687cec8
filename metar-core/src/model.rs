use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One LED color, 8 bits per channel. Serialized as `[r, g, b]` so
/// configuration files can write `color = [255, 0, 0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

/// A single reported cloud layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudLayer {
    /// Coverage code as reported, e.g. "FEW", "BKN", "OVC", "VV".
    pub code: String,
    /// Layer base in feet above ground level.
    pub base_ft_agl: u32,
}

/// The decoded fields classification consumes. Produced once per fetch
/// cycle and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedMetar {
    /// Prevailing visibility in statute miles; may be fractional.
    pub visibility_mi: f64,
    /// Cloud layers in reported order.
    pub clouds: Vec<CloudLayer>,
}

/// One station's observation for one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherRecord {
    /// Station identifier, uppercase alphanumeric (e.g. "KSEA").
    pub id: String,
    /// Raw METAR text as fetched.
    pub raw: String,
    pub decoded: DecodedMetar,
    pub fetched_at: DateTime<Utc>,
}

/// Diagnostic payload carried alongside each rendered LED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LightMetadata {
    pub icon: String,
    pub name: String,
}
