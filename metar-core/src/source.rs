use async_trait::async_trait;
use std::fmt::Debug;

use crate::config::SourceConfig;
use crate::model::WeatherRecord;
use crate::source::aviationweather::AviationWeatherSource;

pub mod aviationweather;

/// Where raw METARs come from.
///
/// The per-station failure contract is absence, not error: implementations
/// omit stations they could not fetch or decode, and the resolver degrades
/// those to the fault category. A returned error means the whole batch
/// failed (network down, endpoint unreachable) and the cycle cannot
/// proceed.
#[async_trait]
pub trait MetarSource: Send + Sync + Debug {
    async fn fetch(&self, station_ids: &[String]) -> anyhow::Result<Vec<WeatherRecord>>;
}

/// Construct the source described by configuration.
pub fn source_from_config(config: &SourceConfig) -> anyhow::Result<Box<dyn MetarSource>> {
    let source = AviationWeatherSource::new(config)?;
    Ok(Box::new(source))
}
