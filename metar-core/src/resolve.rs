//! Maps configured airport bindings onto classification results.
//!
//! Every binding produces exactly one output entry, whatever happened to
//! its station during the fetch. Missing or unclassifiable stations
//! degrade to the configured fault color instead of dropping out: the map
//! is meant to show degraded-but-visible status, never to leave holes.

use tracing::debug;

use crate::classify::{Category, Classifier, extract};
use crate::config::{AirportBinding, Config, FaultConfig};
use crate::error::ConfigError;
use crate::model::{LightMetadata, Rgb, WeatherRecord};

/// Outcome of classifying one bound station. `Unmatched` and `FetchFailed`
/// both render with the fault color but stay distinguishable for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Matched(Category),
    /// A record was fetched but no rule in the table matched it.
    Unmatched,
    /// The fetch produced no record for this station.
    FetchFailed,
}

/// One LED's worth of resolver output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStation {
    pub index: usize,
    pub classification: Classification,
    pub color: Rgb,
    pub metadata: LightMetadata,
}

/// Classification pipeline for one deployment: compiled rule table plus
/// the extraction and fault parameters. Built once at startup.
pub struct StationResolver {
    classifier: Classifier,
    ceiling_codes: Vec<String>,
    default_ceiling_ft: u32,
    fault: FaultConfig,
}

impl StationResolver {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            classifier: Classifier::compile(&config.categories)?,
            ceiling_codes: config.ceiling_codes.clone(),
            default_ceiling_ft: config.default_ceiling_ft,
            fault: config.fault.clone(),
        })
    }

    /// Resolve every binding against the cycle's fetch result.
    ///
    /// Station ids are matched case-insensitively. The output always has
    /// exactly one entry per binding, in binding order.
    pub fn resolve(
        &self,
        bindings: &[AirportBinding],
        records: &[WeatherRecord],
    ) -> Vec<ResolvedStation> {
        bindings
            .iter()
            .map(|binding| {
                let record = records
                    .iter()
                    .find(|r| r.id.eq_ignore_ascii_case(&binding.station));

                let classification = match record {
                    Some(record) => {
                        let features =
                            extract(&record.decoded, &self.ceiling_codes, self.default_ceiling_ft);
                        match self.classifier.classify(&features) {
                            Some(category) => Classification::Matched(category.clone()),
                            None => Classification::Unmatched,
                        }
                    }
                    None => {
                        debug!(station = %binding.station, led = binding.index, "no METAR fetched");
                        Classification::FetchFailed
                    }
                };

                let (color, icon) = match &classification {
                    Classification::Matched(category) => {
                        debug!(
                            station = %binding.station,
                            led = binding.index,
                            category = %category.name,
                            "station classified"
                        );
                        (category.color, category.icon.clone())
                    }
                    Classification::Unmatched | Classification::FetchFailed => {
                        (self.fault.color, self.fault.icon.clone())
                    }
                };

                ResolvedStation {
                    index: binding.index,
                    classification,
                    color,
                    metadata: LightMetadata {
                        icon,
                        name: binding.station.clone(),
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CloudLayer, DecodedMetar};
    use chrono::Utc;

    fn test_config() -> Config {
        let mut cfg = Config::builtin();
        cfg.leds.count = 10;
        cfg.airports = vec![
            AirportBinding {
                station: "KSEA".to_string(),
                index: 0,
            },
            AirportBinding {
                station: "KPDX".to_string(),
                index: 1,
            },
            AirportBinding {
                station: "KKKK".to_string(),
                index: 2,
            },
        ];
        cfg
    }

    fn record(id: &str, visibility_mi: f64, clouds: Vec<CloudLayer>) -> WeatherRecord {
        WeatherRecord {
            id: id.to_string(),
            raw: format!("{id} ..."),
            decoded: DecodedMetar {
                visibility_mi,
                clouds,
            },
            fetched_at: Utc::now(),
        }
    }

    fn overcast(base_ft_agl: u32) -> Vec<CloudLayer> {
        vec![CloudLayer {
            code: "OVC".to_string(),
            base_ft_agl,
        }]
    }

    #[test]
    fn one_output_per_binding_regardless_of_fetch() {
        let cfg = test_config();
        let resolver = StationResolver::new(&cfg).expect("builds");

        // Fetch returned only one of three stations.
        let records = vec![record("KSEA", 10.0, vec![])];
        let resolved = resolver.resolve(&cfg.airports, &records);

        assert_eq!(resolved.len(), cfg.airports.len());
        assert_eq!(resolved[0].index, 0);
        assert_eq!(resolved[1].index, 1);
        assert_eq!(resolved[2].index, 2);
    }

    #[test]
    fn unrestricted_conditions_classify_as_vfr() {
        // No significant layers: ceiling defaults to 12000.
        let cfg = test_config();
        let resolver = StationResolver::new(&cfg).expect("builds");

        let records = vec![record("KSEA", 10.0, vec![])];
        let resolved = resolver.resolve(&cfg.airports, &records);

        match &resolved[0].classification {
            Classification::Matched(category) => assert_eq!(category.name, "VFR"),
            other => panic!("expected VFR match, got {other:?}"),
        }
        assert_eq!(resolved[0].metadata.name, "KSEA");
        assert_eq!(resolved[0].metadata.icon, "☀️");
    }

    #[test]
    fn low_overcast_classifies_as_low_ceiling_category() {
        let cfg = test_config();
        let resolver = StationResolver::new(&cfg).expect("builds");

        // OVC at 500 ft: below the 1000 ft IFR threshold, at (not below)
        // the 500 ft LIFR threshold.
        let records = vec![record("KPDX", 10.0, overcast(500))];
        let resolved = resolver.resolve(&cfg.airports, &records);
        match &resolved[1].classification {
            Classification::Matched(category) => assert_eq!(category.name, "IFR"),
            other => panic!("expected IFR match, got {other:?}"),
        }

        // OVC at 400 ft crosses into LIFR.
        let records = vec![record("KPDX", 10.0, overcast(400))];
        let resolved = resolver.resolve(&cfg.airports, &records);
        match &resolved[1].classification {
            Classification::Matched(category) => assert_eq!(category.name, "LIFR"),
            other => panic!("expected LIFR match, got {other:?}"),
        }
    }

    #[test]
    fn missing_station_degrades_to_fault() {
        let cfg = test_config();
        let resolver = StationResolver::new(&cfg).expect("builds");

        let records = vec![
            record("KSEA", 10.0, vec![]),
            record("KPDX", 10.0, overcast(2000)),
        ];
        let resolved = resolver.resolve(&cfg.airports, &records);

        assert_eq!(resolved[2].classification, Classification::FetchFailed);
        assert_eq!(resolved[2].color, cfg.fault.color);
        assert_eq!(resolved[2].metadata.icon, cfg.fault.icon);
        assert_eq!(resolved[2].metadata.name, "KKKK");
    }

    #[test]
    fn unmatched_station_degrades_to_fault() {
        let mut cfg = test_config();
        // A table with a gap: nothing matches clear weather.
        cfg.categories = vec![crate::config::CategoryRule {
            name: "LIFR".to_string(),
            color: Rgb::new(255, 0, 255),
            icon: "🌩".to_string(),
            expression: vec!["visibility < 1".to_string()],
        }];
        let resolver = StationResolver::new(&cfg).expect("builds");

        let records = vec![record("KSEA", 10.0, vec![])];
        let resolved = resolver.resolve(&cfg.airports, &records);

        assert_eq!(resolved[0].classification, Classification::Unmatched);
        assert_eq!(resolved[0].color, cfg.fault.color);
    }

    #[test]
    fn station_ids_match_case_insensitively() {
        let cfg = test_config();
        let resolver = StationResolver::new(&cfg).expect("builds");

        let records = vec![record("ksea", 10.0, vec![])];
        let resolved = resolver.resolve(&cfg.airports, &records);

        assert!(matches!(
            resolved[0].classification,
            Classification::Matched(_)
        ));
    }
}
