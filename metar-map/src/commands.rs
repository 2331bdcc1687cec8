//! Command implementations.
//!
//! Each command is one complete cycle over the pipeline: fetch, classify,
//! resolve, build, render. Per-station problems degrade to the fault
//! color inside the pipeline; only whole-batch and device failures
//! surface here, and both leave the strip in the visible all-fault state
//! rather than showing stale output.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{Instant, interval};
use tracing::{error, info};

use metar_core::classify::{Classifier, extract};
use metar_core::sequence::{self, LightEntry};
use metar_core::{Config, MetarSource, RenderGate, Rgb, StationResolver, metar};

/// Run one full scan cycle and render the result.
pub async fn scan(config: &Config, source: &dyn MetarSource, gate: &RenderGate) -> Result<()> {
    let resolver = StationResolver::new(config)?;
    let ids = config.station_ids();

    // One batched request; results are consumed only once it settles.
    let records = match source.fetch(&ids).await {
        Ok(records) => records,
        Err(err) => {
            error!("station fetch failed, showing fault pattern: {err:#}");
            if let Err(device_err) = gate.render_fault() {
                error!("could not render fault pattern either: {device_err}");
            }
            return Err(err).context("station fetch failed");
        }
    };

    let resolved = resolver.resolve(&config.airports, &records);
    let lights = sequence::build(config.leds.count, config.fault.color, &resolved);

    if let Err(err) = gate.render(&lights) {
        let _ = gate.render_fault();
        return Err(err).context("failed to render scan results");
    }

    info!(
        stations = config.airports.len(),
        fetched = records.len(),
        leds = config.leds.count,
        "scan rendered"
    );
    Ok(())
}

/// Blank the strip.
pub fn stop(gate: &RenderGate) -> Result<()> {
    gate.reset().context("failed to reset the strip")?;
    Ok(())
}

/// Run the color-wheel test pattern for a bounded duration, then reset.
pub async fn test_pattern(config: &Config, gate: &RenderGate, seconds: u64) -> Result<()> {
    // ~30 fps, same cadence the strip sees in normal service tests.
    let mut ticker = interval(Duration::from_millis(33));
    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut offset: u8 = 0;

    while Instant::now() < deadline {
        ticker.tick().await;

        let lights: Vec<LightEntry> = (0..config.leds.count)
            .map(|index| LightEntry {
                color: colorwheel(offset.wrapping_add(index as u8)),
                metadata: None,
            })
            .collect();

        if let Err(err) = gate.render(&lights) {
            let _ = gate.render_fault();
            return Err(err).context("failed to render test frame");
        }
        offset = offset.wrapping_add(1);
    }

    // The loop above is the only producer of frames, so once it exits no
    // further render can land after this reset.
    gate.reset().context("failed to reset after test pattern")?;
    Ok(())
}

/// Fetch and print station weather as JSON, with the matched category.
pub async fn station(config: &Config, source: &dyn MetarSource, stations: &str) -> Result<()> {
    let ids: Vec<String> = stations
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    let classifier = Classifier::compile(&config.categories)?;
    let records = source.fetch(&ids).await.context("station fetch failed")?;

    let reports: Vec<serde_json::Value> = records
        .iter()
        .map(|record| {
            let features = extract(&record.decoded, &config.ceiling_codes, config.default_ceiling_ft);
            let category = classifier.classify(&features).map(|c| c.name.clone());
            serde_json::json!({
                "id": record.id,
                "metar": record.raw,
                "decoded": record.decoded,
                "category": category,
                "fetched_at": record.fetched_at,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

/// Decode one raw METAR string and print the result as JSON.
pub fn parse(input: &str) -> Result<()> {
    let decoded = metar::decode(input.trim())?;
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

/// One position on the RGB color wheel, used by the test pattern.
fn colorwheel(pos: u8) -> Rgb {
    let pos = 255 - u16::from(pos);
    if pos < 85 {
        Rgb::new((255 - pos * 3) as u8, 0, (pos * 3) as u8)
    } else if pos < 170 {
        let pos = pos - 85;
        Rgb::new(0, (pos * 3) as u8, (255 - pos * 3) as u8)
    } else {
        let pos = pos - 170;
        Rgb::new((pos * 3) as u8, (255 - pos * 3) as u8, 0)
    }
}
