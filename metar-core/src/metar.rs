//! Minimal METAR decoder.
//!
//! Only the fields the classification pipeline consumes are decoded:
//! prevailing visibility and cloud layers. Everything else in the report
//! (wind, temperature, remarks) is skipped without complaint, so feeding a
//! full METAR through here is always safe.

use crate::error::DecodeError;
use crate::model::{CloudLayer, DecodedMetar};

const METERS_PER_STATUTE_MILE: f64 = 1609.344;

/// Visibility reported as "CAVOK" or "9999" means 10 km or more.
const UNLIMITED_VISIBILITY_MI: f64 = 10_000.0 / METERS_PER_STATUTE_MILE;

/// Decode a raw METAR string into the fields classification needs.
///
/// A report with no recognizable visibility group is a decode error; absent
/// cloud groups are fine (clear skies are common).
pub fn decode(raw: &str) -> Result<DecodedMetar, DecodeError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut visibility_mi: Option<f64> = None;
    let mut clouds = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        // Nothing we care about appears after the remarks marker.
        if *token == "RMK" {
            break;
        }

        if visibility_mi.is_none() {
            let prev = if i > 0 { Some(tokens[i - 1]) } else { None };
            if let Some(vis) = parse_visibility(token, prev) {
                visibility_mi = Some(vis);
                continue;
            }
        }

        if let Some(layer) = parse_cloud_layer(token) {
            clouds.push(layer);
        }
    }

    let visibility_mi = visibility_mi.ok_or_else(|| DecodeError::MissingVisibility {
        raw: raw.to_string(),
    })?;

    Ok(DecodedMetar {
        visibility_mi,
        clouds,
    })
}

/// Parse a visibility group. Handles the statute-mile forms `10SM`,
/// `1/2SM`, `2 1/2SM` (split across two tokens, `prev` carrying the whole
/// miles), `M1/4SM`, `P6SM`, plus the metric 4-digit meters form and CAVOK.
fn parse_visibility(token: &str, prev: Option<&str>) -> Option<f64> {
    if token == "CAVOK" {
        return Some(UNLIMITED_VISIBILITY_MI);
    }

    if let Some(body) = token.strip_suffix("SM") {
        // "M" prefixes "less than", "P" prefixes "more than"; the bound
        // itself is close enough for classification.
        let body = body.trim_start_matches(['M', 'P']);
        let mut value = parse_miles(body)?;
        if body.contains('/') {
            if let Some(whole) = prev.and_then(|p| p.parse::<u32>().ok()) {
                value += f64::from(whole);
            }
        }
        return Some(value);
    }

    // Metric visibility: a standalone 4-digit meters group, e.g. "0800".
    if token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()) {
        let meters: f64 = token.parse().ok()?;
        if meters >= 9999.0 {
            return Some(UNLIMITED_VISIBILITY_MI);
        }
        return Some(meters / METERS_PER_STATUTE_MILE);
    }

    None
}

fn parse_miles(body: &str) -> Option<f64> {
    if let Some((num, den)) = body.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den == 0.0 {
            return None;
        }
        return Some(num / den);
    }
    body.parse().ok()
}

/// Parse a cloud group: coverage code plus 3-digit height in hundreds of
/// feet, e.g. "BKN015", "OVC005CB", "VV002". Clear-sky markers and anything
/// unrecognized yield no layer.
fn parse_cloud_layer(token: &str) -> Option<CloudLayer> {
    let code = ["FEW", "SCT", "BKN", "OVC", "VV"]
        .into_iter()
        .find(|code| token.starts_with(code))?;

    let rest = &token[code.len()..];
    let height: u32 = rest.get(..3)?.parse().ok()?;

    Some(CloudLayer {
        code: code.to_string(),
        base_ft_agl: height * 100,
    })
}
