use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SourceConfig;
use crate::metar;
use crate::model::WeatherRecord;

use super::MetarSource;

/// Fetches raw METAR text for a batch of stations in one request.
///
/// The endpoint is a URI template from configuration, so any service that
/// returns one raw METAR per line works: aviationweather.gov by default,
/// or anything else a deployment points it at.
#[derive(Debug, Clone)]
pub struct AviationWeatherSource {
    uri_template: String,
    http: Client,
}

impl AviationWeatherSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name: HeaderName = name
                .parse()
                .with_context(|| format!("Invalid source header name: {name}"))?;
            let value: HeaderValue = value
                .parse()
                .with_context(|| format!("Invalid source header value for {name}"))?;
            headers.insert(name, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for the METAR source")?;

        Ok(Self {
            uri_template: config.uri.clone(),
            http,
        })
    }
}

#[async_trait]
impl MetarSource for AviationWeatherSource {
    async fn fetch(&self, station_ids: &[String]) -> Result<Vec<WeatherRecord>> {
        let ids = station_ids
            .iter()
            .map(|id| id.to_uppercase())
            .collect::<Vec<_>>()
            .join(",");
        let url = self.uri_template.replace("{ids}", &ids);

        debug!(stations = %ids, "fetching METARs");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to send request to the METAR source")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read METAR source response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "METAR source request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let fetched_at = Utc::now();
        let mut records = Vec::new();

        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some(id) = line.split_whitespace().next() else {
                continue;
            };

            // A station the decoder cannot handle is simply omitted; the
            // resolver degrades it to the fault category.
            match metar::decode(line) {
                Ok(decoded) => records.push(WeatherRecord {
                    id: id.to_string(),
                    raw: line.to_string(),
                    decoded,
                    fetched_at,
                }),
                Err(err) => {
                    warn!(station = %id, error = %err, "skipping undecodable METAR");
                }
            }
        }

        debug!(
            requested = station_ids.len(),
            fetched = records.len(),
            "fetch complete"
        );

        Ok(records)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    // Cut at a char boundary; error bodies are arbitrary bytes-of-HTML in
    // whatever encoding the endpoint felt like.
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
