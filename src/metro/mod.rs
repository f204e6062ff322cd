//! Client for the Tyne and Wear Metro real-time information API.

use crate::{config::FeedConfig, config::NaiveZone, departures::parse_timestamp};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use std::{collections::BTreeMap, future::Future, time::Duration};

mod responses;

pub use responses::{Platform, PlatformTime, StationPlatforms, Stations};

/// Anything that can tell when the next trains leave
pub trait DepartureSource: Send + Sync + 'static {
    /// Departure instants of the station and platform, sorted ascending
    fn departures(&self) -> impl Future<Output = Result<Vec<DateTime<Utc>>>> + Send;
}

#[derive(Debug, Clone)]
pub struct MetroClient {
    base_url: String,
    client: reqwest::Client,
}

impl MetroClient {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {url}");

        self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("Request to {url} was rejected"))?
            .json::<T>()
            .await
            .with_context(|| format!("Could not parse response of {url}"))
    }

    /// Station names mapped to their three letter code
    pub async fn stations(&self) -> Result<BTreeMap<String, String>> {
        let stations: Stations = self.get("stations").await?;

        Ok(stations
            .into_iter()
            .map(|(code, name)| (name, code))
            .collect())
    }

    /// The helper text of every platform of a station, empty for an unknown station
    pub async fn platform_helper_texts(&self, station_code: &str) -> Result<Vec<String>> {
        let mut platforms: StationPlatforms = self.get("stations/platforms").await?;

        Ok(platforms
            .remove(station_code)
            .unwrap_or_default()
            .into_iter()
            .map(|platform| platform.helper_text)
            .collect())
    }

    pub async fn platform_times(
        &self,
        station_code: &str,
        platform: u8,
    ) -> Result<Vec<PlatformTime>> {
        self.get(&format!("times/{station_code}/{platform}")).await
    }

    /// Predicted departures of a platform, sorted ascending. Unreadable timestamps are skipped.
    pub async fn departures(
        &self,
        station_code: &str,
        platform: u8,
        zone: NaiveZone,
    ) -> Result<Vec<DateTime<Utc>>> {
        let mut departures = self
            .platform_times(station_code, platform)
            .await?
            .into_iter()
            .filter_map(
                |time| match parse_timestamp(&time.actual_predicted_time, zone) {
                    Ok(departure) => {
                        debug!(
                            "Train to {} leaves at {departure}",
                            time.destination.as_deref().unwrap_or("unknown destination")
                        );
                        Some(departure)
                    }
                    Err(e) => {
                        warn!("Skipping departure: {e:#}");
                        None
                    }
                },
            )
            .collect::<Vec<_>>();
        departures.sort();

        Ok(departures)
    }
}

/// A [MetroClient] bound to a single station platform
#[derive(Debug, Clone)]
pub struct PlatformFeed {
    client: MetroClient,
    station_code: String,
    platform: u8,
    zone: NaiveZone,
}

impl PlatformFeed {
    pub fn new(client: MetroClient, station_code: String, platform: u8, zone: NaiveZone) -> Self {
        Self {
            client,
            station_code,
            platform,
            zone,
        }
    }

    pub fn station_code(&self) -> &str {
        &self.station_code
    }

    pub fn platform(&self) -> u8 {
        self.platform
    }
}

impl DepartureSource for PlatformFeed {
    fn departures(&self) -> impl Future<Output = Result<Vec<DateTime<Utc>>>> + Send {
        self.client
            .departures(&self.station_code, self.platform, self.zone)
    }
}
