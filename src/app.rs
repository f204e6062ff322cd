use crate::{
    config::{ClockConfig, FeedConfig},
    driver::{HardwareDriver, RingDriver},
    metro::{MetroClient, PlatformFeed},
    render::Render,
    ring::RingCanvas,
};
use anyhow::{anyhow, bail, Result};
use chrono::Local;
use log::{info, warn};
use std::{collections::BTreeMap, time::Duration};

#[cfg(feature = "rpi")]
pub type ActiveDriver = crate::driver::Ws2812Driver;
#[cfg(all(feature = "simulator", not(feature = "rpi")))]
pub type ActiveDriver = crate::driver::SimulatorDriver;
#[cfg(not(any(feature = "simulator", feature = "rpi")))]
pub type ActiveDriver = crate::driver::LogDriver;

/// Start pushing frames of `render` to whichever LED output this build drives
pub fn start_driver(
    render: Box<dyn Render<RingCanvas> + Send + Sync>,
    config: &ClockConfig,
) -> Result<RingDriver<ActiveDriver>> {
    #[cfg(feature = "rpi")]
    let driver_config = config.hardware.clone();
    #[cfg(not(feature = "rpi"))]
    let driver_config = ();

    RingDriver::new(
        render,
        driver_config,
        config.ring.num_leds,
        config.frame_interval(),
    )
}

/// Pick the code of the configured station out of the station list of the feed.
///
/// A configured station name takes preference over the station code and must be listed.
pub fn select_station(stations: &BTreeMap<String, String>, feed: &FeedConfig) -> Result<String> {
    match (&feed.station_code, &feed.station_name) {
        (_, Some(station_name)) => stations
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(station_name))
            .map(|(_, code)| code.clone())
            .ok_or_else(|| anyhow!("Unknown station {station_name:?}")),
        (Some(station_code), None) => {
            if !stations.values().any(|code| code == station_code) {
                warn!("Station {station_code} is not listed by the departure feed");
            }
            Ok(station_code.clone())
        }
        (None, None) => bail!("Need to provide at least one station"),
    }
}

/// Wait until the departure feed answers, retrying every `retry`, then resolve the configured
/// station against it. An unknown station name is not retried.
pub async fn resolve_station(
    client: &MetroClient,
    feed: &FeedConfig,
    retry: Duration,
) -> Result<String> {
    loop {
        match client.stations().await {
            Ok(stations) => return select_station(&stations, feed),
            Err(e) => {
                warn!("Departure feed not reachable yet, retrying in {retry:?}: {e:#}");
                tokio::time::sleep(retry).await;
            }
        }
    }
}

/// Wait for the departure feed to become reachable and bind it to the configured platform
pub async fn bootstrap(client: MetroClient, config: &ClockConfig) -> Result<PlatformFeed> {
    info!("Starting up, local time is {}", Local::now().to_rfc3339());

    let station_code = resolve_station(&client, &config.feed, config.bootstrap_retry()).await?;

    info!(
        "Showing departures of station {station_code} platform {}",
        config.feed.platform
    );

    match client.platform_helper_texts(&station_code).await {
        Ok(helper_texts) => {
            for (index, helper_text) in helper_texts.iter().enumerate() {
                info!("Platform {}: {helper_text}", index + 1);
            }

            if !helper_texts.is_empty() && usize::from(config.feed.platform) > helper_texts.len() {
                warn!(
                    "Station {station_code} only lists {} platforms",
                    helper_texts.len()
                );
            }
        }
        Err(e) => warn!("Could not get platform information: {e:#}"),
    }

    Ok(PlatformFeed::new(
        client,
        station_code,
        config.feed.platform,
        config.feed.naive_zone,
    ))
}

/// Keep running until Ctrl+C or until the LED output goes away.
///
/// Returns the error the driver thread stopped with, if any.
pub async fn run_until_stopped<D: HardwareDriver>(driver: RingDriver<D>) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut interval = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                info!("Ctrl+C received!");
                break;
            }
            _ = interval.tick() => {
                if driver.is_finished() {
                    info!("LED driver stopped");
                    break;
                }
            }
        }
    }

    driver.stop()
}
