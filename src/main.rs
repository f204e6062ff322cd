use anyhow::Result;
use log::info;
use metro_ring_clock::{
    app,
    config::ClockConfig,
    metro::MetroClient,
    renders::{ClockSettings, DepartureClock},
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = ClockConfig::load()?;
    let client = MetroClient::new(&config.feed)?;

    let feed = tokio::select! {
        feed = app::bootstrap(client, &config) => feed?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received!");
            return Ok(());
        }
    };

    let departure_clock = Box::new(DepartureClock::new(feed, ClockSettings::from(&config)));
    let led_driver = app::start_driver(departure_clock, &config)?;

    app::run_until_stopped(led_driver).await
}
