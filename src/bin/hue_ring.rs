use anyhow::Result;
use metro_ring_clock::{app, config::ClockConfig, renders::HueRing};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = ClockConfig::load()?;

    let led_driver = app::start_driver(Box::new(HueRing::new(&config.ring)), &config)?;

    app::run_until_stopped(led_driver).await
}
