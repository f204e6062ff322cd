pub mod app;
pub mod config;
pub mod departures;
pub mod driver;
pub mod metro;
pub mod render;
pub mod renders;
pub mod ring;
