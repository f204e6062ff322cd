mod departure_clock;
mod hue_ring;

pub use departure_clock::{Clock, ClockSettings, ClockState, DepartureClock, Freshness};
pub use hue_ring::HueRing;
