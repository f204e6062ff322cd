use serde::Deserialize;
use std::collections::HashMap;

/// `GET /stations`: station code to station name
pub type Stations = HashMap<String, String>;

/// `GET /stations/platforms`: station code to the platforms of that station
pub type StationPlatforms = HashMap<String, Vec<Platform>>;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    /// Human readable description of where the platform goes, e.g. "Trains to St James"
    pub helper_text: String,
}

/// One entry of `GET /times/{station}/{platform}`
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformTime {
    /// Predicted departure time, e.g. `2024-03-01T17:42:10.000Z`
    pub actual_predicted_time: String,

    #[serde(default)]
    pub destination: Option<String>,
}
