use anyhow::{bail, Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
    time::Duration,
};
use strum_macros::{AsRefStr, EnumString};

/// Environment variable that overrides the location of the configuration file
pub const CONFIG_ENV: &str = "RING_CLOCK_CONFIG";

/// File name looked up in the user's home directory when no override is given
pub const CONFIG_FILE: &str = "ring-clock.yaml";

/// Bounds of the refresh interval, in seconds
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 60;
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 120;

/// Order in which the LED strip expects the color channels to be clocked out
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ColorOrder {
    Rgb,
    Rbg,
    Grb,
    Gbr,
    Brg,
    Bgr,
}

impl ColorOrder {
    /// Arrange the channels of a color in the order they go out on the wire
    pub fn arrange(self, r: u8, g: u8, b: u8) -> [u8; 3] {
        match self {
            ColorOrder::Rgb => [r, g, b],
            ColorOrder::Rbg => [r, b, g],
            ColorOrder::Grb => [g, r, b],
            ColorOrder::Gbr => [g, b, r],
            ColorOrder::Brg => [b, r, g],
            ColorOrder::Bgr => [b, g, r],
        }
    }
}

/// How to interpret departure timestamps that carry no UTC offset
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "PascalCase", ascii_case_insensitive)]
pub enum NaiveZone {
    Local,
    Utc,
}

/// A color expressed as hue, saturation and value, each in `0.0..=1.0`
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct HsvColor {
    pub hue: f32,
    pub sat: f32,
    pub val: f32,
}

impl HsvColor {
    pub const fn new(hue: f32, sat: f32, val: f32) -> Self {
        Self { hue, sat, val }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct FeedConfig {
    /// Root of the real-time API, without a trailing slash
    pub base_url: String,

    /// Three letter station code, e.g. `WTL`
    pub station_code: Option<String>,

    /// Station name as listed by the API, e.g. `Whitley Bay`. Takes preference over `station_code`.
    pub station_name: Option<String>,

    pub platform: u8,

    pub request_timeout_secs: u64,

    pub naive_zone: NaiveZone,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://metro-rti.nexus.org.uk/api".to_string(),
            station_code: Some("WTL".to_string()),
            station_name: None,
            platform: 1,
            request_timeout_secs: 10,
            naive_zone: NaiveZone::Local,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct RingConfig {
    /// Number of LEDs around the clock face
    pub num_leds: usize,

    /// Number of LEDs the strip is rotated away from the 12 o'clock position
    pub offset: i32,

    /// Color of a departure while the data is fresh
    pub highlight: HsvColor,

    /// Color of a departure after the last refresh failed
    pub stale: HsvColor,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            num_leds: 96,
            offset: 0,
            highlight: HsvColor::new(0.0, 1.0, 0.5),
            stale: HsvColor::new(0.08, 1.0, 0.2),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct HardwareConfig {
    pub spi_device: String,
    pub color_order: ColorOrder,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            spi_device: "/dev/spidev0.0".to_string(),
            color_order: ColorOrder::Grb,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct ClockConfig {
    pub feed: FeedConfig,
    pub ring: RingConfig,
    pub hardware: HardwareConfig,

    /// Time between two refreshes of the departure feed
    pub refresh_interval_secs: u64,

    /// Departures further away than this are not shown
    pub horizon_secs: u64,

    /// Time between two attempts to reach the feed during start up
    pub bootstrap_retry_secs: u64,

    /// Time between two frames pushed to the LED ring
    pub frame_interval_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            ring: RingConfig::default(),
            hardware: HardwareConfig::default(),
            refresh_interval_secs: MIN_REFRESH_INTERVAL_SECS,
            horizon_secs: 3600,
            bootstrap_retry_secs: 10,
            frame_interval_ms: 500,
        }
    }
}

impl ClockConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn bootstrap_retry(&self) -> Duration {
        Duration::from_secs(self.bootstrap_retry_secs)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ring.num_leds == 0 {
            bail!("ring.num_leds must be greater than zero");
        }

        if self.feed.platform == 0 {
            bail!("feed.platform must be greater than zero");
        }

        if !(MIN_REFRESH_INTERVAL_SECS..=MAX_REFRESH_INTERVAL_SECS)
            .contains(&self.refresh_interval_secs)
        {
            bail!(
                "refresh_interval_secs must be between {} and {}, got {}",
                MIN_REFRESH_INTERVAL_SECS,
                MAX_REFRESH_INTERVAL_SECS,
                self.refresh_interval_secs
            );
        }

        if self.horizon_secs == 0 {
            bail!("horizon_secs must be greater than zero");
        }

        if self.bootstrap_retry_secs == 0 || self.frame_interval_ms == 0 {
            bail!("bootstrap_retry_secs and frame_interval_ms must be greater than zero");
        }

        if self.feed.station_code.is_none() && self.feed.station_name.is_none() {
            bail!("Need to provide either feed.station_code or feed.station_name");
        }

        Ok(())
    }

    /// Location of the configuration file, `$RING_CLOCK_CONFIG` or `$HOME/ring-clock.yaml`
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let home_dir = std::env::var("HOME").context("Can not load HOME environment variable")?;
        let mut file_path = PathBuf::from(home_dir);
        file_path.push(CONFIG_FILE);
        Ok(file_path)
    }

    /// Load and validate the configuration, falling back to the defaults when the file is absent
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let config = if path.exists() {
            Self::read_from(&path)?
        } else {
            warn!(
                "No configuration found at {}, using defaults",
                path.display()
            );
            Self::default()
        };

        config.validate()?;
        debug!("Loaded config: {:#?}", config);

        Ok(config)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file {}", path.display()))?;
        serde_yaml::from_reader(BufReader::new(file)).context("Unable to parse YAML file")
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create file {}", path.display()))?;
        serde_yaml::to_writer(BufWriter::new(file), self).context("Could not write to YAML file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn defaults_are_valid() {
        let config = ClockConfig::default();
        config.validate().unwrap();

        assert_eq!(config.ring.num_leds, 96);
        assert_eq!(config.ring.offset, 0);
        assert_eq!(config.feed.station_code.as_deref(), Some("WTL"));
        assert_eq!(config.feed.platform, 1);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r#"
feed:
  station_name: Whitley Bay
  station_code: null
  platform: 2
  naive_zone: Utc
ring:
  offset: -12
hardware:
  color_order: Rgb
refresh_interval_secs: 90
"#;
        let config: ClockConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.feed.station_name.as_deref(), Some("Whitley Bay"));
        assert_eq!(config.feed.station_code, None);
        assert_eq!(config.feed.platform, 2);
        assert_eq!(config.feed.naive_zone, NaiveZone::Utc);
        assert_eq!(config.feed.base_url, "https://metro-rti.nexus.org.uk/api");
        assert_eq!(config.ring.offset, -12);
        assert_eq!(config.ring.num_leds, 96);
        assert_eq!(config.hardware.color_order, ColorOrder::Rgb);
        assert_eq!(config.refresh_interval(), Duration::from_secs(90));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = ClockConfig {
            refresh_interval_secs: 30,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.refresh_interval_secs = 121;
        assert!(config.validate().is_err());

        config.refresh_interval_secs = 120;
        config.validate().unwrap();

        config.ring.num_leds = 0;
        assert!(config.validate().is_err());
        config.ring.num_leds = 60;

        config.feed.platform = 0;
        assert!(config.validate().is_err());
        config.feed.platform = 1;

        config.feed.station_code = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn enum_options_parse_case_insensitively() {
        assert_eq!(ColorOrder::from_str("grb").unwrap(), ColorOrder::Grb);
        assert_eq!(ColorOrder::Bgr.as_ref(), "BGR");
        assert_eq!(NaiveZone::from_str("LOCAL").unwrap(), NaiveZone::Local);
        assert!(NaiveZone::from_str("Mars").is_err());
    }

    #[test]
    fn color_order_arranges_channels() {
        assert_eq!(ColorOrder::Rgb.arrange(1, 2, 3), [1, 2, 3]);
        assert_eq!(ColorOrder::Grb.arrange(1, 2, 3), [2, 1, 3]);
        assert_eq!(ColorOrder::Bgr.arrange(1, 2, 3), [3, 2, 1]);
        assert_eq!(ColorOrder::Brg.arrange(1, 2, 3), [3, 1, 2]);
    }

    #[test]
    fn write_then_read_file() {
        let path = std::env::temp_dir().join(format!("ring-clock-{}.yaml", std::process::id()));
        let mut config = ClockConfig::default();
        config.ring.offset = 7;
        config.feed.station_code = Some("MTS".to_string());

        config.write_to(&path).unwrap();
        let loaded = ClockConfig::read_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.ring.offset, 7);
        assert_eq!(loaded.feed.station_code.as_deref(), Some("MTS"));
    }
}
