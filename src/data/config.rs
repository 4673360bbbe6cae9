//! Application Configuration
//!
//! Handles loading, validating and saving the user's overlay settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::motion::constants::*;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub motion: MotionConfig,
}

impl AppConfig {
    /// Default config file path (next to the executable)
    pub fn config_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Saved position file that lives beside the given config file
    pub fn position_path(config_path: &Path) -> PathBuf {
        config_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("position.json")
    }

    /// Load configuration from file or create default
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = AppConfig::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.overlay.opacity > MAX_OPACITY {
            return Err(Error::InvalidOpacity(self.overlay.opacity));
        }
        if self.overlay.icon_size <= 0 {
            return Err(Error::Config(format!(
                "icon_size must be positive, got {}",
                self.overlay.icon_size
            )));
        }
        let friction = self.motion.friction;
        if !(friction > 0.0 && friction < 1.0) {
            return Err(Error::Config(format!(
                "friction must be in (0, 1), got {}",
                friction
            )));
        }
        for (name, value) in [
            ("velocity_threshold", self.motion.velocity_threshold),
            ("stop_threshold", self.motion.stop_threshold),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if self.motion.frame_delay_ms == 0 || self.motion.snap_duration_ms == 0 {
            return Err(Error::Config(
                "frame_delay_ms and snap_duration_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Overlay appearance and lifetime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Icon opacity in percent
    #[serde(default = "default_opacity")]
    pub opacity: u8,
    #[serde(default)]
    pub timeout: TimeoutOption,
    #[serde(default)]
    pub stop_on_screen_off: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_icon: Option<PathBuf>,
    #[serde(default = "default_icon_size")]
    pub icon_size: i32,
}

fn default_opacity() -> u8 {
    MAX_OPACITY
}

fn default_icon_size() -> i32 {
    ICON_SIZE
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            opacity: default_opacity(),
            timeout: TimeoutOption::default(),
            stop_on_screen_off: false,
            custom_icon: None,
            icon_size: default_icon_size(),
        }
    }
}

/// Motion tunables. Defaults reproduce the stock glide and snap feel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    #[serde(default = "default_friction")]
    pub friction: f64,
    /// Release speed (px/s, per axis) below which the icon snaps without a fling
    #[serde(default = "default_velocity_threshold")]
    pub velocity_threshold: f64,
    /// Per-frame speed (px/frame, per axis) at which a fling ends
    #[serde(default = "default_stop_threshold")]
    pub stop_threshold: f64,
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,
    #[serde(default = "default_snap_duration_ms")]
    pub snap_duration_ms: u64,
}

fn default_friction() -> f64 {
    FRICTION
}

fn default_velocity_threshold() -> f64 {
    VELOCITY_THRESHOLD
}

fn default_stop_threshold() -> f64 {
    STOP_THRESHOLD
}

fn default_frame_delay_ms() -> u64 {
    FRAME_DELAY_MS
}

fn default_snap_duration_ms() -> u64 {
    SNAP_DURATION_MS
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            friction: default_friction(),
            velocity_threshold: default_velocity_threshold(),
            stop_threshold: default_stop_threshold(),
            frame_delay_ms: default_frame_delay_ms(),
            snap_duration_ms: default_snap_duration_ms(),
        }
    }
}

impl MotionConfig {
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }
}

/// Auto-dismiss timeout choices offered by the settings screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutOption {
    #[default]
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    TwoHours,
}

impl TimeoutOption {
    pub const ALL: [TimeoutOption; 6] = [
        TimeoutOption::Off,
        TimeoutOption::FiveMinutes,
        TimeoutOption::FifteenMinutes,
        TimeoutOption::ThirtyMinutes,
        TimeoutOption::OneHour,
        TimeoutOption::TwoHours,
    ];

    /// Timeout in milliseconds, 0 when disabled
    pub fn millis(self) -> u64 {
        const MINUTE: u64 = 60 * 1000;
        match self {
            TimeoutOption::Off => 0,
            TimeoutOption::FiveMinutes => 5 * MINUTE,
            TimeoutOption::FifteenMinutes => 15 * MINUTE,
            TimeoutOption::ThirtyMinutes => 30 * MINUTE,
            TimeoutOption::OneHour => 60 * MINUTE,
            TimeoutOption::TwoHours => 120 * MINUTE,
        }
    }

    pub fn duration(self) -> Option<Duration> {
        match self.millis() {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            TimeoutOption::Off => "off",
            TimeoutOption::FiveMinutes => "5m",
            TimeoutOption::FifteenMinutes => "15m",
            TimeoutOption::ThirtyMinutes => "30m",
            TimeoutOption::OneHour => "1h",
            TimeoutOption::TwoHours => "2h",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeoutOption::Off => "Off",
            TimeoutOption::FiveMinutes => "5 minutes",
            TimeoutOption::FifteenMinutes => "15 minutes",
            TimeoutOption::ThirtyMinutes => "30 minutes",
            TimeoutOption::OneHour => "1 hour",
            TimeoutOption::TwoHours => "2 hours",
        }
    }
}

impl fmt::Display for TimeoutOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeoutOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        TimeoutOption::ALL
            .into_iter()
            .find(|opt| opt.key() == wanted)
            .ok_or_else(|| Error::UnknownTimeout(s.to_string()))
    }
}
