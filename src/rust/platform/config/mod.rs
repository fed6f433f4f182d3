use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::engine::layout::PitchRange;
use crate::engine::playback::SessionConfig;

pub const CONFIG_JSON: &str = "keylight.json";
pub const CONFIG_TOML: &str = "keylight.toml";
pub const CONFIG_DOT: &str = ".keylight";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialSection,
    pub device: DeviceSection,
    pub timing: TimingSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSection {
    pub port: String,
    pub baud_rate: u32,
    /// Wait after opening the port while the controller resets.
    pub settle_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    pub channels: u16,
    pub min_pitch: u8,
    pub max_pitch: u8,
    /// Layout file (JSON or TOML); the built-in piano layout when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    pub default_duration_ms: u64,
    pub drain_tick_ms: u64,
    pub command_delay_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub verbose: bool,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 115_200,
            settle_ms: 2_000,
        }
    }
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            channels: 142,
            min_pitch: PitchRange::PIANO.min,
            max_pitch: PitchRange::PIANO.max,
            layout: None,
        }
    }
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            default_duration_ms: 100,
            drain_tick_ms: 50,
            command_delay_ms: 10,
        }
    }
}

fn default_port() -> &'static str {
    if cfg!(windows) { "COM3" } else { "/dev/ttyUSB0" }
}

impl AppConfig {
    /// Load the project config from `root`, writing a default `keylight.json`
    /// when none exists.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let candidates: Vec<PathBuf> = [CONFIG_TOML, CONFIG_JSON, CONFIG_DOT]
            .iter()
            .map(|name| root.join(name))
            .filter(|path| path.exists())
            .collect();

        let config = match candidates.first() {
            None => {
                let default = AppConfig::default();
                write_default_json(&root.join(CONFIG_JSON), &default)?;
                default
            }
            // Priority: keylight.toml > keylight.json > .keylight
            Some(path) => load_config_by_path(path)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.min_pitch > self.device.max_pitch {
            bail!(
                "device.min_pitch ({}) is above device.max_pitch ({})",
                self.device.min_pitch,
                self.device.max_pitch
            );
        }
        if self.device.max_pitch > 127 {
            bail!("device.max_pitch ({}) is not a MIDI note", self.device.max_pitch);
        }
        if self.device.channels == 0 {
            bail!("device.channels must be at least 1");
        }
        if self.serial.baud_rate == 0 {
            bail!("serial.baud_rate must be positive");
        }
        Ok(())
    }

    pub fn pitch_range(&self) -> PitchRange {
        PitchRange::new(self.device.min_pitch, self.device.max_pitch)
    }

    pub fn layout_path(&self, root: impl AsRef<Path>) -> Option<PathBuf> {
        self.device
            .layout
            .as_ref()
            .map(|layout| root.as_ref().join(layout))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.serial.settle_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            pitch_range: self.pitch_range(),
            default_duration: Duration::from_millis(self.timing.default_duration_ms.max(1)),
            drain_tick: Duration::from_millis(self.timing.drain_tick_ms.max(1)),
            command_delay: Duration::from_millis(self.timing.command_delay_ms),
        }
    }
}

fn load_json(path: &Path) -> Result<AppConfig> {
    let file = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let config = serde_json::from_str(&file)
        .with_context(|| format!("invalid JSON config: {}", path.display()))?;
    Ok(config)
}

fn load_toml(path: &Path) -> Result<AppConfig> {
    let file = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let config = toml::from_str(&file)
        .with_context(|| format!("invalid TOML config: {}", path.display()))?;
    Ok(config)
}

fn load_config_by_path(path: &Path) -> Result<AppConfig> {
    // `.keylight` may hold either format; sniff the first character.
    if path.file_name().and_then(|s| s.to_str()) == Some(CONFIG_DOT) {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let trimmed = raw.trim_start();
        return if trimmed.starts_with('{') {
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid JSON config: {}", path.display()))
        } else {
            toml::from_str(&raw).with_context(|| format!("invalid TOML config: {}", path.display()))
        };
    }

    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("toml") => load_toml(path),
        _ => load_json(path),
    }
}

fn write_default_json(path: &Path, config: &AppConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("serialize default config")?;
    let mut file = File::create(path)
        .with_context(|| format!("failed to create config file: {}", path.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("failed to write config file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "test_config.rs"]
mod tests;
