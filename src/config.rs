// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::input::{DEFAULT_ESCAPE_TIMEOUT, DEFAULT_REFRESH_INTERVAL};
use crate::rate::{ByteRateEstimator, DEFAULT_RATE_SAMPLES, DEFAULT_RATE_TICK};

pub const SETTINGS_FILE: &str = "settings.toml";
pub const ENV_PREFIX: &str = "YTFETCH_";
/// How long the final frame stays up before the terminal is handed back.
pub const DEFAULT_LINGER: Duration = Duration::from_millis(1500);

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub downloader: String,
    pub default_format: String,
    pub refresh_interval_ms: u64,
    pub escape_timeout_ms: u64,
    pub rate_samples: usize,
    pub rate_tick_ms: u64,
    pub linger_ms: u64,
    pub color: ColorChoice,
    pub log_level: String,
    pub interactive: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: None,
            downloader: "yt-dlp".to_string(),
            default_format: "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL.as_millis() as u64,
            escape_timeout_ms: DEFAULT_ESCAPE_TIMEOUT.as_millis() as u64,
            rate_samples: DEFAULT_RATE_SAMPLES,
            rate_tick_ms: DEFAULT_RATE_TICK.as_millis() as u64,
            linger_ms: DEFAULT_LINGER.as_millis() as u64,
            color: ColorChoice::Auto,
            log_level: "info".to_string(),
            interactive: true,
        }
    }
}

impl Settings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    pub fn escape_timeout(&self) -> Duration {
        Duration::from_millis(self.escape_timeout_ms.max(1))
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }

    pub fn rate_estimator(&self) -> ByteRateEstimator {
        ByteRateEstimator::new(self.rate_samples, Duration::from_millis(self.rate_tick_ms))
    }
}

/// Returns `(config_dir, data_dir)` for this user, if a home directory exists.
pub fn get_app_paths() -> Option<(PathBuf, PathBuf)> {
    let dirs = ProjectDirs::from("com", "ytfetch", "ytfetch")?;
    Some((
        dirs.config_dir().to_path_buf(),
        dirs.data_local_dir().to_path_buf(),
    ))
}

/// Defaults, then the settings file, then `YTFETCH_*` environment variables.
///
/// A missing settings file is not an error.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, figment::Error> {
    let file = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => get_app_paths().map(|(config_dir, _)| config_dir.join(SETTINGS_FILE)),
    };

    let mut figment = Figment::from(Serialized::defaults(Settings::default()));
    if let Some(file) = file {
        figment = figment.merge(Toml::file(file));
    }
    figment.merge(Env::prefixed(ENV_PREFIX)).extract()
}

pub fn dump_settings(settings: &Settings) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(settings)
}

/// Resolves the download directory to an absolute path and creates it.
pub fn prepare_output_dir(dir: Option<&Path>) -> io::Result<PathBuf> {
    let dir = match dir {
        Some(d) if d.is_absolute() => d.to_path_buf(),
        Some(d) => std::env::current_dir()?.join(d),
        None => std::env::current_dir()?,
    };

    if dir.exists() && !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a directory", dir.display()),
        ));
    }
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
