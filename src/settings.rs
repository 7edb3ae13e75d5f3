//! Read-only startup settings: optional RON file plus command line overrides.
//! Nothing here is ever written back to disk.

use std::path::{Path, PathBuf};

use bevy::prelude::*;
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::config::{
    EARTH_BUMP_TEXTURE, EARTH_CLOUDS_ALPHA_TEXTURE, EARTH_CLOUDS_TEXTURE, EARTH_COLOR_TEXTURE,
    EARTH_LIGHTS_TEXTURE, EARTH_SPECULAR_TEXTURE, SETTINGS_PATH,
};

/// Errors raised while reading the settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// Command line arguments, applied on top of the settings file.
#[derive(Parser, Debug, Default)]
#[command(name = "bevy_earth", about = "Rotating layered Earth viewer")]
pub struct CliArgs {
    /// Path to a RON settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Initial number of stars
    #[arg(long)]
    pub stars: Option<u32>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub params: InitialParams,
    pub textures: TexturePaths,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Starting values for the live parameter panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialParams {
    pub stars_count: u32,
    pub rotation_speed: f32,
    pub tilt_angle: f32,
    pub glow_scale: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TexturePaths {
    pub surface_color: String,
    pub surface_specular: String,
    pub surface_bump: String,
    pub night_lights: String,
    pub cloud_color: String,
    pub cloud_alpha: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub filter: String,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Earth".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl Default for InitialParams {
    fn default() -> Self {
        Self {
            stars_count: 10_000,
            rotation_speed: 0.002,
            tilt_angle: -23.4,
            glow_scale: 1.01,
        }
    }
}

impl Default for TexturePaths {
    fn default() -> Self {
        Self {
            surface_color: EARTH_COLOR_TEXTURE.to_string(),
            surface_specular: EARTH_SPECULAR_TEXTURE.to_string(),
            surface_bump: EARTH_BUMP_TEXTURE.to_string(),
            night_lights: EARTH_LIGHTS_TEXTURE.to_string(),
            cloud_color: EARTH_CLOUDS_TEXTURE.to_string(),
            cloud_alpha: EARTH_CLOUDS_ALPHA_TEXTURE.to_string(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filter: "wgpu=error,naga=warn".to_string(),
        }
    }
}

impl Settings {
    pub fn from_ron(path: &Path, contents: &str) -> Result<Self, SettingsError> {
        ron::from_str(contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(path, &contents)
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(stars) = args.stars {
            self.params.stars_count = stars;
        }
        if let Some(ref level) = args.log_level {
            self.log.level = level.clone();
        }
    }

    /// Tracing level for the log plugin, falling back to INFO on unknown names.
    pub fn log_level(&self) -> bevy::log::Level {
        self.log.level.parse().unwrap_or(bevy::log::Level::INFO)
    }
}

/// Problems found while resolving settings, reported once logging is up.
#[derive(Resource, Debug, Default)]
pub struct SettingsReport {
    pub source: Option<PathBuf>,
    pub problems: Vec<String>,
}

/// Resolve settings from the command line and the settings file.
/// A broken file never stops the viewer; it falls back to defaults.
pub fn resolve(args: &CliArgs) -> (Settings, SettingsReport) {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(SETTINGS_PATH));

    let mut report = SettingsReport::default();
    let mut settings = match Settings::load(&path) {
        Ok(settings) => {
            if path.exists() {
                report.source = Some(path);
            }
            settings
        }
        Err(e) => {
            report.problems.push(e.to_string());
            Settings::default()
        }
    };

    settings.apply_cli_overrides(args);
    (settings, report)
}

pub fn log_settings_report(report: Res<SettingsReport>) {
    match &report.source {
        Some(path) => info!("Loaded settings from {}", path.display()),
        None => info!("Using default settings"),
    }

    for problem in &report.problems {
        warn!("{problem}; continuing with defaults");
    }
}
