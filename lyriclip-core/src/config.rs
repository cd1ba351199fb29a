use crate::error::{CoreError, Result};
use crate::orchestrator::StageTimeouts;
use crate::request::{parse_color, RenderOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Generations allowed to run at the same time
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

const fn default_max_concurrent_jobs() -> usize {
    2
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "crate::paths::output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "crate::paths::temp_dir")]
    pub temp_dir: PathBuf,
    #[serde(default = "crate::paths::history_db_path")]
    pub history_db: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: crate::paths::output_dir(),
            temp_dir: crate::paths::temp_dir(),
            history_db: crate::paths::history_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    #[serde(default = "default_lyrics_api_url")]
    pub api_url: String,
    /// Per-request HTTP timeout
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    /// Retries for transient HTTP failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_lyrics_api_url() -> String {
    "https://lrclib.net/api".to_string()
}

const fn default_http_timeout() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    3
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            api_url: default_lyrics_api_url(),
            timeout_secs: default_http_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_yt_dlp")]
    pub yt_dlp: String,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
}

fn default_yt_dlp() -> String {
    "yt-dlp".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: default_yt_dlp(),
            ffmpeg: default_ffmpeg(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_lyrics_timeout")]
    pub lyrics_secs: u64,
    #[serde(default = "default_download_timeout")]
    pub download_secs: u64,
    #[serde(default = "default_trim_timeout")]
    pub trim_secs: u64,
    #[serde(default = "default_render_timeout")]
    pub render_secs: u64,
}

const fn default_lyrics_timeout() -> u64 {
    60
}

const fn default_download_timeout() -> u64 {
    300
}

const fn default_trim_timeout() -> u64 {
    120
}

const fn default_render_timeout() -> u64 {
    600
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            lyrics_secs: default_lyrics_timeout(),
            download_secs: default_download_timeout(),
            trim_secs: default_trim_timeout(),
            render_secs: default_render_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Default maximum font size when a request does not set one
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_intensity")]
    pub intensity: u32,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_frame_size")]
    pub width: u32,
    #[serde(default = "default_frame_size")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Font file for the lyric text; ffmpeg's default font when unset
    #[serde(default)]
    pub font_file: Option<PathBuf>,
}

const fn default_font_size() -> u32 {
    400
}

fn default_background_color() -> String {
    "#FFFFFF".to_string()
}

const fn default_intensity() -> u32 {
    1
}

fn default_text_color() -> String {
    "#000000".to_string()
}

const fn default_frame_size() -> u32 {
    1080
}

const fn default_fps() -> u32 {
    30
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            background_color: default_background_color(),
            intensity: default_intensity(),
            text_color: default_text_color(),
            width: default_frame_size(),
            height: default_frame_size(),
            fps: default_fps(),
            font_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to ~/.config/lyriclip/lyriclip.log
    #[serde(default)]
    pub enabled: bool,
}

impl Config {
    /// Get the config file path (~/.config/lyriclip/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing a template on first
    /// run, or an error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            // Write template config
            fs::write(&config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound { path: config_path });
        }

        Self::load(&config_path)
    }

    /// Load and validate config from a specific file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate config from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is invalid.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check on its own
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(CoreError::ConfigInvalid { message });

        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return invalid(format!(
                "server.bind_address {:?} is not a socket address",
                self.server.bind_address
            ));
        }
        if self.server.max_concurrent_jobs == 0 {
            return invalid("server.max_concurrent_jobs must be at least 1".into());
        }
        for (field, color) in [
            ("render.background_color", &self.render.background_color),
            ("render.text_color", &self.render.text_color),
        ] {
            if parse_color(color).is_none() {
                return invalid(format!("{field} {color:?} is not a hex color"));
            }
        }
        if self.render.font_size == 0 || self.render.intensity == 0 || self.render.fps == 0 {
            return invalid("render.font_size, render.intensity and render.fps must be positive".into());
        }
        if self.render.width == 0 || self.render.height == 0 {
            return invalid("render.width and render.height must be positive".into());
        }
        Ok(())
    }

    /// Render options applied when a request leaves them unset
    #[must_use]
    pub fn render_defaults(&self) -> RenderOptions {
        RenderOptions {
            font_size: self.render.font_size,
            background_color: self.render.background_color.clone(),
            intensity: self.render.intensity,
        }
    }

    #[must_use]
    pub const fn stage_timeouts(&self) -> StageTimeouts {
        StageTimeouts {
            lyrics: Duration::from_secs(self.timeouts.lyrics_secs),
            download: Duration::from_secs(self.timeouts.download_secs),
            trim: Duration::from_secs(self.timeouts.trim_secs),
            render: Duration::from_secs(self.timeouts.render_secs),
        }
    }
}

const CONFIG_TEMPLATE: &str = r##"# lyriclip configuration
# ~/.config/lyriclip/config.toml

[server]
bind_address = "0.0.0.0:8000"
# Generations allowed to run at the same time; further requests wait
max_concurrent_jobs = 2

[storage]
# Defaults: ~/.config/lyriclip/generated_files, <system temp>/lyriclip,
# ~/.config/lyriclip/generations.db
# output_dir = ""
# temp_dir = ""
# history_db = ""

[lyrics]
api_url = "https://lrclib.net/api"
timeout_secs = 10
max_retries = 3

[tools]
yt_dlp = "yt-dlp"
ffmpeg = "ffmpeg"

[timeouts]
# A stage that exceeds its timeout fails the generation
lyrics_secs = 60
download_secs = 300
trim_secs = 120
render_secs = 600

[render]
# Used when a request does not set fontsize / bgcolor / lofi
font_size = 400
background_color = "#FFFFFF"
intensity = 1
text_color = "#000000"
width = 1080
height = 1080
fps = 30
# font_file = "/usr/share/fonts/TTF/Arial.ttf"

[logging]
# Also write logs to ~/.config/lyriclip/lyriclip.log
enabled = false
"##;
