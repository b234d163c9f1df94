//! TOML configuration file loading
//!
//! Supports `~/.config/herald/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct HeraldConfigFile {
    /// Server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Recognition stream configuration
    #[serde(default)]
    pub recognizer: RecognizerFileConfig,

    /// Synthesis voice configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for the upstream speech services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Server configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Port to listen on
    pub port: Option<u16>,
}

/// Recognition stream configuration
#[derive(Debug, Default, Deserialize)]
pub struct RecognizerFileConfig {
    /// Audio encoding of client chunks ("webm-opus" or "linear16")
    pub encoding: Option<String>,

    /// Sample rate of client audio in hertz
    pub sample_rate_hz: Option<u32>,

    /// BCP-47 language code (e.g. "en-US")
    pub language: Option<String>,

    /// Recognition model name
    pub model: Option<String>,

    /// Seconds without audio before an open upstream stream is released
    pub idle_timeout_secs: Option<u64>,
}

/// Synthesis voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// BCP-47 language code (e.g. "en-US")
    pub language: Option<String>,

    /// Speaker gender ("neutral", "female", "male")
    pub gender: Option<String>,

    /// Named voice override (e.g. "en-US-Wavenet-D")
    pub name: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub deepgram: Option<String>,
    pub google: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `HeraldConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> HeraldConfigFile {
    let Some(path) = config_file_path() else {
        return HeraldConfigFile::default();
    };

    if !path.exists() {
        return HeraldConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                HeraldConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            HeraldConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/herald/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("herald").join("config.toml"))
}
