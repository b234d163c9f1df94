//! Configuration management for the Herald relay

pub mod file;

use std::time::Duration;

use crate::voice::{AudioEncoding, RecognizerConfig, VoiceGender, VoiceSelection};

/// Default port to listen on
const DEFAULT_PORT: u16 = 5000;

/// Default seconds without audio before an open upstream stream is released
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30;

/// Herald relay configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Fixed upstream recognition stream parameters
    pub recognizer: RecognizerConfig,

    /// How long an idle upstream stream stays open before release
    pub stream_idle_timeout: Duration,

    /// Fixed synthesis voice selection
    pub voice: VoiceSelection,

    /// API keys
    pub api_keys: ApiKeys,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Deepgram API key (streaming recognition)
    pub deepgram: Option<String>,

    /// Google Cloud API key (speech synthesis)
    pub google: Option<String>,
}

impl Config {
    /// Load configuration with `env > toml > default` precedence
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();

        let api_keys = ApiKeys {
            deepgram: std::env::var("DEEPGRAM_API_KEY")
                .ok()
                .or(fc.api_keys.deepgram),
            google: std::env::var("GOOGLE_API_KEY").ok().or(fc.api_keys.google),
        };

        let server = ServerConfig {
            port: std::env::var("HERALD_PORT")
                .or_else(|_| std::env::var("PORT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
        };

        let defaults = RecognizerConfig::default();
        let recognizer = RecognizerConfig {
            encoding: std::env::var("HERALD_STT_ENCODING")
                .ok()
                .or(fc.recognizer.encoding)
                .map_or(defaults.encoding, |s| AudioEncoding::parse(&s)),
            sample_rate_hz: std::env::var("HERALD_STT_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.recognizer.sample_rate_hz)
                .unwrap_or(defaults.sample_rate_hz),
            language: std::env::var("HERALD_STT_LANGUAGE")
                .ok()
                .or(fc.recognizer.language)
                .unwrap_or(defaults.language),
            model: std::env::var("HERALD_STT_MODEL")
                .ok()
                .or(fc.recognizer.model)
                .unwrap_or(defaults.model),
            // The relay only forwards finalized transcripts
            interim_results: false,
        };

        let stream_idle_timeout = Duration::from_secs(
            std::env::var("HERALD_STREAM_IDLE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .or(fc.recognizer.idle_timeout_secs)
                .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
        );

        let voice_defaults = VoiceSelection::default();
        let voice = VoiceSelection {
            language: std::env::var("HERALD_TTS_LANGUAGE")
                .ok()
                .or(fc.voice.language)
                .unwrap_or(voice_defaults.language),
            gender: std::env::var("HERALD_TTS_GENDER")
                .ok()
                .or(fc.voice.gender)
                .map_or(voice_defaults.gender, |s| VoiceGender::parse(&s)),
            voice: std::env::var("HERALD_TTS_VOICE").ok().or(fc.voice.name),
        };

        Self {
            server,
            recognizer,
            stream_idle_timeout,
            voice,
            api_keys,
        }
    }
}
