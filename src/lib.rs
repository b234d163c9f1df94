//! Herald - streaming speech relay
//!
//! This library provides the core functionality for the Herald relay:
//! - Live transcription over WebSocket (lazy upstream streams, repeat
//!   suppression)
//! - One-shot speech synthesis over HTTP
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Clients                         │
//! │   WebSocket audio chunks  │  GET /text-to-speech    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Herald Relay                        │
//! │   RelaySession  │  RepeatFilter  │  ApiServer       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Speech providers                       │
//! │   Deepgram (streaming STT)  │  Google (TTS)         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Each WebSocket connection gets its own [`RelaySession`]; nothing is
//! shared between sessions beyond the provider clients themselves.

pub mod api;
pub mod config;
pub mod error;
pub mod relay;
pub mod voice;

pub use api::{ApiServer, ApiState};
pub use config::Config;
pub use error::{Error, Result};
pub use relay::{RelaySession, RepeatFilter, SessionEvent};
pub use voice::{
    AudioEncoding, DeepgramBackend, GoogleSynthesizer, RecognizerConfig, SpeechBackend,
    StreamEvent, StreamHandle, Synthesizer, VoiceGender, VoiceSelection,
};
