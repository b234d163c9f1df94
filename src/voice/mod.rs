//! Upstream speech service clients
//!
//! Streaming recognition and one-shot synthesis, consumed as black boxes
//! behind small trait seams so sessions and endpoints can be exercised
//! without the network.

mod deepgram;
mod google;
mod stt;
mod tts;

pub use deepgram::DeepgramBackend;
pub use google::GoogleSynthesizer;
pub use stt::{
    AudioEncoding, RecognizerConfig, SpeechBackend, StreamEvent, StreamHandle, StreamInput,
    TranscriptAlternative, TranscriptResult,
};
pub use tts::{Synthesizer, VoiceGender, VoiceSelection};
