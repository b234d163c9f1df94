//! Streaming speech recognition types and backend seam

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{Error, Result};

/// Audio encoding of inbound client chunks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioEncoding {
    /// Opus frames in a WebM container (what browser media recorders produce)
    WebmOpus,
    /// Raw signed 16-bit little-endian PCM
    Linear16,
}

impl AudioEncoding {
    /// Parse an encoding name from configuration, defaulting to WebM/Opus
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "linear16" | "pcm" => Self::Linear16,
            _ => Self::WebmOpus,
        }
    }

    /// Provider wire name for raw encodings
    ///
    /// Container formats are self-describing and return `None`: the provider
    /// reads codec and sample rate from the container itself.
    #[must_use]
    pub const fn raw_wire_name(self) -> Option<&'static str> {
        match self {
            Self::WebmOpus => None,
            Self::Linear16 => Some("linear16"),
        }
    }
}

impl std::fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WebmOpus => write!(f, "webm-opus"),
            Self::Linear16 => write!(f, "linear16"),
        }
    }
}

/// Fixed configuration for one upstream recognition stream
///
/// Every stream a session opens uses the same configuration; nothing here
/// changes mid-connection.
#[derive(Clone, Debug)]
pub struct RecognizerConfig {
    /// Encoding of the audio chunks the client sends
    pub encoding: AudioEncoding,
    /// Sample rate of the client audio in hertz
    pub sample_rate_hz: u32,
    /// BCP-47 language code, e.g. `en-US`
    pub language: String,
    /// Provider recognition model name
    pub model: String,
    /// Whether the upstream should emit non-final results
    pub interim_results: bool,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            encoding: AudioEncoding::WebmOpus,
            sample_rate_hz: 16_000,
            language: "en-US".to_string(),
            model: "nova-2".to_string(),
            interim_results: false,
        }
    }
}

/// One ranked hypothesis within a recognition result
#[derive(Clone, Debug)]
pub struct TranscriptAlternative {
    /// Recognized text
    pub transcript: String,
    /// Provider confidence, when reported
    pub confidence: Option<f32>,
}

/// A single recognition result from the upstream recognizer
#[derive(Clone, Debug)]
pub struct TranscriptResult {
    /// Whether the result is finalized (the relay acts only on finals)
    pub is_final: bool,
    /// Hypotheses ranked best-first; may be empty
    pub alternatives: Vec<TranscriptAlternative>,
}

impl TranscriptResult {
    /// Top-ranked transcript, if the result carries any alternatives
    #[must_use]
    pub fn top_transcript(&self) -> Option<&str> {
        self.alternatives.first().map(|a| a.transcript.as_str())
    }
}

/// Events emitted by an open recognition stream
#[derive(Debug)]
pub enum StreamEvent {
    /// A recognition result, interim or final
    Result(TranscriptResult),
    /// The stream failed; the handle that produced this is no longer usable
    Error(Error),
    /// The upstream ended the stream normally
    Closed,
}

/// Input accepted by a live recognition stream task
#[derive(Debug)]
pub enum StreamInput {
    /// One chunk of client audio, forwarded verbatim
    Audio(Bytes),
    /// No more input; the upstream should finalize pending audio and wind down
    Finish,
}

/// Handle to one open upstream recognition stream
///
/// Dropping the handle closes the stream's input and lets the backend wind
/// the stream down; [`finish`](Self::finish) does the same but makes the
/// end-of-input explicit.
#[derive(Debug)]
pub struct StreamHandle {
    input: mpsc::Sender<StreamInput>,
}

impl StreamHandle {
    /// Wrap the input channel of a spawned stream task
    #[must_use]
    pub fn new(input: mpsc::Sender<StreamInput>) -> Self {
        Self { input }
    }

    /// Forward one audio chunk to the stream
    ///
    /// Chunks are delivered in call order. Awaiting channel capacity is the
    /// backpressure point for a slow upstream.
    ///
    /// # Errors
    ///
    /// Returns error if the stream task has already terminated
    pub async fn send(&self, chunk: Bytes) -> Result<()> {
        self.input
            .send(StreamInput::Audio(chunk))
            .await
            .map_err(|_| Error::Recognize("recognition stream closed".to_string()))
    }

    /// Signal end-of-input and release the stream
    ///
    /// Best-effort: a stream task that already terminated has nothing left
    /// to finish.
    pub async fn finish(self) {
        let _ = self.input.send(StreamInput::Finish).await;
    }
}

/// Upstream streaming speech recognizer
///
/// Implementations open one live stream per call. Results, errors, and
/// end-of-stream notifications arrive on the provided events channel; the
/// caller keeps the receiving half.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Open a recognition stream with the fixed session configuration
    ///
    /// # Errors
    ///
    /// Returns error if the upstream connection cannot be established
    async fn open_stream(
        &self,
        config: &RecognizerConfig,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<StreamHandle>;
}
