//! Deepgram live transcription backend
//!
//! Speaks the Deepgram realtime WebSocket protocol: stream configuration is
//! carried as query parameters, audio goes up as binary frames, results come
//! back as JSON text frames, and a `CloseStream` control message signals
//! end-of-input.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::stt::{
    RecognizerConfig, SpeechBackend, StreamEvent, StreamHandle, StreamInput, TranscriptAlternative,
    TranscriptResult,
};
use crate::{Error, Result};

/// Deepgram realtime transcription endpoint
const LIVE_ENDPOINT: &str = "wss://api.deepgram.com/v1/listen";

/// Control message that tells the upstream no more audio is coming
const CLOSE_STREAM: &str = r#"{"type":"CloseStream"}"#;

/// Capacity of the per-stream audio input channel
const INPUT_BUFFER: usize = 32;

/// How long to wait for the upstream to close after end-of-input
const DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Live message from Deepgram; only transcription results are relayed
#[derive(serde::Deserialize)]
#[serde(tag = "type")]
enum LiveMessage {
    Results(LiveResults),
    #[serde(other)]
    Other,
}

#[derive(serde::Deserialize)]
struct LiveResults {
    #[serde(default)]
    is_final: bool,
    channel: LiveChannel,
}

#[derive(serde::Deserialize)]
struct LiveChannel {
    alternatives: Vec<LiveAlternative>,
}

#[derive(serde::Deserialize)]
struct LiveAlternative {
    transcript: String,
    confidence: Option<f32>,
}

/// Streams audio to Deepgram's live transcription API
pub struct DeepgramBackend {
    api_key: String,
}

impl DeepgramBackend {
    /// Create a new live transcription backend
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        Ok(Self { api_key })
    }
}

/// Build the live endpoint URL carrying the fixed stream parameters
fn stream_url(endpoint: &str, config: &RecognizerConfig) -> String {
    let mut url = format!(
        "{}?model={}&language={}&interim_results={}",
        endpoint,
        urlencoding::encode(&config.model),
        urlencoding::encode(&config.language),
        config.interim_results,
    );

    // Container formats are self-describing; only raw encodings need
    // explicit codec and sample rate parameters.
    if let Some(name) = config.encoding.raw_wire_name() {
        url.push_str(&format!(
            "&encoding={name}&sample_rate={}",
            config.sample_rate_hz
        ));
    }

    url
}

/// Parse one live text frame, keeping only transcription results
fn parse_results(raw: &str) -> Option<TranscriptResult> {
    match serde_json::from_str::<LiveMessage>(raw) {
        Ok(LiveMessage::Results(results)) => Some(TranscriptResult {
            is_final: results.is_final,
            alternatives: results
                .channel
                .alternatives
                .into_iter()
                .map(|a| TranscriptAlternative {
                    transcript: a.transcript,
                    confidence: a.confidence,
                })
                .collect(),
        }),
        Ok(LiveMessage::Other) => None,
        Err(e) => {
            tracing::debug!(error = %e, "unrecognized live message");
            None
        }
    }
}

#[async_trait]
impl SpeechBackend for DeepgramBackend {
    async fn open_stream(
        &self,
        config: &RecognizerConfig,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<StreamHandle> {
        let url = stream_url(LIVE_ENDPOINT, config);

        let mut request = url.into_client_request()?;
        let auth = HeaderValue::from_str(&format!("Token {}", self.api_key))
            .map_err(|e| Error::Config(format!("invalid Deepgram API key: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let (socket, _response) = connect_async(request).await.map_err(|e| {
            tracing::error!(error = %e, "Deepgram connect failed");
            Error::from(e)
        })?;

        tracing::debug!(
            model = %config.model,
            language = %config.language,
            encoding = %config.encoding,
            "recognition stream opened"
        );

        let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);
        tokio::spawn(run_stream(socket, input_rx, events));

        Ok(StreamHandle::new(input_tx))
    }
}

/// Drive one live stream until it ends
///
/// Forwards audio in arrival order and surfaces upstream frames as events.
/// End-of-input (explicit finish or a dropped handle) sends `CloseStream`,
/// then drains remaining results; the drain is capped so a wedged upstream
/// cannot leak the task.
async fn run_stream(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut input: mpsc::Receiver<StreamInput>,
    events: mpsc::Sender<StreamEvent>,
) {
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            cmd = input.recv() => match cmd {
                Some(StreamInput::Audio(chunk)) => {
                    if let Err(e) = sink.send(Message::Binary(chunk)).await {
                        tracing::warn!(error = %e, "audio forward failed");
                        let _ = events.send(StreamEvent::Error(e.into())).await;
                        return;
                    }
                }
                Some(StreamInput::Finish) | None => {
                    if sink.send(Message::Text(CLOSE_STREAM.into())).await.is_err() {
                        let _ = events.send(StreamEvent::Closed).await;
                        return;
                    }
                    break;
                }
            },
            frame = source.next() => {
                if !handle_frame(frame, &events).await {
                    return;
                }
            }
        }
    }

    // Results for audio already in flight arrive between CloseStream and
    // the upstream close frame.
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        loop {
            let frame = source.next().await;
            if !handle_frame(frame, &events).await {
                return;
            }
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!("upstream did not close after end-of-input");
        let _ = events.send(StreamEvent::Closed).await;
    }
}

/// Process one upstream frame; returns `false` once the stream is finished
async fn handle_frame(
    frame: Option<std::result::Result<Message, tungstenite::Error>>,
    events: &mpsc::Sender<StreamEvent>,
) -> bool {
    match frame {
        Some(Ok(Message::Text(raw))) => {
            if let Some(result) = parse_results(raw.as_str()) {
                let _ = events.send(StreamEvent::Result(result)).await;
            }
            true
        }
        Some(Ok(Message::Close(_))) | None => {
            let _ = events.send(StreamEvent::Closed).await;
            false
        }
        // Binary, ping, and pong frames carry nothing the relay needs
        Some(Ok(_)) => true,
        Some(Err(e)) => {
            let _ = events.send(StreamEvent::Error(e.into())).await;
            false
        }
    }
}
