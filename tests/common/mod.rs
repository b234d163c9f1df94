//! Shared test utilities

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use herald_relay::api::ApiState;
use herald_relay::voice::{
    RecognizerConfig, SpeechBackend, StreamEvent, StreamHandle, StreamInput, Synthesizer,
};
use herald_relay::{Error, Result};

/// Recognition backend double
///
/// Records every stream open, keeps each stream's event sender so tests can
/// inject results, and taps each stream's input so tests can observe the
/// chunks and end-of-input signals the relay forwards.
#[derive(Default)]
pub struct ScriptedBackend {
    opens: Mutex<Vec<RecognizerConfig>>,
    event_senders: Mutex<Vec<mpsc::Sender<StreamEvent>>>,
    input_taps: Mutex<Vec<mpsc::Receiver<StreamInput>>>,
}

#[async_trait]
impl SpeechBackend for ScriptedBackend {
    async fn open_stream(
        &self,
        config: &RecognizerConfig,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<StreamHandle> {
        let (tx, rx) = mpsc::channel(32);
        self.opens.lock().unwrap().push(config.clone());
        self.event_senders.lock().unwrap().push(events);
        self.input_taps.lock().unwrap().push(rx);
        Ok(StreamHandle::new(tx))
    }
}

impl ScriptedBackend {
    /// How many streams have been opened so far
    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    /// Configuration the n-th stream was opened with
    pub fn opened_config(&self, index: usize) -> RecognizerConfig {
        self.opens.lock().unwrap()[index].clone()
    }

    /// Event sender for the n-th stream, for injecting upstream results
    pub fn events(&self, index: usize) -> mpsc::Sender<StreamEvent> {
        self.event_senders.lock().unwrap()[index].clone()
    }

    /// Take the input tap for the n-th stream
    pub fn take_input(&self, index: usize) -> mpsc::Receiver<StreamInput> {
        self.input_taps.lock().unwrap().remove(index)
    }

    /// Poll until at least `n` streams have been opened
    pub async fn wait_for_opens(&self, n: usize) {
        for _ in 0..200 {
            if self.open_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("backend never saw {n} stream open(s)");
    }
}

/// Synthesizer double returning a fixed payload, or failing on demand
pub struct ScriptedSynthesizer {
    calls: Mutex<Vec<String>>,
    payload: Vec<u8>,
    fail: bool,
}

impl ScriptedSynthesizer {
    /// A synthesizer that answers every request with `payload`
    #[must_use]
    pub fn returning(payload: &[u8]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            payload: payload.to_vec(),
            fail: false,
        }
    }

    /// A synthesizer whose every request fails
    #[must_use]
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            payload: Vec::new(),
            fail: true,
        }
    }

    /// Texts synthesized so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Synthesize("scripted failure".to_string()));
        }
        Ok(self.payload.clone())
    }
}

/// Build API state around scripted upstream doubles
#[must_use]
pub fn test_state(
    backend: Arc<ScriptedBackend>,
    synthesizer: Arc<ScriptedSynthesizer>,
    idle: Duration,
) -> Arc<ApiState> {
    Arc::new(ApiState {
        recognizer: backend,
        recognizer_config: RecognizerConfig::default(),
        synthesizer,
        stream_idle_timeout: idle,
    })
}

/// Build a test router with all Herald routes
#[must_use]
pub fn build_test_router(state: Arc<ApiState>) -> axum::Router {
    axum::Router::new()
        .merge(herald_relay::api::stream::router(state.clone()))
        .merge(herald_relay::api::speech::router(state))
        .merge(herald_relay::api::health::router())
}
