//! Per-connection transcription relay session
//!
//! A session owns at most one live upstream recognition stream and the
//! repeat filter for its client. It is a two-state machine (no stream /
//! stream open) driven by chunk arrival, upstream events, and end-of-input.

mod dedup;

pub use dedup::RepeatFilter;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::Result;
use crate::voice::{RecognizerConfig, SpeechBackend, StreamEvent, StreamHandle};

/// Capacity of each stream's private event channel
const STREAM_EVENT_BUFFER: usize = 32;

/// Upstream event tagged with the stream that produced it
///
/// Streams overlap during a reset: a released stream keeps draining after
/// the session has opened its replacement. The tag tells the session which
/// stream an error or end-of-stream report belongs to, so a late report
/// from a replaced stream cannot reset the live one.
#[derive(Debug)]
pub struct SessionEvent {
    generation: u64,
    event: StreamEvent,
}

/// Relay state for one connected client
///
/// The events channel handed to [`new`](Self::new) is session-scoped: every
/// stream the session opens reports into it, so results already in flight
/// survive a stream reset. The repeat filter likewise outlives individual
/// streams; only a new session starts with a clean slate.
pub struct RelaySession {
    backend: Arc<dyn SpeechBackend>,
    config: RecognizerConfig,
    events_tx: mpsc::Sender<SessionEvent>,
    stream: Option<StreamHandle>,
    generation: u64,
    filter: RepeatFilter,
}

impl RelaySession {
    /// Create a session with no upstream stream open
    #[must_use]
    pub fn new(
        backend: Arc<dyn SpeechBackend>,
        config: RecognizerConfig,
        events_tx: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            backend,
            config,
            events_tx,
            stream: None,
            generation: 0,
            filter: RepeatFilter::new(),
        }
    }

    /// Whether an upstream stream is currently open
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Forward one audio chunk, opening the upstream stream first if needed
    ///
    /// Chunks are delivered in call order. A delivery failure drops the
    /// stale handle so the next chunk opens a fresh stream.
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be opened or the chunk cannot be
    /// delivered. The session stays usable either way.
    pub async fn push_chunk(&mut self, chunk: Bytes) -> Result<()> {
        if self.stream.is_none() {
            let (stream_tx, stream_rx) = mpsc::channel(STREAM_EVENT_BUFFER);
            let handle = self.backend.open_stream(&self.config, stream_tx).await?;
            self.generation += 1;
            self.spawn_event_forwarder(stream_rx);
            self.stream = Some(handle);
        }

        if let Some(stream) = &self.stream
            && let Err(e) = stream.send(chunk).await
        {
            self.stream = None;
            return Err(e);
        }

        Ok(())
    }

    /// Forward one stream's events into the session channel, tagged with the
    /// generation the stream was opened under
    fn spawn_event_forwarder(&self, mut stream_rx: mpsc::Receiver<StreamEvent>) {
        let generation = self.generation;
        let session_tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = stream_rx.recv().await {
                let tagged = SessionEvent { generation, event };
                if session_tx.send(tagged).await.is_err() {
                    break;
                }
            }
        });
    }

    /// Apply one upstream event, returning a transcript to emit if any
    ///
    /// Final results are trimmed and passed through the repeat filter;
    /// interim results and results without alternatives are discarded.
    /// An error or end-of-stream report from the current stream clears the
    /// open handle so the next chunk re-opens; the same report from an
    /// already-replaced stream is ignored. The filter state is kept either
    /// way.
    pub fn apply_event(&mut self, event: SessionEvent) -> Option<String> {
        let SessionEvent { generation, event } = event;
        match event {
            StreamEvent::Result(result) => {
                if !result.is_final {
                    return None;
                }
                let transcript = result.top_transcript()?.trim().to_string();
                self.filter.admit(&transcript).then_some(transcript)
            }
            StreamEvent::Error(e) => {
                if generation == self.generation {
                    tracing::warn!(error = %e, "recognition stream failed, will re-open on next chunk");
                    self.stream = None;
                } else {
                    tracing::debug!(error = %e, "superseded recognition stream failed");
                }
                None
            }
            StreamEvent::Closed => {
                if generation == self.generation {
                    tracing::debug!("recognition stream ended");
                    self.stream = None;
                } else {
                    tracing::debug!("superseded recognition stream ended");
                }
                None
            }
        }
    }

    /// Signal end-of-input on the open stream, if any, and release it
    pub async fn finish_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.finish().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{StreamInput, TranscriptAlternative, TranscriptResult};
    use std::sync::Mutex;

    /// Backend double that records opens and taps each stream's channels
    #[derive(Default)]
    struct FakeBackend {
        opens: Mutex<Vec<RecognizerConfig>>,
        taps: Mutex<Vec<mpsc::Receiver<StreamInput>>>,
        events: Mutex<Vec<mpsc::Sender<StreamEvent>>>,
    }

    #[async_trait::async_trait]
    impl SpeechBackend for FakeBackend {
        async fn open_stream(
            &self,
            config: &RecognizerConfig,
            events: mpsc::Sender<StreamEvent>,
        ) -> Result<StreamHandle> {
            let (tx, rx) = mpsc::channel(32);
            self.opens.lock().unwrap().push(config.clone());
            self.taps.lock().unwrap().push(rx);
            self.events.lock().unwrap().push(events);
            Ok(StreamHandle::new(tx))
        }
    }

    impl FakeBackend {
        fn open_count(&self) -> usize {
            self.opens.lock().unwrap().len()
        }

        fn take_tap(&self, index: usize) -> mpsc::Receiver<StreamInput> {
            self.taps.lock().unwrap().remove(index)
        }

        fn events_for(&self, index: usize) -> mpsc::Sender<StreamEvent> {
            self.events.lock().unwrap()[index].clone()
        }
    }

    fn new_session(backend: &Arc<FakeBackend>) -> RelaySession {
        let (events_tx, _events_rx) = mpsc::channel(8);
        RelaySession::new(backend.clone(), RecognizerConfig::default(), events_tx)
    }

    fn new_session_with_events(
        backend: &Arc<FakeBackend>,
    ) -> (RelaySession, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(8);
        let session = RelaySession::new(backend.clone(), RecognizerConfig::default(), events_tx);
        (session, events_rx)
    }

    /// Apply an event as if it came from the currently open stream
    fn apply(session: &mut RelaySession, event: StreamEvent) -> Option<String> {
        let generation = session.generation;
        session.apply_event(SessionEvent { generation, event })
    }

    fn final_result(text: &str) -> StreamEvent {
        StreamEvent::Result(TranscriptResult {
            is_final: true,
            alternatives: vec![TranscriptAlternative {
                transcript: text.to_string(),
                confidence: Some(0.9),
            }],
        })
    }

    #[tokio::test]
    async fn no_stream_opens_before_first_chunk() {
        let backend = Arc::new(FakeBackend::default());
        let session = new_session(&backend);
        assert!(!session.is_open());
        assert_eq!(backend.open_count(), 0);
    }

    #[tokio::test]
    async fn first_chunk_opens_exactly_one_stream() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        session.push_chunk(Bytes::from_static(b"a")).await.unwrap();
        session.push_chunk(Bytes::from_static(b"b")).await.unwrap();

        assert!(session.is_open());
        assert_eq!(backend.open_count(), 1);
    }

    #[tokio::test]
    async fn chunks_arrive_upstream_in_order() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        for chunk in [&b"a"[..], b"b", b"c"] {
            session
                .push_chunk(Bytes::copy_from_slice(chunk))
                .await
                .unwrap();
        }

        let mut tap = backend.take_tap(0);
        for expected in [&b"a"[..], b"b", b"c"] {
            match tap.try_recv() {
                Ok(StreamInput::Audio(got)) => assert_eq!(got.as_ref(), expected),
                other => panic!("expected audio chunk, got {other:?}"),
            }
        }
        assert!(tap.try_recv().is_err());
    }

    #[tokio::test]
    async fn error_event_resets_stream_and_next_chunk_reopens() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        session.push_chunk(Bytes::from_static(b"a")).await.unwrap();
        assert_eq!(backend.open_count(), 1);

        let emitted = apply(
            &mut session,
            StreamEvent::Error(crate::Error::Recognize("boom".to_string())),
        );
        assert!(emitted.is_none());
        assert!(!session.is_open());

        session.push_chunk(Bytes::from_static(b"b")).await.unwrap();
        assert_eq!(backend.open_count(), 2);

        // Both streams were configured with the same fixed parameters
        let opens = backend.opens.lock().unwrap();
        assert_eq!(opens[0].model, opens[1].model);
        assert_eq!(opens[0].language, opens[1].language);
        assert_eq!(opens[0].sample_rate_hz, opens[1].sample_rate_hz);
    }

    #[tokio::test]
    async fn end_of_stream_resets_without_error() {
        let backend = Arc::new(FakeBackend::default());
        let (mut session, mut events_rx) = new_session_with_events(&backend);

        session.push_chunk(Bytes::from_static(b"a")).await.unwrap();
        backend.events_for(0).send(StreamEvent::Closed).await.unwrap();

        let event = events_rx.recv().await.unwrap();
        assert!(session.apply_event(event).is_none());
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn stale_end_of_stream_leaves_replacement_open() {
        let backend = Arc::new(FakeBackend::default());
        let (mut session, mut events_rx) = new_session_with_events(&backend);

        session.push_chunk(Bytes::from_static(b"a")).await.unwrap();
        session.finish_stream().await;
        session.push_chunk(Bytes::from_static(b"b")).await.unwrap();
        assert_eq!(backend.open_count(), 2);

        // The released stream finishes draining only after the replacement
        // opened; its end report concerns the old stream, not the new one
        backend.events_for(0).send(StreamEvent::Closed).await.unwrap();
        let event = events_rx.recv().await.unwrap();
        assert!(session.apply_event(event).is_none());
        assert!(session.is_open());

        session.push_chunk(Bytes::from_static(b"c")).await.unwrap();
        assert_eq!(backend.open_count(), 2);
    }

    #[tokio::test]
    async fn stale_error_leaves_replacement_open() {
        let backend = Arc::new(FakeBackend::default());
        let (mut session, mut events_rx) = new_session_with_events(&backend);

        session.push_chunk(Bytes::from_static(b"a")).await.unwrap();
        apply(
            &mut session,
            StreamEvent::Error(crate::Error::Recognize("boom".to_string())),
        );
        session.push_chunk(Bytes::from_static(b"b")).await.unwrap();
        assert_eq!(backend.open_count(), 2);

        backend
            .events_for(0)
            .send(StreamEvent::Error(crate::Error::Recognize(
                "late boom".to_string(),
            )))
            .await
            .unwrap();
        let event = events_rx.recv().await.unwrap();
        assert!(session.apply_event(event).is_none());
        assert!(session.is_open());
    }

    #[tokio::test]
    async fn delivery_failure_drops_handle() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        session.push_chunk(Bytes::from_static(b"a")).await.unwrap();
        drop(backend.take_tap(0));

        assert!(session.push_chunk(Bytes::from_static(b"b")).await.is_err());
        assert!(!session.is_open());

        session.push_chunk(Bytes::from_static(b"c")).await.unwrap();
        assert_eq!(backend.open_count(), 2);
    }

    #[tokio::test]
    async fn consecutive_duplicate_is_suppressed() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        assert_eq!(
            apply(&mut session, final_result("hello")),
            Some("hello".to_string())
        );
        assert_eq!(apply(&mut session, final_result("hello")), None);
    }

    #[tokio::test]
    async fn distinct_sequence_passes_through() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        let emitted: Vec<String> = ["hello", "hello", "world", "world", "hello"]
            .into_iter()
            .filter_map(|t| apply(&mut session, final_result(t)))
            .collect();

        assert_eq!(emitted, vec!["hello", "world", "hello"]);
    }

    #[tokio::test]
    async fn transcripts_are_trimmed_before_comparison() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        assert_eq!(
            apply(&mut session, final_result("  hello  ")),
            Some("hello".to_string())
        );
        assert_eq!(apply(&mut session, final_result("hello")), None);
    }

    #[tokio::test]
    async fn interim_results_are_ignored() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        let interim = StreamEvent::Result(TranscriptResult {
            is_final: false,
            alternatives: vec![TranscriptAlternative {
                transcript: "hel".to_string(),
                confidence: None,
            }],
        });
        assert!(apply(&mut session, interim).is_none());

        // An interim must not poison the filter either
        assert_eq!(
            apply(&mut session, final_result("hel")),
            Some("hel".to_string())
        );
    }

    #[tokio::test]
    async fn results_without_alternatives_are_ignored() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        let empty = StreamEvent::Result(TranscriptResult {
            is_final: true,
            alternatives: vec![],
        });
        assert!(apply(&mut session, empty).is_none());
    }

    #[tokio::test]
    async fn filter_survives_stream_reset() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        session.push_chunk(Bytes::from_static(b"a")).await.unwrap();
        assert_eq!(
            apply(&mut session, final_result("hello")),
            Some("hello".to_string())
        );

        apply(
            &mut session,
            StreamEvent::Error(crate::Error::Recognize("mid-stream failure".to_string())),
        );
        session.push_chunk(Bytes::from_static(b"b")).await.unwrap();

        // Same transcript from the new stream is still an immediate repeat
        assert_eq!(apply(&mut session, final_result("hello")), None);
    }

    #[tokio::test]
    async fn late_result_after_reset_is_still_emitted() {
        let backend = Arc::new(FakeBackend::default());
        let (mut session, mut events_rx) = new_session_with_events(&backend);

        session.push_chunk(Bytes::from_static(b"a")).await.unwrap();
        session.finish_stream().await;
        session.push_chunk(Bytes::from_static(b"b")).await.unwrap();

        // A final drained from the released stream after its replacement
        // opened still reaches the client
        backend
            .events_for(0)
            .send(final_result("straggler"))
            .await
            .unwrap();
        let event = events_rx.recv().await.unwrap();
        assert_eq!(session.apply_event(event), Some("straggler".to_string()));
        assert!(session.is_open());
    }

    #[tokio::test]
    async fn finish_signals_end_of_input() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);

        session.push_chunk(Bytes::from_static(b"a")).await.unwrap();
        session.finish_stream().await;
        assert!(!session.is_open());

        let mut tap = backend.take_tap(0);
        assert!(matches!(tap.try_recv(), Ok(StreamInput::Audio(_))));
        assert!(matches!(tap.try_recv(), Ok(StreamInput::Finish)));
    }

    #[tokio::test]
    async fn finish_without_open_stream_is_a_no_op() {
        let backend = Arc::new(FakeBackend::default());
        let mut session = new_session(&backend);
        session.finish_stream().await;
        assert_eq!(backend.open_count(), 0);
    }

    #[tokio::test]
    async fn sessions_do_not_share_filter_state() {
        let backend = Arc::new(FakeBackend::default());
        let mut first = new_session(&backend);
        let mut second = new_session(&backend);

        assert_eq!(
            apply(&mut first, final_result("hello")),
            Some("hello".to_string())
        );
        assert_eq!(
            apply(&mut second, final_result("hello")),
            Some("hello".to_string())
        );
    }
}
