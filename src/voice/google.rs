//! Google Cloud text-to-speech synthesizer
//!
//! One-shot REST calls against the `text:synthesize` endpoint. The response
//! carries base64-encoded audio in a JSON envelope; callers get raw bytes.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::tts::{Synthesizer, VoiceSelection};
use crate::{Error, Result};

/// Google Cloud text-to-speech REST endpoint
const SYNTHESIZE_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Output encoding requested from the provider
const AUDIO_ENCODING: &str = "MP3";

#[derive(serde::Serialize)]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceParams<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig<'a>,
}

#[derive(serde::Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceParams<'a> {
    language_code: &'a str,
    ssml_gender: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Synthesizes speech via Google Cloud Text-to-Speech
pub struct GoogleSynthesizer {
    client: reqwest::Client,
    api_key: String,
    voice: VoiceSelection,
}

impl GoogleSynthesizer {
    /// Create a new synthesizer with a fixed voice selection
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, voice: VoiceSelection) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "Google API key required for synthesis".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
        })
    }

    /// Build the one-shot synthesis request
    ///
    /// The API key travels in a header: transport errors format the URL
    /// into logs, so the credential must stay out of the query string.
    fn build_request(&self, text: &str) -> reqwest::RequestBuilder {
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceParams {
                language_code: &self.voice.language,
                ssml_gender: self.voice.gender.wire_name(),
                name: self.voice.voice.as_deref(),
            },
            audio_config: AudioConfig {
                audio_encoding: AUDIO_ENCODING,
            },
        };

        self.client
            .post(SYNTHESIZE_ENDPOINT)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&request)
    }
}

#[async_trait]
impl Synthesizer for GoogleSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(text_len = text.len(), "starting synthesis");

        let response = self.build_request(text).send().await.map_err(|e| {
            tracing::error!(error = %e, "synthesis request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "synthesis API error");
            return Err(Error::Synthesize(format!(
                "synthesis API error {status}: {body}"
            )));
        }

        let result: SynthesizeResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse synthesis response");
            e
        })?;

        let audio = BASE64
            .decode(result.audio_content.as_bytes())
            .map_err(|e| Error::Synthesize(format!("invalid audio payload: {e}")))?;

        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio)
    }
}
