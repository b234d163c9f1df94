//! Speech synthesis types and synthesizer seam

use async_trait::async_trait;

use crate::Result;

/// Speaker gender preference for synthesized speech
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceGender {
    Neutral,
    Female,
    Male,
}

impl VoiceGender {
    /// Parse a gender name from configuration, defaulting to neutral
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "female" => Self::Female,
            "male" => Self::Male,
            _ => Self::Neutral,
        }
    }

    /// Provider wire name
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Neutral => "NEUTRAL",
            Self::Female => "FEMALE",
            Self::Male => "MALE",
        }
    }
}

/// Fixed voice selection used for every synthesis request
#[derive(Clone, Debug)]
pub struct VoiceSelection {
    /// BCP-47 language code, e.g. `en-US`
    pub language: String,
    /// Preferred speaker gender
    pub gender: VoiceGender,
    /// Named voice override; the provider picks one when absent
    pub voice: Option<String>,
}

impl Default for VoiceSelection {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            gender: VoiceGender::Neutral,
            voice: None,
        }
    }
}

/// Upstream one-shot speech synthesizer
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize text once with the fixed voice selection
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if the upstream synthesis call fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}
