//! Consecutive-duplicate transcript suppression

/// Suppresses transcripts that repeat the immediately preceding emission
///
/// Suppression is strictly consecutive: a transcript that reappears after a
/// different one in between passes through again. State belongs to a single
/// session; sessions never share a filter.
#[derive(Debug, Default)]
pub struct RepeatFilter {
    last: String,
}

impl RepeatFilter {
    /// Create a filter with no previously emitted transcript
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `transcript` should be emitted.
    ///
    /// Returns `true` and records the transcript when it differs from the
    /// previous emission. Returns `false` for an immediate repeat.
    pub fn admit(&mut self, transcript: &str) -> bool {
        if transcript == self.last {
            return false;
        }

        transcript.clone_into(&mut self.last);
        true
    }
}
