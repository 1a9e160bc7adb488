//! The photo-processing state machine.
//!
//! A [`Session`] walks one portrait through the studio:
//!
//! ```text
//!            capture              select era              ok
//!  camera ───────────▶ selecting ───────────▶ processing ─────▶ complete
//!    ▲                  │   ▲                     │                │
//!    │      retake      │   │ retry               │ err            │ show history
//!    ├──────────────────┘   └──────── error ◀─────┘                ▼
//!    │                                                          complete
//!    └──────────────────────── reset (from anywhere) ─────────────────
//! ```
//!
//! The phase and the data it needs travel together: `processing` cannot exist
//! without a portrait and an era, `complete` without a result, `error`
//! without a message and the retry context.
//!
//! ## One request in flight
//!
//! [`Session::select_era`] holds `&mut self` across the client call, so no
//! second selection can even be expressed until the first resolves. Callers
//! that drive the call themselves use [`Session::begin_generation`] and
//! [`Session::finish_generation`]; `begin_generation` is rejected outside
//! `selecting`, which includes `processing`.
//!
//! ## Failures
//!
//! Client errors are caught here and turned into a single user-facing
//! message. There is no automatic retry: [`Session::retry`] returns to
//! `selecting` so the user can resubmit or pick another era.

use crate::capture::ImagePayload;
use crate::era::Era;
use crate::generation::{GenerationClient, GenerationError};
use serde::Serialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Description used when a failure carries no message of its own.
const UNKNOWN_CAUSE: &str = "Unknown";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {event} while {phase}")]
    InvalidTransition { event: &'static str, phase: Phase },
    #[error("no history entry {index} (history has {len})")]
    HistoryIndex { index: usize, len: usize },
}

/// Where the session is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Camera,
    Selecting,
    Processing,
    Complete,
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Camera => "camera",
            Phase::Selecting => "selecting",
            Phase::Processing => "processing",
            Phase::Complete => "complete",
            Phase::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated plate. Never mutated once created.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub image: ImagePayload,
    pub era: Era,
    pub timestamp: SystemTime,
    /// The prompt exactly as it was sent.
    pub original_prompt: String,
}

impl GenerationResult {
    /// Milliseconds since the Unix epoch, 0 for pre-epoch clocks.
    pub fn unix_millis(&self) -> u64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// The payload of one generation call. Exists only while the call runs.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub source: ImagePayload,
    pub prompt: String,
}

#[derive(Debug, Clone)]
enum State {
    Camera,
    Selecting {
        source: ImagePayload,
        /// Era of the failed attempt when arriving here through `retry`.
        last_era: Option<Era>,
    },
    Processing {
        source: ImagePayload,
        era: Era,
        prompt: String,
    },
    Complete {
        source: ImagePayload,
        result: GenerationResult,
    },
    Error {
        source: ImagePayload,
        era: Era,
        message: String,
    },
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Camera => Phase::Camera,
            State::Selecting { .. } => Phase::Selecting,
            State::Processing { .. } => Phase::Processing,
            State::Complete { .. } => Phase::Complete,
            State::Error { .. } => Phase::Error,
        }
    }
}

/// One user's workflow, from capture through result. Memory only.
#[derive(Debug, Clone)]
pub struct Session {
    state: State,
    /// Most recent first.
    history: Vec<GenerationResult>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the prompt to send for an era selection.
///
/// A non-blank `custom_prompt` wins and is used verbatim. Otherwise the era's
/// template is used, except for the custom era which has none: that returns
/// `None`, meaning "nothing to submit".
pub fn resolve_prompt(era: &Era, custom_prompt: Option<&str>) -> Option<String> {
    match custom_prompt.filter(|p| !p.trim().is_empty()) {
        Some(text) => Some(text.to_string()),
        None if era.is_custom() => None,
        None => Some(era.prompt.to_string()),
    }
}

/// User-facing message for a failed generation.
pub fn failure_message(error: &GenerationError) -> String {
    let cause = error.to_string();
    let cause = if cause.trim().is_empty() {
        UNKNOWN_CAUSE
    } else {
        cause.as_str()
    };
    format!("The chronometer has jammed! (Error: {cause})")
}

impl Session {
    /// A fresh session, waiting in `camera`.
    pub fn new() -> Self {
        Self {
            state: State::Camera,
            history: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The captured portrait, if any.
    pub fn source(&self) -> Option<&ImagePayload> {
        match &self.state {
            State::Camera => None,
            State::Selecting { source, .. }
            | State::Processing { source, .. }
            | State::Complete { source, .. }
            | State::Error { source, .. } => Some(source),
        }
    }

    /// The era of the current (or most recent) attempt.
    pub fn selected_era(&self) -> Option<&Era> {
        match &self.state {
            State::Camera => None,
            State::Selecting { last_era, .. } => last_era.as_ref(),
            State::Processing { era, .. } | State::Error { era, .. } => Some(era),
            State::Complete { result, .. } => Some(&result.era),
        }
    }

    /// The prompt being generated, while `processing`.
    pub fn pending_prompt(&self) -> Option<&str> {
        match &self.state {
            State::Processing { prompt, .. } => Some(prompt),
            _ => None,
        }
    }

    /// The result on display, while `complete`.
    pub fn result(&self) -> Option<&GenerationResult> {
        match &self.state {
            State::Complete { result, .. } => Some(result),
            _ => None,
        }
    }

    /// The failure message, while in `error`.
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            State::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Every plate generated this session, most recent first.
    pub fn history(&self) -> &[GenerationResult] {
        &self.history
    }

    fn invalid(&self, event: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            event,
            phase: self.phase(),
        }
    }

    fn transition(&mut self, event: &'static str, next: State) {
        let from = self.phase();
        self.state = next;
        tracing::debug!(event, from = %from, to = %self.phase(), "session transition");
    }

    /// Store a captured or imported portrait. `camera` → `selecting`.
    pub fn capture(&mut self, image: ImagePayload) -> Result<(), SessionError> {
        if !matches!(self.state, State::Camera) {
            return Err(self.invalid("capture"));
        }
        self.transition(
            "capture",
            State::Selecting {
                source: image,
                last_era: None,
            },
        );
        Ok(())
    }

    /// Discard the portrait and go back to the camera. `selecting` → `camera`.
    pub fn retake(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, State::Selecting { .. }) {
            return Err(self.invalid("retake"));
        }
        self.transition("retake", State::Camera);
        Ok(())
    }

    /// Enter `processing` for an era selection and hand back the request to
    /// send.
    ///
    /// Returns `Ok(None)` without changing anything when there is nothing to
    /// submit (custom era with a blank prompt).
    pub fn begin_generation(
        &mut self,
        era: &Era,
        custom_prompt: Option<&str>,
    ) -> Result<Option<GenerationRequest>, SessionError> {
        let State::Selecting { source, .. } = &self.state else {
            return Err(self.invalid("select an era"));
        };
        let Some(prompt) = resolve_prompt(era, custom_prompt) else {
            tracing::debug!(era = era.id, "blank custom prompt ignored");
            return Ok(None);
        };
        let source = source.clone();
        let request = GenerationRequest {
            source: source.clone(),
            prompt: prompt.clone(),
        };
        self.transition(
            "select era",
            State::Processing {
                source,
                era: *era,
                prompt,
            },
        );
        Ok(Some(request))
    }

    /// Record the outcome of the in-flight request, stamped with the current
    /// time. `processing` → `complete` | `error`.
    pub fn finish_generation(
        &mut self,
        outcome: Result<ImagePayload, GenerationError>,
    ) -> Result<Phase, SessionError> {
        self.finish_generation_at(outcome, SystemTime::now())
    }

    /// [`finish_generation`](Self::finish_generation) with an explicit clock.
    pub fn finish_generation_at(
        &mut self,
        outcome: Result<ImagePayload, GenerationError>,
        now: SystemTime,
    ) -> Result<Phase, SessionError> {
        let (source, era, prompt) = match std::mem::replace(&mut self.state, State::Camera) {
            State::Processing { source, era, prompt } => (source, era, prompt),
            other => {
                self.state = other;
                return Err(self.invalid("finish generation"));
            }
        };

        match outcome {
            Ok(image) => {
                let result = GenerationResult {
                    image,
                    era,
                    timestamp: now,
                    original_prompt: prompt,
                };
                self.history.insert(0, result.clone());
                tracing::info!(era = era.id, history = self.history.len(), "plate developed");
                self.transition("generation succeeded", State::Complete { source, result });
            }
            Err(error) => {
                tracing::warn!(era = era.id, error = %error, "generation failed");
                let message = failure_message(&error);
                self.transition(
                    "generation failed",
                    State::Error {
                        source,
                        era,
                        message,
                    },
                );
            }
        }
        Ok(self.phase())
    }

    /// Select an era and run the generation call to completion.
    ///
    /// Returns the phase afterwards: `complete`, `error`, or `selecting` when
    /// the selection was a no-op.
    pub async fn select_era<C>(
        &mut self,
        client: &C,
        era: &Era,
        custom_prompt: Option<&str>,
    ) -> Result<Phase, SessionError>
    where
        C: GenerationClient + ?Sized,
    {
        let Some(request) = self.begin_generation(era, custom_prompt)? else {
            return Ok(self.phase());
        };
        let outcome = client.generate(&request.source, &request.prompt).await;
        self.finish_generation(outcome)
    }

    /// Back to `selecting` after a failure, keeping the portrait.
    /// `error` → `selecting`.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        let State::Error { source, era, .. } = &self.state else {
            return Err(self.invalid("retry"));
        };
        let next = State::Selecting {
            source: source.clone(),
            last_era: Some(*era),
        };
        self.transition("retry", next);
        Ok(())
    }

    /// Show an earlier plate. Only the displayed result changes: the
    /// portrait stays the current one and the history keeps its order.
    /// `complete` → `complete`.
    pub fn show_history(&mut self, index: usize) -> Result<(), SessionError> {
        if !matches!(self.state, State::Complete { .. }) {
            return Err(self.invalid("show history"));
        }
        let entry = self
            .history
            .get(index)
            .cloned()
            .ok_or(SessionError::HistoryIndex {
                index,
                len: self.history.len(),
            })?;
        if let State::Complete { result, .. } = &mut self.state {
            *result = entry;
        }
        tracing::debug!(index, "showing history entry");
        Ok(())
    }

    /// Start over from the camera. Clears portrait, era, result and error;
    /// the history survives. Allowed from any phase.
    pub fn reset(&mut self) {
        self.transition("reset", State::Camera);
    }
}
