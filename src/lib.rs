//! # ChronoSnap
//!
//! A time-travel photo studio. Take a portrait, pick an era, and a remote
//! image model re-imagines the sitter in that setting while keeping their
//! likeness. The developed plate can be tuned in a small darkroom, exported,
//! or compared against the source portrait.
//!
//! # Architecture: One Session, Five Phases
//!
//! Everything revolves around a [`session::Session`], a state machine that
//! owns the portrait, the selected era and the results:
//!
//! ```text
//! camera → selecting → processing → complete
//!              ▲            │
//!              └── error ◀──┘
//! ```
//!
//! The pieces around it are deliberately thin:
//!
//! - **Input**: [`capture`] turns files, data URIs or device frames into an
//!   [`capture::ImagePayload`].
//! - **Choice**: [`era`] is a static catalog of prompt templates.
//! - **Work**: [`generation`] defines the single-call client boundary and
//!   the Gemini implementation behind it.
//! - **Output**: [`darkroom`], [`preview`] and [`export`] present the result
//!   without touching the generated bytes unless asked to.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Processing state machine, history, prompt resolution |
//! | [`era`] | Era catalog and categories |
//! | [`capture`] | Image payloads, file/data-URI import, scoped camera capture |
//! | [`generation`] | `GenerationClient` trait, errors, Gemini REST client |
//! | [`darkroom`] | Display adjustments, CSS filter mapping, pixel baking |
//! | [`preview`] | HTML result page rendered with Maud |
//! | [`export`] | Writing plates to disk and listing them |
//! | [`naming`] | `<prefix>-<era>-<millis>.<ext>` file name convention |
//! | [`studio`] | Line-oriented interactive session driver |
//! | [`config`] | `chronosnap.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Phase Carries Its Data
//!
//! A session in `processing` always has a portrait, an era and a prompt; one
//! in `complete` always has a result; `error` always has a message. These
//! live inside the phase enum rather than in optional fields next to it, so
//! accessors never have to reconcile a phase with missing data.
//!
//! ## Single Attempt, User Retries
//!
//! A generation call is made once. Failures land in `error` with a readable
//! message and the session keeps the portrait and era; retrying is an
//! explicit user action. No backoff, no hidden second request.
//!
//! ## Raw Export
//!
//! Darkroom adjustments are a viewing aid. Exports write the generated bytes
//! unchanged unless the caller explicitly asks for a baked copy.

pub mod capture;
pub mod config;
pub mod darkroom;
pub mod era;
pub mod export;
pub mod generation;
pub mod naming;
pub mod output;
pub mod preview;
pub mod session;
pub mod studio;

#[cfg(test)]
pub(crate) mod test_helpers;
