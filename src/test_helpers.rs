//! Shared test utilities for the chronosnap test suite.
//!
//! Provides image fixtures and sessions parked in each phase, so tests can
//! start from the state they care about instead of replaying the workflow.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut session = session_in(Phase::Error);
//! session.retry().unwrap();
//! assert_eq!(session.source(), Some(&payload("portrait")));
//! ```

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::capture::ImagePayload;
use crate::era;
use crate::generation::GenerationError;
use crate::session::{GenerationResult, Phase, Session};

// =========================================================================
// Image fixtures
// =========================================================================

/// Encode a solid mid-grey PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([128, 128, 128]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A real, decodable 2x2 PNG payload.
pub fn tiny_png() -> ImagePayload {
    ImagePayload::new("image/png", png_bytes(2, 2))
}

/// An opaque payload tagged with a label, for tests that never decode it.
pub fn payload(label: &str) -> ImagePayload {
    ImagePayload::new("image/png", label.as_bytes().to_vec())
}

// =========================================================================
// Session fixtures
// =========================================================================

/// A fixed instant for deterministic timestamps and filenames.
pub fn at_millis(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis)
}

/// Build a result directly, bypassing the session.
pub fn result_for(era_id: &str, label: &str, millis: u64) -> GenerationResult {
    let era = *era::find(era_id).unwrap();
    GenerationResult {
        image: payload(label),
        era,
        timestamp: at_millis(millis),
        original_prompt: era.prompt.to_string(),
    }
}

/// A session parked in `phase`.
///
/// Every non-camera session holds `payload("portrait")`. Sessions past
/// `selecting` were driven with the Vikings era; `complete` has exactly one
/// history entry and `error` has none.
pub fn session_in(phase: Phase) -> Session {
    let mut session = Session::new();
    if phase == Phase::Camera {
        return session;
    }
    session.capture(payload("portrait")).unwrap();
    if phase == Phase::Selecting {
        return session;
    }
    let vikings = era::find("vikings").unwrap();
    session.begin_generation(vikings, None).unwrap().unwrap();
    match phase {
        Phase::Processing => {}
        Phase::Complete => {
            session
                .finish_generation_at(Ok(payload("plate")), at_millis(1_700_000_000_000))
                .unwrap();
        }
        Phase::Error => {
            session
                .finish_generation(Err(GenerationError::Transport("network down".into())))
                .unwrap();
        }
        Phase::Camera | Phase::Selecting => unreachable!(),
    }
    assert_eq!(session.phase(), phase);
    session
}
