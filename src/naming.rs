//! File naming for exported plates.
//!
//! Every exported plate follows one pattern:
//!
//! ```text
//! <prefix>-<era id>-<unix millis>.<ext>
//! chronosnap-film-noir-1700000000123.png
//! ```
//!
//! Era ids contain dashes themselves (`film-noir`, `80s-arcade`), so parsing
//! strips the known prefix from the left and the timestamp from the right;
//! whatever remains is the era id.

/// Result of parsing a plate file name like `chronosnap-vikings-1700000000000.png`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateName {
    pub era_id: String,
    /// Unix milliseconds at export time.
    pub millis: u64,
    /// Extension without the dot, e.g. `"png"`.
    pub extension: String,
}

/// Build the file name for an exported plate.
pub fn plate_filename(prefix: &str, era_id: &str, millis: u64, extension: &str) -> String {
    format!("{prefix}-{era_id}-{millis}.{extension}")
}

/// Parse a plate file name written with `prefix`.
///
/// Returns `None` for anything that doesn't follow the pattern:
/// - `"chronosnap-vikings-1700000000000.png"` → era_id="vikings"
/// - `"chronosnap-80s-arcade-12.jpg"` → era_id="80s-arcade"
/// - `"chronosnap-vikings.png"` → None (no timestamp)
/// - `"other-vikings-12.png"` → None (different prefix)
pub fn parse_plate_filename(name: &str, prefix: &str) -> Option<PlateName> {
    let (stem, extension) = name.rsplit_once('.')?;
    let rest = stem.strip_prefix(prefix)?.strip_prefix('-')?;
    let (era_id, millis) = rest.rsplit_once('-')?;
    if era_id.is_empty() || extension.is_empty() {
        return None;
    }
    if !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(PlateName {
        era_id: era_id.to_string(),
        millis: millis.parse().ok()?,
        extension: extension.to_string(),
    })
}
