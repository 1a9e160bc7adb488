//! Writing plates to disk and finding them again.
//!
//! Export writes the generated bytes exactly as received, named by
//! [`crate::naming::plate_filename`]. Callers that want the darkroom
//! adjustments burned in run [`crate::darkroom::bake`] first and export the
//! baked payload instead.

use crate::capture::ImagePayload;
use crate::naming::{self, PlateName};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("refusing to overwrite existing plate: {}", .0.display())]
    Exists(PathBuf),
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// An exported plate found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateFile {
    pub path: PathBuf,
    pub name: PlateName,
    pub size: u64,
}

fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Stamps tried past `now` before giving up on a free file name.
const MAX_STAMP_BUMPS: u64 = 1000;

/// Write `image` into `dir`, stamped with `now`. Creates `dir` if needed and
/// never overwrites an existing file: when the name is taken the stamp is
/// bumped one millisecond at a time until a free name turns up.
pub fn export_plate(
    image: &ImagePayload,
    era_id: &str,
    dir: &Path,
    prefix: &str,
    now: SystemTime,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let millis = unix_millis(now);
    let mut bump = 0;
    let (file, path) = loop {
        let filename = naming::plate_filename(prefix, era_id, millis + bump, image.extension());
        let path = dir.join(filename);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => break (file, path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if bump == MAX_STAMP_BUMPS {
                    return Err(ExportError::Exists(path));
                }
                bump += 1;
            }
            Err(e) => return Err(e.into()),
        }
    };
    if bump > 0 {
        tracing::debug!(bump, "plate name taken, bumped stamp");
    }
    write_plate(file, &path, image.bytes())?;

    tracing::info!(path = %path.display(), bytes = image.len(), "exported plate");
    Ok(path)
}

/// Write `bytes` to a freshly created plate, removing it again if the write
/// fails so no truncated plate is left behind.
fn write_plate<W: Write>(mut out: W, path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Err(e) = out.write_all(bytes).and_then(|()| out.flush()) {
        drop(out);
        if let Err(remove_err) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %remove_err, "could not remove partial plate");
        }
        return Err(e.into());
    }
    Ok(())
}

/// List plates in `dir` written with `prefix`, newest first.
///
/// Files that don't follow the naming pattern are skipped.
pub fn list_plates(dir: &Path, prefix: &str) -> Result<Vec<PlateFile>, ExportError> {
    if !dir.is_dir() {
        return Err(ExportError::NotADirectory(dir.to_path_buf()));
    }
    let mut plates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name
            .to_str()
            .and_then(|n| naming::parse_plate_filename(n, prefix))
        else {
            continue;
        };
        plates.push(PlateFile {
            path: entry.path(),
            name,
            size: metadata.len(),
        });
    }
    plates.sort_by(|a, b| {
        b.name
            .millis
            .cmp(&a.name.millis)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(plates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{at_millis, payload, tiny_png};
    use tempfile::TempDir;

    #[test]
    fn export_writes_raw_bytes() {
        let tmp = TempDir::new().unwrap();
        let image = tiny_png();
        let path = export_plate(&image, "vikings", tmp.path(), "chronosnap", at_millis(1234)).unwrap();

        assert_eq!(path, tmp.path().join("chronosnap-vikings-1234.png"));
        assert_eq!(fs::read(&path).unwrap(), image.bytes());
    }

    #[test]
    fn export_extension_follows_mime_type() {
        let tmp = TempDir::new().unwrap();
        let jpeg = ImagePayload::new("image/jpeg", vec![0xFFu8, 0xD8]);
        let path = export_plate(&jpeg, "film-noir", tmp.path(), "plate", at_millis(5)).unwrap();
        assert_eq!(path.file_name().unwrap(), "plate-film-noir-5.jpg");
    }

    #[test]
    fn export_creates_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested/out");
        let path = export_plate(&payload("x"), "sketch", &dir, "chronosnap", at_millis(1)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn export_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        export_plate(&payload("first"), "sketch", tmp.path(), "chronosnap", at_millis(1)).unwrap();
        let second =
            export_plate(&payload("second"), "sketch", tmp.path(), "chronosnap", at_millis(1))
                .unwrap();

        assert_eq!(second, tmp.path().join("chronosnap-sketch-2.png"));
        let kept = fs::read(tmp.path().join("chronosnap-sketch-1.png")).unwrap();
        assert_eq!(kept, b"first");
        assert_eq!(fs::read(&second).unwrap(), b"second");
    }

    #[test]
    fn same_millisecond_exports_all_land_and_list() {
        let tmp = TempDir::new().unwrap();
        for label in ["a", "b", "c"] {
            export_plate(&payload(label), "vikings", tmp.path(), "chronosnap", at_millis(500))
                .unwrap();
        }
        let plates = list_plates(tmp.path(), "chronosnap").unwrap();
        let stamps: Vec<u64> = plates.iter().map(|p| p.name.millis).collect();
        assert_eq!(stamps, [502, 501, 500]);
    }

    #[test]
    fn export_gives_up_when_every_stamp_is_taken() {
        let tmp = TempDir::new().unwrap();
        for millis in 0..=MAX_STAMP_BUMPS {
            fs::write(tmp.path().join(format!("chronosnap-sketch-{millis}.png")), "x").unwrap();
        }
        let err = export_plate(&payload("late"), "sketch", tmp.path(), "chronosnap", at_millis(0))
            .unwrap_err();
        assert!(matches!(err, ExportError::Exists(_)));
    }

    /// Accepts a few bytes, then fails like a full disk.
    struct ShortWriter(usize);

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.0 == 0 {
                return Err(std::io::Error::other("no space left"));
            }
            let n = buf.len().min(self.0);
            self.0 -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_removes_partial_plate() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("chronosnap-vikings-7.png");
        fs::write(&path, "par").unwrap();

        let err = write_plate(ShortWriter(3), &path, b"partial plate").unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
        assert!(!path.exists());
        assert!(list_plates(tmp.path(), "chronosnap").unwrap().is_empty());
    }

    #[test]
    fn list_plates_newest_first_skipping_strangers() {
        let tmp = TempDir::new().unwrap();
        for (era, millis) in [("vikings", 10), ("80s-arcade", 30), ("statue", 20)] {
            export_plate(&payload(era), era, tmp.path(), "chronosnap", at_millis(millis)).unwrap();
        }
        fs::write(tmp.path().join("notes.txt"), "hi").unwrap();
        fs::write(tmp.path().join("other-vikings-99.png"), "x").unwrap();
        fs::create_dir(tmp.path().join("chronosnap-dir-1.png")).unwrap();

        let plates = list_plates(tmp.path(), "chronosnap").unwrap();
        let ids: Vec<&str> = plates.iter().map(|p| p.name.era_id.as_str()).collect();
        assert_eq!(ids, ["80s-arcade", "statue", "vikings"]);
        assert_eq!(plates[2].size, "vikings".len() as u64);
    }

    #[test]
    fn list_plates_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let err = list_plates(&tmp.path().join("nope"), "chronosnap").unwrap_err();
        assert!(matches!(err, ExportError::NotADirectory(_)));
    }
}
