//! Getting a portrait into the session.
//!
//! Two pathways produce an [`ImagePayload`]:
//!
//! - **Import**: read an existing file ([`import_file`]) or a data URI
//!   ([`ImagePayload::from_data_uri`]). The format is sniffed from the magic
//!   bytes, never from the file extension.
//! - **Device**: grab a raw RGB frame from a [`CaptureDevice`] through an
//!   [`ActiveCapture`] guard. Frames are mirrored horizontally (the viewfinder
//!   shows a mirror image, so the saved portrait matches what the sitter saw)
//!   and encoded as JPEG at quality 90.
//!
//! Device access is scoped: [`ActiveCapture::acquire`] opens the device and
//! dropping the guard closes it, on every path out of the capture view.
//!
//! Capture failures never touch the session phase. Callers report them
//! inline and stay in `camera`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// JPEG quality used for device frames.
const FRAME_JPEG_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unrecognized image format")]
    UnsupportedFormat,
    #[error("Malformed data URI: {0}")]
    MalformedDataUri(String),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Camera access denied. Please verify your equipment. ({0})")]
    DeviceUnavailable(String),
    #[error("Frame buffer is {actual} bytes, expected {expected} for {width}x{height} RGB")]
    InvalidFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// An encoded image: the captured portrait or a generated plate.
///
/// Bytes are shared, so cloning a payload into the history is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl ImagePayload {
    /// Wrap bytes with an explicit MIME type. No validation is performed;
    /// use [`ImagePayload::from_bytes`] when the bytes come from outside.
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Wrap bytes after sniffing their format.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CaptureError> {
        let format = image::guess_format(&bytes).map_err(|_| CaptureError::UnsupportedFormat)?;
        Ok(Self::new(format.to_mime_type(), bytes))
    }

    /// Parse a `data:<mime>;base64,<data>` URI.
    ///
    /// The declared MIME type is kept as-is; the bytes must still decode as
    /// base64.
    pub fn from_data_uri(uri: &str) -> Result<Self, CaptureError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| CaptureError::MalformedDataUri("missing 'data:' scheme".into()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| CaptureError::MalformedDataUri("missing ',' separator".into()))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            CaptureError::MalformedDataUri("only base64 data URIs are supported".into())
        })?;
        if mime_type.is_empty() {
            return Err(CaptureError::MalformedDataUri("empty MIME type".into()));
        }
        let bytes = BASE64_STANDARD.decode(data.trim())?;
        Ok(Self::new(mime_type, bytes))
    }

    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            BASE64_STANDARD.encode(&self.bytes)
        )
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension matching the MIME type, `png` when unknown.
    pub fn extension(&self) -> &'static str {
        ImageFormat::from_mime_type(&self.mime_type)
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("png")
    }

    /// Decode into pixels.
    pub fn decode(&self) -> Result<DynamicImage, image::ImageError> {
        image::load_from_memory(&self.bytes)
    }
}

/// Read a portrait from disk.
pub fn import_file(path: &Path) -> Result<ImagePayload, CaptureError> {
    let bytes = std::fs::read(path)?;
    ImagePayload::from_bytes(bytes)
}

/// A raw RGB8 frame as delivered by a capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB, 3 bytes per pixel.
    pub rgb: Vec<u8>,
}

/// A live capture source (webcam, tethered camera, test double).
pub trait CaptureDevice {
    /// Start streaming. Called once per [`ActiveCapture`].
    fn open(&mut self) -> Result<(), CaptureError>;

    /// Grab the current frame.
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Stop streaming and release the hardware. Must be idempotent.
    fn close(&mut self);
}

/// Scoped access to a [`CaptureDevice`]. The device is closed on drop.
pub struct ActiveCapture<'a, D: CaptureDevice> {
    device: &'a mut D,
}

impl<'a, D: CaptureDevice> ActiveCapture<'a, D> {
    /// Open the device. On failure the device is closed before returning.
    pub fn acquire(device: &'a mut D) -> Result<Self, CaptureError> {
        if let Err(e) = device.open() {
            device.close();
            tracing::warn!(error = %e, "capture device unavailable");
            return Err(e);
        }
        tracing::debug!("capture device acquired");
        Ok(Self { device })
    }

    /// Take a picture: grab a frame, mirror it, encode it as JPEG.
    pub fn snap(&mut self) -> Result<ImagePayload, CaptureError> {
        let frame = self.device.read_frame()?;
        encode_frame(&frame)
    }
}

impl<D: CaptureDevice> Drop for ActiveCapture<'_, D> {
    fn drop(&mut self) {
        self.device.close();
        tracing::debug!("capture device released");
    }
}

/// Mirror a frame horizontally and encode it as a JPEG payload.
pub fn encode_frame(frame: &Frame) -> Result<ImagePayload, CaptureError> {
    let expected = frame.width as usize * frame.height as usize * 3;
    let invalid = || CaptureError::InvalidFrame {
        width: frame.width,
        height: frame.height,
        expected,
        actual: frame.rgb.len(),
    };
    if frame.rgb.len() != expected || expected == 0 {
        return Err(invalid());
    }
    let img = RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone()).ok_or_else(invalid)?;
    let mirrored = image::imageops::flip_horizontal(&img);

    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, FRAME_JPEG_QUALITY)
        .encode_image(&mirrored)?;
    Ok(ImagePayload::new(ImageFormat::Jpeg.to_mime_type(), out))
}
