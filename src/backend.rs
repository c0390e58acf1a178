//! In-memory capture backend and artifact sinks.
//!
//! [`BufferBackend`] is a host-free stand-in for the browser rasterizer: it
//! paints tokens as flat squares on the court background and round-trips
//! images through a small self-describing byte format, which gives the
//! pipeline a genuine decode-failure path to exercise. [`FileSink`] writes
//! the composed artifact to disk; [`MemorySink`] collects deliveries for
//! headless hosts and tests.

use crate::board::PIECE_SIZE;
use crate::capture::{
    ArtifactSink, BoardSnapshot, CaptureBackend, CaptureError, ImageData, RasterizeOptions,
    RgbaImage,
};
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

const MAGIC: &[u8; 4] = b"TL01";

/// Parses a small CSS color subset: `#rgb`, `#rrggbb` and the named colors
/// the board actually uses.
pub fn parse_css_color(value: &str) -> Option<[u8; 4]> {
    match value {
        "white" => return Some([255, 255, 255, 255]),
        "black" => return Some([0, 0, 0, 255]),
        "darkblue" => return Some([0, 0, 139, 255]),
        "red" => return Some([255, 0, 0, 255]),
        _ => {}
    }
    let hex = value.strip_prefix('#')?;
    let nibble = |c: char| c.to_digit(16).map(|d| d as u8);
    match hex.len() {
        3 => {
            let mut chars = hex.chars();
            let r = nibble(chars.next()?)?;
            let g = nibble(chars.next()?)?;
            let b = nibble(chars.next()?)?;
            Some([r * 17, g * 17, b * 17, 255])
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some([r, g, b, 255])
        }
        _ => None,
    }
}

/// Rasterizes board snapshots into plain RGBA buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferBackend;

impl BufferBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }

    fn encode(image: &RgbaImage) -> ImageData {
        let mut bytes = Vec::with_capacity(12 + image.pixels().len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&image.width().to_le_bytes());
        bytes.extend_from_slice(&image.height().to_le_bytes());
        bytes.extend_from_slice(image.pixels());
        ImageData::from(bytes)
    }
}

#[async_trait]
impl CaptureBackend for BufferBackend {
    async fn rasterize(
        &self,
        snapshot: &BoardSnapshot,
        options: &RasterizeOptions,
    ) -> Result<ImageData, CaptureError> {
        if !(snapshot.court_width.is_finite() && snapshot.court_width > 0.0)
            || !(snapshot.court_height.is_finite() && snapshot.court_height > 0.0)
        {
            return Err(CaptureError::RasterizeFailed(
                "court region has no measurable size".to_string(),
            ));
        }

        let scale = options.scale.max(1) as f64;
        let width = (snapshot.court_width * scale).round() as u32;
        let height = (snapshot.court_height * scale).round() as u32;
        let background =
            parse_css_color(&options.background).unwrap_or([22, 163, 74, 255]);

        let mut canvas = RgbaImage::filled(width, height, background);
        let piece = (PIECE_SIZE * scale).round() as u32;
        for token in &snapshot.tokens {
            let fill = parse_css_color(&token.bg_color).unwrap_or([0, 0, 139, 255]);
            let x = (token.position.x * scale - piece as f64 / 2.0).round() as i64;
            let y = (token.position.y * scale - piece as f64 / 2.0).round() as i64;
            canvas.fill_rect(x, y, piece, piece, fill);
        }
        Ok(Self::encode(&canvas))
    }

    async fn decode(&self, image: &ImageData) -> Result<RgbaImage, CaptureError> {
        let bytes = image.as_bytes();
        if bytes.len() < 12 || &bytes[0..4] != MAGIC {
            return Err(CaptureError::DecodeFailed(
                "unrecognized image header".to_string(),
            ));
        }
        let width = u32::from_le_bytes(bytes[4..8].try_into().expect("4 bytes"));
        let height = u32::from_le_bytes(bytes[8..12].try_into().expect("4 bytes"));
        RgbaImage::from_raw(width, height, bytes[12..].to_vec()).ok_or_else(|| {
            CaptureError::DecodeFailed(format!(
                "pixel payload does not match {width}x{height} header"
            ))
        })
    }
}

/// Writes delivered artifacts into a directory.
///
/// Pixels are serialized as binary PPM (alpha dropped); the filename is
/// taken as given.
#[derive(Debug, Clone)]
pub struct FileSink {
    directory: PathBuf,
}

impl FileSink {
    /// Creates a sink writing into `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl ArtifactSink for FileSink {
    fn deliver(&self, filename: &str, image: &RgbaImage) -> Result<(), CaptureError> {
        let path = self.directory.join(filename);
        let mut out = Vec::with_capacity(image.pixels().len() / 4 * 3 + 32);
        out.extend_from_slice(
            format!("P6\n{} {}\n255\n", image.width(), image.height()).as_bytes(),
        );
        for rgba in image.pixels().chunks_exact(4) {
            out.extend_from_slice(&rgba[0..3]);
        }
        std::fs::File::create(&path)
            .and_then(|mut file| file.write_all(&out))
            .map_err(|err| CaptureError::SinkFailed(format!("{}: {err}", path.display())))?;
        info!(path = %path.display(), "artifact written");
        Ok(())
    }
}

/// Collects delivered artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<(String, RgbaImage)>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts delivered so far, as `(filename, image)` pairs.
    pub fn delivered(&self) -> Vec<(String, RgbaImage)> {
        self.delivered.lock().expect("sink lock").clone()
    }
}

impl ArtifactSink for MemorySink {
    fn deliver(&self, filename: &str, image: &RgbaImage) -> Result<(), CaptureError> {
        self.delivered
            .lock()
            .expect("sink lock")
            .push((filename.to_string(), image.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Point;
    use crate::capture::TokenSnapshot;

    fn snapshot() -> BoardSnapshot {
        BoardSnapshot {
            court_width: 100.0,
            court_height: 80.0,
            tokens: vec![TokenSnapshot {
                name: "Aoi".to_string(),
                position: Point::new(50.0, 40.0),
                color: "#fff".to_string(),
                bg_color: "darkblue".to_string(),
                goals: 0,
            }],
            ally_name: "Reds".to_string(),
            opponent_name: "Blues".to_string(),
            score: (0, 0),
        }
    }

    #[tokio::test]
    async fn rasterize_scales_and_round_trips() {
        let backend = BufferBackend::new();
        let data = backend
            .rasterize(&snapshot(), &RasterizeOptions::default())
            .await
            .expect("raster");
        let image = backend.decode(&data).await.expect("decode");
        assert_eq!(image.width(), 200);
        assert_eq!(image.height(), 160);
        // Token square at the center, court green in the corner.
        assert_eq!(image.pixel(100, 80), Some([0, 0, 139, 255]));
        assert_eq!(image.pixel(0, 0), Some([22, 163, 74, 255]));
    }

    #[tokio::test]
    async fn decode_rejects_foreign_bytes() {
        let backend = BufferBackend::new();
        let err = backend
            .decode(&ImageData::from(b"png?not really".to_vec()))
            .await
            .expect_err("must fail");
        assert!(matches!(err, CaptureError::DecodeFailed(_)));
    }

    #[tokio::test]
    async fn decode_rejects_truncated_pixels() {
        let backend = BufferBackend::new();
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        let err = backend
            .decode(&ImageData::from(bytes))
            .await
            .expect_err("must fail");
        assert!(matches!(err, CaptureError::DecodeFailed(_)));
    }

    #[test]
    fn css_colors_parse() {
        assert_eq!(parse_css_color("#fff"), Some([255, 255, 255, 255]));
        assert_eq!(parse_css_color("#16a34a"), Some([0x16, 0xa3, 0x4a, 255]));
        assert_eq!(parse_css_color("darkblue"), Some([0, 0, 139, 255]));
        assert_eq!(parse_css_color("not-a-color"), None);
    }
}
