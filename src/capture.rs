//! Capture and composition pipeline.
//!
//! The engine treats "rasterize the live board region" and "decode an
//! image for drawing" as opaque async services behind [`CaptureBackend`];
//! delivery of the finished artifact goes through [`ArtifactSink`] (the
//! browser equivalent is a synthetic anchor-click download). Everything
//! else, including the vertical-stack composition math, lives here.
//!
//! Ordering guarantee: `export` performs the final capture, awaits the
//! log-append acknowledgment (the committed entry index), and only then
//! reads the log to composite. There is no settle delay anywhere in the
//! pipeline.

use crate::board::Point;
use crate::events::LogEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Court background color used for captures.
pub const COURT_BACKGROUND: &str = "#16a34a";

/// Rasterization scale factor for resolution.
pub const CAPTURE_SCALE: u32 = 2;

/// Header band height above the first composite section, in pixels.
const FIRST_BAND: u32 = 50;

/// Header band height between composite sections, in pixels.
const BAND: u32 = 40;

/// Label baseline distance above the section content, in pixels.
const LABEL_INSET: u32 = 20;

/// Composite width when the log holds no images to measure.
const TEXT_ONLY_WIDTH: u32 = 400;

/// Opaque captured image bytes, as returned by the rasterization service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
pub struct ImageData(Vec<u8>);

impl ImageData {
    /// Raw bytes of the captured image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Byte length of the captured image.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the capture carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A decoded RGBA image the pipeline can draw on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbaImage {
    /// Creates an image filled with `color`.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Wraps raw RGBA bytes; `pixels` must hold `width * height * 4` bytes.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() as u64 == width as u64 * height as u64 * 4).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Reads the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Fills a rectangle, clipped to the image bounds. Accepts negative
    /// origins so out-of-bounds tokens draw their visible part.
    pub fn fill_rect(&mut self, x: i64, y: i64, w: u32, h: u32, color: [u8; 4]) {
        let x0 = x.max(0) as u32;
        let y0 = y.max(0) as u32;
        let x1 = (x + w as i64).clamp(0, self.width as i64) as u32;
        let y1 = (y + h as i64).clamp(0, self.height as i64) as u32;
        for py in y0..y1 {
            for px in x0..x1 {
                let i = ((py * self.width + px) * 4) as usize;
                self.pixels[i..i + 4].copy_from_slice(&color);
            }
        }
    }

    /// Copies `src` onto this image with its top-left at `(x, y)`, clipped.
    pub fn blit(&mut self, src: &RgbaImage, x: i64, y: i64) {
        for sy in 0..src.height {
            let dy = y + sy as i64;
            if dy < 0 || dy >= self.height as i64 {
                continue;
            }
            for sx in 0..src.width {
                let dx = x + sx as i64;
                if dx < 0 || dx >= self.width as i64 {
                    continue;
                }
                let si = ((sy * src.width + sx) * 4) as usize;
                let di = ((dy as u32 * self.width + dx as u32) * 4) as usize;
                self.pixels[di..di + 4].copy_from_slice(&src.pixels[si..si + 4]);
            }
        }
    }
}

/// Options for a board rasterization.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct RasterizeOptions {
    /// Background color behind the court, CSS notation.
    pub background: String,
    /// Resolution scale factor.
    pub scale: u32,
}

impl Default for RasterizeOptions {
    fn default() -> Self {
        Self::new(COURT_BACKGROUND.to_string(), CAPTURE_SCALE)
    }
}

/// What the rasterizer sees: a read-only view of the live board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Court region width in board pixels.
    pub court_width: f64,
    /// Court region height in board pixels.
    pub court_height: f64,
    /// Player tokens, in roster order.
    pub tokens: Vec<TokenSnapshot>,
    /// Ally team name.
    pub ally_name: String,
    /// Opponent team name.
    pub opponent_name: String,
    /// Scores as (ally, opponent).
    pub score: (u32, u32),
}

/// One token in a [`BoardSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    /// Display name.
    pub name: String,
    /// Board-local position.
    pub position: Point,
    /// Foreground color.
    pub color: String,
    /// Background color.
    pub bg_color: String,
    /// Goal count, shown on the token.
    pub goals: u32,
}

/// Errors from the capture pipeline.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum CaptureError {
    /// The rasterization service failed or threw.
    #[display("board capture failed: {_0}")]
    RasterizeFailed(String),
    /// An image could not be decoded for composition.
    #[display("image decode failed: {_0}")]
    DecodeFailed(String),
    /// The artifact sink refused the composed image.
    #[display("artifact delivery failed: {_0}")]
    SinkFailed(String),
    /// There was nothing to export.
    #[display("the event log is empty; nothing to export")]
    EmptyLog,
}

impl std::error::Error for CaptureError {}

/// Async boundary to the host's rasterization capabilities.
///
/// The two required methods mirror the only browser-level capabilities the
/// engine depends on: rasterizing a screen region to an image and decoding
/// image data for drawing.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Rasterizes the live board region to an opaque image.
    async fn rasterize(
        &self,
        snapshot: &BoardSnapshot,
        options: &RasterizeOptions,
    ) -> Result<ImageData, CaptureError>;

    /// Decodes captured bytes into pixels for composition.
    async fn decode(&self, image: &ImageData) -> Result<RgbaImage, CaptureError>;

    /// Draws a caption centered at `center_x` with its baseline at
    /// `baseline_y`.
    ///
    /// The default paints a neutral 24 px strip sized to the text; hosts
    /// with real text rendering override this.
    fn draw_label(&self, canvas: &mut RgbaImage, text: &str, center_x: u32, baseline_y: u32) {
        let width = (text.chars().count() as u32 * 12).min(canvas.width());
        let x = center_x as i64 - width as i64 / 2;
        let y = baseline_y as i64 - 24;
        canvas.fill_rect(x, y, width, 24, [40, 40, 40, 255]);
    }
}

/// Destination for the exported artifact.
pub trait ArtifactSink: Send + Sync {
    /// Delivers the composed image under the given filename.
    fn deliver(&self, filename: &str, image: &RgbaImage) -> Result<(), CaptureError>;
}

// Hosts keep a handle on their sink to inspect deliveries.
impl<T: ArtifactSink + ?Sized> ArtifactSink for std::sync::Arc<T> {
    fn deliver(&self, filename: &str, image: &RgbaImage) -> Result<(), CaptureError> {
        (**self).deliver(filename, image)
    }
}

/// Placement of one section inside the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSlot {
    /// Caption anchor as `(center_x, baseline_y)`, when the section has one.
    pub label_anchor: Option<(u32, u32)>,
    /// Image top-left, when the section has an image.
    pub image_origin: Option<(u32, u32)>,
}

/// Computed geometry of the composite artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeLayout {
    /// Artifact width: the widest section image.
    pub width: u32,
    /// Artifact height: header bands plus section contents.
    pub height: u32,
    /// One slot per section, in log order.
    pub slots: Vec<SectionSlot>,
}

/// Plans the vertical stack: each section is an optional caption band over
/// an optional image, images centered horizontally, the first band taller
/// than the rest.
pub fn plan_composite(sections: &[(Option<&str>, Option<(u32, u32)>)]) -> CompositeLayout {
    let width = sections
        .iter()
        .filter_map(|(_, size)| size.map(|(w, _)| w))
        .max()
        .unwrap_or(TEXT_ONLY_WIDTH);

    let mut slots = Vec::with_capacity(sections.len());
    let mut cursor: u32 = 0;
    for (index, (label, size)) in sections.iter().enumerate() {
        let band = if index == 0 { FIRST_BAND } else { BAND };
        cursor += band;
        let label_anchor = label.map(|_| (width / 2, cursor - LABEL_INSET));
        let image_origin = size.map(|(w, h)| {
            let origin = ((width - w.min(width)) / 2, cursor);
            cursor += h;
            origin
        });
        slots.push(SectionSlot {
            label_anchor,
            image_origin,
        });
    }

    CompositeLayout {
        width,
        height: cursor.max(1),
        slots,
    }
}

/// Builds the timestamped export filename, e.g.
/// `試合記録_2026-08-30T12-34-56.png` (ISO-8601 with `:` and `.`
/// replaced and sub-second precision dropped).
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("試合記録_{}.png", now.format("%Y-%m-%dT%H-%M-%S"))
}

/// Captures the live board and composes the exported artifact.
pub struct CapturePipeline {
    backend: Box<dyn CaptureBackend>,
    sink: Box<dyn ArtifactSink>,
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline").finish_non_exhaustive()
    }
}

impl CapturePipeline {
    /// Creates a pipeline over the host's backend and sink.
    pub fn new(backend: Box<dyn CaptureBackend>, sink: Box<dyn ArtifactSink>) -> Self {
        Self { backend, sink }
    }

    /// Rasterizes the board with the default court options.
    #[instrument(skip_all)]
    pub async fn capture(&self, snapshot: &BoardSnapshot) -> Result<ImageData, CaptureError> {
        let image = self
            .backend
            .rasterize(snapshot, &RasterizeOptions::default())
            .await?;
        debug!(bytes = image.len(), "board captured");
        Ok(image)
    }

    /// Composes every log entry into one vertically stacked artifact on a
    /// white background.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub async fn compose(&self, entries: &[LogEntry]) -> Result<RgbaImage, CaptureError> {
        if entries.is_empty() {
            return Err(CaptureError::EmptyLog);
        }

        // Decode first so a bad image aborts before any drawing happens.
        let mut decoded: Vec<(Option<String>, Option<RgbaImage>)> =
            Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                LogEntry::Note { text, .. } => decoded.push((Some(text.clone()), None)),
                LogEntry::Capture { label, image } => {
                    let pixels = self.backend.decode(image).await?;
                    decoded.push((label.clone(), Some(pixels)));
                }
            }
        }

        let specs: Vec<(Option<&str>, Option<(u32, u32)>)> = decoded
            .iter()
            .map(|(label, image)| {
                (
                    label.as_deref(),
                    image.as_ref().map(|img| (img.width(), img.height())),
                )
            })
            .collect();
        let layout = plan_composite(&specs);

        let mut canvas = RgbaImage::filled(layout.width, layout.height, [255, 255, 255, 255]);
        for (slot, (label, image)) in layout.slots.iter().zip(&decoded) {
            if let (Some((cx, baseline)), Some(text)) = (slot.label_anchor, label.as_deref()) {
                self.backend.draw_label(&mut canvas, text, cx, baseline);
            }
            if let (Some((x, y)), Some(img)) = (slot.image_origin, image.as_ref()) {
                canvas.blit(img, x as i64, y as i64);
            }
        }
        debug!(
            width = canvas.width(),
            height = canvas.height(),
            "composite assembled"
        );
        Ok(canvas)
    }

    /// Hands the finished artifact to the sink.
    #[instrument(skip(self, image))]
    pub fn deliver(&self, filename: &str, image: &RgbaImage) -> Result<(), CaptureError> {
        self.sink.deliver(filename, image)
    }
}
