//! Rendering of a single derivative file

use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use exif::{In, Reader, Tag, Value};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::RenderError;

/// Produces a resized copy of a source image
///
/// Implementations may be slow and may fail; callers treat each call as an
/// independent attempt.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Write `source` scaled to `max_width` pixels wide into `target`
    async fn render(
        &self,
        source: &Path,
        target: &Path,
        max_width: u32,
        auto_orient: bool,
    ) -> Result<(), RenderError>;
}

/// Renderer backed by the `image` crate, run on the blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRenderer;

impl ImageRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer for ImageRenderer {
    async fn render(
        &self,
        source: &Path,
        target: &Path,
        max_width: u32,
        auto_orient: bool,
    ) -> Result<(), RenderError> {
        let source = source.to_path_buf();
        let target = target.to_path_buf();

        tokio::task::spawn_blocking(move || render_file(&source, &target, max_width, auto_orient))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))?
    }
}

fn render_file(
    source: &Path,
    target: &Path,
    max_width: u32,
    auto_orient: bool,
) -> Result<(), RenderError> {
    if max_width == 0 {
        return Err(RenderError::InvalidWidth(max_width));
    }

    let bytes = std::fs::read(source).map_err(|e| RenderError::Open {
        path: source.to_path_buf(),
        source: e,
    })?;

    let mut img = image::load_from_memory(&bytes).map_err(|e| RenderError::Decode {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;

    if auto_orient {
        if let Some(orientation) = read_orientation(&bytes) {
            img = apply_orientation(img, orientation);
        }
    }

    let resized = resize_to_width(&img, max_width);
    write_atomically(resized, target)
}

/// EXIF orientation (1-8) if the image carries one
fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(Tag::Orientation, In::PRIMARY)?;
    match field.value {
        Value::Short(ref vec) => vec.first().copied(),
        _ => None,
    }
}

fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

fn resize_to_width(img: &DynamicImage, width: u32) -> DynamicImage {
    let (src_width, src_height) = (img.width().max(1), img.height().max(1));
    let height = (u64::from(src_height) * u64::from(width) + u64::from(src_width) / 2)
        / u64::from(src_width);
    let height = height.clamp(1, u64::from(u32::MAX)) as u32;

    img.resize_exact(width, height, FilterType::Lanczos3)
}

/// Encode next to the target and rename into place, so a partially written
/// file never counts as an existing derivative.
fn write_atomically(img: DynamicImage, target: &Path) -> Result<(), RenderError> {
    let encode_err = |reason: String| RenderError::Encode {
        path: target.to_path_buf(),
        reason,
    };

    let format = ImageFormat::from_path(target).map_err(|e| encode_err(e.to_string()))?;
    let img = match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };

    let dir = target
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".render-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| encode_err(e.to_string()))?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        img.write_to(&mut writer, format)
            .map_err(|e| encode_err(e.to_string()))?;
        writer.flush().map_err(|e| encode_err(e.to_string()))?;
    }

    temp.persist(target)
        .map_err(|e| encode_err(e.error.to_string()))?;
    Ok(())
}
