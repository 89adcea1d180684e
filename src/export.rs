//! Raster export of the current view.
//!
//! Two pipelines produce functionally equivalent output: the safe-mode path
//! draws the pre-rendered background bitmap through the current view
//! transform, and the vector path serializes the live scene to SVG text and
//! rasterizes it through an intermediate decode. Either way the payload's
//! pixel dimensions equal the displayed viewport, never the intrinsic size.

use crate::geometry::ViewTransform;
use crate::scene::Scene;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, RgbaImage};
use resvg::{tiny_skia, usvg};
use std::io::Cursor;
use thiserror::Error;

/// Nominal intrinsic width of the background artwork, in design units.
pub const INTRINSIC_WIDTH: u32 = 800;

/// Nominal intrinsic height of the background artwork, in design units.
pub const INTRINSIC_HEIGHT: u32 = 400;

/// Errors produced by the export pipelines. An export that fails here never
/// reaches the host bridge.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The off-screen surface could not be created.
    #[error("off-screen rendering is unavailable")]
    RenderingUnavailable,
    #[error("failed to decode background artwork: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to encode exported image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("invalid vector document: {0}")]
    InvalidSvg(#[from] usvg::Error),
}

/// Lossless PNG payload plus a thumbnail (identical content here) at the
/// exported pixel size.
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub png: Vec<u8>,
    pub thumbnail: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ExportedImage {
    /// Full-resolution payload as a `data:` URL for the bridge contract.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(&self.png))
    }

    pub fn thumbnail_data_url(&self) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(&self.thumbnail))
    }
}

/// Decoded RGBA pixels of a rasterized scene, straight (unpremultiplied)
/// alpha, row-major.
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Rasterizes serialized SVG text at the given pixel size.
///
/// Fails with [`ExportError::InvalidSvg`] when the document cannot be parsed
/// and [`ExportError::RenderingUnavailable`] when no surface of that size can
/// be allocated.
pub fn rasterize_svg(svg: &str, width: u32, height: u32) -> Result<RasterImage, ExportError> {
    let tree = usvg::Tree::from_str(svg, &usvg::Options::default())?;
    let mut surface =
        tiny_skia::Pixmap::new(width, height).ok_or(ExportError::RenderingUnavailable)?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut surface.as_mut());

    Ok(RasterImage {
        width,
        height,
        pixels: demultiply(&surface),
    })
}

/// Renders the current visual state to fixed-size raster payloads.
pub struct ExportPipeline {
    /// Pre-rendered background artwork, premultiplied, at its source size.
    background: tiny_skia::Pixmap,
}

impl ExportPipeline {
    /// Decodes the pre-rendered background artwork from PNG bytes.
    pub fn new(background_png: &[u8]) -> Result<Self, ExportError> {
        let decoded = image::load_from_memory(background_png)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        let mut background =
            tiny_skia::Pixmap::new(width, height).ok_or(ExportError::RenderingUnavailable)?;
        for (dst, src) in background.pixels_mut().iter_mut().zip(decoded.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Self { background })
    }

    /// Safe-mode export: allocates a surface at the *displayed* viewport
    /// size, applies `translate(pan) scale(zoom)`, and draws the background
    /// artwork at its nominal intrinsic size through that transform.
    pub fn export_view(
        &self,
        transform: ViewTransform,
        viewport: (u32, u32),
    ) -> Result<ExportedImage, ExportError> {
        let (width, height) = viewport;
        let mut surface =
            tiny_skia::Pixmap::new(width, height).ok_or(ExportError::RenderingUnavailable)?;

        // normalize the source bitmap to the nominal intrinsic size
        let to_intrinsic_x = INTRINSIC_WIDTH as f32 / self.background.width() as f32;
        let to_intrinsic_y = INTRINSIC_HEIGHT as f32 / self.background.height() as f32;
        let ts = tiny_skia::Transform::from_translate(transform.pan.x, transform.pan.y)
            .pre_scale(transform.zoom, transform.zoom)
            .pre_scale(to_intrinsic_x, to_intrinsic_y);

        surface.draw_pixmap(
            0,
            0,
            self.background.as_ref(),
            &tiny_skia::PixmapPaint {
                quality: tiny_skia::FilterQuality::Bilinear,
                ..tiny_skia::PixmapPaint::default()
            },
            ts,
            None,
        );

        encode(&surface)
    }

    /// Vector-mode export: stamps explicit pixel dimensions on the scene,
    /// serializes it, and rasterizes the text through an intermediate decode.
    pub fn export_scene(scene: &Scene, viewport: (u32, u32)) -> Result<ExportedImage, ExportError> {
        let (width, height) = viewport;
        Self::export_svg(&scene.to_svg(width, height), viewport)
    }

    /// Same as [`ExportPipeline::export_scene`], for already-serialized text.
    pub fn export_svg(svg: &str, viewport: (u32, u32)) -> Result<ExportedImage, ExportError> {
        let (width, height) = viewport;
        let raster = rasterize_svg(svg, width, height)?;
        let image = RgbaImage::from_raw(width, height, raster.pixels)
            .ok_or(ExportError::RenderingUnavailable)?;
        encode_rgba(&image)
    }
}

fn demultiply(surface: &tiny_skia::Pixmap) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(surface.pixels().len() * 4);
    for premultiplied in surface.pixels() {
        let color = premultiplied.demultiply();
        pixels.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    pixels
}

fn encode(surface: &tiny_skia::Pixmap) -> Result<ExportedImage, ExportError> {
    let image = RgbaImage::from_raw(surface.width(), surface.height(), demultiply(surface))
        .ok_or(ExportError::RenderingUnavailable)?;
    encode_rgba(&image)
}

fn encode_rgba(image: &RgbaImage) -> Result<ExportedImage, ExportError> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(ExportError::Encode)?;
    let png = cursor.into_inner();

    Ok(ExportedImage {
        thumbnail: png.clone(),
        png,
        width: image.width(),
        height: image.height(),
    })
}
