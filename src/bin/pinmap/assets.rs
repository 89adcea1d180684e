//! Asset embedding and loading utilities.

use pinmap::scene::Scene;
use rust_embed::RustEmbed;
use std::borrow::Cow;
use thiserror::Error;

/// Embeds the background artwork from the assets/ directory into the binary.
/// In debug mode, assets are loaded from the filesystem for faster iteration.
/// In release mode, assets are compressed and embedded in the binary.
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Assets;

const SCENE_ASSET: &str = "world.ron";
const BACKGROUND_ASSET: &str = "world.png";

/// Errors that can occur when loading the scene graph.
#[derive(Error, Debug)]
pub enum SceneLoadError {
    #[error("world.ron not found in embedded assets")]
    SceneNotFound,
    #[error("invalid UTF-8 in world.ron: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("failed to parse world.ron: {0}")]
    ParseError(#[from] ron::de::SpannedError),
}

/// Errors that can occur when loading the pre-rendered background.
#[derive(Error, Debug)]
pub enum BackgroundLoadError {
    #[error("world.png not found in embedded assets")]
    BackgroundNotFound,
    #[error("failed to decode world.png: {0}")]
    DecodeError(#[from] image::ImageError),
}

/// Decoded background pixels ready for texture creation.
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Loads the scene graph from embedded assets.
pub fn load_scene() -> Result<Scene, SceneLoadError> {
    let file = Assets::get(SCENE_ASSET).ok_or(SceneLoadError::SceneNotFound)?;
    let ron_string = std::str::from_utf8(&file.data)?;
    Ok(ron::from_str(ron_string)?)
}

/// Raw PNG bytes of the pre-rendered background, for the export pipeline.
pub fn background_png() -> Result<Cow<'static, [u8]>, BackgroundLoadError> {
    Assets::get(BACKGROUND_ASSET)
        .map(|file| file.data)
        .ok_or(BackgroundLoadError::BackgroundNotFound)
}

/// Decodes the pre-rendered background for texture creation.
pub fn load_background() -> Result<DecodedImage, BackgroundLoadError> {
    let bytes = background_png()?;
    let rgba = image::load_from_memory(&bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        pixels: rgba.into_raw(),
        width,
        height,
    })
}
