use std::{
    fs,
    io::Cursor,
    path::PathBuf,
};

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{
    codecs::png::{CompressionType, FilterType, PngEncoder},
    ColorType, ImageEncoder, RgbImage,
};
use tracing::{debug, info};

use crate::{
    error::{AppError, AppResult, GenerationError},
    profiles::{self, AspectRatioProfile},
};

pub const REFERENCE_MIME: &str = "image/png";
const SUPPORTED_MIMES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];

#[derive(Debug, Clone)]
pub struct ParsedDataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Directory of pre-rendered blank images, one per aspect-ratio profile.
///
/// Files are read on every request and never written while serving.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    dir: PathBuf,
}

impl ReferenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, profile: &AspectRatioProfile) -> PathBuf {
        self.dir.join(profile.reference_filename)
    }

    pub fn load(&self, profile: &AspectRatioProfile) -> Result<ReferenceImage, GenerationError> {
        let path = self.path_for(profile);
        let bytes = fs::read(&path).map_err(|error| {
            GenerationError::configuration(format!(
                "reference image for {} could not be loaded from {}: {error}",
                profile.ratio,
                path.display()
            ))
        })?;

        if bytes.is_empty() {
            return Err(GenerationError::configuration(format!(
                "reference image for {} is empty: {}",
                profile.ratio,
                path.display()
            )));
        }

        debug!(
            ratio = %profile.ratio,
            bytes = bytes.len(),
            "loaded reference image"
        );

        Ok(ReferenceImage {
            mime: REFERENCE_MIME,
            bytes,
        })
    }

    /// Lists profiles whose reference file is absent.
    pub fn missing(&self) -> Vec<&'static AspectRatioProfile> {
        profiles::all_profiles()
            .iter()
            .filter(|profile| !self.path_for(profile).is_file())
            .collect()
    }

    /// Renders reference files. Existing files are kept unless `overwrite`.
    pub fn write_all(&self, overwrite: bool) -> AppResult<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir)?;
        let mut written = Vec::new();

        for profile in profiles::all_profiles() {
            let path = self.path_for(profile);
            if path.exists() && !overwrite {
                continue;
            }

            let png_bytes = render_blank(profile.width, profile.height)?;
            fs::write(&path, png_bytes)?;
            info!(
                ratio = %profile.ratio,
                width = profile.width,
                height = profile.height,
                path = %path.display(),
                "wrote reference image"
            );
            written.push(path);
        }

        Ok(written)
    }
}

/// An opaque white PNG of exactly `width` x `height` pixels.
pub fn render_blank(width: u32, height: u32) -> AppResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(AppError::msg("reference dimensions must be > 0"));
    }

    let canvas = RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
    encode_png_optimized(canvas.as_raw(), width, height)
}

/// A data URL split into its declared MIME type and base64 payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

/// Checks the data URL header without decoding the payload.
pub fn split_data_url(data_url: &str) -> AppResult<DataUrl<'_>> {
    if !data_url.starts_with("data:") {
        return Err(AppError::msg("expected a data URL with image payload"));
    }

    let (metadata, payload) = data_url
        .split_once(',')
        .ok_or_else(|| AppError::msg("invalid data URL format"))?;

    if !metadata.contains(";base64") {
        return Err(AppError::msg("data URL must be base64 encoded"));
    }

    let mime = metadata
        .trim_start_matches("data:")
        .split(';')
        .next()
        .unwrap_or_default();
    if !SUPPORTED_MIMES.contains(&mime) {
        return Err(AppError::msg(format!(
            "unsupported image mime type: {mime}. allowed: png/jpeg/webp"
        )));
    }

    // Provider only accepts the canonical JPEG type.
    let mime = if mime == "image/jpg" { "image/jpeg" } else { mime };

    Ok(DataUrl {
        mime,
        payload: payload.trim(),
    })
}

pub fn parse_data_url(data_url: &str) -> AppResult<ParsedDataUrl> {
    let DataUrl { mime, payload } = split_data_url(data_url)?;

    let bytes = STANDARD.decode(payload)?;
    if bytes.is_empty() {
        return Err(AppError::msg("data URL carries no image bytes"));
    }

    Ok(ParsedDataUrl {
        mime: mime.to_string(),
        bytes,
    })
}

pub fn to_data_url(mime: &str, base64_payload: &str) -> String {
    format!("data:{mime};base64,{base64_payload}")
}

/// Reads only the image header.
pub fn measure(bytes: &[u8]) -> AppResult<(u32, u32)> {
    let dimensions = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(dimensions)
}

fn encode_png_optimized(rgb: &[u8], width: u32, height: u32) -> AppResult<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = PngEncoder::new_with_quality(
            &mut png_bytes,
            CompressionType::Best,
            FilterType::Adaptive,
        );
        encoder
            .write_image(rgb, width, height, ColorType::Rgb8)
            .map_err(|error| AppError::msg(format!("failed to encode png: {error}")))?;
    }

    let mut options = oxipng::Options::from_preset(3);
    options.strip = oxipng::StripChunks::Safe;

    oxipng::optimize_from_memory(&png_bytes, &options)
        .map_err(|error| AppError::msg(format!("failed to optimize png: {error}")))
}
