//! Image file input/output
//!
//! Loading normalizes every input to RGBA8 so the engines see a single
//! pixel layout; the original color type and EXIF orientation are carried
//! along for the post-processing stages that need them.

use crate::{
    config::OutputFormat,
    error::{PipelineError, Result},
};
use image::{metadata::Orientation, ColorType, DynamicImage, ImageDecoder, ImageReader, RgbaImage};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Decoded input image plus the source metadata the pipeline cares about
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Pixels, always RGBA8
    pub pixels: RgbaImage,
    /// EXIF orientation read at decode time
    pub orientation: Orientation,
    /// Pixel format of the source file (RGB vs RGBA stays distinguishable)
    pub source_color: ColorType,
}

impl LoadedImage {
    /// Wrap an in-memory RGBA buffer (no orientation metadata)
    #[must_use]
    pub fn from_pixels(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            orientation: Orientation::NoTransforms,
            source_color: ColorType::Rgba8,
        }
    }

    /// `(width, height)` of the decoded pixels
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Width of the decoded pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height of the decoded pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Whether the source file carried an alpha channel
    #[must_use]
    pub fn has_source_alpha(&self) -> bool {
        self.source_color.has_alpha()
    }
}

/// Service for image file input/output operations
pub struct ImageIo;

impl ImageIo {
    /// Load and validate an image file
    ///
    /// Decodes via format detection, captures the EXIF orientation before
    /// the pixels are consumed, and normalizes to RGBA8. Read-only; the
    /// source file is never touched.
    ///
    /// # Errors
    /// - [`PipelineError::ImageNotFound`] when the path is not an existing
    ///   file
    /// - [`PipelineError::ImageLoadFailed`] when no codec can decode it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedImage> {
        let path_ref = path.as_ref();

        if !path_ref.is_file() {
            return Err(PipelineError::image_not_found(path_ref));
        }

        match Self::decode_with_orientation(path_ref) {
            Ok(loaded) => Ok(loaded),
            Err(primary) => {
                // Extension-based decoding failed; retry with content sniffing
                log::debug!(
                    "Decoder selection failed for {}: {}. Retrying with content-based detection.",
                    path_ref.display(),
                    primary
                );
                let data = std::fs::read(path_ref)
                    .map_err(|e| PipelineError::file_io_error("read image data", path_ref, e))?;
                let image = image::load_from_memory(&data).map_err(|content_err| {
                    PipelineError::image_load_failed(
                        path_ref,
                        format!("{primary}; content-based retry: {content_err}"),
                    )
                })?;
                let source_color = image.color();
                Ok(LoadedImage {
                    pixels: image.into_rgba8(),
                    orientation: Orientation::NoTransforms,
                    source_color,
                })
            },
        }
    }

    fn decode_with_orientation(path: &Path) -> std::result::Result<LoadedImage, image::ImageError> {
        let reader = ImageReader::open(path).map_err(image::ImageError::IoError)?;
        let mut decoder = reader.with_guessed_format()?.into_decoder()?;
        let source_color = decoder.color_type();
        let orientation = decoder
            .orientation()
            .unwrap_or(Orientation::NoTransforms);
        let image = DynamicImage::from_decoder(decoder)?;
        Ok(LoadedImage {
            pixels: image.into_rgba8(),
            orientation,
            source_color,
        })
    }

    /// Save an image with the requested format and quality
    ///
    /// Creates the parent directory when missing. `quality` applies to JPEG
    /// output; PNG is lossless and the image crate's WebP encoder is
    /// lossless as well.
    ///
    /// # Errors
    /// I/O failures while creating directories or files, and encoder
    /// failures surfaced as [`PipelineError::ProcessingFailed`].
    pub fn save<P: AsRef<Path>>(
        image: &DynamicImage,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PipelineError::file_io_error("create output directory", parent, e)
                })?;
            }
        }

        match format {
            OutputFormat::Jpeg => {
                let file = std::fs::File::create(path_ref)
                    .map_err(|e| PipelineError::file_io_error("create output file", path_ref, e))?;
                let mut writer = BufWriter::new(file);
                let mut encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, quality);
                let rgb = image.to_rgb8();
                encoder.encode_image(&rgb).map_err(|e| {
                    PipelineError::processing(format!(
                        "Failed to encode JPEG '{}': {}",
                        path_ref.display(),
                        e
                    ))
                })?;
            },
            OutputFormat::Png => {
                image
                    .save_with_format(path_ref, image::ImageFormat::Png)
                    .map_err(|e| {
                        PipelineError::processing(format!(
                            "Failed to encode PNG '{}': {}",
                            path_ref.display(),
                            e
                        ))
                    })?;
            },
            OutputFormat::WebP => {
                image
                    .save_with_format(path_ref, image::ImageFormat::WebP)
                    .map_err(|e| {
                        PipelineError::processing(format!(
                            "Failed to encode WebP '{}': {}",
                            path_ref.display(),
                            e
                        ))
                    })?;
            },
        }

        Ok(())
    }

    /// Output path for a batch item: `{stem}_no_bg.{ext}` inside `output_dir`
    #[must_use]
    pub fn derive_output_path(input: &Path, output_dir: &Path, format: OutputFormat) -> PathBuf {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("image");
        output_dir.join(format!("{}_no_bg.{}", stem, format.extension()))
    }

    /// Persistent temp path for single-item mode without an explicit output
    ///
    /// # Errors
    /// I/O failures while creating or persisting the temp file.
    pub fn temp_output_path(format: OutputFormat) -> Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix("imgjobs_")
            .suffix(&format!(".{}", format.extension()))
            .tempfile()
            .map_err(|e| {
                PipelineError::file_io_error("create temp output", std::env::temp_dir(), e)
            })?;
        let (_handle, path) = file
            .keep()
            .map_err(|e| PipelineError::Io(e.error))?;
        Ok(path)
    }
}
