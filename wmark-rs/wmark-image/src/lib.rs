use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

mod codec;
mod font;
mod ops;

pub use codec::FsCodec;
pub use ops::{RasterOps, centered_offset};

/// Relative luminance increase applied by [`EditOperation::Brighten`].
pub const BRIGHTNESS_AMOUNT: f32 = 0.1;
/// Contrast adjustment applied by [`EditOperation::IncreaseContrast`].
pub const CONTRAST_AMOUNT: f32 = 0.1;
/// Opacity of an image watermark composited over its source.
pub const WATERMARK_OPACITY: f32 = 0.5;
pub const MAX_QUALITY: u8 = 100;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to open {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode image to {path}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot determine an image format for {path}")]
    UnsupportedFormat { path: PathBuf },
}

/// Reads and writes encoded images.
pub trait ImageCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage, ImageError>;

    /// Encode `image` at `path`, choosing the format from the extension.
    /// `quality` applies to lossy formats.
    fn encode(&self, image: &DynamicImage, path: &Path, quality: u8) -> Result<(), ImageError>;
}

/// Pixel transforms used by the edit and watermark operations.
pub trait ImageOps {
    fn adjust_brightness(&self, image: DynamicImage, amount: f32) -> DynamicImage;
    fn adjust_contrast(&self, image: DynamicImage, amount: f32) -> DynamicImage;
    fn to_greyscale(&self, image: DynamicImage) -> DynamicImage;
    fn invert(&self, image: DynamicImage) -> DynamicImage;
    fn draw_centered_text(&self, image: DynamicImage, text: &str) -> DynamicImage;
    fn composite_over(&self, image: DynamicImage, mark: &DynamicImage, opacity: f32)
    -> DynamicImage;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOperation {
    Brighten,
    IncreaseContrast,
    Greyscale,
    Invert,
}

impl EditOperation {
    pub const ALL: [Self; 4] = [
        Self::Brighten,
        Self::IncreaseContrast,
        Self::Greyscale,
        Self::Invert,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Brighten => "Make image brighter",
            Self::IncreaseContrast => "Increase contrast",
            Self::Greyscale => "Make image b&w",
            Self::Invert => "Invert image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Watermark {
    Text(String),
    /// Path of the image used as the mark.
    Image(PathBuf),
}

/// Runs one operation per call: decode, transform, encode.
#[derive(Debug, Clone, Default)]
pub struct Editor<C = FsCodec, O = RasterOps> {
    codec: C,
    ops: O,
}

impl<C: ImageCodec, O: ImageOps> Editor<C, O> {
    pub fn new(codec: C, ops: O) -> Self {
        Self { codec, ops }
    }

    pub fn apply_edit(
        &self,
        operation: EditOperation,
        input: &Path,
        output: &Path,
    ) -> Result<PathBuf, ImageError> {
        match operation {
            EditOperation::Brighten => self.brighten(input, output),
            EditOperation::IncreaseContrast => self.increase_contrast(input, output),
            EditOperation::Greyscale => self.greyscale(input, output),
            EditOperation::Invert => self.invert(input, output),
        }
    }

    pub fn apply_watermark(
        &self,
        watermark: &Watermark,
        input: &Path,
        output: &Path,
    ) -> Result<PathBuf, ImageError> {
        match watermark {
            Watermark::Text(text) => self.add_text_watermark(input, output, text),
            Watermark::Image(mark) => self.add_image_watermark(input, output, mark),
        }
    }

    pub fn brighten(&self, input: &Path, output: &Path) -> Result<PathBuf, ImageError> {
        self.transform(input, output, "brighten", |image| {
            self.ops.adjust_brightness(image, BRIGHTNESS_AMOUNT)
        })
    }

    pub fn increase_contrast(&self, input: &Path, output: &Path) -> Result<PathBuf, ImageError> {
        self.transform(input, output, "increase contrast", |image| {
            self.ops.adjust_contrast(image, CONTRAST_AMOUNT)
        })
    }

    pub fn greyscale(&self, input: &Path, output: &Path) -> Result<PathBuf, ImageError> {
        self.transform(input, output, "greyscale", |image| {
            self.ops.to_greyscale(image)
        })
    }

    pub fn invert(&self, input: &Path, output: &Path) -> Result<PathBuf, ImageError> {
        self.transform(input, output, "invert", |image| self.ops.invert(image))
    }

    pub fn add_text_watermark(
        &self,
        input: &Path,
        output: &Path,
        text: &str,
    ) -> Result<PathBuf, ImageError> {
        self.transform(input, output, "text watermark", |image| {
            self.ops.draw_centered_text(image, text)
        })
    }

    pub fn add_image_watermark(
        &self,
        input: &Path,
        output: &Path,
        mark: &Path,
    ) -> Result<PathBuf, ImageError> {
        let mark = self.codec.decode(mark)?;
        self.transform(input, output, "image watermark", |image| {
            self.ops.composite_over(image, &mark, WATERMARK_OPACITY)
        })
    }

    fn transform<F>(
        &self,
        input: &Path,
        output: &Path,
        name: &str,
        apply: F,
    ) -> Result<PathBuf, ImageError>
    where
        F: FnOnce(DynamicImage) -> DynamicImage,
    {
        let image = self.codec.decode(input)?;
        debug!(
            operation = name,
            input = %input.display(),
            width = image.width(),
            height = image.height(),
            "decoded source image"
        );

        let image = apply(image);
        self.codec.encode(&image, output, MAX_QUALITY)?;
        info!(operation = name, output = %output.display(), "image written");
        Ok(output.to_path_buf())
    }
}
