use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat, ImageReader};

use crate::{ImageCodec, ImageError};

/// Filesystem codec backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCodec;

impl ImageCodec for FsCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage, ImageError> {
        let io_error = |source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        };
        let reader = ImageReader::open(path)
            .map_err(io_error)?
            .with_guessed_format()
            .map_err(io_error)?;

        reader.decode().map_err(|source| ImageError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    fn encode(&self, image: &DynamicImage, path: &Path, quality: u8) -> Result<(), ImageError> {
        let format = ImageFormat::from_path(path).map_err(|_| ImageError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        let encode_error = |source| ImageError::Encode {
            path: path.to_path_buf(),
            source,
        };

        if format != ImageFormat::Jpeg {
            return format_compatible(image, format)
                .save_with_format(path, format)
                .map_err(encode_error);
        }

        let io_error = |source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
        jpeg_compatible(image)
            .write_with_encoder(encoder)
            .map_err(encode_error)?;
        writer.flush().map_err(io_error)
    }
}

/// Colour type accepted by the encoder for `format`.
///
/// PNG takes anything. GIF frames are always RGBA. BMP, TIFF and WebP only
/// take 8-bit L, RGB and RGBA, so luma-alpha and wide samples widen to RGBA.
fn format_compatible(image: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    match (format, image.color()) {
        (ImageFormat::Png, _) | (ImageFormat::Gif, ColorType::Rgba8) => Cow::Borrowed(image),
        (ImageFormat::Gif, _) => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
        (_, ColorType::L8 | ColorType::Rgb8 | ColorType::Rgba8) => Cow::Borrowed(image),
        _ => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
    }
}

/// JPEG carries neither alpha nor 16-bit samples.
fn jpeg_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::L8 | ColorType::Rgb8 => Cow::Borrowed(image),
        ColorType::La8 | ColorType::L16 | ColorType::La16 => {
            Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8()))
        }
        _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
    }
}
