use image::{ColorType, DynamicImage, Rgba, RgbaImage, imageops};

use crate::ImageOps;
use crate::font;

const TEXT_COLOUR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// [`ImageOps`] over 8-bit RGBA buffers.
///
/// Transforms work on an RGBA copy and convert back to the source colour type
/// afterwards; 16-bit and float sources come back as 8-bit RGBA.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterOps;

impl ImageOps for RasterOps {
    fn adjust_brightness(&self, image: DynamicImage, amount: f32) -> DynamicImage {
        let amount = amount.clamp(-1.0, 1.0);
        map_colour_channels(image, |value| {
            let value = f32::from(value);
            let adjusted = if amount < 0.0 {
                value * (1.0 + amount)
            } else {
                value + (255.0 - value) * amount
            };
            adjusted.clamp(0.0, 255.0) as u8
        })
    }

    fn adjust_contrast(&self, image: DynamicImage, amount: f32) -> DynamicImage {
        // amount == 1 would divide by zero.
        let amount = amount.clamp(-1.0, 0.99);
        let factor = (1.0 + amount) / (1.0 - amount);
        map_colour_channels(image, |value| {
            let adjusted = (factor * (f32::from(value) - 127.0) + 127.0).floor();
            adjusted.clamp(0.0, 255.0) as u8
        })
    }

    fn to_greyscale(&self, image: DynamicImage) -> DynamicImage {
        image.grayscale()
    }

    fn invert(&self, mut image: DynamicImage) -> DynamicImage {
        image.invert();
        image
    }

    fn draw_centered_text(&self, image: DynamicImage, text: &str) -> DynamicImage {
        let colour = image.color();
        let mut canvas = image.into_rgba8();
        font::draw_centered(&mut canvas, text, TEXT_COLOUR);
        restore_colour(colour, canvas)
    }

    fn composite_over(
        &self,
        image: DynamicImage,
        mark: &DynamicImage,
        opacity: f32,
    ) -> DynamicImage {
        let colour = image.color();
        let mut canvas = image.into_rgba8();
        let mut mark = mark.to_rgba8();

        let opacity = opacity.clamp(0.0, 1.0);
        if opacity < 1.0 {
            for pixel in mark.pixels_mut() {
                pixel[3] = (f32::from(pixel[3]) * opacity).round() as u8;
            }
        }

        let (x, y) = centered_offset(canvas.dimensions(), mark.dimensions());
        imageops::overlay(&mut canvas, &mark, x, y);
        restore_colour(colour, canvas)
    }
}

/// Top-left position that centers an `inner` box inside `outer`.
///
/// Halves are floored, so an odd difference leans toward the top-left and a
/// mark larger than the canvas gets a negative offset.
pub fn centered_offset(outer: (u32, u32), inner: (u32, u32)) -> (i64, i64) {
    let x = (i64::from(outer.0) - i64::from(inner.0)).div_euclid(2);
    let y = (i64::from(outer.1) - i64::from(inner.1)).div_euclid(2);
    (x, y)
}

fn map_colour_channels<F>(image: DynamicImage, adjust: F) -> DynamicImage
where
    F: Fn(u8) -> u8,
{
    let colour = image.color();
    let mut canvas = image.into_rgba8();
    for pixel in canvas.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            *channel = adjust(*channel);
        }
    }
    restore_colour(colour, canvas)
}

fn restore_colour(colour: ColorType, canvas: RgbaImage) -> DynamicImage {
    let image = DynamicImage::ImageRgba8(canvas);
    match colour {
        ColorType::L8 => DynamicImage::ImageLuma8(image.to_luma8()),
        ColorType::La8 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        ColorType::Rgb8 => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    }
}
