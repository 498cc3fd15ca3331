//! Custom `genpdf` elements used by the report.
//!
//! Chart images are decoded with the [`image`] crate so decode failures carry
//! the offending path, then wrapped in [`CaptionedImage`], which scales the
//! picture to a requested width and stacks an optional caption underneath.

use std::path::Path;

use image::GenericImageView;

use genpdf::elements::{Image, Paragraph};
use genpdf::error::{Context as _, Error};
use genpdf::style::Style;
use genpdf::{render, Alignment, Element, Mm, Position, RenderResult, Scale, Size};

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const DEFAULT_CAPTION_SPACING_MM: f64 = 2.0;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn estimated_image_size(image: &image::DynamicImage, dpi: f64) -> Size {
    let (px_width, px_height) = image.dimensions();
    let width_mm = MM_PER_INCH * f64::from(px_width) / dpi;
    let height_mm = MM_PER_INCH * f64::from(px_height) / dpi;
    Size::new(mm_from_f64(width_mm), mm_from_f64(height_mm))
}

/// Decodes the image file at `path`, guessing the format from its content.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))
}

/// An image scaled to an optional width with an optional caption below it.
pub struct CaptionedImage {
    image: Image,
    caption: Option<Paragraph>,
    alignment: Alignment,
    natural_size: Size,
    requested_width: Option<Mm>,
    spacing: Mm,
}

impl CaptionedImage {
    /// Wraps a decoded image.
    pub fn from_dynamic_image(image: image::DynamicImage) -> Result<Self, Error> {
        let natural_size = estimated_image_size(&image, DEFAULT_IMAGE_DPI);
        let image = Image::from_dynamic_image(image)?;
        Ok(Self {
            image,
            caption: None,
            alignment: Alignment::Left,
            natural_size,
            requested_width: None,
            spacing: mm_from_f64(DEFAULT_CAPTION_SPACING_MM),
        })
    }

    /// Decodes and wraps the image file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_dynamic_image(decode_image_from_path(path)?)
    }

    /// Size of the image at the default DPI, before any width constraint.
    pub fn natural_size(&self) -> Size {
        self.natural_size
    }

    /// Sets the caption and returns the updated element.
    pub fn with_caption(mut self, caption: impl Into<Option<Paragraph>>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Sets the alignment shared by the image and its caption.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Constrains the rendered width while preserving the aspect ratio.
    pub fn with_width(mut self, width: impl Into<Option<Mm>>) -> Self {
        self.requested_width = width.into();
        self
    }

    fn apply_layout(&mut self) {
        self.image.set_alignment(self.alignment);
        if let Some(caption) = self.caption.as_mut() {
            caption.set_alignment(self.alignment);
        }

        let scale = match self.requested_width {
            Some(width) if mm_to_f64(self.natural_size.width) > f64::EPSILON => {
                mm_to_f64(width) / mm_to_f64(self.natural_size.width)
            }
            _ => 1.0,
        };
        self.image.set_scale(Scale::new(scale, scale));
    }
}

impl Element for CaptionedImage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        self.apply_layout();

        let mut result = RenderResult::default();
        let image_result = self.image.render(context, area.clone(), style)?;
        result.size = result.size.stack_vertical(image_result.size);
        result.has_more |= image_result.has_more;

        if let Some(caption) = self.caption.as_mut() {
            area.add_offset(Position::new(0, image_result.size.height + self.spacing));
            result.size = result.size.stack_vertical(Size::new(0, self.spacing));

            let caption_result = caption.render(context, area, style)?;
            result.size = result.size.stack_vertical(caption_result.size);
            result.has_more |= caption_result.has_more;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn natural_size_follows_default_dpi() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.png");
        let buffer: RgbImage =
            ImageBuffer::from_fn(600, 300, |x, _| Rgb([(x % 255) as u8, 90, 160]));
        buffer.save(&path).expect("write png");

        let element = CaptionedImage::from_path(&path).expect("decode");
        let size = element.natural_size();
        assert!((mm_to_f64(size.width) - 50.8).abs() < 1e-6);
        assert!((mm_to_f64(size.height) - 25.4).abs() < 1e-6);
    }

    #[test]
    fn garbage_file_fails_to_decode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(CaptionedImage::from_path(&path).is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = match CaptionedImage::from_path("/nonexistent/chart.png") {
            Ok(_) => panic!("decoding a missing file must fail"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("/nonexistent/chart.png"));
    }
}
