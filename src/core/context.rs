//! Execution context handed to an operation.
//!
//! The context bundles everything one step may read: the incoming encoded
//! bytes, the run's tags and the bound positional arguments. It also owns
//! the decode/encode helpers so every operation treats formats and tags the
//! same way.

use crate::core::error::{OperationError, StepError};
use crate::core::types::{Argument, ImageInfo, OutputFormat, PipelineValue, TagSet};
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

/// Tags that convert every step's output to grayscale.
pub const GRAYSCALE_TAGS: &[&str] = &["grayscale", "greyscale"];

/// Context provided during operation execution.
#[derive(Debug, Clone)]
pub struct OperationContext<'a> {
    operation: &'a str,
    input: &'a [u8],
    tags: &'a TagSet,
    arguments: &'a [Argument],
    /// Zero-based position of this step in the chain.
    pub step: usize,
    /// Upper bound on decoded pixel memory (width * height * 4).
    pub max_decoded_bytes: Option<u64>,
}

/// A decoded input image together with the format it arrived in.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Pixel data
    pub image: DynamicImage,
    /// Detected source encoding, if it is one we can write back
    pub format: Option<OutputFormat>,
}

impl<'a> OperationContext<'a> {
    /// Create a new execution context.
    pub fn new(
        operation: &'a str,
        input: &'a [u8],
        tags: &'a TagSet,
        arguments: &'a [Argument],
    ) -> Self {
        Self {
            operation,
            input,
            tags,
            arguments,
            step: 0,
            max_decoded_bytes: None,
        }
    }

    /// Set the step index.
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Set the decoded memory limit.
    pub fn with_max_decoded_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_decoded_bytes = limit;
        self
    }

    /// Name of the running operation.
    pub fn operation(&self) -> &str {
        self.operation
    }

    /// Encoded input bytes.
    pub fn input(&self) -> &[u8] {
        self.input
    }

    /// Tags of the run.
    pub fn tags(&self) -> &TagSet {
        self.tags
    }

    /// Check whether a tag is set.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// All bound arguments.
    pub fn arguments(&self) -> &[Argument] {
        self.arguments
    }

    /// Build a displayable failure attributed to this operation.
    pub fn fail(&self, message: impl Into<String>) -> StepError {
        StepError::Operation(OperationError::new(self.operation, message))
    }

    // ========================================================================
    // Argument Getters
    // ========================================================================

    /// Get an argument by position.
    pub fn argument(&self, index: usize) -> Result<&Argument, StepError> {
        self.arguments
            .get(index)
            .ok_or_else(|| self.fail(format!("is missing argument {}", index + 1)))
    }

    /// Get an argument as an integer.
    pub fn integer(&self, index: usize) -> Result<i64, StepError> {
        let arg = self.argument(index)?;
        arg.as_integer()
            .ok_or_else(|| self.fail(format!("expected an integer, got '{}'", arg)))
    }

    /// Get an optional integer argument.
    pub fn integer_or(&self, index: usize, default: i64) -> Result<i64, StepError> {
        match self.arguments.get(index) {
            Some(_) => self.integer(index),
            None => Ok(default),
        }
    }

    /// Get an argument as a float.
    pub fn float(&self, index: usize) -> Result<f64, StepError> {
        let arg = self.argument(index)?;
        arg.as_float()
            .ok_or_else(|| self.fail(format!("expected a number, got '{}'", arg)))
    }

    /// Get an optional float argument.
    pub fn float_or(&self, index: usize, default: f64) -> Result<f64, StepError> {
        match self.arguments.get(index) {
            Some(_) => self.float(index),
            None => Ok(default),
        }
    }

    /// Get an argument as text.
    pub fn text(&self, index: usize) -> Result<&str, StepError> {
        let arg = self.argument(index)?;
        arg.as_text()
            .ok_or_else(|| self.fail(format!("expected text, got '{}'", arg)))
    }

    // ========================================================================
    // Codec Helpers
    // ========================================================================

    /// Decode the input bytes.
    ///
    /// Undecodable input and images above the memory limit are reported as
    /// operation failures, since both are problems with what the requester sent.
    pub fn decode(&self) -> Result<DecodedImage, StepError> {
        let reader = ImageReader::new(Cursor::new(self.input)).with_guessed_format()?;
        let format = reader.format();

        if let Some(limit) = self.max_decoded_bytes {
            let (width, height) = ImageReader::new(Cursor::new(self.input))
                .with_guessed_format()?
                .into_dimensions()
                .map_err(|_| self.fail("could not read the image"))?;
            let needed = width as u64 * height as u64 * 4;
            if needed > limit {
                return Err(self.fail("input image is too large"));
            }
        }

        if format.is_none() {
            return Err(self.fail("could not read the image"));
        }

        let image = reader
            .decode()
            .map_err(|_| self.fail("could not read the image"))?;

        Ok(DecodedImage {
            image,
            format: format.and_then(OutputFormat::from_image_format),
        })
    }

    /// Choose the encoding for this step's output.
    ///
    /// A format tag wins; otherwise the source format is kept, falling back to PNG.
    pub fn output_format(&self, source: Option<OutputFormat>) -> OutputFormat {
        OutputFormat::from_tags(self.tags)
            .or(source)
            .unwrap_or_default()
    }

    /// Apply run-wide tags, encode, and wrap the result with its metadata.
    pub fn finish(
        &self,
        image: DynamicImage,
        source: Option<OutputFormat>,
    ) -> Result<PipelineValue, StepError> {
        self.finish_as(image, self.output_format(source))
    }

    /// Like [`finish`](Self::finish) but with an explicit encoding that
    /// overrides any format tag.
    pub fn finish_as(
        &self,
        image: DynamicImage,
        format: OutputFormat,
    ) -> Result<PipelineValue, StepError> {
        let image = if GRAYSCALE_TAGS.iter().any(|t| self.has_tag(t)) {
            image.grayscale()
        } else {
            image
        };

        let image = prepare_for(format, image);
        let (width, height) = image.dimensions();

        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format.to_image_format())?;
        let data = buffer.into_inner();

        let info = ImageInfo {
            width,
            height,
            size: data.len(),
            format,
        };

        Ok(PipelineValue::terminal(data, info))
    }
}

/// Convert pixel layout to one the target encoder accepts.
fn prepare_for(format: OutputFormat, image: DynamicImage) -> DynamicImage {
    match format {
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        OutputFormat::Png => match image {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageRgb8(_)
            | DynamicImage::ImageRgba8(_) => image,
            other => DynamicImage::ImageRgba8(other.to_rgba8()),
        },
        OutputFormat::WebP | OutputFormat::Gif | OutputFormat::Bmp | OutputFormat::Tiff => {
            DynamicImage::ImageRgba8(image.to_rgba8())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Encode a solid test image as PNG.
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 255]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_argument_getters() {
        let tags = TagSet::new();
        let args = vec![Argument::Integer(5), Argument::Float(1.5), Argument::from("png")];
        let ctx = OperationContext::new("test", &[], &tags, &args);

        assert_eq!(ctx.integer(0).unwrap(), 5);
        assert_eq!(ctx.float(0).unwrap(), 5.0);
        assert_eq!(ctx.float(1).unwrap(), 1.5);
        assert_eq!(ctx.text(2).unwrap(), "png");
        assert_eq!(ctx.integer_or(7, 3).unwrap(), 3);
        assert!(matches!(ctx.integer(1), Err(StepError::Operation(_))));
        assert!(matches!(ctx.argument(9), Err(StepError::Operation(_))));
    }

    #[test]
    fn test_decode_and_finish_round_trip_keeps_png() {
        let bytes = png_bytes(8, 4);
        let tags = TagSet::new();
        let ctx = OperationContext::new("noop", &bytes, &tags, &[]);

        let decoded = ctx.decode().unwrap();
        assert_eq!(decoded.format, Some(OutputFormat::Png));

        let value = ctx.finish(decoded.image, decoded.format).unwrap();
        let (data, info) = value.into_terminal().unwrap();
        assert_eq!((info.width, info.height), (8, 4));
        assert_eq!(info.size, data.len());
        assert_eq!(info.format, OutputFormat::Png);
    }

    #[test]
    fn test_finish_honours_tags() {
        let bytes = png_bytes(4, 4);
        let tags: TagSet = ["grayscale", "jpg"].into_iter().collect();
        let ctx = OperationContext::new("noop", &bytes, &tags, &[]);

        let decoded = ctx.decode().unwrap();
        let (data, info) = ctx
            .finish(decoded.image, decoded.format)
            .unwrap()
            .into_terminal()
            .unwrap();
        assert_eq!(info.format, OutputFormat::Jpeg);
        assert_eq!(image::guess_format(&data).unwrap(), image::ImageFormat::Jpeg);
        let reloaded = image::load_from_memory(&data).unwrap().to_rgb8();
        let px = reloaded.get_pixel(1, 1);
        assert!((px[0] as i32 - px[1] as i32).abs() <= 2);
    }

    #[test]
    fn test_decode_rejects_garbage_and_oversized() {
        let tags = TagSet::new();
        let garbage = b"definitely not an image".to_vec();
        let ctx = OperationContext::new("resize", &garbage, &tags, &[]);
        match ctx.decode() {
            Err(StepError::Operation(e)) => assert_eq!(e.operation, "resize"),
            other => panic!("unexpected result: {:?}", other.map(|d| d.format)),
        }

        let bytes = png_bytes(64, 64);
        let ctx = OperationContext::new("resize", &bytes, &tags, &[]).with_max_decoded_bytes(Some(100));
        match ctx.decode() {
            Err(StepError::Operation(e)) => assert_eq!(e.message, "input image is too large"),
            other => panic!("unexpected result: {:?}", other.map(|d| d.format)),
        }
    }
}
