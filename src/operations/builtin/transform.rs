//! Transform operations: Resize, Crop, Rotate, Flip, Flop, Thumbnail

use super::common_tags;
use crate::core::argument::{ArgumentDefinition, Constraint};
use crate::core::context::OperationContext;
use crate::core::error::StepError;
use crate::core::operation::{Category, Operation, OperationMetadata};
use crate::core::types::PipelineValue;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

/// Largest edge accepted by size arguments.
const MAX_DIMENSION: f64 = 8192.0;

/// Resizes an image.
#[derive(Debug, Clone)]
pub struct Resize;

impl Operation for Resize {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("resize")
            .description("Resize to the given width and height (height keeps the aspect ratio when omitted)")
            .category(Category::Transform)
            .argument(
                ArgumentDefinition::integer("width")
                    .with_description("Target width in pixels")
                    .with_range(1.0, MAX_DIMENSION),
            )
            .argument(
                ArgumentDefinition::integer("height")
                    .optional()
                    .with_description("Target height in pixels")
                    .with_range(1.0, MAX_DIMENSION),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let decoded = ctx.decode()?;
        let (src_width, src_height) = decoded.image.dimensions();

        let width = ctx.integer(0)? as u32;
        let height = match ctx.arguments().get(1) {
            Some(_) => ctx.integer(1)? as u32,
            None => {
                let scaled = (src_height as f64 * width as f64 / src_width as f64).round();
                if scaled > MAX_DIMENSION {
                    return Err(ctx.fail(format!(
                        "would make the image {} pixels tall, more than the {} limit",
                        scaled, MAX_DIMENSION
                    )));
                }
                (scaled as u32).max(1)
            }
        };

        if width == 0 || height == 0 {
            return Err(ctx.fail("width and height must be at least 1"));
        }

        let resized = decoded.image.resize_exact(width, height, FilterType::Lanczos3);
        ctx.finish(resized, decoded.format)
    }
}

/// Crops an image.
#[derive(Debug, Clone)]
pub struct Crop;

impl Operation for Crop {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("crop")
            .description("Cut out the region starting at x,y with the given width and height")
            .category(Category::Transform)
            .argument(
                ArgumentDefinition::integer("x")
                    .with_description("Left edge X coordinate")
                    .with_constraint(Constraint::NonNegative),
            )
            .argument(
                ArgumentDefinition::integer("y")
                    .with_description("Top edge Y coordinate")
                    .with_constraint(Constraint::NonNegative),
            )
            .argument(
                ArgumentDefinition::integer("width")
                    .with_description("Crop width")
                    .with_constraint(Constraint::Positive),
            )
            .argument(
                ArgumentDefinition::integer("height")
                    .with_description("Crop height")
                    .with_constraint(Constraint::Positive),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let x = ctx.integer(0)?;
        let y = ctx.integer(1)?;
        let width = ctx.integer(2)?;
        let height = ctx.integer(3)?;

        if x < 0 || y < 0 || width < 1 || height < 1 {
            return Err(ctx.fail("region must have a non-negative origin and a positive size"));
        }

        let decoded = ctx.decode()?;
        let (src_width, src_height) = decoded.image.dimensions();

        let right = x.checked_add(width);
        let bottom = y.checked_add(height);
        let fits = matches!((right, bottom), (Some(r), Some(b)) if r <= src_width as i64 && b <= src_height as i64);
        if !fits {
            return Err(ctx.fail(format!(
                "region {}x{} at ({}, {}) does not fit inside the {}x{} image",
                width, height, x, y, src_width, src_height
            )));
        }

        let cropped = decoded
            .image
            .crop_imm(x as u32, y as u32, width as u32, height as u32);
        ctx.finish(cropped, decoded.format)
    }
}

/// Rotates an image clockwise.
#[derive(Debug, Clone)]
pub struct Rotate;

impl Operation for Rotate {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("rotate")
            .description("Rotate clockwise by the given degrees (right angles are lossless)")
            .category(Category::Transform)
            .argument(
                ArgumentDefinition::float("degrees")
                    .with_description("Clockwise rotation angle")
                    .with_range(-360.0, 360.0),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let degrees = ctx.float(0)?.rem_euclid(360.0);
        let decoded = ctx.decode()?;

        let rotated = if is_angle(degrees, 0.0) || is_angle(degrees, 360.0) {
            decoded.image
        } else if is_angle(degrees, 90.0) {
            decoded.image.rotate90()
        } else if is_angle(degrees, 180.0) {
            decoded.image.rotate180()
        } else if is_angle(degrees, 270.0) {
            decoded.image.rotate270()
        } else {
            // Arbitrary angles keep the canvas size; uncovered corners are transparent.
            let rgba = decoded.image.to_rgba8();
            let theta = (degrees as f32).to_radians();
            let rotated = rotate_about_center(&rgba, theta, Interpolation::Bilinear, Rgba([0, 0, 0, 0]));
            DynamicImage::ImageRgba8(rotated)
        };

        ctx.finish(rotated, decoded.format)
    }
}

fn is_angle(value: f64, target: f64) -> bool {
    (value - target).abs() < 1e-6
}

/// Mirrors an image top to bottom.
#[derive(Debug, Clone)]
pub struct Flip;

impl Operation for Flip {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("flip")
            .description("Mirror the image vertically")
            .category(Category::Transform)
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let decoded = ctx.decode()?;
        ctx.finish(decoded.image.flipv(), decoded.format)
    }
}

/// Mirrors an image left to right.
#[derive(Debug, Clone)]
pub struct Flop;

impl Operation for Flop {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("flop")
            .description("Mirror the image horizontally")
            .category(Category::Transform)
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let decoded = ctx.decode()?;
        ctx.finish(decoded.image.fliph(), decoded.format)
    }
}

/// Shrinks an image to fit a square box.
#[derive(Debug, Clone)]
pub struct Thumbnail;

impl Operation for Thumbnail {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("thumbnail")
            .description("Fit the image inside a size x size box, keeping the aspect ratio")
            .category(Category::Transform)
            .argument(
                ArgumentDefinition::integer("size")
                    .with_description("Maximum width and height")
                    .with_range(1.0, 4096.0),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let size = ctx.integer(0)? as u32;
        let decoded = ctx.decode()?;
        ctx.finish(decoded.image.thumbnail(size, size), decoded.format)
    }
}
