//! Colour operations: Grayscale, Invert, Brightness, Contrast, Hue

use super::common_tags;
use crate::core::argument::ArgumentDefinition;
use crate::core::context::OperationContext;
use crate::core::error::StepError;
use crate::core::operation::{Category, Operation, OperationMetadata};
use crate::core::types::PipelineValue;

/// Converts an image to grayscale.
#[derive(Debug, Clone)]
pub struct Grayscale;

impl Operation for Grayscale {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("grayscale")
            .alias("greyscale")
            .description("Convert the image to grayscale")
            .category(Category::Color)
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let decoded = ctx.decode()?;
        ctx.finish(decoded.image.grayscale(), decoded.format)
    }
}

/// Inverts colours, leaving alpha untouched.
#[derive(Debug, Clone)]
pub struct Invert;

impl Operation for Invert {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("invert")
            .alias("negate")
            .description("Invert every colour channel")
            .category(Category::Color)
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let decoded = ctx.decode()?;
        let mut image = decoded.image;
        image.invert();
        ctx.finish(image, decoded.format)
    }
}

/// Adjusts brightness.
#[derive(Debug, Clone)]
pub struct Brightness;

impl Operation for Brightness {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("brightness")
            .description("Brighten (positive) or darken (negative) the image")
            .category(Category::Color)
            .argument(
                ArgumentDefinition::integer("amount")
                    .with_description("Value added to every channel (-255 to 255)")
                    .with_range(-255.0, 255.0),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let amount = ctx.integer(0)? as i32;
        let decoded = ctx.decode()?;
        ctx.finish(decoded.image.brighten(amount), decoded.format)
    }
}

/// Adjusts contrast.
#[derive(Debug, Clone)]
pub struct Contrast;

impl Operation for Contrast {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("contrast")
            .description("Increase (positive) or decrease (negative) contrast")
            .category(Category::Color)
            .argument(
                ArgumentDefinition::float("amount")
                    .with_description("Contrast change in percent (-100 to 100)")
                    .with_range(-100.0, 100.0),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let amount = ctx.float(0)? as f32;
        let decoded = ctx.decode()?;
        ctx.finish(decoded.image.adjust_contrast(amount), decoded.format)
    }
}

/// Rotates the hue of every pixel.
#[derive(Debug, Clone)]
pub struct Hue;

impl Operation for Hue {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("hue")
            .description("Rotate the hue by the given degrees")
            .category(Category::Color)
            .argument(
                ArgumentDefinition::integer("degrees")
                    .with_description("Hue rotation (-360 to 360)")
                    .with_range(-360.0, 360.0),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let degrees = ctx.integer(0)? as i32;
        let decoded = ctx.decode()?;
        ctx.finish(decoded.image.huerotate(degrees), decoded.format)
    }
}
