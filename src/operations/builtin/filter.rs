//! Neighbourhood filters: Blur, Sharpen, Median

use super::common_tags;
use crate::core::argument::ArgumentDefinition;
use crate::core::context::OperationContext;
use crate::core::error::StepError;
use crate::core::operation::{Category, Operation, OperationMetadata};
use crate::core::types::PipelineValue;
use image::DynamicImage;
use imageproc::filter::median_filter;

/// Applies Gaussian blur.
#[derive(Debug, Clone)]
pub struct Blur;

impl Operation for Blur {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("blur")
            .description("Gaussian blur with the given sigma (default 3)")
            .category(Category::Filter)
            .argument(
                ArgumentDefinition::float("sigma")
                    .optional()
                    .with_description("Blur intensity (standard deviation)")
                    .with_range(0.3, 100.0),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let sigma = ctx.float_or(0, 3.0)? as f32;
        let decoded = ctx.decode()?;
        ctx.finish(decoded.image.blur(sigma), decoded.format)
    }
}

/// Sharpens with an unsharp mask.
#[derive(Debug, Clone)]
pub struct Sharpen;

impl Operation for Sharpen {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("sharpen")
            .description("Unsharp mask with the given sigma and threshold")
            .category(Category::Filter)
            .argument(
                ArgumentDefinition::float("sigma")
                    .optional()
                    .with_description("Mask blur sigma (default 1)")
                    .with_range(0.1, 20.0),
            )
            .argument(
                ArgumentDefinition::integer("threshold")
                    .optional()
                    .with_description("Minimum difference to sharpen (default 1)")
                    .with_range(0.0, 255.0),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let sigma = ctx.float_or(0, 1.0)? as f32;
        let threshold = ctx.integer_or(1, 1)? as i32;
        let decoded = ctx.decode()?;
        ctx.finish(decoded.image.unsharpen(sigma, threshold), decoded.format)
    }
}

/// Median filter, good for removing speckle noise.
#[derive(Debug, Clone)]
pub struct Median;

impl Operation for Median {
    fn metadata(&self) -> OperationMetadata {
        OperationMetadata::builder("median")
            .description("Replace each pixel by the median of its neighbourhood")
            .category(Category::Filter)
            .argument(
                ArgumentDefinition::integer("radius")
                    .optional()
                    .with_description("Neighbourhood radius (default 1)")
                    .with_range(1.0, 20.0),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let radius = ctx.integer_or(0, 1)? as u32;
        let decoded = ctx.decode()?;
        let filtered = median_filter(&decoded.image.to_rgba8(), radius, radius);
        ctx.finish(DynamicImage::ImageRgba8(filtered), decoded.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::tests::png_bytes;
    use crate::core::types::{Argument, TagSet};

    fn dimensions_after(op: &dyn Operation, args: &[Argument]) -> (u32, u32) {
        let input = png_bytes(12, 8);
        let tags = TagSet::new();
        let ctx = OperationContext::new("test", &input, &tags, args);
        let (_, info) = op.execute(&ctx).unwrap().into_terminal().unwrap();
        (info.width, info.height)
    }

    #[test]
    fn test_filters_keep_dimensions() {
        assert_eq!(dimensions_after(&Blur, &[]), (12, 8));
        assert_eq!(dimensions_after(&Blur, &[Argument::Float(1.5)]), (12, 8));
        assert_eq!(dimensions_after(&Sharpen, &[Argument::Float(2.0), Argument::Integer(4)]), (12, 8));
        assert_eq!(dimensions_after(&Median, &[Argument::Integer(2)]), (12, 8));
    }

    #[test]
    fn test_optional_arguments() {
        assert_eq!(Blur.metadata().required_arguments(), 0);
        assert_eq!(Sharpen.metadata().arguments.len(), 2);
    }
}
