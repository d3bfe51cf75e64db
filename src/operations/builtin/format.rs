//! Encoding operation: Format

use super::common_tags;
use crate::core::argument::{ArgumentDefinition, Constraint};
use crate::core::context::OperationContext;
use crate::core::error::StepError;
use crate::core::operation::{Category, Operation, OperationMetadata};
use crate::core::types::{OutputFormat, PipelineValue};

/// Re-encodes the image in another format.
#[derive(Debug, Clone)]
pub struct Format;

impl Operation for Format {
    fn metadata(&self) -> OperationMetadata {
        let mut names = Vec::new();
        for format in OutputFormat::all() {
            names.push(format.name().to_string());
            names.extend(format.aliases().iter().map(|a| a.to_string()));
        }

        OperationMetadata::builder("format")
            .description("Re-encode the image (png, jpeg, webp, gif, bmp, tiff)")
            .category(Category::Format)
            .argument(
                ArgumentDefinition::text("name")
                    .with_description("Target encoding")
                    .with_constraint(Constraint::OneOf(names)),
            )
            .tags(common_tags())
            .build()
    }

    fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
        let name = ctx.text(0)?;
        let format = OutputFormat::from_name(name)
            .ok_or_else(|| ctx.fail(format!("does not know the format '{}'", name)))?;
        let decoded = ctx.decode()?;
        ctx.finish_as(decoded.image, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::tests::png_bytes;
    use crate::core::types::{Argument, TagSet};

    #[test]
    fn test_format_overrides_tag() {
        let input = png_bytes(6, 6);
        let tags: TagSet = ["png"].into_iter().collect();
        let args = [Argument::from("jpg")];
        let ctx = OperationContext::new("format", &input, &tags, &args);

        let (data, info) = Format.execute(&ctx).unwrap().into_terminal().unwrap();
        assert_eq!(info.format, OutputFormat::Jpeg);
        assert_eq!(image::guess_format(&data).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn test_unknown_format_is_operation_error() {
        let input = png_bytes(6, 6);
        let tags = TagSet::new();
        let args = [Argument::from("heic")];
        let ctx = OperationContext::new("format", &input, &tags, &args);

        match Format.execute(&ctx) {
            Err(StepError::Operation(e)) => assert_eq!(e.operation, "format"),
            other => panic!("expected operation error, got {:?}", other.map(|v| v.is_terminal())),
        }
    }
}
