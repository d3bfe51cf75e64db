//! Builtin operation implementations.
//!
//! The catalog is closed and enumerable through [`Builtin`]; adding an
//! operation means one new implementation plus one new variant.

mod color;
mod filter;
mod format;
mod transform;

use crate::core::operation::Operation;
use crate::operations::registry::OperationRegistry;

pub use color::{Brightness, Contrast, Grayscale, Hue, Invert};
pub use filter::{Blur, Median, Sharpen};
pub use format::Format;
pub use transform::{Crop, Flip, Flop, Resize, Rotate, Thumbnail};

/// The builtin operation catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Resize,
    Crop,
    Rotate,
    Flip,
    Flop,
    Thumbnail,
    Grayscale,
    Invert,
    Brightness,
    Contrast,
    Hue,
    Blur,
    Sharpen,
    Median,
    Format,
}

impl Builtin {
    /// Every builtin, in registration order.
    pub fn all() -> &'static [Builtin] {
        &[
            Builtin::Resize,
            Builtin::Crop,
            Builtin::Rotate,
            Builtin::Flip,
            Builtin::Flop,
            Builtin::Thumbnail,
            Builtin::Grayscale,
            Builtin::Invert,
            Builtin::Brightness,
            Builtin::Contrast,
            Builtin::Hue,
            Builtin::Blur,
            Builtin::Sharpen,
            Builtin::Median,
            Builtin::Format,
        ]
    }

    /// Command name of this builtin.
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Resize => "resize",
            Builtin::Crop => "crop",
            Builtin::Rotate => "rotate",
            Builtin::Flip => "flip",
            Builtin::Flop => "flop",
            Builtin::Thumbnail => "thumbnail",
            Builtin::Grayscale => "grayscale",
            Builtin::Invert => "invert",
            Builtin::Brightness => "brightness",
            Builtin::Contrast => "contrast",
            Builtin::Hue => "hue",
            Builtin::Blur => "blur",
            Builtin::Sharpen => "sharpen",
            Builtin::Median => "median",
            Builtin::Format => "format",
        }
    }

    /// Look up a builtin by command name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|b| b.name().eq_ignore_ascii_case(name))
    }

    /// Create the implementation for this builtin.
    pub fn operation(&self) -> Box<dyn Operation> {
        match self {
            Builtin::Resize => Box::new(Resize),
            Builtin::Crop => Box::new(Crop),
            Builtin::Rotate => Box::new(Rotate),
            Builtin::Flip => Box::new(Flip),
            Builtin::Flop => Box::new(Flop),
            Builtin::Thumbnail => Box::new(Thumbnail),
            Builtin::Grayscale => Box::new(Grayscale),
            Builtin::Invert => Box::new(Invert),
            Builtin::Brightness => Box::new(Brightness),
            Builtin::Contrast => Box::new(Contrast),
            Builtin::Hue => Box::new(Hue),
            Builtin::Blur => Box::new(Blur),
            Builtin::Sharpen => Box::new(Sharpen),
            Builtin::Median => Box::new(Median),
            Builtin::Format => Box::new(Format),
        }
    }
}

/// Register all builtin operations.
pub fn register_all(registry: &mut OperationRegistry) {
    for builtin in Builtin::all() {
        registry.register_shared(builtin.operation().into());
    }
}

/// Tags every builtin reacts to through `OperationContext::finish`.
pub(crate) fn common_tags() -> Vec<String> {
    let mut tags: Vec<String> = crate::core::context::GRAYSCALE_TAGS
        .iter()
        .map(|t| t.to_string())
        .collect();
    for format in crate::core::types::OutputFormat::all() {
        tags.push(format.name().to_string());
        tags.extend(format.aliases().iter().map(|a| a.to_string()));
    }
    tags
}
