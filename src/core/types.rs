//! Core value types that flow through a pipeline run.
//!
//! The running image is modelled as an explicit two-state enum rather than a
//! loosely shaped value:
//! - `Intermediate` carries bytes only and is what every non-final step feeds forward
//! - `Terminal` carries bytes plus the metadata reported back to the requester

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// A positional argument parsed from command text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Argument {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// Free text token
    Text(String),
}

/// The kind of value an operation expects at a given argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    Integer,
    Float,
    Text,
}

/// One parsed `(operation, arguments)` pair.
///
/// Only the parser creates invocations, and it only does so for names the
/// registry resolves. Fields are private so an invocation cannot be altered
/// once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    operation: String,
    arguments: Vec<Argument>,
}

/// Modifier tags shared by every step of one run.
///
/// Tags are stored without their marker and lower-cased. Iteration order is
/// lexical, which keeps logs and equality checks deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<String>);

/// Metadata describing an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoded size in bytes
    pub size: usize,
    /// Encoding of the bytes
    pub format: OutputFormat,
}

/// The artifact threaded through the operation chain.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineValue {
    /// Encoded image bytes without metadata.
    Intermediate(Vec<u8>),
    /// Encoded image bytes plus the metadata of the final image.
    Terminal {
        /// Encoded image
        data: Vec<u8>,
        /// Dimensions and size of `data`
        info: ImageInfo,
    },
}

/// Where the initial image of a run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// `http(s)://` or `data:` URL
    Url(String),
    /// Local file
    Path(PathBuf),
    /// Already-fetched bytes
    Bytes(Vec<u8>),
}

/// Image encodings the pipeline can produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    WebP,
    Gif,
    Bmp,
    Tiff,
}

/// Identifier of one pipeline run, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

// ============================================================================
// Argument Implementation
// ============================================================================

impl Argument {
    /// Get the kind of this argument.
    pub fn kind(&self) -> ArgumentKind {
        match self {
            Argument::Integer(_) => ArgumentKind::Integer,
            Argument::Float(_) => ArgumentKind::Float,
            Argument::Text(_) => ArgumentKind::Text,
        }
    }

    /// Try to get this argument as an integer.
    pub fn as_integer(&self) -> Option<i64> {
        if let Argument::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Try to get this argument as a float (integers are widened).
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Argument::Float(f) => Some(*f),
            Argument::Integer(i) => Some(*i as f64),
            Argument::Text(_) => None,
        }
    }

    /// Try to get this argument as text.
    pub fn as_text(&self) -> Option<&str> {
        if let Argument::Text(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Numeric view used by range constraints.
    pub fn numeric(&self) -> Option<f64> {
        self.as_float()
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Integer(i) => write!(f, "{}", i),
            Argument::Float(v) => write!(f, "{}", v),
            Argument::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Argument {
    fn from(v: i64) -> Self {
        Argument::Integer(v)
    }
}

impl From<f64> for Argument {
    fn from(v: f64) -> Self {
        Argument::Float(v)
    }
}

impl From<&str> for Argument {
    fn from(v: &str) -> Self {
        Argument::Text(v.to_string())
    }
}

impl ArgumentKind {
    /// Parse a raw token as this kind.
    pub fn parse_token(&self, token: &str) -> Option<Argument> {
        match self {
            ArgumentKind::Integer => token.parse::<i64>().ok().map(Argument::Integer),
            ArgumentKind::Float => token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Argument::Float),
            ArgumentKind::Text => Some(Argument::Text(token.to_string())),
        }
    }
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentKind::Integer => write!(f, "integer"),
            ArgumentKind::Float => write!(f, "number"),
            ArgumentKind::Text => write!(f, "text"),
        }
    }
}

// ============================================================================
// Invocation / TagSet
// ============================================================================

impl Invocation {
    pub(crate) fn new(operation: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            operation: operation.into(),
            arguments,
        }
    }

    /// Registry name of the operation to run.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Positional arguments in declaration order.
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        for arg in &self.arguments {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl TagSet {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tag; returns false if it was already present.
    pub fn insert(&mut self, tag: impl AsRef<str>) -> bool {
        self.0.insert(tag.as_ref().to_ascii_lowercase())
    }

    /// Check whether a tag is present (case-insensitive).
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(&tag.to_ascii_lowercase())
    }

    /// Iterate tags in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no tags are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = TagSet::new();
        for tag in iter {
            tags.insert(tag);
        }
        tags
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", joined.join(", "))
    }
}

// ============================================================================
// PipelineValue
// ============================================================================

impl PipelineValue {
    /// Build a terminal value.
    pub fn terminal(data: Vec<u8>, info: ImageInfo) -> Self {
        PipelineValue::Terminal { data, info }
    }

    /// Borrow the encoded bytes regardless of shape.
    pub fn bytes(&self) -> &[u8] {
        match self {
            PipelineValue::Intermediate(data) => data,
            PipelineValue::Terminal { data, .. } => data,
        }
    }

    /// Keep only the bytes, discarding any metadata.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            PipelineValue::Intermediate(data) => data,
            PipelineValue::Terminal { data, .. } => data,
        }
    }

    /// Split a terminal value into bytes and metadata.
    pub fn into_terminal(self) -> Option<(Vec<u8>, ImageInfo)> {
        match self {
            PipelineValue::Terminal { data, info } => Some((data, info)),
            PipelineValue::Intermediate(_) => None,
        }
    }

    /// Check if this value carries metadata.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineValue::Terminal { .. })
    }
}

// ============================================================================
// ImageSource
// ============================================================================

impl ImageSource {
    /// Classify a textual attachment reference.
    ///
    /// `http://`, `https://` and `data:` prefixes are URLs; anything else is a
    /// filesystem path.
    pub fn from_reference(reference: &str) -> Self {
        let lower = reference.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:") {
            ImageSource::Url(reference.to_string())
        } else {
            ImageSource::Path(PathBuf::from(reference))
        }
    }

    /// Short description for logs (never includes payload bytes).
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Url(url) if url.starts_with("data:") => "data URL".to_string(),
            ImageSource::Url(url) => url.clone(),
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes(bytes) => format!("{} bytes in memory", bytes.len()),
        }
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

// ============================================================================
// OutputFormat
// ============================================================================

impl OutputFormat {
    /// All formats, in the order tags are checked.
    pub fn all() -> &'static [OutputFormat] {
        &[
            OutputFormat::Png,
            OutputFormat::Jpeg,
            OutputFormat::WebP,
            OutputFormat::Gif,
            OutputFormat::Bmp,
            OutputFormat::Tiff,
        ]
    }

    /// Parse a format name (`jpg` is accepted for JPEG).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpeg" | "jpg" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::WebP),
            "gif" => Some(OutputFormat::Gif),
            "bmp" => Some(OutputFormat::Bmp),
            "tiff" | "tif" => Some(OutputFormat::Tiff),
            _ => None,
        }
    }

    /// Canonical lower-case name, also used as a tag.
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::WebP => "webp",
            OutputFormat::Gif => "gif",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Tiff => "tiff",
        }
    }

    /// Alternative spellings accepted as tags.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            OutputFormat::Jpeg => &["jpg"],
            OutputFormat::Tiff => &["tif"],
            _ => &[],
        }
    }

    /// Pick the output format requested by the run's tags, if any.
    pub fn from_tags(tags: &TagSet) -> Option<Self> {
        Self::all().iter().copied().find(|format| {
            tags.contains(format.name()) || format.aliases().iter().any(|alias| tags.contains(alias))
        })
    }

    /// Map from the `image` crate's detected format.
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(OutputFormat::Png),
            image::ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            image::ImageFormat::WebP => Some(OutputFormat::WebP),
            image::ImageFormat::Gif => Some(OutputFormat::Gif),
            image::ImageFormat::Bmp => Some(OutputFormat::Bmp),
            image::ImageFormat::Tiff => Some(OutputFormat::Tiff),
            _ => None,
        }
    }

    /// Convert to the `image` crate's format.
    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::WebP => image::ImageFormat::WebP,
            OutputFormat::Gif => image::ImageFormat::Gif,
            OutputFormat::Bmp => image::ImageFormat::Bmp,
            OutputFormat::Tiff => image::ImageFormat::Tiff,
        }
    }

    /// File extension for saved results.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            other => other.name(),
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Png
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// RunId
// ============================================================================

impl RunId {
    /// Create a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}
