//! Chat-facing facade.
//!
//! [`Imager`] owns a parser and an executor and turns one chat request into
//! the reply the bot should post. Sending the reply is left to the transport.

use crate::config::ImagerConfig;
use crate::core::error::{PipelineError, GENERIC_FAILURE_MESSAGE};
use crate::core::types::{ImageInfo, ImageSource, OutputFormat};
use crate::operations::registry::OperationRegistry;
use crate::parser::CommandParser;
use crate::pipeline::PipelineExecutor;
use crate::source::{DefaultFetcher, ImageFetcher};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// A command message with its image attachment.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Message text.
    pub text: String,
    /// Where the attached image lives.
    pub attachment: ImageSource,
    /// Attachment file name.
    pub filename: String,
}

/// What to post back.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    /// The text named no operations.
    NoCommands { message: String },
    /// The processed image.
    Image {
        #[serde(skip)]
        data: Vec<u8>,
        filename: String,
        caption: String,
        info: ImageInfo,
    },
    /// The run failed; messages are posted in order.
    Failure { messages: Vec<String> },
}

impl Reply {
    /// Text lines of this reply, in posting order.
    pub fn messages(&self) -> Vec<&str> {
        match self {
            Reply::NoCommands { message } => vec![message.as_str()],
            Reply::Image { caption, .. } => vec![caption.as_str()],
            Reply::Failure { messages } => messages.iter().map(String::as_str).collect(),
        }
    }
}

/// Parses chat commands and runs them against attachments.
#[derive(Clone)]
pub struct Imager {
    parser: CommandParser,
    executor: PipelineExecutor,
    config: ImagerConfig,
}

impl Imager {
    /// Create an imager with the builtin operations.
    pub fn new(config: ImagerConfig) -> Self {
        Self::with_registry(config, OperationRegistry::with_builtins().into_shared())
    }

    /// Create an imager over a custom registry.
    pub fn with_registry(config: ImagerConfig, registry: Arc<OperationRegistry>) -> Self {
        let parser = CommandParser::new(registry.clone()).with_options(config.parser_options());
        let executor = PipelineExecutor::new(registry)
            .with_fetcher(Arc::new(DefaultFetcher::from_config(&config)))
            .with_options(config.execution_options());
        Self {
            parser,
            executor,
            config,
        }
    }

    /// Replace the attachment fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.executor = self.executor.with_fetcher(fetcher);
        self
    }

    /// Replace the executor, e.g. to attach a progress callback.
    pub fn with_executor(mut self, executor: PipelineExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// The command parser.
    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    /// The pipeline executor.
    pub fn executor(&self) -> &PipelineExecutor {
        &self.executor
    }

    /// Active configuration.
    pub fn config(&self) -> &ImagerConfig {
        &self.config
    }

    /// Handle one request.
    pub fn handle(&self, request: &CommandRequest) -> Reply {
        let parsed = self.parser.parse(&request.text);

        if parsed.is_empty() {
            log::debug!(
                "[Imager] Received an image but no commands [{}]",
                request.filename
            );
            return Reply::NoCommands {
                message: self.no_commands_message(),
            };
        }

        log::debug!(
            "[Imager] Running [{}] with tags [{}] on {}",
            parsed
                .invocations
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            parsed.tags,
            request.filename
        );

        match self
            .executor
            .run(&parsed.invocations, &parsed.tags, &request.attachment)
        {
            Ok(output) => {
                let filename = output_filename(&request.filename, output.info.format);
                let caption = caption(&filename, &output.info);
                Reply::Image {
                    data: output.data,
                    filename,
                    caption,
                    info: output.info,
                }
            }
            Err(error) => Reply::Failure {
                messages: failure_messages(&error),
            },
        }
    }

    /// Message sent when a request names no operations.
    pub fn no_commands_message(&self) -> String {
        format!(
            "You didn't specify any commands. Type `{}image` to see the available commands.",
            self.config.command_prefix
        )
    }

    /// Help listing every operation, its arguments and the known tags.
    pub fn help_text(&self) -> String {
        let registry = self.parser.registry();
        let marker = self.config.tag_marker;
        let mut text = format!(
            "Mention me with an image and a list of commands, e.g. `resize 200 crop 0 0 100 100 {}grayscale`.\n",
            marker
        );

        let mut tags: Vec<&str> = Vec::new();
        for (category, operations) in registry.grouped_by_category() {
            text.push_str(&format!("\n**{}**\n", category.display_name()));
            for metadata in operations {
                text.push_str(&format!("`{}`", metadata.usage()));
                if !metadata.aliases.is_empty() {
                    text.push_str(&format!(" (also: {})", metadata.aliases.join(", ")));
                }
                if !metadata.description.is_empty() {
                    text.push_str(&format!(": {}", metadata.description));
                }
                text.push('\n');

                for tag in &metadata.tags {
                    if !tags.contains(&tag.as_str()) {
                        tags.push(tag);
                    }
                }
            }
        }

        if !tags.is_empty() {
            let tags: Vec<String> = tags.iter().map(|t| format!("{}{}", marker, t)).collect();
            text.push_str(&format!("\n**Tags**\n{}\n", tags.join(" ")));
        }

        text
    }
}

/// Messages to post for a failed run.
pub fn failure_messages(error: &PipelineError) -> Vec<String> {
    let mut messages = vec![format!(":dizzy_face: {}", GENERIC_FAILURE_MESSAGE)];
    if error.is_user_facing() {
        messages.push(error.user_message());
    }
    messages
}

/// Caption for a processed image.
pub fn caption(filename: &str, info: &ImageInfo) -> String {
    format!(
        ":frame_photo: {} | {}x{} | {}",
        filename,
        info.width,
        info.height,
        human_size(info.size)
    )
}

/// Format a byte count with decimal units, e.g. `1.5 KB`.
pub fn human_size(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1000 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    // Move up while the value, rounded to two decimals, still reaches 1000.
    while unit < UNITS.len() - 1 && (value * 100.0).round() / 100.0 >= 1000.0 {
        value /= 1000.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Keep the attachment's name, swapping the extension when the encoding changed.
pub fn output_filename(filename: &str, format: OutputFormat) -> String {
    let path = Path::new(filename);
    let current = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(OutputFormat::from_name);

    if current == Some(format) {
        return filename.to_string();
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{}.{}", stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::tests::png_bytes;
    use crate::core::error::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        data: Vec<u8>,
    }

    impl ImageFetcher for CountingFetcher {
        fn fetch(&self, _source: &ImageSource) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.data.clone())
        }
    }

    fn imager_with(data: Vec<u8>) -> (Imager, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            data,
        });
        let imager = Imager::new(ImagerConfig::default()).with_fetcher(fetcher.clone());
        (imager, fetcher)
    }

    fn request(text: &str) -> CommandRequest {
        CommandRequest {
            text: text.to_string(),
            attachment: ImageSource::Url("https://cdn.example.com/cat.png".to_string()),
            filename: "cat.png".to_string(),
        }
    }

    #[test]
    fn test_tags_only_never_runs() {
        let (imager, fetcher) = imager_with(png_bytes(10, 10));

        match imager.handle(&request("#grayscale")) {
            Reply::NoCommands { message } => assert_eq!(
                message,
                "You didn't specify any commands. Type `!image` to see the available commands."
            ),
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_successful_reply() {
        let (imager, fetcher) = imager_with(png_bytes(200, 150));

        match imager.handle(&request("@bot resize 100 100 crop 10 10 50 50 #grayscale")) {
            Reply::Image {
                data,
                filename,
                caption,
                info,
            } => {
                assert_eq!(filename, "cat.png");
                assert_eq!((info.width, info.height), (50, 50));
                assert_eq!(info.size, data.len());
                assert!(caption.starts_with(":frame_photo: cat.png | 50x50 | "));
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_operation_failure_reply() {
        let (imager, _) = imager_with(png_bytes(20, 20));

        let reply = imager.handle(&request("crop 10 10 50 50"));
        let messages = reply.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ":dizzy_face: Oops, something went wrong.");
        assert!(messages[1].starts_with("crop "));
    }

    struct FailingFetcher;

    impl ImageFetcher for FailingFetcher {
        fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::Http {
                url: source.describe(),
                reason: "connection reset by 10.0.0.7".to_string(),
            })
        }
    }

    #[test]
    fn test_unexpected_failure_reply_is_generic() {
        let imager = Imager::new(ImagerConfig::default()).with_fetcher(Arc::new(FailingFetcher));

        let reply = imager.handle(&request("flip"));
        assert_eq!(reply.messages(), vec![":dizzy_face: Oops, something went wrong."]);
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(999), "999 B");
        assert_eq!(human_size(1000), "1 KB");
        assert_eq!(human_size(1500), "1.5 KB");
        assert_eq!(human_size(2_345_678), "2.35 MB");
        assert_eq!(human_size(999_999), "1 MB");
        assert_eq!(human_size(999_994), "999.99 KB");
        assert_eq!(human_size(999_999_999), "1 GB");
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(output_filename("cat.png", OutputFormat::Png), "cat.png");
        assert_eq!(output_filename("cat.JPG", OutputFormat::Jpeg), "cat.JPG");
        assert_eq!(output_filename("cat.png", OutputFormat::Jpeg), "cat.jpg");
        assert_eq!(output_filename("", OutputFormat::WebP), "image.webp");
    }

    #[test]
    fn test_help_lists_operations_and_tags() {
        let help = Imager::new(ImagerConfig::default()).help_text();
        assert!(help.contains("`resize <width> [height]`"));
        assert!(help.contains("(also: greyscale)"));
        assert!(help.contains("#grayscale"));
        assert!(help.contains("**Transform**"));
    }
}
