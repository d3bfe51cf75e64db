//! Pipeline executor implementation.
//!
//! A run fetches the attachment, then folds it through the invocations in
//! order. Each step sees exactly the bytes the previous step produced; the
//! final step must report full image metadata.

use crate::core::context::OperationContext;
use crate::core::error::{PipelineError, StepError};
use crate::core::types::{ImageInfo, ImageSource, Invocation, PipelineValue, RunId, TagSet};
use crate::operations::registry::OperationRegistry;
use crate::pipeline::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
use crate::source::{DefaultFetcher, ImageFetcher};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Execution options.
#[derive(Clone, Default)]
pub struct ExecutionOptions {
    /// Progress callback.
    pub progress_callback: Option<Arc<ProgressCallback>>,
    /// Decoded pixel budget (width * height * 4) for the fetched image.
    pub max_input_bytes: Option<u64>,
}

impl std::fmt::Debug for ExecutionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionOptions")
            .field("progress_callback", &self.progress_callback.as_ref().map(|_| "<callback>"))
            .field("max_input_bytes", &self.max_input_bytes)
            .finish()
    }
}

impl ExecutionOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }

    /// Limit the decoded size of the fetched image.
    pub fn with_max_input_bytes(mut self, limit: u64) -> Self {
        self.max_input_bytes = Some(limit);
        self
    }
}

/// Execution statistics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    /// Total run time, fetch included.
    pub total_duration: Duration,
    /// Number of steps executed.
    pub steps_executed: usize,
    /// Duration of each step in chain order.
    pub step_durations: Vec<Duration>,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Encoded output image.
    pub data: Vec<u8>,
    /// Metadata reported by the final step.
    pub info: ImageInfo,
    /// Identifier used in this run's log records.
    pub run_id: RunId,
    /// Execution statistics.
    pub stats: ExecutionStats,
}

/// Runs invocation chains against an operation registry.
///
/// The executor holds no per-run state, so one instance can serve any number
/// of concurrent runs.
#[derive(Clone)]
pub struct PipelineExecutor {
    registry: Arc<OperationRegistry>,
    fetcher: Arc<dyn ImageFetcher>,
    options: ExecutionOptions,
}

impl PipelineExecutor {
    /// Create an executor with the default fetcher.
    pub fn new(registry: Arc<OperationRegistry>) -> Self {
        Self {
            registry,
            fetcher: Arc::new(DefaultFetcher::new()),
            options: ExecutionOptions::default(),
        }
    }

    /// Replace the image fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Set execution options.
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// The registry operations are resolved against.
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    /// Execute a chain against a source image.
    pub fn run(
        &self,
        invocations: &[Invocation],
        tags: &TagSet,
        source: &ImageSource,
    ) -> Result<PipelineOutput, PipelineError> {
        let Some((final_step, leading)) = invocations.split_last() else {
            return Err(PipelineError::NoOperations);
        };

        let run_id = RunId::new();
        let start_time = Instant::now();

        let mut tracker = ProgressTracker::new(invocations.len());
        if let Some(callback) = &self.options.progress_callback {
            tracker = tracker.with_callback(callback.clone());
        }
        tracker.start();

        log::debug!(
            "[Executor] Run {} started: {} step(s) on {}",
            run_id,
            invocations.len(),
            source.describe()
        );

        let mut current = self.fetcher.fetch(source).map_err(|e| {
            let error = PipelineError::from(e);
            log::error!("[Executor] Run {} could not fetch {}: {}", run_id, source.describe(), error);
            // Nothing ran; the chain stops before its first step.
            let first = invocations[0].operation();
            tracker.step_failed(0, first, error.user_message());
            error
        })?;

        for (index, invocation) in leading.iter().enumerate() {
            current = self
                .step(run_id, &tracker, index, invocation, &current, tags)?
                .into_bytes();
        }

        let index = leading.len();
        let name = final_step.operation();
        let value = self.step(run_id, &tracker, index, final_step, &current, tags)?;
        let Some((data, info)) = value.into_terminal() else {
            let error = PipelineError::unexpected_in(
                name,
                anyhow::anyhow!("final step returned bytes without image metadata"),
            );
            return Err(self.fail(run_id, &tracker, index, name, error));
        };

        let stats = ExecutionStats {
            total_duration: start_time.elapsed(),
            steps_executed: tracker.completed_steps(),
            step_durations: tracker.step_durations(),
        };
        tracker.complete();

        log::debug!(
            "[Executor] Run {} finished: {}x{} {} ({} bytes) in {:?}",
            run_id,
            info.width,
            info.height,
            info.format,
            info.size,
            stats.total_duration
        );

        Ok(PipelineOutput {
            data,
            info,
            run_id,
            stats,
        })
    }

    /// Resolve and execute one invocation, reporting progress.
    fn step(
        &self,
        run_id: RunId,
        tracker: &ProgressTracker,
        index: usize,
        invocation: &Invocation,
        input: &[u8],
        tags: &TagSet,
    ) -> Result<PipelineValue, PipelineError> {
        let name = invocation.operation();
        tracker.step_started(index, name);

        let Some(operation) = self.registry.resolve(name) else {
            let error = PipelineError::unexpected_in(
                name,
                anyhow::anyhow!("operation is not registered"),
            );
            return Err(self.fail(run_id, tracker, index, name, error));
        };

        // The pixel budget guards the fetched image only.
        let limit = if index == 0 {
            self.options.max_input_bytes
        } else {
            None
        };

        let ctx = OperationContext::new(name, input, tags, invocation.arguments())
            .with_step(index)
            .with_max_decoded_bytes(limit);

        let started = Instant::now();
        let value = operation.execute(&ctx).map_err(|e| {
            let error = match e {
                StepError::Operation(error) => PipelineError::Operation(error),
                StepError::Unexpected(cause) => PipelineError::unexpected_in(name, cause),
            };
            self.fail(run_id, tracker, index, name, error)
        })?;
        let duration = started.elapsed();

        tracker.step_completed(index, name, duration);
        log::debug!(
            "[Executor] Run {} step {} '{}' took {:?} ({:.0}% done)",
            run_id,
            index,
            name,
            duration,
            tracker.progress_percent()
        );
        Ok(value)
    }

    fn fail(
        &self,
        run_id: RunId,
        tracker: &ProgressTracker,
        index: usize,
        operation: &str,
        error: PipelineError,
    ) -> PipelineError {
        match &error {
            PipelineError::Unexpected { cause, .. } => {
                log::error!(
                    "[Executor] Run {} failed at step {} '{}': {:?}",
                    run_id,
                    index,
                    operation,
                    cause
                );
            }
            _ => log::debug!("[Executor] Run {} stopped at step {}: {}", run_id, index, error),
        }
        tracker.step_failed(index, operation, error.user_message());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::argument::ArgumentDefinition;
    use crate::core::context::tests::png_bytes;
    use crate::core::error::{FetchError, GENERIC_FAILURE_MESSAGE};
    use crate::core::operation::{Operation, OperationMetadata};
    use crate::core::types::{Argument, OutputFormat};
    use crate::operations::registry::RegistryBuilder;
    use crate::parser::CommandParser;
    use parking_lot::Mutex;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Journal = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

    /// Appends its argument byte and records what it was given.
    struct Append {
        journal: Journal,
    }

    impl Operation for Append {
        fn metadata(&self) -> OperationMetadata {
            OperationMetadata::builder("append")
                .argument(ArgumentDefinition::integer("byte"))
                .build()
        }

        fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
            self.journal
                .lock()
                .push(("append".to_string(), ctx.input().to_vec()));
            let mut data = ctx.input().to_vec();
            data.push(ctx.integer(0)? as u8);
            let info = ImageInfo {
                width: 1,
                height: 1,
                size: data.len(),
                format: OutputFormat::Png,
            };
            Ok(PipelineValue::terminal(data, info))
        }
    }

    /// Passes bytes through without metadata.
    struct Raw {
        journal: Journal,
    }

    impl Operation for Raw {
        fn metadata(&self) -> OperationMetadata {
            OperationMetadata::builder("raw").build()
        }

        fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
            self.journal.lock().push(("raw".to_string(), ctx.input().to_vec()));
            Ok(PipelineValue::Intermediate(ctx.input().to_vec()))
        }
    }

    struct Reject;

    impl Operation for Reject {
        fn metadata(&self) -> OperationMetadata {
            OperationMetadata::builder("reject").build()
        }

        fn execute(&self, ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
            Err(ctx.fail("refuses this image"))
        }
    }

    struct Explode;

    impl Operation for Explode {
        fn metadata(&self) -> OperationMetadata {
            OperationMetadata::builder("explode").build()
        }

        fn execute(&self, _ctx: &OperationContext<'_>) -> Result<PipelineValue, StepError> {
            Err(StepError::unexpected("socket closed by 10.0.0.7"))
        }
    }

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl ImageFetcher for CountingFetcher {
        fn fetch(&self, _source: &ImageSource) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0])
        }
    }

    fn instrumented() -> (PipelineExecutor, Journal) {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let registry = RegistryBuilder::new()
            .with_builtins(false)
            .register(Append {
                journal: journal.clone(),
            })
            .register(Raw {
                journal: journal.clone(),
            })
            .register(Reject)
            .register(Explode)
            .build();
        (PipelineExecutor::new(registry), journal)
    }

    fn append(byte: i64) -> Invocation {
        Invocation::new("append", vec![Argument::Integer(byte)])
    }

    fn bare(name: &str) -> Invocation {
        Invocation::new(name, vec![])
    }

    fn seed() -> ImageSource {
        ImageSource::Bytes(vec![0])
    }

    #[test]
    fn test_each_step_sees_previous_output() {
        let (executor, journal) = instrumented();
        let chain = [append(1), bare("raw"), append(2), append(3)];

        let output = executor.run(&chain, &TagSet::new(), &seed()).unwrap();
        assert_eq!(output.data, vec![0, 1, 2, 3]);
        assert_eq!(output.info.size, 4);
        assert_eq!(output.stats.steps_executed, 4);
        assert_eq!(output.stats.step_durations.len(), 4);

        let journal = journal.lock();
        let inputs: Vec<&[u8]> = journal.iter().map(|(_, input)| input.as_slice()).collect();
        assert_eq!(inputs, vec![&[0][..], &[0, 1], &[0, 1], &[0, 1, 2]]);
    }

    #[test]
    fn test_operation_failure_aborts_chain() {
        let (executor, journal) = instrumented();
        let chain = [append(1), bare("reject"), append(2)];

        let error = executor.run(&chain, &TagSet::new(), &seed()).unwrap_err();
        match &error {
            PipelineError::Operation(e) => {
                assert_eq!(e.operation, "reject");
                assert_eq!(e.message, "refuses this image");
            }
            other => panic!("expected operation error, got {}", other),
        }
        assert_eq!(error.user_message(), "reject refuses this image");
        assert_eq!(journal.lock().len(), 1);
    }

    #[test]
    fn test_unexpected_failure_hides_detail() {
        let (executor, journal) = instrumented();
        let chain = [bare("explode"), append(1)];

        let error = executor.run(&chain, &TagSet::new(), &seed()).unwrap_err();
        assert!(matches!(error, PipelineError::Unexpected { .. }));
        assert_eq!(error.operation(), Some("explode"));
        assert_eq!(error.user_message(), GENERIC_FAILURE_MESSAGE);
        assert!(!error.user_message().contains("10.0.0.7"));
        assert!(journal.lock().is_empty());
    }

    #[test]
    fn test_final_intermediate_is_unexpected() {
        let (executor, _) = instrumented();
        let error = executor
            .run(&[append(1), bare("raw")], &TagSet::new(), &seed())
            .unwrap_err();
        assert!(!error.is_user_facing());
        assert_eq!(error.operation(), Some("raw"));
    }

    #[test]
    fn test_unregistered_operation_is_unexpected() {
        let (executor, _) = instrumented();
        let error = executor
            .run(&[bare("resize")], &TagSet::new(), &seed())
            .unwrap_err();
        assert!(matches!(error, PipelineError::Unexpected { .. }));
    }

    #[test]
    fn test_empty_chain_never_fetches() {
        let (executor, _) = instrumented();
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
        });
        let executor = executor.with_fetcher(fetcher.clone());

        let error = executor.run(&[], &TagSet::new(), &seed()).unwrap_err();
        assert!(matches!(error, PipelineError::NoOperations));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);

        executor.run(&[append(1)], &TagSet::new(), &seed()).unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fetch_failure_is_unexpected_without_operation() {
        let (executor, journal) = instrumented();
        let source = ImageSource::Path("/definitely/not/here.png".into());
        let error = executor.run(&[append(1)], &TagSet::new(), &source).unwrap_err();
        assert!(!error.is_user_facing());
        assert_eq!(error.operation(), None);
        assert!(journal.lock().is_empty());
    }

    #[test]
    fn test_progress_updates() {
        let (executor, _) = instrumented();
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        let executor =
            executor.with_options(ExecutionOptions::new().with_progress(move |u| sink.lock().push(u)));

        executor
            .run(&[append(1), bare("reject")], &TagSet::new(), &seed())
            .unwrap_err();

        let updates = updates.lock();
        assert_eq!(updates[0], ProgressUpdate::Started { total_steps: 2 });
        assert!(matches!(
            updates.last(),
            Some(ProgressUpdate::Failed { index: 1, .. })
        ));
        assert!(!updates
            .iter()
            .any(|u| matches!(u, ProgressUpdate::Completed { .. })));
    }

    #[test]
    fn test_fetch_failure_reports_progress_failure() {
        let (executor, _) = instrumented();
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        let executor =
            executor.with_options(ExecutionOptions::new().with_progress(move |u| sink.lock().push(u)));

        let source = ImageSource::Path("/definitely/not/here.png".into());
        executor.run(&[append(1)], &TagSet::new(), &source).unwrap_err();

        let updates = updates.lock();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0], ProgressUpdate::Started { total_steps: 1 });
        assert_eq!(
            updates[1],
            ProgressUpdate::Failed {
                index: 0,
                operation: "append".to_string(),
                message: GENERIC_FAILURE_MESSAGE.to_string(),
            }
        );
    }

    #[test]
    fn test_resize_crop_grayscale_scenario() {
        let registry = Arc::new(OperationRegistry::with_builtins());
        let parser = CommandParser::new(registry.clone());
        let executor = PipelineExecutor::new(registry);

        let parsed = parser.parse("resize 100 100 crop 10 10 50 50 #grayscale");
        let output = executor
            .run(&parsed.invocations, &parsed.tags, &png_bytes(200, 120).into())
            .unwrap();

        assert_eq!((output.info.width, output.info.height), (50, 50));
        assert_eq!(output.info.size, output.data.len());

        let image = image::load_from_memory(&output.data).unwrap().to_rgba8();
        let px = image.get_pixel(25, 25);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }

    #[test]
    fn test_input_budget_applies_to_first_step() {
        let registry = Arc::new(OperationRegistry::with_builtins());
        let executor = PipelineExecutor::new(registry)
            .with_options(ExecutionOptions::new().with_max_input_bytes(1_000));

        let error = executor
            .run(&[bare("flip")], &TagSet::new(), &png_bytes(64, 64).into())
            .unwrap_err();
        assert_eq!(error.user_message(), "flip input image is too large");

        assert!(executor
            .run(&[bare("flip")], &TagSet::new(), &png_bytes(8, 8).into())
            .is_ok());
    }

    #[test]
    fn test_concurrent_runs_share_executor() {
        let registry = OperationRegistry::with_builtins().into_shared();
        let executor = PipelineExecutor::new(registry);
        let input = png_bytes(40, 30);

        let sizes: Vec<(u32, u32)> = (1..=8u32)
            .into_par_iter()
            .map(|n| {
                let chain = [Invocation::new(
                    "resize",
                    vec![Argument::Integer(n as i64 * 10), Argument::Integer(20)],
                )];
                let output = executor
                    .run(&chain, &TagSet::new(), &ImageSource::Bytes(input.clone()))
                    .unwrap();
                (output.info.width, output.info.height)
            })
            .collect();

        let expected: Vec<(u32, u32)> = (1..=8).map(|n| (n * 10, 20)).collect();
        assert_eq!(sizes, expected);
    }
}
