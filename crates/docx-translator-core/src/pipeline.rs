//! The resumable translation loop.
//!
//! Blocks flow from the walker into the batcher; each flushed batch is
//! encoded, translated once, decoded and applied, then the output so far is
//! checkpointed together with the number of blocks applied. Per-batch
//! failures fall back to the original text; only credential exhaustion and
//! failing to write the final artifact end a run early, and the checkpoint is
//! saved before either is reported.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::batch::{Batch, Batcher};
use crate::checkpoint::{CheckpointStore, fingerprint};
use crate::codec::EncodedBatch;
use crate::config::{AppConfig, Lang};
use crate::document::{Document, DocumentCodec, codec_for_path};
use crate::error::{Error, Result};
use crate::reconstruct::Reconstructor;
use crate::translator::{Translator, create_translator};
use crate::util::{next_free_path, unique_output_path};
use crate::walker::DocumentWalker;

/// Pause and cancel flags shared between the driver and a running pipeline.
///
/// Both are polled between blocks; an in-flight request is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    paused: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Callbacks from a running pipeline to its driver.
pub trait ProgressListener: Send + Sync {
    /// `current` of `total` blocks are in the output
    fn on_progress(&self, current: usize, total: usize) {
        debug!("Progress {}/{}", current, total);
    }

    fn on_warning(&self, message: &str) {
        warn!("{}", message);
    }

    fn on_error(&self, message: &str) {
        error!("{}", message);
    }

    /// A checkpoint with `cursor` of `total` blocks exists; return `false` to start over.
    fn confirm_resume(&self, _cursor: usize, _total: usize) -> bool {
        true
    }
}

/// Listener that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl ProgressListener for LogListener {}

/// One document to translate
#[derive(Debug, Clone)]
pub struct Session {
    pub source: PathBuf,
    pub target: Lang,
    /// Explicit output path; derived from the source name when `None`
    pub output: Option<PathBuf>,
}

impl Session {
    pub fn new(source: impl Into<PathBuf>, target: Lang) -> Self {
        Self {
            source: source.into(),
            target,
            output: None,
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Blocks applied in this run
    pub blocks: usize,
    /// Non-empty blocks submitted for translation
    pub units: usize,
    pub batches: usize,
    pub requests: usize,
    /// Units that kept their original text
    pub fallbacks: usize,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { output_path: PathBuf, stats: RunStats },
    /// Stopped by the driver; the checkpoint holds `cursor` of `total` blocks
    Cancelled { cursor: usize, total: usize },
}

/// State of one run, threaded through batch processing
struct RunState<'a> {
    target: &'a Lang,
    listener: &'a dyn ProgressListener,
    store: CheckpointStore,
    fingerprint: String,
    reconstructor: Reconstructor,
    cursor: usize,
    total: usize,
    stats: RunStats,
}

pub struct TranslationPipeline {
    translator: Arc<dyn Translator>,
    config: AppConfig,
}

impl TranslationPipeline {
    /// Create a pipeline with the configured OpenAI-compatible translator.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let translator = create_translator(&config.translator)?;
        Ok(Self { translator, config })
    }

    /// Create with a custom translator
    pub const fn with_translator(translator: Arc<dyn Translator>, config: AppConfig) -> Self {
        Self { translator, config }
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    /// Checkpoint store used for `session`
    pub fn checkpoint_store(&self, session: &Session) -> CheckpointStore {
        let codec = codec_for_path(&session.source);
        CheckpointStore::new(
            &session.source,
            &session.target,
            &self.config.checkpoint,
            codec.extension(),
        )
    }

    /// Translate `session.source` into `session.target`, resuming from a checkpoint if one exists.
    pub async fn run(
        &self,
        session: &Session,
        control: &RunControl,
        listener: &dyn ProgressListener,
    ) -> Result<RunOutcome> {
        let codec = codec_for_path(&session.source);
        let bytes = std::fs::read(&session.source).map_err(|e| {
            let err = Error::DocumentOpen(format!(
                "Failed to read file {}: {}",
                session.source.display(),
                e
            ));
            listener.on_error(&err.to_string());
            err
        })?;
        let source = codec.decode(&bytes).inspect_err(|e| listener.on_error(&e.to_string()))?;
        let total = DocumentWalker::total_blocks(&source);
        info!(
            "Translating {} into {} ({} blocks)",
            session.source.display(),
            session.target,
            total
        );

        let store = self.checkpoint_store(session);
        let fingerprint = fingerprint(&bytes);
        let (reconstructor, cursor) =
            self.restore(&store, &fingerprint, codec.as_ref(), &source, total, listener);

        let mut state = RunState {
            target: &session.target,
            listener,
            store,
            fingerprint,
            reconstructor,
            cursor,
            total,
            stats: RunStats::default(),
        };
        listener.on_progress(cursor, total);

        match self.process(&source, codec.as_ref(), control, &mut state).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Cancelled at block {}/{}", state.cursor, total);
                self.save_checkpoint(codec.as_ref(), &state);
                return Ok(RunOutcome::Cancelled { cursor: state.cursor, total });
            }
            Err(e) => {
                self.save_checkpoint(codec.as_ref(), &state);
                listener.on_error(&e.to_string());
                return Err(e);
            }
        }

        let output_path = match self.write_output(session, codec.as_ref(), state.reconstructor.document()) {
            Ok(path) => path,
            Err(e) => {
                self.save_checkpoint(codec.as_ref(), &state);
                listener.on_error(&e.to_string());
                return Err(e);
            }
        };

        if let Err(e) = state.store.clear() {
            listener.on_warning(&format!("Failed to remove checkpoint: {e}"));
        }
        info!(
            "Saved {} ({} requests, {} fallbacks)",
            output_path.display(),
            state.stats.requests,
            state.stats.fallbacks
        );

        Ok(RunOutcome::Completed {
            output_path,
            stats: state.stats,
        })
    }

    /// Output and cursor to start from: a confirmed, readable checkpoint or a blank document.
    fn restore(
        &self,
        store: &CheckpointStore,
        fingerprint: &str,
        codec: &dyn DocumentCodec,
        source: &Document,
        total: usize,
        listener: &dyn ProgressListener,
    ) -> (Reconstructor, usize) {
        let preserve = self.config.preserve_format;
        let fresh = || (Reconstructor::new(source, preserve), 0);

        if !self.config.checkpoint.enabled {
            return fresh();
        }
        let Some(checkpoint) = store.load(fingerprint) else {
            return fresh();
        };
        if checkpoint.cursor > total {
            listener.on_warning(&format!(
                "Checkpoint cursor {} exceeds the document's {} blocks, starting over",
                checkpoint.cursor, total
            ));
            return fresh();
        }
        if !listener.confirm_resume(checkpoint.cursor, total) {
            info!("Discarding checkpoint at block {}", checkpoint.cursor);
            if let Err(e) = store.clear() {
                listener.on_warning(&format!("Failed to remove checkpoint: {e}"));
            }
            return fresh();
        }

        match codec.decode(&checkpoint.snapshot) {
            Ok(output) => {
                info!("Resuming at block {}/{}", checkpoint.cursor, total);
                (Reconstructor::resume(source, output, preserve), checkpoint.cursor)
            }
            Err(e) => {
                listener.on_warning(&format!("Checkpoint is unreadable, starting over: {e}"));
                fresh()
            }
        }
    }

    /// Walk, batch and apply from the cursor. Returns `false` when cancelled.
    async fn process(
        &self,
        source: &Document,
        codec: &dyn DocumentCodec,
        control: &RunControl,
        state: &mut RunState<'_>,
    ) -> Result<bool> {
        let mut walker = DocumentWalker::resume_from(source, state.cursor);
        let mut batcher = Batcher::new(self.config.batch);

        loop {
            if !self.wait_while_paused(control).await {
                return Ok(false);
            }
            let Some(block) = walker.next() else {
                break;
            };

            if !batcher.accepts(&block) {
                self.process_batch(batcher.flush(), codec, state).await?;
            }
            if batcher.push(block) {
                self.process_batch(batcher.flush(), codec, state).await?;
            }
        }

        if let Some(batch) = batcher.drain() {
            self.process_batch(batch, codec, state).await?;
        }
        Ok(true)
    }

    /// Yield until not paused. Returns `false` once cancelled.
    async fn wait_while_paused(&self, control: &RunControl) -> bool {
        let poll = Duration::from_millis(self.config.pipeline.pause_poll_ms);
        loop {
            if control.is_cancelled() {
                return false;
            }
            if !control.is_paused() {
                return true;
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn process_batch(
        &self,
        batch: Batch,
        codec: &dyn DocumentCodec,
        state: &mut RunState<'_>,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let translations = self.translate_batch(&batch, state).await?;
        let mut translations = translations.into_iter();

        for block in batch.blocks() {
            let translation = if block.is_empty() {
                None
            } else {
                translations.next().flatten()
            };
            if let Err(e) = state.reconstructor.apply(block, translation.as_deref()) {
                state.listener.on_warning(&e.to_string());
            }
        }

        state.cursor += batch.len();
        state.stats.blocks += batch.len();
        state.stats.batches += 1;
        self.save_checkpoint(codec, state);
        state.listener.on_progress(state.cursor, state.total);
        Ok(())
    }

    /// One translation per unit of `batch`; `None` keeps the original text.
    async fn translate_batch(&self, batch: &Batch, state: &mut RunState<'_>) -> Result<Vec<Option<String>>> {
        let Some(kind) = batch.kind() else {
            return Ok(Vec::new());
        };
        let units: Vec<_> = batch.units().collect();
        state.stats.units += units.len();

        let encoded = EncodedBatch::encode(kind, &units);
        debug!(
            "Sending batch of {} units ({} chars) as {:?}",
            units.len(),
            batch.chars(),
            encoded.payload.format
        );

        state.stats.requests += 1;
        let reply = self.translator.translate(&encoded.payload, state.target).await;
        self.pace().await;

        let decoded = match reply {
            Ok(text) => encoded.decode(&text),
            Err(e) if e.is_run_fatal() => return Err(e),
            Err(e) => Err(e),
        };

        let translations = match decoded {
            Ok(translations) => translations,
            Err(e) => {
                state.listener.on_warning(&format!(
                    "Kept original text for {} fragments: {e}",
                    units.len()
                ));
                vec![None; units.len()]
            }
        };

        let missing = translations.iter().filter(|t| t.is_none()).count();
        if missing > 0 && missing < units.len() {
            state.listener.on_warning(&format!(
                "Kept original text for {missing} of {} fragments missing from the reply",
                units.len()
            ));
        }
        state.stats.fallbacks += missing;
        Ok(translations)
    }

    async fn pace(&self) {
        let delay = self.config.pipeline.request_delay_ms;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    /// Best effort: a failed write is reported, the in-memory output is kept.
    fn save_checkpoint(&self, codec: &dyn DocumentCodec, state: &RunState<'_>) {
        if !self.config.checkpoint.enabled || state.cursor == 0 {
            return;
        }
        let saved = codec
            .encode(state.reconstructor.document())
            .and_then(|bytes| state.store.save(&bytes, state.cursor, &state.fingerprint));
        if let Err(e) = saved {
            state
                .listener
                .on_warning(&format!("Failed to save checkpoint: {e}"));
        }
    }

    fn write_output(
        &self,
        session: &Session,
        codec: &dyn DocumentCodec,
        output: &Document,
    ) -> Result<PathBuf> {
        let path = session.output.clone().map_or_else(
            || unique_output_path(&session.source, &session.target, codec.extension()),
            next_free_path,
        );
        let bytes = codec.encode(output)?;
        write_artifact(&path, &bytes)?;
        Ok(path)
    }
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
        .map_err(|e| Error::DocumentWrite(format!("{}: {}", path.display(), e)))
}
