use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::pipeline::frame_batch_executor::{BatchFn, FrameBatchExecutor};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::error::SwapError;

/// Runs frame batches on a fixed pool of scoped worker threads.
///
/// Layout: `queue[batch…] → worker × threads → process(batch, update)`
///
/// Frames are split into consecutive batches of `max(len / threads, 1)`
/// paths. Workers pull batches from a shared channel until it drains. The
/// first failing batch stops workers from taking further batches; batches
/// already running finish.
pub struct ThreadedBatchExecutor {
    threads: usize,
    logger: Mutex<Box<dyn PipelineLogger>>,
}

impl ThreadedBatchExecutor {
    pub fn new(threads: usize, logger: Box<dyn PipelineLogger>) -> Self {
        Self {
            threads: threads.max(1),
            logger: Mutex::new(logger),
        }
    }

    fn with_logger(&self, f: impl FnOnce(&mut dyn PipelineLogger)) {
        // Logging must never fail a run; a poisoned logger is still usable.
        let mut logger = match self.logger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(logger.as_mut());
    }
}

/// Number of paths per batch for `total` frames over `threads` workers.
pub fn batch_size(total: usize, threads: usize) -> usize {
    (total / threads.max(1)).max(1)
}

impl FrameBatchExecutor for ThreadedBatchExecutor {
    fn execute(&self, frame_paths: &[PathBuf], process: &BatchFn<'_>) -> Result<(), SwapError> {
        let total = frame_paths.len();
        if total == 0 {
            return Ok(());
        }

        let size = batch_size(total, self.threads);
        let (batch_tx, batch_rx) = crossbeam_channel::unbounded::<&[PathBuf]>();
        for batch in frame_paths.chunks(size) {
            // Receiver is alive until the end of this function.
            let _ = batch_tx.send(batch);
        }
        drop(batch_tx);

        let batches = total.div_ceil(size);
        let workers = self.threads.min(batches);
        self.with_logger(|l| {
            l.info(&format!(
                "Processing {total} frames in {batches} batches on {workers} threads"
            ))
        });

        let completed = AtomicUsize::new(0);
        let cancelled = AtomicBool::new(false);
        let first_error: Mutex<Option<SwapError>> = Mutex::new(None);

        let update = || {
            let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
            self.with_logger(|l| l.progress(current, total));
        };

        let panicked = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let batch_rx = batch_rx.clone();
                    let update = &update;
                    let cancelled = &cancelled;
                    let first_error = &first_error;
                    scope.spawn(move || {
                        for batch in batch_rx {
                            if cancelled.load(Ordering::SeqCst) {
                                break;
                            }
                            let started = Instant::now();
                            if let Err(e) = process(batch, update) {
                                cancelled.store(true, Ordering::SeqCst);
                                if let Ok(mut slot) = first_error.lock() {
                                    slot.get_or_insert(e);
                                }
                                break;
                            }
                            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                            self.with_logger(|l| l.timing("batch", elapsed_ms));
                        }
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join())
                .fold(false, |any, joined| any | joined.is_err())
        });

        self.with_logger(|l| l.summary());

        if let Some(e) = first_error
            .into_inner()
            .map_err(|_| SwapError::LockPoisoned("batch error slot"))?
        {
            return Err(e);
        }
        if panicked {
            return Err(SwapError::WorkerPanicked);
        }
        Ok(())
    }
}
