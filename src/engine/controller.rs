use chrono::{DateTime, Local};
use parking_lot::{Condvar, Mutex};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::SiftConfig;
use crate::constants::{BYTES_PER_KB, LINE_TERMINATOR, WORKER_THREAD_NAME};
use crate::engine::classifier::{classify, strip_terminator, RejectReason, Verdict};
use crate::engine::dedup_index::DedupIndex;
use crate::engine::error::{FailureCause, Operation, Resource, SiftError};
use crate::engine::master_writer::MasterWriter;
use crate::engine::progress::{PipelineState, ProgressSnapshot};
use crate::engine::rejection_sink::RejectionSink;
use crate::utils::{count_lines, format_duration};

struct Control {
    state: PipelineState,
    stop_requested: bool,
}

/// State crossing the thread boundary: the control flags and the published snapshot.
/// Everything else belongs to the worker.
struct Shared {
    control: Mutex<Control>,
    wake: Condvar,
    progress: watch::Sender<ProgressSnapshot>,
}

impl Shared {
    /// Publishes `state`. Receivers are only woken when it differs from the published one.
    fn transition(&self, state: PipelineState) {
        self.progress.send_if_modified(|snapshot| {
            let changed = snapshot.state != state;
            snapshot.state = state;
            changed
        });
    }

    fn stop_requested(&self) -> bool {
        self.control.lock().stop_requested
    }

    /// Line boundary: parks while paused. Returns `false` once a stop was requested.
    ///
    /// `Paused` is published here, by the worker, right before it parks. A snapshot that
    /// reads `Paused` therefore has frozen counters until the next `resume`.
    fn await_turn(&self) -> bool {
        let mut control = self.control.lock();
        while control.state == PipelineState::Paused && !control.stop_requested {
            self.transition(PipelineState::Paused);
            self.wake.wait(&mut control);
        }
        !control.stop_requested
    }

    /// Counters move on every line; receivers are woken only every `interval` lines.
    fn publish_line(&self, verdict: Verdict, interval: u64) {
        self.progress.send_if_modified(|snapshot| {
            match verdict {
                Verdict::Valid => snapshot.record_valid(),
                Verdict::Rejected(reason) => snapshot.record_rejected(reason),
            }
            snapshot.processed_lines % interval == 0
        });
    }

    fn finish(
        &self,
        state: PipelineState,
        failure: Option<FailureCause>,
        log_directory: Option<PathBuf>,
    ) {
        let mut control = self.control.lock();
        control.state = state;
        self.progress.send_modify(|snapshot| {
            snapshot.state = state;
            snapshot.failure = failure;
            snapshot.log_directory = log_directory;
        });
    }
}

enum RunEnd {
    Completed,
    Stopped,
}

/// Drives one sift run: a target file checked line by line against a master file.
///
/// All operations return immediately. The read/classify/route loop runs on a dedicated
/// worker thread that checks for pause and stop between lines. A controller runs once;
/// after a terminal state a new controller is needed. Dropping a controller requests a
/// stop of its run.
pub struct Controller {
    config: SiftConfig,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Controller {
    pub fn new(config: SiftConfig) -> Result<Self, SiftError> {
        config
            .validate()
            .map_err(|e| SiftError::InvalidConfig(e.to_string()))?;

        let (progress, _) = watch::channel(ProgressSnapshot::default());
        Ok(Self {
            config,
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    state: PipelineState::Idle,
                    stop_requested: false,
                }),
                wake: Condvar::new(),
                progress,
            }),
            worker: Mutex::new(None),
        })
    }

    pub fn start(
        &self,
        target: impl AsRef<Path>,
        master: impl AsRef<Path>,
    ) -> Result<(), SiftError> {
        let target = target.as_ref().to_path_buf();
        let master = master.as_ref().to_path_buf();

        let mut control = self.shared.control.lock();
        if control.state != PipelineState::Idle {
            return Err(SiftError::InvalidTransition {
                operation: Operation::Start,
                state: control.state,
            });
        }

        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(&shared, &config, &target, &master));

        match spawned {
            Ok(handle) => {
                control.state = PipelineState::Running;
                self.shared.transition(PipelineState::Running);
                *self.worker.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                let error = SiftError::Spawn(e);
                control.state = PipelineState::Failed;
                drop(control);
                self.shared.finish(PipelineState::Failed, Some(FailureCause::from(&error)), None);
                Err(error)
            }
        }
    }

    /// Requests a pause at the next line boundary. The published state turns `Paused`
    /// once the worker has parked; until then it still reads `Running`.
    pub fn pause(&self) -> Result<(), SiftError> {
        let mut control = self.shared.control.lock();
        Self::check(&control, Operation::Pause, PipelineState::Running)?;
        control.state = PipelineState::Paused;
        debug!("Pause requested");
        Ok(())
    }

    pub fn resume(&self) -> Result<(), SiftError> {
        let mut control = self.shared.control.lock();
        Self::check(&control, Operation::Resume, PipelineState::Paused)?;
        control.state = PipelineState::Running;
        self.shared.transition(PipelineState::Running);
        self.shared.wake.notify_all();
        debug!("Resume requested");
        Ok(())
    }

    /// Valid once, from `Running` or `Paused`. The run reaches `Stopped` after the worker
    /// has flushed the rejection logs and closed its files.
    pub fn stop(&self) -> Result<(), SiftError> {
        let mut control = self.shared.control.lock();
        if !matches!(control.state, PipelineState::Running | PipelineState::Paused) {
            return Err(SiftError::InvalidTransition {
                operation: Operation::Stop,
                state: control.state,
            });
        }
        if control.stop_requested {
            return Err(SiftError::StopPending { operation: Operation::Stop });
        }
        control.stop_requested = true;
        self.shared.wake.notify_all();
        debug!("Stop requested");
        Ok(())
    }

    fn check(
        control: &Control,
        operation: Operation,
        expected: PipelineState,
    ) -> Result<(), SiftError> {
        if control.state != expected {
            return Err(SiftError::InvalidTransition {
                operation,
                state: control.state,
            });
        }
        if control.stop_requested {
            return Err(SiftError::StopPending { operation });
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.shared.progress.borrow().clone()
    }

    /// The published state, the same one `snapshot` carries.
    pub fn state(&self) -> PipelineState {
        self.shared.progress.borrow().state
    }

    /// Receiver that is notified on every state change and every
    /// `progress_interval_lines` processed lines.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.shared.progress.subscribe()
    }

    /// Resolves with the terminal snapshot. Never resolves for a controller that was not
    /// started.
    pub async fn wait(&self) -> ProgressSnapshot {
        let mut receiver = self.subscribe();
        let snapshot = match receiver.wait_for(|snapshot| snapshot.state.is_terminal()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    /// Blocks until the worker thread has exited and returns the final snapshot.
    pub fn join(&self) -> ProgressSnapshot {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Worker thread exited abnormally");
            }
        }
        self.snapshot()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let mut control = self.shared.control.lock();
        if matches!(control.state, PipelineState::Running | PipelineState::Paused) {
            control.stop_requested = true;
            self.shared.wake.notify_all();
        }
    }
}

fn run_worker(shared: &Shared, config: &SiftConfig, target: &Path, master: &Path) {
    let started_at = Local::now();
    let started = Instant::now();
    info!("Sifting {} into {}", target.display(), master.display());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        run(shared, config, target, master, started_at)
    }));

    let (state, failure, log_directory) = match outcome {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            let error = SiftError::WorkerPanic(message);
            error!("{}", error);
            (PipelineState::Failed, Some(FailureCause::from(&error)), None)
        }
    };

    let snapshot = shared.progress.borrow().clone();
    match &failure {
        Some(cause) => error!("Run failed after {} lines: {}", snapshot.processed_lines, cause),
        None => info!(
            "Run {} after {}: {} lines, {} valid, {} rejected",
            state,
            format_duration(started.elapsed()),
            snapshot.processed_lines,
            snapshot.valid_count,
            snapshot.rejected_count
        ),
    }

    shared.finish(state, failure, log_directory);
}

/// Runs the pipeline, then always flushes the rejection sink, whatever the pipeline's
/// outcome. File handles are owned by `process` and closed before the flush.
fn run(
    shared: &Shared,
    config: &SiftConfig,
    target: &Path,
    master: &Path,
    started_at: DateTime<Local>,
) -> (PipelineState, Option<FailureCause>, Option<PathBuf>) {
    let mut sink = RejectionSink::new(
        started_at,
        config.write_empty_logs,
        config.annotate_line_numbers,
    );

    let result = process(shared, config, target, master, &mut sink);
    let flushed = sink.flush(&config.logs_root);

    match (result, flushed) {
        (Ok(end), Ok(log_directory)) => {
            let state = match end {
                RunEnd::Completed => PipelineState::Completed,
                RunEnd::Stopped => PipelineState::Stopped,
            };
            (state, None, log_directory)
        }
        (Ok(_), Err(flush_error)) => {
            (PipelineState::Failed, Some(FailureCause::from(&flush_error)), None)
        }
        (Err(run_error), Ok(log_directory)) => {
            (PipelineState::Failed, Some(FailureCause::from(&run_error)), log_directory)
        }
        (Err(run_error), Err(flush_error)) => {
            warn!("Rejection logs were lost as well: {}", flush_error);
            (PipelineState::Failed, Some(FailureCause::from(&run_error)), None)
        }
    }
}

fn process(
    shared: &Shared,
    config: &SiftConfig,
    target: &Path,
    master: &Path,
    sink: &mut RejectionSink,
) -> Result<RunEnd, SiftError> {
    let target_error = |e| SiftError::resource(Resource::TargetFile, target, e);
    let buffer_size = config.io_buffer_size_bytes();

    let target_file = File::open(target).map_err(target_error)?;

    if config.count_total_lines {
        let counting_handle = File::open(target).map_err(target_error)?;
        let counted = count_lines(counting_handle, buffer_size, || shared.stop_requested())
            .map_err(target_error)?;
        match counted {
            Some(total) => {
                debug!("Target holds {} lines", total);
                shared.progress.send_modify(|snapshot| snapshot.total_lines = Some(total));
            }
            None => return Ok(RunEnd::Stopped),
        }
    }

    let mut index = DedupIndex::seed_from_file(master, buffer_size, config.memory_limit_bytes())?;
    debug!(
        "Dedup index holds {} records (~{} KB)",
        index.len(),
        index.estimated_size_bytes() / BYTES_PER_KB as u64
    );

    let mut writer = MasterWriter::open(master, config.sync_each_record)?;

    let mut reader = BufReader::with_capacity(buffer_size, target_file);

    let interval = config.progress_interval_lines.max(1);
    let mut line = Vec::new();
    let mut line_number = 0u64;

    let end = loop {
        if !shared.await_turn() {
            break RunEnd::Stopped;
        }

        line.clear();
        if reader.read_until(LINE_TERMINATOR, &mut line).map_err(target_error)? == 0 {
            break RunEnd::Completed;
        }
        line_number += 1;

        let record = strip_terminator(&line);
        let verdict = match classify(record, config.field_split) {
            Verdict::Valid if index.contains(record) => Verdict::Rejected(RejectReason::Duplicate),
            Verdict::Valid => {
                writer.append(record)?;
                index.insert(record);
                Verdict::Valid
            }
            rejected => rejected,
        };

        if let Verdict::Rejected(reason) = verdict {
            sink.record(reason, line_number, record);
        }
        shared.publish_line(verdict, interval);
    };

    let appended = writer.finish()?;
    debug!("Appended {} records to {}", appended, master.display());
    Ok(end)
}
