use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::codec::domain::encoded_image::is_image_type;
use crate::codec::domain::source_file::SourceFile;
use crate::scanning::domain::analysis_sink::AnalysisSink;
use crate::scanning::processing_queue::{ProcessingQueue, QueueItem, QueueState, Ticket};
use crate::scanning::scan_logger::ScanLogger;
use crate::scanning::scan_photo_use_case::{ScanError, ScanPhotoUseCase};
use crate::shared::analyzed_photo::AnalyzedPhoto;

/// Notifications for presentation layers. Every accepted file produces one
/// `Queued`, at most one `Started`, and exactly one terminal event.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Queued { ticket: Ticket, name: String },
    Started { ticket: Ticket, name: String },
    Completed { ticket: Ticket, photo: AnalyzedPhoto },
    Failed { ticket: Ticket, name: String, error: String },
    Cancelled { ticket: Ticket, name: String },
}

impl ScanEvent {
    pub fn ticket(&self) -> Ticket {
        match self {
            ScanEvent::Queued { ticket, .. }
            | ScanEvent::Started { ticket, .. }
            | ScanEvent::Completed { ticket, .. }
            | ScanEvent::Failed { ticket, .. }
            | ScanEvent::Cancelled { ticket, .. } => *ticket,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanEvent::Completed { .. } | ScanEvent::Failed { .. } | ScanEvent::Cancelled { .. }
        )
    }
}

struct Job {
    ticket: Ticket,
    file: Box<dyn SourceFile>,
    cancelled: Arc<AtomicBool>,
}

struct State {
    queue: ProcessingQueue,
    tokens: HashMap<Ticket, Arc<AtomicBool>>,
}

/// Lock order: `state` → `logger` → `subscribers`.
struct Shared {
    state: Mutex<State>,
    idle: Condvar,
    logger: Mutex<Box<dyn ScanLogger>>,
    subscribers: Mutex<Vec<Sender<ScanEvent>>>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn logger(&self) -> MutexGuard<'_, Box<dyn ScanLogger>> {
        self.logger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn broadcast(&self, event: ScanEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Applies a terminal transition and publishes it while still holding the
    /// state lock, so `wait_idle` never returns ahead of the last event.
    fn finish(
        &self,
        state: &mut State,
        ticket: Ticket,
        outcome: &str,
        transition: impl FnOnce(&mut ProcessingQueue) -> bool,
        event: ScanEvent,
    ) -> bool {
        if !transition(&mut state.queue) {
            return false;
        }
        state.tokens.remove(&ticket);
        {
            let mut logger = self.logger();
            logger.outcome(outcome);
            logger.progress(state.queue.finished(), state.queue.accepted());
        }
        self.broadcast(event);
        self.idle.notify_all();
        true
    }
}

/// Ordered batch controller: filters, queues and drives files through
/// [`ScanPhotoUseCase`] on a fixed pool of worker threads.
///
/// Jobs are dispatched strictly in ticket order. With one worker (the
/// default) at most one item is `processing` at a time and photos reach the
/// sink in submission order. With more workers completion may interleave;
/// tickets on events recover the submission order.
///
/// Dropping the scanner cancels outstanding work and joins the workers.
pub struct BatchScanner {
    jobs: Option<Sender<Job>>,
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl BatchScanner {
    pub fn new(
        use_case: ScanPhotoUseCase,
        sink: Arc<dyn AnalysisSink>,
        logger: Box<dyn ScanLogger>,
        workers: usize,
    ) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: ProcessingQueue::new(),
                tokens: HashMap::new(),
            }),
            idle: Condvar::new(),
            logger: Mutex::new(logger),
            subscribers: Mutex::new(Vec::new()),
        });
        let use_case = Arc::new(use_case);

        let workers = (0..workers.max(1))
            .map(|_| {
                let jobs = job_rx.clone();
                let use_case = use_case.clone();
                let sink = sink.clone();
                let shared = shared.clone();
                thread::spawn(move || run_worker(&jobs, &use_case, sink.as_ref(), &shared))
            })
            .collect();

        Self {
            jobs: Some(job_tx),
            shared,
            workers,
        }
    }

    /// Queues every image file in order and returns their tickets.
    ///
    /// Files whose declared type is not `image/*` are skipped silently.
    pub fn submit<I>(&self, files: I) -> Vec<Ticket>
    where
        I: IntoIterator<Item = Box<dyn SourceFile>>,
    {
        let Some(jobs) = &self.jobs else {
            return Vec::new();
        };

        let mut state = self.shared.state();
        let mut tickets = Vec::new();
        for file in files {
            let declared = file.declared_type().unwrap_or_default();
            if !is_image_type(declared) {
                log::debug!("Skipping {}: not an image ({declared:?})", file.name());
                continue;
            }

            let name = file.name().to_string();
            let ticket = state.queue.enqueue(name.clone());
            let cancelled = Arc::new(AtomicBool::new(false));
            state.tokens.insert(ticket, cancelled.clone());
            self.shared.broadcast(ScanEvent::Queued {
                ticket,
                name: name.clone(),
            });

            let job = Job {
                ticket,
                file,
                cancelled,
            };
            if jobs.send(job).is_err() {
                let event = ScanEvent::Failed {
                    ticket,
                    name,
                    error: "scanner stopped".to_string(),
                };
                self.shared.finish(
                    &mut state,
                    ticket,
                    "failed",
                    |q| q.fail(ticket, "scanner stopped"),
                    event,
                );
            }
            tickets.push(ticket);
        }

        if !tickets.is_empty() {
            log::info!(
                "Queued {} photo(s), {} outstanding",
                tickets.len(),
                state.queue.accepted() - state.queue.finished()
            );
        }
        tickets
    }

    /// Cancels a pending or processing item. Pending items end immediately;
    /// a processing item ends at its next checkpoint.
    pub fn cancel(&self, ticket: Ticket) -> bool {
        let mut state = self.shared.state();
        let Some(token) = state.tokens.get(&ticket).cloned() else {
            return false;
        };
        let Some(item) = state.queue.item(ticket).cloned() else {
            return false;
        };

        match item.state {
            QueueState::Pending => {
                token.store(true, Ordering::Relaxed);
                let event = ScanEvent::Cancelled {
                    ticket,
                    name: item.display_name,
                };
                self.shared
                    .finish(&mut state, ticket, "cancelled", |q| q.cancel(ticket), event)
            }
            QueueState::Processing => {
                token.store(true, Ordering::Relaxed);
                true
            }
            QueueState::Error | QueueState::Cancelled => false,
        }
    }

    /// Cancels every outstanding item. Returns how many were flagged.
    pub fn cancel_all(&self) -> usize {
        let tickets: Vec<Ticket> = {
            let state = self.shared.state();
            let mut t = state.queue.tickets_in(QueueState::Processing);
            t.extend(state.queue.tickets_in(QueueState::Pending));
            t
        };
        tickets.into_iter().filter(|t| self.cancel(*t)).count()
    }

    /// Blocks until every accepted item reached a terminal outcome.
    pub fn wait_idle(&self) {
        let mut state = self.shared.state();
        while !state.queue.is_idle() {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn queue_snapshot(&self) -> Vec<QueueItem> {
        self.shared.state().queue.snapshot()
    }

    /// Removes failed and cancelled items from the visible queue.
    pub fn clear_finished(&self) -> usize {
        self.shared.state().queue.clear_finished()
    }

    /// A new event stream. Only events published after this call are seen.
    pub fn subscribe(&self) -> Receiver<ScanEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn log_summary(&self) {
        self.shared.logger().summary();
    }
}

impl Drop for BatchScanner {
    fn drop(&mut self) {
        let cancelled = self.cancel_all();
        if cancelled > 0 {
            log::info!("Scanner stopped with {cancelled} item(s) cancelled");
        }
        self.jobs.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("Scan worker panicked");
            }
        }
    }
}

fn run_worker(
    jobs: &Receiver<Job>,
    use_case: &ScanPhotoUseCase,
    sink: &dyn AnalysisSink,
    shared: &Shared,
) {
    for job in jobs.iter() {
        process(job, use_case, sink, shared);
    }
}

fn process(job: Job, use_case: &ScanPhotoUseCase, sink: &dyn AnalysisSink, shared: &Shared) {
    let ticket = job.ticket;
    let name = job.file.name().to_string();

    {
        let mut state = shared.state();
        if !state.queue.start(ticket) {
            return;
        }
        shared.broadcast(ScanEvent::Started {
            ticket,
            name: name.clone(),
        });
    }

    let mut stages = StageBuffer::default();
    // A panicking port fails this item only; the worker keeps draining jobs.
    let run = catch_unwind(AssertUnwindSafe(|| {
        let result = use_case.execute(job.file.as_ref(), &job.cancelled, &mut stages);
        if let Ok(photo) = &result {
            sink.on_analysis_complete(photo.clone());
        }
        result
    }));
    stages.replay(&mut **shared.logger());

    let result = match run {
        Ok(result) => result,
        Err(payload) => {
            let error = format!("worker panicked: {}", panic_message(payload.as_ref()));
            log::error!("Failed to scan {name}: {error}");
            let event = ScanEvent::Failed {
                ticket,
                name,
                error: error.clone(),
            };
            let mut state = shared.state();
            shared.finish(&mut state, ticket, "failed", |q| q.fail(ticket, error), event);
            return;
        }
    };

    match result {
        Ok(photo) => {
            let outcome = if photo.is_match() { "matched" } else { "unmatched" };
            let mut state = shared.state();
            shared.finish(
                &mut state,
                ticket,
                outcome,
                |q| q.complete(ticket),
                ScanEvent::Completed { ticket, photo },
            );
        }
        Err(ScanError::Cancelled) => {
            log::info!("Cancelled {name}");
            let mut state = shared.state();
            shared.finish(
                &mut state,
                ticket,
                "cancelled",
                |q| q.cancel(ticket),
                ScanEvent::Cancelled { ticket, name },
            );
        }
        Err(e) => {
            log::warn!("Failed to scan {name}: {e}");
            let error = e.to_string();
            let event = ScanEvent::Failed {
                ticket,
                name,
                error: error.clone(),
            };
            let mut state = shared.state();
            shared.finish(&mut state, ticket, "failed", |q| q.fail(ticket, error), event);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Collects per-item stage records so workers never hold the shared logger
/// across a blocking call.
#[derive(Default)]
struct StageBuffer {
    timings: Vec<(String, f64)>,
    metrics: Vec<(String, f64)>,
}

impl StageBuffer {
    fn replay(self, logger: &mut dyn ScanLogger) {
        for (stage, ms) in self.timings {
            logger.timing(&stage, ms);
        }
        for (name, value) in self.metrics {
            logger.metric(&name, value);
        }
    }
}

impl ScanLogger for StageBuffer {
    fn progress(&mut self, _finished: usize, _accepted: usize) {}

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings.push((stage.to_string(), duration_ms));
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.push((name.to_string(), value));
    }

    fn outcome(&mut self, _kind: &str) {}
}
