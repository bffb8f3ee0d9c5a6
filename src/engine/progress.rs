//! Progress relay between blocking jobs and a streaming consumer
//!
//! A job runs on the blocking thread pool and posts events into an ordered
//! channel. The consumer waits on that channel in bounded slices of one poll
//! interval, checking worker liveness whenever a slice elapses empty, so a
//! worker that dies without a terminal event still ends the stream.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::domain::model::{ProgressEvent, ProgressUpdate};
use crate::error::{SceneCutError, SceneCutResult};
use crate::ports::ProgressSink;

/// Default consumer poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handle a running job uses to post progress
pub struct ProgressEmitter<T> {
    sender: UnboundedSender<ProgressEvent<T>>,
}

impl<T: Send> ProgressEmitter<T> {
    /// Post a progress update
    pub fn progress(&self, update: ProgressUpdate) {
        self.post(ProgressEvent::Progress(update));
    }

    fn post(&self, event: ProgressEvent<T>) {
        // A closed channel means the consumer went away; the job still runs to the end.
        if self.sender.send(event).is_err() {
            trace!("Progress consumer disconnected, dropping event");
        }
    }
}

impl<T: Send> ProgressSink for ProgressEmitter<T> {
    fn report(&self, update: ProgressUpdate) {
        self.progress(update);
    }
}

/// Runs blocking jobs and hands back their event streams
#[derive(Debug, Clone)]
pub struct ProgressBridge {
    poll_interval: Duration,
}

impl Default for ProgressBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBridge {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the consumer poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Start `job` on a worker thread.
    ///
    /// The job's return value (or error, or panic) becomes the stream's single
    /// terminal event. Must be called from within a Tokio runtime.
    pub fn run<T, F>(&self, job: F) -> JobStream<T>
    where
        T: Send + 'static,
        F: FnOnce(&ProgressEmitter<T>) -> SceneCutResult<T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::task::spawn_blocking(move || {
            let emitter = ProgressEmitter { sender };
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(&emitter)));
            let terminal = match outcome {
                Ok(Ok(result)) => ProgressEvent::Complete(result),
                Ok(Err(e)) => {
                    warn!("Job failed: {}", e);
                    ProgressEvent::Error { message: e.to_string() }
                }
                Err(payload) => {
                    let message = format!("Worker panicked: {}", panic_message(payload.as_ref()));
                    warn!("{}", message);
                    ProgressEvent::Error { message }
                }
            };
            emitter.post(terminal);
        });

        JobStream::from_parts(receiver, worker, self.poll_interval)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Outcome of one bounded wait on a job stream
#[derive(Debug, PartialEq)]
pub enum JobPoll<T> {
    /// An event arrived
    Event(ProgressEvent<T>),
    /// Nothing arrived within the poll interval; the worker is still alive
    Pending,
    /// The terminal event has already been delivered
    Done,
}

/// Consumer side of a running job
pub struct JobStream<T> {
    receiver: UnboundedReceiver<ProgressEvent<T>>,
    worker: JoinHandle<()>,
    poll_interval: Duration,
    finished: bool,
}

impl<T> JobStream<T> {
    fn from_parts(
        receiver: UnboundedReceiver<ProgressEvent<T>>,
        worker: JoinHandle<()>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            receiver,
            worker,
            poll_interval,
            finished: false,
        }
    }

    /// Wait at most one poll interval for the next event
    pub async fn try_next(&mut self) -> JobPoll<T> {
        if self.finished {
            return JobPoll::Done;
        }

        match tokio::time::timeout(self.poll_interval, self.receiver.recv()).await {
            Ok(Some(event)) => JobPoll::Event(self.deliver(event)),
            Ok(None) => JobPoll::Event(self.worker_fault("event channel closed")),
            Err(_) => {
                if !self.worker.is_finished() {
                    return JobPoll::Pending;
                }
                // The worker may have posted right before exiting
                match self.receiver.try_recv() {
                    Ok(event) => JobPoll::Event(self.deliver(event)),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                        JobPoll::Event(self.worker_fault("worker exited"))
                    }
                }
            }
        }
    }

    /// Next event in post order, or `None` once the terminal event was delivered
    pub async fn next_event(&mut self) -> Option<ProgressEvent<T>> {
        loop {
            match self.try_next().await {
                JobPoll::Event(event) => return Some(event),
                JobPoll::Pending => continue,
                JobPoll::Done => return None,
            }
        }
    }

    /// Drain the stream into a vector
    pub async fn collect(mut self) -> Vec<ProgressEvent<T>> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    fn deliver(&mut self, event: ProgressEvent<T>) -> ProgressEvent<T> {
        if event.is_terminal() {
            debug!("Terminal event received");
            self.finished = true;
        }
        event
    }

    fn worker_fault(&mut self, reason: &str) -> ProgressEvent<T> {
        self.finished = true;
        let error = SceneCutError::WorkerFault {
            message: reason.to_string(),
        };
        warn!("{}", error);
        ProgressEvent::Error {
            message: error.to_string(),
        }
    }
}
