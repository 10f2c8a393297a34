//! Stage contract
//!
//! A stage owns one driver task that reads its input channel, forwards
//! every message and may emit derived messages. API calls run as sub-tasks
//! in a [`TaskPool`]; the driver drains the pool before it drops its
//! output, so downstream sees the channel close only after the last
//! derived message.

use crate::domain::Message;
use crate::error::{ErrorKind, FeedError};
use async_trait::async_trait;
use feedlink::ShutdownSignal;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Floor for stage timers; `interval_at` rejects a zero period
pub(crate) const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub type MessageSender = mpsc::Sender<Message>;
pub type MessageReceiver = mpsc::Receiver<Message>;

/// What every stage gets from the pipeline
#[derive(Debug, Clone)]
pub struct StageContext {
    name: &'static str,
    shutdown: ShutdownSignal,
    errors: mpsc::UnboundedSender<FeedError>,
}

impl StageContext {
    pub fn new(
        name: &'static str,
        shutdown: ShutdownSignal,
        errors: mpsc::UnboundedSender<FeedError>,
    ) -> Self {
        Self {
            name,
            shutdown,
            errors,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Hand an error to the pipeline's fan-in
    pub fn report(&self, err: FeedError) {
        if self.errors.send(err).is_err() {
            debug!(stage = self.name, "Error fan-in closed");
        }
    }

    /// Report a record-and-continue error
    pub fn log(&self, op: &'static str, kind: impl Into<ErrorKind>) {
        self.report(FeedError::log(op, kind));
    }

    /// Report an error that needs operator attention
    pub fn notice(&self, op: &'static str, kind: impl Into<ErrorKind>) {
        self.report(FeedError::notice(op, kind));
    }

    /// Next input message, `None` when the input closed or on shutdown
    pub async fn recv(&self, input: &mut MessageReceiver) -> Option<Message> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            msg = input.recv() => msg,
        }
    }

    /// Send downstream; `false` when downstream is gone or on shutdown
    pub async fn forward(&self, output: &MessageSender, msg: Message) -> bool {
        tokio::select! {
            result = output.send(msg) => result.is_ok(),
            _ = self.shutdown.cancelled() => false,
        }
    }

    pub(crate) fn pool(&self) -> TaskPool {
        TaskPool::new(self.name, self.shutdown.clone())
    }
}

/// A processing step between two channels
#[async_trait]
pub trait Stage: Send + 'static {
    fn name(&self) -> &'static str;

    /// Drive the stage until the input closes or shutdown
    ///
    /// Implementations must forward every input message and drop `output`
    /// only after their sub-tasks finished.
    async fn run(self: Box<Self>, ctx: StageContext, input: MessageReceiver, output: MessageSender);
}

/// Sub-tasks of one stage, cancelled together on shutdown
pub(crate) struct TaskPool {
    stage: &'static str,
    shutdown: ShutdownSignal,
    tasks: JoinSet<()>,
}

impl TaskPool {
    pub(crate) fn new(stage: &'static str, shutdown: ShutdownSignal) -> Self {
        Self {
            stage,
            shutdown,
            tasks: JoinSet::new(),
        }
    }

    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reap();
        let shutdown = self.shutdown.clone();
        self.tasks.spawn(async move {
            tokio::select! {
                _ = task => {}
                _ = shutdown.cancelled() => {}
            }
        });
    }

    /// Collect finished tasks
    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            self.check(result);
        }
    }

    fn check(&self, result: Result<(), tokio::task::JoinError>) {
        if let Err(e) = result {
            if e.is_panic() {
                error!(stage = self.stage, "Sub-task panicked: {}", e);
            }
        }
    }

    /// Wait for every sub-task
    pub(crate) async fn drain(&mut self) {
        if !self.tasks.is_empty() {
            debug!(stage = self.stage, pending = self.tasks.len(), "Draining sub-tasks");
        }
        while let Some(result) = self.tasks.join_next().await {
            self.check(result);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        if !self.tasks.is_empty() {
            warn!(stage = self.stage, pending = self.tasks.len(), "Aborting sub-tasks");
        }
    }
}
