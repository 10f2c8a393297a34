//! Stage wiring and error fan-in
//!
//! The pipeline spawns one driver task per stage and connects them with
//! bounded channels, so a slow consumer slows every stage before it. Each
//! stage reports errors on a private channel; a forwarder per stage merges
//! them into the single receiver returned by [`Pipeline::into_parts`]. That
//! receiver closes once every stage, with its sub-tasks, has finished.

use super::consumer::Consumer;
use super::decoder;
use super::stage::{MessageReceiver, MessageSender, Stage, StageContext};
use crate::error::FeedError;
use feedlink::{ClientEvent, ShutdownSignal};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info};

pub struct Pipeline {
    shutdown: ShutdownSignal,
    capacity: usize,
    tasks: JoinSet<()>,
    errors_tx: mpsc::UnboundedSender<FeedError>,
    errors_rx: mpsc::UnboundedReceiver<FeedError>,
}

impl Pipeline {
    pub fn new(shutdown: ShutdownSignal, capacity: usize) -> Self {
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        Self {
            shutdown,
            capacity: capacity.max(1),
            tasks: JoinSet::new(),
            errors_tx,
            errors_rx,
        }
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Context with a private error channel merged into the fan-in
    pub fn context(&mut self, name: &'static str) -> StageContext {
        let (tx, mut rx) = mpsc::unbounded_channel::<FeedError>();
        let merged = self.errors_tx.clone();
        self.tasks.spawn(async move {
            while let Some(err) = rx.recv().await {
                if merged.send(err).is_err() {
                    break;
                }
            }
        });
        StageContext::new(name, self.shutdown.clone(), tx)
    }

    /// Bounded channel with the pipeline's capacity
    pub fn channel(&self) -> (MessageSender, MessageReceiver) {
        mpsc::channel(self.capacity)
    }

    /// Decode broker client events into the first channel
    pub fn source(&mut self, events: mpsc::Receiver<ClientEvent>) -> MessageReceiver {
        let ctx = self.context(decoder::NAME);
        let (tx, rx) = self.channel();
        self.tasks.spawn(decoder::run(ctx, events, tx));
        rx
    }

    /// Append a stage, returning its output
    pub fn stage(&mut self, input: MessageReceiver, stage: Box<dyn Stage>) -> MessageReceiver {
        let name = stage.name();
        let ctx = self.context(name);
        let (tx, rx) = self.channel();
        debug!(stage = name, "Starting stage");
        self.tasks.spawn(async move {
            stage.run(ctx, input, tx).await;
            debug!(stage = name, "Stage finished");
        });
        rx
    }

    /// Terminate the chain with a consumer
    ///
    /// The pipeline shuts down when the consumer returns.
    pub fn consumer(&mut self, input: MessageReceiver, consumer: Box<dyn Consumer>) {
        let ctx = self.context("consumer");
        let shutdown = self.shutdown.clone();
        self.tasks.spawn(async move {
            if let Err(e) = consumer.consume(ctx.clone(), input).await {
                ctx.report(FeedError::internal("consumer", format!("{:#}", e)));
            }
            if !shutdown.is_triggered() {
                info!("Consumer finished, stopping pipeline");
                shutdown.trigger();
            }
        });
    }

    /// Terminate the chain by discarding every message
    pub fn drain(&mut self, mut input: MessageReceiver) {
        self.tasks.spawn(async move { while input.recv().await.is_some() {} });
    }

    /// Merged error receiver and the running tasks
    ///
    /// The receiver yields `None` after every stage context is gone.
    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<FeedError>, JoinSet<()>) {
        let Pipeline {
            tasks, errors_rx, ..
        } = self;
        (errors_rx, tasks)
    }
}
