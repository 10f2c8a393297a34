//! End-of-pipeline consumers
//!
//! A [`Consumer`] owns the last channel of the pipeline. When it returns the
//! pipeline shuts down, so a consumer that wants to keep the feed running
//! must keep reading until its input closes. Errors of callbacks that run
//! per message or per batch are reported to the error fan-in and the
//! stream continues.

use super::stage::{MessageReceiver, MessageSender, Stage, StageContext, MIN_INTERVAL};
use crate::domain::Message;
use crate::error::ErrorKind;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Final reader of the message stream
#[async_trait]
pub trait Consumer: Send + 'static {
    async fn consume(self: Box<Self>, ctx: StageContext, input: MessageReceiver) -> anyhow::Result<()>;
}

fn callback_error(err: anyhow::Error) -> ErrorKind {
    ErrorKind::Internal(format!("{:#}", err))
}

/// Hands the whole receiver to a closure
pub struct FnConsumer<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnConsumer<F, Fut>
where
    F: FnOnce(MessageReceiver) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f, _fut: PhantomData }
    }
}

#[async_trait]
impl<F, Fut> Consumer for FnConsumer<F, Fut>
where
    F: FnOnce(MessageReceiver) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn consume(self: Box<Self>, _ctx: StageContext, input: MessageReceiver) -> anyhow::Result<()> {
        (self.f)(input).await
    }
}

/// Delivers messages in batches
///
/// A batch is flushed when it reaches `size` messages, when `interval`
/// passes with messages pending, and once more when the input closes.
pub struct BufferedConsumer<F> {
    size: usize,
    interval: Duration,
    handler: F,
}

impl<F> BufferedConsumer<F>
where
    F: FnMut(Vec<Message>) -> anyhow::Result<()> + Send + 'static,
{
    pub fn new(size: usize, interval: Duration, handler: F) -> Self {
        Self {
            size: size.max(1),
            interval: interval.max(MIN_INTERVAL),
            handler,
        }
    }

    fn flush(&mut self, ctx: &StageContext, buffer: &mut Vec<Message>) {
        if buffer.is_empty() {
            return;
        }
        let batch = std::mem::replace(buffer, Vec::with_capacity(self.size));
        debug!(messages = batch.len(), "Flushing batch");
        if let Err(e) = (self.handler)(batch) {
            ctx.notice("buffered_consumer", callback_error(e));
        }
    }
}

#[async_trait]
impl<F> Consumer for BufferedConsumer<F>
where
    F: FnMut(Vec<Message>) -> anyhow::Result<()> + Send + 'static,
{
    async fn consume(self: Box<Self>, ctx: StageContext, mut input: MessageReceiver) -> anyhow::Result<()> {
        let mut this = *self;
        let mut buffer = Vec::with_capacity(this.size);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + this.interval, this.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                msg = ctx.recv(&mut input) => match msg {
                    Some(msg) => {
                        buffer.push(msg);
                        if buffer.len() >= this.size {
                            this.flush(&ctx, &mut buffer);
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => this.flush(&ctx, &mut buffer),
            }
        }

        this.flush(&ctx, &mut buffer);
        Ok(())
    }
}

/// Per-message callback that forwards every message
///
/// Usable as a custom stage anywhere after the bet-stop stage.
pub struct Simple<F> {
    name: &'static str,
    handler: F,
}

impl<F> Simple<F>
where
    F: FnMut(&Message) -> anyhow::Result<()> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self::named("simple", handler)
    }

    pub fn named(name: &'static str, handler: F) -> Self {
        Self { name, handler }
    }
}

#[async_trait]
impl<F> Stage for Simple<F>
where
    F: FnMut(&Message) -> anyhow::Result<()> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(self: Box<Self>, ctx: StageContext, mut input: MessageReceiver, output: MessageSender) {
        let Simple { name, mut handler } = *self;
        while let Some(msg) = ctx.recv(&mut input).await {
            if let Err(e) = handler(&msg) {
                ctx.notice(name, callback_error(e));
            }
            if !ctx.forward(&output, msg).await {
                break;
            }
        }
    }
}
