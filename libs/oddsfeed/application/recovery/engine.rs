//! Recovery stage driver

use super::commands::{Command, RecoveryRequest};
use super::state::{Effects, Producers};
use crate::application::decoder::now_ms;
use crate::application::stage::{
    MessageReceiver, MessageSender, Stage, StageContext, TaskPool, MIN_INTERVAL,
};
use crate::domain::{Body, ConnectionStatus, Message};
use crate::error::ErrorKind;
use crate::infrastructure::{FeedApi, RecoverySeed};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

const NAME: &str = "recovery";
const DEFAULT_TICK: Duration = Duration::from_secs(10);

/// Drives the producer recovery protocol
///
/// Sits right after the decoder. Connection, alive and snapshot-complete
/// messages update the producer table; every change is announced with a
/// producers-change message placed before the message that caused it.
pub struct RecoveryStage {
    api: Arc<dyn FeedApi>,
    seeds: Vec<RecoverySeed>,
    node_id: Option<i64>,
    tick: Duration,
}

impl RecoveryStage {
    pub fn new(api: Arc<dyn FeedApi>, seeds: Vec<RecoverySeed>, node_id: Option<i64>) -> Self {
        Self {
            api,
            seeds,
            node_id,
            tick: DEFAULT_TICK,
        }
    }

    /// Period of the staleness and retry check, at least a millisecond
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(MIN_INTERVAL);
        self
    }

    fn issue(
        &self,
        ctx: &StageContext,
        pool: &mut TaskPool,
        commands: &mpsc::UnboundedSender<Command>,
        request: RecoveryRequest,
    ) {
        info!(
            producer = %request.producer,
            request_id = request.request_id,
            after = request.after,
            "Requesting recovery"
        );
        let api = Arc::clone(&self.api);
        let ctx = ctx.clone();
        let commands = commands.clone();
        let node_id = self.node_id;
        pool.spawn(async move {
            let RecoveryRequest {
                producer,
                after,
                request_id,
            } = request;
            if let Err(source) = api.request_recovery(producer, after, request_id, node_id).await {
                ctx.notice(
                    NAME,
                    ErrorKind::Recovery {
                        producer,
                        request_id,
                        source,
                    },
                );
                let _ = commands.send(Command::Failed {
                    producer,
                    request_id,
                });
            }
        });
    }

    /// Issue requests and announce changes; `false` when downstream is gone
    async fn apply(
        &self,
        ctx: &StageContext,
        output: &MessageSender,
        pool: &mut TaskPool,
        commands: &mpsc::UnboundedSender<Command>,
        producers: &Producers,
        effects: Effects,
    ) -> bool {
        for request in effects.requests {
            self.issue(ctx, pool, commands, request);
        }
        if !effects.changed {
            return true;
        }
        for state in producers.iter() {
            debug!(
                producer = %state.producer,
                status = %state.status,
                request_id = state.request_id,
                "Producer state"
            );
        }
        ctx.forward(output, Message::producers_change(producers.snapshot(), now_ms()))
            .await
    }
}

/// Snapshots carrying another node's id answer that node's requests
fn foreign_node(msg: &Message, node_id: Option<i64>) -> bool {
    msg.header.node_id.is_some() && msg.header.node_id != node_id
}

fn transition(producers: &mut Producers, msg: &Message, node_id: Option<i64>, now: i64) -> Effects {
    match &msg.body {
        Some(Body::Connection(c)) if c.status == ConnectionStatus::Up => producers.connection_up(now),
        Some(Body::Connection(_)) => producers.connection_down(now),
        Some(Body::Alive(alive)) => producers.on_alive(alive, now),
        Some(Body::SnapshotComplete(snapshot)) if foreign_node(msg, node_id) => {
            debug!(
                product = snapshot.product,
                request_id = snapshot.request_id,
                node = ?msg.header.node_id,
                "Ignoring snapshot complete of another node"
            );
            Effects::default()
        }
        Some(Body::SnapshotComplete(snapshot)) => {
            let effects = producers.on_snapshot_complete(snapshot, now);
            if effects.changed {
                info!(product = snapshot.product, request_id = snapshot.request_id, "Recovery complete");
            } else {
                debug!(product = snapshot.product, request_id = snapshot.request_id, "Ignoring snapshot complete");
            }
            effects
        }
        _ => Effects::default(),
    }
}

#[async_trait]
impl Stage for RecoveryStage {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(self: Box<Self>, ctx: StageContext, mut input: MessageReceiver, output: MessageSender) {
        let mut producers = Producers::new(&self.seeds);
        let mut pool = ctx.pool();
        let (commands, mut command_rx) = mpsc::unbounded_channel();

        let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + self.tick, self.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = ctx.shutdown().cancelled() => break,
                Some(command) = command_rx.recv() => match command {
                    Command::Failed { producer, request_id } => {
                        producers.on_request_failed(producer, request_id);
                    }
                },
                _ = tick.tick() => {
                    let effects = producers.on_tick(now_ms());
                    if !self.apply(&ctx, &output, &mut pool, &commands, &producers, effects).await {
                        break;
                    }
                }
                msg = input.recv() => {
                    let Some(msg) = msg else { break };
                    let effects = transition(&mut producers, &msg, self.node_id, now_ms());
                    if !self.apply(&ctx, &output, &mut pool, &commands, &producers, effects).await {
                        break;
                    }
                    if !ctx.forward(&output, msg).await {
                        break;
                    }
                }
            }
        }

        pool.drain().await;
        debug!("Recovery stopped");
    }
}
