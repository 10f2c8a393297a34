//! Per-producer recovery state machine
//!
//! ```text
//!            connection up / alive
//!   Down ───────────────────────────▶ InRecovery ◀──┐
//!    ▲                                   │          │ alive subscribed=0,
//!    │ connection down                   │ matching │ stale alive
//!    │                                   ▼ snapshot │
//!    └─────────────────────────────── Active ───────┘
//! ```
//!
//! Every method takes `now` and returns the [`Effects`] the driver has to
//! carry out, so the transitions are testable without a runtime.

use super::commands::{next_request_id, RecoveryRequest};
use crate::domain::{Alive, Producer, ProducerChange, ProducerStatus, SnapshotComplete};
use crate::infrastructure::RecoverySeed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerState {
    pub producer: Producer,
    pub status: ProducerStatus,
    /// Last alive timestamp accepted from the producer
    pub last_alive: i64,
    /// In-flight recovery, 0 when none
    pub request_id: u64,
    pub status_changed_at: i64,
}

impl ProducerState {
    pub fn new(producer: Producer, last_alive: i64) -> Self {
        Self {
            producer,
            status: ProducerStatus::Down,
            last_alive,
            request_id: 0,
            status_changed_at: 0,
        }
    }

    pub fn snapshot(&self) -> ProducerChange {
        ProducerChange {
            producer: self.producer,
            status: self.status,
            request_id: self.request_id,
            timestamp: self.last_alive,
            status_changed_at: self.status_changed_at,
        }
    }

    fn set_status(&mut self, status: ProducerStatus, now: i64) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.status_changed_at = now;
        true
    }

    /// Allocate a new request, superseding any in flight
    fn start_recovery(&mut self, now: i64) -> RecoveryRequest {
        self.set_status(ProducerStatus::InRecovery, now);
        self.request_id = next_request_id();
        RecoveryRequest {
            producer: self.producer,
            after: self.producer.recovery_timestamp(self.last_alive, now),
            request_id: self.request_id,
        }
    }

    fn is_stale(&self, now: i64) -> bool {
        now - self.last_alive >= self.producer.recovery_window()
    }
}

/// Work resulting from one transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    pub requests: Vec<RecoveryRequest>,
    /// A status changed or a request was issued
    pub changed: bool,
}

impl Effects {
    fn request(&mut self, request: RecoveryRequest) {
        self.requests.push(request);
        self.changed = true;
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && !self.changed
    }
}

/// Table of managed producers, indexed by producer
#[derive(Debug, Clone)]
pub struct Producers {
    states: Vec<ProducerState>,
}

impl Producers {
    /// Managed set from the seeds; live odds and prematch when empty
    pub fn new(seeds: &[RecoverySeed]) -> Self {
        let mut states: Vec<ProducerState> = Vec::new();
        if seeds.is_empty() {
            states.push(ProducerState::new(Producer::LiveOdds, 0));
            states.push(ProducerState::new(Producer::Prematch, 0));
        }
        for seed in seeds {
            match states.iter_mut().find(|s| s.producer == seed.producer) {
                Some(state) => state.last_alive = seed.timestamp,
                None => states.push(ProducerState::new(seed.producer, seed.timestamp)),
            }
        }
        Self { states }
    }

    pub fn get(&self, producer: Producer) -> Option<&ProducerState> {
        self.states.iter().find(|s| s.producer == producer)
    }

    fn get_mut(&mut self, producer: Option<Producer>) -> Option<&mut ProducerState> {
        let producer = producer?;
        self.states.iter_mut().find(|s| s.producer == producer)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProducerState> {
        self.states.iter()
    }

    pub fn snapshot(&self) -> Vec<ProducerChange> {
        self.states.iter().map(ProducerState::snapshot).collect()
    }

    /// Every producer starts a recovery
    pub fn connection_up(&mut self, now: i64) -> Effects {
        let mut effects = Effects::default();
        for state in &mut self.states {
            effects.request(state.start_recovery(now));
        }
        effects
    }

    /// Every producer is down; in-flight requests are forgotten
    pub fn connection_down(&mut self, now: i64) -> Effects {
        let mut effects = Effects::default();
        for state in &mut self.states {
            state.request_id = 0;
            effects.changed |= state.set_status(ProducerStatus::Down, now);
        }
        effects
    }

    pub fn on_alive(&mut self, alive: &Alive, now: i64) -> Effects {
        let mut effects = Effects::default();
        let Some(state) = self.get_mut(alive.producer()) else {
            return effects;
        };

        if !alive.subscribed {
            effects.request(state.start_recovery(now));
            return effects;
        }

        match state.status {
            ProducerStatus::Active => state.last_alive = state.last_alive.max(alive.timestamp),
            ProducerStatus::InRecovery if state.request_id != 0 => {}
            // recovery failed earlier, or alive before connection up
            ProducerStatus::InRecovery | ProducerStatus::Down => {
                effects.request(state.start_recovery(now))
            }
        }
        effects
    }

    /// Ends the recovery whose request id matches; others are ignored
    pub fn on_snapshot_complete(&mut self, snapshot: &SnapshotComplete, now: i64) -> Effects {
        let mut effects = Effects::default();
        let Some(state) = self.get_mut(snapshot.producer()) else {
            return effects;
        };
        if state.request_id == 0 || state.request_id != snapshot.request_id {
            return effects;
        }
        state.request_id = 0;
        state.last_alive = state.last_alive.max(snapshot.timestamp);
        state.set_status(ProducerStatus::Active, now);
        effects.changed = true;
        effects
    }

    /// Recover stale producers and retry failed requests
    pub fn on_tick(&mut self, now: i64) -> Effects {
        let mut effects = Effects::default();
        for state in &mut self.states {
            let due = match state.status {
                ProducerStatus::Active => state.is_stale(now),
                ProducerStatus::InRecovery => state.request_id == 0,
                ProducerStatus::Down => false,
            };
            if due {
                effects.request(state.start_recovery(now));
            }
        }
        effects
    }

    /// The API call for `request_id` failed; retried on the next trigger
    pub fn on_request_failed(&mut self, producer: Producer, request_id: u64) {
        if let Some(state) = self.get_mut(Some(producer)) {
            if state.request_id == request_id {
                state.request_id = 0;
            }
        }
    }
}
