//! Messages between the recovery driver and its request sub-tasks

use crate::domain::Producer;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 0 until the first request seeds it
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide unique, increasing recovery request id
///
/// The sequence starts at the process start time in milliseconds, so
/// nodes sharing one bookmaker feed do not reuse each other's ids.
pub(crate) fn next_request_id() -> u64 {
    let seed = Utc::now().timestamp_millis().max(1) as u64;
    let _ = NEXT_REQUEST_ID.compare_exchange(0, seed, Ordering::Relaxed, Ordering::Relaxed);
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// A recovery call the driver wants issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryRequest {
    pub producer: Producer,
    /// 0 for a full snapshot
    pub after: i64,
    pub request_id: u64,
}

/// Posted back by a sub-task; the driver is the only writer of state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Failed { producer: Producer, request_id: u64 },
}
