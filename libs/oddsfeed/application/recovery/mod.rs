//! Producer recovery
//!
//! Pure state transitions live in [`state`]; [`RecoveryStage`] owns the
//! table, issues the API calls as sub-tasks and serialises their outcome
//! through a command channel.

mod commands;
mod engine;
mod state;

pub use commands::RecoveryRequest;
pub use engine::RecoveryStage;
pub use state::{Effects, ProducerState, Producers};
