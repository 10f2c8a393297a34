//! Application Layer
//!
//! The stage pipeline: decoder, recovery engine, enrichment stages,
//! bet-stop enrichment and consumers, wired together by the facade.

pub mod bet_stop;
pub mod competitor;
pub mod consumer;
pub mod decoder;
mod enrich;
pub mod facade;
pub mod fixture;
pub mod markets;
pub mod pipeline;
pub mod player;
pub mod recovery;
pub mod stage;

pub use bet_stop::{BetStopStage, GroupTable};
pub use competitor::CompetitorStage;
pub use consumer::{BufferedConsumer, Consumer, FnConsumer, Simple};
pub use decoder::decode;
pub use facade::{ErrorListener, Sdk, SdkBuilder};
pub use fixture::FixtureStage;
pub use markets::MarketsStage;
pub use pipeline::Pipeline;
pub use player::PlayerStage;
pub use recovery::{ProducerState, Producers, RecoveryRequest, RecoveryStage};
pub use stage::{MessageReceiver, MessageSender, Stage, StageContext};
