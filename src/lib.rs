//! Unified Odds Feed SDK
//!
//! Re-exports the workspace libraries:
//!
//! - **feedlink**: broker consumer with reconnect, independent of the AMQP transport
//! - **oddsfeed**: feed decoding, producer recovery, enrichment and the `Sdk` facade
//!
//! ## Usage
//!
//! ```rust,ignore
//! use uof_sdk::oddsfeed::{Sdk, SdkConfig};
//!
//! let config = SdkConfig::load("config.yaml")?;
//! config.init_logging();
//!
//! Sdk::builder()
//!     .config(&config)
//!     .connector(my_amqp_connector)
//!     .consumer_fn(|mut rx| async move {
//!         while let Some(msg) = rx.recv().await {
//!             println!("{:?}", msg.header.message_type);
//!         }
//!         Ok(())
//!     })
//!     .run_until_ctrl_c()
//!     .await?;
//! ```

pub use feedlink;
pub use oddsfeed;
