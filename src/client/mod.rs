// ABOUTME: SMS gateway module built on a single SMPP transceiver session
// ABOUTME: Exports the gateway facade, its builder, configuration, error types and transport traits

//! SMS Gateway Module
//!
//! A [`Gateway`] keeps one transceiver session bound to an SMSC and runs
//! three background loops over it:
//!
//! * **Health** - reconnects at a fixed interval whenever the session is lost
//! * **Dispatch** - drains the outbound queue, segmenting long messages and
//!   pacing submissions to the configured throughput
//! * **Read** - correlates submit_sm_resp and delivery receipts back to the
//!   caller's handlers
//!
//! Transport traits use native async fn in traits (no async_trait dependency),
//! so tests and alternative transports can stand in for the TCP session.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smpp_gateway::client::{BindCredentials, GatewayBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut gateway = GatewayBuilder::new(
//!     "localhost",
//!     2775,
//!     BindCredentials::transceiver("system_id", "password"),
//! )
//! .on_submit_response(|domain_id, status, smsc_id| {
//!     println!("message {domain_id}: status {status:#x}, smsc id {smsc_id}");
//! })
//! .on_delivery(|smsc_id, status| {
//!     println!("smsc id {smsc_id} is now {status}");
//! })
//! .build()?;
//!
//! gateway.start().await?;
//! gateway.send(1001, "Shop", "447700900123", "Your order has shipped").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Correlation
//!
//! The caller's `domain_id` travels as the SMPP sequence number of the
//! message's final part, so the SMSC echoes it back in submit_sm_resp.
//! Earlier parts of a long message carry sequence 0 and are never reported.

pub mod builder;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod keepalive;
pub mod manager;
pub mod rate_limit;
pub mod reader;
pub mod segment;
pub mod session;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::GatewayBuilder;
pub use correlator::{Correlator, DeliveryReceipt};
pub use error::{SmppError, SmppResult};
pub use gateway::Gateway;
pub use keepalive::KeepAliveConfig;
pub use manager::ConnectionManager;
pub use rate_limit::RateLimiter;
pub use segment::{Encoding, Segment, SegmentPlan};
pub use session::{TcpConnector, TcpSession};
pub use traits::{Connector, Transport};
pub use types::{
    BindCredentials, GatewayConfig, OutboundItem, SessionConfig, SmscId, SubmitParams,
    MAX_SEQUENCE_NUMBER,
};
