pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod frame;

mod macros;


// Re-export codec types for direct access
pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader, PduRegistry};

// Re-export the gateway API for easy access
pub use client::{
    BindCredentials, Gateway, GatewayBuilder, GatewayConfig, SessionConfig, SmppError, SmppResult,
};

/// Error returned by the demo and by callers that do not need to match on
/// [`SmppError`] variants.
///
/// # Examples
///
/// ```rust,no_run
/// use smpp_gateway::{BindCredentials, GatewayBuilder};
///
/// #[tokio::main]
/// async fn main() -> smpp_gateway::Result<()> {
///     let mut gateway = GatewayBuilder::new(
///         "localhost",
///         2775,
///         BindCredentials::transceiver("system_id", "password"),
///     )
///     .tps(10)
///     .build()?;
///
///     gateway.start().await?;
///     gateway.send(1, "Shop", "447700900123", "Hello, World!").await?;
///     Ok(())
/// }
/// ```
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
