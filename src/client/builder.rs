// ABOUTME: Builder for configuring and assembling a Gateway in one expression
// ABOUTME: Collects session settings, throughput limits and handlers before anything connects

use crate::client::correlator::{DeliverHandler, SubmitHandler};
use crate::client::error::SmppResult;
use crate::client::gateway::Gateway;
use crate::client::keepalive::KeepAliveConfig;
use crate::client::session::TcpConnector;
use crate::client::traits::Connector;
use crate::client::types::{BindCredentials, GatewayConfig, SessionConfig};
use std::sync::Arc;
use std::time::Duration;

/// Builds a [`Gateway`] with sensible defaults.
///
/// ```rust,no_run
/// use smpp_gateway::client::{BindCredentials, GatewayBuilder};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut gateway = GatewayBuilder::new(
///     "smsc.example.com",
///     2775,
///     BindCredentials::transceiver("system_id", "password"),
/// )
/// .tps(50)
/// .on_submit_response(|id, status, smsc_id| println!("{id}: {status:#x} {smsc_id}"))
/// .build()?;
///
/// gateway.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct GatewayBuilder {
    session: SessionConfig,
    config: GatewayConfig,
    submit: Option<SubmitHandler>,
    deliver: Option<DeliverHandler>,
}

impl GatewayBuilder {
    pub fn new(host: impl Into<String>, port: u16, credentials: BindCredentials) -> Self {
        Self {
            session: SessionConfig::new(host, port, credentials),
            config: GatewayConfig::default(),
            submit: None,
            deliver: None,
        }
    }

    pub fn keepalive(mut self, keepalive: KeepAliveConfig) -> Self {
        self.session = self.session.with_keepalive(keepalive);
        self
    }

    pub fn bind_timeout(mut self, timeout: Duration) -> Self {
        self.session = self.session.with_bind_timeout(timeout);
        self
    }

    /// Maximum submit_sm PDUs per second
    pub fn tps(mut self, tps: u32) -> Self {
        self.config = self.config.with_tps(tps);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.with_queue_capacity(capacity);
        self
    }

    pub fn health_check_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_health_check_interval(interval);
        self
    }

    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_idle_interval(interval);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_poll_interval(interval);
        self
    }

    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.config = self.config.with_pacing_delay(delay);
        self
    }

    pub fn on_submit_response<F>(mut self, handler: F) -> Self
    where
        F: Fn(u32, u32, String) + Send + Sync + 'static,
    {
        self.submit = Some(Arc::new(handler));
        self
    }

    pub fn on_delivery<F>(mut self, handler: F) -> Self
    where
        F: Fn(String, String) + Send + Sync + 'static,
    {
        self.deliver = Some(Arc::new(handler));
        self
    }

    /// Gateway over plain TCP
    pub fn build(self) -> SmppResult<Gateway<TcpConnector>> {
        self.build_with(TcpConnector)
    }

    /// Gateway over a custom transport
    pub fn build_with<C: Connector>(self, connector: C) -> SmppResult<Gateway<C>> {
        let mut gateway = Gateway::new(connector, self.session, self.config)?;
        gateway.set_handlers(self.submit, self.deliver);
        Ok(gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error::SmppError;
    use crate::client::testing::MockConnector;

    #[test]
    fn invalid_throughput_is_rejected_at_build() {
        let result = GatewayBuilder::new("localhost", 2775, BindCredentials::transceiver("a", "b"))
            .tps(0)
            .build();
        assert!(matches!(result, Err(SmppError::InvalidData(_))));
    }

    #[tokio::test]
    async fn builds_with_custom_connector() {
        let connector = MockConnector::default();
        let mut gateway =
            GatewayBuilder::new("localhost", 2775, BindCredentials::transceiver("a", "b"))
                .queue_capacity(4)
                .on_submit_response(|_, _, _| {})
                .on_delivery(|_, _| {})
                .build_with(connector.clone())
                .unwrap();

        gateway.start().await.unwrap();
        assert!(gateway.is_connected());
        assert_eq!(connector.connects(), 1);
        assert_eq!(gateway.queued(), 0);
    }
}
