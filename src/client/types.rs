// ABOUTME: Supporting types for the gateway including credentials, configuration and queued items
// ABOUTME: Configuration structs follow a Default + with_* builder style with production defaults

use crate::client::error::{SmppError, SmppResult};
use crate::client::keepalive::KeepAliveConfig;
use crate::datatypes::{DataCoding, EsmClass, NumericPlanIndicator, TypeOfNumber};
use std::fmt;
use std::time::Duration;

/// Largest value a request sequence number may carry
pub const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

/// SMPP bind operation credentials
#[derive(Debug, Clone)]
pub struct BindCredentials {
    /// System identifier for authentication
    pub system_id: String,
    /// Password for authentication
    pub password: String,
    /// System type (optional, defaults to empty string)
    pub system_type: Option<String>,
}

impl BindCredentials {
    /// Credentials for a transceiver session, the only bind type the gateway uses
    pub fn transceiver(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.into(),
            system_type: None,
        }
    }

    /// Set system type
    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = Some(system_type.into());
        self
    }
}

/// Where and how to bind the transport session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub credentials: BindCredentials,
    pub keepalive: KeepAliveConfig,
    /// Upper bound for TCP connect plus the bind handshake
    pub bind_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16, credentials: BindCredentials) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
            keepalive: KeepAliveConfig::default(),
            bind_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_keepalive(mut self, keepalive: KeepAliveConfig) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_bind_timeout(mut self, timeout: Duration) -> Self {
        self.bind_timeout = timeout;
        self
    }

    /// `host:port` form accepted by `TcpStream::connect`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("localhost", 2775, BindCredentials::transceiver("", ""))
    }
}

/// Tuning knobs for the send pipeline and its supervising loops
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Submissions per second admitted by the rate limiter
    pub tps: u32,
    /// Capacity of the outbound queue
    pub queue_capacity: usize,
    /// Delay between reconnect attempts while disconnected
    pub health_check_interval: Duration,
    /// Sleep of the dispatch and read loops while disconnected
    pub idle_interval: Duration,
    /// Sleep of the dispatch loop when the queue is empty
    pub poll_interval: Duration,
    /// Pause after every physical submission
    pub pacing_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            tps: 100,
            queue_capacity: 100,
            health_check_interval: Duration::from_secs(5),
            idle_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            pacing_delay: Duration::from_micros(500),
        }
    }
}

impl GatewayConfig {
    pub fn with_tps(mut self, tps: u32) -> Self {
        self.tps = tps;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }
}

/// Per-part submit_sm fields that are not addresses or payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitParams {
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub esm_class: EsmClass,
    pub registered_delivery: u8,
    pub data_coding: DataCoding,
}

impl Default for SubmitParams {
    /// Alphanumeric sender, international destination
    fn default() -> Self {
        Self {
            source_addr_ton: TypeOfNumber::Alphanumeric,
            source_addr_npi: NumericPlanIndicator::Isdn,
            dest_addr_ton: TypeOfNumber::International,
            dest_addr_npi: NumericPlanIndicator::Isdn,
            esm_class: EsmClass::default(),
            registered_delivery: 0,
            data_coding: DataCoding::SmscDefault,
        }
    }
}

/// One recipient's message waiting in the outbound queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundItem {
    pub domain_id: u32,
    pub sender: String,
    pub phone: String,
    pub text: String,
}

impl OutboundItem {
    /// The domain id doubles as the submit_sm sequence number, so it must be a
    /// valid non-zero request sequence.
    pub fn new(
        domain_id: u32,
        sender: impl Into<String>,
        phone: impl Into<String>,
        text: impl Into<String>,
    ) -> SmppResult<Self> {
        if domain_id == 0 || domain_id > MAX_SEQUENCE_NUMBER {
            return Err(SmppError::InvalidData(format!(
                "domain id {domain_id} outside 1..={MAX_SEQUENCE_NUMBER}"
            )));
        }

        Ok(Self {
            domain_id,
            sender: sender.into(),
            phone: phone.into(),
            text: text.into(),
        })
    }
}

/// SMSC-assigned message id as carried in submit_sm_resp and receipts.
///
/// SMSCs disagree on whether ids are decimal or hexadecimal; the same
/// message may even appear in both forms across the response and the
/// receipt. `as_u64` tries decimal first and falls back to hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SmscId(String);

impl SmscId {
    pub fn new(raw: impl Into<String>) -> Self {
        SmscId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.0
            .parse::<u64>()
            .ok()
            .or_else(|| u64::from_str_radix(&self.0, 16).ok())
    }

    /// Decimal rendering used as the storage key, or the raw id when it is
    /// neither decimal nor hex
    pub fn to_decimal(&self) -> String {
        match self.as_u64() {
            Some(value) => value.to_string(),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for SmscId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SmscId {
    fn from(raw: &str) -> Self {
        SmscId::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_item_bounds() {
        assert!(OutboundItem::new(1, "Shop", "447700900123", "hi").is_ok());
        assert!(OutboundItem::new(MAX_SEQUENCE_NUMBER, "Shop", "1", "hi").is_ok());
        assert!(matches!(
            OutboundItem::new(0, "Shop", "1", "hi"),
            Err(SmppError::InvalidData(_))
        ));
        assert!(matches!(
            OutboundItem::new(0x8000_0000, "Shop", "1", "hi"),
            Err(SmppError::InvalidData(_))
        ));
    }

    #[test]
    fn smsc_id_forms() {
        assert_eq!(SmscId::new("1203837180").as_u64(), Some(1_203_837_180));
        assert_eq!(SmscId::new("47C1A2FC").as_u64(), Some(0x47C1_A2FC));
        assert_eq!(SmscId::new("47C1A2FC").to_decimal(), "1203872508");
        assert_eq!(SmscId::new("not-an-id").as_u64(), None);
        assert_eq!(SmscId::new("not-an-id").to_decimal(), "not-an-id");
    }

    #[test]
    fn hex_response_matches_decimal_receipt() {
        let accepted = SmscId::new("1A").to_decimal();
        assert_eq!(SmscId::from("26").to_decimal(), accepted);
        assert_ne!(SmscId::from("27").to_decimal(), accepted);
    }

    #[test]
    fn default_submit_params() {
        let params = SubmitParams::default();
        assert_eq!(u8::from(params.source_addr_ton), 5);
        assert_eq!(u8::from(params.source_addr_npi), 1);
        assert_eq!(u8::from(params.dest_addr_ton), 1);
        assert_eq!(u8::from(params.dest_addr_npi), 1);
    }

    #[test]
    fn config_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.tps, 100);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.health_check_interval, Duration::from_secs(5));

        let session = SessionConfig::default().with_bind_timeout(Duration::from_secs(3));
        assert_eq!(session.address(), "localhost:2775");
        assert_eq!(session.bind_timeout, Duration::from_secs(3));
    }
}
