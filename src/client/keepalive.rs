// ABOUTME: SMPP keep-alive task that sends periodic enquire_link PDUs on a bound session
// ABOUTME: Runs beside the read loop; the session answers and swallows the responses

use crate::client::session::SequenceCounter;
use crate::codec::Frame;
use crate::connection::FrameWriter;
use crate::datatypes::EnquireLink;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Configuration for SMPP keep-alive functionality
///
/// Controls the periodic enquire_link PDUs sent to keep an otherwise idle
/// session from being dropped by the SMSC or a NAT in between.
///
/// # Example
///
/// ```rust
/// use smpp_gateway::client::KeepAliveConfig;
/// use std::time::Duration;
///
/// // Default configuration (30s interval)
/// let config = KeepAliveConfig::default();
///
/// // Custom interval
/// let config = KeepAliveConfig::new(Duration::from_secs(60));
///
/// // Disabled keep-alive
/// let config = KeepAliveConfig::disabled();
/// assert!(!config.enabled);
/// ```
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between enquire_link PDUs (default: 30 seconds)
    pub interval: Duration,

    /// Whether keep-alive is enabled (default: true)
    pub enabled: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            enabled: true,
        }
    }
}

impl KeepAliveConfig {
    /// Create a new keep-alive configuration with custom interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Create a disabled keep-alive configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Spawns the enquire_link loop for one session.
///
/// The first tick fires one full interval after bind. The task ends on the
/// first write failure; the read or dispatch loop reports the broken
/// transport on its own.
pub(crate) fn spawn<W>(
    writer: Arc<Mutex<FrameWriter<W>>>,
    sequence: Arc<SequenceCounter>,
    interval: Duration,
) -> AbortHandle
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // interval() completes its first tick immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let sequence_number = sequence.next();
            let frame = Frame::EnquireLink(EnquireLink::new(sequence_number));
            if let Err(e) = writer.lock().await.write_frame(&frame).await {
                warn!(error = %e, "enquire_link failed, stopping keep-alive");
                break;
            }
            debug!(sequence_number, "enquire_link sent");
        }
    });

    task.abort_handle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::FrameReader;
    use tokio::io::duplex;

    #[tokio::test(start_paused = true)]
    async fn sends_enquire_link_every_interval() {
        let (client, server) = duplex(1024);
        let writer = Arc::new(Mutex::new(FrameWriter::new(client)));
        let sequence = Arc::new(SequenceCounter::default());
        let mut reader = FrameReader::new(server);

        let handle = spawn(writer, sequence, Duration::from_secs(30));

        let first = reader.read_frame().await.unwrap().unwrap();
        assert!(matches!(first, Frame::EnquireLink(ref pdu) if pdu.sequence_number == 1));
        let second = reader.read_frame().await.unwrap().unwrap();
        assert!(matches!(second, Frame::EnquireLink(ref pdu) if pdu.sequence_number == 2));

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn first_ping_waits_one_interval() {
        let (client, server) = duplex(1024);
        let writer = Arc::new(Mutex::new(FrameWriter::new(client)));
        let mut reader = FrameReader::new(server);

        let started = tokio::time::Instant::now();
        let handle = spawn(writer, Arc::new(SequenceCounter::default()), Duration::from_secs(10));

        reader.read_frame().await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_secs(10));

        handle.abort();
    }
}
