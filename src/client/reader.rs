// ABOUTME: Inbound loop that drains the session and demultiplexes frames to the correlator
// ABOUTME: Protocol faults are logged and skipped; transport faults mark the session lost

use crate::client::correlator::Correlator;
use crate::client::manager::ConnectionManager;
use crate::client::traits::{Connector, Transport};
use crate::codec::Frame;
use crate::datatypes::CommandStatus;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};

pub struct Reader<C: Connector> {
    manager: Arc<ConnectionManager<C>>,
    correlator: Correlator,
    idle_interval: Duration,
}

impl<C: Connector> Reader<C> {
    pub fn new(
        manager: Arc<ConnectionManager<C>>,
        correlator: Correlator,
        idle_interval: Duration,
    ) -> Self {
        Self {
            manager,
            correlator,
            idle_interval,
        }
    }

    pub async fn run(self) {
        loop {
            let session = match self.manager.session().await {
                Some(session) if self.manager.is_connected() => session,
                _ => {
                    tokio::time::sleep(self.idle_interval).await;
                    continue;
                }
            };

            self.read_once(&session).await;
        }
    }

    /// Perform one blocking read and handle whatever arrives
    pub async fn read_once(&self, session: &Arc<C::Session>) {
        match session.read_frame().await {
            Ok(frame) => self.handle(session, frame).await,
            Err(e) if e.is_transport() => {
                error!(error = %e, "read failed, session lost");
                self.manager.invalidate(session).await;
            }
            Err(e) => warn!(error = %e, "discarding unreadable frame"),
        }
    }

    async fn handle(&self, session: &Arc<C::Session>, frame: Frame) {
        match frame {
            Frame::SubmitSmResp(resp) => {
                if resp.command_status.is_throttling_related() {
                    warn!(
                        sequence_number = resp.sequence_number,
                        status = ?resp.command_status,
                        "SMSC is throttling submissions"
                    );
                }
                self.correlator.on_submit_response(
                    resp.sequence_number,
                    resp.command_status.code(),
                    resp.message_id,
                );
            }
            Frame::DeliverSm(pdu) => {
                // The SMSC redelivers until acknowledged, so answer first
                if let Err(e) = session
                    .acknowledge_delivery(pdu.sequence_number, CommandStatus::Ok)
                    .await
                {
                    error!(
                        sequence_number = pdu.sequence_number,
                        error = %e,
                        "deliver_sm_resp failed"
                    );
                    if e.is_transport() {
                        self.manager.invalidate(session).await;
                    }
                }
                self.correlator.on_delivery(&pdu.text());
            }
            Frame::GenericNack(nack) => {
                warn!(
                    sequence_number = nack.sequence_number,
                    status = ?nack.command_status,
                    "generic_nack from SMSC"
                );
            }
            Frame::UnbindResp(_) => debug!("unbind_resp"),
            other => trace!(command_id = ?other.command_id(), "ignoring frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::correlator::{DeliverHandler, SubmitHandler};
    use crate::client::error::SmppError;
    use crate::client::testing::{MockConnector, MockEvent};
    use crate::client::types::SessionConfig;
    use crate::codec::CodecError;
    use crate::datatypes::{DeliverSm, SubmitSmResponse};
    use std::io;
    use tokio::sync::mpsc;

    const RECEIPT: &str = "id:1203837180 sub:001 dlvrd:1 submit date:1911251537 done date:1911251537 stat:DELIVRD err:000 TEXT:...";

    struct Harness {
        connector: MockConnector,
        manager: Arc<ConnectionManager<MockConnector>>,
        submits: mpsc::UnboundedReceiver<(u32, u32, String)>,
        deliveries: mpsc::UnboundedReceiver<(String, String)>,
        reader: Reader<MockConnector>,
    }

    async fn harness() -> Harness {
        let connector = MockConnector::default();
        let manager = Arc::new(ConnectionManager::new(
            connector.clone(),
            SessionConfig::default(),
        ));
        manager.connect().await.unwrap();

        let (submit_tx, submits) = mpsc::unbounded_channel();
        let (deliver_tx, deliveries) = mpsc::unbounded_channel();
        let submit: SubmitHandler = Arc::new(move |id, status, smsc_id| {
            let _ = submit_tx.send((id, status, smsc_id));
        });
        let deliver: DeliverHandler = Arc::new(move |smsc_id, status| {
            let _ = deliver_tx.send((smsc_id, status));
        });

        let reader = Reader::new(
            Arc::clone(&manager),
            Correlator::new(Some(submit), Some(deliver)),
            Duration::from_secs(1),
        );

        Harness {
            connector,
            manager,
            submits,
            deliveries,
            reader,
        }
    }

    #[tokio::test]
    async fn submit_response_reaches_handler() {
        let mut h = harness().await;
        let session = h.manager.session().await.unwrap();
        h.connector
            .last_session()
            .unwrap()
            .push_inbound(Ok(Frame::SubmitSmResp(SubmitSmResponse::new(42, "abc"))));

        h.reader.read_once(&session).await;

        assert_eq!(h.submits.recv().await.unwrap(), (42, 0, "abc".to_string()));
    }

    #[tokio::test]
    async fn zero_sequence_response_is_ignored() {
        let mut h = harness().await;
        let session = h.manager.session().await.unwrap();
        let mock = h.connector.last_session().unwrap();
        mock.push_inbound(Ok(Frame::SubmitSmResp(SubmitSmResponse::new(0, "part"))));
        mock.push_inbound(Ok(Frame::SubmitSmResp(SubmitSmResponse::error(
            8,
            CommandStatus::ThrottlingError,
        ))));

        h.reader.read_once(&session).await;
        h.reader.read_once(&session).await;

        assert_eq!(h.submits.recv().await.unwrap(), (8, 0x58, String::new()));
        assert!(h.submits.try_recv().is_err());
    }

    #[tokio::test]
    async fn delivery_is_acknowledged_then_correlated() {
        let mut h = harness().await;
        let session = h.manager.session().await.unwrap();
        let mock = h.connector.last_session().unwrap();
        mock.push_inbound(Ok(Frame::DeliverSm(Box::new(DeliverSm::receipt(
            12, RECEIPT,
        )))));

        h.reader.read_once(&session).await;

        assert_eq!(
            mock.events(),
            vec![MockEvent::Acknowledge {
                sequence_number: 12,
                status: CommandStatus::Ok,
            }]
        );
        assert_eq!(
            h.deliveries.recv().await.unwrap(),
            ("1203837180".to_string(), "DELIVRD".to_string())
        );
    }

    #[tokio::test]
    async fn unparseable_delivery_is_still_acknowledged() {
        let mut h = harness().await;
        let session = h.manager.session().await.unwrap();
        let mock = h.connector.last_session().unwrap();
        mock.push_inbound(Ok(Frame::DeliverSm(Box::new(DeliverSm::receipt(
            3,
            "hello from a handset",
        )))));

        h.reader.read_once(&session).await;

        assert_eq!(mock.events().len(), 1);
        assert!(h.deliveries.try_recv().is_err());
    }

    #[tokio::test]
    async fn protocol_error_keeps_session() {
        let h = harness().await;
        let session = h.manager.session().await.unwrap();
        h.connector
            .last_session()
            .unwrap()
            .push_inbound(Err(SmppError::Codec(CodecError::FieldValidation {
                field: "short_message",
                reason: "PDU body ends before this field".to_string(),
            })));

        h.reader.read_once(&session).await;
        assert!(h.manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_stops_reads_until_reconnected() {
        let h = harness().await;
        let first = h.connector.last_session().unwrap();
        first.push_inbound(Err(SmppError::Connection(io::Error::from(
            io::ErrorKind::ConnectionReset,
        ))));

        let manager = Arc::clone(&h.manager);
        let connector = h.connector.clone();
        let task = tokio::spawn(h.reader.run());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!manager.is_connected());
        assert_eq!(first.reads(), 1);

        manager.connect().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let second = connector.last_session().unwrap();
        assert_eq!(second.reads(), 1);
        assert_eq!(first.reads(), 1);

        task.abort();
    }
}
