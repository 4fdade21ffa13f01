// ABOUTME: Single consumer of the outbound queue: rate limits, segments and submits each message
// ABOUTME: Pauses draining while disconnected so backpressure builds in the queue instead

use crate::client::error::{SmppError, SmppResult};
use crate::client::manager::ConnectionManager;
use crate::client::rate_limit::RateLimiter;
use crate::client::segment;
use crate::client::traits::{Connector, Transport};
use crate::client::types::{GatewayConfig, OutboundItem};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, trace, warn};

pub struct Dispatcher<C: Connector> {
    manager: Arc<ConnectionManager<C>>,
    limiter: RateLimiter,
    queue: mpsc::Receiver<OutboundItem>,
    idle_interval: Duration,
    poll_interval: Duration,
    pacing_delay: Duration,
}

impl<C: Connector> Dispatcher<C> {
    pub fn new(
        manager: Arc<ConnectionManager<C>>,
        limiter: RateLimiter,
        queue: mpsc::Receiver<OutboundItem>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            manager,
            limiter,
            queue,
            idle_interval: config.idle_interval,
            poll_interval: config.poll_interval,
            pacing_delay: config.pacing_delay,
        }
    }

    /// Drain the queue until every sender is gone
    pub async fn run(mut self) {
        loop {
            if !self.manager.is_connected() {
                tokio::time::sleep(self.idle_interval).await;
                continue;
            }

            let item = match self.queue.try_recv() {
                Ok(item) => item,
                Err(TryRecvError::Empty) => {
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
                Err(TryRecvError::Disconnected) => {
                    debug!("outbound queue closed, dispatcher exiting");
                    return;
                }
            };

            if let Err(e) = self.dispatch(&item).await {
                error!(domain_id = item.domain_id, error = %e, "message not accepted by SMSC");
            }
        }
    }

    /// Send every part of one message.
    ///
    /// Failures of non-final parts are logged and sending continues; the
    /// final part's outcome is the message's outcome. A transport-level
    /// failure also marks the session as lost.
    pub async fn dispatch(&self, item: &OutboundItem) -> SmppResult<()> {
        let plan = segment::plan(item.domain_id, &item.text)?;

        let Some(session) = self.manager.session().await else {
            return Err(SmppError::InvalidState("not connected to SMSC".to_string()));
        };

        let count = plan.segments.len();
        debug!(
            domain_id = item.domain_id,
            parts = count,
            concatenated = plan.is_concatenated(),
            encoding = ?plan.encoding,
            "dispatching message"
        );

        for (index, part) in plan.segments.iter().enumerate() {
            let last = index + 1 == count;
            let params = plan.submit_params(part);

            self.limiter.wait().await;
            session.override_next_sequence(part.sequence_number);
            let result = session
                .submit_encoded(&item.sender, &item.phone, &part.payload, &params)
                .await;
            tokio::time::sleep(self.pacing_delay).await;

            match result {
                Ok(sequence_number) => {
                    trace!(
                        domain_id = item.domain_id,
                        part = index + 1,
                        sequence_number,
                        "part submitted"
                    );
                }
                Err(e) => {
                    if e.is_transport() {
                        self.manager.invalidate(&session).await;
                    }
                    if last {
                        return Err(e);
                    }
                    warn!(
                        domain_id = item.domain_id,
                        part = index + 1,
                        error = %e,
                        "failed to submit message part"
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{MockConnector, MockEvent};
    use crate::client::types::SessionConfig;
    use crate::datatypes::CommandStatus;
    use std::io;

    struct Harness {
        connector: MockConnector,
        manager: Arc<ConnectionManager<MockConnector>>,
        queue: mpsc::Sender<OutboundItem>,
        dispatcher: Dispatcher<MockConnector>,
    }

    async fn harness(tps: u32) -> Harness {
        let connector = MockConnector::default();
        let manager = Arc::new(ConnectionManager::new(
            connector.clone(),
            SessionConfig::default(),
        ));
        manager.connect().await.unwrap();

        let config = GatewayConfig::default().with_tps(tps);
        let (queue, receiver) = mpsc::channel(config.queue_capacity);
        let dispatcher = Dispatcher::new(
            Arc::clone(&manager),
            RateLimiter::new(tps).unwrap(),
            receiver,
            &config,
        );

        Harness {
            connector,
            manager,
            queue,
            dispatcher,
        }
    }

    fn submit_sequence(event: &MockEvent) -> u32 {
        match event {
            MockEvent::Submit {
                sequence_number, ..
            } => *sequence_number,
            other => panic!("Expected submission, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_part_uses_domain_id() {
        let h = harness(100).await;
        let item = OutboundItem::new(31, "Shop", "447700900123", "hello").unwrap();

        h.dispatcher.dispatch(&item).await.unwrap();

        let submissions = h.connector.last_session().unwrap().submissions();
        assert_eq!(submissions.len(), 1);
        match &submissions[0] {
            MockEvent::Submit {
                sequence_number,
                source,
                destination,
                payload,
                params,
            } => {
                assert_eq!(*sequence_number, 31);
                assert_eq!(source, "Shop");
                assert_eq!(destination, "447700900123");
                assert_eq!(payload, b"hello");
                assert_eq!(params.registered_delivery, 1);
            }
            other => panic!("Expected submission, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn multi_part_correlates_only_last() {
        let h = harness(100).await;
        let item = OutboundItem::new(77, "Shop", "447700900123", "x".repeat(400)).unwrap();

        h.dispatcher.dispatch(&item).await.unwrap();

        let submissions = h.connector.last_session().unwrap().submissions();
        let sequences: Vec<u32> = submissions.iter().map(submit_sequence).collect();
        assert_eq!(sequences, vec![0, 0, 77]);
    }

    #[tokio::test(start_paused = true)]
    async fn non_final_failure_is_best_effort() {
        let h = harness(100).await;
        let session = h.connector.last_session().unwrap();
        session.fail_submit(0, SmppError::Protocol(CommandStatus::ThrottlingError));

        let item = OutboundItem::new(5, "Shop", "1", "x".repeat(400)).unwrap();
        h.dispatcher.dispatch(&item).await.unwrap();

        assert_eq!(session.submissions().len(), 2);
        assert!(h.manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn final_failure_is_reported() {
        let h = harness(100).await;
        let session = h.connector.last_session().unwrap();
        session.fail_submit(2, SmppError::Protocol(CommandStatus::MessageQueueFull));

        let item = OutboundItem::new(5, "Shop", "1", "x".repeat(400)).unwrap();
        let err = h.dispatcher.dispatch(&item).await.unwrap_err();

        assert!(matches!(err, SmppError::Protocol(CommandStatus::MessageQueueFull)));
        assert!(h.manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_disconnects() {
        let h = harness(100).await;
        let session = h.connector.last_session().unwrap();
        session.fail_submit(
            0,
            SmppError::Connection(io::Error::from(io::ErrorKind::BrokenPipe)),
        );

        let item = OutboundItem::new(5, "Shop", "1", "hi").unwrap();
        let err = h.dispatcher.dispatch(&item).await.unwrap_err();

        assert!(err.is_transport());
        assert!(!h.manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn parts_are_rate_limited() {
        let h = harness(2).await;
        let item = OutboundItem::new(9, "Shop", "1", "x".repeat(400)).unwrap();

        let start = tokio::time::Instant::now();
        h.dispatcher.dispatch(&item).await.unwrap();

        // Three parts at 2/s: admitted at 0, 500ms and 1s
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn queue_is_held_while_disconnected() {
        let h = harness(100).await;
        let Harness {
            connector,
            manager,
            queue,
            dispatcher,
        } = h;

        manager.disconnect().await;
        queue
            .send(OutboundItem::new(1, "Shop", "1", "held").unwrap())
            .await
            .unwrap();

        let task = tokio::spawn(dispatcher.run());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(connector.last_session().unwrap().submissions().is_empty());

        manager.connect().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let fresh = connector.last_session().unwrap();
        assert_eq!(fresh.submissions().len(), 1);

        drop(queue);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(task.is_finished());
    }
}
