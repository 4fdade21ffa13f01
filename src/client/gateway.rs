// ABOUTME: Public facade of the session engine: start, send and handler registration
// ABOUTME: Owns the outbound queue and launches the health, dispatch and read loops

use crate::client::correlator::{Correlator, DeliverHandler, SubmitHandler};
use crate::client::dispatcher::Dispatcher;
use crate::client::error::{SmppError, SmppResult};
use crate::client::manager::ConnectionManager;
use crate::client::rate_limit::RateLimiter;
use crate::client::reader::Reader;
use crate::client::traits::Connector;
use crate::client::types::{GatewayConfig, OutboundItem, SessionConfig};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::info;

/// SMS gateway over one SMPP transceiver session.
///
/// Register handlers, call [`start`](Gateway::start) once, then
/// [`send`](Gateway::send) messages. Outcomes arrive only through the
/// handlers: the submit handler with the SMSC's verdict and message id,
/// the deliver handler with the final delivery status.
pub struct Gateway<C: Connector> {
    manager: Arc<ConnectionManager<C>>,
    config: GatewayConfig,
    correlator: Correlator,
    queue: mpsc::Sender<OutboundItem>,
    // Taken by `start`
    pending: Option<(mpsc::Receiver<OutboundItem>, RateLimiter)>,
    tasks: Vec<JoinHandle<()>>,
}

impl<C: Connector> Gateway<C> {
    pub fn new(connector: C, session: SessionConfig, config: GatewayConfig) -> SmppResult<Self> {
        if config.queue_capacity == 0 {
            return Err(SmppError::InvalidData(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        let limiter = RateLimiter::new(config.tps)?;
        let (queue, receiver) = mpsc::channel(config.queue_capacity);

        Ok(Self {
            manager: Arc::new(ConnectionManager::new(connector, session)),
            config,
            correlator: Correlator::default(),
            queue,
            pending: Some((receiver, limiter)),
            tasks: Vec::new(),
        })
    }

    /// Called with (domain id, command_status, SMSC message id) for every
    /// correlated submit_sm_resp. Must be bound before `start`.
    pub fn bind_submit_handler<F>(&mut self, handler: F)
    where
        F: Fn(u32, u32, String) + Send + Sync + 'static,
    {
        self.correlator.set_submit_handler(Arc::new(handler));
    }

    /// Called with (SMSC message id, status keyword) for every delivery
    /// receipt. Must be bound before `start`.
    pub fn bind_deliver_handler<F>(&mut self, handler: F)
    where
        F: Fn(String, String) + Send + Sync + 'static,
    {
        self.correlator.set_deliver_handler(Arc::new(handler));
    }

    pub(crate) fn set_handlers(
        &mut self,
        submit: Option<SubmitHandler>,
        deliver: Option<DeliverHandler>,
    ) {
        self.correlator = Correlator::new(submit, deliver);
    }

    /// Bind to the SMSC and launch the background loops.
    ///
    /// If the initial bind fails nothing is launched and the gateway may be
    /// started again later.
    pub async fn start(&mut self) -> SmppResult<()> {
        if self.pending.is_none() {
            return Err(SmppError::InvalidState("gateway already started".to_string()));
        }

        self.manager.connect().await?;

        let Some((receiver, limiter)) = self.pending.take() else {
            return Err(SmppError::InvalidState("gateway already started".to_string()));
        };

        let health = Arc::clone(&self.manager).supervise(self.config.health_check_interval);
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.manager),
            limiter,
            receiver,
            &self.config,
        );
        let reader = Reader::new(
            Arc::clone(&self.manager),
            self.correlator.clone(),
            self.config.idle_interval,
        );

        self.tasks.push(tokio::spawn(health));
        self.tasks.push(tokio::spawn(dispatcher.run()));
        self.tasks.push(tokio::spawn(reader.run()));

        info!(tps = self.config.tps, "gateway started");
        Ok(())
    }

    /// Queue one message, waiting for room if the queue is full.
    ///
    /// Rejected up front when the session is down or `domain_id` cannot be
    /// used as a sequence number.
    pub async fn send(
        &self,
        domain_id: u32,
        sender: impl Into<String>,
        phone: impl Into<String>,
        text: impl Into<String>,
    ) -> SmppResult<()> {
        let item = self.admit(domain_id, sender, phone, text)?;
        self.queue
            .send(item)
            .await
            .map_err(|_| SmppError::InvalidState("dispatcher stopped".to_string()))
    }

    /// Like [`send`](Gateway::send) but fails with `QueueFull` instead of waiting
    pub fn try_send(
        &self,
        domain_id: u32,
        sender: impl Into<String>,
        phone: impl Into<String>,
        text: impl Into<String>,
    ) -> SmppResult<()> {
        let item = self.admit(domain_id, sender, phone, text)?;
        self.queue.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => SmppError::QueueFull,
            TrySendError::Closed(_) => SmppError::InvalidState("dispatcher stopped".to_string()),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Messages waiting in the outbound queue
    pub fn queued(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }

    fn admit(
        &self,
        domain_id: u32,
        sender: impl Into<String>,
        phone: impl Into<String>,
        text: impl Into<String>,
    ) -> SmppResult<OutboundItem> {
        let item = OutboundItem::new(domain_id, sender, phone, text)?;
        if !self.is_connected() {
            return Err(SmppError::InvalidState("not connected to SMSC".to_string()));
        }
        Ok(item)
    }
}

impl<C: Connector> Drop for Gateway<C> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
