//! In-memory Transport and Connector for exercising the session loops.

use crate::client::error::{SmppError, SmppResult};
use crate::client::traits::{Connector, Transport};
use crate::client::types::{SessionConfig, SubmitParams};
use crate::codec::Frame;
use crate::datatypes::CommandStatus;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Everything the gateway did to a mock session, in order
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Unbind,
    Close,
    Submit {
        sequence_number: u32,
        source: String,
        destination: String,
        payload: Vec<u8>,
        params: SubmitParams,
    },
    Acknowledge {
        sequence_number: u32,
        status: CommandStatus,
    },
}

struct Inner {
    events: Mutex<Vec<MockEvent>>,
    inbound_tx: mpsc::UnboundedSender<SmppResult<Frame>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<SmppResult<Frame>>>,
    next_override: Mutex<Option<u32>>,
    counter: AtomicU32,
    submits: AtomicUsize,
    submit_failures: Mutex<HashMap<usize, SmppError>>,
    reads: AtomicUsize,
}

/// Cheap to clone; clones share state so a test can keep a handle to the
/// session the manager owns.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Inner>,
}

impl Default for MockTransport {
    fn default() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                events: Mutex::new(Vec::new()),
                inbound_tx,
                inbound_rx: tokio::sync::Mutex::new(inbound_rx),
                next_override: Mutex::new(None),
                counter: AtomicU32::new(0),
                submits: AtomicUsize::new(0),
                submit_failures: Mutex::new(HashMap::new()),
                reads: AtomicUsize::new(0),
            }),
        }
    }
}

impl MockTransport {
    /// Queue a result for `read_frame` to return
    pub fn push_inbound(&self, frame: SmppResult<Frame>) {
        let _ = self.inner.inbound_tx.send(frame);
    }

    /// Make the `index`-th submission (0-based, counted per session) fail
    pub fn fail_submit(&self, index: usize, error: SmppError) {
        self.inner.submit_failures.lock().unwrap().insert(index, error);
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.inner.events.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<MockEvent> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, MockEvent::Submit { .. }))
            .collect()
    }

    /// Number of `read_frame` calls that have started
    pub fn reads(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    fn record(&self, event: MockEvent) {
        self.inner.events.lock().unwrap().push(event);
    }
}

impl Transport for MockTransport {
    async fn unbind(&self) -> SmppResult<()> {
        self.record(MockEvent::Unbind);
        Ok(())
    }

    async fn close(&self) -> SmppResult<()> {
        self.record(MockEvent::Close);
        self.push_inbound(Err(SmppError::ConnectionClosed));
        Ok(())
    }

    fn override_next_sequence(&self, sequence_number: u32) {
        *self.inner.next_override.lock().unwrap() = Some(sequence_number);
    }

    async fn read_frame(&self) -> SmppResult<Frame> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        let mut inbound = self.inner.inbound_rx.lock().await;
        match inbound.recv().await {
            Some(result) => result,
            None => Err(SmppError::ConnectionClosed),
        }
    }

    async fn submit_encoded(
        &self,
        source: &str,
        destination: &str,
        payload: &[u8],
        params: &SubmitParams,
    ) -> SmppResult<u32> {
        let index = self.inner.submits.fetch_add(1, Ordering::SeqCst);
        let sequence_number = self
            .inner
            .next_override
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| self.inner.counter.fetch_add(1, Ordering::SeqCst) + 1);

        if let Some(error) = self.inner.submit_failures.lock().unwrap().remove(&index) {
            return Err(error);
        }

        self.record(MockEvent::Submit {
            sequence_number,
            source: source.to_string(),
            destination: destination.to_string(),
            payload: payload.to_vec(),
            params: *params,
        });
        Ok(sequence_number)
    }

    async fn acknowledge_delivery(
        &self,
        sequence_number: u32,
        status: CommandStatus,
    ) -> SmppResult<()> {
        self.record(MockEvent::Acknowledge {
            sequence_number,
            status,
        });
        Ok(())
    }
}

#[derive(Default)]
struct ConnectorState {
    attempts: AtomicUsize,
    failures_remaining: AtomicUsize,
    sessions: Mutex<Vec<MockTransport>>,
}

/// Hands out `MockTransport`s and remembers them
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<ConnectorState>,
}

impl MockConnector {
    /// The next `count` connect attempts fail with a refused connection
    pub fn fail_next_connects(&self, count: usize) {
        self.state.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Connect attempts so far, failed ones included
    pub fn connects(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    /// Most recently bound session
    pub fn last_session(&self) -> Option<MockTransport> {
        self.state.sessions.lock().unwrap().last().cloned()
    }

    pub fn sessions(&self) -> usize {
        self.state.sessions.lock().unwrap().len()
    }
}

impl Connector for MockConnector {
    type Session = MockTransport;

    async fn connect(&self, _config: &SessionConfig) -> SmppResult<MockTransport> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .state
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SmppError::Connection(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            )));
        }

        let session = MockTransport::default();
        self.state.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }
}
