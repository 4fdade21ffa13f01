// ABOUTME: Owns the session lifecycle: bind, unbind, rebind and the shared connected flag
// ABOUTME: A supervising loop reconnects at a fixed interval whenever the session is lost

use crate::client::error::SmppResult;
use crate::client::traits::{Connector, Transport};
use crate::client::types::SessionConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Connection state machine with two states, Disconnected and Connected.
///
/// The flag is written only here and read by every loop before each
/// iteration. Lifecycle changes are serialised by an internal lock so a
/// reconnect never interleaves with another disconnect.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    config: SessionConfig,
    session: RwLock<Option<Arc<C::Session>>>,
    connected: AtomicBool,
    lifecycle: Mutex<()>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, config: SessionConfig) -> Self {
        Self {
            connector,
            config,
            session: RwLock::new(None),
            connected: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Current session, if one is bound
    pub async fn session(&self) -> Option<Arc<C::Session>> {
        self.session.read().await.clone()
    }

    /// Bind a new session. On failure the manager stays disconnected.
    pub async fn connect(&self) -> SmppResult<()> {
        let _guard = self.lifecycle.lock().await;
        self.connect_locked().await
    }

    /// Best-effort unbind and close. Errors are logged, never returned.
    pub async fn disconnect(&self) {
        let _guard = self.lifecycle.lock().await;
        self.disconnect_locked().await;
    }

    /// Disconnect followed by connect, as one lifecycle step
    pub async fn reconnect(&self) -> SmppResult<()> {
        let _guard = self.lifecycle.lock().await;
        self.disconnect_locked().await;
        self.connect_locked().await
    }

    /// Mark `failed` as dead after a transport-level fault.
    ///
    /// Only acts if `failed` is still the current session, so a loop that
    /// reports a fault on a session that has already been replaced cannot
    /// tear down its successor.
    pub async fn invalidate(&self, failed: &Arc<C::Session>) {
        let _guard = self.lifecycle.lock().await;

        let current = self.session.read().await.clone();
        match current {
            Some(current) if Arc::ptr_eq(&current, failed) => {
                warn!("session lost, marking disconnected");
                self.disconnect_locked().await;
            }
            _ => debug!("ignoring fault reported on a stale session"),
        }
    }

    /// Health loop: reconnect every `interval` while disconnected, forever.
    pub async fn supervise(self: Arc<Self>, interval: Duration) {
        loop {
            if !self.is_connected() {
                info!(address = %self.config.address(), "reconnecting to SMSC");
                match self.reconnect().await {
                    Ok(()) => info!("reconnected to SMSC"),
                    Err(e) => error!(error = %e, "reconnect failed"),
                }
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn connect_locked(&self) -> SmppResult<()> {
        let session = self.connector.connect(&self.config).await?;
        *self.session.write().await = Some(Arc::new(session));
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn disconnect_locked(&self) {
        self.connected.store(false, Ordering::Release);

        let Some(session) = self.session.write().await.take() else {
            return;
        };

        if let Err(e) = session.unbind().await {
            debug!(error = %e, "unbind failed");
        }
        if let Err(e) = session.close().await {
            debug!(error = %e, "close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error::SmppError;
    use crate::client::testing::{MockConnector, MockEvent};

    fn manager(connector: MockConnector) -> Arc<ConnectionManager<MockConnector>> {
        Arc::new(ConnectionManager::new(connector, SessionConfig::default()))
    }

    #[tokio::test]
    async fn connect_sets_flag() {
        let connector = MockConnector::default();
        let manager = manager(connector.clone());
        assert!(!manager.is_connected());

        manager.connect().await.unwrap();
        assert!(manager.is_connected());
        assert!(manager.session().await.is_some());
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test]
    async fn failed_connect_stays_disconnected() {
        let connector = MockConnector::default();
        connector.fail_next_connects(1);
        let manager = manager(connector);

        assert!(matches!(manager.connect().await, Err(SmppError::Connection(_))));
        assert!(!manager.is_connected());
        assert!(manager.session().await.is_none());
    }

    #[tokio::test]
    async fn disconnect_unbinds_and_closes() {
        let connector = MockConnector::default();
        let manager = manager(connector.clone());
        manager.connect().await.unwrap();
        let session = manager.session().await.unwrap();

        manager.disconnect().await;
        assert!(!manager.is_connected());
        assert_eq!(session.events(), vec![MockEvent::Unbind, MockEvent::Close]);
    }

    #[tokio::test]
    async fn invalidate_ignores_stale_session() {
        let connector = MockConnector::default();
        let manager = manager(connector);
        manager.connect().await.unwrap();
        let stale = manager.session().await.unwrap();

        manager.reconnect().await.unwrap();
        manager.invalidate(&stale).await;
        assert!(manager.is_connected());

        let current = manager.session().await.unwrap();
        manager.invalidate(&current).await;
        assert!(!manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn supervise_retries_until_bound() {
        let connector = MockConnector::default();
        connector.fail_next_connects(3);
        let manager = manager(connector.clone());

        let health = tokio::spawn(Arc::clone(&manager).supervise(Duration::from_secs(5)));

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(!manager.is_connected());
        assert_eq!(connector.connects(), 3);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(manager.is_connected());
        assert_eq!(connector.connects(), 4);

        // Connected: no further attempts
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.connects(), 4);

        health.abort();
    }
}
