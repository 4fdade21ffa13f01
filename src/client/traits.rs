// ABOUTME: Core gateway traits using native async functions for the session seam
// ABOUTME: Transport abstracts one bound SMPP session; Connector is the factory that binds one

use crate::client::error::SmppResult;
use crate::client::types::{SessionConfig, SubmitParams};
use crate::codec::Frame;
use crate::datatypes::CommandStatus;
use std::future::Future;

/// One bound SMPP session shared by the dispatch, read and health loops.
///
/// All methods take `&self`: implementations lock their read and write
/// halves independently so a pending `read_frame` never blocks a submission.
/// Every method reports failures as `SmppError`; callers use
/// [`SmppError::is_transport`](crate::client::SmppError::is_transport) to
/// tell a dead session from a rejected frame.
pub trait Transport: Send + Sync + 'static {
    /// Send unbind to the SMSC. Does not wait for unbind_resp.
    fn unbind(&self) -> impl Future<Output = SmppResult<()>> + Send;

    /// Stop background tasks and shut the connection down. Every later call
    /// fails with `ConnectionClosed`.
    fn close(&self) -> impl Future<Output = SmppResult<()>> + Send;

    /// Use `sequence_number` for the next `submit_encoded` instead of the
    /// session counter. Consumed by exactly one submission.
    fn override_next_sequence(&self, sequence_number: u32);

    /// Block until the next frame the caller must handle arrives.
    ///
    /// Session housekeeping (enquire_link, enquire_link_resp) is handled
    /// internally and never returned. Requests the session cannot serve are
    /// answered with generic_nack and skipped.
    fn read_frame(&self) -> impl Future<Output = SmppResult<Frame>> + Send;

    /// Send one submit_sm carrying `payload` verbatim as short_message.
    /// Returns the sequence number used.
    fn submit_encoded(
        &self,
        source: &str,
        destination: &str,
        payload: &[u8],
        params: &SubmitParams,
    ) -> impl Future<Output = SmppResult<u32>> + Send;

    /// Answer a deliver_sm with deliver_sm_resp
    fn acknowledge_delivery(
        &self,
        sequence_number: u32,
        status: CommandStatus,
    ) -> impl Future<Output = SmppResult<()>> + Send;
}

/// Binds new sessions. The connection manager is generic over this so the
/// session loops can run against an in-memory transport in tests.
pub trait Connector: Send + Sync + 'static {
    type Session: Transport;

    /// Connect and bind as transceiver
    fn connect(
        &self,
        config: &SessionConfig,
    ) -> impl Future<Output = SmppResult<Self::Session>> + Send;
}
