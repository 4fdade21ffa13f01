// ABOUTME: TCP implementation of the Transport trait: bind handshake, framing and keep-alive
// ABOUTME: Reader and writer halves are locked separately so reads never stall submissions

use crate::client::error::{SmppError, SmppResult};
use crate::client::keepalive;
use crate::client::traits::{Connector, Transport};
use crate::client::types::{MAX_SEQUENCE_NUMBER, SessionConfig, SubmitParams};
use crate::codec::Frame;
use crate::connection::{FrameReader, FrameWriter};
use crate::datatypes::{
    BindTransceiver, CommandStatus, DeliverSmResponse, EnquireLinkResponse, GenericNack, SubmitSm,
    Unbind, UnbindResponse,
};
use bytes::Bytes;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, trace, warn};

/// Session-local sequence numbers: 1..=0x7FFFFFFF, wrapping back to 1
#[derive(Debug, Default)]
pub struct SequenceCounter(AtomicU32);

impl SequenceCounter {
    pub fn next(&self) -> u32 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = if current >= MAX_SEQUENCE_NUMBER {
                1
            } else {
                current + 1
            };
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

/// A bound transceiver session over TCP
pub struct TcpSession {
    reader: Mutex<FrameReader<OwnedReadHalf>>,
    writer: Arc<Mutex<FrameWriter<OwnedWriteHalf>>>,
    sequence: Arc<SequenceCounter>,
    next_override: std::sync::Mutex<Option<u32>>,
    // true once closed; a pending read watches it to return early
    shutdown: watch::Sender<bool>,
    keepalive: Option<AbortHandle>,
    smsc_system_id: String,
}

impl TcpSession {
    /// Connect, bind as transceiver and start the keep-alive task.
    ///
    /// TCP connect and the bind exchange together must finish within
    /// `config.bind_timeout`.
    pub async fn bind(config: &SessionConfig) -> SmppResult<Self> {
        let sequence = Arc::new(SequenceCounter::default());

        let (reader, writer, smsc_system_id) =
            tokio::time::timeout(config.bind_timeout, establish(config, &sequence)).await??;

        let writer = Arc::new(Mutex::new(writer));
        let keepalive = config.keepalive.enabled.then(|| {
            keepalive::spawn(
                Arc::clone(&writer),
                Arc::clone(&sequence),
                config.keepalive.interval,
            )
        });

        info!(
            address = %config.address(),
            system_id = %config.credentials.system_id,
            smsc = %smsc_system_id,
            "bound as transceiver"
        );

        Ok(TcpSession {
            reader: Mutex::new(reader),
            writer,
            sequence,
            next_override: std::sync::Mutex::new(None),
            shutdown: watch::Sender::new(false),
            keepalive,
            smsc_system_id,
        })
    }

    /// system_id the SMSC reported in bind_transceiver_resp
    pub fn smsc_system_id(&self) -> &str {
        &self.smsc_system_id
    }

    fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn ensure_open(&self) -> SmppResult<()> {
        if self.is_closed() {
            return Err(SmppError::ConnectionClosed);
        }
        Ok(())
    }

    fn take_override(&self) -> Option<u32> {
        match self.next_override.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    async fn write(&self, frame: &Frame) -> SmppResult<()> {
        self.ensure_open()?;
        self.writer.lock().await.write_frame(frame).await
    }

    async fn next_inbound(&self) -> SmppResult<Frame> {
        let mut closed = self.shutdown.subscribe();
        let mut reader = self.reader.lock().await;

        tokio::select! {
            result = reader.read_frame() => match result? {
                Some(frame) => Ok(frame),
                None => {
                    self.shutdown.send_replace(true);
                    Err(SmppError::ConnectionClosed)
                }
            },
            _ = closed.wait_for(|closed| *closed) => Err(SmppError::ConnectionClosed),
        }
    }
}

async fn establish(
    config: &SessionConfig,
    sequence: &SequenceCounter,
) -> SmppResult<(FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>, String)> {
    let stream = TcpStream::connect(config.address()).await?;
    stream.set_nodelay(true)?;

    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    let credentials = &config.credentials;
    let bind = BindTransceiver::new(
        sequence.next(),
        credentials.system_id.as_str(),
        credentials.password.as_str(),
        credentials.system_type.as_deref().unwrap_or_default(),
    );
    writer.write_frame(&Frame::BindTransceiver(bind)).await?;

    loop {
        match reader.read_frame().await? {
            Some(Frame::BindTransceiverResp(resp)) if resp.command_status.is_ok() => {
                return Ok((reader, writer, resp.system_id));
            }
            Some(Frame::BindTransceiverResp(resp)) => {
                return Err(SmppError::Protocol(resp.command_status));
            }
            Some(Frame::GenericNack(nack)) => return Err(SmppError::Protocol(nack.command_status)),
            // Some SMSCs probe the link before answering the bind
            Some(Frame::EnquireLink(pdu)) => {
                let resp = EnquireLinkResponse::new(pdu.sequence_number);
                writer.write_frame(&Frame::EnquireLinkResp(resp)).await?;
            }
            Some(other) => {
                return Err(SmppError::UnexpectedPdu {
                    expected: "bind_transceiver_resp".to_string(),
                    actual: format!("{:?}", other.command_id()),
                });
            }
            None => return Err(SmppError::ConnectionClosed),
        }
    }
}

impl Transport for TcpSession {
    async fn unbind(&self) -> SmppResult<()> {
        let sequence_number = self.sequence.next();
        self.write(&Frame::Unbind(Unbind::new(sequence_number))).await?;
        debug!(sequence_number, "unbind sent");
        Ok(())
    }

    async fn close(&self) -> SmppResult<()> {
        self.shutdown.send_replace(true);
        if let Some(keepalive) = &self.keepalive {
            keepalive.abort();
        }
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }

    fn override_next_sequence(&self, sequence_number: u32) {
        match self.next_override.lock() {
            Ok(mut slot) => *slot = Some(sequence_number),
            Err(poisoned) => *poisoned.into_inner() = Some(sequence_number),
        }
    }

    async fn read_frame(&self) -> SmppResult<Frame> {
        loop {
            self.ensure_open()?;

            match self.next_inbound().await? {
                Frame::EnquireLink(pdu) => {
                    trace!(sequence_number = pdu.sequence_number, "answering enquire_link");
                    let resp = EnquireLinkResponse::new(pdu.sequence_number);
                    self.write(&Frame::EnquireLinkResp(resp)).await?;
                }
                Frame::EnquireLinkResp(pdu) => {
                    trace!(sequence_number = pdu.sequence_number, "enquire_link_resp");
                }
                Frame::Unbind(pdu) => {
                    info!("SMSC requested unbind");
                    let resp = UnbindResponse::new(pdu.sequence_number);
                    if let Err(e) = self.write(&Frame::UnbindResp(resp)).await {
                        warn!(error = %e, "failed to answer unbind");
                    }
                    self.shutdown.send_replace(true);
                    return Err(SmppError::ConnectionClosed);
                }
                Frame::Unknown { header, .. } if !header.command_id.is_response() => {
                    warn!(
                        command_id = header.command_id.code(),
                        sequence_number = header.sequence_number,
                        "rejecting unsupported request"
                    );
                    let nack = GenericNack::invalid_command_id(header.sequence_number);
                    self.write(&Frame::GenericNack(nack)).await?;
                }
                frame => return Ok(frame),
            }
        }
    }

    async fn submit_encoded(
        &self,
        source: &str,
        destination: &str,
        payload: &[u8],
        params: &SubmitParams,
    ) -> SmppResult<u32> {
        self.ensure_open()?;

        let sequence_number = self
            .take_override()
            .unwrap_or_else(|| self.sequence.next());

        let mut pdu = SubmitSm::new(
            sequence_number,
            source,
            destination,
            Bytes::copy_from_slice(payload),
        );
        pdu.source_addr_ton = params.source_addr_ton;
        pdu.source_addr_npi = params.source_addr_npi;
        pdu.dest_addr_ton = params.dest_addr_ton;
        pdu.dest_addr_npi = params.dest_addr_npi;
        pdu.esm_class = params.esm_class;
        pdu.registered_delivery = params.registered_delivery;
        pdu.data_coding = params.data_coding;
        pdu.validate()?;

        self.write(&Frame::SubmitSm(Box::new(pdu))).await?;
        trace!(sequence_number, destination, "submit_sm sent");
        Ok(sequence_number)
    }

    async fn acknowledge_delivery(
        &self,
        sequence_number: u32,
        status: CommandStatus,
    ) -> SmppResult<()> {
        let resp = DeliverSmResponse::new(sequence_number, status);
        self.write(&Frame::DeliverSmResp(resp)).await
    }
}

impl Drop for TcpSession {
    fn drop(&mut self) {
        if let Some(keepalive) = &self.keepalive {
            keepalive.abort();
        }
    }
}

/// Binds `TcpSession`s
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Session = TcpSession;

    async fn connect(&self, config: &SessionConfig) -> SmppResult<TcpSession> {
        TcpSession::bind(config).await
    }
}
