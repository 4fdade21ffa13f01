// ABOUTME: Frame-based I/O halves for an SMPP session over any async byte stream
// ABOUTME: The reader buffers and parses complete PDUs; the writer encodes and flushes them

use crate::client::{SmppError, SmppResult};
use crate::frame::{self, Frame};
use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

/// Read half of an SMPP session.
///
/// Holds the receive buffer so that bytes belonging to the next PDU survive
/// between calls. Reading and writing live in separate types so a session can
/// keep a receive pending while other tasks write.
#[derive(Debug)]
pub struct FrameReader<R> {
    stream: R,

    // The buffer for reading frames.
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(stream: R) -> FrameReader<R> {
        FrameReader {
            stream,
            // 4KB covers several typical PDUs; the buffer grows for larger ones.
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single `Frame` value from the underlying stream.
    ///
    /// The function waits until it has retrieved enough data to parse a frame.
    /// Any data remaining in the read buffer after the frame has been parsed is
    /// kept there for the next call to `read_frame`.
    ///
    /// # Returns
    ///
    /// On success, the received frame is returned. If the stream is closed in a
    /// way that doesn't break a frame in half, it returns `None`. A peer that
    /// disconnects mid-frame yields `SmppError::ConnectionClosed`.
    pub async fn read_frame(&mut self) -> SmppResult<Option<Frame>> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(SmppError::ConnectionClosed)
                };
            }
        }
    }

    /// Tries to parse a frame from the buffer.
    ///
    /// A frame whose length is sane but whose contents fail to decode is still
    /// consumed, so a single malformed PDU never poisons the buffer. Only an
    /// impossible command_length, after which the stream cannot be re-synced,
    /// is reported as a transport error.
    fn parse_frame(&mut self) -> SmppResult<Option<Frame>> {
        let mut buf = Cursor::new(&self.buffer[..]);

        match Frame::check(&mut buf) {
            Ok(len) => {
                let parsed = Frame::parse(&self.buffer[..len]);
                self.buffer.advance(len);

                match parsed {
                    Ok(frame) => Ok(Some(frame)),
                    Err(err) => Err(SmppError::Codec(err)),
                }
            }
            Err(frame::Error::Incomplete) => Ok(None),
            Err(frame::Error::Invalid(err)) => Err(SmppError::Connection(io::Error::new(
                io::ErrorKind::InvalidData,
                err,
            ))),
        }
    }
}

/// Write half of an SMPP session.
#[derive(Debug)]
pub struct FrameWriter<W: AsyncWrite + Unpin> {
    // Decorated with a `BufWriter` so header and body go out in one write.
    stream: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(stream: W) -> FrameWriter<W> {
        FrameWriter {
            stream: BufWriter::new(stream),
        }
    }

    /// Encode and write a single `Frame`, flushing before returning.
    pub async fn write_frame(&mut self, frame: &Frame) -> SmppResult<()> {
        let bytes = frame.to_bytes()?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Flush pending bytes and shut the write direction down
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
