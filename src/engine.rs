//! Protocol engine - one decode-and-dispatch cycle at a time.
//!
//! [`GnssEngine`] owns the [`TimedStream`] and a [`MessageRegistry`] and
//! holds one callback slot per message family. Each [`step()`] call:
//!
//! 1. peeks the next unread byte to pick a decoder (`$` → sentence,
//!    `0xB5` → binary), discarding garbage up to a bounded resync scan
//! 2. decodes one complete frame
//! 3. resolves the id through the registry and constructs the typed record
//! 4. invokes the matching callback synchronously
//!
//! Dispatch is synchronous and one message per call, so backpressure is
//! implicit: the engine reads only as fast as the caller re-invokes
//! `step()`. All errors propagate to the caller; see
//! [`GnssError::is_terminal`] for the loop policy. The engine has no
//! threading of its own; concurrency belongs to the caller, which must
//! uphold a single-caller discipline on `step()`.
//!
//! [`step()`]: GnssEngine::step

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{GnssError, Result};
use crate::messages::{MessageRegistry, NmeaDispatch, UbxDispatch};
use crate::protocol::{nmea, ubx, Sentence, UbxFrame};
use crate::stream::TimedStream;

/// Maximum bytes discarded per `step()` while hunting for a frame start.
/// Bounds the damage of a corrupted link; exceeding it is a `FrameSync`
/// error for that call.
pub const MAX_RESYNC_SCAN: usize = 128;

/// Callback slot for decoded binary messages.
pub type UbxCallback = Box<dyn FnMut(u8, u8, UbxDispatch) + Send>;
/// Callback slot for decoded sentences.
pub type NmeaCallback = Box<dyn FnMut(&str, &str, NmeaDispatch) + Send>;

/// Protocol engine for a GNSS receiver byte stream.
pub struct GnssEngine<R, W> {
    stream: TimedStream<R, W>,
    registry: MessageRegistry,
    on_ubx: Option<UbxCallback>,
    on_nmea: Option<NmeaCallback>,
}

impl<R, W> GnssEngine<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create an engine with the standard message registry.
    pub fn new(stream: TimedStream<R, W>) -> Self {
        Self::with_registry(stream, MessageRegistry::with_standard_messages())
    }

    /// Create an engine with a custom registry.
    pub fn with_registry(stream: TimedStream<R, W>, registry: MessageRegistry) -> Self {
        Self {
            stream,
            registry,
            on_ubx: None,
            on_nmea: None,
        }
    }

    /// Set the binary-message callback.
    ///
    /// Invoked synchronously from `step()`, on whichever context drives the
    /// engine; it must not block for long.
    pub fn set_ubx_callback<F>(&mut self, callback: F)
    where
        F: FnMut(u8, u8, UbxDispatch) + Send + 'static,
    {
        self.on_ubx = Some(Box::new(callback));
    }

    /// Set the sentence callback. Same invocation contract as
    /// [`set_ubx_callback`](Self::set_ubx_callback).
    pub fn set_nmea_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&str, &str, NmeaDispatch) + Send + 'static,
    {
        self.on_nmea = Some(Box::new(callback));
    }

    /// Perform exactly one decode-and-dispatch cycle.
    ///
    /// Callbacks fire in strict stream order, one at a time. Errors are
    /// propagated, never swallowed: the caller's loop decides whether an
    /// error is terminal (`Timeout`/`Closed`/`Io`) or transient (a single
    /// malformed frame).
    pub async fn step(&mut self) -> Result<()> {
        let mut scanned = 0usize;
        loop {
            match self.stream.peek_byte().await? {
                nmea::START => {
                    let sentence = nmea::read_sentence(&mut self.stream).await?;
                    return self.dispatch_sentence(sentence);
                }
                ubx::SYNC1 => {
                    let frame = ubx::read_frame(&mut self.stream).await?;
                    return self.dispatch_frame(frame);
                }
                other => {
                    // Unrecognized lead byte: discard and rescan, bounded.
                    let _ = self.stream.read_byte().await?;
                    scanned += 1;
                    tracing::trace!(byte = other, scanned, "discarding byte during resync");
                    if scanned >= MAX_RESYNC_SCAN {
                        return Err(GnssError::FrameSync);
                    }
                }
            }
        }
    }

    /// Encode and write one binary frame.
    pub async fn send_frame(&mut self, class_id: u8, message_id: u8, payload: &[u8]) -> Result<()> {
        let frame = UbxFrame::new(class_id, message_id, payload.to_vec());
        self.stream.write(&frame.encode()).await
    }

    /// Encode and write one sentence.
    pub async fn send_sentence(
        &mut self,
        talker: &str,
        sentence: &str,
        fields: &[&str],
    ) -> Result<()> {
        let sentence = Sentence::new(
            talker,
            sentence,
            fields.iter().map(|s| s.to_string()).collect(),
        );
        self.stream.write(&sentence.encode()).await
    }

    /// Give the owned stream back, dropping the callbacks.
    pub fn into_stream(self) -> TimedStream<R, W> {
        self.stream
    }

    fn dispatch_frame(&mut self, frame: UbxFrame) -> Result<()> {
        let dispatch = match self.registry.resolve_binary(frame.class_id, frame.message_id) {
            Some(ctor) => UbxDispatch::Record(ctor(&frame)?),
            None => {
                tracing::debug!(
                    class = frame.class_id,
                    id = frame.message_id,
                    "unhandled binary message"
                );
                UbxDispatch::Unhandled(frame.payload.clone())
            }
        };
        if let Some(callback) = self.on_ubx.as_mut() {
            callback(frame.class_id, frame.message_id, dispatch);
        }
        Ok(())
    }

    fn dispatch_sentence(&mut self, sentence: Sentence) -> Result<()> {
        let dispatch = match self
            .registry
            .resolve_sentence(&sentence.talker, &sentence.sentence)
        {
            Some(ctor) => NmeaDispatch::Record(ctor(&sentence)?),
            None => {
                tracing::debug!(
                    talker = %sentence.talker,
                    id = %sentence.sentence,
                    "unhandled sentence"
                );
                NmeaDispatch::Unhandled(sentence.fields.clone())
            }
        };
        if let Some(callback) = self.on_nmea.as_mut() {
            callback(&sentence.talker, &sentence.sentence, dispatch);
        }
        Ok(())
    }
}
