//! # Stream Reader
//!
//! Reassembles MQTT frames from a byte stream regardless of how the transport
//! chunks it. The reader is a small state machine:
//!
//! ```text
//! AwaitHeader -> AwaitLength -> AwaitPayload(len) -> dispatch -> AwaitHeader
//! ```
//!
//! A zero remaining length dispatches straight from `AwaitLength`.
//!
//! Complete frames go through the codec's per-type decoder table. A frame that
//! fails to decode, or whose type has no decoder, is reported as
//! [`ReadEvent::Skipped`] and reading continues with the next frame. A remaining
//! length that cannot be parsed (or exceeds the configured maximum) leaves the
//! stream without frame boundaries; that is a [`FramingError`] and the reader
//! refuses further input until [`StreamReader::reset`].
//!
//! ```rust
//! use libmqtt::codec::{Frame, Version};
//! use libmqtt::reader::{ReadEvent, StreamReader};
//!
//! let mut reader = StreamReader::new(Version::V311);
//! assert!(reader.feed(&[0xD0]).unwrap().is_empty());
//! let events = reader.feed(&[0x00, 0xC0]).unwrap();
//! assert_eq!(events, vec![ReadEvent::Frame(Frame::PingResp)]);
//! assert!(reader.is_mid_frame());
//! ```

use crate::codec::{self, Frame, VBI_MAX, VBI_MAX_LEN, Version, decoder_for};
use crate::macros::{log_error, log_trace, log_warn};
use crate::network;
use alloc::vec::Vec;
use core::fmt;

/// Fatal stream error. The connection must be torn down.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FramingError {
    /// The remaining length used a fifth continuation byte.
    MalformedLength,
    /// The remaining length exceeds the configured maximum packet size.
    TooLarge(u32),
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingError::MalformedLength => write!(f, "malformed remaining length"),
            FramingError::TooLarge(len) => write!(f, "remaining length {} exceeds maximum", len),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FramingError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            FramingError::MalformedLength => defmt::write!(f, "MalformedLength"),
            FramingError::TooLarge(len) => defmt::write!(f, "TooLarge({})", len),
        }
    }
}

/// Errors from [`pump`] and `pump_async`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The transport failed or closed.
    Network(network::Error),
    /// The byte stream lost frame boundaries.
    Framing(FramingError),
}

impl From<FramingError> for Error {
    fn from(err: FramingError) -> Self {
        Error::Framing(err)
    }
}

impl From<network::Error> for Error {
    fn from(err: network::Error) -> Self {
        Error::Network(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Network(err) => write!(f, "network: {}", err),
            Error::Framing(err) => write!(f, "framing: {}", err),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Network(err) => defmt::write!(f, "Network({})", err),
            Error::Framing(err) => defmt::write!(f, "Framing({})", err),
        }
    }
}

/// Output of the reader for each delimited frame.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ReadEvent {
    /// A decoded frame.
    Frame(Frame),
    /// A delimited frame that was dropped. The stream is still in sync.
    Skipped {
        /// The fixed header byte of the dropped frame.
        header: u8,
        /// Why it was dropped.
        error: codec::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitHeader,
    AwaitLength {
        header: u8,
        value: u32,
        multiplier: u32,
        count: usize,
    },
    AwaitPayload {
        header: u8,
        len: usize,
    },
    Failed(FramingError),
}

/// Incremental MQTT frame parser for one connection.
#[derive(Debug)]
pub struct StreamReader {
    state: State,
    version: Version,
    max_packet_size: u32,
    body: Vec<u8>,
}

impl StreamReader {
    /// Reader for `version` accepting remaining lengths up to the VBI maximum.
    pub fn new(version: Version) -> Self {
        Self {
            state: State::AwaitHeader,
            version,
            max_packet_size: VBI_MAX,
            body: Vec::new(),
        }
    }

    /// Reject frames whose remaining length exceeds `max`.
    pub fn with_max_packet_size(mut self, max: u32) -> Self {
        self.max_packet_size = max.min(VBI_MAX);
        self
    }

    /// Protocol version frames are decoded with.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Switch protocol version, e.g. once CONNACK settles it.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Whether a partial frame is buffered.
    pub fn is_mid_frame(&self) -> bool {
        matches!(
            self.state,
            State::AwaitLength { .. } | State::AwaitPayload { .. }
        )
    }

    /// The fatal error the reader stopped on, if any.
    pub fn failure(&self) -> Option<FramingError> {
        match self.state {
            State::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Drop any partial frame and clear a previous failure. Call when a new
    /// connection starts.
    pub fn reset(&mut self) {
        self.state = State::AwaitHeader;
        self.body.clear();
    }

    /// Feed bytes and collect every event they complete.
    ///
    /// # Errors
    ///
    /// Returns the [`FramingError`] that stopped the reader. Events completed
    /// before the error in the same call are discarded along with the stream.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<ReadEvent>, FramingError> {
        let mut events = Vec::new();
        self.feed_with(bytes, |event| events.push(event))?;
        Ok(events)
    }

    /// Feed bytes, handing each completed event to `on_event` as soon as it is
    /// ready.
    pub fn feed_with(
        &mut self,
        bytes: &[u8],
        mut on_event: impl FnMut(ReadEvent),
    ) -> Result<(), FramingError> {
        let mut input = bytes;
        while !input.is_empty() {
            match self.state {
                State::Failed(err) => return Err(err),
                State::AwaitHeader => {
                    self.state = State::AwaitLength {
                        header: input[0],
                        value: 0,
                        multiplier: 1,
                        count: 0,
                    };
                    input = &input[1..];
                }
                State::AwaitLength {
                    header,
                    value,
                    multiplier,
                    count,
                } => {
                    let byte = input[0];
                    input = &input[1..];
                    let value = value + u32::from(byte & 0x7F) * multiplier;
                    let count = count + 1;
                    if byte & 0x80 != 0 {
                        if count == VBI_MAX_LEN {
                            return Err(self.fail(FramingError::MalformedLength));
                        }
                        self.state = State::AwaitLength {
                            header,
                            value,
                            multiplier: multiplier * 128,
                            count,
                        };
                        continue;
                    }
                    if value > self.max_packet_size {
                        return Err(self.fail(FramingError::TooLarge(value)));
                    }
                    if value == 0 {
                        self.state = State::AwaitHeader;
                        on_event(self.dispatch(header));
                    } else {
                        self.body.clear();
                        // Grows with the bytes that actually arrive.
                        self.body.reserve((value as usize).min(PUMP_CHUNK));
                        self.state = State::AwaitPayload {
                            header,
                            len: value as usize,
                        };
                    }
                }
                State::AwaitPayload { header, len } => {
                    let wanted = len - self.body.len();
                    let take = wanted.min(input.len());
                    self.body.extend_from_slice(&input[..take]);
                    input = &input[take..];
                    if self.body.len() == len {
                        self.state = State::AwaitHeader;
                        on_event(self.dispatch(header));
                        self.body.clear();
                    }
                }
            }
        }
        match self.state {
            State::Failed(err) => Err(err),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, err: FramingError) -> FramingError {
        log_error!("framing error, stream cannot be resynchronized: {}", err);
        self.state = State::Failed(err);
        self.body.clear();
        err
    }

    fn dispatch(&self, header: u8) -> ReadEvent {
        let nibble = header >> 4;
        if decoder_for(nibble).is_none() {
            log_warn!("skipping frame of unrecognized type {}", nibble);
            return ReadEvent::Skipped {
                header,
                error: codec::Error::UnknownPacketType(nibble),
            };
        }
        match codec::decode(header, &self.body, self.version) {
            Ok(frame) => {
                log_trace!("decoded {} ({} bytes)", frame.packet_type(), self.body.len());
                ReadEvent::Frame(frame)
            }
            Err(error) => {
                log_warn!("skipping undecodable frame {}: {}", header, error);
                ReadEvent::Skipped { header, error }
            }
        }
    }
}

const PUMP_CHUNK: usize = 512;

/// Read once from `conn` and feed the bytes through `reader`.
///
/// # Errors
///
/// * [`network::Error::ConnectionClosed`] - the transport returned zero bytes
/// * [`network::Error::ReadError`] - the transport failed
/// * [`Error::Framing`] - the stream lost frame boundaries
pub fn pump<R: network::Read>(
    conn: &mut R,
    reader: &mut StreamReader,
) -> Result<Vec<ReadEvent>, Error> {
    let mut chunk = [0u8; PUMP_CHUNK];
    let n = conn
        .read(&mut chunk)
        .map_err(|_| network::Error::ReadError)?;
    if n == 0 {
        return Err(network::Error::ConnectionClosed.into());
    }
    Ok(reader.feed(&chunk[..n])?)
}

/// Async twin of [`pump`].
#[cfg(feature = "async")]
pub async fn pump_async<R: network::AsyncRead>(
    conn: &mut R,
    reader: &mut StreamReader,
) -> Result<Vec<ReadEvent>, Error> {
    let mut chunk = [0u8; PUMP_CHUNK];
    let n = conn
        .read(&mut chunk)
        .await
        .map_err(|_| network::Error::ReadError)?;
    if n == 0 {
        return Err(network::Error::ConnectionClosed.into());
    }
    Ok(reader.feed(&chunk[..n])?)
}
