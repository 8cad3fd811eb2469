//! # Delivery Engine
//!
//! Owns the outbound queue and the inflight window, assigns packet
//! identifiers, matches acknowledgments and drives redelivery.
//!
//! Per packet identifier a message moves through
//!
//! ```text
//! QoS 0: Queued -> sent -> done                       (no inflight entry)
//! QoS 1: Queued -> Inflight(PUBLISH) -> PUBACK -> done
//! QoS 2: Queued -> Inflight(PUBLISH) -> PUBREC -> Inflight(PUBREL) -> PUBCOMP -> done
//! ```
//!
//! [`DeliveryEngine`] is the serialized state itself: every operation takes
//! `&mut self` and a [`Timestamp`], and returns the frames to hand to the
//! transport in order. It never performs I/O, so it works the same on a
//! bare-metal main loop and inside the std [`DeliveryService`], which adds the
//! lock, the outbound channel and the shared retry timer.
//!
//! ## Example
//!
//! ```rust
//! use libmqtt::codec::{Ack, Frame, Publish, QoS};
//! use libmqtt::config::EngineConfig;
//! use libmqtt::delivery::{AckKind, DeliveryEngine};
//! use libmqtt::time::Timestamp;
//!
//! let config = EngineConfig { inflight_window: 1, ..Default::default() };
//! let mut engine = DeliveryEngine::in_memory(config);
//! let now = Timestamp::from_millis(0);
//!
//! let sent = engine.enqueue(Publish::new("t/1", vec![], QoS::AtLeastOnce), now).unwrap();
//! assert_eq!(sent.len(), 1);
//! let held = engine.enqueue(Publish::new("t/2", vec![], QoS::AtLeastOnce), now).unwrap();
//! assert!(held.is_empty());
//!
//! let next = engine.acknowledge(sent[0].packet_id().unwrap(), AckKind::PubAck, now);
//! assert!(matches!(&next[..], [Frame::Publish(p)] if p.topic == "t/2"));
//! ```

use crate::codec::{Ack, Frame, Publish, QoS};
use crate::config::EngineConfig;
use crate::macros::{log_debug, log_error, log_info, log_warn};
use crate::session::SessionStore;
use crate::storage::{self, KeyValueStore, MemoryStore};
use crate::time::Timestamp;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;

mod packet_id;
pub use packet_id::PacketIdAllocator;

#[cfg(feature = "std")]
mod service;
#[cfg(feature = "std")]
pub use service::DeliveryService;
#[cfg(all(feature = "std", feature = "async"))]
pub use service::run_writer;

/// Delivery engine errors. Returned synchronously; nothing is retried
/// on the caller's behalf.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// Queued plus inflight messages already reach the configured capacity.
    QueueFull,
    /// Every packet identifier is in use.
    PacketIdsExhausted,
    /// The message cannot be sent (e.g. empty topic).
    InvalidMessage,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::QueueFull => write!(f, "message queue full"),
            Error::PacketIdsExhausted => write!(f, "no free packet identifier"),
            Error::InvalidMessage => write!(f, "invalid message"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::QueueFull => defmt::write!(f, "QueueFull"),
            Error::PacketIdsExhausted => defmt::write!(f, "PacketIdsExhausted"),
            Error::InvalidMessage => defmt::write!(f, "InvalidMessage"),
        }
    }
}

/// The acknowledgments that advance an outbound handshake.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckKind {
    /// Completes QoS 1.
    PubAck,
    /// First QoS 2 step; the engine answers with PUBREL.
    PubRec,
    /// Completes QoS 2.
    PubComp,
}

impl AckKind {
    /// The acknowledgment kind carried by `frame`, with its packet id.
    pub fn of(frame: &Frame) -> Option<(AckKind, u16)> {
        match frame {
            Frame::PubAck(ack) => Some((AckKind::PubAck, ack.packet_id)),
            Frame::PubRec(ack) => Some((AckKind::PubRec, ack.packet_id)),
            Frame::PubComp(ack) => Some((AckKind::PubComp, ack.packet_id)),
            _ => None,
        }
    }
}

/// A PUBLISH or PUBREL awaiting acknowledgment.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InFlightEntry {
    /// The frame last sent.
    pub frame: Frame,
    /// When it was last sent.
    pub last_sent: Timestamp,
}

impl InFlightEntry {
    /// Packet identifier of the entry.
    pub fn packet_id(&self) -> u16 {
        self.frame.packet_id().unwrap_or(0)
    }

    /// Whether the entry has waited at least `interval_ms` since its last send.
    pub fn is_due(&self, now: Timestamp, interval_ms: u64) -> bool {
        now.since(self.last_sent) >= interval_ms
    }

    fn awaits(&self, kind: AckKind) -> bool {
        match (&self.frame, kind) {
            (Frame::Publish(publish), AckKind::PubAck) => publish.qos == QoS::AtLeastOnce,
            (Frame::Publish(publish), AckKind::PubRec) => publish.qos == QoS::ExactlyOnce,
            (Frame::PubRel(_), AckKind::PubComp) => true,
            _ => false,
        }
    }
}

/// Queue, inflight window and persistence for one client session.
#[derive(Debug)]
pub struct DeliveryEngine<S = MemoryStore> {
    config: EngineConfig,
    queue: VecDeque<Publish>,
    inflight: Vec<InFlightEntry>,
    ids: PacketIdAllocator,
    session: Option<SessionStore<S>>,
    persistent: bool,
    restored: bool,
}

impl DeliveryEngine<MemoryStore> {
    /// An engine without persistence.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::build(config, None)
    }
}

impl<S: KeyValueStore> DeliveryEngine<S> {
    /// An engine persisting inflight frames to `session`.
    ///
    /// Records already in the session are taken into the inflight window the
    /// first time the engine is used, before any new message is assigned a
    /// packet id.
    pub fn with_session(config: EngineConfig, session: SessionStore<S>) -> Self {
        Self::build(config, Some(session))
    }

    fn build(config: EngineConfig, session: Option<SessionStore<S>>) -> Self {
        Self {
            persistent: session.is_some(),
            restored: session.is_none(),
            config,
            queue: VecDeque::new(),
            inflight: Vec::new(),
            ids: PacketIdAllocator::new(),
            session,
        }
    }

    /// Accept a message for delivery and return whatever can be sent now.
    ///
    /// QoS 0 messages are returned immediately with packet id 0, regardless
    /// of window fullness. QoS 1/2 messages join the queue; the drain loop
    /// assigns their packet ids when they enter the inflight window.
    ///
    /// # Errors
    ///
    /// * [`Error::QueueFull`] - queued plus inflight messages reach
    ///   `queue_capacity`; the message is dropped
    /// * [`Error::InvalidMessage`] - empty topic
    pub fn enqueue(&mut self, mut publish: Publish, now: Timestamp) -> Result<Vec<Frame>, Error> {
        if publish.topic.is_empty() {
            return Err(Error::InvalidMessage);
        }
        self.restore(now);
        if self.pending_len() >= usize::from(self.config.queue_capacity) {
            log_warn!(
                "rejecting message for {}: {} messages pending",
                publish.topic.as_str(),
                self.pending_len()
            );
            return Err(Error::QueueFull);
        }
        publish.dup = false;
        if publish.qos == QoS::AtMostOnce {
            publish.packet_id = 0;
            return Ok(alloc::vec![Frame::Publish(publish)]);
        }
        publish.packet_id = 0;
        self.queue.push_back(publish);
        Ok(self.drain(now))
    }

    /// Advance the handshake of `packet_id`.
    ///
    /// PUBACK and PUBCOMP complete and release the entry, which may let queued
    /// messages into the window. PUBREC replaces the stored PUBLISH with a
    /// PUBREL, restarts its retry clock and returns the PUBREL. Acknowledgments
    /// matching nothing inflight are logged and ignored.
    pub fn acknowledge(&mut self, packet_id: u16, kind: AckKind, now: Timestamp) -> Vec<Frame> {
        self.restore(now);
        let Some(index) = self
            .inflight
            .iter()
            .position(|entry| entry.packet_id() == packet_id && entry.awaits(kind))
        else {
            log_warn!("ignoring unmatched {} for packet id {}", kind, packet_id);
            return Vec::new();
        };

        match kind {
            AckKind::PubRec => {
                let pubrel = Frame::PubRel(Ack::new(packet_id));
                let entry = &mut self.inflight[index];
                let publish = core::mem::replace(&mut entry.frame, pubrel.clone());
                entry.last_sent = now;
                self.persist(&pubrel);
                self.unpersist(&publish);
                alloc::vec![pubrel]
            }
            AckKind::PubAck | AckKind::PubComp => {
                let entry = self.inflight.remove(index);
                self.unpersist(&entry.frame);
                self.ids.release(packet_id);
                log_debug!("packet id {} complete", packet_id);
                self.drain(now)
            }
        }
    }

    /// Resend every inflight entry that has waited at least the retry
    /// interval, with DUP set on PUBLISH frames.
    ///
    /// Entries due in the same scan are resent in window order; relative to
    /// newer initial sends the order is not guaranteed.
    pub fn retry(&mut self, now: Timestamp) -> Vec<Frame> {
        self.restore(now);
        let interval = self.config.retry_interval_ms;
        let mut resent = Vec::new();
        for index in 0..self.inflight.len() {
            if !self.inflight[index].is_due(now, interval) {
                continue;
            }
            let entry = &mut self.inflight[index];
            if let Frame::Publish(publish) = &mut entry.frame {
                publish.dup = true;
            }
            entry.last_sent = now;
            let frame = entry.frame.clone();
            log_debug!("resending {} #{}", frame.packet_type(), entry.packet_id());
            self.persist(&frame);
            resent.push(frame);
        }
        resent
    }

    /// Replay unfinished handshakes after reconnecting to a resumed session.
    ///
    /// Every inflight entry is resent: stored records of an earlier run
    /// first, in original order, then whatever this engine sent itself.
    /// Queued messages follow once the window has room. Replayed frames keep
    /// their stored DUP flag.
    pub fn recover(&mut self, now: Timestamp) -> Vec<Frame> {
        self.restore(now);
        let mut out = Vec::with_capacity(self.inflight.len());
        for entry in &mut self.inflight {
            entry.last_sent = now;
            out.push(entry.frame.clone());
        }
        log_info!("replaying {} unacknowledged frames", out.len());
        out.extend(self.drain(now));
        out
    }

    /// Apply the connect policy: a clean session discards everything, a
    /// resumed one replays it.
    pub fn on_connected(&mut self, clean_session: bool, now: Timestamp) -> Vec<Frame> {
        if clean_session {
            self.clean_all();
            Vec::new()
        } else {
            self.recover(now)
        }
    }

    /// Drop every queued and inflight message, including persisted records,
    /// without sending anything.
    pub fn clean_all(&mut self) {
        let dropped = self.pending_len();
        self.queue.clear();
        self.inflight.clear();
        self.ids.clear();
        self.restored = true;
        if self.persistent {
            if let Some(session) = self.session.as_mut() {
                if let Err(err) = session.clear() {
                    self.degrade(err);
                }
            }
        }
        log_info!("session cleaned, {} messages dropped", dropped);
    }

    /// Reserve a packet identifier for SUBSCRIBE or UNSUBSCRIBE. It cannot
    /// collide with an inflight PUBLISH until released.
    pub fn next_packet_id(&mut self) -> Result<u16, Error> {
        if !self.restored {
            // No clock here; restored entries become due on the next retry scan.
            self.restore(Timestamp::from_millis(0));
        }
        self.ids.allocate()
    }

    /// Return an identifier from [`next_packet_id`](Self::next_packet_id)
    /// once its SUBACK or UNSUBACK arrived.
    pub fn release_packet_id(&mut self, packet_id: u16) {
        if !self.inflight.iter().any(|entry| entry.packet_id() == packet_id) {
            self.ids.release(packet_id);
        }
    }

    /// The acknowledgment owed for an inbound PUBLISH: PUBACK for QoS 1,
    /// PUBREC for QoS 2, nothing for QoS 0.
    pub fn ack_for(publish: &Publish) -> Option<Frame> {
        match publish.qos {
            QoS::AtMostOnce => None,
            QoS::AtLeastOnce => Some(Frame::PubAck(Ack::new(publish.packet_id))),
            QoS::ExactlyOnce => Some(Frame::PubRec(Ack::new(publish.packet_id))),
        }
    }

    /// The PUBCOMP owed for an inbound PUBREL.
    pub fn ack_for_pubrel(packet_id: u16) -> Frame {
        Frame::PubComp(Ack::new(packet_id))
    }

    /// Messages waiting for window space.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Messages awaiting acknowledgment.
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    /// Packet ids of the inflight entries, oldest first.
    pub fn inflight_ids(&self) -> Vec<u16> {
        self.inflight.iter().map(InFlightEntry::packet_id).collect()
    }

    /// The inflight entries, oldest first.
    pub fn inflight(&self) -> &[InFlightEntry] {
        &self.inflight
    }

    /// Whether the retry timer should be running: true exactly while
    /// something is in flight.
    pub fn retry_armed(&self) -> bool {
        !self.inflight.is_empty()
    }

    /// Whether writes still reach the session store.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Give back the session store.
    pub fn into_session(self) -> Option<SessionStore<S>> {
        self.session
    }

    fn pending_len(&self) -> usize {
        self.queue.len() + self.inflight.len()
    }

    fn drain(&mut self, now: Timestamp) -> Vec<Frame> {
        let window = usize::from(self.config.inflight_window.max(1));
        let mut out = Vec::new();
        while self.inflight.len() < window {
            let Some(mut publish) = self.queue.pop_front() else {
                break;
            };
            publish.packet_id = match self.ids.allocate() {
                Ok(id) => id,
                Err(err) => {
                    log_warn!("holding queued message: {}", err);
                    self.queue.push_front(publish);
                    break;
                }
            };
            let frame = Frame::Publish(publish);
            self.persist(&frame);
            self.inflight.push(InFlightEntry {
                frame: frame.clone(),
                last_sent: now,
            });
            out.push(frame);
        }
        out
    }

    fn restore(&mut self, now: Timestamp) {
        if self.restored {
            return;
        }
        self.restored = true;
        self.load_session(now);
    }

    fn load_session(&mut self, now: Timestamp) {
        if !self.persistent {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let frames = match session.read_all() {
            Ok(frames) => frames,
            Err(err) => {
                self.degrade(err);
                return;
            }
        };
        for frame in frames {
            let Some(id) = frame.packet_id() else {
                continue;
            };
            if !self.ids.reserve(id) {
                log_warn!("dropping stored frame with duplicate packet id {}", id);
                continue;
            }
            self.inflight.push(InFlightEntry {
                frame,
                last_sent: now,
            });
        }
    }

    fn persist(&mut self, frame: &Frame) {
        if !self.persistent {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if let Err(err) = session.write(frame) {
                self.degrade(err);
            }
        }
    }

    fn unpersist(&mut self, frame: &Frame) {
        if !self.persistent {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            if let Err(err) = session.remove(frame) {
                self.degrade(err);
            }
        }
    }

    fn degrade(&mut self, err: storage::Error) {
        log_error!("session store failed: {}", err);
        log_warn!("continuing without persistence");
        self.persistent = false;
    }
}

impl fmt::Display for AckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckKind::PubAck => f.write_str("PUBACK"),
            AckKind::PubRec => f.write_str("PUBREC"),
            AckKind::PubComp => f.write_str("PUBCOMP"),
        }
    }
}
