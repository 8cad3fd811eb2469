//! PUBLISH and the four publish acknowledgments.

use super::buf::{Decoder, put_string, put_u16};
use super::property::{Property, put_properties, put_properties_for, read_properties, read_properties_for};
use super::{Error, HeaderFlags, PacketType, QoS, ReasonCode, ReasonForm, Version};
use alloc::string::String;
use alloc::vec::Vec;

/// An application message.
///
/// `packet_id` is zero for QoS 0 and nonzero otherwise.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Publish {
    /// Retransmission marker.
    pub dup: bool,
    /// Delivery guarantee.
    pub qos: QoS,
    /// Retain flag.
    pub retain: bool,
    /// Topic name. Never empty.
    pub topic: String,
    /// Packet identifier, present on the wire iff `qos` > 0.
    pub packet_id: u16,
    /// PUBLISH properties (v5).
    pub properties: Vec<Property>,
    /// Message body, possibly empty.
    pub payload: Vec<u8>,
}

impl Publish {
    /// A message with no packet identifier assigned yet.
    ///
    /// ```rust
    /// use libmqtt::codec::{Publish, QoS};
    ///
    /// let publish = Publish::new("sensors/temp", b"21.5".to_vec(), QoS::AtLeastOnce);
    /// assert_eq!(publish.packet_id, 0);
    /// assert!(!publish.dup);
    /// ```
    pub fn new(topic: impl Into<String>, payload: Vec<u8>, qos: QoS) -> Self {
        Self {
            topic: topic.into(),
            payload,
            qos,
            ..Default::default()
        }
    }

    /// The fixed header byte this message encodes to.
    pub fn header_flags(&self) -> HeaderFlags {
        let mut flags = HeaderFlags::new(PacketType::Publish);
        flags.set_dup(self.dup);
        flags.set_qos(self.qos);
        flags.set_retain(self.retain);
        flags
    }

    fn check(&self) -> Result<(), Error> {
        if self.topic.is_empty() {
            return Err(Error::EmptyTopic);
        }
        if self.qos != QoS::AtMostOnce && self.packet_id == 0 {
            return Err(Error::InvalidPacketId);
        }
        Ok(())
    }

    pub(crate) fn encode_body(&self, buf: &mut Vec<u8>, version: Version) -> Result<(), Error> {
        self.check()?;

        // --- Variable Header ---
        put_string(buf, &self.topic)?;
        if self.qos != QoS::AtMostOnce {
            put_u16(buf, self.packet_id);
        }
        put_properties_for(buf, &self.properties, version)?;

        // --- Payload ---
        buf.extend_from_slice(&self.payload);
        Ok(())
    }

    pub(crate) fn decode_body(
        flags: HeaderFlags,
        body: &[u8],
        version: Version,
    ) -> Result<Self, Error> {
        let qos = flags.qos()?;
        let mut dec = Decoder::new(body);
        let topic = dec.read_string()?;
        let packet_id = if qos != QoS::AtMostOnce {
            dec.read_u16()?
        } else {
            0
        };
        let properties = read_properties_for(&mut dec, version)?;
        let publish = Self {
            dup: flags.dup(),
            qos,
            retain: flags.retain(),
            topic,
            packet_id,
            properties,
            payload: dec.rest().to_vec(),
        };
        publish.check()?;
        Ok(publish)
    }
}

/// PUBACK, PUBREC, PUBREL or PUBCOMP.
///
/// The four share one layout; [`Frame`](super::Frame) tells them apart.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Ack {
    /// Identifier of the acknowledged PUBLISH.
    pub packet_id: u16,
    /// Reason code (v5). Always success on 3.1.1.
    pub reason: ReasonCode,
    /// Properties (v5).
    pub properties: Vec<Property>,
    /// Wire form of the optional tail (v5).
    pub form: ReasonForm,
}

impl Ack {
    /// A successful acknowledgment for `packet_id`.
    pub fn new(packet_id: u16) -> Self {
        Self {
            packet_id,
            ..Default::default()
        }
    }

    pub(crate) fn encode_body(&self, buf: &mut Vec<u8>, version: Version) -> Result<(), Error> {
        if self.packet_id == 0 {
            return Err(Error::InvalidPacketId);
        }
        put_u16(buf, self.packet_id);
        if !version.is_v5() {
            if !self.reason.is_success() || !self.properties.is_empty() {
                return Err(Error::Unsupported);
            }
            return Ok(());
        }
        match self
            .form
            .effective(self.reason, !self.properties.is_empty())
        {
            ReasonForm::Minimal => Ok(()),
            ReasonForm::Reason => {
                buf.push(self.reason.value());
                Ok(())
            }
            ReasonForm::Properties => {
                buf.push(self.reason.value());
                put_properties(buf, &self.properties)
            }
        }
    }

    pub(crate) fn decode_body(body: &[u8], version: Version) -> Result<Self, Error> {
        let mut dec = Decoder::new(body);
        let packet_id = dec.read_u16()?;
        if packet_id == 0 {
            return Err(Error::InvalidPacketId);
        }
        let mut ack = Self::new(packet_id);
        if version.is_v5() && !dec.is_empty() {
            ack.reason = ReasonCode(dec.read_u8()?).check_v5()?;
            let mut form = ReasonForm::Reason;
            if !dec.is_empty() {
                ack.properties = read_properties(&mut dec)?;
                form = ReasonForm::Properties;
            }
            ack.form = form.seen(ack.reason, !ack.properties.is_empty());
        }
        dec.finish()?;
        Ok(ack)
    }
}
