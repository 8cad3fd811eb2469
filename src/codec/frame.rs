//! The [`Frame`] sum type and the packet-type dispatch table.

use super::buf::put_len;
use super::control::{Auth, Disconnect};
use super::varint::decode_vbi;
use super::{
    Ack, ConnAck, Connect, Error, HeaderFlags, PacketType, Publish, SubAck, Subscribe,
    UnsubAck, Unsubscribe, Version,
};
use alloc::vec::Vec;

/// Any MQTT control packet.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Frame {
    /// CONNECT
    Connect(Connect),
    /// CONNACK
    ConnAck(ConnAck),
    /// PUBLISH
    Publish(Publish),
    /// PUBACK
    PubAck(Ack),
    /// PUBREC
    PubRec(Ack),
    /// PUBREL
    PubRel(Ack),
    /// PUBCOMP
    PubComp(Ack),
    /// SUBSCRIBE
    Subscribe(Subscribe),
    /// SUBACK
    SubAck(SubAck),
    /// UNSUBSCRIBE
    Unsubscribe(Unsubscribe),
    /// UNSUBACK
    UnsubAck(UnsubAck),
    /// PINGREQ
    PingReq,
    /// PINGRESP
    PingResp,
    /// DISCONNECT
    Disconnect(Disconnect),
    /// AUTH (v5 only)
    Auth(Auth),
}

impl Frame {
    /// The packet type of this frame.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Frame::Connect(_) => PacketType::Connect,
            Frame::ConnAck(_) => PacketType::ConnAck,
            Frame::Publish(_) => PacketType::Publish,
            Frame::PubAck(_) => PacketType::PubAck,
            Frame::PubRec(_) => PacketType::PubRec,
            Frame::PubRel(_) => PacketType::PubRel,
            Frame::PubComp(_) => PacketType::PubComp,
            Frame::Subscribe(_) => PacketType::Subscribe,
            Frame::SubAck(_) => PacketType::SubAck,
            Frame::Unsubscribe(_) => PacketType::Unsubscribe,
            Frame::UnsubAck(_) => PacketType::UnsubAck,
            Frame::PingReq => PacketType::PingReq,
            Frame::PingResp => PacketType::PingResp,
            Frame::Disconnect(_) => PacketType::Disconnect,
            Frame::Auth(_) => PacketType::Auth,
        }
    }

    /// The first byte of the encoded frame.
    pub fn header_flags(&self) -> HeaderFlags {
        match self {
            Frame::Publish(publish) => publish.header_flags(),
            other => HeaderFlags::new(other.packet_type()),
        }
    }

    /// The packet identifier, for frames that carry one.
    ///
    /// A QoS 0 PUBLISH reports `None`.
    pub fn packet_id(&self) -> Option<u16> {
        match self {
            Frame::Publish(publish) if publish.packet_id != 0 => Some(publish.packet_id),
            Frame::PubAck(ack) | Frame::PubRec(ack) | Frame::PubRel(ack) | Frame::PubComp(ack) => {
                Some(ack.packet_id)
            }
            Frame::Subscribe(subscribe) => Some(subscribe.packet_id),
            Frame::SubAck(ack) => Some(ack.packet_id),
            Frame::Unsubscribe(unsubscribe) => Some(unsubscribe.packet_id),
            Frame::UnsubAck(ack) => Some(ack.packet_id),
            _ => None,
        }
    }

    /// Encode the variable header and payload only.
    pub fn encode_body(&self, buf: &mut Vec<u8>, version: Version) -> Result<(), Error> {
        match self {
            Frame::Connect(connect) => connect.encode_body(buf),
            Frame::ConnAck(ack) => ack.encode_body(buf, version),
            Frame::Publish(publish) => publish.encode_body(buf, version),
            Frame::PubAck(ack) | Frame::PubRec(ack) | Frame::PubRel(ack) | Frame::PubComp(ack) => {
                ack.encode_body(buf, version)
            }
            Frame::Subscribe(subscribe) => subscribe.encode_body(buf, version),
            Frame::SubAck(ack) => ack.encode_body(buf, version),
            Frame::Unsubscribe(unsubscribe) => unsubscribe.encode_body(buf, version),
            Frame::UnsubAck(ack) => ack.encode_body(buf, version),
            Frame::PingReq | Frame::PingResp => Ok(()),
            Frame::Disconnect(disconnect) => disconnect.encode_body(buf, version),
            Frame::Auth(auth) => auth.encode_body(buf, version),
        }
    }

    /// Encode the complete frame: fixed header byte, remaining length, body.
    ///
    /// ```rust
    /// use libmqtt::codec::{Frame, Version};
    ///
    /// assert_eq!(Frame::PingReq.encode(Version::V311).unwrap(), [0xC0, 0x00]);
    /// ```
    pub fn encode(&self, version: Version) -> Result<Vec<u8>, Error> {
        let mut body = Vec::new();
        self.encode_body(&mut body, version)?;

        let mut buf = Vec::with_capacity(body.len() + 5);
        buf.push(self.header_flags().bits());
        put_len(&mut buf, body.len())?;
        buf.extend_from_slice(&body);
        Ok(buf)
    }
}

/// A per-type body decoder.
pub type DecodeFn = fn(HeaderFlags, &[u8], Version) -> Result<Frame, Error>;

fn decode_connect(_: HeaderFlags, body: &[u8], _: Version) -> Result<Frame, Error> {
    Connect::decode_body(body).map(Frame::Connect)
}

fn decode_connack(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    ConnAck::decode_body(body, version).map(Frame::ConnAck)
}

fn decode_publish(flags: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    Publish::decode_body(flags, body, version).map(Frame::Publish)
}

fn decode_puback(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    Ack::decode_body(body, version).map(Frame::PubAck)
}

fn decode_pubrec(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    Ack::decode_body(body, version).map(Frame::PubRec)
}

fn decode_pubrel(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    Ack::decode_body(body, version).map(Frame::PubRel)
}

fn decode_pubcomp(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    Ack::decode_body(body, version).map(Frame::PubComp)
}

fn decode_subscribe(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    Subscribe::decode_body(body, version).map(Frame::Subscribe)
}

fn decode_suback(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    SubAck::decode_body(body, version).map(Frame::SubAck)
}

fn decode_unsubscribe(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    Unsubscribe::decode_body(body, version).map(Frame::Unsubscribe)
}

fn decode_unsuback(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    UnsubAck::decode_body(body, version).map(Frame::UnsubAck)
}

fn empty_body(body: &[u8], frame: Frame) -> Result<Frame, Error> {
    if body.is_empty() {
        Ok(frame)
    } else {
        Err(Error::LengthMismatch)
    }
}

fn decode_pingreq(_: HeaderFlags, body: &[u8], _: Version) -> Result<Frame, Error> {
    empty_body(body, Frame::PingReq)
}

fn decode_pingresp(_: HeaderFlags, body: &[u8], _: Version) -> Result<Frame, Error> {
    empty_body(body, Frame::PingResp)
}

fn decode_disconnect(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    Disconnect::decode_body(body, version).map(Frame::Disconnect)
}

fn decode_auth(_: HeaderFlags, body: &[u8], version: Version) -> Result<Frame, Error> {
    Auth::decode_body(body, version).map(Frame::Auth)
}

static DECODERS: [Option<DecodeFn>; 16] = [
    None,
    Some(decode_connect),
    Some(decode_connack),
    Some(decode_publish),
    Some(decode_puback),
    Some(decode_pubrec),
    Some(decode_pubrel),
    Some(decode_pubcomp),
    Some(decode_subscribe),
    Some(decode_suback),
    Some(decode_unsubscribe),
    Some(decode_unsuback),
    Some(decode_pingreq),
    Some(decode_pingresp),
    Some(decode_disconnect),
    Some(decode_auth),
];

/// Look up the body decoder for a packet type nibble.
pub fn decoder_for(nibble: u8) -> Option<DecodeFn> {
    DECODERS.get(usize::from(nibble)).copied().flatten()
}

/// Encode `frame` for `version`.
pub fn encode(frame: &Frame, version: Version) -> Result<Vec<u8>, Error> {
    frame.encode(version)
}

/// Decode one frame from its fixed header byte and exactly its body bytes.
///
/// # Errors
///
/// * [`Error::UnknownPacketType`] - reserved type nibble 0, or AUTH on 3.1.1
/// * [`Error::InvalidFlags`] - low nibble does not match the packet type
/// * any body-level error of the individual packet
///
/// ```rust
/// use libmqtt::codec::{decode, Frame, Version};
///
/// let frame = decode(0x40, &[0x00, 0x2A], Version::V311).unwrap();
/// assert_eq!(frame.packet_id(), Some(42));
/// assert!(matches!(frame, Frame::PubAck(_)));
/// ```
pub fn decode(header: u8, body: &[u8], version: Version) -> Result<Frame, Error> {
    let flags = HeaderFlags::from_bits(header);
    let packet_type = flags.packet_type()?;
    flags.validate(packet_type)?;
    let decoder = decoder_for(flags.type_nibble()).ok_or(Error::UnknownPacketType(flags.type_nibble()))?;
    decoder(flags, body, version)
}

/// Decode the first complete frame in `buf`.
///
/// Returns `Ok(None)` while `buf` holds less than one whole frame, otherwise the
/// frame and the number of bytes it occupied.
pub fn decode_frame(buf: &[u8], version: Version) -> Result<Option<(Frame, usize)>, Error> {
    let Some(&header) = buf.first() else {
        return Ok(None);
    };
    let Some((len, used)) = decode_vbi(&buf[1..])? else {
        return Ok(None);
    };
    let start = 1 + used;
    let end = start + len as usize;
    if buf.len() < end {
        return Ok(None);
    }
    let frame = decode(header, &buf[start..end], version)?;
    Ok(Some((frame, end)))
}
