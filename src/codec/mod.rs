//! # MQTT Frame Codec
//!
//! Bit-exact encoding and decoding of every MQTT 3.1.1 and 5.0 control packet.
//!
//! A frame on the wire is a fixed header byte (packet type and flags), a
//! variable byte integer giving the body length, then the body: a variable
//! header, v5 properties where the packet type has them, and a payload.
//!
//! The codec is pure. [`decode`] works on one already delimited frame; the
//! [`reader`](crate::reader) does the delimiting for byte streams. A decode
//! error concerns only that frame, so the caller decides whether to skip it or
//! drop the connection.
//!
//! ## Example
//!
//! ```rust
//! use libmqtt::codec::{decode_frame, Frame, Publish, QoS, Version};
//!
//! let mut publish = Publish::new("t/1", b"hello".to_vec(), QoS::AtLeastOnce);
//! publish.packet_id = 1;
//! let frame = Frame::Publish(publish);
//!
//! let bytes = frame.encode(Version::V311).unwrap();
//! assert_eq!(&bytes[..2], &[0x32, 12]);
//!
//! let (decoded, used) = decode_frame(&bytes, Version::V311).unwrap().unwrap();
//! assert_eq!(used, bytes.len());
//! assert_eq!(decoded, frame);
//! ```

mod buf;
mod connect;
mod control;
pub mod error;
mod frame;
mod header;
mod property;
mod publish;
mod reason;
mod subscribe;
mod varint;

pub use connect::{ConnAck, Connect, Will};
pub use control::{Auth, Disconnect};
pub use error::Error;
pub use frame::{DecodeFn, Frame, decode, decode_frame, decoder_for, encode};
pub use header::{HeaderFlags, PacketType, QoS, Version};
pub use property::Property;
pub use publish::{Ack, Publish};
pub use reason::{ReasonCode, ReasonForm, connect_return};
pub use subscribe::{
    Filter, RetainHandling, SubAck, Subscribe, SubscriptionOptions, UnsubAck, Unsubscribe,
};
pub use varint::{VBI_MAX, VBI_MAX_LEN, decode_vbi, encode_vbi, put_vbi, vbi_len};
