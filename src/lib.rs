//! # libmqtt - MQTT protocol engine
//!
//! The client-side core of MQTT 3.1.1 and 5.0: a bit-exact frame codec, a
//! stream reader that cuts frames out of arbitrary byte chunks, and a
//! delivery engine that carries QoS 1 and QoS 2 messages to completion across
//! retransmissions and reconnects. The library is designed for embedded
//! systems and supports `no_std` environments with `alloc`.
//!
//! ## Features
//!
//! ### Codec
//! - Every control packet of both protocol versions
//! - v5 properties in wire order, reason codes
//! - Variable byte integers up to 268,435,455
//!
//! ### Delivery
//! - Inflight window, bounded queue, packet identifier allocation
//! - Timed retransmission with DUP
//! - Session persistence over any key-value store, with file and RAM backends
//!
//! ### Transport
//! - Bring your own connection through the `network` traits
//! - Sync and async flavors
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libmqtt = "0.1.0"
//! ```
//!
//! ### Publishing with QoS 1
//!
//! ```rust
//! use libmqtt::codec::{Frame, Publish, QoS, Version};
//! use libmqtt::config::EngineConfig;
//! use libmqtt::delivery::{AckKind, DeliveryEngine};
//! use libmqtt::reader::{ReadEvent, StreamReader};
//! use libmqtt::time::Timestamp;
//!
//! let mut engine = DeliveryEngine::in_memory(EngineConfig::default());
//! let now = Timestamp::from_millis(0);
//!
//! let out = engine.enqueue(Publish::new("sensors/temp", b"23.5".to_vec(), QoS::AtLeastOnce), now).unwrap();
//! let wire = out[0].encode(Version::V311).unwrap();
//! assert_eq!(wire[0], 0x32);
//!
//! // The broker answers with PUBACK, possibly split across reads.
//! let mut reader = StreamReader::new(Version::V311);
//! assert!(reader.feed(&[0x40, 0x02]).unwrap().is_empty());
//! let events = reader.feed(&[0x00, 0x01]).unwrap();
//!
//! if let [ReadEvent::Frame(frame)] = &events[..] {
//!     let (kind, id) = AckKind::of(frame).unwrap();
//!     engine.acknowledge(id, kind, now);
//! }
//! assert_eq!(engine.inflight_len(), 0);
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` and `alloc` libraries
//!
//! ## Optional Features
//!
//! - `std`: File-backed sessions, the threaded delivery service and `tracing`
//!   logs (default: enabled)
//! - `async`: Async transport traits and the frame writer task (default: enabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

extern crate alloc;

mod macros;

/// Encoding and decoding of MQTT control packets.
pub mod codec;

/// Frame extraction from a byte stream.
pub mod reader;

/// Outbound message delivery: queue, inflight window, acknowledgments and
/// retransmission.
pub mod delivery;

pub mod session;

/// Key-value storage backends for session persistence.
pub mod storage;

/// Transport abstraction layer.
///
/// The engine reads and writes bytes through these traits and never touches
/// sockets itself.
pub mod network;

pub mod time;

/// Engine tuning and connect options.
pub mod config;
