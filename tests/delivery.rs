#![cfg(feature = "std")]

use libmqtt::codec::{Ack, Frame, Publish, QoS, Version};
use libmqtt::config::EngineConfig;
use libmqtt::delivery::{AckKind, DeliveryEngine, Error};
use libmqtt::reader::{ReadEvent, StreamReader};
use libmqtt::session::SessionStore;
use libmqtt::storage::{FileStore, KeyValueStore};
use libmqtt::time::{Clock, ManualClock};

fn config() -> EngineConfig {
    EngineConfig {
        inflight_window: 2,
        queue_capacity: 16,
        retry_interval_ms: 2_000,
        version: Version::V311,
    }
}

/// Feed the broker's reply bytes through a reader and apply every ack.
fn apply_replies<S: KeyValueStore>(
    engine: &mut DeliveryEngine<S>,
    reader: &mut StreamReader,
    replies: &[u8],
    clock: &ManualClock,
) -> Vec<Frame> {
    let mut out = Vec::new();
    for event in reader.feed(replies).unwrap() {
        let ReadEvent::Frame(frame) = event else {
            panic!("broker sent garbage");
        };
        let (kind, id) = AckKind::of(&frame).unwrap();
        out.extend(engine.acknowledge(id, kind, clock.now()));
    }
    out
}

fn wire(frames: &[Frame]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|frame| frame.encode(Version::V311).unwrap())
        .collect()
}

#[test]
fn test_mixed_qos_flow_over_the_wire() {
    let clock = ManualClock::new();
    let mut engine = DeliveryEngine::in_memory(config());
    let mut reader = StreamReader::new(Version::V311);

    let mut sent = Vec::new();
    sent.extend(engine.enqueue(Publish::new("q1", b"1".to_vec(), QoS::AtLeastOnce), clock.now()).unwrap());
    sent.extend(engine.enqueue(Publish::new("q2", b"2".to_vec(), QoS::ExactlyOnce), clock.now()).unwrap());
    sent.extend(engine.enqueue(Publish::new("q0", b"0".to_vec(), QoS::AtMostOnce), clock.now()).unwrap());
    sent.extend(engine.enqueue(Publish::new("q1b", b"3".to_vec(), QoS::AtLeastOnce), clock.now()).unwrap());
    assert_eq!(sent.len(), 3);
    assert_eq!(engine.queued_len(), 1);

    // PUBACK(1) and PUBREC(2) arrive in one segment.
    clock.advance(10);
    let out = apply_replies(&mut engine, &mut reader, &[0x40, 2, 0, 1, 0x50, 2, 0, 2], &clock);
    assert_eq!(out.len(), 2);
    assert!(matches!(&out[0], Frame::Publish(p) if p.topic == "q1b" && p.packet_id == 3));
    assert_eq!(out[1], Frame::PubRel(Ack::new(2)));
    assert_eq!(&wire(&out[1..]), &[0x62, 2, 0, 2]);

    let out = apply_replies(&mut engine, &mut reader, &[0x70, 2, 0, 2, 0x40, 2, 0, 3], &clock);
    assert!(out.is_empty());
    assert_eq!(engine.inflight_len(), 0);
    assert!(!engine.retry_armed());
}

#[test]
fn test_retransmission_marks_dup() {
    let clock = ManualClock::new();
    let mut engine = DeliveryEngine::in_memory(config());
    engine
        .enqueue(Publish::new("r", b"x".to_vec(), QoS::AtLeastOnce), clock.now())
        .unwrap();

    clock.advance(1_999);
    assert!(engine.retry(clock.now()).is_empty());
    clock.advance(1);
    let resent = engine.retry(clock.now());
    assert_eq!(wire(&resent)[0], 0x3A);
}

#[test]
fn test_queue_full_drops_message() {
    let clock = ManualClock::new();
    let mut engine = DeliveryEngine::in_memory(EngineConfig {
        queue_capacity: 2,
        ..config()
    });
    for topic in ["a", "b"] {
        engine
            .enqueue(Publish::new(topic, vec![], QoS::ExactlyOnce), clock.now())
            .unwrap();
    }
    assert_eq!(
        engine.enqueue(Publish::new("c", vec![], QoS::ExactlyOnce), clock.now()),
        Err(Error::QueueFull)
    );
}

#[test]
fn test_file_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();

    {
        let store = FileStore::open(dir.path()).unwrap();
        let session = SessionStore::open(store, "plant-7", Version::V311).unwrap();
        let mut engine = DeliveryEngine::with_session(config(), session);
        for (topic, qos) in [("t/1", QoS::AtLeastOnce), ("t/2", QoS::ExactlyOnce), ("t/3", QoS::AtLeastOnce)] {
            engine
                .enqueue(Publish::new(topic, topic.as_bytes().to_vec(), qos), clock.now())
                .unwrap();
        }
        // t/2 reaches PUBREL, t/3 is still queued when the process dies.
        engine.acknowledge(2, AckKind::PubRec, clock.now());
        assert_eq!(engine.queued_len(), 1);
        assert!(engine.is_persistent());
        let mut session = engine.into_session().unwrap();
        session.synchronize().unwrap();
    }

    let store = FileStore::open(dir.path()).unwrap();
    let session = SessionStore::open(store, "plant-7", Version::V311).unwrap();
    let mut engine = DeliveryEngine::with_session(config(), session);
    clock.advance(60_000);
    let replay = engine.on_connected(false, clock.now());

    assert_eq!(replay.len(), 2);
    assert!(matches!(&replay[0], Frame::Publish(p) if p.topic == "t/1" && p.packet_id == 1));
    assert_eq!(replay[1], Frame::PubRel(Ack::new(2)));
    assert_eq!(engine.inflight_ids(), vec![1, 2]);

    // Complete both; the store ends up empty.
    engine.acknowledge(1, AckKind::PubAck, clock.now());
    engine.acknowledge(2, AckKind::PubComp, clock.now());
    let session = engine.into_session().unwrap();
    assert!(session.is_empty().unwrap());
}

#[test]
fn test_clean_session_discards_persisted_records() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();

    let store = FileStore::open(dir.path()).unwrap();
    let session = SessionStore::open(store, "plant-8", Version::V311).unwrap();
    let mut engine = DeliveryEngine::with_session(config(), session);
    engine
        .enqueue(Publish::new("t", vec![1], QoS::AtLeastOnce), clock.now())
        .unwrap();
    assert!(engine.on_connected(true, clock.now()).is_empty());
    drop(engine);

    let store = FileStore::open(dir.path()).unwrap();
    let session = SessionStore::open(store, "plant-8", Version::V311).unwrap();
    let mut engine = DeliveryEngine::with_session(config(), session);
    assert!(engine.recover(clock.now()).is_empty());
}
