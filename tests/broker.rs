#![cfg(feature = "std")]

use dotenvy::dotenv;
use libmqtt::codec::{Frame, Publish, QoS, Version};
use libmqtt::config::{EngineConfig, Options};
use libmqtt::delivery::{AckKind, DeliveryEngine};
use libmqtt::network::error::Error;
use libmqtt::network::{Read, Write};
use libmqtt::reader::{ReadEvent, StreamReader, pump};
use libmqtt::time::{Clock, ManualClock};
use std::env;
use std::io::{Read as StdRead, Write as StdWrite};
use std::net::TcpStream;

struct NetConnection {
    stream: TcpStream,
}

impl Read for NetConnection {
    type Error = Error;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.stream.read(buf).map_err(|_| Error::ReadError)
    }
}

impl Write for NetConnection {
    type Error = Error;
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.stream.write(buf).map_err(|_| Error::WriteError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stream.flush().map_err(|_| Error::WriteError)
    }
}

fn connect(client_id: &str) -> NetConnection {
    dotenv().ok();
    let address = env::var("TEST_MQTT_ADDRESS").unwrap_or("test.mosquitto.org:1883".to_string());
    let stream = TcpStream::connect(address).expect("Failed to connect to broker");
    stream
        .set_read_timeout(Some(std::time::Duration::from_secs(5)))
        .unwrap();
    let mut conn = NetConnection { stream };

    let mut options = Options::new(client_id);
    options.keep_alive_seconds = 10;
    let bytes = Frame::Connect(options.to_connect())
        .encode(Version::V311)
        .unwrap();
    conn.write_all(&bytes).unwrap();
    conn
}

fn next_frame(conn: &mut NetConnection, reader: &mut StreamReader) -> Frame {
    loop {
        for event in pump(conn, reader).expect("Failed to read from broker") {
            if let ReadEvent::Frame(frame) = event {
                return frame;
            }
        }
    }
}

#[test]
#[ignore = "needs a reachable broker"]
fn test_connect_to_public_broker() {
    let mut conn = connect("libmqtt-test-client-12345");
    let mut reader = StreamReader::new(Version::V311);
    match next_frame(&mut conn, &mut reader) {
        Frame::ConnAck(ack) => assert!(ack.is_accepted()),
        other => panic!("expected CONNACK, got {other:?}"),
    }
}

#[test]
#[ignore = "needs a reachable broker"]
fn test_qos1_publish_is_acknowledged() {
    let mut conn = connect("libmqtt-test-client-67890");
    let mut reader = StreamReader::new(Version::V311);
    assert!(matches!(next_frame(&mut conn, &mut reader), Frame::ConnAck(_)));

    let clock = ManualClock::new();
    let mut engine = DeliveryEngine::in_memory(EngineConfig::default());
    let publish = Publish::new("libmqtt/test-topic", b"hello world".to_vec(), QoS::AtLeastOnce);
    for frame in engine.enqueue(publish, clock.now()).unwrap() {
        conn.write_all(&frame.encode(Version::V311).unwrap()).unwrap();
    }

    let frame = next_frame(&mut conn, &mut reader);
    let (kind, id) = AckKind::of(&frame).expect("expected an acknowledgment");
    assert_eq!(kind, AckKind::PubAck);
    assert!(engine.acknowledge(id, kind, clock.now()).is_empty());
    assert_eq!(engine.inflight_len(), 0);
}
