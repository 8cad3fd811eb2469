use libmqtt::codec::{Ack, Frame, Publish, QoS, Version};
use libmqtt::network::error::Error;
use libmqtt::network::*;
use libmqtt::reader::{self, FramingError, ReadEvent, StreamReader, pump};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MOCK_BUFFER_SIZE: usize = 1024;

#[derive(Debug)]
struct MockConnection {
    read_buffer: [u8; MOCK_BUFFER_SIZE],
    read_pos: usize,
    max_read: usize,
    is_open: bool,
}

impl MockConnection {
    fn new() -> Self {
        Self {
            read_buffer: [0; MOCK_BUFFER_SIZE],
            read_pos: 0,
            max_read: MOCK_BUFFER_SIZE,
            is_open: true,
        }
    }

    /// Inject data into the connection's read buffer
    fn set_read_data(&mut self, data: &[u8]) {
        let len = data.len().min(MOCK_BUFFER_SIZE);
        self.read_buffer[..len].copy_from_slice(&data[..len]);
        self.read_pos = len;
    }
}

impl Read for MockConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if !self.is_open {
            return Err(Error::ReadError);
        }
        let readable = self.read_pos;
        let len = buf.len().min(readable).min(self.max_read);
        buf[..len].copy_from_slice(&self.read_buffer[..len]);

        // Shift remaining data
        self.read_buffer.copy_within(len..readable, 0);
        self.read_pos -= len;

        Ok(len)
    }
}

fn sample_stream() -> (Vec<u8>, Vec<Frame>) {
    let mut frames = Vec::new();
    for i in 1..=20u16 {
        let qos = match i % 3 {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            _ => QoS::ExactlyOnce,
        };
        let mut publish = Publish::new(format!("sensors/{i}"), vec![i as u8; usize::from(i) * 7], qos);
        if qos != QoS::AtMostOnce {
            publish.packet_id = i;
        }
        frames.push(Frame::Publish(publish));
        frames.push(Frame::PubAck(Ack::new(i)));
        if i % 5 == 0 {
            frames.push(Frame::PingResp);
        }
    }
    let bytes = frames
        .iter()
        .flat_map(|frame| frame.encode(Version::V311).unwrap())
        .collect();
    (bytes, frames)
}

fn decoded(events: Vec<ReadEvent>) -> Vec<Frame> {
    events
        .into_iter()
        .map(|event| match event {
            ReadEvent::Frame(frame) => frame,
            other => panic!("unexpected {other:?}"),
        })
        .collect()
}

#[test]
fn test_random_chunking_is_transparent() {
    let (bytes, expected) = sample_stream();
    let mut rng = StdRng::seed_from_u64(0x5EED);

    for _ in 0..50 {
        let mut reader = StreamReader::new(Version::V311);
        let mut events = Vec::new();
        let mut rest = &bytes[..];
        while !rest.is_empty() {
            let take = rng.gen_range(1..=rest.len().min(64));
            events.extend(reader.feed(&rest[..take]).unwrap());
            rest = &rest[take..];
        }
        assert!(!reader.is_mid_frame());
        assert_eq!(decoded(events), expected);
    }
}

#[test]
fn test_whole_stream_in_one_chunk() {
    let (bytes, expected) = sample_stream();
    let mut reader = StreamReader::new(Version::V311);
    let mut seen = 0;
    reader
        .feed_with(&bytes, |event| {
            assert_eq!(event, ReadEvent::Frame(expected[seen].clone()));
            seen += 1;
        })
        .unwrap();
    assert_eq!(seen, expected.len());
}

#[test]
fn test_skipped_frame_keeps_stream_in_sync() {
    let mut bytes = vec![0x40, 2, 0, 1];
    // PUBACK with packet id 0 is delimited but undecodable.
    bytes.extend_from_slice(&[0x40, 2, 0, 0]);
    bytes.extend_from_slice(&[0xD0, 0]);

    let mut reader = StreamReader::new(Version::V311);
    let events = reader.feed(&bytes).unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], ReadEvent::Frame(Frame::PubAck(Ack::new(1))));
    assert!(matches!(events[1], ReadEvent::Skipped { header: 0x40, .. }));
    assert_eq!(events[2], ReadEvent::Frame(Frame::PingResp));
}

#[test]
fn test_framing_error_is_sticky() {
    let mut reader = StreamReader::new(Version::V311);
    let err = reader.feed(&[0x30, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap_err();
    assert_eq!(err, FramingError::MalformedLength);
    assert_eq!(reader.failure(), Some(FramingError::MalformedLength));
    assert_eq!(reader.feed(&[0xD0, 0]), Err(FramingError::MalformedLength));

    reader.reset();
    assert_eq!(decoded(reader.feed(&[0xD0, 0]).unwrap()), vec![Frame::PingResp]);
}

#[test]
fn test_pump_reads_from_connection() {
    let mut conn = MockConnection::new();
    conn.max_read = 3;
    conn.set_read_data(&[0x40, 2, 0, 9, 0xD0, 0]);

    let mut reader = StreamReader::new(Version::V311);
    assert!(pump(&mut conn, &mut reader).unwrap().is_empty());
    assert!(reader.is_mid_frame());
    let events = pump(&mut conn, &mut reader).unwrap();
    assert_eq!(
        decoded(events),
        vec![Frame::PubAck(Ack::new(9)), Frame::PingResp]
    );

    assert_eq!(
        pump(&mut conn, &mut reader),
        Err(reader::Error::Network(Error::ConnectionClosed))
    );

    conn.is_open = false;
    assert_eq!(
        pump(&mut conn, &mut reader),
        Err(reader::Error::Network(Error::ReadError))
    );
}

#[test]
fn test_pump_surfaces_framing_error() {
    let mut conn = MockConnection::new();
    conn.set_read_data(&[0x30, 0x80, 0x80, 0x80, 0x80]);
    let mut reader = StreamReader::new(Version::V311);
    assert_eq!(
        pump(&mut conn, &mut reader),
        Err(reader::Error::Framing(FramingError::MalformedLength))
    );
}

#[cfg(feature = "async")]
mod async_tests {
    use super::*;
    use futures::executor::block_on;
    use libmqtt::reader::pump_async;

    impl AsyncRead for MockConnection {
        type Error = Error;
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            Read::read(self, buf)
        }
    }

    #[test]
    fn test_async_pump() {
        let mut conn = MockConnection::new();
        conn.set_read_data(&[0x50, 2, 0, 3]);
        let mut reader = StreamReader::new(Version::V311);
        let events = block_on(pump_async(&mut conn, &mut reader)).unwrap();
        assert_eq!(decoded(events), vec![Frame::PubRec(Ack::new(3))]);
        assert_eq!(
            block_on(pump_async(&mut conn, &mut reader)),
            Err(reader::Error::Network(Error::ConnectionClosed))
        );
    }
}
