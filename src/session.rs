//! # Session Store
//!
//! Durable per-client record of every QoS 1/2 PUBLISH and PUBREL that has been
//! handed to the transport but not yet completed.
//!
//! Each record lives under the key
//!
//! ```text
//! client id length (u16) | client id | packet id (u16) | kind ('P' or 'R')
//! ```
//!
//! so a QoS 2 message's PUBLISH and PUBREL are distinct, independently
//! removable records while it moves between the two. The value is
//!
//! ```text
//! crc32 (u32) | sequence (u64) | encoded frame
//! ```
//!
//! where the sequence number restores insertion order on [`read_all`]
//! and the CRC covers everything after it.
//!
//! [`read_all`]: SessionStore::read_all

use crate::codec::{self, Frame, QoS, Version};
use crate::macros::{log_debug, log_warn};
use crate::storage::{Error, KeyValueStore};
use alloc::vec::Vec;

const KIND_PUBLISH: u8 = b'P';
const KIND_PUBREL: u8 = b'R';
const HEADER_LEN: usize = 4 + 8;

/// Persistent store of one client's unacknowledged outbound frames.
#[derive(Debug)]
pub struct SessionStore<S> {
    store: S,
    prefix: Vec<u8>,
    version: Version,
    next_seq: u64,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Open the session of `client_id` inside `store`.
    ///
    /// Scans existing records so new writes sort after them.
    pub fn open(store: S, client_id: &str, version: Version) -> Result<Self, Error> {
        let len = u16::try_from(client_id.len()).map_err(|_| Error::WriteError)?;
        let mut prefix = Vec::with_capacity(2 + client_id.len());
        prefix.extend_from_slice(&len.to_be_bytes());
        prefix.extend_from_slice(client_id.as_bytes());

        let mut session = Self {
            store,
            prefix,
            version,
            next_seq: 0,
        };
        let last = session.load()?.iter().map(|(seq, _)| *seq).max();
        session.next_seq = last.map_or(0, |seq| seq + 1);
        Ok(session)
    }

    /// Persist `frame` if it is a QoS 1/2 PUBLISH or a PUBREL.
    ///
    /// Returns `Ok(false)` without touching the store for any other frame.
    /// Rewriting a record (a retransmission with DUP set) keeps its sequence
    /// number, and a PUBREL takes over the sequence number of the PUBLISH it
    /// follows, so a message keeps its place in replay order.
    pub fn write(&mut self, frame: &Frame) -> Result<bool, Error> {
        let Some(key) = self.key_for(frame) else {
            return Ok(false);
        };
        let mut seq = self.existing_seq(&key)?;
        if let (None, Frame::PubRel(ack)) = (seq, frame) {
            seq = self.existing_seq(&self.key(ack.packet_id, KIND_PUBLISH))?;
        }
        let seq = match seq {
            Some(seq) => seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        let bytes = frame.encode(self.version).map_err(|_| Error::WriteError)?;
        self.store.put(&key, &encode_record(seq, &bytes))?;
        log_debug!(
            "persisted {} #{} at seq {}",
            frame.packet_type(),
            frame.packet_id().unwrap_or(0),
            seq
        );
        Ok(true)
    }

    /// Delete the record for `frame`. Frames that are never persisted are
    /// ignored.
    pub fn remove(&mut self, frame: &Frame) -> Result<(), Error> {
        match self.key_for(frame) {
            Some(key) => self.store.remove(&key),
            None => Ok(()),
        }
    }

    /// Every stored frame in original insertion order.
    ///
    /// Records that fail their integrity check are logged and skipped. When
    /// both the PUBLISH and PUBREL of one packet id survive (a crash between
    /// writing one and removing the other) only the PUBREL is returned.
    pub fn read_all(&self) -> Result<Vec<Frame>, Error> {
        let mut records = self.load()?;
        records.sort_by_key(|(seq, _)| *seq);
        let released: Vec<u16> = records
            .iter()
            .filter_map(|(_, frame)| match frame {
                Frame::PubRel(ack) => Some(ack.packet_id),
                _ => None,
            })
            .collect();
        Ok(records
            .into_iter()
            .filter(|(_, frame)| match frame {
                Frame::Publish(publish) => !released.contains(&publish.packet_id),
                _ => true,
            })
            .map(|(_, frame)| frame)
            .collect())
    }

    /// [`read_all`](Self::read_all), then delete every record of this client,
    /// including unreadable ones.
    pub fn take_all(&mut self) -> Result<Vec<Frame>, Error> {
        let frames = self.read_all()?;
        self.clear()?;
        Ok(frames)
    }

    /// Delete every record of this client.
    pub fn clear(&mut self) -> Result<(), Error> {
        for key in self.store.keys(&self.prefix)? {
            self.store.remove(&key)?;
        }
        self.next_seq = 0;
        self.store.flush()
    }

    /// Flush barrier: every completed write is durable once this returns.
    pub fn synchronize(&mut self) -> Result<(), Error> {
        self.store.flush()
    }

    /// Number of records held for this client.
    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.store.keys(&self.prefix)?.len())
    }

    /// Whether no records are held for this client.
    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    /// Protocol version records are encoded with.
    pub fn version(&self) -> Version {
        self.version
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the underlying store.
    pub fn into_inner(self) -> S {
        self.store
    }

    fn key(&self, packet_id: u16, kind: u8) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.prefix.len() + 3);
        key.extend_from_slice(&self.prefix);
        key.extend_from_slice(&packet_id.to_be_bytes());
        key.push(kind);
        key
    }

    fn key_for(&self, frame: &Frame) -> Option<Vec<u8>> {
        match frame {
            Frame::Publish(publish) if publish.qos != QoS::AtMostOnce => {
                Some(self.key(publish.packet_id, KIND_PUBLISH))
            }
            Frame::PubRel(ack) => Some(self.key(ack.packet_id, KIND_PUBREL)),
            _ => None,
        }
    }

    fn existing_seq(&self, key: &[u8]) -> Result<Option<u64>, Error> {
        match self.read_record(key) {
            Ok(record) => Ok(record.map(|(seq, _)| seq)),
            Err(Error::Corrupted) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn read_record(&self, key: &[u8]) -> Result<Option<(u64, Frame)>, Error> {
        match self.store.get(key)? {
            Some(bytes) => decode_record(&bytes, self.version).map(Some),
            None => Ok(None),
        }
    }

    fn load(&self) -> Result<Vec<(u64, Frame)>, Error> {
        let mut records = Vec::new();
        for key in self.store.keys(&self.prefix)? {
            match self.read_record(&key) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(Error::Corrupted) => {
                    log_warn!("skipping corrupted session record ({} byte key)", key.len());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(records)
    }
}

fn encode_record(seq: u64, frame: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(HEADER_LEN + frame.len());
    record.extend_from_slice(&[0; 4]);
    record.extend_from_slice(&seq.to_be_bytes());
    record.extend_from_slice(frame);
    let crc = crc32fast::hash(&record[4..]);
    record[..4].copy_from_slice(&crc.to_be_bytes());
    record
}

fn decode_record(record: &[u8], version: Version) -> Result<(u64, Frame), Error> {
    if record.len() < HEADER_LEN {
        return Err(Error::Corrupted);
    }
    let (crc, rest) = record.split_at(4);
    if crc32fast::hash(rest).to_be_bytes() != crc {
        return Err(Error::Corrupted);
    }
    let (seq, frame) = rest.split_at(8);
    let mut seq_bytes = [0u8; 8];
    seq_bytes.copy_from_slice(seq);
    match codec::decode_frame(frame, version) {
        Ok(Some((decoded, used))) if used == frame.len() => {
            Ok((u64::from_be_bytes(seq_bytes), decoded))
        }
        _ => Err(Error::Corrupted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Ack, Publish};
    use crate::storage::MemoryStore;
    use alloc::vec;

    fn publish(id: u16, qos: QoS) -> Frame {
        let mut publish = Publish::new("t", vec![id as u8], qos);
        publish.packet_id = if qos == QoS::AtMostOnce { 0 } else { id };
        Frame::Publish(publish)
    }

    fn session() -> SessionStore<MemoryStore> {
        SessionStore::open(MemoryStore::new(), "client", Version::V311).unwrap()
    }

    #[test]
    fn test_only_qos_publish_and_pubrel_persist() {
        let mut session = session();
        assert!(!session.write(&publish(1, QoS::AtMostOnce)).unwrap());
        assert!(!session.write(&Frame::PubAck(Ack::new(1))).unwrap());
        assert!(!session.write(&Frame::PingReq).unwrap());
        assert!(session.write(&publish(1, QoS::AtLeastOnce)).unwrap());
        assert!(session.write(&Frame::PubRel(Ack::new(2))).unwrap());
        assert_eq!(session.len().unwrap(), 2);
    }

    #[test]
    fn test_read_all_keeps_insertion_order() {
        let mut session = session();
        for id in [300u16, 2, 65535, 7] {
            session.write(&publish(id, QoS::AtLeastOnce)).unwrap();
        }
        let ids: Vec<_> = session
            .read_all()
            .unwrap()
            .iter()
            .filter_map(Frame::packet_id)
            .collect();
        assert_eq!(ids, vec![300, 2, 65535, 7]);
    }

    #[test]
    fn test_pubrel_replaces_publish_in_place() {
        let mut session = session();
        session.write(&publish(1, QoS::ExactlyOnce)).unwrap();
        session.write(&publish(2, QoS::AtLeastOnce)).unwrap();

        session.write(&Frame::PubRel(Ack::new(1))).unwrap();
        // both records exist until the publish is removed
        assert_eq!(session.len().unwrap(), 3);
        assert_eq!(session.read_all().unwrap()[0], Frame::PubRel(Ack::new(1)));

        session.remove(&publish(1, QoS::ExactlyOnce)).unwrap();
        let frames = session.read_all().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], Frame::PubRel(Ack::new(1)));
    }

    #[test]
    fn test_rewrite_keeps_position() {
        let mut session = session();
        session.write(&publish(1, QoS::AtLeastOnce)).unwrap();
        session.write(&publish(2, QoS::AtLeastOnce)).unwrap();
        let mut dup = publish(1, QoS::AtLeastOnce);
        if let Frame::Publish(p) = &mut dup {
            p.dup = true;
        }
        session.write(&dup).unwrap();
        let frames = session.read_all().unwrap();
        assert_eq!(frames[0], dup);
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_take_all_empties_session() {
        let mut session = session();
        session.write(&publish(1, QoS::AtLeastOnce)).unwrap();
        assert_eq!(session.take_all().unwrap().len(), 1);
        assert!(session.is_empty().unwrap());
    }

    #[test]
    fn test_clients_do_not_share_records() {
        let mut store = MemoryStore::new();
        {
            let mut a = SessionStore::open(&mut store, "a", Version::V311).unwrap();
            a.write(&publish(1, QoS::AtLeastOnce)).unwrap();
        }
        let mut ab = SessionStore::open(&mut store, "ab", Version::V311).unwrap();
        assert!(ab.read_all().unwrap().is_empty());
        ab.clear().unwrap();
        let a = SessionStore::open(&mut store, "a", Version::V311).unwrap();
        assert_eq!(a.len().unwrap(), 1);
    }

    #[test]
    fn test_corrupted_record_skipped() {
        let mut session = session();
        session.write(&publish(1, QoS::AtLeastOnce)).unwrap();
        session.write(&publish(2, QoS::AtLeastOnce)).unwrap();

        let key = session.key(1, KIND_PUBLISH);
        let mut bytes = session.store.get(&key).unwrap().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        session.store.put(&key, &bytes).unwrap();

        assert_eq!(
            decode_record(&bytes, Version::V311),
            Err(Error::Corrupted)
        );
        let frames = session.read_all().unwrap();
        assert_eq!(frames, vec![publish(2, QoS::AtLeastOnce)]);
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let mut session = session();
        session.write(&publish(9, QoS::AtLeastOnce)).unwrap();
        let store = session.into_inner();

        let mut session = SessionStore::open(store, "client", Version::V311).unwrap();
        session.write(&publish(1, QoS::AtLeastOnce)).unwrap();
        let ids: Vec<_> = session
            .read_all()
            .unwrap()
            .iter()
            .filter_map(Frame::packet_id)
            .collect();
        assert_eq!(ids, vec![9, 1]);
    }
}
