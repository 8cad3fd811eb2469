use super::error::Error;
use super::*;
use alloc::string::ToString;
use alloc::vec;

fn exercise<S: KeyValueStore>(store: &mut S) {
    store.put(b"a/2", b"two").unwrap();
    store.put(b"a/1", b"one").unwrap();
    store.put(b"b/1", b"other").unwrap();

    assert_eq!(store.get(b"a/1").unwrap(), Some(b"one".to_vec()));
    assert_eq!(store.get(b"a/3").unwrap(), None);
    assert_eq!(store.keys(b"a/").unwrap(), vec![b"a/1".to_vec(), b"a/2".to_vec()]);

    store.put(b"a/1", b"uno").unwrap();
    assert_eq!(store.get(b"a/1").unwrap(), Some(b"uno".to_vec()));

    store.remove(b"a/1").unwrap();
    store.remove(b"a/1").unwrap();
    assert_eq!(store.keys(b"a/").unwrap(), vec![b"a/2".to_vec()]);
    assert_eq!(store.keys(b"").unwrap().len(), 2);
    store.flush().unwrap();
}

#[test]
fn test_memory_store_contract() {
    let mut store = MemoryStore::new();
    exercise(&mut store);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_mutable_reference_is_a_store() {
    let mut store = MemoryStore::new();
    {
        let mut borrowed = &mut store;
        KeyValueStore::put(&mut borrowed, b"k", b"v").unwrap();
    }
    assert!(!store.is_empty());
}

#[test]
fn test_prefix_range_stops_at_first_mismatch() {
    let mut store = MemoryStore::new();
    store.put(b"ab", b"").unwrap();
    store.put(b"abc", b"").unwrap();
    store.put(b"ac", b"").unwrap();
    store.put(b"b", b"").unwrap();
    assert_eq!(store.keys(b"ab").unwrap().len(), 2);
    assert_eq!(store.get(b"zz"), Ok(None));
}

#[test]
fn test_error_display() {
    assert_eq!(Error::Corrupted.to_string(), "corrupted record");
}

#[cfg(feature = "std")]
mod file_tests {
    use super::*;

    #[test]
    fn test_file_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        exercise(&mut store);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = FileStore::open(dir.path()).unwrap();
            store.put(&[0x00, 0xFF, b'/'], b"binary key").unwrap();
            store.flush().unwrap();
        }
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.keys(&[]).unwrap(), vec![vec![0x00, 0xFF, b'/']]);
        assert_eq!(
            store.get(&[0x00, 0xFF, b'/']).unwrap(),
            Some(b"binary key".to_vec())
        );
    }

    #[test]
    fn test_failed_put_leaves_no_temp_file() {
        use base64ct::{Base64UrlUnpadded, Encoding};

        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        // a directory in the record's place makes the final rename fail
        std::fs::create_dir(dir.path().join(Base64UrlUnpadded::encode_string(b"k"))).unwrap();

        assert_eq!(store.put(b"k", b"value"), Err(Error::WriteError));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names[0].to_string_lossy().ends_with(".tmp"));
    }

    #[test]
    fn test_foreign_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("not base64!"), b"x").unwrap();
        std::fs::write(dir.path().join("YQ.tmp"), b"x").unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.keys(b"").unwrap().is_empty());
    }
}
