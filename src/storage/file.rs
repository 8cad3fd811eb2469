use super::{Error, KeyValueStore};
use crate::macros::log_warn;
use base64ct::{Base64UrlUnpadded, Encoding};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::vec::Vec;

const TMP_SUFFIX: &str = ".tmp";

/// One file per key under a directory.
///
/// File names are the URL-safe, unpadded base64 form of the key, so arbitrary
/// key bytes map to portable names. Writes go to a temporary file that is
/// renamed into place, so a crash leaves either the old or the new value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|_| Error::Unavailable)?;
        Ok(Self { dir })
    }

    /// The directory records live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &[u8]) -> PathBuf {
        self.dir.join(Base64UrlUnpadded::encode_string(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match fs::read(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(_) => Err(Error::ReadError),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        let path = self.path_for(key);
        let mut tmp = path.clone().into_os_string();
        tmp.push(TMP_SUFFIX);

        let written = fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(value)?;
                file.sync_data()
            })
            .and_then(|()| fs::rename(&tmp, &path));
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
            log_warn!("failed to store record {}", Base64UrlUnpadded::encode_string(key).as_str());
            return Err(Error::WriteError);
        }
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> Result<(), Error> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(_) => Err(Error::WriteError),
        }
    }

    fn keys(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
        let entries = fs::read_dir(&self.dir).map_err(|_| Error::ReadError)?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| Error::ReadError)?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.ends_with(TMP_SUFFIX) {
                continue;
            }
            match Base64UrlUnpadded::decode_vec(name) {
                Ok(key) if key.starts_with(prefix) => keys.push(key),
                Ok(_) => {}
                Err(_) => log_warn!("ignoring foreign file in store directory: {}", name),
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn flush(&mut self) -> Result<(), Error> {
        // directory fsync makes the renames durable; not supported everywhere
        #[cfg(unix)]
        fs::File::open(&self.dir)
            .and_then(|dir| dir.sync_all())
            .map_err(|_| Error::WriteError)?;
        Ok(())
    }
}
