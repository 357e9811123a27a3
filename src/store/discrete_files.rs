use crate::error::StoreError;
use crate::key::CacheKey;
use crate::store::IndexedStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::fs::File;
use std::io;
use std::io::{BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ENTRY_EXTENSION: &str = "entry";

/// A persistent store keeping one file per key inside a directory.
///
/// File names are derived from the key itself, so any process opening the same directory sees
/// the same entries without a shared index. Writes go to a uniquely named temporary file that is
/// renamed over the entry, which also bumps the directory's modification time: the directory is
/// therefore a usable expiration marker for the whole store.
///
/// Keys are hex encoded into file names. Very long path keys can exceed the file system's name
/// limit, in which case the store reports the I/O error.
pub struct FileStore<Value, Codec> {
    directory: PathBuf,
    phantom: PhantomData<fn() -> (Value, Codec)>,
}

impl<Value, Codec> FileStore<Value, Codec> {
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;

        Ok(FileStore {
            directory,
            phantom: PhantomData,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, key: &CacheKey) -> Result<PathBuf, StoreError> {
        let encoded = hex::encode(serde_json::to_vec(key)?);
        Ok(self
            .directory
            .join(format!("{encoded}.{ENTRY_EXTENSION}")))
    }

    fn temporary_path(&self) -> PathBuf {
        self.directory
            .join(format!(".{}.tmp", Uuid::new_v4().hyphenated()))
    }
}

impl<Value, Codec> IndexedStore<Value> for FileStore<Value, Codec>
where
    Value: Serialize + DeserializeOwned,
    Codec: StoreCodec,
{
    type Error = StoreError;

    fn get(&self, key: &CacheKey) -> Result<Option<Value>, StoreError> {
        let file = match File::open(self.entry_path(key)?) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Codec::decode(BufReader::new(file)).map(Some)
    }

    fn put(&self, key: &CacheKey, value: &Value) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        let temporary = self.temporary_path();

        let written = File::create(&temporary)
            .map_err(StoreError::from)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                Codec::encode(&mut writer, value)?;
                writer.flush()?;
                Ok(())
            })
            .and_then(|()| fs::rename(&temporary, &path).map_err(StoreError::from));

        if written.is_err() {
            let _ = fs::remove_file(&temporary);
        }
        written
    }

    fn remove(&self, key: &CacheKey) -> Result<(), StoreError> {
        match fs::remove_file(self.entry_path(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Selects the on-disk encoding of a store's values.
/// Reads and writes are buffered: entries are whole values, read and written in one go.
pub trait StoreCodec {
    fn encode<Value: Serialize>(
        writer: &mut BufWriter<File>,
        value: &Value,
    ) -> Result<(), StoreError>;

    fn decode<Value: DeserializeOwned>(reader: BufReader<File>) -> Result<Value, StoreError>;
}

pub struct JsonCodec;

impl StoreCodec for JsonCodec {
    fn encode<Value: Serialize>(
        writer: &mut BufWriter<File>,
        value: &Value,
    ) -> Result<(), StoreError> {
        Ok(serde_json::to_writer(writer, value)?)
    }

    fn decode<Value: DeserializeOwned>(reader: BufReader<File>) -> Result<Value, StoreError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

pub struct BincodeCodec;

impl StoreCodec for BincodeCodec {
    fn encode<Value: Serialize>(
        writer: &mut BufWriter<File>,
        value: &Value,
    ) -> Result<(), StoreError> {
        Ok(bincode::serialize_into(writer, value)?)
    }

    fn decode<Value: DeserializeOwned>(reader: BufReader<File>) -> Result<Value, StoreError> {
        Ok(bincode::deserialize_from(reader)?)
    }
}

pub type JsonFileStore<Value> = FileStore<Value, JsonCodec>;
pub type BincodeFileStore<Value> = FileStore<Value, BincodeCodec>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_key_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<String> = FileStore::open(dir.path().join("taskHistory")).unwrap();

        assert_eq!(store.get(&CacheKey::from("compileJava")).unwrap(), None);
        store.remove(&CacheKey::from("compileJava")).unwrap();
    }

    #[test]
    fn entries_are_visible_to_another_store_on_the_same_directory() {
        let dir = tempfile::tempdir().unwrap();
        let writer: BincodeFileStore<BTreeMap<String, u64>> =
            FileStore::open(dir.path().join("fileHashes")).unwrap();
        let reader: BincodeFileStore<BTreeMap<String, u64>> =
            FileStore::open(dir.path().join("fileHashes")).unwrap();

        let key = CacheKey::from(Path::new("/src/Main.java"));
        let value = BTreeMap::from([("size".to_owned(), 1024u64)]);
        writer.put(&key, &value).unwrap();

        assert_eq!(reader.get(&key).unwrap(), Some(value));
    }

    #[test]
    fn put_replaces_and_remove_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<i32> = FileStore::open(dir.path()).unwrap();
        let key = CacheKey::Integer(12);

        store.put(&key, &1).unwrap();
        store.put(&key, &2).unwrap();
        assert_eq!(store.get(&key).unwrap(), Some(2));

        store.remove(&key).unwrap();
        assert_eq!(store.get(&key).unwrap(), None);

        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn corrupt_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<i32> = FileStore::open(dir.path()).unwrap();
        let key = CacheKey::from("broken");

        fs::write(store.entry_path(&key).unwrap(), b"{not json").unwrap();

        assert!(matches!(store.get(&key), Err(StoreError::Json(_))));
    }
}
