use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// Durable bucket/key storage for configuration records.
pub trait ConfigStore {
    fn get<T: DeserializeOwned>(&self, bucket: &str, key: &str) -> Result<T, StoreError>;
    fn update<T: Serialize>(&self, bucket: &str, key: &str, record: &T) -> Result<(), StoreError>;
}

fn not_found(bucket: &str, key: &str) -> StoreError {
    StoreError::NotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
    }
}

/// Volatile store, lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl ConfigStore for MemoryStore {
    fn get<T: DeserializeOwned>(&self, bucket: &str, key: &str) -> Result<T, StoreError> {
        let records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        let value = records
            .get(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| not_found(bucket, key))?;
        Ok(T::deserialize(value)?)
    }

    fn update<T: Serialize>(&self, bucket: &str, key: &str, record: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(record)?;
        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.insert((bucket.to_string(), key.to_string()), value);
        Ok(())
    }
}

type Buckets = BTreeMap<String, BTreeMap<String, Value>>;

/// Keeps every bucket in one pretty-printed JSON file.
///
/// Updates rewrite the whole file through a temporary sibling and a rename, so a crash leaves
/// either the old or the new document behind.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> JsonFileStore {
        JsonFileStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Buckets, StoreError> {
        match File::open(&self.path) {
            Ok(file) => Ok(serde_json::from_reader(BufReader::new(file))?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Buckets::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, buckets: &Buckets) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer_pretty(&mut writer, buckets)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn get<T: DeserializeOwned>(&self, bucket: &str, key: &str) -> Result<T, StoreError> {
        let buckets = self.load()?;
        let value = buckets
            .get(bucket)
            .and_then(|records| records.get(key))
            .ok_or_else(|| not_found(bucket, key))?;
        Ok(T::deserialize(value)?)
    }

    fn update<T: Serialize>(&self, bucket: &str, key: &str, record: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(record)?;
        let _guard = match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut buckets = self.load()?;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.save(&buckets)
    }
}
