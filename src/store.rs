//! Named model artifact storage.
//!
//! Artifacts are bincode blobs behind a small versioned envelope, written
//! with a write-to-temp-then-rename replace so a concurrent reader sees
//! either the previous artifact or the new one in full. Writers for the
//! same name are serialized through a per-name lock.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const MAGIC: [u8; 4] = *b"SCA\0";
/// Bumped whenever the payload layout changes incompatibly.
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact '{0}' not found")]
    NotFound(String),

    #[error("artifact '{name}' io failure: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact '{0}' could not be encoded: {1}")]
    Encode(String, bincode::Error),

    #[error("artifact '{0}' could not be decoded: {1}")]
    Decode(String, bincode::Error),

    #[error("artifact '{name}' has incompatible format version {found} (expected {expected})")]
    IncompatibleFormat {
        name: String,
        found: u16,
        expected: u16,
    },
}

pub struct ModelStore {
    dir: PathBuf,
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ModelStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            name: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir,
            write_locks: Mutex::new(HashMap::new()),
        })
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.bin"))
    }

    fn write_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Durably persist `artifact` under `name`, fully replacing any prior
    /// value. The temp file lives in the same directory so the final rename
    /// is atomic on the same filesystem.
    pub fn save<T: Serialize>(&self, name: &str, artifact: &T) -> Result<(), StoreError> {
        let lock = self.write_lock(name);
        let _guard = lock.lock();

        let payload =
            bincode::serialize(artifact).map_err(|e| StoreError::Encode(name.to_string(), e))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);

        let io_err = |source| StoreError::Io {
            name: name.to_string(),
            source,
        };
        let tmp = self.dir.join(format!(".{name}.{}.tmp", Uuid::new_v4()));
        let mut file = File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        fs::rename(&tmp, self.artifact_path(name)).map_err(io_err)?;

        debug!(artifact = name, bytes = bytes.len(), "artifact saved");
        Ok(())
    }

    /// Load the most recently saved artifact for `name`.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, StoreError> {
        let bytes = match fs::read(self.artifact_path(name)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(source) => {
                return Err(StoreError::Io {
                    name: name.to_string(),
                    source,
                })
            }
        };

        if bytes.len() < HEADER_LEN || bytes[..4] != MAGIC {
            return Err(StoreError::IncompatibleFormat {
                name: name.to_string(),
                found: 0,
                expected: FORMAT_VERSION,
            });
        }
        let found = u16::from_le_bytes([bytes[4], bytes[5]]);
        if found != FORMAT_VERSION {
            return Err(StoreError::IncompatibleFormat {
                name: name.to_string(),
                found,
                expected: FORMAT_VERSION,
            });
        }

        bincode::deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| StoreError::Decode(name.to_string(), e))
    }
}
