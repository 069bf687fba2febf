//! Durable snapshot of evolution progress.
//!
//! A checkpoint records the generation counter, the stagnation counter and
//! the most-fit genome. Writes go to a temporary file in the destination
//! directory which is then renamed over the target, so a reader sees either
//! the previous snapshot or the new one, never a partial file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::schema::Genome;

/// On-disk format revision written by this build.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// Resumable evolution state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub format_version: u32,
    /// Last completed generation.
    pub generation: u64,
    /// Generations since the incumbent last improved.
    pub generations_since_change: u64,
    pub most_fit: Genome,
}

impl Checkpoint {
    pub fn new(generation: u64, generations_since_change: u64, most_fit: Genome) -> Self {
        Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            generation,
            generations_since_change,
            most_fit,
        }
    }
}

/// Checkpoint persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("No checkpoint at {0}")]
    NotFound(PathBuf),
    #[error("Checkpoint I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Corrupt checkpoint at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("Failed to encode checkpoint: {0}")]
    Encode(String),
}

/// Converts checkpoints to and from bytes.
pub trait CheckpointCodec: Send + Sync {
    fn encode(&self, checkpoint: &Checkpoint) -> Result<Vec<u8>, String>;
    fn decode(&self, bytes: &[u8]) -> Result<Checkpoint, String>;
}

/// Pretty-printed JSON encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl CheckpointCodec for JsonCodec {
    fn encode(&self, checkpoint: &Checkpoint) -> Result<Vec<u8>, String> {
        serde_json::to_vec_pretty(checkpoint).map_err(|e| e.to_string())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Checkpoint, String> {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }
}

/// Loads and atomically saves a checkpoint at a fixed path.
#[derive(Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    codec: Arc<dyn CheckpointCodec>,
}

impl CheckpointStore {
    /// Store using the JSON codec.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_codec(path, Arc::new(JsonCodec))
    }

    pub fn with_codec<P: AsRef<Path>>(path: P, codec: Arc<dyn CheckpointCodec>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            codec,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn corrupt(&self, reason: impl Into<String>) -> CheckpointError {
        CheckpointError::Corrupt {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    /// Read and validate the checkpoint.
    ///
    /// A missing file is [`CheckpointError::NotFound`]; anything that exists
    /// but cannot be decoded or fails structural checks is
    /// [`CheckpointError::Corrupt`].
    pub fn load(&self) -> Result<Checkpoint, CheckpointError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CheckpointError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let checkpoint = self.codec.decode(&bytes).map_err(|e| self.corrupt(e))?;

        if checkpoint.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported format version {} (expected {})",
                checkpoint.format_version, CHECKPOINT_FORMAT_VERSION
            )));
        }
        checkpoint
            .most_fit
            .check_structure()
            .map_err(|e| self.corrupt(e))?;

        Ok(checkpoint)
    }

    /// Load if present. `Ok(None)` only when no file exists.
    pub fn load_optional(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        match self.load() {
            Ok(cp) => Ok(Some(cp)),
            Err(CheckpointError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Atomically replace the checkpoint file.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let bytes = self
            .codec
            .encode(checkpoint)
            .map_err(CheckpointError::Encode)?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&bytes).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        log::debug!(
            "Saved checkpoint at generation {} to {}",
            checkpoint.generation,
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Point, Polygon, Rgba};

    fn sample() -> Checkpoint {
        let mut genome = Genome::blank(20, 10);
        genome.polygons.push(Polygon {
            points: vec![Point::new(1, 1), Point::new(19, 2), Point::new(4, 9)],
            color: Rgba::new(12, 34, 56, 78),
        });
        Checkpoint::new(500, 37, genome)
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("run.checkpoint.json"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("absent.json"));

        assert!(matches!(store.load(), Err(CheckpointError::NotFound(_))));
        assert!(store.load_optional().unwrap().is_none());
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = CheckpointStore::new(&path);
        assert!(matches!(store.load(), Err(CheckpointError::Corrupt { .. })));
        assert!(store.load_optional().is_err());
    }

    #[test]
    fn test_out_of_bounds_genome_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("cp.json"));

        let mut cp = sample();
        cp.most_fit.polygons[0].points[0] = Point::new(20, 0);
        store.save(&cp).unwrap();

        assert!(matches!(store.load(), Err(CheckpointError::Corrupt { .. })));
    }

    #[test]
    fn test_unknown_version_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("cp.json"));

        let mut cp = sample();
        cp.format_version = 99;
        store.save(&cp).unwrap();

        assert!(matches!(store.load(), Err(CheckpointError::Corrupt { .. })));
    }

    #[test]
    fn test_save_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("cp.json"));

        store.save(&sample()).unwrap();
        let mut next = sample();
        next.generation = 750;
        store.save(&next).unwrap();

        assert_eq!(store.load().unwrap().generation, 750);
        // Only the checkpoint remains; the temporary file was renamed away.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cp.json");
        CheckpointStore::new(&path).save(&sample()).unwrap();

        struct Failing;
        impl CheckpointCodec for Failing {
            fn encode(&self, _: &Checkpoint) -> Result<Vec<u8>, String> {
                Err("encoder unavailable".into())
            }
            fn decode(&self, bytes: &[u8]) -> Result<Checkpoint, String> {
                JsonCodec.decode(bytes)
            }
        }

        let failing = CheckpointStore::with_codec(&path, Arc::new(Failing));
        let mut next = sample();
        next.generation = 999;
        assert!(matches!(failing.save(&next), Err(CheckpointError::Encode(_))));

        assert_eq!(CheckpointStore::new(&path).load().unwrap(), sample());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("nope").join("cp.json"));
        assert!(matches!(
            store.save(&sample()),
            Err(CheckpointError::Io { .. })
        ));
    }
}
