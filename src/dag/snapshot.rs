// src/dag/snapshot.rs

//! Persisted traversal sessions.
//!
//! A session started by `traverse init` is read back by every later
//! `traverse` call of the same driving process. The on-disk form is a
//! versioned JSON document; an unknown version is rejected rather than
//! guessed at.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dag::node::NodeStatus;
use crate::errors::{Result, SpkError};
use crate::fs::FileSystem;
use crate::types::{Direction, ProjectName};

/// Current schema version of [`Snapshot`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// File name suffix of file-backed snapshots: `<dir>/<key>.spkforge.json`.
pub const SNAPSHOT_SUFFIX: &str = ".spkforge.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub depends_on: Vec<ProjectName>,
    pub status: NodeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub direction: Direction,
    pub queue: Vec<ProjectName>,
    pub success: Vec<ProjectName>,
    pub failed: Vec<ProjectName>,
    /// Failed root -> queued projects skipped because of it.
    pub skipped: BTreeMap<ProjectName, Vec<ProjectName>>,
    pub nodes: BTreeMap<ProjectName, SnapshotNode>,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

impl Snapshot {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn decode(text: &str) -> Result<Self> {
        let probe: VersionProbe = serde_json::from_str(text)
            .map_err(|e| SpkError::Snapshot(format!("unreadable snapshot: {e}")))?;
        if probe.version != SNAPSHOT_VERSION {
            return Err(SpkError::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                probe.version, SNAPSHOT_VERSION
            )));
        }
        Ok(serde_json::from_str(text)?)
    }
}

/// Key/value storage for snapshots.
pub trait SnapshotStore: Send + Sync + Debug {
    fn load(&self, key: &str) -> Result<Option<Snapshot>>;
    fn save(&self, key: &str, snapshot: &Snapshot) -> Result<()>;
    /// Remove the snapshot. Returns whether one existed.
    fn purge(&self, key: &str) -> Result<bool>;
}

/// Stores each snapshot as `<dir>/<key>.spkforge.json`.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileSnapshotStore {
    pub fn new(dir: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { dir, fs }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}{SNAPSHOT_SUFFIX}"))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<Snapshot>> {
        let path = self.path_for(key);
        if !self.fs.is_file(&path) {
            debug!(path = %path.display(), "no snapshot on disk");
            return Ok(None);
        }
        let text = self.fs.read_to_string(&path)?;
        Snapshot::decode(&text).map(Some)
    }

    fn save(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        let path = self.path_for(key);
        self.fs.write(&path, snapshot.encode()?.as_bytes())?;
        debug!(path = %path.display(), queued = snapshot.queue.len(), "stored snapshot (file)");
        Ok(())
    }

    fn purge(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        if !self.fs.exists(&path) {
            return Ok(false);
        }
        self.fs.remove_file(&path)?;
        info!(path = %path.display(), "purged snapshot (file)");
        Ok(true)
    }
}

/// Keeps encoded snapshots in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<Snapshot>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).map(|text| Snapshot::decode(text)).transpose()
    }

    fn save(&self, key: &str, snapshot: &Snapshot) -> Result<()> {
        let text = snapshot.encode()?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), text);
        debug!(key = %key, "stored snapshot (memory)");
        Ok(())
    }

    fn purge(&self, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    fn sample() -> Snapshot {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "A".to_string(),
            SnapshotNode {
                depends_on: vec!["C".to_string()],
                status: NodeStatus::Unvisited,
            },
        );
        nodes.insert(
            "C".to_string(),
            SnapshotNode {
                depends_on: vec![],
                status: NodeStatus::Succeeded,
            },
        );
        Snapshot {
            version: SNAPSHOT_VERSION,
            direction: Direction::Forward,
            queue: vec!["A".to_string()],
            success: vec!["C".to_string()],
            failed: vec![],
            skipped: BTreeMap::new(),
            nodes,
        }
    }

    #[test]
    fn file_store_save_load_purge() {
        let fs = Arc::new(MockFileSystem::new());
        let store = FileSnapshotStore::new(PathBuf::from("/tmp/snap"), fs.clone());

        assert_eq!(store.load("4242").unwrap(), None);
        store.save("4242", &sample()).unwrap();
        assert!(fs.is_file(&PathBuf::from("/tmp/snap/4242.spkforge.json")));
        assert_eq!(store.load("4242").unwrap(), Some(sample()));

        assert!(store.purge("4242").unwrap());
        assert!(!store.purge("4242").unwrap());
        assert_eq!(store.load("4242").unwrap(), None);
    }

    #[test]
    fn memory_store_is_keyed() {
        let store = MemorySnapshotStore::new();
        store.save("a", &sample()).unwrap();
        assert!(store.load("b").unwrap().is_none());
        assert_eq!(store.load("a").unwrap().unwrap().queue, vec!["A".to_string()]);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut snap = sample();
        snap.version = 99;
        let text = serde_json::to_string(&snap).unwrap();

        let err = Snapshot::decode(&text).unwrap_err();
        assert!(matches!(err, SpkError::Snapshot(msg) if msg.contains("99")));
        assert!(Snapshot::decode("not json").is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let text = sample().encode().unwrap();
        assert!(text.contains("\"succeeded\""));
        assert!(text.contains("\"forward\""));
    }
}
