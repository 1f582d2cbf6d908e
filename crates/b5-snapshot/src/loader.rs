use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use b5_schemas::Snapshot;

/// Snapshot version = file mtime, expressed as nanoseconds since the Unix
/// epoch so two writes within the same second are still distinguishable on
/// filesystems with sub-second mtime resolution.
pub type SnapshotVersion = i128;

fn version_of(t: SystemTime) -> SnapshotVersion {
    match t.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as SnapshotVersion,
        Err(e) => -(e.duration().as_nanos() as SnapshotVersion),
    }
}

/// mtime-cached reader for the external snapshot JSON file.
///
/// `current()` is cheap to call on every poll: it always stats the file, but
/// only re-reads and re-parses the body when the mtime has advanced past the
/// cached version.
pub struct SnapshotLoader {
    path: PathBuf,
    cache: Mutex<Option<(SnapshotVersion, Snapshot)>>,
}

impl SnapshotLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current snapshot and its version. Absent/unreadable/
    /// malformed files yield the empty snapshot at version `0` (spec §6.1)
    /// without propagating an error.
    pub fn current(&self) -> (Snapshot, SnapshotVersion) {
        let version = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(t) => version_of(t),
            Err(_) => {
                *self.cache.lock().expect("snapshot cache poisoned") = None;
                return (Snapshot::empty(), 0);
            }
        };

        if let Some((cached_version, snap)) = self
            .cache
            .lock()
            .expect("snapshot cache poisoned")
            .as_ref()
        {
            if *cached_version == version {
                return (snap.clone(), version);
            }
        }

        match self.read_and_parse() {
            Ok(snap) => {
                *self.cache.lock().expect("snapshot cache poisoned") =
                    Some((version, snap.clone()));
                (snap, version)
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "snapshot read/parse failed; serving empty snapshot");
                (Snapshot::empty(), 0)
            }
        }
    }

    fn read_and_parse(&self) -> anyhow::Result<Snapshot> {
        let bytes = fs::read(&self.path)?;
        let snap: Snapshot = serde_json::from_slice(&bytes)?;
        Ok(snap)
    }
}
