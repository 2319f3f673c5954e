//! Cue store
//!
//! Durable map from a (sound, file) pair to its [`CuePoint`]. Every mutation
//! is written to disk before it becomes visible in memory, so the store and
//! its file never disagree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use courtside::CuePoint;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::storage;
use crate::error::Result;

/// Composite key for one file of one sound
fn cue_key(sound_id: &str, file_path: &str) -> String {
    format!("{sound_id}:{file_path}")
}

/// Snapshot of every stored cue point.
///
/// Serialized as a flat JSON object of `"<soundId>:<filePath>"` to cue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CueConfig {
    entries: BTreeMap<String, CuePoint>,
}

impl CueConfig {
    /// Stored cue for a pair, if any
    pub fn get(&self, sound_id: &str, file_path: &str) -> Option<CuePoint> {
        self.entries.get(&cue_key(sound_id, file_path)).copied()
    }

    /// Iterate `(sound_id, file_path, cue)` in key order.
    ///
    /// Sound ids never contain `:`, so the key splits at its first colon and
    /// file paths keep any of their own.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &CuePoint)> {
        self.entries.iter().map(|(key, cue)| {
            let (sound_id, file_path) = key.split_once(':').unwrap_or((key.as_str(), ""));
            (sound_id, file_path, cue)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Persistent cue-point store
pub struct CueStore {
    path: PathBuf,
    cues: CueConfig,
}

impl CueStore {
    /// Open the store backed by `path`.
    ///
    /// Never fails: a missing, unreadable or corrupt file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cues = match storage::load_from::<CueConfig>(&path) {
            Ok(Some(cues)) => {
                debug!(count = cues.len(), path = ?path, "Loaded cue points");
                cues
            }
            Ok(None) => CueConfig::default(),
            Err(e) => {
                warn!("Ignoring stored cue points: {e}");
                CueConfig::default()
            }
        };
        Self { path, cues }
    }

    /// Cue for a pair, or the untrimmed default
    pub fn get(&self, sound_id: &str, file_path: &str) -> CuePoint {
        self.cues.get(sound_id, file_path).unwrap_or_default()
    }

    /// Store a cue for a pair and persist it.
    ///
    /// Invalid starts are coerced to `0.0`, non-finite ends to `None`.
    /// On a write failure the store keeps its previous contents.
    pub fn set(
        &mut self,
        sound_id: &str,
        file_path: &str,
        start_time: f64,
        end_time: Option<f64>,
    ) -> Result<CuePoint> {
        let cue = CuePoint::new(start_time, end_time);
        let mut next = self.cues.clone();
        next.entries.insert(cue_key(sound_id, file_path), cue);
        self.commit(next)?;
        debug!(sound_id, file_path, %cue, "Cue point saved");
        Ok(cue)
    }

    /// Remove the cue for a pair. Returns whether an entry existed.
    pub fn clear(&mut self, sound_id: &str, file_path: &str) -> Result<bool> {
        let key = cue_key(sound_id, file_path);
        if !self.cues.entries.contains_key(&key) {
            return Ok(false);
        }
        let mut next = self.cues.clone();
        next.entries.remove(&key);
        self.commit(next)?;
        debug!(sound_id, file_path, "Cue point cleared");
        Ok(true)
    }

    /// Copy of every stored cue
    pub fn snapshot(&self) -> CueConfig {
        self.cues.clone()
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    fn commit(&mut self, next: CueConfig) -> Result<()> {
        storage::save_to(&self.path, &next)?;
        self.cues = next;
        Ok(())
    }
}
