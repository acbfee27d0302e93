//! Durable progress for interrupted runs.
//!
//! A checkpoint is a file pair in a cache directory next to the source
//! document: the output document built so far, serialized like the final
//! artifact, and a progress file holding the cursor and a fingerprint of the
//! source. Both names derive from the source file name and the target
//! language, so distinct pairs never collide.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{CheckpointConfig, Lang};
use crate::error::{Error, Result};
use crate::util::{checkpoint_dir, file_name_of};

/// A loaded checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Serialized output document
    pub snapshot: Vec<u8>,
    /// Blocks already applied to `snapshot`
    pub cursor: usize,
    pub fingerprint: String,
}

/// Hex md5 of the source bytes; a checkpoint only resumes the file it was made from.
pub fn fingerprint(source: &[u8]) -> String {
    format!("{:x}", md5::compute(source))
}

/// File pair for one (source, target language) combination
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    snapshot_path: PathBuf,
    progress_path: PathBuf,
}

impl CheckpointStore {
    pub fn new(source: &Path, target: &Lang, config: &CheckpointConfig, extension: &str) -> Self {
        let dir = checkpoint_dir(source, &config.dir_name);
        let stem = format!(
            "{}_{}",
            file_name_of(source),
            target.as_str().replace(' ', "_")
        );
        Self {
            snapshot_path: dir.join(format!("{stem}_cache.{extension}")),
            progress_path: dir.join(format!("{stem}_progress.txt")),
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }

    pub fn exists(&self) -> bool {
        self.progress_path.exists()
    }

    /// Persist the snapshot, then the cursor.
    ///
    /// Each file is written to a temporary sibling and renamed into place;
    /// the cursor is only replaced once its snapshot is on disk.
    pub fn save(&self, snapshot: &[u8], cursor: usize, fingerprint: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::CheckpointWrite(format!(
                "Failed to create cache directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        write_replace(&self.snapshot_path, snapshot)?;
        write_replace(
            &self.progress_path,
            format!("{cursor}\n{fingerprint}\n").as_bytes(),
        )?;

        debug!("Checkpoint saved at block {} to {}", cursor, self.dir.display());
        Ok(())
    }

    /// Load the checkpoint made from a source with `fingerprint`.
    ///
    /// Missing, malformed or foreign checkpoints read as absent.
    pub fn load(&self, fingerprint: &str) -> Option<Checkpoint> {
        if !self.progress_path.exists() {
            return None;
        }

        match self.read() {
            Ok(checkpoint) if checkpoint.fingerprint == fingerprint => Some(checkpoint),
            Ok(_) => {
                warn!(
                    "Checkpoint {} belongs to a different version of the source, ignoring it",
                    self.progress_path.display()
                );
                None
            }
            Err(e) => {
                warn!("Ignoring unreadable checkpoint: {}", e);
                None
            }
        }
    }

    fn read(&self) -> Result<Checkpoint> {
        let progress = fs::read_to_string(&self.progress_path).map_err(|e| {
            Error::CheckpointRead(format!("{}: {}", self.progress_path.display(), e))
        })?;
        let mut lines = progress.lines();
        let cursor = lines
            .next()
            .and_then(|l| l.trim().parse::<usize>().ok())
            .ok_or_else(|| {
                Error::CheckpointRead(format!(
                    "{}: first line is not a block count",
                    self.progress_path.display()
                ))
            })?;
        let fingerprint = lines.next().map(str::trim).unwrap_or_default().to_string();

        let snapshot = fs::read(&self.snapshot_path).map_err(|e| {
            Error::CheckpointRead(format!("{}: {}", self.snapshot_path.display(), e))
        })?;

        Ok(Checkpoint {
            snapshot,
            cursor,
            fingerprint,
        })
    }

    /// Remove this pair, and the cache directory once nothing else is in it.
    pub fn clear(&self) -> Result<()> {
        for path in [&self.progress_path, &self.snapshot_path] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::CheckpointWrite(format!(
                        "Failed to remove {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        let is_empty = fs::read_dir(&self.dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            fs::remove_dir(&self.dir)?;
        }
        debug!("Checkpoint cleared in {}", self.dir.display());
        Ok(())
    }
}

fn write_replace(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)
        .and_then(|()| fs::rename(&tmp, path))
        .map_err(|e| Error::CheckpointWrite(format!("{}: {}", path.display(), e)))
}

/// Size of a cache directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatus {
    pub files: usize,
    pub bytes: u64,
}

/// Count the files in a cache directory; a missing directory is empty.
pub fn cache_status(dir: &Path) -> Result<CacheStatus> {
    let mut status = CacheStatus::default();
    if !dir.exists() {
        return Ok(status);
    }
    for entry in fs::read_dir(dir)? {
        let metadata = entry?.metadata()?;
        if metadata.is_file() {
            status.files += 1;
            status.bytes += metadata.len();
        }
    }
    Ok(status)
}

/// Delete a cache directory with every checkpoint in it. Returns the number of files removed.
pub fn purge(dir: &Path) -> Result<usize> {
    let status = cache_status(dir)?;
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    Ok(status.files)
}
