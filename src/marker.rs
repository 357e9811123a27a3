use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// A cheaply observable value that changes whenever a store may have been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerSignal {
    Modified(SystemTime),
    Generation(u64),
}

/// Side channel telling the in-memory layer whether a store may have changed on disk.
///
/// Implementations never try to say *what* changed. An error means the signal is indeterminate
/// and callers treat it as "possibly stale".
pub trait ExpirationMarker: Debug + Send + Sync {
    fn signal(&self) -> io::Result<MarkerSignal>;
}

/// Uses the modification time of a file or directory as the marker.
#[derive(Debug, Clone)]
pub struct FileMarker {
    path: PathBuf,
}

impl FileMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileMarker { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExpirationMarker for FileMarker {
    fn signal(&self) -> io::Result<MarkerSignal> {
        let modified = fs::metadata(&self.path)?.modified()?;
        Ok(MarkerSignal::Modified(modified))
    }
}

/// A marker advanced explicitly, for stores whose writers announce their writes in-process.
#[derive(Debug, Default)]
pub struct ManualMarker {
    generation: AtomicU64,
}

impl ManualMarker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl ExpirationMarker for ManualMarker {
    fn signal(&self) -> io::Result<MarkerSignal> {
        Ok(MarkerSignal::Generation(
            self.generation.load(Ordering::Acquire),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn manual_marker_changes_only_when_advanced() {
        let marker = ManualMarker::new();
        let first = marker.signal().unwrap();
        assert_eq!(first, marker.signal().unwrap());

        marker.advance();
        assert_ne!(first, marker.signal().unwrap());
    }

    #[test]
    fn file_marker_follows_modification_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fileHashes.bin");
        fs::write(&path, b"one").unwrap();

        let marker = FileMarker::new(&path);
        let first = marker.signal().unwrap();

        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        assert_ne!(first, marker.signal().unwrap());
    }

    #[test]
    fn missing_file_is_indeterminate() {
        let dir = tempfile::tempdir().unwrap();
        let marker = FileMarker::new(dir.path().join("missing"));

        assert!(marker.signal().is_err());
    }
}
