use lyriclip_core::TempFileRemover;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Deletes transient files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

impl TempFileRemover for FsRemover {
    fn remove(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Transient file already gone: {}", path.display());
            }
            Err(e) => warn!("Failed to remove transient file {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_a.mp3");
        std::fs::write(&path, b"x").unwrap();

        FsRemover.remove(&path);
        assert!(!path.exists());

        // Second removal is a quiet no-op
        FsRemover.remove(&path);
    }
}
